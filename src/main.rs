// SPDX-License-Identifier: AGPL-3.0-or-later

use segfile::{
    encode_all_chunks, encode_chunks, export_table, import_table, EncodingType, ExportOptions, Table,
};
use std::env;
use std::path::{Path, PathBuf};

fn main() {
    segfile::logging::init();
    let args: Vec<String> = env::args().collect();

    let result = match args.get(1).map(String::as_str) {
        Some("inspect") => {
            if args.len() != 3 {
                print_usage_and_exit(2);
            }
            inspect(&PathBuf::from(&args[2]))
        }
        Some("convert") => {
            if args.len() < 4 {
                print_usage_and_exit(2);
            }
            let opts = parse_options(&args[4..]);
            convert(&PathBuf::from(&args[2]), &PathBuf::from(&args[3]), &opts)
        }
        Some("encode") => {
            if args.len() < 5 {
                print_usage_and_exit(2);
            }
            let encoding = args[4].parse::<EncodingType>().unwrap_or_else(|e| {
                eprintln!("{e}");
                print_usage_and_exit(2);
            });
            let opts = parse_options(&args[5..]);
            encode(&PathBuf::from(&args[2]), &PathBuf::from(&args[3]), encoding, &opts)
        }
        Some("--help") | Some("-h") => print_usage_and_exit(0),
        Some(other) => {
            eprintln!("unknown command: {other}");
            print_usage_and_exit(2);
        }
        None => print_usage_and_exit(2),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[derive(Debug, Default)]
struct CliOptions {
    export: ExportOptions,
    chunks: Option<Vec<u32>>,
}

fn parse_options(args: &[String]) -> CliOptions {
    let mut opts = CliOptions::default();
    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--atomic" => {
                opts.export.writer.atomic = true;
                i += 1;
            }
            "--chunks" => {
                let v = args.get(i + 1).unwrap_or_else(|| {
                    eprintln!("--chunks needs a comma-separated list of chunk ids");
                    print_usage_and_exit(2);
                });
                let ids = v
                    .split(',')
                    .map(|s| s.trim().parse::<u32>())
                    .collect::<Result<Vec<_>, _>>()
                    .unwrap_or_else(|_| {
                        eprintln!("--chunks could not be parsed: {v}");
                        print_usage_and_exit(2);
                    });
                opts.chunks = Some(ids);
                i += 2;
            }
            "--help" | "-h" => print_usage_and_exit(0),
            other => {
                eprintln!("unknown option: {other}");
                print_usage_and_exit(2);
            }
        }
    }
    opts
}

fn inspect(path: &Path) -> segfile::Result<()> {
    let table = import_table(path, &ExportOptions::default())?;
    print_summary(&table);
    Ok(())
}

fn print_summary(table: &Table) {
    println!(
        "max_chunk_size={} chunks={} rows={}",
        table.max_chunk_size(),
        table.chunk_count(),
        table.row_count()
    );
    for (idx, column) in table.columns().iter().enumerate() {
        println!(
            "  column {idx}: {} {}{}",
            column.name,
            column.data_type,
            if column.nullable { " null" } else { "" }
        );
    }
    for (chunk_id, chunk) in table.chunks().iter().enumerate() {
        let kinds: Vec<String> = chunk.segments().iter().map(|s| s.kind().to_string()).collect();
        println!("  chunk {chunk_id}: rows={} [{}]", chunk.size(), kinds.join(", "));
    }
}

fn convert(input: &Path, output: &Path, opts: &CliOptions) -> segfile::Result<()> {
    let table = import_table(input, &opts.export)?;
    export_table(&table, output, &opts.export)?;
    println!("converted {} -> {}", input.display(), output.display());
    Ok(())
}

fn encode(input: &Path, output: &Path, encoding: EncodingType, opts: &CliOptions) -> segfile::Result<()> {
    let table = import_table(input, &opts.export)?;
    let encoded = match &opts.chunks {
        Some(ids) => encode_chunks(&table, ids, encoding)?,
        None => encode_all_chunks(&table, encoding)?,
    };
    export_table(&encoded, output, &opts.export)?;
    print_summary(&encoded);
    Ok(())
}

fn print_usage_and_exit(code: i32) -> ! {
    eprintln!("usage:");
    eprintln!("  segfile inspect <file.bin>");
    eprintln!("  segfile convert <in.bin> <out.bin|out.csv> [--atomic]");
    eprintln!("  segfile encode <in.bin> <out.bin> <unencoded|dictionary|runlength> [options]");
    eprintln!();
    eprintln!("options:");
    eprintln!("  --atomic        write through a temporary file and rename it into place");
    eprintln!("  --chunks <ids>  only re-encode these chunks, e.g. 0,2,5");
    eprintln!();
    eprintln!("SEGFILE_LOG sets the log level (default info).");
    std::process::exit(code)
}
