// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Extension-based dispatch between the binary codec and CSV export.

use crate::config::ExportOptions;
use crate::error::{Error, Result};
use crate::file_type::FileType;
use crate::reader::BinaryReader;
use crate::resolve::{ReferenceResolver, TableResolver};
use crate::table::Table;
use crate::writer::BinaryWriter;
use std::io::Write;
use std::path::Path;

pub fn export_table(table: &Table, path: impl AsRef<Path>, options: &ExportOptions) -> Result<()> {
    let path = path.as_ref();
    match FileType::from_path(path)? {
        FileType::Binary => BinaryWriter::new(options.writer.clone()).write(table, path),
        FileType::Csv => {
            let file = std::fs::File::create(path)?;
            let out = std::io::BufWriter::with_capacity(options.writer.buffer_capacity, file);
            let rows = write_csv(table, out, &TableResolver)?;
            tracing::info!(path = %path.display(), rows, "exported table as csv");
            Ok(())
        }
        other => Err(Error::UnsupportedFileType(other)),
    }
}

pub fn import_table(path: impl AsRef<Path>, options: &ExportOptions) -> Result<Table> {
    let path = path.as_ref();
    match FileType::from_path(path)? {
        FileType::Binary => BinaryReader::new(options.reader.clone()).read(path),
        other => Err(Error::UnsupportedFileType(other)),
    }
}

/// Header row of column names, then one record per row. NULL becomes an empty field.
/// Reference rows are resolved through `resolver`.
pub fn write_csv<W: Write>(table: &Table, out: W, resolver: &dyn ReferenceResolver) -> Result<u64> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(table.columns().iter().map(|c| c.name.as_str()))?;

    let mut rows = 0u64;
    for chunk in table.chunks() {
        for offset in 0..chunk.size() as usize {
            let record = chunk
                .segments()
                .iter()
                .map(|s| s.value_at_with(offset, resolver).map(|v| v.to_string()))
                .collect::<Result<Vec<_>>>()?;
            wtr.write_record(&record)?;
            rows += 1;
        }
    }
    wtr.flush()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableBuilder;
    use crate::segment::ReferenceSegment;
    use crate::types::{ColumnDefinition, DataType, RowId, Value};
    use std::sync::Arc;

    struct NegatingResolver;

    impl ReferenceResolver for NegatingResolver {
        fn resolve(&self, segment: &ReferenceSegment, row: RowId) -> Result<Value> {
            Ok(match TableResolver.resolve(segment, row)? {
                Value::Long(v) => Value::Long(-v),
                other => other,
            })
        }
    }

    fn sample() -> Table {
        let mut b = TableBuilder::new(
            vec![
                ColumnDefinition::new("id", DataType::Long, false),
                ColumnDefinition::new("note", DataType::String, true),
            ],
            2,
        );
        b.append(vec![Value::Long(1), "plain".into()]).unwrap();
        b.append(vec![Value::Long(2), Value::Null]).unwrap();
        b.append(vec![Value::Long(3), "a,b".into()]).unwrap();
        b.finish().unwrap()
    }

    #[test]
    fn test_csv_layout() {
        let mut out = Vec::new();
        assert_eq!(write_csv(&sample(), &mut out, &TableResolver).unwrap(), 3);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "id,note\n1,plain\n2,\n3,\"a,b\"\n"
        );
    }

    #[test]
    fn test_csv_uses_given_resolver() {
        let source = Arc::new(sample());
        let view = Table::reference_view(&source, vec![vec![RowId::new(1, 0), RowId::new(0, 1)]]).unwrap();

        let mut out = Vec::new();
        write_csv(&view, &mut out, &NegatingResolver).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "id,note\n-3,\"a,b\"\n-2,\n");

        let mut out = Vec::new();
        write_csv(&view, &mut out, &TableResolver).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "id,note\n3,\"a,b\"\n2,\n");
    }

    #[test]
    fn test_dispatch_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let opts = ExportOptions::default();
        let table = sample();

        let bin = dir.path().join("t.bin");
        export_table(&table, &bin, &opts).unwrap();
        assert_eq!(import_table(&bin, &opts).unwrap().rows().unwrap(), table.rows().unwrap());

        let csv = dir.path().join("t.csv");
        export_table(&table, &csv, &opts).unwrap();
        assert!(std::fs::read_to_string(&csv).unwrap().starts_with("id,note\n"));
        assert!(matches!(
            import_table(&csv, &opts),
            Err(Error::UnsupportedFileType(FileType::Csv))
        ));

        assert!(matches!(
            export_table(&table, dir.path().join("t.tbl"), &opts),
            Err(Error::UnsupportedFileType(FileType::Tbl))
        ));
        assert!(matches!(
            export_table(&table, dir.path().join("t.txt"), &opts),
            Err(Error::UnknownFileExtension(_))
        ));
    }
}
