// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::codec::ByteWriter;
use crate::config::WriterOptions;
use crate::error::{Error, Result};
use crate::resolve::{ReferenceResolver, TableResolver};
use crate::serializer::SegmentSerializer;
use crate::table::Table;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes `table` to `path` with default options.
pub fn write(table: &Table, path: impl AsRef<Path>) -> Result<()> {
    BinaryWriter::new(WriterOptions::default()).write(table, path)
}

pub struct BinaryWriter {
    options: WriterOptions,
    resolver: Box<dyn ReferenceResolver>,
}

impl Default for BinaryWriter {
    fn default() -> Self {
        Self::new(WriterOptions::default())
    }
}

impl BinaryWriter {
    pub fn new(options: WriterOptions) -> Self {
        Self {
            options,
            resolver: Box::new(TableResolver),
        }
    }

    pub fn with_resolver(options: WriterOptions, resolver: Box<dyn ReferenceResolver>) -> Self {
        Self { options, resolver }
    }

    pub fn options(&self) -> &WriterOptions {
        &self.options
    }

    pub fn write(&self, table: &Table, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if !self.options.atomic {
            return self.write_file(table, path);
        }

        let tmp = staging_path(path);
        if let Err(err) = self.write_file(table, &tmp).and_then(|_| {
            std::fs::rename(&tmp, path)?;
            Ok(())
        }) {
            if let Err(cleanup) = std::fs::remove_file(&tmp) {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %tmp.display(), error = %cleanup, "failed to remove staging file");
                }
            }
            return Err(err);
        }
        Ok(())
    }

    fn write_file(&self, table: &Table, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let mut buf = BufWriter::with_capacity(self.options.buffer_capacity, file);
        let written = self.write_to(table, &mut buf)?;
        let file = buf.into_inner().map_err(|e| e.into_error())?;
        if self.options.atomic {
            file.sync_all()?;
        }
        tracing::info!(
            path = %path.display(),
            chunks = table.chunk_count(),
            rows = table.row_count(),
            bytes = written,
            "exported table"
        );
        Ok(())
    }

    /// Serializes `table` into `out` and returns the number of bytes written.
    pub fn write_to<W: Write>(&self, table: &Table, out: W) -> Result<u64> {
        let mut out = ByteWriter::new(out).with_max_string_len(self.options.max_string_len);
        write_header(&mut out, table)?;

        let serializer = SegmentSerializer::new(self.resolver.as_ref());
        for (chunk_id, chunk) in table.chunks().iter().enumerate() {
            out.write_scalar(chunk.size())?;
            for (segment, column) in chunk.segments().iter().zip(table.columns()) {
                serializer.write_any(&mut out, segment, column.nullable)?;
            }
            tracing::debug!(chunk_id, rows = chunk.size(), offset = out.bytes_written(), "wrote chunk");
        }
        out.flush()?;
        Ok(out.bytes_written())
    }
}

fn write_header<W: Write>(out: &mut ByteWriter<W>, table: &Table) -> Result<()> {
    let chunk_count = u32::try_from(table.chunk_count())
        .map_err(|_| Error::format("chunk count exceeds u32::MAX"))?;
    let column_count = u16::try_from(table.column_count())
        .map_err(|_| Error::format("column count exceeds u16::MAX"))?;
    let columns = table.columns();

    out.write_scalar(table.max_chunk_size())?;
    out.write_scalar(chunk_count)?;
    out.write_scalar(column_count)?;
    let type_names: Vec<&str> = columns.iter().map(|c| c.data_type.name()).collect();
    out.write_string_array(&type_names)?;
    let nullable: Vec<bool> = columns.iter().map(|c| c.nullable).collect();
    out.write_bool_array(&nullable)?;
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    out.write_string_array(&names)
}

fn staging_path(base: &Path) -> PathBuf {
    let stamp = format!(
        "{}.{}.tmp",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    );
    let mut out = PathBuf::from(base);
    match base.file_name() {
        Some(name) => out.set_file_name(format!("{}.{stamp}", name.to_string_lossy())),
        None => out.set_file_name(stamp),
    }
    out
}
