// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::codec::ByteReader;
use crate::config::ReaderOptions;
use crate::encoding::EncodingType;
use crate::error::{Error, Result};
use crate::segment::{AnySegment, DictionarySegment, RunLengthSegment, Segment, ValueSegment};
use crate::table::{Chunk, Table};
use crate::types::{ColumnDefinition, ColumnValue, DataType};
use crate::vector::{unpack, VectorWidth};
use memmap2::MmapOptions;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// Reads the table stored at `path` with default options.
pub fn read(path: impl AsRef<Path>) -> Result<Table> {
    BinaryReader::default().read(path)
}

#[derive(Debug, Clone, Default)]
pub struct BinaryReader {
    options: ReaderOptions,
}

impl BinaryReader {
    pub fn new(options: ReaderOptions) -> Self {
        Self { options }
    }

    pub fn read(&self, path: impl AsRef<Path>) -> Result<Table> {
        let path = path.as_ref();
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Err(Error::eof("empty table file"));
        }
        let mmap = unsafe { MmapOptions::new().map(&file)? };
        let table = self.read_from_bytes(&mmap)?;
        tracing::info!(
            path = %path.display(),
            chunks = table.chunk_count(),
            rows = table.row_count(),
            "imported table"
        );
        Ok(table)
    }

    pub fn read_from_bytes(&self, bytes: &[u8]) -> Result<Table> {
        let mut r = ByteReader::new(bytes).with_max_string_len(self.options.max_string_len);

        let max_chunk_size = r.read_u32()?;
        let chunk_count = r.read_u32()? as usize;
        let columns = read_columns(&mut r)?;

        // Every chunk takes at least its row count; cap the preallocation by what is left.
        let mut chunks = Vec::with_capacity(chunk_count.min(r.remaining() / 4));
        for chunk_id in 0..chunk_count {
            let rows = r.read_u32()?;
            if rows > max_chunk_size {
                return Err(Error::format(format!(
                    "chunk {chunk_id} holds {rows} rows, max chunk size is {max_chunk_size}"
                )));
            }
            let segments = columns
                .iter()
                .map(|column| read_any_segment(&mut r, column, rows as usize))
                .collect::<Result<Vec<_>>>()?;
            let chunk = Chunk::new(segments)?;
            if chunk.size() != rows {
                return Err(Error::format(format!(
                    "chunk {chunk_id} declares {rows} rows but holds {}",
                    chunk.size()
                )));
            }
            tracing::debug!(chunk_id, rows, offset = r.position(), "read chunk");
            chunks.push(Arc::new(chunk));
        }

        if !r.is_empty() {
            return Err(Error::format(format!(
                "{} trailing bytes after last chunk",
                r.remaining()
            )));
        }
        Table::new(columns, max_chunk_size, chunks)
    }
}

fn read_columns(r: &mut ByteReader<'_>) -> Result<Vec<ColumnDefinition>> {
    let count = r.read_u16()? as usize;
    let types = r
        .read_string_array(count)?
        .iter()
        .map(|name| DataType::from_name(name))
        .collect::<Result<Vec<_>>>()?;
    let nullable = r.read_bool_array(count)?;
    let names = r.read_string_array(count)?;
    Ok(names
        .into_iter()
        .zip(types)
        .zip(nullable)
        .map(|((name, data_type), nullable)| ColumnDefinition::new(name, data_type, nullable))
        .collect())
}

fn read_any_segment(r: &mut ByteReader<'_>, column: &ColumnDefinition, rows: usize) -> Result<AnySegment> {
    let nullable = column.nullable;
    Ok(match column.data_type {
        DataType::Int => AnySegment::Int(read_segment(r, nullable, rows)?),
        DataType::Long => AnySegment::Long(read_segment(r, nullable, rows)?),
        DataType::Float => AnySegment::Float(read_segment(r, nullable, rows)?),
        DataType::Double => AnySegment::Double(read_segment(r, nullable, rows)?),
        DataType::String => AnySegment::String(read_segment(r, nullable, rows)?),
    })
}

fn read_segment<T: ColumnValue>(r: &mut ByteReader<'_>, nullable: bool, rows: usize) -> Result<Segment<T>> {
    let segment = match EncodingType::from_tag(r.read_u8()?)? {
        EncodingType::Unencoded => {
            let nulls = if nullable {
                Some(r.read_bool_array(rows)?)
            } else {
                None
            };
            let values = T::read_values(r, rows)?;
            Segment::Value(ValueSegment::new(values, nulls)?)
        }
        EncodingType::Dictionary => {
            let width = VectorWidth::from_byte(r.read_u8()?)?;
            let size = r.read_u32()? as usize;
            let dictionary = T::read_values(r, size)?;
            let attribute_vector = unpack(r, width, rows)?;
            Segment::Dictionary(DictionarySegment::new(dictionary, attribute_vector)?)
        }
        EncodingType::RunLength => {
            let runs = r.read_u32()? as usize;
            let values = T::read_values(r, runs)?;
            let null_values = r.read_bool_array(runs)?;
            let end_positions = r.read_array::<u32>(runs)?;
            let segment = RunLengthSegment::new(values, null_values, end_positions)?;
            if segment.len() != rows {
                return Err(Error::format(format!(
                    "runs cover {} rows, chunk has {rows}",
                    segment.len()
                )));
            }
            Segment::RunLength(segment)
        }
    };
    segment.validate(nullable)?;
    Ok(segment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ByteWriter;
    use crate::encoding::{encode_all_chunks, EncodingType};
    use crate::table::TableBuilder;
    use crate::types::Value;
    use crate::writer::BinaryWriter;

    /// A single-chunk, single-column file around a hand-written segment payload.
    fn one_column(type_name: &str, nullable: bool, rows: u32, segment: &[u8]) -> Vec<u8> {
        let mut w = ByteWriter::new(Vec::new());
        w.write_scalar(16u32).unwrap();
        w.write_scalar(1u32).unwrap();
        w.write_scalar(1u16).unwrap();
        w.write_string_array(&[type_name]).unwrap();
        w.write_bool_array(&[nullable]).unwrap();
        w.write_string_array(&["c"]).unwrap();
        w.write_scalar(rows).unwrap();
        w.write_raw(segment).unwrap();
        w.into_inner()
    }

    fn read_bytes(bytes: &[u8]) -> Result<Table> {
        BinaryReader::default().read_from_bytes(bytes)
    }

    fn mixed_table() -> Table {
        let mut b = TableBuilder::new(
            vec![
                crate::types::ColumnDefinition::new("i", DataType::Int, true),
                crate::types::ColumnDefinition::new("l", DataType::Long, false),
                crate::types::ColumnDefinition::new("f", DataType::Float, false),
                crate::types::ColumnDefinition::new("s", DataType::String, true),
            ],
            3,
        );
        for i in 0..7i32 {
            let s = if i == 2 { Value::Null } else { Value::from(format!("v{}", i / 2)) };
            let n = if i % 3 == 0 { Value::Null } else { Value::Int(i / 2) };
            b.append(vec![n, Value::Long(i as i64 * 10), Value::Float(i as f32 / 4.0), s])
                .unwrap();
        }
        b.finish().unwrap()
    }

    #[test]
    fn test_read_back_every_encoding() {
        let table = mixed_table();
        for encoding in [EncodingType::Unencoded, EncodingType::Dictionary, EncodingType::RunLength] {
            let encoded = encode_all_chunks(&table, encoding).unwrap();
            let mut bytes = Vec::new();
            BinaryWriter::default().write_to(&encoded, &mut bytes).unwrap();
            let back = read_bytes(&bytes).unwrap();
            assert_eq!(back.columns(), table.columns());
            assert_eq!(back.max_chunk_size(), 3);
            assert_eq!(back.rows().unwrap(), table.rows().unwrap());
            for (a, b) in back.chunks().iter().zip(encoded.chunks()) {
                for (sa, sb) in a.segments().iter().zip(b.segments()) {
                    assert_eq!(sa.kind(), sb.kind());
                }
            }
        }
    }

    #[test]
    fn test_truncated_file_is_io_error() {
        let mut bytes = Vec::new();
        BinaryWriter::default().write_to(&mixed_table(), &mut bytes).unwrap();
        for cut in [0, 3, 9, bytes.len() / 2, bytes.len() - 1] {
            assert!(read_bytes(&bytes[..cut]).unwrap_err().is_io(), "cut at {cut}");
        }
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = Vec::new();
        BinaryWriter::default().write_to(&mixed_table(), &mut bytes).unwrap();
        bytes.push(0);
        assert!(read_bytes(&bytes).unwrap_err().is_format());
    }

    #[test]
    fn test_unknown_type_and_tag() {
        let seg = [0u8, 1, 0, 0, 0];
        assert!(read_bytes(&one_column("int", false, 1, &seg)).is_ok());
        assert!(read_bytes(&one_column("decimal", false, 1, &seg)).unwrap_err().is_format());
        let seg = [7u8, 1, 0, 0, 0];
        assert!(read_bytes(&one_column("int", false, 1, &seg)).unwrap_err().is_format());
    }

    #[test]
    fn test_dictionary_validation() {
        // width, size 1, dictionary [5], then indices.
        let dict = |width: u8, ids: &[u8]| {
            let mut seg = vec![1u8, width, 1, 0, 0, 0, 5, 0, 0, 0];
            seg.extend_from_slice(ids);
            seg
        };
        assert!(read_bytes(&one_column("int", true, 2, &dict(1, &[0, 1]))).is_ok());
        // Null id in a non-nullable column.
        assert!(read_bytes(&one_column("int", false, 2, &dict(1, &[0, 1]))).unwrap_err().is_format());
        // Index past the null id.
        assert!(read_bytes(&one_column("int", true, 2, &dict(1, &[0, 2]))).unwrap_err().is_format());
        assert!(read_bytes(&one_column("int", true, 2, &dict(3, &[0, 0, 0, 0, 0, 0]))).unwrap_err().is_format());
    }

    #[test]
    fn test_run_length_validation() {
        let rle = |ends: [u32; 2]| {
            let mut w = ByteWriter::new(Vec::new());
            w.write_scalar(2u8).unwrap();
            w.write_scalar(2u32).unwrap();
            w.write_array(&[1i32, 2]).unwrap();
            w.write_bool_array(&[false, false]).unwrap();
            w.write_array(&ends).unwrap();
            w.into_inner()
        };
        let table = read_bytes(&one_column("int", false, 4, &rle([1, 3]))).unwrap();
        assert_eq!(
            table.rows().unwrap(),
            vec![vec![Value::Int(1)], vec![Value::Int(1)], vec![Value::Int(2)], vec![Value::Int(2)]]
        );
        assert!(read_bytes(&one_column("int", false, 4, &rle([1, 2]))).unwrap_err().is_format());
        assert!(read_bytes(&one_column("int", false, 4, &rle([3, 3]))).unwrap_err().is_format());
    }

    #[test]
    fn test_runs_in_empty_chunk_rejected() {
        let mut seg = vec![2u8];
        seg.extend_from_slice(&1u32.to_le_bytes());
        seg.extend_from_slice(&9i32.to_le_bytes());
        seg.push(0);
        seg.extend_from_slice(&0u32.to_le_bytes());
        assert!(read_bytes(&one_column("int", false, 0, &seg)).unwrap_err().is_format());
    }

    #[test]
    fn test_chunk_larger_than_max_rejected() {
        let seg = [0u8; 1 + 17 * 4];
        assert!(read_bytes(&one_column("int", false, 17, &seg)).unwrap_err().is_format());
    }

    #[test]
    fn test_read_file_and_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.bin");
        crate::writer::write(&mixed_table(), &path).unwrap();
        assert_eq!(read(&path).unwrap().rows().unwrap(), mixed_table().rows().unwrap());

        let empty = dir.path().join("empty.bin");
        std::fs::write(&empty, b"").unwrap();
        assert!(read(&empty).unwrap_err().is_io());
        assert!(read(dir.path().join("nope.bin")).unwrap_err().is_io());
    }
}
