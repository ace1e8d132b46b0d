// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::error::{Error, Result};
use crate::resolve::{ReferenceResolver, TableResolver};
use crate::segment::{AnySegment, ValueSegment};
use crate::types::{ChunkId, ColumnDefinition, ColumnId, ColumnValue, DataType, RowId, Value};
use std::sync::Arc;

/// One horizontal partition: exactly one segment per column, all of the same length.
#[derive(Debug, Clone)]
pub struct Chunk {
    segments: Vec<AnySegment>,
    size: u32,
}

impl Chunk {
    pub fn new(segments: Vec<AnySegment>) -> Result<Self> {
        let size = segments.first().map_or(0, |s| s.len());
        if let Some((idx, seg)) = segments.iter().enumerate().find(|(_, s)| s.len() != size) {
            return Err(Error::format(format!(
                "segment {idx} has {} rows, chunk has {size}",
                seg.len()
            )));
        }
        let size = u32::try_from(size)
            .map_err(|_| Error::format("chunk row count exceeds u32::MAX"))?;
        Ok(Self { segments, size })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn column_count(&self) -> usize {
        self.segments.len()
    }

    /// Panics if `column` is out of range.
    pub fn segment(&self, column: ColumnId) -> &AnySegment {
        &self.segments[column as usize]
    }

    pub fn segments(&self) -> &[AnySegment] {
        &self.segments
    }
}

#[derive(Debug, Clone)]
pub struct Table {
    columns: Vec<ColumnDefinition>,
    max_chunk_size: u32,
    chunks: Vec<Arc<Chunk>>,
}

impl Table {
    pub fn new(columns: Vec<ColumnDefinition>, max_chunk_size: u32, chunks: Vec<Arc<Chunk>>) -> Result<Self> {
        if columns.len() > ColumnId::MAX as usize {
            return Err(Error::format("too many columns"));
        }
        if u32::try_from(chunks.len()).is_err() {
            return Err(Error::format("too many chunks"));
        }
        for (chunk_id, chunk) in chunks.iter().enumerate() {
            if chunk.column_count() != columns.len() {
                return Err(Error::format(format!(
                    "chunk {chunk_id} has {} segments, table has {} columns",
                    chunk.column_count(),
                    columns.len()
                )));
            }
            if chunk.size() > max_chunk_size {
                return Err(Error::format(format!(
                    "chunk {chunk_id} holds {} rows, max chunk size is {max_chunk_size}",
                    chunk.size()
                )));
            }
            for (segment, column) in chunk.segments().iter().zip(&columns) {
                if segment.data_type() != column.data_type {
                    return Err(Error::format(format!(
                        "chunk {chunk_id} column {:?}: {} segment for {} column",
                        column.name,
                        segment.data_type(),
                        column.data_type
                    )));
                }
                segment.validate(column.nullable)?;
            }
        }
        Ok(Self {
            columns,
            max_chunk_size,
            chunks,
        })
    }

    /// A table of reference segments over `source`, one output chunk per position list.
    pub fn reference_view(source: &Arc<Table>, positions: Vec<Vec<RowId>>) -> Result<Self> {
        let mut chunks = Vec::with_capacity(positions.len());
        let mut max_chunk_size = source.max_chunk_size;
        for rows in positions {
            let rows = Arc::new(rows);
            let segments = (0..source.column_count())
                .map(|column| AnySegment::reference(source.clone(), column as ColumnId, rows.clone()))
                .collect::<Result<Vec<_>>>()?;
            let chunk = Chunk::new(segments)?;
            max_chunk_size = max_chunk_size.max(chunk.size());
            chunks.push(Arc::new(chunk));
        }
        Self::new(source.columns.clone(), max_chunk_size, chunks)
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn max_chunk_size(&self) -> u32 {
        self.max_chunk_size
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn chunk(&self, chunk_id: ChunkId) -> Option<&Arc<Chunk>> {
        self.chunks.get(chunk_id as usize)
    }

    pub fn chunks(&self) -> &[Arc<Chunk>] {
        &self.chunks
    }

    pub fn row_count(&self) -> u64 {
        self.chunks.iter().map(|c| c.size() as u64).sum()
    }

    /// All rows in chunk order, reference rows resolved through [`TableResolver`].
    /// Equality on this ignores encodings.
    pub fn rows(&self) -> Result<Vec<Vec<Value>>> {
        self.rows_with(&TableResolver)
    }

    pub fn rows_with(&self, resolver: &dyn ReferenceResolver) -> Result<Vec<Vec<Value>>> {
        let mut out = Vec::with_capacity(self.row_count() as usize);
        for chunk in &self.chunks {
            for offset in 0..chunk.size() as usize {
                let row = chunk
                    .segments()
                    .iter()
                    .map(|s| s.value_at_with(offset, resolver))
                    .collect::<Result<Vec<_>>>()?;
                out.push(row);
            }
        }
        Ok(out)
    }
}

/// Appends rows and cuts chunks of `max_chunk_size` value segments.
#[derive(Debug)]
pub struct TableBuilder {
    columns: Vec<ColumnDefinition>,
    max_chunk_size: u32,
    pending: Vec<Vec<Value>>,
    chunks: Vec<Arc<Chunk>>,
}

impl TableBuilder {
    pub fn new(columns: Vec<ColumnDefinition>, max_chunk_size: u32) -> Self {
        Self {
            columns,
            max_chunk_size: max_chunk_size.max(1),
            pending: Vec::new(),
            chunks: Vec::new(),
        }
    }

    pub fn append(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::format(format!(
                "row has {} values, table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        for (value, column) in row.iter().zip(&self.columns) {
            match value.data_type() {
                None if !column.nullable => {
                    return Err(Error::format(format!(
                        "NULL in non-nullable column {:?}",
                        column.name
                    )))
                }
                Some(dt) if dt != column.data_type => {
                    return Err(Error::format(format!(
                        "{dt} value in {} column {:?}",
                        column.data_type, column.name
                    )))
                }
                _ => {}
            }
        }
        self.pending.push(row);
        if self.pending.len() >= self.max_chunk_size as usize {
            self.cut_chunk()?;
        }
        Ok(())
    }

    fn cut_chunk(&mut self) -> Result<()> {
        let rows = std::mem::take(&mut self.pending);
        let segments = self
            .columns
            .iter()
            .enumerate()
            .map(|(idx, column)| build_value_segment(column, &rows, idx))
            .collect::<Result<Vec<_>>>()?;
        self.chunks.push(Arc::new(Chunk::new(segments)?));
        Ok(())
    }

    pub fn finish(mut self) -> Result<Table> {
        if !self.pending.is_empty() {
            self.cut_chunk()?;
        }
        Ok(Table {
            columns: self.columns,
            max_chunk_size: self.max_chunk_size,
            chunks: self.chunks,
        })
    }
}

fn build_value_segment(column: &ColumnDefinition, rows: &[Vec<Value>], idx: usize) -> Result<AnySegment> {
    fn typed<T: ColumnValue>(nullable: bool, rows: &[Vec<Value>], idx: usize) -> Result<AnySegment> {
        let values: Vec<T> = rows
            .iter()
            .map(|r| T::from_value(&r[idx]).unwrap_or_default())
            .collect();
        let nulls = nullable.then(|| rows.iter().map(|r| r[idx].is_null()).collect());
        Ok(ValueSegment::new(values, nulls)?.into())
    }

    match column.data_type {
        DataType::Int => typed::<i32>(column.nullable, rows, idx),
        DataType::Long => typed::<i64>(column.nullable, rows, idx),
        DataType::Float => typed::<f32>(column.nullable, rows, idx),
        DataType::Double => typed::<f64>(column.nullable, rows, idx),
        DataType::String => typed::<String>(column.nullable, rows, idx),
    }
}
