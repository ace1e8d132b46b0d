// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Chunk encoder: rebuilds segments as plain, dictionary or run-length segments.

use crate::error::{Error, Result};
use crate::segment::{AnySegment, DictionarySegment, RunLengthSegment, Segment, ValueSegment};
use crate::table::{Chunk, Table};
use crate::types::{ChunkId, ChunkOffset, ColumnDefinition, ColumnValue};
use crate::vector::{pack, select_width};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Encoding of a persisted segment; the discriminant is the on-disk tag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EncodingType {
    Unencoded = 0,
    Dictionary = 1,
    RunLength = 2,
}

impl EncodingType {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(Self::Unencoded),
            1 => Ok(Self::Dictionary),
            2 => Ok(Self::RunLength),
            other => Err(Error::format(format!("unknown encoding tag {other}"))),
        }
    }
}

impl fmt::Display for EncodingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unencoded => "unencoded",
            Self::Dictionary => "dictionary",
            Self::RunLength => "runlength",
        })
    }
}

impl FromStr for EncodingType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unencoded" | "value" => Ok(Self::Unencoded),
            "dictionary" | "dict" => Ok(Self::Dictionary),
            "runlength" | "run-length" | "rle" => Ok(Self::RunLength),
            other => Err(format!("unknown encoding {other:?}")),
        }
    }
}

pub fn encode_segment<T: ColumnValue>(
    segment: &Segment<T>,
    encoding: EncodingType,
    nullable: bool,
) -> Result<Segment<T>> {
    let (values, nulls) = segment.decode()?;
    Ok(match encoding {
        EncodingType::Unencoded => {
            Segment::Value(ValueSegment::new(values, nullable.then_some(nulls))?)
        }
        EncodingType::Dictionary => Segment::Dictionary(dictionary_encode(values, &nulls)?),
        EncodingType::RunLength => Segment::RunLength(run_length_encode(values, &nulls)?),
    })
}

fn dictionary_encode<T: ColumnValue>(values: Vec<T>, nulls: &[bool]) -> Result<DictionarySegment<T>> {
    let mut dictionary: Vec<T> = values
        .iter()
        .zip(nulls)
        .filter(|&(_, &null)| !null)
        .map(|(v, _)| v.clone())
        .collect();
    dictionary.sort_by(|a, b| a.compare(b));
    dictionary.dedup_by(|a, b| a.compare(b) == Ordering::Equal);

    let null_id = u32::try_from(dictionary.len())
        .map_err(|_| Error::format("dictionary exceeds u32::MAX entries"))?;
    let mut ids = Vec::with_capacity(values.len());
    for (value, &null) in values.iter().zip(nulls) {
        if null {
            ids.push(null_id);
            continue;
        }
        match dictionary.binary_search_by(|probe| probe.compare(value)) {
            Ok(id) => ids.push(id as u32),
            Err(_) => return Err(Error::format("value missing from its own dictionary")),
        }
    }
    // The null id is the largest index that may appear.
    let width = select_width(dictionary.len());
    DictionarySegment::new(dictionary, pack(&ids, width)?)
}

fn run_length_encode<T: ColumnValue>(values: Vec<T>, nulls: &[bool]) -> Result<RunLengthSegment<T>> {
    let mut run_values: Vec<T> = Vec::new();
    let mut run_nulls: Vec<bool> = Vec::new();
    let mut ends: Vec<ChunkOffset> = Vec::new();

    for (offset, (value, &null)) in values.into_iter().zip(nulls).enumerate() {
        let offset = ChunkOffset::try_from(offset)
            .map_err(|_| Error::format("segment exceeds u32::MAX rows"))?;
        let extends = match (run_values.last(), run_nulls.last()) {
            (Some(_), Some(&true)) => null,
            (Some(prev), Some(&false)) => !null && prev.compare(&value) == Ordering::Equal,
            _ => false,
        };
        if extends {
            if let Some(end) = ends.last_mut() {
                *end = offset;
            }
            continue;
        }
        run_values.push(if null { T::default() } else { value });
        run_nulls.push(null);
        ends.push(offset);
    }
    RunLengthSegment::new(run_values, run_nulls, ends)
}

fn encode_any<T: ColumnValue>(
    segment: &Segment<T>,
    encoding: EncodingType,
    nullable: bool,
) -> Result<AnySegment> {
    Ok(T::wrap(encode_segment(segment, encoding, nullable)?))
}

pub fn encode_chunk(chunk: &Chunk, columns: &[ColumnDefinition], encoding: EncodingType) -> Result<Chunk> {
    let segments = chunk
        .segments()
        .iter()
        .zip(columns)
        .map(|(segment, column)| {
            crate::with_segment!(segment, s => encode_any(s, encoding, column.nullable))
        })
        .collect::<Result<Vec<_>>>()?;
    Chunk::new(segments)
}

/// Encodes every chunk; chunks are processed in parallel and kept in order.
pub fn encode_all_chunks(table: &Table, encoding: EncodingType) -> Result<Table> {
    let chunks = table
        .chunks()
        .par_iter()
        .map(|chunk| encode_chunk(chunk, table.columns(), encoding).map(Arc::new))
        .collect::<Result<Vec<_>>>()?;
    tracing::debug!(chunks = chunks.len(), %encoding, "encoded table");
    Table::new(table.columns().to_vec(), table.max_chunk_size(), chunks)
}

/// Encodes only the listed chunks; the others are shared with `table`.
pub fn encode_chunks(table: &Table, chunk_ids: &[ChunkId], encoding: EncodingType) -> Result<Table> {
    if let Some(&missing) = chunk_ids.iter().find(|&&id| id as usize >= table.chunk_count()) {
        return Err(Error::format(format!(
            "chunk {missing} does not exist ({} chunks)",
            table.chunk_count()
        )));
    }
    let selected: HashSet<ChunkId> = chunk_ids.iter().copied().collect();
    let chunks = table
        .chunks()
        .par_iter()
        .enumerate()
        .map(|(idx, chunk)| {
            if selected.contains(&(idx as ChunkId)) {
                encode_chunk(chunk, table.columns(), encoding).map(Arc::new)
            } else {
                Ok(chunk.clone())
            }
        })
        .collect::<Result<Vec<_>>>()?;
    Table::new(table.columns().to_vec(), table.max_chunk_size(), chunks)
}
