// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::error::{Error, Result};
use crate::segment::{ReferenceSegment, SegmentKind, ValueSegment};
use crate::types::{ColumnValue, RowId, Value};

/// Maps a position of a reference segment to the concrete value it points at.
pub trait ReferenceResolver {
    fn resolve(&self, segment: &ReferenceSegment, row: RowId) -> Result<Value>;
}

/// Resolves positions through the referenced table's own segments.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableResolver;

impl ReferenceResolver for TableResolver {
    fn resolve(&self, segment: &ReferenceSegment, row: RowId) -> Result<Value> {
        if row.is_null() {
            return Ok(Value::Null);
        }
        let table = segment.referenced_table();
        let chunk = table.chunk(row.chunk_id).ok_or_else(|| {
            Error::format(format!(
                "row id points at chunk {} of a {}-chunk table",
                row.chunk_id,
                table.chunk_count()
            ))
        })?;
        let target = chunk.segment(segment.referenced_column());
        if target.kind() == SegmentKind::Reference {
            return Err(Error::format("reference segment points at another reference segment"));
        }
        target.value_at(row.chunk_offset as usize)
    }
}

/// Resolves every row of `segment` into a dense value segment.
///
/// NULLs survive materialization when `nullable`; a NULL in a non-nullable column is rejected.
pub fn materialize<T: ColumnValue>(
    segment: &ReferenceSegment,
    resolver: &dyn ReferenceResolver,
    nullable: bool,
) -> Result<ValueSegment<T>> {
    let mut values = Vec::with_capacity(segment.len());
    let mut nulls = if nullable {
        Some(Vec::with_capacity(segment.len()))
    } else {
        None
    };
    for &row in segment.positions() {
        let value = resolver.resolve(segment, row)?;
        if value.is_null() {
            let Some(nulls) = nulls.as_mut() else {
                return Err(Error::format(
                    "reference resolved to NULL in a non-nullable column",
                ));
            };
            nulls.push(true);
            values.push(T::default());
            continue;
        }
        let typed = T::from_value(&value).ok_or_else(|| {
            Error::format(format!(
                "referenced value {value:?} is not of type {}",
                T::DATA_TYPE
            ))
        })?;
        if let Some(nulls) = nulls.as_mut() {
            nulls.push(false);
        }
        values.push(typed);
    }
    ValueSegment::new(values, nulls)
}
