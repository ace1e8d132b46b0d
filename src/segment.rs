// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Column storage within one chunk. `Segment<T>` is the tagged union over segment kinds for one
// value type; `AnySegment` resolves the value type at runtime.

use crate::error::{Error, Result};
use crate::resolve::{ReferenceResolver, TableResolver};
use crate::table::Table;
use crate::types::{ChunkOffset, ColumnId, ColumnValue, DataType, RowId, Value};
use crate::vector::CompressedVector;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Value,
    Dictionary,
    RunLength,
    Reference,
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Value => "value",
            Self::Dictionary => "dictionary",
            Self::RunLength => "run-length",
            Self::Reference => "reference",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueSegment<T> {
    values: Vec<T>,
    nulls: Option<Vec<bool>>,
}

impl<T: ColumnValue> ValueSegment<T> {
    /// Null rows carry `T::default()` in `values`.
    pub fn new(values: Vec<T>, nulls: Option<Vec<bool>>) -> Result<Self> {
        if let Some(nulls) = &nulls {
            if nulls.len() != values.len() {
                return Err(Error::format(format!(
                    "null flags ({}) do not match values ({})",
                    nulls.len(),
                    values.len()
                )));
            }
        }
        Ok(Self { values, nulls })
    }

    pub fn non_nullable(values: Vec<T>) -> Self {
        Self {
            values,
            nulls: None,
        }
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn nulls(&self) -> Option<&[bool]> {
        self.nulls.as_deref()
    }

    pub fn is_nullable(&self) -> bool {
        self.nulls.is_some()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn get(&self, offset: usize) -> Option<T> {
        match &self.nulls {
            Some(nulls) if nulls[offset] => None,
            _ => Some(self.values[offset].clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DictionarySegment<T> {
    dictionary: Vec<T>,
    attribute_vector: CompressedVector,
}

impl<T: ColumnValue> DictionarySegment<T> {
    /// Every index must be `<= dictionary.len()`; the index `dictionary.len()` marks a NULL row.
    pub fn new(dictionary: Vec<T>, attribute_vector: CompressedVector) -> Result<Self> {
        let null_id = dictionary.len();
        if let Some(max) = attribute_vector.max() {
            if max as usize > null_id {
                return Err(Error::format(format!(
                    "dictionary index {max} out of range for dictionary of size {null_id}"
                )));
            }
        }
        Ok(Self {
            dictionary,
            attribute_vector,
        })
    }

    pub fn dictionary(&self) -> &[T] {
        &self.dictionary
    }

    pub fn attribute_vector(&self) -> &CompressedVector {
        &self.attribute_vector
    }

    pub fn null_value_id(&self) -> u32 {
        self.dictionary.len() as u32
    }

    pub fn len(&self) -> usize {
        self.attribute_vector.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attribute_vector.is_empty()
    }

    fn has_nulls(&self) -> bool {
        let null_id = self.null_value_id();
        self.attribute_vector.iter().any(|id| id == null_id)
    }

    fn get(&self, offset: usize) -> Option<T> {
        let id = self.attribute_vector.get(offset)?;
        self.dictionary.get(id as usize).cloned()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunLengthSegment<T> {
    values: Vec<T>,
    null_values: Vec<bool>,
    end_positions: Vec<ChunkOffset>,
}

impl<T: ColumnValue> RunLengthSegment<T> {
    pub fn new(values: Vec<T>, null_values: Vec<bool>, end_positions: Vec<ChunkOffset>) -> Result<Self> {
        if values.len() != null_values.len() || values.len() != end_positions.len() {
            return Err(Error::format(format!(
                "run arrays differ in length: values {}, nulls {}, ends {}",
                values.len(),
                null_values.len(),
                end_positions.len()
            )));
        }
        if end_positions.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::format("run end positions are not strictly increasing"));
        }
        Ok(Self {
            values,
            null_values,
            end_positions,
        })
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn null_values(&self) -> &[bool] {
        &self.null_values
    }

    pub fn end_positions(&self) -> &[ChunkOffset] {
        &self.end_positions
    }

    pub fn run_count(&self) -> usize {
        self.values.len()
    }

    /// Rows covered, i.e. last end position + 1.
    pub fn len(&self) -> usize {
        self.end_positions.last().map_or(0, |&e| e as usize + 1)
    }

    pub fn is_empty(&self) -> bool {
        self.end_positions.is_empty()
    }

    fn get(&self, offset: usize) -> Option<T> {
        let run = self
            .end_positions
            .partition_point(|&end| (end as usize) < offset);
        if self.null_values[run] {
            None
        } else {
            Some(self.values[run].clone())
        }
    }
}

/// Rows of another table's column, addressed by position. Never persisted as such.
#[derive(Debug, Clone)]
pub struct ReferenceSegment {
    table: Arc<Table>,
    column: ColumnId,
    positions: Arc<Vec<RowId>>,
}

impl ReferenceSegment {
    pub fn new(table: Arc<Table>, column: ColumnId, positions: Arc<Vec<RowId>>) -> Result<Self> {
        if column as usize >= table.column_count() {
            return Err(Error::format(format!(
                "referenced column {column} does not exist ({} columns)",
                table.column_count()
            )));
        }
        Ok(Self {
            table,
            column,
            positions,
        })
    }

    pub fn referenced_table(&self) -> &Arc<Table> {
        &self.table
    }

    pub fn referenced_column(&self) -> ColumnId {
        self.column
    }

    pub fn positions(&self) -> &[RowId] {
        &self.positions
    }

    pub fn data_type(&self) -> DataType {
        self.table.columns()[self.column as usize].data_type
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[derive(Debug, Clone)]
pub enum Segment<T: ColumnValue> {
    Value(ValueSegment<T>),
    Dictionary(DictionarySegment<T>),
    RunLength(RunLengthSegment<T>),
    Reference(ReferenceSegment),
}

impl<T: ColumnValue> Segment<T> {
    pub fn kind(&self) -> SegmentKind {
        match self {
            Segment::Value(_) => SegmentKind::Value,
            Segment::Dictionary(_) => SegmentKind::Dictionary,
            Segment::RunLength(_) => SegmentKind::RunLength,
            Segment::Reference(_) => SegmentKind::Reference,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Segment::Value(s) => s.len(),
            Segment::Dictionary(s) => s.len(),
            Segment::RunLength(s) => s.len(),
            Segment::Reference(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at `offset`, `None` for NULL. Reference rows are resolved through [`TableResolver`].
    pub fn get(&self, offset: usize) -> Result<Option<T>> {
        self.get_with(offset, &TableResolver)
    }

    /// Like [`Segment::get`], resolving reference rows through `resolver`.
    pub fn get_with(&self, offset: usize, resolver: &dyn ReferenceResolver) -> Result<Option<T>> {
        if offset >= self.len() {
            return Err(Error::format(format!(
                "offset {offset} out of range for segment of {} rows",
                self.len()
            )));
        }
        Ok(match self {
            Segment::Value(s) => s.get(offset),
            Segment::Dictionary(s) => s.get(offset),
            Segment::RunLength(s) => s.get(offset),
            Segment::Reference(s) => {
                let value = resolver.resolve(s, s.positions[offset])?;
                if value.is_null() {
                    None
                } else {
                    Some(T::from_value(&value).ok_or_else(|| {
                        Error::format(format!(
                            "referenced value {value:?} is not of type {}",
                            T::DATA_TYPE
                        ))
                    })?)
                }
            }
        })
    }

    /// Dense values (NULL rows hold `T::default()`) plus one null flag per row.
    pub fn decode(&self) -> Result<(Vec<T>, Vec<bool>)> {
        if let Segment::Reference(_) = self {
            return Err(Error::format("reference segments must be materialized first"));
        }
        let len = self.len();
        let mut values = Vec::with_capacity(len);
        let mut nulls = Vec::with_capacity(len);
        for offset in 0..len {
            match self.get(offset)? {
                Some(v) => {
                    values.push(v);
                    nulls.push(false);
                }
                None => {
                    values.push(T::default());
                    nulls.push(true);
                }
            }
        }
        Ok((values, nulls))
    }

    /// Checks the segment against its column definition.
    pub fn validate(&self, nullable: bool) -> Result<()> {
        match self {
            Segment::Value(s) => {
                if s.is_nullable() != nullable {
                    return Err(Error::format(format!(
                        "value segment null flags present = {}, column nullable = {nullable}",
                        s.is_nullable()
                    )));
                }
            }
            Segment::Dictionary(s) => {
                if !nullable && s.has_nulls() {
                    return Err(Error::format("NULL in dictionary segment of non-nullable column"));
                }
            }
            Segment::RunLength(s) => {
                if !nullable && s.null_values.iter().any(|&n| n) {
                    return Err(Error::format("NULL run in non-nullable column"));
                }
            }
            Segment::Reference(s) => {
                if s.data_type() != T::DATA_TYPE {
                    return Err(Error::format(format!(
                        "reference segment points at a {} column, expected {}",
                        s.data_type(),
                        T::DATA_TYPE
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub enum AnySegment {
    Int(Segment<i32>),
    Long(Segment<i64>),
    Float(Segment<f32>),
    Double(Segment<f64>),
    String(Segment<String>),
}

/// Runs `$body` with `$s` bound to the typed segment inside an [`AnySegment`].
#[macro_export]
macro_rules! with_segment {
    ($segment:expr, $s:ident => $body:expr) => {
        match $segment {
            $crate::segment::AnySegment::Int($s) => $body,
            $crate::segment::AnySegment::Long($s) => $body,
            $crate::segment::AnySegment::Float($s) => $body,
            $crate::segment::AnySegment::Double($s) => $body,
            $crate::segment::AnySegment::String($s) => $body,
        }
    };
}

impl AnySegment {
    /// A reference segment typed after the referenced column.
    pub fn reference(table: Arc<Table>, column: ColumnId, positions: Arc<Vec<RowId>>) -> Result<Self> {
        let segment = ReferenceSegment::new(table, column, positions)?;
        Ok(match segment.data_type() {
            DataType::Int => AnySegment::Int(Segment::Reference(segment)),
            DataType::Long => AnySegment::Long(Segment::Reference(segment)),
            DataType::Float => AnySegment::Float(Segment::Reference(segment)),
            DataType::Double => AnySegment::Double(Segment::Reference(segment)),
            DataType::String => AnySegment::String(Segment::Reference(segment)),
        })
    }

    pub fn data_type(&self) -> DataType {
        match self {
            AnySegment::Int(_) => DataType::Int,
            AnySegment::Long(_) => DataType::Long,
            AnySegment::Float(_) => DataType::Float,
            AnySegment::Double(_) => DataType::Double,
            AnySegment::String(_) => DataType::String,
        }
    }

    pub fn kind(&self) -> SegmentKind {
        with_segment!(self, s => s.kind())
    }

    pub fn len(&self) -> usize {
        with_segment!(self, s => s.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn value_at(&self, offset: usize) -> Result<Value> {
        self.value_at_with(offset, &TableResolver)
    }

    pub fn value_at_with(&self, offset: usize, resolver: &dyn ReferenceResolver) -> Result<Value> {
        with_segment!(self, s => Ok(s.get_with(offset, resolver)?.map_or(Value::Null, |v| v.into_value())))
    }

    pub fn validate(&self, nullable: bool) -> Result<()> {
        with_segment!(self, s => s.validate(nullable))
    }
}

impl<T: ColumnValue> From<ValueSegment<T>> for AnySegment {
    fn from(segment: ValueSegment<T>) -> Self {
        T::wrap(Segment::Value(segment))
    }
}

impl<T: ColumnValue> From<DictionarySegment<T>> for AnySegment {
    fn from(segment: DictionarySegment<T>) -> Self {
        T::wrap(Segment::Dictionary(segment))
    }
}

impl<T: ColumnValue> From<RunLengthSegment<T>> for AnySegment {
    fn from(segment: RunLengthSegment<T>) -> Self {
        T::wrap(Segment::RunLength(segment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::{pack, VectorWidth};

    #[test]
    fn test_value_segment_null_flags_must_match() {
        assert!(ValueSegment::new(vec![1i32, 2], Some(vec![false])).is_err());
        let seg = ValueSegment::new(vec![1i32, 0], Some(vec![false, true])).unwrap();
        let seg = Segment::Value(seg);
        assert_eq!(seg.get(0).unwrap(), Some(1));
        assert_eq!(seg.get(1).unwrap(), None);
        assert!(seg.get(2).is_err());
    }

    #[test]
    fn test_dictionary_lookup_and_null_id() {
        let av = pack(&[1, 0, 2, 1], VectorWidth::U8).unwrap();
        let seg = DictionarySegment::new(vec!["a".to_string(), "b".to_string()], av).unwrap();
        assert_eq!(seg.null_value_id(), 2);
        let seg = Segment::Dictionary(seg);
        assert_eq!(seg.get(0).unwrap(), Some("b".to_string()));
        assert_eq!(seg.get(2).unwrap(), None);
        assert!(seg.validate(true).is_ok());
        assert!(seg.validate(false).is_err());

        let av = pack(&[3], VectorWidth::U8).unwrap();
        assert!(DictionarySegment::new(vec![1i32, 2], av).unwrap_err().is_format());
    }

    #[test]
    fn test_run_length_lookup() {
        let seg = RunLengthSegment::new(
            vec![0i32, 2, 0, 2],
            vec![true, false, true, false],
            vec![0, 1, 3, 4],
        )
        .unwrap();
        assert_eq!(seg.len(), 5);
        let seg = Segment::RunLength(seg);
        let got: Vec<Option<i32>> = (0..5).map(|i| seg.get(i).unwrap()).collect();
        assert_eq!(got, vec![None, Some(2), None, None, Some(2)]);
    }

    #[test]
    fn test_run_length_rejects_non_monotonic_ends() {
        assert!(RunLengthSegment::new(vec![1i32, 2], vec![false, false], vec![3, 3]).is_err());
        assert!(RunLengthSegment::new(vec![1i32], vec![false, false], vec![3]).is_err());
    }

    #[test]
    fn test_any_segment_value_at() {
        let seg: AnySegment = ValueSegment::non_nullable(vec![1.5f64, 2.5]).into();
        assert_eq!(seg.data_type(), DataType::Double);
        assert_eq!(seg.kind(), SegmentKind::Value);
        assert_eq!(seg.value_at(1).unwrap(), Value::Double(2.5));
    }
}
