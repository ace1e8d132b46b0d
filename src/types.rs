// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::codec::{ByteReader, ByteWriter};
use crate::error::{Error, Result};
use crate::segment::{AnySegment, Segment};
use std::cmp::Ordering;
use std::fmt;
use std::io::Write;

pub type ChunkId = u32;
pub type ColumnId = u16;
pub type ChunkOffset = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Int,
    Long,
    Float,
    Double,
    String,
}

impl DataType {
    pub const ALL: [DataType; 5] = [
        DataType::Int,
        DataType::Long,
        DataType::Float,
        DataType::Double,
        DataType::String,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::String => "string",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "int" => Ok(Self::Int),
            "long" => Ok(Self::Long),
            "float" => Ok(Self::Float),
            "double" => Ok(Self::Double),
            "string" => Ok(Self::String),
            other => Err(Error::format(format!("unknown column type {other:?}"))),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// `None` for NULL, which fits every type.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Int(_) => Some(DataType::Int),
            Value::Long(_) => Some(DataType::Long),
            Value::Float(_) => Some(DataType::Float),
            Value::Double(_) => Some(DataType::Double),
            Value::String(_) => Some(DataType::String),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(v) => write!(f, "{v}"),
            Value::Long(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::String(v) => f.write_str(v),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
        }
    }
}

/// Position of a row inside a referenced table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowId {
    pub chunk_id: ChunkId,
    pub chunk_offset: ChunkOffset,
}

/// Row id of a row that does not exist in the referenced table (e.g. the outer side of a join).
pub const NULL_ROW_ID: RowId = RowId {
    chunk_id: ChunkId::MAX,
    chunk_offset: ChunkOffset::MAX,
};

impl RowId {
    pub fn new(chunk_id: ChunkId, chunk_offset: ChunkOffset) -> Self {
        Self {
            chunk_id,
            chunk_offset,
        }
    }

    pub fn is_null(&self) -> bool {
        *self == NULL_ROW_ID
    }
}

/// Rust type backing one [`DataType`], with its on-disk array codec.
pub trait ColumnValue: Clone + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    const DATA_TYPE: DataType;

    /// Total order used to sort dictionaries.
    fn compare(&self, other: &Self) -> Ordering;

    fn write_values<W: Write>(out: &mut ByteWriter<W>, values: &[Self]) -> Result<()>;

    fn read_values(reader: &mut ByteReader<'_>, count: usize) -> Result<Vec<Self>>;

    fn into_value(self) -> Value;

    /// `None` for NULL or a value of another type.
    fn from_value(value: &Value) -> Option<Self>;

    fn wrap(segment: Segment<Self>) -> AnySegment;
}

macro_rules! impl_fixed_column_value {
    ($ty:ty, $variant:ident, $cmp:expr) => {
        impl ColumnValue for $ty {
            const DATA_TYPE: DataType = DataType::$variant;

            fn compare(&self, other: &Self) -> Ordering {
                $cmp(self, other)
            }

            fn write_values<W: Write>(out: &mut ByteWriter<W>, values: &[Self]) -> Result<()> {
                out.write_array(values)
            }

            fn read_values(reader: &mut ByteReader<'_>, count: usize) -> Result<Vec<Self>> {
                reader.read_array(count)
            }

            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(*v),
                    _ => None,
                }
            }

            fn wrap(segment: Segment<Self>) -> AnySegment {
                AnySegment::$variant(segment)
            }
        }
    };
}

impl_fixed_column_value!(i32, Int, |a: &i32, b: &i32| a.cmp(b));
impl_fixed_column_value!(i64, Long, |a: &i64, b: &i64| a.cmp(b));
impl_fixed_column_value!(f32, Float, |a: &f32, b: &f32| a.total_cmp(b));
impl_fixed_column_value!(f64, Double, |a: &f64, b: &f64| a.total_cmp(b));

impl ColumnValue for String {
    const DATA_TYPE: DataType = DataType::String;

    fn compare(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn write_values<W: Write>(out: &mut ByteWriter<W>, values: &[Self]) -> Result<()> {
        out.write_string_array(values)
    }

    fn read_values(reader: &mut ByteReader<'_>, count: usize) -> Result<Vec<Self>> {
        reader.read_string_array(count)
    }

    fn into_value(self) -> Value {
        Value::String(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(v) => Some(v.clone()),
            _ => None,
        }
    }

    fn wrap(segment: Segment<Self>) -> AnySegment {
        AnySegment::String(segment)
    }
}
