// SPDX-License-Identifier: AGPL-3.0-or-later
//
// segfile
// Columnar chunk/segment tables and their compact binary file format.

pub mod codec;
pub mod config;
pub mod encoding;
pub mod error;
pub mod export;
pub mod file_type;
pub mod logging;
pub mod reader;
pub mod resolve;
pub mod segment;
pub mod serializer;
pub mod table;
pub mod types;
pub mod vector;
pub mod writer;

pub use crate::config::{ExportOptions, ReaderOptions, WriterOptions};
pub use crate::encoding::{encode_all_chunks, encode_chunks, EncodingType};
pub use crate::error::{Error, Result};
pub use crate::export::{export_table, import_table};
pub use crate::file_type::FileType;
pub use crate::reader::{read, BinaryReader};
pub use crate::resolve::{ReferenceResolver, TableResolver};
pub use crate::segment::{AnySegment, Segment, SegmentKind};
pub use crate::table::{Chunk, Table, TableBuilder};
pub use crate::types::{ColumnDefinition, DataType, RowId, Value, NULL_ROW_ID};
pub use crate::writer::{write, BinaryWriter};
