// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Segment serializer: one tag byte followed by the kind-specific payload.

use crate::codec::ByteWriter;
use crate::encoding::EncodingType;
use crate::error::{Error, Result};
use crate::resolve::{materialize, ReferenceResolver};
use crate::segment::{AnySegment, DictionarySegment, RunLengthSegment, Segment, ValueSegment};
use crate::types::ColumnValue;
use std::io::Write;

pub struct SegmentSerializer<'r> {
    resolver: &'r dyn ReferenceResolver,
}

impl<'r> SegmentSerializer<'r> {
    pub fn new(resolver: &'r dyn ReferenceResolver) -> Self {
        Self { resolver }
    }

    pub fn write_any<W: Write>(&self, out: &mut ByteWriter<W>, segment: &AnySegment, nullable: bool) -> Result<()> {
        crate::with_segment!(segment, s => self.write_segment(out, s, nullable))
    }

    pub fn write_segment<T: ColumnValue, W: Write>(
        &self,
        out: &mut ByteWriter<W>,
        segment: &Segment<T>,
        nullable: bool,
    ) -> Result<()> {
        segment.validate(nullable)?;
        match segment {
            Segment::Value(s) => write_value(out, s, nullable),
            Segment::Dictionary(s) => write_dictionary(out, s),
            Segment::RunLength(s) => write_run_length(out, s),
            Segment::Reference(s) => {
                // Persisted as the plain segment it resolves to.
                let dense = materialize::<T>(s, self.resolver, nullable)?;
                write_value(out, &dense, nullable)
            }
        }
    }
}

fn write_value<T: ColumnValue, W: Write>(out: &mut ByteWriter<W>, s: &ValueSegment<T>, nullable: bool) -> Result<()> {
    out.write_scalar(EncodingType::Unencoded.tag())?;
    match (s.nulls(), nullable) {
        (Some(nulls), true) => out.write_bool_array(nulls)?,
        (None, false) => {}
        _ => {
            return Err(Error::format(
                "value segment null flags disagree with column nullability",
            ))
        }
    }
    T::write_values(out, s.values())
}

fn write_dictionary<T: ColumnValue, W: Write>(out: &mut ByteWriter<W>, s: &DictionarySegment<T>) -> Result<()> {
    let size = u32::try_from(s.dictionary().len())
        .map_err(|_| Error::format("dictionary exceeds u32::MAX entries"))?;
    out.write_scalar(EncodingType::Dictionary.tag())?;
    out.write_scalar(s.attribute_vector().width().bytes())?;
    out.write_scalar(size)?;
    T::write_values(out, s.dictionary())?;
    s.attribute_vector().write_to(out)
}

fn write_run_length<T: ColumnValue, W: Write>(out: &mut ByteWriter<W>, s: &RunLengthSegment<T>) -> Result<()> {
    let runs = u32::try_from(s.run_count())
        .map_err(|_| Error::format("run count exceeds u32::MAX"))?;
    out.write_scalar(EncodingType::RunLength.tag())?;
    out.write_scalar(runs)?;
    T::write_values(out, s.values())?;
    out.write_bool_array(s.null_values())?;
    out.write_array(s.end_positions())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::TableResolver;
    use crate::table::TableBuilder;
    use crate::types::{ColumnDefinition, DataType, RowId, Value};
    use crate::vector::{pack, VectorWidth};
    use std::sync::Arc;

    fn serialize(segment: &AnySegment, nullable: bool) -> Result<Vec<u8>> {
        let mut out = ByteWriter::new(Vec::new());
        SegmentSerializer::new(&TableResolver).write_any(&mut out, segment, nullable)?;
        Ok(out.into_inner())
    }

    #[test]
    fn test_value_segment_layout() {
        let seg: AnySegment = ValueSegment::new(vec![7i32, 0], Some(vec![false, true])).unwrap().into();
        let bytes = serialize(&seg, true).unwrap();
        let mut expected = vec![0u8, 0, 1];
        expected.extend_from_slice(&7i32.to_le_bytes());
        expected.extend_from_slice(&0i32.to_le_bytes());
        assert_eq!(bytes, expected);

        // Mismatched nullability is rejected rather than written.
        assert!(serialize(&seg, false).unwrap_err().is_format());
    }

    #[test]
    fn test_dictionary_layout() {
        let av = pack(&[1, 0, 1], VectorWidth::U8).unwrap();
        let seg: AnySegment = DictionarySegment::new(vec![10i64, 20], av).unwrap().into();
        let bytes = serialize(&seg, false).unwrap();
        let mut expected = vec![1u8, 1];
        expected.extend_from_slice(&2u32.to_le_bytes());
        expected.extend_from_slice(&10i64.to_le_bytes());
        expected.extend_from_slice(&20i64.to_le_bytes());
        expected.extend_from_slice(&[1, 0, 1]);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_run_length_layout() {
        let seg: AnySegment = RunLengthSegment::new(
            vec![0i32, 2, 0, 2],
            vec![true, false, true, false],
            vec![0, 1, 3, 4],
        )
        .unwrap()
        .into();
        let bytes = serialize(&seg, true).unwrap();
        let mut expected = vec![2u8];
        expected.extend_from_slice(&4u32.to_le_bytes());
        for v in [0i32, 2, 0, 2] {
            expected.extend_from_slice(&v.to_le_bytes());
        }
        expected.extend_from_slice(&[1, 0, 1, 0]);
        for e in [0u32, 1, 3, 4] {
            expected.extend_from_slice(&e.to_le_bytes());
        }
        assert_eq!(bytes, expected);
        assert!(serialize(&seg, false).unwrap_err().is_format());
    }

    #[test]
    fn test_reference_written_as_equivalent_value_segment() {
        let mut b = TableBuilder::new(vec![ColumnDefinition::new("s", DataType::String, true)], 4);
        for v in [Value::from("one"), Value::Null, Value::from(""), Value::from("four")] {
            b.append(vec![v]).unwrap();
        }
        let source = Arc::new(b.finish().unwrap());
        let positions = Arc::new(vec![RowId::new(0, 3), RowId::new(0, 1), RowId::new(0, 0)]);
        let reference = AnySegment::reference(source, 0, positions).unwrap();

        let plain: AnySegment = ValueSegment::new(
            vec!["four".to_string(), String::new(), "one".to_string()],
            Some(vec![false, true, false]),
        )
        .unwrap()
        .into();
        assert_eq!(serialize(&reference, true).unwrap(), serialize(&plain, true).unwrap());
    }
}
