// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Fixed-size byte-aligned vectors for dictionary attribute vectors.

use crate::codec::{ByteReader, ByteWriter};
use crate::error::{Error, Result};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorWidth {
    U8,
    U16,
    U32,
}

impl VectorWidth {
    pub fn bytes(self) -> u8 {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }

    pub fn from_byte(width: u8) -> Result<Self> {
        match width {
            1 => Ok(Self::U8),
            2 => Ok(Self::U16),
            4 => Ok(Self::U32),
            other => Err(Error::format(format!(
                "unsupported attribute vector width {other}"
            ))),
        }
    }

    fn max_value(self) -> u32 {
        match self {
            Self::U8 => u8::MAX as u32,
            Self::U16 => u16::MAX as u32,
            Self::U32 => u32::MAX,
        }
    }
}

/// Narrowest width able to hold `max_index`.
pub fn select_width(max_index: usize) -> VectorWidth {
    if max_index <= u8::MAX as usize {
        VectorWidth::U8
    } else if max_index <= u16::MAX as usize {
        VectorWidth::U16
    } else {
        VectorWidth::U32
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompressedVector {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl CompressedVector {
    pub fn width(&self) -> VectorWidth {
        match self {
            Self::U8(_) => VectorWidth::U8,
            Self::U16(_) => VectorWidth::U16,
            Self::U32(_) => VectorWidth::U32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn get(&self, idx: usize) -> Option<u32> {
        match self {
            Self::U8(v) => v.get(idx).map(|&x| x as u32),
            Self::U16(v) => v.get(idx).map(|&x| x as u32),
            Self::U32(v) => v.get(idx).copied(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    pub fn max(&self) -> Option<u32> {
        self.iter().max()
    }

    pub fn write_to<W: Write>(&self, out: &mut ByteWriter<W>) -> Result<()> {
        match self {
            Self::U8(v) => out.write_array(v),
            Self::U16(v) => out.write_array(v),
            Self::U32(v) => out.write_array(v),
        }
    }
}

/// Re-encodes `values` at `width`. Indices that do not fit are a caller bug and are rejected
/// instead of truncated.
pub fn pack(values: &[u32], width: VectorWidth) -> Result<CompressedVector> {
    let limit = width.max_value();
    if let Some(&bad) = values.iter().find(|&&v| v > limit) {
        return Err(Error::format(format!(
            "index {bad} does not fit a {}-byte attribute vector",
            width.bytes()
        )));
    }
    Ok(match width {
        VectorWidth::U8 => CompressedVector::U8(values.iter().map(|&v| v as u8).collect()),
        VectorWidth::U16 => CompressedVector::U16(values.iter().map(|&v| v as u16).collect()),
        VectorWidth::U32 => CompressedVector::U32(values.to_vec()),
    })
}

pub fn unpack(reader: &mut ByteReader<'_>, width: VectorWidth, count: usize) -> Result<CompressedVector> {
    Ok(match width {
        VectorWidth::U8 => CompressedVector::U8(reader.read_array(count)?),
        VectorWidth::U16 => CompressedVector::U16(reader.read_array(count)?),
        VectorWidth::U32 => CompressedVector::U32(reader.read_array(count)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_width_boundaries() {
        assert_eq!(select_width(0), VectorWidth::U8);
        assert_eq!(select_width(255), VectorWidth::U8);
        assert_eq!(select_width(256), VectorWidth::U16);
        assert_eq!(select_width(65_535), VectorWidth::U16);
        assert_eq!(select_width(65_536), VectorWidth::U32);
        assert_eq!(select_width(usize::MAX), VectorWidth::U32);
    }

    #[test]
    fn test_from_byte_rejects_other_widths() {
        for w in [0u8, 3, 5, 8, 255] {
            assert!(VectorWidth::from_byte(w).unwrap_err().is_format());
        }
        assert_eq!(VectorWidth::from_byte(2).unwrap(), VectorWidth::U16);
    }

    #[test]
    fn test_pack_writes_declared_width() {
        let packed = pack(&[1, 300, 2], VectorWidth::U16).unwrap();
        let mut w = ByteWriter::new(Vec::new());
        packed.write_to(&mut w).unwrap();
        let bytes = w.into_inner();
        assert_eq!(bytes, vec![1, 0, 0x2c, 0x01, 2, 0]);

        let mut r = ByteReader::new(&bytes);
        let back = unpack(&mut r, VectorWidth::U16, 3).unwrap();
        assert_eq!(back, packed);
        assert_eq!(back.iter().collect::<Vec<_>>(), vec![1, 300, 2]);
        assert_eq!(back.max(), Some(300));
    }

    #[test]
    fn test_pack_rejects_overflowing_index() {
        assert!(pack(&[256], VectorWidth::U8).unwrap_err().is_format());
        assert!(pack(&[65_536], VectorWidth::U16).is_err());
        assert!(pack(&[u32::MAX], VectorWidth::U32).is_ok());
    }
}
