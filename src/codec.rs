// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Primitive codec: little-endian fixed-width scalars, raw arrays, one-byte booleans and
// length-prefixed string arrays. Readers consume exactly what the paired writer produced.

use crate::error::{Error, Result};
use std::io::Write;

/// A scalar with a fixed little-endian byte representation.
pub trait FixedWidth: Copy {
    const WIDTH: usize;

    fn put(self, out: &mut Vec<u8>);

    /// `bytes` is exactly `WIDTH` long.
    fn take(bytes: &[u8]) -> Self;
}

macro_rules! impl_fixed_width {
    ($($ty:ty),*) => {
        $(
            impl FixedWidth for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn put(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn take(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$ty>()];
                    buf.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(buf)
                }
            }
        )*
    };
}

impl_fixed_width!(u8, u16, u32, u64, i32, i64, f32, f64);

pub struct ByteWriter<W: Write> {
    inner: W,
    written: u64,
    max_string_len: u64,
}

impl<W: Write> ByteWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            written: 0,
            max_string_len: u64::MAX,
        }
    }

    /// Strings longer than `max_string_len` are refused, mirroring [`ByteReader::with_max_string_len`].
    pub fn with_max_string_len(mut self, max_string_len: u64) -> Self {
        self.max_string_len = max_string_len;
        self
    }

    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    pub fn write_scalar<T: FixedWidth>(&mut self, value: T) -> Result<()> {
        let mut buf = Vec::with_capacity(T::WIDTH);
        value.put(&mut buf);
        self.write_raw(&buf)
    }

    pub fn write_array<T: FixedWidth>(&mut self, values: &[T]) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        let mut buf = Vec::with_capacity(values.len() * T::WIDTH);
        for &v in values {
            v.put(&mut buf);
        }
        self.write_raw(&buf)
    }

    pub fn write_bool_array(&mut self, values: &[bool]) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        let buf: Vec<u8> = values.iter().map(|&b| b as u8).collect();
        self.write_raw(&buf)
    }

    /// Writes one u64 length per string, then all string bytes back to back.
    ///
    /// The lengths pass also sums the payload size so the payload buffer is allocated once and
    /// filled once. An all-empty array writes no payload bytes at all.
    pub fn write_string_array<S: AsRef<str>>(&mut self, values: &[S]) -> Result<()> {
        let mut lengths = Vec::with_capacity(values.len());
        let mut total = 0usize;
        for s in values {
            let len = s.as_ref().len();
            if len as u64 > self.max_string_len {
                return Err(Error::format(format!(
                    "string length {len} exceeds limit {}",
                    self.max_string_len
                )));
            }
            lengths.push(len as u64);
            total += len;
        }
        self.write_array(&lengths)?;

        if total == 0 {
            return Ok(());
        }
        let mut payload = Vec::with_capacity(total);
        for s in values {
            payload.extend_from_slice(s.as_ref().as_bytes());
        }
        debug_assert_eq!(payload.len(), total);
        self.write_raw(&payload)
    }
}

pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
    max_string_len: u64,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            max_string_len: u64::MAX,
        }
    }

    pub fn with_max_string_len(mut self, max_string_len: u64) -> Self {
        self.max_string_len = max_string_len;
        self
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(Error::eof("unexpected end of input"));
        }
        let out = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    pub fn read_scalar<T: FixedWidth>(&mut self) -> Result<T> {
        let bytes = self.take(T::WIDTH)?;
        Ok(T::take(bytes))
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.read_scalar()
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.read_scalar()
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_scalar()
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.read_scalar()
    }

    pub fn read_array<T: FixedWidth>(&mut self, count: usize) -> Result<Vec<T>> {
        let len = count
            .checked_mul(T::WIDTH)
            .ok_or_else(|| Error::eof("array length overflows input"))?;
        let bytes = self.take(len)?;
        Ok(bytes.chunks_exact(T::WIDTH).map(T::take).collect())
    }

    pub fn read_bool_array(&mut self, count: usize) -> Result<Vec<bool>> {
        let bytes = self.take(count)?;
        bytes
            .iter()
            .map(|&b| match b {
                0 => Ok(false),
                1 => Ok(true),
                other => Err(Error::format(format!("invalid boolean byte {other:#04x}"))),
            })
            .collect()
    }

    pub fn read_string_array(&mut self, count: usize) -> Result<Vec<String>> {
        let lengths: Vec<u64> = self.read_array(count)?;
        let mut total = 0usize;
        for &len in &lengths {
            if len > self.max_string_len {
                return Err(Error::format(format!(
                    "string length {len} exceeds limit {}",
                    self.max_string_len
                )));
            }
            total = total
                .checked_add(len as usize)
                .ok_or_else(|| Error::eof("string payload overflows input"))?;
        }
        let payload = self.take(total)?;

        let mut out = Vec::with_capacity(count);
        let mut start = 0usize;
        for len in lengths {
            let end = start + len as usize;
            let s = std::str::from_utf8(&payload[start..end])
                .map_err(|_| Error::format("invalid utf-8 in string array"))?;
            out.push(s.to_string());
            start = end;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars_are_little_endian() {
        let mut w = ByteWriter::new(Vec::new());
        w.write_scalar(0x0102_0304u32).unwrap();
        w.write_scalar(0x0506u16).unwrap();
        w.write_scalar(-1i32).unwrap();
        assert_eq!(w.bytes_written(), 10);
        let bytes = w.into_inner();
        assert_eq!(&bytes[0..4], &[4, 3, 2, 1]);
        assert_eq!(&bytes[4..6], &[6, 5]);
        assert_eq!(&bytes[6..10], &[0xff; 4]);

        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.read_u32().unwrap(), 0x0102_0304);
        assert_eq!(r.read_u16().unwrap(), 0x0506);
        assert_eq!(r.read_scalar::<i32>().unwrap(), -1);
        assert!(r.is_empty());
    }

    #[test]
    fn test_bool_array_one_byte_each() {
        let mut w = ByteWriter::new(Vec::new());
        w.write_bool_array(&[true, false, true]).unwrap();
        let bytes = w.into_inner();
        assert_eq!(bytes, vec![1, 0, 1]);

        let mut r = ByteReader::new(&[1, 2]);
        assert!(r.read_bool_array(2).unwrap_err().is_format());
    }

    #[test]
    fn test_string_array_layout() {
        let mut w = ByteWriter::new(Vec::new());
        w.write_string_array(&["ab", "", "cde"]).unwrap();
        let bytes = w.into_inner();
        assert_eq!(bytes.len(), 3 * 8 + 5);
        assert_eq!(&bytes[0..8], &2u64.to_le_bytes());
        assert_eq!(&bytes[8..16], &0u64.to_le_bytes());
        assert_eq!(&bytes[16..24], &3u64.to_le_bytes());
        assert_eq!(&bytes[24..], b"abcde");

        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.read_string_array(3).unwrap(), vec!["ab", "", "cde"]);
        assert!(r.is_empty());
    }

    #[test]
    fn test_all_empty_strings_write_no_payload() {
        let mut w = ByteWriter::new(Vec::new());
        w.write_string_array(&["", "", "", ""]).unwrap();
        let bytes = w.into_inner();
        assert_eq!(bytes, vec![0u8; 4 * 8]);
    }

    #[test]
    fn test_truncated_input_is_io_error() {
        let mut r = ByteReader::new(&[1, 2, 3]);
        let err = r.read_u32().unwrap_err();
        match err {
            Error::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
            other => panic!("unexpected error {other:?}"),
        }

        let mut w = ByteWriter::new(Vec::new());
        w.write_string_array(&["hello"]).unwrap();
        let bytes = w.into_inner();
        let mut r = ByteReader::new(&bytes[..bytes.len() - 1]);
        assert!(r.read_string_array(1).unwrap_err().is_io());
    }

    #[test]
    fn test_string_limit_applies_to_writes() {
        let mut w = ByteWriter::new(Vec::new()).with_max_string_len(4);
        w.write_string_array(&["four", ""]).unwrap();
        assert!(w.write_string_array(&["five5"]).unwrap_err().is_format());
        // Nothing of the refused array reaches the output.
        assert_eq!(w.bytes_written(), 2 * 8 + 4);

        let bytes = w.into_inner();
        let mut r = ByteReader::new(&bytes).with_max_string_len(4);
        assert_eq!(r.read_string_array(2).unwrap(), vec!["four", ""]);
    }

    #[test]
    fn test_string_limit_rejects_oversized_length() {
        let mut w = ByteWriter::new(Vec::new());
        w.write_string_array(&["toolong"]).unwrap();
        let bytes = w.into_inner();
        let mut r = ByteReader::new(&bytes).with_max_string_len(4);
        assert!(r.read_string_array(1).unwrap_err().is_format());
    }
}
