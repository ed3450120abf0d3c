// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Wire primitives: tags, variable-length integers, strings and cells.
//!
//! Integers use the "1-4" encoding: values below 128 take one byte, larger
//! values take four big-endian bytes with the top bit set. Everything else
//! is big-endian with no padding.

use crate::CodecError;
use byteorder::{BigEndian, ByteOrder};
use tensor_core::{bf16, CellType, CellValue};

pub(crate) const TAG_SPARSE: u8 = 1;
pub(crate) const TAG_DENSE: u8 = 2;
pub(crate) const TAG_MIXED: u8 = 3;
pub(crate) const TAG_TYPED_SPARSE: u8 = 5;
pub(crate) const TAG_TYPED_DENSE: u8 = 6;
pub(crate) const TAG_TYPED_MIXED: u8 = 7;

/// Largest value the variable-length integer can carry.
pub const MAX_VARINT: usize = 0x7fff_ffff;

/// Tag selection for [`encode_with`](crate::encode_with).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Legacy tags (no cell-type byte) for double values, extended tags for
    /// everything else.
    #[default]
    Compact,
    /// Always write the cell-type byte.
    Extended,
}

/// Value layout on the wire, derived from the tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Shape {
    Sparse,
    Dense,
    Mixed,
}

impl Shape {
    pub(crate) fn tag(self, typed: bool) -> u8 {
        match (self, typed) {
            (Shape::Sparse, false) => TAG_SPARSE,
            (Shape::Dense, false) => TAG_DENSE,
            (Shape::Mixed, false) => TAG_MIXED,
            (Shape::Sparse, true) => TAG_TYPED_SPARSE,
            (Shape::Dense, true) => TAG_TYPED_DENSE,
            (Shape::Mixed, true) => TAG_TYPED_MIXED,
        }
    }

    /// Returns the shape and whether a cell-type byte follows.
    pub(crate) fn from_tag(tag: u8) -> Result<(Shape, bool), CodecError> {
        match tag {
            TAG_SPARSE => Ok((Shape::Sparse, false)),
            TAG_DENSE => Ok((Shape::Dense, false)),
            TAG_MIXED => Ok((Shape::Mixed, false)),
            TAG_TYPED_SPARSE => Ok((Shape::Sparse, true)),
            TAG_TYPED_DENSE => Ok((Shape::Dense, true)),
            TAG_TYPED_MIXED => Ok((Shape::Mixed, true)),
            other => Err(CodecError::UnknownTag(other)),
        }
    }
}

/// Cursor over an input buffer.
///
/// A reader can hold several concatenated values;
/// [`decode_from`](crate::decode_from) consumes exactly one.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Offset of the next unread byte.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub(crate) fn rewind(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub(crate) fn take(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        if len > self.remaining() {
            return Err(CodecError::Truncated {
                offset: self.pos,
                needed: len,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Fails early if `len` more bytes cannot possibly be present.
    pub(crate) fn ensure(&self, len: usize) -> Result<(), CodecError> {
        if len > self.remaining() {
            return Err(CodecError::Truncated {
                offset: self.pos,
                needed: len,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn read_varint(&mut self) -> Result<usize, CodecError> {
        let first = *self.data.get(self.pos).ok_or(CodecError::Truncated {
            offset: self.pos,
            needed: 1,
            remaining: 0,
        })?;
        if first & 0x80 == 0 {
            self.pos += 1;
            return Ok(first as usize);
        }
        let bytes = self.take(4)?;
        Ok((BigEndian::read_u32(bytes) & 0x7fff_ffff) as usize)
    }

    pub(crate) fn read_string(&mut self) -> Result<&'a str, CodecError> {
        let len = self.read_varint()?;
        let offset = self.pos;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8 { offset })
    }
}

pub(crate) fn write_varint(out: &mut Vec<u8>, value: usize) -> Result<(), CodecError> {
    if value < 0x80 {
        out.push(value as u8);
        return Ok(());
    }
    if value > MAX_VARINT {
        return Err(CodecError::ValueTooLarge(value));
    }
    let mut buf = [0u8; 4];
    BigEndian::write_u32(&mut buf, value as u32 | 0x8000_0000);
    out.extend_from_slice(&buf);
    Ok(())
}

pub(crate) fn write_string(out: &mut Vec<u8>, s: &str) -> Result<(), CodecError> {
    write_varint(out, s.len())?;
    out.extend_from_slice(s.as_bytes());
    Ok(())
}

/// Big-endian cell encoding.
pub(crate) trait WireCell: CellValue {
    const WIRE_SIZE: usize;

    fn read(bytes: &[u8]) -> Self;

    fn write(self, out: &mut Vec<u8>);
}

impl WireCell for f64 {
    const WIRE_SIZE: usize = 8;
    fn read(bytes: &[u8]) -> Self {
        BigEndian::read_f64(bytes)
    }
    fn write(self, out: &mut Vec<u8>) {
        let mut buf = [0u8; 8];
        BigEndian::write_f64(&mut buf, self);
        out.extend_from_slice(&buf);
    }
}

impl WireCell for f32 {
    const WIRE_SIZE: usize = 4;
    fn read(bytes: &[u8]) -> Self {
        BigEndian::read_f32(bytes)
    }
    fn write(self, out: &mut Vec<u8>) {
        let mut buf = [0u8; 4];
        BigEndian::write_f32(&mut buf, self);
        out.extend_from_slice(&buf);
    }
}

impl WireCell for bf16 {
    const WIRE_SIZE: usize = 2;
    fn read(bytes: &[u8]) -> Self {
        bf16::from_bits(BigEndian::read_u16(bytes))
    }
    fn write(self, out: &mut Vec<u8>) {
        let mut buf = [0u8; 2];
        BigEndian::write_u16(&mut buf, self.to_bits());
        out.extend_from_slice(&buf);
    }
}

impl WireCell for i8 {
    const WIRE_SIZE: usize = 1;
    fn read(bytes: &[u8]) -> Self {
        bytes[0] as i8
    }
    fn write(self, out: &mut Vec<u8>) {
        out.push(self as u8);
    }
}

pub(crate) fn read_cell_type(reader: &mut Reader<'_>) -> Result<CellType, CodecError> {
    let byte = reader.read_u8()?;
    CellType::from_wire_id(byte).ok_or(CodecError::UnknownCellType(byte))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_boundaries() {
        let mut out = Vec::new();
        write_varint(&mut out, 0).unwrap();
        write_varint(&mut out, 127).unwrap();
        write_varint(&mut out, 128).unwrap();
        write_varint(&mut out, MAX_VARINT).unwrap();
        assert_eq!(
            out,
            vec![0x00, 0x7f, 0x80, 0x00, 0x00, 0x80, 0xff, 0xff, 0xff, 0xff]
        );

        let mut reader = Reader::new(&out);
        assert_eq!(reader.read_varint().unwrap(), 0);
        assert_eq!(reader.read_varint().unwrap(), 127);
        assert_eq!(reader.read_varint().unwrap(), 128);
        assert_eq!(reader.read_varint().unwrap(), MAX_VARINT);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_varint_too_large() {
        let mut out = Vec::new();
        assert_eq!(
            write_varint(&mut out, MAX_VARINT + 1),
            Err(CodecError::ValueTooLarge(MAX_VARINT + 1))
        );
    }

    #[test]
    fn test_truncated_varint() {
        let mut reader = Reader::new(&[0x80, 0x00]);
        assert!(matches!(
            reader.read_varint(),
            Err(CodecError::Truncated { needed: 4, .. })
        ));
        assert!(Reader::new(&[]).read_varint().is_err());
    }

    #[test]
    fn test_string_length_beyond_input() {
        let mut reader = Reader::new(&[5, b'a', b'b']);
        assert!(matches!(
            reader.read_string(),
            Err(CodecError::Truncated { needed: 5, remaining: 2, .. })
        ));
    }

    #[test]
    fn test_invalid_utf8() {
        let mut reader = Reader::new(&[2, 0xff, 0xfe]);
        assert_eq!(reader.read_string(), Err(CodecError::InvalidUtf8 { offset: 1 }));
    }

    #[test]
    fn test_tags() {
        for shape in [Shape::Sparse, Shape::Dense, Shape::Mixed] {
            for typed in [false, true] {
                assert_eq!(Shape::from_tag(shape.tag(typed)).unwrap(), (shape, typed));
            }
        }
        assert_eq!(Shape::from_tag(4), Err(CodecError::UnknownTag(4)));
        assert_eq!(Shape::from_tag(0), Err(CodecError::UnknownTag(0)));
    }

    #[test]
    fn test_cells_are_big_endian() {
        let mut out = Vec::new();
        1.0f64.write(&mut out);
        1.0f32.write(&mut out);
        (-2i8).write(&mut out);
        assert_eq!(
            out,
            vec![0x3f, 0xf0, 0, 0, 0, 0, 0, 0, 0x3f, 0x80, 0, 0, 0xfe]
        );
        assert_eq!(<f32 as WireCell>::read(&out[8..12]), 1.0);
    }
}
