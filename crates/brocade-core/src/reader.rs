//! Sequential cursor over an input byte buffer.
//!
//! Every read is bounds-checked and reports truncation as
//! [`BrocadeError::UnexpectedEof`]. The reader never looks backwards; the
//! buffer is treated as owned-read-only for the duration of a decode.

use brocade_error::{BrocadeError, Result};
use brocade_types::{encoding, varint};

/// A sequential reader over a byte slice.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Create a reader positioned at the start of `buf`.
    pub const fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Whether the input is exhausted.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    /// Consume `n` bytes.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(BrocadeError::UnexpectedEof {
                needed: n - self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Consume one byte.
    pub fn byte(&mut self) -> Result<u8> {
        let slice = self.take(1)?;
        Ok(slice[0])
    }

    /// Consume a varint as `u64`.
    pub fn uvarint(&mut self) -> Result<u64> {
        let (value, consumed) =
            varint::read_uvarint(self.rest()).ok_or(BrocadeError::UnexpectedEof { needed: 1 })?;
        self.pos += consumed;
        Ok(value)
    }

    /// Consume a varint as `u128`.
    pub fn uvarint128(&mut self) -> Result<u128> {
        let (value, consumed) = varint::read_uvarint128(self.rest())
            .ok_or(BrocadeError::UnexpectedEof { needed: 1 })?;
        self.pos += consumed;
        Ok(value)
    }

    /// Consume a varint length prefix, bounded by the remaining input.
    pub fn length_prefix(&mut self) -> Result<usize> {
        let raw = self.uvarint()?;
        usize::try_from(raw).map_err(|_| BrocadeError::UnexpectedEof { needed: usize::MAX })
    }

    /// Consume a little-endian `u16`.
    pub fn u16_le(&mut self) -> Result<u16> {
        let slice = self.take(2)?;
        encoding::read_u16_le(slice).ok_or(BrocadeError::UnexpectedEof { needed: 2 })
    }

    /// Consume a little-endian `u32`.
    pub fn u32_le(&mut self) -> Result<u32> {
        let slice = self.take(4)?;
        encoding::read_u32_le(slice).ok_or(BrocadeError::UnexpectedEof { needed: 4 })
    }

    /// Consume a little-endian `u64`.
    pub fn u64_le(&mut self) -> Result<u64> {
        let slice = self.take(8)?;
        encoding::read_u64_le(slice).ok_or(BrocadeError::UnexpectedEof { needed: 8 })
    }

    /// Consume a 32-bit IEEE-754 float.
    pub fn f32_le(&mut self) -> Result<f32> {
        self.u32_le().map(f32::from_bits)
    }

    /// Consume a 64-bit IEEE-754 float.
    pub fn f64_le(&mut self) -> Result<f64> {
        self.u64_le().map(f64::from_bits)
    }

    /// Consume a boolean byte. Any nonzero value decodes as `true`.
    pub fn boolean(&mut self) -> Result<bool> {
        Ok(self.byte()? != 0)
    }

    /// Consume a varint-encoded Unicode scalar value.
    pub fn character(&mut self) -> Result<char> {
        let code = self.uvarint()?;
        u32::try_from(code)
            .ok()
            .and_then(char::from_u32)
            .ok_or(BrocadeError::InvalidChar { code })
    }

    /// Consume a length-prefixed UTF-8 string.
    pub fn text(&mut self) -> Result<String> {
        let len = self.length_prefix()?;
        let slice = self.take(len)?;
        std::str::from_utf8(slice)
            .map(str::to_owned)
            .map_err(|_| BrocadeError::InvalidUtf8)
    }

    /// Consume a length-prefixed byte string.
    pub fn byte_string(&mut self) -> Result<Vec<u8>> {
        let len = self.length_prefix()?;
        Ok(self.take(len)?.to_vec())
    }
}
