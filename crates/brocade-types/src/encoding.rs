//! Fixed-width little-endian primitive encoding.
//!
//! All multi-byte primitives on the wire are little-endian. Signed integers
//! are bit-cast to the unsigned type of the same width; floats are bit-cast
//! from their IEEE-754 representation.

/// Read a little-endian `u16` from the front of `buf`.
pub fn read_u16_le(buf: &[u8]) -> Option<u16> {
    Some(u16::from_le_bytes(buf.get(..2)?.try_into().ok()?))
}

/// Read a little-endian `u32` from the front of `buf`.
pub fn read_u32_le(buf: &[u8]) -> Option<u32> {
    Some(u32::from_le_bytes(buf.get(..4)?.try_into().ok()?))
}

/// Read a little-endian `u64` from the front of `buf`.
pub fn read_u64_le(buf: &[u8]) -> Option<u64> {
    Some(u64::from_le_bytes(buf.get(..8)?.try_into().ok()?))
}

/// Read a 32-bit IEEE-754 float from the front of `buf`.
pub fn read_f32_le(buf: &[u8]) -> Option<f32> {
    read_u32_le(buf).map(f32::from_bits)
}

/// Read a 64-bit IEEE-754 float from the front of `buf`.
pub fn read_f64_le(buf: &[u8]) -> Option<f64> {
    read_u64_le(buf).map(f64::from_bits)
}

/// Append a little-endian `u16` to `out`.
pub fn write_u16_le(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Append a little-endian `u32` to `out`.
pub fn write_u32_le(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Append a little-endian `u64` to `out`.
pub fn write_u64_le(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Append a 32-bit IEEE-754 float to `out`.
pub fn write_f32_le(out: &mut Vec<u8>, value: f32) {
    write_u32_le(out, value.to_bits());
}

/// Append a 64-bit IEEE-754 float to `out`.
pub fn write_f64_le(out: &mut Vec<u8>, value: f64) {
    write_u64_le(out, value.to_bits());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u16_layout_is_little_endian() {
        let mut out = Vec::new();
        write_u16_le(&mut out, 0x0102);
        assert_eq!(out, [0x02, 0x01]);
        assert_eq!(read_u16_le(&out), Some(0x0102));
    }

    #[test]
    fn u32_layout_is_little_endian() {
        let mut out = Vec::new();
        write_u32_le(&mut out, 0x0102_0304);
        assert_eq!(out, [0x04, 0x03, 0x02, 0x01]);
        assert_eq!(read_u32_le(&out), Some(0x0102_0304));
    }

    #[test]
    fn u64_layout_is_little_endian() {
        let mut out = Vec::new();
        write_u64_le(&mut out, 0x0102_0304_0506_0708);
        assert_eq!(out, [0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]);
        assert_eq!(read_u64_le(&out), Some(0x0102_0304_0506_0708));
    }

    #[test]
    fn floats_roundtrip_bitwise() {
        for value in [0.0f64, -0.0, 1.5, -1234.5, f64::INFINITY, f64::NAN] {
            let mut out = Vec::new();
            write_f64_le(&mut out, value);
            let back = read_f64_le(&out).unwrap();
            assert_eq!(back.to_bits(), value.to_bits());
        }
        for value in [0.0f32, -0.0, 1.5, f32::NEG_INFINITY, f32::NAN] {
            let mut out = Vec::new();
            write_f32_le(&mut out, value);
            let back = read_f32_le(&out).unwrap();
            assert_eq!(back.to_bits(), value.to_bits());
        }
    }

    #[test]
    fn short_reads_return_none() {
        assert_eq!(read_u16_le(&[0x01]), None);
        assert_eq!(read_u32_le(&[0x01, 0x02, 0x03]), None);
        assert_eq!(read_u64_le(&[0; 7]), None);
        assert!(read_f32_le(&[0; 3]).is_none());
        assert!(read_f64_le(&[0; 7]).is_none());
    }

    #[test]
    fn reads_ignore_trailing_bytes() {
        let buf = [0x2A, 0x00, 0xFF, 0xFF, 0xFF];
        assert_eq!(read_u16_le(&buf), Some(42));
    }
}
