//! Variable-length quantities.
//!
//! Seven bits per byte, most significant group first; every byte but the
//! last has its top bit set.
use crate::binutil::{ByteReader, ParseError};

/// Read one quantity.
pub fn read_vlq(reader: &mut ByteReader<'_>) -> Result<u64, ParseError> {
    let start = reader.position();
    let mut n: u64 = 0;
    loop {
        let b = reader.u8()?;
        if n >> 57 != 0 {
            return Err(ParseError::VlqOverflow(start));
        }
        n = n << 7 | u64::from(b & 0x7F);
        if b & 0x80 == 0 {
            return Ok(n);
        }
    }
}

/// Append the encoding of `n` to `out`.
pub fn write_vlq(n: u64, out: &mut Vec<u8>) {
    let mut buf = [0u8; 10];
    let mut i = buf.len() - 1;
    let mut n = n;
    buf[i] = (n & 0x7F) as u8;
    n >>= 7;
    while n > 0 {
        i -= 1;
        buf[i] = (n & 0x7F) as u8 | 0x80;
        n >>= 7;
    }
    out.extend_from_slice(&buf[i..]);
}

pub fn encode_vlq(n: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(4);
    write_vlq(n, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> Result<u64, ParseError> {
        read_vlq(&mut ByteReader::new(bytes))
    }

    #[test]
    fn test_vlq_boundaries() {
        assert_eq!(encode_vlq(0), vec![0x00]);
        assert_eq!(encode_vlq(127), vec![0x7F]);
        assert_eq!(encode_vlq(128), vec![0x81, 0x00]);
        assert_eq!(encode_vlq(16383), vec![0xFF, 0x7F]);
        assert_eq!(encode_vlq(16384), vec![0x81, 0x80, 0x00]);
        assert_eq!(encode_vlq(0x0FFF_FFFF), vec![0xFF, 0xFF, 0xFF, 0x7F]);
        for n in [0, 127, 128, 16383, 16384, 0x0FFF_FFFF, u64::MAX] {
            assert_eq!(decode(&encode_vlq(n)), Ok(n));
        }
    }

    #[test]
    fn test_vlq_truncated() {
        assert_eq!(decode(&[0x81, 0x80]), Err(ParseError::UnexpectedEof));
    }

    #[test]
    fn test_vlq_overflow() {
        let bytes = [0xFF; 11];
        assert_eq!(decode(&bytes), Err(ParseError::VlqOverflow(0)));
    }
}
