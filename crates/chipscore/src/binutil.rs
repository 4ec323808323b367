//! Utilities used by parsers: parse error type and byte readers.
use thiserror::Error;

/// Error type returned by the binary decoders in this crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Input ended unexpectedly while the parser was expecting more bytes.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// An attempted read was outside the available buffer range.
    ///
    /// - `offset` is the index that was attempted to be accessed.
    /// - `needed` is the number of bytes required for the operation.
    /// - `available` is the current buffer length.
    /// - `context` names the logical location (for example `"gd3_start"`).
    #[error(
        "offset out of range at {context}: 0x{offset:X} (needed {needed} bytes, available {available})"
    )]
    OffsetOutOfRange {
        offset: usize,
        needed: usize,
        available: usize,
        context: &'static str,
    },

    /// A four-byte identifier did not match the expected value.
    #[error("invalid ident: expected {expected:?}, found {found:?}")]
    InvalidIdent { expected: [u8; 4], found: [u8; 4] },

    /// The data uses a version the parser does not support.
    #[error("unsupported version: 0x{0:X}")]
    UnsupportedVersion(u32),

    /// The capture declares a chip clock outside the supported set.
    #[error("unsupported {chip} clock: {clock} Hz")]
    UnsupportedClock { chip: &'static str, clock: u32 },

    /// A header was shorter than the minimum required length.
    #[error("header too short: {0}")]
    HeaderTooShort(&'static str),

    /// An opcode byte was not recognized by the command-stream decoder.
    #[error("unknown opcode 0x{opcode:02X} at offset 0x{offset:X}")]
    UnknownOpcode { opcode: u8, offset: usize },

    /// The GD3 block is malformed.
    #[error("invalid gd3: {0}")]
    InvalidGd3(String),

    /// A chunk had an unexpected identifier or size.
    #[error("invalid chunk {ident:?} at offset 0x{offset:X}: {reason}")]
    InvalidChunk {
        ident: [u8; 4],
        offset: usize,
        reason: &'static str,
    },

    /// A MIDI data byte had its top bit set.
    #[error("invalid data byte 0x{byte:02X} at offset 0x{offset:X}")]
    InvalidDataByte { byte: u8, offset: usize },

    /// A data byte appeared with no running status to continue.
    #[error("no running status to continue at offset 0x{0:X}")]
    MissingRunningStatus(usize),

    /// A status byte that this codec does not understand.
    #[error("unrecognised status byte 0x{status:02X} at offset 0x{offset:X}")]
    UnknownStatus { status: u8, offset: usize },

    /// A meta event type outside the supported set.
    #[error("unknown meta event type 0x{kind:02X} at offset 0x{offset:X}")]
    UnknownMetaEvent { kind: u8, offset: usize },

    /// A fixed-size meta event carried the wrong payload length.
    #[error("meta event 0x{kind:02X} has length {len}, expected {expected}")]
    InvalidMetaLength { kind: u8, len: usize, expected: usize },

    /// A system-exclusive event with no payload.
    #[error("zero-length system-exclusive at offset 0x{0:X}")]
    EmptySysEx(usize),

    /// A track chunk ended without an end-of-track meta event.
    #[error("track {0} has no end-of-track event")]
    MissingEndOfTrack(usize),

    /// A variable-length quantity does not fit in 64 bits.
    #[error("variable-length quantity overflow at offset 0x{0:X}")]
    VlqOverflow(usize),

    /// A value does not fit the field it is serialized into.
    #[error("{field} value {value} out of range")]
    ValueOutOfRange { field: &'static str, value: u64 },
}

/// Read a 32-bit little-endian unsigned integer from `bytes` at `off`.
pub fn read_u32_le_at(bytes: &[u8], off: usize) -> Result<u32, ParseError> {
    let s = read_slice(bytes, off, 4)?;
    Ok(u32::from_le_bytes([s[0], s[1], s[2], s[3]]))
}

/// Read a 16-bit little-endian unsigned integer from `bytes` at `off`.
pub fn read_u16_le_at(bytes: &[u8], off: usize) -> Result<u16, ParseError> {
    let s = read_slice(bytes, off, 2)?;
    Ok(u16::from_le_bytes([s[0], s[1]]))
}

/// Read a single byte from `bytes` at `off`.
pub fn read_u8_at(bytes: &[u8], off: usize) -> Result<u8, ParseError> {
    bytes.get(off).copied().ok_or(ParseError::OffsetOutOfRange {
        offset: off,
        needed: 1,
        available: bytes.len(),
        context: "read_u8",
    })
}

/// Return a borrowed slice of length `len` starting at `off` from `bytes`.
///
/// Returns `Err(ParseError::OffsetOutOfRange)` when the requested range
/// exceeds the available buffer.
pub fn read_slice(bytes: &[u8], off: usize, len: usize) -> Result<&[u8], ParseError> {
    match off.checked_add(len) {
        Some(end) if end <= bytes.len() => Ok(&bytes[off..end]),
        _ => Err(ParseError::OffsetOutOfRange {
            offset: off,
            needed: len,
            available: bytes.len().saturating_sub(off),
            context: "read_slice",
        }),
    }
}

/// Read a four-byte identifier and compare it with `expected`.
pub fn expect_ident(bytes: &[u8], off: usize, expected: &[u8; 4]) -> Result<(), ParseError> {
    let s = read_slice(bytes, off, 4)?;
    if s != expected {
        return Err(ParseError::InvalidIdent {
            expected: *expected,
            found: [s[0], s[1], s[2], s[3]],
        });
    }
    Ok(())
}

/// Sequential reader over a byte slice.
///
/// Offsets reported in errors are absolute positions within the slice the
/// reader was created from, which keeps diagnostics meaningful when a
/// sub-range (for example a single track chunk) is decoded.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    end: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            end: bytes.len(),
        }
    }

    /// Create a reader limited to `bytes[start..end]`.
    pub fn with_range(bytes: &'a [u8], start: usize, end: usize) -> Result<Self, ParseError> {
        if start > end || end > bytes.len() {
            return Err(ParseError::OffsetOutOfRange {
                offset: start,
                needed: end.saturating_sub(start),
                available: bytes.len().saturating_sub(start),
                context: "reader_range",
            });
        }
        Ok(Self {
            bytes,
            pos: start,
            end,
        })
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.end - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.end
    }

    pub fn u8(&mut self) -> Result<u8, ParseError> {
        if self.pos >= self.end {
            return Err(ParseError::UnexpectedEof);
        }
        let b = self.bytes[self.pos];
        self.pos += 1;
        Ok(b)
    }

    pub fn peek(&self) -> Option<u8> {
        (self.pos < self.end).then(|| self.bytes[self.pos])
    }

    pub fn take(&mut self, len: usize) -> Result<&'a [u8], ParseError> {
        if self.remaining() < len {
            return Err(ParseError::UnexpectedEof);
        }
        let s = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(s)
    }

    pub fn u16_le(&mut self) -> Result<u16, ParseError> {
        let s = self.take(2)?;
        Ok(u16::from_le_bytes([s[0], s[1]]))
    }

    pub fn u16_be(&mut self) -> Result<u16, ParseError> {
        let s = self.take(2)?;
        Ok(u16::from_be_bytes([s[0], s[1]]))
    }

    pub fn u32_le(&mut self) -> Result<u32, ParseError> {
        let s = self.take(4)?;
        Ok(u32::from_le_bytes([s[0], s[1], s[2], s[3]]))
    }

    pub fn u32_be(&mut self) -> Result<u32, ParseError> {
        let s = self.take(4)?;
        Ok(u32::from_be_bytes([s[0], s[1], s[2], s[3]]))
    }

    pub fn ident(&mut self) -> Result<[u8; 4], ParseError> {
        let s = self.take(4)?;
        Ok([s[0], s[1], s[2], s[3]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_slice_out_of_range() {
        let data = [1u8, 2, 3];
        assert_eq!(read_slice(&data, 1, 2).unwrap(), &[2, 3]);
        assert!(matches!(
            read_slice(&data, 2, 2),
            Err(ParseError::OffsetOutOfRange { available: 1, .. })
        ));
        assert!(read_slice(&data, usize::MAX, 2).is_err());
    }

    #[test]
    fn test_reader_range_limits_reads() {
        let data = [0xAAu8, 0x01, 0x02, 0x03, 0xBB];
        let mut r = ByteReader::with_range(&data, 1, 4).unwrap();
        assert_eq!(r.u16_be().unwrap(), 0x0102);
        assert_eq!(r.position(), 3);
        assert_eq!(r.u8().unwrap(), 0x03);
        assert!(r.is_empty());
        assert_eq!(r.u8(), Err(ParseError::UnexpectedEof));
    }

    #[test]
    fn test_expect_ident() {
        let data = *b"Vgm \0";
        assert!(expect_ident(&data, 0, b"Vgm ").is_ok());
        assert!(matches!(
            expect_ident(&data, 0, b"Gd3 "),
            Err(ParseError::InvalidIdent { .. })
        ));
    }
}
