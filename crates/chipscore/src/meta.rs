//! Gd3 metadata parsing and serialization.
//!
//! The Gd3 chunk consists of a four-byte identifier (`"Gd3 "`), a 32-bit
//! little-endian version (`0x100`), a 32-bit little-endian byte length and a
//! sequence of UTF-16LE nul-terminated strings. Parsing is strict: the
//! payload must split into exactly eleven fields plus the empty remainder
//! after the final terminator.
use crate::binutil::{ParseError, expect_ident, read_slice, read_u16_le_at, read_u32_le_at};

pub const GD3_VERSION: u32 = 0x100;

const GD3_FIELD_COUNT: usize = 11;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Gd3 {
    pub track: String,
    pub track_original: String,
    pub game: String,
    pub game_original: String,
    pub system: String,
    pub system_original: String,
    pub artist: String,
    pub artist_original: String,
    pub date: String,
    pub converter: String,
    pub notes: String,
}

impl Gd3 {
    fn fields(&self) -> [&str; GD3_FIELD_COUNT] {
        [
            &self.track,
            &self.track_original,
            &self.game,
            &self.game_original,
            &self.system,
            &self.system_original,
            &self.artist,
            &self.artist_original,
            &self.date,
            &self.converter,
            &self.notes,
        ]
    }

    /// Title used for the MIDI sequence name: `"<track> - <game>"`.
    pub fn title(&self) -> String {
        format!("{} - {}", self.track, self.game)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut data: Vec<u8> = Vec::new();
        for field in self.fields() {
            for code in field.encode_utf16() {
                data.extend_from_slice(&code.to_le_bytes());
            }
            data.extend_from_slice(&0_u16.to_le_bytes());
        }

        let mut out = Vec::with_capacity(12 + data.len());
        out.extend_from_slice(b"Gd3 ");
        out.extend_from_slice(&GD3_VERSION.to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&data);
        out
    }
}

/// Parse a Gd3 block starting at `offset` within `bytes`.
pub(crate) fn parse_gd3(bytes: &[u8], offset: usize) -> Result<Gd3, ParseError> {
    expect_ident(bytes, offset, b"Gd3 ")?;
    let version = read_u32_le_at(bytes, offset + 4)?;
    if version != GD3_VERSION {
        return Err(ParseError::UnsupportedVersion(version));
    }
    let len = read_u32_le_at(bytes, offset + 8)? as usize;
    let data = read_slice(bytes, offset + 12, len)?;
    if len % 2 != 0 {
        return Err(ParseError::InvalidGd3(format!("odd payload length {len}")));
    }

    let mut units = Vec::with_capacity(len / 2);
    for i in (0..len).step_by(2) {
        units.push(read_u16_le_at(data, i)?);
    }

    let parts: Vec<&[u16]> = units.split(|&c| c == 0).collect();
    if parts.len() != GD3_FIELD_COUNT + 1 || !parts[GD3_FIELD_COUNT].is_empty() {
        return Err(ParseError::InvalidGd3(format!(
            "expected {} terminated fields, found {} segments",
            GD3_FIELD_COUNT,
            parts.len()
        )));
    }

    let mut fields = Vec::with_capacity(GD3_FIELD_COUNT);
    for part in &parts[..GD3_FIELD_COUNT] {
        let s = String::from_utf16(part)
            .map_err(|e| ParseError::InvalidGd3(format!("invalid utf16: {e}")))?;
        fields.push(s);
    }
    let mut it = fields.into_iter();
    let mut next = || it.next().unwrap_or_default();
    Ok(Gd3 {
        track: next(),
        track_original: next(),
        game: next(),
        game_original: next(),
        system: next(),
        system_original: next(),
        artist: next(),
        artist_original: next(),
        date: next(),
        converter: next(),
        notes: next(),
    })
}

impl TryFrom<&[u8]> for Gd3 {
    type Error = ParseError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        parse_gd3(bytes, 0)
    }
}
