//! VGM 1.50 header.
//!
//! `VgmHeader` is the in-memory form of the 64-byte main header. Offsets in
//! the file are relative to the field that stores them; they are normalized
//! to absolute file positions while parsing and converted back by
//! [`VgmHeader::to_bytes`].
use crate::binutil::{ParseError, expect_ident, read_u8_at, read_u16_le_at, read_u32_le_at};

/// Size of the 1.50 header and the legacy data start.
pub const VGM_HEADER_SIZE: usize = 0x40;

pub const VGM_VERSION: u32 = 0x150;

/// YM2612 clock accepted by the transcoder (NTSC Mega Drive).
pub const YM2612_CLOCK: u32 = 7_670_453;

/// Header fields and their on-disk offsets.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VgmHeaderField {
    Ident,
    EofOffset,
    Version,
    Sn76489Clock,
    Ym2413Clock,
    Gd3Offset,
    TotalSamples,
    LoopOffset,
    LoopSamples,
    Rate,
    SnFeedback,
    SnShiftWidth,
    SnFlags,
    Ym2612Clock,
    Ym2151Clock,
    DataOffset,
}

impl VgmHeaderField {
    pub const fn offset(self) -> usize {
        match self {
            VgmHeaderField::Ident => 0x00,
            VgmHeaderField::EofOffset => 0x04,
            VgmHeaderField::Version => 0x08,
            VgmHeaderField::Sn76489Clock => 0x0C,
            VgmHeaderField::Ym2413Clock => 0x10,
            VgmHeaderField::Gd3Offset => 0x14,
            VgmHeaderField::TotalSamples => 0x18,
            VgmHeaderField::LoopOffset => 0x1C,
            VgmHeaderField::LoopSamples => 0x20,
            VgmHeaderField::Rate => 0x24,
            VgmHeaderField::SnFeedback => 0x28,
            VgmHeaderField::SnShiftWidth => 0x2A,
            VgmHeaderField::SnFlags => 0x2B,
            VgmHeaderField::Ym2612Clock => 0x2C,
            VgmHeaderField::Ym2151Clock => 0x30,
            VgmHeaderField::DataOffset => 0x34,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VgmHeader {
    /// Absolute position of the end of file.
    pub eof_offset: usize,
    pub version: u32,
    pub sn76489_clock: u32,
    pub ym2413_clock: u32,
    /// Absolute position of the Gd3 block, if any.
    pub gd3_offset: Option<usize>,
    pub total_samples: u64,
    /// Absolute position of the loop point, if any.
    pub loop_offset: Option<usize>,
    pub loop_samples: u64,
    pub rate: u32,
    pub sn76489_feedback: u16,
    pub sn76489_shift_width: u8,
    pub sn76489_flags: u8,
    pub ym2612_clock: u32,
    pub ym2151_clock: u32,
    /// Absolute position of the first command.
    pub data_offset: usize,
}

impl Default for VgmHeader {
    fn default() -> Self {
        VgmHeader {
            eof_offset: VGM_HEADER_SIZE,
            version: VGM_VERSION,
            sn76489_clock: 3_579_545,
            ym2413_clock: 0,
            gd3_offset: None,
            total_samples: 0,
            loop_offset: None,
            loop_samples: 0,
            rate: 60,
            sn76489_feedback: 0x0009,
            sn76489_shift_width: 16,
            sn76489_flags: 0,
            ym2612_clock: YM2612_CLOCK,
            ym2151_clock: 0,
            data_offset: VGM_HEADER_SIZE,
        }
    }
}

fn relative(bytes: &[u8], field: VgmHeaderField) -> Result<Option<usize>, ParseError> {
    let raw = read_u32_le_at(bytes, field.offset())?;
    Ok((raw != 0).then(|| raw as usize + field.offset()))
}

fn to_relative(abs: Option<usize>, field: VgmHeaderField) -> Result<u32, ParseError> {
    match abs {
        None => Ok(0),
        Some(abs) => abs
            .checked_sub(field.offset())
            .and_then(|rel| u32::try_from(rel).ok())
            .ok_or(ParseError::ValueOutOfRange {
                field: "header offset",
                value: abs as u64,
            }),
    }
}

impl VgmHeader {
    /// Parse and validate the header at the start of `bytes`.
    ///
    /// Rejects anything other than a version 1.50 file with an NTSC YM2612
    /// clock.
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        if bytes.len() < VGM_HEADER_SIZE {
            return Err(ParseError::HeaderTooShort("vgm"));
        }
        expect_ident(bytes, 0, b"Vgm ")?;

        let version = read_u32_le_at(bytes, VgmHeaderField::Version.offset())?;
        if version != VGM_VERSION {
            return Err(ParseError::UnsupportedVersion(version));
        }
        let ym2612_clock = read_u32_le_at(bytes, VgmHeaderField::Ym2612Clock.offset())?;
        if ym2612_clock != YM2612_CLOCK {
            return Err(ParseError::UnsupportedClock {
                chip: "YM2612",
                clock: ym2612_clock,
            });
        }

        let read = |field: VgmHeaderField| read_u32_le_at(bytes, field.offset());
        let header = VgmHeader {
            eof_offset: relative(bytes, VgmHeaderField::EofOffset)?.unwrap_or(bytes.len()),
            version,
            sn76489_clock: read(VgmHeaderField::Sn76489Clock)?,
            ym2413_clock: read(VgmHeaderField::Ym2413Clock)?,
            gd3_offset: relative(bytes, VgmHeaderField::Gd3Offset)?,
            total_samples: u64::from(read(VgmHeaderField::TotalSamples)?),
            loop_offset: relative(bytes, VgmHeaderField::LoopOffset)?,
            loop_samples: u64::from(read(VgmHeaderField::LoopSamples)?),
            rate: read(VgmHeaderField::Rate)?,
            sn76489_feedback: read_u16_le_at(bytes, VgmHeaderField::SnFeedback.offset())?,
            sn76489_shift_width: read_u8_at(bytes, VgmHeaderField::SnShiftWidth.offset())?,
            sn76489_flags: read_u8_at(bytes, VgmHeaderField::SnFlags.offset())?,
            ym2612_clock,
            ym2151_clock: read(VgmHeaderField::Ym2151Clock)?,
            data_offset: relative(bytes, VgmHeaderField::DataOffset)?.unwrap_or(VGM_HEADER_SIZE),
        };
        Ok(header)
    }

    /// Serialize to the 64-byte on-disk form, converting offsets back to
    /// relative values.
    pub fn to_bytes(&self) -> Result<[u8; VGM_HEADER_SIZE], ParseError> {
        let mut out = [0u8; VGM_HEADER_SIZE];
        let mut put = |field: VgmHeaderField, value: u32| {
            let off = field.offset();
            out[off..off + 4].copy_from_slice(&value.to_le_bytes());
        };
        let samples = |v: u64, field: &'static str| {
            u32::try_from(v).map_err(|_| ParseError::ValueOutOfRange { field, value: v })
        };

        put(VgmHeaderField::EofOffset, to_relative(Some(self.eof_offset), VgmHeaderField::EofOffset)?);
        put(VgmHeaderField::Version, self.version);
        put(VgmHeaderField::Sn76489Clock, self.sn76489_clock);
        put(VgmHeaderField::Ym2413Clock, self.ym2413_clock);
        put(VgmHeaderField::Gd3Offset, to_relative(self.gd3_offset, VgmHeaderField::Gd3Offset)?);
        put(VgmHeaderField::TotalSamples, samples(self.total_samples, "total_samples")?);
        put(VgmHeaderField::LoopOffset, to_relative(self.loop_offset, VgmHeaderField::LoopOffset)?);
        put(VgmHeaderField::LoopSamples, samples(self.loop_samples, "loop_samples")?);
        put(VgmHeaderField::Rate, self.rate);
        put(VgmHeaderField::Ym2612Clock, self.ym2612_clock);
        put(VgmHeaderField::Ym2151Clock, self.ym2151_clock);
        put(VgmHeaderField::DataOffset, to_relative(Some(self.data_offset), VgmHeaderField::DataOffset)?);

        out[0..4].copy_from_slice(b"Vgm ");
        let fb = VgmHeaderField::SnFeedback.offset();
        out[fb..fb + 2].copy_from_slice(&self.sn76489_feedback.to_le_bytes());
        out[VgmHeaderField::SnShiftWidth.offset()] = self.sn76489_shift_width;
        out[VgmHeaderField::SnFlags.offset()] = self.sn76489_flags;
        Ok(out)
    }
}

impl TryFrom<&[u8]> for VgmHeader {
    type Error = ParseError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        VgmHeader::parse(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_are_normalized() {
        let header = VgmHeader {
            eof_offset: 0x80,
            gd3_offset: Some(0x70),
            loop_offset: Some(0x48),
            total_samples: 1000,
            loop_samples: 400,
            ..Default::default()
        };
        let bytes = header.to_bytes().unwrap();
        assert_eq!(read_u32_le_at(&bytes, 0x04).unwrap(), 0x7C);
        assert_eq!(read_u32_le_at(&bytes, 0x14).unwrap(), 0x5C);
        assert_eq!(read_u32_le_at(&bytes, 0x1C).unwrap(), 0x2C);
        assert_eq!(read_u32_le_at(&bytes, 0x34).unwrap(), 0x0C);
        assert_eq!(VgmHeader::parse(&bytes).unwrap(), header);
    }

    #[test]
    fn test_zero_data_offset_means_legacy_start() {
        let mut bytes = VgmHeader::default().to_bytes().unwrap();
        bytes[0x34..0x38].copy_from_slice(&0u32.to_le_bytes());
        let header = VgmHeader::parse(&bytes).unwrap();
        assert_eq!(header.data_offset, VGM_HEADER_SIZE);
        assert_eq!(header.gd3_offset, None);
        assert_eq!(header.loop_offset, None);
    }

    #[test]
    fn test_rejects_other_versions_and_clocks() {
        let mut bytes = VgmHeader::default().to_bytes().unwrap();
        bytes[0x08..0x0C].copy_from_slice(&0x151u32.to_le_bytes());
        assert_eq!(
            VgmHeader::parse(&bytes),
            Err(ParseError::UnsupportedVersion(0x151))
        );

        let mut bytes = VgmHeader::default().to_bytes().unwrap();
        bytes[0x2C..0x30].copy_from_slice(&7_600_489u32.to_le_bytes());
        assert!(matches!(
            VgmHeader::parse(&bytes),
            Err(ParseError::UnsupportedClock { clock: 7_600_489, .. })
        ));
        bytes[0x2C..0x30].copy_from_slice(&7_670_454u32.to_le_bytes());
        assert!(matches!(
            VgmHeader::parse(&bytes),
            Err(ParseError::UnsupportedClock { clock: 7_670_454, .. })
        ));

        let mut bytes = VgmHeader::default().to_bytes().unwrap();
        bytes[0..4].copy_from_slice(b"Vgz ");
        assert!(matches!(
            VgmHeader::parse(&bytes),
            Err(ParseError::InvalidIdent { .. })
        ));

        assert_eq!(
            VgmHeader::parse(&bytes[..0x20]),
            Err(ParseError::HeaderTooShort("vgm"))
        );
    }
}
