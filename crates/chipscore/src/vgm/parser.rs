//! VGM command-stream decoder.
//!
//! Decodes the YM2612/SN76489 subset of the VGM 1.50 command set into a
//! sequence of [`Frame`]s. Every wait command closes the current frame and
//! opens a new one at the advanced sample time, so the first frame always
//! sits at time 0 and frame times never decrease.
use crate::binutil::{ParseError, read_u8_at, read_u16_le_at};
use crate::error::{Error, InvariantViolation, Result};
use crate::meta::{Gd3, parse_gd3};
use crate::vgm::frame::{FmWrite, Frame, PsgWrite};
use crate::vgm::header::VgmHeader;

/// Samples in one 60 Hz video frame.
pub const WAIT_NTSC_FRAME: u64 = 735;
/// Samples in one 50 Hz video frame.
pub const WAIT_PAL_FRAME: u64 = 882;

/// A fully decoded VGM log.
#[derive(Debug, Clone, PartialEq)]
pub struct VgmFile {
    pub header: VgmHeader,
    pub gd3: Option<Gd3>,
    pub frames: Vec<Frame>,
    /// Position just past the end-of-data marker.
    pub end_offset: usize,
}

impl VgmFile {
    /// Time of the last frame, which equals the header's total samples.
    pub fn end_time(&self) -> u64 {
        self.frames.last().map_or(0, |f| f.time)
    }

    /// Sample time of the loop point, when the log loops.
    pub fn loop_time(&self) -> Option<u64> {
        self.header
            .loop_offset
            .map(|_| self.header.total_samples - self.header.loop_samples.min(self.header.total_samples))
    }
}

/// Parse a complete VGM file.
///
/// The header is validated, the Gd3 block decoded when present, and the
/// command stream decoded from the data offset up to the end marker.
/// Unknown opcodes and truncated payloads are format errors; a decoded
/// length that disagrees with the header's total or loop sample counts is
/// an invariant violation.
pub fn parse_vgm(bytes: &[u8]) -> Result<VgmFile> {
    let header = VgmHeader::parse(bytes)?;
    let gd3 = header
        .gd3_offset
        .map(|off| parse_gd3(bytes, off))
        .transpose()?;
    let (frames, end_offset) = decode_commands(bytes, &header)?;
    log::debug!(
        "decoded {} frames, {} samples, data 0x{:X}..0x{:X}",
        frames.len(),
        frames.last().map_or(0, |f| f.time),
        header.data_offset,
        end_offset
    );
    Ok(VgmFile {
        header,
        gd3,
        frames,
        end_offset,
    })
}

/// Decode the command stream starting at `header.data_offset`.
///
/// Returns the frames and the position just past the end marker.
pub(crate) fn decode_commands(bytes: &[u8], header: &VgmHeader) -> Result<(Vec<Frame>, usize)> {
    let mut frames = vec![Frame::new(0)];
    let mut time: u64 = 0;
    let mut pos = header.data_offset;
    let mut looped = false;

    loop {
        if !looped && header.loop_offset.is_some_and(|off| off <= pos) {
            let expected = header.total_samples.saturating_sub(header.loop_samples);
            if time != expected {
                return Err(Error::invariant(
                    time,
                    InvariantViolation::LoopPointMismatch {
                        expected,
                        actual: time,
                    },
                ));
            }
            looped = true;
        }

        let op = read_u8_at(bytes, pos).map_err(|_| ParseError::UnexpectedEof)?;
        let op_offset = pos;
        pos += 1;
        let wait: u64 = match op {
            0x52 | 0x53 => {
                let register = payload(bytes, pos)?;
                let value = payload(bytes, pos + 1)?;
                pos += 2;
                if let Some(frame) = frames.last_mut() {
                    frame.fm.push(FmWrite::new(op & 1, register, value));
                }
                continue;
            }
            0x4F | 0x50 => {
                let data = payload(bytes, pos)?;
                pos += 1;
                let write = if op == 0x4F {
                    PsgWrite::Stereo(data)
                } else {
                    PsgWrite::Data(data)
                };
                if let Some(frame) = frames.last_mut() {
                    frame.psg.push(write);
                }
                continue;
            }
            0x70..=0x7F => u64::from(op & 0x0F) + 1,
            0x61 => {
                let n = read_u16_le_at(bytes, pos).map_err(|_| ParseError::UnexpectedEof)?;
                pos += 2;
                u64::from(n)
            }
            0x62 => WAIT_NTSC_FRAME,
            0x63 => WAIT_PAL_FRAME,
            0x66 => break,
            _ => {
                return Err(ParseError::UnknownOpcode {
                    opcode: op,
                    offset: op_offset,
                }
                .into());
            }
        };
        time += wait;
        frames.push(Frame::new(time));
    }

    if let (Some(loop_offset), false) = (header.loop_offset, looped) {
        return Err(Error::invariant(
            time,
            InvariantViolation::LoopPointNotReached(loop_offset),
        ));
    }
    if time != header.total_samples {
        return Err(Error::invariant(
            time,
            InvariantViolation::TotalSamplesMismatch {
                expected: header.total_samples,
                actual: time,
            },
        ));
    }
    Ok((frames, pos))
}

fn payload(bytes: &[u8], pos: usize) -> std::result::Result<u8, ParseError> {
    read_u8_at(bytes, pos).map_err(|_| ParseError::UnexpectedEof)
}
