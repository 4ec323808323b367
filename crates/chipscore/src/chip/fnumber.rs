//! Pitch conversions for the YM2612 and SN76489.
//!
//! The YM2612 expresses pitch as a 14-bit frequency word: a 3-bit block
//! (octave) in bits 11-13 and an 11-bit F-number. The SN76489 uses a 10-bit
//! divider period. Both are mapped to a continuous MIDI note number, which
//! [`Pitch::from_semitone`] splits into an integer note plus a fractional
//! offset that is carried on the pitch wheel.
//!
//! # Examples
//!
//! ```rust
//! use chipscore::chip::fnumber::{fm_semitone, fm_word_from_note, Pitch};
//!
//! let word = fm_word_from_note(69).unwrap();
//! let pitch = Pitch::from_semitone(fm_semitone(word)).unwrap();
//! assert_eq!(pitch.note, 69);
//! assert!(pitch.offset.abs() < 0.01);
//! ```
use crate::error::InvariantViolation;

/// F-number of note C at block 0 for the NTSC YM2612 clock.
pub const FNUM_BASE: f64 = 643.833003155359;

/// Mask of the meaningful bits in a YM2612 frequency word.
pub const FM_WORD_MASK: u16 = 0x3FFF;

/// Centre value of the 14-bit pitch wheel.
pub const WHEEL_CENTER: u16 = 8192;
const WHEEL_MAX: u16 = 0x3FFF;

/// Build the frequency word from the `0xA4` (block/high) and `0xA0` (low)
/// register values.
pub fn fm_word(high: u8, low: u8) -> u16 {
    (u16::from(high) << 8 | u16::from(low)) & FM_WORD_MASK
}

/// Continuous note number of a YM2612 frequency word.
///
/// Returns negative infinity for an F-number of zero.
pub fn fm_semitone(word: u16) -> f64 {
    let block = f64::from((word & 0x3800) >> 11);
    let fnum = f64::from(word & 0x07FF);
    12.0 * ((fnum / FNUM_BASE).log2() + block) + 12.0
}

/// Frequency word that plays `note` with no pitch offset.
///
/// Notes below 12 have no block to live in and are rejected, as are notes
/// above the highest block.
pub fn fm_word_from_note(note: u8) -> Result<u16, InvariantViolation> {
    let rel = i64::from(note) - 12;
    let (block, step) = (rel.div_euclid(12), rel.rem_euclid(12));
    if !(0..=7).contains(&block) {
        return Err(InvariantViolation::NoteOutOfRange(i64::from(note)));
    }
    let fnum = (FNUM_BASE * 2f64.powf(step as f64 / 12.0)).round() as u16;
    Ok((block as u16) << 11 | fnum)
}

/// Output frequency of an SN76489 tone channel.
///
/// A period of 0 behaves like 1024 on hardware.
pub fn psg_frequency(clock: u32, period: u16) -> f64 {
    let period = if period == 0 { 1024 } else { period };
    f64::from(clock) / 32.0 / f64::from(period)
}

/// Continuous note number of a frequency in Hz (A4 = 440 Hz = note 69).
pub fn hz_to_semitone(hz: f64) -> f64 {
    12.0 * (hz / 440.0).log2() + 69.0
}

/// An integer MIDI note plus the fractional offset to reach the exact pitch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pitch {
    pub note: u8,
    /// Offset from `note`, in semitones.
    pub offset: f64,
}

impl Pitch {
    /// Round `semitone` to the nearest MIDI note.
    pub fn from_semitone(semitone: f64) -> Result<Self, InvariantViolation> {
        let rounded = semitone.round();
        if !rounded.is_finite() || !(0.0..=127.0).contains(&rounded) {
            let note = if rounded.is_finite() {
                rounded as i64
            } else {
                i64::MIN
            };
            return Err(InvariantViolation::NoteOutOfRange(note));
        }
        Ok(Pitch {
            note: rounded as u8,
            offset: semitone - rounded,
        })
    }
}

/// Pitch-wheel value for an offset of `offset` semitones under a
/// sensitivity of `max_bend` semitones.
///
/// The offset must lie strictly within `±max_bend`.
pub fn wheel_value(channel: u8, offset: f64, max_bend: f64) -> Result<u16, InvariantViolation> {
    if !(offset.abs() < max_bend) {
        return Err(InvariantViolation::PitchBendOutOfRange {
            channel,
            bend: offset,
            max: max_bend,
        });
    }
    let v = ((offset / max_bend + 1.0) * f64::from(WHEEL_CENTER)).round();
    Ok((v.max(0.0) as u16).min(WHEEL_MAX))
}
