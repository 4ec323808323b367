//! Crate-level error types.
//!
//! Decoding failures surface as [`ParseError`] wrapped in [`Error::Format`].
//! Conditions where well-formed input describes something the transcoder
//! cannot represent are reported as [`Error::Invariant`], carrying the
//! sample coordinate at which the problem was observed.
use thiserror::Error;

use crate::binutil::ParseError;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("format error: {0}")]
    Format(#[from] ParseError),

    #[error("invariant violated at sample {at}: {violation}")]
    Invariant {
        at: u64,
        violation: InvariantViolation,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub fn invariant(at: u64, violation: InvariantViolation) -> Self {
        Error::Invariant { at, violation }
    }

    /// The violation carried by an [`Error::Invariant`], if any.
    pub fn violation(&self) -> Option<&InvariantViolation> {
        match self {
            Error::Invariant { violation, .. } => Some(violation),
            _ => None,
        }
    }
}

/// Hardware features the transcoder refuses to model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UnsupportedFeature {
    /// YM2612 channel 3 special (per-operator frequency) mode.
    #[error("channel 3 special mode")]
    Ch3SpecialMode,
    /// YM2612 DAC replacing channel 6.
    #[error("DAC")]
    Dac,
    /// SSG-EG enabled on an operator.
    #[error("SSG-EG on operator {operator}")]
    SsgEnvelope { operator: u8 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvariantViolation {
    #[error("decoded {actual} samples but header declares {expected}")]
    TotalSamplesMismatch { expected: u64, actual: u64 },

    #[error("loop point reached at sample {actual}, expected {expected}")]
    LoopPointMismatch { expected: u64, actual: u64 },

    #[error("loop offset 0x{0:X} is not on an opcode boundary")]
    LoopPointNotReached(usize),

    #[error("channel {channel}: pitch bend {bend:.3} exceeds ±{max} semitones")]
    PitchBendOutOfRange { channel: u8, bend: f64, max: f64 },

    #[error("channel {channel}: instrument changed while a note is sounding")]
    InstrumentChangeMidNote { channel: u8 },

    #[error("unsupported feature: {0}")]
    UnsupportedFeature(UnsupportedFeature),

    #[error("note {0} is outside the MIDI range")]
    NoteOutOfRange(i64),

    #[error("channel {channel}: note-off with no sounding note")]
    StrayNoteOff { channel: u8 },

    #[error("channel {channel}: frequency change with no sounding note")]
    StrayFrequencyChange { channel: u8 },

    #[error("channel {channel}: note-on while a note is already sounding")]
    NoteOnWhileSounding { channel: u8 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_messages() {
        let err = Error::invariant(
            96,
            InvariantViolation::UnsupportedFeature(UnsupportedFeature::SsgEnvelope { operator: 2 }),
        );
        assert_eq!(
            err.to_string(),
            "invariant violated at sample 96: unsupported feature: SSG-EG on operator 2"
        );
        assert_eq!(UnsupportedFeature::Ch3SpecialMode.to_string(), "channel 3 special mode");
        assert_eq!(UnsupportedFeature::Dac.to_string(), "DAC");
    }
}
