//! Events derived from chip register state.
//!
//! The FM interpreter compares each channel against the values it last
//! reported and emits one of these events per observed transition.
use crate::chip::instrument::FmInstrument;

/// Stereo placement read from the YM2612 pan bits (`0xB4` bits 7-6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Stereo {
    pub left: bool,
    pub right: bool,
}

impl Stereo {
    pub const BOTH: Stereo = Stereo {
        left: true,
        right: true,
    };

    /// Decode the two pan bits as stored in register `0xB4`.
    pub fn from_pan_bits(b4: u8) -> Self {
        Stereo {
            left: b4 & 0x80 != 0,
            right: b4 & 0x40 != 0,
        }
    }

    /// MIDI pan controller value: hard left, hard right, or centre when
    /// both or neither output is enabled.
    pub fn pan_controller(self) -> u8 {
        match (self.left, self.right) {
            (true, false) => 0,
            (false, true) => 127,
            _ => 64,
        }
    }
}

/// Transcription events emitted by the FM interpreter.
#[derive(Debug, Clone, PartialEq)]
pub enum FmEvent {
    /// A channel started sounding.
    NoteOn {
        time: u64,
        channel: u8,
        instrument: FmInstrument,
        /// Frequency word (`A4 << 8 | A0`, 14 bits).
        frequency: u16,
        stereo: Stereo,
    },
    /// A channel stopped sounding.
    NoteOff { time: u64, channel: u8 },
    /// The frequency of a sounding channel changed.
    FrequencyChange {
        time: u64,
        channel: u8,
        frequency: u16,
    },
    /// The patch of a sounding channel changed.
    ///
    /// MIDI has no way to swap timbre under a held note, so this is
    /// rejected when the events are converted to tracks.
    InstrumentChange {
        time: u64,
        channel: u8,
        instrument: FmInstrument,
    },
}

impl FmEvent {
    pub fn time(&self) -> u64 {
        match *self {
            FmEvent::NoteOn { time, .. }
            | FmEvent::NoteOff { time, .. }
            | FmEvent::FrequencyChange { time, .. }
            | FmEvent::InstrumentChange { time, .. } => time,
        }
    }

    pub fn channel(&self) -> u8 {
        match *self {
            FmEvent::NoteOn { channel, .. }
            | FmEvent::NoteOff { channel, .. }
            | FmEvent::FrequencyChange { channel, .. }
            | FmEvent::InstrumentChange { channel, .. } => channel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pan_controller() {
        assert_eq!(Stereo::from_pan_bits(0xC0).pan_controller(), 64);
        assert_eq!(Stereo::from_pan_bits(0x80).pan_controller(), 0);
        assert_eq!(Stereo::from_pan_bits(0x40).pan_controller(), 127);
        assert_eq!(Stereo::from_pan_bits(0x00).pan_controller(), 64);
    }
}
