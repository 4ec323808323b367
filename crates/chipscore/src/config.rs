//! Transcoding configuration.
//!
//! Every field has a default, so an empty TOML document yields
//! [`TranscodeConfig::default()`].
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A run of measures sharing one time signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignatureSegment {
    pub numerator: u8,
    /// Must be a power of two.
    pub denominator: u8,
    pub measures: u32,
}

impl TimeSignatureSegment {
    pub const fn new(numerator: u8, denominator: u8, measures: u32) -> Self {
        Self {
            numerator,
            denominator,
            measures,
        }
    }
}

/// How PSG channels are placed on MIDI channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PsgMapping {
    #[serde(default = "default_psg_base_channel")]
    pub base_channel: u8,
    #[serde(default = "default_psg_program")]
    pub program: u8,
    #[serde(default = "default_drum_channel")]
    pub drum_channel: u8,
    #[serde(default = "default_drum_note")]
    pub drum_note: u8,
    #[serde(default = "default_psg_max_velocity")]
    pub max_velocity: u8,
}

impl Default for PsgMapping {
    fn default() -> Self {
        Self {
            base_channel: default_psg_base_channel(),
            program: default_psg_program(),
            drum_channel: default_drum_channel(),
            drum_note: default_drum_note(),
            max_velocity: default_psg_max_velocity(),
        }
    }
}

const fn default_psg_base_channel() -> u8 {
    6
}

const fn default_psg_program() -> u8 {
    80 // square lead
}

const fn default_drum_channel() -> u8 {
    9
}

const fn default_drum_note() -> u8 {
    40 // electric snare
}

const fn default_psg_max_velocity() -> u8 {
    64
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscodeConfig {
    /// Output sample rate of the capture, in Hz.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Pitch-bend sensitivity used for FM channels, in semitones.
    /// Applied at cent resolution.
    #[serde(default = "default_max_bend")]
    pub max_bend: f64,
    #[serde(default = "default_ticks_per_beat")]
    pub ticks_per_beat: u16,
    #[serde(default = "default_seconds_per_beat")]
    pub seconds_per_beat: f64,
    /// Ticks added to every event after sample 0.
    #[serde(default)]
    pub tick_offset: u64,
    #[serde(default = "default_time_signatures")]
    pub time_signatures: Vec<TimeSignatureSegment>,
    #[serde(default)]
    pub psg: PsgMapping,
    #[serde(default = "default_fm_velocity")]
    pub fm_velocity: u8,
}

const fn default_sample_rate() -> u32 {
    44_100
}

const fn default_max_bend() -> f64 {
    2.0
}

const fn default_ticks_per_beat() -> u16 {
    192
}

const fn default_seconds_per_beat() -> f64 {
    0.5
}

fn default_time_signatures() -> Vec<TimeSignatureSegment> {
    vec![TimeSignatureSegment::new(4, 4, 1)]
}

const fn default_fm_velocity() -> u8 {
    64
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            max_bend: default_max_bend(),
            ticks_per_beat: default_ticks_per_beat(),
            seconds_per_beat: default_seconds_per_beat(),
            tick_offset: 0,
            time_signatures: default_time_signatures(),
            psg: PsgMapping::default(),
            fm_velocity: default_fm_velocity(),
        }
    }
}

impl TranscodeConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: TranscodeConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path.as_ref())?;
        log::debug!("loading config from {}", path.as_ref().display());
        Self::from_toml_str(&s)
    }

    /// Check value ranges that the type system does not enforce.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::InvalidConfig("sample_rate must be non-zero".into()));
        }
        if self.ticks_per_beat == 0 || self.ticks_per_beat > 0x7FFF {
            return Err(Error::InvalidConfig(format!(
                "ticks_per_beat {} outside 1..=32767",
                self.ticks_per_beat
            )));
        }
        if !(self.seconds_per_beat > 0.0) || self.seconds_per_beat * 1e6 > f64::from(0xFF_FFFF) {
            return Err(Error::InvalidConfig(format!(
                "seconds_per_beat {} does not fit a tempo event",
                self.seconds_per_beat
            )));
        }
        if !(self.max_bend >= 0.01) || self.max_bend > 127.0 {
            return Err(Error::InvalidConfig(format!(
                "max_bend {} outside [0.01, 127]",
                self.max_bend
            )));
        }
        for seg in &self.time_signatures {
            if !seg.denominator.is_power_of_two() || seg.numerator == 0 {
                return Err(Error::InvalidConfig(format!(
                    "invalid time signature {}/{}",
                    seg.numerator, seg.denominator
                )));
            }
        }
        let psg = &self.psg;
        for (name, v) in [
            ("psg.base_channel", psg.base_channel.saturating_add(2)),
            ("psg.drum_channel", psg.drum_channel),
        ] {
            if v > 15 {
                return Err(Error::InvalidConfig(format!("{name} out of range")));
            }
        }
        if psg.program > 127 || psg.drum_note > 127 || psg.max_velocity > 127 {
            return Err(Error::InvalidConfig("psg mapping values must be < 128".into()));
        }
        if self.fm_velocity > 127 {
            return Err(Error::InvalidConfig("fm_velocity must be < 128".into()));
        }
        Ok(())
    }
}
