//! Chip events to MIDI.
//!
//! The FM and PSG converters emit tracks timed in samples; [`retime`]
//! moves them onto the MIDI tick grid and adds the tempo and time-signature
//! events. [`SongTranscoder`] chains the whole pipeline for one VGM log.
pub mod fm;
pub mod psg;
pub mod retime;
mod song;

pub use fm::{fm_to_tracks, register_instruments};
pub use psg::{psg_to_tracks, psg_velocities};
pub use retime::{conductor_events, retime, sample_to_tick};
pub use song::SongTranscoder;
