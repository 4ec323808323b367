//! Standard MIDI File codec.
//!
//! [`read_midi`] and [`write_midi`] convert between SMF bytes and
//! [`MidiFile`], a list of tracks of [`TimedEvent`]s at absolute ticks.
//! Delta times, running status and SysEx fragmentation exist only in the
//! encoded form. [`parse_mds`] reads the RIFF `MIDS` stream format into the
//! same model.
//!
//! # Examples
//!
//! ```
//! use chipscore::midi::{
//!     FileType, MetaEvent, MidiEvent, MidiFile, TimedEvent, Timebase, read_midi, write_midi,
//! };
//!
//! let midi = MidiFile {
//!     file_type: FileType::SingleTrack,
//!     timebase: Timebase::TicksPerBeat(192),
//!     tracks: vec![vec![
//!         TimedEvent::new(0, MetaEvent::tempo(500_000)),
//!         TimedEvent::new(0, MidiEvent::NoteOn { channel: 0, key: 60, velocity: 64 }),
//!         TimedEvent::new(192, MidiEvent::NoteOff { channel: 0, key: 60, velocity: 64 }),
//!     ]],
//! };
//! let bytes = write_midi(&midi).unwrap();
//! let back = read_midi(&bytes).unwrap();
//! assert_eq!(back.tracks[0].len(), 4); // end-of-track appended
//! ```
mod event;
pub mod mds;
pub mod params;
mod reader;
pub mod vlq;
mod writer;

pub use event::{
    FileType, MetaEvent, MetaKind, MidiEvent, MidiFile, MidiTrack, TimedEvent, Timebase,
    controller,
};
pub use mds::parse_mds;
pub use params::{param_change, pitch_bend_sensitivity, rpn_change};
pub use reader::{read_midi, read_track};
pub use writer::{encode_track, write_midi};
