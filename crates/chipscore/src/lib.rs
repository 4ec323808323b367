//! chipscore: transcoder from Mega Drive register-write logs to MIDI
//!
//! `chipscore` reads VGM logs of the YM2612 (FM) and SN76489 (PSG) chips
//! and rebuilds the music they encode as a Standard MIDI File.
//!
//! The pipeline runs in four stages:
//! - [`vgm::parse_vgm`] decodes the log into time-ordered [`vgm::Frame`]s
//!   of register writes.
//! - [`chip::state::process_fm`] and [`chip::state::process_psg`] replay
//!   the writes against models of each chip and report musical events:
//!   FM note on/off, frequency and instrument changes, and per-frame PSG
//!   snapshots.
//! - [`transcribe`] maps those events onto MIDI tracks. Each distinct FM
//!   patch gets its own track and program; fine tuning is expressed with
//!   the pitch wheel.
//! - [`midi::write_midi`] encodes the result.
//!
//! Alongside the transcoder the crate offers a standalone SMF codec
//! ([`midi`]), a VGM writer used to build audition logs for single FM
//! instruments, and a PSG synthesizer that renders each channel to WAV.
//!
//! Example: transcode a log
//!
//! ```no_run
//! use chipscore::chip::InstrumentRegistry;
//! use chipscore::transcribe::SongTranscoder;
//! use chipscore::{TranscodeConfig, midi, vgm};
//!
//! # fn main() -> chipscore::Result<()> {
//! let bytes = std::fs::read("song.vgm")?;
//! let log = vgm::parse_vgm(&bytes)?;
//!
//! let mut registry = InstrumentRegistry::new();
//! let transcoder = SongTranscoder::new(TranscodeConfig::default());
//! let song = transcoder.transcode(&log, &mut registry)?;
//! std::fs::write("song.mid", midi::write_midi(&song)?)?;
//! println!("{} FM instruments", registry.len());
//! # Ok(())
//! # }
//! ```
//!
//! Example: build a log and decode it
//!
//! ```rust
//! use chipscore::vgm::{VgmWriter, parse_vgm};
//!
//! let mut w = VgmWriter::new();
//! w.fm_write(0, 0x28, 0x00);
//! w.wait(735);
//! w.psg_write(0x9F);
//! let log = parse_vgm(&w.finalize().unwrap()).unwrap();
//!
//! assert_eq!(log.frames.len(), 2);
//! assert_eq!(log.header.total_samples, 735);
//! ```
mod binutil;
pub mod chip;
pub mod config;
pub mod error;
pub mod meta;
pub mod midi;
pub mod transcribe;
pub mod vgm;

pub use binutil::{ByteReader, ParseError};
pub use config::{PsgMapping, TimeSignatureSegment, TranscodeConfig};
pub use error::{Error, InvariantViolation, Result, UnsupportedFeature};
pub use meta::Gd3;
pub use midi::{MidiEvent, MidiFile, read_midi, write_midi};
pub use transcribe::SongTranscoder;
pub use vgm::{VgmFile, VgmHeader, VgmWriter, parse_vgm};
