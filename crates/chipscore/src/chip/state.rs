//! Chip register state tracking.
//!
//! The state tracking system is built around a few core concepts:
//!
//! - **RegisterStorage**: Trait for abstracting register storage backends
//! - **ChipState**: Trait for chip-specific register models that consume
//!   raw writes
//! - **Trackers**: [`FmTracker`] and [`PsgTracker`] drive a chip model frame
//!   by frame and report what changed
//!
//! # Implemented Chips
//!
//! - **YM2612 (OPN2)**: 6-channel FM synthesis; key-on/off, frequency and
//!   instrument changes become [`FmEvent`](crate::chip::FmEvent)s
//! - **SN76489**: 3 tone + 1 noise channels; each frame with writes yields a
//!   [`PsgSnapshot`]
//!
//! # Examples
//!
//! ```rust
//! use chipscore::chip::FmEvent;
//! use chipscore::chip::state::FmTracker;
//! use chipscore::vgm::{FmWrite, Frame};
//!
//! let mut tracker = FmTracker::new();
//! let mut frame = Frame::new(0);
//! frame.fm.push(FmWrite::new(0, 0xA4, 0x22)); // block 4, fnum high
//! frame.fm.push(FmWrite::new(0, 0xA0, 0x84)); // fnum low
//! frame.fm.push(FmWrite::new(0, 0x28, 0xF0)); // key on channel 0
//!
//! let events = tracker.process_frame(&frame).unwrap();
//! assert!(matches!(events[0], FmEvent::NoteOn { channel: 0, .. }));
//! ```

pub mod chip_state;
pub mod sn76489;
pub mod storage;
pub mod ym2612;

pub use chip_state::ChipState;
pub use sn76489::{PsgChannelState, PsgSnapshot, PsgTracker, Sn76489State, process_psg};
pub use storage::{ArrayStorage, RegisterStorage};
pub use ym2612::{FmTracker, Ym2612State, process_fm};
