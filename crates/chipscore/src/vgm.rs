//! VGM log decoding and writing.
//!
//! This module exposes the VGM header, the frame model produced by the
//! command-stream decoder, and a small writer used to produce audition logs.
mod frame;
mod header;
mod parser;
mod writer;

pub use frame::{FmWrite, Frame, PsgWrite};
pub use header::{VGM_HEADER_SIZE, VGM_VERSION, VgmHeader, VgmHeaderField, YM2612_CLOCK};
pub use parser::{VgmFile, WAIT_NTSC_FRAME, WAIT_PAL_FRAME, parse_vgm};
pub use writer::VgmWriter;
