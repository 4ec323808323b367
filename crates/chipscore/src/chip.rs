//! YM2612 and SN76489 models.
//!
//! Register-state interpreters live in [`state`]; pitch conversions in
//! [`fnumber`]; instrument identity and reports in [`instrument`]. The
//! [`synth`] module renders PSG snapshots to audio and [`audition`] builds
//! VGM logs that play a single FM instrument.
pub mod audition;
pub mod event;
pub mod fnumber;
pub mod instrument;
pub mod state;
pub mod synth;

pub use event::{FmEvent, Stereo};
pub use instrument::{FmInstrument, InstrumentCatalog, InstrumentRegistry};
