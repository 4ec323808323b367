//! SN76489 (PSG) chip state implementation.
//!
//! This module provides the register model of the SN76489 Programmable Sound
//! Generator as wired in the Mega Drive (plus the Game Gear stereo register),
//! and [`PsgTracker`], which condenses a frame sequence into per-frame
//! snapshots of the four channels.

use super::chip_state::ChipState;
use crate::vgm::{Frame, PsgWrite};

/// SN76489 has 4 channels (3 tone + 1 noise)
pub const SN76489_CHANNELS: usize = 4;

/// Noise channel index
pub const NOISE_CHANNEL: usize = 3;

/// Attenuation value that silences a channel
pub const SILENT: u8 = 15;

/// State of one PSG channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PsgChannelState {
    /// 4-bit attenuation (0 = loudest, 15 = silent)
    pub volume: u8,
    /// 10-bit tone period, or 3-bit noise mode on the noise channel
    pub value: u16,
    pub stereo_left: bool,
    pub stereo_right: bool,
    /// Volume or value written since the last snapshot
    pub dirty: bool,
    /// Value written since the last snapshot
    pub value_written: bool,
}

impl Default for PsgChannelState {
    fn default() -> Self {
        Self {
            volume: SILENT,
            value: 0,
            stereo_left: true,
            stereo_right: true,
            dirty: false,
            value_written: false,
        }
    }
}

impl PsgChannelState {
    pub fn is_silent(&self) -> bool {
        self.volume == SILENT
    }
}

/// Copy of all four channels at the end of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PsgSnapshot {
    pub channels: [PsgChannelState; SN76489_CHANNELS],
}

impl std::ops::Index<usize> for PsgSnapshot {
    type Output = PsgChannelState;

    fn index(&self, channel: usize) -> &PsgChannelState {
        &self.channels[channel]
    }
}

/// SN76489 register state tracker
///
/// # Register Layout
///
/// SN76489 uses a latch-based register interface:
/// - Latch byte (bit 7 = 1): selects channel and register type
///   - Bits 6-5: Channel (0-2 = tone, 3 = noise)
///   - Bit 4: Type (0 = tone/noise, 1 = attenuation)
///   - Bits 3-0: low 4 bits of the value
/// - Data byte (bit 7 = 0): bits 5-0 supply the upper 6 bits of a tone
///   period, or the whole value for attenuation and noise mode
///
/// The noise channel only keeps the low 3 bits of its value.
#[derive(Debug, Clone, Default)]
pub struct Sn76489State {
    channels: [PsgChannelState; SN76489_CHANNELS],
    /// Latched channel
    latch_channel: usize,
    /// Latched field: true = attenuation
    latch_volume: bool,
}

impl Sn76489State {
    /// Create a new SN76489 state tracker, all channels silent
    ///
    /// # Examples
    ///
    /// ```
    /// use chipscore::chip::state::{ChipState, Sn76489State};
    /// use chipscore::vgm::PsgWrite;
    ///
    /// let mut state = Sn76489State::new();
    /// state.apply(PsgWrite::Data(0x8E)); // latch tone 0, low bits 0xE
    /// state.apply(PsgWrite::Data(0x0F)); // high bits 0x0F
    /// assert_eq!(state.channel(0).value, 0x0FE);
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channel(&self, channel: usize) -> &PsgChannelState {
        &self.channels[channel]
    }

    pub fn snapshot(&self) -> PsgSnapshot {
        PsgSnapshot {
            channels: self.channels,
        }
    }

    /// Clear the per-snapshot change flags
    pub fn clear_dirty(&mut self) {
        for ch in &mut self.channels {
            ch.dirty = false;
            ch.value_written = false;
        }
    }

    /// Write a field of the latched channel
    ///
    /// # Arguments
    ///
    /// * `data` - Payload bits (4 bits from a latch byte, 6 from a data byte)
    /// * `high` - Whether the payload came from a data byte
    fn write_field(&mut self, data: u8, high: bool) {
        let ch = self.latch_channel;
        let state = &mut self.channels[ch];
        if self.latch_volume {
            state.volume = data & 0x0F;
        } else {
            let data = u16::from(data);
            state.value = if ch == NOISE_CHANNEL {
                data & 0x07
            } else if high {
                (data & 0x3F) << 4 | (state.value & 0x0F)
            } else {
                (data & 0x0F) | (state.value & 0x3F0)
            };
            state.value_written = true;
        }
        state.dirty = true;
    }

    fn write_stereo(&mut self, mask: u8) {
        for (i, ch) in self.channels.iter_mut().enumerate() {
            ch.stereo_left = mask & (0x10 << i) != 0;
            ch.stereo_right = mask & (0x01 << i) != 0;
        }
    }
}

impl ChipState for Sn76489State {
    type Write = PsgWrite;

    fn apply(&mut self, write: PsgWrite) {
        match write {
            PsgWrite::Stereo(mask) => self.write_stereo(mask),
            PsgWrite::Data(op) if op & 0x80 != 0 => {
                self.latch_channel = ((op & 0x60) >> 5) as usize;
                self.latch_volume = op & 0x10 != 0;
                self.write_field(op & 0x0F, false);
            }
            PsgWrite::Data(op) => self.write_field(op & 0x3F, true),
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    fn channel_count(&self) -> usize {
        SN76489_CHANNELS
    }
}

/// Frame-by-frame PSG snapshot producer
#[derive(Debug, Clone, Default)]
pub struct PsgTracker {
    state: Sn76489State,
    last_time: u64,
}

impl PsgTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a frame's PSG writes
    ///
    /// # Returns
    ///
    /// A snapshot if the frame contained at least one PSG write. Change
    /// flags are cleared after the snapshot is taken.
    pub fn process_frame(&mut self, frame: &Frame) -> Option<PsgSnapshot> {
        self.last_time = frame.time;
        if frame.psg.is_empty() {
            return None;
        }
        self.state.apply_all(&frame.psg);
        let snapshot = self.state.snapshot();
        self.state.clear_dirty();
        Some(snapshot)
    }

    /// Time of the last processed frame
    pub fn last_time(&self) -> u64 {
        self.last_time
    }
}

/// Snapshot stream of a whole frame sequence
///
/// One `(time, Some(snapshot))` per frame with PSG writes, followed by a
/// `(last frame time, None)` end marker.
pub fn process_psg(frames: &[Frame]) -> Vec<(u64, Option<PsgSnapshot>)> {
    let mut tracker = PsgTracker::new();
    let mut out: Vec<(u64, Option<PsgSnapshot>)> = frames
        .iter()
        .filter_map(|f| tracker.process_frame(f).map(|s| (f.time, Some(s))))
        .collect();
    out.push((tracker.last_time(), None));
    log::debug!("PSG: {} snapshots from {} frames", out.len() - 1, frames.len());
    out
}
