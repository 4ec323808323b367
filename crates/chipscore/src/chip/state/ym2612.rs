//! YM2612 (OPN2) chip state implementation.
//!
//! This module provides the register model of the Yamaha YM2612 FM chip
//! found in the Sega Genesis/Mega Drive, and [`FmTracker`], which turns a
//! frame sequence into note-level [`FmEvent`]s.

use super::chip_state::ChipState;
use super::storage::{ArrayStorage, RegisterStorage};
use crate::chip::event::{FmEvent, Stereo};
use crate::chip::fnumber::fm_word;
use crate::chip::instrument::{FmInstrument, OPERATOR_REGISTERS};
use crate::error::{Error, InvariantViolation, Result, UnsupportedFeature};
use crate::vgm::{FmWrite, Frame};

/// One 256-register page of the YM2612
pub type Ym2612Page = ArrayStorage<u8, 256>;

/// YM2612 has 6 FM channels
pub const YM2612_CHANNELS: usize = 6;

/// Key on/off register (port 0 only)
const REG_KEY_ON: u8 = 0x28;
/// Timer control and channel 3 mode
const REG_CH3_MODE: u8 = 0x27;
/// DAC enable
const REG_DAC_ENABLE: u8 = 0x2B;

/// YM2612 register state
///
/// Holds both register pages and the operator key-on mask of each channel.
///
/// # Port Handling
///
/// - Port 0: Controls channels 0-2
/// - Port 1: Controls channels 3-5
///
/// Per-channel registers are addressed by `base + local channel` on the
/// port that owns the channel.
#[derive(Debug, Clone, Default)]
pub struct Ym2612State {
    pages: [Ym2612Page; 2],
    key_masks: [u8; YM2612_CHANNELS],
}

impl Ym2612State {
    /// Create a new YM2612 state tracker with all registers cleared
    ///
    /// # Examples
    ///
    /// ```
    /// use chipscore::chip::state::{ChipState, Ym2612State};
    /// use chipscore::vgm::FmWrite;
    ///
    /// let mut state = Ym2612State::new();
    /// state.apply(FmWrite::new(0, 0x28, 0xF1));
    /// assert_eq!(state.key_mask(1), 0x0F);
    /// assert!(state.is_enabled(1));
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a register, unwritten registers read as zero
    ///
    /// # Arguments
    ///
    /// * `port` - Port number (0 or 1, other values are masked)
    /// * `register` - Register address
    pub fn register(&self, port: u8, register: u8) -> u8 {
        self.pages[(port & 1) as usize].read_or_zero(register)
    }

    /// Split a global channel index into (port, local channel)
    fn locate(channel: usize) -> (u8, u8) {
        ((channel / 3) as u8, (channel % 3) as u8)
    }

    fn channel_register(&self, channel: usize, base: u8) -> u8 {
        let (port, local) = Self::locate(channel);
        self.register(port, base + local)
    }

    /// Operator key-on mask (0-15) of a channel
    pub fn key_mask(&self, channel: usize) -> u8 {
        self.key_masks[channel]
    }

    /// Whether any operator of the channel is keyed on
    pub fn is_enabled(&self, channel: usize) -> bool {
        self.key_masks[channel] != 0
    }

    /// Frequency word of a channel (`A4 << 8 | A0`)
    pub fn frequency(&self, channel: usize) -> u16 {
        fm_word(
            self.channel_register(channel, 0xA4),
            self.channel_register(channel, 0xA0),
        )
    }

    /// Stereo placement from the channel's `0xB4` register
    pub fn stereo(&self, channel: usize) -> Stereo {
        Stereo::from_pan_bits(self.channel_register(channel, 0xB4))
    }

    /// Current instrument identity of a channel
    pub fn instrument(&self, channel: usize) -> FmInstrument {
        let mut operators = [0u8; OPERATOR_REGISTERS];
        for (i, op) in operators.iter_mut().enumerate() {
            *op = self.channel_register(channel, 0x30 + 4 * i as u8);
        }
        FmInstrument::new(
            operators,
            self.channel_register(channel, 0xB0),
            self.channel_register(channel, 0xB4),
            self.key_masks[channel],
        )
    }

    /// Check for hardware features that replace a channel's normal output
    ///
    /// Channel 2 (0-based) may be switched into per-operator frequency mode,
    /// and channel 5 may be replaced by the DAC.
    pub fn unsupported_feature(&self, channel: usize) -> Option<UnsupportedFeature> {
        match channel {
            2 if self.register(0, REG_CH3_MODE) & 0xC0 != 0 => {
                Some(UnsupportedFeature::Ch3SpecialMode)
            }
            5 if self.register(0, REG_DAC_ENABLE) & 0x80 != 0 => Some(UnsupportedFeature::Dac),
            _ => None,
        }
    }

    /// Handle key on/off register write (0x28)
    ///
    /// Register 0x28 format:
    /// - Bits 0-2: Channel selection
    ///   - 0, 1, 2: Channels 0-2 (port 0)
    ///   - 4, 5, 6: Channels 3-5 (port 1)
    /// - Bits 4-7: Operator mask
    fn handle_key_on_off(&mut self, value: u8) {
        let ch_bits = value & 0x07;
        let channel = match ch_bits {
            0..=2 => ch_bits as usize,
            4..=6 => (ch_bits - 1) as usize,
            _ => {
                log::warn!("ignoring key-on write 0x{value:02X} to unused channel slot {ch_bits}");
                return;
            }
        };
        self.key_masks[channel] = value >> 4;
    }
}

impl ChipState for Ym2612State {
    type Write = FmWrite;

    fn apply(&mut self, write: FmWrite) {
        if write.port == 0 && write.register == REG_KEY_ON {
            self.handle_key_on_off(write.value);
        } else {
            self.pages[(write.port & 1) as usize].write(write.register, write.value);
        }
    }

    fn reset(&mut self) {
        for page in &mut self.pages {
            page.clear();
        }
        self.key_masks = [0; YM2612_CHANNELS];
    }

    fn channel_count(&self) -> usize {
        YM2612_CHANNELS
    }
}

/// Frame-by-frame FM note tracker
///
/// After applying each frame's writes, every channel is compared with the
/// values last reported for it:
///
/// | before | after | event |
/// |---|---|---|
/// | off | off | none |
/// | on | on | `InstrumentChange` and/or `FrequencyChange` if they differ |
/// | on | off | `NoteOff` |
/// | off | on | `NoteOn` |
#[derive(Debug, Clone, Default)]
pub struct FmTracker {
    state: Ym2612State,
    prev_enabled: [bool; YM2612_CHANNELS],
    prev_instrument: [Option<FmInstrument>; YM2612_CHANNELS],
    prev_frequency: [Option<u16>; YM2612_CHANNELS],
    last_time: u64,
}

impl FmTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &Ym2612State {
        &self.state
    }

    /// Apply a frame and report the resulting channel transitions
    ///
    /// # Returns
    ///
    /// Events in channel order, or an invariant violation if a channel
    /// uses channel-3 special mode or the DAC.
    pub fn process_frame(&mut self, frame: &Frame) -> Result<Vec<FmEvent>> {
        self.state.apply_all(&frame.fm);
        self.last_time = frame.time;

        let mut events = Vec::new();
        for ch in 0..YM2612_CHANNELS {
            if let Some(feature) = self.state.unsupported_feature(ch) {
                return Err(Error::invariant(
                    frame.time,
                    InvariantViolation::UnsupportedFeature(feature),
                ));
            }
            let channel = ch as u8;
            let enabled = self.state.is_enabled(ch);
            let instrument = self.state.instrument(ch);
            let frequency = self.state.frequency(ch);
            match (self.prev_enabled[ch], enabled) {
                (false, false) => {}
                (true, true) => {
                    if self.prev_instrument[ch] != Some(instrument) {
                        events.push(FmEvent::InstrumentChange {
                            time: frame.time,
                            channel,
                            instrument,
                        });
                        self.prev_instrument[ch] = Some(instrument);
                    }
                    if self.prev_frequency[ch] != Some(frequency) {
                        events.push(FmEvent::FrequencyChange {
                            time: frame.time,
                            channel,
                            frequency,
                        });
                        self.prev_frequency[ch] = Some(frequency);
                    }
                }
                (true, false) => events.push(FmEvent::NoteOff {
                    time: frame.time,
                    channel,
                }),
                (false, true) => {
                    events.push(FmEvent::NoteOn {
                        time: frame.time,
                        channel,
                        instrument,
                        frequency,
                        stereo: self.state.stereo(ch),
                    });
                    self.prev_instrument[ch] = Some(instrument);
                    self.prev_frequency[ch] = Some(frequency);
                }
            }
            self.prev_enabled[ch] = enabled;
        }
        Ok(events)
    }

    /// Release every channel still sounding at the last processed frame time
    pub fn finish(&mut self) -> Vec<FmEvent> {
        let mut events = Vec::new();
        for ch in 0..YM2612_CHANNELS {
            if std::mem::take(&mut self.prev_enabled[ch]) {
                events.push(FmEvent::NoteOff {
                    time: self.last_time,
                    channel: ch as u8,
                });
            }
        }
        events
    }
}

/// Run a whole frame sequence through a fresh [`FmTracker`]
pub fn process_fm(frames: &[Frame]) -> Result<Vec<FmEvent>> {
    let mut tracker = FmTracker::new();
    let mut events = Vec::new();
    for frame in frames {
        events.extend(tracker.process_frame(frame)?);
    }
    events.extend(tracker.finish());
    log::debug!("FM: {} events from {} frames", events.len(), frames.len());
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn frame(time: u64, writes: &[(u8, u8, u8)]) -> Frame {
        Frame {
            time,
            fm: writes
                .iter()
                .map(|&(p, r, v)| FmWrite::new(p, r, v))
                .collect(),
            psg: Vec::new(),
        }
    }

    #[test]
    fn test_ym2612_key_on_channel_mapping() {
        let mut state = Ym2612State::new();
        state.apply(FmWrite::new(0, 0x28, 0xF0));
        state.apply(FmWrite::new(0, 0x28, 0x34));
        state.apply(FmWrite::new(0, 0x28, 0x16));
        assert_eq!(state.key_mask(0), 0x0F);
        assert_eq!(state.key_mask(3), 0x03);
        assert_eq!(state.key_mask(5), 0x01);
        // Key-on register is not stored in the page
        assert_eq!(state.register(0, 0x28), 0);
    }

    #[test]
    fn test_ym2612_invalid_channel_slot_ignored() {
        let mut state = Ym2612State::new();
        state.apply(FmWrite::new(0, 0x28, 0xF3));
        state.apply(FmWrite::new(0, 0x28, 0xF7));
        assert!((0..YM2612_CHANNELS).all(|ch| !state.is_enabled(ch)));
    }

    #[test]
    fn test_ym2612_port1_register_reaches_channel_3() {
        let mut state = Ym2612State::new();
        state.apply(FmWrite::new(1, 0xA4, 0x1A));
        state.apply(FmWrite::new(1, 0xA0, 0x80));
        state.apply(FmWrite::new(1, 0xB4, 0x80));
        assert_eq!(state.frequency(3), 0x1A80);
        assert_eq!(state.frequency(0), 0);
        assert_eq!(state.stereo(3), Stereo { left: true, right: false });
    }

    #[test]
    fn test_ym2612_instrument_ignores_pan() {
        let mut state = Ym2612State::new();
        state.apply(FmWrite::new(0, 0x31, 0x71));
        state.apply(FmWrite::new(0, 0xB5, 0x80));
        let left = state.instrument(1);
        state.apply(FmWrite::new(0, 0xB5, 0x40));
        assert_eq!(state.instrument(1), left);
        state.apply(FmWrite::new(0, 0x41, 0x10));
        assert_ne!(state.instrument(1), left);
    }

    #[test]
    fn test_fm_tracker_note_lifecycle() {
        let frames = [
            frame(0, &[(0, 0xA4, 0x22), (0, 0xA0, 0x6D), (0, 0x28, 0xF0)]),
            frame(100, &[(0, 0xA0, 0x70)]),
            frame(200, &[(0, 0x28, 0x00)]),
            frame(300, &[]),
        ];
        let events = process_fm(&frames).unwrap();
        assert_eq!(events.len(), 3);
        assert!(matches!(
            events[0],
            FmEvent::NoteOn {
                time: 0,
                channel: 0,
                frequency: 0x226D,
                stereo: Stereo {
                    left: false,
                    right: false
                },
                ..
            }
        ));
        assert_eq!(
            events[1],
            FmEvent::FrequencyChange {
                time: 100,
                channel: 0,
                frequency: 0x2270
            }
        );
        assert_eq!(events[2], FmEvent::NoteOff { time: 200, channel: 0 });
    }

    #[test]
    fn test_fm_tracker_instrument_change_reported() {
        let mut tracker = FmTracker::new();
        tracker
            .process_frame(&frame(0, &[(0, 0x28, 0xF1)]))
            .unwrap();
        let events = tracker
            .process_frame(&frame(10, &[(0, 0x41, 0x20)]))
            .unwrap();
        assert!(matches!(
            events.as_slice(),
            [FmEvent::InstrumentChange { time: 10, channel: 1, .. }]
        ));
    }

    #[test]
    fn test_fm_tracker_finish_releases_sounding_channels() {
        let mut tracker = FmTracker::new();
        tracker
            .process_frame(&frame(0, &[(0, 0x28, 0xF0), (0, 0x28, 0xF5)]))
            .unwrap();
        tracker.process_frame(&frame(500, &[])).unwrap();
        assert_eq!(
            tracker.finish(),
            vec![
                FmEvent::NoteOff { time: 500, channel: 0 },
                FmEvent::NoteOff { time: 500, channel: 4 },
            ]
        );
        assert!(tracker.finish().is_empty());
    }

    #[test]
    fn test_fm_tracker_rejects_dac_and_ch3_mode() {
        let mut tracker = FmTracker::new();
        let err = tracker
            .process_frame(&frame(7, &[(0, 0x2B, 0x80)]))
            .unwrap_err();
        assert_eq!(
            err.violation(),
            Some(&InvariantViolation::UnsupportedFeature(UnsupportedFeature::Dac))
        );

        let mut tracker = FmTracker::new();
        let err = tracker
            .process_frame(&frame(0, &[(0, 0x27, 0x40)]))
            .unwrap_err();
        assert_eq!(
            err.violation(),
            Some(&InvariantViolation::UnsupportedFeature(
                UnsupportedFeature::Ch3SpecialMode
            ))
        );

        // Timer bits alone are fine.
        let mut tracker = FmTracker::new();
        assert!(tracker.process_frame(&frame(0, &[(0, 0x27, 0x15)])).is_ok());
    }
}
