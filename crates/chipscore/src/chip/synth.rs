//! SN76489 waveform synthesizer.
//!
//! Replays a PSG snapshot stream at the output sample rate, one stereo
//! buffer per channel, so individual channels can be auditioned. Each
//! generator keeps a down-counter that loses `clock / 16` per output sample
//! and toggles its square output when the counter reaches zero, reloading
//! with `period * sample_rate`. Working in these units keeps the divider
//! exact without fractional steps.
use std::io::{Seek, Write};
use std::path::Path;

use crate::chip::state::sn76489::{NOISE_CHANNEL, PsgSnapshot, SN76489_CHANNELS};
use crate::error::Result;

/// Output level for each attenuation step (2 dB per step, 15 = off).
pub const PSG_VOLUMES: [i16; 16] = [
    32767, 26028, 20675, 16422, 13045, 10362, 8231, 6568, 5193, 4125, 3277, 2603, 2067, 1642,
    1304, 0,
];

/// Power-on value of the noise shift register.
pub const INITIAL_LFSR: u16 = 0x8000;

/// 16-bit noise shift register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lfsr {
    pub value: u16,
    /// White noise (feedback from bits 0 and 3) rather than periodic.
    pub white: bool,
}

impl Lfsr {
    pub fn new(white: bool) -> Self {
        Self {
            value: INITIAL_LFSR,
            white,
        }
    }

    /// Shift once and return the bit shifted out.
    pub fn shift(&mut self) -> bool {
        let out = self.value & 1;
        let feedback = if self.white {
            out ^ ((self.value >> 3) & 1)
        } else {
            out
        };
        self.value = self.value >> 1 | feedback << 15;
        out != 0
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Divider {
    step: i64,
    counter: i64,
    high: bool,
}

impl Divider {
    /// Advance one output sample; returns true on a toggle.
    fn tick(&mut self, reload: i64) -> bool {
        self.counter -= self.step;
        if self.counter <= 0 {
            self.high = !self.high;
            self.counter += reload;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ToneGenerator {
    divider: Divider,
    reload: i64,
    active: bool,
}

impl ToneGenerator {
    fn set_period(&mut self, period: u16, sample_rate: i64) {
        if period <= 1 {
            self.active = false;
            self.reload = 0;
            self.divider.counter = 0;
        } else {
            self.active = true;
            self.reload = i64::from(period) * sample_rate;
            self.divider.counter = self.reload;
        }
    }

    fn next_bit(&mut self) -> bool {
        if !self.active {
            return true;
        }
        self.divider.tick(self.reload);
        self.divider.high
    }
}

#[derive(Debug, Clone, Copy)]
struct NoiseGenerator {
    divider: Divider,
    mode: u8,
    lfsr: Lfsr,
    output: bool,
}

impl NoiseGenerator {
    fn set_mode(&mut self, value: u16) {
        self.mode = (value & 3) as u8;
        self.lfsr = Lfsr::new(value & 4 != 0);
        self.output = false;
    }

    fn reload(&self, sample_rate: i64, tone2: &ToneGenerator) -> i64 {
        match self.mode {
            3 => tone2.reload,
            m => sample_rate << (m + 4),
        }
    }

    fn next_bit(&mut self, reload: i64) -> bool {
        let toggled = self.divider.tick(reload);
        if toggled && self.divider.high {
            self.output = self.lfsr.shift();
        }
        self.output
    }
}

/// Per-channel stereo sample buffers.
#[derive(Debug, Clone, Default)]
pub struct PsgRender {
    pub sample_rate: u32,
    channels: [Vec<[i16; 2]>; SN76489_CHANNELS],
    audible: [bool; SN76489_CHANNELS],
}

impl PsgRender {
    pub fn samples(&self, channel: usize) -> &[[i16; 2]] {
        &self.channels[channel]
    }

    /// Whether every enabled sample of the channel was zero.
    pub fn is_silent(&self, channel: usize) -> bool {
        !self.audible[channel]
    }

    /// Write one channel as a 16-bit stereo WAV stream.
    pub fn write_wav<W: Write + Seek>(&self, channel: usize, writer: W) -> Result<()> {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut wav = hound::WavWriter::new(writer, spec)?;
        for &[l, r] in &self.channels[channel] {
            wav.write_sample(l)?;
            wav.write_sample(r)?;
        }
        wav.finalize()?;
        Ok(())
    }

    /// Write every audible channel to `dir/<prefix><channel>.wav`.
    ///
    /// Returns the channels that were written.
    pub fn write_wav_files(&self, dir: &Path, prefix: &str) -> Result<Vec<usize>> {
        let mut written = Vec::new();
        for ch in 0..SN76489_CHANNELS {
            if self.is_silent(ch) {
                continue;
            }
            let path = dir.join(format!("{prefix}{ch}.wav"));
            let file = std::io::BufWriter::new(std::fs::File::create(&path)?);
            self.write_wav(ch, file)?;
            log::info!("wrote {}", path.display());
            written.push(ch);
        }
        Ok(written)
    }
}

/// Sample-accurate SN76489 generator bank.
#[derive(Debug, Clone)]
pub struct PsgSynth {
    sample_rate: i64,
    tones: [ToneGenerator; 3],
    noise: NoiseGenerator,
}

impl PsgSynth {
    /// # Arguments
    ///
    /// * `clock` - SN76489 master clock in Hz
    /// * `sample_rate` - Output sample rate in Hz
    pub fn new(clock: u32, sample_rate: u32) -> Self {
        let divider = Divider {
            step: i64::from(clock / 16),
            ..Default::default()
        };
        let mut noise = NoiseGenerator {
            divider,
            mode: 0,
            lfsr: Lfsr::new(false),
            output: false,
        };
        noise.set_mode(0);
        Self {
            sample_rate: i64::from(sample_rate),
            tones: [ToneGenerator {
                divider,
                ..Default::default()
            }; 3],
            noise,
        }
    }

    /// Reload the generators whose value was written in `snapshot`.
    pub fn load(&mut self, snapshot: &PsgSnapshot) {
        for (ch, tone) in self.tones.iter_mut().enumerate() {
            if snapshot[ch].value_written {
                tone.set_period(snapshot[ch].value, self.sample_rate);
            }
        }
        if snapshot[NOISE_CHANNEL].value_written {
            self.noise.set_mode(snapshot[NOISE_CHANNEL].value);
        }
    }

    /// Produce the next output bit of every channel.
    pub fn next_bits(&mut self) -> [bool; SN76489_CHANNELS] {
        let mut bits = [false; SN76489_CHANNELS];
        for (bit, tone) in bits.iter_mut().zip(self.tones.iter_mut()) {
            *bit = tone.next_bit();
        }
        let reload = self.noise.reload(self.sample_rate, &self.tones[2]);
        bits[NOISE_CHANNEL] = self.noise.next_bit(reload);
        bits
    }
}

/// Render a snapshot stream (as produced by
/// [`process_psg`](crate::chip::state::sn76489::process_psg)).
///
/// Samples between two snapshot times are generated with the volumes and
/// stereo flags of the earlier snapshot; before the first snapshot every
/// channel is silent.
pub fn render_psg(
    clock: u32,
    sample_rate: u32,
    snapshots: &[(u64, Option<PsgSnapshot>)],
) -> PsgRender {
    let mut synth = PsgSynth::new(clock, sample_rate);
    let mut render = PsgRender {
        sample_rate,
        ..Default::default()
    };
    let mut current = PsgSnapshot::default();
    let mut prev_time = 0u64;

    for &(time, next) in snapshots {
        for _ in prev_time..time {
            let bits = synth.next_bits();
            for ch in 0..SN76489_CHANNELS {
                let state = &current[ch];
                let vol = PSG_VOLUMES[usize::from(state.volume & 0x0F)];
                let sample = if bits[ch] { vol } else { -vol };
                let l = if state.stereo_left { sample } else { 0 };
                let r = if state.stereo_right { sample } else { 0 };
                if sample != 0 && (state.stereo_left || state.stereo_right) {
                    render.audible[ch] = true;
                }
                render.channels[ch].push([l, r]);
            }
        }
        if let Some(snapshot) = next {
            synth.load(&snapshot);
            current = snapshot;
        }
        prev_time = prev_time.max(time);
    }
    log::debug!(
        "rendered {} PSG samples, audible channels {:?}",
        prev_time,
        render.audible
    );
    render
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::state::sn76489::PsgChannelState;

    fn lfsr_period(white: bool) -> usize {
        let mut lfsr = Lfsr::new(white);
        let mut n = 0;
        loop {
            lfsr.shift();
            n += 1;
            if lfsr.value == INITIAL_LFSR {
                return n;
            }
        }
    }

    #[test]
    fn test_lfsr_periods() {
        assert_eq!(lfsr_period(false), 16);
        assert_eq!(lfsr_period(true), 57337);
    }

    #[test]
    fn test_periodic_noise_pattern() {
        let mut lfsr = Lfsr::new(false);
        let bits: Vec<bool> = (0..17).map(|_| lfsr.shift()).collect();
        assert_eq!(bits.iter().filter(|&&b| b).count(), 1);
        assert!(bits[15]);
        assert!(!bits[16]);
    }

    fn tone_snapshot(period: u16, volume: u8) -> PsgSnapshot {
        let mut s = PsgSnapshot::default();
        s.channels[0] = PsgChannelState {
            volume,
            value: period,
            dirty: true,
            value_written: true,
            ..Default::default()
        };
        s
    }

    #[test]
    fn test_tone_square_wave_frequency() {
        // clock/16 = 100 per sample, reload = 4 * 100: toggles every 4 samples.
        let snaps = [(0, Some(tone_snapshot(4, 0))), (16, None)];
        let render = render_psg(1600, 100, &snaps);
        let left: Vec<i16> = render.samples(0).iter().map(|s| s[0]).collect();
        assert_eq!(left.len(), 16);
        let hi = 32767;
        assert_eq!(
            left,
            vec![-hi, -hi, -hi, hi, hi, hi, hi, -hi, -hi, -hi, -hi, hi, hi, hi, hi, -hi]
        );
        assert!(!render.is_silent(0));
        assert!(render.is_silent(1));
        assert!(render.is_silent(3));
    }

    #[test]
    fn test_inactive_period_is_constant_high() {
        let snaps = [(0, Some(tone_snapshot(1, 2))), (8, None)];
        let render = render_psg(3_579_545, 44_100, &snaps);
        assert!(render.samples(0).iter().all(|s| *s == [20675, 20675]));
    }

    #[test]
    fn test_stereo_gating_and_silence() {
        let mut snap = tone_snapshot(4, 0);
        snap.channels[0].stereo_left = false;
        snap.channels[0].stereo_right = false;
        let render = render_psg(1600, 100, &[(0, Some(snap)), (10, None)]);
        assert!(render.samples(0).iter().all(|s| *s == [0, 0]));
        assert!(render.is_silent(0));
    }

    #[test]
    fn test_write_wav_header() {
        let snaps = [(0, Some(tone_snapshot(4, 0))), (10, None)];
        let render = render_psg(1600, 100, &snaps);
        let mut buf = std::io::Cursor::new(Vec::new());
        render.write_wav(0, &mut buf).unwrap();
        let bytes = buf.into_inner();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        // 10 frames * 2 channels * 2 bytes
        assert_eq!(bytes.len(), 44 + 40);
    }
}
