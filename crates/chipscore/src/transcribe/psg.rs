//! PSG snapshots to MIDI tracks.
//!
//! Each of the four channels gets its own track. Tone channels play on
//! consecutive MIDI channels from the configured base with a one-semitone
//! bend range for fine tuning; the noise channel plays a fixed drum note.
//! Tick values in the returned tracks are still sample times.
use crate::chip::Stereo;
use crate::chip::fnumber::{Pitch, hz_to_semitone, psg_frequency, wheel_value};
use crate::chip::state::sn76489::{
    NOISE_CHANNEL, PsgChannelState, PsgSnapshot, SILENT, SN76489_CHANNELS,
};
use crate::chip::synth::PSG_VOLUMES;
use crate::config::{PsgMapping, TranscodeConfig};
use crate::error::{Error, Result};
use crate::midi::{MetaEvent, MidiEvent, MidiTrack, TimedEvent, controller, pitch_bend_sensitivity};

/// Bend range of the tone channels, in semitones.
const PSG_BEND_RANGE: u8 = 1;

/// Note-on velocity for each attenuation step.
///
/// Velocity follows the square root of the output amplitude, scaled so
/// attenuation 0 maps to `max_velocity`.
pub fn psg_velocities(max_velocity: u8) -> [u8; 16] {
    PSG_VOLUMES.map(|v| ((f64::from(v) / 32767.0).sqrt() * f64::from(max_velocity)).round() as u8)
}

/// MIDI channel, note and optional wheel offset of a PSG channel value.
struct Key {
    channel: u8,
    note: u8,
    tune: Option<f64>,
}

struct PsgTrackBuilder<'a> {
    clock: u32,
    mapping: &'a PsgMapping,
    velocities: [u8; 16],
    tracks: [MidiTrack; SN76489_CHANNELS],
    has_notes: [bool; SN76489_CHANNELS],
}

impl PsgTrackBuilder<'_> {
    fn key(&self, ch: usize, value: u16, time: u64) -> Result<Key> {
        if ch == NOISE_CHANNEL {
            return Ok(Key {
                channel: self.mapping.drum_channel,
                note: self.mapping.drum_note,
                tune: None,
            });
        }
        let semitone = hz_to_semitone(psg_frequency(self.clock, value));
        let pitch = Pitch::from_semitone(semitone).map_err(|v| Error::invariant(time, v))?;
        Ok(Key {
            channel: self.mapping.base_channel + ch as u8,
            note: pitch.note,
            tune: Some(pitch.offset),
        })
    }

    fn push(&mut self, ch: usize, time: u64, event: impl Into<MidiEvent>) {
        self.tracks[ch].push(TimedEvent::new(time, event));
    }

    fn note_on(&mut self, ch: usize, time: u64, state: &PsgChannelState) -> Result<()> {
        let key = self.key(ch, state.value, time)?;
        let stereo = Stereo {
            left: state.stereo_left,
            right: state.stereo_right,
        };
        self.push(
            ch,
            time,
            MidiEvent::Control {
                channel: key.channel,
                controller: controller::PAN,
                value: stereo.pan_controller(),
            },
        );
        if let Some(tune) = key.tune {
            let value = wheel_value(key.channel, tune, f64::from(PSG_BEND_RANGE))
                .map_err(|v| Error::invariant(time, v))?;
            self.push(
                ch,
                time,
                MidiEvent::PitchWheel {
                    channel: key.channel,
                    value,
                },
            );
        }
        self.push(
            ch,
            time,
            MidiEvent::NoteOn {
                channel: key.channel,
                key: key.note,
                velocity: self.velocities[usize::from(state.volume & 0x0F)],
            },
        );
        self.has_notes[ch] = true;
        Ok(())
    }

    fn note_off(&mut self, ch: usize, time: u64, state: &PsgChannelState) -> Result<()> {
        let key = self.key(ch, state.value, time)?;
        self.push(
            ch,
            time,
            MidiEvent::NoteOff {
                channel: key.channel,
                key: key.note,
                velocity: 0,
            },
        );
        Ok(())
    }
}

/// Convert a PSG snapshot stream into tracks.
///
/// Per channel, against the previous snapshot: silent to silent and
/// unchanged states are skipped; falling silent ends the note; leaving
/// silence starts one. A change that keeps the value and does not get
/// louder is treated as decay of the held note; anything else retriggers.
/// The `None` sentinel releases held notes and closes every track.
///
/// Only channels that played at least one note are returned.
pub fn psg_to_tracks(
    snapshots: &[(u64, Option<PsgSnapshot>)],
    clock: u32,
    config: &TranscodeConfig,
) -> Result<Vec<MidiTrack>> {
    let mapping = &config.psg;
    let mut b = PsgTrackBuilder {
        clock,
        mapping,
        velocities: psg_velocities(mapping.max_velocity),
        tracks: Default::default(),
        has_notes: [false; SN76489_CHANNELS],
    };
    for ch in 0..SN76489_CHANNELS {
        b.push(ch, 0, MetaEvent::track_name(&format!("PSG {ch}")));
    }
    for ch in 0..NOISE_CHANNEL {
        let channel = mapping.base_channel + ch as u8;
        b.push(
            ch,
            0,
            MidiEvent::Program {
                channel,
                program: mapping.program,
            },
        );
        for e in pitch_bend_sensitivity(channel, PSG_BEND_RANGE, 0) {
            b.push(ch, 0, e);
        }
    }

    let mut prev = PsgSnapshot::default();
    for &(time, snapshot) in snapshots {
        let Some(state) = snapshot else {
            for ch in 0..SN76489_CHANNELS {
                if prev[ch].volume < SILENT {
                    b.note_off(ch, time, &prev[ch])?;
                }
                b.push(ch, time, MetaEvent::end_of_track());
            }
            break;
        };
        for ch in 0..SN76489_CHANNELS {
            let (old, new) = (&prev[ch], &state[ch]);
            let same_value = old.value == new.value;
            if new.is_silent() && old.is_silent() {
                continue;
            } else if new.volume == old.volume && same_value {
                continue;
            } else if new.is_silent() {
                b.note_off(ch, time, old)?;
            } else if old.is_silent() {
                b.note_on(ch, time, new)?;
            } else if new.volume >= old.volume && same_value {
                // decay of the held note
            } else {
                b.note_off(ch, time, old)?;
                b.note_on(ch, time, new)?;
            }
        }
        prev = state;
    }

    let PsgTrackBuilder {
        tracks, has_notes, ..
    } = b;
    let tracks: Vec<MidiTrack> = tracks
        .into_iter()
        .zip(has_notes)
        .filter_map(|(track, used)| used.then_some(track))
        .collect();
    log::debug!("PSG: {} channel tracks", tracks.len());
    Ok(tracks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(ch: usize, volume: u8, value: u16) -> PsgSnapshot {
        let mut s = PsgSnapshot::default();
        s.channels[ch].volume = volume;
        s.channels[ch].value = value;
        s
    }

    fn notes(track: &MidiTrack) -> Vec<(u64, bool, u8)> {
        track
            .iter()
            .filter_map(|e| match e.event {
                MidiEvent::NoteOn { key, .. } => Some((e.tick, true, key)),
                MidiEvent::NoteOff { key, .. } => Some((e.tick, false, key)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_velocity_table() {
        let v = psg_velocities(64);
        assert_eq!(v[0], 64);
        assert_eq!(v[15], 0);
        assert_eq!(v[2], 51); // sqrt(20675 / 32767) * 64
    }

    #[test]
    fn test_decay_is_absorbed_and_retrigger() {
        // 3579545 / 32 / 254 = 440.4 Hz, note 69
        let snaps = [
            (0, Some(snapshot(0, 2, 254))),
            (100, Some(snapshot(0, 6, 254))),
            (200, Some(snapshot(0, 3, 254))),
            (300, Some(snapshot(0, 15, 254))),
            (400, None),
        ];
        let tracks = psg_to_tracks(&snaps, 3_579_545, &TranscodeConfig::default()).unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(
            notes(&tracks[0]),
            vec![
                (0, true, 69),
                (200, false, 69),
                (200, true, 69),
                (300, false, 69)
            ]
        );
        let last = tracks[0].last().unwrap();
        assert!(last.event.is_end_of_track());
        assert_eq!(last.tick, 400);
    }

    #[test]
    fn test_tone_channel_setup() {
        let snaps = [(0, Some(snapshot(1, 0, 254))), (10, None)];
        let tracks = psg_to_tracks(&snaps, 3_579_545, &TranscodeConfig::default()).unwrap();
        let track = &tracks[0];
        assert_eq!(track[0].event, MidiEvent::Meta(MetaEvent::track_name("PSG 1")));
        assert_eq!(
            track[1].event,
            MidiEvent::Program {
                channel: 7,
                program: 80
            }
        );
        // Sentinel releases the sounding note at its time.
        assert_eq!(notes(track), vec![(0, true, 69), (10, false, 69)]);
        let wheel = track.iter().find_map(|e| match e.event {
            MidiEvent::PitchWheel { value, .. } => Some(value),
            _ => None,
        });
        // 440.4 Hz is about 1.6 cents sharp of A4.
        assert!(wheel.is_some_and(|w| (8192..8400).contains(&w)));
    }

    #[test]
    fn test_noise_channel_is_drum() {
        let mut s = snapshot(NOISE_CHANNEL, 4, 0x05);
        s.channels[NOISE_CHANNEL].stereo_right = false;
        let snaps = [(0, Some(s)), (50, None)];
        let tracks = psg_to_tracks(&snaps, 3_579_545, &TranscodeConfig::default()).unwrap();
        assert_eq!(tracks.len(), 1);
        let events: Vec<&MidiEvent> = tracks[0].iter().map(|e| &e.event).collect();
        assert_eq!(
            events[1..4],
            [
                &MidiEvent::Control {
                    channel: 9,
                    controller: 10,
                    value: 0
                },
                &MidiEvent::NoteOn {
                    channel: 9,
                    key: 40,
                    velocity: psg_velocities(64)[4]
                },
                &MidiEvent::NoteOff {
                    channel: 9,
                    key: 40,
                    velocity: 0
                },
            ]
        );
    }
}
