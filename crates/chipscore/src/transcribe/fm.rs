//! FM events to MIDI tracks.
//!
//! Every song instrument gets its own track (`"FM n"`, program `n`), so a
//! channel's notes move between tracks as it changes patch. Tick values in
//! the returned tracks are still sample times.
use crate::chip::FmEvent;
use crate::chip::fnumber::{Pitch, fm_semitone, wheel_value};
use crate::chip::instrument::InstrumentRegistry;
use crate::chip::state::ym2612::YM2612_CHANNELS;
use crate::config::TranscodeConfig;
use crate::error::{Error, InvariantViolation, Result};
use crate::midi::{MetaEvent, MidiEvent, MidiTrack, TimedEvent, controller, pitch_bend_sensitivity};

/// Note currently held on a channel: track index and MIDI note.
#[derive(Debug, Clone, Copy)]
struct HeldNote {
    track: usize,
    note: u8,
}

/// Record every note-on in `registry`, in event order.
///
/// Instruments are interned on first use so track numbering follows the
/// order in which patches are first heard.
pub fn register_instruments(events: &[FmEvent], registry: &mut InstrumentRegistry) {
    for event in events {
        if let FmEvent::NoteOn {
            instrument,
            frequency,
            ..
        } = event
        {
            registry.record_note(*instrument, fm_semitone(*frequency));
        }
    }
}

/// Bend range in whole cents, as sent in the sensitivity RPN.
///
/// Wheel values are scaled by this same range so the receiver hears the
/// intended pitch whatever the fractional part of `max_bend`.
fn bend_range_cents(max_bend: f64) -> u16 {
    (max_bend * 100.0).round().clamp(1.0, 12_700.0) as u16
}

/// Convert FM events into one track per registered instrument.
///
/// `end_time` is the sample time of the end-of-track events. Track 0 also
/// carries the pitch-bend sensitivity setup of all six channels.
pub fn fm_to_tracks(
    events: &[FmEvent],
    registry: &mut InstrumentRegistry,
    config: &TranscodeConfig,
    end_time: u64,
) -> Result<Vec<MidiTrack>> {
    register_instruments(events, registry);
    let bend_cents = bend_range_cents(config.max_bend);
    let max_bend = f64::from(bend_cents) / 100.0;
    let velocity = config.fm_velocity;

    let mut tracks: Vec<MidiTrack> = (0..registry.len())
        .map(|ix| vec![TimedEvent::new(0, MetaEvent::track_name(&format!("FM {ix}")))])
        .collect();
    if let Some(first) = tracks.first_mut() {
        for ch in 0..YM2612_CHANNELS as u8 {
            first.extend(
                pitch_bend_sensitivity(ch, (bend_cents / 100) as u8, (bend_cents % 100) as u8)
                    .into_iter()
                    .map(|e| TimedEvent::new(0, e)),
            );
        }
    }

    let mut held: [Option<HeldNote>; YM2612_CHANNELS] = [None; YM2612_CHANNELS];
    for event in events {
        let time = event.time();
        let channel = event.channel();
        let slot = &mut held[usize::from(channel)];
        let at = |v: InvariantViolation| Error::invariant(time, v);
        match *event {
            FmEvent::NoteOn {
                instrument,
                frequency,
                stereo,
                ..
            } => {
                if slot.is_some() {
                    return Err(at(InvariantViolation::NoteOnWhileSounding { channel }));
                }
                let track = registry
                    .get(&instrument)
                    .unwrap_or_else(|| registry.intern(instrument));
                let pitch = Pitch::from_semitone(fm_semitone(frequency)).map_err(at)?;
                let wheel = wheel_value(channel, pitch.offset, max_bend).map_err(at)?;
                let out = &mut tracks[track];
                out.push(TimedEvent::new(
                    time,
                    MidiEvent::PitchWheel {
                        channel,
                        value: wheel,
                    },
                ));
                out.push(TimedEvent::new(
                    time,
                    MidiEvent::Program {
                        channel,
                        program: (track & 0x7F) as u8,
                    },
                ));
                out.push(TimedEvent::new(
                    time,
                    MidiEvent::Control {
                        channel,
                        controller: controller::PAN,
                        value: stereo.pan_controller(),
                    },
                ));
                out.push(TimedEvent::new(
                    time,
                    MidiEvent::NoteOn {
                        channel,
                        key: pitch.note,
                        velocity,
                    },
                ));
                *slot = Some(HeldNote {
                    track,
                    note: pitch.note,
                });
            }
            FmEvent::NoteOff { .. } => {
                let HeldNote { track, note } = slot
                    .take()
                    .ok_or_else(|| at(InvariantViolation::StrayNoteOff { channel }))?;
                tracks[track].push(TimedEvent::new(
                    time,
                    MidiEvent::NoteOff {
                        channel,
                        key: note,
                        velocity,
                    },
                ));
            }
            FmEvent::FrequencyChange { frequency, .. } => {
                let HeldNote { track, note } =
                    slot.ok_or_else(|| at(InvariantViolation::StrayFrequencyChange { channel }))?;
                let bend = fm_semitone(frequency) - f64::from(note);
                let wheel = wheel_value(channel, bend, max_bend).map_err(at)?;
                tracks[track].push(TimedEvent::new(
                    time,
                    MidiEvent::PitchWheel {
                        channel,
                        value: wheel,
                    },
                ));
            }
            FmEvent::InstrumentChange { .. } => {
                return Err(at(InvariantViolation::InstrumentChangeMidNote { channel }));
            }
        }
    }

    for track in &mut tracks {
        track.push(TimedEvent::new(end_time, MetaEvent::end_of_track()));
    }
    log::debug!("FM: {} instrument tracks", tracks.len());
    Ok(tracks)
}
