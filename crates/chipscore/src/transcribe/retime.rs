//! Sample-time to tick conversion.
use crate::config::TranscodeConfig;
use crate::midi::{MetaEvent, MidiTrack, TimedEvent};

/// Tick position of a sample time.
///
/// Times after sample 0 are shifted by the configured tick offset so a
/// leading silence can be padded out without moving the setup events.
pub fn sample_to_tick(sample: u64, config: &TranscodeConfig) -> u64 {
    let samples_per_tick =
        config.seconds_per_beat * f64::from(config.sample_rate) / f64::from(config.ticks_per_beat);
    let tick = (sample as f64 / samples_per_tick).round() as u64;
    if sample > 0 {
        tick + config.tick_offset
    } else {
        tick
    }
}

/// Tempo and time-signature events for the head of the conductor track.
pub fn conductor_events(config: &TranscodeConfig) -> Vec<TimedEvent> {
    let micros = (config.seconds_per_beat * 1e6).round() as u32;
    let mut events = vec![TimedEvent::new(0, MetaEvent::tempo(micros))];
    let tpb = u64::from(config.ticks_per_beat);
    let mut tick = 0;
    for segment in &config.time_signatures {
        events.push(TimedEvent::new(
            tick,
            MetaEvent::time_signature(segment.numerator, segment.denominator),
        ));
        tick += u64::from(segment.measures) * u64::from(segment.numerator) * tpb * 4
            / u64::from(segment.denominator);
    }
    events
}

/// Rewrite every event time from samples to ticks and add the conductor
/// events to track 0.
///
/// Track 0 is created when `tracks` is empty.
pub fn retime(mut tracks: Vec<MidiTrack>, config: &TranscodeConfig) -> Vec<MidiTrack> {
    for track in &mut tracks {
        for event in track.iter_mut() {
            event.tick = sample_to_tick(event.tick, config);
        }
    }
    if tracks.is_empty() {
        tracks.push(MidiTrack::new());
    }
    let first = &mut tracks[0];
    let mut head = conductor_events(config);
    head.append(first);
    head.sort_by_key(|e| e.tick);
    *first = head;
    tracks
}
