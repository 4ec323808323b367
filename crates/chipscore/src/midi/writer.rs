//! Standard MIDI File encoding.
use crate::binutil::ParseError;
use crate::midi::event::{MetaEvent, MidiEvent, MidiFile, TimedEvent};
use crate::midi::reader::{HEADER_CHUNK, TRACK_CHUNK};
use crate::midi::vlq::write_vlq;

fn check_data(field: &'static str, value: u8) -> Result<u8, ParseError> {
    if value & 0x80 != 0 {
        return Err(ParseError::ValueOutOfRange {
            field,
            value: u64::from(value),
        });
    }
    Ok(value)
}

fn write_chunk(out: &mut Vec<u8>, ident: [u8; 4], body: &[u8]) -> Result<(), ParseError> {
    let len = u32::try_from(body.len()).map_err(|_| ParseError::ValueOutOfRange {
        field: "chunk length",
        value: body.len() as u64,
    })?;
    out.extend_from_slice(&ident);
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(body);
    Ok(())
}

/// Encode a Standard MIDI File.
///
/// Each track is sorted stably by tick and written with running status.
/// Any end-of-track events in the input are dropped and a single one is
/// written last, at the tick of the latest event.
pub fn write_midi(midi: &MidiFile) -> Result<Vec<u8>, ParseError> {
    let ntracks = u16::try_from(midi.tracks.len()).map_err(|_| ParseError::ValueOutOfRange {
        field: "track count",
        value: midi.tracks.len() as u64,
    })?;
    let mut out = Vec::new();
    let mut header = Vec::with_capacity(6);
    header.extend_from_slice(&midi.file_type.code().to_be_bytes());
    header.extend_from_slice(&ntracks.to_be_bytes());
    header.extend_from_slice(&midi.timebase.division().to_be_bytes());
    write_chunk(&mut out, HEADER_CHUNK, &header)?;

    for track in &midi.tracks {
        write_chunk(&mut out, TRACK_CHUNK, &encode_track(track)?)?;
    }
    log::debug!("wrote MIDI with {} tracks, {} bytes", ntracks, out.len());
    Ok(out)
}

/// Encode the body of one track chunk.
///
/// A SysEx fragment ends in `F7` only when it is terminal. A non-terminal
/// fragment followed by one for the same device is continued with an `F7`
/// packet; otherwise the next SysEx starts a new `F0` message.
pub fn encode_track(track: &[TimedEvent]) -> Result<Vec<u8>, ParseError> {
    let mut events: Vec<&TimedEvent> = track.iter().collect();
    events.sort_by_key(|e| e.tick);
    let end_tick = events.last().map_or(0, |e| e.tick);
    events.retain(|e| !e.event.is_end_of_track());

    let mut out = Vec::new();
    let mut last_tick = 0;
    let mut running: Option<u8> = None;
    let mut continuation = false;

    for (i, timed) in events.iter().enumerate() {
        write_vlq(timed.tick - last_tick, &mut out);
        last_tick = timed.tick;

        match &timed.event {
            MidiEvent::SysEx {
                device_id,
                message,
                terminal,
            } => {
                running = None;
                out.push(if continuation { 0xF7 } else { 0xF0 });
                let next_continues = !terminal
                    && matches!(
                        events.get(i + 1).map(|e| &e.event),
                        Some(MidiEvent::SysEx { device_id: d, .. }) if d == device_id
                    );
                let mut payload = Vec::with_capacity(message.len() + 2);
                payload.push(check_data("SysEx device id", *device_id)?);
                for &b in message {
                    payload.push(check_data("SysEx data byte", b)?);
                }
                // An open fragment with nothing to continue it stays open.
                if *terminal {
                    payload.push(0xF7);
                }
                write_vlq(payload.len() as u64, &mut out);
                out.extend_from_slice(&payload);
                continuation = next_continues;
            }
            MidiEvent::Meta(meta) => {
                running = None;
                continuation = false;
                write_meta(&mut out, meta);
            }
            event => {
                continuation = false;
                let Some((status, data1, data2)) = event.channel_message() else {
                    continue;
                };
                if let Some(channel) = event.channel()
                    && channel > 0x0F
                {
                    return Err(ParseError::ValueOutOfRange {
                        field: "MIDI channel",
                        value: u64::from(channel),
                    });
                }
                if running != Some(status) {
                    out.push(status);
                    running = Some(status);
                }
                out.push(check_data("MIDI data byte", data1)?);
                if let Some(data2) = data2 {
                    out.push(check_data("MIDI data byte", data2)?);
                }
            }
        }
    }

    write_vlq(end_tick - last_tick, &mut out);
    write_meta(&mut out, &MetaEvent::end_of_track());
    Ok(out)
}

fn write_meta(out: &mut Vec<u8>, meta: &MetaEvent) {
    out.push(0xFF);
    out.push(meta.kind().code());
    write_vlq(meta.data().len() as u64, out);
    out.extend_from_slice(meta.data());
}
