//! Standard MIDI File decoding.
use crate::binutil::{ByteReader, ParseError};
use crate::midi::event::{
    FileType, MetaEvent, MetaKind, MidiEvent, MidiFile, MidiTrack, TimedEvent, Timebase,
};
use crate::midi::vlq::read_vlq;

pub const HEADER_CHUNK: [u8; 4] = *b"MThd";
pub const TRACK_CHUNK: [u8; 4] = *b"MTrk";

/// Read a chunk header and return its identifier and a reader over its body.
pub(crate) fn chunk<'a>(
    reader: &mut ByteReader<'a>,
    bytes: &'a [u8],
    little_endian: bool,
) -> Result<([u8; 4], ByteReader<'a>), ParseError> {
    let offset = reader.position();
    let ident = reader.ident()?;
    let len = if little_endian {
        reader.u32_le()?
    } else {
        reader.u32_be()?
    } as usize;
    if reader.remaining() < len {
        return Err(ParseError::InvalidChunk {
            ident,
            offset,
            reason: "length exceeds input",
        });
    }
    let start = reader.position();
    reader.take(len)?;
    Ok((ident, ByteReader::with_range(bytes, start, start + len)?))
}

/// Decode a Standard MIDI File.
///
/// # Examples
///
/// ```
/// use chipscore::midi::{read_midi, FileType, Timebase};
///
/// let bytes = [
///     b'M', b'T', b'h', b'd', 0, 0, 0, 6, 0, 0, 0, 1, 0, 96,
///     b'M', b'T', b'r', b'k', 0, 0, 0, 4, 0x00, 0xFF, 0x2F, 0x00,
/// ];
/// let midi = read_midi(&bytes).unwrap();
/// assert_eq!(midi.file_type, FileType::SingleTrack);
/// assert_eq!(midi.timebase, Timebase::TicksPerBeat(96));
/// assert_eq!(midi.tracks[0].len(), 1);
/// ```
pub fn read_midi(bytes: &[u8]) -> Result<MidiFile, ParseError> {
    let mut reader = ByteReader::new(bytes);
    let (ident, mut header) = chunk(&mut reader, bytes, false)?;
    if ident != HEADER_CHUNK {
        return Err(ParseError::InvalidIdent {
            expected: HEADER_CHUNK,
            found: ident,
        });
    }
    if header.remaining() != 6 {
        return Err(ParseError::InvalidChunk {
            ident,
            offset: 0,
            reason: "header chunk length is not 6",
        });
    }
    let file_type = FileType::try_from(header.u16_be()?)?;
    let ntracks = header.u16_be()?;
    let timebase = Timebase::from_division(header.u16_be()?);

    let mut tracks = Vec::with_capacity(usize::from(ntracks));
    for index in 0..usize::from(ntracks) {
        let offset = reader.position();
        let (ident, body) = chunk(&mut reader, bytes, false)?;
        if ident != TRACK_CHUNK {
            return Err(ParseError::InvalidChunk {
                ident,
                offset,
                reason: "expected track chunk",
            });
        }
        tracks.push(read_track(body, index)?);
    }
    log::debug!(
        "read MIDI type {} with {} tracks, {:?}",
        file_type.code(),
        tracks.len(),
        timebase
    );
    Ok(MidiFile {
        file_type,
        timebase,
        tracks,
    })
}

fn data_byte(reader: &mut ByteReader<'_>) -> Result<u8, ParseError> {
    let offset = reader.position();
    let b = reader.u8()?;
    if b & 0x80 != 0 {
        return Err(ParseError::InvalidDataByte { byte: b, offset });
    }
    Ok(b)
}

/// Decode one track body up to its end-of-track event.
pub fn read_track(mut reader: ByteReader<'_>, index: usize) -> Result<MidiTrack, ParseError> {
    let mut track: MidiTrack = Vec::new();
    let mut tick: u64 = 0;
    let mut running: Option<u8> = None;

    while !reader.is_empty() {
        tick += read_vlq(&mut reader)?;
        let offset = reader.position();
        let status = match reader.peek() {
            Some(b) if b & 0x80 != 0 => {
                reader.u8()?;
                b
            }
            Some(_) => running.ok_or(ParseError::MissingRunningStatus(offset))?,
            None => return Err(ParseError::UnexpectedEof),
        };

        match status {
            0x80..=0xEF => {
                running = Some(status);
                let data1 = data_byte(&mut reader)?;
                let data2 = match status & 0xF0 {
                    0xC0 | 0xD0 => 0,
                    _ => data_byte(&mut reader)?,
                };
                let event = MidiEvent::from_channel_message(status, data1, data2)
                    .ok_or(ParseError::UnknownStatus { status, offset })?;
                track.push(TimedEvent { tick, event });
            }
            0xF0 | 0xF7 => {
                running = None;
                let len = read_vlq(&mut reader)? as usize;
                if len == 0 {
                    return Err(ParseError::EmptySysEx(offset));
                }
                let data = reader.take(len)?;
                let device_id = data[0];
                let terminal = len > 1 && data[len - 1] == 0xF7;
                let message = &data[1..if terminal { len - 1 } else { len }];
                push_sysex(&mut track, tick, status, device_id, message, terminal);
            }
            0xFF => {
                running = None;
                let code = reader.u8()?;
                let kind = MetaKind::from_code(code).ok_or(ParseError::UnknownMetaEvent {
                    kind: code,
                    offset,
                })?;
                let len = read_vlq(&mut reader)? as usize;
                let meta = MetaEvent::new(kind, reader.take(len)?.to_vec())?;
                track.push(TimedEvent::new(tick, meta));
                if kind == MetaKind::EndOfTrack {
                    return Ok(track);
                }
            }
            _ => return Err(ParseError::UnknownStatus { status, offset }),
        }
    }
    Err(ParseError::MissingEndOfTrack(index))
}

/// Append a SysEx fragment, joining an `F7` continuation onto the open
/// message of the same device.
fn push_sysex(
    track: &mut MidiTrack,
    tick: u64,
    status: u8,
    device_id: u8,
    fragment: &[u8],
    is_terminal: bool,
) {
    if status == 0xF7
        && let Some(TimedEvent {
            event:
                MidiEvent::SysEx {
                    device_id: open_device,
                    message,
                    terminal,
                },
            ..
        }) = track.last_mut()
        && !*terminal
        && *open_device == device_id
    {
        message.extend_from_slice(fragment);
        *terminal = is_terminal;
        return;
    }
    track.push(TimedEvent::new(
        tick,
        MidiEvent::SysEx {
            device_id,
            message: fragment.to_vec(),
            terminal: is_terminal,
        },
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(body: &[u8]) -> Result<MidiTrack, ParseError> {
        read_track(ByteReader::new(body), 0)
    }

    #[test]
    fn test_running_status() {
        let t = track(&[
            0x00, 0x90, 60, 100, // note on
            0x10, 62, 90, // running status
            0x10, 0x80, 60, 64, // note off
            0x00, 0xFF, 0x2F, 0x00,
        ])
        .unwrap();
        assert_eq!(t.len(), 4);
        assert_eq!(
            t[1],
            TimedEvent::new(
                16,
                MidiEvent::NoteOn {
                    channel: 0,
                    key: 62,
                    velocity: 90
                }
            )
        );
        assert_eq!(t[2].tick, 32);
        assert!(t[3].event.is_end_of_track());
    }

    #[test]
    fn test_meta_resets_running_status() {
        let err = track(&[0x00, 0x90, 60, 100, 0x00, 0xFF, 0x01, 0x00, 0x00, 62, 90]).unwrap_err();
        assert_eq!(err, ParseError::MissingRunningStatus(9));
    }

    #[test]
    fn test_missing_end_of_track() {
        assert_eq!(
            track(&[0x00, 0xC0, 5]),
            Err(ParseError::MissingEndOfTrack(0))
        );
    }

    #[test]
    fn test_data_byte_high_bit_rejected() {
        assert_eq!(
            track(&[0x00, 0x90, 0x90, 100]),
            Err(ParseError::InvalidDataByte {
                byte: 0x90,
                offset: 2
            })
        );
    }

    #[test]
    fn test_sysex_fragments_join() {
        let t = track(&[
            0x00, 0xF0, 0x03, 0x43, 0x10, 0x4C, // start, device 0x43
            0x05, 0xF7, 0x04, 0x43, 0x00, 0x01, 0xF7, // continuation, terminal
            0x00, 0xF0, 0x02, 0x41, 0xF7, // device 0x41, empty message
            0x00, 0xFF, 0x2F, 0x00,
        ])
        .unwrap();
        assert_eq!(
            t[0],
            TimedEvent::new(
                0,
                MidiEvent::SysEx {
                    device_id: 0x43,
                    message: vec![0x10, 0x4C, 0x00, 0x01],
                    terminal: true
                }
            )
        );
        assert_eq!(
            t[1].event,
            MidiEvent::SysEx {
                device_id: 0x41,
                message: vec![],
                terminal: true
            }
        );
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn test_unknown_meta_rejected() {
        assert_eq!(
            track(&[0x00, 0xFF, 0x21, 0x01, 0x00]),
            Err(ParseError::UnknownMetaEvent {
                kind: 0x21,
                offset: 1
            })
        );
    }

    #[test]
    fn test_bad_header_length() {
        let bytes = [b'M', b'T', b'h', b'd', 0, 0, 0, 4, 0, 0, 0, 1];
        assert!(matches!(
            read_midi(&bytes),
            Err(ParseError::InvalidChunk { .. })
        ));
    }
}
