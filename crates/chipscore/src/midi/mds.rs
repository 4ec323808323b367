//! RIFF `MIDS` stream reader.
//!
//! A MIDS file holds a `fmt ` chunk (time format, max buffer size, flags)
//! and a `data` chunk of blocks. Each block starts at an absolute tick and
//! carries 12-byte events: delta ticks, stream id, and a packed event dword
//! whose high byte selects a short channel message (0) or a tempo change (1).
use crate::binutil::{ByteReader, ParseError};
use crate::midi::event::{FileType, MetaEvent, MidiEvent, MidiFile, TimedEvent, Timebase};
use crate::midi::reader::chunk;

const EVENT_SHORT: u8 = 0;
const EVENT_TEMPO: u8 = 1;

fn expect_chunk<'a>(
    reader: &mut ByteReader<'a>,
    bytes: &'a [u8],
    expected: &[u8; 4],
) -> Result<ByteReader<'a>, ParseError> {
    let (ident, body) = chunk(reader, bytes, true)?;
    if &ident != expected {
        return Err(ParseError::InvalidIdent {
            expected: *expected,
            found: ident,
        });
    }
    Ok(body)
}

/// Read a MIDS stream into a single-track file.
///
/// The time format of the `fmt ` chunk becomes the ticks-per-beat
/// timebase; the track is closed with end-of-track at the last event.
pub fn parse_mds(bytes: &[u8]) -> Result<MidiFile, ParseError> {
    let mut reader = ByteReader::new(bytes);
    let mut riff = expect_chunk(&mut reader, bytes, b"RIFF")?;
    let form = riff.ident()?;
    if &form != b"MIDS" {
        return Err(ParseError::InvalidIdent {
            expected: *b"MIDS",
            found: form,
        });
    }

    let mut fmt = expect_chunk(&mut riff, bytes, b"fmt ")?;
    if fmt.remaining() != 12 {
        return Err(ParseError::InvalidChunk {
            ident: *b"fmt ",
            offset: fmt.position(),
            reason: "format chunk length is not 12",
        });
    }
    let time_format = fmt.u32_le()?;
    let ticks_per_beat = u16::try_from(time_format).map_err(|_| ParseError::ValueOutOfRange {
        field: "MIDS time format",
        value: u64::from(time_format),
    })?;

    let mut data = expect_chunk(&mut riff, bytes, b"data")?;
    let blocks = data.u32_le()?;
    let mut track = Vec::new();
    let mut tick: u64 = 0;
    for _ in 0..blocks {
        tick = u64::from(data.u32_le()?);
        let len = data.u32_le()? as usize;
        let start = data.position();
        let mut block = ByteReader::with_range(bytes, start, start + len)?;
        data.take(len)?;
        while block.remaining() >= 12 {
            let offset = block.position();
            tick += u64::from(block.u32_le()?);
            let _stream_id = block.u32_le()?;
            let [status, data1, data2, kind] = block.u32_le()?.to_le_bytes();
            let event = match kind {
                EVENT_SHORT => MidiEvent::from_channel_message(status, data1, data2)
                    .ok_or(ParseError::UnknownStatus { status, offset })?,
                EVENT_TEMPO => MidiEvent::Meta(MetaEvent::tempo(u32::from_be_bytes([
                    0, data2, data1, status,
                ]))),
                _ => {
                    return Err(ParseError::UnknownStatus {
                        status: kind,
                        offset,
                    });
                }
            };
            track.push(TimedEvent { tick, event });
        }
    }
    track.push(TimedEvent::new(tick, MetaEvent::end_of_track()));
    log::debug!("read MIDS stream: {} events, {} blocks", track.len(), blocks);
    Ok(MidiFile {
        file_type: FileType::SingleTrack,
        timebase: Timebase::TicksPerBeat(ticks_per_beat),
        tracks: vec![track],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn riff_chunk(ident: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let mut out = ident.to_vec();
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend_from_slice(body);
        out
    }

    fn event(delta: u32, dword: [u8; 4]) -> Vec<u8> {
        let mut out = delta.to_le_bytes().to_vec();
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&dword);
        out
    }

    fn mds(blocks: &[(u32, Vec<u8>)]) -> Vec<u8> {
        let mut fmt = 96u32.to_le_bytes().to_vec();
        fmt.extend_from_slice(&[0; 8]);
        let mut data = (blocks.len() as u32).to_le_bytes().to_vec();
        for (start, body) in blocks {
            data.extend_from_slice(&start.to_le_bytes());
            data.extend_from_slice(&(body.len() as u32).to_le_bytes());
            data.extend_from_slice(body);
        }
        let mut form = b"MIDS".to_vec();
        form.extend(riff_chunk(b"fmt ", &fmt));
        form.extend(riff_chunk(b"data", &data));
        riff_chunk(b"RIFF", &form)
    }

    #[test]
    fn test_parse_mds_blocks() {
        let mut block0 = event(0, [0x90, 60, 100, 0]);
        block0.extend(event(48, [0x20, 0xA1, 0x07, 1])); // tempo 0x07A120
        let block1 = event(4, [0x80, 60, 0, 0]);
        let midi = parse_mds(&mds(&[(0, block0), (200, block1)])).unwrap();

        assert_eq!(midi.timebase, Timebase::TicksPerBeat(96));
        let track = &midi.tracks[0];
        assert_eq!(track.len(), 4);
        assert_eq!(
            track[0].event,
            MidiEvent::NoteOn {
                channel: 0,
                key: 60,
                velocity: 100
            }
        );
        assert_eq!(track[1].tick, 48);
        assert!(matches!(&track[1].event, MidiEvent::Meta(m) if m.as_tempo() == Some(500_000)));
        assert_eq!(track[2].tick, 204);
        assert_eq!(track[3], TimedEvent::new(204, MetaEvent::end_of_track()));
    }

    #[test]
    fn test_not_mids() {
        let bytes = riff_chunk(b"RIFF", b"WAVE");
        assert!(matches!(
            parse_mds(&bytes),
            Err(ParseError::InvalidIdent { .. })
        ));
    }
}
