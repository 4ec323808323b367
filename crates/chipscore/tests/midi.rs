use chipscore::midi::{
    FileType, MetaEvent, MetaKind, MidiEvent, MidiFile, TimedEvent, Timebase, encode_track,
    pitch_bend_sensitivity, read_midi, write_midi,
};
use chipscore::ParseError;

fn all_kinds() -> Vec<TimedEvent> {
    let mut track = vec![
        TimedEvent::new(0, MetaEvent::track_name("Everything")),
        TimedEvent::new(0, MetaEvent::tempo(652_174)),
        TimedEvent::new(0, MetaEvent::time_signature(6, 8)),
        TimedEvent::new(
            0,
            MidiEvent::Program {
                channel: 2,
                program: 17,
            },
        ),
    ];
    track.extend(
        pitch_bend_sensitivity(2, 12, 0)
            .into_iter()
            .map(|e| TimedEvent::new(0, e)),
    );
    track.extend([
        TimedEvent::new(
            5,
            MidiEvent::PitchWheel {
                channel: 2,
                value: 0x3FFF,
            },
        ),
        TimedEvent::new(
            5,
            MidiEvent::NoteOn {
                channel: 2,
                key: 48,
                velocity: 100,
            },
        ),
        TimedEvent::new(
            9,
            MidiEvent::PolyPressure {
                channel: 2,
                key: 48,
                pressure: 30,
            },
        ),
        TimedEvent::new(
            9,
            MidiEvent::ChannelPressure {
                channel: 2,
                pressure: 31,
            },
        ),
        TimedEvent::new(
            200,
            MidiEvent::SysEx {
                device_id: 0x7E,
                message: vec![0x7F, 0x09, 0x01],
                terminal: true,
            },
        ),
        TimedEvent::new(
            16_500,
            MidiEvent::NoteOff {
                channel: 2,
                key: 48,
                velocity: 0,
            },
        ),
        TimedEvent::new(16_500, MetaEvent::marker("Loop end")),
        TimedEvent::new(16_500, MetaEvent::end_of_track()),
    ]);
    track
}

#[test]
fn test_encode_decode_preserves_events() {
    let midi = MidiFile {
        file_type: FileType::MultiTrack,
        timebase: Timebase::TicksPerBeat(480),
        tracks: vec![all_kinds(), vec![TimedEvent::new(3, MetaEvent::end_of_track())]],
    };
    let bytes = write_midi(&midi).unwrap();
    assert_eq!(&bytes[..4], b"MThd");
    let back = read_midi(&bytes).unwrap();
    assert_eq!(back, midi);
}

#[test]
fn test_unsorted_track_is_sorted_on_write() {
    let mut track = all_kinds();
    track.reverse();
    let midi = MidiFile {
        file_type: FileType::SingleTrack,
        timebase: Timebase::TicksPerBeat(96),
        tracks: vec![track],
    };
    let back = read_midi(&write_midi(&midi).unwrap()).unwrap();
    let ticks: Vec<u64> = back.tracks[0].iter().map(|e| e.tick).collect();
    assert!(ticks.windows(2).all(|w| w[0] <= w[1]));
    assert!(back.tracks[0].last().unwrap().event.is_end_of_track());
    assert_eq!(
        back.tracks[0]
            .iter()
            .filter(|e| e.event.is_end_of_track())
            .count(),
        1
    );
}

#[test]
fn test_smpte_timebase() {
    let midi = MidiFile {
        file_type: FileType::SingleTrack,
        timebase: Timebase::Smpte {
            fps: 25,
            ticks_per_frame: 40,
        },
        tracks: vec![vec![TimedEvent::new(0, MetaEvent::end_of_track())]],
    };
    let bytes = write_midi(&midi).unwrap();
    assert_eq!(&bytes[12..14], &[0xE7, 40]);
    assert_eq!(read_midi(&bytes).unwrap().timebase, midi.timebase);
}

#[test]
fn test_truncated_track_chunk() {
    let body = encode_track(&all_kinds()).unwrap();
    let mut bytes = b"MThd\0\0\0\x06\0\0\0\x01\0\x60MTrk".to_vec();
    bytes.extend_from_slice(&(body.len() as u32).to_be_bytes());
    bytes.extend_from_slice(&body[..body.len() - 4]);
    assert!(read_midi(&bytes).is_err());
}

#[test]
fn test_invalid_meta_length() {
    assert!(matches!(
        MetaEvent::new(MetaKind::Tempo, vec![1, 2]),
        Err(ParseError::InvalidMetaLength { .. })
    ));
}
