use chipscore::chip::state::{process_fm, process_psg};
use chipscore::chip::{FmEvent, Stereo};
use chipscore::vgm::{VgmWriter, parse_vgm};
use chipscore::{Error, InvariantViolation, UnsupportedFeature};

/// Program a plain algorithm-7 patch on channel `ch` of port 0.
fn patch(w: &mut VgmWriter, ch: u8, tl: u8) {
    for op in 0..4 {
        w.fm_write(0, 0x40 + 4 * op + ch, tl);
        w.fm_write(0, 0x50 + 4 * op + ch, 0x1F);
    }
    w.fm_write(0, 0xB0 + ch, 0x07);
    w.fm_write(0, 0xB4 + ch, 0xC0);
}

fn frames(w: &VgmWriter) -> Vec<chipscore::vgm::Frame> {
    parse_vgm(&w.finalize().unwrap()).unwrap().frames
}

#[test_log::test]
fn test_fm_note_lifecycle() {
    let mut w = VgmWriter::new();
    patch(&mut w, 1, 0x10);
    w.fm_write(0, 0xA5, 0x22).fm_write(0, 0xA1, 0x69);
    w.fm_write(0, 0x28, 0xF1);
    w.wait(100);
    w.fm_write(0, 0xA1, 0x80);
    w.wait(100);
    w.fm_write(0, 0x28, 0x01);
    w.wait(10);

    let events = process_fm(&frames(&w)).unwrap();
    assert_eq!(events.len(), 3);
    match &events[0] {
        FmEvent::NoteOn {
            time: 0,
            channel: 1,
            instrument,
            frequency,
            stereo,
        } => {
            assert_eq!(*frequency, 0x2269);
            assert_eq!(*stereo, Stereo::BOTH);
            assert_eq!(instrument.algorithm(), 7);
            assert_eq!(instrument.key_mask(), 0x0F);
        }
        other => panic!("expected note on, got {other:?}"),
    }
    assert_eq!(
        events[1],
        FmEvent::FrequencyChange {
            time: 100,
            channel: 1,
            frequency: 0x2280
        }
    );
    assert_eq!(
        events[2],
        FmEvent::NoteOff {
            time: 200,
            channel: 1
        }
    );
}

#[test]
fn test_fm_sounding_at_end_is_released() {
    let mut w = VgmWriter::new();
    patch(&mut w, 0, 0);
    w.fm_write(0, 0x28, 0xF0);
    w.wait(500);
    let events = process_fm(&frames(&w)).unwrap();
    assert_eq!(events.last(), Some(&FmEvent::NoteOff { time: 500, channel: 0 }));
}

#[test]
fn test_fm_patch_swap_under_note() {
    let mut w = VgmWriter::new();
    patch(&mut w, 0, 0);
    w.fm_write(0, 0x28, 0xF0);
    w.wait(10);
    w.fm_write(0, 0x40, 0x7F);
    w.wait(10);
    let events = process_fm(&frames(&w)).unwrap();
    assert!(matches!(
        events[1],
        FmEvent::InstrumentChange {
            time: 10,
            channel: 0,
            ..
        }
    ));
}

#[test]
fn test_dac_is_unsupported() {
    let mut w = VgmWriter::new();
    w.fm_write(0, 0x2B, 0x80);
    w.wait(1);
    let err = process_fm(&frames(&w)).unwrap_err();
    assert!(matches!(
        err,
        Error::Invariant {
            at: 0,
            violation: InvariantViolation::UnsupportedFeature(UnsupportedFeature::Dac)
        }
    ));
}

#[test_log::test]
fn test_psg_one_snapshot_per_frame() {
    let mut w = VgmWriter::new();
    w.psg_write(0xA5).psg_write(0x01).psg_write(0xB3);
    w.wait(735);
    w.wait(735);
    w.psg_write(0xE4);
    w.wait(20);

    let snapshots = process_psg(&frames(&w));
    assert_eq!(snapshots.len(), 3);

    let (time, Some(first)) = snapshots[0] else {
        panic!("missing first snapshot");
    };
    assert_eq!(time, 0);
    assert_eq!(first[1].value, 0x015);
    assert_eq!(first[1].volume, 3);
    assert!(first[1].dirty && first[1].value_written);
    assert!(!first[0].dirty && !first[2].dirty && !first[3].dirty);

    let (time, Some(second)) = snapshots[1] else {
        panic!("missing second snapshot");
    };
    assert_eq!(time, 1470);
    assert!(second[3].dirty);
    assert!(!second[1].dirty);
    assert_eq!(second[3].value, 0x04);

    assert_eq!(snapshots[2], (1490, None));
}
