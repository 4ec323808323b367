//! Instrument audition logs.
//!
//! [`audition_log`] programs a single YM2612 channel with an instrument and
//! plays it at a fixed note, producing a VGM log for an external renderer.
//! The log holds three takes separated by one-second waits:
//!
//! 1. the instrument as captured, held for three seconds then released;
//! 2. a "peak level" take with decay/sustain rates zeroed so the attack
//!    level is held;
//! 3. a "sustain level" take with carriers set to their sustain level.
//!
//! Carrier levels are raised in takes 2 and 3 so the loudest carrier sits
//! at total level `0x10`.
use crate::chip::fnumber::fm_word_from_note;
use crate::chip::instrument::FmInstrument;
use crate::error::{Error, Result};
use crate::vgm::{VgmHeader, VgmWriter, YM2612_CLOCK};

const KEY_ON_OFF: u8 = 0x28;
const TARGET_LEVEL: u8 = 0x10;

fn reset(w: &mut VgmWriter) {
    w.fm_write(0, 0x22, 0x00).fm_write(0, 0x27, 0x00);
    for ch in [0, 1, 2, 4, 5, 6] {
        w.fm_write(0, KEY_ON_OFF, ch);
    }
    w.fm_write(0, 0x2B, 0x00);
}

/// Write carrier total levels, raising carriers by the amount that brings
/// the loudest one to `TARGET_LEVEL`.
fn write_levels(w: &mut VgmWriter, inst: &FmInstrument, levels: [u8; 4]) {
    let carriers = inst.carriers();
    let loudest = carriers
        .iter()
        .map(|&op| levels[op])
        .min()
        .unwrap_or(TARGET_LEVEL);
    let adjust = loudest.saturating_sub(TARGET_LEVEL);
    for (op, &level) in levels.iter().enumerate() {
        let level = if carriers.contains(&op) {
            level - adjust
        } else {
            level
        };
        w.fm_write(0, 0x40 + 4 * op as u8, level);
    }
}

/// Build an audition log playing `inst` at `note` on channel 1.
///
/// `sample_rate` is the length of one second in samples.
pub fn audition_log(inst: &FmInstrument, note: u8, sample_rate: u32) -> Result<Vec<u8>> {
    let second = u64::from(sample_rate);
    let word = fm_word_from_note(note).map_err(|v| Error::invariant(0, v))?;
    let key_on = inst.key_mask() << 4;

    let mut w = VgmWriter::with_header(VgmHeader {
        sn76489_clock: 0,
        ym2612_clock: YM2612_CLOCK,
        ..Default::default()
    });
    reset(&mut w);
    for (i, &b) in inst.as_bytes()[..28].iter().enumerate() {
        w.fm_write(0, 0x30 + 4 * i as u8, b);
    }
    w.fm_write(0, 0xB0, inst.fb_alg())
        .fm_write(0, 0xB4, inst.ams_fms())
        .fm_write(0, 0xA4, ((word & 0x3F00) >> 8) as u8)
        .fm_write(0, 0xA0, (word & 0xFF) as u8);

    w.fm_write(0, KEY_ON_OFF, key_on)
        .wait(3 * second)
        .fm_write(0, KEY_ON_OFF, 0)
        .wait(second);

    // Peak level: hold the attack level.
    let tl = [0, 1, 2, 3].map(|op| inst.operator(1, op));
    write_levels(&mut w, inst, tl);
    for (base, value) in [(0x50, 0x1F), (0x60, 0x1F), (0x70, 0x00), (0x80, 0x2F)] {
        for op in 0..4 {
            w.fm_write(0, base + 4 * op, value);
        }
    }
    w.fm_write(0, KEY_ON_OFF, key_on)
        .wait(second)
        .fm_write(0, KEY_ON_OFF, 0)
        .wait(second);

    // Sustain level.
    let sl = [0, 1, 2, 3].map(|op| (inst.operator(5, op) & 0xF0) >> 1);
    write_levels(&mut w, inst, sl);
    w.fm_write(0, KEY_ON_OFF, key_on)
        .wait(second)
        .fm_write(0, KEY_ON_OFF, 0);

    log::debug!("audition log: note {note}, {} samples", w.time());
    Ok(w.finalize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::instrument::OPERATOR_REGISTERS;
    use crate::vgm::{FmWrite, parse_vgm};

    fn instrument(algorithm: u8) -> FmInstrument {
        let mut ops = [0u8; OPERATOR_REGISTERS];
        // Total levels for operators 0..4
        ops[4..8].copy_from_slice(&[0x20, 0x30, 0x28, 0x24]);
        // Sustain level / release
        ops[20..24].copy_from_slice(&[0x5F, 0x3F, 0xA0, 0x40]);
        FmInstrument::new(ops, 0x38 | algorithm, 0x00, 0x0F)
    }

    fn tl_writes(fm: &[FmWrite]) -> Vec<u8> {
        fm.iter()
            .filter(|w| (0x40..0x50).contains(&w.register))
            .map(|w| w.value)
            .collect()
    }

    #[test]
    fn test_audition_layout() {
        let bytes = audition_log(&instrument(4), 69, 100).unwrap();
        let vgm = parse_vgm(&bytes).unwrap();
        assert_eq!(vgm.header.total_samples, 700);
        let times: Vec<u64> = vgm.frames.iter().map(|f| f.time).collect();
        assert_eq!(times, vec![0, 300, 400, 500, 600, 700]);

        let first = &vgm.frames[0].fm;
        assert_eq!(first.len(), 9 + 28 + 2 + 2 + 1);
        assert_eq!(first.last(), Some(&FmWrite::new(0, 0x28, 0xF0)));
        let word = fm_word_from_note(69).unwrap();
        assert!(first.contains(&FmWrite::new(0, 0xA4, (word >> 8) as u8)));
        assert!(first.contains(&FmWrite::new(0, 0xA0, (word & 0xFF) as u8)));
        assert_eq!(vgm.frames[5].fm, vec![FmWrite::new(0, 0x28, 0x00)]);
    }

    #[test]
    fn test_carrier_levels_raised() {
        // Algorithm 4: carriers are operators 1 and 3.
        let bytes = audition_log(&instrument(4), 60, 100).unwrap();
        let vgm = parse_vgm(&bytes).unwrap();
        // Loudest carrier 0x24 -> adjust 0x14
        assert_eq!(tl_writes(&vgm.frames[2].fm), vec![0x20, 0x1C, 0x28, 0x10]);
        // Sustain levels (0x28, 0x18, 0x50, 0x20): loudest carrier 0x18 -> adjust 8
        assert_eq!(tl_writes(&vgm.frames[4].fm), vec![0x28, 0x10, 0x50, 0x18]);
    }

    #[test]
    fn test_low_note_rejected() {
        let err = audition_log(&instrument(7), 5, 100).unwrap_err();
        assert!(err.violation().is_some());
    }
}
