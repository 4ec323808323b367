//! YM2612 instrument identity, registries and text reports.
//!
//! An [`FmInstrument`] is the 31-byte snapshot of everything that shapes a
//! channel's timbre: the 28 operator registers (`0x30..=0x9C`), feedback and
//! algorithm (`0xB0`), AMS/FMS (`0xB4`, pan bits forced on) and the key-on
//! operator mask. Two channels playing the same patch in different stereo
//! positions therefore share one identity.
use std::collections::HashMap;
use std::fmt::Write as _;

use crate::error::{InvariantViolation, UnsupportedFeature};

/// Number of bytes in an instrument identity.
pub const INSTRUMENT_LEN: usize = 31;

/// Operator register groups `0x30..=0x90`, 4 operators each.
pub const OPERATOR_REGISTERS: usize = 28;

const FB_ALG: usize = 28;
const AMS_FMS: usize = 29;
const KEY_MASK: usize = 30;

/// Carrier operators for each algorithm.
pub const CARRIERS: [&[usize]; 8] = [
    &[3],
    &[3],
    &[3],
    &[3],
    &[1, 3],
    &[1, 2, 3],
    &[1, 2, 3],
    &[0, 1, 2, 3],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FmInstrument(pub [u8; INSTRUMENT_LEN]);

impl FmInstrument {
    /// Build an identity from register contents.
    ///
    /// `operators` are the values of `0x30 + 4 * i + local` for
    /// `i in 0..28`; the pan bits of `ams_fms` are ignored.
    pub fn new(operators: [u8; OPERATOR_REGISTERS], fb_alg: u8, ams_fms: u8, key_mask: u8) -> Self {
        let mut bytes = [0u8; INSTRUMENT_LEN];
        bytes[..OPERATOR_REGISTERS].copy_from_slice(&operators);
        bytes[FB_ALG] = fb_alg;
        bytes[AMS_FMS] = ams_fms | 0xC0;
        bytes[KEY_MASK] = key_mask;
        FmInstrument(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; INSTRUMENT_LEN] {
        &self.0
    }

    /// Operator register group `group` (0 = `0x30`, ..., 6 = `0x90`) of operator `op`.
    pub fn operator(&self, group: usize, op: usize) -> u8 {
        self.0[group * 4 + op]
    }

    pub fn fb_alg(&self) -> u8 {
        self.0[FB_ALG]
    }

    pub fn algorithm(&self) -> u8 {
        self.0[FB_ALG] & 0x07
    }

    pub fn feedback(&self) -> u8 {
        (self.0[FB_ALG] & 0x38) >> 3
    }

    pub fn ams_fms(&self) -> u8 {
        self.0[AMS_FMS]
    }

    pub fn key_mask(&self) -> u8 {
        self.0[KEY_MASK]
    }

    /// Indices of the operators that feed the output for this algorithm.
    pub fn carriers(&self) -> &'static [usize] {
        CARRIERS[self.algorithm() as usize]
    }
}

/// Dense indices in first-seen order.
#[derive(Debug, Clone, Default)]
struct DenseIndex {
    map: HashMap<FmInstrument, usize>,
    list: Vec<FmInstrument>,
}

impl DenseIndex {
    fn intern(&mut self, inst: FmInstrument) -> usize {
        if let Some(&ix) = self.map.get(&inst) {
            return ix;
        }
        let ix = self.list.len();
        self.map.insert(inst, ix);
        self.list.push(inst);
        ix
    }
}

/// Instruments used across several songs.
#[derive(Debug, Clone, Default)]
pub struct InstrumentCatalog {
    index: DenseIndex,
}

impl InstrumentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, inst: FmInstrument) -> usize {
        self.index.intern(inst)
    }

    pub fn get(&self, inst: &FmInstrument) -> Option<usize> {
        self.index.map.get(inst).copied()
    }

    pub fn len(&self) -> usize {
        self.index.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.list.is_empty()
    }
}

/// Instruments used by one song, with the notes each one played.
#[derive(Debug, Clone, Default)]
pub struct InstrumentRegistry {
    index: DenseIndex,
    notes: Vec<Vec<f64>>,
}

impl InstrumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the song index of `inst`, assigning the next one if unseen.
    pub fn intern(&mut self, inst: FmInstrument) -> usize {
        let ix = self.index.intern(inst);
        if ix == self.notes.len() {
            self.notes.push(Vec::new());
        }
        ix
    }

    /// Intern `inst` and record that it played `semitone`.
    pub fn record_note(&mut self, inst: FmInstrument, semitone: f64) -> usize {
        let ix = self.intern(inst);
        self.notes[ix].push(semitone);
        ix
    }

    pub fn get(&self, inst: &FmInstrument) -> Option<usize> {
        self.index.map.get(inst).copied()
    }

    pub fn instruments(&self) -> &[FmInstrument] {
        &self.index.list
    }

    pub fn notes(&self, ix: usize) -> &[f64] {
        self.notes.get(ix).map_or(&[], Vec::as_slice)
    }

    /// Mean played note rounded to an integer, if the instrument played any.
    pub fn mean_note(&self, ix: usize) -> Option<u8> {
        let notes = self.notes(ix);
        if notes.is_empty() {
            return None;
        }
        let mean = notes.iter().sum::<f64>() / notes.len() as f64;
        Some(mean.round().clamp(0.0, 127.0) as u8)
    }

    pub fn len(&self) -> usize {
        self.index.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.list.is_empty()
    }
}

/// Render a human-readable description of a song instrument.
///
/// `global` is the instrument's catalog index when a catalog is in use.
/// A non-zero SSG-EG register is reported as an unsupported feature.
pub fn describe_instrument(
    registry: &InstrumentRegistry,
    ix: usize,
    global: Option<usize>,
) -> Result<String, InvariantViolation> {
    let Some(inst) = registry.instruments().get(ix) else {
        return Ok(String::new());
    };
    for op in 0..4u8 {
        if inst.operator(6, op as usize) != 0 {
            return Err(InvariantViolation::UnsupportedFeature(
                UnsupportedFeature::SsgEnvelope { operator: op },
            ));
        }
    }
    let mut out = String::new();
    write_report(&mut out, registry, ix, inst, global)
        .expect("writing to a String cannot fail");
    Ok(out)
}

fn write_report(
    out: &mut String,
    registry: &InstrumentRegistry,
    ix: usize,
    inst: &FmInstrument,
    global: Option<usize>,
) -> std::fmt::Result {
    let hex: Vec<String> = inst.as_bytes().iter().map(|b| format!("{b:02X}")).collect();
    writeln!(out, "Instrument {ix}: {}", hex.join(" "))?;
    if let Some(global) = global {
        writeln!(out, "Global index: {global}")?;
    }

    let mut notes = registry.notes(ix).to_vec();
    notes.sort_by(f64::total_cmp);
    let l = notes.len();
    writeln!(out, "Note count: {l}")?;
    if l > 0 {
        writeln!(
            out,
            "Note spread: {:.2}..{:.2}..{:.2}..{:.2}..{:.2}",
            notes[0],
            notes[l / 4],
            notes[l / 2],
            notes[l * 3 / 4],
            notes[l - 1]
        )?;
        writeln!(out, "Note mean: {:.2}", notes.iter().sum::<f64>() / l as f64)?;
    }

    let mut any_am = false;
    for op in 0..4 {
        let dt_mul = inst.operator(0, op);
        let dt = (dt_mul & 0x70) >> 4;
        if dt & 3 != 0 {
            let sign = if dt & 4 != 0 { '-' } else { '+' };
            writeln!(out, "Detune {op}: {sign}{}", dt & 3)?;
        }
        match dt_mul & 0x0F {
            1 => {}
            0 => writeln!(out, "Multiplier {op}: 1/2x")?,
            mul => writeln!(out, "Multiplier {op}: {mul}x")?,
        }
        writeln!(out, "Volume {op}: {}", inst.operator(1, op) & 0x7F)?;
        let rs_ar = inst.operator(2, op);
        let rs = (rs_ar & 0xC0) >> 6;
        if rs != 0 {
            writeln!(out, "Rate scaling {op}: {rs}")?;
        }
        writeln!(out, "Attack {op}: {}", rs_ar & 0x1F)?;
        let am_d1r = inst.operator(3, op);
        if am_d1r & 0x80 != 0 {
            writeln!(out, "Modulation enabled {op}")?;
            any_am = true;
        }
        writeln!(out, "Decay {op}: {}", am_d1r & 0x1F)?;
        writeln!(out, "Sustain {op}: {}", inst.operator(4, op) & 0x1F)?;
        let sl_rr = inst.operator(5, op);
        writeln!(out, "Sustain level {op}: {}", (sl_rr & 0xF0) >> 4)?;
        writeln!(out, "Release {op}: {}", sl_rr & 0x0F)?;
    }
    if inst.feedback() != 0 {
        writeln!(out, "Feedback 0: {}", inst.feedback())?;
    }
    writeln!(out, "Algorithm: {}", inst.algorithm())?;
    if any_am {
        writeln!(out, "AM sensitivity {}", (inst.ams_fms() & 0x38) >> 3)?;
        writeln!(out, "FM sensitivity {}", inst.ams_fms() & 0x03)?;
    }
    writeln!(out, "Ops enabled: {:01X}", inst.key_mask())?;
    Ok(())
}
