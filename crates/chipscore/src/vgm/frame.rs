//! Register-write batches grouped by sample time.

/// A YM2612 register write on one of the two ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FmWrite {
    pub port: u8,
    pub register: u8,
    pub value: u8,
}

impl FmWrite {
    pub const fn new(port: u8, register: u8, value: u8) -> Self {
        Self {
            port,
            register,
            value,
        }
    }
}

/// A write to the SN76489 or to the Game Gear stereo register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsgWrite {
    Data(u8),
    Stereo(u8),
}

/// All writes issued before the log advanced past `time`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    /// Output-sample coordinate of the writes.
    pub time: u64,
    pub fm: Vec<FmWrite>,
    pub psg: Vec<PsgWrite>,
}

impl Frame {
    pub fn new(time: u64) -> Self {
        Self {
            time,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fm.is_empty() && self.psg.is_empty()
    }
}
