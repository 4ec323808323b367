//! Standard MIDI File data model.
use crate::binutil::ParseError;

/// SMF format word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// One multi-channel track
    SingleTrack,
    /// Simultaneous tracks
    MultiTrack,
    /// Sequentially independent patterns
    MultiPattern,
}

impl FileType {
    pub const fn code(self) -> u16 {
        match self {
            FileType::SingleTrack => 0,
            FileType::MultiTrack => 1,
            FileType::MultiPattern => 2,
        }
    }
}

impl TryFrom<u16> for FileType {
    type Error = ParseError;

    fn try_from(value: u16) -> Result<Self, ParseError> {
        match value {
            0 => Ok(FileType::SingleTrack),
            1 => Ok(FileType::MultiTrack),
            2 => Ok(FileType::MultiPattern),
            _ => Err(ParseError::ValueOutOfRange {
                field: "MIDI file type",
                value: u64::from(value),
            }),
        }
    }
}

/// Tick resolution from the header `division` word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timebase {
    /// Ticks per quarter note
    TicksPerBeat(u16),
    /// SMPTE frames per second and ticks per frame
    Smpte { fps: u8, ticks_per_frame: u8 },
}

impl Timebase {
    /// Decode the header `division` word.
    ///
    /// A set top bit marks SMPTE time: the high byte is the negated frame
    /// rate in two's complement.
    pub fn from_division(division: u16) -> Self {
        if division & 0x8000 != 0 {
            let [hi, lo] = division.to_be_bytes();
            Timebase::Smpte {
                fps: (hi as i8).unsigned_abs(),
                ticks_per_frame: lo,
            }
        } else {
            Timebase::TicksPerBeat(division)
        }
    }

    pub fn division(self) -> u16 {
        match self {
            Timebase::TicksPerBeat(t) => t & 0x7FFF,
            Timebase::Smpte {
                fps,
                ticks_per_frame,
            } => u16::from_be_bytes([(fps as i8).wrapping_neg() as u8, ticks_per_frame]),
        }
    }
}

/// Well-known controller numbers.
pub mod controller {
    pub const MODULATION: u8 = 1;
    pub const PARAM_VALUE_MSB: u8 = 6;
    pub const VOLUME: u8 = 7;
    pub const PAN: u8 = 10;
    pub const PARAM_VALUE_LSB: u8 = 38;
    pub const SUSTAIN: u8 = 64;
    pub const NRPN_LSB: u8 = 98;
    pub const NRPN_MSB: u8 = 99;
    pub const RPN_LSB: u8 = 100;
    pub const RPN_MSB: u8 = 101;
    pub const RESET_ALL: u8 = 121;
    pub const ALL_NOTES_OFF: u8 = 123;
}

/// Meta event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaKind {
    SequenceNumber,
    Text,
    Copyright,
    TrackName,
    InstrumentName,
    Lyric,
    Marker,
    CuePoint,
    ChannelPrefix,
    EndOfTrack,
    /// Microseconds per quarter note, 24-bit big endian
    Tempo,
    SmpteOffset,
    /// Numerator, log2 denominator, clocks per click, 32nds per quarter
    TimeSignature,
    KeySignature,
    SequencerSpecific,
}

impl MetaKind {
    pub const fn code(self) -> u8 {
        match self {
            MetaKind::SequenceNumber => 0x00,
            MetaKind::Text => 0x01,
            MetaKind::Copyright => 0x02,
            MetaKind::TrackName => 0x03,
            MetaKind::InstrumentName => 0x04,
            MetaKind::Lyric => 0x05,
            MetaKind::Marker => 0x06,
            MetaKind::CuePoint => 0x07,
            MetaKind::ChannelPrefix => 0x20,
            MetaKind::EndOfTrack => 0x2F,
            MetaKind::Tempo => 0x51,
            MetaKind::SmpteOffset => 0x54,
            MetaKind::TimeSignature => 0x58,
            MetaKind::KeySignature => 0x59,
            MetaKind::SequencerSpecific => 0x7F,
        }
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0x00 => MetaKind::SequenceNumber,
            0x01 => MetaKind::Text,
            0x02 => MetaKind::Copyright,
            0x03 => MetaKind::TrackName,
            0x04 => MetaKind::InstrumentName,
            0x05 => MetaKind::Lyric,
            0x06 => MetaKind::Marker,
            0x07 => MetaKind::CuePoint,
            0x20 => MetaKind::ChannelPrefix,
            0x2F => MetaKind::EndOfTrack,
            0x51 => MetaKind::Tempo,
            0x54 => MetaKind::SmpteOffset,
            0x58 => MetaKind::TimeSignature,
            0x59 => MetaKind::KeySignature,
            0x7F => MetaKind::SequencerSpecific,
            _ => return None,
        })
    }

    /// Payload length of kinds with a fixed layout.
    pub const fn fixed_len(self) -> Option<usize> {
        match self {
            MetaKind::SequenceNumber | MetaKind::KeySignature => Some(2),
            MetaKind::ChannelPrefix => Some(1),
            MetaKind::EndOfTrack => Some(0),
            MetaKind::Tempo => Some(3),
            MetaKind::SmpteOffset => Some(5),
            MetaKind::TimeSignature => Some(4),
            MetaKind::Text
            | MetaKind::Copyright
            | MetaKind::TrackName
            | MetaKind::InstrumentName
            | MetaKind::Lyric
            | MetaKind::Marker
            | MetaKind::CuePoint
            | MetaKind::SequencerSpecific => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaEvent {
    kind: MetaKind,
    data: Vec<u8>,
}

impl MetaEvent {
    /// Build a meta event, checking the payload length of fixed-size kinds.
    pub fn new(kind: MetaKind, data: Vec<u8>) -> Result<Self, ParseError> {
        if let Some(expected) = kind.fixed_len()
            && data.len() != expected
        {
            return Err(ParseError::InvalidMetaLength {
                kind: kind.code(),
                len: data.len(),
                expected,
            });
        }
        Ok(Self { kind, data })
    }

    fn text(kind: MetaKind, text: &str) -> Self {
        Self {
            kind,
            data: text.as_bytes().to_vec(),
        }
    }

    pub fn track_name(name: &str) -> Self {
        Self::text(MetaKind::TrackName, name)
    }

    pub fn copyright(text: &str) -> Self {
        Self::text(MetaKind::Copyright, text)
    }

    pub fn marker(text: &str) -> Self {
        Self::text(MetaKind::Marker, text)
    }

    /// Tempo in microseconds per quarter note; values above 24 bits saturate.
    pub fn tempo(micros_per_beat: u32) -> Self {
        let [_, a, b, c] = micros_per_beat.min(0xFF_FFFF).to_be_bytes();
        Self {
            kind: MetaKind::Tempo,
            data: vec![a, b, c],
        }
    }

    /// Time signature `numerator / denominator`.
    ///
    /// `denominator` is stored as its base-2 logarithm; the metronome clicks
    /// every quarter note (24 clocks) with eight 32nd notes per quarter.
    pub fn time_signature(numerator: u8, denominator: u8) -> Self {
        let log2 = denominator.max(1).ilog2() as u8;
        Self {
            kind: MetaKind::TimeSignature,
            data: vec![numerator, log2, 24, 8],
        }
    }

    pub fn end_of_track() -> Self {
        Self {
            kind: MetaKind::EndOfTrack,
            data: Vec::new(),
        }
    }

    pub fn kind(&self) -> MetaKind {
        self.kind
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Payload as text for the text-like kinds.
    pub fn as_text(&self) -> Option<std::borrow::Cow<'_, str>> {
        match self.kind {
            MetaKind::Text
            | MetaKind::Copyright
            | MetaKind::TrackName
            | MetaKind::InstrumentName
            | MetaKind::Lyric
            | MetaKind::Marker
            | MetaKind::CuePoint => Some(String::from_utf8_lossy(&self.data)),
            _ => None,
        }
    }

    /// Microseconds per quarter note of a tempo event.
    pub fn as_tempo(&self) -> Option<u32> {
        match (self.kind, self.data.as_slice()) {
            (MetaKind::Tempo, &[a, b, c]) => Some(u32::from_be_bytes([0, a, b, c])),
            _ => None,
        }
    }
}

/// Channel, system-exclusive or meta message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOff { channel: u8, key: u8, velocity: u8 },
    NoteOn { channel: u8, key: u8, velocity: u8 },
    PolyPressure { channel: u8, key: u8, pressure: u8 },
    Control { channel: u8, controller: u8, value: u8 },
    Program { channel: u8, program: u8 },
    ChannelPressure { channel: u8, pressure: u8 },
    /// 14-bit wheel position, 8192 = centre
    PitchWheel { channel: u8, value: u16 },
    /// One system-exclusive fragment.
    ///
    /// `message` excludes the device id and the closing `F7`; `terminal`
    /// marks the fragment that completes the message.
    SysEx {
        device_id: u8,
        message: Vec<u8>,
        terminal: bool,
    },
    Meta(MetaEvent),
}

impl MidiEvent {
    /// Decode a channel message from its status byte and data bytes.
    ///
    /// `data2` is ignored for the one-byte messages (program, channel
    /// pressure).
    pub fn from_channel_message(status: u8, data1: u8, data2: u8) -> Option<Self> {
        let channel = status & 0x0F;
        Some(match status & 0xF0 {
            0x80 => MidiEvent::NoteOff {
                channel,
                key: data1,
                velocity: data2,
            },
            0x90 => MidiEvent::NoteOn {
                channel,
                key: data1,
                velocity: data2,
            },
            0xA0 => MidiEvent::PolyPressure {
                channel,
                key: data1,
                pressure: data2,
            },
            0xB0 => MidiEvent::Control {
                channel,
                controller: data1,
                value: data2,
            },
            0xC0 => MidiEvent::Program {
                channel,
                program: data1,
            },
            0xD0 => MidiEvent::ChannelPressure {
                channel,
                pressure: data1,
            },
            0xE0 => MidiEvent::PitchWheel {
                channel,
                value: u16::from(data2) << 7 | u16::from(data1),
            },
            _ => return None,
        })
    }

    /// Status byte and data bytes of a channel message.
    pub fn channel_message(&self) -> Option<(u8, u8, Option<u8>)> {
        Some(match *self {
            MidiEvent::NoteOff {
                channel,
                key,
                velocity,
            } => (0x80 | channel, key, Some(velocity)),
            MidiEvent::NoteOn {
                channel,
                key,
                velocity,
            } => (0x90 | channel, key, Some(velocity)),
            MidiEvent::PolyPressure {
                channel,
                key,
                pressure,
            } => (0xA0 | channel, key, Some(pressure)),
            MidiEvent::Control {
                channel,
                controller,
                value,
            } => (0xB0 | channel, controller, Some(value)),
            MidiEvent::Program { channel, program } => (0xC0 | channel, program, None),
            MidiEvent::ChannelPressure { channel, pressure } => (0xD0 | channel, pressure, None),
            MidiEvent::PitchWheel { channel, value } => (
                0xE0 | channel,
                (value & 0x7F) as u8,
                Some(((value >> 7) & 0x7F) as u8),
            ),
            MidiEvent::SysEx { .. } | MidiEvent::Meta(_) => return None,
        })
    }

    /// Channel of a channel message.
    pub fn channel(&self) -> Option<u8> {
        match *self {
            MidiEvent::NoteOff { channel, .. }
            | MidiEvent::NoteOn { channel, .. }
            | MidiEvent::PolyPressure { channel, .. }
            | MidiEvent::Control { channel, .. }
            | MidiEvent::Program { channel, .. }
            | MidiEvent::ChannelPressure { channel, .. }
            | MidiEvent::PitchWheel { channel, .. } => Some(channel),
            MidiEvent::SysEx { .. } | MidiEvent::Meta(_) => None,
        }
    }

    pub fn is_end_of_track(&self) -> bool {
        matches!(self, MidiEvent::Meta(m) if m.kind() == MetaKind::EndOfTrack)
    }
}

impl From<MetaEvent> for MidiEvent {
    fn from(meta: MetaEvent) -> Self {
        MidiEvent::Meta(meta)
    }
}

/// An event at an absolute tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedEvent {
    pub tick: u64,
    pub event: MidiEvent,
}

impl TimedEvent {
    pub fn new(tick: u64, event: impl Into<MidiEvent>) -> Self {
        Self {
            tick,
            event: event.into(),
        }
    }
}

pub type MidiTrack = Vec<TimedEvent>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiFile {
    pub file_type: FileType,
    pub timebase: Timebase,
    pub tracks: Vec<MidiTrack>,
}
