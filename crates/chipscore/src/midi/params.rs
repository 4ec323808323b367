//! Registered and non-registered parameter messages.
use crate::midi::event::{MidiEvent, controller};

/// Registered parameter numbers.
pub mod rpn {
    /// Value MSB in semitones, LSB in cents.
    pub const PITCH_BEND_SENSITIVITY: u16 = 0;
    /// 14-bit value, 0x2000 = no change.
    pub const FINE_TUNING: u16 = 1;
    /// Value MSB in semitones.
    pub const COARSE_TUNING: u16 = 2;
    pub const TUNING_PROGRAM: u16 = 3;
    pub const TUNING_BANK: u16 = 4;
}

fn control(channel: u8, controller: u8, value: u8) -> MidiEvent {
    MidiEvent::Control {
        channel,
        controller,
        value,
    }
}

/// Controller sequence that sets parameter `param` on `channel`.
///
/// Selects the parameter, writes the data entry MSB and optional LSB and,
/// when `terminal` is set, deselects it again with the null parameter
/// (7F/7F) so stray data entry messages are ignored.
pub fn param_change(
    channel: u8,
    param: u16,
    value_msb: u8,
    value_lsb: Option<u8>,
    registered: bool,
    terminal: bool,
) -> Vec<MidiEvent> {
    let (msb, lsb) = if registered {
        (controller::RPN_MSB, controller::RPN_LSB)
    } else {
        (controller::NRPN_MSB, controller::NRPN_LSB)
    };
    let mut events = vec![
        control(channel, msb, ((param & 0x3F80) >> 7) as u8),
        control(channel, lsb, (param & 0x7F) as u8),
        control(channel, controller::PARAM_VALUE_MSB, value_msb),
    ];
    if let Some(value_lsb) = value_lsb {
        events.push(control(channel, controller::PARAM_VALUE_LSB, value_lsb));
    }
    if terminal {
        events.push(control(channel, msb, 0x7F));
        events.push(control(channel, lsb, 0x7F));
    }
    events
}

/// Terminated registered parameter change.
pub fn rpn_change(channel: u8, param: u16, value_msb: u8, value_lsb: Option<u8>) -> Vec<MidiEvent> {
    param_change(channel, param, value_msb, value_lsb, true, true)
}

/// Pitch-bend sensitivity of `semitones` (plus `cents`) on `channel`.
pub fn pitch_bend_sensitivity(channel: u8, semitones: u8, cents: u8) -> Vec<MidiEvent> {
    rpn_change(channel, rpn::PITCH_BEND_SENSITIVITY, semitones, Some(cents))
}
