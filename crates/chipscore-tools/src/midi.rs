use std::path::Path;

use anyhow::Context;
use chipscore::midi::{MidiEvent, MidiFile, Timebase, parse_mds, read_midi};
use comfy_table::{Cell, ContentArrangement, Table, presets::NOTHING};

/// Read a Standard MIDI File, or a RIFF `MIDS` stream.
pub fn load_midi(path: &Path) -> anyhow::Result<MidiFile> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let midi = if bytes.starts_with(b"RIFF") {
        parse_mds(&bytes)
    } else {
        read_midi(&bytes)
    };
    midi.with_context(|| format!("failed to decode {}", path.display()))
}

fn describe(event: &MidiEvent) -> (String, String) {
    match event {
        MidiEvent::NoteOff {
            channel,
            key,
            velocity,
        } => (format!("{channel}"), format!("note off {key} vel {velocity}")),
        MidiEvent::NoteOn {
            channel,
            key,
            velocity,
        } => (format!("{channel}"), format!("note on {key} vel {velocity}")),
        MidiEvent::PolyPressure {
            channel,
            key,
            pressure,
        } => (format!("{channel}"), format!("key pressure {key} {pressure}")),
        MidiEvent::Control {
            channel,
            controller,
            value,
        } => (format!("{channel}"), format!("control {controller} = {value}")),
        MidiEvent::Program { channel, program } => {
            (format!("{channel}"), format!("program {program}"))
        }
        MidiEvent::ChannelPressure { channel, pressure } => {
            (format!("{channel}"), format!("channel pressure {pressure}"))
        }
        MidiEvent::PitchWheel { channel, value } => {
            (format!("{channel}"), format!("pitch wheel {value}"))
        }
        MidiEvent::SysEx {
            device_id,
            message,
            terminal,
        } => (
            String::new(),
            format!(
                "sysex {device_id:02X} {}{}",
                message
                    .iter()
                    .map(|b| format!("{b:02X}"))
                    .collect::<Vec<_>>()
                    .join(" "),
                if *terminal { "" } else { " ..." }
            ),
        ),
        MidiEvent::Meta(meta) => {
            let text = if let Some(text) = meta.as_text() {
                format!("{:?} \"{text}\"", meta.kind())
            } else if let Some(tempo) = meta.as_tempo() {
                format!("Tempo {tempo} us/beat")
            } else {
                format!("{:?} {:02X?}", meta.kind(), meta.data())
            };
            (String::new(), text)
        }
    }
}

/// Dump-midi command: print the header and every event of every track.
pub fn dump(midi: &MidiFile) {
    let timebase = match midi.timebase {
        Timebase::TicksPerBeat(t) => format!("{t} ticks per beat"),
        Timebase::Smpte {
            fps,
            ticks_per_frame,
        } => format!("{fps} fps, {ticks_per_frame} ticks per frame"),
    };
    println!(
        "type {}, {} tracks, {timebase}",
        midi.file_type.code(),
        midi.tracks.len()
    );
    for (i, track) in midi.tracks.iter().enumerate() {
        println!("\ntrack {i}: {} events", track.len());
        let mut table = Table::new();
        table.load_preset(NOTHING);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![Cell::new("Tick"), Cell::new("Ch"), Cell::new("Event")]);
        for e in track {
            let (channel, text) = describe(&e.event);
            table.add_row(vec![Cell::new(e.tick), Cell::new(channel), Cell::new(text)]);
        }
        println!("{table}");
    }
}
