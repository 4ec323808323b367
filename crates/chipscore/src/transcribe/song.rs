//! Whole-song transcoding.
use crate::chip::instrument::InstrumentRegistry;
use crate::chip::state::{process_fm, process_psg};
use crate::config::TranscodeConfig;
use crate::error::Result;
use crate::midi::{FileType, MetaEvent, MidiFile, MidiTrack, TimedEvent, Timebase};
use crate::transcribe::fm::fm_to_tracks;
use crate::transcribe::psg::psg_to_tracks;
use crate::transcribe::retime::retime;
use crate::vgm::VgmFile;

/// Turns decoded VGM logs into type-1 MIDI files.
///
/// # Examples
///
/// ```
/// use chipscore::chip::InstrumentRegistry;
/// use chipscore::transcribe::SongTranscoder;
/// use chipscore::vgm::{VgmWriter, parse_vgm};
/// use chipscore::TranscodeConfig;
///
/// let mut w = VgmWriter::new();
/// w.psg_write(0x90); // tone 0 at full volume
/// w.psg_write(0x8E);
/// w.psg_write(0x0F);
/// w.wait(44_100);
/// w.psg_write(0x9F);
/// let vgm = parse_vgm(&w.finalize().unwrap()).unwrap();
///
/// let transcoder = SongTranscoder::new(TranscodeConfig::default());
/// let midi = transcoder.transcode(&vgm, &mut InstrumentRegistry::new()).unwrap();
/// assert_eq!(midi.tracks.len(), 2); // conductor + PSG 0
/// ```
#[derive(Debug, Clone, Default)]
pub struct SongTranscoder {
    config: TranscodeConfig,
}

impl SongTranscoder {
    pub fn new(config: TranscodeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TranscodeConfig {
        &self.config
    }

    /// Transcode one song.
    ///
    /// FM instruments heard in the song are added to `registry`, whose
    /// indices become the FM track numbers and program numbers.
    pub fn transcode(&self, vgm: &VgmFile, registry: &mut InstrumentRegistry) -> Result<MidiFile> {
        let header = &vgm.header;
        let total = header.total_samples;

        let mut tracks = vec![self.conductor(vgm)];

        let fm_events = process_fm(&vgm.frames)?;
        let fm = fm_to_tracks(&fm_events, registry, &self.config, total)?;
        log::info!("{} FM instrument tracks", fm.len());
        tracks.extend(fm);

        let snapshots = process_psg(&vgm.frames);
        let psg = psg_to_tracks(&snapshots, header.sn76489_clock, &self.config)?;
        log::info!("{} PSG channel tracks", psg.len());
        tracks.extend(psg);

        let tracks = retime(tracks, &self.config);
        Ok(MidiFile {
            file_type: FileType::MultiTrack,
            timebase: Timebase::TicksPerBeat(self.config.ticks_per_beat),
            tracks,
        })
    }

    /// Track 0 before retiming: song title, artist and loop markers.
    fn conductor(&self, vgm: &VgmFile) -> MidiTrack {
        let total = vgm.header.total_samples;
        let gd3 = vgm.gd3.clone().unwrap_or_default();
        let mut track = vec![
            TimedEvent::new(0, MetaEvent::track_name(&gd3.title())),
            TimedEvent::new(0, MetaEvent::copyright(&gd3.artist)),
        ];
        if let Some(start) = vgm.loop_time() {
            log::debug!("loop {start}..{total}");
            track.push(TimedEvent::new(start, MetaEvent::marker("Loop start")));
        }
        track.push(TimedEvent::new(total, MetaEvent::marker("Loop end")));
        track.push(TimedEvent::new(total, MetaEvent::end_of_track()));
        track
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::Gd3;
    use crate::midi::MidiEvent;
    use crate::vgm::{VgmWriter, parse_vgm};

    fn song(loop_at: Option<u64>) -> VgmFile {
        let mut w = VgmWriter::new();
        w.psg_write(0x80 | 0x0E); // tone 0 period 0x0FE
        w.psg_write(0x0F);
        w.psg_write(0x95);
        if loop_at == Some(0) {
            w.mark_loop();
        }
        w.wait(1000);
        w.psg_write(0x9F);
        w.set_gd3(Gd3 {
            track: "Stage 1".into(),
            game: "Demo".into(),
            artist: "Someone".into(),
            ..Gd3::default()
        });
        parse_vgm(&w.finalize().unwrap()).unwrap()
    }

    fn metas(track: &MidiTrack) -> Vec<(u64, String)> {
        track
            .iter()
            .filter_map(|e| match &e.event {
                MidiEvent::Meta(m) => m.as_text().map(|t| (e.tick, t.to_string())),
                _ => None,
            })
            .collect()
    }

    #[test_log::test]
    fn test_conductor_track() {
        let midi = SongTranscoder::default()
            .transcode(&song(None), &mut InstrumentRegistry::new())
            .unwrap();
        assert_eq!(midi.file_type, FileType::MultiTrack);
        assert_eq!(midi.timebase, Timebase::TicksPerBeat(192));
        let end = crate::transcribe::retime::sample_to_tick(1000, &TranscodeConfig::default());
        assert_eq!(
            metas(&midi.tracks[0]),
            vec![
                (0, "Stage 1 - Demo".to_string()),
                (0, "Someone".to_string()),
                (end, "Loop end".to_string()),
            ]
        );
    }

    #[test_log::test]
    fn test_loop_marker() {
        let midi = SongTranscoder::default()
            .transcode(&song(Some(0)), &mut InstrumentRegistry::new())
            .unwrap();
        assert!(metas(&midi.tracks[0]).contains(&(0, "Loop start".to_string())));
    }

    #[test_log::test]
    fn test_psg_note_spans_song() {
        let config = TranscodeConfig::default();
        let midi = SongTranscoder::new(config.clone())
            .transcode(&song(None), &mut InstrumentRegistry::new())
            .unwrap();
        assert_eq!(midi.tracks.len(), 2);
        let notes: Vec<(u64, bool)> = midi.tracks[1]
            .iter()
            .filter_map(|e| match e.event {
                MidiEvent::NoteOn { .. } => Some((e.tick, true)),
                MidiEvent::NoteOff { .. } => Some((e.tick, false)),
                _ => None,
            })
            .collect();
        let end = crate::transcribe::retime::sample_to_tick(1000, &config);
        assert_eq!(notes, vec![(0, true), (end, false)]);
    }
}
