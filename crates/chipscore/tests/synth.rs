use chipscore::chip::state::process_psg;
use chipscore::chip::synth::render_psg;
use chipscore::vgm::{VgmWriter, parse_vgm};

#[test_log::test]
fn test_render_log_to_wav_files() {
    let mut w = VgmWriter::new();
    // tone 1 period 0x0FE at full volume, left only
    w.psg_stereo(0x20);
    w.psg_write(0xAE).psg_write(0x0F).psg_write(0xB0);
    w.wait(441);
    w.psg_write(0xBF);
    w.wait(441);
    let vgm = parse_vgm(&w.finalize().unwrap()).unwrap();

    let render = render_psg(vgm.header.sn76489_clock, 44_100, &process_psg(&vgm.frames));
    assert_eq!(render.samples(1).len(), 882);
    assert!(render.samples(1)[..441].iter().all(|s| s[1] == 0 && s[0] != 0));
    assert!(render.samples(1)[441..].iter().all(|s| *s == [0, 0]));

    let dir = std::env::temp_dir().join(format!("chipscore-synth-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let written = render.write_wav_files(&dir, "psg_").unwrap();
    assert_eq!(written, vec![1]);

    let reader = hound::WavReader::open(dir.join("psg_1.wav")).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, 44_100);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(reader.duration(), 882);
    std::fs::remove_dir_all(&dir).unwrap();
}
