use std::fs::File;
use std::io::{Read, stdin};
use std::path::Path;

use anyhow::Context;
use chipscore::vgm::{VgmFile, parse_vgm};
use flate2::read::GzDecoder;

use comfy_table::{Cell, ContentArrangement, Table, presets::NOTHING};

fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == 0x1F && bytes[1] == 0x8B
}

fn gunzip(bytes: &[u8]) -> anyhow::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .context("failed to decompress gzip data")?;
    Ok(out)
}

/// Read VGM bytes from a path or stdin ('-') into a Vec<u8>.
///
/// Gzipped input (`.vgz`) is detected by its magic bytes and decompressed.
pub fn read_vgm_as_vec(path: &Path) -> anyhow::Result<Vec<u8>> {
    let mut inbuf = Vec::new();
    if path == Path::new("-") {
        stdin()
            .read_to_end(&mut inbuf)
            .context("failed to read from stdin")?;
    } else {
        File::open(path)
            .with_context(|| format!("failed to open input file: {}", path.display()))?
            .read_to_end(&mut inbuf)
            .context("failed to read input file")?;
    }
    if is_gzip(&inbuf) {
        gunzip(&inbuf)
    } else {
        Ok(inbuf)
    }
}

/// Read and decode a VGM log.
pub fn load_vgm(path: &Path) -> anyhow::Result<VgmFile> {
    let bytes = read_vgm_as_vec(path)?;
    parse_vgm(&bytes).with_context(|| format!("failed to decode {}", path.display()))
}

fn seconds(samples: u64, rate: u32) -> String {
    format!("{samples} ({:.3} s)", samples as f64 / f64::from(rate))
}

/// Info command: print header, Gd3 tags and write statistics.
pub fn info(path: &Path, vgm: &VgmFile, sample_rate: u32) {
    let header = &vgm.header;
    let fm_writes: usize = vgm.frames.iter().map(|f| f.fm.len()).sum();
    let psg_writes: usize = vgm.frames.iter().map(|f| f.psg.len()).sum();

    let mut rows: Vec<(&str, String)> = vec![
        ("File", path.display().to_string()),
        ("Version", format!("0x{:08X}", header.version)),
        ("YM2612 clock", header.ym2612_clock.to_string()),
        ("SN76489 clock", header.sn76489_clock.to_string()),
        ("Total samples", seconds(header.total_samples, sample_rate)),
        (
            "Loop",
            match vgm.loop_time() {
                Some(start) => format!(
                    "from sample {start}, {}",
                    seconds(header.loop_samples, sample_rate)
                ),
                None => "(none)".to_string(),
            },
        ),
        ("Data offset", format!("0x{:08X}", header.data_offset)),
        ("Frames", vgm.frames.len().to_string()),
        ("FM writes", fm_writes.to_string()),
        ("PSG writes", psg_writes.to_string()),
    ];
    if let Some(gd3) = &vgm.gd3 {
        rows.extend([
            ("Track", gd3.track.clone()),
            ("Game", gd3.game.clone()),
            ("System", gd3.system.clone()),
            ("Artist", gd3.artist.clone()),
            ("Date", gd3.date.clone()),
            ("Converter", gd3.converter.clone()),
        ]);
    }

    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    for (key, value) in rows {
        table.add_row(vec![Cell::new(key), Cell::new(value)]);
    }
    println!("{table}");
}
