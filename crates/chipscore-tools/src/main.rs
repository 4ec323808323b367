use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chipscore::chip::audition::audition_log;
use chipscore::chip::instrument::describe_instrument;
use chipscore::chip::state::process_psg;
use chipscore::chip::synth::render_psg;
use chipscore::chip::{InstrumentCatalog, InstrumentRegistry};
use chipscore::{SongTranscoder, TranscodeConfig, write_midi};
use clap::{Parser, Subcommand};
use env_logger::Env;

mod midi;
mod vgm;
use vgm::{info as vgm_info, load_vgm};

/// chipscore command line tools
#[derive(Parser)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
    long_about = None
)]
struct Cli {
    /// TOML file with transcoding settings
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show summary info for a VGM file (accepts .vgm or .vgz; use '-' for stdin)
    Info {
        /// Input file to read (use '-' for stdin)
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Transcode a VGM file to a Standard MIDI File
    Transcode {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Output path; defaults to the input with a .mid extension
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,
    },
    /// Print every event of a MIDI file (or RIFF MIDS stream)
    DumpMidi {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Render each PSG channel of a VGM file to a WAV file
    RenderPsg {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Directory for the rendered channels
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        out_dir: PathBuf,
    },
    /// Describe the FM instruments used by one or more VGM files
    Instruments {
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
        /// Also write an audition VGM log per instrument into this directory
        #[arg(long, value_name = "DIR")]
        audition: Option<PathBuf>,
    },
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "stdin".to_string())
}

fn transcode(config: TranscodeConfig, file: &Path, output: Option<PathBuf>) -> Result<()> {
    let vgm = load_vgm(file)?;
    let mut registry = InstrumentRegistry::new();
    let midi = SongTranscoder::new(config)
        .transcode(&vgm, &mut registry)
        .with_context(|| format!("failed to transcode {}", file.display()))?;
    let bytes = write_midi(&midi).context("failed to encode MIDI")?;
    let output = output.unwrap_or_else(|| file.with_extension("mid"));
    std::fs::write(&output, bytes)
        .with_context(|| format!("failed to write {}", output.display()))?;
    log::info!(
        "wrote {} ({} tracks, {} FM instruments)",
        output.display(),
        midi.tracks.len(),
        registry.len()
    );
    Ok(())
}

fn render(config: &TranscodeConfig, file: &Path, out_dir: &Path) -> Result<()> {
    let vgm = load_vgm(file)?;
    let snapshots = process_psg(&vgm.frames);
    let render = render_psg(vgm.header.sn76489_clock, config.sample_rate, &snapshots);
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    let written = render
        .write_wav_files(out_dir, &format!("{}_psg_", file_stem(file)))
        .context("failed to write WAV files")?;
    if written.is_empty() {
        log::warn!("{}: no audible PSG channels", file.display());
    }
    Ok(())
}

fn instruments(config: TranscodeConfig, files: &[PathBuf], audition: Option<&Path>) -> Result<()> {
    let sample_rate = config.sample_rate;
    let transcoder = SongTranscoder::new(config);
    let mut catalog = InstrumentCatalog::new();
    if let Some(dir) = audition {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    for file in files {
        let vgm = load_vgm(file)?;
        let mut registry = InstrumentRegistry::new();
        transcoder
            .transcode(&vgm, &mut registry)
            .with_context(|| format!("failed to transcode {}", file.display()))?;
        println!("== {}", file.display());
        for (ix, inst) in registry.instruments().iter().enumerate() {
            let global = catalog.intern(*inst);
            let report = describe_instrument(&registry, ix, Some(global))
                .with_context(|| format!("instrument {ix} of {}", file.display()))?;
            println!("{report}");

            let (Some(dir), Some(note)) = (audition, registry.mean_note(ix)) else {
                continue;
            };
            let log = audition_log(inst, note, sample_rate)
                .with_context(|| format!("failed to build audition of instrument {global}"))?;
            let path = dir.join(format!("instrument_{global:03}.vgm"));
            std::fs::write(&path, log)
                .with_context(|| format!("failed to write {}", path.display()))?;
            log::info!("wrote {}", path.display());
        }
    }
    println!("{} distinct instruments", catalog.len());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => TranscodeConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => TranscodeConfig::default(),
    };

    match cli.command {
        Commands::Info { file } => {
            let vgm = load_vgm(&file)?;
            vgm_info(&file, &vgm, config.sample_rate);
        }
        Commands::Transcode { file, output } => transcode(config, &file, output)?,
        Commands::DumpMidi { file } => midi::dump(&midi::load_midi(&file)?),
        Commands::RenderPsg { file, out_dir } => render(&config, &file, &out_dir)?,
        Commands::Instruments { files, audition } => {
            instruments(config, &files, audition.as_deref())?
        }
    }

    Ok(())
}
