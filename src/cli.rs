use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "wao", about = "Extract real-time visualizer features from an audio file")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG)
    pub input: PathBuf,

    /// Feature output, one JSON snapshot per line ("-" for stdout)
    #[arg(short, long, default_value = "features.jsonl")]
    pub output: PathBuf,

    /// Config file (defaults to ./wao.toml or the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Polls per second
    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// Pace polls against the wall clock instead of running offline
    #[arg(long)]
    pub realtime: bool,

    /// Include the analyser's full-resolution byte spectrum in each line
    #[arg(long)]
    pub raw_tap: bool,

    /// Analysis window in samples (power of two, 32-32768)
    #[arg(long, default_value_t = 2048)]
    pub fft_size: usize,

    /// Band smoothing coefficient (0.0-1.0, higher reacts faster)
    #[arg(long, default_value_t = 0.35)]
    pub smoothing: f32,

    /// Flag sustained clipping in the output
    #[arg(long)]
    pub clip_detect: bool,

    /// Skip writing snapshots; only report the tempo estimate
    #[arg(long)]
    pub bpm_only: bool,
}
