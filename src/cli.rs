use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use specviz::spectrum::ScalingStrategy;

#[derive(Parser, Debug)]
#[command(name = "specviz", about = "Audio spectrum analyzer producing per-frame visualizer points")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG)
    pub input: Option<PathBuf>,

    /// Capture from the default input device instead of a file
    #[arg(long, conflicts_with = "input")]
    pub live: bool,

    /// Live capture length in seconds
    #[arg(long, default_value_t = 10.0)]
    pub duration: f32,

    /// Output file for JSON-lines frames (stdout when omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Visual frames per second
    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// FFT size (power of two)
    #[arg(long, default_value_t = 4096)]
    pub fft_size: usize,

    /// Lowest analyzed frequency in Hz
    #[arg(long, default_value_t = 20.0)]
    pub min_freq: f64,

    /// Highest analyzed frequency in Hz
    #[arg(long, default_value_t = 20000.0)]
    pub max_freq: f64,

    /// Spectrum points per frame
    #[arg(short, long, default_value_t = 118)]
    pub resolution: usize,

    /// Use linear instead of logarithmic frequency spacing
    #[arg(long)]
    pub linear: bool,

    /// Amplitude scaling [default: decibel]
    #[arg(long, value_enum)]
    pub scaling: Option<Scaling>,

    /// Disable averaging of neighbouring points
    #[arg(long)]
    pub no_average: bool,

    /// Points dropped from the low end of each frame
    #[arg(long, default_value_t = 15)]
    pub low_cut: usize,

    /// Points dropped from the high end of each frame
    #[arg(long, default_value_t = 3)]
    pub high_cut: usize,

    /// Config file (defaults to ./specviz.toml or the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scaling {
    Decibel,
    Linear,
    Sqrt,
}

impl From<Scaling> for ScalingStrategy {
    fn from(scaling: Scaling) -> Self {
        match scaling {
            Scaling::Decibel => ScalingStrategy::Decibel,
            Scaling::Linear => ScalingStrategy::Linear,
            Scaling::Sqrt => ScalingStrategy::Sqrt,
        }
    }
}

impl Cli {
    /// Live capture length, rejecting values no `Duration` can hold.
    pub fn capture_duration(&self) -> Result<Duration> {
        if !self.duration.is_finite() || self.duration < 0.0 {
            anyhow::bail!(
                "Capture duration must be a finite, non-negative number of seconds, got {}",
                self.duration
            );
        }
        Ok(Duration::try_from_secs_f32(self.duration)?)
    }
}
