mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::{Duration, Instant};

use cli::Cli;
use specviz::audio::analysis::{self, AnalysisOptions};
use specviz::audio::capture::LiveCapture;
use specviz::audio::decode;
use specviz::config;
use specviz::encode::frames::FrameWriter;
use specviz::spectrum::{crop, ScalingStrategy, SpectrumContext, SpectrumPipeline, SpectrumSettings};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();
    let mut amplitude_ceiling = SpectrumSettings::default().amplitude_ceiling;
    let mut scaling = ScalingStrategy::default();

    if let Some(path) = config::find_config_path(cli.config.as_deref()) {
        if let Some(cfg) = config::load_config(&path) {
            log::info!("Loaded config from {}", path.display());
            // Merge: config values apply only when CLI is at its default
            if cli.fps == config::default_fps() { cli.fps = cfg.output.fps; }
            if cli.low_cut == config::default_low_cut() { cli.low_cut = cfg.output.low_cut; }
            if cli.high_cut == config::default_high_cut() { cli.high_cut = cfg.output.high_cut; }
            if cli.fft_size == config::default_fft_size() { cli.fft_size = cfg.audio.fft_size; }
            let defaults = SpectrumSettings::default();
            if cli.min_freq == defaults.min_frequency { cli.min_freq = cfg.spectrum.min_frequency; }
            if cli.max_freq == defaults.max_frequency { cli.max_freq = cfg.spectrum.max_frequency; }
            if cli.resolution == defaults.resolution { cli.resolution = cfg.spectrum.resolution; }
            if !cli.linear { cli.linear = !cfg.spectrum.log_scale; }
            scaling = cfg.spectrum.scaling;
            if !cli.no_average { cli.no_average = !cfg.spectrum.use_average; }
            amplitude_ceiling = cfg.spectrum.amplitude_ceiling;
        } else {
            log::warn!("Failed to load config from {}", path.display());
        }
    }

    if let Some(arg) = cli.scaling {
        scaling = arg.into();
    }

    let settings = SpectrumSettings {
        min_frequency: cli.min_freq,
        max_frequency: cli.max_freq,
        resolution: cli.resolution,
        log_scale: !cli.linear,
        scaling,
        use_average: !cli.no_average,
        amplitude_ceiling,
    };
    settings.validate().context("Invalid spectrum settings")?;

    log::info!("specviz - audio spectrum analyzer");
    log::info!(
        "Spectrum: {}-{} Hz, {} points, {} spacing, {:?} scaling, averaging {}",
        settings.min_frequency,
        settings.max_frequency,
        settings.resolution,
        if settings.log_scale { "log" } else { "linear" },
        settings.scaling,
        if settings.use_average { "on" } else { "off" }
    );

    if cli.live {
        run_live(&cli, settings)
    } else {
        let input = cli.input.as_ref().context("Input audio file is required (or pass --live)")?;
        if !input.exists() {
            anyhow::bail!("Input file not found: {}", input.display());
        }
        run_file(&cli, input, settings)
    }
}

fn run_file(cli: &Cli, input: &Path, settings: SpectrumSettings) -> Result<()> {
    log::info!("Input: {}", input.display());
    log::info!("Decoding audio...");
    let audio = decode::decode_audio(input)?;

    let options = AnalysisOptions {
        fps: cli.fps,
        fft_size: cli.fft_size,
        low_cut: cli.low_cut,
        high_cut: cli.high_cut,
    };
    let total_ticks = (audio.duration() as f64 * cli.fps as f64).ceil() as u64;

    let mut writer = FrameWriter::create(cli.output.as_deref())?;

    // Progress only when stdout is not carrying the frames
    let pb = if cli.output.is_some() {
        let pb = ProgressBar::new(total_ticks);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")
                .context("Invalid progress template")?
                .progress_chars("=>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let emitted = analysis::analyze(&audio, &options, settings, |tick, time, points| {
        writer.write_frame(tick, time, points)?;
        pb.set_position(tick + 1);
        Ok(())
    })?;

    pb.finish_with_message("Analysis complete");
    writer.finish()?;
    log::info!("Done! {} frames over {:.1}s", emitted, audio.duration());
    Ok(())
}

fn run_live(cli: &Cli, settings: SpectrumSettings) -> Result<()> {
    if cli.fps == 0 {
        anyhow::bail!("Frame rate must be positive");
    }
    let total = cli.capture_duration()?;

    let mut capture = LiveCapture::open_default()?;
    let context = SpectrumContext::new(capture.sample_rate(), capture.channels(), cli.fft_size)
        .context("Failed to set up spectrum analysis")?;
    let mut pipeline =
        SpectrumPipeline::new(&context, settings).context("Invalid spectrum settings")?;
    let mut writer = FrameWriter::create(cli.output.as_deref())?;

    capture.start(context.cache().clone())?;
    log::info!("Capturing for {:.1}s at {} fps", cli.duration, cli.fps);

    let frame_time = Duration::from_secs_f64(1.0 / cli.fps as f64);
    let started = Instant::now();
    let mut tick: u64 = 0;

    while started.elapsed() < total {
        let deadline = started + frame_time * (tick as u32 + 1);
        if let Some(points) = pipeline.tick() {
            let cropped = crop(points, cli.low_cut, cli.high_cut);
            writer.write_frame(tick, started.elapsed().as_secs_f64(), &cropped)?;
        } else {
            log::trace!("No new audio for tick {}", tick);
        }
        tick += 1;
        if let Some(wait) = deadline.checked_duration_since(Instant::now()) {
            std::thread::sleep(wait);
        }
    }

    capture.stop();
    let skipped = tick - writer.frames_written();
    if skipped > 0 {
        log::info!("{} of {} ticks had no new audio", skipped, tick);
    }
    writer.finish()?;
    Ok(())
}
