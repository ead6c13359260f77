use anyhow::{Context, Result};

use super::decode::AudioData;
use crate::spectrum::{crop, SpectrumContext, SpectrumPipeline, SpectrumPoint, SpectrumSettings};

/// Frame pacing and output shaping for offline analysis.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisOptions {
    pub fps: u32,
    pub fft_size: usize,
    pub low_cut: usize,
    pub high_cut: usize,
}

/// Replays decoded audio through a spectrum pipeline at `fps`.
///
/// Each visual tick first feeds the samples that would have been captured
/// during that tick, then pulls a frame, so the result matches a live
/// session deterministically. `on_frame` receives the tick index, its time
/// in seconds and the cropped points. Returns the number of frames emitted.
pub fn analyze<F>(
    audio: &AudioData,
    options: &AnalysisOptions,
    settings: SpectrumSettings,
    mut on_frame: F,
) -> Result<u64>
where
    F: FnMut(u64, f64, &[SpectrumPoint]) -> Result<()>,
{
    if options.fps == 0 {
        anyhow::bail!("Frame rate must be positive");
    }

    let context = SpectrumContext::new(audio.sample_rate, 1, options.fft_size)
        .context("Failed to set up spectrum analysis")?;
    let mut pipeline =
        SpectrumPipeline::new(&context, settings).context("Invalid spectrum settings")?;

    let samples = &audio.samples;
    let samples_per_tick = audio.sample_rate as f64 / options.fps as f64;
    let total_ticks = (samples.len() as f64 / samples_per_tick).ceil() as u64;

    log::info!(
        "Analyzing {} ticks at {} fps ({:.1} samples per tick, FFT {})",
        total_ticks,
        options.fps,
        samples_per_tick,
        options.fft_size
    );

    let mut emitted = 0;
    for tick in 0..total_ticks {
        let start = ((tick as f64 * samples_per_tick).round() as usize).min(samples.len());
        let end = (((tick + 1) as f64 * samples_per_tick).round() as usize).min(samples.len());
        context.add_samples(&samples[start..end]);

        if let Some(points) = pipeline.tick() {
            let cropped = crop(points, options.low_cut, options.high_cut);
            on_frame(tick, tick as f64 / options.fps as f64, &cropped)?;
            emitted += 1;
        }
    }

    Ok(emitted)
}
