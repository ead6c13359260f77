use serde::Serialize;

use super::mapping::FrequencyMapping;
use super::settings::{ScalingStrategy, SpectrumSettings};

const SCALE_FACTOR_LINEAR: f64 = 9.0;
const SCALE_FACTOR_SQRT: f64 = 2.0;
const MIN_DB_VALUE: f64 = -90.0;
const MAX_DB_VALUE: f64 = 0.0;
const DB_SCALE: f64 = MAX_DB_VALUE - MIN_DB_VALUE;
/// Floor applied to magnitudes before taking the logarithm.
const MIN_MAGNITUDE: f64 = 1e-9;

/// One bucketed, scaled value of a reduced spectrum frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpectrumPoint {
    pub index: usize,
    pub value: f64,
}

/// Options that shape a single reduction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReduceOptions {
    pub scaling: ScalingStrategy,
    pub use_average: bool,
    pub log_scale: bool,
    pub amplitude_ceiling: f64,
}

impl From<&SpectrumSettings> for ReduceOptions {
    fn from(settings: &SpectrumSettings) -> Self {
        Self {
            scaling: settings.scaling,
            use_average: settings.use_average,
            log_scale: settings.log_scale,
            amplitude_ceiling: settings.amplitude_ceiling,
        }
    }
}

/// Scales one raw magnitude. The result may be negative; callers clamp.
pub fn scale_magnitude(magnitude: f64, scaling: ScalingStrategy, ceiling: f64) -> f64 {
    match scaling {
        ScalingStrategy::Decibel => {
            let db = 20.0 * magnitude.max(MIN_MAGNITUDE).log10();
            ((db - MIN_DB_VALUE) / DB_SCALE) * ceiling
        }
        ScalingStrategy::Linear => magnitude * SCALE_FACTOR_LINEAR * ceiling,
        ScalingStrategy::Sqrt => magnitude.max(0.0).sqrt() * SCALE_FACTOR_SQRT * ceiling,
    }
}

/// Reduces one magnitude frame to exactly `mapping.resolution()` points.
///
/// Each point takes the maximum scaled value of the bins up to and
/// including its boundary, clamped to `[0, amplitude_ceiling]`. Several
/// points sharing one boundary repeat the previous value. With
/// `use_average`, each point after the first is the mean of its own and
/// the previous point's clamped value. Bins missing from `fft_buffer` read
/// as silence.
pub fn reduce(
    fft_buffer: &[f32],
    mapping: &FrequencyMapping,
    options: &ReduceOptions,
) -> Vec<SpectrumPoint> {
    let bounds = mapping.bounds(options.log_scale);
    let ceiling = options.amplitude_ceiling;
    let mut points = Vec::with_capacity(bounds.len());

    let mut running_max = 0.0f64;
    let mut last_clamped = 0.0f64;

    for bin in mapping.min_frequency_index()..=mapping.max_frequency_index() {
        let magnitude = fft_buffer.get(bin).copied().unwrap_or(0.0) as f64;
        let scaled = scale_magnitude(magnitude, options.scaling, ceiling);
        // f64::max ignores NaN operands
        running_max = running_max.max(scaled).max(0.0);

        let mut fresh = true;
        while points.len() < bounds.len() && bin == bounds[points.len()] {
            let clamped = if fresh {
                running_max.min(ceiling)
            } else {
                last_clamped
            };
            let value = if options.use_average && !points.is_empty() {
                (last_clamped + clamped) / 2.0
            } else {
                clamped
            };
            points.push(SpectrumPoint {
                index: points.len(),
                value,
            });

            last_clamped = clamped;
            running_max = 0.0;
            fresh = false;
        }
    }

    debug_assert_eq!(points.len(), bounds.len());
    points
}

/// Drops `low_cut` points from the start and `high_cut` from the end,
/// re-indexing the remainder from zero.
pub fn crop(points: &[SpectrumPoint], low_cut: usize, high_cut: usize) -> Vec<SpectrumPoint> {
    let end = points.len().saturating_sub(high_cut);
    if low_cut >= end {
        return Vec::new();
    }
    points[low_cut..end]
        .iter()
        .enumerate()
        .map(|(index, p)| SpectrumPoint {
            index,
            value: p.value,
        })
        .collect()
}
