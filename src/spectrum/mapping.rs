//! Frequency range to FFT bin boundaries.
//!
//! All log and rounding work happens here, once per configuration, so the
//! per-frame reduction only compares bin indices against a table.

use crate::error::{invalid, Result};

use super::settings::SpectrumSettings;

/// Bin geometry of one capture configuration (sample rate and FFT size).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrequencyMapper {
    sample_rate: u32,
    fft_size: usize,
}

/// Per-point bucket boundaries in both linear and logarithmic spacing.
///
/// Both boundary tables are non-decreasing, hold one entry per spectrum
/// point, and end at `max_frequency_index`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyMapping {
    min_frequency_index: usize,
    max_frequency_index: usize,
    linear_bounds: Vec<usize>,
    log_bounds: Vec<usize>,
}

impl FrequencyMapper {
    pub fn new(sample_rate: u32, fft_size: usize) -> Result<Self> {
        if sample_rate == 0 {
            return Err(invalid("sample rate must be positive"));
        }
        if fft_size < 2 || !fft_size.is_power_of_two() {
            return Err(invalid(format!(
                "FFT size must be a power of two, got {}",
                fft_size
            )));
        }
        Ok(Self { sample_rate, fft_size })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Highest usable magnitude bin.
    pub fn max_fft_index(&self) -> usize {
        self.fft_size / 2 - 1
    }

    /// Unclamped bin index of `frequency` (Hz).
    pub fn bin_index(&self, frequency: f64) -> usize {
        let nyquist = self.sample_rate as f64 / 2.0;
        let half = (self.fft_size / 2) as f64;
        // float-to-int casts saturate, negatives land on 0
        ((frequency / nyquist) * half).floor() as usize
    }

    pub fn map(&self, settings: &SpectrumSettings) -> Result<FrequencyMapping> {
        settings.validate()?;

        let max_fft_index = self.max_fft_index();
        let min_index = self.bin_index(settings.min_frequency).min(max_fft_index);
        let max_index = self
            .bin_index(settings.max_frequency)
            .saturating_add(1)
            .min(max_fft_index);

        let resolution = settings.resolution;
        let index_count = max_index - min_index;
        let bucket_size = round_to(index_count as f64 / resolution as f64, 3);

        let log_base = ((resolution + 1) as f64).ln();

        let mut linear_bounds = Vec::with_capacity(resolution);
        let mut log_bounds = Vec::with_capacity(resolution);
        for i in 1..resolution {
            let linear = min_index + (i as f64 * bucket_size).round() as usize;
            linear_bounds.push(linear.min(max_index));

            // log_r(r) is 1, so the offset is 1 - log_{r+1}(r + 1 - i)
            let fraction = 1.0 - ((resolution + 1 - i) as f64).ln() / log_base;
            let log = min_index + (fraction * index_count as f64).floor() as usize;
            log_bounds.push(log.min(max_index));
        }
        linear_bounds.push(max_index);
        log_bounds.push(max_index);

        log::debug!(
            "Frequency mapping: {:.0}-{:.0} Hz -> bins {}..={} ({} points, bucket {:.3})",
            settings.min_frequency,
            settings.max_frequency,
            min_index,
            max_index,
            resolution,
            bucket_size
        );

        Ok(FrequencyMapping {
            min_frequency_index: min_index,
            max_frequency_index: max_index,
            linear_bounds,
            log_bounds,
        })
    }
}

impl FrequencyMapping {
    pub fn min_frequency_index(&self) -> usize {
        self.min_frequency_index
    }

    pub fn max_frequency_index(&self) -> usize {
        self.max_frequency_index
    }

    pub fn linear_bounds(&self) -> &[usize] {
        &self.linear_bounds
    }

    pub fn log_bounds(&self) -> &[usize] {
        &self.log_bounds
    }

    /// Boundary table for the requested spacing.
    pub fn bounds(&self, log_scale: bool) -> &[usize] {
        if log_scale {
            &self.log_bounds
        } else {
            &self.linear_bounds
        }
    }

    pub fn resolution(&self) -> usize {
        self.linear_bounds.len()
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
