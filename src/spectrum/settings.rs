use serde::{Deserialize, Serialize};

use crate::error::{invalid, Result};

/// How raw FFT magnitudes are turned into display values.
///
/// Decibel maps -90..0 dB onto 0..1. Linear boosts magnitudes by a fixed
/// factor. Sqrt compresses peaks for a balanced spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalingStrategy {
    #[default]
    Decibel,
    Linear,
    Sqrt,
}

/// User-facing options of one spectrum pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrumSettings {
    #[serde(default = "default_min_frequency")]
    pub min_frequency: f64,
    #[serde(default = "default_max_frequency")]
    pub max_frequency: f64,
    /// Number of spectrum points produced per frame.
    #[serde(default = "default_resolution")]
    pub resolution: usize,
    #[serde(default = "default_log_scale")]
    pub log_scale: bool,
    #[serde(default)]
    pub scaling: ScalingStrategy,
    #[serde(default = "default_use_average")]
    pub use_average: bool,
    /// Upper bound of every output value.
    #[serde(default = "default_amplitude_ceiling")]
    pub amplitude_ceiling: f64,
}

impl Default for SpectrumSettings {
    fn default() -> Self {
        Self {
            min_frequency: default_min_frequency(),
            max_frequency: default_max_frequency(),
            resolution: default_resolution(),
            log_scale: default_log_scale(),
            scaling: ScalingStrategy::default(),
            use_average: default_use_average(),
            amplitude_ceiling: default_amplitude_ceiling(),
        }
    }
}

fn default_min_frequency() -> f64 { 20.0 }
fn default_max_frequency() -> f64 { 20_000.0 }
fn default_resolution() -> usize { 118 }
fn default_log_scale() -> bool { true }
fn default_use_average() -> bool { true }
fn default_amplitude_ceiling() -> f64 { 1.0 }

impl SpectrumSettings {
    pub fn validate(&self) -> Result<()> {
        if !self.min_frequency.is_finite() || self.min_frequency < 0.0 {
            return Err(invalid(format!(
                "minimum frequency must be a non-negative number, got {}",
                self.min_frequency
            )));
        }
        if !self.max_frequency.is_finite() || self.max_frequency <= self.min_frequency {
            return Err(invalid(format!(
                "maximum frequency {} must exceed minimum frequency {}",
                self.max_frequency, self.min_frequency
            )));
        }
        // The logarithmic bucket formula divides by log(resolution) terms
        // that vanish for a single point.
        if self.resolution < 2 {
            return Err(invalid(format!(
                "resolution must be at least 2, got {}",
                self.resolution
            )));
        }
        if !self.amplitude_ceiling.is_finite() || self.amplitude_ceiling < 0.0 {
            return Err(invalid(format!(
                "amplitude ceiling must be a non-negative number, got {}",
                self.amplitude_ceiling
            )));
        }
        Ok(())
    }

    /// True when switching from `self` to `other` invalidates the bin mapping.
    pub fn mapping_changed(&self, other: &SpectrumSettings) -> bool {
        self.min_frequency != other.min_frequency
            || self.max_frequency != other.max_frequency
            || self.resolution != other.resolution
            || self.log_scale != other.log_scale
    }
}
