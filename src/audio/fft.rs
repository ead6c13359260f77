//! Time-domain window to magnitude spectrum.

use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::error::{invalid, Result};

/// Computes a magnitude spectrum from a window of mono samples.
///
/// `window.len()` equals `fft_size()` and `out.len()` equals
/// `fft_size() / 2`. Implementations must be deterministic.
pub trait FftProvider: Send {
    fn fft_size(&self) -> usize;
    fn compute_magnitudes(&mut self, window: &[f32], out: &mut [f32]);
}

/// Hann-windowed forward FFT backed by `rustfft`.
///
/// Magnitudes are normalised by the window gain so that a full-scale sine
/// reads close to 1.0.
pub struct RustFftProvider {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    gain: f32,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl RustFftProvider {
    pub fn new(fft_size: usize) -> Result<Self> {
        if fft_size < 2 || !fft_size.is_power_of_two() {
            return Err(invalid(format!(
                "FFT size must be a power of two, got {}",
                fft_size
            )));
        }
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);
        let window = hann_window(fft_size);
        let window_sum: f32 = window.iter().sum();
        let gain = if window_sum > 0.0 { 2.0 / window_sum } else { 0.0 };
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        Ok(Self {
            fft,
            window,
            gain,
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            scratch,
        })
    }
}

impl FftProvider for RustFftProvider {
    fn fft_size(&self) -> usize {
        self.window.len()
    }

    fn compute_magnitudes(&mut self, window: &[f32], out: &mut [f32]) {
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = window.get(i).copied().unwrap_or(0.0);
            *slot = Complex::new(sample * self.window[i], 0.0);
        }
        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);

        for (bin, magnitude) in out.iter_mut().enumerate() {
            *magnitude = self
                .buffer
                .get(bin)
                .map_or(0.0, |c| c.norm() * self.gain);
        }
    }
}

/// Hann window function for FFT analysis
pub fn hann_window(size: usize) -> Vec<f32> {
    if size < 2 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / (size - 1) as f32).cos()))
        .collect()
}
