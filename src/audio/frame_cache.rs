//! Shared FFT frame with per-consumer de-duplication.
//!
//! The capture side pushes samples with [`FftFrameCache::add_samples`];
//! every visual consumer pulls with [`FftFrameCache::try_get_frame`] using
//! its own [`ConsumerToken`]. The transform runs at most once per frame no
//! matter how many consumers read it, and each consumer sees a given frame
//! exactly once.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{invalid, Result};
use crate::ring_buffer::RingBuffer;

use super::fft::FftProvider;

/// Identity of one frame consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConsumerToken(u64);

impl ConsumerToken {
    /// Allocates a process-unique token.
    pub fn new() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConsumerToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache shared between the capture callback and the frame tick.
pub type SharedFrameCache = Arc<Mutex<FftFrameCache>>;

/// Locks a shared cache, recovering from a poisoned lock.
pub fn lock(cache: &SharedFrameCache) -> MutexGuard<'_, FftFrameCache> {
    cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct FftFrameCache {
    provider: Box<dyn FftProvider>,
    channels: usize,
    sample_rate: u32,
    /// Most recent `fft_size` mono samples.
    history: RingBuffer<f32>,
    /// Interleaved samples of an incomplete multi-channel frame.
    partial: Vec<f32>,
    window: Vec<f32>,
    magnitudes: Vec<f32>,
    /// Set when samples arrived since the last transform.
    dirty: bool,
    consumed: HashSet<ConsumerToken>,
}

impl FftFrameCache {
    pub fn new(provider: Box<dyn FftProvider>, channels: usize, sample_rate: u32) -> Result<Self> {
        if channels == 0 {
            return Err(invalid("channel count must be positive"));
        }
        if sample_rate == 0 {
            return Err(invalid("sample rate must be positive"));
        }
        let fft_size = provider.fft_size();
        if fft_size < 2 || !fft_size.is_power_of_two() {
            return Err(invalid(format!(
                "FFT size must be a power of two, got {}",
                fft_size
            )));
        }

        Ok(Self {
            provider,
            channels,
            sample_rate,
            history: RingBuffer::with_value(fft_size, 0.0)?,
            partial: Vec::with_capacity(channels),
            window: vec![0.0; fft_size],
            magnitudes: vec![0.0; fft_size / 2],
            dirty: true,
            consumed: HashSet::new(),
        })
    }

    /// Wraps the cache for use from both timelines.
    pub fn shared(self) -> SharedFrameCache {
        Arc::new(Mutex::new(self))
    }

    pub fn fft_size(&self) -> usize {
        self.history.capacity()
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Appends interleaved samples, down-mixing to mono.
    ///
    /// Any non-empty call starts a new frame: every consumer becomes
    /// eligible to read again.
    pub fn add_samples(&mut self, samples: &[f32]) {
        if samples.is_empty() {
            return;
        }

        if self.channels == 1 {
            for &sample in samples {
                self.history.add(sample);
            }
        } else {
            let mut rest = samples;
            if !self.partial.is_empty() {
                let needed = (self.channels - self.partial.len()).min(rest.len());
                self.partial.extend_from_slice(&rest[..needed]);
                rest = &rest[needed..];
                if self.partial.len() == self.channels {
                    let mono = downmix(&self.partial);
                    self.history.add(mono);
                    self.partial.clear();
                }
            }
            let mut frames = rest.chunks_exact(self.channels);
            for frame in &mut frames {
                self.history.add(downmix(frame));
            }
            self.partial.extend_from_slice(frames.remainder());
        }

        self.dirty = true;
        self.consumed.clear();
    }

    /// Copies the current frame's magnitudes into `out` unless `token` has
    /// already read this frame.
    ///
    /// Returns `false` and leaves `out` untouched when there is nothing new
    /// for this consumer.
    pub fn try_get_frame(&mut self, token: ConsumerToken, out: &mut Vec<f32>) -> bool {
        if self.consumed.contains(&token) {
            return false;
        }

        if self.dirty {
            for (slot, &sample) in self.window.iter_mut().zip(self.history.iter().rev()) {
                *slot = sample;
            }
            self.provider
                .compute_magnitudes(&self.window, &mut self.magnitudes);
            self.dirty = false;
            log::trace!("Computed FFT frame ({} bins)", self.magnitudes.len());
        }

        out.clear();
        out.extend_from_slice(&self.magnitudes);
        self.consumed.insert(token);
        true
    }
}

fn downmix(frame: &[f32]) -> f32 {
    frame.iter().sum::<f32>() / frame.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records each window it transforms; magnitudes echo the window.
    struct EchoProvider {
        size: usize,
        calls: Arc<Mutex<Vec<Vec<f32>>>>,
    }

    impl FftProvider for EchoProvider {
        fn fft_size(&self) -> usize {
            self.size
        }

        fn compute_magnitudes(&mut self, window: &[f32], out: &mut [f32]) {
            self.calls.lock().unwrap().push(window.to_vec());
            for (o, w) in out.iter_mut().zip(window.iter().rev()) {
                *o = *w;
            }
        }
    }

    fn cache(size: usize, channels: usize) -> (FftFrameCache, Arc<Mutex<Vec<Vec<f32>>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let provider = EchoProvider {
            size,
            calls: Arc::clone(&calls),
        };
        (
            FftFrameCache::new(Box::new(provider), channels, 44_100).unwrap(),
            calls,
        )
    }

    #[test]
    fn rejects_bad_parameters() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let p = |size| Box::new(EchoProvider { size, calls: Arc::clone(&calls) });
        assert!(FftFrameCache::new(p(8), 0, 44_100).is_err());
        assert!(FftFrameCache::new(p(8), 1, 0).is_err());
        assert!(FftFrameCache::new(p(6), 1, 44_100).is_err());
    }

    #[test]
    fn each_token_reads_a_frame_once() {
        let (mut cache, calls) = cache(8, 1);
        let a = ConsumerToken::new();
        let b = ConsumerToken::new();
        let mut out_a = Vec::new();
        let mut out_b = Vec::new();

        cache.add_samples(&[1.0, 2.0, 3.0]);
        assert!(cache.try_get_frame(a, &mut out_a));
        assert!(cache.try_get_frame(b, &mut out_b));
        assert_eq!(out_a, out_b);
        assert_eq!(out_a, vec![3.0, 2.0, 1.0, 0.0]);

        let mut untouched = vec![42.0];
        assert!(!cache.try_get_frame(a, &mut untouched));
        assert!(!cache.try_get_frame(b, &mut untouched));
        assert_eq!(untouched, vec![42.0]);

        // one transform served both consumers
        assert_eq!(calls.lock().unwrap().len(), 1);

        cache.add_samples(&[4.0]);
        assert!(cache.try_get_frame(a, &mut out_a));
        assert!(cache.try_get_frame(b, &mut out_b));
        assert_eq!(out_a, vec![4.0, 3.0, 2.0, 1.0]);
        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn empty_add_does_not_start_a_frame() {
        let (mut cache, _) = cache(8, 1);
        let token = ConsumerToken::new();
        let mut out = Vec::new();
        assert!(cache.try_get_frame(token, &mut out));
        cache.add_samples(&[]);
        assert!(!cache.try_get_frame(token, &mut out));
    }

    #[test]
    fn fresh_tokens_see_silence_before_samples() {
        let (mut cache, _) = cache(8, 1);
        let mut out = Vec::new();
        assert!(cache.try_get_frame(ConsumerToken::new(), &mut out));
        assert_eq!(out, vec![0.0; 4]);
    }

    #[test]
    fn window_is_chronological_and_bounded() {
        let (mut cache, calls) = cache(4, 1);
        cache.add_samples(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let mut out = Vec::new();
        cache.try_get_frame(ConsumerToken::new(), &mut out);
        assert_eq!(calls.lock().unwrap()[0], vec![3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn stereo_is_downmixed_across_calls() {
        let (mut cache, calls) = cache(4, 2);
        cache.add_samples(&[1.0, 3.0, 2.0]);
        cache.add_samples(&[4.0, -1.0, 1.0]);
        let mut out = Vec::new();
        cache.try_get_frame(ConsumerToken::new(), &mut out);
        assert_eq!(calls.lock().unwrap()[0], vec![0.0, 2.0, 3.0, 0.0]);
    }

    #[test]
    fn tokens_are_unique() {
        let a = ConsumerToken::new();
        let b = ConsumerToken::default();
        assert_ne!(a, b);
    }
}
