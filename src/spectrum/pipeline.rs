use std::time::Duration;

use crate::audio::fft::{FftProvider, RustFftProvider};
use crate::audio::frame_cache::{lock, ConsumerToken, FftFrameCache, SharedFrameCache};
use crate::effects::Effect;
use crate::error::Result;

use super::mapping::{FrequencyMapper, FrequencyMapping};
use super::reducer::{reduce, ReduceOptions, SpectrumPoint};
use super::settings::{ScalingStrategy, SpectrumSettings};

/// Audio state shared by every pipeline of one capture session.
///
/// Created once at startup and handed to each pipeline; cloning shares the
/// same frame cache.
#[derive(Clone)]
pub struct SpectrumContext {
    cache: SharedFrameCache,
    mapper: FrequencyMapper,
    channels: usize,
}

impl SpectrumContext {
    /// Context with a `rustfft` transform of `fft_size` points.
    pub fn new(sample_rate: u32, channels: usize, fft_size: usize) -> Result<Self> {
        let provider = RustFftProvider::new(fft_size)?;
        Self::with_provider(Box::new(provider), channels, sample_rate)
    }

    pub fn with_provider(
        provider: Box<dyn FftProvider>,
        channels: usize,
        sample_rate: u32,
    ) -> Result<Self> {
        let mapper = FrequencyMapper::new(sample_rate, provider.fft_size())?;
        let cache = FftFrameCache::new(provider, channels, sample_rate)?.shared();
        Ok(Self {
            cache,
            mapper,
            channels,
        })
    }

    /// Producer entry point: appends interleaved samples.
    pub fn add_samples(&self, samples: &[f32]) {
        lock(&self.cache).add_samples(samples);
    }

    pub fn cache(&self) -> &SharedFrameCache {
        &self.cache
    }

    pub fn mapper(&self) -> FrequencyMapper {
        self.mapper
    }

    pub fn sample_rate(&self) -> u32 {
        self.mapper.sample_rate()
    }

    pub fn fft_size(&self) -> usize {
        self.mapper.fft_size()
    }

    pub fn channels(&self) -> usize {
        self.channels
    }
}

/// Per-effect consumer: pulls frames from the shared cache and reduces
/// them to spectrum points once per visual tick.
pub struct SpectrumPipeline {
    cache: SharedFrameCache,
    mapper: FrequencyMapper,
    token: ConsumerToken,
    settings: SpectrumSettings,
    mapping: FrequencyMapping,
    fft_buffer: Vec<f32>,
    points: Vec<SpectrumPoint>,
}

impl SpectrumPipeline {
    pub fn new(context: &SpectrumContext, settings: SpectrumSettings) -> Result<Self> {
        let mapper = context.mapper();
        let mapping = mapper.map(&settings)?;
        Ok(Self {
            cache: context.cache.clone(),
            mapper,
            token: ConsumerToken::new(),
            settings,
            mapping,
            fft_buffer: Vec::with_capacity(mapper.fft_size() / 2),
            points: Vec::new(),
        })
    }

    /// Reduces the current frame if it is new to this pipeline.
    ///
    /// Returns `None` when no samples arrived since the last tick; the
    /// previous points stay available through [`Self::points`].
    pub fn tick(&mut self) -> Option<&[SpectrumPoint]> {
        let fresh = lock(&self.cache).try_get_frame(self.token, &mut self.fft_buffer);
        if !fresh {
            return None;
        }
        let options = ReduceOptions::from(&self.settings);
        self.points = reduce(&self.fft_buffer, &self.mapping, &options);
        Some(self.points.as_slice())
    }

    /// Ticks and forwards a new frame to `effect`. Returns whether the
    /// effect was updated.
    pub fn tick_effect(&mut self, effect: &mut dyn Effect, dt: Duration) -> bool {
        match self.tick() {
            Some(points) => {
                effect.update(dt, points);
                true
            }
            None => false,
        }
    }

    /// Points of the most recent reduction (empty before the first one).
    pub fn points(&self) -> &[SpectrumPoint] {
        &self.points
    }

    pub fn settings(&self) -> &SpectrumSettings {
        &self.settings
    }

    pub fn mapping(&self) -> &FrequencyMapping {
        &self.mapping
    }

    /// Replaces the settings, recomputing the bin mapping when needed.
    /// Invalid settings are rejected and the current ones kept.
    pub fn set_settings(&mut self, settings: SpectrumSettings) -> Result<()> {
        settings.validate()?;
        if self.settings.mapping_changed(&settings) {
            self.mapping = self.mapper.map(&settings)?;
        }
        self.settings = settings;
        Ok(())
    }

    pub fn set_frequency_range(&mut self, min_frequency: f64, max_frequency: f64) -> Result<()> {
        self.set_settings(SpectrumSettings {
            min_frequency,
            max_frequency,
            ..self.settings.clone()
        })
    }

    pub fn set_resolution(&mut self, resolution: usize) -> Result<()> {
        self.set_settings(SpectrumSettings {
            resolution,
            ..self.settings.clone()
        })
    }

    pub fn set_log_scale(&mut self, log_scale: bool) -> Result<()> {
        self.set_settings(SpectrumSettings {
            log_scale,
            ..self.settings.clone()
        })
    }

    pub fn set_scaling(&mut self, scaling: ScalingStrategy) {
        self.settings.scaling = scaling;
    }

    pub fn set_use_average(&mut self, use_average: bool) {
        self.settings.use_average = use_average;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SpectrumError;

    fn sine(frequency: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                (2.0 * std::f32::consts::PI * frequency * i as f32 / sample_rate as f32).sin()
            })
            .collect()
    }

    fn settings(resolution: usize) -> SpectrumSettings {
        SpectrumSettings {
            resolution,
            ..SpectrumSettings::default()
        }
    }

    #[test]
    fn tick_only_reports_new_frames() {
        let ctx = SpectrumContext::new(44_100, 1, 1024).unwrap();
        let mut pipeline = SpectrumPipeline::new(&ctx, settings(32)).unwrap();
        assert!(pipeline.points().is_empty());

        ctx.add_samples(&sine(1000.0, 44_100, 1024));
        let points = pipeline.tick().unwrap().to_vec();
        assert_eq!(points.len(), 32);
        assert!(pipeline.tick().is_none());
        assert_eq!(pipeline.points(), points.as_slice());

        ctx.add_samples(&[0.0; 16]);
        assert!(pipeline.tick().is_some());
    }

    #[test]
    fn pipelines_share_one_frame() {
        let ctx = SpectrumContext::new(44_100, 2, 2048).unwrap();
        let mut a = SpectrumPipeline::new(&ctx, settings(40)).unwrap();
        let mut b = SpectrumPipeline::new(&ctx.clone(), settings(40)).unwrap();

        let mono = sine(440.0, 44_100, 2048);
        let stereo: Vec<f32> = mono.iter().flat_map(|&s| [s, s]).collect();
        ctx.add_samples(&stereo);

        let pa = a.tick().unwrap().to_vec();
        let pb = b.tick().unwrap().to_vec();
        assert_eq!(pa, pb);
        assert!(pa.iter().any(|p| p.value > 0.5));
    }

    #[test]
    fn settings_changes_recompute_mapping() {
        let ctx = SpectrumContext::new(44_100, 1, 4096).unwrap();
        let mut pipeline = SpectrumPipeline::new(&ctx, settings(100)).unwrap();
        pipeline.set_resolution(20).unwrap();
        assert_eq!(pipeline.mapping().resolution(), 20);

        ctx.add_samples(&[0.1; 64]);
        assert_eq!(pipeline.tick().unwrap().len(), 20);

        pipeline.set_frequency_range(100.0, 5000.0).unwrap();
        assert_eq!(pipeline.mapping().min_frequency_index(), 9);

        pipeline.set_log_scale(false).unwrap();
        assert!(!pipeline.settings().log_scale);
        pipeline.set_scaling(ScalingStrategy::Sqrt);
        pipeline.set_use_average(false);
        assert_eq!(pipeline.settings().scaling, ScalingStrategy::Sqrt);
    }

    #[test]
    fn invalid_changes_keep_previous_configuration() {
        let ctx = SpectrumContext::new(44_100, 1, 4096).unwrap();
        let mut pipeline = SpectrumPipeline::new(&ctx, settings(50)).unwrap();
        let before = pipeline.mapping().clone();
        assert!(matches!(
            pipeline.set_resolution(1),
            Err(SpectrumError::InvalidConfiguration(_))
        ));
        assert!(pipeline.set_frequency_range(500.0, 100.0).is_err());
        assert_eq!(pipeline.mapping(), &before);
        assert_eq!(pipeline.settings().resolution, 50);
    }

    #[test]
    fn producer_thread_feeds_ticking_pipelines() {
        let ctx = SpectrumContext::new(44_100, 2, 512).unwrap();
        let mut a = SpectrumPipeline::new(&ctx, settings(24)).unwrap();
        let mut b = SpectrumPipeline::new(&ctx, settings(24)).unwrap();

        let producer = {
            let ctx = ctx.clone();
            std::thread::spawn(move || {
                let block = sine(440.0, 44_100, 256);
                for _ in 0..200 {
                    ctx.add_samples(&block);
                    std::thread::yield_now();
                }
            })
        };

        while !producer.is_finished() {
            for pipeline in [&mut a, &mut b] {
                if let Some(points) = pipeline.tick() {
                    assert_eq!(points.len(), 24);
                }
            }
        }
        producer.join().unwrap();

        ctx.add_samples(&[0.0, 0.0]);
        assert_eq!(a.tick().map(<[_]>::len), Some(24));
        assert_eq!(b.tick().map(<[_]>::len), Some(24));
    }

    #[test]
    fn poisoned_cache_keeps_serving() {
        let ctx = SpectrumContext::new(44_100, 1, 256).unwrap();
        let mut pipeline = SpectrumPipeline::new(&ctx, settings(8)).unwrap();

        let cache = ctx.cache().clone();
        let crashed = std::thread::spawn(move || {
            let _guard = cache.lock().unwrap();
            panic!("consumer failed while holding the cache");
        })
        .join();
        assert!(crashed.is_err());
        assert!(ctx.cache().is_poisoned());

        ctx.add_samples(&sine(1000.0, 44_100, 256));
        assert_eq!(pipeline.tick().map(<[_]>::len), Some(8));
        assert!(pipeline.tick().is_none());
    }

    #[test]
    fn construction_validates() {
        assert!(SpectrumContext::new(44_100, 1, 1000).is_err());
        assert!(SpectrumContext::new(44_100, 0, 1024).is_err());
        let ctx = SpectrumContext::new(44_100, 1, 1024).unwrap();
        assert!(SpectrumPipeline::new(&ctx, settings(1)).is_err());
    }
}
