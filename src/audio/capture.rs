//! Live capture from the default input device.
//!
//! The device callback is the only producer of samples: it pushes every
//! delivered block into the shared frame cache.

use anyhow::{anyhow, bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SizedSample, StreamConfig};

use super::frame_cache::{lock, SharedFrameCache};

pub struct LiveCapture {
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
    stream: Option<cpal::Stream>,
}

impl LiveCapture {
    /// Opens the default input device with its default configuration.
    pub fn open_default() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| anyhow!("No default input device found"))?;

        let supported = device
            .default_input_config()
            .context("Failed to query input configuration")?;
        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.into();

        log::info!(
            "Capture: {} @ {}Hz, {} channel(s), {:?}",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            config.sample_rate.0,
            config.channels,
            sample_format
        );

        Ok(Self {
            device,
            config,
            sample_format,
            stream: None,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    pub fn channels(&self) -> usize {
        self.config.channels as usize
    }

    /// Starts streaming interleaved samples into `cache`.
    pub fn start(&mut self, cache: SharedFrameCache) -> Result<()> {
        let stream = match self.sample_format {
            SampleFormat::F32 => self.build_stream::<f32>(cache)?,
            SampleFormat::I16 => self.build_stream::<i16>(cache)?,
            SampleFormat::U16 => self.build_stream::<u16>(cache)?,
            SampleFormat::I32 => self.build_stream::<i32>(cache)?,
            other => bail!("Unsupported input sample format: {:?}", other),
        };
        stream.play().context("Failed to start input stream")?;
        self.stream = Some(stream);
        Ok(())
    }

    /// Stops capturing; dropping the stream releases the device.
    pub fn stop(&mut self) {
        if self.stream.take().is_some() {
            log::info!("Capture stopped");
        }
    }

    fn build_stream<T>(&self, cache: SharedFrameCache) -> Result<cpal::Stream>
    where
        T: SizedSample + Send + 'static,
        f32: cpal::FromSample<T>,
    {
        let mut converted: Vec<f32> = Vec::new();
        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[T], _: &cpal::InputCallbackInfo| {
                    converted.clear();
                    converted.extend(data.iter().map(|&s| cpal::Sample::to_sample::<f32>(s)));
                    lock(&cache).add_samples(&converted);
                },
                |err| log::warn!("Input stream error: {}", err),
                None,
            )
            .context("Failed to build input stream")?;
        Ok(stream)
    }
}

impl Drop for LiveCapture {
    fn drop(&mut self) {
        self.stop();
    }
}
