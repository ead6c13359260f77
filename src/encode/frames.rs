use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::spectrum::SpectrumPoint;

/// One JSON line per reduced frame.
#[derive(Serialize)]
struct FrameRecord {
    frame: u64,
    time: f64,
    points: Vec<f64>,
}

/// Streams spectrum frames as JSON lines to a file or stdout.
pub struct FrameWriter {
    out: Box<dyn Write>,
    frames: u64,
}

impl FrameWriter {
    pub fn create(path: Option<&Path>) -> Result<Self> {
        let out: Box<dyn Write> = match path {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("Failed to create output file: {}", path.display()))?;
                log::info!("Writing frames to {}", path.display());
                Box::new(BufWriter::new(file))
            }
            None => Box::new(BufWriter::new(std::io::stdout())),
        };
        Ok(Self::from_writer(out))
    }

    pub fn from_writer(out: Box<dyn Write>) -> Self {
        Self { out, frames: 0 }
    }

    pub fn write_frame(&mut self, frame: u64, time: f64, points: &[SpectrumPoint]) -> Result<()> {
        let record = FrameRecord {
            frame,
            time,
            points: points.iter().map(|p| p.value).collect(),
        };
        serde_json::to_writer(&mut self.out, &record).context("Failed to serialize frame")?;
        self.out.write_all(b"\n").context("Failed to write frame")?;
        self.frames += 1;
        Ok(())
    }

    pub fn frames_written(&self) -> u64 {
        self.frames
    }

    pub fn finish(mut self) -> Result<u64> {
        self.out.flush().context("Failed to flush output")?;
        log::info!("Wrote {} frames", self.frames);
        Ok(self.frames)
    }
}
