use std::time::Duration;

use crate::error::Result;
use crate::ring_buffer::RingBuffer;
use crate::spectrum::SpectrumPoint;

use super::{Effect, Surface, Vertex};

const OFFSET: f32 = 84.0;
const SCALE: f32 = 128.0;
const ALPHA: f32 = 0.35;

/// Fading trail of the last few spectrum lines.
///
/// Each line is centred on the midpoint of its frame's value range, so the
/// plot shows shape rather than loudness.
pub struct LinePlot {
    width: f32,
    lines: RingBuffer<Vec<Vertex>>,
}

impl LinePlot {
    pub fn new(num_lines: usize, width: f32) -> Result<Self> {
        Ok(Self {
            width,
            lines: RingBuffer::new(num_lines)?,
        })
    }

    pub fn num_lines(&self) -> usize {
        self.lines.capacity()
    }

    /// Newest line first.
    pub fn lines(&self) -> impl Iterator<Item = &[Vertex]> {
        self.lines.iter().map(Vec::as_slice)
    }
}

impl Effect for LinePlot {
    fn update(&mut self, _dt: Duration, points: &[SpectrumPoint]) {
        let silent = points.iter().all(|p| p.value == 0.0);
        let line = if silent || points.len() < 2 {
            Vec::new()
        } else {
            let (low, high) = points
                .iter()
                .fold((f64::MAX, f64::MIN), |(lo, hi), p| (lo.min(p.value), hi.max(p.value)));
            let mid = ((low + high) * 0.5) as f32;
            let last = (points.len() - 1) as f32;
            points
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    let x = i as f32 / last * self.width;
                    let y = OFFSET - (p.value as f32 - mid) * SCALE;
                    [x, y, 0.0]
                })
                .collect()
        };
        self.lines.add(line);
    }

    fn render(&self, surface: &mut dyn Surface) {
        let count = self.lines.capacity() as f32;
        for (age, line) in self.lines.iter().enumerate() {
            if line.len() < 2 {
                continue;
            }
            let opacity = ALPHA * (count - age as f32) / count;
            surface.line_strip(line, opacity);
        }
    }
}
