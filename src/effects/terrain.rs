use std::time::Duration;

use crate::error::{invalid, Result};
use crate::ring_buffer::RingBuffer;
use crate::spectrum::SpectrumPoint;

use super::{Effect, Surface, Vertex};

const OFFSET: f32 = -30.0;
const RANGE: f32 = 60.0;
const SPAN: f32 = 26.0;
const WAVE_SCALE: f32 = 75.0;
const LANE_SCALE: f32 = 3.0;
const LANE_WIDTH: usize = 5;

/// Scrolling height field built from successive spectrum frames.
///
/// The middle `LANE_WIDTH` columns form a flat lane; the outer columns rise
/// towards the edges. Rows move towards the viewer at `speed` units per
/// second and a new row is emitted every `RANGE / rows` units.
pub struct Terrain {
    columns: usize,
    speed: f32,
    segment: f32,
    lane_start: usize,
    lane_end: usize,
    rows: RingBuffer<Vec<f32>>,
    scaled: Vec<f32>,
    z_offset: f32,
}

impl Terrain {
    pub fn new(rows: usize, columns: usize, speed: f32) -> Result<Self> {
        if columns < 2 {
            return Err(invalid("terrain needs at least two columns"));
        }
        if !speed.is_finite() || speed < 0.0 {
            return Err(invalid(format!("terrain speed must be non-negative, got {}", speed)));
        }
        let lane_start = columns.saturating_sub(LANE_WIDTH) / 2;
        let lane_end = ((columns + LANE_WIDTH) / 2).min(columns);
        Ok(Self {
            columns,
            speed,
            segment: RANGE / rows.max(1) as f32,
            lane_start,
            lane_end,
            rows: RingBuffer::with_value(rows, vec![0.0; columns])?,
            scaled: vec![0.0; columns],
            z_offset: 0.0,
        })
    }

    pub fn z_offset(&self) -> f32 {
        self.z_offset
    }

    /// Row heights, newest first.
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.rows.iter().map(Vec::as_slice)
    }

    fn process(&mut self, values: &[f64], scale: f32, start: usize, end: usize) {
        if start >= end {
            return;
        }
        let range = &values[start..end];
        let low = range.iter().copied().fold(f64::MAX, f64::min);
        let average = range.iter().sum::<f64>() / range.len() as f64;
        for (slot, &v) in self.scaled[start..end].iter_mut().zip(range) {
            *slot = ((v - low) * average) as f32 * scale;
        }

        // tilt the range so both ends meet the same level
        let tilt = (self.scaled[end - 1] + self.scaled[start]) * 0.5;
        let width = (end - start) as f32;
        for i in start..end {
            let t = (i - start) as f32 / width;
            self.scaled[i] += tilt * (-1.0 + 2.0 * t);
        }
    }

    /// Rows emitted for the current `z_offset` and the offset left over.
    ///
    /// A scroll that lands exactly on a row boundary keeps one full segment
    /// pending, so the remainder lies in `[0, segment]`.
    fn crossed_segments(&self) -> (usize, f32) {
        if !self.z_offset.is_finite() {
            return (usize::MAX, 0.0);
        }
        let z = f64::from(self.z_offset);
        let segment = f64::from(self.segment);
        let crossed = ((z / segment).ceil() - 1.0).max(1.0);
        let remainder = (z - crossed * segment).clamp(0.0, segment);
        (crossed as usize, remainder as f32)
    }

    fn vertex(&self, row: usize, column: usize, height: f32) -> Vertex {
        let x = SPAN * -0.5 + column as f32 * (SPAN / (self.columns - 1) as f32);
        let z = OFFSET + row as f32 * self.segment + self.z_offset;
        [x, height, z]
    }
}

impl Effect for Terrain {
    fn update(&mut self, dt: Duration, points: &[SpectrumPoint]) {
        let values: Vec<f64> = (0..self.columns)
            .map(|i| points.get(i).map_or(0.0, |p| p.value))
            .collect();

        let (lane_start, lane_end, columns) = (self.lane_start, self.lane_end, self.columns);
        self.process(&values, WAVE_SCALE, 0, lane_start);
        self.process(&values, LANE_SCALE, lane_start, lane_end);
        self.process(&values, WAVE_SCALE, lane_end, columns);

        for i in 0..lane_start {
            self.scaled[i] *= (lane_start - i) as f32 / lane_start as f32;
        }
        for i in lane_end..columns {
            self.scaled[i] *= (i - lane_end) as f32 / (columns - lane_end) as f32;
        }

        self.z_offset += dt.as_secs_f32() * self.speed;
        if self.z_offset > self.segment {
            let (crossed, remainder) = self.crossed_segments();
            self.z_offset = remainder;
            // older rows would be evicted within this same update
            for _ in 0..crossed.min(self.rows.capacity()) {
                self.rows.add(self.scaled.clone());
            }
        }
    }

    fn render(&self, surface: &mut dyn Surface) {
        let mut columns: Vec<Vec<Vertex>> =
            vec![Vec::with_capacity(self.rows.capacity()); self.columns];

        for (r, heights) in self.rows.iter().enumerate() {
            let strip: Vec<Vertex> = heights
                .iter()
                .enumerate()
                .map(|(c, &h)| self.vertex(r, c, h))
                .collect();
            for (column, &v) in columns.iter_mut().zip(&strip) {
                column.push(v);
            }
            surface.line_strip(&strip, 1.0);
        }

        for column in &columns {
            if column.len() >= 2 {
                surface.line_strip(column, 1.0);
            }
        }
    }
}
