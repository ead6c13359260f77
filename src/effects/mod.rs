//! Visual effects driven by spectrum points.
//!
//! Effects only produce geometry. Pixels are the host's business: it hands
//! a [`Surface`] to [`Effect::render`] and draws whatever arrives.

use std::time::Duration;

use crate::spectrum::SpectrumPoint;

mod line_plot;
mod terrain;

pub use line_plot::LinePlot;
pub use terrain::Terrain;

/// Vertex in effect space. 2D effects leave `z` at zero.
pub type Vertex = [f32; 3];

/// Drawing target provided by the renderer.
pub trait Surface {
    fn line_strip(&mut self, vertices: &[Vertex], opacity: f32);
}

pub trait Effect {
    /// Advances the effect with a freshly reduced frame.
    fn update(&mut self, dt: Duration, points: &[SpectrumPoint]);
    fn render(&self, surface: &mut dyn Surface);
}
