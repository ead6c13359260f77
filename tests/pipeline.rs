use std::time::Duration;

use specviz::audio::{ConsumerToken, FftProvider};
use specviz::effects::{Effect, LinePlot, Surface, Terrain, Vertex};
use specviz::spectrum::{
    reduce, FrequencyMapper, ReduceOptions, ScalingStrategy, SpectrumContext, SpectrumPipeline,
    SpectrumPoint, SpectrumSettings,
};

const IMPULSE_BIN: usize = 50;

fn reference_settings() -> SpectrumSettings {
    SpectrumSettings {
        min_frequency: 20.0,
        max_frequency: 20_000.0,
        resolution: 500,
        log_scale: true,
        scaling: ScalingStrategy::Decibel,
        use_average: true,
        amplitude_ceiling: 1.0,
    }
}

fn impulse(fft_size: usize) -> Vec<f32> {
    let mut buffer = vec![0.0f32; fft_size / 2];
    buffer[IMPULSE_BIN] = 1.0;
    buffer
}

fn non_zero(points: &[SpectrumPoint]) -> Vec<usize> {
    points
        .iter()
        .filter(|p| p.value != 0.0)
        .map(|p| p.index)
        .collect()
}

/// First point whose bucket holds the impulse, and the last point sharing
/// its boundary.
fn impulse_points(bounds: &[usize]) -> (usize, usize) {
    let first = bounds.iter().position(|&b| b >= IMPULSE_BIN).unwrap();
    let last = first + bounds[first..].iter().take_while(|&&b| b == bounds[first]).count() - 1;
    (first, last)
}

#[test]
fn impulse_lights_one_neighbourhood() {
    let settings = reference_settings();
    let mapper = FrequencyMapper::new(44_100, 4096).unwrap();
    let mapping = mapper.map(&settings).unwrap();
    let buffer = impulse(4096);

    let (first, last) = impulse_points(mapping.log_bounds());

    let plain = reduce(
        &buffer,
        &mapping,
        &ReduceOptions {
            use_average: false,
            ..ReduceOptions::from(&settings)
        },
    );
    assert_eq!(plain.len(), 500);
    assert_eq!(non_zero(&plain), (first..=last).collect::<Vec<_>>());
    assert!(plain[first..=last].iter().all(|p| (p.value - 1.0).abs() < 1e-9));

    let averaged = reduce(&buffer, &mapping, &ReduceOptions::from(&settings));
    assert_eq!(averaged.len(), 500);
    let lit = non_zero(&averaged);
    assert_eq!(lit.first(), Some(&first));
    assert_eq!(lit.last(), Some(&(last + 1)));
    assert!(lit.windows(2).all(|w| w[1] == w[0] + 1));
    assert!((averaged[first].value - 0.5).abs() < 1e-9);
    assert!((averaged[last + 1].value - 0.5).abs() < 1e-9);
    assert!(averaged.iter().all(|p| (0.0..=1.0).contains(&p.value)));
}

/// Returns the same impulse spectrum for every window.
struct ImpulseProvider {
    size: usize,
}

impl FftProvider for ImpulseProvider {
    fn fft_size(&self) -> usize {
        self.size
    }

    fn compute_magnitudes(&mut self, _window: &[f32], out: &mut [f32]) {
        out.fill(0.0);
        out[IMPULSE_BIN] = 1.0;
    }
}

#[test]
fn pipeline_matches_direct_reduction() {
    let context =
        SpectrumContext::with_provider(Box::new(ImpulseProvider { size: 4096 }), 2, 44_100)
            .unwrap();
    let mut pipeline = SpectrumPipeline::new(&context, reference_settings()).unwrap();

    context.add_samples(&[0.0; 256]);
    let from_pipeline = pipeline.tick().unwrap().to_vec();
    let direct = reduce(
        &impulse(4096),
        pipeline.mapping(),
        &ReduceOptions::from(pipeline.settings()),
    );
    assert_eq!(from_pipeline, direct);
    assert!(pipeline.tick().is_none());
}

#[test]
fn effects_share_one_frame_per_tick() {
    let context = SpectrumContext::new(48_000, 1, 2048).unwrap();
    let settings = SpectrumSettings {
        resolution: 64,
        ..SpectrumSettings::default()
    };
    let mut plot_pipeline = SpectrumPipeline::new(&context, settings.clone()).unwrap();
    let mut terrain_pipeline = SpectrumPipeline::new(&context, settings).unwrap();
    let mut plot = LinePlot::new(4, 640.0).unwrap();
    let mut terrain = Terrain::new(8, 64, 120.0).unwrap();
    let dt = Duration::from_millis(16);

    for step in 0..3 {
        let tone: Vec<f32> = (0..800)
            .map(|i| (0.05 * (i + step * 800) as f32).sin() * 0.5)
            .collect();
        context.add_samples(&tone);
        assert!(plot_pipeline.tick_effect(&mut plot, dt));
        assert!(terrain_pipeline.tick_effect(&mut terrain, dt));
        assert!(!plot_pipeline.tick_effect(&mut plot, dt));
        assert!(!terrain_pipeline.tick_effect(&mut terrain, dt));
    }
    assert_eq!(plot_pipeline.points(), terrain_pipeline.points());

    struct Count(usize);
    impl Surface for Count {
        fn line_strip(&mut self, _vertices: &[Vertex], _opacity: f32) {
            self.0 += 1;
        }
    }
    let mut surface = Count(0);
    plot.render(&mut surface);
    assert_eq!(surface.0, 3);
}

#[test]
fn tokens_outside_pipelines_read_the_cache_directly() {
    let context = SpectrumContext::new(44_100, 1, 512).unwrap();
    let a = ConsumerToken::new();
    let b = ConsumerToken::new();
    let mut frame_a = Vec::new();
    let mut frame_b = Vec::new();

    context.add_samples(&[0.25; 512]);
    {
        let mut cache = context.cache().lock().unwrap();
        assert!(cache.try_get_frame(a, &mut frame_a));
        assert!(cache.try_get_frame(b, &mut frame_b));
        assert!(!cache.try_get_frame(a, &mut frame_a));
        assert!(!cache.try_get_frame(b, &mut frame_b));
    }
    assert_eq!(frame_a, frame_b);
    assert_eq!(frame_a.len(), 256);

    context.add_samples(&[0.5]);
    let mut cache = context.cache().lock().unwrap();
    assert!(cache.try_get_frame(a, &mut frame_a));
    assert!(cache.try_get_frame(b, &mut frame_b));
}
