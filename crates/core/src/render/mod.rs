//! Renderer registry.
//!
//! One pure drawing function per visualization mode. Each maps a frequency
//! snapshot (plus, for the waveform mode, a fresh time-domain snapshot
//! pulled from the live analyzer) onto the surface. Renderers draw
//! synchronously within the tick, never cache surface dimensions, and
//! degrade to drawing nothing when the surface or the snapshot is empty.

use std::time::Duration;

use crate::analysis::{FrequencySnapshot, SpectralAnalyzer};
use crate::surface::{hsl, Rgba, Surface};

/// The closed set of visualization modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderMode {
    FrequencyBands,
    Waveform,
    Spectrum,
    CoolSphere,
    Psychadelic,
    Default,
}

impl RenderMode {
    pub const ALL: [Self; 6] = [
        Self::FrequencyBands,
        Self::Waveform,
        Self::Spectrum,
        Self::CoolSphere,
        Self::Psychadelic,
        Self::Default,
    ];

    /// The catalog id of this mode.
    pub fn id(self) -> &'static str {
        match self {
            Self::FrequencyBands => "frequency_bands",
            Self::Waveform => "waveform",
            Self::Spectrum => "spectrum",
            Self::CoolSphere => "cool_sphere",
            Self::Psychadelic => "psychadelic",
            Self::Default => "default",
        }
    }

    /// Resolves a catalog id. An unrecognized id maps to [`Self::Default`];
    /// this is the one silent fallback in the pipeline.
    pub fn from_id(id: &str) -> Self {
        match id {
            "frequency_bands" => Self::FrequencyBands,
            "waveform" => Self::Waveform,
            "spectrum" => Self::Spectrum,
            "cool_sphere" => Self::CoolSphere,
            "psychadelic" => Self::Psychadelic,
            _ => Self::Default,
        }
    }
}

/// Everything a renderer may consult for one frame.
pub struct FrameInput<'a> {
    /// This frame's frequency snapshot.
    pub frequency: &'a FrequencySnapshot,
    /// Live analyzer, for modes that pull a fresh time-domain snapshot.
    pub analyzer: &'a mut SpectralAnalyzer,
    /// Wall-clock time since the session started.
    pub elapsed: Duration,
    /// Session-owned random source; seed it to make output deterministic.
    pub rng: &'a mut fastrand::Rng,
}

/// Dispatches the renderer selected by `mode`.
pub fn render(mode: RenderMode, surface: &mut Surface, input: &mut FrameInput<'_>) {
    match mode {
        RenderMode::FrequencyBands => frequency_bands(surface, input),
        RenderMode::Waveform => waveform(surface, input),
        RenderMode::Spectrum => spectrum(surface, input),
        RenderMode::CoolSphere => cool_sphere(surface, input),
        RenderMode::Psychadelic => psychadelic(surface, input),
        RenderMode::Default => default_bars(surface, input),
    }
}

/// Wide bars, one per bin, with a gap and an uncapped 1.5x height.
fn frequency_bands(surface: &mut Surface, input: &mut FrameInput<'_>) {
    let dims = surface.dimensions();
    let samples = input.frequency.samples();
    if dims.is_empty() || samples.is_empty() {
        return;
    }
    let (w, h) = (dims.width as f32, dims.height as f32);
    let n = samples.len() as f32;
    let bar_width = w / n * 2.5;

    for (i, &sample) in samples.iter().enumerate() {
        let x = i as f32 * (bar_width + 1.0);
        // Heights run past the top of the surface on loud frames; the
        // surface clips them.
        let height = sample as f32 * 1.5;
        let t = i as f32 / n;
        let color = Rgba::rgb_clamped(50.0 + sample as f32 + t * 100.0, 50.0 + t * 200.0, 250.0);
        surface.fill_rect(x, h - height, bar_width, height, color);
    }
}

/// Green oscilloscope trace over a fresh time-domain snapshot.
fn waveform(surface: &mut Surface, input: &mut FrameInput<'_>) {
    let dims = surface.dimensions();
    if dims.is_empty() {
        return;
    }
    let snapshot = input.analyzer.waveform_snapshot();
    let samples = snapshot.samples();
    if samples.is_empty() {
        return;
    }
    let (w, h) = (dims.width as f32, dims.height as f32);
    let slice_width = w / samples.len() as f32;

    let mut points = Vec::with_capacity(samples.len() + 1);
    for (j, &sample) in samples.iter().enumerate() {
        let y = sample as f32 / 128.0 * h / 2.0;
        points.push((j as f32 * slice_width, y));
    }
    points.push((w, h / 2.0));
    surface.stroke_polyline(&points, 2.0, Rgba::rgb(0, 255, 0));
}

/// Narrow bars normalised to the surface height, hue swept over the bins.
fn spectrum(surface: &mut Surface, input: &mut FrameInput<'_>) {
    let dims = surface.dimensions();
    let samples = input.frequency.samples();
    if dims.is_empty() || samples.is_empty() {
        return;
    }
    let (w, h) = (dims.width as f32, dims.height as f32);
    let n = samples.len() as f32;
    let bar_width = w / n;

    for (i, &sample) in samples.iter().enumerate() {
        let height = sample as f32 / 255.0 * h;
        let hue = i as f32 / n * 360.0;
        surface.fill_rect(
            i as f32 * bar_width,
            h - height,
            bar_width,
            height,
            hsl(hue, 100.0, 50.0),
        );
    }
}

/// Five concentric circles pulsing with the mean magnitude.
fn cool_sphere(surface: &mut Surface, input: &mut FrameInput<'_>) {
    let dims = surface.dimensions();
    let samples = input.frequency.samples();
    if dims.is_empty() || samples.is_empty() {
        return;
    }
    let (w, h) = (dims.width as f32, dims.height as f32);
    let avg = samples.iter().map(|&s| s as f32).sum::<f32>() / samples.len() as f32;

    let (cx, cy) = (w / 2.0, h / 2.0);
    let base_radius = w.min(h) / 4.0;
    let pulse = 0.5 + avg / 255.0 * 0.5;
    let stroke = 2.0 + avg / 255.0 * 3.0;
    let time_ms = input.elapsed.as_secs_f64() * 1000.0;

    for j in 0..5u32 {
        let radius = base_radius * pulse * (5 - j) as f32 / 5.0;
        let hue = ((j as f64 * 30.0 + time_ms / 50.0) % 360.0) as f32;
        surface.stroke_circle(cx, cy, radius, stroke, hsl(hue, 80.0, 60.0));
    }
}

/// Rotating radial gradient; strong treble scatters translucent bursts.
fn psychadelic(surface: &mut Surface, input: &mut FrameInput<'_>) {
    let dims = surface.dimensions();
    let samples = input.frequency.samples();
    if dims.is_empty() || samples.is_empty() {
        return;
    }
    let (w, h) = (dims.width as f32, dims.height as f32);
    let n = samples.len();
    let band = |frac: f64| {
        let index = ((n as f64 * frac) as usize).min(n - 1);
        samples[index] as f32 / 255.0
    };
    let bass = band(0.1);
    let mid = band(0.5);
    let treble = band(0.8);

    let time_s = input.elapsed.as_secs_f64();
    let stops: Vec<(f32, Rgba)> = (0..6u32)
        .map(|i| {
            let hue = ((time_s * 20.0 + i as f64 * 60.0) % 360.0) as f32;
            (
                i as f32 / 5.0,
                hsl(hue, 70.0 + mid * 30.0, 40.0 + bass * 30.0),
            )
        })
        .collect();
    surface.fill_radial_gradient(w / 2.0, h / 2.0, w / 2.0, &stops);

    if treble > 0.5 {
        let bursts = 5 + (treble * 10.0) as u32;
        for _ in 0..bursts {
            let x = input.rng.f32() * w;
            let y = input.rng.f32() * h;
            let size = 5.0 + input.rng.f32() * 20.0 * treble;
            let hue = input.rng.f32() * 360.0;
            surface.fill_circle(x, y, size, hsl(hue, 100.0, 70.0).with_alpha(179));
        }
    }
}

/// Plain gapless bars in a flat blue ramp; the fallback mode.
fn default_bars(surface: &mut Surface, input: &mut FrameInput<'_>) {
    let dims = surface.dimensions();
    let samples = input.frequency.samples();
    if dims.is_empty() || samples.is_empty() {
        return;
    }
    let (w, h) = (dims.width as f32, dims.height as f32);
    let bar_width = w / samples.len() as f32;

    for (i, &sample) in samples.iter().enumerate() {
        let height = sample as f32 * 1.5;
        let color = Rgba::rgb_clamped(50.0, 100.0, height + 100.0);
        surface.fill_rect(i as f32 * bar_width, h - height, bar_width, height, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::SampleRing;
    use crate::config::AnalyzerConfig;
    use crate::surface::SurfaceDimensions;

    fn test_analyzer(bins: usize) -> SpectralAnalyzer {
        let config = AnalyzerConfig {
            bin_count: bins,
            ..Default::default()
        };
        SpectralAnalyzer::over_ring(SampleRing::new(bins * 4), config).unwrap()
    }

    fn draw(mode: RenderMode, surface: &mut Surface, bins: Vec<u8>, elapsed: Duration, seed: u64) {
        let frequency = FrequencySnapshot::new(bins);
        let mut analyzer = test_analyzer(64);
        let mut rng = fastrand::Rng::with_seed(seed);
        let mut input = FrameInput {
            frequency: &frequency,
            analyzer: &mut analyzer,
            elapsed,
            rng: &mut rng,
        };
        render(mode, surface, &mut input);
    }

    fn lit_pixels(surface: &Surface) -> usize {
        surface
            .data()
            .chunks_exact(4)
            .filter(|px| px[0] != 0 || px[1] != 0 || px[2] != 0)
            .count()
    }

    #[test]
    fn unknown_ids_fall_back_to_default() {
        assert_eq!(RenderMode::from_id("frequency_bands"), RenderMode::FrequencyBands);
        assert_eq!(RenderMode::from_id("cool_sphere"), RenderMode::CoolSphere);
        assert_eq!(RenderMode::from_id("not-a-mode"), RenderMode::Default);
        assert_eq!(RenderMode::from_id(""), RenderMode::Default);
    }

    #[test]
    fn ids_round_trip_for_every_mode() {
        for mode in RenderMode::ALL {
            assert_eq!(RenderMode::from_id(mode.id()), mode);
        }
    }

    #[test]
    fn silent_bins_draw_no_bars() {
        for mode in [RenderMode::FrequencyBands, RenderMode::Spectrum, RenderMode::Default] {
            let mut surface = Surface::new(SurfaceDimensions::new(64, 64));
            surface.clear(Rgba::BLACK);
            draw(mode, &mut surface, vec![0; 16], Duration::ZERO, 1);
            assert_eq!(lit_pixels(&surface), 0, "{mode:?} drew on silence");
        }
    }

    #[test]
    fn frequency_bands_height_follows_the_formula() {
        // One bin over a 10x100 surface: bar height = 40 * 1.5 = 60.
        let mut surface = Surface::new(SurfaceDimensions::new(10, 100));
        surface.clear(Rgba::BLACK);
        draw(RenderMode::FrequencyBands, &mut surface, vec![40], Duration::ZERO, 1);
        assert_eq!(surface.pixel(0, 39).unwrap(), Rgba::BLACK);
        assert_ne!(surface.pixel(0, 40).unwrap(), Rgba::BLACK);
        assert_ne!(surface.pixel(0, 99).unwrap(), Rgba::BLACK);
    }

    #[test]
    fn frequency_bands_height_is_uncapped() {
        // 255 * 1.5 = 382.5 overflows a 100px surface; the full column fills.
        let mut surface = Surface::new(SurfaceDimensions::new(10, 100));
        surface.clear(Rgba::BLACK);
        draw(RenderMode::FrequencyBands, &mut surface, vec![255], Duration::ZERO, 1);
        for y in 0..100 {
            assert_ne!(surface.pixel(0, y).unwrap(), Rgba::BLACK, "row {y} unfilled");
        }
        // Bin 0 at full amplitude: r = 50+255+0 saturates, g = 50, b = 250.
        assert_eq!(surface.pixel(0, 50).unwrap(), Rgba::rgb(255, 50, 250));
    }

    #[test]
    fn spectrum_height_is_normalised_to_the_surface() {
        let mut surface = Surface::new(SurfaceDimensions::new(10, 100));
        surface.clear(Rgba::BLACK);
        draw(RenderMode::Spectrum, &mut surface, vec![128], Duration::ZERO, 1);
        // height = 128/255 * 100 = 50.2 -> bar spans rows 49..100.
        assert_eq!(surface.pixel(0, 48).unwrap(), Rgba::BLACK);
        assert_ne!(surface.pixel(0, 50).unwrap(), Rgba::BLACK);
        assert_ne!(surface.pixel(0, 99).unwrap(), Rgba::BLACK);

        let mut full = Surface::new(SurfaceDimensions::new(10, 100));
        full.clear(Rgba::BLACK);
        draw(RenderMode::Spectrum, &mut full, vec![255], Duration::ZERO, 1);
        // Capped exactly at the surface height: hue 0 at bin 0 is pure red.
        assert_eq!(full.pixel(0, 0).unwrap(), Rgba::rgb(255, 0, 0));
    }

    #[test]
    fn default_bars_are_gapless_and_flat_colored() {
        let mut surface = Surface::new(SurfaceDimensions::new(8, 100));
        surface.clear(Rgba::BLACK);
        draw(RenderMode::Default, &mut surface, vec![40, 40], Duration::ZERO, 1);
        // Two bins over 8 px: bars at x 0..4 and 4..8, no gap between them.
        let expected = Rgba::rgb(50, 100, 160);
        for x in 0..8 {
            assert_eq!(surface.pixel(x, 99).unwrap(), expected, "column {x}");
        }
        assert_eq!(surface.pixel(0, 39).unwrap(), Rgba::BLACK);
    }

    #[test]
    fn cool_sphere_radii_match_the_formula() {
        let mut surface = Surface::new(SurfaceDimensions::new(200, 200));
        surface.clear(Rgba::BLACK);
        draw(
            RenderMode::CoolSphere,
            &mut surface,
            vec![128; 1024],
            Duration::ZERO,
            1,
        );

        let base_radius = 200.0f32 / 4.0;
        let pulse = 0.5 + 128.0 / 255.0 * 0.5;
        for j in 0..5u32 {
            let radius = base_radius * pulse * (5 - j) as f32 / 5.0;
            let x = (100.0 + radius) as u32;
            assert_ne!(
                surface.pixel(x, 100).unwrap(),
                Rgba::BLACK,
                "circle {j} missing at radius {radius}"
            );
        }
        // Between the two outermost rings nothing is drawn.
        assert_eq!(surface.pixel(125, 100).unwrap(), Rgba::BLACK);
        // Outside the largest ring nothing is drawn.
        assert_eq!(surface.pixel(160, 100).unwrap(), Rgba::BLACK);
    }

    #[test]
    fn waveform_silence_is_a_flat_midline() {
        let mut surface = Surface::new(SurfaceDimensions::new(120, 100));
        surface.clear(Rgba::BLACK);
        // The analyzer's ring is empty, so the snapshot is all 128s.
        draw(RenderMode::Waveform, &mut surface, vec![0; 16], Duration::ZERO, 1);

        for x in 0..120 {
            let lit: Vec<u32> = (0..100)
                .filter(|&y| surface.pixel(x, y).unwrap() != Rgba::BLACK)
                .collect();
            assert!(!lit.is_empty(), "column {x} empty");
            assert!(
                lit.iter().all(|&y| (48..=52).contains(&y)),
                "column {x} strays from the midline: {lit:?}"
            );
        }
        assert_eq!(surface.pixel(60, 50).unwrap(), Rgba::rgb(0, 255, 0));
    }

    #[test]
    fn psychadelic_is_deterministic_under_a_seed() {
        let bins = vec![200u8; 64];
        let mut first = Surface::new(SurfaceDimensions::new(64, 64));
        let mut second = Surface::new(SurfaceDimensions::new(64, 64));
        draw(RenderMode::Psychadelic, &mut first, bins.clone(), Duration::from_secs(3), 7);
        draw(RenderMode::Psychadelic, &mut second, bins, Duration::from_secs(3), 7);
        assert_eq!(first.data(), second.data());
    }

    #[test]
    fn psychadelic_quiet_treble_skips_the_bursts() {
        let bins = vec![60u8; 64];
        let mut with_one_seed = Surface::new(SurfaceDimensions::new(64, 64));
        let mut with_another = Surface::new(SurfaceDimensions::new(64, 64));
        draw(RenderMode::Psychadelic, &mut with_one_seed, bins.clone(), Duration::ZERO, 1);
        draw(RenderMode::Psychadelic, &mut with_another, bins, Duration::ZERO, 99);
        // No randomness reaches the output below the treble threshold.
        assert_eq!(with_one_seed.data(), with_another.data());
        assert!(lit_pixels(&with_one_seed) > 0);
    }

    #[test]
    fn renderers_are_total_over_degenerate_input() {
        for mode in RenderMode::ALL {
            let mut empty_surface = Surface::new(SurfaceDimensions::new(0, 0));
            draw(mode, &mut empty_surface, vec![1; 8], Duration::ZERO, 1);

            let mut empty_bins = Surface::new(SurfaceDimensions::new(16, 16));
            empty_bins.clear(Rgba::BLACK);
            draw(mode, &mut empty_bins, Vec::new(), Duration::ZERO, 1);
        }
    }
}
