//! Software drawing surface.
//!
//! The surface is a plain RGBA8 framebuffer that the renderers draw into
//! once per tick. Primitives clip to the current bounds and tolerate
//! degenerate geometry, so renderers stay total over resizes down to zero.

/// Size of the drawable area in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceDimensions {
    pub width: u32,
    pub height: u32,
}

impl SurfaceDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// An RGBA color. Alpha below 255 blends source-over when drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Builds an opaque color from unclamped channel values, saturating the
    /// way a canvas `rgb(...)` string does.
    pub fn rgb_clamped(r: f32, g: f32, b: f32) -> Self {
        Self::rgb(clamp_channel(r), clamp_channel(g), clamp_channel(b))
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self {
            r: self.r,
            g: self.g,
            b: self.b,
            a,
        }
    }
}

fn clamp_channel(value: f32) -> u8 {
    value.clamp(0.0, 255.0) as u8
}

/// Converts hue (degrees, any value), saturation and lightness (percent) to
/// an opaque RGB color.
pub fn hsl(hue: f32, saturation: f32, lightness: f32) -> Rgba {
    let h = hue.rem_euclid(360.0);
    let s = (saturation / 100.0).clamp(0.0, 1.0);
    let l = (lightness / 100.0).clamp(0.0, 1.0);

    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let hp = h / 60.0;
    let x = c * (1.0 - (hp.rem_euclid(2.0) - 1.0).abs());
    let (r1, g1, b1) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    Rgba::rgb(
        ((r1 + m) * 255.0).round() as u8,
        ((g1 + m) * 255.0).round() as u8,
        ((b1 + m) * 255.0).round() as u8,
    )
}

/// Owned framebuffer with a clear/draw/present cycle per tick.
///
/// Pixels are row-major RGBA8. A resize reallocates and clears; the next
/// tick draws at the new size.
#[derive(Debug, Clone)]
pub struct Surface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Surface {
    pub fn new(dimensions: SurfaceDimensions) -> Self {
        let len = dimensions.width as usize * dimensions.height as usize * 4;
        Self {
            width: dimensions.width,
            height: dimensions.height,
            pixels: vec![0; len],
        }
    }

    pub fn dimensions(&self) -> SurfaceDimensions {
        SurfaceDimensions::new(self.width, self.height)
    }

    /// Raw RGBA8 pixel data, row-major.
    pub fn data(&self) -> &[u8] {
        &self.pixels
    }

    pub fn resize(&mut self, dimensions: SurfaceDimensions) {
        self.width = dimensions.width;
        self.height = dimensions.height;
        let len = self.width as usize * self.height as usize * 4;
        self.pixels.clear();
        self.pixels.resize(len, 0);
    }

    pub fn clear(&mut self, color: Rgba) {
        for px in self.pixels.chunks_exact_mut(4) {
            px[0] = color.r;
            px[1] = color.g;
            px[2] = color.b;
            px[3] = 255;
        }
    }

    /// Reads back one pixel; `None` outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some(Rgba::rgba(
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ))
    }

    fn put_pixel(&mut self, x: i64, y: i64, color: Rgba) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        if color.a == 255 {
            self.pixels[i] = color.r;
            self.pixels[i + 1] = color.g;
            self.pixels[i + 2] = color.b;
        } else {
            let t = color.a as f32 / 255.0;
            self.pixels[i] = lerp_u8(self.pixels[i], color.r, t);
            self.pixels[i + 1] = lerp_u8(self.pixels[i + 1], color.g, t);
            self.pixels[i + 2] = lerp_u8(self.pixels[i + 2], color.b, t);
        }
        self.pixels[i + 3] = 255;
    }

    /// Fills an axis-aligned rectangle, clipped to the surface.
    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgba) {
        if w <= 0.0 || h <= 0.0 {
            return;
        }
        let x0 = (x.floor() as i64).max(0);
        let y0 = (y.floor() as i64).max(0);
        let x1 = ((x + w).ceil() as i64).min(self.width as i64);
        let y1 = ((y + h).ceil() as i64).min(self.height as i64);
        for py in y0..y1 {
            for px in x0..x1 {
                self.put_pixel(px, py, color);
            }
        }
    }

    /// Fills a disc, honoring the color's alpha.
    pub fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, color: Rgba) {
        if radius <= 0.0 {
            return;
        }
        let x0 = ((cx - radius).floor() as i64).max(0);
        let y0 = ((cy - radius).floor() as i64).max(0);
        let x1 = ((cx + radius).ceil() as i64).min(self.width as i64);
        let y1 = ((cy + radius).ceil() as i64).min(self.height as i64);
        let r2 = radius * radius;
        for py in y0..y1 {
            for px in x0..x1 {
                let dx = px as f32 + 0.5 - cx;
                let dy = py as f32 + 0.5 - cy;
                if dx * dx + dy * dy <= r2 {
                    self.put_pixel(px, py, color);
                }
            }
        }
    }

    /// Strokes an unfilled circle outline of the given stroke width.
    pub fn stroke_circle(&mut self, cx: f32, cy: f32, radius: f32, stroke: f32, color: Rgba) {
        if radius <= 0.0 || stroke <= 0.0 {
            return;
        }
        let half = stroke / 2.0;
        let outer = radius + half;
        let x0 = ((cx - outer).floor() as i64).max(0);
        let y0 = ((cy - outer).floor() as i64).max(0);
        let x1 = ((cx + outer).ceil() as i64).min(self.width as i64);
        let y1 = ((cy + outer).ceil() as i64).min(self.height as i64);
        for py in y0..y1 {
            for px in x0..x1 {
                let dx = px as f32 + 0.5 - cx;
                let dy = py as f32 + 0.5 - cy;
                let d = (dx * dx + dy * dy).sqrt();
                if (d - radius).abs() <= half {
                    self.put_pixel(px, py, color);
                }
            }
        }
    }

    /// Strokes a connected polyline of the given line width.
    pub fn stroke_polyline(&mut self, points: &[(f32, f32)], width: f32, color: Rgba) {
        if points.len() < 2 || width <= 0.0 {
            return;
        }
        for pair in points.windows(2) {
            self.stroke_segment(pair[0], pair[1], width, color);
        }
    }

    fn stroke_segment(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: Rgba) {
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let len = (dx * dx + dy * dy).sqrt();
        let radius = (width / 2.0).max(0.5);
        // Stamp discs at sub-pixel steps along the segment.
        let steps = (len / 0.5).ceil().max(1.0) as u32;
        for step in 0..=steps {
            let t = step as f32 / steps as f32;
            self.fill_circle(from.0 + dx * t, from.1 + dy * t, radius, color);
        }
    }

    /// Fills the whole surface with a radial gradient centered at
    /// (`cx`, `cy`). `stops` are (position in [0, 1], color) pairs ordered by
    /// position; pixels beyond `radius` take the last stop's color.
    pub fn fill_radial_gradient(&mut self, cx: f32, cy: f32, radius: f32, stops: &[(f32, Rgba)]) {
        if stops.is_empty() {
            return;
        }
        let radius = radius.max(f32::EPSILON);
        for py in 0..self.height as i64 {
            for px in 0..self.width as i64 {
                let dx = px as f32 + 0.5 - cx;
                let dy = py as f32 + 0.5 - cy;
                let t = ((dx * dx + dy * dy).sqrt() / radius).clamp(0.0, 1.0);
                self.put_pixel(px, py, sample_stops(stops, t));
            }
        }
    }
}

fn sample_stops(stops: &[(f32, Rgba)], t: f32) -> Rgba {
    let first = stops[0];
    if t <= first.0 {
        return first.1;
    }
    for pair in stops.windows(2) {
        let (p0, c0) = pair[0];
        let (p1, c1) = pair[1];
        if t <= p1 {
            let span = (p1 - p0).max(f32::EPSILON);
            let local = (t - p0) / span;
            return Rgba::rgb(
                lerp_u8(c0.r, c1.r, local),
                lerp_u8(c0.g, c1.g, local),
                lerp_u8(c0.b, c1.b, local),
            );
        }
    }
    stops[stops.len() - 1].1
}

fn lerp_u8(a: u8, b: u8, t: f32) -> u8 {
    (a as f32 + (b as f32 - a as f32) * t.clamp(0.0, 1.0)).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_fills_every_pixel() {
        let mut surface = Surface::new(SurfaceDimensions::new(4, 3));
        surface.clear(Rgba::rgb(10, 20, 30));
        for y in 0..3 {
            for x in 0..4 {
                assert_eq!(surface.pixel(x, y).unwrap(), Rgba::rgb(10, 20, 30));
            }
        }
    }

    #[test]
    fn fill_rect_clips_to_bounds() {
        let mut surface = Surface::new(SurfaceDimensions::new(10, 10));
        surface.fill_rect(-5.0, -5.0, 8.0, 8.0, Rgba::rgb(255, 0, 0));
        assert_eq!(surface.pixel(0, 0).unwrap(), Rgba::rgb(255, 0, 0));
        assert_eq!(surface.pixel(2, 2).unwrap(), Rgba::rgb(255, 0, 0));
        assert_eq!(surface.pixel(3, 3).unwrap(), Rgba::BLACK);
    }

    #[test]
    fn drawing_on_an_empty_surface_is_a_no_op() {
        let mut surface = Surface::new(SurfaceDimensions::new(0, 0));
        surface.clear(Rgba::rgb(1, 2, 3));
        surface.fill_rect(0.0, 0.0, 10.0, 10.0, Rgba::rgb(255, 255, 255));
        surface.stroke_circle(0.0, 0.0, 5.0, 2.0, Rgba::rgb(255, 255, 255));
        surface.stroke_polyline(&[(0.0, 0.0), (5.0, 5.0)], 2.0, Rgba::rgb(255, 255, 255));
        assert!(surface.data().is_empty());
    }

    #[test]
    fn resize_reallocates_and_clears() {
        let mut surface = Surface::new(SurfaceDimensions::new(4, 4));
        surface.fill_rect(0.0, 0.0, 4.0, 4.0, Rgba::rgb(255, 255, 255));
        surface.resize(SurfaceDimensions::new(6, 2));
        assert_eq!(surface.dimensions(), SurfaceDimensions::new(6, 2));
        assert_eq!(surface.data().len(), 6 * 2 * 4);
        assert_eq!(surface.pixel(5, 1).unwrap(), Rgba::rgba(0, 0, 0, 0));
    }

    #[test]
    fn hsl_primaries_match() {
        assert_eq!(hsl(0.0, 100.0, 50.0), Rgba::rgb(255, 0, 0));
        assert_eq!(hsl(120.0, 100.0, 50.0), Rgba::rgb(0, 255, 0));
        assert_eq!(hsl(240.0, 100.0, 50.0), Rgba::rgb(0, 0, 255));
        assert_eq!(hsl(0.0, 0.0, 50.0), Rgba::rgb(128, 128, 128));
        // Hue wraps.
        assert_eq!(hsl(360.0, 100.0, 50.0), hsl(0.0, 100.0, 50.0));
        assert_eq!(hsl(-120.0, 100.0, 50.0), hsl(240.0, 100.0, 50.0));
    }

    #[test]
    fn translucent_fill_blends_over_background() {
        let mut surface = Surface::new(SurfaceDimensions::new(3, 3));
        surface.clear(Rgba::BLACK);
        surface.fill_circle(1.5, 1.5, 2.0, Rgba::rgb(200, 100, 0).with_alpha(178));
        let px = surface.pixel(1, 1).unwrap();
        assert!(px.r > 130 && px.r < 150, "got {px:?}");
        assert!(px.g > 60 && px.g < 80, "got {px:?}");
        assert_eq!(px.b, 0);
    }

    #[test]
    fn stroke_circle_hits_the_ring_only() {
        let mut surface = Surface::new(SurfaceDimensions::new(41, 41));
        surface.clear(Rgba::BLACK);
        surface.stroke_circle(20.5, 20.5, 15.0, 2.0, Rgba::rgb(255, 255, 255));
        // On the ring.
        assert_eq!(surface.pixel(35, 20).unwrap(), Rgba::rgb(255, 255, 255));
        // Center and far corner stay untouched.
        assert_eq!(surface.pixel(20, 20).unwrap(), Rgba::BLACK);
        assert_eq!(surface.pixel(0, 0).unwrap(), Rgba::BLACK);
    }

    #[test]
    fn radial_gradient_interpolates_between_stops() {
        let mut surface = Surface::new(SurfaceDimensions::new(21, 1));
        let stops = [(0.0, Rgba::rgb(0, 0, 0)), (1.0, Rgba::rgb(255, 255, 255))];
        surface.fill_radial_gradient(0.0, 0.5, 20.0, &stops);
        let near = surface.pixel(1, 0).unwrap();
        let mid = surface.pixel(10, 0).unwrap();
        let far = surface.pixel(20, 0).unwrap();
        assert!(near.r < 40);
        assert!((mid.r as i32 - 128).abs() < 20, "got {mid:?}");
        assert!(far.r > 220);
    }
}
