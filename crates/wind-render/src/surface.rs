//! Software RGBA canvas with the few primitives arrow rendering
//! needs: alpha-blended pixels, round-capped thick lines, filled
//! triangles, and rectangular clipping.

/// An RGB color with an intrinsic alpha in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Color {
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn with_alpha(r: u8, g: u8, b: u8, a: f64) -> Self {
        Self { r, g, b, a }
    }
}

/// Transparent RGBA pixel buffer, 4 bytes per pixel, row-major.
pub struct PixelSurface {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
    clip: Option<(f64, f64, f64, f64)>,
}

impl PixelSurface {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0u8; width * height * 4],
            clip: None,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    /// Restrict all subsequent drawing to a rectangle
    /// (left, top, right, bottom).
    pub fn set_clip(&mut self, left: f64, top: f64, right: f64, bottom: f64) {
        self.clip = Some((left, top, right, bottom));
    }

    pub fn clear_clip(&mut self) {
        self.clip = None;
    }

    fn clipped_out(&self, x: usize, y: usize) -> bool {
        match self.clip {
            Some((left, top, right, bottom)) => {
                let fx = x as f64 + 0.5;
                let fy = y as f64 + 0.5;
                fx < left || fy < top || fx >= right || fy >= bottom
            }
            None => false,
        }
    }

    /// Source-over blend of `color` at integer pixel coordinates,
    /// scaled by `alpha`.
    pub fn blend_pixel(&mut self, x: usize, y: usize, color: Color, alpha: f64) {
        if x >= self.width || y >= self.height || self.clipped_out(x, y) {
            return;
        }
        let src_a = (color.a * alpha).clamp(0.0, 1.0);
        if src_a <= 0.0 {
            return;
        }

        let idx = (y * self.width + x) * 4;
        let dst_a = self.pixels[idx + 3] as f64 / 255.0;
        let out_a = src_a + dst_a * (1.0 - src_a);
        if out_a <= 0.0 {
            return;
        }

        let blend = |src: u8, dst: u8| -> u8 {
            ((src as f64 * src_a + dst as f64 * dst_a * (1.0 - src_a)) / out_a).round() as u8
        };
        self.pixels[idx] = blend(color.r, self.pixels[idx]);
        self.pixels[idx + 1] = blend(color.g, self.pixels[idx + 1]);
        self.pixels[idx + 2] = blend(color.b, self.pixels[idx + 2]);
        self.pixels[idx + 3] = (out_a * 255.0).round() as u8;
    }

    /// Thick line segment with round caps, rendered as a distance
    /// field over the segment's bounding box.
    pub fn stroke_line(
        &mut self,
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
        line_width: f64,
        color: Color,
        alpha: f64,
    ) {
        let radius = line_width / 2.0;
        let min_x = (x0.min(x1) - radius).floor().max(0.0) as usize;
        let max_x = (x0.max(x1) + radius).ceil().min(self.width as f64) as usize;
        let min_y = (y0.min(y1) - radius).floor().max(0.0) as usize;
        let max_y = (y0.max(y1) + radius).ceil().min(self.height as f64) as usize;

        for y in min_y..max_y {
            for x in min_x..max_x {
                let distance =
                    segment_distance(x as f64 + 0.5, y as f64 + 0.5, x0, y0, x1, y1);
                // One-pixel soft edge.
                let coverage = (radius - distance + 0.5).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    self.blend_pixel(x, y, color, alpha * coverage);
                }
            }
        }
    }

    /// Filled triangle via half-plane coverage over the bounding box.
    pub fn fill_triangle(
        &mut self,
        a: (f64, f64),
        b: (f64, f64),
        c: (f64, f64),
        color: Color,
        alpha: f64,
    ) {
        let min_x = a.0.min(b.0).min(c.0).floor().max(0.0) as usize;
        let max_x = a.0.max(b.0).max(c.0).ceil().min(self.width as f64) as usize;
        let min_y = a.1.min(b.1).min(c.1).floor().max(0.0) as usize;
        let max_y = a.1.max(b.1).max(c.1).ceil().min(self.height as f64) as usize;

        let area = edge(a, b, c);
        if area.abs() < 1e-12 {
            return;
        }

        for y in min_y..max_y {
            for x in min_x..max_x {
                let p = (x as f64 + 0.5, y as f64 + 0.5);
                let w0 = edge(a, b, p) / area;
                let w1 = edge(b, c, p) / area;
                let w2 = edge(c, a, p) / area;
                if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                    self.blend_pixel(x, y, color, alpha);
                }
            }
        }
    }
}

fn edge(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> f64 {
    (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0)
}

/// Distance from (px, py) to the segment (x0, y0)-(x1, y1).
fn segment_distance(px: f64, py: f64, x0: f64, y0: f64, x1: f64, y1: f64) -> f64 {
    let dx = x1 - x0;
    let dy = y1 - y0;
    let length_sq = dx * dx + dy * dy;
    let t = if length_sq <= f64::EPSILON {
        0.0
    } else {
        (((px - x0) * dx + (py - y0) * dy) / length_sq).clamp(0.0, 1.0)
    };
    let nearest_x = x0 + t * dx;
    let nearest_y = y0 + t * dy;
    ((px - nearest_x).powi(2) + (py - nearest_y).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_surface_is_transparent() {
        let surface = PixelSurface::new(4, 4);
        assert!(surface.pixels().iter().all(|&byte| byte == 0));
    }

    #[test]
    fn blend_onto_transparent_keeps_color() {
        let mut surface = PixelSurface::new(2, 2);
        surface.blend_pixel(0, 0, Color::opaque(255, 0, 0), 1.0);
        let px = &surface.pixels()[0..4];
        assert_eq!(px, &[255, 0, 0, 255]);
    }

    #[test]
    fn stroke_touches_pixels_along_the_segment() {
        let mut surface = PixelSurface::new(20, 20);
        surface.stroke_line(2.0, 10.0, 18.0, 10.0, 3.0, Color::opaque(0, 255, 0), 1.0);

        let idx = (10 * 20 + 10) * 4;
        assert!(surface.pixels()[idx + 3] > 0, "midpoint should be painted");
        let far = (2 * 20 + 10) * 4;
        assert_eq!(surface.pixels()[far + 3], 0, "off-line pixel stays clear");
    }

    #[test]
    fn clip_suppresses_outside_drawing() {
        let mut surface = PixelSurface::new(10, 10);
        surface.set_clip(0.0, 0.0, 5.0, 10.0);
        surface.stroke_line(0.0, 5.0, 9.0, 5.0, 2.0, Color::opaque(255, 255, 255), 1.0);

        let inside = (5 * 10 + 2) * 4;
        let outside = (5 * 10 + 8) * 4;
        assert!(surface.pixels()[inside + 3] > 0);
        assert_eq!(surface.pixels()[outside + 3], 0);
    }

    #[test]
    fn triangle_fills_interior_only() {
        let mut surface = PixelSurface::new(20, 20);
        surface.fill_triangle(
            (10.0, 2.0),
            (2.0, 18.0),
            (18.0, 18.0),
            Color::opaque(0, 0, 255),
            1.0,
        );

        let inside = (12 * 20 + 10) * 4;
        let outside = (3 * 20 + 2) * 4;
        assert!(surface.pixels()[inside + 3] > 0);
        assert_eq!(surface.pixels()[outside + 3], 0);
    }
}
