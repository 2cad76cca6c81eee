//! Rasterisation primitives in data coordinates.

use image::{Rgb, RgbImage};

/// Data window of a panel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Limits {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Limits {
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    /// Square window `[-bound, bound]²`.
    pub fn symmetric(bound: f64) -> Self {
        Self::new(-bound, bound, -bound, bound)
    }

    /// Smallest window containing every finite point, or `None` if there
    /// are none.
    pub fn enclosing<'a>(points: impl Iterator<Item = (&'a f64, &'a f64)>) -> Option<Self> {
        let mut limits: Option<Self> = None;
        for (&x, &y) in points {
            if !x.is_finite() || !y.is_finite() {
                continue;
            }
            limits = Some(match limits {
                None => Self::new(x, x, y, y),
                Some(l) => Self::new(l.x_min.min(x), l.x_max.max(x), l.y_min.min(y), l.y_max.max(y)),
            });
        }
        limits
    }

    /// Union of two windows.
    pub fn union(self, other: Self) -> Self {
        Self::new(
            self.x_min.min(other.x_min),
            self.x_max.max(other.x_max),
            self.y_min.min(other.y_min),
            self.y_max.max(other.y_max),
        )
    }
}

/// Line pattern.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

impl LineStyle {
    /// Whether the pixel at arc length `s` is inked.
    fn inked(self, s: f64) -> bool {
        match self {
            Self::Solid => true,
            Self::Dashed => s.rem_euclid(10.0) < 6.0,
            Self::Dotted => s.rem_euclid(4.0) < 1.5,
        }
    }
}

/// Image with a data-to-pixel transform. The y axis points up.
pub(crate) struct Canvas {
    image: RgbImage,
    limits: Limits,
}

impl Canvas {
    pub fn new(width: u32, height: u32, limits: Limits, background: Rgb<u8>) -> Self {
        Self {
            image: RgbImage::from_pixel(width.max(1), height.max(1), background),
            limits,
        }
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    /// Continuous pixel position of a data point.
    pub fn to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let l = &self.limits;
        let w = self.image.width() as f64;
        let h = self.image.height() as f64;
        let dx = if l.x_max > l.x_min { l.x_max - l.x_min } else { 1.0 };
        let dy = if l.y_max > l.y_min { l.y_max - l.y_min } else { 1.0 };
        ((x - l.x_min) / dx * w, (l.y_max - y) / dy * h)
    }

    /// Fill a triangle, colouring each covered pixel centre by `shade`
    /// applied to the barycentric interpolation of `values`.
    pub fn fill_triangle_with<F>(&mut self, corners: [(f64, f64); 3], values: [f64; 3], shade: F)
    where
        F: Fn(f64) -> Option<Rgb<u8>>,
    {
        let p = corners.map(|(x, y)| self.to_pixel(x, y));
        let area = edge(p[0], p[1], p[2]);
        if area == 0.0 || !area.is_finite() {
            return;
        }

        let w = self.image.width() as f64;
        let h = self.image.height() as f64;
        let x_lo = p.iter().map(|q| q.0).fold(f64::INFINITY, f64::min).floor().max(0.0);
        let x_hi = p.iter().map(|q| q.0).fold(f64::NEG_INFINITY, f64::max).ceil().min(w);
        let y_lo = p.iter().map(|q| q.1).fold(f64::INFINITY, f64::min).floor().max(0.0);
        let y_hi = p.iter().map(|q| q.1).fold(f64::NEG_INFINITY, f64::max).ceil().min(h);
        if x_lo >= x_hi || y_lo >= y_hi {
            return;
        }

        for py in (y_lo as u32)..(y_hi as u32) {
            for px in (x_lo as u32)..(x_hi as u32) {
                let c = (px as f64 + 0.5, py as f64 + 0.5);
                let w0 = edge(p[1], p[2], c) / area;
                let w1 = edge(p[2], p[0], c) / area;
                let w2 = edge(p[0], p[1], c) / area;
                if w0 < -1e-9 || w1 < -1e-9 || w2 < -1e-9 {
                    continue;
                }
                let v = w0 * values[0] + w1 * values[1] + w2 * values[2];
                if let Some(colour) = shade(v) {
                    self.image.put_pixel(px, py, colour);
                }
            }
        }
    }

    /// Fill a triangle with one colour.
    pub fn fill_triangle(&mut self, corners: [(f64, f64); 3], colour: Rgb<u8>) {
        self.fill_triangle_with(corners, [0.0; 3], |_| Some(colour));
    }

    /// Draw a segment; `arc` carries the dash phase between segments.
    pub fn draw_segment(
        &mut self,
        a: (f64, f64),
        b: (f64, f64),
        colour: Rgb<u8>,
        style: LineStyle,
        arc: &mut f64,
    ) {
        let pa = self.to_pixel(a.0, a.1);
        let pb = self.to_pixel(b.0, b.1);
        let length = ((pb.0 - pa.0).powi(2) + (pb.1 - pa.1).powi(2)).sqrt();
        if !length.is_finite() {
            return;
        }
        let steps = length.ceil().max(1.0) as usize;
        for s in 0..=steps {
            let f = s as f64 / steps as f64;
            if style.inked(*arc + f * length) {
                let x = pa.0 + f * (pb.0 - pa.0);
                let y = pa.1 + f * (pb.1 - pa.1);
                self.put(x, y, colour);
            }
        }
        *arc += length;
    }

    fn put(&mut self, x: f64, y: f64, colour: Rgb<u8>) {
        if x < 0.0 || y < 0.0 {
            return;
        }
        let (px, py) = (x as u32, y as u32);
        if px < self.image.width() && py < self.image.height() {
            self.image.put_pixel(px, py, colour);
        }
    }
}

#[inline]
fn edge(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

    #[test]
    fn test_to_pixel_flips_y() {
        let canvas = Canvas::new(100, 50, Limits::new(0.0, 10.0, 0.0, 5.0), WHITE);
        assert_eq!(canvas.to_pixel(0.0, 5.0), (0.0, 0.0));
        assert_eq!(canvas.to_pixel(10.0, 0.0), (100.0, 50.0));
    }

    #[test]
    fn test_fill_triangle_covers_half_square() {
        let mut canvas = Canvas::new(10, 10, Limits::new(0.0, 1.0, 0.0, 1.0), WHITE);
        canvas.fill_triangle([(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)], BLACK);
        let image = canvas.into_image();
        let filled = image.pixels().filter(|p| **p == BLACK).count();
        // 45 strictly inside plus the 10 diagonal pixels
        assert!((45..=55).contains(&filled), "filled {}", filled);
        // Lower right is inside, upper left is not
        assert_eq!(*image.get_pixel(9, 9), BLACK);
        assert_eq!(*image.get_pixel(0, 0), WHITE);
    }

    #[test]
    fn test_interpolated_fill() {
        let mut canvas = Canvas::new(20, 20, Limits::new(0.0, 1.0, 0.0, 1.0), WHITE);
        canvas.fill_triangle_with(
            [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)],
            [0.0, 1.0, 0.0],
            |v| (v > 0.5).then_some(BLACK),
        );
        let image = canvas.into_image();
        // Near the x = 1 corner the value exceeds 0.5
        assert_eq!(*image.get_pixel(17, 19), BLACK);
        assert_eq!(*image.get_pixel(1, 19), WHITE);
    }

    #[test]
    fn test_dashed_segment_has_gaps() {
        let mut canvas = Canvas::new(100, 1, Limits::new(0.0, 100.0, 0.0, 1.0), WHITE);
        let mut arc = 0.0;
        canvas.draw_segment((0.0, 0.5), (100.0, 0.5), BLACK, LineStyle::Dashed, &mut arc);
        let image = canvas.into_image();
        let inked = image.pixels().filter(|p| **p == BLACK).count();
        assert!(inked > 40 && inked < 80, "inked {}", inked);
        assert!((arc - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_enclosing_skips_nan() {
        let xs = [0.0, f64::NAN, 2.0];
        let ys = [1.0, 5.0, -1.0];
        let limits = Limits::enclosing(xs.iter().zip(ys.iter())).unwrap();
        assert_eq!(limits, Limits::new(0.0, 2.0, -1.0, 1.0));
    }
}
