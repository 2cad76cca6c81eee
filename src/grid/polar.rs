//! Circumpolar plotting projection.
//!
//! Points are placed at a distance `lat + 90` (degrees of colatitude) from
//! the South Pole, with 0°E pointing up and 90°E pointing right:
//!
//! ```text
//! x = -(lat + 90) cos(lon + π/2)
//! y =  (lat + 90) sin(lon + π/2)
//! ```
//!
//! The ROMS circumpolar grid does not reach the pole, leaving a hole
//! around (50°E, 83°S) that figures fill with a grey [`MissingCircle`].

use std::f64::consts::FRAC_PI_2;

use ndarray::{Array2, Zip};
use serde::Deserialize;

use crate::field::linspace;
use crate::units::DEG2RAD;

/// Project one point.
#[inline]
pub fn polar_xy(lon: f64, lat: f64) -> (f64, f64) {
    let r = lat + 90.0;
    let theta = lon * DEG2RAD + FRAC_PI_2;
    (-r * theta.cos(), r * theta.sin())
}

/// Project a 2D grid.
pub fn polar_grid(lon: &Array2<f64>, lat: &Array2<f64>) -> (Array2<f64>, Array2<f64>) {
    let mut x = Array2::zeros(lon.dim());
    let mut y = Array2::zeros(lon.dim());
    Zip::from(&mut x)
        .and(&mut y)
        .and(lon)
        .and(lat)
        .for_each(|x, y, &lon, &lat| {
            let (px, py) = polar_xy(lon, lat);
            *x = px;
            *y = py;
        });
    (x, y)
}

/// Half-width of the plotting window reaching out to `lat`.
#[inline]
pub fn plot_bound(lat: f64) -> f64 {
    lat + 90.0
}

/// Grey disc covering the hole in the grid near the pole.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct MissingCircle {
    pub lon_c: f64,
    pub lat_c: f64,
    /// Radius in projected units (degrees of colatitude).
    pub radius: f64,
    /// Half-width of the regular grid the circle is rasterised on.
    pub boundary: f64,
    /// Points per side of that grid.
    pub resolution: usize,
}

impl Default for MissingCircle {
    fn default() -> Self {
        Self {
            lon_c: 50.0,
            lat_c: -83.0,
            radius: 10.1,
            boundary: plot_bound(-63.0),
            resolution: 1000,
        }
    }
}

impl MissingCircle {
    pub fn new(radius: f64, boundary: f64, resolution: usize) -> Self {
        Self {
            radius,
            boundary,
            resolution,
            ..Self::default()
        }
    }

    /// Projected centre of the circle.
    pub fn centre(&self) -> (f64, f64) {
        polar_xy(self.lon_c, self.lat_c)
    }

    /// Whether a projected point lies inside the circle.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let (xc, yc) = self.centre();
        ((x - xc).powi(2) + (y - yc).powi(2)).sqrt() <= self.radius
    }

    /// Regular `resolution x resolution` grid on `[-boundary, boundary]²`.
    pub fn regular_grid(&self) -> (Array2<f64>, Array2<f64>) {
        let axis = linspace(-self.boundary, self.boundary, self.resolution);
        let n = self.resolution;
        let x = Array2::from_shape_fn((n, n), |(_, i)| axis[i]);
        let y = Array2::from_shape_fn((n, n), |(j, _)| axis[j]);
        (x, y)
    }

    /// Land field on the regular grid: 1 inside the circle, NaN outside.
    pub fn land_field(&self) -> Array2<f64> {
        let (x, y) = self.regular_grid();
        let mut land = Array2::from_elem(x.dim(), f64::NAN);
        Zip::from(&mut land).and(&x).and(&y).for_each(|l, &x, &y| {
            if self.contains(x, y) {
                *l = 1.0;
            }
        });
        land
    }
}

/// A longitude annotation placed on a circumpolar map.
#[derive(Clone, Debug, Deserialize)]
pub struct LonLabel {
    pub lon: f64,
    pub lat: f64,
    pub text: String,
    /// Text rotation in degrees.
    pub rotation: f64,
}

impl LonLabel {
    pub fn new(lon: f64, lat: f64, text: impl Into<String>, rotation: f64) -> Self {
        Self {
            lon,
            lat,
            text: text.into(),
            rotation,
        }
    }

    /// Projected anchor position.
    pub fn anchor(&self) -> (f64, f64) {
        polar_xy(self.lon, self.lat)
    }
}

/// Longitude labels around a map that reaches 40°S.
pub fn default_lon_labels() -> Vec<LonLabel> {
    vec![
        LonLabel::new(-120.0, -44.0, "120°W", -60.0),
        LonLabel::new(-60.0, -42.0, "60°W", 60.0),
        LonLabel::new(60.0, -42.0, "60°E", -60.0),
        LonLabel::new(120.0, -44.0, "120°E", 60.0),
        LonLabel::new(180.0, -41.0, "180°", 0.0),
    ]
}
