//! Terrain-following (s-coordinate) vertical grids for ROMS output.
//!
//! ROMS history files store fields on N levels that follow the bathymetry
//! and, in ice shelf cavities, the ice draft. To integrate over volume the
//! physical depth of every level and every cell face has to be rebuilt from
//! the grid parameters the run used (`theta_s`, `theta_b`, `hc`, `N`,
//! `Vstretching`, `Vtransform`).
//!
//! # Example
//!
//! ```
//! use ocean_diag::vertical::{SigmaGrid, Shchepetkin2005Stretching};
//!
//! // Spinup configuration of the circumpolar MetROMS grid
//! let grid = SigmaGrid::new(31, Shchepetkin2005Stretching::new(0.9, 4.0), 40.0);
//! let dz: Vec<f64> = grid.z_w(500.0, 0.0).windows(2).map(|w| w[1] - w[0]).collect();
//! assert!((dz.iter().sum::<f64>() - 500.0).abs() < 1e-9);
//! ```

mod sigma;
mod stretching;

use serde::Deserialize;

pub use sigma::{SigmaGrid, VerticalTransform};
pub use stretching::{
    Shchepetkin2005Stretching, Shchepetkin2010Stretching, SongHaidvogelStretching, Stretching,
    StretchingKind, UniformStretching,
};

/// Vertical grid parameters as they appear in a ROMS `.in` file.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct VerticalGridParams {
    pub theta_s: f64,
    pub theta_b: f64,
    pub hc: f64,
    pub n_levels: usize,
    pub stretching: StretchingKind,
    pub transform: VerticalTransform,
}

impl Default for VerticalGridParams {
    fn default() -> Self {
        Self {
            theta_s: 7.0,
            theta_b: 2.0,
            hc: 250.0,
            n_levels: 31,
            stretching: StretchingKind::Shchepetkin2010,
            transform: VerticalTransform::Shchepetkin,
        }
    }
}

impl VerticalGridParams {
    /// Parameters of the spinup runs (`theta_s = 0.9`, `theta_b = 4`, `hc = 40`).
    pub fn spinup() -> Self {
        Self {
            theta_s: 0.9,
            theta_b: 4.0,
            hc: 40.0,
            n_levels: 31,
            stretching: StretchingKind::Shchepetkin2005,
            transform: VerticalTransform::Shchepetkin,
        }
    }

    /// Build the grid described by these parameters.
    pub fn build(&self) -> SigmaGrid {
        SigmaGrid::new(
            self.n_levels,
            self.stretching.build(self.theta_s, self.theta_b),
            self.hc,
        )
        .with_transform(self.transform)
    }
}
