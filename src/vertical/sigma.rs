//! ROMS s-coordinate grid: level positions and physical depths.
//!
//! The grid stores the uniform coordinate `s` and the stretched curve `C(s)`
//! at cell centres (rho-points) and cell faces (w-points), following the
//! ROMS convention that level 0 is the bottom-most cell.
//!
//! ```text
//! s_w[k]   = (k - N) / N                k = 0..=N
//! s_rho[k] = (k + 0.5 - N) / N          k = 0..N
//! ```
//!
//! Physical depths are produced by a [`VerticalTransform`]. Under an ice
//! shelf the water column runs from the sea floor (`-h`) up to the ice
//! draft (`zice`, negative), so the free surface of the standard ROMS
//! formulas is replaced by `zice`.
//!
//! # Example
//!
//! ```
//! use ocean_diag::vertical::{SigmaGrid, Shchepetkin2010Stretching, VerticalTransform};
//!
//! let grid = SigmaGrid::new(31, Shchepetkin2010Stretching::new(7.0, 2.0), 250.0)
//!     .with_transform(VerticalTransform::Shchepetkin);
//!
//! // 1000 m of water under a 200 m thick ice shelf
//! let z = grid.z_rho(1000.0, -200.0);
//! assert_eq!(z.len(), 31);
//! assert!(z[0] > -1000.0 && z[30] < -200.0);
//! ```

use ndarray::{Array2, Array3};
use serde::Deserialize;

use super::stretching::Stretching;

/// ROMS vertical transformation (`Vtransform`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalTransform {
    /// `Vtransform = 1`: `z0 = hc s + (h - hc) C`, `z = z0 + ζ (1 + z0/h)`.
    Original,
    /// `Vtransform = 2`: `z0 = (hc s + h C)/(hc + h)`, `z = ζ + (ζ + h) z0`.
    #[default]
    Shchepetkin,
}

impl VerticalTransform {
    /// Depth of one point in the column.
    ///
    /// * `s`, `c` - uniform coordinate and stretching value
    /// * `h` - bathymetry (positive down)
    /// * `zeta` - top of the water column (ice draft or free surface)
    /// * `hc` - critical depth
    #[inline]
    pub fn z(self, s: f64, c: f64, h: f64, zeta: f64, hc: f64) -> f64 {
        match self {
            Self::Original => {
                let z0 = hc * s + (h - hc) * c;
                z0 + zeta * (1.0 + z0 / h)
            }
            Self::Shchepetkin => {
                let z0 = (hc * s + h * c) / (hc + h);
                zeta + (zeta + h) * z0
            }
        }
    }

    /// Map a ROMS `Vtransform` value.
    pub fn from_vtransform(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::Original),
            2 => Some(Self::Shchepetkin),
            _ => None,
        }
    }
}

/// Terrain-following vertical grid.
#[derive(Clone, Debug)]
pub struct SigmaGrid {
    n_levels: usize,
    s_rho: Vec<f64>,
    s_w: Vec<f64>,
    cs_r: Vec<f64>,
    cs_w: Vec<f64>,
    hc: f64,
    transform: VerticalTransform,
    stretching_description: String,
}

impl SigmaGrid {
    /// Create a grid with `n_levels` cells.
    ///
    /// # Arguments
    ///
    /// * `n_levels` - Number of vertical levels (ROMS `N`)
    /// * `stretching` - Stretching curve C(s)
    /// * `hc` - Critical depth (m)
    pub fn new(n_levels: usize, stretching: impl Stretching, hc: f64) -> Self {
        let n = n_levels as f64;
        let s_w: Vec<f64> = (0..=n_levels).map(|k| (k as f64 - n) / n).collect();
        let s_rho: Vec<f64> = (0..n_levels).map(|k| (k as f64 + 0.5 - n) / n).collect();
        let cs_w: Vec<f64> = s_w.iter().map(|&s| stretching.c(s)).collect();
        let cs_r: Vec<f64> = s_rho.iter().map(|&s| stretching.c(s)).collect();

        Self {
            n_levels,
            s_rho,
            s_w,
            cs_r,
            cs_w,
            hc,
            transform: VerticalTransform::default(),
            stretching_description: stretching.description(),
        }
    }

    /// Select the vertical transform (defaults to `Vtransform = 2`).
    pub fn with_transform(mut self, transform: VerticalTransform) -> Self {
        self.transform = transform;
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[inline]
    pub fn n_levels(&self) -> usize {
        self.n_levels
    }

    #[inline]
    pub fn s_rho(&self) -> &[f64] {
        &self.s_rho
    }

    #[inline]
    pub fn s_w(&self) -> &[f64] {
        &self.s_w
    }

    #[inline]
    pub fn cs_r(&self) -> &[f64] {
        &self.cs_r
    }

    #[inline]
    pub fn cs_w(&self) -> &[f64] {
        &self.cs_w
    }

    #[inline]
    pub fn hc(&self) -> f64 {
        self.hc
    }

    #[inline]
    pub fn transform(&self) -> VerticalTransform {
        self.transform
    }

    pub fn stretching_description(&self) -> &str {
        &self.stretching_description
    }

    // =========================================================================
    // Single column
    // =========================================================================

    /// Depths of the cell centres into a caller-provided buffer.
    ///
    /// `z_out` must have length `n_levels`.
    pub fn z_rho_into(&self, h: f64, zice: f64, z_out: &mut [f64]) {
        debug_assert_eq!(z_out.len(), self.n_levels);
        for (k, z) in z_out.iter_mut().enumerate() {
            *z = self
                .transform
                .z(self.s_rho[k], self.cs_r[k], h, zice, self.hc);
        }
    }

    /// Depths of the cell faces into a caller-provided buffer.
    ///
    /// `z_out` must have length `n_levels + 1`.
    pub fn z_w_into(&self, h: f64, zice: f64, z_out: &mut [f64]) {
        debug_assert_eq!(z_out.len(), self.n_levels + 1);
        for (k, z) in z_out.iter_mut().enumerate() {
            *z = self.transform.z(self.s_w[k], self.cs_w[k], h, zice, self.hc);
        }
    }

    /// Depths of the cell centres (bottom first).
    pub fn z_rho(&self, h: f64, zice: f64) -> Vec<f64> {
        let mut z = vec![0.0; self.n_levels];
        self.z_rho_into(h, zice, &mut z);
        z
    }

    /// Depths of the cell faces (bottom first, length `n_levels + 1`).
    pub fn z_w(&self, h: f64, zice: f64) -> Vec<f64> {
        let mut z = vec![0.0; self.n_levels + 1];
        self.z_w_into(h, zice, &mut z);
        z
    }

    // =========================================================================
    // Whole grid
    // =========================================================================

    /// Depths of the cell centres over a 2D grid, shape `[N, ny, nx]`.
    pub fn z_rho_3d(&self, h: &Array2<f64>, zice: &Array2<f64>) -> Array3<f64> {
        let (ny, nx) = h.dim();
        let mut z = Array3::zeros((self.n_levels, ny, nx));
        let mut column = vec![0.0; self.n_levels];
        for j in 0..ny {
            for i in 0..nx {
                self.z_rho_into(h[[j, i]], zice[[j, i]], &mut column);
                for (k, &zk) in column.iter().enumerate() {
                    z[[k, j, i]] = zk;
                }
            }
        }
        z
    }

    /// Depths of the cell faces over a 2D grid, shape `[N + 1, ny, nx]`.
    pub fn z_w_3d(&self, h: &Array2<f64>, zice: &Array2<f64>) -> Array3<f64> {
        let (ny, nx) = h.dim();
        let mut z = Array3::zeros((self.n_levels + 1, ny, nx));
        let mut column = vec![0.0; self.n_levels + 1];
        for j in 0..ny {
            for i in 0..nx {
                self.z_w_into(h[[j, i]], zice[[j, i]], &mut column);
                for (k, &zk) in column.iter().enumerate() {
                    z[[k, j, i]] = zk;
                }
            }
        }
        z
    }
}

impl std::fmt::Display for SigmaGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SigmaGrid({} levels, hc={:.0}m, {:?}, {})",
            self.n_levels, self.hc, self.transform, self.stretching_description
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vertical::{Shchepetkin2005Stretching, Shchepetkin2010Stretching, UniformStretching};
    use ndarray::array;

    const TOL: f64 = 1e-9;

    #[test]
    fn test_s_coordinates() {
        let grid = SigmaGrid::new(4, UniformStretching, 10.0);
        assert_eq!(grid.s_w(), &[-1.0, -0.75, -0.5, -0.25, 0.0]);
        assert_eq!(grid.s_rho(), &[-0.875, -0.625, -0.375, -0.125]);
    }

    #[test]
    fn test_faces_hit_bottom_and_ice_draft() {
        for transform in [VerticalTransform::Original, VerticalTransform::Shchepetkin] {
            let grid = SigmaGrid::new(31, Shchepetkin2005Stretching::new(0.9, 4.0), 40.0)
                .with_transform(transform);
            let z = grid.z_w(800.0, -150.0);
            assert!((z[0] + 800.0).abs() < TOL, "{:?}: bottom face {}", transform, z[0]);
            assert!((z[31] + 150.0).abs() < TOL, "{:?}: top face {}", transform, z[31]);
        }
    }

    #[test]
    fn test_open_ocean_surface_is_zero() {
        let grid = SigmaGrid::new(31, Shchepetkin2010Stretching::new(7.0, 2.0), 250.0);
        let z = grid.z_w(4000.0, 0.0);
        assert!(z[31].abs() < TOL);
        assert!((z[0] + 4000.0).abs() < TOL);
    }

    #[test]
    fn test_centres_between_faces() {
        let grid = SigmaGrid::new(31, Shchepetkin2010Stretching::new(7.0, 2.0), 250.0);
        let z_r = grid.z_rho(3000.0, -400.0);
        let z_w = grid.z_w(3000.0, -400.0);
        for k in 0..31 {
            assert!(z_w[k] < z_r[k] && z_r[k] < z_w[k + 1], "level {} out of order", k);
        }
    }

    #[test]
    fn test_uniform_transform_is_linear() {
        // With C = s and Vtransform 2, levels are equally spaced in the column
        let grid = SigmaGrid::new(10, UniformStretching, 50.0);
        let z = grid.z_w(100.0, 0.0);
        for k in 0..=10 {
            assert!((z[k] - (-100.0 + 10.0 * k as f64)).abs() < TOL);
        }
    }

    #[test]
    fn test_3d_matches_column() {
        let grid = SigmaGrid::new(5, Shchepetkin2010Stretching::new(7.0, 2.0), 250.0);
        let h = array![[500.0, 1000.0], [2000.0, 50.0]];
        let zice = array![[0.0, -100.0], [0.0, 0.0]];
        let z = grid.z_rho_3d(&h, &zice);
        assert_eq!(z.dim(), (5, 2, 2));
        let col = grid.z_rho(1000.0, -100.0);
        for k in 0..5 {
            assert!((z[[k, 0, 1]] - col[k]).abs() < TOL);
        }
        let zw = grid.z_w_3d(&h, &zice);
        assert_eq!(zw.dim(), (6, 2, 2));
    }

    #[test]
    fn test_from_vtransform() {
        assert_eq!(
            VerticalTransform::from_vtransform(2),
            Some(VerticalTransform::Shchepetkin)
        );
        assert_eq!(VerticalTransform::from_vtransform(3), None);
    }
}
