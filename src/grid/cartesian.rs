//! Cartesian integrands on the 3D ROMS rho-grid.

use log::{debug, warn};
use ndarray::{s, Array2, Array3};

use super::differentials::roms_cell_widths;
use crate::field::{count_valid, masked_where, masked_where_3d, tile_levels};
use crate::vertical::SigmaGrid;

/// Cell widths, thicknesses and depths on the 3D rho-grid, all `[k, j, i]`.
#[derive(Clone, Debug)]
pub struct CartesianGrid3D {
    pub dx: Array3<f64>,
    pub dy: Array3<f64>,
    pub dz: Array3<f64>,
    /// Depth of each cell centre (negative).
    pub z: Array3<f64>,
}

impl CartesianGrid3D {
    /// Build integrands from the rho-grid coordinates, bathymetry and ice
    /// draft.
    ///
    /// # Arguments
    ///
    /// * `lon`, `lat` - rho-point coordinates (degrees)
    /// * `h` - bathymetry (positive down)
    /// * `zice` - ice shelf draft (negative in cavities, zero elsewhere)
    /// * `sigma` - vertical grid of the run
    /// * `nbdry` - latitude of the northern open boundary
    pub fn build(
        lon: &Array2<f64>,
        lat: &Array2<f64>,
        h: &Array2<f64>,
        zice: &Array2<f64>,
        sigma: &SigmaGrid,
        nbdry: f64,
    ) -> Self {
        let n = sigma.n_levels();
        let (ny, nx) = h.dim();
        debug!("Building {}x{}x{} cartesian grid with {}", n, ny, nx, sigma);

        let (dx_2d, dy_2d) = roms_cell_widths(lon, lat, nbdry);
        let z = sigma.z_rho_3d(h, zice);

        // Cell edges: sea floor, midpoints between centres, ice draft
        let mut dz = Array3::zeros((n, ny, nx));
        for j in 0..ny {
            for i in 0..nx {
                let mut lower = -h[[j, i]];
                for k in 0..n {
                    let upper = if k + 1 == n {
                        zice[[j, i]]
                    } else {
                        0.5 * (z[[k, j, i]] + z[[k + 1, j, i]])
                    };
                    dz[[k, j, i]] = upper - lower;
                    lower = upper;
                }
            }
        }

        Self {
            dx: tile_levels(&dx_2d, n),
            dy: tile_levels(&dy_2d, n),
            dz,
            z,
        }
    }

    pub fn n_levels(&self) -> usize {
        self.z.dim().0
    }

    /// Horizontal cell area (m²) of the 2D grid.
    pub fn area(&self) -> Array2<f64> {
        &self.dx.slice(s![0, .., ..]) * &self.dy.slice(s![0, .., ..])
    }

    /// Cell volume (m³).
    pub fn volume(&self) -> Array3<f64> {
        &(&self.dx * &self.dy) * &self.dz
    }
}

/// Integrands shared by the spinup diagnostics.
#[derive(Clone, Debug)]
pub struct Integrands {
    /// Unmasked horizontal area (m²).
    pub area: Array2<f64>,
    /// Area masked to ice shelf cavities (`zice != 0`).
    pub d_a: Array2<f64>,
    /// Volume masked by the land mask.
    pub d_v: Array3<f64>,
    /// `dy` times water column thickness, masked by the land mask.
    pub dy_wct: Array2<f64>,
}

impl Integrands {
    /// Derive the masked integrands from a cartesian grid.
    pub fn new(grid: &CartesianGrid3D, h: &Array2<f64>, zice: &Array2<f64>, mask_rho: &Array2<f64>) -> Self {
        let area = grid.area();
        let d_a = cavity_area(&area, zice);
        let d_v = masked_where_3d(&grid.volume(), mask_rho, |m| m == 0.0);
        let dy = grid.dy.slice(s![0, .., ..]).to_owned();
        let dy_wct = dy_wct(&dy, h, zice, mask_rho);
        Self {
            area,
            d_a,
            d_v,
            dy_wct,
        }
    }
}

/// Area masked outside ice shelf cavities.
pub fn cavity_area(area: &Array2<f64>, zice: &Array2<f64>) -> Array2<f64> {
    let d_a = masked_where(area, zice, |z| z == 0.0);
    if count_valid(&d_a) == 0 {
        warn!("Grid has no ice shelf cavities; cavity averages will be NaN");
    }
    d_a
}

/// `dy * (h + zice)` masked on land.
pub fn dy_wct(dy: &Array2<f64>, h: &Array2<f64>, zice: &Array2<f64>, mask_rho: &Array2<f64>) -> Array2<f64> {
    let product = dy * &(h + zice);
    masked_where(&product, mask_rho, |m| m == 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vertical::{Shchepetkin2005Stretching, UniformStretching};
    use ndarray::array;

    fn small_grid() -> (Array2<f64>, Array2<f64>, Array2<f64>, Array2<f64>) {
        let lon = array![[0.0, 120.0, 240.0], [0.0, 120.0, 240.0]];
        let lat = array![[-75.0, -75.0, -75.0], [-70.0, -70.0, -70.0]];
        let h = array![[500.0, 800.0, 1000.0], [2000.0, 3000.0, 100.0]];
        let zice = array![[-200.0, 0.0, 0.0], [0.0, 0.0, 0.0]];
        (lon, lat, h, zice)
    }

    #[test]
    fn test_dz_spans_water_column() {
        let (lon, lat, h, zice) = small_grid();
        let sigma = SigmaGrid::new(31, Shchepetkin2005Stretching::new(0.9, 4.0), 40.0);
        let grid = CartesianGrid3D::build(&lon, &lat, &h, &zice, &sigma, -30.0);
        assert_eq!(grid.dz.dim(), (31, 2, 3));
        for j in 0..2 {
            for i in 0..3 {
                let total: f64 = (0..31).map(|k| grid.dz[[k, j, i]]).sum();
                let wct = h[[j, i]] + zice[[j, i]];
                assert!((total - wct).abs() < 1e-8, "column ({}, {})", j, i);
                for k in 0..31 {
                    assert!(grid.dz[[k, j, i]] > 0.0);
                }
            }
        }
    }

    #[test]
    fn test_volume_is_area_times_thickness() {
        let (lon, lat, h, zice) = small_grid();
        let sigma = SigmaGrid::new(4, UniformStretching, 10.0);
        let grid = CartesianGrid3D::build(&lon, &lat, &h, &zice, &sigma, -30.0);
        let area = grid.area();
        let column: f64 = grid.volume().slice(s![.., 1, 1]).sum();
        assert!((column - area[[1, 1]] * 3000.0).abs() / column < 1e-12);
    }

    #[test]
    fn test_integrand_masks() {
        let (lon, lat, h, zice) = small_grid();
        let mask = array![[1.0, 1.0, 0.0], [1.0, 1.0, 1.0]];
        let sigma = SigmaGrid::new(4, UniformStretching, 10.0);
        let grid = CartesianGrid3D::build(&lon, &lat, &h, &zice, &sigma, -30.0);
        let integrands = Integrands::new(&grid, &h, &zice, &mask);

        assert!(integrands.d_a[[0, 0]] > 0.0);
        assert!(integrands.d_a[[0, 1]].is_nan());
        assert!(integrands.d_v[[2, 0, 2]].is_nan());
        assert!(integrands.dy_wct[[0, 2]].is_nan());
        assert!((integrands.dy_wct[[0, 0]] - grid.dy[[0, 0, 0]] * 300.0).abs() < 1e-6);
        assert!(integrands.area.iter().all(|a| a.is_finite()));
    }
}
