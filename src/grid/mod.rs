//! Horizontal grid geometry.
//!
//! - **Differentials**: cell widths on the ROMS and SOSE grids
//! - **Cartesian**: 3D `dx`, `dy`, `dz`, `z` on the ROMS rho-grid and the
//!   masked area/volume integrands built from them
//! - **Staggered**: u/v-point to rho-point interpolation
//! - **Rotation**: grid-relative to east/north vectors and back
//! - **Regridding**: bilinear interpolation from regular lon/lat grids
//! - **Polar**: circumpolar plotting projection
//!
//! # Example
//!
//! ```
//! use ndarray::array;
//! use ocean_diag::grid::roms_cell_widths;
//!
//! let lon = array![[0.0, 90.0, 180.0, 270.0]];
//! let lat = array![[-60.0, -60.0, -60.0, -60.0]];
//! let (dx, dy) = roms_cell_widths(&lon, &lat, -30.0);
//! assert!(dx.iter().all(|&w| w > 0.0));
//! assert!(dy.iter().all(|&w| w > 0.0));
//! ```

mod cartesian;
mod differentials;
mod polar;
mod regrid;
mod rotate;
mod staggered;

use thiserror::Error;

pub use cartesian::{cavity_area, dy_wct, CartesianGrid3D, Integrands};
pub use differentials::{
    dy_with_northern_boundary, periodic_lon_edges, roms_cell_widths, sose_cell_widths,
    sose_vertical,
};
pub use polar::{default_lon_labels, plot_bound, polar_grid, polar_xy, LonLabel, MissingCircle};
pub use regrid::{InterpolationWeights, RegularGridInterpolator};
pub use rotate::{rotate_to_grid, rotate_to_lonlat, velocity_to_lonlat};
pub use staggered::{u_to_rho, u_to_rho_3d, v_to_rho, v_to_rho_3d};

/// Latitude of the northern open boundary of the circumpolar ROMS grid.
pub const DEFAULT_NORTHERN_BOUNDARY: f64 = -30.0;

/// Error type for grid construction and regridding.
#[derive(Debug, Error)]
pub enum GridError {
    /// Coordinate axis with no points
    #[error("Coordinate axis is empty")]
    EmptyAxis,

    /// Coordinate axis out of order
    #[error("{0} axis is not strictly monotonic")]
    NonMonotonic(String),

    /// Field does not match the grid
    #[error("Shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch { expected: Vec<usize>, found: Vec<usize> },

    /// Invalid data
    #[error("Invalid data: {0}")]
    InvalidData(String),
}
