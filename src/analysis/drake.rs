//! Drake Passage transport.
//!
//! Transport is the depth-integrated zonal velocity through one
//! meridional line of rho-points between South America and the Antarctic
//! Peninsula. By volume conservation it hardly matters which line of the
//! passage is used.
//!
//! The spinup diagnostics reduce the line to a single number per record;
//! the Hovmöller program keeps every cell of it to show where along the
//! section the flow goes.

use ndarray::{s, Array1, Array2};
use serde::Deserialize;

use super::AnalysisError;
use crate::field::is_valid;
use crate::grid::{dy_with_northern_boundary, DEFAULT_NORTHERN_BOUNDARY};
use crate::io::Trim;
use crate::units::SV;

/// Meridional line across the Drake Passage on the circumpolar grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DrakeSection {
    /// Column (xi index) of the line
    pub i: usize,
    /// First row, a land point on the southern tip of South America
    pub j_min: usize,
    /// One past the last row, on the northern tip of the Peninsula. Both
    /// ends must be land but close enough not to reach the Weddell Sea.
    pub j_max: usize,
}

impl Default for DrakeSection {
    fn default() -> Self {
        Self {
            i: 1179,
            j_min: 229,
            j_max: 298,
        }
    }
}

impl DrakeSection {
    pub fn len(&self) -> usize {
        self.j_max.saturating_sub(self.j_min)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values of a 2D field along the section.
    pub fn extract(&self, field: &Array2<f64>) -> Result<Array1<f64>, AnalysisError> {
        let (ny, nx) = field.dim();
        if self.i >= nx || self.j_max > ny || self.j_min >= self.j_max {
            return Err(AnalysisError::InvalidData(format!(
                "Drake Passage section i={}, j={}..{} outside {}x{} grid",
                self.i, self.j_min, self.j_max, ny, nx
            )));
        }
        Ok(field.slice(s![self.j_min..self.j_max, self.i]).to_owned())
    }

    /// Transport per cell of the section (Sv).
    ///
    /// `u` is the rho-point zonal velocity and `dy_wct` the cell width
    /// times water column thickness; masked cells give NaN.
    pub fn cell_transport(&self, u: &Array2<f64>, dy_wct: &Array2<f64>) -> Result<Array1<f64>, AnalysisError> {
        let u = self.extract(u)?;
        let dy_wct = self.extract(dy_wct)?;
        Ok(&u * &dy_wct / SV)
    }

    /// Total transport through the section (Sv), masked cells skipped.
    pub fn transport(&self, u: &Array2<f64>, dy_wct: &Array2<f64>) -> Result<f64, AnalysisError> {
        let per_cell = self.cell_transport(u, dy_wct)?;
        Ok(crate::field::masked_sum(&per_cell))
    }
}

/// Parameters of the Drake Passage Hovmöller figure.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DrakeParams {
    pub section: DrakeSection,
    /// Latitude of the grid's northern boundary
    pub nbdry: f64,
    /// Edges removed from the ocean file's grid fields
    pub trim: Trim,
    /// Rows removed from `angle` and the velocities; the periodic columns
    /// are dropped after rotation
    pub velocity_north_trim: usize,
    pub width: u32,
    pub height: u32,
}

impl Default for DrakeParams {
    fn default() -> Self {
        Self {
            section: DrakeSection::default(),
            nbdry: DEFAULT_NORTHERN_BOUNDARY,
            trim: Trim::new(15, 3),
            velocity_north_trim: 15,
            width: 800,
            height: 600,
        }
    }
}

/// `dy * (h + zice)` with the southern edge of the first row at its own
/// latitude and the last row ending at `nbdry`, masked on land.
pub fn section_dy_wct(
    lat: &Array2<f64>,
    h: &Array2<f64>,
    zice: &Array2<f64>,
    mask_rho: &Array2<f64>,
    nbdry: f64,
) -> Array2<f64> {
    let dy = dy_with_northern_boundary(lat, nbdry);
    crate::grid::dy_wct(&dy, h, zice, mask_rho)
}

/// Largest absolute transport, the symmetric colour bound of the figure.
pub fn colour_bound(transport: &Array2<f64>) -> f64 {
    transport
        .iter()
        .filter(|v| is_valid(**v))
        .fold(0.0, |m: f64, v| m.max(v.abs()))
}

#[cfg(feature = "netcdf")]
pub use self::netcdf_run::run;

#[cfg(feature = "netcdf")]
mod netcdf_run {
    use std::path::Path;

    use log::info;
    use ndarray::{s, Array1, Array2};

    use super::{colour_bound, section_dy_wct, DrakeParams};
    use crate::analysis::AnalysisError;
    use crate::grid::velocity_to_lonlat;
    use crate::io::{NcReader, Trim};
    use crate::plot::{Colorbar, Colormap, Figure, Norm};
    use crate::units::SECONDS_PER_NOLEAP_YEAR;

    /// Compute the latitude-time transport section and save the figure.
    ///
    /// Returns `(time in years, latitude along the section, transport [t, j])`.
    pub fn run(
        grid_path: &Path,
        ocean_path: &Path,
        output: &Path,
        params: &DrakeParams,
    ) -> Result<(Array1<f64>, Array1<f64>, Array2<f64>), AnalysisError> {
        info!("Reading grid");
        let grid = NcReader::open(grid_path)?;
        let velocity_trim = Trim::new(params.velocity_north_trim, 0);
        let angle = velocity_trim.apply(&grid.read_2d("angle")?);

        let ocean = NcReader::open(ocean_path)?;
        let h = params.trim.apply(&ocean.read_2d("h")?);
        let zice = params.trim.apply(&ocean.read_2d("zice")?);
        let lat = params.trim.apply(&ocean.read_2d("lat_rho")?);
        let mask = params.trim.apply(&ocean.read_2d("mask_rho")?);

        let dy_wct = section_dy_wct(&lat, &h, &zice, &mask, params.nbdry);
        let section = params.section;
        let lat_section = section.extract(&lat)?;

        let time = ocean.read_1d("ocean_time")? / SECONDS_PER_NOLEAP_YEAR;
        let n_time = time.len();
        let mut transport = Array2::from_elem((n_time, section.len()), f64::NAN);

        for t in 0..n_time {
            info!("Processing timestep {} of {}", t + 1, n_time);
            let ubar = velocity_trim.apply(&ocean.read_record_2d("ubar", t)?);
            let vbar = velocity_trim.apply(&ocean.read_record_2d("vbar", t)?);
            let (u_lonlat, _) = velocity_to_lonlat(&ubar, &vbar, &angle);
            // Drop the overlapping periodic columns
            let u_lonlat = Trim::new(0, params.trim.east).apply(&u_lonlat);
            let row = section.cell_transport(&u_lonlat, &dy_wct)?;
            transport.slice_mut(s![t, ..]).assign(&row);
        }

        let bound = colour_bound(&transport);
        let cmap = Colormap::rd_yl_bu_r();
        let norm = Norm::linear(-bound, bound);

        let mut figure = Figure::single(params.width, params.height);
        figure
            .panel_mut(0)?
            .pcolor_axes(&time, &lat_section, &transport.t().to_owned(), norm.clone(), &cmap)?
            .colorbar(Colorbar::new(cmap, norm))
            .title("Drake Passage Transport (Sv)")
            .labels("Years", "Latitude");
        figure.save(output)?;

        Ok((time, lat_section, transport))
    }
}
