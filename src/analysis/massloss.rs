//! Change in ice shelf basal mass loss between two FESOM resolutions,
//! mapped onto the ROMS grid.
//!
//! FESOM post-processing logs a mass loss time series for each of 23 ice
//! shelves. The mean over the observation period of both runs gives a
//! percentage change per shelf, which is painted onto every ROMS ice shelf
//! cell inside that shelf's bounding box(es).

use std::ops::Range;

use log::info;
use ndarray::{Array2, Zip};
use serde::Deserialize;

use super::AnalysisError;
use crate::field::{is_valid, linspace, masked_max, masked_min};
use crate::grid::{plot_bound, MissingCircle};
use crate::io::{MassLossLog, Trim};

/// Longitude/latitude box of (part of) one ice shelf.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct ShelfBox {
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
}

impl ShelfBox {
    pub const fn new(lon_min: f64, lon_max: f64, lat_min: f64, lat_max: f64) -> Self {
        Self {
            lon_min,
            lon_max,
            lat_min,
            lat_max,
        }
    }

    /// Inclusive on every edge.
    #[inline]
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.lon_min && lon <= self.lon_max && lat >= self.lat_min && lat <= self.lat_max
    }
}

/// A named ice shelf; the Ross Ice Shelf straddles the dateline and so
/// needs two boxes.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct IceShelf {
    pub name: String,
    pub boxes: Vec<ShelfBox>,
}

impl IceShelf {
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        self.boxes.iter().any(|b| b.contains(lon, lat))
    }
}

const SHELVES: [(&str, ShelfBox); 23] = [
    ("Larsen D Ice Shelf", ShelfBox::new(-62.67, -59.33, -73.03, -69.37)),
    ("Larsen C Ice Shelf", ShelfBox::new(-65.5, -60.0, -69.35, -66.13)),
    ("Wilkins & George VI & Stange Ice Shelves", ShelfBox::new(-79.17, -66.67, -74.17, -69.5)),
    ("Ronne-Filchner Ice Shelf", ShelfBox::new(-85.0, -28.33, -83.5, -74.67)),
    ("Abbot Ice Shelf", ShelfBox::new(-104.17, -88.83, -73.28, -71.67)),
    ("Pine Island Glacier Ice Shelf", ShelfBox::new(-102.5, -99.17, -75.5, -74.17)),
    ("Thwaites Ice Shelf", ShelfBox::new(-108.33, -103.33, -75.5, -74.67)),
    ("Dotson Ice Shelf", ShelfBox::new(-114.5, -111.5, -75.33, -73.67)),
    ("Getz Ice Shelf", ShelfBox::new(-135.67, -114.33, -74.9, -73.0)),
    ("Nickerson Ice Shelf", ShelfBox::new(-149.17, -140.0, -76.42, -75.17)),
    ("Sulzberger Ice Shelf", ShelfBox::new(-155.0, -145.0, -78.0, -76.41)),
    ("Mertz Ice Shelf", ShelfBox::new(144.0, 146.62, -67.83, -66.67)),
    ("Totten & Moscow University Ice Shelves", ShelfBox::new(115.0, 123.33, -67.17, -66.5)),
    ("Shackleton Ice Shelf", ShelfBox::new(94.17, 102.5, -66.67, -64.83)),
    ("West Ice Shelf", ShelfBox::new(80.83, 89.17, -67.83, -66.17)),
    ("Amery Ice Shelf", ShelfBox::new(65.0, 75.0, -73.67, -68.33)),
    ("Prince Harald Ice Shelf", ShelfBox::new(33.83, 37.67, -69.83, -68.67)),
    ("Baudouin & Borchgrevink Ice Shelves", ShelfBox::new(19.0, 33.33, -71.67, -68.33)),
    ("Lazarev Ice Shelf", ShelfBox::new(12.9, 16.17, -70.5, -69.33)),
    ("Nivl Ice Shelf", ShelfBox::new(9.33, 12.88, -70.75, -69.83)),
    ("Fimbul & Jelbart & Ekstrom Ice Shelves", ShelfBox::new(-10.05, 7.6, -71.83, -69.33)),
    ("Brunt & Riiser-Larsen Ice Shelves", ShelfBox::new(-28.33, -10.33, -76.33, -71.5)),
    ("Ross Ice Shelf", ShelfBox::new(-181.0, -146.67, -85.0, -77.77)),
];

/// Eastern half of the Ross Ice Shelf, west of the dateline.
const ROSS_EAST: ShelfBox = ShelfBox::new(158.33, 181.0, -84.5, -77.0);

/// The 23 ice shelves of the FESOM mass loss logs, in log order.
pub fn antarctic_ice_shelves() -> Vec<IceShelf> {
    SHELVES
        .iter()
        .map(|(name, b)| {
            let mut boxes = vec![*b];
            if *name == "Ross Ice Shelf" {
                boxes.push(ROSS_EAST);
            }
            IceShelf {
                name: name.to_string(),
                boxes,
            }
        })
        .collect()
}

/// Parameters of the mass loss difference map.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MassLossParams {
    pub year_start: i32,
    pub obs_start: i32,
    pub obs_end: i32,
    /// Records per year (five-day output)
    pub per_year: usize,
    pub shelves: Vec<IceShelf>,
    pub trim: Trim,
    pub northern_limit: f64,
    pub circle: MissingCircle,
    pub min_zice: f64,
    /// Number of filled contour levels
    pub n_levels: usize,
    pub tick_step: f64,
    pub width: u32,
    pub height: u32,
}

impl Default for MassLossParams {
    fn default() -> Self {
        Self {
            year_start: 1992,
            obs_start: 2002,
            obs_end: 2016,
            per_year: 365 / 5,
            shelves: antarctic_ice_shelves(),
            trim: Trim::new(15, 1),
            northern_limit: -63.0,
            circle: MissingCircle::default(),
            min_zice: -10.0,
            n_levels: 50,
            tick_step: 25.0,
            width: 1600,
            height: 1200,
        }
    }
}

impl MassLossParams {
    /// Log records covering `obs_start..=obs_end`.
    pub fn averaging_records(&self) -> Result<Range<usize>, AnalysisError> {
        let offset = |year: i32| -> Result<usize, AnalysisError> {
            usize::try_from(year - self.year_start)
                .map(|y| y * self.per_year)
                .map_err(|_| {
                    AnalysisError::InvalidData(format!(
                        "year {} precedes the simulation start {}",
                        year, self.year_start
                    ))
                })
        };
        Ok(offset(self.obs_start)?..offset(self.obs_end + 1)?)
    }

    pub fn title(&self) -> String {
        format!(
            "% Change in Ice Shelf Mass Loss ({}-{} average)\nfrom increased resolution in FESOM",
            self.obs_start, self.obs_end
        )
    }

    pub fn bound(&self) -> f64 {
        plot_bound(self.northern_limit)
    }
}

/// Percentage change `(hr - lr) / lr * 100` of each shelf's mean mass loss.
pub fn percent_change(
    low_res: &MassLossLog,
    high_res: &MassLossLog,
    records: Range<usize>,
) -> Result<Vec<f64>, AnalysisError> {
    let lr = low_res.mean_over(records.clone())?;
    let hr = high_res.mean_over(records)?;
    if lr.len() != hr.len() {
        return Err(AnalysisError::InvalidData(format!(
            "logs disagree on the number of shelves: {} and {}",
            lr.len(),
            hr.len()
        )));
    }
    Ok(lr.iter().zip(&hr).map(|(lr, hr)| (hr - lr) / lr * 100.0).collect())
}

/// Longitudes in `[-180, 180]`.
pub fn normalise_lon(lon: &Array2<f64>) -> Array2<f64> {
    lon.mapv(|l| if l > 180.0 { l - 360.0 } else { l })
}

/// Paint each shelf's value onto the ice shelf cells (`mask_zice == 1`)
/// inside its boxes. Later shelves win where boxes overlap; other cells are
/// NaN.
pub fn paint_shelves(
    lon: &Array2<f64>,
    lat: &Array2<f64>,
    mask_zice: &Array2<f64>,
    shelves: &[IceShelf],
    values: &[f64],
) -> Array2<f64> {
    let mut out = Array2::from_elem(lon.dim(), f64::NAN);
    for (shelf, &value) in shelves.iter().zip(values) {
        Zip::from(&mut out)
            .and(lon)
            .and(lat)
            .and(mask_zice)
            .for_each(|o, &lon, &lat, &m| {
                if m == 1.0 && shelf.contains(lon, lat) {
                    *o = value;
                }
            });
    }
    out
}

/// Ice draft with cells that received no shelf value zeroed, so the ice
/// front contour skips shelves too small to be in the logs.
pub fn zice_for_contour(zice: &Array2<f64>, painted: &Array2<f64>) -> Array2<f64> {
    let mut out = zice.clone();
    Zip::from(&mut out).and(painted).for_each(|z, &p| {
        if !is_valid(p) {
            *z = 0.0;
        }
    });
    out
}

/// Colour scale of the map: levels from the smallest to the largest change
/// and the sub-range of a symmetric map that they occupy.
#[derive(Clone, Debug, PartialEq)]
pub struct ChangeScale {
    pub levels: Vec<f64>,
    /// Largest absolute change
    pub bound: f64,
    /// Start of the used part of the colour map, in `[0, 1]`
    pub min_colour: f64,
}

impl ChangeScale {
    pub fn new(painted: &Array2<f64>, n_levels: usize) -> Result<Self, AnalysisError> {
        let (min, max) = masked_min(painted)
            .zip(masked_max(painted))
            .ok_or_else(|| AnalysisError::InvalidData("no ice shelf cells were painted".to_string()))?;
        let bound = min.abs().max(max.abs());
        let min_colour = if bound > 0.0 {
            (min + bound) / (2.0 * bound)
        } else {
            0.5
        };
        Ok(Self {
            levels: linspace(min, max, n_levels).to_vec(),
            bound,
            min_colour,
        })
    }
}

/// Log each shelf's change as `name: value`.
pub fn report(shelves: &[IceShelf], change: &[f64]) {
    for (shelf, value) in shelves.iter().zip(change) {
        info!("{}: {}", shelf.name, value);
    }
}

#[cfg(feature = "netcdf")]
pub use self::netcdf_run::run;

#[cfg(feature = "netcdf")]
mod netcdf_run {
    use std::path::Path;

    use ndarray::Array2;

    use super::*;
    use crate::analysis::maps::{circumpolar_window, shade_land};
    use crate::field::arange;
    use crate::grid::polar_grid;
    use crate::io::NcReader;
    use crate::plot::{Colorbar, Colormap, Extend, Figure, LineStyle, Norm, BLACK};

    /// Read both logs and the ROMS grid, then save the map. Returns the
    /// per-shelf percentage changes.
    pub fn run(
        roms_grid: &Path,
        log_low_res: &Path,
        log_high_res: &Path,
        output: &Path,
        params: &MassLossParams,
    ) -> Result<Vec<f64>, AnalysisError> {
        let n_shelves = params.shelves.len();
        let low = MassLossLog::read(log_low_res, n_shelves)?;
        let high = MassLossLog::read(log_high_res, n_shelves)?;
        let change = percent_change(&low, &high, params.averaging_records()?)?;
        report(&params.shelves, &change);

        let grid = NcReader::open(roms_grid)?;
        let trim = params.trim;
        let lon = normalise_lon(&trim.apply(&grid.read_2d("lon_rho")?));
        let lat = trim.apply(&grid.read_2d("lat_rho")?);
        let mask_rho = trim.apply(&grid.read_2d("mask_rho")?);
        let mask_zice = trim.apply(&grid.read_2d("mask_zice")?);
        let zice = trim.apply(&grid.read_2d("zice")?);

        let painted = paint_shelves(&lon, &lat, &mask_zice, &params.shelves, &change);
        let zice = zice_for_contour(&zice, &painted);
        let scale = ChangeScale::new(&painted, params.n_levels)?;
        let cmap = Colormap::rd_bu_r().truncate(scale.min_colour, 1.0);

        // Open ocean is 1; land and every ice shelf cell are shaded
        let open_ocn: Array2<f64> = Zip::from(&mask_rho)
            .and(&mask_zice)
            .map_collect(|&m, &z| if z == 1.0 { 0.0 } else { m });

        let (x, y) = polar_grid(&lon, &lat);
        let mut figure = Figure::single(params.width, params.height);
        let panel = figure.panel_mut(0)?;
        shade_land(panel, &x, &y, &open_ocn, &params.circle)?;
        panel.contourf(&x, &y, &painted, &scale.levels, &cmap, Extend::Neither)?;
        let (lo, hi) = (scale.levels[0], scale.levels[scale.levels.len() - 1]);
        panel.colorbar(
            Colorbar::new(cmap, Norm::linear(lo, hi))
                .with_ticks(arange(0.0, scale.bound + params.tick_step, params.tick_step)),
        );
        panel.contour_line(&x, &y, &zice, params.min_zice, BLACK, LineStyle::Solid)?;
        circumpolar_window(panel, params.bound());
        panel.title(params.title());
        figure.save(output)?;

        Ok(change)
    }
}
