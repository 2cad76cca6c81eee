//! Temperature/salinity distribution of water masses south of 65°S,
//! coloured by volume-weighted mean depth.
//!
//! Three sources are binned onto the same T/S grid: MetROMS (terrain
//! following), FESOM (prisms under surface triangles) and the SOSE
//! climatology (z-levels). Each cell contributes `depth * volume` and
//! `volume` to its bin; the plotted value is their ratio.
//!
//! Binning runs in two phases. Sources are walked column by column (or
//! element by element) to produce [`TsSample`]s, then the samples are
//! accumulated in walk order. With the `parallel` feature the first phase
//! runs on rayon, and because accumulation order does not change the
//! results are bit-for-bit identical to the serial path.

use log::debug;
use ndarray::{Array1, Array2, Array3};
use serde::Deserialize;

use super::AnalysisError;
use crate::eos::{EquationOfState, FreezingPoint};
use crate::field::{arange, centres, is_valid, linspace, masked_max};
use crate::grid::DEFAULT_NORTHERN_BOUNDARY;
use crate::mesh::FesomMesh;
use crate::vertical::VerticalGridParams;

/// Edges of the temperature and salinity bins.
#[derive(Clone, Debug)]
pub struct TsBins {
    temp_edges: Array1<f64>,
    salt_edges: Array1<f64>,
}

impl TsBins {
    /// `n_edges` evenly spaced edges over each range.
    pub fn new(temp_range: (f64, f64), salt_range: (f64, f64), n_edges: usize) -> Self {
        Self {
            temp_edges: linspace(temp_range.0, temp_range.1, n_edges),
            salt_edges: linspace(salt_range.0, salt_range.1, n_edges),
        }
    }

    pub fn temp_edges(&self) -> &Array1<f64> {
        &self.temp_edges
    }

    pub fn salt_edges(&self) -> &Array1<f64> {
        &self.salt_edges
    }

    pub fn temp_centres(&self) -> Array1<f64> {
        centres(&self.temp_edges)
    }

    pub fn salt_centres(&self) -> Array1<f64> {
        centres(&self.salt_edges)
    }

    /// `(temperature bins, salinity bins)`.
    pub fn shape(&self) -> (usize, usize) {
        (
            self.temp_edges.len().saturating_sub(1),
            self.salt_edges.len().saturating_sub(1),
        )
    }

    /// Bin of `(temp, salt)`, or `None` if either lies outside the edges or
    /// is masked.
    pub fn index(&self, temp: f64, salt: f64) -> Option<(usize, usize)> {
        let ti = bin_index(&self.temp_edges, temp);
        let si = bin_index(&self.salt_edges, salt);
        match (ti, si) {
            (Some(ti), Some(si)) => Some((ti, si)),
            _ => {
                debug!("T/S pair ({}, {}) outside the bins, skipped", temp, salt);
                None
            }
        }
    }

    /// Sample for one cell, if it falls in a bin and has volume.
    pub fn sample(&self, temp: f64, salt: f64, depth: f64, volume: f64) -> Option<TsSample> {
        if !is_valid(volume) || !is_valid(depth) {
            return None;
        }
        self.index(temp, salt).map(|(temp_bin, salt_bin)| TsSample {
            temp_bin,
            salt_bin,
            depth,
            volume,
        })
    }
}

/// Index of the first edge above `value`, minus one.
fn bin_index(edges: &Array1<f64>, value: f64) -> Option<usize> {
    let edges = edges.as_slice()?;
    // NaN compares false, so lands at 0 and is rejected
    let above = edges.partition_point(|&e| e <= value);
    if above == 0 || above == edges.len() {
        None
    } else {
        Some(above - 1)
    }
}

/// One cell's contribution to a bin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TsSample {
    pub temp_bin: usize,
    pub salt_bin: usize,
    /// Positive down (m)
    pub depth: f64,
    /// m³
    pub volume: f64,
}

/// Running `depth * volume` and `volume` per bin, `[temp, salt]`.
#[derive(Clone, Debug)]
pub struct TsDistribution {
    depth_volume: Array2<f64>,
    volume: Array2<f64>,
}

impl TsDistribution {
    pub fn new(bins: &TsBins) -> Self {
        let shape = bins.shape();
        Self {
            depth_volume: Array2::zeros(shape),
            volume: Array2::zeros(shape),
        }
    }

    pub fn add(&mut self, sample: &TsSample) {
        let idx = [sample.temp_bin, sample.salt_bin];
        self.depth_volume[idx] += sample.depth * sample.volume;
        self.volume[idx] += sample.volume;
    }

    /// Accumulate samples in order.
    pub fn extend<'a>(&mut self, samples: impl IntoIterator<Item = &'a TsSample>) {
        for sample in samples {
            self.add(sample);
        }
    }

    /// Total binned volume per bin.
    pub fn volume(&self) -> &Array2<f64> {
        &self.volume
    }

    /// Volume-weighted mean depth; NaN in empty bins.
    pub fn mean_depth(&self) -> Array2<f64> {
        ndarray::Zip::from(&self.depth_volume)
            .and(&self.volume)
            .map_collect(|&dv, &v| if v == 0.0 { f64::NAN } else { dv / v })
    }

    /// Number of non-empty bins.
    pub fn n_filled(&self) -> usize {
        self.volume.iter().filter(|&&v| v != 0.0).count()
    }
}

fn accumulate(bins: &TsBins, groups: Vec<Vec<TsSample>>) -> TsDistribution {
    let mut dist = TsDistribution::new(bins);
    for group in &groups {
        dist.extend(group);
    }
    debug!("{} of {} T/S bins filled", dist.n_filled(), dist.volume.len());
    dist
}

/// Fields of a ROMS run on its 3D rho-grid, `[k, j, i]`.
pub struct RomsTs<'a> {
    pub temp: &'a Array3<f64>,
    pub salt: &'a Array3<f64>,
    pub lat: &'a Array2<f64>,
    /// Cell centre depth (negative)
    pub z: &'a Array3<f64>,
    pub d_v: &'a Array3<f64>,
}

impl RomsTs<'_> {
    fn row_samples(&self, bins: &TsBins, j: usize, nbdry: f64) -> Vec<TsSample> {
        let (n, _, nx) = self.temp.dim();
        let mut out = Vec::new();
        for i in 0..nx {
            // Land
            if !is_valid(self.temp[[0, j, i]]) || self.lat[[j, i]] >= nbdry {
                continue;
            }
            out.extend((0..n).filter_map(|k| {
                bins.sample(
                    self.temp[[k, j, i]],
                    self.salt[[k, j, i]],
                    -self.z[[k, j, i]],
                    self.d_v[[k, j, i]],
                )
            }));
        }
        out
    }

    fn n_rows(&self) -> usize {
        self.temp.dim().1
    }
}

/// Bin a ROMS run: water columns with latitude below `nbdry`.
pub fn bin_roms(bins: &TsBins, roms: &RomsTs<'_>, nbdry: f64) -> TsDistribution {
    let groups = (0..roms.n_rows()).map(|j| roms.row_samples(bins, j, nbdry)).collect();
    accumulate(bins, groups)
}

/// Parallel version of [`bin_roms`].
#[cfg(feature = "parallel")]
pub fn bin_roms_parallel(bins: &TsBins, roms: &RomsTs<'_>, nbdry: f64) -> TsDistribution {
    use rayon::prelude::*;

    let groups = (0..roms.n_rows())
        .into_par_iter()
        .map(|j| roms.row_samples(bins, j, nbdry))
        .collect();
    accumulate(bins, groups)
}

fn element_samples(
    bins: &TsBins,
    mesh: &FesomMesh,
    element: &crate::mesh::FesomElement,
    temp: &Array1<f64>,
    salt: &Array1<f64>,
    nbdry: f64,
) -> Vec<TsSample> {
    if !element.is_south_of(nbdry) {
        return Vec::new();
    }
    let area = element.area();
    let nodes = mesh.nodes();
    let value = |field: &Array1<f64>, id: usize| field.get(id).copied().unwrap_or(f64::NAN);
    mesh.prisms(element)
        .filter_map(|prism| {
            let corners = prism.top.iter().chain(&prism.bottom);
            let mean6 = |f: &dyn Fn(usize) -> f64| corners.clone().map(|&id| f(id)).sum::<f64>() / 6.0;
            let t = mean6(&|id| value(temp, id));
            let s = mean6(&|id| value(salt, id));
            let depth = mean6(&|id| nodes[id].depth);
            let dz = (0..3)
                .map(|c| (nodes[prism.top[c]].depth - nodes[prism.bottom[c]].depth).abs())
                .sum::<f64>()
                / 3.0;
            bins.sample(t, s, depth, area * dz)
        })
        .collect()
}

/// Bin a FESOM run. `temp` and `salt` are indexed by 3D node id; every
/// element entirely south of `nbdry` contributes one sample per prism.
pub fn bin_fesom(
    bins: &TsBins,
    mesh: &FesomMesh,
    temp: &Array1<f64>,
    salt: &Array1<f64>,
    nbdry: f64,
) -> TsDistribution {
    let groups = mesh
        .elements()
        .iter()
        .map(|e| element_samples(bins, mesh, e, temp, salt, nbdry))
        .collect();
    accumulate(bins, groups)
}

/// Parallel version of [`bin_fesom`].
#[cfg(feature = "parallel")]
pub fn bin_fesom_parallel(
    bins: &TsBins,
    mesh: &FesomMesh,
    temp: &Array1<f64>,
    salt: &Array1<f64>,
    nbdry: f64,
) -> TsDistribution {
    use rayon::prelude::*;

    let groups = mesh
        .elements()
        .par_iter()
        .map(|e| element_samples(bins, mesh, e, temp, salt, nbdry))
        .collect();
    accumulate(bins, groups)
}

/// SOSE climatology on its z-level grid.
pub struct SoseTs<'a> {
    pub temp: &'a Array3<f64>,
    pub salt: &'a Array3<f64>,
    pub lat: &'a Array2<f64>,
    /// Level mid-depths (negative)
    pub z: &'a Array1<f64>,
    pub dx: &'a Array2<f64>,
    pub dy: &'a Array2<f64>,
    pub dz: &'a Array1<f64>,
}

impl SoseTs<'_> {
    /// Rows south of the first one whose first latitude exceeds `nbdry`.
    pub fn row_limit(&self, nbdry: f64) -> usize {
        let ny = self.lat.nrows();
        (0..ny).find(|&j| self.lat[[j, 0]] > nbdry).unwrap_or(ny)
    }

    fn level_samples(&self, bins: &TsBins, k: usize, j_max: usize) -> Vec<TsSample> {
        let nx = self.temp.dim().2;
        let mut out = Vec::new();
        for j in 0..j_max {
            for i in 0..nx {
                let t = self.temp[[k, j, i]];
                // Exact zeros are land in the climatology
                if t == 0.0 {
                    continue;
                }
                let d_v = self.dx[[j, i]] * self.dy[[j, i]] * self.dz[k];
                out.extend(bins.sample(t, self.salt[[k, j, i]], -self.z[k], d_v));
            }
        }
        out
    }
}

/// Bin the SOSE climatology south of `nbdry`.
pub fn bin_sose(bins: &TsBins, sose: &SoseTs<'_>, nbdry: f64) -> TsDistribution {
    let j_max = sose.row_limit(nbdry);
    let groups = (0..sose.z.len()).map(|k| sose.level_samples(bins, k, j_max)).collect();
    accumulate(bins, groups)
}

/// Parallel version of [`bin_sose`].
#[cfg(feature = "parallel")]
pub fn bin_sose_parallel(bins: &TsBins, sose: &SoseTs<'_>, nbdry: f64) -> TsDistribution {
    use rayon::prelude::*;

    let j_max = sose.row_limit(nbdry);
    let groups = (0..sose.z.len())
        .into_par_iter()
        .map(|k| sose.level_samples(bins, k, j_max))
        .collect();
    accumulate(bins, groups)
}

/// Potential density anomaly (kg/m³ - 1000) of every bin centre,
/// `[temp, salt]`.
pub fn density_grid(temp_centres: &Array1<f64>, salt_centres: &Array1<f64>) -> Array2<f64> {
    let eos = EquationOfState::new();
    Array2::from_shape_fn((temp_centres.len(), salt_centres.len()), |(t, s)| {
        eos.density(temp_centres[t], salt_centres[s], 0.0) - 1000.0
    })
}

/// Colour boundaries `linspace(0, max^(1/power), n)^power`, packing more
/// colours into shallow water.
pub fn depth_bounds(max_depth: f64, n: usize, power: f64) -> Vec<f64> {
    linspace(0.0, max_depth.powf(1.0 / power), n)
        .iter()
        .map(|b| b.powf(power))
        .collect()
}

/// Surface freezing point along the salinity axis.
pub fn freezing_line(model: FreezingPoint, salt: &Array1<f64>) -> Vec<f64> {
    salt.iter().map(|&s| model.at(s)).collect()
}

/// Largest mean depth over all distributions.
pub fn max_mean_depth(depths: &[&Array2<f64>]) -> Option<f64> {
    depths
        .iter()
        .filter_map(|d| masked_max(*d))
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
}

/// Parameters of the three-panel T/S figure.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TsParams {
    /// Northern boundary of the water masses considered
    pub region_north: f64,
    /// Northern open boundary of the ROMS grid
    pub roms_nbdry: f64,
    pub n_edges: usize,
    pub temp_range: (f64, f64),
    pub salt_range: (f64, f64),
    pub temp_window: (f64, f64),
    pub salt_window: (f64, f64),
    pub vertical: VerticalGridParams,
    pub sose_file: std::path::PathBuf,
    /// `start, stop, step` of the density contours (stop excluded)
    pub density_levels: (f64, f64, f64),
    pub density_label_locations: Vec<(f64, f64)>,
    pub n_colour_bounds: usize,
    pub colour_power: f64,
    pub colorbar_ticks: Vec<f64>,
    pub titles: [String; 3],
    pub suptitle: String,
    pub width: u32,
    pub height: u32,
}

impl Default for TsParams {
    fn default() -> Self {
        Self {
            region_north: -65.0,
            roms_nbdry: DEFAULT_NORTHERN_BOUNDARY,
            n_edges: 1000,
            temp_range: (-3.1, 3.8),
            salt_range: (32.3, 35.1),
            temp_window: (-3.0, 3.8),
            salt_window: (33.25, 35.0),
            vertical: VerticalGridParams::default(),
            sose_file: "../SOSE_annual_climatology.nc".into(),
            density_levels: (26.6, 28.4, 0.2),
            density_label_locations: vec![
                (33.4, 3.0),
                (33.65, 3.0),
                (33.9, 3.0),
                (34.2, 3.0),
                (34.45, 3.5),
                (34.65, 3.25),
                (34.9, 3.0),
                (34.8, 0.0),
            ],
            n_colour_bounds: 100,
            colour_power: 2.5,
            colorbar_ticks: vec![0.0, 50.0, 100.0, 200.0, 500.0, 1000.0, 2000.0, 4000.0],
            titles: [
                "MetROMS, 2002-2016".to_string(),
                "FESOM (high-res), 2002-2016".to_string(),
                "SOSE, 2005-2010".to_string(),
            ],
            suptitle: "Water masses south of 65°S: depth (m)".to_string(),
            width: 2400,
            height: 1000,
        }
    }
}

impl TsParams {
    pub fn bins(&self) -> TsBins {
        TsBins::new(self.temp_range, self.salt_range, self.n_edges)
    }

    pub fn density_levels(&self) -> Vec<f64> {
        let (start, stop, step) = self.density_levels;
        arange(start, stop, step)
    }

    /// Label text for each density label location: the contour level
    /// closest to the density there.
    pub fn density_labels(&self) -> Vec<(f64, f64, String)> {
        let eos = EquationOfState::new();
        let levels = self.density_levels();
        self.density_label_locations
            .iter()
            .filter_map(|&(s, t)| {
                let sigma = eos.density(t, s, 0.0) - 1000.0;
                levels
                    .iter()
                    .copied()
                    .min_by(|a, b| (a - sigma).abs().total_cmp(&(b - sigma).abs()))
                    .map(|level| (s, t, format!("{:.1}", level)))
            })
            .collect()
    }
}

/// The three binned sources.
#[derive(Clone, Debug)]
pub struct TsResult {
    pub roms: TsDistribution,
    pub fesom: TsDistribution,
    pub sose: TsDistribution,
}

/// Convenience check for callers that need a non-empty result.
pub fn require_filled(name: &str, dist: &TsDistribution) -> Result<(), AnalysisError> {
    if dist.n_filled() == 0 {
        return Err(AnalysisError::InvalidData(format!(
            "no {} water south of the region boundary fell in the T/S bins",
            name
        )));
    }
    Ok(())
}

#[cfg(feature = "netcdf")]
pub use self::netcdf_run::{run, TsFiles};

#[cfg(feature = "netcdf")]
mod netcdf_run {
    use std::path::Path;

    use log::info;

    use super::*;
    use crate::grid::{sose_cell_widths, sose_vertical, CartesianGrid3D};
    use crate::io::NcReader;
    use crate::mesh::MeshOptions;
    use crate::plot::{grey, Colorbar, Colormap, Figure, LineStyle, Norm, Panel, BLACK};

    /// Inputs of the T/S figure; the SOSE path comes from the parameters.
    pub struct TsFiles<'a> {
        pub roms_grid: &'a Path,
        /// Time-averaged ROMS temperature and salinity
        pub roms: &'a Path,
        pub fesom_mesh: &'a Path,
        /// Time-averaged FESOM temperature and salinity
        pub fesom: &'a Path,
        pub output: &'a Path,
    }

    #[cfg(feature = "parallel")]
    use super::{bin_fesom_parallel as fesom_binner, bin_roms_parallel as roms_binner, bin_sose_parallel as sose_binner};
    #[cfg(not(feature = "parallel"))]
    use super::{bin_fesom as fesom_binner, bin_roms as roms_binner, bin_sose as sose_binner};

    fn process_roms(files: &TsFiles<'_>, bins: &TsBins, params: &TsParams) -> Result<TsDistribution, AnalysisError> {
        info!("Processing ROMS");
        let grid = NcReader::open(files.roms_grid)?;
        let lon = grid.read_2d("lon_rho")?;
        let lat = grid.read_2d("lat_rho")?;
        let h = grid.read_2d("h")?;
        let zice = grid.read_2d("zice")?;
        let sigma = params.vertical.build();
        let cart = CartesianGrid3D::build(&lon, &lat, &h, &zice, &sigma, params.roms_nbdry);
        let d_v = cart.volume();

        let file = NcReader::open(files.roms)?;
        let temp = file.read_record_3d("temp", 0)?;
        let salt = file.read_record_3d("salt", 0)?;
        let roms = RomsTs {
            temp: &temp,
            salt: &salt,
            lat: &lat,
            z: &cart.z,
            d_v: &d_v,
        };
        Ok(roms_binner(bins, &roms, params.region_north))
    }

    fn process_fesom(files: &TsFiles<'_>, bins: &TsBins, params: &TsParams) -> Result<TsDistribution, AnalysisError> {
        info!("Processing FESOM");
        let mesh = FesomMesh::read(files.fesom_mesh, MeshOptions::default())?;
        let file = NcReader::open(files.fesom)?;
        let temp = file.read_record_1d("temp", 0)?;
        let salt = file.read_record_1d("salt", 0)?;
        Ok(fesom_binner(bins, &mesh, &temp, &salt, params.region_north))
    }

    fn process_sose(bins: &TsBins, params: &TsParams) -> Result<TsDistribution, AnalysisError> {
        info!("Processing SOSE");
        let file = NcReader::open(&params.sose_file)?;
        let lon = file.read_2d("longitude")?;
        let lat = file.read_2d("latitude")?;
        let z = file.read_1d("depth")?;
        let temp = file.read_record_3d("temp", 0)?;
        let salt = file.read_record_3d("salt", 0)?;
        let (dx, dy) = sose_cell_widths(&lon, &lat);
        let (_, dz) = sose_vertical(&z);
        let sose = SoseTs {
            temp: &temp,
            salt: &salt,
            lat: &lat,
            z: &z,
            dx: &dx,
            dy: &dy,
            dz: &dz,
        };
        Ok(sose_binner(bins, &sose, params.region_north))
    }

    fn draw_panel(
        panel: &mut Panel,
        depth: &Array2<f64>,
        bins: &TsBins,
        density: &Array2<f64>,
        norm: &Norm,
        freezing: Option<FreezingPoint>,
        params: &TsParams,
    ) -> Result<(), AnalysisError> {
        let salt = bins.salt_centres();
        let temp = bins.temp_centres();
        let (x, y) = crate::plot::meshgrid(&salt, &temp);
        panel.pcolor(&x, &y, depth, norm.clone(), &Colormap::jet())?;
        if let Some(model) = freezing {
            let salt_vec = salt.to_vec();
            panel.line(&salt_vec, &freezing_line(model, &salt), BLACK, LineStyle::Dashed);
        }
        for level in params.density_levels() {
            panel.contour_line(&x, &y, density, level, grey(0.6), LineStyle::Dotted)?;
        }
        for (s, t, text) in params.density_labels() {
            panel.annotate(s, t, text, 0.0);
        }
        panel.set_limits(
            params.salt_window.0,
            params.salt_window.1,
            params.temp_window.0,
            params.temp_window.1,
        );
        panel.xlabel("Salinity (psu)");
        Ok(())
    }

    /// Bin all three sources and save the figure.
    pub fn run(files: &TsFiles<'_>, params: &TsParams) -> Result<TsResult, AnalysisError> {
        info!("Setting up bins");
        let bins = params.bins();
        let density = density_grid(&bins.temp_centres(), &bins.salt_centres());

        let result = TsResult {
            roms: process_roms(files, &bins, params)?,
            fesom: process_fesom(files, &bins, params)?,
            sose: process_sose(&bins, params)?,
        };
        require_filled("ROMS", &result.roms)?;
        require_filled("FESOM", &result.fesom)?;
        require_filled("SOSE", &result.sose)?;

        let depths = [
            result.roms.mean_depth(),
            result.fesom.mean_depth(),
            result.sose.mean_depth(),
        ];
        let max_depth = max_mean_depth(&[&depths[0], &depths[1], &depths[2]])
            .ok_or_else(|| AnalysisError::InvalidData("no binned water".to_string()))?;
        let norm = Norm::boundary(depth_bounds(max_depth, params.n_colour_bounds, params.colour_power))?;

        info!("Plotting");
        let mut figure = Figure::new(params.width, params.height, 1, 3);
        let freezing = [Some(FreezingPoint::Cice), Some(FreezingPoint::Fesom), None];
        for (i, depth) in depths.iter().enumerate() {
            let panel = figure.panel_mut(i)?;
            draw_panel(panel, depth, &bins, &density, &norm, freezing[i], params)?;
            panel.title(params.titles[i].clone());
            if i == 0 {
                panel.labels("Salinity (psu)", "Temperature (°C)");
            }
            if i == 2 {
                panel.colorbar(Colorbar::new(Colormap::jet(), norm.clone()).with_ticks(params.colorbar_ticks.clone()));
            }
        }
        figure.title(params.suptitle.clone());
        figure.save(files.output)?;

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3};

    fn small_bins() -> TsBins {
        // Edges every 1 °C and 0.5 psu
        TsBins::new((-2.0, 2.0), (33.0, 35.0), 5)
    }

    #[test]
    fn test_bin_index_edges() {
        let edges = array![0.0, 1.0, 2.0, 3.0];
        assert_eq!(bin_index(&edges, 0.0), Some(0));
        assert_eq!(bin_index(&edges, 0.999), Some(0));
        assert_eq!(bin_index(&edges, 1.0), Some(1));
        assert_eq!(bin_index(&edges, 2.5), Some(2));
        // Last edge and beyond have no edge above them
        assert_eq!(bin_index(&edges, 3.0), None);
        assert_eq!(bin_index(&edges, -0.1), None);
        assert_eq!(bin_index(&edges, f64::NAN), None);
    }

    #[test]
    fn test_default_bins() {
        let bins = TsParams::default().bins();
        assert_eq!(bins.shape(), (999, 999));
        let tc = bins.temp_centres();
        assert!((tc[0] - (-3.1 + 0.5 * 6.9 / 999.0)).abs() < 1e-12);
        assert_eq!(bins.index(-1.8, 34.5).map(|(t, _)| t), Some(188));
    }

    #[test]
    fn test_mean_depth_weighting() {
        let bins = small_bins();
        let mut dist = TsDistribution::new(&bins);
        dist.extend(&[
            bins.sample(0.5, 34.5, 100.0, 1.0).unwrap(),
            bins.sample(0.6, 34.6, 400.0, 3.0).unwrap(),
        ]);
        let depth = dist.mean_depth();
        let (ti, si) = bins.index(0.5, 34.5).unwrap();
        assert!((depth[[ti, si]] - 325.0).abs() < 1e-12);
        assert!(depth[[0, 0]].is_nan());
        assert_eq!(dist.n_filled(), 1);
    }

    fn roms_fixture() -> (Array3<f64>, Array3<f64>, Array2<f64>, Array3<f64>, Array3<f64>) {
        // 2 levels, 1 row, 3 columns: south, north of the region, land
        let temp = Array3::from_shape_vec((2, 1, 3), vec![0.5, 0.5, f64::NAN, -1.5, -1.5, f64::NAN]).unwrap();
        let salt = Array3::from_elem((2, 1, 3), 34.5);
        let lat = array![[-70.0, -60.0, -70.0]];
        let z = Array3::from_shape_vec((2, 1, 3), vec![-300.0, -300.0, -300.0, -100.0, -100.0, -100.0]).unwrap();
        let d_v = Array3::from_elem((2, 1, 3), 2.0);
        (temp, salt, lat, z, d_v)
    }

    #[test]
    fn test_bin_roms_region_and_land() {
        let bins = small_bins();
        let (temp, salt, lat, z, d_v) = roms_fixture();
        let roms = RomsTs {
            temp: &temp,
            salt: &salt,
            lat: &lat,
            z: &z,
            d_v: &d_v,
        };
        let dist = bin_roms(&bins, &roms, -65.0);
        assert_eq!(dist.n_filled(), 2);
        let (ti, si) = bins.index(0.5, 34.5).unwrap();
        assert_eq!(dist.volume()[[ti, si]], 2.0);
        assert_eq!(dist.mean_depth()[[ti, si]], 300.0);
        let (ti, si) = bins.index(-1.5, 34.5).unwrap();
        assert_eq!(dist.mean_depth()[[ti, si]], 100.0);
    }

    #[test]
    fn test_bin_sose_zero_is_land() {
        let bins = small_bins();
        let temp = Array3::from_shape_vec((1, 3, 2), vec![1.5, 0.0, 1.5, 1.5, 1.5, 1.5]).unwrap();
        let salt = Array3::from_elem((1, 3, 2), 34.2);
        let lat = array![[-70.0, -70.0], [-66.0, -66.0], [-60.0, -60.0]];
        let z = array![-5.0];
        let dx = Array2::from_elem((3, 2), 2.0);
        let dy = Array2::from_elem((3, 2), 3.0);
        let dz = array![10.0];
        let sose = SoseTs {
            temp: &temp,
            salt: &salt,
            lat: &lat,
            z: &z,
            dx: &dx,
            dy: &dy,
            dz: &dz,
        };
        assert_eq!(sose.row_limit(-65.0), 2);
        let dist = bin_sose(&bins, &sose, -65.0);
        let (ti, si) = bins.index(1.5, 34.2).unwrap();
        // Three ocean cells in the two southern rows
        assert_eq!(dist.volume()[[ti, si]], 180.0);
        assert_eq!(dist.mean_depth()[[ti, si]], 5.0);
    }

    #[test]
    fn test_bin_fesom_prisms() {
        // One element of three columns with two layers each
        let nod2d = "3\n1 -10.0 -70.0 0\n2 -9.0 -70.0 0\n3 -10.0 -69.0 0\n";
        let elem2d = "1\n1 2 3\n";
        let nod3d = "9\n\
            1 -10.0 -70.0 0.0 0\n2 -9.0 -70.0 0.0 0\n3 -10.0 -69.0 0.0 0\n\
            4 -10.0 -70.0 -100.0 0\n5 -9.0 -70.0 -100.0 0\n6 -10.0 -69.0 -100.0 0\n\
            7 -10.0 -70.0 -300.0 0\n8 -9.0 -70.0 -300.0 0\n9 -10.0 -69.0 -300.0 0\n";
        let aux3d = "3\n1 4 7\n2 5 8\n3 6 9\n";
        let mesh = FesomMesh::parse(nod2d, elem2d, nod3d, aux3d, crate::mesh::MeshOptions::default()).unwrap();
        let temp = Array1::from_elem(9, 0.5);
        let salt = Array1::from_elem(9, 34.5);
        let bins = small_bins();
        let dist = bin_fesom(&bins, &mesh, &temp, &salt, -65.0);
        let (ti, si) = bins.index(0.5, 34.5).unwrap();
        let area = mesh.elements()[0].area();
        assert!((dist.volume()[[ti, si]] - area * 300.0).abs() / (area * 300.0) < 1e-12);
        // (50 * 100 + 200 * 200) / 300
        assert!((dist.mean_depth()[[ti, si]] - 150.0).abs() < 1e-9);

        let north = bin_fesom(&bins, &mesh, &temp, &salt, -75.0);
        assert_eq!(north.n_filled(), 0);
    }

    #[test]
    fn test_density_and_bounds() {
        let density = density_grid(&array![0.0], &array![34.5]);
        assert!((density[[0, 0]] - 27.7).abs() < 0.1);

        let bounds = depth_bounds(1000.0, 100, 2.5);
        assert_eq!(bounds.len(), 100);
        assert_eq!(bounds[0], 0.0);
        assert!((bounds[99] - 1000.0).abs() < 1e-9);
        // Denser near the surface
        assert!(bounds[1] - bounds[0] < bounds[99] - bounds[98]);

        let levels = TsParams::default().density_levels();
        assert_eq!(levels.len(), 9);
        assert!((levels[8] - 28.2).abs() < 1e-9);
    }

    #[test]
    fn test_max_mean_depth() {
        let a = array![[f64::NAN, 10.0]];
        let b = array![[300.0, f64::NAN]];
        assert_eq!(max_mean_depth(&[&a, &b]), Some(300.0));
        assert_eq!(max_mean_depth(&[&array![[f64::NAN]]]), None);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_serial() {
        let bins = small_bins();
        let (temp, salt, lat, z, d_v) = roms_fixture();
        let roms = RomsTs {
            temp: &temp,
            salt: &salt,
            lat: &lat,
            z: &z,
            d_v: &d_v,
        };
        let serial = bin_roms(&bins, &roms, -65.0);
        let parallel = bin_roms_parallel(&bins, &roms, -65.0);
        assert_eq!(serial.volume(), parallel.volume());
        assert_eq!(
            serial.mean_depth().iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
            parallel.mean_depth().iter().map(|v| v.to_bits()).collect::<Vec<_>>()
        );
    }
}
