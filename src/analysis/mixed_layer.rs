//! Mixed layer depth of two experiments on one day, and their difference.
//!
//! The KPP boundary layer depth `Hsbl` is stored negative; the figure shows
//! its magnitude for the reference experiment and the change in the
//! second experiment, with ice shelf cavities masked out.

use std::path::PathBuf;

use ndarray::{s, Array2};
use serde::Deserialize;

use crate::field::masked_where;
use crate::grid::{default_lon_labels, LonLabel, MissingCircle};

/// Parameters of the two-panel mixed layer depth figure.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MixedLayerParams {
    /// Directory holding one subdirectory per experiment
    pub root: PathBuf,
    /// Reference experiment first
    pub experiments: [String; 2],
    pub titles: [String; 2],
    pub file_tail: String,
    /// 1-based record of the day shown (236 is 23 August)
    pub time_index: usize,
    /// Rows kept from the south
    pub n_rows: usize,
    /// Leading columns dropped
    pub first_column: usize,
    pub max_depth: f64,
    pub depth_tick: f64,
    pub max_anomaly: f64,
    pub anomaly_tick: f64,
    pub circle: MissingCircle,
    pub lon_labels: Vec<LonLabel>,
    pub suptitle: String,
    pub width: u32,
    pub height: u32,
}

impl Default for MixedLayerParams {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            experiments: ["u3_lim".to_string(), "c4_l".to_string()],
            titles: ["a) U3_LIM".to_string(), "b) C4_LD - U3_LIM".to_string()],
            file_tail: "ocean_avg_0001.nc".to_string(),
            time_index: 236,
            n_rows: 350,
            first_column: 1,
            max_depth: 600.0,
            depth_tick: 200.0,
            max_anomaly: 300.0,
            anomaly_tick: 150.0,
            circle: MissingCircle::new(10.5, 20.0, 100),
            lon_labels: default_lon_labels(),
            suptitle: "Mixed layer depth (m) on 23 August".to_string(),
            width: 2000,
            height: 1000,
        }
    }
}

impl MixedLayerParams {
    /// Output file of experiment `i`.
    pub fn experiment_file(&self, i: usize) -> PathBuf {
        self.root.join(&self.experiments[i]).join(&self.file_tail)
    }

    /// Rows `..n_rows`, columns `first_column..` of a 2D field.
    pub fn window(&self, field: &Array2<f64>) -> Array2<f64> {
        let (ny, nx) = field.dim();
        let rows = self.n_rows.min(ny);
        let first = self.first_column.min(nx);
        field.slice(s![..rows, first..]).to_owned()
    }
}

/// Mixed layer depth as a positive number, masked in ice shelf cavities.
pub fn mixed_layer_depth(hsbl: &Array2<f64>, zice: &Array2<f64>) -> Array2<f64> {
    masked_where(&hsbl.mapv(|h| -h), zice, |z| z != 0.0)
}

/// `experiment - reference`; masked wherever either is.
pub fn anomaly(reference: &Array2<f64>, experiment: &Array2<f64>) -> Array2<f64> {
    experiment - reference
}

#[cfg(feature = "netcdf")]
pub use self::netcdf_run::run;

#[cfg(feature = "netcdf")]
mod netcdf_run {
    use std::path::Path;

    use log::info;
    use ndarray::Array2;

    use super::{anomaly, mixed_layer_depth, MixedLayerParams};
    use crate::analysis::maps::{label_longitudes, open_ocean, shade_land};
    use crate::analysis::AnalysisError;
    use crate::field::arange;
    use crate::grid::polar_grid;
    use crate::io::NcReader;
    use crate::plot::{Colorbar, Colormap, Extend, Figure, Norm};

    fn read_hsbl(path: &Path, params: &MixedLayerParams) -> Result<(NcReader, Array2<f64>), AnalysisError> {
        info!("Reading {}", path.display());
        let file = NcReader::open(path)?;
        let t = params.time_index.checked_sub(1).ok_or_else(|| {
            AnalysisError::InvalidData("time_index is 1-based".to_string())
        })?;
        let hsbl = params.window(&file.read_record_2d("Hsbl", t)?);
        Ok((file, hsbl))
    }

    /// Build the figure; returns the reference depth and the anomaly.
    pub fn run(output: &Path, params: &MixedLayerParams) -> Result<(Array2<f64>, Array2<f64>), AnalysisError> {
        let (file, hsbl) = read_hsbl(&params.experiment_file(0), params)?;
        let lon = params.window(&file.read_2d("lon_rho")?);
        let lat = params.window(&file.read_2d("lat_rho")?);
        let mask = params.window(&file.read_2d("mask_rho")?);
        let zice = params.window(&file.read_2d("zice")?);
        let reference = mixed_layer_depth(&hsbl, &zice);

        let (_, hsbl) = read_hsbl(&params.experiment_file(1), params)?;
        let change = anomaly(&reference, &mixed_layer_depth(&hsbl, &zice));

        let (x, y) = polar_grid(&lon, &lat);
        let open_ocn = open_ocean(&mask, &zice);
        let mut figure = Figure::new(params.width, params.height, 1, 2);

        let panels = [
            (
                &reference,
                Colormap::jet(),
                Norm::linear(0.0, params.max_depth),
                arange(0.0, params.max_depth + params.depth_tick, params.depth_tick),
                Extend::Max,
            ),
            (
                &change,
                Colormap::rd_bu_r(),
                Norm::linear(-params.max_anomaly, params.max_anomaly),
                arange(
                    -params.max_anomaly,
                    params.max_anomaly + params.anomaly_tick,
                    params.anomaly_tick,
                ),
                Extend::Both,
            ),
        ];

        for (i, (field, cmap, norm, ticks, extend)) in panels.into_iter().enumerate() {
            let panel = figure.panel_mut(i)?;
            shade_land(panel, &x, &y, &open_ocn, &params.circle)?;
            panel.pcolor(&x, &y, field, norm.clone(), &cmap)?;
            if i == 0 {
                label_longitudes(panel, &params.lon_labels);
            }
            // Window follows the data, which reaches the longitude labels
            panel.axis_off();
            panel
                .title(params.titles[i].clone())
                .colorbar(Colorbar::new(cmap, norm).with_ticks(ticks).with_extend(extend));
        }
        figure.title(params.suptitle.clone());
        figure.save(output)?;

        Ok((reference, change))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_depth_sign_and_cavity_mask() {
        let hsbl = array![[-120.0, -50.0]];
        let zice = array![[0.0, -300.0]];
        let mld = mixed_layer_depth(&hsbl, &zice);
        assert_eq!(mld[[0, 0]], 120.0);
        assert!(mld[[0, 1]].is_nan());
    }

    #[test]
    fn test_anomaly_propagates_mask() {
        let a = array![[100.0, f64::NAN]];
        let b = array![[40.0, 10.0]];
        let d = anomaly(&a, &b);
        assert_eq!(d[[0, 0]], -60.0);
        assert!(d[[0, 1]].is_nan());
    }

    #[test]
    fn test_window() {
        let params = MixedLayerParams {
            n_rows: 2,
            ..MixedLayerParams::default()
        };
        let field = Array2::from_shape_fn((4, 3), |(j, i)| (10 * j + i) as f64);
        let w = params.window(&field);
        assert_eq!(w, array![[1.0, 2.0], [11.0, 12.0]]);
    }

    #[test]
    fn test_experiment_paths() {
        let params = MixedLayerParams::default();
        assert_eq!(
            params.experiment_file(1),
            PathBuf::from("./c4_l/ocean_avg_0001.nc")
        );
        assert_eq!(params.circle.boundary, 20.0);
        assert_eq!(params.lon_labels.len(), 5);
    }
}
