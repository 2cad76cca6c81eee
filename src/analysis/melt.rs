//! Circumpolar map of ice shelf basal melt rates.

use ndarray::{Array2, Zip};
use serde::Deserialize;

use super::AnalysisError;
use crate::field::{is_valid, linspace, masked_where};
use crate::grid::{plot_bound, MissingCircle};
use crate::io::Trim;
use crate::units::ms_to_my;

/// Parameters of the melt rate map.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MeltParams {
    /// Edges removed from every field
    pub trim: Trim,
    /// Average the last `n` records instead of showing the first one
    /// (73 five-day averages make a year)
    pub average_last: Option<usize>,
    /// Northernmost latitude shown
    pub northern_limit: f64,
    pub circle: MissingCircle,
    /// Ice draft of the black ice front contour
    pub min_zice: f64,
    pub width: u32,
    pub height: u32,
}

impl Default for MeltParams {
    fn default() -> Self {
        Self {
            trim: Trim::new(15, 1),
            average_last: None,
            northern_limit: -63.0,
            circle: MissingCircle::default(),
            min_zice: -10.0,
            width: 1600,
            height: 1200,
        }
    }
}

/// Melt rate in m/y, masked outside ice shelf cavities.
pub fn melt_rate_my(m: &Array2<f64>, zice: &Array2<f64>) -> Array2<f64> {
    masked_where(&m.mapv(ms_to_my), zice, |z| z == 0.0)
}

/// Cell-wise mean over records, ignoring masked values. Cells masked in
/// every record stay masked.
pub fn record_mean(records: &[Array2<f64>]) -> Result<Array2<f64>, AnalysisError> {
    let first = records
        .first()
        .ok_or_else(|| AnalysisError::InvalidData("no records to average".to_string()))?;
    let mut sum = Array2::<f64>::zeros(first.dim());
    let mut count = Array2::<f64>::zeros(first.dim());
    for record in records {
        if record.dim() != first.dim() {
            return Err(AnalysisError::InvalidData(format!(
                "record shape {:?} differs from {:?}",
                record.dim(),
                first.dim()
            )));
        }
        Zip::from(&mut sum).and(&mut count).and(record).for_each(|s, c, &v| {
            if is_valid(v) {
                *s += v;
                *c += 1.0;
            }
        });
    }
    Ok(Zip::from(&sum)
        .and(&count)
        .map_collect(|&s, &c| if c > 0.0 { s / c } else { f64::NAN }))
}

/// Contour levels of the melt/freeze colour map.
pub fn melt_levels() -> Vec<f64> {
    linspace(-0.1, 8.0, 100).to_vec()
}

/// Record indices to read: the first record, or the last `n`.
pub fn records_to_read(n_records: usize, average_last: Option<usize>) -> Result<std::ops::Range<usize>, AnalysisError> {
    match average_last {
        None if n_records > 0 => Ok(0..1),
        Some(n) if n > 0 && n <= n_records => Ok(n_records - n..n_records),
        _ => Err(AnalysisError::InvalidData(format!(
            "cannot take {:?} records from a file with {}",
            average_last, n_records
        ))),
    }
}

impl MeltParams {
    pub fn bound(&self) -> f64 {
        plot_bound(self.northern_limit)
    }
}

#[cfg(feature = "netcdf")]
pub use self::netcdf_run::run;

#[cfg(feature = "netcdf")]
mod netcdf_run {
    use std::path::Path;

    use log::info;
    use ndarray::Array2;

    use super::{melt_levels, melt_rate_my, record_mean, records_to_read, MeltParams};
    use crate::analysis::maps::{circumpolar_window, open_ocean, shade_land};
    use crate::analysis::AnalysisError;
    use crate::grid::polar_grid;
    use crate::io::NcReader;
    use crate::plot::{Colorbar, Colormap, Extend, Figure, LineStyle, Norm, BLACK};

    /// Read melt rates from an ocean averages file and save the map.
    pub fn run(ocean_path: &Path, output: &Path, params: &MeltParams) -> Result<Array2<f64>, AnalysisError> {
        let file = NcReader::open(ocean_path)?;
        let trim = params.trim;
        let lon = trim.apply(&file.read_2d("lon_rho")?);
        let lat = trim.apply(&file.read_2d("lat_rho")?);
        let mask_rho = trim.apply(&file.read_2d("mask_rho")?);
        let zice = trim.apply(&file.read_2d("zice")?);

        let records = records_to_read(file.n_records("m")?, params.average_last)?;
        info!("Reading melt rate records {}..{}", records.start, records.end);
        let m = records
            .map(|t| -> Result<Array2<f64>, AnalysisError> {
                Ok(trim.apply(&file.read_record_2d("m", t)?))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let ismr = melt_rate_my(&record_mean(&m)?, &zice);

        let (x, y) = polar_grid(&lon, &lat);
        let open_ocn = open_ocean(&mask_rho, &zice);
        let levels = melt_levels();
        let cmap = Colormap::melt_freeze();

        let mut figure = Figure::single(params.width, params.height);
        let panel = figure.panel_mut(0)?;
        shade_land(panel, &x, &y, &open_ocn, &params.circle)?;
        panel.contourf(&x, &y, &ismr, &levels, &cmap, Extend::Both)?;
        panel.colorbar(
            Colorbar::new(cmap, Norm::linear(levels[0], levels[levels.len() - 1]))
                .with_ticks((0..=8).map(f64::from).collect())
                .with_extend(Extend::Both),
        );
        panel.contour_line(&x, &y, &zice, params.min_zice, BLACK, LineStyle::Solid)?;
        circumpolar_window(panel, params.bound());
        panel.title("Ice shelf melt rate (m/y), annual average");
        figure.save(output)?;

        Ok(ismr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_melt_rate_masks_open_ocean() {
        let m = array![[1.0e-7, 1.0e-7]];
        let zice = array![[-50.0, 0.0]];
        let ismr = melt_rate_my(&m, &zice);
        assert!((ismr[[0, 0]] - 1.0e-7 * 365.25 * 86400.0).abs() < 1e-12);
        assert!(ismr[[0, 1]].is_nan());
    }

    #[test]
    fn test_record_mean_ignores_masked() {
        let a = array![[1.0, f64::NAN, f64::NAN]];
        let b = array![[3.0, 4.0, f64::NAN]];
        let mean = record_mean(&[a, b]).unwrap();
        assert_eq!(mean[[0, 0]], 2.0);
        assert_eq!(mean[[0, 1]], 4.0);
        assert!(mean[[0, 2]].is_nan());
        assert!(record_mean(&[]).is_err());
    }

    #[test]
    fn test_records_to_read() {
        assert_eq!(records_to_read(10, None).unwrap(), 0..1);
        assert_eq!(records_to_read(100, Some(73)).unwrap(), 27..100);
        assert!(records_to_read(10, Some(73)).is_err());
        assert!(records_to_read(0, None).is_err());
    }

    #[test]
    fn test_levels_and_bound() {
        let levels = melt_levels();
        assert_eq!(levels.len(), 100);
        assert_eq!(levels[0], -0.1);
        assert_eq!(levels[99], 8.0);
        assert_eq!(MeltParams::default().bound(), 27.0);
    }
}
