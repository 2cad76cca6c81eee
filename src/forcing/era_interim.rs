//! ERA-Interim sub-daily fields to ROMS-CICE forcing files.
//!
//! Two inputs per year:
//!
//! - `AN`: 6-hourly analyses of surface pressure (`sp`), 2 m temperature
//!   (`t2m`) and dew point (`d2m`), total cloud cover (`tcc`) and 10 m winds
//!   (`u10`, `v10`)
//! - `FC`: 12-hourly accumulated total precipitation (`tp`), snowfall (`sf`)
//!   and evaporation (`e`)
//!
//! are interpolated onto the ROMS rho-grid and written as `Pair`, `Tair`,
//! `Qair`, `cloud`, `Uwind`, `Vwind` and `rain`, `snow`, `evaporation`.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::ops::Range;
use std::path::{Path, PathBuf};

use log::info;
use ndarray::Array2;
use serde::Deserialize;

use super::ForcingError;
use crate::eos::relative_humidity;
use crate::grid::{rotate_to_grid, InterpolationWeights};
use crate::io::ForcingVariable;
use crate::units::CELSIUS_TO_KELVIN;

/// Days from 1900-01-01 to 1992-01-01 (22 leap years in between).
pub const ERA_EPOCH_OFFSET_DAYS: f64 = (92 * 365 + 22) as f64;

pub const FORCING_TIME_UNITS: &str = "days since 1992-01-01 00:00:0.0";

/// Variables of the 6-hourly output file.
pub const ATM_VARIABLES: [ForcingVariable; 6] = [
    ForcingVariable::new("Pair", "surface air pressure", "Pascal"),
    ForcingVariable::new("Tair", "surface air temperature", "Celsius"),
    ForcingVariable::new("Qair", "surface relative humidity", "kg/kg"),
    ForcingVariable::new("cloud", "cloud fraction", "nondimensional"),
    ForcingVariable::new("Uwind", "surface u-wind component", "m/s"),
    ForcingVariable::new("Vwind", "surface v-wind component", "m/s"),
];

/// Variables of the 12-hourly output file.
pub const PPT_VARIABLES: [ForcingVariable; 3] = [
    ForcingVariable::new("rain", "rain fall rate", "m_per_12hr"),
    ForcingVariable::new("snow", "snow fall rate", "m_per_12hr"),
    ForcingVariable::new("evaporation", "evaporation rate", "m_per_12hr"),
];

/// Hours since 1900-01-01 to days since 1992-01-01, shifted by
/// `shift_days`.
#[inline]
pub fn era_time_to_days(hours: f64, shift_days: f64) -> f64 {
    hours / 24.0 - ERA_EPOCH_OFFSET_DAYS - shift_days
}

/// 6-hourly records handled by a call starting at `count`.
pub fn an_records(count: usize, block: usize, n_records: usize) -> Range<usize> {
    count.min(n_records)..(count + block).min(n_records)
}

/// 12-hourly records matching [`an_records`]: half as many, starting at
/// `count / 2`.
pub fn fc_records(count: usize, block: usize, n_records: usize) -> Range<usize> {
    (count / 2).min(n_records)..((count + block) / 2).min(n_records)
}

/// Clamp every value into `[0, 1]`.
pub fn clamp_unit(field: &mut Array2<f64>) {
    field.mapv_inplace(|v| v.clamp(0.0, 1.0));
}

fn clamp_non_negative(field: &mut Array2<f64>) {
    field.mapv_inplace(|v| if v < 0.0 { 0.0 } else { v });
}

/// One 6-hourly record on the ROMS grid.
#[derive(Clone, Debug)]
pub struct AtmosphereFields {
    pub pair: Array2<f64>,
    pub tair: Array2<f64>,
    pub qair: Array2<f64>,
    pub cloud: Array2<f64>,
    pub uwind: Array2<f64>,
    pub vwind: Array2<f64>,
}

impl AtmosphereFields {
    /// Convert ERA fields (`[lat, lon]`, file orientation). Humidity is
    /// computed before interpolation; winds are rotated onto the grid axes
    /// using the ROMS `angle`.
    #[allow(clippy::too_many_arguments)]
    pub fn from_era(
        weights: &InterpolationWeights,
        angle: &Array2<f64>,
        sp: &Array2<f64>,
        t2m: &Array2<f64>,
        d2m: &Array2<f64>,
        tcc: &Array2<f64>,
        u10: &Array2<f64>,
        v10: &Array2<f64>,
    ) -> Result<Self, ForcingError> {
        let rh = ndarray::Zip::from(t2m).and(d2m).map_collect(|&t, &d| relative_humidity(t, d));

        let pair = weights.apply(sp)?;
        let tair = weights.apply(t2m)?.mapv(|t| t - CELSIUS_TO_KELVIN);
        let mut qair = weights.apply(&rh)?;
        clamp_unit(&mut qair);
        let mut cloud = weights.apply(tcc)?;
        clamp_unit(&mut cloud);

        let u_lonlat = weights.apply(u10)?;
        let v_lonlat = weights.apply(v10)?;
        if angle.dim() != u_lonlat.dim() {
            return Err(ForcingError::InvalidData(format!(
                "angle {:?} does not match the target grid {:?}",
                angle.dim(),
                u_lonlat.dim()
            )));
        }
        let (uwind, vwind) = rotate_to_grid(&u_lonlat, &v_lonlat, angle);

        Ok(Self {
            pair,
            tair,
            qair,
            cloud,
            uwind,
            vwind,
        })
    }

    /// `(name, field)` pairs in [`ATM_VARIABLES`] order.
    pub fn named(&self) -> [(&'static str, &Array2<f64>); 6] {
        [
            ("Pair", &self.pair),
            ("Tair", &self.tair),
            ("Qair", &self.qair),
            ("cloud", &self.cloud),
            ("Uwind", &self.uwind),
            ("Vwind", &self.vwind),
        ]
    }
}

/// One 12-hourly record on the ROMS grid.
#[derive(Clone, Debug)]
pub struct PrecipitationFields {
    pub rain: Array2<f64>,
    pub snow: Array2<f64>,
    /// Negative values are condensation
    pub evaporation: Array2<f64>,
}

impl PrecipitationFields {
    /// ERA `e` is negative for evaporation, so it is negated.
    pub fn from_era(
        weights: &InterpolationWeights,
        tp: &Array2<f64>,
        sf: &Array2<f64>,
        e: &Array2<f64>,
    ) -> Result<Self, ForcingError> {
        let mut rain = weights.apply(tp)?;
        clamp_non_negative(&mut rain);
        let mut snow = weights.apply(sf)?;
        clamp_non_negative(&mut snow);
        let evaporation = weights.apply(&e.mapv(|v| -v))?;
        Ok(Self { rain, snow, evaporation })
    }

    pub fn named(&self) -> [(&'static str, &Array2<f64>); 3] {
        [
            ("rain", &self.rain),
            ("snow", &self.snow),
            ("evaporation", &self.evaporation),
        ]
    }
}

/// Path templates; `{year}` is replaced by the year processed.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EraParams {
    pub grid_file: PathBuf,
    pub input_atm: String,
    pub input_ppt: String,
    pub output_atm: String,
    pub output_ppt: String,
    pub log_file: String,
    /// 6-hourly records per call
    pub block: usize,
    /// Shift of the 12-hourly times so precipitation covers the following
    /// 12 hours
    pub ppt_shift_days: f64,
}

impl Default for EraParams {
    fn default() -> Self {
        Self {
            grid_file: PathBuf::from("grid/circ30S_quarterdegree.nc"),
            input_atm: "originals/ERA_Interim/AN_{year}_subdaily_orig.nc".to_string(),
            input_ppt: "originals/ERA_Interim/FC_{year}_subdaily_orig.nc".to_string(),
            output_atm: "ERA_Interim/AN_{year}_subdaily.nc".to_string(),
            output_ppt: "ERA_Interim/FC_{year}_subdaily.nc".to_string(),
            log_file: "{year}.log".to_string(),
            block: 100,
            ppt_shift_days: 0.5,
        }
    }
}

/// Paths of one year's conversion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EraPaths {
    pub grid: PathBuf,
    pub input_atm: PathBuf,
    pub input_ppt: PathBuf,
    pub output_atm: PathBuf,
    pub output_ppt: PathBuf,
    pub log: PathBuf,
}

impl EraParams {
    pub fn paths(&self, year: i32) -> EraPaths {
        let expand = |template: &str| PathBuf::from(template.replace("{year}", &year.to_string()));
        EraPaths {
            grid: self.grid_file.clone(),
            input_atm: expand(&self.input_atm),
            input_ppt: expand(&self.input_ppt),
            output_atm: expand(&self.output_atm),
            output_ppt: expand(&self.output_ppt),
            log: expand(&self.log_file),
        }
    }
}

/// Progress file of a conversion. Each line is also logged at info level.
pub struct ProgressLog {
    file: File,
}

impl ProgressLog {
    /// Start a new log when `fresh`, otherwise append to the existing one.
    pub fn open(path: &Path, fresh: bool) -> Result<Self, ForcingError> {
        let file = if fresh {
            File::create(path)?
        } else {
            OpenOptions::new().create(true).append(true).open(path)?
        };
        Ok(Self { file })
    }

    pub fn line(&mut self, text: &str) -> Result<(), ForcingError> {
        info!("{}", text);
        writeln!(self.file, "{}", text)?;
        self.file.flush()?;
        Ok(())
    }
}

#[cfg(feature = "netcdf")]
pub use self::netcdf_run::{run, ConversionSummary};

#[cfg(feature = "netcdf")]
mod netcdf_run {
    use std::ops::Range;

    use super::*;
    use crate::grid::RegularGridInterpolator;
    use crate::io::{ForcingFileWriter, NcReader};

    /// Records written by one call.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct ConversionSummary {
        pub atm_records: Range<usize>,
        pub ppt_records: Range<usize>,
    }

    fn open_output(
        path: &Path,
        create: bool,
        lon: &Array2<f64>,
        lat: &Array2<f64>,
        variables: &[ForcingVariable],
        log: &mut ProgressLog,
    ) -> Result<ForcingFileWriter, ForcingError> {
        if create {
            log.line(&format!("Setting up {}", path.display()))?;
            Ok(ForcingFileWriter::create(path, lon, lat, FORCING_TIME_UNITS, variables)?)
        } else {
            Ok(ForcingFileWriter::append(path)?)
        }
    }

    fn era_interpolator(file: &NcReader) -> Result<RegularGridInterpolator, ForcingError> {
        let lon = file.read_1d("longitude")?;
        let lat = file.read_1d("latitude")?;
        Ok(RegularGridInterpolator::new(&lon.to_vec(), &lat.to_vec())?)
    }

    /// Convert records `count..count + block` of `year` (and the matching
    /// 12-hourly records). Output files are created when `count == 0`.
    pub fn run(year: i32, count: usize, params: &EraParams) -> Result<ConversionSummary, ForcingError> {
        let paths = params.paths(year);
        let fresh = count == 0;
        let mut log = ProgressLog::open(&paths.log, fresh)?;

        log.line("Reading grids")?;
        let grid = NcReader::open(&paths.grid)?;
        let lon_roms = grid.read_2d("lon_rho")?;
        let lat_roms = grid.read_2d("lat_rho")?;
        let angle = grid.read_2d("angle")?;

        let atm_in = NcReader::open(&paths.input_atm)?;
        let atm_time = atm_in.read_1d("time")?;
        let weights = era_interpolator(&atm_in)?.weights(&lon_roms, &lat_roms);

        let mut atm_out = open_output(&paths.output_atm, fresh, &lon_roms, &lat_roms, &ATM_VARIABLES, &mut log)?;
        log.line("Processing 6-hourly data")?;
        let n_atm = atm_time.len();
        let atm_records = an_records(count, params.block, n_atm);
        for t in atm_records.clone() {
            log.line(&format!("Processing record {} of {}", t + 1, n_atm))?;
            let read = |name: &str| atm_in.read_record_2d(name, t);
            let fields = AtmosphereFields::from_era(
                &weights,
                &angle,
                &read("sp")?,
                &read("t2m")?,
                &read("d2m")?,
                &read("tcc")?,
                &read("u10")?,
                &read("v10")?,
            )?;
            atm_out.write_record(t, era_time_to_days(atm_time[t], 0.0), &fields.named())?;
        }
        drop(atm_out);

        let ppt_in = NcReader::open(&paths.input_ppt)?;
        let ppt_time = ppt_in.read_1d("time")?;
        let ppt_weights = era_interpolator(&ppt_in)?.weights(&lon_roms, &lat_roms);

        let mut ppt_out = open_output(&paths.output_ppt, fresh, &lon_roms, &lat_roms, &PPT_VARIABLES, &mut log)?;
        log.line("Processing 12-hourly data")?;
        let n_ppt = ppt_time.len();
        let ppt_records = fc_records(count, params.block, n_ppt);
        for t in ppt_records.clone() {
            log.line(&format!("Processing record {} of {}", t + 1, n_ppt))?;
            let fields = PrecipitationFields::from_era(
                &ppt_weights,
                &ppt_in.read_record_2d("tp", t)?,
                &ppt_in.read_record_2d("sf", t)?,
                &ppt_in.read_record_2d("e", t)?,
            )?;
            ppt_out.write_record(t, era_time_to_days(ppt_time[t], params.ppt_shift_days), &fields.named())?;
        }

        log.line("Finished")?;
        Ok(ConversionSummary {
            atm_records,
            ppt_records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::RegularGridInterpolator;
    use ndarray::array;

    fn identity_weights() -> (InterpolationWeights, Array2<f64>, Array2<f64>) {
        let interp = RegularGridInterpolator::new(&[0.0, 90.0, 180.0, 270.0], &[10.0, 0.0, -10.0]).unwrap();
        let lon = array![[0.0, 90.0], [180.0, 270.0]];
        let lat = array![[10.0, 0.0], [-10.0, 10.0]];
        (interp.weights(&lon, &lat), lon, lat)
    }

    #[test]
    fn test_time_conversion() {
        // 1992-01-01 00:00 in hours since 1900
        let hours = ERA_EPOCH_OFFSET_DAYS * 24.0;
        assert_eq!(era_time_to_days(hours, 0.0), 0.0);
        assert_eq!(era_time_to_days(hours + 36.0, 0.5), 1.0);
    }

    #[test]
    fn test_record_blocks() {
        assert_eq!(an_records(0, 100, 1460), 0..100);
        assert_eq!(an_records(1400, 100, 1460), 1400..1460);
        assert_eq!(fc_records(0, 100, 730), 0..50);
        assert_eq!(fc_records(100, 100, 730), 50..100);
        assert_eq!(fc_records(1400, 100, 730), 700..730);
        assert!(an_records(1500, 100, 1460).is_empty());
    }

    #[test]
    fn test_atmosphere_conversion() {
        let (weights, _, _) = identity_weights();
        let shape = (3, 4);
        let sp = Array2::from_elem(shape, 101_325.0);
        let t2m = Array2::from_elem(shape, 273.15);
        // Dew point above air temperature gives supersaturation, clamped to 1
        let d2m = Array2::from_elem(shape, 280.0);
        let tcc = Array2::from_elem(shape, 1.2);
        let u10 = Array2::from_elem(shape, 1.0);
        let v10 = Array2::zeros(shape);
        let angle = Array2::from_elem((2, 2), std::f64::consts::FRAC_PI_2);

        let f = AtmosphereFields::from_era(&weights, &angle, &sp, &t2m, &d2m, &tcc, &u10, &v10).unwrap();
        assert!((f.pair[[0, 0]] - 101_325.0).abs() < 1e-6);
        assert!(f.tair[[1, 1]].abs() < 1e-12);
        assert_eq!(f.qair[[0, 1]], 1.0);
        assert_eq!(f.cloud[[1, 0]], 1.0);
        // Eastward wind on a grid rotated by 90° is along -eta
        assert!(f.uwind[[0, 0]].abs() < 1e-12);
        assert!((f.vwind[[0, 0]] + 1.0).abs() < 1e-12);
        assert_eq!(f.named()[4].0, ATM_VARIABLES[4].name);

        let bad_angle = Array2::zeros((1, 1));
        assert!(AtmosphereFields::from_era(&weights, &bad_angle, &sp, &t2m, &d2m, &tcc, &u10, &v10).is_err());
    }

    #[test]
    fn test_precipitation_conversion() {
        let (weights, _, _) = identity_weights();
        let shape = (3, 4);
        let tp = Array2::from_elem(shape, -1e-6);
        let sf = Array2::from_elem(shape, 2e-4);
        let e = Array2::from_elem(shape, 3e-5);
        let p = PrecipitationFields::from_era(&weights, &tp, &sf, &e).unwrap();
        assert_eq!(p.rain[[0, 0]], 0.0);
        assert!((p.snow[[1, 1]] - 2e-4).abs() < 1e-15);
        // Condensation survives as a negative rate
        assert!((p.evaporation[[0, 1]] + 3e-5).abs() < 1e-15);
    }

    #[test]
    fn test_paths_and_progress_log() {
        let dir = tempfile::tempdir().unwrap();
        let params = EraParams {
            log_file: dir.path().join("{year}.log").to_string_lossy().into_owned(),
            ..EraParams::default()
        };
        let paths = params.paths(1995);
        assert_eq!(paths.input_ppt, PathBuf::from("originals/ERA_Interim/FC_1995_subdaily_orig.nc"));
        assert!(paths.log.ends_with("1995.log"));

        ProgressLog::open(&paths.log, true).unwrap().line("Reading grids").unwrap();
        ProgressLog::open(&paths.log, false).unwrap().line("Finished").unwrap();
        let content = std::fs::read_to_string(&paths.log).unwrap();
        assert_eq!(content, "Reading grids\nFinished\n");
        ProgressLog::open(&paths.log, true).unwrap().line("Reading grids").unwrap();
        assert_eq!(std::fs::read_to_string(&paths.log).unwrap(), "Reading grids\n");
    }

    #[cfg(feature = "netcdf")]
    #[test]
    fn test_epoch_offset_matches_calendar() {
        use chrono::NaiveDate;
        let days = NaiveDate::from_ymd_opt(1992, 1, 1)
            .zip(NaiveDate::from_ymd_opt(1900, 1, 1))
            .map(|(a, b)| (a - b).num_days())
            .unwrap();
        assert_eq!(days as f64, ERA_EPOCH_OFFSET_DAYS);
    }
}
