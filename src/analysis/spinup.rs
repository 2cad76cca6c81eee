//! Spinup diagnostics of a circumpolar ROMS-CICE run.
//!
//! Every record of an ocean history/averages file (and the matching CICE
//! history record) is reduced to a handful of scalars: melt, mass loss,
//! Drake Passage transport, sea ice extent, freshwater flux and cavity
//! bottom temperature, plus the volume integrals (heat, salt, kinetic
//! energy, peak speed) when the full set is requested. Values computed by
//! earlier invocations are read back from the log so a run can be analysed
//! file by file as it progresses.
//!
//! # Formulas
//!
//! ```text
//! OHC       = Σ (T + 273.15) ρ cp dV                   [J]
//! salt      = Σ 1e-3 S ρ dV                            [kg]
//! avg ismr  = Σ m dA / Σ dA          (cavities)        [m/y]
//! mass loss = 1e-12 ρ_ice Σ m dA                       [Gt/y]
//! TKE       = Σ ½ ρ (u² + v²) dV                       [J]
//! extent    = 1e-12 Σ dA [aice ≥ 0.15]                 [million km²]
//! fw flux   = 1e-6 Σ (fresh/100/86400 - fsalt/1000) dA [Sv]
//! ```
//!
//! with `ρ = rho + 1000` from the model's density anomaly.

use ndarray::{Array2, Array3, Zip};
use serde::Deserialize;

use super::drake::DrakeSection;
use super::AnalysisError;
use crate::field::{is_valid, masked_dot, masked_sum, CompensatedSum};
use crate::grid::DEFAULT_NORTHERN_BOUNDARY;
use crate::io::SectionedLog;
use crate::units::{
    volume_to_gt, CELSIUS_TO_KELVIN, CP_SEAWATER, EXTENT_THRESHOLD, SECONDS_PER_DAY, SV,
};
use crate::vertical::VerticalGridParams;

/// One time series of the spinup log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Series {
    Time,
    HeatContent,
    SaltContent,
    MeltRate,
    MassLoss,
    KineticEnergy,
    MaxVelocity,
    DrakeTransport,
    IceExtent,
    FreshwaterFlux,
    BottomTemperature,
}

impl Series {
    /// Every series, in log file order.
    pub const ALL: [Series; 11] = [
        Series::Time,
        Series::HeatContent,
        Series::SaltContent,
        Series::MeltRate,
        Series::MassLoss,
        Series::KineticEnergy,
        Series::MaxVelocity,
        Series::DrakeTransport,
        Series::IceExtent,
        Series::FreshwaterFlux,
        Series::BottomTemperature,
    ];

    /// The series computed by default; the volume integrals are slow.
    pub const DEFAULT: [Series; 7] = [
        Series::Time,
        Series::MeltRate,
        Series::MassLoss,
        Series::DrakeTransport,
        Series::IceExtent,
        Series::FreshwaterFlux,
        Series::BottomTemperature,
    ];

    /// Header line in the log file.
    pub fn header(self) -> &'static str {
        match self {
            Self::Time => "Time (years):",
            Self::HeatContent => "Southern Ocean Heat Content (J):",
            Self::SaltContent => "Southern Ocean Salt Content (kg):",
            Self::MeltRate => "Area-averaged Ice Shelf Melt Rate (m/y):",
            Self::MassLoss => "Ice Shelf Basal Mass Loss (Gt/y):",
            Self::KineticEnergy => "Southern Ocean Total Kinetic Energy (J):",
            Self::MaxVelocity => "Maximum Southern Ocean Velocity (m/s):",
            Self::DrakeTransport => "Drake Passage Transport (Sv):",
            Self::IceExtent => "Total Sea Ice Extent (million km^2):",
            Self::FreshwaterFlux => "Total Sea Ice-to-Ocean Freshwater Flux (Sv):",
            Self::BottomTemperature => "Average Bottom Water Temperature in Ice Shelf Cavities (C):",
        }
    }

    /// Y axis label of the plot.
    pub fn axis_label(self) -> &'static str {
        match self {
            Self::Time => "Years",
            Self::HeatContent => "Southern Ocean Heat Content (J)",
            Self::SaltContent => "Southern Ocean Salt Content (kg)",
            Self::MeltRate => "Area-averaged Ice Shelf Melt Rate (m/y)",
            Self::MassLoss => "Ice Shelf Basal Mass Loss (Gt/y)",
            Self::KineticEnergy => "Southern Ocean Total Kinetic Energy (J)",
            Self::MaxVelocity => "Maximum Southern Ocean Velocity (m/s)",
            Self::DrakeTransport => "Drake Passage Transport (Sv)",
            Self::IceExtent => "Total Sea Ice Extent (million km²)",
            Self::FreshwaterFlux => "Sea Ice-to-Ocean Freshwater Flux (Sv)",
            Self::BottomTemperature => "Average Bottom Water Temperature in Ice Shelf Cavities (°C)",
        }
    }

    /// File name of the plot; time has none.
    pub fn file_name(self) -> Option<&'static str> {
        match self {
            Self::Time => None,
            Self::HeatContent => Some("ohc.png"),
            Self::SaltContent => Some("totalsalt.png"),
            Self::MeltRate => Some("avgismr.png"),
            Self::MassLoss => Some("massloss.png"),
            Self::KineticEnergy => Some("tke.png"),
            Self::MaxVelocity => Some("maxvel.png"),
            Self::DrakeTransport => Some("drakepsgtrans.png"),
            Self::IceExtent => Some("totalice.png"),
            Self::FreshwaterFlux => Some("totalfwflux.png"),
            Self::BottomTemperature => Some("bwtemp.png"),
        }
    }

    /// Needs the CICE history file.
    pub fn needs_sea_ice(self) -> bool {
        matches!(self, Self::IceExtent | Self::FreshwaterFlux)
    }

    /// Needs 3D density.
    pub fn needs_density(self) -> bool {
        matches!(
            self,
            Self::HeatContent | Self::SaltContent | Self::KineticEnergy
        )
    }

    /// Needs 3D velocities on the rho-grid.
    pub fn needs_velocity(self) -> bool {
        matches!(self, Self::KineticEnergy | Self::MaxVelocity)
    }
}

/// Parameters of the spinup diagnostics.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SpinupParams {
    pub vertical: VerticalGridParams,
    /// Latitude of the grid's northern boundary
    pub nbdry: f64,
    pub drake: DrakeSection,
    /// Also compute heat, salt, kinetic energy and peak speed
    pub all_series: bool,
    pub width: u32,
    pub height: u32,
}

impl Default for SpinupParams {
    fn default() -> Self {
        Self {
            vertical: VerticalGridParams::spinup(),
            nbdry: DEFAULT_NORTHERN_BOUNDARY,
            drake: DrakeSection::default(),
            all_series: false,
            width: 800,
            height: 600,
        }
    }
}

impl SpinupParams {
    pub fn with_all_series(mut self, all: bool) -> Self {
        self.all_series = all;
        self
    }

    /// Series to compute, in log order. Sea ice series are dropped when no
    /// CICE file is available.
    pub fn selection(&self, have_sea_ice: bool) -> Vec<Series> {
        let base: &[Series] = if self.all_series {
            &Series::ALL
        } else {
            &Series::DEFAULT
        };
        base.iter()
            .copied()
            .filter(|s| have_sea_ice || !s.needs_sea_ice())
            .collect()
    }
}

/// Time series for a selection of [`Series`].
#[derive(Clone, Debug, PartialEq)]
pub struct SpinupLog {
    series: Vec<(Series, Vec<f64>)>,
}

impl SpinupLog {
    /// Empty series for `selection` (time is always included).
    pub fn new(selection: &[Series]) -> Self {
        let mut series: Vec<(Series, Vec<f64>)> = Vec::new();
        for s in Series::ALL {
            if s == Series::Time || selection.contains(&s) {
                series.push((s, Vec::new()));
            }
        }
        Self { series }
    }

    /// Pick the selected series out of a previously written log. Series
    /// the log lacks start empty.
    pub fn from_log(log: &SectionedLog, selection: &[Series]) -> Self {
        let mut out = Self::new(selection);
        for (s, values) in out.series.iter_mut() {
            match log.find(s.header()) {
                Some(section) => values.clone_from(&section.values),
                None => log::warn!("Log has no '{}' section, starting it empty", s.header()),
            }
        }
        out
    }

    pub fn series(&self) -> impl Iterator<Item = Series> + '_ {
        self.series.iter().map(|(s, _)| *s)
    }

    pub fn get(&self, series: Series) -> Option<&[f64]> {
        self.series
            .iter()
            .find(|(s, _)| *s == series)
            .map(|(_, v)| v.as_slice())
    }

    /// Append a value; ignored for series not in the selection.
    pub fn push(&mut self, series: Series, value: f64) {
        if let Some((_, values)) = self.series.iter_mut().find(|(s, _)| *s == series) {
            values.push(value);
        }
    }

    pub fn n_records(&self) -> usize {
        self.get(Series::Time).map_or(0, <[f64]>::len)
    }

    /// Log file contents with every selected series.
    pub fn to_log(&self) -> SectionedLog {
        let mut log = SectionedLog::new();
        for (s, values) in &self.series {
            log.push(s.header(), values.clone());
        }
        log
    }
}

/// Absolute density from the model's anomaly field.
pub fn absolute_density(rho_anomaly: &Array3<f64>) -> Array3<f64> {
    rho_anomaly + crate::units::RHO0_ROMS
}

/// Ocean heat content (J).
pub fn heat_content(temp: &Array3<f64>, rho: &Array3<f64>, d_v: &Array3<f64>) -> f64 {
    let mut acc = CompensatedSum::new();
    Zip::from(temp).and(rho).and(d_v).for_each(|&t, &r, &dv| {
        if is_valid(t) && is_valid(r) && is_valid(dv) {
            acc.add((t + CELSIUS_TO_KELVIN) * r * CP_SEAWATER * dv);
        }
    });
    acc.total()
}

/// Total mass of salt (kg).
pub fn salt_content(salt: &Array3<f64>, rho: &Array3<f64>, d_v: &Array3<f64>) -> f64 {
    let mut acc = CompensatedSum::new();
    Zip::from(salt).and(rho).and(d_v).for_each(|&s, &r, &dv| {
        if is_valid(s) && is_valid(r) && is_valid(dv) {
            acc.add(1e-3 * s * r * dv);
        }
    });
    acc.total()
}

/// Area-averaged melt rate (m/y) over the cavity area `d_a`.
pub fn average_melt_rate(ismr: &Array2<f64>, d_a: &Array2<f64>) -> f64 {
    masked_dot(ismr, d_a) / masked_sum(d_a)
}

/// Basal mass loss (Gt/y).
pub fn mass_loss(ismr: &Array2<f64>, d_a: &Array2<f64>) -> f64 {
    volume_to_gt(masked_dot(ismr, d_a))
}

/// Total kinetic energy (J) from rho-point velocities.
pub fn kinetic_energy(u_rho: &Array3<f64>, v_rho: &Array3<f64>, rho: &Array3<f64>, d_v: &Array3<f64>) -> f64 {
    let mut acc = CompensatedSum::new();
    Zip::from(u_rho)
        .and(v_rho)
        .and(rho)
        .and(d_v)
        .for_each(|&u, &v, &r, &dv| {
            if is_valid(u) && is_valid(v) && is_valid(r) && is_valid(dv) {
                acc.add(0.5 * r * (u * u + v * v) * dv);
            }
        });
    acc.total()
}

/// Largest speed (m/s), `None` if every cell is masked.
pub fn max_speed(u_rho: &Array3<f64>, v_rho: &Array3<f64>) -> Option<f64> {
    let mut max: Option<f64> = None;
    Zip::from(u_rho).and(v_rho).for_each(|&u, &v| {
        if is_valid(u) && is_valid(v) {
            let speed = (u * u + v * v).sqrt();
            max = Some(max.map_or(speed, |m| m.max(speed)));
        }
    });
    max
}

/// Sea ice extent (million km²): area of cells with at least 15 % cover.
/// Masked concentrations count as ice free; `area` is unmasked.
pub fn ice_extent(aice: &Array2<f64>, area: &Array2<f64>) -> f64 {
    let mut acc = CompensatedSum::new();
    Zip::from(aice).and(area).for_each(|&a, &da| {
        if is_valid(a) && a >= EXTENT_THRESHOLD {
            acc.add(da);
        }
    });
    acc.total() * 1e-12
}

/// Net sea ice to ocean freshwater flux (Sv).
///
/// `fresh_ai` is in cm/day, `fsalt_ai` in kg/m²/s; masked cells count
/// as zero flux.
pub fn freshwater_flux(fresh_ai: &Array2<f64>, fsalt_ai: &Array2<f64>, area: &Array2<f64>) -> f64 {
    let mut acc = CompensatedSum::new();
    Zip::from(fresh_ai)
        .and(fsalt_ai)
        .and(area)
        .for_each(|&fresh, &fsalt, &da| {
            let flux = fresh / 100.0 / SECONDS_PER_DAY - fsalt / 1000.0;
            if is_valid(flux) {
                acc.add(flux * da);
            }
        });
    acc.total() / SV
}

/// Area-averaged bottom temperature (°C) in ice shelf cavities.
pub fn cavity_bottom_temperature(temp_bottom: &Array2<f64>, zice: &Array2<f64>, d_a: &Array2<f64>) -> f64 {
    let cavity_temp = crate::field::masked_where(temp_bottom, zice, |z| z == 0.0);
    masked_dot(&cavity_temp, d_a) / masked_sum(d_a)
}

/// Check that `series` is ready to be plotted against `time`.
pub fn check_lengths(log: &SpinupLog) -> Result<(), AnalysisError> {
    let n = log.n_records();
    for s in log.series() {
        let len = log.get(s).map_or(0, <[f64]>::len);
        if len != n {
            return Err(AnalysisError::InvalidData(format!(
                "'{}' has {} values but there are {} times",
                s.header(),
                len,
                n
            )));
        }
    }
    Ok(())
}

#[cfg(feature = "netcdf")]
pub use self::netcdf_run::run;

#[cfg(feature = "netcdf")]
mod netcdf_run {
    use std::path::Path;

    use log::info;

    use super::*;
    use crate::grid::{u_to_rho, u_to_rho_3d, v_to_rho_3d, CartesianGrid3D, Integrands};
    use crate::io::NcReader;
    use crate::plot::{Figure, LineStyle};
    use crate::units::{ms_to_my, seconds_to_years};

    /// Paths of one spinup analysis.
    #[derive(Clone, Copy, Debug)]
    pub struct SpinupFiles<'a> {
        pub ocean: &'a Path,
        pub cice: Option<&'a Path>,
        pub log: &'a Path,
        /// Directory for the plots
        pub output_dir: &'a Path,
    }

    /// Analyse every record of the ocean file, append to the log, plot
    /// every series and rewrite the log.
    pub fn run(files: SpinupFiles<'_>, params: &SpinupParams) -> Result<SpinupLog, AnalysisError> {
        let selection = params.selection(files.cice.is_some());
        if files.cice.is_none() {
            log::warn!("No CICE file given; skipping sea ice series");
        }

        let mut log = if files.log.exists() {
            info!("Reading previously calculated values");
            SpinupLog::from_log(&SectionedLog::read(files.log)?, &selection)
        } else {
            SpinupLog::new(&selection)
        };

        info!("Analysing grid");
        let ocean = NcReader::open(files.ocean)?;
        let h = ocean.read_2d("h")?;
        let zice = ocean.read_2d("zice")?;
        let lon = ocean.read_2d("lon_rho")?;
        let lat = ocean.read_2d("lat_rho")?;
        let mask = ocean.read_2d("mask_rho")?;
        let sigma = params.vertical.build();
        let grid = CartesianGrid3D::build(&lon, &lat, &h, &zice, &sigma, params.nbdry);
        let integrands = Integrands::new(&grid, &h, &zice, &mask);

        let cice = files.cice.map(NcReader::open).transpose()?;

        let new_time = ocean.read_1d("ocean_time")?;
        let n_time = new_time.len();
        let wants = |s: Series| selection.contains(&s);
        let need_rho = selection.iter().any(|s| s.needs_density());
        let need_velocity = selection.iter().any(|s| s.needs_velocity());

        for t in 0..n_time {
            info!("Processing timestep {} of {}", t + 1, n_time);
            log.push(Series::Time, seconds_to_years(new_time[t]));

            let rho = if need_rho {
                Some(absolute_density(&ocean.read_record_3d("rho", t)?))
            } else {
                None
            };

            if let Some(rho) = &rho {
                if wants(Series::HeatContent) {
                    info!("Calculating ocean heat content");
                    let temp = ocean.read_record_3d("temp", t)?;
                    log.push(Series::HeatContent, heat_content(&temp, rho, &integrands.d_v));
                }
                if wants(Series::SaltContent) {
                    info!("Calculating total salt content");
                    let salt = ocean.read_record_3d("salt", t)?;
                    log.push(Series::SaltContent, salt_content(&salt, rho, &integrands.d_v));
                }
            }

            if wants(Series::MeltRate) || wants(Series::MassLoss) {
                info!("Calculating average ice shelf melt rate");
                let ismr = ocean.read_record_2d("m", t)?.mapv(ms_to_my);
                log.push(Series::MeltRate, average_melt_rate(&ismr, &integrands.d_a));
                log.push(Series::MassLoss, mass_loss(&ismr, &integrands.d_a));
            }

            if need_velocity {
                info!("Calculating total kinetic energy");
                let u_rho = u_to_rho_3d(&ocean.read_record_3d("u", t)?);
                let v_rho = v_to_rho_3d(&ocean.read_record_3d("v", t)?);
                if let (Some(rho), true) = (&rho, wants(Series::KineticEnergy)) {
                    log.push(
                        Series::KineticEnergy,
                        kinetic_energy(&u_rho, &v_rho, rho, &integrands.d_v),
                    );
                }
                if wants(Series::MaxVelocity) {
                    log.push(Series::MaxVelocity, max_speed(&u_rho, &v_rho).unwrap_or(f64::NAN));
                }
            }

            if wants(Series::DrakeTransport) {
                info!("Calculating Drake Passage transport");
                let ubar_rho = u_to_rho(&ocean.read_record_2d("ubar", t)?);
                log.push(
                    Series::DrakeTransport,
                    params.drake.transport(&ubar_rho, &integrands.dy_wct)?,
                );
            }

            if let Some(cice) = &cice {
                if wants(Series::IceExtent) {
                    info!("Calculating total sea ice extent");
                    let aice = cice.read_record_2d("aice", t)?;
                    log.push(Series::IceExtent, ice_extent(&aice, &integrands.area));
                }
                if wants(Series::FreshwaterFlux) {
                    info!("Calculating total sea ice-to-ocean freshwater flux");
                    let fresh = cice.read_record_2d("fresh_ai", t)?;
                    let fsalt = cice.read_record_2d("fsalt_ai", t)?;
                    log.push(
                        Series::FreshwaterFlux,
                        freshwater_flux(&fresh, &fsalt, &integrands.area),
                    );
                }
            }

            if wants(Series::BottomTemperature) {
                info!("Calculating average bottom water temperature in ice shelf cavities");
                let bottom = ocean.read_record_level("temp", t, 0)?;
                log.push(
                    Series::BottomTemperature,
                    cavity_bottom_temperature(&bottom, &zice, &integrands.d_a),
                );
            }
        }

        check_lengths(&log)?;
        plot_all(&log, files.output_dir, params)?;

        info!("Saving results to log file");
        log.to_log().write(files.log)?;
        Ok(log)
    }

    fn plot_all(log: &SpinupLog, output_dir: &Path, params: &SpinupParams) -> Result<(), AnalysisError> {
        let time = log.get(Series::Time).unwrap_or(&[]);
        for series in log.series() {
            let (Some(file_name), Some(values)) = (series.file_name(), log.get(series)) else {
                continue;
            };
            info!("Plotting {}", series.axis_label());
            let mut figure = Figure::single(params.width, params.height);
            figure
                .panel_mut(0)?
                .line(time, values, crate::plot::BLUE, LineStyle::Solid)
                .labels("Years", series.axis_label());
            figure.save(output_dir.join(file_name))?;
        }
        Ok(())
    }
}

#[cfg(feature = "netcdf")]
pub use self::netcdf_run::SpinupFiles;
