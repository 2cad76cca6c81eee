//! Atmospheric forcing for ROMS-CICE.
//!
//! Converts reanalysis fields to the variable names, units and grid
//! orientation that the coupled model reads. Conversion is incremental:
//! each call processes a bounded block of records and appends them to the
//! output files, so a year of sub-daily data can be produced by a batch
//! job that resubmits itself.

mod era_interim;

use thiserror::Error;

use crate::grid::GridError;
#[cfg(feature = "netcdf")]
use crate::io::NetCDFError;

pub use era_interim::{
    an_records, clamp_unit, era_time_to_days, fc_records, AtmosphereFields, EraParams, EraPaths, PrecipitationFields,
    ProgressLog, ATM_VARIABLES, ERA_EPOCH_OFFSET_DAYS, FORCING_TIME_UNITS, PPT_VARIABLES,
};

#[cfg(feature = "netcdf")]
pub use era_interim::{run, ConversionSummary};

/// Errors raised while building forcing files.
#[derive(Debug, Error)]
pub enum ForcingError {
    #[cfg(feature = "netcdf")]
    #[error("NetCDF error: {0}")]
    NetCDF(#[from] NetCDFError),

    #[error("Grid error: {0}")]
    Grid(#[from] GridError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}
