//! The analysis programs.
//!
//! Each submodule backs one binary and is split the same way:
//!
//! - a parameter struct whose `Default` holds the constants of the
//!   published figures and which can be overridden from a TOML file,
//! - pure functions on arrays that compute the diagnostic (tested without
//!   any NetCDF files),
//! - a `run` function, behind the `netcdf` feature, that reads the model
//!   output, calls those functions and writes the figure or log.
//!
//! # Programs
//!
//! | Module | Output |
//! |--------|--------|
//! | [`spinup`] | time series of melt, transport, sea ice and volume integrals |
//! | [`drake`] | latitude-time section of Drake Passage transport |
//! | [`melt`] | circumpolar map of ice shelf melt rate |
//! | [`mixed_layer`] | mixed layer depth of two experiments and their difference |
//! | [`massloss`] | % change in ice shelf mass loss between two FESOM resolutions |
//! | [`ts_distribution`] | volume-weighted depth in temperature/salinity space |

pub mod drake;
mod maps;
pub mod massloss;
pub mod melt;
pub mod mixed_layer;
pub mod spinup;
pub mod ts_distribution;

use thiserror::Error;

use crate::grid::GridError;
#[cfg(feature = "netcdf")]
use crate::io::NetCDFError;
use crate::io::LogFileError;
use crate::mesh::FesomMeshError;
use crate::plot::PlotError;

/// Error type for the analysis programs.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// NetCDF error
    #[cfg(feature = "netcdf")]
    #[error("NetCDF error: {0}")]
    NetCDF(#[from] NetCDFError),

    /// Time series log error
    #[error("Log file error: {0}")]
    Log(#[from] LogFileError),

    /// Figure error
    #[error("Plot error: {0}")]
    Plot(#[from] PlotError),

    /// FESOM mesh error
    #[error("Mesh error: {0}")]
    Mesh(#[from] FesomMeshError),

    /// Grid error
    #[error("Grid error: {0}")]
    Grid(#[from] GridError),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Inconsistent input
    #[error("Invalid data: {0}")]
    InvalidData(String),
}
