//! I/O utilities for reading and writing data files.
//!
//! This module provides:
//! - **NetCDF I/O**: model output, grid and reanalysis reading; ROMS-CICE
//!   forcing output (requires `netcdf` feature)
//! - **Time series logs**: section-per-series text files kept by the spinup
//!   diagnostics and the FESOM mass loss analysis
//! - **Edge trimming**: dropping sponge rows and periodic overlap columns
//!
//! # File Formats
//!
//! ## Time series logs
//!
//! ```text
//! Time (years):
//! 0.0136
//! 0.0274
//! Drake Passage Transport (Sv):
//! 143.2
//! 141.8
//! ```

mod log_file;
#[cfg(feature = "netcdf")]
mod netcdf_io;
mod trim;

pub use log_file::{LogFileError, LogSection, MassLossLog, SectionedLog};
#[cfg(feature = "netcdf")]
pub use netcdf_io::{ForcingFileWriter, NcReader, NetCDFError};
pub use trim::Trim;

/// Time-dependent variable of a forcing file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ForcingVariable {
    pub name: &'static str,
    pub long_name: &'static str,
    pub units: &'static str,
}

impl ForcingVariable {
    pub const fn new(name: &'static str, long_name: &'static str, units: &'static str) -> Self {
        Self {
            name,
            long_name,
            units,
        }
    }
}
