//! # ocean-diag
//!
//! Post-processing of coupled ocean / sea ice / ice shelf simulations
//! (ROMS, CICE, FESOM) and the SOSE climatology.
//!
//! The crate is a library of stateless numeric helpers with one thin binary
//! per analysis program on top:
//! - Terrain-following vertical grids (ROMS `Vstretching`/`Vtransform`)
//! - Horizontal grid differentials, 3D volume integrands and staggered-grid
//!   interpolation
//! - Vector rotation between grid and lon-lat axes, bilinear regridding
//! - Circumpolar plotting projection
//! - FESOM unstructured meshes
//! - UNESCO equation of state and freezing point parameterisations
//! - NetCDF reading with mask handling, forcing file writing and text logs
//!   (NetCDF behind the `netcdf` feature)
//! - PNG figures
//!
//! Masked cells are NaN throughout; see [`field`] for the masked reductions.

pub mod analysis;
pub mod cli;
pub mod config;
pub mod eos;
pub mod field;
pub mod forcing;
pub mod grid;
pub mod io;
pub mod mesh;
pub mod plot;
pub mod units;
pub mod vertical;

pub use analysis::AnalysisError;
pub use config::{load_params, ConfigError};
pub use eos::{EquationOfState, FreezingPoint};
pub use forcing::ForcingError;
pub use grid::{CartesianGrid3D, GridError, MissingCircle};
pub use io::{LogFileError, MassLossLog, SectionedLog, Trim};
#[cfg(feature = "netcdf")]
pub use io::{ForcingFileWriter, NcReader, NetCDFError};
pub use mesh::{FesomMesh, FesomMeshError};
pub use plot::{Colormap, Figure, Panel, PlotError};
pub use vertical::{SigmaGrid, VerticalGridParams};
