//! NetCDF I/O for model output and forcing files.
//!
//! # Features
//!
//! - **Reader**: grid variables and single time records of ROMS, CICE,
//!   FESOM, SOSE and ERA-Interim files, with packed data unpacked and fill
//!   values converted to NaN
//! - **Writer**: ROMS-CICE atmospheric forcing files on the ROMS rho-grid,
//!   created once and appended to record by record
//!
//! # Example
//!
//! ```rust,ignore
//! use ocean_diag::io::NcReader;
//!
//! let grid = NcReader::open("roms_grid.nc")?;
//! let h = grid.read_2d("h")?;
//! let ocean = NcReader::open("ocean_avg.nc")?;
//! let temp = ocean.read_record_3d("temp", 0)?;
//! ```

use std::path::{Path, PathBuf};

use chrono::Utc;
use log::debug;
use ndarray::{Array1, Array2, Array3};
use thiserror::Error;

use super::ForcingVariable;
use crate::field::is_valid;

/// Error type for NetCDF operations.
#[derive(Debug, Error)]
pub enum NetCDFError {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// NetCDF library error
    #[error("NetCDF error: {0}")]
    NetCDF(#[from] netcdf::Error),

    /// Invalid data
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Missing variable
    #[error("Missing variable: {0}")]
    MissingVariable(String),

    /// Missing dimension
    #[error("Missing dimension: {0}")]
    MissingDimension(String),
}

// ============================================================================
// Reader
// ============================================================================

/// Read-only view of a NetCDF file.
///
/// Every read returns `f64`. Integer-packed variables are unpacked with
/// `scale_factor`/`add_offset`; values equal to `_FillValue` or
/// `missing_value`, non-finite values and magnitudes of `1e30` or more
/// become NaN.
pub struct NcReader {
    file: netcdf::File,
    path: PathBuf,
}

impl NcReader {
    /// Open a file for reading.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, NetCDFError> {
        let path = path.as_ref().to_path_buf();
        let file = netcdf::open(&path)?;
        debug!("Opened {}", path.display());
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if a variable is present.
    pub fn has_variable(&self, name: &str) -> bool {
        self.file.variable(name).is_some()
    }

    /// Length of a dimension.
    pub fn dimension_len(&self, name: &str) -> Result<usize, NetCDFError> {
        self.file
            .dimension(name)
            .map(|d| d.len())
            .ok_or_else(|| NetCDFError::MissingDimension(name.to_string()))
    }

    /// Shape of a variable.
    pub fn shape(&self, name: &str) -> Result<Vec<usize>, NetCDFError> {
        let var = self.variable(name)?;
        Ok(var.dimensions().iter().map(|d| d.len()).collect())
    }

    /// Number of records along the leading (time) dimension.
    pub fn n_records(&self, name: &str) -> Result<usize, NetCDFError> {
        self.shape(name)?
            .first()
            .copied()
            .ok_or_else(|| NetCDFError::InvalidData(format!("{} is a scalar", name)))
    }

    /// Read a 1D variable.
    pub fn read_1d(&self, name: &str) -> Result<Array1<f64>, NetCDFError> {
        let var = self.variable(name)?;
        let shape = Self::check_rank(&var, name, 1)?;
        let values = Self::unpack(&var, var.get_values::<f64, _>(..)?);
        Self::reshape_1d(values, shape[0], name)
    }

    /// Read a 2D variable.
    pub fn read_2d(&self, name: &str) -> Result<Array2<f64>, NetCDFError> {
        let var = self.variable(name)?;
        let shape = Self::check_rank(&var, name, 2)?;
        let values = Self::unpack(&var, var.get_values::<f64, _>(..)?);
        Self::reshape_2d(values, (shape[0], shape[1]), name)
    }

    /// Read a 3D variable.
    pub fn read_3d(&self, name: &str) -> Result<Array3<f64>, NetCDFError> {
        let var = self.variable(name)?;
        let shape = Self::check_rank(&var, name, 3)?;
        let values = Self::unpack(&var, var.get_values::<f64, _>(..)?);
        Self::reshape_3d(values, (shape[0], shape[1], shape[2]), name)
    }

    /// Read record `t` of a `[time, n]` variable.
    pub fn read_record_1d(&self, name: &str, t: usize) -> Result<Array1<f64>, NetCDFError> {
        let var = self.variable(name)?;
        let shape = Self::check_rank(&var, name, 2)?;
        Self::check_record(name, t, shape[0])?;
        let values = Self::unpack(&var, var.get_values::<f64, _>((t, ..))?);
        Self::reshape_1d(values, shape[1], name)
    }

    /// Read record `t` of a `[time, lat, lon]` variable.
    pub fn read_record_2d(&self, name: &str, t: usize) -> Result<Array2<f64>, NetCDFError> {
        let var = self.variable(name)?;
        let shape = Self::check_rank(&var, name, 3)?;
        Self::check_record(name, t, shape[0])?;
        let values = Self::unpack(&var, var.get_values::<f64, _>((t, .., ..))?);
        Self::reshape_2d(values, (shape[1], shape[2]), name)
    }

    /// Read record `t` of a `[time, depth, lat, lon]` variable.
    pub fn read_record_3d(&self, name: &str, t: usize) -> Result<Array3<f64>, NetCDFError> {
        let var = self.variable(name)?;
        let shape = Self::check_rank(&var, name, 4)?;
        Self::check_record(name, t, shape[0])?;
        let values = Self::unpack(&var, var.get_values::<f64, _>((t, .., .., ..))?);
        Self::reshape_3d(values, (shape[1], shape[2], shape[3]), name)
    }

    /// Read level `k` of record `t` of a `[time, depth, lat, lon]` variable.
    pub fn read_record_level(
        &self,
        name: &str,
        t: usize,
        k: usize,
    ) -> Result<Array2<f64>, NetCDFError> {
        let var = self.variable(name)?;
        let shape = Self::check_rank(&var, name, 4)?;
        Self::check_record(name, t, shape[0])?;
        if k >= shape[1] {
            return Err(NetCDFError::InvalidData(format!(
                "level {} of {} out of range ({} levels)",
                k, name, shape[1]
            )));
        }
        let values = Self::unpack(&var, var.get_values::<f64, _>((t, k, .., ..))?);
        Self::reshape_2d(values, (shape[2], shape[3]), name)
    }

    fn variable(&self, name: &str) -> Result<netcdf::Variable<'_>, NetCDFError> {
        self.file
            .variable(name)
            .ok_or_else(|| NetCDFError::MissingVariable(name.to_string()))
    }

    fn check_rank(
        var: &netcdf::Variable,
        name: &str,
        rank: usize,
    ) -> Result<Vec<usize>, NetCDFError> {
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        if shape.len() != rank {
            return Err(NetCDFError::InvalidData(format!(
                "{} has {} dimensions, expected {}",
                name,
                shape.len(),
                rank
            )));
        }
        Ok(shape)
    }

    fn check_record(name: &str, t: usize, n_records: usize) -> Result<(), NetCDFError> {
        if t >= n_records {
            return Err(NetCDFError::InvalidData(format!(
                "record {} of {} out of range ({} records)",
                t, name, n_records
            )));
        }
        Ok(())
    }

    /// Mask fill values, then apply `scale_factor` and `add_offset`.
    fn unpack(var: &netcdf::Variable, raw: Vec<f64>) -> Vec<f64> {
        let scale = get_attr_f64(var, "scale_factor").unwrap_or(1.0);
        let offset = get_attr_f64(var, "add_offset").unwrap_or(0.0);
        let fill = get_attr_f64(var, "_FillValue");
        let missing = get_attr_f64(var, "missing_value");

        raw.into_iter()
            .map(|v| {
                if Some(v) == fill || Some(v) == missing || !is_valid(v) {
                    f64::NAN
                } else {
                    v * scale + offset
                }
            })
            .collect()
    }

    fn reshape_1d(values: Vec<f64>, n: usize, name: &str) -> Result<Array1<f64>, NetCDFError> {
        if values.len() != n {
            return Err(NetCDFError::InvalidData(format!(
                "{}: read {} values, expected {}",
                name,
                values.len(),
                n
            )));
        }
        Ok(Array1::from_vec(values))
    }

    fn reshape_2d(
        values: Vec<f64>,
        shape: (usize, usize),
        name: &str,
    ) -> Result<Array2<f64>, NetCDFError> {
        Array2::from_shape_vec(shape, values)
            .map_err(|e| NetCDFError::InvalidData(format!("{}: {}", name, e)))
    }

    fn reshape_3d(
        values: Vec<f64>,
        shape: (usize, usize, usize),
        name: &str,
    ) -> Result<Array3<f64>, NetCDFError> {
        Array3::from_shape_vec(shape, values)
            .map_err(|e| NetCDFError::InvalidData(format!("{}: {}", name, e)))
    }
}

/// Numeric attribute as f64, whatever its stored type.
fn get_attr_f64(var: &netcdf::Variable, name: &str) -> Option<f64> {
    var.attribute_value(name)
        .and_then(|r| r.ok())
        .and_then(|v| match v {
            netcdf::AttributeValue::Double(d) => Some(d),
            netcdf::AttributeValue::Float(f) => Some(f as f64),
            netcdf::AttributeValue::Short(s) => Some(s as f64),
            netcdf::AttributeValue::Int(i) => Some(i as f64),
            netcdf::AttributeValue::Schar(c) => Some(c as f64),
            _ => None,
        })
}

// ============================================================================
// Forcing writer
// ============================================================================

/// Writer for ROMS-CICE forcing files on the `[eta_rho, xi_rho]` grid.
///
/// Each record is written at an explicit index along the unlimited `time`
/// dimension, so a long conversion can be split over several invocations
/// that reopen the file in append mode.
pub struct ForcingFileWriter {
    file: netcdf::FileMut,
    path: PathBuf,
}

impl ForcingFileWriter {
    /// Create a new forcing file with coordinates and variable definitions.
    pub fn create(
        path: impl AsRef<Path>,
        lon: &Array2<f64>,
        lat: &Array2<f64>,
        time_units: &str,
        variables: &[ForcingVariable],
    ) -> Result<Self, NetCDFError> {
        if lon.dim() != lat.dim() {
            return Err(NetCDFError::InvalidData(format!(
                "lon_rho {:?} and lat_rho {:?} differ in shape",
                lon.dim(),
                lat.dim()
            )));
        }
        let (n_eta, n_xi) = lon.dim();
        let path = path.as_ref().to_path_buf();
        let mut file = netcdf::create(&path)?;

        // Add dimensions
        file.add_dimension("xi_rho", n_xi)?;
        file.add_dimension("eta_rho", n_eta)?;
        file.add_unlimited_dimension("time")?;

        // Add coordinate variables
        {
            let mut lon_var = file.add_variable::<f64>("lon_rho", &["eta_rho", "xi_rho"])?;
            lon_var.put_attribute("long_name", "longitude of rho-points")?;
            lon_var.put_attribute("units", "degree_east")?;
            let values: Vec<f64> = lon.iter().copied().collect();
            lon_var.put_values(&values, ..)?;
        }

        {
            let mut lat_var = file.add_variable::<f64>("lat_rho", &["eta_rho", "xi_rho"])?;
            lat_var.put_attribute("long_name", "latitude of rho-points")?;
            lat_var.put_attribute("units", "degree_north")?;
            let values: Vec<f64> = lat.iter().copied().collect();
            lat_var.put_values(&values, ..)?;
        }

        {
            let mut time_var = file.add_variable::<f64>("time", &["time"])?;
            time_var.put_attribute("units", time_units)?;
        }

        // Add data variables
        for variable in variables {
            let mut var =
                file.add_variable::<f64>(variable.name, &["time", "eta_rho", "xi_rho"])?;
            var.put_attribute("long_name", variable.long_name)?;
            var.put_attribute("units", variable.units)?;
        }

        // Add creation timestamp
        let now = Utc::now();
        file.add_attribute(
            "history",
            format!("{}: Created by ocean-diag", now.format("%Y-%m-%d %H:%M:%S UTC")).as_str(),
        )?;

        Ok(Self { file, path })
    }

    /// Reopen an existing forcing file to add records.
    pub fn append(path: impl AsRef<Path>) -> Result<Self, NetCDFError> {
        let path = path.as_ref().to_path_buf();
        let file = netcdf::append(&path)?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records currently in the file.
    pub fn n_records(&self) -> usize {
        self.file.dimension("time").map(|d| d.len()).unwrap_or(0)
    }

    /// Write the time value and fields of record `t_idx`.
    pub fn write_record(
        &mut self,
        t_idx: usize,
        time: f64,
        fields: &[(&str, &Array2<f64>)],
    ) -> Result<(), NetCDFError> {
        // Write time
        {
            let mut time_var = self
                .file
                .variable_mut("time")
                .ok_or_else(|| NetCDFError::MissingVariable("time".to_string()))?;
            time_var.put_value(time, [t_idx])?;
        }

        for (name, field) in fields {
            let values: Vec<f64> = field.iter().copied().collect();
            let mut var = self
                .file
                .variable_mut(name)
                .ok_or_else(|| NetCDFError::MissingVariable(name.to_string()))?;
            var.put_values(&values, (t_idx, .., ..))?;
        }

        Ok(())
    }
}
