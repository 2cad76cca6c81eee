//! Physical constants and unit conversions shared by the diagnostics.
//!
//! Values match the ones hard-wired in the MetROMS/FESOM intercomparison
//! workflow so that regenerated figures and log files agree with earlier runs.

use std::f64::consts::PI;

/// Mean radius of the Earth (m).
pub const EARTH_RADIUS: f64 = 6.371e6;

/// Degrees to radians conversion factor.
pub const DEG2RAD: f64 = PI / 180.0;

/// Seconds in a Julian year (365.25 days).
pub const SECONDS_PER_YEAR: f64 = 365.25 * 24.0 * 60.0 * 60.0;

/// Seconds in a 365-day year.
pub const SECONDS_PER_NOLEAP_YEAR: f64 = 365.0 * 24.0 * 60.0 * 60.0;

/// Seconds per day.
pub const SECONDS_PER_DAY: f64 = 24.0 * 60.0 * 60.0;

/// Density of glacial ice (kg/m³).
pub const RHO_ICE: f64 = 916.0;

/// Reference density added back to ROMS `rho` anomalies (kg/m³).
pub const RHO0_ROMS: f64 = 1000.0;

/// Specific heat of polar seawater (J/K/kg).
pub const CP_SEAWATER: f64 = 3974.0;

/// Celsius to Kelvin offset.
pub const CELSIUS_TO_KELVIN: f64 = 273.15;

/// One Sverdrup (m³/s).
pub const SV: f64 = 1.0e6;

/// Latent heat of vaporisation (J/kg).
pub const LATENT_HEAT_VAPOUR: f64 = 2.5e6;

/// Gas constant for water vapour (J/K/kg).
pub const GAS_CONSTANT_VAPOUR: f64 = 461.5;

/// Sea ice concentration threshold used for extent.
pub const EXTENT_THRESHOLD: f64 = 0.15;

/// Convert a rate in m/s to m/y.
#[inline]
pub fn ms_to_my(rate: f64) -> f64 {
    rate * SECONDS_PER_YEAR
}

/// Convert model time in seconds to years.
#[inline]
pub fn seconds_to_years(seconds: f64) -> f64 {
    seconds / SECONDS_PER_YEAR
}

/// Convert an area-integrated ice melt volume (m³/y) into mass loss (Gt/y).
#[inline]
pub fn volume_to_gt(volume_rate: f64) -> f64 {
    1e-12 * RHO_ICE * volume_rate
}
