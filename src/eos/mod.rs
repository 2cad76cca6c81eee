//! Seawater and near-surface air thermodynamics.
//!
//! - UNESCO EOS-80 density
//! - Surface freezing point of seawater as parameterised by each sea ice
//!   model
//! - Relative humidity from temperature and dew point

mod unesco;

use serde::Deserialize;

use crate::units::{GAS_CONSTANT_VAPOUR, LATENT_HEAT_VAPOUR};

pub use unesco::EquationOfState;

/// Sea ice model whose freezing point parameterisation to use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreezingPoint {
    /// Linear liquidus of the CICE mushy-layer thermodynamics (as in MetROMS).
    Cice,
    /// UNESCO surface formula used by FESOM.
    Fesom,
}

impl FreezingPoint {
    /// Surface freezing temperature (°C) for salinity `s` (PSU).
    #[inline]
    pub fn at(self, s: f64) -> f64 {
        match self {
            Self::Cice => s / (-18.48 + 18.48 / 1e3 * s),
            Self::Fesom => -0.0575 * s + 1.7105e-3 * (s * s * s).sqrt() - 2.155e-4 * s * s,
        }
    }
}

/// Relative humidity (fraction) from 2 m air temperature and dew point,
/// both in Kelvin.
///
/// `exp(Lv/Rv (1/T - 1/Td))`; not clamped, so supersaturated values above 1
/// are possible.
#[inline]
pub fn relative_humidity(t2m: f64, d2m: f64) -> f64 {
    (LATENT_HEAT_VAPOUR / GAS_CONSTANT_VAPOUR * (1.0 / t2m - 1.0 / d2m)).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freezing_points_agree_roughly() {
        for s in [33.5, 34.0, 34.5, 35.0] {
            let cice = FreezingPoint::Cice.at(s);
            let fesom = FreezingPoint::Fesom.at(s);
            assert!(cice < -1.7 && cice > -2.0, "CICE Tf({}) = {}", s, cice);
            assert!((cice - fesom).abs() < 0.1);
        }
        assert_eq!(FreezingPoint::Cice.at(0.0), 0.0);
    }

    #[test]
    fn test_freezing_point_decreases_with_salinity() {
        for model in [FreezingPoint::Cice, FreezingPoint::Fesom] {
            assert!(model.at(35.0) < model.at(33.0));
        }
    }

    #[test]
    fn test_relative_humidity() {
        assert!((relative_humidity(270.0, 270.0) - 1.0).abs() < 1e-12);
        let rh = relative_humidity(273.15, 268.15);
        assert!(rh > 0.6 && rh < 0.75);
    }
}
