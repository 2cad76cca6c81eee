//! Vertical stretching functions C(s) for ROMS terrain-following grids.
//!
//! ROMS describes each water column with a uniform coordinate
//! s ∈ [-1, 0] and a stretching curve C(s) ∈ [-1, 0]. The stretching
//! function decides where levels cluster (surface mixed layer, bottom
//! boundary layer); the transform in [`super::VerticalTransform`] then
//! combines s, C(s), the critical depth `hc` and the local water column to
//! give physical depths.
//!
//! # Available Stretching Functions
//!
//! | Type | ROMS `Vstretching` |
//! |------|--------------------|
//! | [`UniformStretching`] | none (C = s) |
//! | [`SongHaidvogelStretching`] | 1 |
//! | [`Shchepetkin2005Stretching`] | 2 |
//! | [`Shchepetkin2010Stretching`] | 4 |
//!
//! # Example
//!
//! ```
//! use ocean_diag::vertical::{Shchepetkin2010Stretching, Stretching};
//!
//! let stretching = Shchepetkin2010Stretching::new(7.0, 2.0);
//! assert!((stretching.c(-1.0) + 1.0).abs() < 1e-12);
//! assert!(stretching.c(0.0).abs() < 1e-12);
//! ```

use serde::Deserialize;

/// A vertical stretching curve C(s).
///
/// Implementations must satisfy C(-1) = -1, C(0) = 0 and be monotonically
/// increasing in between.
pub trait Stretching: Send + Sync {
    /// Evaluate the stretching curve at s ∈ [-1, 0].
    fn c(&self, s: f64) -> f64;

    /// Human-readable name for logging.
    fn name(&self) -> &'static str;

    /// Description of parameters (for diagnostics).
    fn description(&self) -> String {
        self.name().to_string()
    }
}

// =============================================================================
// Uniform Stretching
// =============================================================================

/// No stretching: C(s) = s.
#[derive(Clone, Copy, Debug, Default)]
pub struct UniformStretching;

impl Stretching for UniformStretching {
    fn c(&self, s: f64) -> f64 {
        s
    }

    fn name(&self) -> &'static str {
        "uniform"
    }
}

// =============================================================================
// Song-Haidvogel (Vstretching = 1)
// =============================================================================

/// Song and Haidvogel (1994) stretching, ROMS `Vstretching = 1`.
///
/// `theta_b` here is the bottom control parameter in [0, 1], not a
/// stretching strength.
///
/// # References
///
/// - Song, Y. and D.B. Haidvogel (1994): A semi-implicit ocean circulation
///   model using a generalized topography-following coordinate system.
///   J. Comp. Phys., 115, 228-244.
#[derive(Clone, Copy, Debug)]
pub struct SongHaidvogelStretching {
    /// Surface control parameter (0 < theta_s <= 20).
    pub theta_s: f64,
    /// Bottom control parameter (0 <= theta_b <= 1).
    pub theta_b: f64,
}

impl SongHaidvogelStretching {
    pub fn new(theta_s: f64, theta_b: f64) -> Self {
        Self { theta_s, theta_b }
    }
}

impl Stretching for SongHaidvogelStretching {
    fn c(&self, s: f64) -> f64 {
        if self.theta_s <= 0.0 {
            return s;
        }
        let ptheta = (self.theta_s * s).sinh() / self.theta_s.sinh();
        let rtheta = (self.theta_s * (s + 0.5)).tanh() / (2.0 * (0.5 * self.theta_s).tanh()) - 0.5;
        (1.0 - self.theta_b) * ptheta + self.theta_b * rtheta
    }

    fn name(&self) -> &'static str {
        "song_haidvogel"
    }

    fn description(&self) -> String {
        format!(
            "Song-Haidvogel (theta_s={:.1}, theta_b={:.1})",
            self.theta_s, self.theta_b
        )
    }
}

// =============================================================================
// Shchepetkin 2005 (Vstretching = 2)
// =============================================================================

/// A. Shchepetkin (2005) stretching, ROMS `Vstretching = 2`.
///
/// Blends a surface curve and a bottom curve with a polynomial weight
/// (`Aweight = Bweight = 1`).
#[derive(Clone, Copy, Debug)]
pub struct Shchepetkin2005Stretching {
    /// Surface stretching parameter.
    pub theta_s: f64,
    /// Bottom stretching parameter.
    pub theta_b: f64,
}

impl Shchepetkin2005Stretching {
    const A_WEIGHT: f64 = 1.0;
    const B_WEIGHT: f64 = 1.0;

    pub fn new(theta_s: f64, theta_b: f64) -> Self {
        Self { theta_s, theta_b }
    }
}

impl Stretching for Shchepetkin2005Stretching {
    fn c(&self, s: f64) -> f64 {
        if self.theta_s <= 0.0 {
            return s;
        }
        let c_sur = (1.0 - (self.theta_s * s).cosh()) / (self.theta_s.cosh() - 1.0);
        if self.theta_b <= 0.0 {
            return c_sur;
        }
        let c_bot = -1.0 + (self.theta_b * (s + 1.0)).sinh() / self.theta_b.sinh();
        let sp1 = s + 1.0;
        let weight = sp1.powf(Self::A_WEIGHT)
            * (1.0 + (Self::A_WEIGHT / Self::B_WEIGHT) * (1.0 - sp1.powf(Self::B_WEIGHT)));
        weight * c_sur + (1.0 - weight) * c_bot
    }

    fn name(&self) -> &'static str {
        "shchepetkin_2005"
    }

    fn description(&self) -> String {
        format!(
            "Shchepetkin 2005 (theta_s={:.1}, theta_b={:.1})",
            self.theta_s, self.theta_b
        )
    }
}

// =============================================================================
// Shchepetkin 2010 (Vstretching = 4)
// =============================================================================

/// A. Shchepetkin (2010) double stretching, ROMS `Vstretching = 4`.
///
/// Surface refinement followed by bottom refinement:
///
/// ```text
/// Csur(s) = (1 - cosh(θs s)) / (cosh θs - 1)          θs > 0
///         = -s²                                       θs ≤ 0
/// C(s)    = (exp(θb Csur) - 1) / (1 - exp(-θb))       θb > 0
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Shchepetkin2010Stretching {
    /// Surface stretching parameter (0-10).
    pub theta_s: f64,
    /// Bottom stretching parameter (0-4).
    pub theta_b: f64,
}

impl Shchepetkin2010Stretching {
    pub fn new(theta_s: f64, theta_b: f64) -> Self {
        Self { theta_s, theta_b }
    }
}

impl Stretching for Shchepetkin2010Stretching {
    fn c(&self, s: f64) -> f64 {
        let c_sur = if self.theta_s > 0.0 {
            (1.0 - (self.theta_s * s).cosh()) / (self.theta_s.cosh() - 1.0)
        } else {
            -s * s
        };
        if self.theta_b > 0.0 {
            ((self.theta_b * c_sur).exp() - 1.0) / (1.0 - (-self.theta_b).exp())
        } else {
            c_sur
        }
    }

    fn name(&self) -> &'static str {
        "shchepetkin_2010"
    }

    fn description(&self) -> String {
        format!(
            "Shchepetkin 2010 (theta_s={:.1}, theta_b={:.1})",
            self.theta_s, self.theta_b
        )
    }
}

// =============================================================================
// Runtime selection
// =============================================================================

/// Stretching selected by its ROMS `Vstretching` number, for configuration
/// files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StretchingKind {
    Uniform,
    SongHaidvogel,
    Shchepetkin2005,
    Shchepetkin2010,
}

impl StretchingKind {
    /// Map a ROMS `Vstretching` value.
    pub fn from_vstretching(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::SongHaidvogel),
            2 => Some(Self::Shchepetkin2005),
            4 => Some(Self::Shchepetkin2010),
            _ => None,
        }
    }

    /// Build the boxed stretching curve.
    pub fn build(self, theta_s: f64, theta_b: f64) -> Box<dyn Stretching> {
        match self {
            Self::Uniform => Box::new(UniformStretching),
            Self::SongHaidvogel => Box::new(SongHaidvogelStretching::new(theta_s, theta_b)),
            Self::Shchepetkin2005 => Box::new(Shchepetkin2005Stretching::new(theta_s, theta_b)),
            Self::Shchepetkin2010 => Box::new(Shchepetkin2010Stretching::new(theta_s, theta_b)),
        }
    }
}

impl Stretching for Box<dyn Stretching> {
    fn c(&self, s: f64) -> f64 {
        self.as_ref().c(s)
    }

    fn name(&self) -> &'static str {
        self.as_ref().name()
    }

    fn description(&self) -> String {
        self.as_ref().description()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-10;

    fn check_bounds_and_monotonic(stretching: &dyn Stretching) {
        assert!(
            (stretching.c(-1.0) + 1.0).abs() < TOL,
            "{}: C(-1) should be -1, got {}",
            stretching.name(),
            stretching.c(-1.0)
        );
        assert!(
            stretching.c(0.0).abs() < TOL,
            "{}: C(0) should be 0, got {}",
            stretching.name(),
            stretching.c(0.0)
        );
        let n = 200;
        let mut prev = stretching.c(-1.0);
        for k in 1..=n {
            let s = -1.0 + k as f64 / n as f64;
            let c = stretching.c(s);
            assert!(c > prev, "{}: C should be increasing at s={}", stretching.name(), s);
            prev = c;
        }
    }

    #[test]
    fn test_all_stretchings_bounded_and_monotonic() {
        check_bounds_and_monotonic(&UniformStretching);
        check_bounds_and_monotonic(&SongHaidvogelStretching::new(5.0, 0.4));
        check_bounds_and_monotonic(&Shchepetkin2005Stretching::new(0.9, 4.0));
        check_bounds_and_monotonic(&Shchepetkin2010Stretching::new(7.0, 2.0));
        check_bounds_and_monotonic(&Shchepetkin2010Stretching::new(0.0, 0.0));
    }

    #[test]
    fn test_shchepetkin_2010_surface_refinement() {
        // Strong surface stretching packs the upper half of the levels into
        // the top few percent of the column.
        let s = Shchepetkin2010Stretching::new(7.0, 0.0);
        assert!(s.c(-0.5) > -0.1);
        assert!(s.c(-0.5) < 0.0);
    }

    #[test]
    fn test_no_stretching_is_identity() {
        let s = Shchepetkin2005Stretching::new(0.0, 0.0);
        for &x in &[-1.0, -0.7, -0.3, 0.0] {
            assert!((s.c(x) - x).abs() < TOL);
        }
    }

    #[test]
    fn test_kind_from_vstretching() {
        assert_eq!(
            StretchingKind::from_vstretching(4),
            Some(StretchingKind::Shchepetkin2010)
        );
        assert_eq!(StretchingKind::from_vstretching(3), None);
        let boxed = StretchingKind::Shchepetkin2010.build(7.0, 2.0);
        assert_eq!(boxed.name(), "shchepetkin_2010");
    }
}
