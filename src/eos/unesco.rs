//! UNESCO EOS-80 equation of state for seawater.
//!
//! # References
//!
//! - UNESCO (1981): Tenth report of the joint panel on oceanographic tables and standards.
//! - Millero & Poisson (1981): International one-atmosphere equation of state of seawater.
//!
//! # Units
//!
//! - Temperature: °C
//! - Salinity: PSU (practical salinity units)
//! - Pressure: dbar, where 1 dbar ≈ 1 m depth
//! - Density: kg/m³

/// Seawater density from temperature, salinity and pressure.
///
/// The T/S diagrams contour potential density, which is this function
/// evaluated at zero pressure.
#[derive(Clone, Copy, Debug, Default)]
pub struct EquationOfState;

impl EquationOfState {
    pub fn new() -> Self {
        Self
    }

    /// Density at one atmosphere (p = 0).
    ///
    /// # Example
    /// ```
    /// use ocean_diag::eos::EquationOfState;
    ///
    /// let eos = EquationOfState::new();
    ///
    /// // Antarctic Bottom Water is close to 1027.9 kg/m³ at the surface
    /// let rho = eos.density_surface(-0.5, 34.7);
    /// assert!((rho - 1027.9).abs() < 0.2);
    ///
    /// // Fresh water at 4°C (maximum density)
    /// let rho_fresh = eos.density_surface(4.0, 0.0);
    /// assert!((rho_fresh - 1000.0).abs() < 0.1);
    /// ```
    pub fn density_surface(&self, temperature: f64, salinity: f64) -> f64 {
        let t = temperature;
        let s = salinity;

        // Pure water density (Bigg formula)
        let rho_w = 999.842594 + 6.793952e-2 * t - 9.095290e-3 * t.powi(2)
            + 1.001685e-4 * t.powi(3)
            - 1.120083e-6 * t.powi(4)
            + 6.536336e-9 * t.powi(5);

        let a = 8.24493e-1 - 4.0899e-3 * t + 7.6438e-5 * t.powi(2) - 8.2467e-7 * t.powi(3)
            + 5.3875e-9 * t.powi(4);
        let b = -5.72466e-3 + 1.0227e-4 * t - 1.6546e-6 * t.powi(2);
        let c = 4.8314e-4;

        rho_w + a * s + b * s.powf(1.5) + c * s.powi(2)
    }

    /// In-situ density at pressure `pressure` (dbar).
    ///
    /// `rho = rho(S, T, 0) / (1 - p / K(S, T, p))` with p in bar.
    pub fn density(&self, temperature: f64, salinity: f64, pressure: f64) -> f64 {
        let rho_0 = self.density_surface(temperature, salinity);
        if pressure == 0.0 {
            return rho_0;
        }
        let p_bar = pressure / 10.0;
        let k = self.secant_bulk_modulus(temperature, salinity, p_bar);
        rho_0 / (1.0 - p_bar / k)
    }

    /// Density anomaly σ = ρ - 1000 kg/m³ at the surface.
    pub fn sigma(&self, temperature: f64, salinity: f64) -> f64 {
        self.density_surface(temperature, salinity) - 1000.0
    }

    /// Secant bulk modulus K(S, T, p) in bar, with `p` in bar.
    fn secant_bulk_modulus(&self, temperature: f64, salinity: f64, p: f64) -> f64 {
        let t = temperature;
        let s = salinity;

        // Pure water secant bulk modulus
        let kw = 19652.21 + 148.4206 * t - 2.327105 * t.powi(2) + 1.360477e-2 * t.powi(3)
            - 5.155288e-5 * t.powi(4);

        // Salinity contribution at p=0
        let k0 = kw
            + s * (54.6746 - 0.603459 * t + 1.09987e-2 * t.powi(2) - 6.1670e-5 * t.powi(3))
            + s.powf(1.5) * (7.944e-2 + 1.6483e-2 * t - 5.3009e-4 * t.powi(2));

        // Pressure contribution
        let aw = 3.239908 + 1.43713e-3 * t + 1.16092e-4 * t.powi(2) - 5.77905e-7 * t.powi(3);
        let a =
            aw + s * (2.2838e-3 - 1.0981e-5 * t - 1.6078e-6 * t.powi(2)) + s.powf(1.5) * 1.91075e-4;

        let bw = 8.50935e-5 - 6.12293e-6 * t + 5.2787e-8 * t.powi(2);
        let b = bw + s * (-9.9348e-7 + 2.0816e-8 * t + 9.1697e-10 * t.powi(2));

        k0 + p * (a + b * p)
    }
}
