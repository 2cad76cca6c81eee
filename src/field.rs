//! Masked-field helpers.
//!
//! Fields read from model output are `ndarray` arrays in which masked
//! cells (land, fill values, cells outside a region) hold `NaN`. The helpers
//! here reproduce the handful of masked-array operations the diagnostics
//! need: masking by a condition, summing only valid cells, and `linspace`.
//!
//! Sums use Neumaier compensated summation. Integrals over a global
//! Southern Ocean grid add up millions of terms of very different
//! magnitude, which is where naive `f64` accumulation loses digits.

use ndarray::{Array1, Array2, Array3, ArrayBase, Data, Dimension, Zip};

/// Returns true for a cell that carries data.
#[inline]
pub fn is_valid(v: f64) -> bool {
    v.is_finite() && v.abs() < 1.0e30
}

/// Neumaier compensated accumulator.
#[derive(Clone, Copy, Debug, Default)]
pub struct CompensatedSum {
    sum: f64,
    compensation: f64,
}

impl CompensatedSum {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add(&mut self, value: f64) {
        let t = self.sum + value;
        if self.sum.abs() >= value.abs() {
            self.compensation += (self.sum - t) + value;
        } else {
            self.compensation += (value - t) + self.sum;
        }
        self.sum = t;
    }

    #[inline]
    pub fn total(&self) -> f64 {
        self.sum + self.compensation
    }
}

impl FromIterator<f64> for CompensatedSum {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut acc = Self::new();
        for v in iter {
            acc.add(v);
        }
        acc
    }
}

/// Sum of all valid cells (masked cells are skipped).
pub fn masked_sum<S, D>(field: &ArrayBase<S, D>) -> f64
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    field
        .iter()
        .copied()
        .filter(|v| is_valid(*v))
        .collect::<CompensatedSum>()
        .total()
}

/// Sum of `a * b` over cells where both are valid.
pub fn masked_dot<S1, S2, D>(a: &ArrayBase<S1, D>, b: &ArrayBase<S2, D>) -> f64
where
    S1: Data<Elem = f64>,
    S2: Data<Elem = f64>,
    D: Dimension,
{
    let mut acc = CompensatedSum::new();
    Zip::from(a).and(b).for_each(|&x, &y| {
        if is_valid(x) && is_valid(y) {
            acc.add(x * y);
        }
    });
    acc.total()
}

/// Maximum over valid cells, `None` if every cell is masked.
pub fn masked_max<S, D>(field: &ArrayBase<S, D>) -> Option<f64>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    field
        .iter()
        .copied()
        .filter(|v| is_valid(*v))
        .fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.max(v))))
}

/// Minimum over valid cells, `None` if every cell is masked.
pub fn masked_min<S, D>(field: &ArrayBase<S, D>) -> Option<f64>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    field
        .iter()
        .copied()
        .filter(|v| is_valid(*v))
        .fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.min(v))))
}

/// Number of valid cells.
pub fn count_valid<S, D>(field: &ArrayBase<S, D>) -> usize
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    field.iter().filter(|v| is_valid(**v)).count()
}

/// Copy of `field` with cells masked (set to NaN) wherever `condition` holds
/// for the matching cell of `reference`.
pub fn masked_where<F>(field: &Array2<f64>, reference: &Array2<f64>, condition: F) -> Array2<f64>
where
    F: Fn(f64) -> bool,
{
    let mut out = field.clone();
    Zip::from(&mut out).and(reference).for_each(|v, &r| {
        if condition(r) {
            *v = f64::NAN;
        }
    });
    out
}

/// 3D variant of [`masked_where`] with a 2D reference applied at every level.
pub fn masked_where_3d<F>(field: &Array3<f64>, reference: &Array2<f64>, condition: F) -> Array3<f64>
where
    F: Fn(f64) -> bool,
{
    let mut out = field.clone();
    for mut level in out.outer_iter_mut() {
        Zip::from(&mut level).and(reference).for_each(|v, &r| {
            if condition(r) {
                *v = f64::NAN;
            }
        });
    }
    out
}

/// Replace masked cells with `value`.
pub fn filled(field: &Array2<f64>, value: f64) -> Array2<f64> {
    field.mapv(|v| if is_valid(v) { v } else { value })
}

/// `n` evenly spaced values from `start` to `stop` inclusive.
pub fn linspace(start: f64, stop: f64, n: usize) -> Array1<f64> {
    match n {
        0 => Array1::zeros(0),
        1 => Array1::from_elem(1, start),
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            Array1::from_shape_fn(n, |i| if i == n - 1 { stop } else { start + step * i as f64 })
        }
    }
}

/// Values from `start` in steps of `step`, stopping before `stop`.
pub fn arange(start: f64, stop: f64, step: f64) -> Vec<f64> {
    if step == 0.0 || !((stop - start) / step).is_finite() {
        return Vec::new();
    }
    let n = ((stop - start) / step).ceil().max(0.0) as usize;
    (0..n).map(|i| start + step * i as f64).collect()
}

/// Midpoints of consecutive values.
pub fn centres(edges: &Array1<f64>) -> Array1<f64> {
    if edges.len() < 2 {
        return Array1::zeros(0);
    }
    Array1::from_shape_fn(edges.len() - 1, |i| 0.5 * (edges[i] + edges[i + 1]))
}

/// Tile a 2D field over `n` levels.
pub fn tile_levels(field: &Array2<f64>, n: usize) -> Array3<f64> {
    let (ny, nx) = field.dim();
    Array3::from_shape_fn((n, ny, nx), |(_, j, i)| field[[j, i]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    const TOL: f64 = 1e-12;

    #[test]
    fn test_arange_excludes_stop() {
        assert_eq!(arange(0.0, 800.0, 200.0), vec![0.0, 200.0, 400.0, 600.0]);
        let density_levels = arange(26.6, 28.4, 0.2);
        assert_eq!(density_levels.len(), 9);
        assert!((density_levels[8] - 28.2).abs() < 1e-9);
        assert!(arange(1.0, 0.0, 1.0).is_empty());
    }

    #[test]
    fn test_compensated_sum_recovers_small_terms() {
        let mut acc = CompensatedSum::new();
        acc.add(1.0e16);
        for _ in 0..1000 {
            acc.add(1.0);
        }
        acc.add(-1.0e16);
        assert!((acc.total() - 1000.0).abs() < TOL);
    }

    #[test]
    fn test_masked_sum_skips_nan_and_fill() {
        let a = array![[1.0, f64::NAN], [1.0e37, 2.5]];
        assert!((masked_sum(&a) - 3.5).abs() < TOL);
        assert_eq!(count_valid(&a), 2);
    }

    #[test]
    fn test_masked_dot() {
        let a = array![[1.0, 2.0], [f64::NAN, 4.0]];
        let b = array![[3.0, f64::NAN], [1.0, 0.5]];
        assert!((masked_dot(&a, &b) - 5.0).abs() < TOL);
    }

    #[test]
    fn test_masked_extrema() {
        let a = array![f64::NAN, -2.0, 7.0];
        assert_eq!(masked_max(&a), Some(7.0));
        assert_eq!(masked_min(&a), Some(-2.0));
        let empty = array![f64::NAN];
        assert_eq!(masked_max(&empty), None);
    }

    #[test]
    fn test_masked_where() {
        let field = array![[1.0, 2.0], [3.0, 4.0]];
        let zice = array![[0.0, -5.0], [0.0, -1.0]];
        let cavity = masked_where(&field, &zice, |z| z == 0.0);
        assert!(cavity[[0, 0]].is_nan());
        assert_eq!(cavity[[0, 1]], 2.0);
        assert!(cavity[[1, 0]].is_nan());
    }

    #[test]
    fn test_linspace_endpoints() {
        let x = linspace(-3.1, 3.8, 1000);
        assert_eq!(x.len(), 1000);
        assert_eq!(x[0], -3.1);
        assert_eq!(x[999], 3.8);
        let c = centres(&x);
        assert_eq!(c.len(), 999);
        assert!((c[0] - 0.5 * (x[0] + x[1])).abs() < TOL);
    }
}
