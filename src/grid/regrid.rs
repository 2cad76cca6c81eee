//! Bilinear interpolation from a regular lon/lat grid onto curvilinear
//! model points.
//!
//! Reanalysis products such as ERA-Interim are stored on a regular global
//! grid with longitude in `[0, 360)` and latitude usually running north to
//! south. Longitude is treated as periodic; targets south or north of the
//! source grid take the value of the outermost row.
//!
//! The interpolation stencil depends only on the two grids, so it is built
//! once with [`RegularGridInterpolator::weights`] and applied to every
//! field and time record.

use ndarray::Array2;

use super::GridError;

/// Source grid description for bilinear regridding.
#[derive(Clone, Debug)]
pub struct RegularGridInterpolator {
    lon: Vec<f64>,
    /// Latitudes in ascending order.
    lat: Vec<f64>,
    lat_descending: bool,
}

#[derive(Clone, Copy, Debug)]
struct Stencil {
    rows: [usize; 2],
    cols: [usize; 2],
    fx: f64,
    fy: f64,
}

/// Precomputed stencil for one source/target grid pair.
#[derive(Clone, Debug)]
pub struct InterpolationWeights {
    source_shape: (usize, usize),
    target_shape: (usize, usize),
    stencils: Vec<Stencil>,
}

impl RegularGridInterpolator {
    /// Create an interpolator for a source grid with 1D `lon` (strictly
    /// increasing, spanning less than 360°) and `lat` (strictly monotonic in
    /// either direction).
    pub fn new(lon: &[f64], lat: &[f64]) -> Result<Self, GridError> {
        if lon.is_empty() || lat.is_empty() {
            return Err(GridError::EmptyAxis);
        }
        if !strictly_increasing(lon) {
            return Err(GridError::NonMonotonic("longitude".into()));
        }
        if lon[lon.len() - 1] - lon[0] >= 360.0 {
            return Err(GridError::InvalidData(
                "longitude axis must not repeat the periodic seam".into(),
            ));
        }
        let lat_descending = lat.len() > 1 && lat[0] > lat[lat.len() - 1];
        let mut lat = lat.to_vec();
        if lat_descending {
            lat.reverse();
        }
        if !strictly_increasing(&lat) {
            return Err(GridError::NonMonotonic("latitude".into()));
        }
        Ok(Self {
            lon: lon.to_vec(),
            lat,
            lat_descending,
        })
    }

    /// Shape `[n_lat, n_lon]` of source fields, in file orientation.
    pub fn source_shape(&self) -> (usize, usize) {
        (self.lat.len(), self.lon.len())
    }

    /// Build the stencil for the given target points.
    pub fn weights(&self, target_lon: &Array2<f64>, target_lat: &Array2<f64>) -> InterpolationWeights {
        let stencils = target_lon
            .iter()
            .zip(target_lat.iter())
            .map(|(&x, &y)| {
                let (cols, fx) = self.locate_lon(x);
                let (rows, fy) = self.locate_lat(y);
                Stencil { rows, cols, fx, fy }
            })
            .collect();
        InterpolationWeights {
            source_shape: self.source_shape(),
            target_shape: target_lon.dim(),
            stencils,
        }
    }

    fn locate_lon(&self, x: f64) -> ([usize; 2], f64) {
        let n = self.lon.len();
        let lon0 = self.lon[0];
        let xr = lon0 + (x - lon0).rem_euclid(360.0);
        let i = self.lon.partition_point(|&l| l <= xr).saturating_sub(1);
        let (i1, span) = if i + 1 == n {
            (0, lon0 + 360.0 - self.lon[n - 1])
        } else {
            (i + 1, self.lon[i + 1] - self.lon[i])
        };
        ([i, i1], (xr - self.lon[i]) / span)
    }

    fn locate_lat(&self, y: f64) -> ([usize; 2], f64) {
        let n = self.lat.len();
        let (j0, j1, fy) = if y <= self.lat[0] {
            (0, 0, 0.0)
        } else if y >= self.lat[n - 1] {
            (n - 1, n - 1, 0.0)
        } else {
            let j = self.lat.partition_point(|&l| l <= y) - 1;
            (j, j + 1, (y - self.lat[j]) / (self.lat[j + 1] - self.lat[j]))
        };
        if self.lat_descending {
            ([n - 1 - j0, n - 1 - j1], fy)
        } else {
            ([j0, j1], fy)
        }
    }
}

impl InterpolationWeights {
    /// Interpolate a source field `[n_lat, n_lon]` onto the target points.
    pub fn apply(&self, field: &Array2<f64>) -> Result<Array2<f64>, GridError> {
        if field.dim() != self.source_shape {
            return Err(GridError::ShapeMismatch {
                expected: vec![self.source_shape.0, self.source_shape.1],
                found: field.shape().to_vec(),
            });
        }
        let values: Vec<f64> = self
            .stencils
            .iter()
            .map(|s| {
                let v00 = field[[s.rows[0], s.cols[0]]];
                let v01 = field[[s.rows[0], s.cols[1]]];
                let v10 = field[[s.rows[1], s.cols[0]]];
                let v11 = field[[s.rows[1], s.cols[1]]];
                let v0 = v00 * (1.0 - s.fx) + v01 * s.fx;
                let v1 = v10 * (1.0 - s.fx) + v11 * s.fx;
                v0 * (1.0 - s.fy) + v1 * s.fy
            })
            .collect();
        Array2::from_shape_vec(self.target_shape, values).map_err(|e| GridError::InvalidData(e.to_string()))
    }
}

fn strictly_increasing(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[1] > w[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    const TOL: f64 = 1e-12;

    fn era_like() -> (Vec<f64>, Vec<f64>, Array2<f64>) {
        // 90° spacing, latitude north to south like ERA-Interim
        let lon = vec![0.0, 90.0, 180.0, 270.0];
        let lat = vec![0.0, -45.0, -90.0];
        // field = lon + 1000 * lat, linear in each direction away from the seam
        let field = Array2::from_shape_fn((3, 4), |(j, i)| lon[i] + 1000.0 * lat[j]);
        (lon, lat, field)
    }

    #[test]
    fn test_exact_at_nodes() {
        let (lon, lat, field) = era_like();
        let interp = RegularGridInterpolator::new(&lon, &lat).unwrap();
        let w = interp.weights(&array![[90.0, 180.0]], &array![[-45.0, 0.0]]);
        let out = w.apply(&field).unwrap();
        assert!((out[[0, 0]] - (90.0 - 45000.0)).abs() < TOL);
        assert!((out[[0, 1]] - 180.0).abs() < TOL);
    }

    #[test]
    fn test_bilinear_interior() {
        let (lon, lat, field) = era_like();
        let interp = RegularGridInterpolator::new(&lon, &lat).unwrap();
        let w = interp.weights(&array![[135.0]], &array![[-22.5]]);
        let out = w.apply(&field).unwrap();
        assert!((out[[0, 0]] - (135.0 - 22500.0)).abs() < 1e-9);
    }

    #[test]
    fn test_periodic_seam() {
        let lon = vec![0.0, 90.0, 180.0, 270.0];
        let lat = vec![-10.0, -20.0];
        let field = array![[0.0, 1.0, 2.0, 3.0], [0.0, 1.0, 2.0, 3.0]];
        let interp = RegularGridInterpolator::new(&lon, &lat).unwrap();
        // Halfway between 270 and 360 (= 0) and the same point as -45
        let w = interp.weights(&array![[315.0, -45.0]], &array![[-15.0, -15.0]]);
        let out = w.apply(&field).unwrap();
        assert!((out[[0, 0]] - 1.5).abs() < TOL);
        assert!((out[[0, 1]] - 1.5).abs() < TOL);
    }

    #[test]
    fn test_latitude_clamped() {
        let (lon, lat, field) = era_like();
        let interp = RegularGridInterpolator::new(&lon, &lat).unwrap();
        let w = interp.weights(&array![[0.0]], &array![[10.0]]);
        assert!(w.apply(&field).unwrap()[[0, 0]].abs() < TOL);
    }

    #[test]
    fn test_shape_mismatch() {
        let (lon, lat, _) = era_like();
        let interp = RegularGridInterpolator::new(&lon, &lat).unwrap();
        let w = interp.weights(&array![[0.0]], &array![[0.0]]);
        assert!(matches!(
            w.apply(&Array2::zeros((4, 3))),
            Err(GridError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_unsorted_longitude() {
        assert!(RegularGridInterpolator::new(&[0.0, 10.0, 5.0], &[0.0]).is_err());
        assert!(RegularGridInterpolator::new(&[0.0, 360.0], &[0.0]).is_err());
    }
}
