//! Arakawa C-grid to rho-grid interpolation.
//!
//! The circumpolar grid is periodic in `xi`, so the u-points at the west
//! and east edges of the rho-grid both take the mean of the first and last
//! u columns. v-points have no such seam and the outer rows are copied.
//! Masked (NaN) neighbours propagate into the averages.

use ndarray::{Array2, Array3, Axis};

/// Interpolate a u-grid field `[ny, nx - 1]` to the rho-grid `[ny, nx]`.
pub fn u_to_rho(u: &Array2<f64>) -> Array2<f64> {
    let (ny, nxu) = u.dim();
    if nxu == 0 {
        return Array2::zeros((ny, 0));
    }
    let nx = nxu + 1;
    Array2::from_shape_fn((ny, nx), |(j, i)| {
        if i == 0 || i == nx - 1 {
            0.5 * (u[[j, 0]] + u[[j, nxu - 1]])
        } else {
            0.5 * (u[[j, i - 1]] + u[[j, i]])
        }
    })
}

/// Interpolate a v-grid field `[ny - 1, nx]` to the rho-grid `[ny, nx]`.
pub fn v_to_rho(v: &Array2<f64>) -> Array2<f64> {
    let (nyv, nx) = v.dim();
    if nyv == 0 {
        return Array2::zeros((0, nx));
    }
    let ny = nyv + 1;
    Array2::from_shape_fn((ny, nx), |(j, i)| {
        if j == 0 {
            v[[0, i]]
        } else if j == ny - 1 {
            v[[nyv - 1, i]]
        } else {
            0.5 * (v[[j - 1, i]] + v[[j, i]])
        }
    })
}

fn per_level<F>(field: &Array3<f64>, f: F) -> Array3<f64>
where
    F: Fn(&Array2<f64>) -> Array2<f64>,
{
    let n = field.len_of(Axis(0));
    let mut out: Option<Array3<f64>> = None;
    for (k, level) in field.outer_iter().enumerate() {
        let rho = f(&level.to_owned());
        let out = out.get_or_insert_with(|| Array3::zeros((n, rho.nrows(), rho.ncols())));
        out.index_axis_mut(Axis(0), k).assign(&rho);
    }
    out.unwrap_or_else(|| Array3::zeros((0, 0, 0)))
}

/// 3D variant of [`u_to_rho`], level by level.
pub fn u_to_rho_3d(u: &Array3<f64>) -> Array3<f64> {
    per_level(u, u_to_rho)
}

/// 3D variant of [`v_to_rho`], level by level.
pub fn v_to_rho_3d(v: &Array3<f64>) -> Array3<f64> {
    per_level(v, v_to_rho)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_u_periodic_boundary() {
        let u = array![[1.0, 2.0, 3.0]];
        let rho = u_to_rho(&u);
        assert_eq!(rho.row(0).to_vec(), vec![2.0, 1.5, 2.5, 2.0]);
    }

    #[test]
    fn test_v_copies_outer_rows() {
        let v = array![[1.0], [3.0], [7.0]];
        let rho = v_to_rho(&v);
        assert_eq!(rho.column(0).to_vec(), vec![1.0, 2.0, 5.0, 7.0]);
    }

    #[test]
    fn test_masked_neighbour_propagates() {
        let u = array![[1.0, f64::NAN, 3.0]];
        let rho = u_to_rho(&u);
        assert!(rho[[0, 1]].is_nan());
        assert!(rho[[0, 2]].is_nan());
        assert_eq!(rho[[0, 0]], 2.0);
    }

    #[test]
    fn test_3d_shapes() {
        let u = Array3::<f64>::ones((3, 4, 5));
        let v = Array3::<f64>::ones((3, 3, 6));
        assert_eq!(u_to_rho_3d(&u).dim(), (3, 4, 6));
        assert_eq!(v_to_rho_3d(&v).dim(), (3, 4, 6));
    }
}
