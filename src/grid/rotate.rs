//! Rotation of vector fields between the ROMS grid and lon-lat axes.
//!
//! `angle` is the ROMS grid variable: the angle (radians) between the
//! `xi` axis and true east at each rho-point.

use ndarray::{Array2, Zip};

use super::staggered::{u_to_rho, v_to_rho};

/// Rotate rho-grid components from grid axes to east/north.
///
/// ```text
/// u_lonlat = u cos(a) - v sin(a)
/// v_lonlat = v cos(a) + u sin(a)
/// ```
pub fn rotate_to_lonlat(u: &Array2<f64>, v: &Array2<f64>, angle: &Array2<f64>) -> (Array2<f64>, Array2<f64>) {
    let mut u_out = Array2::zeros(u.dim());
    let mut v_out = Array2::zeros(u.dim());
    Zip::from(&mut u_out)
        .and(&mut v_out)
        .and(u)
        .and(v)
        .and(angle)
        .for_each(|uo, vo, &u, &v, &a| {
            let (sin, cos) = a.sin_cos();
            *uo = u * cos - v * sin;
            *vo = v * cos + u * sin;
        });
    (u_out, v_out)
}

/// Rotate east/north components onto the ROMS grid axes.
///
/// ```text
/// u_grid = u cos(a) + v sin(a)
/// v_grid = v cos(a) - u sin(a)
/// ```
pub fn rotate_to_grid(u: &Array2<f64>, v: &Array2<f64>, angle: &Array2<f64>) -> (Array2<f64>, Array2<f64>) {
    let mut u_out = Array2::zeros(u.dim());
    let mut v_out = Array2::zeros(u.dim());
    Zip::from(&mut u_out)
        .and(&mut v_out)
        .and(u)
        .and(v)
        .and(angle)
        .for_each(|uo, vo, &u, &v, &a| {
            let (sin, cos) = a.sin_cos();
            *uo = u * cos + v * sin;
            *vo = v * cos - u * sin;
        });
    (u_out, v_out)
}

/// Interpolate staggered u/v to the rho-grid and rotate to east/north.
///
/// `u` is `[ny, nx - 1]`, `v` is `[ny - 1, nx]`, `angle` is `[ny, nx]`.
pub fn velocity_to_lonlat(u: &Array2<f64>, v: &Array2<f64>, angle: &Array2<f64>) -> (Array2<f64>, Array2<f64>) {
    let u_rho = u_to_rho(u);
    let v_rho = v_to_rho(v);
    rotate_to_lonlat(&u_rho, &v_rho, angle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::f64::consts::FRAC_PI_2;

    const TOL: f64 = 1e-12;

    #[test]
    fn test_quarter_turn() {
        let u = array![[1.0]];
        let v = array![[0.0]];
        let angle = array![[FRAC_PI_2]];
        let (ue, vn) = rotate_to_lonlat(&u, &v, &angle);
        assert!(ue[[0, 0]].abs() < TOL);
        assert!((vn[[0, 0]] - 1.0).abs() < TOL);
    }

    #[test]
    fn test_rotations_are_inverse() {
        let u = array![[1.5, -0.3], [0.2, 4.0]];
        let v = array![[0.7, 2.0], [-1.1, 0.0]];
        let angle = array![[0.3, -1.2], [2.5, 0.0]];
        let (ue, vn) = rotate_to_lonlat(&u, &v, &angle);
        let (ug, vg) = rotate_to_grid(&ue, &vn, &angle);
        for (a, b) in ug.iter().zip(u.iter()).chain(vg.iter().zip(v.iter())) {
            assert!((a - b).abs() < TOL);
        }
    }

    #[test]
    fn test_speed_preserved() {
        let u = array![[3.0]];
        let v = array![[4.0]];
        let angle = array![[0.77]];
        let (ue, vn) = rotate_to_grid(&u, &v, &angle);
        let speed = (ue[[0, 0]].powi(2) + vn[[0, 0]].powi(2)).sqrt();
        assert!((speed - 5.0).abs() < TOL);
    }

    #[test]
    fn test_velocity_to_lonlat_shape() {
        let u = Array2::<f64>::ones((4, 5));
        let v = Array2::<f64>::zeros((3, 6));
        let angle = Array2::<f64>::zeros((4, 6));
        let (ue, vn) = velocity_to_lonlat(&u, &v, &angle);
        assert_eq!(ue.dim(), (4, 6));
        assert!(ue.iter().all(|&x| (x - 1.0).abs() < TOL));
        assert!(vn.iter().all(|&x| x.abs() < TOL));
    }
}
