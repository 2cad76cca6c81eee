//! Integration tests for the grid integrands.
//!
//! These tests verify:
//! 1. Layer thicknesses fill the water column between sea floor and ice draft
//! 2. Volume integrals match area times water column thickness
//! 3. SOSE z-level thicknesses reach the extrapolated bottom edge

use approx::assert_relative_eq;
use ndarray::{array, Array2};
use ocean_diag::field::masked_sum;
use ocean_diag::grid::{
    polar_xy, sose_cell_widths, sose_vertical, CartesianGrid3D, Integrands, DEFAULT_NORTHERN_BOUNDARY,
};
use ocean_diag::vertical::VerticalGridParams;

const TOL: f64 = 1e-8;

fn small_grid() -> (Array2<f64>, Array2<f64>, Array2<f64>, Array2<f64>) {
    let (ny, nx) = (6, 8);
    let lon = Array2::from_shape_fn((ny, nx), |(_, i)| 45.0 * i as f64);
    let lat = Array2::from_shape_fn((ny, nx), |(j, _)| -78.0 + 8.0 * j as f64);
    let h = Array2::from_shape_fn((ny, nx), |(j, i)| 800.0 + 400.0 * j as f64 + 10.0 * i as f64);
    let zice = Array2::from_shape_fn((ny, nx), |(j, _)| if j == 0 { -350.0 } else { 0.0 });
    (lon, lat, h, zice)
}

#[test]
fn test_layers_fill_water_column() {
    let (lon, lat, h, zice) = small_grid();
    for params in [VerticalGridParams::default(), VerticalGridParams::spinup()] {
        let sigma = params.build();
        let grid = CartesianGrid3D::build(&lon, &lat, &h, &zice, &sigma, DEFAULT_NORTHERN_BOUNDARY);
        assert_eq!(grid.n_levels(), 31);
        let (_, ny, nx) = grid.dz.dim();
        for j in 0..ny {
            for i in 0..nx {
                let column: f64 = (0..31).map(|k| grid.dz[[k, j, i]]).sum();
                assert!(
                    (column - (h[[j, i]] + zice[[j, i]])).abs() < TOL,
                    "column ({}, {}) thickness {}",
                    j,
                    i,
                    column
                );
                assert!((0..31).all(|k| grid.dz[[k, j, i]] > 0.0));
                // Cell centres ordered bottom to top
                assert!((1..31).all(|k| grid.z[[k, j, i]] > grid.z[[k - 1, j, i]]));
            }
        }
    }
}

#[test]
fn test_volume_matches_area_times_thickness() {
    let (lon, lat, h, zice) = small_grid();
    let sigma = VerticalGridParams::default().build();
    let grid = CartesianGrid3D::build(&lon, &lat, &h, &zice, &sigma, DEFAULT_NORTHERN_BOUNDARY);
    let area = grid.area();
    let expected: f64 = area.iter().zip(h.iter().zip(zice.iter())).map(|(a, (h, z))| a * (h + z)).sum();
    assert_relative_eq!(masked_sum(&grid.volume()), expected, max_relative = 1e-12);

    let mask = Array2::from_elem(h.dim(), 1.0);
    let integrands = Integrands::new(&grid, &h, &zice, &mask);
    assert_relative_eq!(masked_sum(&integrands.d_v), expected, max_relative = 1e-12);
}

#[test]
fn test_sose_integrands() {
    let z = array![-5.0, -15.0, -30.0];
    let (edges, dz) = sose_vertical(&z);
    assert_eq!(edges[0], 0.0);
    assert_eq!(edges[3], -40.0);
    assert!((dz.sum() - 40.0).abs() < TOL);

    let lon = Array2::from_shape_fn((3, 4), |(_, i)| 45.0 + 90.0 * i as f64);
    let lat = Array2::from_shape_fn((3, 4), |(j, _)| -70.0 + j as f64);
    let (dx, dy) = sose_cell_widths(&lon, &lat);
    // Four cells span the whole circle at each latitude
    let circumference = 2.0 * std::f64::consts::PI * 6.371e6 * (70.0_f64.to_radians()).cos();
    assert_relative_eq!(dx.row(0).sum(), circumference, max_relative = 1e-9);
    assert!(dy.iter().all(|&w| (w - 6.371e6 * 1.0_f64.to_radians()).abs() < 1.0));
}

#[test]
fn test_polar_projection_orientation() {
    let (x, y) = polar_xy(0.0, -60.0);
    assert!(x.abs() < TOL);
    assert!((y - 30.0).abs() < TOL);
    let (x, y) = polar_xy(90.0, -60.0);
    assert!((x - 30.0).abs() < TOL);
    assert!(y.abs() < TOL);
}
