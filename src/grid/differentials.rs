//! Horizontal and vertical cell widths on spherical grids.
//!
//! Cell edges are found by averaging neighbouring cell centres. The grids
//! handled here are circumpolar, so in longitude the first and last columns
//! are neighbours across the periodic seam; in latitude each product closes
//! the outermost rows differently:
//!
//! | Grid | Southern edge of row 0 | Northern edge of last row |
//! |------|------------------------|---------------------------|
//! | ROMS | `lat[0]` | the grid's northern boundary (`nbdry`) |
//! | SOSE | `2 lat[0] - mid[0]` | `2 lat[-1] - mid[-1]` |

use ndarray::{Array1, Array2};

use crate::units::{DEG2RAD, EARTH_RADIUS};

/// Longitude edges with a periodic seam, shape `[ny, nx + 1]`.
///
/// ```text
/// west = 0.5 (lon[:, 0] + lon[:, -1] - 360)
/// east = 0.5 (lon[:, 0] + lon[:, -1] + 360)
/// ```
pub fn periodic_lon_edges(lon: &Array2<f64>) -> Array2<f64> {
    let (ny, nx) = lon.dim();
    let mut edges = Array2::zeros((ny, nx + 1));
    if nx == 0 {
        return edges;
    }
    for j in 0..ny {
        let first = lon[[j, 0]];
        let last = lon[[j, nx - 1]];
        edges[[j, 0]] = 0.5 * (first + last - 360.0);
        for i in 1..nx {
            edges[[j, i]] = 0.5 * (lon[[j, i - 1]] + lon[[j, i]]);
        }
        edges[[j, nx]] = 0.5 * (first + 360.0 + last);
    }
    edges
}

/// Latitude edges, shape `[ny + 1, nx]`, with the outer rows given.
fn lat_edges_with<S, N>(lat: &Array2<f64>, south: S, north: N) -> Array2<f64>
where
    S: Fn(usize) -> f64,
    N: Fn(usize) -> f64,
{
    let (ny, nx) = lat.dim();
    let mut edges = Array2::zeros((ny + 1, nx));
    for i in 0..nx {
        edges[[0, i]] = south(i);
        for j in 1..ny {
            edges[[j, i]] = 0.5 * (lat[[j - 1, i]] + lat[[j, i]]);
        }
        edges[[ny, i]] = north(i);
    }
    edges
}

fn widths(lat: &Array2<f64>, lon_edges: &Array2<f64>, lat_edges: &Array2<f64>) -> (Array2<f64>, Array2<f64>) {
    let (ny, nx) = lat.dim();
    let dx = Array2::from_shape_fn((ny, nx), |(j, i)| {
        let dlon = (lon_edges[[j, i + 1]] - lon_edges[[j, i]]).abs();
        EARTH_RADIUS * (lat[[j, i]] * DEG2RAD).cos() * dlon * DEG2RAD
    });
    let dy = Array2::from_shape_fn((ny, nx), |(j, i)| {
        EARTH_RADIUS * (lat_edges[[j + 1, i]] - lat_edges[[j, i]]) * DEG2RAD
    });
    (dx, dy)
}

/// Zonal and meridional cell widths (m) of a ROMS rho-grid.
///
/// The northern edge of the last row is the open boundary at `nbdry`.
pub fn roms_cell_widths(lon: &Array2<f64>, lat: &Array2<f64>, nbdry: f64) -> (Array2<f64>, Array2<f64>) {
    let lon_edges = periodic_lon_edges(lon);
    let lat_edges = lat_edges_with(lat, |i| lat[[0, i]], |_| nbdry);
    widths(lat, &lon_edges, &lat_edges)
}

/// Zonal and meridional cell widths (m) of the SOSE grid.
pub fn sose_cell_widths(lon: &Array2<f64>, lat: &Array2<f64>) -> (Array2<f64>, Array2<f64>) {
    let ny = lat.nrows();
    let lon_edges = periodic_lon_edges(lon);
    let lat_edges = if ny < 2 {
        // A single row has no interior edge to extrapolate from
        lat_edges_with(lat, |i| lat[[0, i]], |i| lat[[0, i]])
    } else {
        let mid_south = |i: usize| 0.5 * (lat[[0, i]] + lat[[1, i]]);
        let mid_north = |i: usize| 0.5 * (lat[[ny - 2, i]] + lat[[ny - 1, i]]);
        lat_edges_with(
            lat,
            |i| 2.0 * lat[[0, i]] - mid_south(i),
            |i| 2.0 * lat[[ny - 1, i]] - mid_north(i),
        )
    };
    widths(lat, &lon_edges, &lat_edges)
}

/// Meridional cell widths (m) with the southern edge at the first row and
/// the northern edge at `nbdry`.
pub fn dy_with_northern_boundary(lat: &Array2<f64>, nbdry: f64) -> Array2<f64> {
    let (ny, nx) = lat.dim();
    let edges = lat_edges_with(lat, |i| lat[[0, i]], |_| nbdry);
    Array2::from_shape_fn((ny, nx), |(j, i)| {
        EARTH_RADIUS * (edges[[j + 1, i]] - edges[[j, i]]) * DEG2RAD
    })
}

/// Layer thicknesses of a z-level grid given its mid-depths (negative,
/// surface first).
///
/// The top edge is the surface, interior edges are midpoints and the bottom
/// edge is extrapolated. Returns `(edges, dz)` with `dz >= 0`.
pub fn sose_vertical(z_mid: &Array1<f64>) -> (Array1<f64>, Array1<f64>) {
    let n = z_mid.len();
    let mut edges = Array1::zeros(n + 1);
    if n == 0 {
        return (edges, Array1::zeros(0));
    }
    for k in 1..n {
        edges[k] = 0.5 * (z_mid[k - 1] + z_mid[k]);
    }
    edges[n] = 2.0 * z_mid[n - 1] - edges[n - 1];
    let dz = Array1::from_shape_fn(n, |k| (edges[k + 1] - edges[k]).abs());
    (edges, dz)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    const TOL: f64 = 1e-6;

    fn regular(lons: &[f64], lats: &[f64]) -> (Array2<f64>, Array2<f64>) {
        let lon = Array2::from_shape_fn((lats.len(), lons.len()), |(_, i)| lons[i]);
        let lat = Array2::from_shape_fn((lats.len(), lons.len()), |(j, _)| lats[j]);
        (lon, lat)
    }

    #[test]
    fn test_periodic_seam() {
        let (lon, _) = regular(&[0.0, 90.0, 180.0, 270.0], &[-60.0]);
        let edges = periodic_lon_edges(&lon);
        assert_eq!(edges.row(0).to_vec(), vec![-45.0, 45.0, 135.0, 225.0, 315.0]);
    }

    #[test]
    fn test_roms_widths_sum_to_circumference() {
        let lons: Vec<f64> = (0..36).map(|i| 10.0 * i as f64).collect();
        let (lon, lat) = regular(&lons, &[-60.0, -50.0, -40.0]);
        let (dx, dy) = roms_cell_widths(&lon, &lat, -30.0);

        let circumference = 2.0 * std::f64::consts::PI * EARTH_RADIUS * (60.0 * DEG2RAD).cos();
        let row_sum: f64 = dx.row(0).sum();
        assert!((row_sum - circumference).abs() / circumference < 1e-12);

        // Rows span -60 -> -55 -> -45 -> -30
        let deg = EARTH_RADIUS * DEG2RAD;
        assert!((dy[[0, 0]] - 5.0 * deg).abs() < TOL);
        assert!((dy[[1, 0]] - 10.0 * deg).abs() < TOL);
        assert!((dy[[2, 0]] - 15.0 * deg).abs() < TOL);
    }

    #[test]
    fn test_sose_extrapolates_outer_rows() {
        let (lon, lat) = regular(&[0.0, 180.0], &[-70.0, -68.0, -66.0]);
        let (_, dy) = sose_cell_widths(&lon, &lat);
        let deg = EARTH_RADIUS * DEG2RAD;
        for j in 0..3 {
            assert!((dy[[j, 0]] - 2.0 * deg).abs() < TOL);
        }
    }

    #[test]
    fn test_dy_northern_boundary() {
        let lat = array![[-70.0], [-60.0]];
        let dy = dy_with_northern_boundary(&lat, -30.0);
        let deg = EARTH_RADIUS * DEG2RAD;
        assert!((dy[[0, 0]] - 5.0 * deg).abs() < TOL);
        assert!((dy[[1, 0]] - 35.0 * deg).abs() < TOL);
    }

    #[test]
    fn test_sose_vertical() {
        let z = array![-5.0, -15.0, -30.0];
        let (edges, dz) = sose_vertical(&z);
        assert_eq!(edges.to_vec(), vec![0.0, -10.0, -22.5, -37.5]);
        assert_eq!(dz.to_vec(), vec![10.0, 12.5, 15.0]);
    }
}
