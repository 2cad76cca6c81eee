//! Benchmarks for grid construction.
//!
//! Run with: `cargo bench --bench grid_bench`
//!
//! Times the 3D cartesian integrands of a circumpolar ROMS grid and the
//! s-coordinate depth reconstruction they rely on.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array2;
use ocean_diag::grid::{polar_grid, CartesianGrid3D, DEFAULT_NORTHERN_BOUNDARY};
use ocean_diag::vertical::VerticalGridParams;

/// Circumpolar grid south of 30°S with an ice shelf band near the coast.
fn generate_grid(ny: usize, nx: usize) -> (Array2<f64>, Array2<f64>, Array2<f64>, Array2<f64>) {
    let lon = Array2::from_shape_fn((ny, nx), |(_, i)| 360.0 * i as f64 / nx as f64);
    let lat = Array2::from_shape_fn((ny, nx), |(j, _)| -80.0 + 50.0 * j as f64 / ny as f64);
    let h = Array2::from_shape_fn((ny, nx), |(j, i)| {
        let phase = i as f64 * 0.05;
        500.0 + 3500.0 * (j as f64 / ny as f64) + 200.0 * phase.sin()
    });
    let zice = Array2::from_shape_fn((ny, nx), |(j, _)| if j < ny / 10 { -300.0 } else { 0.0 });
    (lon, lat, h, zice)
}

fn bench_cartesian_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("cartesian_grid_3d");
    group.sample_size(20);
    let sigma = VerticalGridParams::default().build();

    for &(ny, nx) in &[(50, 100), (100, 200), (200, 400)] {
        let (lon, lat, h, zice) = generate_grid(ny, nx);
        group.bench_with_input(
            BenchmarkId::new("build", format!("{}x{}", ny, nx)),
            &(ny, nx),
            |b, _| {
                b.iter(|| {
                    let grid = CartesianGrid3D::build(
                        black_box(&lon),
                        black_box(&lat),
                        black_box(&h),
                        black_box(&zice),
                        &sigma,
                        DEFAULT_NORTHERN_BOUNDARY,
                    );
                    black_box(grid.volume())
                })
            },
        );
    }
    group.finish();
}

fn bench_vertical(c: &mut Criterion) {
    let (_, _, h, zice) = generate_grid(200, 400);
    let sigma = VerticalGridParams::default().build();
    c.bench_function("z_rho_3d_200x400", |b| {
        b.iter(|| black_box(sigma.z_rho_3d(black_box(&h), black_box(&zice))))
    });
}

fn bench_polar_projection(c: &mut Criterion) {
    let (lon, lat, _, _) = generate_grid(200, 400);
    c.bench_function("polar_grid_200x400", |b| {
        b.iter(|| black_box(polar_grid(black_box(&lon), black_box(&lat))))
    });
}

criterion_group!(benches, bench_cartesian_grid, bench_vertical, bench_polar_projection);
criterion_main!(benches);
