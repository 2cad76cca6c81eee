//! NetCDF round trips through the analysis programs.
//!
//! These tests verify:
//! 1. Forcing files can be created, appended to and read back
//! 2. The melt rate map reads an ocean averages file and writes a figure
//! 3. A single vertical level of a 4D record matches the full 3D read

#![cfg(feature = "netcdf")]

use std::path::Path;

use ndarray::Array2;
use ocean_diag::analysis::melt::{self, MeltParams};
use ocean_diag::forcing::{ATM_VARIABLES, FORCING_TIME_UNITS};
use ocean_diag::io::{ForcingFileWriter, NcReader, Trim};
use ocean_diag::units::ms_to_my;

const NY: usize = 12;
const NX: usize = 20;

fn coordinates() -> (Array2<f64>, Array2<f64>) {
    let lon = Array2::from_shape_fn((NY, NX), |(_, i)| 360.0 * i as f64 / NX as f64);
    let lat = Array2::from_shape_fn((NY, NX), |(j, _)| -82.0 + 2.0 * j as f64);
    (lon, lat)
}

fn put_2d(file: &mut netcdf::FileMut, name: &str, field: &Array2<f64>) {
    let mut var = file.add_variable::<f64>(name, &["eta_rho", "xi_rho"]).unwrap();
    var.put_values(&field.iter().copied().collect::<Vec<_>>(), ..).unwrap();
}

fn write_ocean_file(path: &Path, melt: f64) {
    let (lon, lat) = coordinates();
    let zice = Array2::from_shape_fn((NY, NX), |(j, _)| if j < 3 { -200.0 } else { 0.0 });
    let mask = Array2::from_elem((NY, NX), 1.0);

    let mut file = netcdf::create(path).unwrap();
    file.add_dimension("eta_rho", NY).unwrap();
    file.add_dimension("xi_rho", NX).unwrap();
    file.add_unlimited_dimension("ocean_time").unwrap();
    put_2d(&mut file, "lon_rho", &lon);
    put_2d(&mut file, "lat_rho", &lat);
    put_2d(&mut file, "mask_rho", &mask);
    put_2d(&mut file, "zice", &zice);
    let mut m = file
        .add_variable::<f64>("m", &["ocean_time", "eta_rho", "xi_rho"])
        .unwrap();
    for t in 0..2 {
        let values = vec![melt * (t + 1) as f64; NY * NX];
        m.put_values(&values, (t, .., ..)).unwrap();
    }
}

#[test]
fn test_forcing_file_create_and_append() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("AN_1995_subdaily.nc");
    let (lon, lat) = coordinates();
    let pair = Array2::from_elem((NY, NX), 98_000.0);

    {
        let mut writer = ForcingFileWriter::create(&path, &lon, &lat, FORCING_TIME_UNITS, &ATM_VARIABLES).unwrap();
        writer.write_record(0, 0.0, &[("Pair", &pair)]).unwrap();
        assert_eq!(writer.n_records(), 1);
    }
    {
        let mut writer = ForcingFileWriter::append(&path).unwrap();
        writer.write_record(1, 0.25, &[("Pair", &(&pair + 10.0))]).unwrap();
        assert_eq!(writer.n_records(), 2);
    }

    let reader = NcReader::open(&path).unwrap();
    assert_eq!(reader.n_records("Pair").unwrap(), 2);
    let time = reader.read_1d("time").unwrap();
    assert_eq!(time.to_vec(), vec![0.0, 0.25]);
    let second = reader.read_record_2d("Pair", 1).unwrap();
    assert_eq!(second[[3, 4]], 98_010.0);
    assert_eq!(reader.read_2d("lat_rho").unwrap(), lat);
    assert!(reader.has_variable("Vwind"));
}

#[test]
fn test_melt_map_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let ocean = dir.path().join("ocean_avg.nc");
    let output = dir.path().join("ismr.png");
    write_ocean_file(&ocean, 1e-7);

    let params = MeltParams {
        trim: Trim::new(2, 1),
        average_last: Some(2),
        width: 300,
        height: 200,
        ..MeltParams::default()
    };
    let ismr = melt::run(&ocean, &output, &params).unwrap();
    assert_eq!(ismr.dim(), (NY - 2, NX - 1));
    // Mean of the two records in the cavity, masked outside
    assert!((ismr[[0, 0]] - ms_to_my(1.5e-7)).abs() < 1e-9);
    assert!(ismr[[5, 5]].is_nan());
    assert!(output.exists());
}

#[test]
fn test_bottom_level_matches_full_record() {
    const NZ: usize = 4;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ocean_his.nc");
    {
        let mut file = netcdf::create(&path).unwrap();
        file.add_dimension("s_rho", NZ).unwrap();
        file.add_dimension("eta_rho", NY).unwrap();
        file.add_dimension("xi_rho", NX).unwrap();
        file.add_unlimited_dimension("ocean_time").unwrap();
        let mut temp = file
            .add_variable::<f64>("temp", &["ocean_time", "s_rho", "eta_rho", "xi_rho"])
            .unwrap();
        for t in 0..2 {
            let values: Vec<f64> = (0..NZ * NY * NX)
                .map(|n| -1.8 + 0.01 * n as f64 + t as f64)
                .collect();
            temp.put_values(&values, (t, .., .., ..)).unwrap();
        }
    }

    let reader = NcReader::open(&path).unwrap();
    let full = reader.read_record_3d("temp", 1).unwrap();
    let bottom = reader.read_record_level("temp", 1, 0).unwrap();
    assert_eq!(bottom.dim(), (NY, NX));
    assert_eq!(bottom, full.index_axis(ndarray::Axis(0), 0));
    assert!((bottom[[0, 0]] - (-0.8)).abs() < 1e-12);

    let top = reader.read_record_level("temp", 1, NZ - 1).unwrap();
    assert_eq!(top, full.index_axis(ndarray::Axis(0), NZ - 1));
    assert!(reader.read_record_level("temp", 1, NZ).is_err());
}
