mod common;

use approx::assert_abs_diff_eq;
use common::{write_raster, write_single, GEOTRANSFORM};
use gdal::{Dataset, Metadata};
use ndarray::{array, Array2};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use ymraster::core::{temporal_stats, StatName, TemporalStatsParams, TimeReference};
use ymraster::io::{parse_date, Raster, DEFAULT_DRIVER};
use ymraster::RasterError;

fn write_stack(dir: &Path, names: &[&str], bands: Vec<Array2<f64>>) -> Vec<Raster> {
    names
        .iter()
        .zip(bands)
        .map(|(name, band)| {
            let path = dir.join(name);
            write_single(&path, band);
            Raster::open(&path).unwrap()
        })
        .collect()
}

fn params(stats: &[StatName]) -> TemporalStatsParams {
    TemporalStatsParams {
        stats: stats.to_vec(),
        ..Default::default()
    }
}

fn read_output(path: &Path) -> (Raster, Vec<String>) {
    let raster = Raster::open(path).unwrap();
    let dataset = Dataset::open(path).unwrap();
    let descriptions = (1..=raster.band_count())
        .map(|i| dataset.rasterband(i as isize).unwrap().description().unwrap())
        .collect();
    (raster, descriptions)
}

#[test]
fn test_maximum_and_its_date() {
    let dir = TempDir::new().unwrap();
    let rasters = write_stack(
        dir.path(),
        &["t0.tif", "t1.tif", "t2.tif"],
        vec![
            array![[1.0, 2.0], [3.0, 4.0]],
            array![[5.0, 2.0], [1.0, 4.0]],
            array![[3.0, 9.0], [2.0, 4.0]],
        ],
    );
    let out = dir.path().join("stats.tif");

    temporal_stats(
        &rasters,
        &out,
        DEFAULT_DRIVER,
        params(&[StatName::Maximum]),
        &TimeReference::FirstStep,
    )
    .unwrap();

    let (stats, descriptions) = read_output(&out);
    assert_eq!(descriptions, ["maximum", "maximum_date"]);
    assert_eq!(stats.geotransform().to_gdal(), GEOTRANSFORM);

    let maximum = stats.read_band(1).unwrap();
    let date = stats.read_band(2).unwrap();
    assert_eq!(maximum[[0, 0]], 5.0);
    assert_eq!(date[[0, 0]], 1.0);
    assert_eq!(maximum[[0, 1]], 9.0);
    assert_eq!(date[[0, 1]], 2.0);
    assert_eq!(date[[1, 1]], 0.0); // constant pixel: earliest step
    assert!(stats.nodata(1).unwrap().unwrap().is_nan());
}

#[test]
fn test_default_statistics_layout() {
    let dir = TempDir::new().unwrap();
    let rasters = write_stack(
        dir.path(),
        &["a.tif", "b.tif"],
        vec![Array2::from_elem((3, 4), 2.0), Array2::from_elem((3, 4), 6.0)],
    );
    let out = dir.path().join("stats.tif");

    let result = temporal_stats(
        &rasters,
        &out,
        DEFAULT_DRIVER,
        TemporalStatsParams::default(),
        &TimeReference::FirstStep,
    )
    .unwrap();
    assert_eq!(result.len(), 6);

    let (stats, descriptions) = read_output(&out);
    assert_eq!(
        descriptions,
        ["minimum", "minimum_date", "maximum", "maximum_date", "mean", "std"]
    );
    assert_eq!(stats.shape(), (3, 4));
    assert!(stats.read_band(5).unwrap().iter().all(|&v| v == 4.0));
    assert!(stats.read_band(6).unwrap().iter().all(|&v| v == 2.0));
}

#[test]
fn test_identical_rasters() {
    let dir = TempDir::new().unwrap();
    let image = array![[0.3, 12.5, -4.0], [7.0, 0.0, 1e-3]];
    let rasters = write_stack(
        dir.path(),
        &["a.tif", "b.tif", "c.tif", "d.tif"],
        vec![image.clone(); 4],
    );

    let result = temporal_stats(
        &rasters,
        dir.path().join("stats.tif"),
        DEFAULT_DRIVER,
        params(&[StatName::Mean, StatName::StdDev]),
        &TimeReference::FirstStep,
    )
    .unwrap();

    assert_eq!(result.get(StatName::Mean).unwrap(), &image);
    assert!(result.get(StatName::StdDev).unwrap().iter().all(|&v| v == 0.0));
}

#[test]
fn test_nodata_from_files() {
    let dir = TempDir::new().unwrap();
    let paths: Vec<PathBuf> = (0..3).map(|i| dir.path().join(format!("n{}.tif", i))).collect();
    write_raster(&paths[0], &[array![[-1.0, -1.0]]], GEOTRANSFORM, Some(-1.0));
    write_raster(&paths[1], &[array![[4.0, -1.0]]], GEOTRANSFORM, Some(-1.0));
    write_raster(&paths[2], &[array![[2.0, -1.0]]], GEOTRANSFORM, Some(-1.0));
    let rasters: Vec<Raster> = paths.iter().map(|p| Raster::open(p).unwrap()).collect();

    let result = temporal_stats(
        &rasters,
        dir.path().join("stats.tif"),
        DEFAULT_DRIVER,
        TemporalStatsParams {
            stats: vec![StatName::Minimum, StatName::Mean],
            nodata: -9999.0,
            ..Default::default()
        },
        &TimeReference::FirstStep,
    )
    .unwrap();

    assert_eq!(result.get(StatName::Minimum).unwrap()[[0, 0]], 2.0);
    assert_eq!(result.date(StatName::Minimum).unwrap()[[0, 0]], 2.0);
    assert_eq!(result.get(StatName::Mean).unwrap()[[0, 0]], 3.0);
    assert_eq!(result.get(StatName::Mean).unwrap()[[0, 1]], -9999.0);
    assert_eq!(result.date(StatName::Minimum).unwrap()[[0, 1]], -9999.0);
}

#[test]
fn test_dates_from_file_names() {
    let dir = TempDir::new().unwrap();
    let rasters = write_stack(
        dir.path(),
        &["ndvi_2013-04-25.tif", "ndvi_2013-05-05.tif", "ndvi_2013-05-07.tif"],
        vec![array![[0.2]], array![[0.8]], array![[0.1]]],
    );
    assert_eq!(rasters[0].acquired(), Some(parse_date("2013-04-25").unwrap()));

    let stats = [StatName::Maximum, StatName::Minimum];
    let relative = temporal_stats(
        &rasters,
        dir.path().join("relative.tif"),
        DEFAULT_DRIVER,
        params(&stats),
        &TimeReference::FirstStep,
    )
    .unwrap();
    assert_abs_diff_eq!(relative.date(StatName::Maximum).unwrap()[[0, 0]], 10.0);
    assert_abs_diff_eq!(relative.date(StatName::Minimum).unwrap()[[0, 0]], 12.0);

    let fixed = temporal_stats(
        &rasters,
        dir.path().join("fixed.tif"),
        DEFAULT_DRIVER,
        params(&stats),
        &TimeReference::Date(parse_date("2013-05-01").unwrap()),
    )
    .unwrap();
    assert_abs_diff_eq!(fixed.date(StatName::Maximum).unwrap()[[0, 0]], 4.0);
    assert_abs_diff_eq!(fixed.date(StatName::Minimum).unwrap()[[0, 0]], 6.0);
}

#[test]
fn test_time_raster_reference() {
    let dir = TempDir::new().unwrap();
    let rasters = write_stack(
        dir.path(),
        &["a.tif", "b.tif", "c.tif"],
        vec![array![[1.0, 7.0]], array![[5.0, 2.0]], array![[3.0, 3.0]]],
    );
    let time_path = dir.path().join("time.tif");
    write_raster(&time_path, &[array![[0.5, -3.0]]], GEOTRANSFORM, Some(-3.0));
    let reference = TimeReference::from_raster(&Raster::open(&time_path).unwrap()).unwrap();

    let result = temporal_stats(
        &rasters,
        dir.path().join("stats.tif"),
        DEFAULT_DRIVER,
        params(&[StatName::Maximum]),
        &reference,
    )
    .unwrap();

    let dates = result.date(StatName::Maximum).unwrap();
    assert_eq!(dates[[0, 0]], 0.5);
    assert!(dates[[0, 1]].is_nan());
}

#[test]
fn test_shape_mismatch() {
    let dir = TempDir::new().unwrap();
    let rasters = write_stack(
        dir.path(),
        &["a.tif", "b.tif"],
        vec![Array2::zeros((2, 2)), Array2::zeros((3, 2))],
    );
    let out = dir.path().join("stats.tif");

    let err = temporal_stats(
        &rasters,
        &out,
        DEFAULT_DRIVER,
        TemporalStatsParams::default(),
        &TimeReference::FirstStep,
    )
    .unwrap_err();
    assert!(matches!(err, RasterError::ShapeMismatch(_)));
    assert!(!out.exists());
}

#[test]
fn test_geotransform_mismatch() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.tif");
    let b = dir.path().join("b.tif");
    write_single(&a, Array2::zeros((2, 2)));
    let mut shifted = GEOTRANSFORM;
    shifted[0] += 20.0;
    write_raster(&b, &[Array2::zeros((2, 2))], shifted, None);

    let rasters = vec![Raster::open(&a).unwrap(), Raster::open(&b).unwrap()];
    let err = temporal_stats(
        &rasters,
        dir.path().join("stats.tif"),
        DEFAULT_DRIVER,
        TemporalStatsParams::default(),
        &TimeReference::FirstStep,
    )
    .unwrap_err();
    assert!(matches!(err, RasterError::ShapeMismatch(_)));
}

#[test]
fn test_band_index_out_of_range() {
    let dir = TempDir::new().unwrap();
    let two_bands = dir.path().join("two.tif");
    let one_band = dir.path().join("one.tif");
    write_raster(&two_bands, &[Array2::zeros((2, 2)), Array2::ones((2, 2))], GEOTRANSFORM, None);
    write_single(&one_band, Array2::zeros((2, 2)));
    let rasters = vec![Raster::open(&two_bands).unwrap(), Raster::open(&one_band).unwrap()];

    let err = temporal_stats(
        &rasters,
        dir.path().join("stats.tif"),
        DEFAULT_DRIVER,
        TemporalStatsParams {
            band_index: 2,
            ..Default::default()
        },
        &TimeReference::FirstStep,
    )
    .unwrap_err();
    assert!(matches!(err, RasterError::BandIndex { index: 2, band_count: 1 }));
}

#[test]
fn test_empty_input() {
    let dir = TempDir::new().unwrap();
    let err = temporal_stats(
        &[],
        dir.path().join("stats.tif"),
        DEFAULT_DRIVER,
        TemporalStatsParams::default(),
        &TimeReference::FirstStep,
    )
    .unwrap_err();
    assert!(matches!(err, RasterError::EmptyInput(_)));
}

#[test]
fn test_unreadable_input() {
    let err = Raster::open("/nonexistent/stack/t0.tif").unwrap_err();
    assert!(matches!(err, RasterError::FileOpen { .. }));
}
