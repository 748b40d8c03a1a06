#![allow(dead_code)]

use gdal::raster::Buffer;
use gdal::DriverManager;
use ndarray::Array2;
use std::path::Path;

pub const GEOTRANSFORM: [f64; 6] = [500_000.0, 10.0, 0.0, 4_800_000.0, 0.0, -10.0];

/// Write a Float64 GeoTIFF with one band per array
pub fn write_raster(path: &Path, bands: &[Array2<f64>], geotransform: [f64; 6], nodata: Option<f64>) {
    let (height, width) = bands[0].dim();
    let driver = DriverManager::get_driver_by_name("GTiff").unwrap();
    let mut dataset = driver
        .create_with_band_type::<f64, _>(path, width as isize, height as isize, bands.len() as isize)
        .unwrap();
    dataset.set_geo_transform(&geotransform).unwrap();

    for (i, band) in bands.iter().enumerate() {
        let mut rasterband = dataset.rasterband(i as isize + 1).unwrap();
        let buffer = Buffer::new((width, height), band.iter().cloned().collect());
        rasterband.write((0, 0), (width, height), &buffer).unwrap();
        if let Some(nodata) = nodata {
            rasterband.set_no_data_value(Some(nodata)).unwrap();
        }
    }
}

pub fn write_single(path: &Path, band: Array2<f64>) {
    write_raster(path, &[band], GEOTRANSFORM, None);
}
