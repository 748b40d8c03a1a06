//! Python bindings, built with the `python` feature

use crate::core::temporal_stats::{parse_stats, temporal_stats, TemporalStatsParams, TimeReference};
use crate::io::raster::{Raster, DEFAULT_DRIVER};
use crate::types::RasterError;
use numpy::{IntoPyArray, PyArray2};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyTuple;
use std::path::PathBuf;

fn to_py_err(e: RasterError) -> PyErr {
    match e {
        RasterError::BandIndex { .. }
        | RasterError::UnknownStatistic(_)
        | RasterError::InvalidArgument(_)
        | RasterError::InvalidDate(_)
        | RasterError::EmptyInput(_)
        | RasterError::ShapeMismatch(_) => PyErr::new::<PyValueError, _>(format!("{}", e)),
        _ => PyErr::new::<PyRuntimeError, _>(format!("{}", e)),
    }
}

/// Python module definition
#[pymodule]
fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<PyRaster>()?;
    m.add_function(wrap_pyfunction!(py_temporal_stats, m)?)?;
    Ok(())
}

/// Python wrapper for Raster
#[pyclass(name = "Raster")]
struct PyRaster {
    inner: Raster,
}

#[pymethods]
impl PyRaster {
    #[new]
    #[pyo3(signature = (filename, *bands))]
    fn new(filename: String, bands: &PyTuple) -> PyResult<Self> {
        let bands = bands
            .iter()
            .map(|b| b.extract::<String>())
            .collect::<PyResult<Vec<_>>>()?;
        let names: Vec<&str> = bands.iter().map(|s| s.as_str()).collect();
        let inner = Raster::with_band_names(&filename, &names).map_err(to_py_err)?;
        Ok(PyRaster { inner })
    }

    #[getter]
    fn filename(&self) -> String {
        self.inner.path().display().to_string()
    }

    #[getter]
    fn width(&self) -> usize {
        self.inner.width()
    }

    #[getter]
    fn height(&self) -> usize {
        self.inner.height()
    }

    #[getter]
    fn number_bands(&self) -> usize {
        self.inner.band_count()
    }

    #[getter]
    fn crs(&self) -> String {
        self.inner.crs().to_string()
    }

    #[getter]
    fn geotransform(&self) -> (f64, f64, f64, f64, f64, f64) {
        let gt = self.inner.geotransform().to_gdal();
        (gt[0], gt[1], gt[2], gt[3], gt[4], gt[5])
    }

    #[getter]
    fn topleft_x(&self) -> f64 {
        self.inner.topleft().0
    }

    #[getter]
    fn topleft_y(&self) -> f64 {
        self.inner.topleft().1
    }

    #[getter]
    fn pixel_width(&self) -> f64 {
        self.inner.pixel_size().0
    }

    #[getter]
    fn pixel_height(&self) -> f64 {
        self.inner.pixel_size().1
    }

    fn band_index(&self, name: &str) -> PyResult<usize> {
        self.inner.band_index(name).map_err(to_py_err)
    }

    fn read_band<'py>(&self, py: Python<'py>, idx: usize) -> PyResult<&'py PyArray2<f64>> {
        let band = self.inner.read_band(idx).map_err(to_py_err)?;
        Ok(band.into_pyarray(py))
    }

    #[pyo3(signature = (idxs, out_filename = None))]
    fn remove_bands(&self, idxs: Vec<usize>, out_filename: Option<String>) -> PyResult<String> {
        let out = out_filename.map(PathBuf::from);
        let written = self
            .inner
            .remove_bands(&idxs, out.as_deref())
            .map_err(to_py_err)?;
        Ok(written.display().to_string())
    }

    fn ndvi(&self, out_filename: String, idx_red: usize, idx_nir: usize) -> PyResult<()> {
        self.inner
            .ndvi(&out_filename, idx_red, idx_nir)
            .map_err(to_py_err)?;
        Ok(())
    }

    fn __repr__(&self) -> String {
        format!(
            "Raster('{}', {}x{}, {} band(s))",
            self.inner.path().display(),
            self.inner.width(),
            self.inner.height(),
            self.inner.band_count()
        )
    }
}

/// Compute temporal statistics of a list of raster files
#[pyfunction]
#[pyo3(name = "temporal_stats", signature = (filenames, out_filename, stats = None, idx_band = 1))]
fn py_temporal_stats(
    filenames: Vec<String>,
    out_filename: String,
    stats: Option<Vec<String>>,
    idx_band: usize,
) -> PyResult<Vec<String>> {
    let rasters = filenames
        .iter()
        .map(Raster::open)
        .collect::<Result<Vec<_>, _>>()
        .map_err(to_py_err)?;

    let mut params = TemporalStatsParams {
        band_index: idx_band,
        ..Default::default()
    };
    if let Some(stats) = stats {
        params.stats = parse_stats(&stats).map_err(to_py_err)?;
    }

    let result = temporal_stats(
        &rasters,
        &out_filename,
        DEFAULT_DRIVER,
        params,
        &TimeReference::FirstStep,
    )
    .map_err(to_py_err)?;
    Ok(result.bands().iter().map(|b| b.label()).collect())
}
