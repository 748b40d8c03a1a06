use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Pixel values are always handled as 64-bit floats once read
pub type PixelValue = f64;

/// 2D single-band image (height x width)
pub type BandImage = Array2<PixelValue>;

/// Geospatial transformation parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn from_gdal(gt: [f64; 6]) -> Self {
        Self {
            top_left_x: gt[0],
            pixel_width: gt[1],
            rotation_x: gt[2],
            top_left_y: gt[3],
            rotation_y: gt[4],
            pixel_height: gt[5],
        }
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.top_left_x,
            self.pixel_width,
            self.rotation_x,
            self.top_left_y,
            self.rotation_y,
            self.pixel_height,
        ]
    }

    /// Compare two transforms term by term within `tolerance`
    pub fn approx_eq(&self, other: &GeoTransform, tolerance: f64) -> bool {
        self.to_gdal()
            .iter()
            .zip(other.to_gdal().iter())
            .all(|(a, b)| (a - b).abs() <= tolerance)
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        // GDAL's identity transform for ungeoreferenced images
        Self::from_gdal([0.0, 1.0, 0.0, 0.0, 0.0, 1.0])
    }
}

/// Normalized-difference spectral indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpectralIndex {
    /// Normalized Difference Vegetation Index: (nir - red) / (nir + red)
    Ndvi,
    /// Normalized Difference Moisture Index: (nir - mir) / (nir + mir)
    Ndmi,
    /// Normalized Difference Snow Index: (green - mir) / (green + mir)
    Ndsi,
}

impl SpectralIndex {
    /// Band names (positive term, negative term) looked up in a band map
    pub fn band_names(&self) -> (&'static str, &'static str) {
        match self {
            SpectralIndex::Ndvi => ("nir", "red"),
            SpectralIndex::Ndmi => ("nir", "mir"),
            SpectralIndex::Ndsi => ("green", "mir"),
        }
    }
}

impl std::fmt::Display for SpectralIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpectralIndex::Ndvi => write!(f, "NDVI"),
            SpectralIndex::Ndmi => write!(f, "NDMI"),
            SpectralIndex::Ndsi => write!(f, "NDSI"),
        }
    }
}

/// Error types for raster processing
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("Cannot open raster {}: {}", .path.display(), .reason)]
    FileOpen { path: PathBuf, reason: String },

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Band index {index} out of range (raster has {band_count} band(s))")]
    BandIndex { index: usize, band_count: usize },

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Unknown statistic: {0}")]
    UnknownStatistic(String),

    #[error("External tool {tool} failed: {message}")]
    ExternalTool { tool: String, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not a valid date: '{0}'")]
    InvalidDate(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),
}

/// Result type for raster operations
pub type RasterResult<T> = Result<T, RasterError>;
