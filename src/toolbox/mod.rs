//! External processing toolbox: the operations this crate delegates
//! (mean-shift smoothing, LSMS segmentation, merging, vectorisation,
//! pansharpening). Each takes file paths and writes its outputs to disk.

pub mod otb;

pub use otb::OtbToolbox;

use crate::types::RasterResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Mean-shift smoothing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmoothingParams {
    /// Spatial radius of the neighborhood (pixels)
    pub spatial_radius: u32,
    /// Range radius in radiometry units
    pub range_radius: f64,
    /// Mean-shift vector convergence threshold
    pub threshold: f64,
    pub max_iterations: u32,
    /// Range radius coefficient: y = range_ramp * x + range_radius
    pub range_ramp: f64,
    pub mode_search: bool,
}

impl Default for SmoothingParams {
    fn default() -> Self {
        Self {
            spatial_radius: 5,
            range_radius: 15.0,
            threshold: 0.1,
            max_iterations: 10,
            range_ramp: 0.0,
            mode_search: false,
        }
    }
}

/// Tile size used by the tiled LSMS steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileSize {
    pub x: u32,
    pub y: u32,
}

impl Default for TileSize {
    fn default() -> Self {
        Self { x: 256, y: 256 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationParams {
    pub spatial_radius: u32,
    pub range_radius: f64,
    /// Regions smaller than this are dropped during segmentation (0 keeps all)
    pub min_size: u32,
    pub tile_size: TileSize,
}

impl Default for SegmentationParams {
    fn default() -> Self {
        Self {
            spatial_radius: 5,
            range_radius: 15.0,
            min_size: 0,
            tile_size: TileSize::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeParams {
    /// Regions smaller than this are merged into their closest neighbor
    pub min_size: u32,
    pub tile_size: TileSize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorizationParams {
    pub tile_size: TileSize,
}

/// Pansharpening fusion method
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FusionMethod {
    /// Ratio component substitution
    #[default]
    Rcs,
    /// Local mean and variance matching
    Lmvm,
    Bayes,
}

impl FusionMethod {
    pub fn name(&self) -> &'static str {
        match self {
            FusionMethod::Rcs => "rcs",
            FusionMethod::Lmvm => "lmvm",
            FusionMethod::Bayes => "bayes",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PansharpenParams {
    pub method: FusionMethod,
}

/// Operations provided by an external remote-sensing toolbox.
///
/// Implementations run synchronously and report any failure as
/// `RasterError::ExternalTool`; nothing is retried.
pub trait ProcessingToolbox {
    /// Mean-shift smoothing of `input` into a filtered image and a spatial
    /// (position) image
    fn smooth(
        &self,
        input: &Path,
        filtered_out: &Path,
        spatial_out: &Path,
        params: &SmoothingParams,
    ) -> RasterResult<()>;

    /// Segment a filtered image using its spatial image into a label image
    fn segment(
        &self,
        filtered: &Path,
        spatial: &Path,
        labels_out: &Path,
        params: &SegmentationParams,
    ) -> RasterResult<()>;

    /// Merge small regions of a label image
    fn merge(
        &self,
        filtered: &Path,
        labels: &Path,
        merged_out: &Path,
        params: &MergeParams,
    ) -> RasterResult<()>;

    /// Vectorise a label image, attaching statistics of `image` per polygon
    fn vectorize(
        &self,
        image: &Path,
        labels: &Path,
        vector_out: &Path,
        params: &VectorizationParams,
    ) -> RasterResult<()>;

    /// Fuse a multispectral image with a panchromatic one
    fn pansharpen(
        &self,
        multispectral: &Path,
        panchromatic: &Path,
        out: &Path,
        params: &PansharpenParams,
    ) -> RasterResult<()>;
}
