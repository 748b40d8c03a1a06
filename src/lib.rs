//! ymraster: raster utilities for remote-sensing workflows
//!
//! Band extraction, pansharpening fusion, normalized-difference spectral
//! indices, pixel-wise temporal statistics over image stacks and a
//! large-scale mean-shift (LSMS) segmentation chain. Raster I/O goes
//! through GDAL; fusion and segmentation are delegated to an external
//! toolbox (Orfeo ToolBox by default).

pub mod types;
pub mod io;
pub mod core;
pub mod toolbox;
pub mod cli;

#[cfg(feature = "python")]
mod python;

// Re-export main types and functions for easier access
pub use types::{BandImage, GeoTransform, RasterError, RasterResult, SpectralIndex};

pub use io::{OutputBand, Raster};
pub use toolbox::{OtbToolbox, ProcessingToolbox};
pub use crate::core::{
    temporal_stats, LsmsParams, LsmsPipeline, StatName, StatResult, TemporalReducer,
    TemporalStatsParams, TimeReference,
};
