//! Core raster processing modules

pub mod band_removal;
pub mod fusion;
pub mod indices;
pub mod lsms;
pub mod temporal_stats;

// Re-export main types
pub use band_removal::remove_bands_many;
pub use fusion::pansharpen;
pub use indices::{ndmi, ndsi, ndvi, normalized_difference, normalized_difference_value};
pub use lsms::{LsmsOutputs, LsmsParams, LsmsPipeline};
pub use temporal_stats::{
    parse_stats, temporal_stats, BandKind, StatBand, StatName, StatResult, TemporalLayer,
    TemporalReducer, TemporalStatsParams, TimeReference, DEFAULT_STATS,
};
