//! I/O modules for reading and writing rasters and resolving acquisition dates

pub mod dates;
pub mod raster;

pub use dates::{date_from_filename, days_since_epoch, parse_date};
pub use raster::{replace_file, OutputBand, Raster, DEFAULT_DRIVER};
