use crate::io::raster::{replace_file, Raster};
use crate::toolbox::{PansharpenParams, ProcessingToolbox};
use crate::types::RasterResult;
use std::path::{Path, PathBuf};

/// Pansharpen `raster` with the panchromatic image `pan`.
///
/// The result goes to `out_path`, or replaces `raster`'s file when `None`.
/// Returns the written path.
pub fn pansharpen<T: ProcessingToolbox>(
    toolbox: &T,
    raster: &Raster,
    pan: &Raster,
    out_path: Option<&Path>,
    params: &PansharpenParams,
) -> RasterResult<PathBuf> {
    log::info!(
        "Pansharpening {} ({}x{}, {} band(s)) with {} ({}x{}), method {}",
        raster.path().display(),
        raster.width(),
        raster.height(),
        raster.band_count(),
        pan.path().display(),
        pan.width(),
        pan.height(),
        params.method.name()
    );

    match out_path {
        Some(out) => {
            toolbox.pansharpen(raster.path(), pan.path(), out, params)?;
            Ok(out.to_path_buf())
        }
        None => {
            replace_file(raster.path(), |tmp| {
                toolbox.pansharpen(raster.path(), pan.path(), tmp, params)
            })?;
            Ok(raster.path().to_path_buf())
        }
    }
}

impl Raster {
    /// Pansharpen this raster with `pan` using `toolbox`
    pub fn fusion<T: ProcessingToolbox>(
        &self,
        toolbox: &T,
        pan: &Raster,
        out_path: Option<&Path>,
    ) -> RasterResult<PathBuf> {
        pansharpen(toolbox, self, pan, out_path, &PansharpenParams::default())
    }
}
