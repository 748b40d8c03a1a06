use crate::io::raster::{OutputBand, Raster, DEFAULT_DRIVER};
use crate::types::{RasterError, RasterResult};
use ndarray::Axis;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

impl Raster {
    /// Write a copy of this raster without the bands at `idxs` (1-based).
    ///
    /// Remaining bands keep their relative order and their nodata values.
    /// When `out_path` is `None` the raster's own file is replaced.
    pub fn remove_bands(&self, idxs: &[usize], out_path: Option<&Path>) -> RasterResult<PathBuf> {
        let removed: BTreeSet<usize> = idxs.iter().copied().collect();
        for &idx in &removed {
            self.check_band(idx)?;
        }
        let kept: Vec<usize> = (1..=self.band_count())
            .filter(|idx| !removed.contains(idx))
            .collect();
        if kept.is_empty() {
            return Err(RasterError::InvalidArgument(format!(
                "removing bands {:?} would leave {} empty",
                removed,
                self.path().display()
            )));
        }

        log::info!(
            "Removing band(s) {:?} from {}, keeping {:?}",
            removed,
            self.path().display(),
            kept
        );

        let cube = self.read_all()?;
        let mut bands = Vec::with_capacity(kept.len());
        for &idx in &kept {
            bands.push(OutputBand::new(
                format!("band_{}", idx),
                cube.index_axis(Axis(0), idx - 1).to_owned(),
                self.nodata(idx)?,
            ));
        }

        self.write_bands_or_overwrite(out_path, DEFAULT_DRIVER, &bands)
    }
}

/// Remove the bands at `idxs` from every raster in `paths`.
///
/// An explicit `out_path` is only accepted for a single input; otherwise
/// each raster's own file is replaced. Returns the written paths in input
/// order.
pub fn remove_bands_many<P: AsRef<Path>>(
    paths: &[P],
    idxs: &[usize],
    out_path: Option<&Path>,
) -> RasterResult<Vec<PathBuf>> {
    if paths.is_empty() {
        return Err(RasterError::EmptyInput("no raster to remove bands from".to_string()));
    }
    if out_path.is_some() && paths.len() > 1 {
        return Err(RasterError::InvalidArgument(format!(
            "an output file can only be given for a single input raster, got {}",
            paths.len()
        )));
    }

    paths
        .iter()
        .map(|path| Raster::open(path)?.remove_bands(idxs, out_path))
        .collect()
}
