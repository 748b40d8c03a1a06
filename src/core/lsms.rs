//! Large-scale mean-shift (LSMS) segmentation chain
//!
//! Smoothing, segmentation, optional small-region merging and optional
//! vectorisation are delegated to a [`ProcessingToolbox`]; this module
//! validates parameters, names the intermediate files and runs the steps
//! in order.

use crate::io::raster::Raster;
use crate::toolbox::{
    MergeParams, ProcessingToolbox, SegmentationParams, SmoothingParams, TileSize,
    VectorizationParams,
};
use crate::types::{RasterError, RasterResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Parameters of the whole LSMS chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LsmsParams {
    pub smoothing: SmoothingParams,
    pub tile_size: TileSize,
    /// Run the small-region merging step
    pub merge: bool,
    /// Minimum region size for merging
    pub min_size: Option<u32>,
    /// Run the vectorisation step
    pub vectorize: bool,
    /// Prefix of every written file
    pub prefix: String,
    /// Directory receiving every written file
    pub out_dir: PathBuf,
}

impl Default for LsmsParams {
    fn default() -> Self {
        Self {
            smoothing: SmoothingParams::default(),
            tile_size: TileSize::default(),
            merge: false,
            min_size: None,
            vectorize: false,
            prefix: String::new(),
            out_dir: PathBuf::from("."),
        }
    }
}

/// Files written by one LSMS run
#[derive(Debug, Clone, PartialEq)]
pub struct LsmsOutputs {
    pub filtered: PathBuf,
    pub spatial: PathBuf,
    pub segmentation: PathBuf,
    pub merged: Option<PathBuf>,
    pub vector: Option<PathBuf>,
}

impl LsmsOutputs {
    /// Final label image: the merged one when merging ran
    pub fn labels(&self) -> &Path {
        self.merged.as_deref().unwrap_or(&self.segmentation)
    }
}

impl LsmsParams {
    fn file(&self, name: &str) -> PathBuf {
        let prefix = if self.prefix.is_empty() {
            String::new()
        } else {
            format!("{}_", self.prefix)
        };
        self.out_dir.join(format!("{}{}", prefix, name))
    }

    /// Output file names, derived from the parameters
    pub fn outputs(&self) -> LsmsOutputs {
        let s = &self.smoothing;
        LsmsOutputs {
            filtered: self.file(&format!(
                "spr_{}_rg_{}_max_{}_rga_{}_th_{}_filtered.tif",
                s.spatial_radius, s.range_radius, s.max_iterations, s.range_ramp, s.threshold
            )),
            spatial: self.file("spatial.tif"),
            segmentation: self.file("lsms_seg.tif"),
            merged: self.merge.then(|| self.file("lsms_merged.tif")),
            vector: self.vectorize.then(|| self.file("lsms_vect.shp")),
        }
    }

    pub fn validate(&self) -> RasterResult<()> {
        if self.smoothing.spatial_radius == 0 {
            return Err(RasterError::InvalidArgument(
                "spatial radius must be positive".to_string(),
            ));
        }
        if !(self.smoothing.range_radius > 0.0) {
            return Err(RasterError::InvalidArgument(format!(
                "range radius must be positive, got {}",
                self.smoothing.range_radius
            )));
        }
        if self.tile_size.x == 0 || self.tile_size.y == 0 {
            return Err(RasterError::InvalidArgument(format!(
                "tile size must be positive, got {}x{}",
                self.tile_size.x, self.tile_size.y
            )));
        }
        if self.merge && self.min_size.is_none() {
            return Err(RasterError::InvalidArgument(
                "the merging step needs a minimum region size".to_string(),
            ));
        }
        if !self.merge && self.min_size.is_some() {
            log::warn!("A minimum region size is only used by the merging step, which is disabled");
        }
        Ok(())
    }
}

/// LSMS segmentation over an injected toolbox
pub struct LsmsPipeline<T: ProcessingToolbox> {
    toolbox: T,
    params: LsmsParams,
}

impl<T: ProcessingToolbox> LsmsPipeline<T> {
    pub fn new(toolbox: T, params: LsmsParams) -> RasterResult<Self> {
        params.validate()?;
        Ok(Self { toolbox, params })
    }

    pub fn params(&self) -> &LsmsParams {
        &self.params
    }

    pub fn toolbox(&self) -> &T {
        &self.toolbox
    }

    /// Run the chain on a multispectral image
    pub fn run<P: AsRef<Path>>(&self, image: P) -> RasterResult<LsmsOutputs> {
        let image = image.as_ref();
        // Fail early on unreadable input rather than inside the toolbox
        let raster = Raster::open(image)?;
        log::info!(
            "LSMS segmentation of {} ({}x{}, {} band(s))",
            image.display(),
            raster.width(),
            raster.height(),
            raster.band_count()
        );

        std::fs::create_dir_all(&self.params.out_dir)?;
        let outputs = self.params.outputs();
        let p = &self.params;

        self.toolbox
            .smooth(image, &outputs.filtered, &outputs.spatial, &p.smoothing)?;
        log::info!("Smoothing step done: {}", outputs.filtered.display());

        let segmentation = SegmentationParams {
            spatial_radius: p.smoothing.spatial_radius,
            range_radius: p.smoothing.range_radius,
            min_size: 0,
            tile_size: p.tile_size,
        };
        self.toolbox.segment(
            &outputs.filtered,
            &outputs.spatial,
            &outputs.segmentation,
            &segmentation,
        )?;
        log::info!("Segmentation step done: {}", outputs.segmentation.display());

        if let (Some(merged), Some(min_size)) = (&outputs.merged, p.min_size) {
            let merge = MergeParams {
                min_size,
                tile_size: p.tile_size,
            };
            self.toolbox
                .merge(&outputs.filtered, &outputs.segmentation, merged, &merge)?;
            log::info!("Merging step done: {}", merged.display());
        }

        if let Some(vector) = &outputs.vector {
            let vectorization = VectorizationParams {
                tile_size: p.tile_size,
            };
            self.toolbox
                .vectorize(image, outputs.labels(), vector, &vectorization)?;
            log::info!("Vectorisation step done: {}", vector.display());
        }

        Ok(outputs)
    }
}
