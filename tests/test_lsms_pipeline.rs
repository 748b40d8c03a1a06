mod common;

use common::write_single;
use ndarray::Array2;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use ymraster::core::{pansharpen, LsmsParams, LsmsPipeline};
use ymraster::io::Raster;
use ymraster::toolbox::{
    MergeParams, PansharpenParams, ProcessingToolbox, SegmentationParams, SmoothingParams,
    VectorizationParams,
};
use ymraster::{RasterError, RasterResult};

/// Toolbox stand-in: records each call and writes a marker file per output
#[derive(Default)]
struct FakeToolbox {
    calls: RefCell<Vec<(&'static str, Vec<PathBuf>)>>,
    fail_on: Option<&'static str>,
}

impl FakeToolbox {
    fn call(&self, op: &'static str, inputs: &[&Path], outputs: &[&Path]) -> RasterResult<()> {
        let mut paths: Vec<PathBuf> = inputs.iter().map(|p| p.to_path_buf()).collect();
        paths.extend(outputs.iter().map(|p| p.to_path_buf()));
        self.calls.borrow_mut().push((op, paths));

        if self.fail_on == Some(op) {
            return Err(RasterError::ExternalTool {
                tool: op.to_string(),
                message: "exit status: 1".to_string(),
            });
        }
        for out in outputs {
            std::fs::write(out, op)?;
        }
        Ok(())
    }

    fn ops(&self) -> Vec<&'static str> {
        self.calls.borrow().iter().map(|(op, _)| *op).collect()
    }

    fn paths(&self, op: &str) -> Vec<PathBuf> {
        self.calls
            .borrow()
            .iter()
            .find(|(o, _)| *o == op)
            .map(|(_, p)| p.clone())
            .unwrap_or_default()
    }
}

impl ProcessingToolbox for FakeToolbox {
    fn smooth(&self, input: &Path, filtered: &Path, spatial: &Path, _: &SmoothingParams) -> RasterResult<()> {
        self.call("smooth", &[input], &[filtered, spatial])
    }

    fn segment(&self, filtered: &Path, spatial: &Path, out: &Path, _: &SegmentationParams) -> RasterResult<()> {
        self.call("segment", &[filtered, spatial], &[out])
    }

    fn merge(&self, filtered: &Path, labels: &Path, out: &Path, _: &MergeParams) -> RasterResult<()> {
        self.call("merge", &[filtered, labels], &[out])
    }

    fn vectorize(&self, image: &Path, labels: &Path, out: &Path, _: &VectorizationParams) -> RasterResult<()> {
        self.call("vectorize", &[image, labels], &[out])
    }

    fn pansharpen(&self, xs: &Path, pan: &Path, out: &Path, _: &PansharpenParams) -> RasterResult<()> {
        self.call("pansharpen", &[xs, pan], &[out])
    }
}

fn image(dir: &Path) -> PathBuf {
    let path = dir.join("xs.tif");
    write_single(&path, Array2::from_elem((8, 8), 100.0));
    path
}

fn lsms_params(out_dir: PathBuf) -> LsmsParams {
    LsmsParams {
        smoothing: SmoothingParams {
            spatial_radius: 5,
            range_radius: 15.0,
            ..Default::default()
        },
        out_dir,
        ..Default::default()
    }
}

#[test]
fn test_full_chain() {
    let dir = TempDir::new().unwrap();
    let xs = image(dir.path());
    let out_dir = dir.path().join("seg");

    let params = LsmsParams {
        merge: true,
        min_size: Some(20),
        vectorize: true,
        prefix: "A".to_string(),
        ..lsms_params(out_dir.clone())
    };
    let pipeline = LsmsPipeline::new(FakeToolbox::default(), params).unwrap();
    let outputs = pipeline.run(&xs).unwrap();

    assert_eq!(pipeline.toolbox().ops(), ["smooth", "segment", "merge", "vectorize"]);
    assert!(out_dir.is_dir());
    assert_eq!(outputs.merged, Some(out_dir.join("A_lsms_merged.tif")));

    // Segmentation reads the smoothing outputs
    let segment = pipeline.toolbox().paths("segment");
    assert_eq!(segment[0], outputs.filtered);
    assert_eq!(segment[1], outputs.spatial);

    // Vectorisation uses the original image and the merged labels
    let vectorize = pipeline.toolbox().paths("vectorize");
    assert_eq!(vectorize, [xs, out_dir.join("A_lsms_merged.tif"), out_dir.join("A_lsms_vect.shp")]);
}

#[test]
fn test_segmentation_only() {
    let dir = TempDir::new().unwrap();
    let xs = image(dir.path());

    let pipeline = LsmsPipeline::new(FakeToolbox::default(), lsms_params(dir.path().to_path_buf())).unwrap();
    let outputs = pipeline.run(&xs).unwrap();

    assert_eq!(pipeline.toolbox().ops(), ["smooth", "segment"]);
    assert_eq!(outputs.labels(), dir.path().join("lsms_seg.tif"));
    assert!(outputs.segmentation.exists());
}

#[test]
fn test_failure_stops_the_chain() {
    let dir = TempDir::new().unwrap();
    let xs = image(dir.path());
    let toolbox = FakeToolbox {
        fail_on: Some("segment"),
        ..Default::default()
    };
    let params = LsmsParams {
        vectorize: true,
        ..lsms_params(dir.path().to_path_buf())
    };

    let pipeline = LsmsPipeline::new(toolbox, params).unwrap();
    let err = pipeline.run(&xs).unwrap_err();
    assert!(matches!(err, RasterError::ExternalTool { ref tool, .. } if tool == "segment"));
    assert_eq!(pipeline.toolbox().ops(), ["smooth", "segment"]);
}

#[test]
fn test_pansharpen_to_new_file() {
    let dir = TempDir::new().unwrap();
    let xs = image(dir.path());
    let pan = dir.path().join("pan.tif");
    write_single(&pan, Array2::from_elem((16, 16), 50.0));
    let out = dir.path().join("sharp.tif");

    let toolbox = FakeToolbox::default();
    let written = pansharpen(
        &toolbox,
        &Raster::open(&xs).unwrap(),
        &Raster::open(&pan).unwrap(),
        Some(&out),
        &PansharpenParams::default(),
    )
    .unwrap();

    assert_eq!(written, out);
    assert_eq!(toolbox.paths("pansharpen"), [xs, pan, out]);
}

#[test]
fn test_pansharpen_overwrites_input() {
    let dir = TempDir::new().unwrap();
    let xs = image(dir.path());
    let pan = dir.path().join("pan.tif");
    write_single(&pan, Array2::from_elem((16, 16), 50.0));

    let toolbox = FakeToolbox::default();
    let raster = Raster::open(&xs).unwrap();
    let written = raster.fusion(&toolbox, &Raster::open(&pan).unwrap(), None).unwrap();

    assert_eq!(written, xs);
    assert_eq!(std::fs::read(&xs).unwrap(), b"pansharpen");
}

#[test]
fn test_failed_pansharpen_keeps_input() {
    let dir = TempDir::new().unwrap();
    let xs = image(dir.path());
    let pan = dir.path().join("pan.tif");
    write_single(&pan, Array2::from_elem((16, 16), 50.0));
    let before = std::fs::read(&xs).unwrap();

    let toolbox = FakeToolbox {
        fail_on: Some("pansharpen"),
        ..Default::default()
    };
    let raster = Raster::open(&xs).unwrap();
    let err = raster
        .fusion(&toolbox, &Raster::open(&pan).unwrap(), None)
        .unwrap_err();

    assert!(matches!(err, RasterError::ExternalTool { .. }));
    assert_eq!(std::fs::read(&xs).unwrap(), before);
}
