use super::{
    MergeParams, PansharpenParams, ProcessingToolbox, SegmentationParams, SmoothingParams,
    VectorizationParams,
};
use crate::types::{RasterError, RasterResult};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Environment variable naming the directory of the `otbcli_*` launchers
pub const OTB_BIN_DIR_ENV: &str = "OTB_BIN_DIR";

/// Lines of stderr kept in error messages
const STDERR_TAIL_LINES: usize = 20;

/// One Orfeo ToolBox application call: `otbcli_<App> -key value ...`
#[derive(Debug, Clone)]
pub struct OtbCommand {
    app: &'static str,
    args: Vec<OsString>,
    outputs: Vec<PathBuf>,
}

impl OtbCommand {
    pub fn new(app: &'static str) -> Self {
        Self {
            app,
            args: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn param<V: AsRef<OsStr>>(mut self, key: &str, value: V) -> Self {
        self.args.push(OsString::from(format!("-{}", key)));
        self.args.push(value.as_ref().to_os_string());
        self
    }

    /// An output file parameter, checked for existence after the run
    pub fn output(mut self, key: &str, path: &Path) -> Self {
        self.outputs.push(path.to_path_buf());
        self.param(key, path)
    }

    /// Output file with an explicit pixel type, e.g. `labels.tif uint32`
    pub fn typed_output(mut self, key: &str, path: &Path, pixel_type: &str) -> Self {
        self.outputs.push(path.to_path_buf());
        self.args.push(OsString::from(format!("-{}", key)));
        self.args.push(path.as_os_str().to_os_string());
        self.args.push(OsString::from(pixel_type));
        self
    }

    pub fn app(&self) -> &str {
        self.app
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }
}

/// Orfeo ToolBox through its command-line launchers
#[derive(Debug, Clone, Default)]
pub struct OtbToolbox {
    /// Directory holding `otbcli_*`; `PATH` lookup when `None`
    bin_dir: Option<PathBuf>,
    /// RAM budget in MB passed as `-ram`
    ram: Option<u32>,
}

impl OtbToolbox {
    pub fn new(bin_dir: Option<PathBuf>, ram: Option<u32>) -> Self {
        Self { bin_dir, ram }
    }

    /// Toolbox configured from `OTB_BIN_DIR`, if set
    pub fn from_env() -> Self {
        let bin_dir = std::env::var_os(OTB_BIN_DIR_ENV)
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from);
        Self::new(bin_dir, None)
    }

    pub fn with_ram(mut self, ram: Option<u32>) -> Self {
        self.ram = ram;
        self
    }

    fn launcher(&self, app: &str) -> PathBuf {
        let name = format!("otbcli_{}", app);
        match &self.bin_dir {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }

    /// Run one application, failing on spawn error, non-zero exit or missing outputs
    pub fn run(&self, command: OtbCommand) -> RasterResult<()> {
        let command = match self.ram {
            Some(ram) => command.param("ram", ram.to_string()),
            None => command,
        };
        let launcher = self.launcher(command.app);
        log::info!("Running {}", launcher.display());
        log::debug!("Arguments: {:?}", command.args);

        let output = Command::new(&launcher)
            .args(&command.args)
            .output()
            .map_err(|e| RasterError::ExternalTool {
                tool: command.app.to_string(),
                message: format!("cannot execute {}: {}", launcher.display(), e),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines() {
            log::debug!("[{}] {}", command.app, line);
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RasterError::ExternalTool {
                tool: command.app.to_string(),
                message: format!("{} ({})", output.status, tail(&stderr, STDERR_TAIL_LINES)),
            });
        }

        if let Some(missing) = command.outputs.iter().find(|p| !p.exists()) {
            return Err(RasterError::ExternalTool {
                tool: command.app.to_string(),
                message: format!("expected output {} was not written", missing.display()),
            });
        }

        Ok(())
    }
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    all[all.len().saturating_sub(lines)..].join(" | ")
}

pub fn smoothing_command(
    input: &Path,
    filtered_out: &Path,
    spatial_out: &Path,
    params: &SmoothingParams,
) -> OtbCommand {
    OtbCommand::new("MeanShiftSmoothing")
        .param("in", input)
        .output("fout", filtered_out)
        .output("foutpos", spatial_out)
        .param("spatialr", params.spatial_radius.to_string())
        .param("ranger", params.range_radius.to_string())
        .param("thres", params.threshold.to_string())
        .param("maxiter", params.max_iterations.to_string())
        .param("rangeramp", params.range_ramp.to_string())
        .param("modesearch", if params.mode_search { "1" } else { "0" })
}

pub fn segmentation_command(
    filtered: &Path,
    spatial: &Path,
    labels_out: &Path,
    params: &SegmentationParams,
) -> OtbCommand {
    OtbCommand::new("LSMSSegmentation")
        .param("in", filtered)
        .param("inpos", spatial)
        .typed_output("out", labels_out, "uint32")
        .param("spatialr", params.spatial_radius.to_string())
        .param("ranger", params.range_radius.to_string())
        .param("minsize", params.min_size.to_string())
        .param("tilesizex", params.tile_size.x.to_string())
        .param("tilesizey", params.tile_size.y.to_string())
}

pub fn merge_command(
    filtered: &Path,
    labels: &Path,
    merged_out: &Path,
    params: &MergeParams,
) -> OtbCommand {
    OtbCommand::new("LSMSSmallRegionsMerging")
        .param("in", filtered)
        .param("inseg", labels)
        .typed_output("out", merged_out, "uint32")
        .param("minsize", params.min_size.to_string())
        .param("tilesizex", params.tile_size.x.to_string())
        .param("tilesizey", params.tile_size.y.to_string())
}

pub fn vectorization_command(
    image: &Path,
    labels: &Path,
    vector_out: &Path,
    params: &VectorizationParams,
) -> OtbCommand {
    OtbCommand::new("LSMSVectorization")
        .param("in", image)
        .param("inseg", labels)
        .output("out", vector_out)
        .param("tilesizex", params.tile_size.x.to_string())
        .param("tilesizey", params.tile_size.y.to_string())
}

pub fn pansharpen_command(
    multispectral: &Path,
    panchromatic: &Path,
    out: &Path,
    params: &PansharpenParams,
) -> OtbCommand {
    OtbCommand::new("BundleToPerfectSensor")
        .param("inp", panchromatic)
        .param("inxs", multispectral)
        .output("out", out)
        .param("method", params.method.name())
}

impl ProcessingToolbox for OtbToolbox {
    fn smooth(
        &self,
        input: &Path,
        filtered_out: &Path,
        spatial_out: &Path,
        params: &SmoothingParams,
    ) -> RasterResult<()> {
        self.run(smoothing_command(input, filtered_out, spatial_out, params))
    }

    fn segment(
        &self,
        filtered: &Path,
        spatial: &Path,
        labels_out: &Path,
        params: &SegmentationParams,
    ) -> RasterResult<()> {
        self.run(segmentation_command(filtered, spatial, labels_out, params))
    }

    fn merge(
        &self,
        filtered: &Path,
        labels: &Path,
        merged_out: &Path,
        params: &MergeParams,
    ) -> RasterResult<()> {
        self.run(merge_command(filtered, labels, merged_out, params))
    }

    fn vectorize(
        &self,
        image: &Path,
        labels: &Path,
        vector_out: &Path,
        params: &VectorizationParams,
    ) -> RasterResult<()> {
        self.run(vectorization_command(image, labels, vector_out, params))
    }

    fn pansharpen(
        &self,
        multispectral: &Path,
        panchromatic: &Path,
        out: &Path,
        params: &PansharpenParams,
    ) -> RasterResult<()> {
        self.run(pansharpen_command(multispectral, panchromatic, out, params))
    }
}
