//! Large-Scale Mean-Shift segmentation in four steps: mean-shift filtering,
//! segmentation, optional merging of small regions and optional
//! vectorisation, run with the Orfeo ToolBox LSMS applications.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use ymraster::core::{LsmsParams, LsmsPipeline};
use ymraster::toolbox::{OtbToolbox, SmoothingParams, TileSize};

#[derive(Parser)]
#[command(name = "lsms")]
#[command(version, about = "Large-Scale Mean-Shift segmentation of a multispectral image", long_about = None)]
struct Cli {
    /// Multispectral image
    #[arg(long = "xs-file")]
    xs_file: PathBuf,

    /// Spatial radius of the neighborhood
    #[arg(long)]
    spatialr: u32,

    /// Range radius, in radiometry units, in the multispectral space
    #[arg(long)]
    ranger: f64,

    /// Maximum number of mean-shift iterations
    #[arg(long, default_value_t = 10)]
    maxiter: u32,

    /// Mean-shift vector threshold
    #[arg(long, default_value_t = 0.1)]
    thres: f64,

    /// Range radius coefficient: y = rangeramp * x + ranger
    #[arg(long, default_value_t = 0.0)]
    rangeramp: f64,

    /// Mode search optimisation (0 or 1)
    #[arg(long, default_value_t = 0)]
    modesearch: u8,

    /// Tile size along the X axis
    #[arg(long, default_value_t = 256)]
    tilesizex: u32,

    /// Tile size along the Y axis
    #[arg(long, default_value_t = 256)]
    tilesizey: u32,

    /// Run the small-region merging step
    #[arg(long)]
    mstep: bool,

    /// Minimum size of a region (merging step)
    #[arg(long)]
    minsize: Option<u32>,

    /// Run the vectorisation step
    #[arg(long)]
    vstep: bool,

    /// Prefix added to every written file
    #[arg(long = "prefix", default_value = "")]
    prefix: String,

    /// Folder where the outputs are written
    #[arg(long = "dir", default_value = ".")]
    dir: PathBuf,

    /// Directory of the otbcli_* launchers (default: $OTB_BIN_DIR, then PATH)
    #[arg(long)]
    otb_bin_dir: Option<PathBuf>,

    /// RAM budget of the toolbox, in MB
    #[arg(long)]
    ram: Option<u32>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    ymraster::cli::init_logging(cli.verbose);

    let params = LsmsParams {
        smoothing: SmoothingParams {
            spatial_radius: cli.spatialr,
            range_radius: cli.ranger,
            threshold: cli.thres,
            max_iterations: cli.maxiter,
            range_ramp: cli.rangeramp,
            mode_search: cli.modesearch != 0,
        },
        tile_size: TileSize {
            x: cli.tilesizex,
            y: cli.tilesizey,
        },
        merge: cli.mstep,
        min_size: cli.minsize,
        vectorize: cli.vstep,
        prefix: cli.prefix,
        out_dir: cli.dir,
    };

    let toolbox = match cli.otb_bin_dir {
        Some(dir) => OtbToolbox::new(Some(dir), cli.ram),
        None => OtbToolbox::from_env().with_ram(cli.ram),
    };

    let pipeline = LsmsPipeline::new(toolbox, params)?;
    let outputs = pipeline
        .run(&cli.xs_file)
        .with_context(|| format!("segmenting {}", cli.xs_file.display()))?;

    log::info!("Labels written to {}", outputs.labels().display());
    if let Some(vector) = &outputs.vector {
        log::info!("Polygons written to {}", vector.display());
    }
    Ok(())
}
