//! Write the NDVI of a multispectral image

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use ymraster::io::Raster;

#[derive(Parser)]
#[command(name = "ndvi")]
#[command(version, about = "Write the NDVI of the given image, given the indices of its red and near-infrared bands (starting at 1)", long_about = None)]
struct Cli {
    /// Multispectral image
    #[arg(long = "xs-file")]
    xs_file: PathBuf,

    /// Index of the red band
    #[arg(long = "idx-red")]
    idx_red: usize,

    /// Index of the near-infrared band
    #[arg(long = "idx-nir")]
    idx_nir: usize,

    /// Name of the output file
    #[arg(short, long = "out-file")]
    out_file: PathBuf,

    /// Folder where the output is written
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    ymraster::cli::init_logging(cli.verbose);

    std::fs::create_dir_all(&cli.dir)
        .with_context(|| format!("creating {}", cli.dir.display()))?;
    let out = cli.dir.join(&cli.out_file);

    let raster = Raster::open(&cli.xs_file)?;
    raster
        .ndvi(&out, cli.idx_red, cli.idx_nir)
        .context("computing NDVI")?;

    log::info!("Wrote NDVI to {}", out.display());
    Ok(())
}
