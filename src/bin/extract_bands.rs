//! Remove bands from rasters

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use ymraster::core::remove_bands_many;

#[derive(Parser)]
#[command(name = "extract_bands")]
#[command(version, about = "Remove specified band(s) from the given raster(s)", long_about = None)]
struct Cli {
    /// Rasters from which to remove bands
    #[arg(required = true)]
    rasters: Vec<PathBuf>,

    /// Indices of the bands to remove (1 is the first band)
    #[arg(short, long = "idxs", required = true, num_args = 1..)]
    idxs: Vec<usize>,

    /// Output file; the original raster is overwritten if omitted
    #[arg(short, long = "out-file")]
    out_file: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    ymraster::cli::init_logging(cli.verbose);

    let written = remove_bands_many(&cli.rasters, &cli.idxs, cli.out_file.as_deref())
        .context("removing bands")?;
    for path in &written {
        log::info!("Wrote {}", path.display());
    }
    Ok(())
}
