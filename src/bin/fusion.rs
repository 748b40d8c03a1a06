//! Pansharpen a raster with its panchromatic image

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use ymraster::core::pansharpen;
use ymraster::io::Raster;
use ymraster::toolbox::{FusionMethod, OtbToolbox, PansharpenParams};

#[derive(Parser)]
#[command(name = "fusion")]
#[command(version, about = "Merge a raster with its panchromatic image in order to improve resolution", long_about = None)]
struct Cli {
    /// Raster to sharpen
    raster: PathBuf,

    /// Panchromatic image
    #[arg(short, long = "pan-file")]
    pan_file: PathBuf,

    /// Output file; the original raster is overwritten if omitted
    #[arg(short, long = "out-file")]
    out_file: Option<PathBuf>,

    /// Fusion method: rcs, lmvm or bayes
    #[arg(short, long, default_value = "rcs")]
    method: String,

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

    let method = match cli.method.to_lowercase().as_str() {
        "rcs" => FusionMethod::Rcs,
        "lmvm" => FusionMethod::Lmvm,
        "bayes" => FusionMethod::Bayes,
        other => anyhow::bail!("unknown fusion method: {}", other),
    };

    let toolbox = match cli.otb_bin_dir {
        Some(dir) => OtbToolbox::new(Some(dir), cli.ram),
        None => OtbToolbox::from_env().with_ram(cli.ram),
    };

    let raster = Raster::open(&cli.raster)?;
    let pan = Raster::open(&cli.pan_file)?;
    let written = pansharpen(
        &toolbox,
        &raster,
        &pan,
        cli.out_file.as_deref(),
        &PansharpenParams { method },
    )
    .context("pansharpening")?;

    log::info!("Wrote {}", written.display());
    Ok(())
}
