//! Pixel-wise statistics over multitemporal, spatially identical images.
//!
//! Output is a multi-band image with one band per statistic. Statistics
//! taken from an actual observation (minimum, maximum) get an extra band
//! holding the date of that observation, in days relative to the first
//! image, to `--date-from`, or to the per-pixel dates of `--time-raster`.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use ymraster::core::{parse_stats, temporal_stats, TemporalStatsParams, TimeReference};
use ymraster::io::{parse_date, Raster, DEFAULT_DRIVER};

#[derive(Parser)]
#[command(name = "temporal_stats")]
#[command(version, about = "Compute pixel-wise statistics from a list of multitemporal, spatially identical images", long_about = None)]
struct Cli {
    /// Input images, in time order
    #[arg(required = true)]
    rasters: Vec<PathBuf>,

    /// Statistics to compute (minimum, maximum, mean, median, sum, std, range)
    #[arg(short, long = "stat", num_args = 1..)]
    stats: Vec<String>,

    /// Index of the band to compute statistics on, the same for all images
    #[arg(short = 'b', long = "idx-band", default_value_t = 1)]
    idx_band: usize,

    /// Date the output dates are relative to (YYYY-MM-DD[ HH:MM:SS])
    #[arg(short = 'd', long = "date-from", conflicts_with = "time_raster")]
    date_from: Option<String>,

    /// Mono-band raster with the same extent as the inputs holding per-pixel reference dates
    #[arg(short = 't', long = "time-raster")]
    time_raster: Option<PathBuf>,

    /// Output file
    #[arg(short, long = "out-file", default_value = "./stats.tif")]
    out_file: PathBuf,

    /// Value written where no observation is valid
    #[arg(long, default_value_t = f64::NAN)]
    nodata: f64,

    /// GDAL driver of the output file
    #[arg(long, default_value = DEFAULT_DRIVER)]
    driver: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    ymraster::cli::init_logging(cli.verbose);

    let rasters = cli
        .rasters
        .iter()
        .map(Raster::open)
        .collect::<Result<Vec<_>, _>>()?;

    let mut params = TemporalStatsParams {
        band_index: cli.idx_band,
        nodata: cli.nodata,
        ..Default::default()
    };
    if !cli.stats.is_empty() {
        params.stats = parse_stats(&cli.stats)?;
    }

    let reference = match (&cli.date_from, &cli.time_raster) {
        (Some(date), _) => TimeReference::Date(parse_date(date)?),
        (None, Some(path)) => {
            let time_raster = Raster::open(path)?;
            TimeReference::from_raster(&time_raster)
                .with_context(|| format!("reading time raster {}", path.display()))?
        }
        (None, None) => TimeReference::FirstStep,
    };

    let result = temporal_stats(&rasters, &cli.out_file, &cli.driver, params, &reference)
        .context("computing temporal statistics")?;

    let labels: Vec<String> = result.bands().iter().map(|b| b.label()).collect();
    log::info!("Wrote {} ({})", cli.out_file.display(), labels.join(", "));
    Ok(())
}
