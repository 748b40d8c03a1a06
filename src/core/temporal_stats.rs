//! Pixel-wise statistics across a stack of spatially identical rasters

use crate::io::dates::days_since_epoch;
use crate::io::raster::{OutputBand, Raster};
use crate::types::{BandImage, RasterError, RasterResult};
use chrono::NaiveDateTime;
use ndarray::{Array2, Array3, Axis};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Statistics computed when none are requested explicitly
pub const DEFAULT_STATS: [StatName; 4] = [
    StatName::Minimum,
    StatName::Maximum,
    StatName::Mean,
    StatName::StdDev,
];

/// Available temporal statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatName {
    Minimum,
    Maximum,
    Mean,
    Median,
    Sum,
    /// Population standard deviation
    StdDev,
    /// Maximum minus minimum
    Range,
}

impl StatName {
    pub const ALL: [StatName; 7] = [
        StatName::Minimum,
        StatName::Maximum,
        StatName::Mean,
        StatName::Median,
        StatName::Sum,
        StatName::StdDev,
        StatName::Range,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StatName::Minimum => "minimum",
            StatName::Maximum => "maximum",
            StatName::Mean => "mean",
            StatName::Median => "median",
            StatName::Sum => "sum",
            StatName::StdDev => "std",
            StatName::Range => "range",
        }
    }

    /// Statistics that pick one observation and therefore get a date band
    pub fn selects_occurrence(&self) -> bool {
        matches!(self, StatName::Minimum | StatName::Maximum)
    }
}

impl std::fmt::Display for StatName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for StatName {
    type Err = RasterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "min" | "minimum" => Ok(StatName::Minimum),
            "max" | "maximum" => Ok(StatName::Maximum),
            "mean" | "average" => Ok(StatName::Mean),
            "median" => Ok(StatName::Median),
            "sum" => Ok(StatName::Sum),
            "std" | "stddev" | "standard-deviation" | "standard_deviation" => {
                Ok(StatName::StdDev)
            }
            "range" => Ok(StatName::Range),
            _ => Err(RasterError::UnknownStatistic(s.to_string())),
        }
    }
}

/// Parse a list of statistic names, rejecting unknown ones
pub fn parse_stats<S: AsRef<str>>(names: &[S]) -> RasterResult<Vec<StatName>> {
    names.iter().map(|s| s.as_ref().parse()).collect()
}

/// What the date bands are measured from
#[derive(Debug, Clone, Default)]
pub enum TimeReference {
    /// Days elapsed since the first time step
    #[default]
    FirstStep,
    /// Days elapsed since a fixed date (inputs must be dated)
    Date(NaiveDateTime),
    /// Per-pixel reference, in the same unit as the step times
    PerPixel(BandImage),
}

impl TimeReference {
    /// Read a mono-band time raster; nodata pixels become NaN
    pub fn from_raster(raster: &Raster) -> RasterResult<Self> {
        let mut values = raster.read_band(1)?;
        if let Some(nodata) = raster.nodata(1)? {
            values.mapv_inplace(|v| if v == nodata { f64::NAN } else { v });
        }
        Ok(TimeReference::PerPixel(values))
    }
}

/// Temporal statistics parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalStatsParams {
    /// 1-based band read from every input
    pub band_index: usize,
    /// Requested statistics, in output order
    pub stats: Vec<StatName>,
    /// Value written where no observation is valid
    pub nodata: f64,
}

impl Default for TemporalStatsParams {
    fn default() -> Self {
        Self {
            band_index: 1,
            stats: DEFAULT_STATS.to_vec(),
            nodata: f64::NAN,
        }
    }
}

/// One time step of the stack
#[derive(Debug, Clone)]
pub struct TemporalLayer {
    pub values: BandImage,
    pub nodata: Option<f64>,
    pub acquired: Option<NaiveDateTime>,
}

impl TemporalLayer {
    pub fn new(values: BandImage) -> Self {
        Self {
            values,
            nodata: None,
            acquired: None,
        }
    }

    pub fn with_nodata(mut self, nodata: Option<f64>) -> Self {
        self.nodata = nodata;
        self
    }

    pub fn with_date(mut self, acquired: Option<NaiveDateTime>) -> Self {
        self.acquired = acquired;
        self
    }

    fn is_valid(&self, value: f64) -> bool {
        value.is_finite() && self.nodata.map_or(true, |nodata| value != nodata)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandKind {
    Value,
    Date,
}

#[derive(Debug, Clone)]
pub struct StatBand {
    pub stat: StatName,
    pub kind: BandKind,
    pub data: BandImage,
}

impl StatBand {
    /// Band label, e.g. `maximum` or `maximum_date`
    pub fn label(&self) -> String {
        match self.kind {
            BandKind::Value => self.stat.name().to_string(),
            BandKind::Date => format!("{}_date", self.stat.name()),
        }
    }
}

/// Result of a reduction: one band per statistic, each min/max followed by its date band
#[derive(Debug, Clone)]
pub struct StatResult {
    bands: Vec<StatBand>,
    nodata: f64,
}

impl StatResult {
    pub fn bands(&self) -> &[StatBand] {
        &self.bands
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    pub fn nodata(&self) -> f64 {
        self.nodata
    }

    pub fn get(&self, stat: StatName) -> Option<&BandImage> {
        self.find(stat, BandKind::Value)
    }

    pub fn date(&self, stat: StatName) -> Option<&BandImage> {
        self.find(stat, BandKind::Date)
    }

    fn find(&self, stat: StatName, kind: BandKind) -> Option<&BandImage> {
        self.bands
            .iter()
            .find(|b| b.stat == stat && b.kind == kind)
            .map(|b| &b.data)
    }

    pub fn to_output_bands(&self) -> Vec<OutputBand> {
        self.bands
            .iter()
            .map(|b| OutputBand::new(b.label(), b.data.clone(), Some(self.nodata)))
            .collect()
    }
}

/// Per-pixel accumulator over the time axis
#[derive(Debug, Default)]
struct PixelFold {
    count: usize,
    sum: f64,
    mean: f64,
    m2: f64,
    min: Option<(f64, usize)>,
    max: Option<(f64, usize)>,
}

impl PixelFold {
    fn push(&mut self, value: f64, step: usize) {
        self.count += 1;
        self.sum += value;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);

        // Strict comparisons keep the earliest step on ties
        if self.min.map_or(true, |(v, _)| value < v) {
            self.min = Some((value, step));
        }
        if self.max.map_or(true, |(v, _)| value > v) {
            self.max = Some((value, step));
        }
    }
}

/// Temporal statistics reducer
pub struct TemporalReducer {
    params: TemporalStatsParams,
}

impl TemporalReducer {
    /// Create a reducer; duplicated statistics are collapsed
    pub fn new(mut params: TemporalStatsParams) -> RasterResult<Self> {
        if params.band_index == 0 {
            return Err(RasterError::InvalidArgument(
                "band index starts at 1".to_string(),
            ));
        }
        let mut stats: Vec<StatName> = Vec::with_capacity(params.stats.len());
        for stat in params.stats.drain(..) {
            if !stats.contains(&stat) {
                stats.push(stat);
            }
        }
        if stats.is_empty() {
            return Err(RasterError::EmptyInput("no statistic requested".to_string()));
        }
        params.stats = stats;
        Ok(Self { params })
    }

    pub fn params(&self) -> &TemporalStatsParams {
        &self.params
    }

    /// Output band layout, in write order
    pub fn layout(&self) -> Vec<(StatName, BandKind)> {
        let mut layout = Vec::new();
        for &stat in &self.params.stats {
            layout.push((stat, BandKind::Value));
            if stat.selects_occurrence() {
                layout.push((stat, BandKind::Date));
            }
        }
        layout
    }

    /// Reduce an ordered stack of layers
    pub fn compute(
        &self,
        layers: &[TemporalLayer],
        reference: &TimeReference,
    ) -> RasterResult<StatResult> {
        let first = layers
            .first()
            .ok_or_else(|| RasterError::EmptyInput("no raster to compute statistics on".to_string()))?;
        let (height, width) = first.values.dim();

        for (i, layer) in layers.iter().enumerate().skip(1) {
            if layer.values.dim() != (height, width) {
                return Err(RasterError::ShapeMismatch(format!(
                    "time step {} is {:?}, time step 0 is {:?}",
                    i,
                    layer.values.dim(),
                    (height, width)
                )));
            }
        }
        if let TimeReference::PerPixel(reference) = reference {
            if reference.dim() != (height, width) {
                return Err(RasterError::ShapeMismatch(format!(
                    "time reference is {:?}, stack is {:?}",
                    reference.dim(),
                    (height, width)
                )));
            }
        }

        let times = step_times(layers, reference)?;
        let layout = self.layout();
        let nodata = self.params.nodata;
        let need_samples = self.params.stats.contains(&StatName::Median);

        log::info!(
            "Computing {} statistic(s) over {} time step(s) of {}x{} pixels",
            self.params.stats.len(),
            layers.len(),
            width,
            height
        );
        log::debug!("Step times: {:?}, reference: {:?}", times, reference_kind(reference));

        let reduce_row = |row: usize| -> Vec<f64> {
            let mut out = vec![nodata; layout.len() * width];
            let mut samples: Vec<f64> = Vec::with_capacity(layers.len());

            for col in 0..width {
                let mut fold = PixelFold::default();
                samples.clear();
                for (step, layer) in layers.iter().enumerate() {
                    let value = layer.values[[row, col]];
                    if layer.is_valid(value) {
                        fold.push(value, step);
                        if need_samples {
                            samples.push(value);
                        }
                    }
                }
                if fold.count == 0 {
                    continue;
                }

                let offset = match reference {
                    TimeReference::FirstStep => Some(times[0]),
                    TimeReference::Date(date) => Some(days_since_epoch(date)),
                    TimeReference::PerPixel(values) => {
                        Some(values[[row, col]]).filter(|v| v.is_finite())
                    }
                };
                let date_of = |step: usize| offset.map_or(nodata, |o| times[step] - o);

                for (b, (stat, kind)) in layout.iter().enumerate() {
                    let (min, min_step) = fold.min.unwrap_or((nodata, 0));
                    let (max, max_step) = fold.max.unwrap_or((nodata, 0));
                    out[b * width + col] = match (stat, kind) {
                        (StatName::Minimum, BandKind::Value) => min,
                        (StatName::Minimum, BandKind::Date) => date_of(min_step),
                        (StatName::Maximum, BandKind::Value) => max,
                        (StatName::Maximum, BandKind::Date) => date_of(max_step),
                        (StatName::Mean, _) => fold.mean,
                        (StatName::Median, _) => median(&mut samples),
                        (StatName::Sum, _) => fold.sum,
                        (StatName::StdDev, _) => (fold.m2 / fold.count as f64).sqrt(),
                        (StatName::Range, _) => max - min,
                    };
                }
            }
            out
        };

        #[cfg(feature = "parallel")]
        let rows: Vec<Vec<f64>> = {
            use rayon::prelude::*;
            (0..height).into_par_iter().map(reduce_row).collect()
        };
        #[cfg(not(feature = "parallel"))]
        let rows: Vec<Vec<f64>> = (0..height).map(reduce_row).collect();

        let mut cube = Array3::<f64>::from_elem((layout.len(), height, width), nodata);
        for (row, values) in rows.iter().enumerate() {
            for b in 0..layout.len() {
                for col in 0..width {
                    cube[[b, row, col]] = values[b * width + col];
                }
            }
        }

        let bands = layout
            .iter()
            .enumerate()
            .map(|(b, &(stat, kind))| StatBand {
                stat,
                kind,
                data: cube.index_axis(Axis(0), b).to_owned(),
            })
            .collect();

        log::info!("Temporal statistics completed");
        Ok(StatResult { bands, nodata })
    }
}

/// Time of each step: days since epoch when every layer is dated, else the step position
fn step_times(layers: &[TemporalLayer], reference: &TimeReference) -> RasterResult<Vec<f64>> {
    let dates: Option<Vec<NaiveDateTime>> = layers.iter().map(|l| l.acquired).collect();
    match dates {
        Some(dates) => Ok(dates.iter().map(days_since_epoch).collect()),
        None => {
            if let TimeReference::Date(date) = reference {
                return Err(RasterError::InvalidArgument(format!(
                    "dates relative to {} need an acquisition date for every input",
                    date
                )));
            }
            if layers.iter().any(|l| l.acquired.is_some()) {
                log::warn!("Only some inputs are dated, using input order as the time axis");
            }
            Ok((0..layers.len()).map(|i| i as f64).collect())
        }
    }
}

fn reference_kind(reference: &TimeReference) -> String {
    match reference {
        TimeReference::FirstStep => "first step".to_string(),
        TimeReference::Date(date) => date.to_string(),
        TimeReference::PerPixel(values) => format!("per-pixel {:?}", values.dim()),
    }
}

fn median(samples: &mut [f64]) -> f64 {
    samples.sort_by(|a, b| a.total_cmp(b));
    let n = samples.len();
    if n % 2 == 1 {
        samples[n / 2]
    } else {
        (samples[n / 2 - 1] + samples[n / 2]) / 2.0
    }
}

/// Compute temporal statistics of `rasters` and write them to `out_path`.
///
/// All rasters must share size and geotransform; band `params.band_index`
/// is read from each. Nothing is written if any check fails.
pub fn temporal_stats<P: AsRef<Path>>(
    rasters: &[Raster],
    out_path: P,
    driver: &str,
    params: TemporalStatsParams,
    reference: &TimeReference,
) -> RasterResult<StatResult> {
    let first = rasters
        .first()
        .ok_or_else(|| RasterError::EmptyInput("no raster to compute statistics on".to_string()))?;

    for raster in &rasters[1..] {
        if !first.same_extent(raster) {
            return Err(RasterError::ShapeMismatch(format!(
                "{} ({}x{}, {:?}) and {} ({}x{}, {:?}) do not cover the same grid",
                first.path().display(),
                first.width(),
                first.height(),
                first.geotransform(),
                raster.path().display(),
                raster.width(),
                raster.height(),
                raster.geotransform()
            )));
        }
    }

    let reducer = TemporalReducer::new(params)?;
    let band_index = reducer.params().band_index;
    for raster in rasters {
        raster.check_band(band_index)?;
    }

    let mut layers = Vec::with_capacity(rasters.len());
    for raster in rasters {
        layers.push(
            TemporalLayer::new(raster.read_band(band_index)?)
                .with_nodata(raster.nodata(band_index)?)
                .with_date(raster.acquired()),
        );
    }

    let result = reducer.compute(&layers, reference)?;
    first.write_bands(out_path, driver, &result.to_output_bands())?;
    Ok(result)
}

/// Wrap a 2D array as an undated, nodata-free layer
impl From<Array2<f64>> for TemporalLayer {
    fn from(values: Array2<f64>) -> Self {
        TemporalLayer::new(values)
    }
}
