//! Date parsing and acquisition-date discovery for raster stacks

use crate::types::{RasterError, RasterResult};
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// GDAL metadata items that may carry the acquisition date, checked in order
pub const DATE_METADATA_KEYS: [&str; 2] = ["ACQUISITION_DATE", "TIFFTAG_DATETIME"];

static DASHED_DATE: OnceLock<Regex> = OnceLock::new();
static COMPACT_DATE: OnceLock<Regex> = OnceLock::new();

fn dashed_date() -> &'static Regex {
    DASHED_DATE.get_or_init(|| Regex::new(r"(\d{4}-\d{2}-\d{2})").expect("valid dashed date pattern"))
}

fn compact_date() -> &'static Regex {
    COMPACT_DATE
        .get_or_init(|| Regex::new(r"(?:^|\D)(\d{8})(?:\D|$)").expect("valid compact date pattern"))
}

/// Parse a user-supplied date, either `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD`
pub fn parse_date(s: &str) -> RasterResult<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| RasterError::InvalidDate(s.to_string()))
}

/// Parse a date stored in GDAL metadata.
///
/// TIFF stores `YYYY:MM:DD HH:MM:SS`; ISO-like strings are accepted too.
pub fn parse_metadata_date(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y:%m:%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .or_else(|| parse_date(s).ok())
}

/// Find an acquisition date embedded in a file name.
///
/// Recognises `YYYY-MM-DD`, then 8-digit runs read as `YYYYMMDD` and
/// falling back to `DDMMYYYY` (e.g. `Spot6_MS_31072013.tif`).
pub fn date_from_filename<P: AsRef<Path>>(path: P) -> Option<NaiveDateTime> {
    let stem = path.as_ref().file_stem()?.to_string_lossy().into_owned();

    if let Some(caps) = dashed_date().captures(&stem) {
        if let Ok(date) = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d") {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    for caps in compact_date().captures_iter(&stem) {
        let digits = &caps[1];
        let parsed = NaiveDate::parse_from_str(digits, "%Y%m%d")
            .or_else(|_| NaiveDate::parse_from_str(digits, "%d%m%Y"));
        if let Ok(date) = parsed {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    None
}

/// Fractional days elapsed since 1970-01-01T00:00:00
pub fn days_since_epoch(dt: &NaiveDateTime) -> f64 {
    dt.and_utc().timestamp() as f64 / SECONDS_PER_DAY
}
