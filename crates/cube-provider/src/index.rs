//! Granule time-range index construction.
//!
//! Each source directory is scanned once during `prepare()`: filenames are
//! pre-filtered with coarse temporal hints, surviving files are opened just
//! long enough to decode their time axis, and the resulting granules are
//! stably sorted by start time. Data reads happen later through the handle
//! cache; no handle opened here outlives the scan.

use crate::error::{ProviderError, Result};
use chrono::{DateTime, Datelike, Duration, Utc};
use cube_common::time::truncate_to_day;
use cube_common::{Calendar, CfTimeUnits, TimeRange};
use cube_source::{RasterStore, SourceDataset};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One addressable time slice inside one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Granule {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Source file this slice lives in; doubles as the handle-cache key
    pub path: PathBuf,
    /// Position along the file's time axis
    pub time_index: usize,
}

/// Coarse filename pre-filter applied before any file is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilenameFilter {
    /// Every file in the directory is a candidate
    Any,
    /// Keep files whose stem carries a 4-digit year token within the
    /// config window's years (e.g. `t2m_2003.nc`)
    YearToken,
    /// Keep files with a fixed suffix (e.g. `.nc.gz`)
    Suffix(&'static str),
}

impl FilenameFilter {
    pub fn matches(&self, file_name: &str, window: &TimeRange) -> bool {
        match self {
            FilenameFilter::Any => true,
            FilenameFilter::Suffix(suffix) => file_name.ends_with(suffix),
            FilenameFilter::YearToken => match year_token(file_name) {
                Some(year) => window.start.year() <= year && year <= window.end.year(),
                None => false,
            },
        }
    }
}

/// Extract a 4-digit year token from an underscore-separated file stem.
fn year_token(file_name: &str) -> Option<i32> {
    let stem = file_name.split('.').next().unwrap_or(file_name);
    stem.split('_')
        .filter(|tok| tok.len() == 4)
        .find_map(|tok| tok.parse::<i32>().ok())
}

/// How granule time ranges derive from one file's time axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeAxisRule {
    /// One timestamp per granule plus a fixed known sampling interval;
    /// `end = start + interval`
    InstantPlusInterval { interval: Duration },
    /// An explicit (start, end) bound pair per granule, both truncated to
    /// whole days
    ExplicitBounds,
    /// The end of granule `i` is the start of granule `i + 1`; the last
    /// granule of the series gets `start + trailing`.
    ///
    /// A fixed trailing duration is calendar-incorrect for most months
    /// (28-30 day months are over-covered). Kept as the archives'
    /// producers defined it; do not change without confirming intended
    /// semantics with them.
    ConsecutiveInstants { trailing: Duration },
}

/// Time-axis decoding configuration for one source family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeCoding {
    /// Name of the time (or bounds) variable in the source files
    pub variable: String,
    /// Pinned CF units string. When `None` the file's own `units` attribute
    /// is used; families pin this where the archives are known to declare
    /// wrong epochs.
    pub units: Option<String>,
    /// Calendar assumed when the file declares none (or an unsupported one)
    pub calendar: Calendar,
    pub rule: TimeAxisRule,
}

impl TimeCoding {
    fn resolve_units(&self, declared: Option<&str>, path: &Path) -> Result<CfTimeUnits> {
        let units = match (&self.units, declared) {
            (Some(pinned), _) => pinned.as_str(),
            (None, Some(declared)) => declared,
            (None, None) => {
                return Err(ProviderError::InvalidTimeAxis {
                    path: path.to_path_buf(),
                    message: format!("variable '{}' declares no time units", self.variable),
                })
            }
        };
        Ok(CfTimeUnits::parse(units)?)
    }

    fn check_calendar(&self, declared: Option<&str>, path: &Path) {
        if let Some(name) = declared {
            if Calendar::parse(name) != Some(self.calendar) {
                warn!(
                    path = %path.display(),
                    declared = name,
                    assumed = ?self.calendar,
                    "unsupported calendar declaration, decoding with the family's configured calendar"
                );
            }
        }
    }
}

/// Decode all granules of one open source file.
fn granules_for_file<D: SourceDataset>(
    coding: &TimeCoding,
    dataset: &D,
    path: &Path,
) -> Result<Vec<Granule>> {
    match &coding.rule {
        TimeAxisRule::ExplicitBounds => {
            let bounds = dataset.time_bounds(&coding.variable)?;
            let units = coding.resolve_units(bounds.units.as_deref(), path)?;
            coding.check_calendar(bounds.calendar.as_deref(), path);

            if bounds.starts.len() != bounds.ends.len() {
                return Err(ProviderError::InvalidTimeAxis {
                    path: path.to_path_buf(),
                    message: "bounds start/end columns differ in length".to_string(),
                });
            }

            Ok(bounds
                .starts
                .iter()
                .zip(&bounds.ends)
                .enumerate()
                .map(|(i, (&s, &e))| Granule {
                    start: truncate_to_day(units.decode(s)),
                    end: truncate_to_day(units.decode(e)),
                    path: path.to_path_buf(),
                    time_index: i,
                })
                .collect())
        }
        TimeAxisRule::InstantPlusInterval { interval } => {
            let axis = dataset.time_axis(&coding.variable)?;
            let units = coding.resolve_units(axis.units.as_deref(), path)?;
            coding.check_calendar(axis.calendar.as_deref(), path);

            Ok(axis
                .values
                .iter()
                .enumerate()
                .map(|(i, &v)| {
                    let start = units.decode(v);
                    Granule {
                        start,
                        end: start + *interval,
                        path: path.to_path_buf(),
                        time_index: i,
                    }
                })
                .collect())
        }
        TimeAxisRule::ConsecutiveInstants { trailing } => {
            let axis = dataset.time_axis(&coding.variable)?;
            let units = coding.resolve_units(axis.units.as_deref(), path)?;
            coding.check_calendar(axis.calendar.as_deref(), path);

            let starts: Vec<DateTime<Utc>> =
                axis.values.iter().map(|&v| units.decode(v)).collect();
            Ok((0..starts.len())
                .map(|i| {
                    let end = if i + 1 < starts.len() {
                        starts[i + 1]
                    } else {
                        starts[i] + *trailing
                    };
                    Granule {
                        start: starts[i],
                        end,
                        path: path.to_path_buf(),
                        time_index: i,
                    }
                })
                .collect())
        }
    }
}

/// Scan a source directory and build its granule index.
///
/// Every surviving file is opened exactly once and its handle dropped as
/// soon as the time axis is decoded. Returns granules sorted non-decreasing
/// by start; the sort is stable, so ties keep discovery order.
pub fn build_index<S: RasterStore>(
    store: &S,
    dir: &Path,
    filter: &FilenameFilter,
    coding: &TimeCoding,
    window: &TimeRange,
) -> Result<Vec<Granule>> {
    let mut granules = Vec::new();
    let mut opened = 0usize;
    let mut skipped = 0usize;

    for path in store.list(dir)? {
        let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
        if !filter.matches(name, window) {
            debug!(file = name, "skipped by filename pre-filter");
            skipped += 1;
            continue;
        }

        let dataset = store.open(&path)?;
        let mut file_granules = granules_for_file(coding, &dataset, &path)?;
        drop(dataset);

        granules.append(&mut file_granules);
        opened += 1;
    }

    granules.sort_by_key(|g| g.start);

    info!(
        dir = %dir.display(),
        files = opened,
        skipped = skipped,
        granules = granules.len(),
        "indexed source directory"
    );
    Ok(granules)
}
