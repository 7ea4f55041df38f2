//! Trait seam between the normalization core and concrete raster storage.

use crate::SourceResult;
use cube_common::Raster;
use std::path::{Path, PathBuf};

/// The numeric time axis read from one source file.
#[derive(Debug, Clone, Default)]
pub struct TimeAxis {
    /// Raw numeric time values, one per granule
    pub values: Vec<f64>,
    /// Declared CF units string, when the file carries one
    pub units: Option<String>,
    /// Declared calendar name, when the file carries one
    pub calendar: Option<String>,
}

/// Explicit per-granule time bounds read from one source file.
#[derive(Debug, Clone, Default)]
pub struct TimeBounds {
    /// Raw numeric start values, one per granule
    pub starts: Vec<f64>,
    /// Raw numeric end values, one per granule
    pub ends: Vec<f64>,
    /// Declared CF units string, when the bounds variable carries one
    pub units: Option<String>,
    /// Declared calendar name, when the bounds variable carries one
    pub calendar: Option<String>,
}

/// One open source dataset.
///
/// Dropping the value releases the underlying file handle (and any
/// decompression spill backing it).
pub trait SourceDataset {
    /// Read the numeric time axis of `variable`.
    fn time_axis(&self, variable: &str) -> SourceResult<TimeAxis>;

    /// Read a `(time, 2)` bounds variable as start/end columns.
    fn time_bounds(&self, variable: &str) -> SourceResult<TimeBounds>;

    /// Read the native-resolution 2-D slice of `variable` at `time_index`.
    ///
    /// Values arrive unpacked (scale/offset applied) with declared fill
    /// values already mapped to NaN.
    fn read_slice(&self, variable: &str, time_index: usize) -> SourceResult<Raster>;
}

/// Opens source datasets by path.
pub trait RasterStore {
    type Dataset: SourceDataset;

    /// List candidate source files directly inside `dir`, in a stable order.
    ///
    /// Fails with an I/O error if the directory is unreadable.
    fn list(&self, dir: &Path) -> SourceResult<Vec<PathBuf>>;

    /// Open one source file.
    ///
    /// Open errors propagate verbatim; there is no retry here.
    fn open(&self, path: &Path) -> SourceResult<Self::Dataset>;
}
