//! Raster source file access for cube ingestion.
//!
//! The normalization core never touches files directly; it goes through the
//! [`RasterStore`]/[`SourceDataset`] seam defined here. The shipped
//! implementation reads NetCDF archives (optionally gzip-compressed); the
//! in-memory implementation backs unit and lifecycle tests.

use thiserror::Error;

pub mod dataset;
pub mod memory;
pub mod netcdf;

pub use dataset::{RasterStore, SourceDataset, TimeAxis, TimeBounds};
pub use memory::{EventLog, MemoryDataset, MemoryFile, MemoryStore, StoreEvent};
pub use self::netcdf::{NetcdfDataset, NetcdfStore};

/// Result type for source file access.
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors raised while accessing source raster files.
#[derive(Error, Debug)]
pub enum SourceError {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing required variable
    #[error("missing variable: {0}")]
    MissingVariable(String),

    /// A variable's layout does not match the expected time/lat/lon shape
    #[error("invalid variable layout for '{variable}': {message}")]
    InvalidLayout { variable: String, message: String },

    /// Underlying NetCDF library error
    #[error("NetCDF error: {0}")]
    NetCdf(String),
}
