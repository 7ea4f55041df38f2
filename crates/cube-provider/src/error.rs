//! Error types for the normalization core.

use cube_common::TimeUnitsParseError;
use cube_source::SourceError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by index construction and providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid time units: {0}")]
    TimeUnits(#[from] TimeUnitsParseError),

    #[error("invalid time axis in {path}: {message}")]
    InvalidTimeAxis { path: PathBuf, message: String },

    #[error("unsupported cube grid for source '{source}': {message}")]
    UnsupportedGrid { source: String, message: String },

    #[error("granule index {0} out of range")]
    UnknownGranule(usize),

    #[error("provider is not prepared")]
    NotPrepared,

    #[error("provider is closed")]
    Closed,
}

/// Result type for normalization core operations.
pub type Result<T> = std::result::Result<T, ProviderError>;
