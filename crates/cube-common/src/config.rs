//! Static cube configuration.

use crate::{BoundingBox, GridSpec, TimeRange};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Configuration of the target cube.
///
/// Owned and loaded by the external driver; read-only to the normalization
/// core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CubeConfig {
    /// Number of cube grid cells in X (longitude) direction
    pub grid_width: usize,
    /// Number of cube grid cells in Y (latitude) direction
    pub grid_height: usize,
    /// Spatial extent of the cube grid
    pub bbox: BoundingBox,
    /// Start of the cube's overall temporal coverage
    pub start_time: DateTime<Utc>,
    /// End of the cube's overall temporal coverage
    pub end_time: DateTime<Utc>,
}

impl CubeConfig {
    /// The cube's spatial grid.
    pub fn grid(&self) -> GridSpec {
        GridSpec::new(self.grid_width, self.grid_height, self.bbox)
    }

    /// The cube's overall temporal coverage.
    pub fn time_window(&self) -> TimeRange {
        TimeRange::new(self.start_time, self.end_time)
    }
}
