//! Grid specifications for raster data.

use crate::BoundingBox;
use serde::{Deserialize, Serialize};

/// Specification of a regular axis-aligned grid.
///
/// Rasters on this grid are row-major with row 0 at the northern (top) edge,
/// matching the most common scan order of the source archives.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Number of cells in X (longitude) direction
    pub width: usize,
    /// Number of cells in Y (latitude) direction
    pub height: usize,
    /// Spatial extent covered by the grid
    pub bbox: BoundingBox,
}

impl GridSpec {
    /// Create a new grid specification.
    pub fn new(width: usize, height: usize, bbox: BoundingBox) -> Self {
        Self {
            width,
            height,
            bbox,
        }
    }

    /// Cell size in X direction (coordinate units per cell).
    pub fn x_res(&self) -> f64 {
        self.bbox.width() / self.width as f64
    }

    /// Cell size in Y direction (coordinate units per cell).
    pub fn y_res(&self) -> f64 {
        self.bbox.height() / self.height as f64
    }

    /// Coordinates of the center of cell `(col, row)`.
    pub fn cell_center(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.bbox.min_x + (col as f64 + 0.5) * self.x_res(),
            self.bbox.max_y - (row as f64 + 0.5) * self.y_res(),
        )
    }

    /// Check whether `other` has the same cell size as this grid.
    pub fn same_resolution(&self, other: &GridSpec) -> bool {
        const EPS: f64 = 1e-9;
        (self.x_res() - other.x_res()).abs() < EPS && (self.y_res() - other.y_res()).abs() < EPS
    }

    /// Total number of grid cells.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// Check if grid is empty.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Global 0.25 degree grid (1440 x 720), the default cube layout.
    pub fn global_quarter_degree() -> Self {
        Self::new(1440, 720, BoundingBox::default())
    }
}
