//! Spatial resampling onto the cube grid.

use cube_common::{GridSpec, Raster};

/// How a source family's native grid maps onto the cube grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResamplePolicy {
    /// Native grid equals the cube grid; slices pass through untouched
    Identity,
    /// Same resolution, native grid a strict superset: direct sub-array
    /// crop at a fixed alignment offset, no value change
    Crop { x_offset: usize, y_offset: usize },
    /// Nearest-neighbor resampling onto the cube grid (general path,
    /// must be enabled explicitly per family)
    Nearest,
}

/// Cut a `width` x `height` window out of `src` at a fixed offset.
///
/// The window must lie fully inside the source; values are copied
/// unchanged.
pub fn crop(src: &Raster, x_offset: usize, y_offset: usize, width: usize, height: usize) -> Raster {
    debug_assert!(x_offset + width <= src.width());
    debug_assert!(y_offset + height <= src.height());

    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        let src_start = (y_offset + row) * src.width() + x_offset;
        data.extend_from_slice(&src.data()[src_start..src_start + width]);
    }
    Raster::new(width, height, data)
}

/// Nearest-neighbor resampling under the affine mapping between the two
/// grids' extents.
///
/// Each target cell takes the value of the source cell nearest to its
/// center; target cells whose center falls outside the source extent
/// receive `fill`.
pub fn resample_nearest(src: &Raster, src_grid: &GridSpec, dst_grid: &GridSpec, fill: f32) -> Raster {
    let mut out = Raster::filled(dst_grid.width, dst_grid.height, fill);

    for row in 0..dst_grid.height {
        for col in 0..dst_grid.width {
            let (x, y) = dst_grid.cell_center(col, row);

            let col_f = (x - src_grid.bbox.min_x) / src_grid.x_res() - 0.5;
            let row_f = (src_grid.bbox.max_y - y) / src_grid.y_res() - 0.5;

            let src_col = col_f.round() as isize;
            let src_row = row_f.round() as isize;

            if src_col < 0
                || src_row < 0
                || src_col >= src_grid.width as isize
                || src_row >= src_grid.height as isize
            {
                continue;
            }
            if let Some(v) = src.get(src_col as usize, src_row as usize) {
                out.set(col, row, v);
            }
        }
    }

    out
}
