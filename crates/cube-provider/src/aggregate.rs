//! Weighted temporal blending of overlapping source rasters.

use cube_common::Raster;

/// Blend overlapping rasters into one output raster.
///
/// A single input is returned unchanged (identity fast path, bit-for-bit).
/// With several inputs, each output cell is the weighted mean of the cell's
/// *valid* (non-NaN) contributors, with weights renormalized to sum to 1
/// over that valid subset only; a cell with no valid contributor stays NaN.
/// This keeps a no-data sentinel in one raster from polluting the average.
///
/// Weights are the scheduler's fractional temporal overlaps and are not
/// required to sum to 1 globally. All inputs must share one shape; the
/// caller pre-validates this.
pub fn blend(images: &[Raster], weights: &[f64]) -> Raster {
    debug_assert!(!images.is_empty());
    debug_assert_eq!(images.len(), weights.len());

    if images.len() == 1 {
        return images[0].clone();
    }

    let width = images[0].width();
    let height = images[0].height();
    let mut out = Raster::filled(width, height, f32::NAN);

    for cell in 0..width * height {
        let mut sum = 0.0f64;
        let mut weight_sum = 0.0f64;
        for (image, &weight) in images.iter().zip(weights) {
            let v = image.data()[cell];
            if !v.is_nan() {
                sum += v as f64 * weight;
                weight_sum += weight;
            }
        }
        if weight_sum > 0.0 {
            out.data_mut()[cell] = (sum / weight_sum) as f32;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_image_identity() {
        let raster = Raster::new(2, 2, vec![1.5, 2.5, 3.5, 4.5]);
        let result = blend(std::slice::from_ref(&raster), &[1.0]);
        assert_eq!(result, raster);
    }

    #[test]
    fn test_weighted_mean() {
        let a = Raster::filled(3, 2, 10.0);
        let b = Raster::filled(3, 2, 20.0);
        let result = blend(&[a, b], &[0.25, 0.75]);
        for &v in result.data() {
            assert!((v - 17.5).abs() < 1e-6);
        }
    }

    #[test]
    fn test_no_data_cell_uses_remaining_contributor() {
        let mut a = Raster::filled(2, 2, 10.0);
        a.set(1, 0, f32::NAN);
        let b = Raster::filled(2, 2, 5.0);

        let result = blend(&[a, b], &[0.5, 0.5]);
        // at the masked cell only b contributes; its weight renormalizes to 1
        assert_eq!(result.get(1, 0), Some(5.0));
        // elsewhere the ordinary weighted mean applies
        assert_eq!(result.get(0, 0), Some(7.5));
    }

    #[test]
    fn test_all_contributors_masked_stays_missing() {
        let a = Raster::filled(1, 1, f32::NAN);
        let b = Raster::filled(1, 1, f32::NAN);
        let result = blend(&[a, b], &[0.5, 0.5]);
        assert!(result.data()[0].is_nan());
    }

    #[test]
    fn test_unnormalized_weights() {
        // weights need not sum to 1; the per-cell renormalization handles it
        let a = Raster::filled(1, 1, 10.0);
        let b = Raster::filled(1, 1, 20.0);
        let result = blend(&[a, b], &[1.0, 3.0]);
        assert!((result.data()[0] - 17.5).abs() < 1e-6);
    }
}
