//! Mask-aware linear rescaling of raw band values into 8-bit range.

use num_traits::ToPrimitive;
use rayon::prelude::*;
use tiler_common::tile::{Mask, TileData};

/// Linearly stretch `value` from `(low, high)` into 0..=255.
///
/// A degenerate range (`high == low`) performs no stretch: the raw value is
/// clamped directly, so a divide-by-zero can never surface.
#[inline]
pub fn linear_rescale<T: ToPrimitive>(value: T, low: f32, high: f32) -> u8 {
    let v = match value.to_f32() {
        Some(v) if v.is_finite() => v,
        _ => return 0,
    };
    let stretched = if high == low {
        v
    } else {
        (v - low) / (high - low) * 255.0
    };
    stretched.round().clamp(0.0, 255.0) as u8
}

/// Rescale a single band under the mask. Masked-out pixels are exactly 0
/// regardless of the raw value or range.
pub fn rescale_band(band: &[f32], mask: &Mask, low: f32, high: f32) -> Vec<u8> {
    band.iter()
        .zip(&mask.data)
        .map(|(&v, &m)| if m != 0 { linear_rescale(v, low, high) } else { 0 })
        .collect()
}

/// Clamp a band's raw values into u8 without stretching (the "no default
/// rescale" path for band mode).
pub fn clamp_band(band: &[f32], mask: &Mask) -> Vec<u8> {
    band.iter()
        .zip(&mask.data)
        .map(|(&v, &m)| {
            if m != 0 && v.is_finite() {
                v.round().clamp(0.0, 255.0) as u8
            } else {
                0
            }
        })
        .collect()
}

/// Rescale every band of a tile independently with one `(low, high)` range
/// per band. Bands are processed in parallel; the per-band results are
/// identical to sequential evaluation.
pub fn rescale_tile(tile: &TileData, mask: &Mask, ranges: &[(f32, f32)]) -> Vec<Vec<u8>> {
    debug_assert_eq!(tile.band_count(), ranges.len());
    tile.bands
        .par_iter()
        .zip(ranges.par_iter())
        .map(|(band, &(low, high))| rescale_band(band, mask, low, high))
        .collect()
}

/// Clamp every band of a tile into u8 under the mask.
pub fn clamp_tile(tile: &TileData, mask: &Mask) -> Vec<Vec<u8>> {
    tile.bands
        .par_iter()
        .map(|band| clamp_band(band, mask))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masked_pixels_are_zero() {
        let mask = Mask::new(2, 1, vec![0, 255]).unwrap();
        let out = rescale_band(&[9999.0, 9999.0], &mask, 0.0, 10000.0);
        assert_eq!(out[0], 0);
        assert_eq!(out[1], 255);
    }

    #[test]
    fn rescale_is_monotonic_and_saturates() {
        let mask = Mask::all_valid(5, 1);
        let out = rescale_band(&[-10.0, 0.0, 50.0, 100.0, 110.0], &mask, 0.0, 100.0);
        assert_eq!(out[0], 0);
        assert_eq!(out[1], 0);
        assert_eq!(out[2], 128);
        assert_eq!(out[3], 255);
        assert_eq!(out[4], 255);
        assert!(out.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn degenerate_range_clamps_raw_value() {
        let mask = Mask::all_valid(3, 1);
        let out = rescale_band(&[-5.0, 42.0, 300.0], &mask, 7.0, 7.0);
        assert_eq!(out, vec![0, 42, 255]);
    }

    #[test]
    fn nan_input_maps_to_zero() {
        let mask = Mask::all_valid(1, 1);
        assert_eq!(rescale_band(&[f32::NAN], &mask, 0.0, 1.0), vec![0]);
    }

    #[test]
    fn integer_dtypes_rescale_through_to_primitive() {
        assert_eq!(linear_rescale(8000u16, 0.0, 16000.0), 128);
        assert_eq!(linear_rescale(-1i32, 0.0, 100.0), 0);
    }

    #[test]
    fn bands_are_rescaled_independently() {
        let tile = TileData::new(2, 1, vec![vec![50.0, 100.0], vec![50.0, 100.0]]).unwrap();
        let mask = Mask::all_valid(2, 1);
        let out = rescale_tile(&tile, &mask, &[(0.0, 100.0), (0.0, 200.0)]);
        assert_eq!(out[0], vec![128, 255]);
        assert_eq!(out[1], vec![64, 128]);
    }
}
