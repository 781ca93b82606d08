//! Tile, mask, and rendered-image data model.
//!
//! A tile is an ordered stack of same-shaped 2-D sample planes (one per
//! band), paired with a validity mask of the same spatial shape. Samples are
//! carried as `f32` regardless of the source dtype; NaN is the nodata
//! sentinel for floating sources.

use serde::{Deserialize, Serialize};

/// Multi-band raster tile: `bands` planes of `width * height` samples each,
/// row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct TileData {
    pub width: usize,
    pub height: usize,
    pub bands: Vec<Vec<f32>>,
}

impl TileData {
    /// Build a tile from band planes. All planes must be `width * height`
    /// samples long.
    pub fn new(width: usize, height: usize, bands: Vec<Vec<f32>>) -> Option<Self> {
        if bands.is_empty() || bands.iter().any(|b| b.len() != width * height) {
            return None;
        }
        Some(Self {
            width,
            height,
            bands,
        })
    }

    /// Promote a single 2-D plane to a one-band stack.
    pub fn from_plane(width: usize, height: usize, plane: Vec<f32>) -> Option<Self> {
        Self::new(width, height, vec![plane])
    }

    /// All-zero tile of the given shape, used when the upstream fetch yields
    /// no data at all.
    pub fn zeros(band_count: usize, size: usize) -> Self {
        Self {
            width: size,
            height: size,
            bands: vec![vec![0.0; size * size]; band_count.max(1)],
        }
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }
}

/// Per-pixel validity plane: 255 = valid, 0 = nodata/outside coverage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mask {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl Mask {
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Option<Self> {
        if data.len() != width * height {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    /// Fully valid mask.
    pub fn all_valid(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![255; width * height],
        }
    }

    /// Fully invalid mask, paired with `TileData::zeros` for empty tiles.
    pub fn all_invalid(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height],
        }
    }

    #[inline]
    pub fn is_valid(&self, idx: usize) -> bool {
        self.data[idx] != 0
    }

    /// True when no pixel is valid.
    pub fn is_empty(&self) -> bool {
        self.data.iter().all(|&v| v == 0)
    }
}

/// Final 8-bit pixel buffer plus output mask, ready for image encoding.
///
/// `bands.len()` is 1 (indexed/grayscale), 2 (gray + alpha), 3 (RGB), or
/// 4 (RGBA).
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedImage {
    pub width: usize,
    pub height: usize,
    pub bands: Vec<Vec<u8>>,
    pub mask: Mask,
}

impl RenderedImage {
    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Interleave bands into RGBA pixels, using the mask as the alpha
    /// channel when the image itself carries no alpha band.
    ///
    /// 1 band  -> gray replicated to RGB, mask alpha
    /// 2 bands -> gray + alpha band, alpha zeroed where the mask is invalid
    /// 3 bands -> RGB, mask alpha
    /// 4 bands -> RGBA as-is (alpha already merged with the mask)
    ///
    /// Higher band counts have no RGBA mapping; the render pipeline rejects
    /// them before encoding.
    pub fn to_rgba(&self) -> Vec<u8> {
        let n = self.width * self.height;
        let mut out = Vec::with_capacity(n * 4);
        for i in 0..n {
            match self.bands.len() {
                1 => {
                    let v = self.bands[0][i];
                    out.extend_from_slice(&[v, v, v, self.mask.data[i]]);
                }
                2 => {
                    let v = self.bands[0][i];
                    let a = if self.mask.data[i] != 0 {
                        self.bands[1][i]
                    } else {
                        0
                    };
                    out.extend_from_slice(&[v, v, v, a]);
                }
                3 => out.extend_from_slice(&[
                    self.bands[0][i],
                    self.bands[1][i],
                    self.bands[2][i],
                    self.mask.data[i],
                ]),
                _ => out.extend_from_slice(&[
                    self.bands[0][i],
                    self.bands[1][i],
                    self.bands[2][i],
                    self.bands[3][i],
                ]),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_rejects_mismatched_planes() {
        assert!(TileData::new(2, 2, vec![vec![0.0; 4], vec![0.0; 3]]).is_none());
        assert!(TileData::new(2, 2, vec![]).is_none());
        assert!(TileData::new(2, 2, vec![vec![1.0; 4]]).is_some());
    }

    #[test]
    fn zeros_tile_matches_invalid_mask_shape() {
        let tile = TileData::zeros(3, 256);
        let mask = Mask::all_invalid(256, 256);
        assert_eq!(tile.band_count(), 3);
        assert_eq!(tile.pixel_count(), mask.data.len());
        assert!(mask.is_empty());
    }

    #[test]
    fn rgba_interleave_uses_mask_alpha() {
        let img = RenderedImage {
            width: 2,
            height: 1,
            bands: vec![vec![10, 20], vec![30, 40], vec![50, 60]],
            mask: Mask::new(2, 1, vec![255, 0]).unwrap(),
        };
        assert_eq!(
            img.to_rgba(),
            vec![10, 30, 50, 255, 20, 40, 60, 0]
        );
    }

    #[test]
    fn two_band_image_interleaves_gray_alpha() {
        let img = RenderedImage {
            width: 2,
            height: 1,
            bands: vec![vec![10, 20], vec![200, 100]],
            mask: Mask::new(2, 1, vec![255, 0]).unwrap(),
        };
        assert_eq!(img.to_rgba(), vec![10, 10, 10, 200, 20, 20, 20, 0]);
    }

    #[test]
    fn single_band_replicates_gray() {
        let img = RenderedImage {
            width: 1,
            height: 1,
            bands: vec![vec![77]],
            mask: Mask::all_valid(1, 1),
        };
        assert_eq!(img.to_rgba(), vec![77, 77, 77, 255]);
    }
}
