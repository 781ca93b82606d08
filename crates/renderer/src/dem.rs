//! Terrain-RGB elevation encodings.
//!
//! Packs a single elevation band into three 8-bit channels so terrain
//! clients can recover meters client-side. Two published schemes are
//! supported:
//!
//! - `mapbox`: elevation = -10000 + (R * 65536 + G * 256 + B) * 0.1,
//!   encoded here with the fixed interval 1 the original used
//!   (elevation = -10000 + (R * 65536 + G * 256 + B))
//! - `mapzen` (terrarium): elevation = (R * 256 + G + B / 256) - 32768

use tiler_common::error::{TilerError, TilerResult};
use tiler_common::params::DemEncoding;
use tiler_common::tile::{Mask, RenderedImage, TileData};

/// Mapbox terrain-RGB base offset.
const MAPBOX_BASE: f32 = -10000.0;
/// Mapzen terrarium base offset.
const MAPZEN_BASE: f32 = 32768.0;

/// Encode an elevation tile into a 3-band terrain-RGB image.
///
/// The rescale/color-formula/colormap stages never apply to DEM output;
/// this encoding supersedes them.
pub fn encode_terrain(
    tile: &TileData,
    mask: &Mask,
    encoding: DemEncoding,
) -> TilerResult<RenderedImage> {
    if tile.band_count() != 1 {
        return Err(TilerError::RenderError(format!(
            "DEM encoding expects a single elevation band, got {}",
            tile.band_count()
        )));
    }

    let elevations = &tile.bands[0];
    let n = elevations.len();
    let mut r = vec![0u8; n];
    let mut g = vec![0u8; n];
    let mut b = vec![0u8; n];

    match encoding {
        DemEncoding::Mapbox => {
            for (i, &e) in elevations.iter().enumerate() {
                if !e.is_finite() {
                    continue;
                }
                // Scaled integer elevation, decomposed big-endian-style
                // across the three channels.
                let d = ((e - MAPBOX_BASE).round().clamp(0.0, 16_777_215.0)) as u32;
                r[i] = (d >> 16) as u8;
                g[i] = (d >> 8) as u8;
                b[i] = d as u8;
            }
        }
        DemEncoding::Mapzen => {
            for (i, &e) in elevations.iter().enumerate() {
                if !e.is_finite() {
                    continue;
                }
                let v = (e + MAPZEN_BASE).clamp(0.0, 65_535.996);
                r[i] = (v / 256.0).floor() as u8;
                g[i] = (v.floor() as u32 % 256) as u8;
                b[i] = (v.fract() * 256.0).floor() as u8;
            }
        }
    }

    Ok(RenderedImage {
        width: tile.width,
        height: tile.height,
        bands: vec![r, g, b],
        mask: mask.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_pixel(elevation: f32) -> (TileData, Mask) {
        (
            TileData::from_plane(1, 1, vec![elevation]).unwrap(),
            Mask::all_valid(1, 1),
        )
    }

    fn decode_mapbox(r: u8, g: u8, b: u8) -> f32 {
        -10000.0 + (r as u32 * 65536 + g as u32 * 256 + b as u32) as f32
    }

    fn decode_mapzen(r: u8, g: u8, b: u8) -> f32 {
        (r as f32 * 256.0 + g as f32 + b as f32 / 256.0) - 32768.0
    }

    #[test]
    fn mapbox_sea_level() {
        let (tile, mask) = one_pixel(0.0);
        let img = encode_terrain(&tile, &mask, DemEncoding::Mapbox).unwrap();
        let e = decode_mapbox(img.bands[0][0], img.bands[1][0], img.bands[2][0]);
        assert_eq!(e, 0.0);
    }

    #[test]
    fn mapbox_everest() {
        let (tile, mask) = one_pixel(8848.0);
        let img = encode_terrain(&tile, &mask, DemEncoding::Mapbox).unwrap();
        let e = decode_mapbox(img.bands[0][0], img.bands[1][0], img.bands[2][0]);
        assert_eq!(e, 8848.0);
    }

    #[test]
    fn mapbox_below_sea_level() {
        let (tile, mask) = one_pixel(-428.0);
        let img = encode_terrain(&tile, &mask, DemEncoding::Mapbox).unwrap();
        let e = decode_mapbox(img.bands[0][0], img.bands[1][0], img.bands[2][0]);
        assert_eq!(e, -428.0);
    }

    #[test]
    fn mapzen_roundtrip_with_fraction() {
        let (tile, mask) = one_pixel(1234.5);
        let img = encode_terrain(&tile, &mask, DemEncoding::Mapzen).unwrap();
        let e = decode_mapzen(img.bands[0][0], img.bands[1][0], img.bands[2][0]);
        assert!((e - 1234.5).abs() < 1.0 / 256.0 + 1e-3);
    }

    #[test]
    fn nan_elevation_encodes_black() {
        let (tile, mask) = one_pixel(f32::NAN);
        let img = encode_terrain(&tile, &mask, DemEncoding::Mapbox).unwrap();
        assert_eq!(
            (img.bands[0][0], img.bands[1][0], img.bands[2][0]),
            (0, 0, 0)
        );
    }

    #[test]
    fn multi_band_input_is_rejected() {
        let tile = TileData::new(1, 1, vec![vec![0.0], vec![0.0]]).unwrap();
        let mask = Mask::all_valid(1, 1);
        assert!(encode_terrain(&tile, &mask, DemEncoding::Mapbox).is_err());
    }
}
