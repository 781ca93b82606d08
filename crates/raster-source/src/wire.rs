//! Binary tile payload exchanged with the raster engine.
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! magic   4 bytes  "RTL1"
//! bands   u16
//! width   u32
//! height  u32
//! planes  bands * width * height * f32
//! mask    width * height * u8 (0 or 255)
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};

use tiler_common::error::{TilerError, TilerResult};
use tiler_common::tile::{Mask, TileData};

const MAGIC: &[u8; 4] = b"RTL1";

/// Decode a tile payload from the raster engine.
pub fn decode_tile(payload: &[u8]) -> TilerResult<(TileData, Mask)> {
    let mut buf = Bytes::copy_from_slice(payload);
    if buf.remaining() < 14 {
        return Err(corrupt("payload too short"));
    }

    let mut magic = [0u8; 4];
    buf.copy_to_slice(&mut magic);
    if &magic != MAGIC {
        return Err(corrupt("bad magic"));
    }

    let bands = buf.get_u16_le() as usize;
    let width = buf.get_u32_le() as usize;
    let height = buf.get_u32_le() as usize;
    // Header fields are untrusted; any size arithmetic must not wrap.
    let pixels = width
        .checked_mul(height)
        .ok_or_else(|| corrupt("dimension overflow"))?;
    if bands == 0 || pixels == 0 {
        return Err(corrupt("zero-sized tile"));
    }

    let expected = bands
        .checked_mul(pixels)
        .and_then(|n| n.checked_mul(4))
        .and_then(|n| n.checked_add(pixels))
        .ok_or_else(|| corrupt("dimension overflow"))?;
    if buf.remaining() != expected {
        return Err(corrupt(format!(
            "expected {} payload bytes, got {}",
            expected,
            buf.remaining()
        )));
    }

    let mut planes = Vec::with_capacity(bands);
    for _ in 0..bands {
        let mut plane = Vec::with_capacity(pixels);
        for _ in 0..pixels {
            plane.push(buf.get_f32_le());
        }
        planes.push(plane);
    }

    let mut mask_data = vec![0u8; pixels];
    buf.copy_to_slice(&mut mask_data);

    let tile = TileData::new(width, height, planes).ok_or_else(|| corrupt("plane mismatch"))?;
    let mask = Mask::new(width, height, mask_data).ok_or_else(|| corrupt("mask mismatch"))?;
    Ok((tile, mask))
}

/// Encode a tile payload (used by tests and synthetic sources).
pub fn encode_tile(tile: &TileData, mask: &Mask) -> Vec<u8> {
    let pixels = tile.pixel_count();
    let mut buf =
        BytesMut::with_capacity(14 + tile.band_count() * pixels * 4 + pixels);
    buf.put_slice(MAGIC);
    buf.put_u16_le(tile.band_count() as u16);
    buf.put_u32_le(tile.width as u32);
    buf.put_u32_le(tile.height as u32);
    for plane in &tile.bands {
        for &v in plane {
            buf.put_f32_le(v);
        }
    }
    buf.put_slice(&mask.data);
    buf.to_vec()
}

fn corrupt(detail: impl Into<String>) -> TilerError {
    TilerError::UpstreamFetchFailure(format!("corrupt tile payload: {}", detail.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_preserves_planes_and_mask() {
        let tile = TileData::new(2, 2, vec![vec![1.0, 2.0, 3.5, -4.0], vec![0.0; 4]]).unwrap();
        let mask = Mask::new(2, 2, vec![255, 0, 255, 0]).unwrap();
        let (decoded_tile, decoded_mask) = decode_tile(&encode_tile(&tile, &mask)).unwrap();
        assert_eq!(decoded_tile, tile);
        assert_eq!(decoded_mask, mask);
    }

    #[test]
    fn nan_samples_survive_the_wire() {
        let tile = TileData::from_plane(1, 1, vec![f32::NAN]).unwrap();
        let mask = Mask::all_invalid(1, 1);
        let (decoded, _) = decode_tile(&encode_tile(&tile, &mask)).unwrap();
        assert!(decoded.bands[0][0].is_nan());
    }

    #[test]
    fn bad_magic_is_rejected() {
        let tile = TileData::from_plane(1, 1, vec![0.0]).unwrap();
        let mask = Mask::all_valid(1, 1);
        let mut payload = encode_tile(&tile, &mask);
        payload[0] = b'X';
        assert!(decode_tile(&payload).is_err());
    }

    #[test]
    fn hostile_dimensions_are_rejected() {
        let mut payload = Vec::new();
        payload.extend_from_slice(MAGIC);
        payload.extend_from_slice(&1u16.to_le_bytes());
        payload.extend_from_slice(&u32::MAX.to_le_bytes());
        payload.extend_from_slice(&u32::MAX.to_le_bytes());
        assert!(decode_tile(&payload).is_err());
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let tile = TileData::from_plane(2, 2, vec![0.0; 4]).unwrap();
        let mask = Mask::all_valid(2, 2);
        let payload = encode_tile(&tile, &mask);
        assert!(decode_tile(&payload[..payload.len() - 1]).is_err());
        assert!(decode_tile(&payload[..4]).is_err());
    }
}
