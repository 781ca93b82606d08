//! PNG encoding for rendered tiles.
//!
//! Two encoding modes:
//! - **Indexed (color type 3)** when the tile has ≤256 unique colors, which
//!   is the common case for colormapped index products.
//! - **RGBA (color type 6)** fallback for continuous imagery.
//!
//! `encode_png` picks automatically.

use std::collections::HashMap;
use std::io::Write;

/// Maximum palette entries for an indexed PNG.
const MAX_PALETTE_SIZE: usize = 256;

/// Encode RGBA pixels as PNG, preferring the indexed form when the color
/// count allows it.
pub fn encode_png(pixels: &[u8], width: usize, height: usize) -> Result<Vec<u8>, String> {
    match extract_palette(pixels) {
        Some((palette, indices)) => encode_png_indexed(width, height, &palette, &indices),
        None => encode_png_rgba(pixels, width, height),
    }
}

#[inline(always)]
fn pack_color(px: &[u8]) -> u32 {
    (px[0] as u32) | ((px[1] as u32) << 8) | ((px[2] as u32) << 16) | ((px[3] as u32) << 24)
}

/// Collect the unique colors of an RGBA buffer into a palette plus
/// per-pixel indices. Returns `None` once more than 256 colors are seen.
fn extract_palette(pixels: &[u8]) -> Option<(Vec<[u8; 4]>, Vec<u8>)> {
    let mut color_to_index: HashMap<u32, u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut palette: Vec<[u8; 4]> = Vec::with_capacity(MAX_PALETTE_SIZE);
    let mut indices: Vec<u8> = Vec::with_capacity(pixels.len() / 4);

    for px in pixels.chunks_exact(4) {
        let packed = pack_color(px);
        let index = match color_to_index.get(&packed) {
            Some(&idx) => idx,
            None => {
                if palette.len() >= MAX_PALETTE_SIZE {
                    return None;
                }
                let idx = palette.len() as u8;
                palette.push([px[0], px[1], px[2], px[3]]);
                color_to_index.insert(packed, idx);
                idx
            }
        };
        indices.push(index);
    }

    Some((palette, indices))
}

/// Indexed PNG (color type 3) with a tRNS chunk when any palette entry is
/// translucent.
pub fn encode_png_indexed(
    width: usize,
    height: usize,
    palette: &[[u8; 4]],
    indices: &[u8],
) -> Result<Vec<u8>, String> {
    let mut png = Vec::new();
    png.extend_from_slice(&[137, 80, 78, 71, 13, 10, 26, 10]);

    let mut ihdr = Vec::with_capacity(13);
    ihdr.extend_from_slice(&(width as u32).to_be_bytes());
    ihdr.extend_from_slice(&(height as u32).to_be_bytes());
    ihdr.push(8); // bit depth
    ihdr.push(3); // color type: indexed
    ihdr.extend_from_slice(&[0, 0, 0]); // compression, filter, interlace
    write_chunk(&mut png, b"IHDR", &ihdr);

    let mut plte = Vec::with_capacity(palette.len() * 3);
    for c in palette {
        plte.extend_from_slice(&c[..3]);
    }
    write_chunk(&mut png, b"PLTE", &plte);

    if palette.iter().any(|c| c[3] < 255) {
        let trns: Vec<u8> = palette.iter().map(|c| c[3]).collect();
        write_chunk(&mut png, b"tRNS", &trns);
    }

    let idat = deflate_scanlines(indices, width, height, 1)
        .map_err(|e| format!("IDAT compression failed: {}", e))?;
    write_chunk(&mut png, b"IDAT", &idat);
    write_chunk(&mut png, b"IEND", &[]);
    Ok(png)
}

/// RGBA PNG (color type 6).
pub fn encode_png_rgba(pixels: &[u8], width: usize, height: usize) -> Result<Vec<u8>, String> {
    let mut png = Vec::new();
    png.extend_from_slice(&[137, 80, 78, 71, 13, 10, 26, 10]);

    let mut ihdr = Vec::with_capacity(13);
    ihdr.extend_from_slice(&(width as u32).to_be_bytes());
    ihdr.extend_from_slice(&(height as u32).to_be_bytes());
    ihdr.push(8); // bit depth
    ihdr.push(6); // color type: RGBA
    ihdr.extend_from_slice(&[0, 0, 0]);
    write_chunk(&mut png, b"IHDR", &ihdr);

    let idat = deflate_scanlines(pixels, width, height, 4)
        .map_err(|e| format!("IDAT compression failed: {}", e))?;
    write_chunk(&mut png, b"IDAT", &idat);
    write_chunk(&mut png, b"IEND", &[]);
    Ok(png)
}

/// Prefix each scanline with a filter byte (0 = none) and zlib-compress.
fn deflate_scanlines(
    data: &[u8],
    width: usize,
    height: usize,
    bytes_per_pixel: usize,
) -> Result<Vec<u8>, std::io::Error> {
    let stride = width * bytes_per_pixel;
    let mut raw = Vec::with_capacity(height * (1 + stride));
    for y in 0..height {
        raw.push(0);
        raw.extend_from_slice(&data[y * stride..(y + 1) * stride]);
    }

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(&raw)?;
    encoder.finish()
}

/// Write one PNG chunk: length, type, data, CRC.
fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

    #[test]
    fn palette_extraction_dedupes_colors() {
        let pixels = [
            255, 0, 0, 255, //
            0, 255, 0, 255, //
            255, 0, 0, 255, //
        ];
        let (palette, indices) = extract_palette(&pixels).unwrap();
        assert_eq!(palette.len(), 2);
        assert_eq!(indices, vec![0, 1, 0]);
    }

    #[test]
    fn too_many_colors_falls_back_to_rgba() {
        let mut pixels = Vec::new();
        for i in 0..300u32 {
            pixels.extend_from_slice(&[(i % 256) as u8, (i / 256) as u8, 7, 255]);
        }
        assert!(extract_palette(&pixels).is_none());
        let png = encode_png(&pixels, 300, 1).unwrap();
        assert_eq!(&png[..8], &PNG_SIGNATURE);
        // color type byte inside IHDR data: signature(8) + len(4) + type(4) + 9th byte
        assert_eq!(png[8 + 8 + 9], 6);
    }

    #[test]
    fn indexed_png_for_colormapped_tile() {
        // Two-color tile, one transparent
        let pixels = [
            10, 20, 30, 255, //
            0, 0, 0, 0, //
            10, 20, 30, 255, //
            0, 0, 0, 0, //
        ];
        let png = encode_png(&pixels, 2, 2).unwrap();
        assert_eq!(&png[..8], &PNG_SIGNATURE);
        assert_eq!(png[8 + 8 + 9], 3);
        // transparency present -> tRNS chunk emitted
        assert!(png.windows(4).any(|w| w == b"tRNS"));
    }
}
