//! Colormap application.
//!
//! Maps a single-band 8-bit index image to RGBA through a named 256-entry
//! palette. Palette content comes from an injected [`PaletteProvider`]; only
//! the application is implemented here, so the pipeline can be exercised
//! with fixed palettes in tests.

use tiler_common::error::{TilerError, TilerResult};
use tiler_common::tile::{Mask, RenderedImage};

/// One palette entry.
pub type Rgba = [u8; 4];

/// Named palette lookup: `name -> [RGBA; 256]`.
pub trait PaletteProvider: Send + Sync {
    fn palette(&self, name: &str) -> Option<[Rgba; 256]>;
}

/// Apply a palette to a single-band index image. Invalid pixels render
/// fully transparent, matching the rescaler's zeroing convention.
pub fn apply_colormap(band: &[u8], mask: &Mask, palette: &[Rgba; 256]) -> RenderedImage {
    let n = band.len();
    let mut r = vec![0u8; n];
    let mut g = vec![0u8; n];
    let mut b = vec![0u8; n];
    let mut a = vec![0u8; n];

    for i in 0..n {
        if !mask.is_valid(i) {
            continue;
        }
        let [pr, pg, pb, pa] = palette[band[i] as usize];
        r[i] = pr;
        g[i] = pg;
        b[i] = pb;
        a[i] = pa;
    }

    RenderedImage {
        width: mask.width,
        height: mask.height,
        bands: vec![r, g, b, a],
        mask: mask.clone(),
    }
}

/// Built-in palette registry. Ramps are expanded from color stops at
/// construction; the stop tables stand in for the external GDAL-style color
/// tables the production deployment injects.
#[derive(Debug, Default)]
pub struct BuiltinPalettes;

impl BuiltinPalettes {
    /// Expand `(position, rgb)` stops into a full 256-entry palette by
    /// linear interpolation.
    fn from_stops(stops: &[(f32, [u8; 3])]) -> [Rgba; 256] {
        let mut palette = [[0u8, 0, 0, 255]; 256];
        for (i, entry) in palette.iter_mut().enumerate() {
            let t = i as f32 / 255.0;
            let pos = stops.iter().rposition(|&(p, _)| p <= t).unwrap_or(0);
            let (p0, c0) = stops[pos];
            let (p1, c1) = *stops.get(pos + 1).unwrap_or(&stops[pos]);
            let f = if p1 > p0 { (t - p0) / (p1 - p0) } else { 0.0 };
            for ch in 0..3 {
                let lo = c0[ch] as f32;
                let hi = c1[ch] as f32;
                entry[ch] = (lo + (hi - lo) * f).round() as u8;
            }
        }
        palette
    }

    fn cfastie() -> [Rgba; 256] {
        // Qualitative NDVI ramp in the manner of the classic cfastie table.
        Self::from_stops(&[
            (0.0, [255, 255, 255]),
            (0.12, [0, 0, 255]),
            (0.30, [0, 255, 255]),
            (0.45, [0, 255, 0]),
            (0.60, [255, 255, 0]),
            (0.75, [255, 128, 0]),
            (0.90, [255, 0, 0]),
            (1.0, [128, 0, 128]),
        ])
    }

    fn greys() -> [Rgba; 256] {
        Self::from_stops(&[(0.0, [0, 0, 0]), (1.0, [255, 255, 255])])
    }

    fn schwarzwald() -> [Rgba; 256] {
        // Hypsometric terrain ramp.
        Self::from_stops(&[
            (0.0, [7, 47, 107]),
            (0.15, [8, 117, 57]),
            (0.35, [95, 160, 60]),
            (0.55, [217, 194, 121]),
            (0.75, [135, 96, 60]),
            (0.90, [150, 150, 150]),
            (1.0, [255, 255, 255]),
        ])
    }
}

impl PaletteProvider for BuiltinPalettes {
    fn palette(&self, name: &str) -> Option<[Rgba; 256]> {
        match name {
            "cfastie" => Some(Self::cfastie()),
            "greys" => Some(Self::greys()),
            "schwarzwald" => Some(Self::schwarzwald()),
            _ => None,
        }
    }
}

/// Look up a palette or fail with `InvalidParameter`.
pub fn resolve_palette(provider: &dyn PaletteProvider, name: &str) -> TilerResult<[Rgba; 256]> {
    provider.palette(name).ok_or_else(|| {
        TilerError::invalid_param("color_map", format!("Unknown colormap '{}'", name))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_palettes_resolve() {
        let provider = BuiltinPalettes;
        assert!(provider.palette("cfastie").is_some());
        assert!(provider.palette("greys").is_some());
        assert!(provider.palette("nope").is_none());
        assert!(resolve_palette(&provider, "nope").is_err());
    }

    #[test]
    fn greys_palette_is_identity_ramp() {
        let palette = BuiltinPalettes.palette("greys").unwrap();
        assert_eq!(palette[0], [0, 0, 0, 255]);
        assert_eq!(palette[255], [255, 255, 255, 255]);
        assert_eq!(palette[128][0], 128);
    }

    #[test]
    fn masked_pixels_render_transparent() {
        let palette = BuiltinPalettes.palette("greys").unwrap();
        let mask = Mask::new(2, 1, vec![255, 0]).unwrap();
        let img = apply_colormap(&[200, 200], &mask, &palette);
        assert_eq!(img.band_count(), 4);
        assert_eq!(img.bands[0][0], 200);
        assert_eq!(img.bands[3][0], 255);
        // invalid pixel is fully zeroed
        for band in &img.bands {
            assert_eq!(band[1], 0);
        }
    }
}
