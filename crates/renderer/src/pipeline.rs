//! Render orchestrator.
//!
//! Sequences the pipeline stages per request mode:
//!
//! - Bands: rescale -> optional color formula -> optional colormap
//! - Expression: promote to one-band stack -> rescale (default symmetric
//!   index range) -> optional formula -> index colormap
//! - DEM: terrain-RGB encoding only; all other stages bypassed
//!
//! The mode was selected once by the parameter resolver and never changes
//! mid-request. An empty upstream fetch is substituted with a zero band
//! stack and a fully invalid mask rather than propagated.

use tracing::debug;

use tiler_common::error::{TilerError, TilerResult};
use tiler_common::params::{resolve_ranges, RenderDefaults, RenderMode, TileParams};
use tiler_common::tile::{Mask, RenderedImage, TileData};

use crate::color_ops::apply_color_ops;
use crate::colormap::{apply_colormap, resolve_palette, PaletteProvider};
use crate::dem::encode_terrain;
use crate::rescale::{clamp_tile, rescale_tile};

/// Render a fetched tile (or the empty-fetch substitute) into the final
/// 8-bit pixel buffer for encoding.
pub fn render(
    params: &TileParams,
    fetched: Option<(TileData, Mask)>,
    defaults: &RenderDefaults,
    palettes: &dyn PaletteProvider,
) -> TilerResult<RenderedImage> {
    let (tile, mask) = match fetched {
        Some((tile, mask)) => {
            if tile.width != mask.width || tile.height != mask.height {
                return Err(TilerError::RenderError(format!(
                    "tile shape {}x{} does not match mask {}x{}",
                    tile.width, tile.height, mask.width, mask.height
                )));
            }
            (tile, mask)
        }
        None => {
            debug!(size = params.tile_size, "empty upstream tile, substituting zeros");
            let bands = match &params.mode {
                RenderMode::Bands(names) => names.len(),
                _ => 1,
            };
            (
                TileData::zeros(bands, params.tile_size),
                Mask::all_invalid(params.tile_size, params.tile_size),
            )
        }
    };

    match &params.mode {
        RenderMode::Dem(encoding) => encode_terrain(&tile, &mask, *encoding),
        RenderMode::Bands(_) => {
            let rescaled = match ranges_for(params.rescale.as_deref(), defaults.band_rescale, &tile)
            {
                Some(ranges) => rescale_tile(&tile, &mask, &ranges),
                None => clamp_tile(&tile, &mask),
            };
            finish(rescaled, mask, params, palettes, None)
        }
        RenderMode::Expression(_) => {
            let ranges = ranges_for(
                params.rescale.as_deref(),
                Some(defaults.expression_rescale),
                &tile,
            )
            .unwrap_or_else(|| vec![defaults.expression_rescale; tile.band_count()]);
            let rescaled = rescale_tile(&tile, &mask, &ranges);
            finish(
                rescaled,
                mask,
                params,
                palettes,
                Some(defaults.expression_colormap.as_str()),
            )
        }
    }
}

/// Resolve per-band rescale ranges from the request or a mode default.
fn ranges_for(
    requested: Option<&[(f32, f32)]>,
    fallback: Option<(f32, f32)>,
    tile: &TileData,
) -> Option<Vec<(f32, f32)>> {
    match requested {
        Some(pairs) => Some(resolve_ranges(pairs, tile.band_count())),
        None => fallback.map(|pair| vec![pair; tile.band_count()]),
    }
}

/// Shared tail of the bands/expression paths: color formula, then colormap
/// when the image collapsed to a single band.
fn finish(
    bands: Vec<Vec<u8>>,
    mask: Mask,
    params: &TileParams,
    palettes: &dyn PaletteProvider,
    default_colormap: Option<&str>,
) -> TilerResult<RenderedImage> {
    let bands = apply_color_ops(bands, &params.color_ops)?;

    // Anything above RGBA has no pixel-format mapping in the encoders.
    if bands.len() > 4 {
        return Err(TilerError::RenderError(format!(
            "cannot encode a {}-band image",
            bands.len()
        )));
    }

    let colormap_name = params.color_map.as_deref().or(default_colormap);
    if let Some(name) = colormap_name {
        if bands.len() == 1 {
            let palette = resolve_palette(palettes, name)?;
            return Ok(apply_colormap(&bands[0], &mask, &palette));
        }
        if params.color_map.is_some() {
            // An explicit colormap on a multi-band render is a user error;
            // the implicit expression default is simply skipped.
            return Err(TilerError::ConflictingParameters(
                "Colormap is only supported for single-band output".into(),
            ));
        }
    }

    let width = mask.width;
    let height = mask.height;
    Ok(RenderedImage {
        width,
        height,
        bands,
        mask,
    })
}
