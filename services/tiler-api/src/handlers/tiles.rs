//! Tile rendering handlers.

use axum::extract::{Extension, Path, Query};
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;

use raster_source::{SceneTarget, TileFetchRequest};
use renderer::{encode_image, render};
use tiler_common::error::TilerError;
use tiler_common::params::{parse_histo, RawTileRequest, RenderMode, TileParams};

use super::common::{parse_y_segment, ApiError, Envelope};
use crate::state::AppState;

/// Historical stretch applied to 16-bit scene bands when the request gives
/// neither `rescale` nor `histo`.
const SCENE_HISTO_DEFAULT: (f32, f32) = (0.0, 16000.0);

#[derive(Debug, Deserialize, Default)]
pub struct TileQuery {
    pub bands: Option<String>,
    pub expr: Option<String>,
    pub dem: Option<String>,
    pub rescale: Option<String>,
    pub histo: Option<String>,
    pub color_formula: Option<String>,
    pub color_map: Option<String>,
    pub nodata: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct CogTileQuery {
    pub url: Option<String>,
    pub indexes: Option<String>,
    pub expr: Option<String>,
    pub dem: Option<String>,
    pub rescale: Option<String>,
    pub color_formula: Option<String>,
    pub color_map: Option<String>,
    pub nodata: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RatioQuery {
    pub ratio: Option<String>,
    pub range: Option<String>,
    pub color_map: Option<String>,
}

/// GET /tiles/:scene/:z/:x/:y — scene tile rendering.
///
/// The final path segment carries the row, optional scale suffix, and
/// extension (`94.png`, `94@2x.png`). Band requests with no `rescale` or
/// `histo` get the historical 16-bit stretch.
#[instrument(skip(state, query))]
pub async fn scene_tile_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((scene, z, x, y_segment)): Path<(String, u32, u32, String)>,
    Query(query): Query<TileQuery>,
) -> Result<Envelope, ApiError> {
    let (y, scale, ext) = parse_y_segment(&y_segment)?;
    let raw = RawTileRequest {
        scale,
        ext,
        bands: query.bands.as_deref(),
        expr: query.expr.as_deref(),
        dem: query.dem.as_deref(),
        rescale: query.rescale.as_deref(),
        color_formula: query.color_formula.as_deref(),
        color_map: query.color_map.as_deref(),
        nodata: query.nodata.as_deref(),
        band_param: "bands",
    };
    render_tile(
        &state,
        SceneTarget::Scene(scene),
        z,
        x,
        y,
        raw,
        query.histo.as_deref(),
        Some(SCENE_HISTO_DEFAULT),
    )
    .await
}

/// GET /cog/tiles/:z/:x/:y — tile rendering for an arbitrary raster URL.
/// Band selection is spelled `indexes` on this endpoint.
#[instrument(skip(state, query))]
pub async fn cog_tile_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((z, x, y_segment)): Path<(u32, u32, String)>,
    Query(query): Query<CogTileQuery>,
) -> Result<Envelope, ApiError> {
    let url = query
        .url
        .clone()
        .ok_or_else(|| TilerError::MissingParameters("Missing 'url' parameter".into()))?;

    let (y, scale, ext) = parse_y_segment(&y_segment)?;
    let raw = RawTileRequest {
        scale,
        ext,
        bands: query.indexes.as_deref(),
        expr: query.expr.as_deref(),
        dem: query.dem.as_deref(),
        rescale: query.rescale.as_deref(),
        color_formula: query.color_formula.as_deref(),
        color_map: query.color_map.as_deref(),
        nodata: query.nodata.as_deref(),
        band_param: "indexes",
    };
    render_tile(&state, SceneTarget::Url(url), z, x, y, raw, None, None).await
}

/// GET /processing/:scene/:z/:x/:y — legacy ratio endpoint. The `ratio`
/// expression is rescaled against `range` (default symmetric index range)
/// and drawn with the index colormap.
#[instrument(skip(state, query))]
pub async fn ratio_tile_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((scene, z, x, y_segment)): Path<(String, u32, u32, String)>,
    Query(query): Query<RatioQuery>,
) -> Result<Envelope, ApiError> {
    let ratio = query
        .ratio
        .clone()
        .ok_or_else(|| TilerError::MissingParameters("Missing 'ratio' parameter".into()))?;

    let (y, scale, ext) = parse_y_segment(&y_segment)?;
    let raw = RawTileRequest {
        scale,
        ext,
        expr: Some(&ratio),
        rescale: query.range.as_deref(),
        color_map: query.color_map.as_deref(),
        band_param: "bands",
        ..Default::default()
    };
    render_tile(&state, SceneTarget::Scene(scene), z, x, y, raw, None, None).await
}

/// Shared tile path: resolve parameters, fetch, render, encode.
#[allow(clippy::too_many_arguments)]
async fn render_tile(
    state: &AppState,
    target: SceneTarget,
    z: u32,
    x: u32,
    y: u32,
    raw: RawTileRequest<'_>,
    histo: Option<&str>,
    band_default: Option<(f32, f32)>,
) -> Result<Envelope, ApiError> {
    let mut params = TileParams::resolve(raw)?;

    // Legacy histogram-cut ranges: strictly one pair per requested band.
    if let Some(histo) = histo {
        let pairs = parse_histo(histo)?;
        if let RenderMode::Bands(bands) = &params.mode {
            if pairs.len() != bands.len() {
                return Err(TilerError::BandCountMismatch.into());
            }
        }
        params.rescale = Some(pairs);
    }

    // No explicit range on a band request: apply the endpoint's legacy
    // stretch, if it has one.
    if params.rescale.is_none() {
        if let (Some(range), RenderMode::Bands(bands)) = (band_default, &params.mode) {
            params.rescale = Some(vec![range; bands.len()]);
        }
    }

    let fetch = build_fetch(target, z, x, y, &params);
    let fetched = state.raster.fetch_tile(&fetch).await?;
    let image = render(&params, fetched, &state.defaults, state.palettes.as_ref())?;
    let body = encode_image(&image, params.format)?;
    Ok(Envelope::ok(params.format.mime_type(), body))
}

fn build_fetch(
    target: SceneTarget,
    z: u32,
    x: u32,
    y: u32,
    params: &TileParams,
) -> TileFetchRequest {
    let (bands, expression) = match &params.mode {
        RenderMode::Bands(names) => (Some(names.clone()), None),
        RenderMode::Expression(expr) => (None, Some(expr.clone())),
        // The elevation band is the source's default band set.
        RenderMode::Dem(_) => (None, None),
    };
    TileFetchRequest {
        target,
        z,
        x,
        y,
        tile_size: params.tile_size,
        bands,
        expression,
        nodata: params.nodata,
    }
}
