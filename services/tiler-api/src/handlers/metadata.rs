//! Metadata endpoints: tilejson, bounds, and raster statistics. Bodies are
//! upstream JSON passed through untouched, wrapped in the response
//! envelope.

use axum::extract::{Extension, Path, Query};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;

use raster_source::SceneTarget;
use tiler_common::error::TilerError;

use super::common::{ApiError, Envelope};
use crate::state::AppState;

const DEFAULT_PMIN: f64 = 2.0;
const DEFAULT_PMAX: f64 = 98.0;

/// GET /tilejson.json?scene=...|url=...&tile_format=png&tile_scale=1
///
/// Remaining query parameters are carried through into the templated tile
/// URL so clients keep their rendering options.
#[instrument(skip(state, query))]
pub async fn tilejson_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(mut query): Query<BTreeMap<String, String>>,
) -> Result<Envelope, ApiError> {
    let scene = query.remove("scene");
    let url = query.remove("url");
    let tile_format = query.remove("tile_format").unwrap_or_else(|| "png".into());
    let tile_scale: i64 = query
        .remove("tile_scale")
        .map(|s| {
            s.parse()
                .map_err(|_| {
                    TilerError::invalid_param("tile_scale", format!("Invalid 'tile_scale' value '{}'", s))
                })
        })
        .transpose()?
        .unwrap_or(1);

    let (target, tile_path) = match (scene, url) {
        (Some(scene), None) => {
            let path = format!(
                "{}/tiles/{}/{{z}}/{{x}}/{{y}}@{}x.{}",
                state.base_url, scene, tile_scale, tile_format
            );
            (SceneTarget::Scene(scene), path)
        }
        (None, Some(url)) => {
            query.insert("url".into(), url.clone());
            let path = format!(
                "{}/cog/tiles/{{z}}/{{x}}/{{y}}@{}x.{}",
                state.base_url, tile_scale, tile_format
            );
            (SceneTarget::Url(url), path)
        }
        _ => {
            return Err(TilerError::MissingParameters(
                "Need 'scene' or 'url' parameter".into(),
            )
            .into())
        }
    };

    let mut tile_url = tile_path;
    if !query.is_empty() {
        // Re-encode the carried-through parameters; the extractor handed
        // them over decoded.
        let qs = serde_urlencoded::to_string(&query)
            .map_err(|e| TilerError::RenderError(format!("tile URL encoding failed: {}", e)))?;
        tile_url = format!("{}?{}", tile_url, qs);
    }

    let info = state.raster.bounds(&target).await?;
    let bounds = info
        .get("bounds")
        .and_then(|b| b.as_array())
        .and_then(|b| {
            let v: Vec<f64> = b.iter().filter_map(|x| x.as_f64()).collect();
            (v.len() == 4).then_some(v)
        })
        .ok_or_else(|| {
            TilerError::UpstreamFetchFailure("bounds response missing 'bounds'".into())
        })?;

    let minzoom = info.get("minzoom").and_then(|v| v.as_i64()).unwrap_or(0);
    let maxzoom = info.get("maxzoom").and_then(|v| v.as_i64()).unwrap_or(18);
    let (_, name) = target.as_query();
    let center = [
        (bounds[0] + bounds[2]) / 2.0,
        (bounds[1] + bounds[3]) / 2.0,
        minzoom as f64,
    ];

    Ok(Envelope::json(&json!({
        "bounds": bounds,
        "center": center,
        "minzoom": minzoom,
        "maxzoom": maxzoom,
        "name": name,
        "tilejson": "2.1.0",
        "tiles": [tile_url],
    })))
}

/// GET /bounds/:scene
#[instrument(skip(state))]
pub async fn scene_bounds_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(scene): Path<String>,
) -> Result<Envelope, ApiError> {
    let info = state.raster.bounds(&SceneTarget::Scene(scene)).await?;
    Ok(Envelope::json(&info))
}

/// GET /bounds?url=...
#[instrument(skip(state, query))]
pub async fn url_bounds_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<BTreeMap<String, String>>,
) -> Result<Envelope, ApiError> {
    let url = require_url(&query)?;
    let info = state.raster.bounds(&SceneTarget::Url(url)).await?;
    Ok(Envelope::json(&info))
}

/// GET /metadata/:scene?pmin=2&pmax=98
#[instrument(skip(state, query))]
pub async fn scene_metadata_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(scene): Path<String>,
    Query(query): Query<BTreeMap<String, String>>,
) -> Result<Envelope, ApiError> {
    let (pmin, pmax) = percentiles(&query)?;
    let info = state
        .raster
        .metadata(&SceneTarget::Scene(scene), pmin, pmax)
        .await?;
    Ok(Envelope::json(&info))
}

/// GET /metadata?url=...&pmin=2&pmax=98
#[instrument(skip(state, query))]
pub async fn url_metadata_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<BTreeMap<String, String>>,
) -> Result<Envelope, ApiError> {
    let url = require_url(&query)?;
    let (pmin, pmax) = percentiles(&query)?;
    let info = state
        .raster
        .metadata(&SceneTarget::Url(url), pmin, pmax)
        .await?;
    Ok(Envelope::json(&info))
}

fn require_url(query: &BTreeMap<String, String>) -> Result<String, TilerError> {
    query
        .get("url")
        .cloned()
        .ok_or_else(|| TilerError::MissingParameters("Missing 'url' parameter".into()))
}

/// Parse percentile-cut parameters with their historical defaults.
fn percentiles(query: &BTreeMap<String, String>) -> Result<(f64, f64), TilerError> {
    let parse = |key: &str, default: f64| -> Result<f64, TilerError> {
        match query.get(key) {
            Some(raw) => raw
                .parse()
                .map_err(|_| TilerError::invalid_param(key, format!("Invalid '{}' value '{}'", key, raw))),
            None => Ok(default),
        }
    };
    Ok((parse("pmin", DEFAULT_PMIN)?, parse("pmax", DEFAULT_PMAX)?))
}
