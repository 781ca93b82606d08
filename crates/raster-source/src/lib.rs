//! Narrow interfaces to the external raster engine and scene catalog.
//!
//! The tiler core never decodes rasters or searches archives itself; it
//! talks to collaborators through these traits so the pipeline can be
//! exercised with synthetic tiles and fixed catalogs in tests. The raster
//! engine owns decoding, reprojection, zoom math, and band expression
//! evaluation; it hands back a raw band stack plus validity mask (or
//! nothing, for a tile wholly outside coverage).

pub mod http;
pub mod wire;

use async_trait::async_trait;
use serde_json::Value;

use tiler_common::error::TilerResult;
use tiler_common::tile::{Mask, TileData};

/// What the request addresses: a catalog scene id or a direct raster URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneTarget {
    Scene(String),
    Url(String),
}

impl SceneTarget {
    /// Query-parameter key/value for the backing engine.
    pub fn as_query(&self) -> (&'static str, &str) {
        match self {
            SceneTarget::Scene(id) => ("scene", id),
            SceneTarget::Url(url) => ("url", url),
        }
    }
}

/// A single tile fetch against the raster engine.
#[derive(Debug, Clone, PartialEq)]
pub struct TileFetchRequest {
    pub target: SceneTarget,
    pub z: u32,
    pub x: u32,
    pub y: u32,
    pub tile_size: usize,
    /// Band names/indices to read; `None` lets the source pick its default
    /// band set.
    pub bands: Option<Vec<String>>,
    /// Algebraic expression evaluated by the engine over source bands.
    /// Mutually exclusive with `bands` (enforced by the parameter
    /// resolver before a request is ever built).
    pub expression: Option<String>,
    pub nodata: Option<f32>,
}

/// Raster engine interface. A `None` tile means the fetch found no data at
/// all (the pipeline substitutes zeros + an invalid mask).
#[async_trait]
pub trait RasterSource: Send + Sync {
    async fn fetch_tile(&self, req: &TileFetchRequest) -> TilerResult<Option<(TileData, Mask)>>;

    /// Scene/raster bounds as upstream JSON, passed through untouched.
    async fn bounds(&self, target: &SceneTarget) -> TilerResult<Value>;

    /// Scene/raster statistics (percentile cuts `pmin`/`pmax`) as upstream
    /// JSON, passed through untouched.
    async fn metadata(&self, target: &SceneTarget, pmin: f64, pmax: f64) -> TilerResult<Value>;
}

/// Catalog-search interface (scene discovery is out of pipeline scope).
#[async_trait]
pub trait SceneCatalog: Send + Sync {
    /// Search scenes by archive path/row; results are upstream JSON
    /// documents, passed through untouched.
    async fn search(&self, path: &str, row: &str) -> TilerResult<Vec<Value>>;
}
