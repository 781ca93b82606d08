//! Shared test utilities for the scene-tiler workspace.
//!
//! Provides synthetic raster/catalog collaborators and tile generators so
//! the pipeline and the HTTP service can be tested without any network or
//! native raster dependency.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{json, Value};

use raster_source::{RasterSource, SceneCatalog, SceneTarget, TileFetchRequest};
use tiler_common::error::{TilerError, TilerResult};
use tiler_common::tile::{Mask, TileData};

/// Linear gradient plane in `[0, max]`, row-major.
pub fn gradient_plane(size: usize, max: f32) -> Vec<f32> {
    let n = size * size;
    (0..n).map(|i| i as f32 / (n - 1) as f32 * max).collect()
}

/// Tile whose bands are identical gradient planes.
pub fn gradient_tile(bands: usize, size: usize, max: f32) -> (TileData, Mask) {
    (
        TileData::new(size, size, vec![gradient_plane(size, max); bands]).unwrap(),
        Mask::all_valid(size, size),
    )
}

/// Mask with the left half valid and the right half nodata.
pub fn half_mask(size: usize) -> Mask {
    let data = (0..size * size)
        .map(|i| if i % size < size / 2 { 255 } else { 0 })
        .collect();
    Mask::new(size, size, data).unwrap()
}

/// How the synthetic source answers tile fetches.
#[derive(Debug, Clone)]
pub enum SyntheticBehavior {
    /// Gradient bands in `[0, max]`; expressions yield a ratio plane in
    /// `[-1, 1]`.
    Gradient { max: f32 },
    /// Constant elevation plane (for DEM tests).
    Elevation(f32),
    /// No data at all (outside coverage).
    Empty,
    /// Every fetch fails.
    Failing,
}

/// In-memory raster engine standing in for the external tiling library.
pub struct SyntheticRasterSource {
    pub behavior: SyntheticBehavior,
    /// Scenes the source knows about; unknown scenes fail the fetch.
    pub known_scenes: HashSet<String>,
    fetches: AtomicUsize,
}

impl SyntheticRasterSource {
    pub fn new(behavior: SyntheticBehavior) -> Self {
        Self {
            behavior,
            known_scenes: HashSet::new(),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RasterSource for SyntheticRasterSource {
    async fn fetch_tile(&self, req: &TileFetchRequest) -> TilerResult<Option<(TileData, Mask)>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if let SceneTarget::Scene(id) = &req.target {
            if !self.known_scenes.is_empty() && !self.known_scenes.contains(id) {
                return Err(TilerError::UpstreamFetchFailure(format!(
                    "unknown scene '{}'",
                    id
                )));
            }
        }

        let size = req.tile_size;
        match &self.behavior {
            SyntheticBehavior::Empty => Ok(None),
            SyntheticBehavior::Failing => Err(TilerError::UpstreamFetchFailure(
                "synthetic backend failure".into(),
            )),
            SyntheticBehavior::Elevation(elevation) => Ok(Some((
                TileData::from_plane(size, size, vec![*elevation; size * size]).unwrap(),
                Mask::all_valid(size, size),
            ))),
            SyntheticBehavior::Gradient { max } => {
                if req.expression.is_some() {
                    // A band ratio collapses to a single plane in [-1, 1].
                    let n = size * size;
                    let plane = (0..n)
                        .map(|i| i as f32 / (n - 1) as f32 * 2.0 - 1.0)
                        .collect();
                    return Ok(Some((
                        TileData::from_plane(size, size, plane).unwrap(),
                        Mask::all_valid(size, size),
                    )));
                }
                let bands = req.bands.as_ref().map(|b| b.len()).unwrap_or(1);
                Ok(Some(gradient_tile(bands, size, *max)))
            }
        }
    }

    async fn bounds(&self, target: &SceneTarget) -> TilerResult<Value> {
        let (_, name) = target.as_query();
        Ok(json!({
            "bounds": [-10.0, -10.0, 10.0, 10.0],
            "name": name,
        }))
    }

    async fn metadata(&self, target: &SceneTarget, pmin: f64, pmax: f64) -> TilerResult<Value> {
        let (_, name) = target.as_query();
        Ok(json!({
            "name": name,
            "statistics": { "pmin": pmin, "pmax": pmax },
        }))
    }
}

/// Fixed-result catalog.
pub struct SyntheticCatalog {
    pub results: Vec<Value>,
}

impl SyntheticCatalog {
    pub fn with_results(count: usize) -> Self {
        Self {
            results: (0..count)
                .map(|i| json!({ "scene_id": format!("SCENE_{:03}", i) }))
                .collect(),
        }
    }
}

#[async_trait]
impl SceneCatalog for SyntheticCatalog {
    async fn search(&self, _path: &str, _row: &str) -> TilerResult<Vec<Value>> {
        Ok(self.results.clone())
    }
}
