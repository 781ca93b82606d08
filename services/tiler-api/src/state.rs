//! Application state and shared resources.

use anyhow::Result;
use std::env;
use std::sync::Arc;

use raster_source::http::{HttpRasterSource, HttpSceneCatalog};
use raster_source::{RasterSource, SceneCatalog};
use renderer::colormap::{BuiltinPalettes, PaletteProvider};
use tiler_common::params::{parse_rescale, RenderDefaults};

/// Shared application state. Collaborators sit behind trait objects so
/// tests can swap in synthetic sources.
pub struct AppState {
    pub raster: Arc<dyn RasterSource>,
    pub catalog: Arc<dyn SceneCatalog>,
    pub palettes: Arc<dyn PaletteProvider>,
    pub defaults: RenderDefaults,
    /// Public base URL used to template tile URLs in tilejson documents.
    pub base_url: String,
}

impl AppState {
    /// Wire production collaborators from the environment.
    pub fn from_env() -> Result<Self> {
        let engine_url =
            env::var("RASTER_ENGINE_URL").unwrap_or_else(|_| "http://localhost:9090".to_string());
        let catalog_url =
            env::var("CATALOG_URL").unwrap_or_else(|_| "http://localhost:9091".to_string());
        let base_url =
            env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());

        let mut defaults = RenderDefaults::default();
        // Historical deployments disagreed on default stretch ranges; both
        // are overridable so the active choice is explicit.
        if let Ok(raw) = env::var("BAND_RESCALE_DEFAULT") {
            defaults.band_rescale = parse_rescale(&raw)
                .map_err(|e| anyhow::anyhow!("BAND_RESCALE_DEFAULT: {}", e))?
                .first()
                .copied();
        }
        if let Ok(raw) = env::var("EXPRESSION_RESCALE_DEFAULT") {
            defaults.expression_rescale = parse_rescale(&raw)
                .map_err(|e| anyhow::anyhow!("EXPRESSION_RESCALE_DEFAULT: {}", e))?
                .first()
                .copied()
                .unwrap_or(defaults.expression_rescale);
        }

        Ok(Self {
            raster: Arc::new(HttpRasterSource::new(engine_url)),
            catalog: Arc::new(HttpSceneCatalog::new(catalog_url)),
            palettes: Arc::new(BuiltinPalettes),
            defaults,
            base_url,
        })
    }

    /// Build state around explicit collaborators (used by tests).
    pub fn with_sources(
        raster: Arc<dyn RasterSource>,
        catalog: Arc<dyn SceneCatalog>,
    ) -> Self {
        Self {
            raster,
            catalog,
            palettes: Arc::new(BuiltinPalettes),
            defaults: RenderDefaults::default(),
            base_url: "http://localhost:8080".to_string(),
        }
    }
}
