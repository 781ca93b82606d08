//! Scene tiler API service.
//!
//! HTTP front end over the tile rendering pipeline: XYZ tile endpoints,
//! tilejson/bounds/metadata, catalog search, and a legacy ratio-processing
//! endpoint. Routing, CORS, and gzip negotiation are handled by the axum
//! layer stack; the handlers produce `{status, mime_type, body}` envelopes.

pub mod handlers;
pub mod state;

use axum::{extract::Extension, routing::get, Router};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use state::AppState;

/// Build the service router.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        // Scene tile endpoints ("94.png" or "94@2x.png" final segment)
        .route("/tiles/:scene/:z/:x/:y", get(handlers::scene_tile_handler))
        // COG tile endpoints keyed by a `url` query parameter
        .route("/cog/tiles/:z/:x/:y", get(handlers::cog_tile_handler))
        // Legacy ratio-processing endpoint
        .route(
            "/processing/:scene/:z/:x/:y",
            get(handlers::ratio_tile_handler),
        )
        // Metadata endpoints
        .route("/tilejson.json", get(handlers::tilejson_handler))
        .route("/bounds/:scene", get(handlers::scene_bounds_handler))
        .route("/bounds", get(handlers::url_bounds_handler))
        .route("/metadata/:scene", get(handlers::scene_metadata_handler))
        .route("/metadata", get(handlers::url_metadata_handler))
        // Catalog search
        .route("/search/:path/:row", get(handlers::search_handler))
        // Favicon
        .route("/favicon.ico", get(handlers::favicon_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}
