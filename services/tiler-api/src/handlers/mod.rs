//! HTTP request handlers.
//!
//! Submodules:
//! - `tiles`: scene/COG tile rendering and the legacy ratio endpoint
//! - `metadata`: tilejson, bounds, and metadata endpoints
//! - `search`: catalog search
//! - `common`: response envelope, error mapping, path-segment parsing

pub mod common;
pub mod metadata;
pub mod search;
pub mod tiles;

pub use common::{favicon_handler, ApiError, Envelope};
pub use metadata::{
    scene_bounds_handler, scene_metadata_handler, tilejson_handler, url_bounds_handler,
    url_metadata_handler,
};
pub use search::search_handler;
pub use tiles::{cog_tile_handler, ratio_tile_handler, scene_tile_handler};
