//! Common types and utilities shared across all scene-tiler services.

pub mod error;
pub mod format;
pub mod params;
pub mod tile;

pub use error::{TilerError, TilerResult};
pub use format::ImageFormat;
pub use params::{
    parse_histo, parse_nodata, parse_rescale, ColorChannels, ColorOperation, DemEncoding,
    RenderDefaults, RenderMode, TileParams, BASE_TILE_SIZE,
};
pub use tile::{Mask, RenderedImage, TileData};
