//! Tile post-processing and rendering pipeline.
//!
//! Takes a raw multi-band tile plus validity mask (already extracted by the
//! raster backend) and produces encoded image bytes:
//!
//! - [`rescale`]: mask-aware linear stretch into 8-bit range
//! - [`color_ops`]: ordered chain of named color operations
//! - [`dem`]: terrain-RGB elevation encodings
//! - [`colormap`]: single-band index to RGBA palette application
//! - [`pipeline`]: the per-request orchestrator over the stages above
//! - [`png`] / [`encode`]: image container encoding

pub mod color_ops;
pub mod colormap;
pub mod dem;
pub mod encode;
pub mod pipeline;
pub mod png;
pub mod rescale;

pub use colormap::{BuiltinPalettes, PaletteProvider, Rgba};
pub use encode::encode_image;
pub use pipeline::render;
