//! Export module for saving generated maps as image files.
//!
//! Currently limited to PNG previews: a colored biome map with river
//! overlays and a grayscale height map.

mod png;

pub use png::{PngExportError, PngExportOptions, export_biome_png, export_height_png};
