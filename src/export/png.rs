//! PNG preview export for generated maps.
//!
//! Two rasterizations of the cell graph: a biome preview (palette colors,
//! depth-shaded water, river courses drawn on top) and a plain grayscale
//! height map. Both sample the nearest cell per pixel, so output resolution
//! follows the domain size times the chosen scale.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ImageBuffer, ImageEncoder, Luma};
use rayon::prelude::*;
use thiserror::Error;

use crate::map::Map;

const RIVER_COLOR: [u8; 3] = [82, 116, 180];

/// Errors that can occur during preview export.
#[derive(Error, Debug)]
pub enum PngExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),
    #[error("map has no cells to render")]
    EmptyMap,
}

/// Options for preview export.
#[derive(Debug, Clone)]
pub struct PngExportOptions {
    /// Pixels per map unit.
    pub scale: f64,
    /// Overlay smoothed river courses on the biome preview.
    pub rivers: bool,
    /// PNG compression type.
    pub compression: CompressionType,
    /// PNG filter type.
    pub filter: FilterType,
}

impl Default for PngExportOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            rivers: true,
            compression: CompressionType::Default,
            filter: FilterType::Adaptive,
        }
    }
}

fn raster_size(map: &Map, scale: f64) -> (u32, u32) {
    let w = (map.width * scale).ceil().max(1.0) as u32;
    let h = (map.height * scale).ceil().max(1.0) as u32;
    (w, h)
}

/// Exports the biome preview as an RGB PNG.
///
/// Each pixel takes its cell's preview color (biome palette shaded by
/// relief on land, depth-shaded blue over water); smoothed river courses
/// are stroked over the base unless disabled.
pub fn export_biome_png(
    map: &Map,
    path: &Path,
    options: &PngExportOptions,
) -> Result<(), PngExportError> {
    if map.cells.is_empty() {
        return Err(PngExportError::EmptyMap);
    }
    let (width, height) = raster_size(map, options.scale);
    let row_bytes = width as usize * 3;

    let mut pixels = vec![0u8; row_bytes * height as usize];
    pixels
        .par_chunks_mut(row_bytes)
        .enumerate()
        .for_each(|(row, out)| {
            let y = (row as f64 + 0.5) / options.scale;
            for col in 0..width as usize {
                let x = (col as f64 + 0.5) / options.scale;
                if let Some(id) = map.cell_at(x, y) {
                    out[col * 3..col * 3 + 3].copy_from_slice(&map.cell_color(id));
                }
            }
        });

    if options.rivers {
        draw_rivers(map, &mut pixels, width, height, options.scale);
    }

    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let encoder = PngEncoder::new_with_quality(writer, options.compression, options.filter);
    encoder.write_image(&pixels, width, height, image::ExtendedColorType::Rgb8)?;
    Ok(())
}

/// Exports the height field as an 8-bit grayscale PNG, black at elevation 0
/// and white at 1.
pub fn export_height_png(
    map: &Map,
    path: &Path,
    options: &PngExportOptions,
) -> Result<(), PngExportError> {
    if map.cells.is_empty() {
        return Err(PngExportError::EmptyMap);
    }
    let (width, height) = raster_size(map, options.scale);

    let mut img: ImageBuffer<Luma<u8>, Vec<u8>> = ImageBuffer::new(width, height);
    for (px, py, pixel) in img.enumerate_pixels_mut() {
        let x = (f64::from(px) + 0.5) / options.scale;
        let y = (f64::from(py) + 0.5) / options.scale;
        let value = match map.cell_at(x, y) {
            Some(id) => (map.cells[id as usize].height.clamp(0.0, 1.0) * 255.0) as u8,
            None => 0,
        };
        *pixel = Luma([value]);
    }

    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let encoder = PngEncoder::new_with_quality(writer, options.compression, options.filter);
    encoder.write_image(img.as_raw(), width, height, image::ExtendedColorType::L8)?;
    Ok(())
}

/// Strokes every river's smoothed course, widening toward the mouth.
fn draw_rivers(map: &Map, pixels: &mut [u8], width: u32, height: u32, scale: f64) {
    for river in &map.rivers {
        let points = &river.meander;
        if points.len() < 2 {
            continue;
        }
        let count = points.len() as f64;
        for (i, pair) in points.windows(2).enumerate() {
            let (a, b) = (pair[0].pos, pair[1].pos);
            let length = a.distance(b);
            let steps = ((length * scale * 2.0).ceil() as usize).max(1);
            for step in 0..=steps {
                let t = step as f64 / steps as f64;
                let p = a.lerp(b, t);
                let along = (i as f64 + t) / count;
                let radius = (0.5 + along * river.width * 0.5).min(3.5) * scale;
                stamp(pixels, width, height, p.x * scale, p.y * scale, radius);
            }
        }
    }
}

fn stamp(pixels: &mut [u8], width: u32, height: u32, cx: f64, cy: f64, radius: f64) {
    let r = radius.max(0.5);
    let x0 = ((cx - r).floor() as i64).max(0);
    let x1 = ((cx + r).ceil() as i64).min(i64::from(width) - 1);
    let y0 = ((cy - r).floor() as i64).max(0);
    let y1 = ((cy + r).ceil() as i64).min(i64::from(height) - 1);
    for y in y0..=y1 {
        for x in x0..=x1 {
            let dx = x as f64 + 0.5 - cx;
            let dy = y as f64 + 0.5 - cy;
            if dx * dx + dy * dy > r * r {
                continue;
            }
            let at = (y as usize * width as usize + x as usize) * 3;
            pixels[at..at + 3].copy_from_slice(&RIVER_COLOR);
        }
    }
}
