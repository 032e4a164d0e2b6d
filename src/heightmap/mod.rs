//! Height field synthesis and sculpting.
//!
//! A base field comes from fractal noise rasterized over the domain, shaped
//! by a radial falloff and min-max normalized to [0, 1]. Templates of
//! sculpting operators then push the field into a recognizable landmass
//! layout.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::map::Map;
use crate::noise::{FractalNoise, FractalNoiseConfig};
use crate::rng::AleaRng;

mod range;
mod sculpt;
mod template;

pub use range::{RangeExpr, RangeParseError};
pub use sculpt::{HeightBand, MirrorAxes, SculptOp, Sculptor};
pub use template::{Template, TemplateStep};

/// Controls the synthesized base field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HeightmapConfig {
    pub noise: FractalNoiseConfig,
    /// Strength of the radial falloff toward the domain edges, 0 (none) to
    /// 1 (edges forced to zero before normalization).
    pub falloff: f64,
}

impl Default for HeightmapConfig {
    fn default() -> Self {
        Self {
            noise: FractalNoiseConfig::default(),
            falloff: 1.0,
        }
    }
}

impl HeightmapConfig {
    /// Strong central landmass, oceanic edges.
    pub fn island() -> Self {
        Self::default()
    }

    /// Weak falloff, lets landmasses touch the domain edges.
    pub fn open_edges() -> Self {
        Self {
            falloff: 0.3,
            ..Self::default()
        }
    }
}

/// Rasterizes fractal noise over the domain at one sample per map unit and
/// assigns each cell the normalized value of the pixel containing its site.
pub fn synthesize(map: &mut Map, rng: &mut AleaRng, config: &HeightmapConfig) {
    if map.cells.is_empty() {
        return;
    }
    let raster_w = (map.width.ceil() as usize).max(1);
    let raster_h = (map.height.ceil() as usize).max(1);
    let noise = FractalNoise::new(rng, config.noise);
    let falloff = config.falloff.clamp(0.0, 1.0);
    let (w, h) = (map.width, map.height);

    let mut raster = vec![0.0f64; raster_w * raster_h];
    raster
        .par_chunks_mut(raster_w)
        .enumerate()
        .for_each(|(row, pixels)| {
            let y = row as f64 + 0.5;
            let ny = 2.0 * y / h - 1.0;
            for (col, pixel) in pixels.iter_mut().enumerate() {
                let x = col as f64 + 0.5;
                let nx = 2.0 * x / w - 1.0;
                let bowl = (1.0 - nx * nx) * (1.0 - ny * ny);
                let shaped = 1.0 - falloff * (1.0 - bowl);
                let value = noise.sample(x, y) * 0.5 + 0.5;
                *pixel = value * shaped;
            }
        });

    let (min, max) = raster
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let span = max - min;
    if span > f64::EPSILON {
        for v in raster.iter_mut() {
            *v = (*v - min) / span;
        }
    } else {
        raster.fill(0.0);
    }

    for cell in map.cells.iter_mut() {
        let col = (cell.point.x as usize).min(raster_w - 1);
        let row = (cell.point.y as usize).min(raster_h - 1);
        cell.height = raster[row * raster_w + col];
    }
}
