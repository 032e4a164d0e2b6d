//! Seed-point scatter for the cell mesh.

use glam::DVec2;

use crate::rng::AleaRng;

/// Result of scattering points on a jittered square grid.
///
/// The underlying grid shape is retained: it gives O(1) nearest-cell lookup
/// (`Map::cell_at`) because each point stays within 45% of the spacing of
/// its home grid node.
#[derive(Debug, Clone)]
pub struct PointScatter {
    pub points: Vec<DVec2>,
    pub spacing: f64,
    pub cols: usize,
    pub rows: usize,
}

/// Rounds to two decimal places, matching the stored point precision.
#[inline]
pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Scatters roughly `cells_desired` points over the `width` x `height`
/// domain on a square grid jittered by up to 0.9 * (spacing / 2) per axis.
///
/// Coordinates are rounded to two decimals and clamped into the domain. The
/// actual point count depends on how the grid divides the domain and is
/// usually within a few percent of the request.
pub fn jittered_grid(
    rng: &mut AleaRng,
    width: f64,
    height: f64,
    cells_desired: usize,
) -> PointScatter {
    let spacing = round2((width * height / cells_desired as f64).sqrt());
    let radius = spacing / 2.0;
    let jitter = radius * 0.9;

    let mut xs = Vec::new();
    let mut x = radius;
    while x < width {
        xs.push(x);
        x += spacing;
    }
    let mut ys = Vec::new();
    let mut y = radius;
    while y < height {
        ys.push(y);
        y += spacing;
    }

    let mut points = Vec::with_capacity(xs.len() * ys.len());
    for &gy in &ys {
        for &gx in &xs {
            let px = round2(gx + rng.random() * 2.0 * jitter - jitter).min(width);
            let py = round2(gy + rng.random() * 2.0 * jitter - jitter).min(height);
            points.push(DVec2::new(px, py));
        }
    }

    PointScatter {
        points,
        spacing,
        cols: xs.len(),
        rows: ys.len(),
    }
}
