//! River path smoothing.
//!
//! Raw river courses hop from cell point to cell point and look angular.
//! This pass perturbs long segments with a perpendicular meander, then
//! rounds the corners with Chaikin cutting, and finally fixes each river's
//! rendered width and length. `ribbon` turns a smoothed course into a
//! closed polygon whose width grows with accumulated flux.

use glam::DVec2;

use crate::map::{Map, MeanderPoint, OFF_MAP, River};
use crate::rng::AleaRng;

use super::{HydrologyConfig, flux_width, round2};

/// Segments longer than this get a meander midpoint.
const MEANDER_MIN_LENGTH: f64 = 10.0;

/// Every point along the course widens the river by 1/LENGTH_FACTOR.
const LENGTH_FACTOR: f64 = 200.0;

pub(crate) fn shape(map: &mut Map, config: &HydrologyConfig, rng: &mut AleaRng) {
    let rivers = std::mem::take(&mut map.rivers);
    let mut shaped = Vec::with_capacity(rivers.len());
    for mut river in rivers {
        let raw = raw_points(map, &river);
        if raw.len() < 2 {
            river.meander = raw;
            shaped.push(river);
            continue;
        }
        let meandered = insert_meanders(&raw, config.meandering, rng);
        let smooth = chaikin(&meandered, config.smoothing_rounds);
        river.length = polyline_length(&smooth);
        river.width = round2(
            (offset(
                f64::from(river.discharge),
                smooth.len(),
                river.width_factor,
                river.source_width,
            ) / 1.5)
                .powf(1.8),
        );
        river.meander = smooth;
        shaped.push(river);
    }
    map.rivers = shaped;
}

/// Cell positions with their flux. An off-map sentinel becomes the
/// previous point projected onto the nearest domain edge.
fn raw_points(map: &Map, river: &River) -> Vec<MeanderPoint> {
    let mut points: Vec<MeanderPoint> = Vec::with_capacity(river.cells.len());
    for &cell in &river.cells {
        if cell == OFF_MAP {
            let Some(&last) = points.last() else { continue };
            points.push(MeanderPoint {
                pos: edge_point(last.pos, map.width, map.height),
                flux: last.flux,
            });
            continue;
        }
        let cell = &map.cells[cell as usize];
        points.push(MeanderPoint {
            pos: cell.point,
            flux: f64::from(cell.flux),
        });
    }
    points
}

fn edge_point(p: DVec2, width: f64, height: f64) -> DVec2 {
    let nearest = p.y.min(height - p.y).min(p.x).min(width - p.x);
    if nearest == p.y {
        DVec2::new(p.x, 0.0)
    } else if nearest == height - p.y {
        DVec2::new(p.x, height)
    } else if nearest == p.x {
        DVec2::new(0.0, p.y)
    } else {
        DVec2::new(width, p.y)
    }
}

/// Adds a randomly displaced midpoint to every long segment. The offset
/// is perpendicular to the segment and proportional to its length.
fn insert_meanders(
    points: &[MeanderPoint],
    meandering: f64,
    rng: &mut AleaRng,
) -> Vec<MeanderPoint> {
    let mut out = Vec::with_capacity(points.len() * 2);
    for (i, &point) in points.iter().enumerate() {
        out.push(point);
        let Some(&next) = points.get(i + 1) else {
            break;
        };
        let segment = next.pos - point.pos;
        let length = segment.length();
        if length <= MEANDER_MIN_LENGTH {
            continue;
        }
        let perpendicular = DVec2::new(-segment.y, segment.x) / length;
        let displacement = length * meandering * rng.float(-0.5, 0.5);
        out.push(MeanderPoint {
            pos: (point.pos + next.pos) * 0.5 + perpendicular * displacement,
            flux: (point.flux + next.flux) * 0.5,
        });
    }
    out
}

/// Chaikin corner cutting: each edge contributes its quarter points, the
/// endpoints survive every round.
fn chaikin(points: &[MeanderPoint], rounds: u32) -> Vec<MeanderPoint> {
    let mut current = points.to_vec();
    for _ in 0..rounds {
        if current.len() < 3 {
            break;
        }
        let mut next = Vec::with_capacity(current.len() * 2);
        next.push(current[0]);
        for pair in current.windows(2) {
            next.push(lerp(pair[0], pair[1], 0.25));
            next.push(lerp(pair[0], pair[1], 0.75));
        }
        next.push(current[current.len() - 1]);
        current = next;
    }
    current
}

fn lerp(a: MeanderPoint, b: MeanderPoint, t: f64) -> MeanderPoint {
    MeanderPoint {
        pos: a.pos.lerp(b.pos, t),
        flux: a.flux + (b.flux - a.flux) * t,
    }
}

fn polyline_length(points: &[MeanderPoint]) -> f64 {
    points
        .windows(2)
        .map(|pair| pair[0].pos.distance(pair[1].pos))
        .sum()
}

/// Half-width of the river at a given point index.
fn offset(flux: f64, index: usize, width_factor: f64, source_width: f64) -> f64 {
    let length_width = index as f64 / LENGTH_FACTOR;
    width_factor * (length_width + flux_width(flux)) + source_width
}

/// Closed polygon around a smoothed course, offsetting each point left and
/// right of the local flow direction. Empty when the course has fewer than
/// two points.
pub fn ribbon(river: &River) -> Vec<DVec2> {
    let points = &river.meander;
    if points.len() < 2 {
        return Vec::new();
    }
    let mut left = Vec::with_capacity(points.len());
    let mut right = Vec::with_capacity(points.len());
    for (i, point) in points.iter().enumerate() {
        let half_width = offset(point.flux, i, river.width_factor, river.source_width);
        let prev = if i == 0 { point.pos } else { points[i - 1].pos };
        let next = if i + 1 == points.len() {
            point.pos
        } else {
            points[i + 1].pos
        };
        let angle = (prev.y - next.y).atan2(prev.x - next.x);
        let dx = angle.sin() * half_width;
        let dy = angle.cos() * half_width;
        left.push(DVec2::new(point.pos.x - dx, point.pos.y + dy));
        right.push(DVec2::new(point.pos.x + dx, point.pos.y - dy));
    }
    right.reverse();
    right.extend(left);
    right
}
