//! Graph-based terrain sculpting operators.
//!
//! Operators work on a 0-100 internal height scale and write back to the
//! map's 0-1 field when the session finishes. Blob operators (hill, pit)
//! spread a decaying delta outward from a seed cell; line operators (range,
//! trough, strait) walk a jittered path between two points and widen it in
//! waves. Decay exponents depend on cell count so a feature covers a similar
//! fraction of the map at any resolution.

use std::collections::VecDeque;

use glam::DVec2;
use tracing::debug;

use crate::heightmap::range::RangeExpr;
use crate::map::Map;
use crate::rng::AleaRng;

/// Blob spread exponent per cell count. Entries are (cell count threshold,
/// exponent); the largest threshold not exceeding the actual count wins.
const BLOB_POWERS: &[(usize, f64)] = &[
    (1_000, 0.93),
    (2_000, 0.95),
    (5_000, 0.97),
    (10_000, 0.98),
    (20_000, 0.99),
    (30_000, 0.991),
    (40_000, 0.993),
    (50_000, 0.994),
    (60_000, 0.995),
    (80_000, 0.9966),
    (100_000, 0.9975),
];

/// Line wave decay exponent per cell count, same lookup rule.
const LINE_POWERS: &[(usize, f64)] = &[
    (1_000, 0.75),
    (2_000, 0.77),
    (5_000, 0.79),
    (10_000, 0.81),
    (20_000, 0.82),
    (30_000, 0.83),
    (40_000, 0.84),
    (50_000, 0.86),
    (60_000, 0.87),
    (80_000, 0.88),
    (100_000, 0.91),
];

const DEFAULT_BLOB_POWER: f64 = 0.98;
const DEFAULT_LINE_POWER: f64 = 0.81;

/// Blob seeds retry until the result would stay under this ceiling.
const HILL_CEILING: f64 = 90.0;
/// Retries for seed placement before giving up and using the last candidate.
const SEED_RETRIES: usize = 50;

fn power_for(table: &[(usize, f64)], cell_count: usize, default: f64) -> f64 {
    let mut chosen = default;
    let mut any = false;
    for &(threshold, power) in table {
        if cell_count >= threshold {
            chosen = power;
            any = true;
        }
    }
    if any { chosen } else { table.first().map_or(default, |&(_, p)| p) }
}

fn lim(h: f64) -> f64 {
    h.clamp(0.0, 100.0)
}

/// Mirror axes for [`SculptOp::Invert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorAxes {
    X,
    Y,
    Both,
}

/// Height band selector for [`SculptOp::Modify`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HeightBand {
    /// Cells at or above the water level.
    Land,
    /// Every cell.
    All,
    /// Cells whose internal height lies in `lo..=hi`. An inverted pair
    /// matches nothing, which is how malformed band strings degrade.
    Bounds { lo: f64, hi: f64 },
}

/// A compiled sculpting operation. Range arguments are parsed once; the
/// randomness is drawn when the operation runs.
#[derive(Debug, Clone, PartialEq)]
pub enum SculptOp {
    Hill {
        count: RangeExpr,
        height: RangeExpr,
        range_x: RangeExpr,
        range_y: RangeExpr,
    },
    Pit {
        count: RangeExpr,
        height: RangeExpr,
        range_x: RangeExpr,
        range_y: RangeExpr,
    },
    Range {
        count: RangeExpr,
        height: RangeExpr,
        range_x: RangeExpr,
        range_y: RangeExpr,
    },
    Trough {
        count: RangeExpr,
        height: RangeExpr,
        range_x: RangeExpr,
        range_y: RangeExpr,
    },
    Strait {
        width: RangeExpr,
        vertical: bool,
    },
    Mask {
        power: f64,
    },
    Smooth {
        fraction: f64,
        add: f64,
    },
    Invert {
        chance: f64,
        axes: MirrorAxes,
    },
    Modify {
        band: HeightBand,
        add: f64,
        multiply: f64,
    },
}

/// A sculpting session over a map. Heights are lifted to the 0-100 working
/// scale on entry and written back on [`Sculptor::finish`].
pub struct Sculptor<'a> {
    map: &'a mut Map,
    rng: &'a mut AleaRng,
    heights: Vec<f64>,
    blob_power: f64,
    line_power: f64,
}

impl<'a> Sculptor<'a> {
    pub fn new(map: &'a mut Map, rng: &'a mut AleaRng) -> Self {
        let heights: Vec<f64> = map
            .cells
            .iter()
            .map(|cell| lim(cell.height * 100.0))
            .collect();
        let count = map.cells.len();
        Self {
            blob_power: power_for(BLOB_POWERS, count, DEFAULT_BLOB_POWER),
            line_power: power_for(LINE_POWERS, count, DEFAULT_LINE_POWER),
            map,
            rng,
            heights,
        }
    }

    /// Writes the working heights back to the map.
    pub fn finish(self) {
        for (cell, &h) in self.map.cells.iter_mut().zip(self.heights.iter()) {
            cell.height = h / 100.0;
        }
    }

    fn water_internal(&self) -> f64 {
        self.map.water_level() * 100.0
    }

    pub fn apply(&mut self, op: &SculptOp) {
        if self.map.cells.is_empty() {
            return;
        }
        match *op {
            SculptOp::Hill {
                count,
                height,
                range_x,
                range_y,
            } => {
                let n = count.count(self.rng);
                for _ in 0..n {
                    self.one_blob(height, range_x, range_y, false);
                }
            }
            SculptOp::Pit {
                count,
                height,
                range_x,
                range_y,
            } => {
                let n = count.count(self.rng);
                for _ in 0..n {
                    self.one_blob(height, range_x, range_y, true);
                }
            }
            SculptOp::Range {
                count,
                height,
                range_x,
                range_y,
            } => {
                let n = count.count(self.rng);
                for _ in 0..n {
                    self.one_line(height, range_x, range_y, false);
                }
            }
            SculptOp::Trough {
                count,
                height,
                range_x,
                range_y,
            } => {
                let n = count.count(self.rng);
                for _ in 0..n {
                    self.one_line(height, range_x, range_y, true);
                }
            }
            SculptOp::Strait { width, vertical } => self.strait(width, vertical),
            SculptOp::Mask { power } => self.mask(power),
            SculptOp::Smooth { fraction, add } => self.smooth(fraction, add),
            SculptOp::Invert { chance, axes } => self.invert(chance, axes),
            SculptOp::Modify {
                band,
                add,
                multiply,
            } => self.modify(band, add, multiply),
        }
    }

    /// String-argument entry point for a hill pass.
    pub fn hill(&mut self, count: &str, height: &str, range_x: &str, range_y: &str) {
        let op = SculptOp::Hill {
            count: RangeExpr::parse_or_zero(count),
            height: RangeExpr::parse_or_zero(height),
            range_x: RangeExpr::parse_or_zero(range_x),
            range_y: RangeExpr::parse_or_zero(range_y),
        };
        self.apply(&op);
    }

    pub fn pit(&mut self, count: &str, height: &str, range_x: &str, range_y: &str) {
        let op = SculptOp::Pit {
            count: RangeExpr::parse_or_zero(count),
            height: RangeExpr::parse_or_zero(height),
            range_x: RangeExpr::parse_or_zero(range_x),
            range_y: RangeExpr::parse_or_zero(range_y),
        };
        self.apply(&op);
    }

    pub fn range(&mut self, count: &str, height: &str, range_x: &str, range_y: &str) {
        let op = SculptOp::Range {
            count: RangeExpr::parse_or_zero(count),
            height: RangeExpr::parse_or_zero(height),
            range_x: RangeExpr::parse_or_zero(range_x),
            range_y: RangeExpr::parse_or_zero(range_y),
        };
        self.apply(&op);
    }

    pub fn trough(&mut self, count: &str, height: &str, range_x: &str, range_y: &str) {
        let op = SculptOp::Trough {
            count: RangeExpr::parse_or_zero(count),
            height: RangeExpr::parse_or_zero(height),
            range_x: RangeExpr::parse_or_zero(range_x),
            range_y: RangeExpr::parse_or_zero(range_y),
        };
        self.apply(&op);
    }

    /// Seeds a blob and spreads its delta breadth-first, decaying by the blob
    /// power per hop. Deltas are floored so the seed stays the crest.
    fn one_blob(&mut self, height: RangeExpr, range_x: RangeExpr, range_y: RangeExpr, dig: bool) {
        let width = self.map.width;
        let domain_height = self.map.height;
        let delta = lim(height.value(self.rng));
        if delta <= 0.0 {
            return;
        }

        let water = self.water_internal();
        let mut seed = 0u32;
        for _ in 0..SEED_RETRIES {
            let x = range_x.position(self.rng, width);
            let y = range_y.position(self.rng, domain_height);
            let Some(candidate) = self.map.cell_at(x, y) else {
                return;
            };
            seed = candidate;
            if dig {
                // Pits want a land seed so the dent is visible.
                if self.heights[seed as usize] >= water {
                    break;
                }
            } else if self.heights[seed as usize] + delta <= HILL_CEILING {
                break;
            }
        }

        let mut change = vec![0.0f64; self.map.cells.len()];
        change[seed as usize] = delta;
        let mut queue = VecDeque::from([seed]);
        while let Some(current) = queue.pop_front() {
            let spread = change[current as usize];
            for &next in &self.map.cells[current as usize].neighbors {
                if change[next as usize] != 0.0 {
                    continue;
                }
                let decayed = (spread.powf(self.blob_power) * self.rng.float(0.9, 1.1)).floor();
                change[next as usize] = decayed;
                if decayed > 1.0 {
                    queue.push_back(next);
                }
            }
        }

        for (h, &delta) in self.heights.iter_mut().zip(change.iter()) {
            *h = if dig { lim(*h - delta) } else { lim(*h + delta) };
        }
    }

    /// Walks a ridge (or rift) path between two drawn points, then applies
    /// the height change in widening waves with per-wave exponential decay.
    fn one_line(&mut self, height: RangeExpr, range_x: RangeExpr, range_y: RangeExpr, dig: bool) {
        let width = self.map.width;
        let domain_height = self.map.height;
        let delta = lim(height.value(self.rng));
        if delta <= 0.0 {
            return;
        }

        let water = self.water_internal();
        let mut start = DVec2::ZERO;
        for _ in 0..SEED_RETRIES {
            start = DVec2::new(
                range_x.position(self.rng, width),
                range_y.position(self.rng, domain_height),
            );
            if !dig {
                break;
            }
            // Rifts start on land so they cut something.
            let Some(cell) = self.map.cell_at(start.x, start.y) else {
                return;
            };
            if self.heights[cell as usize] >= water {
                break;
            }
        }

        // End point a moderate distance away, so the ridge neither
        // degenerates into a blob nor spans the whole map.
        let mut end = DVec2::ZERO;
        for attempt in 0.. {
            end = DVec2::new(
                self.rng.float(width * 0.1, width * 0.9),
                self.rng.float(domain_height * 0.15, domain_height * 0.85),
            );
            let dist = (end.x - start.x).abs() + (end.y - start.y).abs();
            let in_band = dist >= width / 8.0 && dist <= width / 3.0;
            if in_band || attempt >= SEED_RETRIES {
                break;
            }
        }

        let Some(from) = self.map.cell_at(start.x, start.y) else {
            return;
        };
        let Some(to) = self.map.cell_at(end.x, end.y) else {
            return;
        };

        let mut used = vec![false; self.map.cells.len()];
        let path = self.ridge_path(from, to, &mut used);
        if path.is_empty() {
            return;
        }

        let mut h = delta;
        let mut frontier = path.clone();
        let mut waves = 0u32;
        while !frontier.is_empty() {
            waves += 1;
            for &cell in &frontier {
                let jitter = self.rng.float(0.85, 1.15);
                let idx = cell as usize;
                self.heights[idx] = if dig {
                    lim(self.heights[idx] - h * jitter)
                } else {
                    lim(self.heights[idx] + h * jitter)
                };
            }
            h = h.powf(self.line_power) - 1.0;
            if h < 2.0 {
                break;
            }
            let mut next = Vec::new();
            for &cell in &frontier {
                for &neighbor in &self.map.cells[cell as usize].neighbors {
                    if !used[neighbor as usize] {
                        used[neighbor as usize] = true;
                        next.push(neighbor);
                    }
                }
            }
            frontier = next;
        }

        if !dig {
            self.build_prominences(&path, waves);
        }
    }

    /// Greedy walk toward the target, occasionally halving a candidate's
    /// distance score so the path wanders instead of beelining.
    fn ridge_path(&mut self, from: u32, to: u32, used: &mut [bool]) -> Vec<u32> {
        let target = self.map.cells[to as usize].point;
        let mut path = vec![from];
        used[from as usize] = true;
        let mut current = from;
        while current != to {
            let mut best = None;
            let mut best_score = f64::INFINITY;
            for &neighbor in &self.map.cells[current as usize].neighbors {
                if used[neighbor as usize] {
                    continue;
                }
                let mut score = self.map.cells[neighbor as usize].point.distance_squared(target);
                if self.rng.chance(0.15) {
                    score /= 2.0;
                }
                if score < best_score {
                    best_score = score;
                    best = Some(neighbor);
                }
            }
            let Some(next) = best else {
                break;
            };
            current = next;
            path.push(current);
            used[current as usize] = true;
        }
        path
    }

    /// Pulls spurs off every sixth ridge cell by repeatedly dragging the
    /// lowest neighbor up toward the ridge height.
    fn build_prominences(&mut self, path: &[u32], waves: u32) {
        for (i, &ridge) in path.iter().enumerate() {
            if i % 6 != 0 {
                continue;
            }
            let mut current = ridge;
            for _ in 0..waves {
                let mut lowest = None;
                let mut lowest_h = f64::INFINITY;
                for &neighbor in &self.map.cells[current as usize].neighbors {
                    let h = self.heights[neighbor as usize];
                    if h < lowest_h {
                        lowest_h = h;
                        lowest = Some(neighbor);
                    }
                }
                let Some(low) = lowest else {
                    break;
                };
                self.heights[low as usize] =
                    (self.heights[current as usize] * 2.0 + self.heights[low as usize]) / 3.0;
                current = low;
            }
        }
    }

    /// Carves a channel across the map by exponent-compressing heights along
    /// a jittered path and its widening rings. Sub-unit widths only carve
    /// with probability equal to the width.
    fn strait(&mut self, width: RangeExpr, vertical: bool) {
        let cols = self.map.cols() as f64;
        let mut desired = width.value(self.rng).min(cols / 3.0);
        if desired < 1.0 {
            if !self.rng.chance(desired.max(0.0)) {
                return;
            }
            desired = 1.0;
        }

        let w = self.map.width;
        let h = self.map.height;
        let (start, end) = if vertical {
            let sx = self.rng.float(w * 0.3, w * 0.7);
            let ex = w - sx - w * 0.1 + self.rng.float(0.0, w * 0.2);
            (DVec2::new(sx, 5.0), DVec2::new(ex, h - 5.0))
        } else {
            let sy = self.rng.float(h * 0.3, h * 0.7);
            let ey = h - sy - h * 0.1 + self.rng.float(0.0, h * 0.2);
            (DVec2::new(5.0, sy), DVec2::new(w - 5.0, ey))
        };

        let Some(from) = self.map.cell_at(start.x, start.y) else {
            return;
        };
        let Some(to) = self.map.cell_at(end.x, end.y) else {
            return;
        };

        let mut used = vec![false; self.map.cells.len()];
        let path = self.ridge_path(from, to, &mut used);
        if path.is_empty() {
            return;
        }

        let step = 0.1 / desired;
        let mut frontier = path;
        let mut remaining = desired;
        while remaining > 0.0 && !frontier.is_empty() {
            let exponent = 0.9 - step * remaining;
            let mut next = Vec::new();
            for &cell in &frontier {
                let idx = cell as usize;
                self.heights[idx] = lim(self.heights[idx].powf(exponent));
                for &neighbor in &self.map.cells[idx].neighbors {
                    if !used[neighbor as usize] {
                        used[neighbor as usize] = true;
                        next.push(neighbor);
                    }
                }
            }
            frontier = next;
            remaining -= 1.0;
        }
    }

    /// Blends heights toward a bowl (or inverted bowl) centred on the map.
    fn mask(&mut self, power: f64) {
        let fraction = if power == 0.0 { 1.0 } else { power.abs() };
        let w = self.map.width;
        let h = self.map.height;
        for (i, cell) in self.map.cells.iter().enumerate() {
            let nx = 2.0 * cell.point.x / w - 1.0;
            let ny = 2.0 * cell.point.y / h - 1.0;
            let mut dist = (1.0 - nx * nx) * (1.0 - ny * ny);
            if power < 0.0 {
                dist = 1.0 - dist;
            }
            let height = self.heights[i];
            let masked = height * dist;
            self.heights[i] = lim((height * (fraction - 1.0) + masked) / fraction);
        }
    }

    /// Moves each cell toward its neighborhood mean. `fraction` controls how
    /// much of the old height survives; `add` shifts the result.
    fn smooth(&mut self, fraction: f64, add: f64) {
        let fraction = if fraction <= 0.0 { 1.0 } else { fraction };
        let snapshot = self.heights.clone();
        for (i, cell) in self.map.cells.iter().enumerate() {
            let mut sum = snapshot[i];
            let mut count = 1.0;
            for &neighbor in &cell.neighbors {
                sum += snapshot[neighbor as usize];
                count += 1.0;
            }
            let mean = sum / count;
            self.heights[i] = lim((snapshot[i] * (fraction - 1.0) + mean + add) / fraction);
        }
    }

    /// Mirrors the height field across the chosen axes, gated by `chance`.
    fn invert(&mut self, chance: f64, axes: MirrorAxes) {
        if !self.rng.chance(chance) {
            return;
        }
        let mirror_x = axes != MirrorAxes::Y;
        let mirror_y = axes != MirrorAxes::X;
        let w = self.map.width;
        let h = self.map.height;
        let snapshot = self.heights.clone();
        for i in 0..self.map.cells.len() {
            let point = self.map.cells[i].point;
            let x = if mirror_x { w - point.x } else { point.x };
            let y = if mirror_y { h - point.y } else { point.y };
            if let Some(source) = self.map.cell_at(x, y) {
                self.heights[i] = snapshot[source as usize];
            }
        }
    }

    /// Adds to and scales heights inside a band. Land-band adds floor at the
    /// water level so coastal cells never sink; multiplies pivot around it.
    fn modify(&mut self, band: HeightBand, add: f64, multiply: f64) {
        let water = self.water_internal();
        let (min, max, pivot_water) = match band {
            HeightBand::Land => (water, 100.0, true),
            HeightBand::All => (0.0, 100.0, false),
            HeightBand::Bounds { lo, hi } => (lo, hi, false),
        };
        if min > max {
            debug!("empty modify band, nothing to do");
            return;
        }
        for h in self.heights.iter_mut() {
            if *h < min || *h > max {
                continue;
            }
            let mut value = *h;
            if add != 0.0 {
                value = if pivot_water {
                    (value + add).max(water)
                } else {
                    value + add
                };
            }
            if multiply != 1.0 {
                value = if pivot_water {
                    (value - water) * multiply + water
                } else {
                    value * multiply
                };
            }
            *h = lim(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_map(cols: usize, rows: usize) -> Map {
        Map::uniform_grid("test", cols, rows, 0.5)
    }

    #[test]
    fn test_power_lookup() {
        assert!((power_for(BLOB_POWERS, 10_000, DEFAULT_BLOB_POWER) - 0.98).abs() < 1e-12);
        assert!((power_for(BLOB_POWERS, 12_345, DEFAULT_BLOB_POWER) - 0.98).abs() < 1e-12);
        assert!((power_for(BLOB_POWERS, 500, DEFAULT_BLOB_POWER) - 0.93).abs() < 1e-12);
        assert!((power_for(LINE_POWERS, 250_000, DEFAULT_LINE_POWER) - 0.91).abs() < 1e-12);
    }

    #[test]
    fn test_hill_peaks_at_requested_position() {
        let mut map = flat_map(100, 100);
        let mut rng = AleaRng::new("test");
        let mut sculptor = Sculptor::new(&mut map, &mut rng);
        sculptor.hill("1", "50", "50-50", "50-50");
        sculptor.finish();

        let seed = (50 * 100 + 50) as usize;
        let max = map
            .cells
            .iter()
            .map(|c| c.height)
            .fold(f64::NEG_INFINITY, f64::max);
        assert!((max - 0.5).abs() <= 0.1, "max height {} out of band", max);
        assert!(
            (map.cells[seed].height - max).abs() < 1e-9,
            "seed cell is not the crest: {} vs {}",
            map.cells[seed].height,
            max
        );
        // The delta decays away from the seed.
        let far = (10 * 100 + 10) as usize;
        assert!(map.cells[far].height < map.cells[seed].height);
    }

    #[test]
    fn test_hill_respects_ceiling_retries() {
        let mut map = flat_map(30, 30);
        for cell in map.cells.iter_mut() {
            cell.height = 0.85;
        }
        let mut rng = AleaRng::new("ceiling");
        let mut sculptor = Sculptor::new(&mut map, &mut rng);
        // 85 + 50 always exceeds the ceiling, so all retries burn out and
        // heights saturate at the cap instead of overflowing.
        sculptor.hill("1", "50", "10-90", "10-90");
        sculptor.finish();
        for cell in &map.cells {
            assert!(cell.height <= 1.0 + 1e-12);
        }
    }

    #[test]
    fn test_pit_digs_down() {
        let mut map = flat_map(40, 40);
        for cell in map.cells.iter_mut() {
            cell.height = 0.8;
        }
        let mut rng = AleaRng::new("pit");
        let mut sculptor = Sculptor::new(&mut map, &mut rng);
        sculptor.pit("1", "30", "40-60", "40-60");
        sculptor.finish();
        let min = map
            .cells
            .iter()
            .map(|c| c.height)
            .fold(f64::INFINITY, f64::min);
        assert!(min < 0.8 - 0.2, "pit did not dig: min {}", min);
    }

    #[test]
    fn test_range_raises_a_ridge() {
        let mut map = flat_map(60, 60);
        let mut rng = AleaRng::new("ridge");
        let mut sculptor = Sculptor::new(&mut map, &mut rng);
        sculptor.range("1", "40", "30-70", "30-70");
        sculptor.finish();
        let raised = map.cells.iter().filter(|c| c.height > 0.1).count();
        assert!(raised > 5, "ridge touched only {} cells", raised);
        let max = map
            .cells
            .iter()
            .map(|c| c.height)
            .fold(f64::NEG_INFINITY, f64::max);
        assert!(max > 0.3);
    }

    #[test]
    fn test_trough_carves() {
        let mut map = flat_map(60, 60);
        for cell in map.cells.iter_mut() {
            cell.height = 0.7;
        }
        let mut rng = AleaRng::new("trough");
        let mut sculptor = Sculptor::new(&mut map, &mut rng);
        sculptor.trough("1", "30", "30-70", "30-70");
        sculptor.finish();
        let lowered = map.cells.iter().filter(|c| c.height < 0.6).count();
        assert!(lowered > 5, "trough touched only {} cells", lowered);
    }

    #[test]
    fn test_strait_lowers_a_corridor() {
        let mut map = flat_map(60, 60);
        for cell in map.cells.iter_mut() {
            cell.height = 0.6;
        }
        let mut rng = AleaRng::new("strait");
        let mut sculptor = Sculptor::new(&mut map, &mut rng);
        sculptor.apply(&SculptOp::Strait {
            width: RangeExpr::parse("4").unwrap(),
            vertical: true,
        });
        sculptor.finish();
        let lowered = map.cells.iter().filter(|c| c.height < 0.6 - 1e-9).count();
        assert!(lowered >= 60, "strait carved only {} cells", lowered);
    }

    #[test]
    fn test_mask_pulls_edges_down() {
        let mut map = flat_map(50, 50);
        for cell in map.cells.iter_mut() {
            cell.height = 0.6;
        }
        let mut rng = AleaRng::new("mask");
        let mut sculptor = Sculptor::new(&mut map, &mut rng);
        sculptor.apply(&SculptOp::Mask { power: 1.0 });
        sculptor.finish();
        let corner = map.cells[0].height;
        let center = map.cells[(25 * 50 + 25) as usize].height;
        assert!(corner < center, "corner {} not below center {}", corner, center);
    }

    #[test]
    fn test_smooth_flattens_a_spike() {
        let mut map = flat_map(20, 20);
        let spike = (10 * 20 + 10) as usize;
        map.cells[spike].height = 1.0;
        let mut rng = AleaRng::new("smooth");
        let mut sculptor = Sculptor::new(&mut map, &mut rng);
        sculptor.apply(&SculptOp::Smooth {
            fraction: 2.0,
            add: 0.0,
        });
        sculptor.finish();
        assert!(map.cells[spike].height < 1.0);
        assert!(map.cells[spike - 1].height > 0.0);
    }

    #[test]
    fn test_invert_mirrors_heights() {
        let mut map = flat_map(20, 20);
        // Raise the left half only.
        for cell in map.cells.iter_mut() {
            if cell.point.x < 10.0 {
                cell.height = 0.9;
            }
        }
        let mut rng = AleaRng::new("invert");
        let mut sculptor = Sculptor::new(&mut map, &mut rng);
        sculptor.apply(&SculptOp::Invert {
            chance: 1.0,
            axes: MirrorAxes::X,
        });
        sculptor.finish();
        let left = map.cells[(10 * 20 + 2) as usize].height;
        let right = map.cells[(10 * 20 + 17) as usize].height;
        assert!(right > left, "mirror left {} right {}", left, right);
    }

    #[test]
    fn test_invert_gated_by_chance() {
        let mut map = flat_map(20, 20);
        for cell in map.cells.iter_mut() {
            if cell.point.x < 10.0 {
                cell.height = 0.9;
            }
        }
        let before: Vec<f64> = map.cells.iter().map(|c| c.height).collect();
        let mut rng = AleaRng::new("gate");
        let mut sculptor = Sculptor::new(&mut map, &mut rng);
        sculptor.apply(&SculptOp::Invert {
            chance: 0.0,
            axes: MirrorAxes::Both,
        });
        sculptor.finish();
        let after: Vec<f64> = map.cells.iter().map(|c| c.height).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_modify_land_add_floors_at_water() {
        let mut map = flat_map(10, 10);
        for cell in map.cells.iter_mut() {
            cell.height = 0.55;
        }
        let mut rng = AleaRng::new("modify");
        let mut sculptor = Sculptor::new(&mut map, &mut rng);
        sculptor.apply(&SculptOp::Modify {
            band: HeightBand::Land,
            add: -20.0,
            multiply: 1.0,
        });
        sculptor.finish();
        // 55 - 20 would sink below the water line at 50; the add floors there.
        for cell in &map.cells {
            assert!((cell.height - 0.5).abs() < 1e-9);
        }
    }

    #[test]
    fn test_modify_multiply_pivots_on_water_level() {
        let mut map = flat_map(10, 10);
        for cell in map.cells.iter_mut() {
            cell.height = 0.7;
        }
        let mut rng = AleaRng::new("pivot");
        let mut sculptor = Sculptor::new(&mut map, &mut rng);
        sculptor.apply(&SculptOp::Modify {
            band: HeightBand::Land,
            add: 0.0,
            multiply: 0.5,
        });
        sculptor.finish();
        // (70 - 50) * 0.5 + 50 = 60.
        for cell in &map.cells {
            assert!((cell.height - 0.6).abs() < 1e-9);
        }
    }

    #[test]
    fn test_modify_bounds_band() {
        let mut map = flat_map(10, 10);
        for (i, cell) in map.cells.iter_mut().enumerate() {
            cell.height = if i % 2 == 0 { 0.3 } else { 0.8 };
        }
        let mut rng = AleaRng::new("band");
        let mut sculptor = Sculptor::new(&mut map, &mut rng);
        sculptor.apply(&SculptOp::Modify {
            band: HeightBand::Bounds { lo: 70.0, hi: 100.0 },
            add: 10.0,
            multiply: 1.0,
        });
        sculptor.finish();
        for (i, cell) in map.cells.iter().enumerate() {
            if i % 2 == 0 {
                assert!((cell.height - 0.3).abs() < 1e-9);
            } else {
                assert!((cell.height - 0.9).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_empty_band_is_a_no_op() {
        let mut map = flat_map(10, 10);
        for cell in map.cells.iter_mut() {
            cell.height = 0.4;
        }
        let mut rng = AleaRng::new("empty");
        let mut sculptor = Sculptor::new(&mut map, &mut rng);
        sculptor.apply(&SculptOp::Modify {
            band: HeightBand::Bounds { lo: 50.0, hi: 10.0 },
            add: 99.0,
            multiply: 3.0,
        });
        sculptor.finish();
        for cell in &map.cells {
            assert!((cell.height - 0.4).abs() < 1e-9);
        }
    }

    #[test]
    fn test_sculpting_is_deterministic() {
        let run = || {
            let mut map = flat_map(50, 50);
            let mut rng = AleaRng::new("repeat");
            let mut sculptor = Sculptor::new(&mut map, &mut rng);
            sculptor.hill("2", "40-50", "20-80", "20-80");
            sculptor.range("1", "30", "30-70", "30-70");
            sculptor.apply(&SculptOp::Smooth {
                fraction: 3.0,
                add: 0.0,
            });
            sculptor.finish();
            map.cells.iter().map(|c| c.height).collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }
}
