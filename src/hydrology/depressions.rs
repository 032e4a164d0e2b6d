//! Depression filling.
//!
//! Works on the internal 0-100 height scale. Land heights first get a tiny
//! coast-distance nudge so flat plains drain toward the sea instead of
//! tying. Then closed pits are raised just above their lowest neighbor and
//! landlocked lake surfaces just above their lowest shore, pass after pass,
//! until everything drains or the pass budget runs out.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::map::Map;

use super::HydrologyConfig;

/// Consecutive passes without a new best outstanding count before the
/// resolver declares a stall.
const STALL_LIMIT: u32 = 50;

/// Outcome of the depression pass, kept on the map for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepressionReport {
    /// Resolution passes actually run.
    pub passes: u32,
    /// Depressed cells and lakes remaining when resolution stopped.
    pub unresolved: u32,
}

struct LakeState {
    id: u16,
    level: f64,
    shoreline: Vec<u32>,
    closed: bool,
}

pub(crate) fn resolve(map: &mut Map, config: &HydrologyConfig) -> DepressionReport {
    if map.cells.is_empty() {
        return DepressionReport::default();
    }

    let mut h = nudged_heights(map);

    // Map water cells to their lake, if any.
    let mut lake_of: Vec<Option<usize>> = vec![None; map.cells.len()];
    let mut lakes: Vec<LakeState> = Vec::new();
    for feature in map.features.iter().filter(|f| f.is_lake()) {
        let index = lakes.len();
        for &member in &feature.cells {
            lake_of[member as usize] = Some(index);
        }
        lakes.push(LakeState {
            id: feature.id,
            level: feature.lake_level * 100.0,
            shoreline: feature.shoreline.clone(),
            closed: false,
        });
    }

    // A lake whose lowest shore stands far above its surface sits in a deep
    // basin and is left unresolved by design.
    for lake in lakes.iter_mut() {
        let min_shore = min_shore_height(&h, &lake.shoreline);
        lake.closed = min_shore >= lake.level + config.lake_elevation_limit;
    }

    // Candidate cells, lowest first. Border cells drain off the map edge
    // and never count as depressed.
    let mut land: Vec<u32> = map
        .cells
        .iter()
        .filter(|c| !c.border && c.height >= map.water_level())
        .map(|c| c.id)
        .collect();
    land.sort_unstable_by(|&a, &b| {
        h[a as usize]
            .partial_cmp(&h[b as usize])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });

    let effective = |h: &[f64], lakes: &[LakeState], cell: u32| -> f64 {
        match lake_of[cell as usize] {
            Some(lake) => lakes[lake].level,
            None => h[cell as usize],
        }
    };

    let mut passes = 0u32;
    let mut best = u32::MAX;
    let mut stalled = 0u32;
    while passes < config.max_depression_passes {
        passes += 1;
        let mut outstanding = 0u32;

        for lake in lakes.iter_mut() {
            if lake.closed {
                continue;
            }
            let min_shore = min_shore_height(&h, &lake.shoreline);
            if min_shore >= 100.0 {
                continue;
            }
            if lake.level <= min_shore {
                lake.level = min_shore + 0.2;
                outstanding += 1;
            }
        }

        for &i in &land {
            let mut min_neighbor = f64::INFINITY;
            for &neighbor in &map.cells[i as usize].neighbors {
                min_neighbor = min_neighbor.min(effective(&h, &lakes, neighbor));
            }
            if min_neighbor >= 100.0 {
                continue;
            }
            if h[i as usize] <= min_neighbor {
                h[i as usize] = min_neighbor + 0.1;
                outstanding += 1;
            }
        }

        if outstanding == 0 {
            break;
        }
        if outstanding < best {
            best = outstanding;
            stalled = 0;
        } else {
            stalled += 1;
            if stalled >= STALL_LIMIT {
                warn!(
                    passes,
                    outstanding, "depression resolution stalled, stopping early"
                );
                break;
            }
        }
    }

    // Final census of cells that still cannot drain.
    let mut unresolved = 0u32;
    for &i in &land {
        let mut min_neighbor = f64::INFINITY;
        for &neighbor in &map.cells[i as usize].neighbors {
            min_neighbor = min_neighbor.min(effective(&h, &lakes, neighbor));
        }
        if min_neighbor < 100.0 && h[i as usize] <= min_neighbor {
            unresolved += 1;
        }
    }
    for lake in &lakes {
        if lake.closed {
            continue;
        }
        let min_shore = min_shore_height(&h, &lake.shoreline);
        if min_shore < 100.0 && lake.level <= min_shore {
            unresolved += 1;
        }
    }

    write_back(map, &h, &lakes);
    debug!(passes, unresolved, "depressions resolved");
    DepressionReport { passes, unresolved }
}

/// Land heights with a small coastal-gradient perturbation: cells further
/// inland rise slightly so flat regions drain outward deterministically.
fn nudged_heights(map: &Map) -> Vec<f64> {
    map.cells
        .iter()
        .map(|cell| {
            let base = cell.height * 100.0;
            if cell.height < map.water_level() || cell.coast_dist < 1 {
                return base;
            }
            let mut sum = 0.0;
            for &neighbor in &cell.neighbors {
                sum += f64::from(map.cells[neighbor as usize].coast_dist);
            }
            let mean = if cell.neighbors.is_empty() {
                0.0
            } else {
                sum / cell.neighbors.len() as f64
            };
            base + f64::from(cell.coast_dist) / 100.0 + mean / 10_000.0
        })
        .collect()
}

fn min_shore_height(h: &[f64], shoreline: &[u32]) -> f64 {
    shoreline
        .iter()
        .map(|&s| h[s as usize])
        .fold(f64::INFINITY, f64::min)
}

/// Publishes resolved heights, lake levels, closed flags, and each open
/// lake's spill cell.
fn write_back(map: &mut Map, h: &[f64], lakes: &[LakeState]) {
    for (cell, &height) in map.cells.iter_mut().zip(h.iter()) {
        cell.height = (height / 100.0).clamp(0.0, 1.0);
    }
    for lake in lakes {
        let out_cell = if lake.closed {
            None
        } else {
            lake.shoreline
                .iter()
                .copied()
                .min_by(|&a, &b| {
                    h[a as usize]
                        .partial_cmp(&h[b as usize])
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then(a.cmp(&b))
                })
        };
        if let Some(feature) = map.feature_mut(lake.id) {
            feature.lake_level = (lake.level / 100.0).clamp(0.0, 1.0);
            feature.closed = lake.closed;
            feature.out_cell = out_cell;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coastline::detect_features;

    /// 7x7 map, ocean rim, 5x5 land block with a pit in the middle.
    fn pit_map() -> Map {
        let mut map = Map::uniform_grid("pit", 7, 7, 0.5);
        for cell in map.cells.iter_mut() {
            let col = cell.id % 7;
            let row = cell.id / 7;
            let edge = col == 0 || col == 6 || row == 0 || row == 6;
            cell.height = if edge {
                0.2
            } else if col == 3 && row == 3 {
                0.6
            } else {
                0.8
            };
        }
        detect_features(&mut map);
        map
    }

    #[test]
    fn test_pit_is_raised_until_it_drains() {
        let mut map = pit_map();
        let config = HydrologyConfig::default();
        let report = resolve(&mut map, &config);
        assert_eq!(report.unresolved, 0);
        assert!(report.passes >= 1);
        // The pit now stands above at least one neighbor.
        let pit = 3 * 7 + 3;
        let min_neighbor = map.cells[pit]
            .neighbors
            .iter()
            .map(|&n| map.cells[n as usize].height)
            .fold(f64::INFINITY, f64::min);
        assert!(
            map.cells[pit].height > min_neighbor,
            "pit {} still at or below min neighbor {}",
            map.cells[pit].height,
            min_neighbor
        );
    }

    #[test]
    fn test_monotone_terrain_converges_immediately() {
        let mut map = Map::uniform_grid("slope", 6, 1, 0.5);
        for (i, cell) in map.cells.iter_mut().enumerate() {
            cell.height = 1.0 - i as f64 * 0.15;
            // Keep the water end flagged as border so it reads as ocean,
            // but let the land cells count as resolution candidates.
            if cell.height >= 0.5 {
                cell.border = false;
            }
        }
        detect_features(&mut map);
        let report = resolve(&mut map, &HydrologyConfig::default());
        assert_eq!(report.passes, 1);
        assert_eq!(report.unresolved, 0);
        // Heights moved only by the coastal nudge.
        assert!((map.cells[0].height - 1.0).abs() < 0.05);
    }

    /// Lake at 0.45 with a low shore cell that itself drains to the sea
    /// through a channel. The surface must rise just above that shore.
    #[test]
    fn test_open_lake_rises_to_its_spill_point() {
        let mut map = Map::uniform_grid("open-lake", 7, 7, 0.5);
        for cell in map.cells.iter_mut() {
            let col = cell.id % 7;
            let row = cell.id / 7;
            let edge = col == 0 || col == 6 || row == 0 || row == 6;
            cell.height = if edge {
                0.2
            } else if col == 3 && row == 3 {
                0.45
            } else if col == 2 && row == 3 {
                0.55
            } else if col == 1 && row == 3 {
                0.52
            } else {
                0.8
            };
        }
        detect_features(&mut map);
        let lake_id = map.cells[3 * 7 + 3].feature;
        assert!(map.feature(lake_id).unwrap().is_lake());

        resolve(&mut map, &HydrologyConfig::default());
        let lake = map.feature(lake_id).unwrap();
        assert!(!lake.closed);
        // One raise: spill shore at ~0.55 plus 0.002 headroom.
        assert!(lake.lake_level > 0.55);
        assert!(lake.lake_level < 0.56);
        assert_eq!(lake.out_cell, Some(3 * 7 + 2));
    }

    /// Crater lake far below its rim stays untouched and is flagged closed.
    #[test]
    fn test_deep_crater_lake_is_closed() {
        let mut map = Map::uniform_grid("crater", 7, 7, 0.5);
        for cell in map.cells.iter_mut() {
            let col = cell.id % 7;
            let row = cell.id / 7;
            let edge = col == 0 || col == 6 || row == 0 || row == 6;
            cell.height = if edge {
                0.2
            } else if col == 3 && row == 3 {
                0.1
            } else {
                0.9
            };
        }
        detect_features(&mut map);
        let lake_id = map.cells[3 * 7 + 3].feature;

        resolve(&mut map, &HydrologyConfig::default());
        let lake = map.feature(lake_id).unwrap();
        assert!(lake.closed);
        assert!((lake.lake_level - 0.1).abs() < 1e-9);
        assert_eq!(lake.out_cell, None);
    }

    #[test]
    fn test_report_is_stored_by_driver() {
        let mut map = pit_map();
        let report = super::super::resolve_depressions(&mut map, &HydrologyConfig::default());
        assert_eq!(map.depressions, Some(report));
    }
}
