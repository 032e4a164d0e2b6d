//! Coastal feature detection.
//!
//! Flood fills the cell graph into connected land and water components,
//! classifies them (ocean, lake, island) with size-based groups, records
//! lake shorelines and surface levels, and marks every land cell's nearest
//! water neighbor. Finishes by expanding the signed coast distance field.

use std::collections::VecDeque;

use tracing::debug;

use crate::map::{Feature, FeatureGroup, FeatureKind, Map};

mod distance;

/// Detects all connected features and annotates coastal cells. Reruns from
/// scratch, so it is safe to call again after heights change.
pub fn detect_features(map: &mut Map) {
    map.features.clear();
    for cell in map.cells.iter_mut() {
        cell.feature = 0;
        cell.coast_dist = 0;
        cell.haven = None;
        cell.harbor = 0;
    }
    if map.cells.is_empty() {
        return;
    }

    flood_components(map);
    assign_groups(map);
    collect_lake_shorelines(map);
    mark_coastal_cells(map);
    distance::expand(map);

    debug!(
        features = map.features.len(),
        land_cells = map.land_cell_count(),
        "feature markup complete"
    );
}

/// Breadth-first flood fill over same-class (land or water) neighbors.
fn flood_components(map: &mut Map) {
    let n = map.cells.len();
    let mut assigned = vec![0u16; n];
    let mut next_id = 1u16;

    for start in 0..n as u32 {
        if assigned[start as usize] != 0 {
            continue;
        }
        let id = next_id;
        next_id += 1;
        let land = map.is_land(start);
        let mut border = map.cells[start as usize].border;
        let mut members = vec![start];
        assigned[start as usize] = id;

        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            for &neighbor in &map.cells[current as usize].neighbors {
                if assigned[neighbor as usize] != 0 || map.is_land(neighbor) != land {
                    continue;
                }
                assigned[neighbor as usize] = id;
                if map.cells[neighbor as usize].border {
                    border = true;
                }
                members.push(neighbor);
                queue.push_back(neighbor);
            }
        }

        let kind = if land {
            FeatureKind::Island
        } else if border {
            FeatureKind::Ocean
        } else {
            FeatureKind::Lake
        };
        let group = match kind {
            FeatureKind::Island => FeatureGroup::Isle,
            FeatureKind::Ocean => FeatureGroup::Gulf,
            FeatureKind::Lake => FeatureGroup::Freshwater,
        };
        let mut feature = Feature::new(id, kind, group, border);
        feature.cells = members;
        map.features.push(feature);
    }

    for (cell, &id) in map.cells.iter_mut().zip(assigned.iter()) {
        cell.feature = id;
    }
}

/// Grades features by their share of the whole grid.
fn assign_groups(map: &mut Map) {
    let total = map.cells.len() as f64;
    for feature in map.features.iter_mut() {
        let share = feature.cells.len() as f64 / total;
        feature.group = match feature.kind {
            FeatureKind::Island => {
                if share > 0.10 {
                    FeatureGroup::Continent
                } else if share > 0.001 {
                    FeatureGroup::Island
                } else {
                    FeatureGroup::Isle
                }
            }
            FeatureKind::Ocean => {
                if share > 0.04 {
                    FeatureGroup::Ocean
                } else if share > 0.001 {
                    FeatureGroup::Sea
                } else {
                    FeatureGroup::Gulf
                }
            }
            FeatureKind::Lake => FeatureGroup::Freshwater,
        };
    }
}

/// Records each lake's adjacent land ring and its initial surface level,
/// the height of its highest member cell.
fn collect_lake_shorelines(map: &mut Map) {
    let mut updates = Vec::new();
    for feature in map.features.iter() {
        if !feature.is_lake() {
            continue;
        }
        let mut shoreline = Vec::new();
        let mut level = 0.0f64;
        for &member in &feature.cells {
            level = level.max(map.cells[member as usize].height);
            for &neighbor in &map.cells[member as usize].neighbors {
                if map.is_land(neighbor) {
                    shoreline.push(neighbor);
                }
            }
        }
        shoreline.sort_unstable();
        shoreline.dedup();
        updates.push((feature.id, shoreline, level));
    }
    for (id, shoreline, level) in updates {
        if let Some(feature) = map.feature_mut(id) {
            feature.shoreline = shoreline;
            feature.lake_level = level;
        }
    }
}

/// First distance layer plus harbor data: land cells touching water get
/// distance 1, their nearest water neighbor, and a water-neighbor count;
/// water cells touching land get distance -1.
fn mark_coastal_cells(map: &mut Map) {
    let mut updates = Vec::new();
    for (i, cell) in map.cells.iter().enumerate() {
        let id = i as u32;
        if map.is_land(id) {
            let mut nearest = None;
            let mut nearest_d = f64::INFINITY;
            let mut water_neighbors = 0u32;
            for &neighbor in &cell.neighbors {
                if map.is_land(neighbor) {
                    continue;
                }
                water_neighbors += 1;
                let d = cell
                    .point
                    .distance_squared(map.cells[neighbor as usize].point);
                if d < nearest_d {
                    nearest_d = d;
                    nearest = Some(neighbor);
                }
            }
            if water_neighbors > 0 {
                updates.push((id, 1i8, nearest, water_neighbors.min(255) as u8));
            }
        } else if cell.neighbors.iter().any(|&n| map.is_land(n)) {
            updates.push((id, -1i8, None, 0));
        }
    }
    for (id, dist, haven, harbor) in updates {
        let cell = &mut map.cells[id as usize];
        cell.coast_dist = dist;
        cell.haven = haven;
        cell.harbor = harbor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 10x10 grid, a 4x4 land block spanning columns and rows 3..=6.
    fn island_map() -> Map {
        let mut map = Map::uniform_grid("island", 10, 10, 0.5);
        for cell in map.cells.iter_mut() {
            let col = cell.id % 10;
            let row = cell.id / 10;
            if (3..=6).contains(&col) && (3..=6).contains(&row) {
                cell.height = 1.0;
            }
        }
        detect_features(&mut map);
        map
    }

    /// 10x10 land grid with a submerged 2x2 block at columns/rows 4..=5.
    fn lake_map() -> Map {
        let mut map = Map::uniform_grid("lake", 10, 10, 0.5);
        for cell in map.cells.iter_mut() {
            let col = cell.id % 10;
            let row = cell.id / 10;
            cell.height = if (4..=5).contains(&col) && (4..=5).contains(&row) {
                0.1
            } else {
                1.0
            };
        }
        detect_features(&mut map);
        map
    }

    #[test]
    fn test_island_surrounded_by_ocean() {
        let map = island_map();
        assert_eq!(map.features.len(), 2);
        let ocean = &map.features[0];
        let island = &map.features[1];
        assert_eq!(ocean.kind, FeatureKind::Ocean);
        assert!(ocean.border);
        assert_eq!(ocean.cells.len(), 84);
        assert_eq!(ocean.group, FeatureGroup::Ocean);
        assert_eq!(island.kind, FeatureKind::Island);
        assert!(!island.border);
        assert_eq!(island.cells.len(), 16);
        // 16% of the grid grades as a continent.
        assert_eq!(island.group, FeatureGroup::Continent);
    }

    #[test]
    fn test_interior_lake() {
        let map = lake_map();
        assert_eq!(map.features.len(), 2);
        let land = &map.features[0];
        let lake = &map.features[1];
        assert_eq!(land.kind, FeatureKind::Island);
        assert_eq!(lake.kind, FeatureKind::Lake);
        assert_eq!(lake.group, FeatureGroup::Freshwater);
        assert_eq!(lake.cells.len(), 4);
        assert!(!lake.border);
        assert_eq!(lake.shoreline.len(), 8);
        assert!((lake.lake_level - 0.1).abs() < 1e-12);
        for &shore in &lake.shoreline {
            assert!(map.is_land(shore));
        }
    }

    #[test]
    fn test_every_cell_belongs_to_exactly_one_feature() {
        let map = island_map();
        let mut seen = vec![false; map.cells.len()];
        for feature in &map.features {
            for &member in &feature.cells {
                assert!(!seen[member as usize], "cell {} claimed twice", member);
                seen[member as usize] = true;
                assert_eq!(map.cells[member as usize].feature, feature.id);
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_haven_points_at_nearest_water() {
        let map = island_map();
        // Corner of the land block at column 3, row 3.
        let corner = &map.cells[33];
        assert_eq!(corner.coast_dist, 1);
        assert_eq!(corner.harbor, 2);
        assert_eq!(corner.haven, Some(23));
        // Interior land touches no water.
        let interior = &map.cells[44];
        assert_eq!(interior.harbor, 0);
        assert_eq!(interior.haven, None);
    }

    #[test]
    fn test_distance_field_layers() {
        let map = island_map();
        // Interior land block cells sit one ring in.
        assert_eq!(map.cells[44].coast_dist, 2);
        assert_eq!(map.cells[55].coast_dist, 2);
        // Coastal water is -1, and the far corner is six hops from it.
        assert_eq!(map.cells[23].coast_dist, -1);
        assert_eq!(map.cells[0].coast_dist, -6);
    }

    #[test]
    fn test_distance_field_water_floor() {
        // A long water channel so depth exceeds the -10 floor.
        let mut map = Map::uniform_grid("channel", 40, 1, 0.5);
        map.cells[0].height = 1.0;
        detect_features(&mut map);
        assert_eq!(map.cells[1].coast_dist, -1);
        assert_eq!(map.cells[10].coast_dist, -10);
        assert_eq!(map.cells[39].coast_dist, -10);
    }

    #[test]
    fn test_all_land_map_has_single_feature() {
        let mut map = Map::uniform_grid("land", 5, 5, 0.5);
        for cell in map.cells.iter_mut() {
            cell.height = 0.9;
        }
        detect_features(&mut map);
        assert_eq!(map.features.len(), 1);
        assert_eq!(map.features[0].kind, FeatureKind::Island);
        assert!(map.cells.iter().all(|c| c.coast_dist == 0));
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let mut map = lake_map();
        let features_before = map.features.len();
        let dist_before: Vec<i8> = map.cells.iter().map(|c| c.coast_dist).collect();
        detect_features(&mut map);
        assert_eq!(map.features.len(), features_before);
        let dist_after: Vec<i8> = map.cells.iter().map(|c| c.coast_dist).collect();
        assert_eq!(dist_before, dist_after);
    }
}
