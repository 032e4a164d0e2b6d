//! Signed coast distance expansion.

use crate::map::Map;

/// Land distances saturate here so the field fits a signed byte.
const MAX_LAND: i8 = 127;
/// Water depth ranks saturate at this floor.
const MIN_WATER: i8 = -10;

/// Grows the +-1 coastal layers outward one graph hop per pass. Each pass
/// claims only still-unmarked cells of the matching class, so layer `k`
/// holds exactly the cells `k` hops from the coast, clamped at the caps.
pub(crate) fn expand(map: &mut Map) {
    expand_side(map, true);
    expand_side(map, false);
}

fn expand_side(map: &mut Map, land: bool) {
    let start: i8 = if land { 1 } else { -1 };
    let mut frontier: Vec<u32> = map
        .cells
        .iter()
        .filter(|c| c.coast_dist == start)
        .map(|c| c.id)
        .collect();
    let mut level = start;

    while !frontier.is_empty() {
        level = if land {
            level.saturating_add(1).min(MAX_LAND)
        } else {
            level.saturating_sub(1).max(MIN_WATER)
        };

        let mut next = Vec::new();
        for &cell in &frontier {
            for &neighbor in map.neighbors_of(cell) {
                if map.cells[neighbor as usize].coast_dist != 0 {
                    continue;
                }
                if map.is_land(neighbor) != land {
                    continue;
                }
                next.push(neighbor);
            }
        }
        next.sort_unstable();
        next.dedup();
        for &id in &next {
            map.cells[id as usize].coast_dist = level;
        }
        frontier = next;
    }
}
