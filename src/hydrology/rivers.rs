//! Flux accumulation and river formation.
//!
//! Land cells are visited from the highest down. Each collects rainfall,
//! scaled by a mesh-density modifier so absolute discharge does not depend
//! on cell count, and pushes its water to the lowest reachable neighbor.
//! Streams that cross the formation threshold get river ids, merge into
//! parent/tributary trees at confluences, and pour into lakes and oceans.
//! Open lakes re-inject their surplus at the spill cell.

use tracing::{debug, warn};

use crate::climate::altitude_meters;
use crate::map::{FeatureGroup, Map, OFF_MAP, River};

use super::{HydrologyConfig, flux_width, round2};

/// Latent heat style evaporation estimate, scaled per lake cell.
const EVAPORATION_NUMERATOR: f64 = 700.0;

/// Per-lake drainage bookkeeping, alive only while rivers form.
struct LakeDrain {
    /// Index into `map.features`.
    feature: usize,
    flux: f64,
    evaporation: f64,
    inlets: Vec<u16>,
    /// Strongest river entering the lake and its flux at entry.
    strongest: Option<u16>,
    entering: f64,
    outlet: u16,
    out_cell: Option<u32>,
}

/// Mutable per-cell drainage state plus the river registry.
struct Drainage {
    fl: Vec<f64>,
    conf: Vec<f64>,
    river_of: Vec<u16>,
    /// Member cells per river id. Index 0 is unused.
    cells_of: Vec<Vec<u32>>,
    parents: Vec<u16>,
}

impl Drainage {
    fn new(cells: usize) -> Self {
        Self {
            fl: vec![0.0; cells],
            conf: vec![0.0; cells],
            river_of: vec![0; cells],
            cells_of: vec![Vec::new()],
            parents: vec![0],
        }
    }

    fn new_river(&mut self) -> u16 {
        let id = self.cells_of.len() as u16;
        self.cells_of.push(Vec::new());
        self.parents.push(0);
        id
    }

    fn add_cell(&mut self, river: u16, cell: u32) {
        self.cells_of[river as usize].push(cell);
    }

    /// Pushes `from_flux` into cell `to` on behalf of `river`, resolving
    /// river ownership at confluences and lake inflow bookkeeping.
    fn flow_down(
        &mut self,
        map: &Map,
        lakes: &mut [LakeDrain],
        lake_at: &[Option<usize>],
        to: u32,
        from_flux: f64,
        river: u16,
    ) {
        let tu = to as usize;
        let to_flux = self.fl[tu] - self.conf[tu];
        let to_river = self.river_of[tu];
        let land = map.cells[tu].height >= map.water_level();

        if to_river != 0 {
            if from_flux > to_flux {
                // The arriving stream is stronger and absorbs the resident
                // one as a tributary.
                self.conf[tu] += self.fl[tu];
                if land {
                    self.parents[to_river as usize] = river;
                }
                self.river_of[tu] = river;
            } else {
                self.conf[tu] += from_flux;
                if land {
                    self.parents[river as usize] = to_river;
                }
            }
        } else {
            self.river_of[tu] = river;
        }

        if land {
            self.fl[tu] += from_flux;
        } else if let Some(k) = lake_at[tu] {
            let lake = &mut lakes[k];
            if lake.strongest.is_none() || from_flux > lake.entering {
                lake.strongest = Some(river);
                lake.entering = from_flux;
            }
            lake.flux += from_flux;
            lake.inlets.push(river);
        }

        self.add_cell(river, to);
    }
}

pub(crate) fn generate(map: &mut Map, config: &HydrologyConfig) {
    let cells = map.cells.len();
    map.rivers.clear();
    for cell in map.cells.iter_mut() {
        cell.flux = 0;
        cell.confluence = 0;
        cell.river = 0;
    }
    if cells == 0 {
        return;
    }

    let (mut lakes, lake_at) = prepare_lakes(map);
    let mut drainage = Drainage::new(cells);
    drain(map, config, &mut drainage, &mut lakes, &lake_at);
    define_rivers(map, &mut drainage);
    confluence_flux(map, &mut drainage);
    write_back(map, &drainage, &lakes);
    debug!(
        rivers = map.rivers.len(),
        lakes = lakes.len(),
        "drainage complete"
    );
}

/// Seeds every lake with direct shoreline rainfall, an evaporation budget
/// from its temperature and altitude, and its spill cell.
fn prepare_lakes(map: &Map) -> (Vec<LakeDrain>, Vec<Option<usize>>) {
    let water = map.water_level();
    let mut lakes = Vec::new();
    let mut lake_at = vec![None; map.cells.len()];

    for (fi, feature) in map.features.iter().enumerate() {
        if !feature.is_lake() {
            continue;
        }
        let index = lakes.len();
        for &member in &feature.cells {
            lake_at[member as usize] = Some(index);
        }

        let flux: f64 = feature
            .shoreline
            .iter()
            .map(|&s| f64::from(map.cells[s as usize].precipitation))
            .sum();

        // Small lakes take the first member's temperature, larger ones the
        // shoreline mean rounded to a tenth of a degree.
        let temp = if feature.cells.len() < 6 || feature.shoreline.is_empty() {
            f64::from(map.cells[feature.cells[0] as usize].temperature)
        } else {
            let sum: f64 = feature
                .shoreline
                .iter()
                .map(|&s| f64::from(map.cells[s as usize].temperature))
                .sum();
            (sum / feature.shoreline.len() as f64 * 10.0).round() / 10.0
        };
        let altitude = altitude_meters(feature.lake_level, water);
        let evaporation = ((EVAPORATION_NUMERATOR * (temp + 0.006 * altitude)) / 50.0 + 75.0)
            / (80.0 - temp)
            * feature.cells.len() as f64;

        // Closed lakes sit in deep basins and never spill. Open ones spill
        // at the lowest shoreline cell.
        let out_cell = if feature.closed {
            None
        } else {
            feature.shoreline.iter().copied().min_by(|&a, &b| {
                map.cells[a as usize]
                    .height
                    .partial_cmp(&map.cells[b as usize].height)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.cmp(&b))
            })
        };

        lakes.push(LakeDrain {
            feature: fi,
            flux,
            evaporation: evaporation.round(),
            inlets: Vec::new(),
            strongest: None,
            entering: 0.0,
            outlet: 0,
            out_cell,
        });
    }
    (lakes, lake_at)
}

/// The descending drainage pass.
fn drain(
    map: &Map,
    config: &HydrologyConfig,
    drainage: &mut Drainage,
    lakes: &mut [LakeDrain],
    lake_at: &[Option<usize>],
) {
    let water = map.water_level();
    let modifier = (map.cells.len() as f64 / 10_000.0).powf(0.25);

    let mut land: Vec<u32> = map
        .cells
        .iter()
        .filter(|c| c.height >= water)
        .map(|c| c.id)
        .collect();
    land.sort_unstable_by(|&a, &b| {
        map.cells[b as usize]
            .height
            .partial_cmp(&map.cells[a as usize].height)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });

    for &i in &land {
        let iu = i as usize;
        drainage.fl[iu] += f64::from(map.cells[iu].precipitation) / modifier;

        // Lakes spilling at this cell, provided inflow beats evaporation.
        let draining: Vec<usize> = lakes
            .iter()
            .enumerate()
            .filter(|(_, l)| l.out_cell == Some(i) && l.flux > l.evaporation)
            .map(|(k, _)| k)
            .collect();
        let is_out_cell = lakes.iter().any(|l| l.out_cell == Some(i));

        let mut first_outlet = 0u16;
        for &k in &draining {
            let lake_cell = map.cells[iu]
                .neighbors
                .iter()
                .copied()
                .find(|&c| lake_at[c as usize] == Some(k));
            let Some(lake_cell) = lake_cell else { continue };
            let lc = lake_cell as usize;
            drainage.fl[lc] += (lakes[k].flux - lakes[k].evaporation).max(0.0);

            // Let a chain of lakes keep one river identity where possible.
            if lakes[k].strongest != Some(drainage.river_of[lc]) {
                let reuse = lakes[k].strongest.filter(|&s| {
                    map.cells[lc]
                        .neighbors
                        .iter()
                        .any(|&c| drainage.river_of[c as usize] == s)
                });
                let id = match reuse {
                    Some(s) => s,
                    None => drainage.new_river(),
                };
                drainage.river_of[lc] = id;
                drainage.add_cell(id, lake_cell);
            }
            lakes[k].outlet = drainage.river_of[lc];
            if first_outlet == 0 {
                first_outlet = lakes[k].outlet;
            }
            let outlet_flux = drainage.fl[lc];
            let outlet = lakes[k].outlet;
            drainage.flow_down(map, lakes, lake_at, i, outlet_flux, outlet);
        }

        // Everything that fed the drained lakes now belongs to the outlet
        // river's basin.
        if first_outlet != 0 {
            for &k in &draining {
                for &inlet in &lakes[k].inlets {
                    drainage.parents[inlet as usize] = first_outlet;
                }
            }
        }

        if map.cells[iu].border && drainage.river_of[iu] != 0 {
            drainage.add_cell(drainage.river_of[iu], OFF_MAP);
            continue;
        }

        let lowest = |a: u32, b: u32| {
            map.cells[a as usize]
                .height
                .partial_cmp(&map.cells[b as usize].height)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(&b))
        };
        let downhill = if is_out_cell {
            // Never flow back into a lake this cell just drained.
            map.cells[iu]
                .neighbors
                .iter()
                .copied()
                .filter(|&c| !draining.iter().any(|&k| lake_at[c as usize] == Some(k)))
                .min_by(|&a, &b| lowest(a, b))
        } else if let Some(haven) = map.cells[iu].haven {
            Some(haven)
        } else {
            map.cells[iu]
                .neighbors
                .iter()
                .copied()
                .min_by(|&a, &b| lowest(a, b))
        };
        let Some(downhill) = downhill else { continue };
        if map.cells[iu].height <= map.cells[downhill as usize].height {
            continue;
        }

        if drainage.fl[iu] < config.min_river_flux {
            // Too little water to carve a channel, hand it downhill.
            if map.cells[downhill as usize].height >= water {
                drainage.fl[downhill as usize] += drainage.fl[iu];
            }
            continue;
        }

        if drainage.river_of[iu] == 0 {
            let id = drainage.new_river();
            drainage.river_of[iu] = id;
            drainage.add_cell(id, i);
        }
        let flux = drainage.fl[iu];
        let river = drainage.river_of[iu];
        drainage.flow_down(map, lakes, lake_at, downhill, flux, river);
    }
}

/// Builds the final river records, dropping streams shorter than three
/// cells, and re-claims cells so each belongs to exactly one river.
fn define_rivers(map: &mut Map, drainage: &mut Drainage) {
    let water = map.water_level();
    let modifier = (map.cells.len() as f64 / 10_000.0).powf(0.25);
    let default_width_factor = round2(1.0 / modifier);
    let main_stem_width_factor = default_width_factor * 1.2;

    drainage.river_of.iter_mut().for_each(|r| *r = 0);
    drainage.conf.iter_mut().for_each(|c| *c = 0.0);

    let mut rivers = Vec::new();
    let mut discarded = 0usize;
    for id in 1..drainage.cells_of.len() {
        let member_cells = &drainage.cells_of[id];
        if member_cells.len() < 3 {
            discarded += 1;
            continue;
        }
        let id = id as u16;

        for &cell in member_cells {
            if cell == OFF_MAP || map.cells[cell as usize].height < water {
                continue;
            }
            let cu = cell as usize;
            if drainage.river_of[cu] != 0 {
                drainage.conf[cu] = 1.0;
            } else {
                drainage.river_of[cu] = id;
            }
        }

        let source = member_cells[0];
        let mouth = mouth_of(member_cells);
        let parent = drainage.parents[id as usize];
        let width_factor = if parent == 0 || parent == id {
            main_stem_width_factor
        } else {
            default_width_factor
        };
        let source_width = round2(flux_width(drainage.fl[source as usize]));

        rivers.push(River {
            id,
            cells: member_cells.clone(),
            source,
            mouth,
            parent,
            basin: basin_of(&drainage.parents, id),
            discharge: drainage.fl[mouth as usize].round() as u32,
            width: 0.0,
            width_factor,
            source_width,
            length: cell_path_length(map, member_cells),
            meander: Vec::new(),
        });
    }
    if discarded > 0 {
        debug!(discarded, "streams under three cells dropped");
    }
    map.rivers = rivers;
}

/// Second-to-last member, skipping trailing off-map sentinels.
fn mouth_of(cells: &[u32]) -> u32 {
    let candidate = cells[cells.len() - 2];
    if candidate != OFF_MAP {
        return candidate;
    }
    cells[..cells.len() - 2]
        .iter()
        .rev()
        .copied()
        .find(|&c| c != OFF_MAP)
        .unwrap_or(cells[0])
}

fn cell_path_length(map: &Map, cells: &[u32]) -> f64 {
    cells
        .windows(2)
        .filter(|pair| pair[0] != OFF_MAP && pair[1] != OFF_MAP)
        .map(|pair| {
            map.cells[pair[0] as usize]
                .point
                .distance(map.cells[pair[1] as usize].point)
        })
        .sum()
}

/// Walks the parent chain to its root. A cycle means lake re-parenting
/// crossed itself, in which case the walk stops where it closed.
fn basin_of(parents: &[u16], river: u16) -> u16 {
    let mut current = river;
    let mut seen = vec![river];
    loop {
        let parent = parents[current as usize];
        if parent == 0 || parent == current {
            return current;
        }
        if seen.contains(&parent) {
            warn!(river, closure = current, "cycle in river parent chain");
            return current;
        }
        seen.push(parent);
        current = parent;
    }
}

/// True confluence contribution: the sum of every incoming stream except
/// the strongest, judged among higher river-bearing neighbors.
fn confluence_flux(map: &Map, drainage: &mut Drainage) {
    for iu in 0..map.cells.len() {
        if drainage.conf[iu] == 0.0 {
            continue;
        }
        let mut influx: Vec<f64> = map.cells[iu]
            .neighbors
            .iter()
            .copied()
            .filter(|&c| {
                drainage.river_of[c as usize] != 0
                    && map.cells[c as usize].height > map.cells[iu].height
            })
            .map(|c| drainage.fl[c as usize])
            .collect();
        influx.sort_unstable_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        drainage.conf[iu] = influx.iter().skip(1).sum();
    }
}

fn write_back(map: &mut Map, drainage: &Drainage, lakes: &[LakeDrain]) {
    for (iu, cell) in map.cells.iter_mut().enumerate() {
        cell.flux = drainage.fl[iu].round() as u32;
        cell.confluence = drainage.conf[iu].round() as u32;
        cell.river = drainage.river_of[iu];
    }

    let surviving: Vec<u16> = map.rivers.iter().map(|r| r.id).collect();
    for lake in lakes {
        let outlet = if surviving.contains(&lake.outlet) {
            lake.outlet
        } else {
            0
        };
        let mut inlets: Vec<u16> = Vec::new();
        for &inlet in &lake.inlets {
            if surviving.contains(&inlet) && !inlets.contains(&inlet) {
                inlets.push(inlet);
            }
        }
        let feature = &mut map.features[lake.feature];
        feature.flux = lake.flux.round() as u32;
        feature.evaporation = lake.evaporation.round() as u32;
        feature.inlets = inlets;
        feature.outlet = outlet;
        feature.out_cell = lake.out_cell;
        if outlet == 0 && lake.evaporation > lake.flux {
            feature.group = FeatureGroup::Salt;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coastline::detect_features;

    fn rainy_strip(heights: &[f64], cols: usize, water_level: f64) -> Map {
        let mut map = Map::uniform_grid("strip", cols, 1, water_level);
        for (cell, &height) in map.cells.iter_mut().zip(heights.iter()) {
            cell.height = height;
            cell.border = false;
            cell.precipitation = 10;
            cell.temperature = 15;
        }
        detect_features(&mut map);
        map
    }

    #[test]
    fn test_single_stream_forms_along_descending_strip() {
        let mut map = rainy_strip(&[1.0, 0.8, 0.6, 0.4, 0.1], 5, 0.3);
        generate(&mut map, &HydrologyConfig::default());

        assert_eq!(map.rivers.len(), 1);
        let river = &map.rivers[0];
        assert_eq!(river.id, 1);
        assert_eq!(river.cells, vec![0, 1, 2, 3]);
        assert_eq!(river.source, 0);
        assert_eq!(river.mouth, 2);
        assert_eq!(river.discharge, 201);
        assert!((river.source_width - 0.09).abs() < 1e-9);
        assert_eq!(river.parent, 0);
        assert_eq!(river.basin, 1);
        assert!((river.length - 3.0).abs() < 1e-9);

        let flux: Vec<u32> = map.cells.iter().map(|c| c.flux).collect();
        assert_eq!(flux, vec![67, 134, 201, 273, 6]);
        let tags: Vec<u16> = map.cells.iter().map(|c| c.river).collect();
        assert_eq!(tags, vec![1, 1, 1, 1, 0]);
    }

    /// Rain falls only at the headwaters, so the lake gathers no shoreline
    /// rain and never spills; the stream runs clear through the spill cell
    /// and discharges into the lake itself.
    #[test]
    fn test_headwater_stream_discharges_into_lake() {
        let mut map = Map::uniform_grid("headwater", 5, 1, 0.3);
        let heights = [1.0, 0.8, 0.6, 0.4, 0.1];
        for (cell, &height) in map.cells.iter_mut().zip(heights.iter()) {
            cell.height = height;
            cell.border = false;
            cell.temperature = 15;
        }
        map.cells[0].precipitation = 10;
        detect_features(&mut map);
        generate(&mut map, &HydrologyConfig::default());

        assert_eq!(map.rivers.len(), 1);
        let river = &map.rivers[0];
        assert_eq!(river.cells, vec![0, 1, 2, 3, 4]);
        assert_eq!(river.mouth, 3);
        assert!(map.cells[river.mouth as usize].neighbors.contains(&4));
        assert_eq!(river.discharge, 67);

        let lake = map.feature(map.cells[4].feature).unwrap();
        assert_eq!(lake.inlets, vec![1]);
        assert_eq!(lake.outlet, 0);
        assert_eq!(lake.flux, 67);
    }

    #[test]
    fn test_terminal_lake_keeps_rain_budget() {
        let mut map = rainy_strip(&[1.0, 0.8, 0.6, 0.4, 0.1], 5, 0.3);
        generate(&mut map, &HydrologyConfig::default());

        let lake_id = map.cells[4].feature;
        let lake = map.feature(lake_id).unwrap();
        assert!(lake.is_lake());
        assert_eq!(lake.flux, 10);
        assert_eq!(lake.evaporation, 4);
        // The spill river was too short to survive, so the outlet is gone.
        assert_eq!(lake.outlet, 0);
        assert!(lake.inlets.is_empty());
        assert_eq!(lake.group, FeatureGroup::Freshwater);
    }

    /// No stream feeds the lake, but shoreline rain alone beats its
    /// evaporation, so the spill starts a fresh river sourced at the lake
    /// cell itself, its width seeded from the spilled surplus.
    #[test]
    fn test_rain_fed_lake_spills_into_new_river() {
        let mut map = Map::uniform_grid("spill", 6, 1, 0.3);
        let heights = [0.5, 0.1, 0.45, 0.4, 0.35, 0.32];
        for (cell, &height) in map.cells.iter_mut().zip(heights.iter()) {
            cell.height = height;
            cell.border = false;
            cell.temperature = 15;
        }
        map.cells[2].precipitation = 30;
        detect_features(&mut map);
        generate(&mut map, &HydrologyConfig::default());

        assert_eq!(map.rivers.len(), 1);
        let river = &map.rivers[0];
        assert_eq!(river.cells, vec![1, 2, 3, 4, 5]);
        assert_eq!(river.source, 1);
        assert!(!map.is_land(river.source));
        assert_eq!(river.mouth, 4);
        assert_eq!(river.discharge, 218);
        // The surplus is 30 rain minus 4 evaporation: (26^0.9 / 500).
        assert!((river.source_width - 0.04).abs() < 1e-9);

        let lake = map.feature(map.cells[1].feature).unwrap();
        assert_eq!(lake.outlet, 1);
        assert!(lake.inlets.is_empty());
        assert_eq!(lake.flux, 30);
        assert_eq!(lake.evaporation, 4);
        assert_eq!(lake.out_cell, Some(2));
        assert_eq!(lake.group, FeatureGroup::Freshwater);
    }

    /// Two parallel streams converge on the lake's spill cell: the outlet
    /// river absorbs the weaker stream and both end up in one basin.
    #[test]
    fn test_confluence_and_lake_routing() {
        let mut map = Map::uniform_grid("fork", 2, 4, 0.3);
        let heights = [0.9, 0.88, 0.6, 0.7, 0.4, 0.45, 0.1, 0.05];
        for (cell, &height) in map.cells.iter_mut().zip(heights.iter()) {
            cell.height = height;
            cell.border = false;
            cell.precipitation = 10;
            cell.temperature = 15;
        }
        detect_features(&mut map);
        generate(&mut map, &HydrologyConfig::default());

        assert_eq!(map.rivers.len(), 2);
        let first = map.river(1).unwrap();
        let second = map.river(2).unwrap();

        assert_eq!(first.cells, vec![0, 2, 4]);
        assert_eq!(first.mouth, 2);
        assert_eq!(first.discharge, 119);
        assert_eq!(first.parent, 2);
        assert_eq!(first.basin, 2);

        assert_eq!(second.cells, vec![1, 3, 5, 7, 6, 4]);
        assert_eq!(second.mouth, 6);
        assert_eq!(second.discharge, 189);
        assert_eq!(second.parent, 2);
        assert_eq!(second.basin, 2);
        // The main stem carries the wider factor.
        assert!(second.width_factor > first.width_factor);
        assert!((first.width_factor - 5.95).abs() < 1e-9);
        assert!((second.width_factor - 7.14).abs() < 1e-6);

        // First claimant keeps the shared cell, the later arrival marks a
        // confluence carrying the weaker branch's flux.
        assert_eq!(map.cells[4].river, 1);
        assert_eq!(map.cells[4].confluence, 119);
        assert_eq!(map.cells[4].flux, 368);

        let lake = map.feature(map.cells[6].feature).unwrap();
        assert_eq!(lake.outlet, 2);
        assert_eq!(lake.inlets, vec![2]);
        assert_eq!(lake.flux, 198);
        assert_eq!(lake.evaporation, 9);
        assert_eq!(lake.out_cell, Some(4));
        assert_eq!(lake.group, FeatureGroup::Freshwater);
    }

    #[test]
    fn test_weak_flow_accumulates_without_river() {
        let mut map = Map::uniform_grid("dry", 3, 1, 0.3);
        let heights = [0.9, 0.6, 0.4];
        for (cell, &height) in map.cells.iter_mut().zip(heights.iter()) {
            cell.height = height;
            cell.border = false;
            cell.precipitation = 1;
            cell.temperature = 15;
        }
        detect_features(&mut map);
        generate(&mut map, &HydrologyConfig::default());

        assert!(map.rivers.is_empty());
        assert!(map.cells.iter().all(|c| c.river == 0));
        let flux: Vec<u32> = map.cells.iter().map(|c| c.flux).collect();
        assert_eq!(flux, vec![8, 15, 23]);
    }

    #[test]
    fn test_border_river_records_off_map_exit() {
        let mut map = Map::uniform_grid("edge", 4, 1, 0.3);
        let heights = [0.9, 0.7, 0.5, 0.35];
        for (cell, &height) in map.cells.iter_mut().zip(heights.iter()) {
            cell.height = height;
            cell.precipitation = 10;
            cell.temperature = 15;
        }
        detect_features(&mut map);
        generate(&mut map, &HydrologyConfig::default());

        assert_eq!(map.rivers.len(), 2);
        let river = map.river(1).unwrap();
        assert_eq!(river.cells, vec![0, 1, OFF_MAP]);
        assert!(river.exits_domain());
        assert_eq!(river.mouth, 1);
        assert_eq!(river.discharge, 141);
        assert!((river.length - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_basin_walk_stops_at_cycles() {
        // 1 -> 2 -> 3 -> 1 closes a loop at river 3.
        let parents = vec![0, 2, 3, 1];
        assert_eq!(basin_of(&parents, 1), 3);
        // A clean chain resolves to its root.
        let parents = vec![0, 0, 1, 2];
        assert_eq!(basin_of(&parents, 3), 1);
    }
}
