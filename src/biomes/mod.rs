//! Biome classification.
//!
//! Land cells resolve through a short list of special cases (permafrost,
//! hot desert, wetland) and otherwise fall into a moisture-by-temperature
//! matrix: five moisture bands crossed with 26 one-degree temperature
//! columns spanning 20 degrees and warmer down to -5 and colder.

use crate::map::Map;

/// Moisture rows x temperature columns. Row 0 is driest; column 0 hottest.
const BIOME_MATRIX: [[u8; 26]; 5] = [
    [1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 10, 10, 10, 10, 10],
    [3, 3, 3, 3, 3, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 9, 9, 9, 9, 9, 10, 10],
    [5, 5, 5, 5, 5, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 9, 9, 9, 9, 9, 10, 10],
    [5, 5, 5, 5, 5, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 6, 9, 9, 9, 9, 9, 10, 10],
    [7, 7, 7, 7, 7, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 9, 9, 9, 9, 9, 10, 10],
];

/// Biome id. `as_u8()` is stable and stored on cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Biome {
    Marine = 0,
    HotDesert = 1,
    ColdDesert = 2,
    Savanna = 3,
    Grassland = 4,
    TropicalSeasonalForest = 5,
    TemperateDeciduousForest = 6,
    TropicalRainforest = 7,
    TemperateRainforest = 8,
    Taiga = 9,
    Tundra = 10,
    Glacier = 11,
    Wetland = 12,
}

impl Biome {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Maps a stored id back to the biome; unknown ids read as marine.
    pub fn from_id(id: u8) -> Self {
        match id {
            1 => Biome::HotDesert,
            2 => Biome::ColdDesert,
            3 => Biome::Savanna,
            4 => Biome::Grassland,
            5 => Biome::TropicalSeasonalForest,
            6 => Biome::TemperateDeciduousForest,
            7 => Biome::TropicalRainforest,
            8 => Biome::TemperateRainforest,
            9 => Biome::Taiga,
            10 => Biome::Tundra,
            11 => Biome::Glacier,
            12 => Biome::Wetland,
            _ => Biome::Marine,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Biome::Marine => "Marine",
            Biome::HotDesert => "Hot desert",
            Biome::ColdDesert => "Cold desert",
            Biome::Savanna => "Savanna",
            Biome::Grassland => "Grassland",
            Biome::TropicalSeasonalForest => "Tropical seasonal forest",
            Biome::TemperateDeciduousForest => "Temperate deciduous forest",
            Biome::TropicalRainforest => "Tropical rainforest",
            Biome::TemperateRainforest => "Temperate rainforest",
            Biome::Taiga => "Taiga",
            Biome::Tundra => "Tundra",
            Biome::Glacier => "Glacier",
            Biome::Wetland => "Wetland",
        }
    }

    /// RGB preview color.
    pub fn color(self) -> [u8; 3] {
        match self {
            Biome::Marine => [70, 110, 171],
            Biome::HotDesert => [251, 231, 159],
            Biome::ColdDesert => [181, 184, 135],
            Biome::Savanna => [210, 208, 130],
            Biome::Grassland => [200, 214, 143],
            Biome::TropicalSeasonalForest => [182, 217, 93],
            Biome::TemperateDeciduousForest => [41, 188, 86],
            Biome::TropicalRainforest => [125, 203, 53],
            Biome::TemperateRainforest => [64, 156, 67],
            Biome::Taiga => [75, 107, 50],
            Biome::Tundra => [150, 120, 75],
            Biome::Glacier => [213, 231, 235],
            Biome::Wetland => [11, 145, 49],
        }
    }

    /// Relative settlement suitability, 0-100.
    pub fn habitability(self) -> u8 {
        match self {
            Biome::Marine => 0,
            Biome::HotDesert => 4,
            Biome::ColdDesert => 10,
            Biome::Savanna => 22,
            Biome::Grassland => 30,
            Biome::TropicalSeasonalForest => 50,
            Biome::TemperateDeciduousForest => 100,
            Biome::TropicalRainforest => 80,
            Biome::TemperateRainforest => 90,
            Biome::Taiga => 12,
            Biome::Tundra => 2,
            Biome::Glacier => 0,
            Biome::Wetland => 12,
        }
    }
}

/// Classifies one land cell. Heights are on the internal 0-100 scale.
fn classify(moisture: f64, temperature: i8, height: f64, water: f64, has_river: bool) -> Biome {
    if height < water {
        return Biome::Marine;
    }
    if temperature < -5 {
        return Biome::Glacier;
    }
    if temperature > 24 && moisture < 8.0 && !has_river {
        return Biome::HotDesert;
    }
    if is_wetland(moisture, temperature, height, water) {
        return Biome::Wetland;
    }
    let moisture_band = ((moisture / 5.0) as usize).min(4);
    let temperature_column = (20 - i32::from(temperature)).clamp(0, 25) as usize;
    Biome::from_id(BIOME_MATRIX[moisture_band][temperature_column])
}

fn is_wetland(moisture: f64, temperature: i8, height: f64, water: f64) -> bool {
    if temperature <= -2 {
        return false;
    }
    // Soaked lowland right at the coast.
    if moisture > 40.0 && height < water + 5.0 {
        return true;
    }
    // Damp interior plains below the hills.
    if moisture > 24.0 && height > water + 4.0 && height < water + 40.0 {
        return true;
    }
    false
}

/// Moisture for a land cell: its own precipitation (plus a river bonus
/// scaled by flux) averaged with the precipitation of land neighbors,
/// shifted so even arid cells index into the matrix.
fn cell_moisture(map: &Map, id: u32) -> f64 {
    let cell = &map.cells[id as usize];
    let mut own = f64::from(cell.precipitation);
    if cell.river != 0 {
        own += (f64::from(cell.flux) / 20.0).max(2.0);
    }
    let mut sum = own;
    let mut count = 1.0;
    for &neighbor in &cell.neighbors {
        if map.is_land(neighbor) {
            sum += f64::from(map.cells[neighbor as usize].precipitation);
            count += 1.0;
        }
    }
    (4.0 + sum / count).round()
}

/// Assigns a biome id to every cell.
pub fn assign_biomes(map: &mut Map) {
    let water = map.water_level() * 100.0;
    let mut assigned = vec![0u8; map.cells.len()];
    for (i, slot) in assigned.iter_mut().enumerate() {
        let id = i as u32;
        if !map.is_land(id) {
            *slot = Biome::Marine.as_u8();
            continue;
        }
        let cell = &map.cells[i];
        let moisture = cell_moisture(map, id);
        let biome = classify(
            moisture,
            cell.temperature,
            cell.height * 100.0,
            water,
            cell.river != 0,
        );
        *slot = biome.as_u8();
    }
    for (cell, id) in map.cells.iter_mut().zip(assigned) {
        cell.biome = id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_round_trip() {
        for id in 0u8..=12 {
            assert_eq!(Biome::from_id(id).as_u8(), id);
        }
        assert_eq!(Biome::from_id(200), Biome::Marine);
    }

    #[test]
    fn test_permafrost_overrides_everything() {
        assert_eq!(classify(50.0, -6, 80.0, 20.0, true), Biome::Glacier);
    }

    #[test]
    fn test_hot_desert_needs_dry_and_riverless() {
        assert_eq!(classify(5.0, 30, 50.0, 20.0, false), Biome::HotDesert);
        // A river in the same heat turns the cell to savanna.
        assert_eq!(classify(5.0, 30, 50.0, 20.0, true), Biome::Savanna);
    }

    #[test]
    fn test_wetland_bands() {
        // Soaked coastal lowland.
        assert_eq!(classify(45.0, 10, 22.0, 20.0, false), Biome::Wetland);
        // Damp interior plain.
        assert_eq!(classify(30.0, 10, 40.0, 20.0, false), Biome::Wetland);
        // Too cold for wetland, falls through to the matrix.
        assert_ne!(classify(45.0, -3, 22.0, 20.0, false), Biome::Wetland);
        // Too high for the interior band.
        assert_ne!(classify(30.0, 10, 70.0, 20.0, false), Biome::Wetland);
    }

    #[test]
    fn test_matrix_lookup() {
        assert_eq!(classify(3.0, 10, 70.0, 20.0, false), Biome::ColdDesert);
        assert_eq!(classify(12.0, 15, 70.0, 20.0, false), Biome::TemperateDeciduousForest);
        assert_eq!(classify(27.0, 22, 90.0, 20.0, false), Biome::TropicalRainforest);
        assert_eq!(classify(8.0, 25, 70.0, 20.0, false), Biome::Savanna);
        assert_eq!(classify(12.0, -3, 70.0, 20.0, false), Biome::Taiga);
        assert_eq!(classify(3.0, -5, 70.0, 20.0, false), Biome::Tundra);
    }

    #[test]
    fn test_matrix_rows_are_valid_ids() {
        for row in BIOME_MATRIX {
            for id in row {
                assert_ne!(Biome::from_id(id), Biome::Marine);
            }
        }
    }

    #[test]
    fn test_assign_biomes_separates_land_and_water() {
        let mut map = Map::uniform_grid("biomes", 10, 10, 0.5);
        for cell in map.cells.iter_mut() {
            let col = cell.id % 10;
            cell.height = if col < 5 { 0.2 } else { 0.7 };
            cell.temperature = 15;
            cell.precipitation = 20;
        }
        assign_biomes(&mut map);
        for cell in &map.cells {
            let col = cell.id % 10;
            if col < 5 {
                assert_eq!(cell.biome, Biome::Marine.as_u8());
            } else {
                assert_ne!(cell.biome, Biome::Marine.as_u8());
            }
        }
    }

    #[test]
    fn test_river_bonus_raises_moisture() {
        let mut map = Map::uniform_grid("moisture", 3, 1, 0.5);
        for cell in map.cells.iter_mut() {
            cell.height = 0.7;
            cell.precipitation = 10;
        }
        let dry = cell_moisture(&map, 1);
        map.cells[1].river = 1;
        map.cells[1].flux = 400;
        let wet = cell_moisture(&map, 1);
        assert!(wet > dry, "river bonus missing: {} vs {}", wet, dry);
        // flux 400 adds 20 to the cell's own contribution before averaging.
        assert!((wet - dry - 20.0 / 3.0).abs() < 1.0);
    }
}
