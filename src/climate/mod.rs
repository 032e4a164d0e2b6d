//! Temperature and precipitation assignment.
//!
//! Temperature interpolates between equator and pole values along an eased
//! latitude curve, then drops with altitude. Precipitation follows latitude
//! bands (wet tropics, dry subtropics, wet temperate belt, dry poles) with a
//! boost for cells near the coast.

mod config;

pub use config::ClimateConfig;

use crate::map::Map;

/// Lapse rate in degrees per 100 m of altitude.
const LAPSE_PER_100M: f64 = 0.6;
/// Exponent converting internal height above the shelf into meters.
const HEIGHT_EXPONENT: f64 = 2.0;

pub fn apply_climate(map: &mut Map, config: &ClimateConfig) {
    assign_temperatures(map, config);
    assign_precipitation(map, config);
}

/// Symmetric ease used for the pole-to-equator gradient; flat near the
/// endpoints, steep through the mid latitudes.
fn ease_poly_in_out(t: f64, exponent: f64) -> f64 {
    let u = t * 2.0;
    if u <= 1.0 {
        u.powf(exponent) / 2.0
    } else {
        (2.0 - (2.0 - u).powf(exponent)) / 2.0
    }
}

fn latitude_at(config: &ClimateConfig, y: f64, domain_height: f64) -> f64 {
    config.latitude_north - (y / domain_height) * config.latitude_span()
}

/// Height above the continental shelf converted to meters. The shelf sits
/// two internal height points below the water line, so shallow coastal land
/// registers as near sea level.
pub(crate) fn altitude_meters(height: f64, water_level: f64) -> f64 {
    let internal = height * 100.0;
    let shelf = water_level * 100.0 - 2.0;
    (internal - shelf).max(0.0).powf(HEIGHT_EXPONENT)
}

fn assign_temperatures(map: &mut Map, config: &ClimateConfig) {
    let domain_height = map.height;
    let water_level = map.water_level();
    let delta = config.equator_temp - config.pole_temp;
    for cell in map.cells.iter_mut() {
        let lat = latitude_at(config, cell.point.y, domain_height);
        let normalized = (lat.abs() / 90.0).clamp(0.0, 1.0);
        let eased = ease_poly_in_out(normalized, 0.5);
        let sea_level_temp = config.equator_temp - delta * eased;
        let drop = altitude_meters(cell.height, water_level) / 100.0 * LAPSE_PER_100M;
        cell.temperature = (sea_level_temp - drop).round().clamp(-128.0, 127.0) as i8;
    }
}

/// Rainfall multiplier for an absolute latitude band.
fn latitude_band(abs_lat: f64) -> f64 {
    if abs_lat < 16.0 {
        1.0
    } else if abs_lat < 36.0 {
        0.3
    } else if abs_lat < 66.0 {
        0.8
    } else {
        0.2
    }
}

fn assign_precipitation(map: &mut Map, config: &ClimateConfig) {
    let domain_height = map.height;
    for cell in map.cells.iter_mut() {
        let lat = latitude_at(config, cell.point.y, domain_height);
        let band = latitude_band(lat.abs());
        let coastal = match cell.coast_dist {
            t @ 1..=4 => 1.0 + (5 - t) as f64 * 0.15,
            _ => 1.0,
        };
        let prec = (config.humidity * band * coastal).round().clamp(0.0, 100.0);
        cell.precipitation = prec as u8;
    }
}
