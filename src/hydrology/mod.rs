//! Depression resolution and river generation.
//!
//! Runs in two stages. The depression pass lifts closed pits until every
//! non-border land cell can drain, tracking lake spill levels as it goes.
//! The river pass then pours precipitation downhill, merges flows at
//! confluences, routes water through lakes, and shapes the resulting rivers
//! into smoothed polylines with width estimates.

use serde::{Deserialize, Serialize};

use crate::map::Map;
use crate::rng::AleaRng;

mod depressions;
mod meander;
mod rivers;

pub use depressions::DepressionReport;
pub use meander::ribbon;

/// Tuning for the water cycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HydrologyConfig {
    /// Minimum accumulated flux for a cell to carry a river.
    pub min_river_flux: f64,
    /// A lake whose lowest shore towers this many internal height points
    /// above its surface is closed and never spills.
    pub lake_elevation_limit: f64,
    /// Hard cap on depression resolution passes.
    pub max_depression_passes: u32,
    /// Lateral wobble added to long river segments, 0 disables.
    pub meandering: f64,
    /// Corner-cutting rounds applied to river polylines.
    pub smoothing_rounds: u32,
}

impl Default for HydrologyConfig {
    fn default() -> Self {
        Self {
            min_river_flux: 30.0,
            lake_elevation_limit: 20.0,
            max_depression_passes: 1000,
            meandering: 0.5,
            smoothing_rounds: 3,
        }
    }
}

impl HydrologyConfig {
    /// Rivers form easily, as on a rain-soaked continent.
    pub fn wet() -> Self {
        Self {
            min_river_flux: 20.0,
            ..Self::default()
        }
    }

    /// Only strong flows survive.
    pub fn arid() -> Self {
        Self {
            min_river_flux: 45.0,
            ..Self::default()
        }
    }
}

/// Fills depressions and records the outcome on the map.
pub fn resolve_depressions(map: &mut Map, config: &HydrologyConfig) -> DepressionReport {
    let report = depressions::resolve(map, config);
    map.depressions = Some(report);
    report
}

/// Pours precipitation downhill and defines rivers, then meanders and
/// smooths their courses. Expects depressions to be resolved first.
pub fn generate_rivers(map: &mut Map, config: &HydrologyConfig, rng: &mut AleaRng) {
    rivers::generate(map, config);
    meander::shape(map, config, rng);
}

/// Flux term divisor and cap in the width model.
const FLUX_FACTOR: f64 = 500.0;
const MAX_FLUX_WIDTH: f64 = 2.0;

/// Flux contribution to a river's width, shared by the source width
/// recorded at definition time and the per-point ribbon offsets.
fn flux_width(flux: f64) -> f64 {
    (flux.powf(0.9) / FLUX_FACTOR).min(MAX_FLUX_WIDTH)
}

/// Widths are stored at two-decimal precision.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
