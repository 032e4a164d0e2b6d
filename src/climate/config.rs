//! Climate configuration parameters.

use serde::{Deserialize, Serialize};

/// Configuration for the temperature and precipitation pass.
///
/// Units:
/// - temperatures: degrees Celsius
/// - latitudes: degrees, positive north
/// - humidity: dimensionless rainfall scale, 0-100
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ClimateConfig {
    /// Sea-level temperature at the equator.
    pub equator_temp: f64,
    /// Sea-level temperature at the poles.
    pub pole_temp: f64,
    /// Latitude of the domain's top edge.
    pub latitude_north: f64,
    /// Latitude of the domain's bottom edge.
    pub latitude_south: f64,
    /// Base rainfall scale before latitude banding and coastal boost.
    pub humidity: f64,
}

impl Default for ClimateConfig {
    fn default() -> Self {
        Self {
            equator_temp: 27.0,
            pole_temp: -30.0,
            latitude_north: 90.0,
            latitude_south: -90.0,
            humidity: 10.0,
        }
    }
}

impl ClimateConfig {
    /// Full pole-to-pole latitude sweep.
    pub fn earth_like() -> Self {
        Self::default()
    }

    /// The whole domain sits in the tropics.
    pub fn tropical() -> Self {
        Self {
            latitude_north: 25.0,
            latitude_south: -25.0,
            humidity: 14.0,
            ..Self::default()
        }
    }

    /// High-latitude band, cold and dry.
    pub fn arctic() -> Self {
        Self {
            latitude_north: 90.0,
            latitude_south: 55.0,
            humidity: 6.0,
            ..Self::default()
        }
    }

    /// Degrees of latitude spanned by the domain.
    pub fn latitude_span(&self) -> f64 {
        self.latitude_north - self.latitude_south
    }
}
