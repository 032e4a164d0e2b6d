//! Fractal (octave-summed) gradient noise.

use serde::{Deserialize, Serialize};

use super::gradient::GradientNoise;
use crate::rng::AleaRng;

/// Configuration for fractal noise sampling.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FractalNoiseConfig {
    /// Number of octaves to sum.
    pub octaves: u32,
    /// Base lattice frequency in cycles per map unit.
    pub frequency: f64,
}

impl Default for FractalNoiseConfig {
    fn default() -> Self {
        Self {
            octaves: 6,
            frequency: 0.004,
        }
    }
}

impl FractalNoiseConfig {
    /// Smoother field with fewer octaves, for low-relief maps.
    pub fn smooth() -> Self {
        Self {
            octaves: 4,
            frequency: 0.003,
        }
    }

    /// More octaves and a higher base frequency, for rugged maps.
    pub fn rugged() -> Self {
        Self {
            octaves: 8,
            frequency: 0.006,
        }
    }
}

/// Octave-summed gradient noise.
///
/// Each octave halves the amplitude and doubles the frequency of the last;
/// the sum is normalized by the total amplitude so output stays in roughly
/// [-1, 1] regardless of octave count.
#[derive(Debug, Clone)]
pub struct FractalNoise {
    noise: GradientNoise,
    config: FractalNoiseConfig,
}

impl FractalNoise {
    /// Builds the noise tables from the generator stream.
    pub fn new(rng: &mut AleaRng, config: FractalNoiseConfig) -> Self {
        Self {
            noise: GradientNoise::new(rng),
            config,
        }
    }

    /// Samples the fractal sum at a point in map units.
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let mut amplitude = 1.0;
        let mut frequency = self.config.frequency;
        let mut total = 0.0;
        let mut max_amplitude = 0.0;

        for _ in 0..self.config.octaves.max(1) {
            total += self.noise.sample(x * frequency, y * frequency) * amplitude;
            max_amplitude += amplitude;
            amplitude *= 0.5;
            frequency *= 2.0;
        }

        total / max_amplitude
    }
}
