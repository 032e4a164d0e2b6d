//! Gradient noise for terrain synthesis.
//!
//! The primitive is a classic permutation-table gradient noise whose tables
//! are shuffled and drawn from the seeded [`AleaRng`](crate::rng::AleaRng)
//! stream, so the height field reproduces exactly for a given seed.

mod fractal;
mod gradient;

pub use fractal::{FractalNoise, FractalNoiseConfig};
pub use gradient::GradientNoise;
