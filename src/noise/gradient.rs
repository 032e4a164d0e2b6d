//! Permutation-table gradient noise primitive.

use glam::DVec2;

use crate::rng::AleaRng;

const TABLE_SIZE: usize = 256;

/// 2D gradient noise over a unit lattice.
///
/// A 256-entry permutation table (Fisher-Yates shuffled by the PRNG, then
/// doubled for wrap-free indexing) hashes each lattice corner to one of 256
/// random unit gradients drawn from the same stream. Sampling blends the
/// four corner dot products with a quintic fade. Output is roughly [-1, 1].
#[derive(Debug, Clone)]
pub struct GradientNoise {
    perm: [u8; TABLE_SIZE * 2],
    gradients: [DVec2; TABLE_SIZE],
}

impl GradientNoise {
    /// Builds the tables from the generator stream.
    pub fn new(rng: &mut AleaRng) -> Self {
        let mut table: [u8; TABLE_SIZE] = [0; TABLE_SIZE];
        for (i, slot) in table.iter_mut().enumerate() {
            *slot = i as u8;
        }
        rng.shuffle(&mut table);

        let mut perm = [0u8; TABLE_SIZE * 2];
        perm[..TABLE_SIZE].copy_from_slice(&table);
        perm[TABLE_SIZE..].copy_from_slice(&table);

        let mut gradients = [DVec2::ZERO; TABLE_SIZE];
        for g in &mut gradients {
            let angle = rng.float(0.0, std::f64::consts::TAU);
            *g = DVec2::new(angle.cos(), angle.sin());
        }

        Self { perm, gradients }
    }

    #[inline]
    fn corner_gradient(&self, xi: usize, yi: usize) -> DVec2 {
        let hash = self.perm[usize::from(self.perm[xi & 255]) + (yi & 255)];
        self.gradients[usize::from(hash)]
    }

    /// Samples the noise at `(x, y)` in lattice units.
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let x0 = x.floor();
        let y0 = y.floor();
        let xi = x0.rem_euclid(256.0) as usize;
        let yi = y0.rem_euclid(256.0) as usize;

        let fx = x - x0;
        let fy = y - y0;

        let d00 = self.corner_gradient(xi, yi).dot(DVec2::new(fx, fy));
        let d10 = self.corner_gradient(xi + 1, yi).dot(DVec2::new(fx - 1.0, fy));
        let d01 = self.corner_gradient(xi, yi + 1).dot(DVec2::new(fx, fy - 1.0));
        let d11 = self
            .corner_gradient(xi + 1, yi + 1)
            .dot(DVec2::new(fx - 1.0, fy - 1.0));

        let u = fade(fx);
        let v = fade(fy);
        let top = lerp(d00, d10, u);
        let bottom = lerp(d01, d11, u);
        lerp(top, bottom, v)
    }
}

/// Quintic smoothstep: 6t^5 - 15t^4 + 10t^3.
#[inline]
fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reproducible_for_seed() {
        let a = GradientNoise::new(&mut AleaRng::new("noise"));
        let b = GradientNoise::new(&mut AleaRng::new("noise"));
        for i in 0..100 {
            let x = i as f64 * 0.173;
            let y = i as f64 * 0.311;
            assert_eq!(a.sample(x, y).to_bits(), b.sample(x, y).to_bits());
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = GradientNoise::new(&mut AleaRng::new("one"));
        let b = GradientNoise::new(&mut AleaRng::new("two"));
        let mut distinct = 0;
        for i in 0..50 {
            let p = i as f64 * 0.37 + 0.11;
            if (a.sample(p, p * 0.7) - b.sample(p, p * 0.7)).abs() > 1e-9 {
                distinct += 1;
            }
        }
        assert!(distinct > 40);
    }

    #[test]
    fn test_zero_at_lattice_points() {
        let noise = GradientNoise::new(&mut AleaRng::new("lattice"));
        for x in 0..8 {
            for y in 0..8 {
                let v = noise.sample(x as f64, y as f64);
                assert!(v.abs() < 1e-12, "lattice point value {}", v);
            }
        }
    }

    #[test]
    fn test_output_bounded() {
        let noise = GradientNoise::new(&mut AleaRng::new("bounds"));
        for i in 0..2000 {
            let x = (i % 53) as f64 * 0.217;
            let y = (i / 53) as f64 * 0.131;
            let v = noise.sample(x, y);
            assert!(v.abs() <= 1.0 + 1e-9, "sample {} out of range", v);
        }
    }

    #[test]
    fn test_continuity_across_cells() {
        let noise = GradientNoise::new(&mut AleaRng::new("continuity"));
        let eps = 1e-6;
        for i in 1..20 {
            let x = i as f64;
            let before = noise.sample(x - eps, 3.4);
            let after = noise.sample(x + eps, 3.4);
            assert!((before - after).abs() < 1e-4);
        }
    }
}
