//! Seeded pseudo-random number generation.
//!
//! Every random decision in the generator flows through a single [`AleaRng`]
//! stream constructed from the user's seed string and passed explicitly into
//! each stage. The generator is Baagoe's Alea: three f64 lanes and a carry,
//! seeded through a string-mixing hash. The recurrence uses only exact
//! double-precision arithmetic, so a given seed yields a bit-identical
//! sequence on every platform.

use rand_core::{RngCore, SeedableRng};

const TWO_POW_NEG_32: f64 = 2.328_306_436_538_696_3e-10;
const TWO_POW_32: f64 = 4_294_967_296.0;

/// JS-style unsigned 32-bit truncation for non-negative doubles below 2^53.
#[inline]
fn trunc_u32(x: f64) -> u32 {
    (x as u64) as u32
}

/// The string-mixing hash used to fold seed characters into the state.
///
/// State persists across calls: seeding mixes the literal `" "` three times
/// and then subtracts a mix of the seed from each lane, all through one
/// hasher instance.
struct Mash {
    n: f64,
}

impl Mash {
    fn new() -> Self {
        Self { n: 0xefc8249d_u32 as f64 }
    }

    fn mix(&mut self, data: &str) -> f64 {
        for unit in data.encode_utf16() {
            self.n += f64::from(unit);
            let mut h = 0.025_196_032_824_169_38 * self.n;
            self.n = f64::from(trunc_u32(h));
            h -= self.n;
            h *= self.n;
            self.n = f64::from(trunc_u32(h));
            h -= self.n;
            self.n += h * TWO_POW_32;
        }
        f64::from(trunc_u32(self.n)) * TWO_POW_NEG_32
    }
}

/// Deterministic seeded PRNG (Alea).
///
/// Produces uniform f64 values in `[0, 1)` plus the derived helpers the
/// generation stages need: ranged draws, probability gates, weighted choice,
/// Gaussian deviates and Fisher-Yates shuffling. Also implements
/// [`RngCore`]/[`SeedableRng`] so `rand`-based consumers can draw from the
/// same stream.
#[derive(Debug, Clone)]
pub struct AleaRng {
    s0: f64,
    s1: f64,
    s2: f64,
    c: u32,
}

impl AleaRng {
    /// Creates a generator from an arbitrary seed string.
    pub fn new(seed: &str) -> Self {
        let mut mash = Mash::new();
        let mut s0 = mash.mix(" ");
        let mut s1 = mash.mix(" ");
        let mut s2 = mash.mix(" ");

        s0 -= mash.mix(seed);
        if s0 < 0.0 {
            s0 += 1.0;
        }
        s1 -= mash.mix(seed);
        if s1 < 0.0 {
            s1 += 1.0;
        }
        s2 -= mash.mix(seed);
        if s2 < 0.0 {
            s2 += 1.0;
        }

        Self { s0, s1, s2, c: 1 }
    }

    /// Creates a generator from an unsigned integer seed (hashed via its
    /// decimal string form).
    pub fn from_u64(seed: u64) -> Self {
        Self::new(&seed.to_string())
    }

    /// Next uniform f64 in `[0, 1)`.
    #[inline]
    pub fn random(&mut self) -> f64 {
        let t = 2_091_639.0 * self.s0 + f64::from(self.c) * TWO_POW_NEG_32;
        self.s0 = self.s1;
        self.s1 = self.s2;
        self.c = t as u32;
        self.s2 = t - f64::from(self.c);
        self.s2
    }

    /// Uniform f64 in `[lo, hi)`.
    #[inline]
    pub fn float(&mut self, lo: f64, hi: f64) -> f64 {
        lo + self.random() * (hi - lo)
    }

    /// Uniform integer in the inclusive range `[lo, hi]`.
    pub fn int(&mut self, lo: i64, hi: i64) -> i64 {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        let span = (hi - lo + 1) as f64;
        lo + (self.random() * span).floor() as i64
    }

    /// True with probability `p` (values outside `[0, 1]` saturate).
    #[inline]
    pub fn chance(&mut self, p: f64) -> bool {
        self.random() < p
    }

    /// Index drawn proportionally to `weights`. Non-positive weights are
    /// never chosen; an all-zero or empty slice yields index 0.
    pub fn weighted_index(&mut self, weights: &[f64]) -> usize {
        let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
        if total <= 0.0 {
            return 0;
        }
        let mut draw = self.random() * total;
        for (i, w) in weights.iter().enumerate() {
            if *w <= 0.0 {
                continue;
            }
            if draw < *w {
                return i;
            }
            draw -= w;
        }
        weights.len() - 1
    }

    /// Gaussian deviate via Box-Muller.
    pub fn gauss(&mut self, mean: f64, deviation: f64) -> f64 {
        let u1 = self.random().max(f64::MIN_POSITIVE);
        let u2 = self.random();
        let z = (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos();
        mean + z * deviation
    }

    /// Gaussian deviate clamped into `[min, max]`.
    pub fn gauss_in(&mut self, mean: f64, deviation: f64, min: f64, max: f64) -> f64 {
        self.gauss(mean, deviation).clamp(min, max)
    }

    /// In-place Fisher-Yates shuffle.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = (self.random() * (i + 1) as f64).floor() as usize;
            items.swap(i, j);
        }
    }
}

impl RngCore for AleaRng {
    #[inline]
    fn next_u32(&mut self) -> u32 {
        (self.random() * TWO_POW_32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        let hi = u64::from(self.next_u32());
        let lo = u64::from(self.next_u32());
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        for chunk in dst.chunks_mut(4) {
            let word = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&word[..chunk.len()]);
        }
    }
}

impl SeedableRng for AleaRng {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::from_u64(u64::from_le_bytes(seed))
    }
}
