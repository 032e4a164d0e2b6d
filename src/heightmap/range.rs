//! The string-range mini-language used by sculpting operators.
//!
//! Operator arguments arrive as `"N"` (fixed), `"N-M"` (inclusive range,
//! drawn once per use) or `"P%-Q%"`. Position ranges are always interpreted
//! as percentages of the domain dimension, with or without the `%` sign;
//! counts resolve their fractional part probabilistically ("1.5" means one
//! hill plus a 50% chance of a second).

use thiserror::Error;
use tracing::warn;

use crate::rng::AleaRng;

/// Parse failure for a range expression.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeParseError {
    #[error("empty range expression")]
    Empty,
    #[error("invalid number in range expression `{0}`")]
    InvalidNumber(String),
}

/// A parsed range expression. Parsing happens once, at template load or
/// operator entry; draws happen per use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeExpr {
    Fixed { value: f64, percent: bool },
    Span { lo: f64, hi: f64, percent: bool },
}

impl RangeExpr {
    pub const ZERO: Self = Self::Fixed {
        value: 0.0,
        percent: false,
    };

    pub fn parse(raw: &str) -> Result<Self, RangeParseError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(RangeParseError::Empty);
        }

        let (negate_lo, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        if body.is_empty() {
            return Err(RangeParseError::InvalidNumber(raw.to_string()));
        }

        let mut percent = false;
        let mut parse_endpoint = |s: &str| -> Result<f64, RangeParseError> {
            let s = match s.strip_suffix('%') {
                Some(rest) => {
                    percent = true;
                    rest
                }
                None => s,
            };
            s.trim()
                .parse::<f64>()
                .map_err(|_| RangeParseError::InvalidNumber(raw.to_string()))
        };

        match body.split_once('-') {
            None => {
                let mut value = parse_endpoint(body)?;
                if negate_lo {
                    value = -value;
                }
                Ok(Self::Fixed { value, percent })
            }
            Some((lo_raw, hi_raw)) => {
                let mut lo = parse_endpoint(lo_raw)?;
                if negate_lo {
                    lo = -lo;
                }
                let hi = parse_endpoint(hi_raw)?;
                let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
                Ok(Self::Span { lo, hi, percent })
            }
        }
    }

    /// Parses, degrading malformed input to zero with a warning instead of
    /// failing the whole operation.
    pub fn parse_or_zero(raw: &str) -> Self {
        match Self::parse(raw) {
            Ok(expr) => expr,
            Err(err) => {
                warn!(expression = raw, %err, "malformed range, treating as zero");
                Self::ZERO
            }
        }
    }

    /// Draws a value: fixed expressions cost no randomness, spans draw once
    /// (inclusive, integer-stepped from the low endpoint).
    pub fn value(&self, rng: &mut AleaRng) -> f64 {
        match *self {
            Self::Fixed { value, .. } => value,
            Self::Span { lo, hi, .. } => lo + (rng.random() * (hi - lo + 1.0)).floor(),
        }
    }

    /// Draws an operator instance count: integer part plus a probabilistic
    /// extra for the fractional remainder. Never negative.
    pub fn count(&self, rng: &mut AleaRng) -> u32 {
        let drawn = self.value(rng).max(0.0);
        let whole = drawn.floor();
        let fraction = drawn - whole;
        let extra = if fraction > 0.0 && rng.chance(fraction) {
            1.0
        } else {
            0.0
        };
        (whole + extra) as u32
    }

    /// Draws a coordinate along an axis of length `extent`, interpreting the
    /// endpoints as percentages of it. Result clamped to the axis.
    pub fn position(&self, rng: &mut AleaRng, extent: f64) -> f64 {
        let (lo, hi) = match *self {
            Self::Fixed { value, .. } => (value, value),
            Self::Span { lo, hi, .. } => (lo, hi),
        };
        let lo_px = lo / 100.0 * extent;
        let hi_px = hi / 100.0 * extent;
        let drawn = lo_px + (rng.random() * (hi_px - lo_px + 1.0)).floor();
        drawn.clamp(0.0, extent)
    }
}
