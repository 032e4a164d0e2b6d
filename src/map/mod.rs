//! The map data model.
//!
//! [`Map`] is the arena every stage writes into and the read-mostly snapshot
//! `generate` hands back: cells (geometry + per-cell attributes addressed by
//! integer id), detected features (oceans, lakes, islands) and assembled
//! rivers. Stages communicate exclusively through this struct plus the
//! explicit generation context; nothing global.

mod feature;
mod grid;
mod river;

pub use feature::{Feature, FeatureGroup, FeatureKind};
pub use grid::{Cell, Map};
pub use river::{MeanderPoint, OFF_MAP, River};
