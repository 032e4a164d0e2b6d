//! Assembled rivers.

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Sentinel cell id marking a river's exit across the map border.
pub const OFF_MAP: u32 = u32::MAX;

/// A smoothed path point with the flux flowing through it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeanderPoint {
    pub pos: DVec2,
    pub flux: f64,
}

/// One river from source to mouth.
///
/// Built by the hydrology simulator, then enriched with meander points by
/// the path smoother. `cells` runs source-first and may end with [`OFF_MAP`]
/// when the river leaves the domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct River {
    /// 1-based id; cells store it in `Cell::river`. Ids are sparse because
    /// rivers shorter than 3 cells are discarded after drainage.
    pub id: u16,
    /// Ordered member cells, source first.
    pub cells: Vec<u32>,
    pub source: u32,
    /// Last land cell before the receiving water body or border.
    pub mouth: u32,
    /// Id of the river this one feeds, 0 for a trunk stream.
    pub parent: u16,
    /// Root of the parent chain.
    pub basin: u16,
    /// Flux at the mouth.
    pub discharge: u32,
    /// Mouth width from the discharge/length model.
    pub width: f64,
    pub width_factor: f64,
    /// Width at the source, from source flux^0.9.
    pub source_width: f64,
    /// Planar length: summed inter-cell distances.
    pub length: f64,
    /// Smoothed path with interpolated flux samples.
    pub meander: Vec<MeanderPoint>,
}

impl River {
    /// True when the river drains across the map border.
    pub fn exits_domain(&self) -> bool {
        self.cells.last() == Some(&OFF_MAP)
    }
}
