//! Connected land/water regions detected on the mesh.

use serde::{Deserialize, Serialize};

/// Coarse feature class from the flood fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureKind {
    /// Water region touching the map border.
    Ocean,
    /// Enclosed water region.
    Lake,
    /// Any land region.
    Island,
}

/// Size/context refinement of the coarse class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureGroup {
    Ocean,
    Sea,
    Gulf,
    Continent,
    Island,
    Isle,
    Freshwater,
    Salt,
}

impl FeatureGroup {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ocean => "ocean",
            Self::Sea => "sea",
            Self::Gulf => "gulf",
            Self::Continent => "continent",
            Self::Island => "island",
            Self::Isle => "isle",
            Self::Freshwater => "freshwater lake",
            Self::Salt => "salt lake",
        }
    }
}

/// One connected same-class region.
///
/// Created by the coastline detector; lakes are then mutated by the
/// depression resolver (surface level) and annotated by hydrology
/// (inflow/outflow, salt refinement). Read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    /// 1-based id; cells store it in `Cell::feature`.
    pub id: u16,
    pub kind: FeatureKind,
    pub group: FeatureGroup,
    /// Whether the region touches the map border band.
    pub border: bool,
    /// Member cell ids.
    pub cells: Vec<u32>,
    /// Adjacent land cells (lakes only).
    pub shoreline: Vec<u32>,
    /// Lake surface level in [0, 1]; raised by the depression resolver.
    pub lake_level: f64,
    /// Total inflow accumulated during drainage (lakes only).
    pub flux: u32,
    /// Estimated evaporation (lakes only).
    pub evaporation: u32,
    /// Rivers flowing into the lake.
    pub inlets: Vec<u16>,
    /// River continuing from the lake spill cell, 0 if none.
    pub outlet: u16,
    /// Shoreline cell the lake spills over, if it has a spill path.
    pub out_cell: Option<u32>,
    /// No spill path found (deep depression); stays a terminal sink.
    pub closed: bool,
}

impl Feature {
    pub(crate) fn new(id: u16, kind: FeatureKind, group: FeatureGroup, border: bool) -> Self {
        Self {
            id,
            kind,
            group,
            border,
            cells: Vec::new(),
            shoreline: Vec::new(),
            lake_level: 0.0,
            flux: 0,
            evaporation: 0,
            inlets: Vec::new(),
            outlet: 0,
            out_cell: None,
            closed: false,
        }
    }

    pub fn is_lake(&self) -> bool {
        self.kind == FeatureKind::Lake
    }

    pub fn is_water(&self) -> bool {
        matches!(self.kind, FeatureKind::Ocean | FeatureKind::Lake)
    }
}
