//! Cell arena and map snapshot.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::feature::Feature;
use super::river::River;
use crate::biomes::Biome;
use crate::geometry::{PointScatter, build_cells, triangulate};
use crate::hydrology::DepressionReport;

/// One mesh cell with its geometry and generated attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    pub id: u32,
    /// The cell-defining point.
    pub point: DVec2,
    /// Voronoi polygon vertices, angle-ordered, clipped to the domain.
    pub polygon: Vec<DVec2>,
    pub centroid: DVec2,
    /// Adjacent cell ids; symmetric, sorted, deduplicated.
    pub neighbors: Vec<u32>,
    /// Inside the outer border band (2% of each dimension, min 1 unit).
    pub border: bool,
    /// Elevation in [0, 1].
    pub height: f64,
    /// Owning feature id, 0 until detection runs.
    pub feature: u16,
    /// Signed coastline distance layers: +1 land coast, -1 water coast,
    /// growing away from the shore. 0 = unmarked.
    pub coast_dist: i8,
    /// Preferred water neighbor for drainage (coastal land cells).
    pub haven: Option<u32>,
    /// Number of water neighbors.
    pub harbor: u8,
    /// Mean annual temperature, whole degrees C.
    pub temperature: i8,
    /// Precipitation, 0..100.
    pub precipitation: u8,
    /// Accumulated water flux (saturating).
    pub flux: u32,
    /// Secondary-tributary flux at a confluence.
    pub confluence: u32,
    /// River occupying this cell, 0 = none.
    pub river: u16,
    /// Biome id, 0..12 (0 = Marine).
    pub biome: u8,
}

impl Cell {
    fn new(id: u32, point: DVec2) -> Self {
        Self {
            id,
            point,
            polygon: Vec::new(),
            centroid: point,
            neighbors: Vec::new(),
            border: false,
            height: 0.0,
            feature: 0,
            coast_dist: 0,
            haven: None,
            harbor: 0,
            temperature: 0,
            precipitation: 0,
            flux: 0,
            confluence: 0,
            river: 0,
            biome: 0,
        }
    }
}

/// The generated map: cell arena, features and rivers.
///
/// Mutated stage by stage during generation, then handed to callers as a
/// read-mostly snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Map {
    pub width: f64,
    pub height: f64,
    pub cells: Vec<Cell>,
    pub features: Vec<Feature>,
    pub rivers: Vec<River>,
    /// Filled by the depression resolver.
    pub depressions: Option<DepressionReport>,
    seed: String,
    water_level: f64,
    spacing: f64,
    cols: usize,
    rows: usize,
}

impl Map {
    /// Creates an empty arena for the pipeline to fill.
    pub fn new(seed: &str, width: f64, height: f64, water_level: f64) -> Self {
        Self {
            width,
            height,
            cells: Vec::new(),
            features: Vec::new(),
            rivers: Vec::new(),
            depressions: None,
            seed: seed.to_string(),
            water_level,
            spacing: 1.0,
            cols: 0,
            rows: 0,
        }
    }

    /// Builds the cell arena from a point scatter: triangulation, Voronoi
    /// polygons, neighbor sets and border flags.
    pub(crate) fn install_mesh(&mut self, scatter: PointScatter) {
        let triangulation = triangulate(&scatter.points);
        let voronoi = build_cells(&scatter.points, &triangulation, self.width, self.height);

        self.spacing = scatter.spacing;
        self.cols = scatter.cols;
        self.rows = scatter.rows;

        self.cells = scatter
            .points
            .iter()
            .zip(voronoi)
            .enumerate()
            .map(|(i, (point, vc))| {
                let mut cell = Cell::new(i as u32, *point);
                cell.polygon = vc.polygon;
                cell.centroid = vc.centroid;
                cell.neighbors = vc.neighbors;
                cell.border = self.in_border_band(*point);
                cell
            })
            .collect();
    }

    /// Uniform 4-connected unit grid, used by tests and scenario
    /// reproduction; sculpting and hydrology run on it unchanged.
    pub fn uniform_grid(seed: &str, cols: usize, rows: usize, water_level: f64) -> Self {
        let mut map = Self::new(seed, cols as f64, rows as f64, water_level);
        map.cols = cols;
        map.rows = rows;
        map.spacing = 1.0;

        map.cells = (0..cols * rows)
            .map(|i| {
                let col = i % cols;
                let row = i / cols;
                let (x, y) = (col as f64, row as f64);
                let mut cell = Cell::new(i as u32, DVec2::new(x + 0.5, y + 0.5));
                cell.polygon = vec![
                    DVec2::new(x, y),
                    DVec2::new(x + 1.0, y),
                    DVec2::new(x + 1.0, y + 1.0),
                    DVec2::new(x, y + 1.0),
                ];
                let mut neighbors = Vec::with_capacity(4);
                if col > 0 {
                    neighbors.push((i - 1) as u32);
                }
                if col + 1 < cols {
                    neighbors.push((i + 1) as u32);
                }
                if row > 0 {
                    neighbors.push((i - cols) as u32);
                }
                if row + 1 < rows {
                    neighbors.push((i + cols) as u32);
                }
                neighbors.sort_unstable();
                cell.neighbors = neighbors;
                cell.border = map.in_border_band(cell.point);
                cell
            })
            .collect();
        map
    }

    fn in_border_band(&self, p: DVec2) -> bool {
        let bx = (self.width * 0.02).max(1.0);
        let by = (self.height * 0.02).max(1.0);
        p.x < bx || p.x > self.width - bx || p.y < by || p.y > self.height - by
    }

    /// Nearest cell to a domain position, via the underlying grid.
    pub fn cell_at(&self, x: f64, y: f64) -> Option<u32> {
        if self.cells.is_empty() || self.cols == 0 || self.rows == 0 {
            return None;
        }
        let col = ((x / self.spacing) as isize).clamp(0, self.cols as isize - 1) as usize;
        let row = ((y / self.spacing) as isize).clamp(0, self.rows as isize - 1) as usize;
        Some((row * self.cols + col) as u32)
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Land/water threshold in [0, 1].
    pub fn water_level(&self) -> f64 {
        self.water_level
    }

    /// Columns in the point scatter's lookup lattice.
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn is_land(&self, id: u32) -> bool {
        self.cells[id as usize].height >= self.water_level
    }

    pub fn neighbors_of(&self, id: u32) -> &[u32] {
        &self.cells[id as usize].neighbors
    }

    /// Looks up a feature by its 1-based id.
    pub fn feature(&self, id: u16) -> Option<&Feature> {
        if id == 0 {
            return None;
        }
        self.features.get(usize::from(id) - 1)
    }

    pub(crate) fn feature_mut(&mut self, id: u16) -> Option<&mut Feature> {
        if id == 0 {
            return None;
        }
        self.features.get_mut(usize::from(id) - 1)
    }

    /// Looks up a river by id (ids are sparse after short-river discard).
    pub fn river(&self, id: u16) -> Option<&River> {
        if id == 0 {
            return None;
        }
        self.rivers.iter().find(|r| r.id == id)
    }

    pub fn land_cell_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| c.height >= self.water_level)
            .count()
    }

    /// Derived preview color for a cell: biome palette shaded by elevation
    /// on land, depth-shaded blue over water. Not authoritative data.
    pub fn cell_color(&self, id: u32) -> [u8; 3] {
        let cell = &self.cells[id as usize];
        if cell.height < self.water_level {
            let depth = f64::from((-i16::from(cell.coast_dist)).clamp(1, 10)) / 10.0;
            let shallow = [116.0, 167.0, 205.0];
            let deep = [28.0, 69.0, 119.0];
            let mut out = [0u8; 3];
            for (o, (s, d)) in out.iter_mut().zip(shallow.iter().zip(&deep)) {
                *o = (s + (d - s) * depth) as u8;
            }
            return out;
        }
        let base = Biome::from_id(cell.biome).color();
        let relief = (cell.height - self.water_level) / (1.0 - self.water_level).max(1e-9);
        let shade = 1.0 - relief * 0.45;
        [
            (f64::from(base[0]) * shade) as u8,
            (f64::from(base[1]) * shade) as u8,
            (f64::from(base[2]) * shade) as u8,
        ]
    }
}
