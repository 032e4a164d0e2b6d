//! Planar mesh geometry: point scatter, Delaunay triangulation and the
//! Voronoi dual the generator runs on.
//!
//! The mesh is built once per generation: jittered grid points are
//! triangulated incrementally, then each point's incident circumcenters form
//! its Voronoi cell. Everything downstream (heights, features, rivers,
//! biomes) operates on cell ids and the neighbor graph produced here.

pub mod delaunay;
pub mod points;
pub mod voronoi;

pub use delaunay::{Triangle, Triangulation, triangulate};
pub use points::{PointScatter, jittered_grid};
pub use voronoi::{VoronoiCell, build_cells};
