//! Voronoi dual of the Delaunay triangulation.

use glam::DVec2;

use super::delaunay::Triangulation;

/// Squared distance below which two Voronoi vertices collapse into one
/// (cocircular point sets produce coincident circumcenters).
const VERTEX_MERGE_EPS_SQ: f64 = 1e-12;

/// One Voronoi cell of the dual mesh.
#[derive(Debug, Clone)]
pub struct VoronoiCell {
    /// Boundary vertices, deduplicated and sorted by angle around the site.
    pub polygon: Vec<DVec2>,
    /// Area centroid of the polygon (the site itself when degenerate).
    pub centroid: DVec2,
    /// Adjacent cell ids; symmetric, sorted, deduplicated.
    pub neighbors: Vec<u32>,
}

/// Builds the Voronoi cell for every site.
///
/// Cell polygons are the circumcenters of the site's incident triangles,
/// clipped into the domain rectangle. Two cells are neighbors iff they share
/// a Delaunay edge.
pub fn build_cells(
    points: &[DVec2],
    triangulation: &Triangulation,
    width: f64,
    height: f64,
) -> Vec<VoronoiCell> {
    let n = points.len();
    let mut incident: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut neighbors: Vec<Vec<u32>> = vec![Vec::new(); n];

    for (ti, tri) in triangulation.triangles.iter().enumerate() {
        for v in [tri.a, tri.b, tri.c] {
            incident[v].push(ti);
        }
        for (u, v) in [(tri.a, tri.b), (tri.b, tri.c), (tri.c, tri.a)] {
            neighbors[u].push(v as u32);
            neighbors[v].push(u as u32);
        }
    }

    points
        .iter()
        .enumerate()
        .map(|(i, site)| {
            let mut adjacent = std::mem::take(&mut neighbors[i]);
            adjacent.sort_unstable();
            adjacent.dedup();

            let mut verts: Vec<DVec2> = Vec::with_capacity(incident[i].len());
            for &ti in &incident[i] {
                let cc = triangulation.triangles[ti].circumcenter;
                let clipped = DVec2::new(cc.x.clamp(0.0, width), cc.y.clamp(0.0, height));
                if !verts
                    .iter()
                    .any(|v| v.distance_squared(clipped) < VERTEX_MERGE_EPS_SQ)
                {
                    verts.push(clipped);
                }
            }

            let mut angled: Vec<(f64, DVec2)> = verts
                .into_iter()
                .map(|v| ((v.y - site.y).atan2(v.x - site.x), v))
                .collect();
            angled.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
            let polygon: Vec<DVec2> = angled.into_iter().map(|(_, v)| v).collect();

            VoronoiCell {
                centroid: polygon_centroid(&polygon).unwrap_or(*site),
                polygon,
                neighbors: adjacent,
            }
        })
        .collect()
}

/// Shoelace centroid; `None` for degenerate polygons.
fn polygon_centroid(polygon: &[DVec2]) -> Option<DVec2> {
    if polygon.len() < 3 {
        return None;
    }
    let mut area = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for (i, p) in polygon.iter().enumerate() {
        let q = polygon[(i + 1) % polygon.len()];
        let cross = p.x * q.y - q.x * p.y;
        area += cross;
        cx += (p.x + q.x) * cross;
        cy += (p.y + q.y) * cross;
    }
    if area.abs() < 1e-12 {
        return None;
    }
    let factor = 1.0 / (3.0 * area);
    Some(DVec2::new(cx * factor, cy * factor))
}
