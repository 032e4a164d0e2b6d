//! Incremental Delaunay triangulation (Bowyer-Watson).

use std::collections::BTreeMap;

use glam::DVec2;

/// Denominator guard for the circumcenter closed form. Triangles flatter
/// than this are treated as degenerate: they never report circumcircle
/// containment, so a near-collinear insertion degrades instead of raising.
const DEGENERATE_EPS: f64 = 1e-9;

/// A triangle over point indices, with its circumcircle precomputed.
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub a: usize,
    pub b: usize,
    pub c: usize,
    pub circumcenter: DVec2,
    circumradius_sq: f64,
}

impl Triangle {
    fn new(a: usize, b: usize, c: usize, verts: &[DVec2]) -> Self {
        let pa = verts[a];
        let pb = verts[b] - pa;
        let pc = verts[c] - pa;

        let d = 2.0 * (pb.x * pc.y - pb.y * pc.x);
        if d.abs() < DEGENERATE_EPS {
            return Self {
                a,
                b,
                c,
                circumcenter: pa,
                circumradius_sq: -1.0,
            };
        }

        let b2 = pb.length_squared();
        let c2 = pc.length_squared();
        let ux = (pc.y * b2 - pb.y * c2) / d;
        let uy = (pb.x * c2 - pc.x * b2) / d;
        let center = pa + DVec2::new(ux, uy);

        Self {
            a,
            b,
            c,
            circumcenter: center,
            circumradius_sq: DVec2::new(ux, uy).length_squared(),
        }
    }

    /// True when `p` lies strictly inside the circumcircle. Degenerate
    /// triangles always answer false.
    #[inline]
    fn circumcircle_contains(&self, p: DVec2) -> bool {
        self.circumradius_sq >= 0.0
            && (p - self.circumcenter).length_squared() < self.circumradius_sq
    }

    fn touches(&self, first_synthetic: usize) -> bool {
        self.a >= first_synthetic || self.b >= first_synthetic || self.c >= first_synthetic
    }

    fn edges(&self) -> [(usize, usize); 3] {
        [(self.a, self.b), (self.b, self.c), (self.c, self.a)]
    }
}

/// Triangulation output: triangles index the original point slice and carry
/// their circumcenters (the Voronoi vertices of the dual).
#[derive(Debug, Clone, Default)]
pub struct Triangulation {
    pub triangles: Vec<Triangle>,
}

/// Triangulates `points` incrementally.
///
/// A super-triangle built from the bounding box inflated by a large multiple
/// of its diagonal hosts the insertions; its vertices are appended after the
/// real points, so surviving triangles already carry original indices.
/// Fewer than 3 points yields an empty triangulation.
pub fn triangulate(points: &[DVec2]) -> Triangulation {
    let n = points.len();
    if n < 3 {
        return Triangulation::default();
    }

    let mut min = points[0];
    let mut max = points[0];
    for p in &points[1..] {
        min = min.min(*p);
        max = max.max(*p);
    }
    let diag = (max - min).length().max(1.0);
    let mid = (min + max) * 0.5;

    let mut verts = points.to_vec();
    verts.push(DVec2::new(mid.x - 20.0 * diag, mid.y - diag));
    verts.push(DVec2::new(mid.x, mid.y + 20.0 * diag));
    verts.push(DVec2::new(mid.x + 20.0 * diag, mid.y - diag));

    // BTreeMap keeps the cavity walk order independent of hasher state, so
    // triangle order (and everything derived from it) is reproducible.
    let mut triangles = vec![Triangle::new(n, n + 1, n + 2, &verts)];
    let mut cavity: BTreeMap<(usize, usize), u32> = BTreeMap::new();

    for i in 0..n {
        let p = verts[i];

        // Cavity boundary: edges used by exactly one bad triangle.
        cavity.clear();
        let mut kept = Vec::with_capacity(triangles.len());
        for tri in triangles.drain(..) {
            if tri.circumcircle_contains(p) {
                for (u, v) in tri.edges() {
                    let key = if u < v { (u, v) } else { (v, u) };
                    *cavity.entry(key).or_insert(0) += 1;
                }
            } else {
                kept.push(tri);
            }
        }
        triangles = kept;

        for (&(u, v), &count) in &cavity {
            if count == 1 {
                triangles.push(Triangle::new(u, v, i, &verts));
            }
        }
    }

    triangles.retain(|t| !t.touches(n));
    Triangulation { triangles }
}
