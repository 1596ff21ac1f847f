//! Geometry primitives used by the convex-cell engine: half-space planes,
//! their pairwise intersection into a vertex, the perpendicular bisector of
//! two points, and the security-radius bookkeeping that lets the per-point
//! loop stop early.

use crate::point::Point3;

/// A half-space `a*x + b*y + c*z + d <= 0`, stored as `(a,b,c,d)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane(pub [f32; 4]);

impl Plane {
    pub fn new(a: f32, b: f32, c: f32, d: f32) -> Self {
        Plane([a, b, c, d])
    }

    pub fn a(&self) -> f32 {
        self.0[0]
    }
    pub fn b(&self) -> f32 {
        self.0[1]
    }
    pub fn c(&self) -> f32 {
        self.0[2]
    }
    pub fn d(&self) -> f32 {
        self.0[3]
    }

    /// Evaluates `a*x + b*y + c*z + d` at vertex `v` (homogeneous, w implied 1).
    pub fn eval(&self, v: Vertex) -> f32 {
        self.0[0] * v.x + self.0[1] * v.y + self.0[2] * v.z + self.0[3]
    }
}

pub fn dot(p: &Plane, q: &Plane) -> f32 {
    p.0[0] * q.0[0] + p.0[1] * q.0[1] + p.0[2] * q.0[2] + p.0[3] * q.0[3]
}

/// A cell vertex, the intersection of three planes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vertex {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Intersects three half-space planes into a vertex.
///
/// When the triple product of the normals is (numerically) zero, the planes
/// don't meet at a unique point (e.g. two are parallel). Rather than
/// propagate a NaN/divide-by-zero, this returns the origin as a placeholder
/// vertex; the caller's classification step (`H . v > 0`) then treats it as
/// surviving the cut unless the cutting plane's own `d` is positive, which
/// is the same outcome a genuine vertex at the origin would produce. This
/// is a best-effort rule for a degenerate case excluded from exact handling
/// (no exact-arithmetic predicates), not a general proof of correctness for
/// every degenerate configuration.
pub fn intersect(p1: &Plane, p2: &Plane, p3: &Plane) -> Vertex {
    let (a1, b1, c1, d1) = (p1.a(), p1.b(), p1.c(), p1.d());
    let (a2, b2, c2, d2) = (p2.a(), p2.b(), p2.c(), p2.d());
    let (a3, b3, c3, d3) = (p3.a(), p3.b(), p3.c(), p3.d());

    // cross(normal2, normal3) and friends, via cofactor expansion.
    let n23_a = b2 * c3 - c2 * b3;
    let n23_b = c2 * a3 - a2 * c3;
    let n23_c = a2 * b3 - b2 * a3;

    let tau = a1 * n23_a + b1 * n23_b + c1 * n23_c;
    if tau == 0.0 {
        return Vertex {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        };
    }

    let n31_a = b3 * c1 - c3 * b1;
    let n31_b = c3 * a1 - a3 * c1;
    let n31_c = a3 * b1 - b3 * a1;

    let n12_a = b1 * c2 - c1 * b2;
    let n12_b = c1 * a2 - a1 * c2;
    let n12_c = a1 * b2 - b1 * a2;

    let x = -(d1 * n23_a + d2 * n31_a + d3 * n12_a) / tau;
    let y = -(d1 * n23_b + d2 * n31_b + d3 * n12_b) / tau;
    let z = -(d1 * n23_c + d2 * n31_c + d3 * n12_c) / tau;

    Vertex { x, y, z }
}

/// The bisector plane of segment `p q`, oriented so that `p` lies in the
/// `<= 0` half-space. The spec's literal formula (`a=x1-x2`, `d=-Σ(xi²-xj²)/2`)
/// puts `p` on the `> 0` side instead, contradicting its own prose; this is
/// that formula negated so `H·p <= 0` actually holds.
pub fn bisector(p: &Point3, q: &Point3) -> Plane {
    let a = q.x - p.x;
    let b = q.y - p.y;
    let c = q.z - p.z;
    let d = ((p.x * p.x - q.x * q.x) + (p.y * p.y - q.y * q.y) + (p.z * p.z - q.z * q.z)) / 2.0;
    Plane::new(a, b, c, d)
}

/// Updates the running security radius bound given a newly visited vertex.
pub fn security_radius_update(current: f32, query: &Point3, v: Vertex) -> f32 {
    let dx = query.x - v.x;
    let dy = query.y - v.y;
    let dz = query.z - v.z;
    let dist_sq = dx * dx + dy * dy + dz * dz;
    current.max(dist_sq)
}

/// True once the next neighbor's squared distance can no longer possibly
/// cut the cell, i.e. `|pq|^2 > 4*s`.
pub fn security_radius_reached(neighbor_dist_sq: f32, s: f32) -> bool {
    neighbor_dist_sq > 4.0 * s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_corner_intersection() {
        // Three of the unit cube's six faces meeting at the origin corner.
        let px = Plane::new(-1.0, 0.0, 0.0, 0.0); // x <= 0 side, i.e. -x <= 0 => x>=0 boundary at x=0
        let py = Plane::new(0.0, -1.0, 0.0, 0.0);
        let pz = Plane::new(0.0, 0.0, -1.0, 0.0);
        let v = intersect(&px, &py, &pz);
        assert!((v.x).abs() < 1e-6);
        assert!((v.y).abs() < 1e-6);
        assert!((v.z).abs() < 1e-6);
    }

    #[test]
    fn bisector_midpoint_is_on_plane() {
        let p = Point3::new(0.2, 0.2, 0.2);
        let q = Point3::new(0.4, 0.2, 0.2);
        let h = bisector(&p, &q);
        let mid = Vertex {
            x: 0.3,
            y: 0.2,
            z: 0.2,
        };
        assert!(h.eval(mid).abs() < 1e-5);
        // p itself should be on the <= 0 side (strictly negative since p != midpoint)
        assert!(
            h.eval(Vertex {
                x: p.x,
                y: p.y,
                z: p.z
            }) <= 1e-6
        );
    }
}
