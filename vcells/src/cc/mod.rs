//! The convex-cell clipping engine: the computational heart of the crate.
//!
//! Each point's Voronoi cell starts as the unit cube and is clipped, one
//! candidate neighbor at a time, by the bisector plane of that neighbor.
//! [`CellState`] owns the fixed-capacity per-point scratch (planes,
//! triangles, boundary cycle, flags), reused across points via a pool
//! (`backend::host`/`backend::device`) instead of allocated fresh.

pub mod boundary;
pub mod flags;
pub mod geometry;
pub mod plane_soa;

use tracing::trace;

use crate::ids::{PlaneId, PointId};
use crate::point::Point3;

pub use flags::Flags;
use geometry::{bisector, intersect, security_radius_reached, security_radius_update, Plane, Vertex};

/// The six unit-cube half-spaces.
const INITIAL_PLANES: [Plane; 6] = [
    Plane([1.0, 0.0, 0.0, 0.0]),
    Plane([-1.0, 0.0, 0.0, 1.0]),
    Plane([0.0, 1.0, 0.0, 0.0]),
    Plane([0.0, -1.0, 0.0, 1.0]),
    Plane([0.0, 0.0, 1.0, 0.0]),
    Plane([0.0, 0.0, -1.0, 1.0]),
];

/// The eight unit-cube corner triangles, each a triple of plane indices
/// into [`INITIAL_PLANES`].
const INITIAL_TRIANGLES: [(u8, u8, u8); 8] = [
    (2, 5, 0),
    (5, 3, 0),
    (1, 5, 2),
    (5, 1, 3),
    (4, 2, 0),
    (4, 0, 3),
    (2, 4, 1),
    (4, 3, 1),
];

/// Outcome of clipping one point's cell.
pub struct CellResult {
    /// Direct-neighbor point ids, nearest-first, compacted (no sentinels).
    pub neighbors: Vec<PointId>,
    pub flags: Flags,
}

/// Fixed-capacity per-point scratch for the convex-cell engine. Reused
/// across points within a worker (see `backend::host::HostBackend`).
pub struct CellState {
    planes: Vec<Plane>,
    p_count: usize,
    p_max: usize,
    triangles: Vec<(PlaneId, PlaneId, PlaneId)>,
    t_count: usize,
    t_max: usize,
    dknn: Vec<PlaneId>,
    cycle: Vec<PlaneId>,
    flags: Flags,
}

impl CellState {
    pub fn new(p_max: usize, t_max: usize, k: usize) -> Self {
        CellState {
            planes: vec![Plane([0.0; 4]); p_max],
            p_count: 0,
            p_max,
            triangles: vec![(PlaneId::INVALID, PlaneId::INVALID, PlaneId::INVALID); t_max],
            t_count: 0,
            t_max,
            dknn: vec![PlaneId::INVALID; k],
            cycle: vec![PlaneId::INVALID; p_max],
            flags: Flags::new(),
        }
    }

    fn reset(&mut self) {
        for (i, plane) in INITIAL_PLANES.iter().enumerate() {
            self.planes[i] = *plane;
        }
        self.p_count = 6;
        for (i, &(a, b, c)) in INITIAL_TRIANGLES.iter().enumerate() {
            self.triangles[i] = (PlaneId(a), PlaneId(b), PlaneId(c));
        }
        self.t_count = 8;
        self.dknn.iter_mut().for_each(|d| *d = PlaneId::INVALID);
        self.flags = Flags::new();
    }

    /// Number of live planes after the most recent [`Self::clip`] call.
    pub fn plane_count(&self) -> usize {
        self.p_count
    }

    /// The `idx`-th plane's raw components, for staging into an SoA buffer.
    pub fn plane_components(&self, idx: usize) -> [f32; 4] {
        self.planes[idx].0
    }

    fn vertex(&self, t: (PlaneId, PlaneId, PlaneId)) -> Vertex {
        intersect(
            &self.planes[t.0.as_usize()],
            &self.planes[t.1.as_usize()],
            &self.planes[t.2.as_usize()],
        )
    }

    /// Clips the unit cube by the bisectors of `query`'s neighbors
    /// (`neighbors`/`neighbor_ids`, both nearest-first, same length),
    /// returning the compacted direct-neighbor list.
    pub fn clip(
        &mut self,
        point_index: PointId,
        query: &Point3,
        neighbors: &[Point3],
        neighbor_ids: &[PointId],
    ) -> CellResult {
        self.reset();
        let k = neighbors.len();

        'outer: for n in 0..k {
            let q = &neighbors[n];
            let h = bisector(query, q);

            // Step 2: classify current live triangles, accumulating the
            // security radius bound over every vertex visited.
            let mut s = 0.0f32;
            let mut t_size = self.t_count;
            let mut i = 0usize;
            while i < t_size {
                let t = self.triangles[i];
                let v = self.vertex(t);
                s = security_radius_update(s, query, v);
                if h.eval(v) > 0.0 {
                    t_size -= 1;
                    self.triangles.swap(i, t_size);
                } else {
                    i += 1;
                }
            }
            let r_size = self.t_count - t_size;

            // Step 3: security radius test, evaluated against this
            // neighbor's own distance to the query (the check determines
            // whether *any* remaining neighbor, starting with this one,
            // could still cut the cell; this implementation evaluates it
            // once classification for this neighbor has already run, so a
            // neighbor whose own distance trips the bound does not get its
            // candidate cut applied either -- see DESIGN.md).
            let neighbor_dist_sq = query.distance_sq(q);
            if security_radius_reached(neighbor_dist_sq, s) {
                self.flags.set_security_radius_reached();
                break 'outer;
            }

            if r_size == 0 {
                self.flags.set_nonvalid_neighbor();
                self.flags.clear_transient();
                continue;
            }

            // Step 5a: plane capacity check.
            if self.p_count >= self.p_max {
                self.flags.set_p_overflow();
                trace!(point = point_index.0, neighbor = n, "plane capacity exceeded");
                return CellResult {
                    neighbors: Vec::new(),
                    flags: self.flags,
                };
            }
            let new_plane_id = PlaneId(self.p_count as u8);
            self.planes[self.p_count] = h;
            self.p_count += 1;
            self.dknn[n] = new_plane_id;

            // Step 5c: boundary extraction over the removed triangles,
            // which occupy triangles[t_size .. t_count) after classification.
            let removed = &self.triangles[t_size..self.t_count];
            self.cycle.iter_mut().for_each(|c| *c = PlaneId::INVALID);
            let head = match boundary::compute(removed, &mut self.cycle) {
                Ok(head) => head,
                Err(boundary::Unreachable) => {
                    self.flags.set_infinite_boundary();
                    trace!(point = point_index.0, neighbor = n, "boundary extraction failed");
                    return CellResult {
                        neighbors: Vec::new(),
                        flags: self.flags,
                    };
                }
            };

            // Step 5d: stitch new triangles around the cycle, using the new
            // plane as the apex of each.
            let mut write = t_size;
            let mut cur = head;
            loop {
                let next = self.cycle[cur.as_usize()];
                if write >= self.t_max {
                    self.flags.set_t_overflow();
                    trace!(point = point_index.0, neighbor = n, "triangle capacity exceeded");
                    return CellResult {
                        neighbors: Vec::new(),
                        flags: self.flags,
                    };
                }
                self.triangles[write] = (cur, next, new_plane_id);
                write += 1;
                cur = next;
                if cur == head {
                    break;
                }
            }
            self.t_count = write;
            self.flags.clear_transient();
        }

        // Finalization: a neighbor's plane survives only if it still backs
        // some live triangle.
        let mut neighbors_out = Vec::with_capacity(k);
        for n in 0..k {
            let pid = self.dknn[n];
            if !pid.is_valid() {
                continue;
            }
            let alive = self.triangles[..self.t_count]
                .iter()
                .any(|t| t.0 == pid || t.1 == pid || t.2 == pid);
            if alive {
                neighbors_out.push(neighbor_ids[n]);
            }
        }

        CellResult {
            neighbors: neighbors_out,
            flags: self.flags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_neighbor_cuts_cell() {
        let mut state = CellState::new(32, 32, 4);
        let query = Point3::new(0.5, 0.5, 0.5);
        let neighbors = vec![
            Point3::new(0.6, 0.5, 0.5),
            Point3::new(0.5, 0.6, 0.5),
            Point3::new(0.5, 0.5, 0.6),
        ];
        let ids = vec![PointId(1), PointId(2), PointId(3)];
        let result = state.clip(PointId(0), &query, &neighbors, &ids);
        assert!(!result.flags.is_fatal());
        assert!(!result.neighbors.is_empty());
    }

    #[test]
    fn distant_neighbor_triggers_security_radius() {
        let mut state = CellState::new(32, 32, 2);
        let query = Point3::new(0.5, 0.5, 0.5);
        let neighbors = vec![Point3::new(0.51, 0.5, 0.5), Point3::new(0.99, 0.99, 0.99)];
        let ids = vec![PointId(1), PointId(2)];
        let result = state.clip(PointId(0), &query, &neighbors, &ids);
        assert!(result.flags.security_radius_reached());
    }

    #[test]
    fn capacity_overflow_is_reported_not_panicked() {
        let mut state = CellState::new(7, 10, 64);
        let query = Point3::new(0.5, 0.5, 0.5);
        let mut neighbors = Vec::new();
        let mut ids = Vec::new();
        // A ring of many neighbors around the query forces many cuts,
        // quickly exceeding a plane capacity of 7.
        for i in 0..64u32 {
            let angle = (i as f32) * 0.37;
            let r = 0.001 + (i as f32) * 0.0003;
            let x = 0.5 + r * angle.cos();
            let y = 0.5 + r * angle.sin();
            let z = 0.5 + (i as f32) * 0.0001;
            neighbors.push(Point3::new(x.clamp(0.001, 0.999), y.clamp(0.001, 0.999), z.clamp(0.001, 0.999)));
            ids.push(PointId(i + 1));
        }
        let result = state.clip(PointId(0), &query, &neighbors, &ids);
        // Either it overflows (fatal, empty result) or it completes cleanly;
        // what must never happen is a panic, which this test demonstrates
        // by reaching this point at all.
        if result.flags.is_fatal() {
            assert!(result.neighbors.is_empty());
        }
    }
}
