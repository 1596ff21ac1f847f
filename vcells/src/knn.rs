//! Expanding-shell k-nearest-neighbor search over a [`SortedGrid`].
//!
//! The heap is a plain fixed-capacity array (not `std::collections::BinaryHeap`)
//! because its layout is shared, unmodified, with the structure-of-arrays
//! scratch the device backend stages (see `cc::plane_soa`); the reference
//! design's `heap_pq`/`heap_id` parallel arrays are the direct ancestor of
//! this shape.

use crate::grid::SortedGrid;
use crate::ids::PointId;
use crate::point::Point3;

/// Reusable per-worker scratch for one kNN query, sized for capacity `k`.
/// Pulled from a pool and handed back between queries so a worker thread
/// never allocates mid-loop.
pub struct KnnScratch {
    heap_pq: Vec<f32>,
    heap_id: Vec<PointId>,
    capacity: usize,
}

impl KnnScratch {
    pub fn new(capacity: usize) -> Self {
        KnnScratch {
            heap_pq: vec![f32::INFINITY; capacity],
            heap_id: vec![PointId::INVALID; capacity],
            capacity,
        }
    }

    fn reset(&mut self, capacity: usize) {
        if self.capacity != capacity {
            self.heap_pq = vec![f32::INFINITY; capacity];
            self.heap_id = vec![PointId::INVALID; capacity];
            self.capacity = capacity;
        } else {
            self.heap_pq.iter_mut().for_each(|v| *v = f32::INFINITY);
            self.heap_id.iter_mut().for_each(|v| *v = PointId::INVALID);
        }
    }

    fn sift_down(&mut self, mut i: usize, size: usize) {
        loop {
            let l = 2 * i + 1;
            let r = 2 * i + 2;
            let mut largest = i;
            if l < size && self.heap_pq[l] > self.heap_pq[largest] {
                largest = l;
            }
            if r < size && self.heap_pq[r] > self.heap_pq[largest] {
                largest = r;
            }
            if largest == i {
                break;
            }
            self.heap_pq.swap(i, largest);
            self.heap_id.swap(i, largest);
            i = largest;
        }
    }

    /// Replaces the root (the current worst-of-k) with a new candidate and
    /// restores the max-heap property.
    fn replace_root(&mut self, dist: f32, id: PointId, size: usize) {
        self.heap_pq[0] = dist;
        self.heap_id[0] = id;
        self.sift_down(0, size);
    }

    /// Heap-sorts the live prefix into ascending (nearest-first) order.
    ///
    /// The insertion loop in [`search`] only builds the max-heap once `size`
    /// reaches `k`; when fewer than `k` candidates exist (`k >= N-1`) that
    /// point is never reached, so `heap_pq[..size]` may not be a heap yet.
    /// Re-heapify unconditionally first — a no-op over an already-valid heap.
    fn finalize(&mut self, size: usize) -> (&[f32], &[PointId]) {
        for i in (0..size / 2).rev() {
            self.sift_down(i, size);
        }
        for end in (1..size).rev() {
            self.heap_pq.swap(0, end);
            self.heap_id.swap(0, end);
            self.sift_down(0, end);
        }
        (&self.heap_pq[..size], &self.heap_id[..size])
    }
}

/// Finds the `k` nearest neighbors of `grid.points[query]`, returning
/// (ascending) squared distances and point ids. Skips the query point
/// itself. `scratch` is reused across calls to avoid per-query allocation.
pub fn search<'a>(
    grid: &SortedGrid,
    query: usize,
    k: usize,
    scratch: &'a mut KnnScratch,
) -> (&'a [f32], &'a [PointId]) {
    scratch.reset(k);
    let q = grid.points[query];
    let qid = grid.id[query];
    let (qx, qy, qz) = grid.cell_coords(qid);
    let g = grid.resolution as isize;
    let gl = 1.0 / grid.resolution as f32;

    let mut size = 0usize;

    // distance from the query to the three nearest cell walls of its own
    // cell, used by the shell early-exit test.
    let wall_dist = {
        let fx = q.x * grid.resolution as f32 - qx as f32;
        let fy = q.y * grid.resolution as f32 - qy as f32;
        let fz = q.z * grid.resolution as f32 - qz as f32;
        let m = |f: f32| f.min(1.0 - f) * gl;
        m(fx).min(m(fy)).min(m(fz))
    };

    for r in 0..grid.resolution {
        let r_isize = r as isize;
        let mut visited_any = false;
        for dz in -r_isize..=r_isize {
            let z = qz as isize + dz;
            if z < 0 || z >= g {
                continue;
            }
            for dy in -r_isize..=r_isize {
                let y = qy as isize + dy;
                if y < 0 || y >= g {
                    continue;
                }
                for dx in -r_isize..=r_isize {
                    let x = qx as isize + dx;
                    if x < 0 || x >= g {
                        continue;
                    }
                    // Only cells exactly at Chebyshev distance r are new
                    // this shell; interior cells were visited already.
                    if dx.abs().max(dy.abs()).max(dz.abs()) != r_isize {
                        continue;
                    }
                    visited_any = true;
                    let cell = grid.cell_id_of(x as usize, y as usize, z as usize);
                    let start = grid.offset[cell as usize] as usize;
                    let end = grid.offset[cell as usize + 1] as usize;
                    for (offset, p) in grid.points[start..end].iter().enumerate() {
                        let idx = start + offset;
                        if idx == query {
                            continue;
                        }
                        let d = q.distance_sq(p);
                        if size < k {
                            scratch.heap_pq[size] = d;
                            scratch.heap_id[size] = PointId(idx as u32);
                            size += 1;
                            if size == k {
                                // build the initial heap once full
                                for i in (0..size / 2).rev() {
                                    scratch.sift_down(i, size);
                                }
                            }
                        } else if d < scratch.heap_pq[0] {
                            scratch.replace_root(d, PointId(idx as u32), size);
                        }
                    }
                }
            }
        }
        if !visited_any && r > 0 {
            // shell fully outside grid bounds on all sides; nothing further
            // to gain from expanding (only relevant for tiny grids).
        }
        if r >= 1 && size >= k {
            let reach = gl * (r as f32 - 1.0) + wall_dist;
            if reach >= 0.0 && scratch.heap_pq[0] < reach * reach {
                break;
            }
        }
    }

    scratch.finalize(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid;

    #[test]
    fn finds_nearest_on_diagonal() {
        let points = vec![
            Point3::new(0.1, 0.1, 0.1),
            Point3::new(0.2, 0.2, 0.2),
            Point3::new(0.3, 0.3, 0.3),
            Point3::new(0.8, 0.8, 0.8),
        ];
        let sorted = grid::sort(points, 4);
        let query = sorted
            .points
            .iter()
            .position(|p| (p.x - 0.2).abs() < 1e-6)
            .unwrap();
        let mut scratch = KnnScratch::new(2);
        let (_dist, ids) = search(&sorted, query, 2, &mut scratch);
        let nearest_points: Vec<Point3> = ids.iter().map(|id| sorted.points[id.0 as usize]).collect();
        assert!(nearest_points
            .iter()
            .any(|p| (p.x - 0.1).abs() < 1e-6));
        assert!(nearest_points
            .iter()
            .any(|p| (p.x - 0.3).abs() < 1e-6));
    }

    /// When `k` exceeds the number of available candidates (`k >= N-1`),
    /// `size` never reaches `k` during the insertion loop, so the heap-build
    /// pass inside the insertion loop never runs; `finalize` must still
    /// return the candidates in nearest-first order.
    #[test]
    fn k_larger_than_available_candidates_is_still_sorted() {
        let points = vec![
            Point3::new(0.5, 0.5, 0.5),
            Point3::new(0.9, 0.5, 0.5),
            Point3::new(0.6, 0.5, 0.5),
            Point3::new(0.8, 0.5, 0.5),
        ];
        let sorted = grid::sort(points, 1);
        let query = sorted
            .points
            .iter()
            .position(|p| (p.x - 0.5).abs() < 1e-6)
            .unwrap();
        let k = sorted.points.len() - 1 + 5; // deliberately beyond N-1
        let mut scratch = KnnScratch::new(k);
        let (dist, ids) = search(&sorted, query, k, &mut scratch);
        assert_eq!(ids.len(), sorted.points.len() - 1);
        for w in dist.windows(2) {
            assert!(w[0] <= w[1], "results must be nearest-first: {dist:?}");
        }
        let nearest = sorted.points[ids[0].0 as usize];
        assert!((nearest.x - 0.6).abs() < 1e-6, "nearest should be x=0.6, got {nearest:?}");
    }

    /// After any `sift_down` the heap is a max-heap over the live prefix,
    /// for arbitrary starting arrangements and sizes.
    #[test]
    fn heap_law_holds_after_sift_down() {
        let arrangements: &[&[f32]] = &[
            &[9.0, 1.0, 8.0, 0.5, 7.0, 6.0, 2.0],
            &[1.0, 2.0, 3.0, 4.0, 5.0],
            &[5.0],
            &[3.0, 3.0, 3.0, 3.0],
            &[0.1, 0.2, 0.05, 0.3, 0.25, 0.01, 0.4, 0.15],
        ];
        for values in arrangements {
            let size = values.len();
            let mut scratch = KnnScratch::new(size.max(1));
            for (i, &v) in values.iter().enumerate() {
                scratch.heap_pq[i] = v;
                scratch.heap_id[i] = PointId(i as u32);
            }
            for i in (0..size / 2).rev() {
                scratch.sift_down(i, size);
            }
            for i in 0..size {
                let l = 2 * i + 1;
                let r = 2 * i + 2;
                if l < size {
                    assert!(
                        scratch.heap_pq[i] >= scratch.heap_pq[l],
                        "heap law violated at parent {i}, left child {l}: {:?}",
                        &scratch.heap_pq[..size]
                    );
                }
                if r < size {
                    assert!(
                        scratch.heap_pq[i] >= scratch.heap_pq[r],
                        "heap law violated at parent {i}, right child {r}: {:?}",
                        &scratch.heap_pq[..size]
                    );
                }
            }
        }
    }
}
