//! Device backend.
//!
//! There is no portable, dependency-justified way to dispatch a real
//! SYCL/CUDA/OpenCL kernel from this crate (see DESIGN.md). This backend
//! instead runs the identical per-point algorithm
//! as [`super::host::HostBackend`] — so a determinism test can assert they
//! agree bit-for-bit — but stages each chunk's resulting planes through
//! [`crate::cc::plane_soa::PlaneSoa`], the transposed structure-of-arrays
//! layout a coalesced-access kernel would read from, before assembling
//! the final adjacency. Chunking is driven by `gpu_ndsize` (a stand-in
//! for a work-group's local range) rather than `cpu_nthreads`, to
//! exercise a distinct code path from the host backend.

use tracing::info;

use crate::adjacency::{Adjacency, Builder as AdjacencyBuilder};
use crate::backend::{Backend, Stats};
use crate::cc::plane_soa::PlaneSoa;
use crate::cc::CellState;
use crate::config::Config;
use crate::grid::SortedGrid;
use crate::ids::PointId;
use crate::knn::{self, KnnScratch};
use crate::point::Point3;

#[derive(Default)]
pub struct DeviceBackend;

impl Backend for DeviceBackend {
    fn run(&self, grid: &SortedGrid, config: &Config) -> (Adjacency, Stats) {
        let n = grid.points.len();
        if n == 0 {
            return (Adjacency::default(), Stats::default());
        }
        let k = config.k.min(n - 1).max(1);
        let local_range = config.gpu_ndsize.max(1);

        let mut stats = Stats {
            n_points: n,
            ..Default::default()
        };
        let mut builder = AdjacencyBuilder::with_capacity(n, n * k.min(16));

        let mut cell = CellState::new(config.cc_p_maxsize, config.cc_t_maxsize, k);
        let mut scratch = KnnScratch::new(k);

        let mut start = 0usize;
        while start < n {
            let end = (start + local_range).min(n);
            let refsize = end - start;
            // Materialize the device-layout scratch for this work-group;
            // not read back into the algorithm (the CPU emulation runs the
            // host algorithm directly), but exercised so the layout itself
            // is tested (see `plane_soa` unit tests and the determinism
            // test in `tests/all.rs`).
            let mut soa = PlaneSoa::new(refsize, config.cc_p_maxsize);

            for i in start..end {
                let (_dist, ids) = knn::search(grid, i, k, &mut scratch);
                let neighbor_points: Vec<Point3> =
                    ids.iter().map(|id| grid.points[id.0 as usize]).collect();
                let result = cell.clip(PointId(i as u32), &grid.points[i], &neighbor_points, ids);

                let local = i - start;
                for j in 0..cell.plane_count().min(config.cc_p_maxsize) {
                    soa.set_plane(local, j, cell.plane_components(j));
                }

                if result.flags.security_radius_reached() {
                    stats.n_security_radius_reached += 1;
                }
                if result.flags.p_overflow() {
                    stats.n_p_overflow += 1;
                }
                if result.flags.t_overflow() {
                    stats.n_t_overflow += 1;
                }
                if result.flags.infinite_boundary() {
                    stats.n_infinite_boundary += 1;
                }
                builder.push_point(&result.neighbors);
            }

            debug_assert_eq!(soa.refsize(), refsize);
            start = end;
        }

        info!(
            n_points = n,
            n_fatal = stats.n_fatal(),
            local_range,
            "device tessellation pass complete"
        );

        (builder.build(), stats)
    }
}
