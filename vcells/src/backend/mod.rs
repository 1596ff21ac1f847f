//! Host/device dispatch. Both backends run the identical per-point
//! convex-cell algorithm (`crate::cc::CellState::clip`); they differ only in
//! how work is chunked across point ranges and, for the device backend, in
//! staging output through the structure-of-arrays layout a real SIMT kernel
//! would use. See DESIGN.md for why there is no actual accelerator dispatch.

pub mod device;
pub mod host;

use crate::adjacency::Adjacency;
use crate::config::Config;
use crate::grid::SortedGrid;

/// Aggregate statistics over a completed run, used by the CLI's exit-code
/// policy and by `use_recompute` retry logic.
#[derive(Clone, Copy, Debug, Default)]
pub struct Stats {
    pub n_points: usize,
    pub n_security_radius_reached: usize,
    pub n_p_overflow: usize,
    pub n_t_overflow: usize,
    pub n_infinite_boundary: usize,
}

impl Stats {
    pub fn n_fatal(&self) -> usize {
        self.n_p_overflow + self.n_t_overflow + self.n_infinite_boundary
    }

    pub fn success_fraction(&self) -> f64 {
        if self.n_points == 0 {
            return 1.0;
        }
        1.0 - (self.n_fatal() as f64 / self.n_points as f64)
    }
}

/// A capability to compute the direct-neighbor adjacency of a sorted point
/// set under some `Config`.
pub trait Backend {
    fn run(&self, grid: &SortedGrid, config: &Config) -> (Adjacency, Stats);

    /// Same as [`Self::run`], but reports progress on `progress` every 1000
    /// points. The default implementation ignores `progress` and simply
    /// delegates to `run`; only [`host::HostBackend`] threads it through the
    /// per-point loop.
    #[cfg(feature = "indicatif")]
    fn run_with_progress(
        &self,
        grid: &SortedGrid,
        config: &Config,
        progress: Option<&indicatif::ProgressBar>,
    ) -> (Adjacency, Stats) {
        let _ = progress;
        self.run(grid, config)
    }
}
