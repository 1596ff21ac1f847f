//! Multi-threaded host backend.
//!
//! The point range is split into contiguous chunks of roughly `N / W`
//! points (`W` from `cpu_nthreads`, or every logical CPU via `num_cpus`
//! when unset). Per-chunk scratch (`CellState` + `KnnScratch`) is pulled
//! from a `Mutex<Vec<_>>` pool and returned when the chunk finishes.
//!
//! When `config.use_chunking` is set, the point range is additionally
//! sliced into outer batches of `config.chunksize`, processed one after
//! another (each batch still parallelized across workers internally) —
//! standing in for a pipelined host/device memory transfer batching
//! scheme, which this single-address-space backend has no transfer to
//! pipeline but still exercises as a distinct code path. When
//! `config.use_recompute` is set, points that overflowed their plane or
//! triangle capacity are retried once with doubled capacities.

use std::sync::atomic::{self, AtomicUsize};

use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::adjacency::{Adjacency, Builder as AdjacencyBuilder};
use crate::backend::{Backend, Stats};
use crate::cc::{CellResult, CellState, Flags};
use crate::config::Config;
use crate::grid::SortedGrid;
use crate::ids::PointId;
use crate::knn::{self, KnnScratch};
use crate::point::Point3;

#[derive(Default)]
pub struct HostBackend;

type Scratch = (CellState, KnnScratch);

/// A count-of-points-completed reporter, decoupled from any particular
/// progress-bar crate so the per-point loop itself never needs to know
/// about `indicatif`; [`Backend::run_with_progress`] is the only place
/// that bridges the two.
pub(crate) type Reporter<'a> = &'a dyn Fn(u64);

fn workers_for(config: &Config) -> usize {
    if config.cpu_nthreads == 0 {
        num_cpus::get()
    } else {
        config.cpu_nthreads
    }
    .max(1)
}

/// Runs the per-point pipeline over `results` (a sub-range of `grid`'s
/// sorted points starting at `start`), using plane/triangle capacities
/// `p_max`/`t_max` (distinct from `config`'s so a recompute pass can
/// inflate them for a retry without touching the first pass).
#[allow(clippy::too_many_arguments)]
fn run_range(
    grid: &SortedGrid,
    k: usize,
    p_max: usize,
    t_max: usize,
    workers: usize,
    start: usize,
    results: &mut [CellResult],
    done: &AtomicUsize,
    report: Option<Reporter>,
) {
    let n = results.len();
    if n == 0 {
        return;
    }
    let chunk_size = ((n + workers - 1) / workers).max(1);
    let pool: Mutex<Vec<Scratch>> = Mutex::new(Vec::new());

    results
        .par_chunks_mut(chunk_size)
        .enumerate()
        .for_each(|(chunk_idx, chunk)| {
            let chunk_start = start + chunk_idx * chunk_size;
            let mut scratch = pool
                .lock()
                .pop()
                .unwrap_or_else(|| (CellState::new(p_max, t_max, k), KnnScratch::new(k)));

            for (offset, slot) in chunk.iter_mut().enumerate() {
                let i = chunk_start + offset;
                let (_dist, ids) = knn::search(grid, i, k, &mut scratch.1);
                let neighbor_points: Vec<Point3> =
                    ids.iter().map(|id| grid.points[id.0 as usize]).collect();
                *slot = scratch
                    .0
                    .clip(PointId(i as u32), &grid.points[i], &neighbor_points, ids);

                if let Some(report) = report {
                    let value = done.fetch_add(1, atomic::Ordering::Relaxed);
                    if value % 1000 == 0 {
                        report(value as u64);
                    }
                }
            }

            pool.lock().push(scratch);
        });
}

fn tally(results: &[CellResult], stats: &mut Stats) {
    for result in results {
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
    }
}

impl HostBackend {
    pub(crate) fn run_inner(
        &self,
        grid: &SortedGrid,
        config: &Config,
        report: Option<Reporter>,
    ) -> (Adjacency, Stats) {
        let n = grid.points.len();
        if n == 0 {
            return (Adjacency::default(), Stats::default());
        }
        let k = config.k.min(n - 1).max(1);
        let workers = workers_for(config);

        let mut results: Vec<CellResult> = (0..n)
            .map(|_| CellResult {
                neighbors: Vec::new(),
                flags: Flags::new(),
            })
            .collect();

        let done = AtomicUsize::new(0);
        let batch_size = if config.use_chunking {
            config.chunksize.max(1)
        } else {
            n
        };
        let mut batch_start = 0;
        while batch_start < n {
            let batch_end = (batch_start + batch_size).min(n);
            run_range(
                grid,
                k,
                config.cc_p_maxsize,
                config.cc_t_maxsize,
                workers,
                batch_start,
                &mut results[batch_start..batch_end],
                &done,
                report,
            );
            batch_start = batch_end;
        }

        let mut stats = Stats {
            n_points: n,
            ..Default::default()
        };
        tally(&results, &mut stats);

        if config.use_recompute && stats.n_fatal() > 0 {
            let fatal: Vec<usize> = results
                .iter()
                .enumerate()
                .filter(|(_, r)| r.flags.is_fatal())
                .map(|(i, _)| i)
                .collect();
            warn!(
                n_fatal = fatal.len(),
                "retrying overflowed points with doubled capacities"
            );
            let retry_p = (config.cc_p_maxsize * 2).min(255);
            let retry_t = config.cc_t_maxsize * 2;
            let mut retried: Vec<CellResult> = fatal
                .iter()
                .map(|_| CellResult {
                    neighbors: Vec::new(),
                    flags: Flags::new(),
                })
                .collect();

            retried
                .par_iter_mut()
                .zip(fatal.par_iter())
                .for_each(|(slot, &i)| {
                    let mut cell = CellState::new(retry_p, retry_t, k);
                    let mut knn_scratch = KnnScratch::new(k);
                    let (_dist, ids) = knn::search(grid, i, k, &mut knn_scratch);
                    let neighbor_points: Vec<Point3> =
                        ids.iter().map(|id| grid.points[id.0 as usize]).collect();
                    *slot = cell.clip(PointId(i as u32), &grid.points[i], &neighbor_points, ids);
                });

            for (&i, retried_result) in fatal.iter().zip(retried.into_iter()) {
                results[i] = retried_result;
            }
            stats = Stats {
                n_points: n,
                ..Default::default()
            };
            tally(&results, &mut stats);
        }

        let mut builder = AdjacencyBuilder::with_capacity(n, n * k.min(16));
        for result in &results {
            builder.push_point(&result.neighbors);
        }

        info!(
            n_points = n,
            n_fatal = stats.n_fatal(),
            workers,
            "host tessellation pass complete"
        );

        (builder.build(), stats)
    }
}

impl Backend for HostBackend {
    fn run(&self, grid: &SortedGrid, config: &Config) -> (Adjacency, Stats) {
        self.run_inner(grid, config, None)
    }

    #[cfg(feature = "indicatif")]
    fn run_with_progress(
        &self,
        grid: &SortedGrid,
        config: &Config,
        progress: Option<&indicatif::ProgressBar>,
    ) -> (Adjacency, Stats) {
        match progress {
            Some(bar) => {
                bar.set_length(grid.points.len() as u64);
                bar.set_message("tessellating");
                let report = |value: u64| bar.set_position(value);
                let result = self.run_inner(grid, config, Some(&report));
                bar.finish();
                result
            }
            None => self.run_inner(grid, config, None),
        }
    }
}
