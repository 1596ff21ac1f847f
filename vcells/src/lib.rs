//! Direct-neighbor Voronoi tessellation of 3D point clouds.
//!
//! Given a set of points confined to the open unit cube, [`tessellate`]
//! computes, for every point, the indices of the other points whose
//! Voronoi cell shares a face of positive area with it — its *direct
//! neighbors* — by clipping an initial cube cell against the bisector
//! planes of a grid-accelerated k-nearest-neighbor candidate set.
//!
//! ```no_run
//! use vcells::{Config, Point3};
//!
//! let points = vec![
//!     Point3::new(0.1, 0.1, 0.1),
//!     Point3::new(0.9, 0.1, 0.1),
//!     Point3::new(0.5, 0.9, 0.5),
//! ];
//! let config = Config::default();
//! let (adjacency, stats) = vcells::tessellate(points, config).unwrap();
//! println!("{} points, {} fatal", stats.n_points, stats.n_fatal());
//! for neighbors in adjacency.iter() {
//!     println!("{:?}", neighbors);
//! }
//! ```

pub mod adjacency;
pub mod backend;
pub mod cc;
pub mod config;
pub mod error;
pub mod grid;
pub mod ids;
pub mod knn;
pub mod point;

pub use adjacency::Adjacency;
pub use backend::{Backend, Stats};
pub use config::{Builder, Config, DeviceKind};
pub use error::{ConfigError, TessellationError};
pub use ids::PointId;
pub use point::Point3;

/// Validates `points`/`config` and sorts `points` into grid order, the
/// shared prelude of both [`tessellate`] and [`tessellate_with`].
fn prepare(
    points: Vec<point::Point3>,
    config: &mut Config,
) -> Result<grid::SortedGrid, TessellationError> {
    config.validate()?;
    if points.is_empty() {
        return Err(TessellationError::EmptyPointSet);
    }
    point::validate_all(&points)?;
    config.resolve_k(points.len());
    config.validate()?;
    Ok(grid::sort(points, config.knn_grid_resolution))
}

/// Tessellates `points` under `config`, dispatching to the host or device
/// backend per `config.device`. Points are consumed and internally sorted
/// into grid order; the returned [`Adjacency`] is indexed by the *sorted*
/// order, not the caller's input order (the sort permutation is not
/// exposed).
pub fn tessellate(
    points: Vec<point::Point3>,
    mut config: Config,
) -> Result<(Adjacency, Stats), TessellationError> {
    let sorted = prepare(points, &mut config)?;
    Ok(match config.device {
        DeviceKind::Cpu => backend::host::HostBackend.run(&sorted, &config),
        DeviceKind::Gpu => backend::device::DeviceBackend.run(&sorted, &config),
    })
}

/// Same as [`tessellate`], but calls `report(points_done)` periodically
/// during the host backend's per-point loop — the feature-agnostic
/// counterpart of [`tessellate_with`] for callers that don't want the
/// `indicatif` dependency. The device backend (an in-process emulation,
/// see `backend::device`) has no comparable worker-pool loop to sample
/// and reports only once, at completion.
pub fn tessellate_reporting(
    points: Vec<point::Point3>,
    mut config: Config,
    report: Option<&dyn Fn(u64)>,
) -> Result<(Adjacency, Stats), TessellationError> {
    let sorted = prepare(points, &mut config)?;
    Ok(match config.device {
        DeviceKind::Cpu => backend::host::HostBackend.run_inner(&sorted, &config, report),
        DeviceKind::Gpu => {
            let result = backend::device::DeviceBackend.run(&sorted, &config);
            if let Some(report) = report {
                report(sorted.points.len() as u64);
            }
            result
        }
    })
}

/// Same as [`tessellate`], but drives `progress` (when given) through the
/// run. Only the host backend updates the bar incrementally; the device
/// backend (an in-process emulation, see `backend::device`) finishes it
/// immediately since it has no comparable worker-pool loop to sample.
#[cfg(feature = "indicatif")]
pub fn tessellate_with(
    points: Vec<point::Point3>,
    mut config: Config,
    progress: Option<indicatif::ProgressBar>,
) -> Result<(Adjacency, Stats), TessellationError> {
    let sorted = prepare(points, &mut config)?;
    Ok(match config.device {
        DeviceKind::Cpu => {
            backend::host::HostBackend.run_with_progress(&sorted, &config, progress.as_ref())
        }
        DeviceKind::Gpu => {
            let result = backend::device::DeviceBackend.run(&sorted, &config);
            if let Some(bar) = &progress {
                bar.set_length(sorted.points.len() as u64);
                bar.finish();
            }
            result
        }
    })
}
