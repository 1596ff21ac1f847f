//! Crate-level error taxonomy.
//!
//! These are distinct from the per-point [`crate::cc::Flags`] bitset: a
//! `ConfigError` or `TessellationError` aborts the whole run before any
//! per-point work starts, while a per-point flag describes a partial, still
//! useful result for one point among many.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("grid resolution must be at least 1")]
    ZeroGridResolution,
    #[error("cc_p_maxsize must be in 1..=255, got {0}")]
    InvalidPlaneCapacity(usize),
    #[error("cc_t_maxsize must be at least 1")]
    ZeroTriangleCapacity,
    #[error("k must be at least 1 for a non-empty point set")]
    ZeroK,
    #[error("point ({x}, {y}, {z}) is outside the open unit cube")]
    PointOutOfBounds { x: f32, y: f32, z: f32 },
}

#[derive(Debug, Error)]
pub enum TessellationError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("point set is empty")]
    EmptyPointSet,
}
