/// Error types for the run state machine and the level catalog.
///
/// Nothing here is fatal: a rejected operation leaves the state untouched,
/// and a bad catalog is refused before a run can start.

use thiserror::Error;

use crate::sim::world::Phase;

/// A state-machine operation that was refused.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum RunError {
    #[error("`{op}` is not allowed while {phase:?}")]
    IllegalOperation { op: &'static str, phase: Phase },

    #[error("`{op}` got an invalid amount: {value}")]
    InvalidAmount { op: &'static str, value: f64 },
}

/// A level catalog that failed validation.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum CatalogError {
    #[error("catalog has no levels")]
    Empty,

    #[error("level {level}: track length must be positive, got {length}")]
    TrackLength { level: usize, length: f64 },

    #[error("level {level}: enemy `{name}` has no health")]
    EnemyHealth { level: usize, name: String },

    #[error("level {level}, gate {index}: gate values must be positive")]
    GateValue { level: usize, index: usize },

    #[error("level {level}, obstacle {index}: width must be positive")]
    ObstacleWidth { level: usize, index: usize },

    #[error("level {level}: {what} {index} at {position} lies outside the track")]
    OffTrack { level: usize, what: &'static str, index: usize, position: f64 },
}

pub type RunResult<T> = Result<T, RunError>;
