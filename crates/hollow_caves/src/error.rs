//! # Cave Error Types
//!
//! All errors that can occur while scheduling, carving, or persisting.
//!
//! Degenerate geometry is deliberately absent: a zero-length or undersized
//! tunnel resolves to an empty region and never surfaces as an error.

use hollow_geometry::CellCoord;
use thiserror::Error;

/// Errors that can occur in the cave system.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaveError {
    /// A cell was queried or carved before its readiness was established.
    ///
    /// Fatal for the current pass; the cell stays pending.
    #[error("precondition violated for cell {cell}: {reason}")]
    PreconditionViolation {
        /// The cell involved.
        cell: CellCoord,
        /// What was missing.
        reason: String,
    },

    /// A cell was registered twice. The first record is kept.
    #[error("cell {0} is already known")]
    AlreadyKnown(CellCoord),

    /// Saving or loading the schedule failed. Carving is unaffected.
    #[error("persistence failure: {reason}")]
    Persistence {
        /// Underlying cause.
        reason: String,
    },

    /// A snapshot could not be decoded or violates the schedule invariants.
    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    /// Invalid configuration or palette file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CaveError {
    /// Builds a `PreconditionViolation`.
    #[must_use]
    pub fn precondition(cell: CellCoord, reason: impl Into<String>) -> Self {
        Self::PreconditionViolation {
            cell,
            reason: reason.into(),
        }
    }

    /// Returns true if the error leaves carving invariants intact.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Persistence { .. } | Self::AlreadyKnown(_))
    }
}

impl From<std::io::Error> for CaveError {
    fn from(err: std::io::Error) -> Self {
        Self::Persistence {
            reason: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for CaveError {
    fn from(err: toml::de::Error) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}

/// Result type for cave operations.
pub type CaveResult<T> = Result<T, CaveError>;
