//! Validation errors
//!
//! Per-record mismatches are not errors: they are counted and reported
//! through the diagnostic stream. The errors here abort one branch run.

use crate::run::RunState;
use lineage_history::{HistoryError, RevIdx};

/// Failures of the AST snapshot collaborator
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// No snapshot is available for the head
    #[error("no live snapshot for revision {0}")]
    UnknownHead(RevIdx),

    /// Traversal of a snapshot file failed
    #[error("snapshot traversal failed: {0}")]
    Traversal(String),
}

/// Errors that abort the validation of one branch
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// Revision graph inconsistency met during the ancestor walk
    #[error("graph inconsistency: {0}")]
    Graph(#[from] HistoryError),

    /// Ground truth could not be collected
    #[error("snapshot collection failed: {0}")]
    Snapshot(#[from] SnapshotError),

    /// Run advanced out of order
    #[error("illegal run transition {from:?} -> {to:?}")]
    IllegalTransition {
        /// Current state
        from: RunState,
        /// Requested state
        to: RunState,
    },

    /// Branch filter names a branch the store does not have
    #[error("unknown branch '{0}'")]
    UnknownBranch(String),
}
