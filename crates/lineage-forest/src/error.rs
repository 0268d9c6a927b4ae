//! Linking and build errors

use crate::tree::TreeId;
use lineage_history::{ElementKind, HistoryError, Location, RevIdx};

/// Reasons a lineage tree cannot be linked
///
/// All of these are local to one tree: the builder discards the tree,
/// counts the failure and moves on to the next seed.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// More than one equally valid predecessor on one parent side
    #[error("record {location} has {} candidate predecessors", candidates.len())]
    Ambiguous {
        /// Record being linked
        location: Location,
        /// Matching records, newest first
        candidates: Vec<Location>,
    },

    /// Record claims to exist in a parent but no predecessor was found
    #[error("record {location} has no predecessor towards parent {parent:?}")]
    MissingPredecessor {
        /// Record being linked
        location: Location,
        /// Parent searched; `None` for a root revision
        parent: Option<RevIdx>,
    },

    /// Predecessor belongs to a tree the seed cannot join
    #[error("record {location} is already claimed by tree {tree}")]
    AlreadyClaimed {
        /// Predecessor record
        location: Location,
        /// Tree owning it
        tree: TreeId,
    },

    /// Enclosing record has no lineage, so identity cannot be scoped
    #[error("record {location} has an enclosing record without lineage")]
    DetachedScope {
        /// Record being linked
        location: Location,
    },

    /// Location does not resolve to a record of the forest's kind
    #[error("no record at {0}")]
    UnknownRecord(Location),

    /// Revision graph inconsistency met while linking
    #[error(transparent)]
    Graph(#[from] HistoryError),
}

/// Errors that stop a whole forest build
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Forest requested before the forest scoping it
    #[error("{kind} forest requires the {requires} forest to be built first")]
    ScopeNotBuilt {
        /// Forest requested
        kind: ElementKind,
        /// Forest that must exist first
        requires: ElementKind,
    },
}
