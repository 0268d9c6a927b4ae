//! Revision graph inconsistencies

use crate::location::RevIdx;

/// Structural problems in the revision graph store
///
/// These are fatal for whatever is traversing the graph at the time: one
/// lineage tree while linking, one branch while validating.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// A parent index points outside the store
    #[error("revision {index} referenced by revision {referenced_by} is missing")]
    MissingRevision {
        /// Missing index
        index: RevIdx,
        /// Revision naming it as a parent
        referenced_by: RevIdx,
    },

    /// Revision indices must be topologically ordered
    #[error("revision {child} lists parent {parent}, which is not an earlier revision")]
    ParentNotEarlier {
        /// Revision listing the parent
        child: RevIdx,
        /// Offending parent index
        parent: RevIdx,
    },

    /// A branch head points outside the store
    #[error("branch '{branch}' points at missing revision {index}")]
    DanglingBranchHead {
        /// Branch name
        branch: String,
        /// Head index outside the store
        index: RevIdx,
    },

    /// Revision requested directly (e.g. a branch head) does not exist
    #[error("revision {0} does not exist")]
    UnknownRevision(RevIdx),

    /// History document could not be decoded
    #[error("malformed history document: {0}")]
    Decode(#[from] serde_json::Error),
}

impl HistoryError {
    /// Revision at which the inconsistency was observed
    #[must_use]
    pub fn revision(&self) -> Option<RevIdx> {
        match self {
            Self::MissingRevision { referenced_by, .. } => Some(*referenced_by),
            Self::ParentNotEarlier { child, .. } => Some(*child),
            Self::DanglingBranchHead { index, .. } | Self::UnknownRevision(index) => Some(*index),
            Self::Decode(_) => None,
        }
    }
}
