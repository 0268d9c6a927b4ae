//! Lineage History
//!
//! Revision graph store and structural change records mined from a
//! repository.
//!
//! # Core Concepts
//!
//! - [`RevisionGraph`]: read access to revisions (ordered parents, changed
//!   files) and branch heads
//! - [`History`]: in-memory arena implementing [`RevisionGraph`]
//! - [`RevNode`]: a revision paired with its index
//! - [`FileChange`] / [`DeclarationChange`] / [`MemberChange`]: nested change
//!   records, all exposing the [`ChangeRecord`] capability set
//! - [`Location`]: totally ordered key of one record
//!
//! # Example
//!
//! ```rust
//! use lineage_history::{BranchHead, Change, ChangeKind, ElementKind, FileChange, History, Revision, RevisionGraph};
//!
//! let mut root = Revision::new("c0", vec![]);
//! root.files.push(FileChange::new(Change::new("F.java", ChangeKind::Added)));
//! let history = History::new(vec![root], vec![BranchHead::new("main", 0)]).unwrap();
//!
//! assert_eq!(history.locations(ElementKind::File).len(), 1);
//! ```

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

mod change;
mod error;
mod graph;
mod location;

pub use change::{
    Change, ChangeKind, ChangeRecord, ChangeSides, DeclarationChange, ElementKind, FileChange,
    MemberChange,
};
pub use error::HistoryError;
pub use graph::{BranchHead, History, RevNode, Revision, RevisionGraph};
pub use location::{Location, RevIdx};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
