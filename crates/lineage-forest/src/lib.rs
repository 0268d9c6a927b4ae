//! Lineage Forest
//!
//! Partitions the change records of a revision graph into lineage trees, one
//! forest per element kind.
//!
//! # Core Concepts
//!
//! - [`ForestBuilder`]: builds the File, Declaration, Field and Method
//!   forests in scope order
//! - [`Forest`]: disjoint [`LineageTree`]s plus the record-to-tree map
//! - [`LinkError`]: why a candidate tree was discarded
//!
//! # Identity
//!
//! A record's predecessor is searched along each parent side, keyed by the
//! enclosing record's tree and the record's previous signature. A tree is
//! kept only if every non-added side of every record resolves to exactly one
//! predecessor. A seed whose predecessor already belongs to a tree joins that
//! tree, so forks of one element share a single lineage.
//!
//! # Example
//!
//! ```rust
//! use lineage_forest::ForestBuilder;
//! use lineage_history::{BranchHead, Change, ChangeKind, FileChange, History, Revision};
//!
//! let mut c0 = Revision::new("c0", vec![]);
//! c0.files.push(FileChange::new(Change::new("F.java", ChangeKind::Added)));
//! let mut c1 = Revision::new("c1", vec![0]);
//! c1.files.push(FileChange::new(Change::new("F.java", ChangeKind::Modified)));
//! let history = History::new(vec![c0, c1], vec![BranchHead::new("main", 1)]).unwrap();
//!
//! let forests = ForestBuilder::new(&history).build_all().unwrap();
//! assert_eq!(forests.files().len(), 1);
//! ```

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

mod builder;
mod error;
mod linker;
mod tree;

pub use builder::{BuildConfig, ForestBuilder};
pub use error::{BuildError, LinkError};
pub use tree::{BuildStats, Forest, Forests, LineageTree, Link, TreeId};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
