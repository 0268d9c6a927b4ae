//! Lineage Validate
//!
//! Independent cross-check of lineage forests against the live AST snapshot
//! of each branch head.
//!
//! # Core Concepts
//!
//! - [`SnapshotSource`]: provider of the files live at a branch head
//! - [`GroundTruthCollector`]: visitor turning a snapshot into
//!   [`LiveSignatures`]
//! - [`Validator`]: walks each head's ancestry, matching change records to
//!   live signatures
//! - [`Diagnostic`] / [`DiagnosticSink`]: stream of unmatched changes and
//!   residual live elements
//! - [`ValidationReport`]: per-branch [`BranchScore`]s, each with an
//!   eight-ratio row
//!
//! # Run Lifecycle
//!
//! ```text
//! Init -> SnapshotCollected -> Walking -> Scored
//! ```

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

mod diagnostic;
mod error;
mod ground_truth;
mod run;
mod score;
mod snapshot;
mod validator;

pub use diagnostic::{CollectingSink, Diagnostic, DiagnosticSink, TeeSink, TracingSink};
pub use error::{SnapshotError, ValidationError};
pub use ground_truth::{GroundTruthCollector, LiveSignatures};
pub use run::{allowed_transitions, validate_transition, RunState};
pub use score::{ratio, BranchOutcome, BranchScore, KindScore, ValidationReport};
pub use snapshot::{
    walk_file, AstDeclaration, AstField, AstFile, AstMethod, AstVisitor, InMemorySnapshots,
    SnapshotFiles, SnapshotSource,
};
pub use validator::{ValidationConfig, Validator};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
