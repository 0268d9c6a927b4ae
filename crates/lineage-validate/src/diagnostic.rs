//! Diagnostic stream
//!
//! Mismatches are emitted as they occur, one [`Diagnostic`] per unmatched
//! change or residual live element.

use lineage_forest::TreeId;
use lineage_history::{ElementKind, Location};
use parking_lot::Mutex;
use serde::Serialize;

/// One mismatch found while validating a branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Change record claims an element the live snapshot does not have
    UnmatchedChange {
        /// Branch being validated
        branch: String,
        /// Kind of the change record
        kind: ElementKind,
        /// Location of the change record
        location: Location,
        /// Qualified signature of the record
        signature: String,
        /// Tree owning the record, if any
        tree: Option<TreeId>,
        /// Records in that tree
        tree_size: usize,
    },

    /// Live element never produced by any change record
    ResidualLiveElement {
        /// Branch being validated
        branch: String,
        /// Kind of the live element
        kind: ElementKind,
        /// Qualified signature of the element
        signature: String,
    },
}

impl Diagnostic {
    /// Element kind the diagnostic concerns
    #[must_use]
    pub fn kind(&self) -> ElementKind {
        match self {
            Self::UnmatchedChange { kind, .. } | Self::ResidualLiveElement { kind, .. } => *kind,
        }
    }

    /// Branch the diagnostic was raised on
    #[must_use]
    pub fn branch(&self) -> &str {
        match self {
            Self::UnmatchedChange { branch, .. } | Self::ResidualLiveElement { branch, .. } => {
                branch
            }
        }
    }
}

/// Receiver of diagnostics
///
/// Shared by concurrent branch runs.
pub trait DiagnosticSink: Sync {
    fn emit(&self, diagnostic: Diagnostic);
}

/// Logs each diagnostic as a warning
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        match diagnostic {
            Diagnostic::UnmatchedChange {
                branch,
                kind,
                location,
                signature,
                tree,
                tree_size,
            } => {
                let tree = tree.map_or_else(|| "none".to_owned(), |t| t.to_string());
                tracing::warn!(
                    %branch,
                    %location,
                    %tree,
                    tree_size,
                    "cannot find {kind} {signature}"
                );
            }
            Diagnostic::ResidualLiveElement {
                branch,
                kind,
                signature,
            } => {
                tracing::warn!(%branch, "no change produced live {kind} {signature}");
            }
        }
    }
}

/// Buffers diagnostics for machine-readable output
#[derive(Debug, Default)]
pub struct CollectingSink {
    inner: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    /// Create an empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far
    #[must_use]
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.inner.lock().clone()
    }

    /// Drain the buffer
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.inner.lock())
    }

    /// Number of buffered diagnostics
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// True if nothing was emitted
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl DiagnosticSink for CollectingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        self.inner.lock().push(diagnostic);
    }
}

/// Forwards every diagnostic to two sinks
pub struct TeeSink<'a, A: ?Sized, B: ?Sized> {
    first: &'a A,
    second: &'a B,
}

impl<'a, A: DiagnosticSink + ?Sized, B: DiagnosticSink + ?Sized> TeeSink<'a, A, B> {
    /// Forward to `first`, then `second`
    #[must_use]
    pub fn new(first: &'a A, second: &'a B) -> Self {
        Self { first, second }
    }
}

impl<A: DiagnosticSink + ?Sized, B: DiagnosticSink + ?Sized> DiagnosticSink for TeeSink<'_, A, B> {
    fn emit(&self, diagnostic: Diagnostic) {
        self.first.emit(diagnostic.clone());
        self.second.emit(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collecting_sink_drains() {
        let sink = CollectingSink::new();
        sink.emit(Diagnostic::ResidualLiveElement {
            branch: "main".into(),
            kind: ElementKind::Method,
            signature: "F.java C m()".into(),
        });
        assert_eq!(sink.len(), 1);
        let drained = sink.take();
        assert_eq!(drained[0].kind(), ElementKind::Method);
        assert_eq!(drained[0].branch(), "main");
        assert!(sink.is_empty());
    }

    #[test]
    fn tee_forwards_to_both() {
        let a = CollectingSink::new();
        let b = CollectingSink::new();
        TeeSink::new(&a, &b).emit(Diagnostic::ResidualLiveElement {
            branch: "dev".into(),
            kind: ElementKind::File,
            signature: "A.java".into(),
        });
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
    }
}
