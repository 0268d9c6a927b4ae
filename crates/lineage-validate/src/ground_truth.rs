//! Ground truth from a live snapshot
//!
//! One signature per live element, scoped by its enclosing path:
//! `file`, `file decl`, `file decl member`. Nested declarations are scoped by
//! file only, since their qualified name already carries the outer type.

use crate::error::SnapshotError;
use crate::snapshot::{walk_file, AstDeclaration, AstField, AstFile, AstMethod, AstVisitor, SnapshotFiles};
use indexmap::IndexSet;
use lineage_history::ElementKind;

/// Live signatures per element kind
///
/// Insertion ordered, so residuals are reported in snapshot order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveSignatures {
    sets: [IndexSet<String>; 4],
}

impl LiveSignatures {
    /// Signatures of `kind`
    #[inline]
    #[must_use]
    pub fn get(&self, kind: ElementKind) -> &IndexSet<String> {
        &self.sets[kind.index()]
    }

    /// True if `signature` is live for `kind`
    #[inline]
    #[must_use]
    pub fn contains(&self, kind: ElementKind, signature: &str) -> bool {
        self.sets[kind.index()].contains(signature)
    }

    /// Remove a matched signature; true if it was live
    #[inline]
    pub fn remove(&mut self, kind: ElementKind, signature: &str) -> bool {
        self.sets[kind.index()].shift_remove(signature)
    }

    /// Per-kind counts in [`ElementKind::ALL`] order
    #[must_use]
    pub fn counts(&self) -> [usize; 4] {
        [
            self.sets[0].len(),
            self.sets[1].len(),
            self.sets[2].len(),
            self.sets[3].len(),
        ]
    }

    fn insert(&mut self, kind: ElementKind, signature: String) {
        self.sets[kind.index()].insert(signature);
    }
}

/// Visitor accumulating [`LiveSignatures`]
#[derive(Debug, Default)]
pub struct GroundTruthCollector {
    file: String,
    scopes: Vec<String>,
    live: LiveSignatures,
}

impl GroundTruthCollector {
    /// Create an empty collector
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect a whole snapshot
    ///
    /// # Errors
    /// The first failing snapshot item
    pub fn collect(files: SnapshotFiles<'_>) -> Result<LiveSignatures, SnapshotError> {
        let mut collector = Self::new();
        for file in files {
            let file = file?;
            walk_file(&mut collector, &file);
        }
        Ok(collector.into_signatures())
    }

    /// Signatures collected so far
    #[must_use]
    pub fn into_signatures(self) -> LiveSignatures {
        self.live
    }

    fn member(&mut self, kind: ElementKind, signature: &str) {
        if let Some(scope) = self.scopes.last() {
            let sig = format!("{scope} {signature}");
            self.live.insert(kind, sig);
        }
    }
}

impl AstVisitor for GroundTruthCollector {
    fn pre_visit_file(&mut self, file: &AstFile) -> bool {
        self.file.clone_from(&file.name);
        self.live.insert(ElementKind::File, file.name.clone());
        true
    }

    fn pre_visit_declaration(&mut self, declaration: &AstDeclaration) -> bool {
        let sig = format!("{} {}", self.file, declaration.name);
        self.live.insert(ElementKind::Declaration, sig.clone());
        self.scopes.push(sig);
        true
    }

    fn post_visit_declaration(&mut self, _declaration: &AstDeclaration) {
        self.scopes.pop();
    }

    fn pre_visit_field(&mut self, field: &AstField) {
        self.member(ElementKind::Field, &field.signature());
    }

    fn pre_visit_method(&mut self, method: &AstMethod) {
        self.member(ElementKind::Method, &method.signature());
    }
}
