//! Testing utilities for the lineage workspace
//!
//! History fixtures built through a small DSL, and live snapshots derived
//! by replaying a history up to a head.

#![allow(missing_docs)]

use lineage_history::{
    BranchHead, Change, ChangeKind, DeclarationChange, FileChange, History, MemberChange, RevIdx,
    Revision, RevisionGraph,
};
use lineage_validate::{AstDeclaration, AstField, AstFile, AstMethod, InMemorySnapshots};
use std::collections::BTreeSet;

/// Fluent history fixture
///
/// Changes attach to the most recent revision, declarations to its most
/// recent file, members to that file's most recent declaration.
///
/// ```rust,ignore
/// let history = HistoryBuilder::new()
///     .revision("c0", &[])
///     .file("F.java", ChangeKind::Added)
///     .decl("C", ChangeKind::Added)
///     .method("m()", ChangeKind::Added)
///     .branch("main", 0)
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct HistoryBuilder {
    revisions: Vec<Revision>,
    branches: Vec<BranchHead>,
}

impl HistoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a revision; its index is the number of revisions before it
    pub fn revision(mut self, id: &str, parents: &[RevIdx]) -> Self {
        self.revisions.push(Revision::new(id, parents.to_vec()));
        self
    }

    pub fn file(self, name: &str, kind: ChangeKind) -> Self {
        self.file_change(Change::new(name, kind))
    }

    pub fn file_change(mut self, change: Change) -> Self {
        self.current_revision().files.push(FileChange::new(change));
        self
    }

    pub fn decl(self, name: &str, kind: ChangeKind) -> Self {
        self.decl_change(Change::new(name, kind))
    }

    pub fn decl_change(mut self, change: Change) -> Self {
        self.current_file()
            .declarations
            .push(DeclarationChange::new(change));
        self
    }

    pub fn field(self, signature: &str, kind: ChangeKind) -> Self {
        self.field_change(Change::new(signature, kind))
    }

    pub fn field_change(mut self, change: Change) -> Self {
        self.current_decl().fields.push(MemberChange::new(change));
        self
    }

    pub fn method(self, signature: &str, kind: ChangeKind) -> Self {
        self.method_change(Change::new(signature, kind))
    }

    pub fn method_change(mut self, change: Change) -> Self {
        self.current_decl().methods.push(MemberChange::new(change));
        self
    }

    pub fn branch(mut self, name: &str, head: RevIdx) -> Self {
        self.branches.push(BranchHead::new(name, head));
        self
    }

    /// Unchecked history, so fixtures can describe broken graphs
    pub fn build(self) -> History {
        History::from_parts(self.revisions, self.branches)
    }

    pub fn build_checked(self) -> History {
        History::new(self.revisions, self.branches).expect("consistent fixture history")
    }

    fn current_revision(&mut self) -> &mut Revision {
        self.revisions
            .last_mut()
            .expect("revision() must precede changes")
    }

    fn current_file(&mut self) -> &mut FileChange {
        self.current_revision()
            .files
            .last_mut()
            .expect("file() must precede decl()")
    }

    fn current_decl(&mut self) -> &mut DeclarationChange {
        self.current_file()
            .declarations
            .last_mut()
            .expect("decl() must precede members")
    }
}

/// Root adds `F.java C m()`, a child modifies it, a grandchild changes nothing
pub fn modified_method_history() -> History {
    HistoryBuilder::new()
        .revision("r0", &[])
        .file("F.java", ChangeKind::Added)
        .decl("C", ChangeKind::Added)
        .method("m()", ChangeKind::Added)
        .revision("r1", &[0])
        .file("F.java", ChangeKind::Modified)
        .decl("C", ChangeKind::Modified)
        .method("m()", ChangeKind::Modified)
        .revision("r2", &[1])
        .branch("main", 2)
        .build_checked()
}

trait LiveElement {
    fn key(&self) -> String;
    fn create(signature: &str) -> Self;
    fn rename(&mut self, signature: &str);
}

impl LiveElement for AstFile {
    fn key(&self) -> String {
        self.name.clone()
    }
    fn create(signature: &str) -> Self {
        AstFile::new(signature)
    }
    fn rename(&mut self, signature: &str) {
        signature.clone_into(&mut self.name);
    }
}

impl LiveElement for AstDeclaration {
    fn key(&self) -> String {
        self.name.clone()
    }
    fn create(signature: &str) -> Self {
        AstDeclaration::new(signature)
    }
    fn rename(&mut self, signature: &str) {
        signature.clone_into(&mut self.name);
    }
}

impl LiveElement for AstMethod {
    fn key(&self) -> String {
        self.signature()
    }
    fn create(signature: &str) -> Self {
        signature.parse().expect("well-formed method signature")
    }
    fn rename(&mut self, signature: &str) {
        *self = Self::create(signature);
    }
}

impl LiveElement for AstField {
    fn key(&self) -> String {
        self.signature()
    }
    fn create(signature: &str) -> Self {
        signature.parse().expect("well-formed field signature")
    }
    fn rename(&mut self, signature: &str) {
        *self = Self::create(signature);
    }
}

/// Apply one change; returns the element's position unless it was deleted
fn apply<T: LiveElement>(live: &mut Vec<T>, change: &Change) -> Option<usize> {
    let deleted = change.first_change == ChangeKind::Deleted
        || change.second_change == Some(ChangeKind::Deleted);
    let previous = change.renamed_from.as_deref().unwrap_or(&change.signature);
    let position = live
        .iter()
        .position(|e| e.key() == previous)
        .or_else(|| live.iter().position(|e| e.key() == change.signature));

    if deleted {
        if let Some(i) = position {
            live.remove(i);
        }
        return None;
    }
    Some(match position {
        Some(i) => {
            live[i].rename(&change.signature);
            i
        }
        None => {
            live.push(T::create(&change.signature));
            live.len() - 1
        }
    })
}

/// Live files at `head`, replaying every reachable revision in index order
///
/// Intended for linear fixtures and merges whose sides touch disjoint
/// elements.
pub fn replay_live(history: &History, head: RevIdx) -> Vec<AstFile> {
    let mut reachable = BTreeSet::new();
    let mut stack = vec![head];
    while let Some(rev) = stack.pop() {
        if let Some(revision) = history.revision(rev) {
            if reachable.insert(rev) {
                stack.extend(&revision.parents);
            }
        }
    }

    let mut files: Vec<AstFile> = Vec::new();
    for revision in reachable.into_iter().filter_map(|rev| history.revision(rev)) {
        for file in &revision.files {
            let Some(fi) = apply(&mut files, &file.change) else {
                continue;
            };
            for decl in &file.declarations {
                let Some(di) = apply(&mut files[fi].declarations, &decl.change) else {
                    continue;
                };
                let target = &mut files[fi].declarations[di];
                for field in &decl.fields {
                    apply(&mut target.fields, &field.change);
                }
                for method in &decl.methods {
                    apply(&mut target.methods, &method.change);
                }
            }
        }
    }
    files
}

/// Snapshots of every branch head, by replay
pub fn snapshots_at_heads(history: &History) -> InMemorySnapshots {
    let mut snapshots = InMemorySnapshots::new();
    for branch in history.branch_heads() {
        snapshots.insert(branch.head, replay_live(history, branch.head));
    }
    snapshots
}
