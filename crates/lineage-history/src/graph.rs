//! Revision graph store
//!
//! Revisions live in an arena indexed by [`RevIdx`]; parents are referenced by
//! index, never owned, so merges and shared ancestors need no back-pointers.
//! [`RevisionGraph`] is the seam external stores implement; [`History`] is the
//! in-memory arena used by the tools and tests.

use crate::change::{ChangeRecord, DeclarationChange, ElementKind, FileChange};
use crate::error::HistoryError;
use crate::location::{Location, RevIdx};
use serde::{Deserialize, Serialize};

/// One commit: ordered parents and its changed files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    /// Commit identifier
    pub id: String,

    /// Parent indices, first parent first
    #[serde(default)]
    pub parents: Vec<RevIdx>,

    /// File change records, one per changed file
    #[serde(default)]
    pub files: Vec<FileChange>,
}

impl Revision {
    /// Create a revision without changes
    #[must_use]
    pub fn new(id: impl Into<String>, parents: Vec<RevIdx>) -> Self {
        Self {
            id: id.into(),
            parents,
            files: Vec::new(),
        }
    }
}

/// Named branch head
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchHead {
    /// Branch name
    pub name: String,
    /// Index of the head revision
    pub head: RevIdx,
}

impl BranchHead {
    /// Branch `name` pointing at `head`
    #[must_use]
    pub fn new(name: impl Into<String>, head: RevIdx) -> Self {
        Self {
            name: name.into(),
            head,
        }
    }
}

/// A revision together with its index
///
/// Borrowed view; parents are resolved through the owning store.
#[derive(Debug, Clone, Copy)]
pub struct RevNode<'a> {
    index: RevIdx,
    revision: &'a Revision,
}

impl<'a> RevNode<'a> {
    /// View of `revision` at `index`
    #[inline]
    #[must_use]
    pub fn new(index: RevIdx, revision: &'a Revision) -> Self {
        Self { index, revision }
    }

    /// Position in the store
    #[inline]
    #[must_use]
    pub fn index(&self) -> RevIdx {
        self.index
    }

    /// Underlying revision
    #[inline]
    #[must_use]
    pub fn revision(&self) -> &'a Revision {
        self.revision
    }

    /// Commit identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> &'a str {
        &self.revision.id
    }

    /// Parent indices, first parent first
    #[inline]
    #[must_use]
    pub fn parents(&self) -> &'a [RevIdx] {
        &self.revision.parents
    }

    /// True with more than one parent
    #[inline]
    #[must_use]
    pub fn is_merge(&self) -> bool {
        self.revision.parents.len() > 1
    }

    /// Changed files of this revision
    #[inline]
    #[must_use]
    pub fn changed_files(&self) -> &'a [FileChange] {
        &self.revision.files
    }

    /// File record for `name`, with its position
    #[must_use]
    pub fn changed_file(&self, name: &str) -> Option<(usize, &'a FileChange)> {
        self.revision
            .files
            .iter()
            .enumerate()
            .find(|(_, f)| f.name() == name)
    }

    /// Locations of every record of `kind` in this revision, ascending
    #[must_use]
    pub fn locations(&self, kind: ElementKind) -> Vec<Location> {
        let mut out = Vec::new();
        for (fi, file) in self.revision.files.iter().enumerate() {
            if kind == ElementKind::File {
                out.push(Location::file(self.index, fi));
                continue;
            }
            for (di, decl) in file.declarations.iter().enumerate() {
                if kind == ElementKind::Declaration {
                    out.push(Location::declaration(self.index, fi, di));
                    continue;
                }
                out.extend(
                    (0..decl.members(kind).len())
                        .map(|mi| Location::member(self.index, fi, di, mi)),
                );
            }
        }
        out
    }

    /// File record at `location`
    #[must_use]
    pub fn file_at(&self, location: Location) -> Option<&'a FileChange> {
        if location.revision != self.index {
            return None;
        }
        self.revision.files.get(location.file)
    }

    /// Declaration record at `location`
    #[must_use]
    pub fn declaration_at(&self, location: Location) -> Option<&'a DeclarationChange> {
        let decl = location.declaration?;
        self.file_at(location)?.declarations.get(decl)
    }

    /// Record of `kind` at `location`
    #[must_use]
    pub fn record(&self, kind: ElementKind, location: Location) -> Option<&'a dyn ChangeRecord> {
        match kind {
            ElementKind::File => self.file_at(location).map(|f| f as &dyn ChangeRecord),
            ElementKind::Declaration => self.declaration_at(location).map(|d| d as &dyn ChangeRecord),
            ElementKind::Field | ElementKind::Method => {
                let member = location.member?;
                self.declaration_at(location)?
                    .members(kind)
                    .get(member)
                    .map(|m| m as &dyn ChangeRecord)
            }
        }
    }
}

/// Read access to a repository's revision graph
///
/// Implementations must be safe to share across branch validation runs.
pub trait RevisionGraph: Sync {
    /// Revision at `index`, if present
    fn revision(&self, index: RevIdx) -> Option<&Revision>;

    /// Number of revisions in the store
    fn revision_count(&self) -> usize;

    /// Branch heads in store order
    fn branch_heads(&self) -> &[BranchHead];

    /// Revision node at `index`
    ///
    /// # Errors
    /// [`HistoryError::UnknownRevision`] if the index is not in the store
    fn rev_node(&self, index: RevIdx) -> Result<RevNode<'_>, HistoryError> {
        self.revision(index)
            .map(|r| RevNode::new(index, r))
            .ok_or(HistoryError::UnknownRevision(index))
    }

    /// Parent node of `child`
    ///
    /// # Errors
    /// [`HistoryError::MissingRevision`] if the parent is absent
    fn parent_node(&self, child: RevIdx, parent: RevIdx) -> Result<RevNode<'_>, HistoryError> {
        self.revision(parent)
            .map(|r| RevNode::new(parent, r))
            .ok_or(HistoryError::MissingRevision {
                index: parent,
                referenced_by: child,
            })
    }

    /// Record of `kind` at `location`
    fn record(&self, kind: ElementKind, location: Location) -> Option<&dyn ChangeRecord> {
        let revision = self.revision(location.revision)?;
        RevNode::new(location.revision, revision).record(kind, location)
    }

    /// Locations of every record of `kind`, ascending
    fn locations(&self, kind: ElementKind) -> Vec<Location> {
        (0..self.revision_count())
            .filter_map(|i| self.revision(i).map(|r| RevNode::new(i, r)))
            .flat_map(|node| node.locations(kind))
            .collect()
    }
}

/// In-memory revision arena
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    #[serde(default)]
    revisions: Vec<Revision>,
    #[serde(default)]
    branches: Vec<BranchHead>,
}

impl History {
    /// Create a checked history
    ///
    /// # Errors
    /// Returns the first inconsistency found by [`History::check`]
    pub fn new(revisions: Vec<Revision>, branches: Vec<BranchHead>) -> Result<Self, HistoryError> {
        let history = Self::from_parts(revisions, branches);
        history.check()?;
        Ok(history)
    }

    /// Create a history without consistency checks
    ///
    /// Traversals still report missing revisions as they meet them.
    #[must_use]
    pub fn from_parts(revisions: Vec<Revision>, branches: Vec<BranchHead>) -> Self {
        Self {
            revisions,
            branches,
        }
    }

    /// Decode and check a JSON history document
    ///
    /// # Errors
    /// Decoding failures and graph inconsistencies
    pub fn from_json(json: &str) -> Result<Self, HistoryError> {
        let history: Self = serde_json::from_str(json)?;
        history.check()?;
        Ok(history)
    }

    /// Verify parents precede children and branch heads exist
    ///
    /// Forest construction relies on index order being chronological.
    ///
    /// # Errors
    /// The first [`HistoryError`] encountered, scanning revisions in order
    pub fn check(&self) -> Result<(), HistoryError> {
        for (index, revision) in self.revisions.iter().enumerate() {
            for &parent in &revision.parents {
                if parent >= self.revisions.len() {
                    return Err(HistoryError::MissingRevision {
                        index: parent,
                        referenced_by: index,
                    });
                }
                if parent >= index {
                    return Err(HistoryError::ParentNotEarlier {
                        child: index,
                        parent,
                    });
                }
            }
        }
        for branch in &self.branches {
            if branch.head >= self.revisions.len() {
                return Err(HistoryError::DanglingBranchHead {
                    branch: branch.name.clone(),
                    index: branch.head,
                });
            }
        }
        Ok(())
    }

    /// All revisions in index order
    #[inline]
    #[must_use]
    pub fn revisions(&self) -> &[Revision] {
        &self.revisions
    }

    /// Look up a branch by name
    #[must_use]
    pub fn branch(&self, name: &str) -> Option<&BranchHead> {
        self.branches.iter().find(|b| b.name == name)
    }
}

impl RevisionGraph for History {
    fn revision(&self, index: RevIdx) -> Option<&Revision> {
        self.revisions.get(index)
    }

    fn revision_count(&self) -> usize {
        self.revisions.len()
    }

    fn branch_heads(&self) -> &[BranchHead] {
        &self.branches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::{Change, ChangeKind, DeclarationChange, MemberChange};
    use pretty_assertions::assert_eq;

    fn sample() -> History {
        let mut r0 = Revision::new("c0", vec![]);
        let mut file = FileChange::new(Change::new("F.java", ChangeKind::Added));
        let mut decl = DeclarationChange::new(Change::new("C", ChangeKind::Added));
        decl.methods.push(MemberChange::new(Change::new("m()", ChangeKind::Added)));
        decl.fields.push(MemberChange::new(Change::new("x : int", ChangeKind::Added)));
        file.declarations.push(decl);
        r0.files.push(file);
        let r1 = Revision::new("c1", vec![0]);
        History::new(vec![r0, r1], vec![BranchHead::new("main", 1)]).unwrap()
    }

    #[test]
    fn locations_enumerate_nested_records() {
        let history = sample();
        assert_eq!(history.locations(ElementKind::File), vec![Location::file(0, 0)]);
        assert_eq!(
            history.locations(ElementKind::Declaration),
            vec![Location::declaration(0, 0, 0)]
        );
        assert_eq!(
            history.locations(ElementKind::Method),
            vec![Location::member(0, 0, 0, 0)]
        );
        assert_eq!(
            history.locations(ElementKind::Field),
            vec![Location::member(0, 0, 0, 0)]
        );
    }

    #[test]
    fn locations_are_distinct_and_resolve() {
        let mut r0 = Revision::new("c0", vec![]);
        for f in 0..3 {
            let mut file = FileChange::new(Change::new(format!("F{f}.java"), ChangeKind::Added));
            for d in 0..3 {
                let mut decl = DeclarationChange::new(Change::new(format!("C{d}"), ChangeKind::Added));
                for m in 0..3 {
                    decl.methods
                        .push(MemberChange::new(Change::new(format!("m{m}()"), ChangeKind::Added)));
                }
                file.declarations.push(decl);
            }
            r0.files.push(file);
        }
        let history = History::new(vec![r0], vec![]).unwrap();

        let methods = history.locations(ElementKind::Method);
        assert_eq!(methods.len(), 27);
        let distinct: std::collections::BTreeSet<_> = methods.iter().copied().collect();
        assert_eq!(distinct.len(), methods.len());
        assert!(methods.windows(2).all(|w| w[0] < w[1]));
        let last = history.record(ElementKind::Method, Location::member(0, 2, 2, 2)).unwrap();
        assert_eq!(last.signature(), "m2()");
    }

    #[test]
    fn record_resolves_by_kind() {
        let history = sample();
        let loc = Location::member(0, 0, 0, 0);
        assert_eq!(history.record(ElementKind::Method, loc).unwrap().signature(), "m()");
        assert_eq!(history.record(ElementKind::Field, loc).unwrap().signature(), "x : int");
        assert!(history.record(ElementKind::Method, Location::member(1, 0, 0, 0)).is_none());
    }

    #[test]
    fn check_rejects_forward_parent() {
        let revisions = vec![Revision::new("a", vec![1]), Revision::new("b", vec![])];
        let err = History::new(revisions, vec![]).unwrap_err();
        assert!(matches!(err, HistoryError::ParentNotEarlier { child: 0, parent: 1 }));
    }

    #[test]
    fn check_rejects_missing_parent_and_dangling_head() {
        let err = History::new(vec![Revision::new("a", vec![4])], vec![]).unwrap_err();
        assert!(matches!(err, HistoryError::MissingRevision { index: 4, referenced_by: 0 }));

        let err = History::new(vec![Revision::new("a", vec![])], vec![BranchHead::new("dev", 3)])
            .unwrap_err();
        assert!(matches!(err, HistoryError::DanglingBranchHead { index: 3, .. }));
    }

    #[test]
    fn parent_node_reports_referencing_child() {
        let history = History::from_parts(vec![Revision::new("a", vec![9])], vec![]);
        let err = history.parent_node(0, 9).unwrap_err();
        assert_eq!(err.revision(), Some(0));
    }

    #[test]
    fn decodes_json_documents() {
        let json = r#"{
            "revisions": [
                {"id": "c0", "files": [{"signature": "F.java", "first_change": "ADDED"}]},
                {"id": "c1", "parents": [0]}
            ],
            "branches": [{"name": "main", "head": 1}]
        }"#;
        let history = History::from_json(json).unwrap();
        assert_eq!(history.revision_count(), 2);
        assert_eq!(history.branch("main").map(|b| b.head), Some(1));
        let node = history.rev_node(0).unwrap();
        assert_eq!(node.changed_file("F.java").map(|(i, _)| i), Some(0));
    }
}
