//! Change records produced by the structural diff
//!
//! One [`FileChange`] per changed file and revision, nesting the
//! [`DeclarationChange`]s of that file, which in turn nest the field and
//! method [`MemberChange`]s. Records are immutable once loaded; lineage
//! assignment lives in the forests, not on the records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Change kind of a record relative to one parent revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    /// Element did not exist in the parent
    Added,
    /// Element exists in the parent and is gone here
    Deleted,
    /// Element exists in both and differs
    Modified,
    /// Element exists in both and is identical
    Unchanged,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Added => "ADDED",
            Self::Deleted => "DELETED",
            Self::Modified => "MODIFIED",
            Self::Unchanged => "UNCHANGED",
        };
        f.write_str(s)
    }
}

/// Element kinds tracked by the lineage forests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    /// Source file
    File,
    /// Type declaration (class, interface, enum, ...)
    Declaration,
    /// Field of a declaration
    Field,
    /// Method of a declaration
    Method,
}

impl ElementKind {
    /// All kinds in build order
    pub const ALL: [ElementKind; 4] = [Self::File, Self::Declaration, Self::Field, Self::Method];

    /// Kind whose lineage scopes this kind's identity
    ///
    /// A declaration is scoped by its file's lineage, fields and methods by
    /// their declaring type's lineage.
    #[inline]
    #[must_use]
    pub fn scope(self) -> Option<ElementKind> {
        match self {
            Self::File => None,
            Self::Declaration => Some(Self::File),
            Self::Field | Self::Method => Some(Self::Declaration),
        }
    }

    /// Position in the fixed per-kind arrays (`[T; 4]`)
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::File => 0,
            Self::Declaration => 1,
            Self::Field => 2,
            Self::Method => 3,
        }
    }

    /// Lowercase label used in logs
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Declaration => "decl",
            Self::Field => "field",
            Self::Method => "method",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Change kinds of one record against each parent
///
/// `second` is only present on merge commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeSides {
    /// Change against the first parent
    pub first: ChangeKind,
    /// Change against the second parent, on merges
    pub second: Option<ChangeKind>,
}

impl ChangeSides {
    /// Side that applies to the parent at `position` in the parent list
    ///
    /// The first parent uses `first`; every later parent uses `second`.
    #[inline]
    #[must_use]
    pub fn for_parent(&self, position: usize) -> Option<ChangeKind> {
        if position == 0 {
            Some(self.first)
        } else {
            self.second
        }
    }

    /// True when either side deletes the element
    #[inline]
    #[must_use]
    pub fn any_deleted(&self) -> bool {
        self.first == ChangeKind::Deleted || self.second == Some(ChangeKind::Deleted)
    }

    /// True when no side claims a predecessor
    #[inline]
    #[must_use]
    pub fn all_added(&self) -> bool {
        self.first == ChangeKind::Added && self.second.map_or(true, |s| s == ChangeKind::Added)
    }
}

impl fmt::Display for ChangeSides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.second {
            Some(second) => write!(f, "{}/{}", self.first, second),
            None => write!(f, "{}", self.first),
        }
    }
}

/// Attributes shared by every change record kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// Structural identity (file path, qualified type name, member signature)
    pub signature: String,

    /// Signature in the predecessor when the diff detected a rename
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renamed_from: Option<String>,

    /// Change against the first parent
    pub first_change: ChangeKind,

    /// Change against the second parent (merge commits only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_change: Option<ChangeKind>,
}

impl Change {
    /// Create a single-sided change
    #[must_use]
    pub fn new(signature: impl Into<String>, first_change: ChangeKind) -> Self {
        Self {
            signature: signature.into(),
            renamed_from: None,
            first_change,
            second_change: None,
        }
    }

    /// Add the change against the second parent
    #[must_use]
    pub fn with_second(mut self, second: ChangeKind) -> Self {
        self.second_change = Some(second);
        self
    }

    /// Record that the element was called `previous` before this change
    #[must_use]
    pub fn renamed_from(mut self, previous: impl Into<String>) -> Self {
        self.renamed_from = Some(previous.into());
        self
    }
}

/// Capability set the lineage algorithms need from a record
///
/// Implemented by all record kinds; fields and methods share
/// [`MemberChange`].
pub trait ChangeRecord {
    /// Shared change attributes
    fn change(&self) -> &Change;

    /// Structural identity of this record
    #[inline]
    fn signature(&self) -> &str {
        &self.change().signature
    }

    /// Signature to look for in ancestor revisions
    #[inline]
    fn predecessor_signature(&self) -> &str {
        let change = self.change();
        change.renamed_from.as_deref().unwrap_or(&change.signature)
    }

    /// Change sides against the parents
    #[inline]
    fn sides(&self) -> ChangeSides {
        let change = self.change();
        ChangeSides {
            first: change.first_change,
            second: change.second_change,
        }
    }

    /// Deleted records end their lineage
    #[inline]
    fn is_deleted(&self) -> bool {
        self.sides().any_deleted()
    }
}

/// Field or method change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberChange {
    /// Change of the member itself
    #[serde(flatten)]
    pub change: Change,
}

impl MemberChange {
    /// Member change from its change
    #[must_use]
    pub fn new(change: Change) -> Self {
        Self { change }
    }
}

impl ChangeRecord for MemberChange {
    fn change(&self) -> &Change {
        &self.change
    }
}

/// Type declaration change with its member changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationChange {
    /// Change of the declaration itself
    #[serde(flatten)]
    pub change: Change,

    /// Field changes
    #[serde(default)]
    pub fields: Vec<MemberChange>,

    /// Method changes
    #[serde(default)]
    pub methods: Vec<MemberChange>,
}

impl DeclarationChange {
    /// Declaration change without members
    #[must_use]
    pub fn new(change: Change) -> Self {
        Self {
            change,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Member changes of the given kind
    ///
    /// Returns an empty slice for non-member kinds.
    #[must_use]
    pub fn members(&self, kind: ElementKind) -> &[MemberChange] {
        match kind {
            ElementKind::Field => &self.fields,
            ElementKind::Method => &self.methods,
            ElementKind::File | ElementKind::Declaration => &[],
        }
    }
}

impl ChangeRecord for DeclarationChange {
    fn change(&self) -> &Change {
        &self.change
    }
}

/// File change with its declaration changes
///
/// The file's signature is its path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    /// Change of the file itself
    #[serde(flatten)]
    pub change: Change,

    /// Declaration changes
    #[serde(default)]
    pub declarations: Vec<DeclarationChange>,
}

impl FileChange {
    /// File change without declarations
    #[must_use]
    pub fn new(change: Change) -> Self {
        Self {
            change,
            declarations: Vec::new(),
        }
    }

    /// File path
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.change.signature
    }
}

impl ChangeRecord for FileChange {
    fn change(&self) -> &Change {
        &self.change
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sides_map_parents_to_first_and_second() {
        let change = Change::new("m()", ChangeKind::Modified).with_second(ChangeKind::Added);
        let sides = MemberChange::new(change).sides();
        assert_eq!(sides.for_parent(0), Some(ChangeKind::Modified));
        assert_eq!(sides.for_parent(1), Some(ChangeKind::Added));
        assert_eq!(sides.for_parent(2), Some(ChangeKind::Added));
        assert!(!sides.all_added());
    }

    #[test]
    fn single_sided_change_has_no_second_parent_side() {
        let sides = MemberChange::new(Change::new("m()", ChangeKind::Added)).sides();
        assert_eq!(sides.for_parent(1), None);
        assert!(sides.all_added());
    }

    #[test]
    fn deletion_on_either_side_is_terminal() {
        let first = MemberChange::new(Change::new("x", ChangeKind::Deleted));
        let second = MemberChange::new(
            Change::new("x", ChangeKind::Unchanged).with_second(ChangeKind::Deleted),
        );
        assert!(first.is_deleted());
        assert!(second.is_deleted());
    }

    #[test]
    fn rename_drives_predecessor_signature() {
        let file = FileChange::new(Change::new("src/B.java", ChangeKind::Modified).renamed_from("src/A.java"));
        assert_eq!(file.signature(), "src/B.java");
        assert_eq!(file.predecessor_signature(), "src/A.java");
    }

    #[test]
    fn change_kind_uses_upper_case_wire_names() {
        let json = serde_json::to_string(&ChangeKind::Unchanged).unwrap();
        assert_eq!(json, "\"UNCHANGED\"");
    }

    #[test]
    fn scopes_follow_nesting() {
        assert_eq!(ElementKind::File.scope(), None);
        assert_eq!(ElementKind::Declaration.scope(), Some(ElementKind::File));
        assert_eq!(ElementKind::Method.scope(), Some(ElementKind::Declaration));
    }
}
