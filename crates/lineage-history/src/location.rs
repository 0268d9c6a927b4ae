//! Totally ordered record locations
//!
//! A [`Location`] names one change record: the revision it belongs to and
//! its position in the revision's nested record lists. Revision indices are
//! topologically ordered, so sorting locations descending yields records
//! newest first.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a revision in the graph store
pub type RevIdx = usize;

/// Position of one change record in the revision graph
///
/// Ordered by revision, then file, declaration and member position. The
/// element kind is not part of the key; each forest only holds one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Revision holding the record
    pub revision: RevIdx,
    /// Position in the revision's changed files
    pub file: usize,
    /// Position in the file's declaration changes
    pub declaration: Option<usize>,
    /// Position in the declaration's field or method changes
    pub member: Option<usize>,
}

impl Location {
    /// Location of a file record
    #[inline]
    #[must_use]
    pub fn file(revision: RevIdx, file: usize) -> Self {
        Self {
            revision,
            file,
            declaration: None,
            member: None,
        }
    }

    /// Location of a declaration record
    #[inline]
    #[must_use]
    pub fn declaration(revision: RevIdx, file: usize, declaration: usize) -> Self {
        Self {
            revision,
            file,
            declaration: Some(declaration),
            member: None,
        }
    }

    /// Location of a field or method record
    #[inline]
    #[must_use]
    pub fn member(revision: RevIdx, file: usize, declaration: usize, member: usize) -> Self {
        Self {
            revision,
            file,
            declaration: Some(declaration),
            member: Some(member),
        }
    }

    /// Location of the enclosing record, if any
    ///
    /// Members are enclosed by their declaration, declarations by their file.
    #[must_use]
    pub fn enclosing(&self) -> Option<Location> {
        match (self.declaration, self.member) {
            (Some(decl), Some(_)) => Some(Self::declaration(self.revision, self.file, decl)),
            (Some(_), None) => Some(Self::file(self.revision, self.file)),
            _ => None,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}/f{}", self.revision, self.file)?;
        if let Some(decl) = self.declaration {
            write!(f, "/d{decl}")?;
        }
        if let Some(member) = self.member {
            write!(f, "/m{member}")?;
        }
        Ok(())
    }
}
