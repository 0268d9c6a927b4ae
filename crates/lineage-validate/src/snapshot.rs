//! Live AST snapshots
//!
//! The snapshot collaborator yields, for a branch head, every file reachable
//! in the checked-out tree. Consumers traverse files with an [`AstVisitor`]:
//! each node kind has a pre-visit hook, and declaration hooks decide whether
//! to descend into members and nested declarations.

use crate::error::SnapshotError;
use lineage_history::RevIdx;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Source file of a live snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AstFile {
    /// Path, matching the file change records' signature
    pub name: String,
    /// Top-level declarations
    #[serde(default)]
    pub declarations: Vec<AstDeclaration>,
}

impl AstFile {
    /// Empty file
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declarations: Vec::new(),
        }
    }
}

/// Type declaration with its members and nested declarations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AstDeclaration {
    /// Fully qualified name
    pub name: String,
    /// Declared fields
    #[serde(default)]
    pub fields: Vec<AstField>,
    /// Declared methods
    #[serde(default)]
    pub methods: Vec<AstMethod>,
    /// Nested type declarations
    #[serde(default)]
    pub nested: Vec<AstDeclaration>,
}

impl AstDeclaration {
    /// Declaration without members
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            methods: Vec::new(),
            nested: Vec::new(),
        }
    }
}

/// Method declaration
///
/// Signature form: `<modifiers >name(<params>)< : return>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AstMethod {
    /// Simple name
    pub name: String,
    /// Modifiers in source order
    #[serde(default)]
    pub modifiers: Vec<String>,
    /// Parameter types
    #[serde(default)]
    pub parameters: Vec<String>,
    /// Return type; `None` for constructors
    #[serde(default)]
    pub return_type: Option<String>,
}

impl AstMethod {
    /// Method without modifiers, parameters or return type
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modifiers: Vec::new(),
            parameters: Vec::new(),
            return_type: None,
        }
    }

    /// Signature string matched against method change records
    #[must_use]
    pub fn signature(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AstMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in &self.modifiers {
            write!(f, "{modifier} ")?;
        }
        write!(f, "{}({})", self.name, self.parameters.join(", "))?;
        if let Some(ret) = &self.return_type {
            write!(f, " : {ret}")?;
        }
        Ok(())
    }
}

impl FromStr for AstMethod {
    type Err = SnapshotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || SnapshotError::Traversal(format!("malformed method signature '{s}'"));

        let open = s.find('(').ok_or_else(malformed)?;
        let close = s.rfind(')').filter(|&c| c > open).ok_or_else(malformed)?;

        let mut head: Vec<String> = s[..open].split_whitespace().map(str::to_owned).collect();
        let name = head.pop().ok_or_else(malformed)?;

        let params = s[open + 1..close].trim();
        let parameters = if params.is_empty() {
            Vec::new()
        } else {
            params.split(',').map(|p| p.trim().to_owned()).collect()
        };

        let tail = s[close + 1..].trim();
        let return_type = match tail.strip_prefix(':') {
            Some(ret) => Some(ret.trim().to_owned()),
            None if tail.is_empty() => None,
            None => return Err(malformed()),
        };

        Ok(Self {
            name,
            modifiers: head,
            parameters,
            return_type,
        })
    }
}

/// Field declaration
///
/// Signature form: `<modifiers >name : type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AstField {
    /// Simple name
    pub name: String,
    /// Modifiers in source order
    #[serde(default)]
    pub modifiers: Vec<String>,
    /// Declared type
    pub type_name: String,
}

impl AstField {
    /// Field without modifiers
    #[must_use]
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modifiers: Vec::new(),
            type_name: type_name.into(),
        }
    }

    /// Signature string matched against field change records
    #[must_use]
    pub fn signature(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AstField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in &self.modifiers {
            write!(f, "{modifier} ")?;
        }
        write!(f, "{} : {}", self.name, self.type_name)
    }
}

impl FromStr for AstField {
    type Err = SnapshotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (head, type_name) = s
            .split_once(" : ")
            .ok_or_else(|| SnapshotError::Traversal(format!("malformed field signature '{s}'")))?;
        let mut head: Vec<String> = head.split_whitespace().map(str::to_owned).collect();
        let name = head
            .pop()
            .ok_or_else(|| SnapshotError::Traversal(format!("malformed field signature '{s}'")))?;
        Ok(Self {
            name,
            modifiers: head,
            type_name: type_name.trim().to_owned(),
        })
    }
}

/// Pre-visit hooks over a snapshot file
///
/// Declaration hooks return whether to descend into the declaration's
/// fields, methods and nested declarations.
pub trait AstVisitor {
    fn pre_visit_file(&mut self, _file: &AstFile) -> bool {
        true
    }

    fn pre_visit_declaration(&mut self, _declaration: &AstDeclaration) -> bool {
        true
    }

    fn post_visit_declaration(&mut self, _declaration: &AstDeclaration) {}

    fn pre_visit_field(&mut self, _field: &AstField) {}

    fn pre_visit_method(&mut self, _method: &AstMethod) {}
}

/// Drive `visitor` over one file
pub fn walk_file<V: AstVisitor + ?Sized>(visitor: &mut V, file: &AstFile) {
    if !visitor.pre_visit_file(file) {
        return;
    }
    for declaration in &file.declarations {
        walk_declaration(visitor, declaration);
    }
}

fn walk_declaration<V: AstVisitor + ?Sized>(visitor: &mut V, declaration: &AstDeclaration) {
    if visitor.pre_visit_declaration(declaration) {
        for field in &declaration.fields {
            visitor.pre_visit_field(field);
        }
        for method in &declaration.methods {
            visitor.pre_visit_method(method);
        }
        for nested in &declaration.nested {
            walk_declaration(visitor, nested);
        }
    }
    visitor.post_visit_declaration(declaration);
}

/// Lazy sequence of snapshot files
pub type SnapshotFiles<'a> = Box<dyn Iterator<Item = Result<Cow<'a, AstFile>, SnapshotError>> + 'a>;

/// Provider of live snapshots at branch heads
pub trait SnapshotSource: Sync {
    /// Every file of the checked-out tree at `head`
    ///
    /// # Errors
    /// [`SnapshotError::UnknownHead`] when no snapshot exists for `head`;
    /// items may fail individually with [`SnapshotError::Traversal`].
    fn live_snapshot(&self, head: RevIdx) -> Result<SnapshotFiles<'_>, SnapshotError>;
}

/// Snapshots held in memory, keyed by head revision
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InMemorySnapshots {
    snapshots: HashMap<RevIdx, Vec<AstFile>>,
}

impl InMemorySnapshots {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the snapshot of `head`
    pub fn insert(&mut self, head: RevIdx, files: Vec<AstFile>) {
        self.snapshots.insert(head, files);
    }

    /// With the snapshot of `head`
    #[must_use]
    pub fn with(mut self, head: RevIdx, files: Vec<AstFile>) -> Self {
        self.insert(head, files);
        self
    }
}

impl SnapshotSource for InMemorySnapshots {
    fn live_snapshot(&self, head: RevIdx) -> Result<SnapshotFiles<'_>, SnapshotError> {
        let files = self
            .snapshots
            .get(&head)
            .ok_or(SnapshotError::UnknownHead(head))?;
        Ok(Box::new(files.iter().map(|f| Ok(Cow::Borrowed(f)))))
    }
}
