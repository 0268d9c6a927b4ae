//! Lineage trees and per-kind forests

use crate::error::LinkError;
use crate::linker::LinkedTree;
use lineage_history::{ElementKind, Location};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// Identifier of a lineage tree within one forest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TreeId(pub u32);

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Edge from a record to the record it evolved from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Link {
    /// Newer record
    pub successor: Location,
    /// Older record
    pub predecessor: Location,
}

/// Records representing one evolving element
///
/// The seed is the newest record the tree was grown from; links point from
/// each record back to its predecessors, branching at merges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineageTree {
    id: TreeId,
    kind: ElementKind,
    seed: Location,
    nodes: BTreeSet<Location>,
    links: Vec<Link>,
}

impl LineageTree {
    /// Tree identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> TreeId {
        self.id
    }

    /// Element kind of every record in the tree
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Record the tree was seeded from
    #[inline]
    #[must_use]
    pub fn seed(&self) -> Location {
        self.seed
    }

    /// Records in location order
    pub fn nodes(&self) -> impl Iterator<Item = Location> + '_ {
        self.nodes.iter().copied()
    }

    /// Number of records
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the tree holds no records
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// True if the record at `location` belongs to this tree
    #[inline]
    #[must_use]
    pub fn contains(&self, location: Location) -> bool {
        self.nodes.contains(&location)
    }

    /// Successor to predecessor edges
    #[inline]
    #[must_use]
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Records with no predecessor: where the element was introduced
    #[must_use]
    pub fn roots(&self) -> Vec<Location> {
        let linked: BTreeSet<Location> = self.links.iter().map(|l| l.successor).collect();
        self.nodes
            .iter()
            .filter(|loc| !linked.contains(loc))
            .copied()
            .collect()
    }
}

/// Outcome counts of one forest build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    /// Records tried as seeds
    pub seeds: usize,
    /// Trees kept under a fresh id
    pub retained: usize,
    /// Seeds attached to an existing tree
    pub grafted: usize,
    /// Seeds with more than one predecessor candidate on a parent side
    pub failed_ambiguous: usize,
    /// Seeds with a non-added side and no predecessor
    pub failed_missing: usize,
    /// Seeds whose predecessor belongs to a tree they cannot join
    pub failed_claimed: usize,
    /// Seeds whose enclosing record has no tree
    pub failed_detached: usize,
    /// Seeds hitting a missing revision or record
    pub failed_graph: usize,
}

impl BuildStats {
    /// Total discarded trees
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed_ambiguous
            + self.failed_missing
            + self.failed_claimed
            + self.failed_detached
            + self.failed_graph
    }

    pub(crate) fn record_failure(&mut self, err: &LinkError) {
        match err {
            LinkError::Ambiguous { .. } => self.failed_ambiguous += 1,
            LinkError::MissingPredecessor { .. } => self.failed_missing += 1,
            LinkError::AlreadyClaimed { .. } => self.failed_claimed += 1,
            LinkError::DetachedScope { .. } => self.failed_detached += 1,
            LinkError::UnknownRecord(_) | LinkError::Graph(_) => self.failed_graph += 1,
        }
    }
}

/// All lineage trees of one element kind
///
/// Built once by [`crate::ForestBuilder`] and read-only afterwards.
#[derive(Debug, Clone)]
pub struct Forest {
    kind: ElementKind,
    trees: BTreeMap<TreeId, LineageTree>,
    owners: HashMap<Location, TreeId>,
    stats: BuildStats,
    next_id: u32,
}

impl Forest {
    pub(crate) fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            trees: BTreeMap::new(),
            owners: HashMap::new(),
            stats: BuildStats::default(),
            next_id: 0,
        }
    }

    /// Element kind of this forest
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Tree by id
    #[inline]
    #[must_use]
    pub fn get(&self, id: TreeId) -> Option<&LineageTree> {
        self.trees.get(&id)
    }

    /// Tree owning the record at `location`
    ///
    /// `None` for records whose tree failed to link.
    #[inline]
    #[must_use]
    pub fn tree_of(&self, location: Location) -> Option<TreeId> {
        self.owners.get(&location).copied()
    }

    /// Number of retained trees
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    /// True if no tree was retained
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Number of records assigned to some tree
    #[inline]
    #[must_use]
    pub fn assigned(&self) -> usize {
        self.owners.len()
    }

    /// Trees in id order
    pub fn trees(&self) -> impl Iterator<Item = &LineageTree> {
        self.trees.values()
    }

    /// Seed outcomes of the build
    #[inline]
    #[must_use]
    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    pub(crate) fn owners(&self) -> &HashMap<Location, TreeId> {
        &self.owners
    }

    pub(crate) fn stats_mut(&mut self) -> &mut BuildStats {
        &mut self.stats
    }

    /// Keep a linked tree, under a fresh id or merged into the tree it grafts onto
    pub(crate) fn insert(&mut self, linked: LinkedTree) -> TreeId {
        let LinkedTree {
            seed,
            nodes,
            links,
            graft,
        } = linked;

        let id = match graft {
            Some(id) if self.trees.contains_key(&id) => {
                if let Some(tree) = self.trees.get_mut(&id) {
                    tree.nodes.extend(nodes.iter().copied());
                    tree.links.extend(links);
                }
                self.stats.grafted += 1;
                id
            }
            _ => {
                let id = TreeId(self.next_id);
                self.next_id += 1;
                self.trees.insert(
                    id,
                    LineageTree {
                        id,
                        kind: self.kind,
                        seed,
                        nodes: nodes.clone(),
                        links,
                    },
                );
                self.stats.retained += 1;
                id
            }
        };

        for loc in nodes {
            self.owners.insert(loc, id);
        }
        id
    }
}

/// The four per-kind forests of one repository
#[derive(Debug, Clone)]
pub struct Forests {
    forests: [Forest; 4],
}

impl Forests {
    pub(crate) fn new(files: Forest, declarations: Forest, fields: Forest, methods: Forest) -> Self {
        Self {
            forests: [files, declarations, fields, methods],
        }
    }

    /// Forest of `kind`
    #[inline]
    #[must_use]
    pub fn get(&self, kind: ElementKind) -> &Forest {
        &self.forests[kind.index()]
    }

    /// File forest
    #[must_use]
    pub fn files(&self) -> &Forest {
        self.get(ElementKind::File)
    }

    /// Declaration forest
    #[must_use]
    pub fn declarations(&self) -> &Forest {
        self.get(ElementKind::Declaration)
    }

    /// Field forest
    #[must_use]
    pub fn fields(&self) -> &Forest {
        self.get(ElementKind::Field)
    }

    /// Method forest
    #[must_use]
    pub fn methods(&self) -> &Forest {
        self.get(ElementKind::Method)
    }

    /// Forests in build order
    pub fn iter(&self) -> impl Iterator<Item = &Forest> {
        self.forests.iter()
    }
}
