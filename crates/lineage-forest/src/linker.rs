//! Lineage tree linker
//!
//! Starting from a seed record, follows structural identity backward through
//! the revision DAG, attaching the unique predecessor found on each parent
//! side until every path ends at an addition or a deletion.

use crate::error::LinkError;
use crate::tree::{Forest, Link, TreeId};
use lineage_history::{ChangeKind, ElementKind, Location, RevIdx, RevisionGraph};
use smallvec::SmallVec;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Identity used to match a record against ancestor records
///
/// `scope` is the lineage of the enclosing record (`None` for files).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct MatchKey {
    scope: Option<TreeId>,
    signature: String,
}

/// Records of one kind indexed by identity, then by revision
#[derive(Debug, Default)]
pub(crate) struct MatchIndex {
    entries: HashMap<MatchKey, BTreeMap<RevIdx, SmallVec<[Location; 1]>>>,
}

impl MatchIndex {
    /// Index every record of `kind` whose scope is resolvable
    pub(crate) fn build<G: RevisionGraph>(
        graph: &G,
        kind: ElementKind,
        scopes: Option<&Forest>,
        locations: &[Location],
    ) -> Self {
        let mut entries: HashMap<MatchKey, BTreeMap<RevIdx, SmallVec<[Location; 1]>>> =
            HashMap::new();
        for &loc in locations {
            let Some(record) = graph.record(kind, loc) else {
                continue;
            };
            let Ok(scope) = scope_of(kind, scopes, loc) else {
                continue;
            };
            let key = MatchKey {
                scope,
                signature: record.signature().to_owned(),
            };
            entries
                .entry(key)
                .or_default()
                .entry(loc.revision)
                .or_default()
                .push(loc);
        }
        Self { entries }
    }

    fn revisions(&self, key: &MatchKey) -> Option<&BTreeMap<RevIdx, SmallVec<[Location; 1]>>> {
        self.entries.get(key)
    }
}

/// Lineage scope of the record at `location`
///
/// Fails with [`LinkError::DetachedScope`] when the enclosing record was
/// left out of the scoping forest.
pub(crate) fn scope_of(
    kind: ElementKind,
    scopes: Option<&Forest>,
    location: Location,
) -> Result<Option<TreeId>, LinkError> {
    if kind.scope().is_none() {
        return Ok(None);
    }
    location
        .enclosing()
        .zip(scopes)
        .and_then(|(enclosing, forest)| forest.tree_of(enclosing))
        .map(Some)
        .ok_or(LinkError::DetachedScope { location })
}

/// Completed node set of a successfully linked tree
#[derive(Debug, Clone)]
pub(crate) struct LinkedTree {
    pub(crate) seed: Location,
    pub(crate) nodes: BTreeSet<Location>,
    pub(crate) links: Vec<Link>,
    /// Existing tree this one attaches to, when grafting is enabled
    pub(crate) graft: Option<TreeId>,
}

/// Per-seed linking over one kind
pub(crate) struct TreeLinker<'a, G: RevisionGraph> {
    pub(crate) graph: &'a G,
    pub(crate) kind: ElementKind,
    pub(crate) index: &'a MatchIndex,
    pub(crate) scopes: Option<&'a Forest>,
    pub(crate) owners: &'a HashMap<Location, TreeId>,
    pub(crate) graft_shared_ancestors: bool,
}

impl<G: RevisionGraph> TreeLinker<'_, G> {
    /// Grow a tree backward from `seed`
    ///
    /// # Errors
    /// Any [`LinkError`]; the caller discards the tree.
    pub(crate) fn link(&self, seed: Location) -> Result<LinkedTree, LinkError> {
        let mut tree = LinkedTree {
            seed,
            nodes: BTreeSet::from([seed]),
            links: Vec::new(),
            graft: None,
        };
        let mut pending = vec![seed];

        while let Some(current) = pending.pop() {
            let node = self.graph.rev_node(current.revision)?;
            let record = node
                .record(self.kind, current)
                .ok_or(LinkError::UnknownRecord(current))?;
            if record.is_deleted() {
                continue;
            }

            let sides = record.sides();
            if node.parents().is_empty() {
                if sides.all_added() {
                    continue;
                }
                return Err(LinkError::MissingPredecessor {
                    location: current,
                    parent: None,
                });
            }

            // resolved on first use: pure additions need no scope
            let mut key = None;

            for (position, &parent) in node.parents().iter().enumerate() {
                match sides.for_parent(position) {
                    None | Some(ChangeKind::Added) => continue,
                    Some(_) => {}
                }

                if key.is_none() {
                    key = Some(MatchKey {
                        scope: scope_of(self.kind, self.scopes, current)?,
                        signature: record.predecessor_signature().to_owned(),
                    });
                }
                let Some(match_key) = key.as_ref() else {
                    continue;
                };

                let candidates = self.predecessors(current.revision, parent, match_key)?;
                let predecessor = match candidates.as_slice() {
                    [] => {
                        return Err(LinkError::MissingPredecessor {
                            location: current,
                            parent: Some(parent),
                        })
                    }
                    [only] => *only,
                    _ => {
                        return Err(LinkError::Ambiguous {
                            location: current,
                            candidates,
                        })
                    }
                };

                let link = Link {
                    successor: current,
                    predecessor,
                };
                if !tree.links.contains(&link) {
                    tree.links.push(link);
                }

                if let Some(&owner) = self.owners.get(&predecessor) {
                    let conflict = match tree.graft {
                        Some(existing) => existing != owner,
                        None => !self.graft_shared_ancestors,
                    };
                    if conflict {
                        return Err(LinkError::AlreadyClaimed {
                            location: predecessor,
                            tree: owner,
                        });
                    }
                    tree.graft = Some(owner);
                    continue;
                }

                if tree.nodes.insert(predecessor) {
                    pending.push(predecessor);
                }
            }
        }

        Ok(tree)
    }

    /// Nearest matching records in the ancestry of `start`
    ///
    /// Each ancestry path stops at the first revision holding a record with
    /// the same identity. Deleted records end a path without becoming
    /// candidates. Returns distinct candidates, newest first.
    fn predecessors(
        &self,
        child: RevIdx,
        start: RevIdx,
        key: &MatchKey,
    ) -> Result<Vec<Location>, LinkError> {
        self.graph.parent_node(child, start)?;
        let Some(revisions) = self.index.revisions(key) else {
            return Ok(Vec::new());
        };

        let mut found = BTreeSet::new();
        let mut visited = HashSet::new();
        let mut stack = vec![(child, start)];

        while let Some((from, rev)) = stack.pop() {
            if !visited.insert(rev) {
                continue;
            }
            if let Some(hits) = revisions.get(&rev) {
                for &hit in hits {
                    let deleted = self
                        .graph
                        .record(self.kind, hit)
                        .map_or(false, |r| r.is_deleted());
                    if !deleted {
                        found.insert(hit);
                    }
                }
                continue;
            }
            // ancestors always have smaller indices
            if revisions.range(..rev).next().is_none() {
                continue;
            }
            let node = self.graph.parent_node(from, rev)?;
            for &parent in node.parents() {
                if !visited.contains(&parent) {
                    stack.push((rev, parent));
                }
            }
        }

        Ok(found.into_iter().rev().collect())
    }
}
