//! Branch validation run
//!
//! A run owns all scratch state for one branch head: live signatures, the
//! visited revision and tree sets, the already-matched signature set and the
//! per-kind tallies. Runs share nothing mutable, so branches validate
//! independently.

use crate::diagnostic::{Diagnostic, DiagnosticSink};
use crate::error::ValidationError;
use crate::ground_truth::LiveSignatures;
use crate::score::{BranchScore, KindScore};
use lineage_forest::{Forests, TreeId};
use lineage_history::{BranchHead, ChangeRecord, ElementKind, Location, RevIdx, RevNode, RevisionGraph};
use std::collections::HashSet;

/// Lifecycle of a branch run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    /// Created, nothing collected
    Init,
    /// Ground truth installed
    SnapshotCollected,
    /// Ancestor walk in progress
    Walking,
    /// Score produced; terminal
    Scored,
}

/// States reachable from `from`
#[must_use]
pub fn allowed_transitions(from: RunState) -> &'static [RunState] {
    use RunState::{Init, Scored, SnapshotCollected, Walking};
    match from {
        Init => &[SnapshotCollected],
        SnapshotCollected => &[Walking],
        Walking => &[Scored],
        Scored => &[],
    }
}

/// Validate a run state transition
///
/// # Errors
/// [`ValidationError::IllegalTransition`] for any edge not in
/// [`allowed_transitions`]
pub fn validate_transition(from: RunState, to: RunState) -> Result<(), ValidationError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(ValidationError::IllegalTransition { from, to })
    }
}

/// Scratch state of one branch validation
#[derive(Debug)]
pub(crate) struct BranchRun<'a> {
    branch: &'a BranchHead,
    state: RunState,
    live: LiveSignatures,
    live_before: [usize; 4],
    visited_revisions: HashSet<RevIdx>,
    visited_trees: [HashSet<TreeId>; 4],
    seen_signatures: HashSet<String>,
    changes: [usize; 4],
    unmatched: [usize; 4],
}

impl<'a> BranchRun<'a> {
    pub(crate) fn new(branch: &'a BranchHead) -> Self {
        Self {
            branch,
            state: RunState::Init,
            live: LiveSignatures::default(),
            live_before: [0; 4],
            visited_revisions: HashSet::new(),
            visited_trees: Default::default(),
            seen_signatures: HashSet::new(),
            changes: [0; 4],
            unmatched: [0; 4],
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> RunState {
        self.state
    }

    fn advance(&mut self, to: RunState) -> Result<(), ValidationError> {
        validate_transition(self.state, to)?;
        self.state = to;
        Ok(())
    }

    /// Install the ground truth collected at the head
    pub(crate) fn collected(&mut self, live: LiveSignatures) -> Result<(), ValidationError> {
        self.advance(RunState::SnapshotCollected)?;
        self.live_before = live.counts();
        self.live = live;
        Ok(())
    }

    /// Revisions the walk reached
    #[cfg(test)]
    pub(crate) fn visited_revisions(&self) -> &HashSet<RevIdx> {
        &self.visited_revisions
    }

    /// Depth-first walk over the head's ancestry, matching every record
    ///
    /// Each revision is matched once. Parents are pushed last to first, so
    /// the first parent's history is walked first. When a merge carries no
    /// changed files and `skip_empty_merge_parents` is set, its later parents
    /// are not followed.
    pub(crate) fn walk<G: RevisionGraph>(
        &mut self,
        graph: &G,
        forests: &Forests,
        sink: &dyn DiagnosticSink,
        skip_empty_merge_parents: bool,
    ) -> Result<(), ValidationError> {
        self.advance(RunState::Walking)?;

        let mut stack = vec![graph.rev_node(self.branch.head)?];
        while let Some(node) = stack.pop() {
            if !self.visited_revisions.insert(node.index()) {
                continue;
            }
            self.match_revision(node, forests, sink);

            let empty = node.changed_files().is_empty();
            for (position, &parent) in node.parents().iter().enumerate().rev() {
                if position >= 1 && empty && skip_empty_merge_parents {
                    continue;
                }
                if !self.visited_revisions.contains(&parent) {
                    stack.push(graph.parent_node(node.index(), parent)?);
                }
            }
        }
        Ok(())
    }

    fn match_revision(&mut self, node: RevNode<'_>, forests: &Forests, sink: &dyn DiagnosticSink) {
        let rev = node.index();
        for (fi, file) in node.changed_files().iter().enumerate() {
            let file_sig = file.signature().to_owned();
            self.match_record(
                ElementKind::File,
                Location::file(rev, fi),
                file,
                &file_sig,
                forests,
                sink,
            );

            for (di, decl) in file.declarations.iter().enumerate() {
                let decl_sig = format!("{file_sig} {}", decl.signature());
                self.match_record(
                    ElementKind::Declaration,
                    Location::declaration(rev, fi, di),
                    decl,
                    &decl_sig,
                    forests,
                    sink,
                );

                for kind in [ElementKind::Field, ElementKind::Method] {
                    for (mi, member) in decl.members(kind).iter().enumerate() {
                        let member_sig = format!("{decl_sig} {}", member.signature());
                        self.match_record(
                            kind,
                            Location::member(rev, fi, di, mi),
                            member,
                            &member_sig,
                            forests,
                            sink,
                        );
                    }
                }
            }
        }
    }

    /// Match one record against the ground truth
    ///
    /// A tree is resolved at most once per run; later records of a resolved
    /// tree only clear their signature. Deletions resolve their tree without
    /// matching. Signatures already seen through another path are accepted
    /// silently.
    fn match_record(
        &mut self,
        kind: ElementKind,
        location: Location,
        record: &dyn ChangeRecord,
        signature: &str,
        forests: &Forests,
        sink: &dyn DiagnosticSink,
    ) {
        let k = kind.index();
        self.changes[k] += 1;

        let forest = forests.get(kind);
        let tree = forest.tree_of(location);
        let resolved = tree.is_some_and(|t| self.visited_trees[k].contains(&t));

        if resolved {
            self.live.remove(kind, signature);
        } else if record.is_deleted()
            || self.live.remove(kind, signature)
            || self.seen_signatures.contains(signature)
        {
            if let Some(t) = tree {
                self.visited_trees[k].insert(t);
            }
        } else {
            self.unmatched[k] += 1;
            sink.emit(Diagnostic::UnmatchedChange {
                branch: self.branch.name.clone(),
                kind,
                location,
                signature: signature.to_owned(),
                tree,
                tree_size: tree.and_then(|t| forest.get(t)).map_or(0, |t| t.len()),
            });
        }

        self.seen_signatures.insert(signature.to_owned());
    }

    /// Report residuals and produce the score
    pub(crate) fn score(mut self, head_id: &str, sink: &dyn DiagnosticSink) -> Result<BranchScore, ValidationError> {
        self.advance(RunState::Scored)?;

        let mut kinds = ElementKind::ALL.map(KindScore::new);
        for (score, kind) in kinds.iter_mut().zip(ElementKind::ALL) {
            let k = kind.index();
            let residuals = self.live.get(kind);
            for signature in residuals {
                sink.emit(Diagnostic::ResidualLiveElement {
                    branch: self.branch.name.clone(),
                    kind,
                    signature: signature.clone(),
                });
            }
            score.live = self.live_before[k];
            score.residual = residuals.len();
            score.changes = self.changes[k];
            score.unmatched = self.unmatched[k];
        }

        Ok(BranchScore::new(
            self.branch.name.clone(),
            self.branch.head,
            head_id.to_owned(),
            kinds,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_states_advance_in_order() {
        assert!(validate_transition(RunState::Init, RunState::SnapshotCollected).is_ok());
        assert!(validate_transition(RunState::SnapshotCollected, RunState::Walking).is_ok());
        assert!(validate_transition(RunState::Walking, RunState::Scored).is_ok());
    }

    #[test]
    fn skipping_or_reopening_is_illegal() {
        assert!(matches!(
            validate_transition(RunState::Init, RunState::Walking),
            Err(ValidationError::IllegalTransition { .. })
        ));
        assert!(allowed_transitions(RunState::Scored).is_empty());
        assert!(validate_transition(RunState::Walking, RunState::SnapshotCollected).is_err());
    }

    fn revision(id: &str, parents: Vec<RevIdx>, files: &[&str]) -> lineage_history::Revision {
        let mut revision = lineage_history::Revision::new(id, parents);
        for name in files {
            let kind = if revision.parents.is_empty() {
                lineage_history::ChangeKind::Added
            } else {
                lineage_history::ChangeKind::Modified
            };
            revision
                .files
                .push(lineage_history::FileChange::new(lineage_history::Change::new(*name, kind)));
        }
        revision
    }

    #[test]
    fn empty_merge_leaves_feature_side_unvisited() {
        let history = lineage_history::History::new(
            vec![
                revision("c0", vec![], &["F.java"]),
                revision("feature", vec![0], &["F.java"]),
                revision("dangling", vec![1], &["F.java"]),
                revision("c3", vec![0], &["F.java"]),
                revision("merge", vec![3, 1], &[]),
            ],
            vec![BranchHead::new("main", 4)],
        )
        .unwrap();
        let forests = lineage_forest::ForestBuilder::new(&history).build_all().unwrap();
        let sink = crate::diagnostic::CollectingSink::new();
        let branch = &history.branch_heads()[0];

        let mut run = BranchRun::new(branch);
        run.collected(LiveSignatures::default()).unwrap();
        run.walk(&history, &forests, &sink, true).unwrap();
        let mut visited: Vec<RevIdx> = run.visited_revisions().iter().copied().collect();
        visited.sort_unstable();
        assert_eq!(visited, vec![0, 3, 4]);

        let mut run = BranchRun::new(branch);
        run.collected(LiveSignatures::default()).unwrap();
        run.walk(&history, &forests, &sink, false).unwrap();
        assert!(run.visited_revisions().contains(&1));
        assert!(!run.visited_revisions().contains(&2));
    }

    #[test]
    fn walk_before_snapshot_is_rejected() {
        let branch = BranchHead::new("main", 0);
        let mut run = BranchRun::new(&branch);
        assert_eq!(run.state(), RunState::Init);
        assert!(run.advance(RunState::Walking).is_err());
        assert!(run.collected(LiveSignatures::default()).is_ok());
        assert_eq!(run.state(), RunState::SnapshotCollected);
    }
}
