//! Forest validator
//!
//! For each branch head, the live snapshot is collected as ground truth and
//! the head's ancestry is walked, matching every change record. Branches are
//! independent and may run concurrently; a failing branch yields an error
//! outcome without affecting the others.

use crate::diagnostic::{DiagnosticSink, TracingSink};
use crate::error::ValidationError;
use crate::ground_truth::GroundTruthCollector;
use crate::run::BranchRun;
use crate::score::{BranchOutcome, BranchScore, ValidationReport};
use crate::snapshot::SnapshotSource;
use lineage_forest::Forests;
use lineage_history::{BranchHead, RevisionGraph};
use rayon::prelude::*;
use serde::Deserialize;

static TRACING_SINK: TracingSink = TracingSink;

/// Validation settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Validate branches concurrently
    pub parallel_branches: bool,

    /// Validate only these branches; empty means all
    pub branches: Vec<String>,

    /// Do not follow the later parents of merges that change no file
    pub skip_empty_merge_parents: bool,
}

impl ValidationConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With concurrent branch runs
    #[inline]
    #[must_use]
    pub fn with_parallel_branches(mut self, parallel: bool) -> Self {
        self.parallel_branches = parallel;
        self
    }

    /// Restrict validation to the named branches
    #[must_use]
    pub fn with_branches<I, S>(mut self, branches: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.branches = branches.into_iter().map(Into::into).collect();
        self
    }

    /// With skipping of later parents of empty merges
    #[inline]
    #[must_use]
    pub fn with_skip_empty_merge_parents(mut self, skip: bool) -> Self {
        self.skip_empty_merge_parents = skip;
        self
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            parallel_branches: true,
            branches: Vec::new(),
            skip_empty_merge_parents: true,
        }
    }
}

/// Cross-checks built forests against live snapshots
///
/// Usage:
/// ```rust,ignore
/// let report = Validator::new(&history, &forests, &snapshots).validate();
/// for row in report.rows() {
///     println!("{row:?}");
/// }
/// ```
pub struct Validator<'a, G: RevisionGraph, S: SnapshotSource> {
    graph: &'a G,
    forests: &'a Forests,
    snapshots: &'a S,
    sink: &'a dyn DiagnosticSink,
    config: ValidationConfig,
}

impl<'a, G: RevisionGraph, S: SnapshotSource> Validator<'a, G, S> {
    /// Validator logging diagnostics through `tracing`
    #[must_use]
    pub fn new(graph: &'a G, forests: &'a Forests, snapshots: &'a S) -> Self {
        Self {
            graph,
            forests,
            snapshots,
            sink: &TRACING_SINK,
            config: ValidationConfig::default(),
        }
    }

    /// Route diagnostics to `sink`
    #[must_use]
    pub fn with_sink(mut self, sink: &'a dyn DiagnosticSink) -> Self {
        self.sink = sink;
        self
    }

    /// With validation settings
    #[must_use]
    pub fn with_config(mut self, config: ValidationConfig) -> Self {
        self.config = config;
        self
    }

    /// Validation settings
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate every selected branch
    ///
    /// Outcomes keep branch order whether or not branches run concurrently.
    /// Filtered names the store does not know produce
    /// [`ValidationError::UnknownBranch`] outcomes.
    #[must_use]
    pub fn validate(&self) -> ValidationReport {
        let heads = self.graph.branch_heads();
        let mut unknown = Vec::new();
        let selected: Vec<&BranchHead> = if self.config.branches.is_empty() {
            heads.iter().collect()
        } else {
            for name in &self.config.branches {
                if !heads.iter().any(|b| &b.name == name) {
                    unknown.push(name.clone());
                }
            }
            heads
                .iter()
                .filter(|b| self.config.branches.contains(&b.name))
                .collect()
        };

        let outcome = |branch: &BranchHead| BranchOutcome {
            branch: branch.name.clone(),
            head: Some(branch.head),
            result: self.validate_branch(branch),
        };
        let mut outcomes: Vec<BranchOutcome> = if self.config.parallel_branches {
            selected.par_iter().map(|b| outcome(*b)).collect()
        } else {
            selected.iter().map(|b| outcome(*b)).collect()
        };

        outcomes.extend(unknown.into_iter().map(|name| BranchOutcome {
            result: Err(ValidationError::UnknownBranch(name.clone())),
            branch: name,
            head: None,
        }));

        for o in &outcomes {
            if let Err(err) = &o.result {
                tracing::error!(branch = %o.branch, error = %err, "branch validation aborted");
            }
        }
        ValidationReport::new(outcomes)
    }

    /// Validate one branch
    ///
    /// # Errors
    /// Missing or out-of-range revisions met by the walk, and snapshot
    /// collection failures
    pub fn validate_branch(&self, branch: &BranchHead) -> Result<BranchScore, ValidationError> {
        let head = self.graph.rev_node(branch.head)?;
        let span = tracing::info_span!("validate_branch", branch = %branch.name, head = head.id());
        let _guard = span.enter();

        let mut run = BranchRun::new(branch);
        let live = GroundTruthCollector::collect(self.snapshots.live_snapshot(branch.head)?)?;
        let counts = live.counts();
        run.collected(live)?;
        tracing::info!(
            head = branch.head,
            files = counts[0],
            declarations = counts[1],
            fields = counts[2],
            methods = counts[3],
            "collected live snapshot"
        );

        run.walk(
            self.graph,
            self.forests,
            self.sink,
            self.config.skip_empty_merge_parents,
        )?;
        let score = run.score(head.id(), self.sink)?;

        for kind in score.kinds() {
            tracing::info!(
                changes = kind.changes,
                unmatched = kind.unmatched,
                live = kind.live,
                residual = kind.residual,
                residual_ratio = kind.residual_ratio(),
                matched_ratio = kind.matched_ratio(),
                "{} summary",
                kind.kind
            );
        }
        Ok(score)
    }
}
