//! Per-branch scores

use crate::error::ValidationError;
use lineage_history::{ElementKind, RevIdx};
use serde::Serialize;

/// `1 - bad / total`, or 1.0 for an empty denominator
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn ratio(bad: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        1.0 - bad as f64 / total as f64
    }
}

/// Counts for one element kind on one branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KindScore {
    /// Element kind
    pub kind: ElementKind,
    /// Live elements before the walk
    pub live: usize,
    /// Live elements no change record claimed
    pub residual: usize,
    /// Change records encountered by the walk
    pub changes: usize,
    /// Change records matching nothing
    pub unmatched: usize,
}

impl KindScore {
    /// Zeroed counts for `kind`
    #[must_use]
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            live: 0,
            residual: 0,
            changes: 0,
            unmatched: 0,
        }
    }

    /// Share of encountered changes that matched
    #[must_use]
    pub fn matched_ratio(&self) -> f64 {
        ratio(self.unmatched, self.changes)
    }

    /// Share of live elements some change produced
    #[must_use]
    pub fn residual_ratio(&self) -> f64 {
        ratio(self.residual, self.live)
    }

    /// True if nothing was unmatched or residual
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.unmatched == 0 && self.residual == 0
    }
}

/// Validation result of one branch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchScore {
    /// Branch name
    pub branch: String,
    /// Head revision index
    pub head: RevIdx,
    /// Head commit identifier
    pub head_id: String,
    kinds: [KindScore; 4],
}

impl BranchScore {
    pub(crate) fn new(branch: String, head: RevIdx, head_id: String, kinds: [KindScore; 4]) -> Self {
        Self {
            branch,
            head,
            head_id,
            kinds,
        }
    }

    /// Score of one kind
    #[inline]
    #[must_use]
    pub fn kind(&self, kind: ElementKind) -> &KindScore {
        &self.kinds[kind.index()]
    }

    /// Scores in [`ElementKind::ALL`] order
    #[must_use]
    pub fn kinds(&self) -> &[KindScore; 4] {
        &self.kinds
    }

    /// The eight ratios: residual then matched, per kind in build order
    #[must_use]
    pub fn row(&self) -> [f64; 8] {
        let mut row = [0.0; 8];
        for (i, score) in self.kinds.iter().enumerate() {
            row[2 * i] = score.residual_ratio();
            row[2 * i + 1] = score.matched_ratio();
        }
        row
    }

    /// No unmatched change and no residual element of any kind
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.kinds.iter().all(KindScore::is_clean)
    }
}

/// Outcome of one branch run
#[derive(Debug)]
pub struct BranchOutcome {
    /// Branch name
    pub branch: String,
    /// Head revision, `None` for unknown branches
    pub head: Option<RevIdx>,
    /// Score, or the error that aborted the run
    pub result: Result<BranchScore, ValidationError>,
}

/// Outcomes of every validated branch, in branch order
#[derive(Debug, Default)]
pub struct ValidationReport {
    outcomes: Vec<BranchOutcome>,
}

impl ValidationReport {
    pub(crate) fn new(outcomes: Vec<BranchOutcome>) -> Self {
        Self { outcomes }
    }

    /// Outcomes in branch order
    #[must_use]
    pub fn outcomes(&self) -> &[BranchOutcome] {
        &self.outcomes
    }

    /// Scores of branches that completed
    pub fn scores(&self) -> impl Iterator<Item = &BranchScore> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    /// Branches whose run aborted, with the cause
    pub fn failures(&self) -> impl Iterator<Item = (&str, &ValidationError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.branch.as_str(), e)))
    }

    /// Score rows of completed branches
    #[must_use]
    pub fn rows(&self) -> Vec<[f64; 8]> {
        self.scores().map(BranchScore::row).collect()
    }

    /// Score of a branch by name
    #[must_use]
    pub fn score(&self, branch: &str) -> Option<&BranchScore> {
        self.scores().find(|s| s.branch == branch)
    }

    /// Every branch completed with no mismatch
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| o.result.as_ref().is_ok_and(BranchScore::is_clean))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_of_empty_denominator_is_one() {
        assert!((ratio(0, 0) - 1.0).abs() < f64::EPSILON);
        assert!((ratio(3, 0) - 1.0).abs() < f64::EPSILON);
        assert!((ratio(1, 4) - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn row_interleaves_residual_and_matched() {
        let mut kinds = ElementKind::ALL.map(KindScore::new);
        kinds[3].changes = 4;
        kinds[3].unmatched = 1;
        kinds[0].live = 2;
        kinds[0].residual = 1;
        let score = BranchScore::new("main".into(), 2, "c2".into(), kinds);
        let row = score.row();
        assert!((row[0] - 0.5).abs() < f64::EPSILON);
        assert!((row[1] - 1.0).abs() < f64::EPSILON);
        assert!((row[7] - 0.75).abs() < f64::EPSILON);
        assert!(!score.is_clean());
    }
}
