//! Lineage CLI support
//!
//! Input document and configuration loading plus report rendering for the
//! `lineage` binary.
//!
//! The input document is one JSON object:
//!
//! ```json
//! {
//!   "revisions": [{ "id": "c0", "parents": [], "files": [] }],
//!   "branches": [{ "name": "main", "head": 0 }],
//!   "snapshots": { "0": [{ "name": "F.java", "declarations": [] }] }
//! }
//! ```

#![allow(clippy::module_name_repetitions)]

use anyhow::{Context, Result};
use lineage_forest::{BuildConfig, BuildStats, ForestBuilder, Forests};
use lineage_history::{BranchHead, ElementKind, History, RevIdx, Revision, RevisionGraph};
use lineage_validate::{BranchScore, Diagnostic, InMemorySnapshots, ValidationConfig, ValidationReport};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

/// Log filter used when neither `RUST_LOG` nor the config sets one
pub const DEFAULT_LOG_FILTER: &str = "lineage=info";

/// Top-level configuration, read from TOML
///
/// ```toml
/// log_filter = "lineage=debug"
///
/// [build]
/// parallel_members = true
/// graft_shared_ancestors = true
///
/// [validation]
/// branches = ["main"]
/// skip_empty_merge_parents = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LineageConfig {
    /// `tracing` filter directives
    pub log_filter: Option<String>,
    /// Forest construction
    pub build: BuildConfig,
    /// Branch validation
    pub validation: ValidationConfig,
}

impl LineageConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a log filter
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = Some(filter.into());
        self
    }

    /// With forest construction settings
    #[must_use]
    pub fn with_build(mut self, build: BuildConfig) -> Self {
        self.build = build;
        self
    }

    /// With validation settings
    #[must_use]
    pub fn with_validation(mut self, validation: ValidationConfig) -> Self {
        self.validation = validation;
        self
    }

    /// Parse a TOML document
    ///
    /// # Errors
    /// Malformed TOML or unknown value types
    pub fn from_toml(toml: &str) -> Result<Self> {
        toml::from_str(toml).context("parsing lineage configuration")
    }

    /// Read a TOML file
    ///
    /// # Errors
    /// I/O and parse failures
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&text)
    }

    /// Effective log filter
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}

#[derive(Deserialize)]
struct RawDocument {
    #[serde(default)]
    revisions: Vec<Revision>,
    #[serde(default)]
    branches: Vec<BranchHead>,
    #[serde(default)]
    snapshots: InMemorySnapshots,
}

/// Checked revision graph together with the live snapshots of its heads
#[derive(Debug)]
pub struct Document {
    /// Revision graph store
    pub history: History,
    /// Live snapshots keyed by head revision
    pub snapshots: InMemorySnapshots,
}

impl Document {
    /// Decode and check a JSON document
    ///
    /// # Errors
    /// Decoding failures and revision graph inconsistencies
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawDocument = serde_json::from_str(json).context("decoding history document")?;
        let history =
            History::new(raw.revisions, raw.branches).context("inconsistent revision graph")?;
        Ok(Self {
            history,
            snapshots: raw.snapshots,
        })
    }

    /// Read a JSON document from disk
    ///
    /// # Errors
    /// I/O failures and everything [`Document::from_json`] reports
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading history {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("loading {}", path.display()))
    }
}

/// Build the four forests with the configured settings
///
/// # Errors
/// Forest ordering errors
pub fn build_forests(history: &History, config: &LineageConfig) -> Result<Forests> {
    ForestBuilder::with_config(history, config.build)
        .build_all()
        .context("building lineage forests")
}

/// Tab-separated score rows, one line per branch
#[must_use]
pub fn render_rows(report: &ValidationReport) -> String {
    let mut out = String::from("branch\thead");
    for kind in ElementKind::ALL {
        let _ = write!(out, "\tresidual_{kind}\tmatched_{kind}");
    }
    out.push('\n');

    for outcome in report.outcomes() {
        match &outcome.result {
            Ok(score) => {
                let _ = write!(out, "{}\t{}", score.branch, score.head_id);
                for ratio in score.row() {
                    let _ = write!(out, "\t{ratio:.4}");
                }
            }
            Err(err) => {
                let _ = write!(out, "{}\t-\terror: {err}", outcome.branch);
            }
        }
        out.push('\n');
    }
    out
}

#[derive(Serialize)]
struct BranchEntry<'a> {
    branch: &'a str,
    head: Option<RevIdx>,
    #[serde(skip_serializing_if = "Option::is_none")]
    row: Option<[f64; 8]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    score: Option<&'a BranchScore>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    branches: Vec<BranchEntry<'a>>,
    diagnostics: &'a [Diagnostic],
}

/// Machine-readable report with the collected diagnostics
///
/// # Errors
/// Serialization failures
pub fn json_report(report: &ValidationReport, diagnostics: &[Diagnostic]) -> Result<String> {
    let branches = report
        .outcomes()
        .iter()
        .map(|o| BranchEntry {
            branch: &o.branch,
            head: o.head,
            row: o.result.as_ref().ok().map(BranchScore::row),
            score: o.result.as_ref().ok(),
            error: o.result.as_ref().err().map(ToString::to_string),
        })
        .collect();
    serde_json::to_string_pretty(&JsonReport {
        branches,
        diagnostics,
    })
    .context("serializing report")
}

/// Size and build outcome of one forest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForestSummary {
    /// Element kind
    pub kind: ElementKind,
    /// Change records of this kind in the history
    pub records: usize,
    /// Retained trees
    pub trees: usize,
    /// Records owned by a retained tree
    pub assigned: usize,
    /// Seed outcomes
    pub stats: BuildStats,
}

/// One summary per kind, in build order
#[must_use]
pub fn forest_summaries(history: &History, forests: &Forests) -> Vec<ForestSummary> {
    ElementKind::ALL
        .into_iter()
        .map(|kind| {
            let forest = forests.get(kind);
            ForestSummary {
                kind,
                records: history.locations(kind).len(),
                trees: forest.len(),
                assigned: forest.assigned(),
                stats: *forest.stats(),
            }
        })
        .collect()
}

/// Tab-separated forest summaries
#[must_use]
pub fn render_summaries(summaries: &[ForestSummary]) -> String {
    let mut out = String::from(
        "kind\trecords\ttrees\tassigned\tgrafted\tambiguous\tmissing\tclaimed\tdetached\tgraph\n",
    );
    for s in summaries {
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            s.kind,
            s.records,
            s.trees,
            s.assigned,
            s.stats.grafted,
            s.stats.failed_ambiguous,
            s.stats.failed_missing,
            s.stats.failed_claimed,
            s.stats.failed_detached,
            s.stats.failed_graph
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn config_defaults_fill_missing_sections() {
        let config = LineageConfig::from_toml("[validation]\nbranches = [\"main\"]\n").unwrap();
        assert_eq!(config.validation.branches, vec!["main".to_string()]);
        assert!(config.validation.skip_empty_merge_parents);
        assert!(config.build.parallel_members);
        assert_eq!(config.log_filter(), DEFAULT_LOG_FILTER);
    }

    #[test]
    fn config_rejects_wrong_types() {
        assert!(LineageConfig::from_toml("[build]\nparallel_members = \"yes\"\n").is_err());
    }

    #[test]
    fn document_with_forward_parent_is_rejected() {
        let json = r#"{ "revisions": [{ "id": "c0", "parents": [1] }, { "id": "c1" }] }"#;
        assert!(Document::from_json(json).is_err());
    }
}
