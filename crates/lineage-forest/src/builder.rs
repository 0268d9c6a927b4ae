//! Lineage forest builder
//!
//! Partitions the change records of each kind into lineage trees. Records are
//! seeded newest first so a tree only ever grows toward ancestors; by the time
//! a record is reached as a seed, every record that could descend from it has
//! already been resolved.

use crate::error::BuildError;
use crate::linker::{MatchIndex, TreeLinker};
use crate::tree::{Forest, Forests};
use lineage_history::{ElementKind, RevisionGraph};
use serde::Deserialize;

/// Forest construction settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Build the field and method forests concurrently
    pub parallel_members: bool,

    /// Attach a seed whose predecessor already belongs to a tree to that
    /// tree; when off, such a seed is discarded as already claimed
    pub graft_shared_ancestors: bool,
}

impl BuildConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With concurrent member forests
    #[inline]
    #[must_use]
    pub fn with_parallel_members(mut self, parallel: bool) -> Self {
        self.parallel_members = parallel;
        self
    }

    /// With grafting onto existing trees
    #[inline]
    #[must_use]
    pub fn with_graft_shared_ancestors(mut self, graft: bool) -> Self {
        self.graft_shared_ancestors = graft;
        self
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            parallel_members: true,
            graft_shared_ancestors: true,
        }
    }
}

/// Builds the per-kind forests of one revision graph
///
/// Usage:
/// ```rust,ignore
/// let forests = ForestBuilder::new(&history).build_all()?;
/// let tree = forests.methods().tree_of(location);
/// ```
#[derive(Debug)]
pub struct ForestBuilder<'a, G: RevisionGraph> {
    graph: &'a G,
    config: BuildConfig,
}

impl<'a, G: RevisionGraph> ForestBuilder<'a, G> {
    /// Create a builder with default configuration
    #[must_use]
    pub fn new(graph: &'a G) -> Self {
        Self {
            graph,
            config: BuildConfig::default(),
        }
    }

    /// Create a builder with custom configuration
    #[must_use]
    pub fn with_config(graph: &'a G, config: BuildConfig) -> Self {
        Self { graph, config }
    }

    /// Build all four forests: File, then Declaration, then Field and Method
    ///
    /// # Errors
    /// Only ordering errors, which cannot occur through this entry point;
    /// link failures are counted per forest in [`Forest::stats`].
    pub fn build_all(&self) -> Result<Forests, BuildError> {
        let files = self.build(ElementKind::File, None)?;
        let declarations = self.build(ElementKind::Declaration, Some(&files))?;

        let (fields, methods) = if self.config.parallel_members {
            rayon::join(
                || self.build(ElementKind::Field, Some(&declarations)),
                || self.build(ElementKind::Method, Some(&declarations)),
            )
        } else {
            (
                self.build(ElementKind::Field, Some(&declarations)),
                self.build(ElementKind::Method, Some(&declarations)),
            )
        };

        Ok(Forests::new(files, declarations, fields?, methods?))
    }

    /// Build the forest of one kind
    ///
    /// `scopes` must be the completed forest of `kind.scope()`.
    ///
    /// # Errors
    /// [`BuildError::ScopeNotBuilt`] if the scoping forest is missing or of
    /// the wrong kind
    pub fn build(&self, kind: ElementKind, scopes: Option<&Forest>) -> Result<Forest, BuildError> {
        if let Some(requires) = kind.scope() {
            if scopes.map(Forest::kind) != Some(requires) {
                return Err(BuildError::ScopeNotBuilt { kind, requires });
            }
        }

        let span = tracing::info_span!("build_forest", kind = %kind);
        let _guard = span.enter();

        let locations = self.graph.locations(kind);
        let index = MatchIndex::build(self.graph, kind, scopes, &locations);
        let mut forest = Forest::new(kind);

        for &seed in locations.iter().rev() {
            if forest.tree_of(seed).is_some() {
                continue;
            }
            forest.stats_mut().seeds += 1;

            let linked = TreeLinker {
                graph: self.graph,
                kind,
                index: &index,
                scopes,
                owners: forest.owners(),
                graft_shared_ancestors: self.config.graft_shared_ancestors,
            }
            .link(seed);

            match linked {
                Ok(tree) => {
                    let size = tree.nodes.len();
                    let id = forest.insert(tree);
                    tracing::trace!(%seed, tree = %id, size, "linked lineage tree");
                }
                Err(err) => {
                    tracing::debug!(%seed, error = %err, "discarded lineage tree");
                    forest.stats_mut().record_failure(&err);
                }
            }
        }

        let stats = forest.stats();
        tracing::info!(
            records = locations.len(),
            trees = forest.len(),
            seeds = stats.seeds,
            failed = stats.failed(),
            "built {kind} forest"
        );
        Ok(forest)
    }
}
