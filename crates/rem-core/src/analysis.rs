//! End-to-end analysis of one application.
//!
//! [`PreparedGraph::prepare`] parses, builds and links; the caller then looks
//! up health records for [`PreparedGraph::package_names`] in one batch and
//! hands them to [`PreparedGraph::attach_health`]. [`PreparedGraph::analyze`]
//! runs ripple analysis, filtering and annotation on the runtime and
//! development views separately and composes the results.

use crate::annotate::ProblemAnnotator;
use crate::builder::{BuildLimits, LockfileGraphBuilder};
use crate::error::Result;
use crate::filter::{FilterOptions, MinimumScoreFilter, DEFAULT_COLLAPSE_THRESHOLD};
use crate::graph::DependencyGraph;
use crate::linker::ManifestLinker;
use crate::npm::{Lockfile, Manifest};
use crate::ripple::{RippleEffect, RippleEffectAnalyzer, RippleOptions, RippleStats, TargetSelector};
use crate::types::{validate_health, DependencyType, Diagnostic, HealthTable, MetricKind, PackageIdentity};
use petgraph::stable_graph::NodeIndex;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Parameters of [`PreparedGraph::analyze`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisOptions {
    /// Metric driving filtering and annotation
    pub metric: MetricKind,
    /// Produce a filtered graph
    pub filter: bool,
    /// Collapse threshold of the filter
    pub threshold: f64,
    /// Treat every deprecated package as flagged
    pub flag_deprecated: bool,
    /// Ripple enumeration bound
    pub ripple: RippleOptions,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            metric: MetricKind::default(),
            filter: true,
            threshold: DEFAULT_COLLAPSE_THRESHOLD,
            flag_deprecated: true,
            ripple: RippleOptions::default(),
        }
    }
}

impl AnalysisOptions {
    /// Validated filter options
    pub fn filter_options(&self) -> Result<FilterOptions> {
        FilterOptions::new(self.metric, self.threshold)
    }
}

/// A top-level dependency declared by the manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectDependency {
    /// Package name
    pub name: String,
    /// Installed version
    pub version: String,
    /// Declared constraint
    pub constraint: Option<String>,
}

/// A deprecated package found in a view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeprecatedPackage {
    /// The installed copy
    pub identity: PackageIdentity,
    /// Deprecation message
    pub message: Option<String>,
}

/// Shape of the runtime or development view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubgraphSummary {
    /// Which view
    pub dep_type: DependencyType,
    /// Node count, root included
    pub nodes: usize,
    /// Edge count
    pub edges: usize,
    /// Direct dependencies, by name
    pub direct: Vec<DirectDependency>,
    /// Deprecated packages, in index order
    pub deprecated: Vec<DeprecatedPackage>,
    /// Ripple coverage
    pub ripple: RippleStats,
    /// Whether ripple enumeration hit the path bound
    pub ripple_truncated: bool,
}

impl SubgraphSummary {
    fn new(dep_type: DependencyType, graph: &DependencyGraph, effect: &RippleEffect) -> Self {
        let root = graph.root();
        let mut direct: Vec<DirectDependency> = graph
            .successors(root)
            .map(|idx| DirectDependency {
                name: graph[idx].name().to_string(),
                version: graph[idx].version().to_string(),
                constraint: graph.edge(root, idx).and_then(|e| e.constraint.clone()),
            })
            .collect();
        direct.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.version.cmp(&b.version)));

        let deprecated = graph
            .nodes()
            .filter(|(_, node)| node.deprecated)
            .map(|(_, node)| DeprecatedPackage {
                identity: node.identity.clone(),
                message: node.deprecation_message.clone(),
            })
            .collect();

        Self {
            dep_type,
            nodes: graph.node_count(),
            edges: graph.edge_count(),
            direct,
            deprecated,
            ripple: effect.stats(graph),
            ripple_truncated: effect.truncated(),
        }
    }
}

/// Everything one analysis produces
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    /// Metric used for filtering and annotation
    pub metric: MetricKind,
    /// Runtime and development views composed, with ripple marks
    pub graph: DependencyGraph,
    /// Filtered and annotated graph, when filtering was enabled
    pub filtered: Option<DependencyGraph>,
    /// Root plus every node and edge on a ripple path
    pub ripple_graph: DependencyGraph,
    /// Runtime view summary
    pub runtime: SubgraphSummary,
    /// Development view summary
    pub development: SubgraphSummary,
    /// Flagged packages found in either view
    pub targets: Vec<PackageIdentity>,
    /// Diagnostics from preparation and analysis
    pub diagnostics: Vec<Diagnostic>,
}

impl AnalysisReport {
    /// Identity of the analyzed application
    pub fn root(&self) -> &PackageIdentity {
        &self.graph.root_node().identity
    }

    /// Whether anything was flagged in either view
    pub fn has_ripple_effect(&self) -> bool {
        !self.targets.is_empty()
    }
}

/// Built and linked graph awaiting health data and analysis
#[derive(Debug, Clone)]
pub struct PreparedGraph {
    graph: DependencyGraph,
    diagnostics: Vec<Diagnostic>,
}

/// Parse, build and link; see [`PreparedGraph::prepare`]
pub fn prepare(manifest_json: &str, lockfile_json: &str, limits: BuildLimits) -> Result<PreparedGraph> {
    PreparedGraph::prepare(manifest_json, lockfile_json, limits)
}

impl PreparedGraph {
    /// Parse both documents, then build and link the graph
    ///
    /// # Errors
    /// Input errors for malformed documents, [`Error::EmptyDependencies`]
    /// when the manifest declares nothing, resource errors from the builder
    ///
    /// [`Error::EmptyDependencies`]: crate::Error::EmptyDependencies
    pub fn prepare(manifest_json: &str, lockfile_json: &str, limits: BuildLimits) -> Result<Self> {
        let manifest = Manifest::from_json(manifest_json)?;
        let lockfile = Lockfile::from_json(lockfile_json)?;
        Self::from_documents(&manifest, &lockfile, limits)
    }

    /// Build and link already parsed documents
    pub fn from_documents(manifest: &Manifest, lockfile: &Lockfile, limits: BuildLimits) -> Result<Self> {
        manifest.ensure_dependencies()?;

        let output = LockfileGraphBuilder::with_limits(limits).build(lockfile)?;
        let mut graph = output.graph;
        let mut diagnostics = output.diagnostics;
        diagnostics.extend(ManifestLinker::new().link(&mut graph, manifest));

        info!(
            root = %graph.root_node().identity,
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            diagnostics = diagnostics.len(),
            "prepared dependency graph"
        );
        Ok(Self { graph, diagnostics })
    }

    /// The linked graph
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Diagnostics from building and linking
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Distinct package names to look up health records for
    pub fn package_names(&self) -> BTreeSet<String> {
        self.graph.package_names()
    }

    /// Attach health records by package name, returning the number of nodes updated.
    ///
    /// # Errors
    /// Returns [`Error::InvalidInput`](crate::Error::InvalidInput) when a
    /// record holds a score outside `[0, 1]`; no record is attached then
    pub fn attach_health(&mut self, table: &HealthTable) -> Result<usize> {
        validate_health(table)?;
        let updated = self.graph.apply_health(table);
        debug!(records = table.len(), updated, "attached health records");
        Ok(updated)
    }

    /// Run ripple analysis, filtering and annotation.
    ///
    /// # Errors
    /// Returns [`Error::InvalidThreshold`](crate::Error::InvalidThreshold)
    /// when filtering is enabled with an invalid threshold
    pub fn analyze(&self, targets: &[TargetSelector], options: &AnalysisOptions) -> Result<AnalysisReport> {
        let filter = if options.filter {
            Some(MinimumScoreFilter::new(options.filter_options()?)?)
        } else {
            None
        };

        let analyzer = RippleEffectAnalyzer::new(options.ripple);
        let (runtime, development) = self.graph.split_by_dependency_type();
        let runtime_view = View::new(runtime, &analyzer, targets, options.flag_deprecated);
        let development_view = View::new(development, &analyzer, targets, options.flag_deprecated);

        let graph = runtime_view.graph.compose(&development_view.graph);
        let ripple_graph = runtime_view
            .effect
            .subgraph(&runtime_view.graph)
            .compose(&development_view.effect.subgraph(&development_view.graph));

        let mut diagnostics = self.diagnostics.clone();
        let filtered = match filter {
            Some(filter) => {
                let runtime_out = filter.filter(&runtime_view.graph, &runtime_view.effect);
                let development_out = filter.filter(&development_view.graph, &development_view.effect);
                diagnostics.extend(runtime_out.diagnostics);
                diagnostics.extend(development_out.diagnostics);

                let mut runtime_filtered = runtime_out.graph;
                let mut development_filtered = development_out.graph;
                keep_only_flag(&mut runtime_filtered, DependencyType::Runtime);
                keep_only_flag(&mut development_filtered, DependencyType::Development);

                let mut composed = runtime_filtered.compose(&development_filtered);
                ProblemAnnotator::new(options.metric)
                    .annotate(&composed)
                    .apply(&mut composed);
                Some(composed)
            }
            None => None,
        };

        let mut flagged: BTreeSet<PackageIdentity> = BTreeSet::new();
        for view in [&runtime_view, &development_view] {
            flagged.extend(view.effect.targets().map(|idx| view.graph[idx].identity.clone()));
        }

        let report = AnalysisReport {
            metric: options.metric,
            runtime: SubgraphSummary::new(DependencyType::Runtime, &runtime_view.graph, &runtime_view.effect),
            development: SubgraphSummary::new(
                DependencyType::Development,
                &development_view.graph,
                &development_view.effect,
            ),
            graph,
            filtered,
            ripple_graph,
            targets: flagged.into_iter().collect(),
            diagnostics,
        };

        info!(
            targets = report.targets.len(),
            nodes = report.graph.node_count(),
            filtered_nodes = ?report.filtered.as_ref().map(DependencyGraph::node_count),
            "analysis complete"
        );
        Ok(report)
    }
}

/// One dependency-type view with its ripple marks applied
struct View {
    graph: DependencyGraph,
    effect: RippleEffect,
}

impl View {
    fn new(
        mut graph: DependencyGraph,
        analyzer: &RippleEffectAnalyzer,
        selectors: &[TargetSelector],
        flag_deprecated: bool,
    ) -> Self {
        let mut targets: BTreeSet<NodeIndex> = RippleEffectAnalyzer::resolve_targets(&graph, selectors)
            .into_iter()
            .collect();
        if flag_deprecated {
            targets.extend(
                graph
                    .nodes()
                    .filter(|(_, node)| node.deprecated && !node.is_root())
                    .map(|(idx, _)| idx),
            );
        }
        let targets: Vec<NodeIndex> = targets.into_iter().collect();

        let effect = analyzer.analyze_nodes(&graph, &targets);
        effect.apply(&mut graph);
        Self { graph, effect }
    }
}

/// Clear the other view's flag so the composition shows which view kept an edge
fn keep_only_flag(graph: &mut DependencyGraph, dep_type: DependencyType) {
    let edges: Vec<(NodeIndex, NodeIndex)> = graph.edges().map(|(from, to, _)| (from, to)).collect();
    for (from, to) in edges {
        if let Some(edge) = graph.edge_mut(from, to) {
            match dep_type {
                DependencyType::Runtime => edge.development = false,
                DependencyType::Development => edge.runtime = false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HealthMetrics, PackageHealth};

    const MANIFEST: &str = r#"{
      "name": "app", "version": "1.0.0",
      "dependencies": { "x": "^1.0.0", "y": "^1.0.0" },
      "devDependencies": { "lint": "^2.0.0" }
    }"#;

    const LOCKFILE: &str = r#"{
      "name": "app", "version": "1.0.0", "lockfileVersion": 1,
      "dependencies": {
        "x": { "version": "1.0.0", "requires": { "x1": "^1.0.0" } },
        "x1": { "version": "1.0.0", "requires": { "x2": "^1.0.0" } },
        "x2": { "version": "1.0.0" },
        "y": { "version": "1.0.0" },
        "lint": { "version": "2.0.0", "dev": true, "requires": { "x2": "^1.0.0", "old": "^0.1.0" } },
        "old": { "version": "0.1.0", "dev": true }
      }
    }"#;

    fn health(score: f64) -> PackageHealth {
        PackageHealth {
            metrics: HealthMetrics {
                final_score: Some(score),
                ..Default::default()
            },
            deprecated: None,
        }
    }

    fn prepared() -> PreparedGraph {
        let mut prepared = prepare(MANIFEST, LOCKFILE, BuildLimits::default()).unwrap();
        let mut table = HealthTable::new();
        for name in ["x", "x1", "x2"] {
            table.insert(name.to_string(), health(0.95));
        }
        table.insert("lint".to_string(), health(0.8));
        table.insert(
            "old".to_string(),
            PackageHealth {
                deprecated: Some("no longer maintained".into()),
                ..health(0.2)
            },
        );
        assert_eq!(prepared.attach_health(&table).unwrap(), 5);
        prepared
    }

    #[test]
    fn test_package_names() {
        let prepared = prepared();
        let names: Vec<_> = prepared.package_names().into_iter().collect();
        assert_eq!(names, ["lint", "old", "x", "x1", "x2", "y"]);
    }

    #[test]
    fn test_analyze_collapses_healthy_runtime_subtree() {
        let report = prepared()
            .analyze(&[TargetSelector::name("y")], &AnalysisOptions::default())
            .unwrap();

        let filtered = report.filtered.as_ref().unwrap();
        let root = filtered.root();
        let x = filtered.find_by_name("x").next().unwrap();
        let y = filtered.find_by_name("y").next().unwrap();
        assert!(filtered.contains_edge(root, x));
        assert!(filtered.contains_edge(root, y));
        assert_eq!(filtered.successors(x).count(), 0);

        assert_eq!(report.runtime.nodes, 5);
        assert_eq!(report.runtime.direct.len(), 2);
        assert_eq!(report.runtime.ripple.edges, 1);
    }

    #[test]
    fn test_deprecated_packages_are_flagged() {
        let report = prepared().analyze(&[], &AnalysisOptions::default()).unwrap();

        assert_eq!(report.targets.len(), 1);
        assert_eq!(report.targets[0].name, "old");
        assert_eq!(report.development.deprecated.len(), 1);
        assert_eq!(report.development.ripple.edges, 2);
        assert!(report.runtime.deprecated.is_empty());
        assert_eq!(report.ripple_graph.edge_count(), 2);

        let filtered = report.filtered.as_ref().unwrap();
        let lint = filtered.find_by_name("lint").next().unwrap();
        let old = filtered.find_by_name("old").next().unwrap();
        assert!(filtered.edge(lint, old).unwrap().ripple);
        assert!(filtered[old].ripple);
    }

    #[test]
    fn test_flag_deprecated_can_be_disabled() {
        let options = AnalysisOptions {
            flag_deprecated: false,
            filter: false,
            ..Default::default()
        };
        let report = prepared().analyze(&[], &options).unwrap();

        assert!(!report.has_ripple_effect());
        assert!(report.filtered.is_none());
        assert_eq!(report.ripple_graph.edge_count(), 0);
    }

    #[test]
    fn test_shared_edge_keeps_both_flags_in_full_graph() {
        let report = prepared().analyze(&[], &AnalysisOptions::default()).unwrap();
        let graph = &report.graph;
        let x1 = graph.find_by_name("x1").next().unwrap();
        let x2 = graph.find_by_name("x2").next().unwrap();
        let lint = graph.find_by_name("lint").next().unwrap();

        assert!(graph.edge(x1, x2).unwrap().runtime);
        assert!(graph.edge(lint, x2).unwrap().development);
        assert_eq!(graph.node_count(), 7);
    }

    #[test]
    fn test_empty_manifest_is_rejected_before_building() {
        let err = prepare(r#"{"name": "app", "version": "1.0.0"}"#, "not json", BuildLimits::default())
            .unwrap_err();
        assert!(err.is_input_error());

        let err = prepare(r#"{"name": "app", "version": "1.0.0"}"#, LOCKFILE, BuildLimits::default())
            .unwrap_err();
        assert!(matches!(err, crate::Error::EmptyDependencies { .. }));
    }

    #[test]
    fn test_invalid_threshold_is_rejected() {
        let options = AnalysisOptions {
            threshold: -1.0,
            ..Default::default()
        };
        assert!(prepared().analyze(&[], &options).is_err());
    }
}
