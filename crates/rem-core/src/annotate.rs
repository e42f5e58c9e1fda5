//! Marks transitive packages that are healthier than what pulled them in.

use crate::graph::DependencyGraph;
use crate::types::MetricKind;
use petgraph::stable_graph::NodeIndex;
use std::collections::{BTreeSet, HashSet};

/// Nodes to de-emphasize when rendering
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NonProblematic {
    /// Marked nodes, in index order
    pub nodes: BTreeSet<NodeIndex>,
}

impl NonProblematic {
    /// Set `non_problematic` on every marked node present in `graph`
    pub fn apply(&self, graph: &mut DependencyGraph) {
        for &idx in &self.nodes {
            if let Some(node) = graph.node_mut(idx) {
                node.non_problematic = true;
            }
        }
    }

    /// Whether `idx` is marked
    pub fn contains(&self, idx: NodeIndex) -> bool {
        self.nodes.contains(&idx)
    }

    /// Number of marked nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether nothing is marked
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Finds non-problematic transitive dependencies
#[derive(Debug, Clone, Copy, Default)]
pub struct ProblemAnnotator {
    metric: MetricKind,
}

impl ProblemAnnotator {
    /// Create an annotator comparing `metric`
    pub fn new(metric: MetricKind) -> Self {
        Self { metric }
    }

    /// A scored node below the direct dependencies is non-problematic when its
    /// score exceeds the best score among the scored direct dependencies
    /// requiring it. Nodes with no such predecessor are left alone.
    pub fn annotate(&self, graph: &DependencyGraph) -> NonProblematic {
        let root = graph.root();
        let direct: HashSet<NodeIndex> = graph.successors(root).collect();

        let nodes = graph
            .node_indices()
            .filter(|idx| *idx != root && !direct.contains(idx))
            .filter(|&idx| {
                let Some(own) = graph[idx].score(self.metric) else {
                    return false;
                };
                graph
                    .predecessors(idx)
                    .filter(|p| direct.contains(p))
                    .filter_map(|p| graph[p].score(self.metric))
                    .reduce(f64::max)
                    .is_some_and(|best| own > best)
            })
            .collect();

        NonProblematic { nodes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Breadcrumb, GraphEdge, HealthMetrics, PackageIdentity};

    fn with_metrics(graph: &mut DependencyGraph, name: &str, metrics: Option<HealthMetrics>) -> NodeIndex {
        let identity = PackageIdentity::new(name, "1.0.0", Breadcrumb::root("app(1.0.0)"));
        let idx = graph.add_dependency(identity, false);
        graph[idx].metrics = metrics;
        idx
    }

    fn scored(graph: &mut DependencyGraph, name: &str, quality: Option<f64>) -> NodeIndex {
        let metrics = HealthMetrics {
            quality,
            ..Default::default()
        };
        with_metrics(graph, name, Some(metrics))
    }

    fn link(graph: &mut DependencyGraph, edges: &[(NodeIndex, NodeIndex)]) {
        for &(from, to) in edges {
            graph.add_edge(from, to, GraphEdge::default());
        }
    }

    #[test]
    fn test_marks_nodes_healthier_than_direct_parents() {
        let mut graph = DependencyGraph::new(PackageIdentity::root("app", "1.0.0"));
        let root = graph.root();
        let a = scored(&mut graph, "a", Some(0.5));
        let b = scored(&mut graph, "b", Some(0.7));
        let healthy = scored(&mut graph, "healthy", Some(0.8));
        let weak = scored(&mut graph, "weak", Some(0.6));
        let unscored = scored(&mut graph, "unscored", None);
        let deep = scored(&mut graph, "deep", Some(0.99));
        for (from, to) in [
            (root, a),
            (root, b),
            (a, healthy),
            (b, healthy),
            (a, weak),
            (b, weak),
            (a, unscored),
            (healthy, deep),
        ] {
            graph.add_edge(from, to, GraphEdge::default());
        }

        let marked = ProblemAnnotator::new(MetricKind::Quality).annotate(&graph);

        assert!(marked.contains(healthy));
        assert!(!marked.contains(weak));
        assert!(!marked.contains(unscored));
        assert!(!marked.contains(deep));
        assert!(!marked.contains(a) && !marked.contains(b));
        assert_eq!(marked.len(), 1);

        assert!(!graph[healthy].non_problematic);
        marked.apply(&mut graph);
        assert!(graph[healthy].non_problematic);
    }

    #[test]
    fn test_equal_to_best_parent_is_not_marked() {
        let mut graph = DependencyGraph::new(PackageIdentity::root("app", "1.0.0"));
        let root = graph.root();
        let a = scored(&mut graph, "a", Some(0.4));
        let b = scored(&mut graph, "b", Some(0.7));
        let tie = scored(&mut graph, "tie", Some(0.7));
        let above = scored(&mut graph, "above", Some(0.71));
        link(&mut graph, &[(root, a), (root, b), (a, tie), (b, tie), (a, above), (b, above)]);

        let marked = ProblemAnnotator::new(MetricKind::Quality).annotate(&graph);

        assert!(!marked.contains(tie));
        assert!(marked.contains(above));
        assert_eq!(marked.len(), 1);
    }

    #[test]
    fn test_unscored_parents_are_ignored() {
        let mut graph = DependencyGraph::new(PackageIdentity::root("app", "1.0.0"));
        let root = graph.root();
        let blank = scored(&mut graph, "blank", None);
        let missing = with_metrics(&mut graph, "missing", None);
        let scored_parent = scored(&mut graph, "scored", Some(0.9));
        let orphan = scored(&mut graph, "orphan", Some(0.5));
        let shared = scored(&mut graph, "shared", Some(0.5));
        link(
            &mut graph,
            &[
                (root, blank),
                (root, missing),
                (root, scored_parent),
                (blank, orphan),
                (missing, orphan),
                (blank, shared),
                (scored_parent, shared),
            ],
        );

        let marked = ProblemAnnotator::new(MetricKind::Quality).annotate(&graph);

        // no scored direct parent to compare against
        assert!(!marked.contains(orphan));
        // only the scored parent counts, and it is healthier
        assert!(!marked.contains(shared));
        assert!(marked.is_empty());
    }

    #[test]
    fn test_node_without_metrics_is_never_marked() {
        let mut graph = DependencyGraph::new(PackageIdentity::root("app", "1.0.0"));
        let root = graph.root();
        let a = scored(&mut graph, "a", Some(0.1));
        let bare = with_metrics(&mut graph, "bare", None);
        link(&mut graph, &[(root, a), (a, bare)]);

        let marked = ProblemAnnotator::new(MetricKind::Quality).annotate(&graph);
        assert!(marked.is_empty());

        marked.apply(&mut graph);
        assert!(!graph[bare].non_problematic);
    }

    #[test]
    fn test_compares_the_chosen_metric() {
        let mut graph = DependencyGraph::new(PackageIdentity::root("app", "1.0.0"));
        let root = graph.root();
        let finals = |final_score: f64, quality: f64| {
            Some(HealthMetrics {
                final_score: Some(final_score),
                quality: Some(quality),
                ..Default::default()
            })
        };
        let a = with_metrics(&mut graph, "a", finals(0.3, 0.9));
        let child = with_metrics(&mut graph, "child", finals(0.6, 0.2));
        link(&mut graph, &[(root, a), (a, child)]);

        let by_final = ProblemAnnotator::new(MetricKind::Final).annotate(&graph);
        assert!(by_final.contains(child));
        assert_eq!(ProblemAnnotator::default().annotate(&graph), by_final);

        let by_quality = ProblemAnnotator::new(MetricKind::Quality).annotate(&graph);
        assert!(by_quality.is_empty());
    }
}
