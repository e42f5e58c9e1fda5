//! Ripple effect of flagged packages.
//!
//! The ripple set of a flagged package is the union of the nodes and edges of
//! every simple path from the application root to it. Enumeration is
//! exhaustive unless [`RippleOptions::max_paths`] is set; on dense graphs the
//! number of simple paths grows exponentially.

use crate::graph::DependencyGraph;
use crate::types::GraphNode;
use petgraph::algo::all_simple_paths;
use petgraph::stable_graph::NodeIndex;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, trace};

/// A flagged package: `name` or `name@version`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TargetSelector {
    /// Package name
    pub name: String,
    /// Exact version, any installed version when absent
    pub version: Option<String>,
}

impl TargetSelector {
    /// Select every installed copy of `name`
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
        }
    }

    /// Select installed copies of `name` at exactly `version`
    pub fn exact(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: Some(version.into()),
        }
    }

    /// Whether `node` is selected
    pub fn matches(&self, node: &GraphNode) -> bool {
        !node.is_root()
            && node.name() == self.name
            && self.version.as_deref().map_or(true, |v| node.version() == v)
    }
}

impl FromStr for TargetSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        // A leading '@' belongs to a scoped name, not to a version.
        let selector = match s.rfind('@') {
            Some(at) if at > 0 => Self::exact(&s[..at], &s[at + 1..]),
            _ => Self::name(s),
        };
        if selector.name.is_empty() || selector.version.as_deref() == Some("") {
            return Err(format!("invalid package selector '{}', expected name or name@version", s));
        }
        Ok(selector)
    }
}

impl fmt::Display for TargetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}@{}", self.name, version),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Enumeration options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RippleOptions {
    /// Stop after this many paths per target; `None` enumerates all of them
    pub max_paths: Option<usize>,
}

/// Ripple set of a single flagged node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRipple {
    /// The flagged node
    pub target: NodeIndex,
    /// Nodes on any root-to-target path, root and target included
    pub nodes: BTreeSet<NodeIndex>,
    /// Edges on any root-to-target path
    pub edges: BTreeSet<(NodeIndex, NodeIndex)>,
    /// Number of paths enumerated
    pub path_count: usize,
    /// Enumeration stopped at the `max_paths` bound
    pub truncated: bool,
}

/// Union ripple set over all flagged nodes of one graph
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RippleEffect {
    /// Per-target results, in target order
    pub per_target: Vec<TargetRipple>,
    /// Union of the per-target node sets
    pub nodes: BTreeSet<NodeIndex>,
    /// Union of the per-target edge sets
    pub edges: BTreeSet<(NodeIndex, NodeIndex)>,
}

impl RippleEffect {
    /// Flagged nodes found in the graph
    pub fn targets(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.per_target.iter().map(|t| t.target)
    }

    /// Whether `from -> to` lies on a ripple path
    pub fn contains_edge(&self, from: NodeIndex, to: NodeIndex) -> bool {
        self.edges.contains(&(from, to))
    }

    /// Whether nothing was flagged or nothing is reachable
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Whether any target hit the `max_paths` bound
    pub fn truncated(&self) -> bool {
        self.per_target.iter().any(|t| t.truncated)
    }

    /// Mark flagged nodes and ripple edges on `graph`.
    ///
    /// Indices must come from `graph` or a graph sharing its indices; entries
    /// absent from `graph` are ignored.
    pub fn apply(&self, graph: &mut DependencyGraph) {
        for target in self.targets() {
            if let Some(node) = graph.node_mut(target) {
                node.ripple = true;
            }
        }
        for &(from, to) in &self.edges {
            if let Some(edge) = graph.edge_mut(from, to) {
                edge.ripple = true;
            }
        }
    }

    /// The root plus every node on a ripple path, with the ripple edges only
    pub fn subgraph(&self, graph: &DependencyGraph) -> DependencyGraph {
        let keep: HashSet<NodeIndex> = self.nodes.iter().copied().collect();
        let mut sub = graph.induced_subgraph(&keep);
        let extra: Vec<(NodeIndex, NodeIndex)> = sub
            .edges()
            .filter(|(from, to, _)| !self.contains_edge(*from, *to))
            .map(|(from, to, _)| (from, to))
            .collect();
        for (from, to) in extra {
            sub.remove_edge(from, to);
        }
        sub
    }

    /// Counts and shares relative to `graph`
    pub fn stats(&self, graph: &DependencyGraph) -> RippleStats {
        RippleStats::new(
            self.per_target.len(),
            self.nodes.len(),
            graph.node_count(),
            self.edges.len(),
            graph.edge_count(),
        )
    }
}

/// How much of a graph a ripple set covers
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RippleStats {
    /// Flagged nodes found in the graph
    pub targets: usize,
    /// Nodes on a ripple path
    pub nodes: usize,
    /// Percentage of the graph's nodes on a ripple path
    pub node_percent: f64,
    /// Edges on a ripple path
    pub edges: usize,
    /// Percentage of the graph's edges on a ripple path
    pub edge_percent: f64,
}

impl RippleStats {
    fn new(targets: usize, nodes: usize, node_total: usize, edges: usize, edge_total: usize) -> Self {
        let percent = |part: usize, total: usize| {
            if total == 0 {
                0.0
            } else {
                100.0 * part as f64 / total as f64
            }
        };
        Self {
            targets,
            nodes,
            node_percent: percent(nodes, node_total),
            edges,
            edge_percent: percent(edges, edge_total),
        }
    }
}

/// Computes ripple sets
#[derive(Debug, Clone, Default)]
pub struct RippleEffectAnalyzer {
    options: RippleOptions,
}

impl RippleEffectAnalyzer {
    /// Create an analyzer with the given options
    pub fn new(options: RippleOptions) -> Self {
        Self { options }
    }

    /// Nodes of `graph` selected by `selectors`, in index order, without duplicates
    pub fn resolve_targets(graph: &DependencyGraph, selectors: &[TargetSelector]) -> Vec<NodeIndex> {
        let mut found = BTreeSet::new();
        for selector in selectors {
            let before = found.len();
            found.extend(
                graph
                    .nodes()
                    .filter(|(_, node)| selector.matches(node))
                    .map(|(idx, _)| idx),
            );
            if found.len() == before {
                trace!(target_package = %selector, "flagged package not in graph");
            }
        }
        found.into_iter().collect()
    }

    /// Ripple sets of every node selected by `selectors`
    pub fn analyze(&self, graph: &DependencyGraph, selectors: &[TargetSelector]) -> RippleEffect {
        let targets = Self::resolve_targets(graph, selectors);
        self.analyze_nodes(graph, &targets)
    }

    /// Ripple sets of the given nodes; indices absent from `graph` are skipped
    pub fn analyze_nodes(&self, graph: &DependencyGraph, targets: &[NodeIndex]) -> RippleEffect {
        let mut effect = RippleEffect::default();
        for &target in targets {
            if graph.node(target).is_none() || target == graph.root() {
                continue;
            }
            let ripple = self.paths_to(graph, target);
            effect.nodes.extend(ripple.nodes.iter().copied());
            effect.edges.extend(ripple.edges.iter().copied());
            effect.per_target.push(ripple);
        }
        debug!(
            targets = effect.per_target.len(),
            nodes = effect.nodes.len(),
            edges = effect.edges.len(),
            "computed ripple effect"
        );
        effect
    }

    fn paths_to(&self, graph: &DependencyGraph, target: NodeIndex) -> TargetRipple {
        let mut ripple = TargetRipple {
            target,
            nodes: BTreeSet::new(),
            edges: BTreeSet::new(),
            path_count: 0,
            truncated: false,
        };

        let paths = all_simple_paths::<Vec<NodeIndex>, _>(graph.petgraph(), graph.root(), target, 0, None);
        for path in paths {
            if self.options.max_paths.is_some_and(|max| ripple.path_count >= max) {
                debug!(target_package = %graph[target].identity, "ripple path bound reached");
                ripple.truncated = true;
                break;
            }
            ripple.path_count += 1;
            ripple.nodes.extend(path.iter().copied());
            ripple.edges.extend(path.windows(2).map(|pair| (pair[0], pair[1])));
        }
        ripple
    }
}
