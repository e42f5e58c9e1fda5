//! Minimum-score subtree collapsing.
//!
//! A subtree is collapsed into the edge leading to it when the worst score
//! found anywhere inside it is within the collapse threshold of the parent's
//! own score. Ripple edges are never removed.
//!
//! The pass works leaves first over an acyclic copy of the graph: cycles are
//! cut greedily (the closing edge of the first cycle found, starting from the
//! root and then from every node in index order) and every cut is reported as
//! a [`Diagnostic::CycleBroken`]. The graph being filtered is never mutated.

use crate::error::{Error, Result};
use crate::graph::DependencyGraph;
use crate::ripple::RippleEffect;
use crate::types::{Diagnostic, MetricKind};
use petgraph::stable_graph::NodeIndex;
use std::collections::VecDeque;
use tracing::debug;

/// Parent-to-subtree score ratio at or above which a subtree is collapsed
pub const DEFAULT_COLLAPSE_THRESHOLD: f64 = 0.9;

/// Filter parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterOptions {
    /// Metric compared between parent and subtree
    pub metric: MetricKind,
    /// Collapse when `subtree_minimum >= parent_score * threshold`
    pub threshold: f64,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            metric: MetricKind::default(),
            threshold: DEFAULT_COLLAPSE_THRESHOLD,
        }
    }
}

impl FilterOptions {
    /// Create validated options
    ///
    /// # Errors
    /// Returns [`Error::InvalidThreshold`] for negative or non-finite thresholds
    pub fn new(metric: MetricKind, threshold: f64) -> Result<Self> {
        let options = Self { metric, threshold };
        options.validate()?;
        Ok(options)
    }

    /// Check the threshold
    pub fn validate(&self) -> Result<()> {
        if self.threshold.is_finite() && self.threshold >= 0.0 {
            Ok(())
        } else {
            Err(Error::InvalidThreshold(self.threshold))
        }
    }
}

/// Worst score of every node's subtree, addressed by node index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubtreeMinimums {
    values: Vec<Option<f64>>,
}

impl SubtreeMinimums {
    /// Subtree minimum of `idx`, `None` when no score is known anywhere beneath it
    pub fn get(&self, idx: NodeIndex) -> Option<f64> {
        self.values.get(idx.index()).copied().flatten()
    }
}

/// Result of a filter run
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    /// Input graph induced over the root and the nodes still reachable from it
    pub graph: DependencyGraph,
    /// Edges cut during the collapse, in removal order
    pub removed_edges: Vec<(NodeIndex, NodeIndex)>,
    /// Cycle cuts made on the working copy
    pub diagnostics: Vec<Diagnostic>,
}

/// Collapses subtrees whose worst score is close to their parent's
#[derive(Debug, Clone, Default)]
pub struct MinimumScoreFilter {
    options: FilterOptions,
}

impl MinimumScoreFilter {
    /// Create a filter
    ///
    /// # Errors
    /// Returns [`Error::InvalidThreshold`] for invalid options
    pub fn new(options: FilterOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    /// The options in use
    pub fn options(&self) -> FilterOptions {
        self.options
    }

    /// Subtree minimums of every node of `graph`, with the cycle cuts needed
    pub fn subtree_minimums(&self, graph: &DependencyGraph) -> (SubtreeMinimums, Vec<Diagnostic>) {
        let mut work = WorkingCopy::new(graph);
        let diagnostics = work.break_cycles(graph);
        let order = work.leaves_first();
        (self.minimums(graph, &work, &order), diagnostics)
    }

    /// Filter `graph`, keeping every edge in `ripple`.
    pub fn filter(&self, graph: &DependencyGraph, ripple: &RippleEffect) -> FilterOutcome {
        let metric = self.options.metric;
        let mut work = WorkingCopy::new(graph);
        let diagnostics = work.break_cycles(graph);
        let order = work.leaves_first();
        let minimums = self.minimums(graph, &work, &order);

        let mut pruned = graph.clone();
        let mut removed_edges = Vec::new();

        for &n in &order {
            let Some(score) = minimums.get(n) else {
                continue;
            };
            let mut parents: Vec<NodeIndex> = pruned.predecessors(n).collect();
            parents.sort();
            parents.dedup();

            for p in parents {
                let Some(parent_score) = pruned[p].score(metric) else {
                    continue;
                };
                let on_ripple = ripple.contains_edge(p, n)
                    || pruned.edge(p, n).is_some_and(|edge| edge.ripple);
                if !on_ripple && score >= parent_score * self.options.threshold && pruned.out_degree(n) == 0 {
                    pruned.remove_edge(p, n);
                    removed_edges.push((p, n));
                }
            }
        }

        let reachable = pruned.reachable_from_root();
        let mut filtered = graph.induced_subgraph(&reachable);
        let kept: Vec<NodeIndex> = filtered.node_indices().collect();
        for idx in kept {
            filtered[idx].subtree_minimum = minimums.get(idx);
        }

        debug!(
            metric = %metric,
            threshold = self.options.threshold,
            removed_edges = removed_edges.len(),
            nodes_before = graph.node_count(),
            nodes_after = filtered.node_count(),
            "filtered graph"
        );

        FilterOutcome {
            graph: filtered,
            removed_edges,
            diagnostics,
        }
    }

    fn minimums(&self, graph: &DependencyGraph, work: &WorkingCopy, order: &[NodeIndex]) -> SubtreeMinimums {
        let mut values: Vec<Option<f64>> = vec![None; work.successors.len()];
        for &idx in order {
            let node = &graph[idx];
            let own = [node.score(self.options.metric), node.subtree_minimum];
            let children = work.successors[idx.index()].iter().map(|c| values[c.index()]);
            let minimum = own
                .into_iter()
                .chain(children)
                .flatten()
                .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))));
            values[idx.index()] = minimum;
        }
        SubtreeMinimums { values }
    }
}

/// Disposable adjacency copy, addressed by node index
struct WorkingCopy {
    present: Vec<bool>,
    successors: Vec<Vec<NodeIndex>>,
    root: NodeIndex,
}

impl WorkingCopy {
    fn new(graph: &DependencyGraph) -> Self {
        let bound = graph.node_bound();
        let mut present = vec![false; bound];
        let mut successors = vec![Vec::new(); bound];
        for idx in graph.node_indices() {
            present[idx.index()] = true;
            let mut next: Vec<NodeIndex> = graph.successors(idx).collect();
            next.sort();
            next.dedup();
            successors[idx.index()] = next;
        }
        Self {
            present,
            successors,
            root: graph.root(),
        }
    }

    fn break_cycles(&mut self, graph: &DependencyGraph) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let root = self.root;
        let starts = std::iter::once(root).chain(
            (0..self.present.len())
                .map(NodeIndex::new)
                .filter(move |idx| *idx != root),
        );
        for start in starts {
            if !self.present[start.index()] {
                continue;
            }
            while let Some((from, to)) = self.find_closing_edge(start) {
                self.successors[from.index()].retain(|&s| s != to);
                debug!(from = %graph[from].identity, to = %graph[to].identity, "cycle broken");
                diagnostics.push(Diagnostic::CycleBroken {
                    from: graph[from].identity.clone(),
                    to: graph[to].identity.clone(),
                });
            }
        }
        diagnostics
    }

    /// Closing edge of the first cycle reachable from `start`, by iterative DFS
    fn find_closing_edge(&self, start: NodeIndex) -> Option<(NodeIndex, NodeIndex)> {
        const UNSEEN: u8 = 0;
        const ON_PATH: u8 = 1;
        const DONE: u8 = 2;

        let mut state = vec![UNSEEN; self.successors.len()];
        let mut stack: Vec<(NodeIndex, usize)> = vec![(start, 0)];
        state[start.index()] = ON_PATH;

        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            match self.successors[node.index()].get(frame.1) {
                Some(&child) => {
                    frame.1 += 1;
                    match state[child.index()] {
                        UNSEEN => {
                            state[child.index()] = ON_PATH;
                            stack.push((child, 0));
                        }
                        ON_PATH => return Some((node, child)),
                        _ => {}
                    }
                }
                None => {
                    state[node.index()] = DONE;
                    stack.pop();
                }
            }
        }
        None
    }

    /// Every node after all of its successors, leaves first, FIFO among equals
    fn leaves_first(&self) -> Vec<NodeIndex> {
        let bound = self.successors.len();
        let mut pending: Vec<usize> = self.successors.iter().map(Vec::len).collect();
        let mut predecessors: Vec<Vec<NodeIndex>> = vec![Vec::new(); bound];
        for (from, next) in self.successors.iter().enumerate() {
            for to in next {
                predecessors[to.index()].push(NodeIndex::new(from));
            }
        }

        let mut queue: VecDeque<NodeIndex> = (0..bound)
            .filter(|&i| self.present[i] && pending[i] == 0)
            .map(NodeIndex::new)
            .collect();
        let mut order = Vec::with_capacity(bound);
        while let Some(node) = queue.pop_front() {
            order.push(node);
            for &p in &predecessors[node.index()] {
                pending[p.index()] -= 1;
                if pending[p.index()] == 0 {
                    queue.push_back(p);
                }
            }
        }
        order
    }
}
