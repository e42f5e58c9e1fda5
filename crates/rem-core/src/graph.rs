//! Arena-backed dependency graph.
//!
//! Nodes live in a [`StableDiGraph`], so a [`NodeIndex`] stays valid while
//! edges and other nodes are removed. Graphs derived by
//! [`DependencyGraph::split_by_dependency_type`] or
//! [`DependencyGraph::induced_subgraph`] therefore share the indices of the
//! graph they came from, which lets ripple sets computed on one be used on the
//! other. [`DependencyGraph::compose`] re-indexes and matches nodes by identity.

use crate::types::{Breadcrumb, GraphEdge, GraphNode, HealthTable, PackageIdentity};
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::{Dfs, EdgeRef, IntoEdgeReferences, NodeIndexable};
use petgraph::Direction;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::ops::{Index, IndexMut};

/// Directed graph of installed packages rooted at the application
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: StableDiGraph<GraphNode, GraphEdge>,
    identities: HashMap<PackageIdentity, NodeIndex>,
    /// `(breadcrumb, name)` is unique: one directory holds one copy of a name
    locations: HashMap<(Breadcrumb, String), NodeIndex>,
    root: NodeIndex,
}

impl DependencyGraph {
    /// Create a graph holding only the application root
    pub fn new(root: PackageIdentity) -> Self {
        let mut graph = StableDiGraph::new();
        let mut identities = HashMap::new();
        let idx = graph.add_node(GraphNode::root(root.clone()));
        identities.insert(root, idx);

        Self {
            graph,
            identities,
            locations: HashMap::new(),
            root: idx,
        }
    }

    /// Index of the application root
    pub fn root(&self) -> NodeIndex {
        self.root
    }

    /// The application root node
    pub fn root_node(&self) -> &GraphNode {
        &self.graph[self.root]
    }

    /// Add a dependency node, returning the existing index if the identity is known
    pub fn add_dependency(&mut self, identity: PackageIdentity, dev: bool) -> NodeIndex {
        self.add_node(GraphNode::dependency(identity, dev))
    }

    /// Add a node, merging its attributes into an existing node with the same identity
    pub fn add_node(&mut self, node: GraphNode) -> NodeIndex {
        if let Some(&idx) = self.identities.get(&node.identity) {
            self.graph[idx].merge(&node);
            return idx;
        }

        let identity = node.identity.clone();
        let idx = self.graph.add_node(node);
        if !identity.breadcrumb.is_empty() {
            self.locations
                .insert((identity.breadcrumb.clone(), identity.name.clone()), idx);
        }
        self.identities.insert(identity, idx);
        idx
    }

    /// Add an edge, merging flags into an existing `(from, to)` edge
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, edge: GraphEdge) -> EdgeIndex {
        if let Some(existing) = self.graph.find_edge(from, to) {
            self.graph[existing].merge(&edge);
            return existing;
        }
        self.graph.add_edge(from, to, edge)
    }

    /// Look up a node by identity
    pub fn find(&self, identity: &PackageIdentity) -> Option<NodeIndex> {
        self.identities.get(identity).copied()
    }

    /// Look up the copy of `name` installed at `breadcrumb`
    pub fn find_installed(&self, name: &str, breadcrumb: &Breadcrumb) -> Option<NodeIndex> {
        self.locations
            .get(&(breadcrumb.clone(), name.to_string()))
            .copied()
    }

    /// Every installed copy of `name`, in index order
    pub fn find_by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = NodeIndex> + 'a {
        self.graph
            .node_indices()
            .filter(move |&idx| !self.graph[idx].is_root() && self.graph[idx].name() == name)
    }

    /// Node at `idx`, if present
    pub fn node(&self, idx: NodeIndex) -> Option<&GraphNode> {
        self.graph.node_weight(idx)
    }

    /// Mutable node at `idx`, if present
    pub fn node_mut(&mut self, idx: NodeIndex) -> Option<&mut GraphNode> {
        self.graph.node_weight_mut(idx)
    }

    /// Edge `from -> to`, if present
    pub fn edge(&self, from: NodeIndex, to: NodeIndex) -> Option<&GraphEdge> {
        self.graph
            .find_edge(from, to)
            .and_then(|e| self.graph.edge_weight(e))
    }

    /// Mutable edge `from -> to`, if present
    pub fn edge_mut(&mut self, from: NodeIndex, to: NodeIndex) -> Option<&mut GraphEdge> {
        let e = self.graph.find_edge(from, to)?;
        self.graph.edge_weight_mut(e)
    }

    /// Whether the edge `from -> to` exists
    pub fn contains_edge(&self, from: NodeIndex, to: NodeIndex) -> bool {
        self.graph.find_edge(from, to).is_some()
    }

    /// Remove the edge `from -> to`, returning its attributes
    pub fn remove_edge(&mut self, from: NodeIndex, to: NodeIndex) -> Option<GraphEdge> {
        let e = self.graph.find_edge(from, to)?;
        self.graph.remove_edge(e)
    }

    /// All node indices in index order
    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// All nodes in index order
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &GraphNode)> + '_ {
        self.graph
            .node_indices()
            .map(move |idx| (idx, &self.graph[idx]))
    }

    /// All edges as `(from, to, attributes)`
    pub fn edges(&self) -> impl Iterator<Item = (NodeIndex, NodeIndex, &GraphEdge)> + '_ {
        self.graph
            .edge_references()
            .map(|e| (e.source(), e.target(), e.weight()))
    }

    /// Packages required by `idx`
    pub fn successors(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(idx, Direction::Outgoing)
    }

    /// Packages requiring `idx`
    pub fn predecessors(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(idx, Direction::Incoming)
    }

    /// Number of outgoing edges of `idx`
    pub fn out_degree(&self, idx: NodeIndex) -> usize {
        self.graph.edges_directed(idx, Direction::Outgoing).count()
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Upper bound of node indices, for index-addressed side tables
    pub fn node_bound(&self) -> usize {
        self.graph.node_bound()
    }

    /// Every node reachable from `idx`, excluding `idx` unless it lies on a cycle
    pub fn descendants(&self, idx: NodeIndex) -> HashSet<NodeIndex> {
        let mut seen = HashSet::new();
        let mut stack: Vec<NodeIndex> = self.successors(idx).collect();
        while let Some(next) = stack.pop() {
            if seen.insert(next) {
                stack.extend(self.successors(next));
            }
        }
        seen
    }

    /// The root and every node reachable from it
    pub fn reachable_from_root(&self) -> HashSet<NodeIndex> {
        let mut reachable = HashSet::new();
        let mut dfs = Dfs::new(&self.graph, self.root);
        while let Some(idx) = dfs.next(&self.graph) {
            reachable.insert(idx);
        }
        reachable
    }

    /// Subgraph induced over `keep` (the root is always kept), preserving indices
    pub fn induced_subgraph(&self, keep: &HashSet<NodeIndex>) -> DependencyGraph {
        let mut sub = self.clone();
        let dropped: Vec<NodeIndex> = sub
            .graph
            .node_indices()
            .filter(|idx| *idx != sub.root && !keep.contains(idx))
            .collect();
        for idx in dropped {
            sub.graph.remove_node(idx);
        }
        sub.reindex();
        sub
    }

    /// Subgraph of the edges matching `predicate`, their endpoints and the root,
    /// preserving indices
    pub fn edge_subgraph<P>(&self, predicate: P) -> DependencyGraph
    where
        P: Fn(&GraphEdge) -> bool,
    {
        let mut sub = self.clone();
        let dropped: Vec<EdgeIndex> = sub
            .graph
            .edge_references()
            .filter(|e| !predicate(e.weight()))
            .map(|e| e.id())
            .collect();
        for e in dropped {
            sub.graph.remove_edge(e);
        }

        let isolated: Vec<NodeIndex> = sub
            .graph
            .node_indices()
            .filter(|&idx| {
                idx != sub.root
                    && sub.graph.edges_directed(idx, Direction::Outgoing).next().is_none()
                    && sub.graph.edges_directed(idx, Direction::Incoming).next().is_none()
            })
            .collect();
        for idx in isolated {
            sub.graph.remove_node(idx);
        }
        sub.reindex();
        sub
    }

    /// Runtime and development views of a linked graph
    pub fn split_by_dependency_type(&self) -> (DependencyGraph, DependencyGraph) {
        (
            self.edge_subgraph(|e| e.runtime),
            self.edge_subgraph(|e| e.development),
        )
    }

    /// Union of two graphs by node identity, merging node and edge attributes
    pub fn compose(&self, other: &DependencyGraph) -> DependencyGraph {
        let mut composed = self.clone();
        let mut mapping = HashMap::with_capacity(other.node_count());
        for (idx, node) in other.nodes() {
            mapping.insert(idx, composed.add_node(node.clone()));
        }
        for (from, to, edge) in other.edges() {
            composed.add_edge(mapping[&from], mapping[&to], edge.clone());
        }
        composed
    }

    /// Distinct package names of all dependency nodes
    pub fn package_names(&self) -> BTreeSet<String> {
        self.nodes()
            .filter(|(_, n)| !n.is_root())
            .map(|(_, n)| n.name().to_string())
            .collect()
    }

    /// Attach collaborator records to every node with a matching name.
    ///
    /// Returns the number of nodes updated.
    pub fn apply_health(&mut self, table: &HealthTable) -> usize {
        let mut updated = 0;
        let indices: Vec<NodeIndex> = self.graph.node_indices().collect();
        for idx in indices {
            let node = &mut self.graph[idx];
            if node.is_root() {
                continue;
            }
            if let Some(health) = table.get(node.name()) {
                node.apply_health(health);
                updated += 1;
            }
        }
        updated
    }

    pub(crate) fn petgraph(&self) -> &StableDiGraph<GraphNode, GraphEdge> {
        &self.graph
    }

    fn reindex(&mut self) {
        self.identities.retain(|_, idx| self.graph.contains_node(*idx));
        self.locations.retain(|_, idx| self.graph.contains_node(*idx));
    }
}

impl Index<NodeIndex> for DependencyGraph {
    type Output = GraphNode;

    fn index(&self, idx: NodeIndex) -> &GraphNode {
        &self.graph[idx]
    }
}

impl IndexMut<NodeIndex> for DependencyGraph {
    fn index_mut(&mut self, idx: NodeIndex) -> &mut GraphNode {
        &mut self.graph[idx]
    }
}
