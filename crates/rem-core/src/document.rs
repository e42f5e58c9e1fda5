//! Node-link JSON documents handed to renderers.

use crate::analysis::{AnalysisReport, SubgraphSummary};
use crate::graph::DependencyGraph;
use crate::types::{Diagnostic, GraphEdge, GraphNode, MetricKind, PackageIdentity};
use serde::Serialize;

/// One node of a [`GraphDocument`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeDocument {
    /// Index of the node in the graph it was taken from
    pub id: usize,
    /// Node attributes
    #[serde(flatten)]
    pub node: GraphNode,
}

/// One link of a [`GraphDocument`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkDocument {
    /// Id of the requiring node
    pub source: usize,
    /// Id of the required node
    pub target: usize,
    /// Edge attributes
    #[serde(flatten)]
    pub edge: GraphEdge,
}

/// Directed node-link document of a dependency graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphDocument {
    /// Always `true`
    pub directed: bool,
    /// Id of the application root
    pub root: usize,
    /// Nodes in id order
    pub nodes: Vec<NodeDocument>,
    /// Links ordered by source, then target
    pub links: Vec<LinkDocument>,
}

impl From<&DependencyGraph> for GraphDocument {
    fn from(graph: &DependencyGraph) -> Self {
        let nodes = graph
            .nodes()
            .map(|(idx, node)| NodeDocument {
                id: idx.index(),
                node: node.clone(),
            })
            .collect();

        let mut links: Vec<LinkDocument> = graph
            .edges()
            .map(|(from, to, edge)| LinkDocument {
                source: from.index(),
                target: to.index(),
                edge: edge.clone(),
            })
            .collect();
        links.sort_by_key(|link| (link.source, link.target));

        Self {
            directed: true,
            root: graph.root().index(),
            nodes,
            links,
        }
    }
}

/// Serializable form of an [`AnalysisReport`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportDocument {
    /// The analyzed application
    pub root: PackageIdentity,
    /// Metric used for filtering and annotation
    pub metric: MetricKind,
    /// Runtime view summary
    pub runtime: SubgraphSummary,
    /// Development view summary
    pub development: SubgraphSummary,
    /// Flagged packages found
    pub targets: Vec<PackageIdentity>,
    /// Non-fatal findings
    pub diagnostics: Vec<Diagnostic>,
    /// Full graph
    pub graph: GraphDocument,
    /// Filtered graph, absent when filtering was disabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filtered: Option<GraphDocument>,
    /// Ripple-effect subgraph
    pub ripple: GraphDocument,
}

impl From<&AnalysisReport> for ReportDocument {
    fn from(report: &AnalysisReport) -> Self {
        Self {
            root: report.root().clone(),
            metric: report.metric,
            runtime: report.runtime.clone(),
            development: report.development.clone(),
            targets: report.targets.clone(),
            diagnostics: report.diagnostics.clone(),
            graph: GraphDocument::from(&report.graph),
            filtered: report.filtered.as_ref().map(GraphDocument::from),
            ripple: GraphDocument::from(&report.ripple_graph),
        }
    }
}
