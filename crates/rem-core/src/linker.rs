//! Attaches the application root to its declared dependencies.

use crate::graph::DependencyGraph;
use crate::npm::Manifest;
use crate::types::{Breadcrumb, DependencyType, Diagnostic, GraphEdge};
use petgraph::stable_graph::NodeIndex;
use std::collections::HashSet;
use tracing::debug;

/// Links manifest declarations to top-level installs and classifies edges
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestLinker;

impl ManifestLinker {
    /// Create a linker
    pub fn new() -> Self {
        Self
    }

    /// Link `manifest` into `graph`.
    ///
    /// Every edge inside the closure of the runtime top-level packages is
    /// tagged `runtime`, every edge inside the development closure
    /// `development`. Re-linking the same manifest leaves the graph unchanged.
    pub fn link(&self, graph: &mut DependencyGraph, manifest: &Manifest) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        let lockfile_label = graph.root_node().identity.label();
        let manifest_label = manifest.root_identity().label();
        if lockfile_label != manifest_label {
            debug!(manifest = %manifest_label, lockfile = %lockfile_label, "root mismatch");
            diagnostics.push(Diagnostic::RootMismatch {
                manifest: manifest_label,
                lockfile: lockfile_label.clone(),
            });
        }

        let top_scope = Breadcrumb::root(lockfile_label);
        for dep_type in [DependencyType::Runtime, DependencyType::Development] {
            let members = self.attach(graph, manifest, dep_type, &top_scope, &mut diagnostics);
            tag_closure(graph, &members, dep_type);
        }

        diagnostics
    }

    fn attach(
        &self,
        graph: &mut DependencyGraph,
        manifest: &Manifest,
        dep_type: DependencyType,
        top_scope: &Breadcrumb,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<NodeIndex> {
        let root = graph.root();
        let mut members = Vec::new();

        for (name, constraint) in manifest.dependencies_of_type(dep_type) {
            match graph.find_installed(name, top_scope) {
                Some(node) => {
                    graph.add_edge(root, node, GraphEdge::with_constraint(constraint));
                    members.push(node);
                }
                None => {
                    debug!(package = %name, section = %dep_type, "no top-level install");
                    diagnostics.push(Diagnostic::MissingTopLevel {
                        name: name.clone(),
                        dep_type,
                    });
                }
            }
        }
        members
    }
}

/// Tag every edge of the subgraph induced over `{root} ∪ members ∪ descendants`
fn tag_closure(graph: &mut DependencyGraph, members: &[NodeIndex], dep_type: DependencyType) {
    let mut closure: HashSet<NodeIndex> = HashSet::new();
    closure.insert(graph.root());
    for &member in members {
        closure.insert(member);
        closure.extend(graph.descendants(member));
    }

    let inside: Vec<(NodeIndex, NodeIndex)> = graph
        .edges()
        .filter(|(from, to, _)| closure.contains(from) && closure.contains(to))
        .map(|(from, to, _)| (from, to))
        .collect();

    for (from, to) in inside {
        if let Some(edge) = graph.edge_mut(from, to) {
            match dep_type {
                DependencyType::Runtime => edge.runtime = true,
                DependencyType::Development => edge.development = true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::LockfileGraphBuilder;

    const LOCKFILE: &str = r#"{
      "name": "app", "version": "1.0.0", "lockfileVersion": 1,
      "dependencies": {
        "a": { "version": "1.0.0", "requires": { "shared": "^1.0.0" } },
        "jest": { "version": "29.0.0", "dev": true, "requires": { "shared": "^1.0.0" } },
        "shared": { "version": "1.0.0" }
      }
    }"#;

    fn linked(manifest: &str) -> (DependencyGraph, Vec<Diagnostic>) {
        let mut graph = LockfileGraphBuilder::new()
            .build_from_json(LOCKFILE)
            .unwrap()
            .graph;
        let manifest = Manifest::from_json(manifest).unwrap();
        let diagnostics = ManifestLinker::new().link(&mut graph, &manifest);
        (graph, diagnostics)
    }

    fn node(graph: &DependencyGraph, name: &str) -> NodeIndex {
        graph.find_by_name(name).next().unwrap()
    }

    #[test]
    fn test_edges_are_classified() {
        let (graph, diagnostics) = linked(
            r#"{"name": "app", "version": "1.0.0",
                "dependencies": {"a": "^1.0.0"},
                "devDependencies": {"jest": "^29.0.0"}}"#,
        );
        assert!(diagnostics.is_empty());

        let root = graph.root();
        let a = node(&graph, "a");
        let jest = node(&graph, "jest");
        let shared = node(&graph, "shared");

        let root_a = graph.edge(root, a).unwrap();
        assert!(root_a.runtime && !root_a.development);
        assert_eq!(root_a.constraint.as_deref(), Some("^1.0.0"));

        let root_jest = graph.edge(root, jest).unwrap();
        assert!(root_jest.development && !root_jest.runtime);

        assert!(graph.edge(a, shared).unwrap().runtime);
        assert!(graph.edge(jest, shared).unwrap().development);
        assert!(!graph.edge(jest, shared).unwrap().runtime);
    }

    #[test]
    fn test_edge_in_both_closures_carries_both_flags() {
        let (graph, _) = linked(
            r#"{"name": "app", "version": "1.0.0",
                "dependencies": {"a": "^1.0.0", "shared": "^1.0.0"},
                "devDependencies": {"shared": "^1.0.0"}}"#,
        );
        let edge = graph.edge(graph.root(), node(&graph, "shared")).unwrap();
        assert!(edge.runtime && edge.development);
    }

    #[test]
    fn test_missing_top_level_is_reported() {
        let (graph, diagnostics) = linked(
            r#"{"name": "app", "version": "1.0.0",
                "dependencies": {"a": "^1.0.0", "left-pad": "^1.0.0"}}"#,
        );
        assert_eq!(
            diagnostics,
            vec![Diagnostic::MissingTopLevel {
                name: "left-pad".into(),
                dep_type: DependencyType::Runtime,
            }]
        );
        assert_eq!(graph.successors(graph.root()).count(), 1);
    }

    #[test]
    fn test_root_mismatch_still_links() {
        let (graph, diagnostics) = linked(
            r#"{"name": "app", "version": "2.0.0", "dependencies": {"a": "^1.0.0"}}"#,
        );
        assert!(matches!(diagnostics[0], Diagnostic::RootMismatch { .. }));
        assert!(graph.contains_edge(graph.root(), node(&graph, "a")));
    }

    #[test]
    fn test_link_is_idempotent() {
        let manifest = Manifest::from_json(
            r#"{"name": "app", "version": "1.0.0",
                "dependencies": {"a": "^1.0.0"}, "devDependencies": {"jest": "^29.0.0"}}"#,
        )
        .unwrap();
        let (mut graph, _) = linked(
            r#"{"name": "app", "version": "1.0.0",
                "dependencies": {"a": "^1.0.0"}, "devDependencies": {"jest": "^29.0.0"}}"#,
        );
        let before: Vec<_> = graph.edges().map(|(f, t, e)| (f, t, e.clone())).collect();

        ManifestLinker::new().link(&mut graph, &manifest);

        let after: Vec<_> = graph.edges().map(|(f, t, e)| (f, t, e.clone())).collect();
        assert_eq!(before, after);
    }
}
