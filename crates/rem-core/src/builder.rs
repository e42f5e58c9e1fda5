//! Lockfile graph builder.
//!
//! Walks the nested package-lock tree depth first and resolves every
//! `requires` entry the way Node's module resolution does: the requiring
//! package's own `node_modules` first, then each enclosing `node_modules` up to
//! the application root. The first scope holding the name wins.

use crate::error::{Error, Result};
use crate::graph::DependencyGraph;
use crate::npm::{LockedEntry, Lockfile};
use crate::types::{Breadcrumb, Diagnostic, GraphEdge, PackageIdentity};
use petgraph::stable_graph::NodeIndex;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Default bound on `node_modules` nesting depth
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Default bound on the number of graph nodes
pub const DEFAULT_MAX_NODES: usize = 100_000;

/// Resource bounds applied while building
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildLimits {
    /// Maximum nesting depth of installs below the root
    pub max_depth: usize,
    /// Maximum number of nodes, root included
    pub max_nodes: usize,
}

impl Default for BuildLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_nodes: DEFAULT_MAX_NODES,
        }
    }
}

#[derive(Debug, Clone)]
struct Installed {
    version: String,
    breadcrumb: Breadcrumb,
    node: NodeIndex,
}

/// Per-build index of installed packages by name.
///
/// Entries for a name are kept most recently registered first.
#[derive(Debug, Default)]
pub struct InstalledIndex {
    entries: HashMap<String, Vec<Installed>>,
}

impl InstalledIndex {
    /// Record that `name@version` is installed at `breadcrumb` as `node`
    pub fn register(&mut self, name: &str, version: &str, breadcrumb: Breadcrumb, node: NodeIndex) {
        self.entries.entry(name.to_string()).or_default().insert(
            0,
            Installed {
                version: version.to_string(),
                breadcrumb,
                node,
            },
        );
    }

    /// Resolve `name` as seen from `scope`, walking outwards until the root
    pub fn resolve(&self, name: &str, scope: &Breadcrumb) -> Option<NodeIndex> {
        let candidates = self.entries.get(name)?;
        let mut current = Some(scope.clone());
        while let Some(crumb) = current {
            if crumb.is_empty() {
                break;
            }
            if let Some(hit) = candidates.iter().find(|c| c.breadcrumb == crumb) {
                return Some(hit.node);
            }
            current = crumb.parent();
        }
        None
    }

    /// Installed versions of `name` with their locations, most recent first
    #[cfg(test)]
    fn installs<'a>(&'a self, name: &str) -> impl Iterator<Item = (&'a str, &'a Breadcrumb)> {
        self.entries
            .get(name)
            .into_iter()
            .flatten()
            .map(|i| (i.version.as_str(), &i.breadcrumb))
    }
}

/// Result of a successful build
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// The install graph, not yet linked to the manifest
    pub graph: DependencyGraph,
    /// Unresolved requirements, in walk order
    pub diagnostics: Vec<Diagnostic>,
}

/// Builds the install graph from a lockfile
#[derive(Debug, Clone, Default)]
pub struct LockfileGraphBuilder {
    limits: BuildLimits,
}

impl LockfileGraphBuilder {
    /// Create a builder with default limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder with explicit limits
    pub fn with_limits(limits: BuildLimits) -> Self {
        Self { limits }
    }

    /// Parse and build in one step
    ///
    /// # Errors
    /// Input errors from parsing, resource errors from building
    pub fn build_from_json(&self, content: &str) -> Result<BuildOutput> {
        self.build(&Lockfile::from_json(content)?)
    }

    /// Build the install graph.
    ///
    /// Unresolvable requirements are recorded as diagnostics and produce no
    /// edge; only resource exhaustion fails the build, and then no partial
    /// graph is returned.
    pub fn build(&self, lockfile: &Lockfile) -> Result<BuildOutput> {
        let root = lockfile.root_identity();
        let root_scope = root.install_scope();

        let mut state = BuildState {
            graph: DependencyGraph::new(root),
            index: InstalledIndex::default(),
            diagnostics: Vec::new(),
            limits: self.limits,
        };

        state.register(lockfile.top_level(), &root_scope)?;
        for (name, entry) in lockfile.top_level() {
            if let Some(node) = state.graph.find_installed(name, &root_scope) {
                state.walk(node, entry, 1)?;
            }
        }

        debug!(
            nodes = state.graph.node_count(),
            edges = state.graph.edge_count(),
            gaps = state.diagnostics.len(),
            "built install graph"
        );

        Ok(BuildOutput {
            graph: state.graph,
            diagnostics: state.diagnostics,
        })
    }
}

struct BuildState {
    graph: DependencyGraph,
    index: InstalledIndex,
    diagnostics: Vec<Diagnostic>,
    limits: BuildLimits,
}

impl BuildState {
    /// Create nodes for the packages installed at `scope` and index them
    fn register<'e>(
        &mut self,
        installs: impl IntoIterator<Item = (&'e String, &'e LockedEntry)>,
        scope: &Breadcrumb,
    ) -> Result<()> {
        for (name, entry) in installs {
            if self.graph.node_count() >= self.limits.max_nodes {
                warn!(max_nodes = self.limits.max_nodes, "lockfile exceeds node bound");
                return Err(Error::GraphTooLarge {
                    node_count: self.graph.node_count(),
                    max_allowed: self.limits.max_nodes,
                });
            }
            let identity = PackageIdentity::new(name, &entry.version, scope.clone());
            let node = self.graph.add_dependency(identity, entry.dev);
            self.index.register(name, &entry.version, scope.clone(), node);
        }
        Ok(())
    }

    fn walk(&mut self, node: NodeIndex, entry: &LockedEntry, depth: usize) -> Result<()> {
        if depth > self.limits.max_depth {
            warn!(max_depth = self.limits.max_depth, "lockfile exceeds nesting bound");
            return Err(Error::NestingTooDeep {
                depth,
                max_allowed: self.limits.max_depth,
            });
        }

        // Nested installs are the first resolution scope of this package.
        let scope = self.graph[node].identity.install_scope();
        self.register(&entry.dependencies, &scope)?;

        for (requirement, constraint) in &entry.requires {
            match self.index.resolve(requirement, &scope) {
                Some(target) => {
                    self.graph
                        .add_edge(node, target, GraphEdge::with_constraint(constraint));
                }
                None => {
                    let dependent = self.graph[node].identity.clone();
                    debug!(
                        dependent = %dependent,
                        requirement = %requirement,
                        constraint = %constraint,
                        "required dependency not found on the tree"
                    );
                    self.diagnostics.push(Diagnostic::ResolutionGap {
                        dependent,
                        requirement: requirement.clone(),
                        constraint: constraint.clone(),
                    });
                }
            }
        }

        for (name, nested) in &entry.dependencies {
            if let Some(child) = self.graph.find_installed(name, &scope) {
                self.walk(child, nested, depth + 1)?;
            }
        }
        Ok(())
    }
}
