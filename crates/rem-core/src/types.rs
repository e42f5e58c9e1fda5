//! Core types for dependency graphs

use crate::error::{Document, Error};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Install location of a package inside the nested `node_modules` tree.
///
/// The first segment is the application root label (`name(version)`), every
/// following segment the name of the package whose `node_modules` directory
/// holds the install. Segments are kept apart so that characters inside
/// package names can never be confused with a separator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Breadcrumb(Vec<String>);

impl Breadcrumb {
    /// Location of the top-level `node_modules` of the application
    pub fn root(label: impl Into<String>) -> Self {
        Self(vec![label.into()])
    }

    /// Location of the `node_modules` directory of `name` installed here
    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.to_string());
        Self(segments)
    }

    /// The enclosing scope, `None` once the breadcrumb is empty
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    /// Ancestor segments, outermost first
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Number of segments
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Whether the breadcrumb has no segments (the root identity)
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for Breadcrumb {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Breadcrumb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("->"))
    }
}

/// Unique identity of a node: one installed copy of a package
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageIdentity {
    /// Package name
    pub name: String,
    /// Exact installed version
    pub version: String,
    /// Where the copy is installed (empty for the application root)
    pub breadcrumb: Breadcrumb,
}

impl PackageIdentity {
    /// Identity of an installed dependency
    pub fn new(name: impl Into<String>, version: impl Into<String>, breadcrumb: Breadcrumb) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            breadcrumb,
        }
    }

    /// Identity of the application root
    pub fn root(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self::new(name, version, Breadcrumb::default())
    }

    /// `name(version)`, the label used for the root breadcrumb segment
    pub fn label(&self) -> String {
        format!("{}({})", self.name, self.version)
    }

    /// Breadcrumb of this package's own `node_modules` directory
    pub fn install_scope(&self) -> Breadcrumb {
        if self.breadcrumb.is_empty() {
            Breadcrumb::root(self.label())
        } else {
            self.breadcrumb.child(&self.name)
        }
    }
}

impl fmt::Display for PackageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.breadcrumb.is_empty() {
            write!(f, "{}", self.label())
        } else {
            write!(f, "{}@{} ({})", self.name, self.version, self.breadcrumb)
        }
    }
}

/// Health metric used as the filtering and annotation keyword
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Aggregated score
    #[default]
    Final,
    /// Popularity score
    Popularity,
    /// Quality score
    Quality,
    /// Maintenance score
    Maintenance,
}

impl MetricKind {
    /// Returns all metrics in a consistent order
    pub fn all() -> &'static [MetricKind] {
        &[
            MetricKind::Final,
            MetricKind::Popularity,
            MetricKind::Quality,
            MetricKind::Maintenance,
        ]
    }

    /// Returns the lowercase name used in documents and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Final => "final",
            MetricKind::Popularity => "popularity",
            MetricKind::Quality => "quality",
            MetricKind::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .find(|metric| metric.as_str() == s)
            .copied()
            .ok_or_else(|| {
                format!(
                    "unknown metric '{}', expected one of: final, popularity, quality, maintenance",
                    s
                )
            })
    }
}

/// Rounds a score to two decimals
pub fn round_score(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Health metrics of a package, each in `[0, 1]` when present
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthMetrics {
    /// Aggregated score
    #[serde(rename = "final", default, skip_serializing_if = "Option::is_none")]
    pub final_score: Option<f64>,
    /// Popularity score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popularity: Option<f64>,
    /// Quality score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<f64>,
    /// Maintenance score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maintenance: Option<f64>,
}

impl HealthMetrics {
    /// Value of one metric
    pub fn get(&self, metric: MetricKind) -> Option<f64> {
        match metric {
            MetricKind::Final => self.final_score,
            MetricKind::Popularity => self.popularity,
            MetricKind::Quality => self.quality,
            MetricKind::Maintenance => self.maintenance,
        }
    }

    /// Copy with every score rounded to two decimals; non-finite values are dropped
    pub fn rounded(self) -> Self {
        let round = |v: Option<f64>| v.filter(|x| x.is_finite()).map(round_score);
        Self {
            final_score: round(self.final_score),
            popularity: round(self.popularity),
            quality: round(self.quality),
            maintenance: round(self.maintenance),
        }
    }

    /// Whether no metric is present
    pub fn is_empty(&self) -> bool {
        MetricKind::all().iter().all(|m| self.get(*m).is_none())
    }

    /// First metric outside `[0, 1]`, if any
    pub fn out_of_range(&self) -> Option<(MetricKind, f64)> {
        MetricKind::all().iter().find_map(|metric| {
            self.get(*metric)
                .filter(|value| !(0.0..=1.0).contains(value))
                .map(|value| (*metric, value))
        })
    }
}

/// One record returned by the metrics collaborator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageHealth {
    /// Health scores
    #[serde(flatten)]
    pub metrics: HealthMetrics,
    /// Deprecation message, present when the package is deprecated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<String>,
}

/// Health records keyed by package name; names without data are absent
pub type HealthTable = BTreeMap<String, PackageHealth>;

/// Reject a table holding any score outside `[0, 1]`.
///
/// # Errors
/// Returns [`Error::InvalidInput`] for the metrics document, naming the first
/// offending package and metric
pub fn validate_health(table: &HealthTable) -> crate::error::Result<()> {
    for (name, health) in table {
        if let Some((metric, value)) = health.metrics.out_of_range() {
            return Err(Error::input(
                Document::Metrics,
                format!("{} score of '{}' is {}, expected a value in [0, 1]", metric, name, value),
            ));
        }
    }
    Ok(())
}

/// Kind of a graph node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    /// The analyzed application itself
    ApplicationRoot,
    /// An installed package
    Dependency,
}

/// Manifest dependency section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyType {
    /// `dependencies`
    Runtime,
    /// `devDependencies`
    Development,
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyType::Runtime => write!(f, "dependencies"),
            DependencyType::Development => write!(f, "devDependencies"),
        }
    }
}

/// A node of the dependency graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    /// Identity of the installed copy
    pub identity: PackageIdentity,
    /// Root or dependency
    pub kind: NodeKind,
    /// Health metrics, if the collaborator knew the package
    pub metrics: Option<HealthMetrics>,
    /// Whether the package is deprecated
    pub deprecated: bool,
    /// Deprecation message
    pub deprecation_message: Option<String>,
    /// The lockfile marks this install as development-only
    pub dev: bool,
    /// Node is a flagged package with a ripple effect
    pub ripple: bool,
    /// Node is healthier than every scored direct dependency pulling it in
    pub non_problematic: bool,
    /// Worst score of the node and everything beneath it, written by the filter
    pub subtree_minimum: Option<f64>,
}

impl GraphNode {
    /// Create the application root node
    pub fn root(identity: PackageIdentity) -> Self {
        Self::with_kind(identity, NodeKind::ApplicationRoot, false)
    }

    /// Create a dependency node
    pub fn dependency(identity: PackageIdentity, dev: bool) -> Self {
        Self::with_kind(identity, NodeKind::Dependency, dev)
    }

    fn with_kind(identity: PackageIdentity, kind: NodeKind, dev: bool) -> Self {
        Self {
            identity,
            kind,
            metrics: None,
            deprecated: false,
            deprecation_message: None,
            dev,
            ripple: false,
            non_problematic: false,
            subtree_minimum: None,
        }
    }

    /// Package name
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    /// Installed version
    pub fn version(&self) -> &str {
        &self.identity.version
    }

    /// Whether this is the application root
    pub fn is_root(&self) -> bool {
        self.kind == NodeKind::ApplicationRoot
    }

    /// The node's own score for `metric`
    pub fn score(&self, metric: MetricKind) -> Option<f64> {
        self.metrics.and_then(|m| m.get(metric))
    }

    /// Attach a collaborator record
    pub fn apply_health(&mut self, health: &PackageHealth) {
        if !health.metrics.is_empty() {
            self.metrics = Some(health.metrics);
        }
        if let Some(message) = &health.deprecated {
            self.deprecated = true;
            self.deprecation_message = Some(message.clone());
        }
    }

    /// Merge the attributes of another copy of the same node
    pub(crate) fn merge(&mut self, other: &GraphNode) {
        if self.metrics.is_none() {
            self.metrics = other.metrics;
        }
        if self.deprecation_message.is_none() {
            self.deprecation_message = other.deprecation_message.clone();
        }
        self.subtree_minimum = match (self.subtree_minimum, other.subtree_minimum) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.deprecated |= other.deprecated;
        self.dev |= other.dev;
        self.ripple |= other.ripple;
        self.non_problematic |= other.non_problematic;
    }
}

/// An edge of the dependency graph: `from` requires `to`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    /// Reachable from a runtime top-level dependency
    pub runtime: bool,
    /// Reachable from a development top-level dependency
    pub development: bool,
    /// Version constraint of the requirement
    pub constraint: Option<String>,
    /// Lies on a path from the root to a flagged package
    pub ripple: bool,
}

impl GraphEdge {
    /// Edge for a requirement with the given constraint
    pub fn with_constraint(constraint: impl Into<String>) -> Self {
        Self {
            constraint: Some(constraint.into()),
            ..Default::default()
        }
    }

    /// Merge the attributes of another copy of the same edge
    pub(crate) fn merge(&mut self, other: &GraphEdge) {
        self.runtime |= other.runtime;
        self.development |= other.development;
        self.ripple |= other.ripple;
        if self.constraint.is_none() {
            self.constraint = other.constraint.clone();
        }
    }
}

/// Non-fatal finding recorded while building, linking or filtering
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A `requires` entry matched no installed package in any enclosing scope
    ResolutionGap {
        /// The package declaring the requirement
        dependent: PackageIdentity,
        /// Required package name
        requirement: String,
        /// Required version constraint
        constraint: String,
    },
    /// A manifest dependency has no top-level install in the lockfile
    MissingTopLevel {
        /// Declared package name
        name: String,
        /// Manifest section declaring it
        dep_type: DependencyType,
    },
    /// Manifest and lockfile disagree on the application name or version
    RootMismatch {
        /// `name(version)` from the manifest
        manifest: String,
        /// `name(version)` from the lockfile
        lockfile: String,
    },
    /// An edge was cut to make the subtree-minimum computation acyclic
    CycleBroken {
        /// Source of the removed edge
        from: PackageIdentity,
        /// Target of the removed edge
        to: PackageIdentity,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::ResolutionGap {
                dependent,
                requirement,
                constraint,
            } => write!(
                f,
                "required dependency {}@{} of {} not found on the tree",
                requirement, constraint, dependent
            ),
            Diagnostic::MissingTopLevel { name, dep_type } => {
                write!(f, "{} entry '{}' has no top-level install", dep_type, name)
            }
            Diagnostic::RootMismatch { manifest, lockfile } => write!(
                f,
                "manifest describes {} but the lockfile describes {}",
                manifest, lockfile
            ),
            Diagnostic::CycleBroken { from, to } => {
                write!(f, "cycle broken by ignoring {} -> {}", from, to)
            }
        }
    }
}
