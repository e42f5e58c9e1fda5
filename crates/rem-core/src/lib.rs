//! # rem-core
//!
//! Ripple-effect-of-metrics analysis for npm projects.
//!
//! This crate provides functionality to:
//! - Build an install-location aware dependency graph from a package-lock tree
//! - Link the application's declared dependencies and split runtime from development
//! - Compute the ripple effect: every path from the application to a flagged package
//! - Collapse subtrees whose worst health score adds nothing over their parent's
//! - Mark transitive packages that are healthier than the direct dependency pulling them in
//!
//! Everything here is synchronous and free of I/O. Health scores come from a
//! collaborator (see `rem-info`) and are attached by package name.
//!
//! ## Example
//!
//! ```rust,no_run
//! use rem_core::{prepare, AnalysisOptions, BuildLimits, HealthTable, TargetSelector};
//!
//! # fn example(manifest: &str, lockfile: &str) -> rem_core::Result<()> {
//! let mut prepared = prepare(manifest, lockfile, BuildLimits::default())?;
//!
//! // Look up prepared.package_names() somewhere, then:
//! prepared.attach_health(&HealthTable::new())?;
//!
//! let flagged: TargetSelector = "request@2.88.2".parse().expect("valid selector");
//! let report = prepared.analyze(&[flagged], &AnalysisOptions::default())?;
//! println!("{} packages affected", report.runtime.ripple.nodes);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod analysis;
pub mod annotate;
pub mod builder;
pub mod document;
pub mod error;
pub mod filter;
pub mod graph;
pub mod linker;
pub mod npm;
pub mod ripple;
pub mod types;

pub use error::{Document, Error, Result};
pub use types::{
    round_score, Breadcrumb, DependencyType, Diagnostic, GraphEdge, GraphNode, HealthMetrics,
    HealthTable, MetricKind, NodeKind, PackageHealth, PackageIdentity, validate_health,
};

pub use analysis::{
    prepare, AnalysisOptions, AnalysisReport, DeprecatedPackage, DirectDependency, PreparedGraph,
    SubgraphSummary,
};
pub use annotate::{NonProblematic, ProblemAnnotator};
pub use builder::{BuildLimits, BuildOutput, InstalledIndex, LockfileGraphBuilder};
pub use document::{GraphDocument, ReportDocument};
pub use filter::{
    FilterOptions, FilterOutcome, MinimumScoreFilter, SubtreeMinimums, DEFAULT_COLLAPSE_THRESHOLD,
};
pub use graph::DependencyGraph;
pub use linker::ManifestLinker;
pub use npm::{LockedEntry, Lockfile, Manifest};
pub use ripple::{RippleEffect, RippleEffectAnalyzer, RippleOptions, RippleStats, TargetSelector};

pub use petgraph::stable_graph::NodeIndex;
