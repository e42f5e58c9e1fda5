use rem_core::{
    AnalysisOptions, BuildLimits, MetricKind, RippleOptions, DEFAULT_COLLAPSE_THRESHOLD,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Public npms.io API
pub const DEFAULT_NPMS_URL: &str = "https://api.npms.io/v2";

/// Main configuration structure for rem
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RemConfig {
    /// Analysis settings
    #[serde(default)]
    pub analysis: AnalysisSettings,

    /// Resource bounds
    #[serde(default)]
    pub limits: LimitSettings,

    /// Where health metrics come from
    #[serde(default)]
    pub metrics: MetricsSettings,
}

impl RemConfig {
    /// Options for one analysis run
    pub fn analysis_options(&self) -> AnalysisOptions {
        AnalysisOptions {
            metric: self.analysis.metric,
            filter: self.analysis.filter,
            threshold: self.analysis.collapse_threshold,
            flag_deprecated: self.analysis.flag_deprecated,
            ripple: RippleOptions {
                max_paths: self.limits.max_paths,
            },
        }
    }

    /// Bounds for the graph builder
    pub fn build_limits(&self) -> BuildLimits {
        BuildLimits {
            max_depth: self.limits.max_depth,
            max_nodes: self.limits.max_nodes,
        }
    }

    /// Check value ranges and cross-field requirements
    pub fn validate(&self) -> Result<(), String> {
        let threshold = self.analysis.collapse_threshold;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(format!(
                "analysis.collapse_threshold must be a non-negative number, got {}",
                threshold
            ));
        }
        if self.limits.max_depth == 0 {
            return Err("limits.max_depth must be at least 1".to_string());
        }
        if self.limits.max_nodes < 2 {
            return Err("limits.max_nodes must be at least 2".to_string());
        }
        if self.limits.max_paths == Some(0) {
            return Err("limits.max_paths must be at least 1 when set".to_string());
        }
        if self.metrics.source == MetricsSource::File && self.metrics.file.is_none() {
            return Err("metrics.file is required when metrics.source = \"file\"".to_string());
        }
        Ok(())
    }
}

/// Analysis settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisSettings {
    /// Metric driving filtering and annotation
    #[serde(default)]
    pub metric: MetricKind,

    /// Produce the filtered graph
    #[serde(default = "default_true")]
    pub filter: bool,

    /// Collapse a subtree when its worst score is at least this share of the parent's
    #[serde(default = "default_collapse_threshold")]
    pub collapse_threshold: f64,

    /// Treat deprecated packages as flagged
    #[serde(default = "default_true")]
    pub flag_deprecated: bool,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            metric: MetricKind::default(),
            filter: default_true(),
            collapse_threshold: default_collapse_threshold(),
            flag_deprecated: default_true(),
        }
    }
}

/// Resource bounds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LimitSettings {
    /// Maximum `node_modules` nesting depth
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Maximum number of graph nodes
    #[serde(default = "default_max_nodes")]
    pub max_nodes: usize,

    /// Maximum ripple paths enumerated per flagged package, unbounded when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_paths: Option<usize>,
}

impl Default for LimitSettings {
    fn default() -> Self {
        let limits = BuildLimits::default();
        Self {
            max_depth: limits.max_depth,
            max_nodes: limits.max_nodes,
            max_paths: None,
        }
    }
}

/// Source of health metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricsSource {
    /// npms.io API
    #[default]
    Npms,
    /// JSON table on disk
    File,
    /// No metrics, every package unscored
    None,
}

/// Metrics settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricsSettings {
    /// Where metrics come from
    #[serde(default)]
    pub source: MetricsSource,

    /// Table used when `source = "file"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    /// Base URL of the npms API
    #[serde(default = "default_npms_url")]
    pub npms_url: String,

    /// Request budget for the npms API; 0 disables client-side limiting
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            source: MetricsSource::default(),
            file: None,
            npms_url: default_npms_url(),
            requests_per_second: default_requests_per_second(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_collapse_threshold() -> f64 {
    DEFAULT_COLLAPSE_THRESHOLD
}

fn default_max_depth() -> usize {
    BuildLimits::default().max_depth
}

fn default_max_nodes() -> usize {
    BuildLimits::default().max_nodes
}

fn default_npms_url() -> String {
    DEFAULT_NPMS_URL.to_string()
}

fn default_requests_per_second() -> u32 {
    1
}
