//! The metrics collaborator interface and its trivial implementations

use crate::error::{Error, Result};
use async_trait::async_trait;
use rem_core::HealthTable;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Looks up health records for a set of package names.
///
/// Names without data are absent from the returned table.
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Fetch records for `names` in as few calls as the source allows
    async fn fetch(&self, names: &BTreeSet<String>) -> Result<HealthTable>;
}

/// Provider that knows nothing; every package ends up unscored
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMetrics;

#[async_trait]
impl MetricsProvider for NoMetrics {
    fn name(&self) -> &'static str {
        "none"
    }

    async fn fetch(&self, _names: &BTreeSet<String>) -> Result<HealthTable> {
        Ok(HealthTable::new())
    }
}

/// Provider backed by a JSON table `{ name: { final, popularity, quality, maintenance, deprecated } }`
#[derive(Debug, Clone, Default)]
pub struct StaticMetrics {
    table: HealthTable,
}

impl StaticMetrics {
    /// Wrap an in-memory table
    pub fn new(table: HealthTable) -> Self {
        Self { table }
    }

    /// Load a table from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let metrics = Self::from_json(&content).map_err(|e| match e {
            Error::Json(source) => Error::InvalidTable {
                path: PathBuf::from(path),
                source,
            },
            other => other,
        })?;
        if metrics.is_empty() {
            warn!(path = %path.display(), "metrics table is empty, every package stays unscored");
        } else {
            debug!(path = %path.display(), packages = metrics.len(), "loaded metrics table");
        }
        Ok(metrics)
    }

    /// Parse a table from JSON text; scores are rounded to two decimals.
    ///
    /// # Errors
    /// Fails on malformed JSON and on any score outside `[0, 1]`
    pub fn from_json(content: &str) -> Result<Self> {
        let mut table: HealthTable = serde_json::from_str(content)?;
        for health in table.values_mut() {
            health.metrics = health.metrics.rounded();
        }
        rem_core::validate_health(&table)?;
        Ok(Self { table })
    }

    /// Number of packages in the table
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[async_trait]
impl MetricsProvider for StaticMetrics {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn fetch(&self, names: &BTreeSet<String>) -> Result<HealthTable> {
        let found: HealthTable = names
            .iter()
            .filter_map(|name| self.table.get(name).map(|h| (name.clone(), h.clone())))
            .collect();
        debug!(requested = names.len(), found = found.len(), "static metrics lookup");
        Ok(found)
    }
}
