//! npms.io client
//!
//! Scores come from the `mget` endpoint, which accepts a JSON array of names
//! and answers with an object keyed by name. Packages npms.io does not know are
//! simply missing from the answer.

use crate::client::HttpClient;
use crate::error::{Error, Result};
use crate::provider::MetricsProvider;
use async_trait::async_trait;
use rem_core::{HealthMetrics, HealthTable, PackageHealth};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::future::Future;
use tracing::{debug, warn};
use url::Url;

/// Public npms.io API
pub const NPMS_API_URL: &str = "https://api.npms.io/v2";

/// Largest batch the `mget` endpoint accepts
pub const MAX_BATCH_SIZE: usize = 250;

/// Answer of `POST /package/mget`
pub type MgetResponse = HashMap<String, NpmsPackage>;

/// One package in an `mget` answer
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NpmsPackage {
    #[serde(default)]
    score: Option<NpmsScore>,
    #[serde(default)]
    collected: Option<Collected>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct NpmsScore {
    #[serde(rename = "final")]
    final_score: Option<f64>,
    #[serde(default)]
    detail: Option<ScoreDetail>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ScoreDetail {
    popularity: Option<f64>,
    quality: Option<f64>,
    maintenance: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Collected {
    #[serde(default)]
    metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Metadata {
    #[serde(default)]
    deprecated: Option<serde_json::Value>,
}

impl NpmsPackage {
    /// Convert to a health record, rounding scores to two decimals
    pub fn into_health(self) -> PackageHealth {
        let metrics = self
            .score
            .map(|score| {
                let detail = score.detail.unwrap_or_default();
                HealthMetrics {
                    final_score: score.final_score,
                    popularity: detail.popularity,
                    quality: detail.quality,
                    maintenance: detail.maintenance,
                }
                .rounded()
            })
            .unwrap_or_default();

        let deprecated = self
            .collected
            .and_then(|c| c.metadata)
            .and_then(|m| m.deprecated)
            .and_then(|value| match value {
                serde_json::Value::String(message) => Some(message),
                serde_json::Value::Bool(true) => Some("deprecated".to_string()),
                _ => None,
            });

        PackageHealth { metrics, deprecated }
    }
}

/// Metrics provider backed by npms.io
#[derive(Debug, Clone)]
pub struct NpmsClient {
    client: HttpClient,
    mget_url: Url,
    batch_size: usize,
}

impl NpmsClient {
    /// Client for the public API, limited to `requests_per_second` (0 disables the limit)
    pub fn new(requests_per_second: u32) -> Result<Self> {
        Self::with_base_url(NPMS_API_URL, requests_per_second)
    }

    /// Client for an npms-compatible API at `base_url`
    pub fn with_base_url(base_url: &str, requests_per_second: u32) -> Result<Self> {
        let base = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))?;
        let client = match requests_per_second {
            0 => HttpClient::new()?,
            rate => HttpClient::with_rate_limit(rate)?,
        };
        Ok(Self {
            client,
            mget_url: base.join("package/mget")?,
            batch_size: MAX_BATCH_SIZE,
        })
    }

    /// Use smaller batches; clamped to `1..=MAX_BATCH_SIZE`
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
        self
    }

    /// Endpoint used for lookups
    pub fn mget_url(&self) -> &Url {
        &self.mget_url
    }
}

#[async_trait]
impl MetricsProvider for NpmsClient {
    fn name(&self) -> &'static str {
        "npms"
    }

    async fn fetch(&self, names: &BTreeSet<String>) -> Result<HealthTable> {
        let names: Vec<String> = names.iter().cloned().collect();
        let url = self.mget_url.as_str();
        let responses = fetch_bisecting(&names, self.batch_size, |batch| async move {
            self.client.post_json::<_, MgetResponse>(url, &batch).await
        })
        .await?;

        let table: HealthTable = responses
            .into_iter()
            .flatten()
            .map(|(name, package)| (name, package.into_health()))
            .collect();
        debug!(requested = names.len(), found = table.len(), "npms.io lookup");
        Ok(table)
    }
}

/// Post `names` in batches of `batch_size`.
///
/// A batch the server rejects is split in half and retried; a single name the
/// server rejects is skipped. Transport failures abort the lookup.
pub async fn fetch_bisecting<F, Fut>(names: &[String], batch_size: usize, mut post: F) -> Result<Vec<MgetResponse>>
where
    F: FnMut(Vec<String>) -> Fut,
    Fut: Future<Output = Result<MgetResponse>>,
{
    let mut pending: VecDeque<Vec<String>> = names
        .chunks(batch_size.max(1))
        .map(<[String]>::to_vec)
        .collect();
    let mut responses = Vec::new();

    while let Some(batch) = pending.pop_front() {
        match post(batch.clone()).await {
            Ok(response) => responses.push(response),
            Err(e) if e.is_rejection() && batch.len() > 1 => {
                debug!(size = batch.len(), error = %e, "batch rejected, splitting");
                let (left, right) = batch.split_at(batch.len() / 2);
                pending.push_front(right.to_vec());
                pending.push_front(left.to_vec());
            }
            Err(e) if e.is_rejection() => {
                warn!(package = %batch[0], error = %e, "no metrics for package");
            }
            Err(e @ Error::RateLimitExceeded(_)) => {
                warn!(size = batch.len(), remaining = pending.len(), "npms.io rate limit hit, aborting lookup");
                return Err(e);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(responses)
}
