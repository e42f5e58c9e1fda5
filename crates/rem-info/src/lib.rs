//! Package health metrics for rem
//!
//! This library looks up per-package health scores (`final`, `popularity`,
//! `quality`, `maintenance`) and deprecation notices for a set of npm package
//! names, in one batched pass, and returns them as a [`rem_core::HealthTable`].
//!
//! Sources:
//! - [`NpmsClient`]: the npms.io `mget` API, rate limited
//! - [`StaticMetrics`]: a JSON table on disk, for offline and reproducible runs
//! - [`NoMetrics`]: no data at all
//!
//! # Example
//!
//! ```no_run
//! use rem_info::{MetricsProvider, NpmsClient};
//! use std::collections::BTreeSet;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = NpmsClient::new(1)?;
//!     let names: BTreeSet<String> = ["express", "request"].iter().map(|s| s.to_string()).collect();
//!
//!     let table = client.fetch(&names).await?;
//!     for (name, health) in &table {
//!         println!("{}: {:?}", name, health.metrics.final_score);
//!     }
//!     Ok(())
//! }
//! ```

mod client;
mod error;
mod npms;
mod provider;

pub use client::HttpClient;
pub use error::{Error, Result};
pub use npms::{fetch_bisecting, MgetResponse, NpmsClient, NpmsPackage, MAX_BATCH_SIZE, NPMS_API_URL};
pub use provider::{MetricsProvider, NoMetrics, StaticMetrics};
