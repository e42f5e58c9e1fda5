//! The `rem analyze` command.

use crate::formatters::OutputFormat;
use anyhow::{Context, Result};
use clap::Args;
use rem_config::{MetricsSource, RemConfig};
use rem_core::{AnalysisOptions, AnalysisReport, MetricKind, PreparedGraph, TargetSelector};
use rem_info::{MetricsProvider, NoMetrics, NpmsClient, StaticMetrics};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;
use tracing::{info, warn};

/// Options for `rem analyze`; unset values fall back to the configuration file
#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Path to package.json
    #[arg(long, value_name = "FILE", default_value = "package.json")]
    pub manifest: PathBuf,

    /// Path to package-lock.json
    #[arg(long, value_name = "FILE", default_value = "package-lock.json")]
    pub lockfile: PathBuf,

    /// Flagged package, `name` or `name@version` (repeatable)
    #[arg(short, long = "flag", value_name = "SPEC")]
    pub flags: Vec<TargetSelector>,

    /// Metric used for filtering: final, popularity, quality or maintenance
    #[arg(short, long)]
    pub metric: Option<MetricKind>,

    /// Collapse a subtree when its worst score is at least this share of the parent's
    #[arg(short, long, value_name = "RATIO")]
    pub threshold: Option<f64>,

    /// Skip filtering, only trace ripple paths
    #[arg(long)]
    pub no_filter: bool,

    /// Do not flag deprecated packages automatically
    #[arg(long)]
    pub no_deprecated: bool,

    /// Stop enumerating ripple paths per flagged package after this many
    #[arg(long, value_name = "COUNT", value_parser = clap::value_parser!(u64).range(1..))]
    pub max_paths: Option<u64>,

    /// Read health metrics from a JSON table instead of npms.io
    #[arg(long, value_name = "FILE", conflicts_with = "offline")]
    pub metrics_file: Option<PathBuf>,

    /// Do not look up health metrics at all
    #[arg(long)]
    pub offline: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "human")]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl AnalyzeArgs {
    /// Configuration values with command-line overrides applied
    pub fn options(&self, config: &RemConfig) -> AnalysisOptions {
        let mut options = config.analysis_options();
        if let Some(metric) = self.metric {
            options.metric = metric;
        }
        if let Some(threshold) = self.threshold {
            options.threshold = threshold;
        }
        if self.no_filter {
            options.filter = false;
        }
        if self.no_deprecated {
            options.flag_deprecated = false;
        }
        if let Some(max_paths) = self.max_paths {
            options.ripple.max_paths = Some(usize::try_from(max_paths).unwrap_or(usize::MAX));
        }
        options
    }

    /// Metrics source chosen by flags, then by configuration
    pub fn provider(&self, config: &RemConfig) -> Result<Box<dyn MetricsProvider>> {
        if self.offline {
            return Ok(Box::new(NoMetrics));
        }
        if let Some(path) = &self.metrics_file {
            return Ok(Box::new(load_table(path)?));
        }

        match config.metrics.source {
            MetricsSource::None => Ok(Box::new(NoMetrics)),
            MetricsSource::File => {
                let path = config
                    .metrics
                    .file
                    .as_deref()
                    .context("metrics.source is \"file\" but metrics.file is not set")?;
                Ok(Box::new(load_table(path)?))
            }
            MetricsSource::Npms => {
                let client = NpmsClient::with_base_url(&config.metrics.npms_url, config.metrics.requests_per_second)
                    .context("Failed to create npms.io client")?;
                Ok(Box::new(client))
            }
        }
    }
}

fn load_table(path: &Path) -> Result<StaticMetrics> {
    StaticMetrics::from_path(path).with_context(|| format!("Failed to load metrics table {}", path.display()))
}

/// Build the graph, attach metrics and run the analysis
pub fn build_report(args: &AnalyzeArgs, config: &RemConfig) -> Result<AnalysisReport> {
    let manifest = fs::read_to_string(&args.manifest)
        .with_context(|| format!("Failed to read manifest {}", args.manifest.display()))?;
    let lockfile = fs::read_to_string(&args.lockfile)
        .with_context(|| format!("Failed to read lockfile {}", args.lockfile.display()))?;

    let mut prepared = PreparedGraph::prepare(&manifest, &lockfile, config.build_limits())
        .context("Failed to build the dependency graph")?;

    let provider = args.provider(config)?;
    let names = prepared.package_names();
    let runtime = Runtime::new().context("Failed to create tokio runtime")?;
    let table = runtime
        .block_on(provider.fetch(&names))
        .with_context(|| format!("Failed to fetch health metrics ({})", provider.name()))?;
    let scored = prepared
        .attach_health(&table)
        .with_context(|| format!("Invalid health metrics ({})", provider.name()))?;
    info!(
        provider = provider.name(),
        packages = names.len(),
        scored,
        "health metrics attached"
    );

    let report = prepared
        .analyze(&args.flags, &args.options(config))
        .context("Analysis failed")?;

    if !args.flags.is_empty() && report.targets.is_empty() {
        warn!("none of the flagged packages is installed");
    }
    Ok(report)
}

/// Run `rem analyze` and print or write the report
pub fn run(args: &AnalyzeArgs, config: &RemConfig) -> Result<()> {
    let report = build_report(args, config)?;

    if args.output.is_some() {
        colored::control::set_override(false);
    }
    let rendered = args.format.formatter().format(&report)?;

    match &args.output {
        Some(path) => {
            fs::write(path, rendered).with_context(|| format!("Failed to write report to {}", path.display()))?;
            eprintln!("Report written to {}", path.display());
        }
        None => print!("{}", rendered),
    }
    Ok(())
}
