//! Human-readable formatter for analysis reports.

use super::Formatter;
use anyhow::Result;
use colored::*;
use rem_core::{AnalysisReport, DependencyGraph, DependencyType, GraphNode, MetricKind, SubgraphSummary};
use std::fmt::Write;

/// Entries shown per list before the rest is summarized
const LIST_LIMIT: usize = 10;

pub struct HumanFormatter;

impl Formatter for HumanFormatter {
    fn format(&self, report: &AnalysisReport) -> Result<String> {
        let mut out = String::new();

        writeln!(out, "\n{}", format!("Ripple effect of metrics for {}", report.root()).bold())?;
        writeln!(out, "Metric: {}\n", report.metric)?;

        if report.targets.is_empty() {
            writeln!(out, "{}", "No flagged packages installed".green())?;
        } else {
            writeln!(out, "{}", format!("Flagged packages ({}):", report.targets.len()).bold())?;
            for target in report.targets.iter().take(LIST_LIMIT) {
                writeln!(out, "  {} {}", "✗".red(), target)?;
            }
            more(&mut out, report.targets.len(), "  ")?;
        }

        for summary in [&report.runtime, &report.development] {
            write_summary(&mut out, summary)?;
        }

        if let Some(filtered) = &report.filtered {
            write_filtered(&mut out, filtered, report.graph.node_count(), report.metric)?;
        }

        if !report.diagnostics.is_empty() {
            writeln!(out, "\n{}", format!("Diagnostics ({}):", report.diagnostics.len()).bold())?;
            for diagnostic in &report.diagnostics {
                writeln!(out, "  {} {}", "⚠".yellow(), diagnostic)?;
            }
        }

        Ok(out)
    }
}

fn write_summary(out: &mut String, summary: &SubgraphSummary) -> Result<()> {
    let title = match summary.dep_type {
        DependencyType::Runtime => "Runtime dependencies",
        DependencyType::Development => "Development dependencies",
    };
    writeln!(
        out,
        "\n{} {}",
        format!("📦 {}", title).bold(),
        format!("({} packages, {} edges)", summary.nodes, summary.edges).dimmed()
    )?;

    if summary.direct.is_empty() {
        writeln!(out, "  none declared")?;
        return Ok(());
    }

    let ripple = &summary.ripple;
    let coverage = format!(
        "{} nodes ({:.1}%), {} edges ({:.1}%)",
        ripple.nodes, ripple.node_percent, ripple.edges, ripple.edge_percent
    );
    if ripple.edges > 0 {
        writeln!(out, "  Ripple effect: {}", coverage.red())?;
    } else {
        writeln!(out, "  Ripple effect: {}", coverage.green())?;
    }
    if summary.ripple_truncated {
        writeln!(out, "  {}", "path limit reached, ripple counts are lower bounds".yellow())?;
    }

    writeln!(out, "  Direct ({}):", summary.direct.len())?;
    for dep in summary.direct.iter().take(LIST_LIMIT) {
        match &dep.constraint {
            Some(constraint) => writeln!(out, "    {}@{} {}", dep.name, dep.version, format!("({})", constraint).dimmed())?,
            None => writeln!(out, "    {}@{}", dep.name, dep.version)?,
        }
    }
    more(out, summary.direct.len(), "    ")?;

    if !summary.deprecated.is_empty() {
        writeln!(out, "  Deprecated ({}):", summary.deprecated.len())?;
        for package in summary.deprecated.iter().take(LIST_LIMIT) {
            let message = package.message.as_deref().unwrap_or("deprecated");
            writeln!(out, "    {} {} - {}", "⚠".yellow(), package.identity, message)?;
        }
        more(out, summary.deprecated.len(), "    ")?;
    }
    Ok(())
}

fn write_filtered(out: &mut String, filtered: &DependencyGraph, total: usize, metric: MetricKind) -> Result<()> {
    writeln!(
        out,
        "\n{} kept {} of {} packages, {} edges",
        "Filtered graph:".bold(),
        filtered.node_count(),
        total,
        filtered.edge_count()
    )?;

    let kept: Vec<&GraphNode> = filtered
        .nodes()
        .map(|(_, node)| node)
        .filter(|node| !node.is_root())
        .collect();
    writeln!(out, "  Kept ({}):", kept.len())?;
    for node in kept.iter().take(LIST_LIMIT) {
        match node.score(metric) {
            Some(score) => writeln!(out, "    {} {}", node.identity, format!("({} {:.2})", metric, score).dimmed())?,
            None => writeln!(out, "    {}", node.identity)?,
        }
    }
    more(out, kept.len(), "    ")?;

    let healthier: Vec<&GraphNode> = kept.into_iter().filter(|node| node.non_problematic).collect();
    if !healthier.is_empty() {
        writeln!(out, "  Transitive packages healthier than their dependents ({}):", healthier.len())?;
        for node in healthier.iter().take(LIST_LIMIT) {
            writeln!(out, "    {} {}", "✓".green(), node.identity)?;
        }
        more(out, healthier.len(), "    ")?;
    }
    Ok(())
}

fn more(out: &mut String, len: usize, indent: &str) -> Result<()> {
    if len > LIST_LIMIT {
        writeln!(out, "{}... and {} more", indent, len - LIST_LIMIT)?;
    }
    Ok(())
}
