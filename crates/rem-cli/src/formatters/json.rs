//! JSON formatter: the node-link report document.

use super::Formatter;
use anyhow::{Context, Result};
use rem_core::{AnalysisReport, ReportDocument};

pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format(&self, report: &AnalysisReport) -> Result<String> {
        let document = ReportDocument::from(report);
        let mut json = serde_json::to_string_pretty(&document).context("Failed to serialize report")?;
        json.push('\n');
        Ok(json)
    }
}
