//! Output formatters for analysis reports.

pub mod human;
pub mod json;

pub use human::HumanFormatter;
pub use json::JsonFormatter;

use anyhow::Result;
use rem_core::AnalysisReport;

/// Trait for rendering analysis reports
pub trait Formatter {
    /// Render the report as text ready to print or write
    fn format(&self, report: &AnalysisReport) -> Result<String>;
}

/// Output format selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn formatter(self) -> Box<dyn Formatter> {
        match self {
            OutputFormat::Human => Box::new(HumanFormatter),
            OutputFormat::Json => Box::new(JsonFormatter),
        }
    }
}
