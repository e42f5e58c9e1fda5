//! End-to-end tests for `rem analyze` on files in a temporary directory.

use clap::Parser;
use rem_cli::commands::analyze::{build_report, run};
use rem_cli::AnalyzeArgs;
use rem_config::{MetricsSource, RemConfig};
use std::fs;
use tempfile::TempDir;

const MANIFEST: &str = r#"{
  "name": "app", "version": "1.0.0",
  "dependencies": { "x": "^1.0.0", "y": "^1.0.0" },
  "devDependencies": { "jest": "^29.0.0" }
}"#;

const LOCKFILE: &str = r#"{
  "name": "app", "version": "1.0.0", "lockfileVersion": 1,
  "dependencies": {
    "x": { "version": "1.0.0", "requires": { "x-a": "^1.0.0", "x-b": "^1.0.0" } },
    "x-a": { "version": "1.0.0", "requires": { "x-c": "^1.0.0" } },
    "x-b": { "version": "1.0.0" },
    "x-c": { "version": "1.0.0" },
    "y": { "version": "1.0.0" },
    "jest": { "version": "29.0.0", "dev": true, "requires": { "request": "^2.0.0" } },
    "request": { "version": "2.88.2", "dev": true }
  }
}"#;

const METRICS: &str = r#"{
  "x": { "final": 0.95 },
  "x-a": { "final": 0.95 },
  "x-b": { "final": 0.95 },
  "x-c": { "final": 0.95 },
  "y": { "final": 0.1 },
  "jest": { "final": 0.9 },
  "request": { "final": 0.4, "deprecated": "request has been deprecated" }
}"#;

#[derive(Parser)]
struct Harness {
    #[command(flatten)]
    args: AnalyzeArgs,
}

struct Project {
    dir: TempDir,
}

impl Project {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), MANIFEST).unwrap();
        fs::write(dir.path().join("package-lock.json"), LOCKFILE).unwrap();
        fs::write(dir.path().join("scores.json"), METRICS).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> String {
        self.dir.path().join(name).display().to_string()
    }

    fn args(&self, extra: &[&str]) -> AnalyzeArgs {
        let manifest = self.path("package.json");
        let lockfile = self.path("package-lock.json");
        let mut argv = vec!["rem", "--manifest", manifest.as_str(), "--lockfile", lockfile.as_str()];
        argv.extend_from_slice(extra);
        Harness::try_parse_from(argv).unwrap().args
    }
}

fn offline_config() -> RemConfig {
    let mut config = RemConfig::default();
    config.metrics.source = MetricsSource::None;
    config
}

#[test]
fn test_metrics_file_drives_filtering() {
    let project = Project::new();
    let scores = project.path("scores.json");
    let args = project.args(&["--flag", "y", "--metrics-file", scores.as_str()]);

    let report = build_report(&args, &RemConfig::default()).unwrap();

    let names: Vec<String> = report.targets.iter().map(|t| t.name.clone()).collect();
    assert_eq!(names, vec!["request".to_string(), "y".to_string()]);

    assert_eq!(report.runtime.nodes, 6);
    assert_eq!(report.development.deprecated.len(), 1);

    let filtered = report.filtered.as_ref().unwrap();
    let x = filtered.find_by_name("x").next().unwrap();
    assert_eq!(filtered.out_degree(x), 0);
    assert_eq!(filtered[x].subtree_minimum, Some(0.95));
    assert!(filtered.find_by_name("x-c").next().is_none());
    assert!(filtered.find_by_name("request").next().is_some());
}

#[test]
fn test_offline_run_without_deprecation_flags() {
    let project = Project::new();
    let args = project.args(&["--no-deprecated", "--no-filter"]);

    let report = build_report(&args, &offline_config()).unwrap();

    assert!(report.targets.is_empty());
    assert!(report.filtered.is_none());
    assert!(!report.has_ripple_effect());
    assert_eq!(report.graph.node_count(), 8);
}

#[test]
fn test_json_report_written_to_file() {
    let project = Project::new();
    let output = project.path("report.json");
    let args = project.args(&["--flag", "x-c", "--offline", "--format", "json", "--output", output.as_str()]);

    run(&args, &RemConfig::default()).unwrap();

    let document: serde_json::Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(document["root"]["name"], "app");
    assert_eq!(document["metric"], "final");
    assert_eq!(document["graph"]["directed"], true);
    assert_eq!(document["runtime"]["ripple"]["edges"], 3);
    assert!(document["ripple"]["links"].as_array().unwrap().len() >= 3);
    assert!(document["filtered"].is_object());
}

#[test]
fn test_missing_inputs_are_reported() {
    let project = Project::new();
    let mut args = project.args(&["--offline"]);
    args.lockfile = project.dir.path().join("missing-lock.json");

    let error = build_report(&args, &RemConfig::default()).unwrap_err();
    assert!(format!("{:#}", error).contains("Failed to read lockfile"));
}

#[test]
fn test_invalid_lockfile_is_an_input_error() {
    let project = Project::new();
    fs::write(project.dir.path().join("package-lock.json"), "{ not json").unwrap();
    let args = project.args(&["--offline"]);

    let error = build_report(&args, &RemConfig::default()).unwrap_err();
    assert!(format!("{:#}", error).contains("Failed to build the dependency graph"));
}

#[test]
fn test_out_of_range_metrics_file_is_refused() {
    let project = Project::new();
    fs::write(project.dir.path().join("scores.json"), r#"{"x": {"final": 5.0, "quality": -2.0}}"#).unwrap();
    let scores = project.path("scores.json");
    let args = project.args(&["--metrics-file", scores.as_str()]);

    let error = build_report(&args, &RemConfig::default()).unwrap_err();
    let message = format!("{:#}", error);
    assert!(message.contains("Failed to load metrics table"));
    assert!(message.contains("final score of 'x' is 5"));
}
