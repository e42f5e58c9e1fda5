//! Integration tests for rem-core
//!
//! These tests drive the whole pipeline from package.json and
//! package-lock.json text to the filtered, annotated graph.

use rem_core::{
    prepare, AnalysisOptions, BuildLimits, Diagnostic, GraphDocument, HealthMetrics,
    HealthTable, LockfileGraphBuilder, MetricKind, PackageHealth, PreparedGraph, ReportDocument,
    RippleEffectAnalyzer, TargetSelector,
};

fn scored(score: f64) -> PackageHealth {
    PackageHealth {
        metrics: HealthMetrics {
            final_score: Some(score),
            popularity: Some(score),
            quality: Some(score),
            maintenance: Some(score),
        },
        deprecated: None,
    }
}

fn table(entries: &[(&str, f64)]) -> HealthTable {
    entries
        .iter()
        .map(|(name, score)| (name.to_string(), scored(*score)))
        .collect()
}

fn prepared(manifest: &str, lockfile: &str, health: &HealthTable) -> PreparedGraph {
    let mut prepared = prepare(manifest, lockfile, BuildLimits::default()).unwrap();
    prepared.attach_health(health).unwrap();
    prepared
}

#[test]
fn test_scenario_chain_to_unscored_target() {
    let manifest = r#"{"name": "app", "version": "1.0.0", "dependencies": {"a": "1.0.0"}}"#;
    let lockfile = r#"{
      "name": "app", "version": "1.0.0", "lockfileVersion": 1,
      "dependencies": {
        "a": { "version": "1.0.0", "requires": { "b": "^1.0.0" } },
        "b": { "version": "1.0.0", "requires": { "c": "^1.0.0" } },
        "c": { "version": "1.0.0" }
      }
    }"#;
    let prepared = prepared(manifest, lockfile, &table(&[("a", 0.5), ("b", 0.99)]));

    for threshold in [0.0, 0.5, 0.9, 1.0, 5.0] {
        let options = AnalysisOptions {
            threshold,
            ..Default::default()
        };
        let report = prepared.analyze(&[TargetSelector::name("c")], &options).unwrap();

        assert_eq!(report.runtime.ripple.edges, 3);
        assert_eq!(report.runtime.ripple.nodes, 4);

        let filtered = report.filtered.unwrap();
        let root = filtered.root();
        let a = filtered.find_by_name("a").next().unwrap();
        let b = filtered.find_by_name("b").next().unwrap();
        let c = filtered.find_by_name("c").next().unwrap();
        for (from, to) in [(root, a), (a, b), (b, c)] {
            assert!(filtered.edge(from, to).unwrap().ripple, "threshold {}", threshold);
        }
        assert!(filtered[c].ripple);
    }
}

#[test]
fn test_scenario_healthy_subtree_next_to_flagged_package() {
    let manifest = r#"{"name": "app", "version": "1.0.0",
                       "dependencies": {"x": "^1.0.0", "y": "^1.0.0"}}"#;
    let lockfile = r#"{
      "name": "app", "version": "1.0.0", "lockfileVersion": 1,
      "dependencies": {
        "x": { "version": "1.0.0", "requires": { "x-a": "^1.0.0", "x-b": "^1.0.0" } },
        "x-a": { "version": "1.0.0", "requires": { "x-c": "^1.0.0" } },
        "x-b": { "version": "1.0.0" },
        "x-c": { "version": "1.0.0" },
        "y": { "version": "1.0.0" }
      }
    }"#;
    let health = table(&[("x", 0.95), ("x-a", 0.95), ("x-b", 0.95), ("x-c", 0.95), ("y", 0.1)]);
    let prepared = prepared(manifest, lockfile, &health);

    let report = prepared
        .analyze(&[TargetSelector::name("y")], &AnalysisOptions::default())
        .unwrap();
    let filtered = report.filtered.as_ref().unwrap();

    assert_eq!(filtered.node_count(), 3);
    assert_eq!(filtered.edge_count(), 2);
    let x = filtered.find_by_name("x").next().unwrap();
    let y = filtered.find_by_name("y").next().unwrap();
    assert!(filtered.contains_edge(filtered.root(), x));
    assert!(filtered.edge(filtered.root(), y).unwrap().ripple);
    assert_eq!(filtered[x].subtree_minimum, Some(0.95));

    assert_eq!(report.graph.node_count(), 6);
    assert_eq!(report.graph.edge_count(), 5);
}

#[test]
fn test_nested_copies_are_distinct_nodes() {
    let lockfile = r#"{
      "name": "app", "version": "1.0.0", "lockfileVersion": 1,
      "dependencies": {
        "a": {
          "version": "1.0.0",
          "requires": { "debug": "^2.6.9" },
          "dependencies": { "debug": { "version": "2.6.9" } }
        },
        "b": { "version": "1.0.0", "requires": { "debug": "^4.0.0" } },
        "debug": { "version": "4.3.4" }
      }
    }"#;
    let output = LockfileGraphBuilder::new().build_from_json(lockfile).unwrap();
    let graph = &output.graph;

    let copies: Vec<_> = graph.find_by_name("debug").collect();
    assert_eq!(copies.len(), 2);

    let a = graph.find_by_name("a").next().unwrap();
    let b = graph.find_by_name("b").next().unwrap();
    let a_debug = graph.successors(a).next().unwrap();
    let b_debug = graph.successors(b).next().unwrap();
    assert_eq!(graph[a_debug].version(), "2.6.9");
    assert_eq!(graph[a_debug].identity.breadcrumb.to_string(), "app(1.0.0)->a");
    assert_eq!(graph[b_debug].version(), "4.3.4");
    assert!(output.diagnostics.is_empty());
}

#[test]
fn test_version_selector_picks_one_copy() {
    let manifest = r#"{"name": "app", "version": "1.0.0",
                       "dependencies": {"a": "^1.0.0", "debug": "^4.0.0"}}"#;
    let lockfile = r#"{
      "name": "app", "version": "1.0.0",
      "dependencies": {
        "a": {
          "version": "1.0.0",
          "requires": { "debug": "^2.6.9" },
          "dependencies": { "debug": { "version": "2.6.9" } }
        },
        "debug": { "version": "4.3.4" }
      }
    }"#;
    let prepared = prepared(manifest, lockfile, &HealthTable::new());
    let graph = prepared.graph();

    let analyzer = RippleEffectAnalyzer::default();
    let all = analyzer.analyze(graph, &[TargetSelector::name("debug")]);
    let old = analyzer.analyze(graph, &["debug@2.6.9".parse().unwrap()]);

    assert_eq!(all.targets().count(), 2);
    assert_eq!(old.targets().count(), 1);
    assert_eq!(old.edges.len(), 2);
}

#[test]
fn test_diagnostics_are_collected() {
    let manifest = r#"{"name": "app", "version": "2.0.0",
                       "dependencies": {"a": "^1.0.0", "missing": "^1.0.0"}}"#;
    let lockfile = r#"{
      "name": "app", "version": "1.0.0",
      "dependencies": {
        "a": { "version": "1.0.0", "requires": { "ghost": "^1.0.0" } }
      }
    }"#;
    let prepared = prepared(manifest, lockfile, &HealthTable::new());
    let diagnostics = prepared.diagnostics();

    assert_eq!(diagnostics.len(), 3);
    assert!(matches!(diagnostics[0], Diagnostic::ResolutionGap { .. }));
    assert!(matches!(diagnostics[1], Diagnostic::RootMismatch { .. }));
    assert!(matches!(diagnostics[2], Diagnostic::MissingTopLevel { .. }));
}

#[test]
fn test_unsupported_lockfile_layout() {
    let manifest = r#"{"name": "app", "version": "1.0.0", "dependencies": {"a": "^1.0.0"}}"#;
    let lockfile = r#"{
      "name": "app", "version": "1.0.0", "lockfileVersion": 3,
      "packages": { "": { "name": "app" }, "node_modules/a": { "version": "1.0.0" } }
    }"#;
    let err = prepare(manifest, lockfile, BuildLimits::default()).unwrap_err();
    assert!(err.is_input_error());
    assert!(err.to_string().contains("lockfileVersion 3"));
}

#[test]
fn test_annotation_on_filtered_graph() {
    let manifest = r#"{"name": "app", "version": "1.0.0", "dependencies": {"a": "^1.0.0"}}"#;
    let lockfile = r#"{
      "name": "app", "version": "1.0.0",
      "dependencies": {
        "a": { "version": "1.0.0", "requires": { "good": "^1.0.0", "bad": "^1.0.0" } },
        "bad": { "version": "1.0.0", "requires": { "good": "^1.0.0" } },
        "good": { "version": "1.0.0" }
      }
    }"#;
    let prepared = prepared(manifest, lockfile, &table(&[("a", 0.5), ("bad", 0.2), ("good", 0.7)]));

    let options = AnalysisOptions {
        metric: MetricKind::Quality,
        threshold: 2.0,
        ..Default::default()
    };
    let report = prepared.analyze(&[], &options).unwrap();
    let filtered = report.filtered.as_ref().unwrap();

    let good = filtered.find_by_name("good").next().unwrap();
    let bad = filtered.find_by_name("bad").next().unwrap();
    assert!(filtered[good].non_problematic);
    assert!(!filtered[bad].non_problematic);
}

#[test]
fn test_report_document_serializes() {
    let manifest = r#"{"name": "app", "version": "1.0.0",
                       "dependencies": {"a": "^1.0.0"}, "devDependencies": {"t": "^1.0.0"}}"#;
    let lockfile = r#"{
      "name": "app", "version": "1.0.0",
      "dependencies": {
        "a": { "version": "1.0.0" },
        "t": { "version": "1.0.0", "dev": true }
      }
    }"#;
    let mut health = table(&[("a", 0.8)]);
    health.insert(
        "t".into(),
        PackageHealth {
            deprecated: Some("moved to @scope/t".into()),
            ..scored(0.3)
        },
    );
    let report = prepared(manifest, lockfile, &health)
        .analyze(&[], &AnalysisOptions::default())
        .unwrap();

    let value = serde_json::to_value(ReportDocument::from(&report)).unwrap();
    assert_eq!(value["root"]["name"], "app");
    assert_eq!(value["metric"], "final");
    assert_eq!(value["development"]["deprecated"][0]["message"], "moved to @scope/t");
    assert_eq!(value["development"]["ripple"]["edges"], 1);
    assert_eq!(value["targets"][0]["name"], "t");
    assert!(value["filtered"].is_object());

    let ripple = GraphDocument::from(&report.ripple_graph);
    assert_eq!(ripple.links.len(), 1);
    assert!(ripple.links[0].edge.ripple);
}

#[test]
fn test_out_of_range_scores_are_not_attached() {
    let manifest = r#"{"name": "app", "version": "1.0.0", "dependencies": {"a": "1.0.0"}}"#;
    let lockfile = r#"{
      "name": "app", "version": "1.0.0", "lockfileVersion": 1,
      "dependencies": { "a": { "version": "1.0.0" } }
    }"#;
    let mut prepared = prepare(manifest, lockfile, BuildLimits::default()).unwrap();

    let err = prepared.attach_health(&table(&[("a", 5.0)])).unwrap_err();
    assert!(err.is_input_error());

    let a = prepared.graph().find_by_name("a").next().unwrap();
    assert!(prepared.graph()[a].metrics.is_none());
}
