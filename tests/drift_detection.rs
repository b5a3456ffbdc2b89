//! Drift Detection Integration Tests
//!
//! End-to-end comparisons of baselines written to disk, with the severity
//! policy and TOML configuration applied the way the CLI applies them.

use mcpdrift::baseline::{
    create_baseline, BaselineStore, BehavioralBaseline, InterviewResult, LoadOptions, ToolEvidence,
    ToolInterview,
};
use mcpdrift::config::DriftConfig;
use mcpdrift::diff::{
    apply_severity_config, filter_by_minimum_severity, should_fail_on_diff, Aspect,
    ChangeSeverity, CompareOptions, Comparator, SeverityConfig,
};
use mcpdrift::evidence::{DeprecationStatus, PerformanceBaseline};
use mcpdrift::protocol::{Implementation, Tool};
use serde_json::{json, Value};
use tempfile::tempdir;

fn path_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "path": {"type": "string", "description": "File to operate on"},
            "encoding": {"type": "string", "enum": ["utf-8", "base64"]}
        },
        "required": ["path"]
    })
}

fn tool(name: &str) -> Tool {
    Tool::new(name)
        .with_description(format!("{} on the sandboxed filesystem", name))
        .with_input_schema(path_schema())
}

fn baseline_of(interviews: Vec<ToolInterview>) -> BehavioralBaseline {
    let result: InterviewResult = serde_json::from_value(json!({
        "server": {
            "protocolVersion": "2024-11-05",
            "capabilities": {"tools": {}},
            "serverInfo": Implementation::new("filesystem", "1.0.0")
        },
        "tools": []
    }))
    .unwrap();
    let result = InterviewResult {
        tools: interviews,
        ..result
    };
    create_baseline(&result, "npx server-filesystem /tmp")
}

fn baseline_with_tools(names: &[&str]) -> BehavioralBaseline {
    baseline_of(
        names
            .iter()
            .map(|name| ToolInterview::new(tool(name)))
            .collect(),
    )
}

/// Save both baselines and load them back through the store
fn round_trip(
    previous: &BehavioralBaseline,
    current: &BehavioralBaseline,
) -> (BehavioralBaseline, BehavioralBaseline) {
    let dir = tempdir().unwrap();
    let store = BaselineStore::default();
    let (a, b) = (dir.path().join("a.json"), dir.path().join("b.json"));
    store.save(previous, &a).unwrap();
    store.save(current, &b).unwrap();
    (
        store.load(&a, &LoadOptions::default()).unwrap(),
        store.load(&b, &LoadOptions::default()).unwrap(),
    )
}

#[test]
fn test_identical_baselines_report_no_drift() {
    let baseline = baseline_with_tools(&["read_file", "write_file"]);
    let (previous, current) = round_trip(&baseline, &baseline);

    let diff = Comparator::compare(&previous, &current, &CompareOptions::default());

    assert!(!diff.has_changes());
    assert_eq!(diff.severity, ChangeSeverity::None);
    assert_eq!(diff.summary, "No behavioral drift detected");
    assert!(!should_fail_on_diff(&diff, ChangeSeverity::Breaking));
}

#[test]
fn test_added_tool_is_informational() {
    let (previous, current) = round_trip(
        &baseline_with_tools(&["read_file"]),
        &baseline_with_tools(&["read_file", "write_file"]),
    );

    let diff = Comparator::compare(&previous, &current, &CompareOptions::default());

    assert_eq!(diff.tools_added, vec!["write_file".to_string()]);
    assert_eq!(diff.severity, ChangeSeverity::Info);
    assert_eq!(diff.breaking_count, 0);
    assert!(!should_fail_on_diff(&diff, ChangeSeverity::Breaking));
    assert!(should_fail_on_diff(&diff, ChangeSeverity::Info));
}

#[test]
fn test_removed_tool_is_breaking() {
    let (previous, current) = round_trip(
        &baseline_with_tools(&["read_file", "write_file"]),
        &baseline_with_tools(&["read_file"]),
    );

    let diff = Comparator::compare(&previous, &current, &CompareOptions::default());

    assert_eq!(diff.tools_removed, vec!["write_file".to_string()]);
    assert_eq!(diff.severity, ChangeSeverity::Breaking);
    assert_eq!(diff.breaking_count, 1);
    assert!(should_fail_on_diff(&diff, ChangeSeverity::Breaking));
}

#[test]
fn test_new_required_parameter_is_breaking() {
    let mut stricter = path_schema();
    stricter["required"] = json!(["path", "encoding"]);

    let previous = baseline_with_tools(&["read_file"]);
    let current = baseline_of(vec![ToolInterview::new(
        tool("read_file").with_input_schema(stricter),
    )]);
    let (previous, current) = round_trip(&previous, &current);

    let diff = Comparator::compare(&previous, &current, &CompareOptions::default());

    assert_eq!(diff.behavior_changes.len(), 1);
    assert_eq!(diff.behavior_changes[0].aspect, Aspect::Schema);
    assert_eq!(diff.behavior_changes[0].severity, ChangeSeverity::Breaking);
    assert!(diff.behavior_changes[0].description.contains("encoding"));
}

#[test]
fn test_deprecation_and_performance_evidence_are_compared() {
    let performance = |p50_ms: f64| PerformanceBaseline {
        p50_ms,
        p95_ms: p50_ms * 2.0,
        p99_ms: p50_ms * 3.0,
        success_rate: 1.0,
        sample_count: 25,
    };

    let previous = baseline_of(vec![ToolInterview::new(tool("read_file")).with_evidence(
        ToolEvidence {
            performance: Some(performance(40.0)),
            ..Default::default()
        },
    )]);
    let current = baseline_of(vec![ToolInterview::new(tool("read_file")).with_evidence(
        ToolEvidence {
            performance: Some(performance(80.0)),
            deprecation: Some(DeprecationStatus {
                deprecated: true,
                replaced_by: Some("read_text_file".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        },
    )]);
    let (previous, current) = round_trip(&previous, &current);

    let diff = Comparator::compare(&previous, &current, &CompareOptions::default());

    let tool_diff = &diff.tools_modified[0];
    assert!(tool_diff.performance_changed);
    assert!(tool_diff.deprecation_changed);
    assert_eq!(diff.severity, ChangeSeverity::Warning);
    assert_eq!(diff.warning_count, 2);
    assert!(diff.performance_report.as_ref().unwrap().has_regressions);

    let ignoring = CompareOptions::default().ignoring(Aspect::Performance);
    let diff = Comparator::compare(&previous, &current, &ignoring);
    assert_eq!(diff.warning_count, 1);
    assert!(diff.performance_report.is_none());
}

#[test]
fn test_severity_policy_from_config_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("mcpdrift.toml");
    std::fs::write(
        &config_path,
        r#"
[severity]
minimum_severity = "warning"
fail_on_severity = "warning"

[severity.overrides]
schema = "warning"
"#,
    )
    .unwrap();
    let config = DriftConfig::load_or_default(Some(&config_path)).unwrap();

    let previous = baseline_with_tools(&["read_file", "write_file"]);
    let mut current = baseline_with_tools(&["read_file", "stat"]);
    current.tool_profiles[0].description = "Reads a file".to_string();

    let diff = Comparator::compare(&previous, &current, &config.compare);
    assert_eq!(diff.severity, ChangeSeverity::Breaking);
    assert_eq!(diff.change_count(), 3);

    let adjusted = apply_severity_config(&diff, &config.severity);

    // Both tool presence changes become warnings; the description change is dropped
    assert_eq!(adjusted.change_count(), 2);
    assert_eq!(adjusted.severity, ChangeSeverity::Warning);
    assert_eq!(adjusted.breaking_count, 0);
    assert!(should_fail_on_diff(&adjusted, config.severity.fail_on_severity));
    assert_eq!(apply_severity_config(&adjusted, &config.severity), adjusted);

    let visible = filter_by_minimum_severity(&diff, ChangeSeverity::Breaking);
    assert_eq!(visible.len(), 1);
}

#[test]
fn test_suppressing_warnings_keeps_breaking_changes() {
    let previous = baseline_with_tools(&["read_file", "write_file"]);
    let current = baseline_of(vec![ToolInterview::new(tool("read_file")).with_evidence(
        ToolEvidence {
            deprecation: Some(DeprecationStatus {
                deprecated: true,
                ..Default::default()
            }),
            ..Default::default()
        },
    )]);

    let diff = Comparator::compare(&previous, &current, &CompareOptions::default());
    let config = SeverityConfig::default().with_suppress_warnings(true);
    let adjusted = apply_severity_config(&diff, &config);

    assert_eq!(adjusted.warning_count, 0);
    assert_eq!(adjusted.breaking_count, 1);
    assert!(adjusted.tools_modified.is_empty());
}
