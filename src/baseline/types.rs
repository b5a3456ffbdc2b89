//! Baseline data model
//!
//! A baseline is the persisted snapshot of a server's tools and observed
//! behavior. It serializes to camelCase JSON with millisecond ISO-8601
//! timestamps, and carries a content hash over every other field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::diff::{BehavioralDiff, ChangeSeverity};
use crate::evidence::{
    DeprecationStatus, DocumentationScoreSummary, ErrorPatterns, PerformanceBaseline,
    PerformanceConfidence, ResponseFingerprint, ResponseSchemaEvolution, SecurityFingerprint,
};
use crate::fingerprinting::hasher::iso_timestamp;
use crate::fingerprinting::SchemaFingerprinter;
use crate::protocol::Tool;
use crate::version::FormatVersion;

/// How the baseline was produced
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaselineMode {
    /// Contract check: schemas and deterministic probes only
    #[default]
    Check,
    /// Exploration with generated scenarios
    Explore,
}

impl BaselineMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BaselineMode::Check => "check",
            BaselineMode::Explore => "explore",
        }
    }
}

/// Information about the run that produced a baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineMetadata {
    #[serde(default)]
    pub mode: BaselineMode,

    #[serde(with = "iso_timestamp")]
    pub generated_at: DateTime<Utc>,

    #[serde(default)]
    pub server_command: String,

    /// Version of the tool that wrote the baseline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub personas: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl BaselineMetadata {
    pub fn new(mode: BaselineMode, server_command: impl Into<String>) -> Self {
        Self {
            mode,
            generated_at: Utc::now(),
            server_command: server_command.into(),
            tool_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            duration_ms: None,
            personas: Vec::new(),
            model: None,
        }
    }
}

/// Identity of the server a baseline was captured from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerFingerprint {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub protocol_version: String,
    /// Advertised capability names, sorted
    #[serde(default)]
    pub capabilities: Vec<String>,
}

/// Raw discovery snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitySnapshot {
    /// Tools exactly as returned by `tools/list`
    #[serde(default)]
    pub tools: Vec<Tool>,
}

/// A behavioral claim about a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehavioralAssertion {
    /// Tool the claim is about; absent for server-wide claims
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    /// Behavior area, e.g. "error_handling"
    pub aspect: String,
    pub assertion: String,
    /// Whether the claim describes expected (true) or problematic behavior
    #[serde(default = "default_positive")]
    pub is_positive: bool,
}

fn default_positive() -> bool {
    true
}

impl BehavioralAssertion {
    pub fn new(aspect: impl Into<String>, assertion: impl Into<String>, is_positive: bool) -> Self {
        Self {
            tool: None,
            aspect: aspect.into(),
            assertion: assertion.into(),
            is_positive,
        }
    }

    pub fn for_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = Some(tool.into());
        self
    }
}

/// Fingerprint of one tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolFingerprint {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Consensus hash of the observed argument shapes
    pub schema_hash: String,

    /// Fingerprint of the declared input schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema_hash: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,

    /// Share of observed calls matching the dominant argument shape
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_args_schema_consistency: Option<f64>,

    /// Number of distinct argument shapes observed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_args_schema_variations: Option<usize>,

    #[serde(default)]
    pub assertions: Vec<BehavioralAssertion>,

    #[serde(default)]
    pub security_notes: Vec<String>,

    #[serde(default)]
    pub limitations: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_fingerprint: Option<ResponseFingerprint>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inferred_output_schema: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_patterns: Option<ErrorPatterns>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,

    #[serde(
        default,
        with = "iso_timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub deprecated_at: Option<DateTime<Utc>>,

    #[serde(
        default,
        with = "iso_timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub removal_date: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaced_by: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformanceBaseline>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_confidence: Option<PerformanceConfidence>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_fingerprint: Option<SecurityFingerprint>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_schema_evolution: Option<ResponseSchemaEvolution>,
}

impl ToolFingerprint {
    /// A fingerprint with no evidence attached
    pub fn new(name: impl Into<String>, schema_hash: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            schema_hash: schema_hash.into(),
            input_schema_hash: None,
            input_schema: None,
            output_schema: None,
            observed_args_schema_consistency: None,
            observed_args_schema_variations: None,
            assertions: Vec::new(),
            security_notes: Vec::new(),
            limitations: Vec::new(),
            response_fingerprint: None,
            inferred_output_schema: None,
            error_patterns: None,
            deprecated: false,
            deprecated_at: None,
            removal_date: None,
            replaced_by: None,
            performance: None,
            performance_confidence: None,
            security_fingerprint: None,
            response_schema_evolution: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema_hash = Some(SchemaFingerprinter::schema_hash(&schema));
        self.input_schema = Some(schema);
        self
    }

    /// Fingerprint of the declared input schema, computed from the raw
    /// schema when the stored one is missing
    pub fn declared_schema_hash(&self) -> Option<String> {
        self.input_schema_hash
            .clone()
            .or_else(|| self.input_schema.as_ref().map(SchemaFingerprinter::schema_hash))
    }

    /// Deprecation lifecycle as a comparable value
    pub fn deprecation(&self) -> DeprecationStatus {
        DeprecationStatus {
            deprecated: self.deprecated,
            deprecated_at: self.deprecated_at,
            removal_date: self.removal_date,
            replaced_by: self.replaced_by.clone(),
        }
    }

    pub fn set_deprecation(&mut self, status: DeprecationStatus) {
        self.deprecated = status.deprecated;
        self.deprecated_at = status.deprecated_at;
        self.removal_date = status.removal_date;
        self.replaced_by = status.replaced_by;
    }
}

/// Summary of the diff an acceptance covers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedDiffSummary {
    pub tools_added: Vec<String>,
    pub tools_removed: Vec<String>,
    pub tools_modified: Vec<String>,
    pub severity: ChangeSeverity,
    pub breaking_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
}

impl AcceptedDiffSummary {
    pub fn from_diff(diff: &BehavioralDiff) -> Self {
        Self {
            tools_added: diff.tools_added.clone(),
            tools_removed: diff.tools_removed.clone(),
            tools_modified: diff
                .modified_tool_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
            severity: diff.severity,
            breaking_count: diff.breaking_count,
            warning_count: diff.warning_count,
            info_count: diff.info_count,
        }
    }
}

/// Audit record of an operator accepting drift
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptanceRecord {
    #[serde(with = "iso_timestamp")]
    pub accepted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub accepted_diff: AcceptedDiffSummary,
}

/// Persisted behavioral baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehavioralBaseline {
    pub version: FormatVersion,

    pub metadata: BaselineMetadata,

    #[serde(default)]
    pub server: ServerFingerprint,

    #[serde(default)]
    pub capabilities: CapabilitySnapshot,

    pub tool_profiles: Vec<ToolFingerprint>,

    #[serde(default)]
    pub assertions: Vec<BehavioralAssertion>,

    #[serde(default)]
    pub summary: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceptance: Option<AcceptanceRecord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_score: Option<DocumentationScoreSummary>,

    /// Content hash of every other field
    #[serde(default)]
    pub hash: String,
}

impl BehavioralBaseline {
    /// Look up a tool by name
    pub fn tool(&self, name: &str) -> Option<&ToolFingerprint> {
        self.tool_profiles.iter().find(|t| t.name == name)
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tool_profiles.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn tool_count(&self) -> usize {
        self.tool_profiles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_fingerprint_skips_absent_evidence() {
        let tool = ToolFingerprint::new("read_file", "0123456789abcdef")
            .with_description("Read a file");

        let json = serde_json::to_value(&tool).unwrap();

        assert_eq!(json["schemaHash"], "0123456789abcdef");
        assert!(json.get("performance").is_none());
        assert!(json.get("deprecated").is_none());
        assert_eq!(json["assertions"], json!([]));
    }

    #[test]
    fn test_tool_fingerprint_minimal_json() {
        let tool: ToolFingerprint = serde_json::from_value(json!({
            "name": "ping",
            "schemaHash": "0123456789abcdef",
            "deprecated": true,
            "removalDate": "2025-06-01T00:00:00Z"
        }))
        .unwrap();

        assert!(tool.description.is_empty());
        assert!(tool.deprecation().deprecated);
        assert!(tool.removal_date.is_some());
    }

    #[test]
    fn test_metadata_timestamp_format() {
        let mut metadata = BaselineMetadata::new(BaselineMode::Explore, "node server.js");
        metadata.generated_at = DateTime::parse_from_rfc3339("2024-05-01T12:00:00+02:00")
            .unwrap()
            .with_timezone(&Utc);

        let json = serde_json::to_value(&metadata).unwrap();

        assert_eq!(json["generatedAt"], "2024-05-01T10:00:00.000Z");
        assert_eq!(json["mode"], "explore");
    }

    #[test]
    fn test_assertion_defaults_positive() {
        let assertion: BehavioralAssertion = serde_json::from_value(json!({
            "aspect": "error_handling",
            "assertion": "Returns a clear error for missing files"
        }))
        .unwrap();

        assert!(assertion.is_positive);
        assert!(assertion.tool.is_none());
    }
}
