//! Baseline construction from interview results
//!
//! The interview engine explores a server and hands over what it saw. This
//! module turns that into fingerprints: schema hashes, observed argument
//! consistency and whatever evidence the collaborators supplied.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::evidence::{
    DeprecationStatus, DocumentationScoreSummary, ErrorPatterns, PerformanceBaseline,
    PerformanceConfidence, ResponseFingerprint, ResponseSchemaEvolution, SecurityFingerprint,
};
use crate::fingerprinting::SchemaFingerprinter;
use crate::protocol::mcp::InitializeResult;
use crate::protocol::Tool;
use crate::version::FormatVersion;

use super::store::recalculate_integrity_hash;
use super::types::{
    BaselineMetadata, BaselineMode, BehavioralAssertion, BehavioralBaseline, CapabilitySnapshot,
    ServerFingerprint, ToolFingerprint,
};

/// One call made during an interview
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInteraction {
    #[serde(default)]
    pub args: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
}

impl ToolInteraction {
    pub fn new(args: Value) -> Self {
        Self {
            args,
            ..Default::default()
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_response(mut self, response: Value) -> Self {
        self.response = Some(response);
        self
    }
}

/// Evidence produced by external analyzers for one tool
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolEvidence {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_fingerprint: Option<ResponseFingerprint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inferred_output_schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_patterns: Option<ErrorPatterns>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation: Option<DeprecationStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformanceBaseline>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_confidence: Option<PerformanceConfidence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_fingerprint: Option<SecurityFingerprint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_schema_evolution: Option<ResponseSchemaEvolution>,
}

/// Everything learned about one tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInterview {
    pub tool: Tool,
    #[serde(default)]
    pub interactions: Vec<ToolInteraction>,
    #[serde(default)]
    pub assertions: Vec<BehavioralAssertion>,
    #[serde(default)]
    pub security_notes: Vec<String>,
    #[serde(default)]
    pub limitations: Vec<String>,
    #[serde(default)]
    pub evidence: ToolEvidence,
}

impl ToolInterview {
    pub fn new(tool: Tool) -> Self {
        Self {
            tool,
            interactions: Vec::new(),
            assertions: Vec::new(),
            security_notes: Vec::new(),
            limitations: Vec::new(),
            evidence: ToolEvidence::default(),
        }
    }

    pub fn with_interaction(mut self, interaction: ToolInteraction) -> Self {
        self.interactions.push(interaction);
        self
    }

    pub fn with_evidence(mut self, evidence: ToolEvidence) -> Self {
        self.evidence = evidence;
        self
    }
}

/// Run information reported by the interview engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewMetadata {
    #[serde(default)]
    pub mode: BaselineMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub personas: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Output of an interview run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewResult {
    pub server: InitializeResult,
    #[serde(default)]
    pub metadata: InterviewMetadata,
    pub tools: Vec<ToolInterview>,
    #[serde(default)]
    pub assertions: Vec<BehavioralAssertion>,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_score: Option<DocumentationScoreSummary>,
}

/// Fingerprint one interviewed tool
pub fn fingerprint_tool(interview: &ToolInterview) -> ToolFingerprint {
    let tool = &interview.tool;
    let consensus =
        SchemaFingerprinter::observed_args_consensus(interview.interactions.iter().map(|i| &i.args));

    let observed = !consensus.is_empty();
    let evidence = &interview.evidence;

    let mut fingerprint = ToolFingerprint {
        name: tool.name.clone(),
        description: tool.description.clone().unwrap_or_default(),
        schema_hash: consensus.hash.clone(),
        input_schema_hash: tool.input_schema.as_ref().map(SchemaFingerprinter::schema_hash),
        input_schema: tool.input_schema.clone(),
        output_schema: tool.output_schema.clone(),
        observed_args_schema_consistency: observed.then_some(consensus.consistency),
        observed_args_schema_variations: observed.then_some(consensus.variations),
        assertions: interview.assertions.clone(),
        security_notes: interview.security_notes.clone(),
        limitations: interview.limitations.clone(),
        response_fingerprint: evidence.response_fingerprint.clone(),
        inferred_output_schema: evidence.inferred_output_schema.clone(),
        error_patterns: evidence.error_patterns.clone(),
        performance: evidence.performance.clone(),
        performance_confidence: evidence.performance_confidence.clone(),
        security_fingerprint: evidence.security_fingerprint.clone(),
        response_schema_evolution: evidence.response_schema_evolution.clone(),
        ..ToolFingerprint::new(tool.name.clone(), String::new())
    };
    if let Some(deprecation) = &evidence.deprecation {
        fingerprint.set_deprecation(deprecation.clone());
    }

    fingerprint
}

/// Build a baseline from an interview result
pub fn create_baseline(result: &InterviewResult, server_command: &str) -> BehavioralBaseline {
    let mut metadata = BaselineMetadata::new(result.metadata.mode, server_command);
    metadata.duration_ms = result.metadata.duration_ms;
    metadata.personas = result.metadata.personas.clone();
    metadata.model = result.metadata.model.clone();

    let server = ServerFingerprint {
        name: result.server.server_info.name.clone(),
        version: result.server.server_info.version.clone(),
        protocol_version: result.server.protocol_version.clone(),
        capabilities: result
            .server
            .capabilities
            .names()
            .into_iter()
            .map(str::to_string)
            .collect(),
    };

    let mut tool_profiles: Vec<ToolFingerprint> = Vec::with_capacity(result.tools.len());
    for interview in &result.tools {
        if tool_profiles.iter().any(|t| t.name == interview.tool.name) {
            warn!("Duplicate tool '{}' in interview result, keeping the first", interview.tool.name);
            continue;
        }
        tool_profiles.push(fingerprint_tool(interview));
    }

    let capabilities = CapabilitySnapshot {
        tools: result.tools.iter().map(|t| t.tool.clone()).collect(),
    };

    debug!(
        "Created baseline for {} with {} tools",
        server.name,
        tool_profiles.len()
    );

    let baseline = BehavioralBaseline {
        version: FormatVersion::current(),
        metadata,
        server,
        capabilities,
        tool_profiles,
        assertions: result.assertions.clone(),
        summary: result.summary.clone(),
        acceptance: None,
        documentation_score: result.documentation_score.clone(),
        hash: String::new(),
    };
    recalculate_integrity_hash(&baseline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::store::verify_integrity;
    use crate::fingerprinting::EMPTY_CONSENSUS_HASH;
    use crate::protocol::mcp::{Implementation, ServerCapabilities};
    use serde_json::json;

    fn server() -> InitializeResult {
        InitializeResult {
            protocol_version: "2025-03-26".to_string(),
            capabilities: ServerCapabilities::default(),
            server_info: Implementation::new("filesystem", "1.2.0"),
            instructions: None,
        }
    }

    fn read_file_tool() -> Tool {
        Tool::new("read_file")
            .with_description("Read a file from disk")
            .with_input_schema(json!({
                "type": "object",
                "properties": {"path": {"type": "string"}},
                "required": ["path"]
            }))
    }

    #[test]
    fn test_declared_schema_hash() {
        let interview = ToolInterview::new(read_file_tool());

        let fp = fingerprint_tool(&interview);

        assert_eq!(
            fp.input_schema_hash,
            Some(SchemaFingerprinter::schema_hash(interview.tool.input_schema.as_ref().unwrap()))
        );
        assert_eq!(fp.schema_hash, EMPTY_CONSENSUS_HASH);
        assert_eq!(fp.description, "Read a file from disk");
        assert!(fp.observed_args_schema_consistency.is_none());
        assert!(fp.error_patterns.is_none());
    }

    #[test]
    fn test_schema_hash_is_observed_args_consensus() {
        let interview = ToolInterview::new(read_file_tool())
            .with_interaction(ToolInteraction::new(json!({"path": "/a"})))
            .with_interaction(ToolInteraction::new(json!({"path": "/b"})))
            .with_interaction(ToolInteraction::new(json!({"path": 3})));

        let fp = fingerprint_tool(&interview);
        let consensus = SchemaFingerprinter::observed_args_consensus(
            interview.interactions.iter().map(|i| &i.args),
        );

        assert_eq!(fp.schema_hash, consensus.hash);
        assert_ne!(Some(fp.schema_hash.clone()), fp.input_schema_hash);
        assert_eq!(fp.observed_args_schema_variations, Some(2));
        let consistency = fp.observed_args_schema_consistency.unwrap();
        assert!((consistency - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_schema_no_observations() {
        let fp = fingerprint_tool(&ToolInterview::new(Tool::new("ping")));

        assert_eq!(fp.schema_hash, EMPTY_CONSENSUS_HASH);
        assert!(fp.input_schema_hash.is_none());
    }

    #[test]
    fn test_error_patterns_only_when_supplied() {
        let interview = ToolInterview::new(read_file_tool())
            .with_interaction(ToolInteraction::new(json!({"path": "/a"})).with_error("File not found: /a"))
            .with_interaction(ToolInteraction::new(json!({"path": "/b"})));

        let fp = fingerprint_tool(&interview);

        assert!(fp.error_patterns.is_none());
        assert_eq!(fp.observed_args_schema_variations, Some(1));
    }

    #[test]
    fn test_supplied_evidence_is_copied() {
        let evidence = ToolEvidence {
            deprecation: Some(DeprecationStatus {
                deprecated: true,
                replaced_by: Some("read_file_v2".to_string()),
                ..Default::default()
            }),
            error_patterns: Some(ErrorPatterns::default()),
            ..Default::default()
        };
        let interview = ToolInterview::new(read_file_tool())
            .with_interaction(ToolInteraction::new(json!({"path": "/a"})).with_error("boom"))
            .with_evidence(evidence);

        let fp = fingerprint_tool(&interview);

        assert!(fp.deprecated);
        assert_eq!(fp.replaced_by.as_deref(), Some("read_file_v2"));
        assert!(fp.error_patterns.unwrap().is_empty());
    }

    #[test]
    fn test_create_baseline() {
        let result = InterviewResult {
            server: server(),
            metadata: InterviewMetadata {
                mode: BaselineMode::Explore,
                duration_ms: Some(1200),
                personas: vec!["technical_writer".to_string()],
                model: None,
            },
            tools: vec![
                ToolInterview::new(read_file_tool()),
                ToolInterview::new(Tool::new("list_dir")),
                ToolInterview::new(read_file_tool()),
            ],
            assertions: Vec::new(),
            summary: "Filesystem server".to_string(),
            documentation_score: None,
        };

        let baseline = create_baseline(&result, "npx server-filesystem /tmp");

        assert_eq!(baseline.version, FormatVersion::current());
        assert_eq!(baseline.tool_names(), vec!["read_file", "list_dir"]);
        assert_eq!(baseline.server.name, "filesystem");
        assert_eq!(baseline.metadata.mode, BaselineMode::Explore);
        assert_eq!(baseline.metadata.server_command, "npx server-filesystem /tmp");
        assert_eq!(baseline.capabilities.tools.len(), 3);
        assert!(verify_integrity(&baseline));
    }
}
