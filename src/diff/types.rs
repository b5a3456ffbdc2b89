//! Diff data model
//!
//! The result of comparing two baselines: added/removed tools, per-tool
//! diffs, a flattened change list and optional aggregate sub-reports.

use serde::{Deserialize, Serialize};

use crate::evidence::{
    DocumentationScoreChange, ErrorTrendReport, PerformanceReport, SchemaEvolutionReport,
    SecurityReport,
};
use crate::fingerprinting::SchemaChange;
use crate::version::VersionCompatibility;

use super::ChangeSeverity;

/// The facet of a tool a change concerns
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Aspect {
    Schema,
    Description,
    ResponseStructure,
    ErrorPattern,
    Security,
    Performance,
    ResponseSchemaEvolution,
    Deprecation,
}

impl Aspect {
    /// All aspects in declaration order
    pub const ALL: [Aspect; 8] = [
        Aspect::Schema,
        Aspect::Description,
        Aspect::ResponseStructure,
        Aspect::ErrorPattern,
        Aspect::Security,
        Aspect::Performance,
        Aspect::ResponseSchemaEvolution,
        Aspect::Deprecation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Aspect::Schema => "schema",
            Aspect::Description => "description",
            Aspect::ResponseStructure => "response_structure",
            Aspect::ErrorPattern => "error_pattern",
            Aspect::Security => "security",
            Aspect::Performance => "performance",
            Aspect::ResponseSchemaEvolution => "response_schema_evolution",
            Aspect::Deprecation => "deprecation",
        }
    }

    /// Parse an aspect name, accepting `-` in place of `_`
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|a| a.as_str() == normalized)
    }
}

impl std::fmt::Display for Aspect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single detected change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorChange {
    pub tool: String,
    pub aspect: Aspect,
    pub before: String,
    pub after: String,
    pub severity: ChangeSeverity,
    pub description: String,
}

impl BehaviorChange {
    pub fn new(
        tool: impl Into<String>,
        aspect: Aspect,
        before: impl Into<String>,
        after: impl Into<String>,
        severity: ChangeSeverity,
        description: impl Into<String>,
    ) -> Self {
        Self {
            tool: tool.into(),
            aspect,
            before: before.into(),
            after: after.into(),
            severity,
            description: description.into(),
        }
    }
}

/// All changes for one tool present in both baselines
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDiff {
    pub tool: String,
    pub changes: Vec<BehaviorChange>,

    /// Structural input schema changes, when raw schemas were available
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schema_changes: Vec<SchemaChange>,

    pub schema_changed: bool,
    pub description_changed: bool,
    pub response_structure_changed: bool,
    pub error_patterns_changed: bool,
    pub security_changed: bool,
    pub performance_changed: bool,
    pub response_schema_evolution_changed: bool,
    pub deprecation_changed: bool,
}

impl ToolDiff {
    pub fn from_changes(tool: impl Into<String>, changes: Vec<BehaviorChange>) -> Self {
        let mut diff = Self {
            tool: tool.into(),
            ..Default::default()
        };
        diff.set_changes(changes);
        diff
    }

    /// Attach the structural schema changes behind a schema change
    pub fn with_schema_changes(mut self, schema_changes: Vec<SchemaChange>) -> Self {
        if self.schema_changed {
            self.schema_changes = schema_changes;
        }
        self
    }

    /// Replace the change list and refresh the per-aspect flags
    pub fn set_changes(&mut self, changes: Vec<BehaviorChange>) {
        let has = |aspect: Aspect| changes.iter().any(|c| c.aspect == aspect);

        self.schema_changed = has(Aspect::Schema);
        self.description_changed = has(Aspect::Description);
        self.response_structure_changed = has(Aspect::ResponseStructure);
        self.error_patterns_changed = has(Aspect::ErrorPattern);
        self.security_changed = has(Aspect::Security);
        self.performance_changed = has(Aspect::Performance);
        self.response_schema_evolution_changed = has(Aspect::ResponseSchemaEvolution);
        self.deprecation_changed = has(Aspect::Deprecation);

        if !self.schema_changed {
            self.schema_changes.clear();
        }
        self.changes = changes;
    }

    /// Highest severity among this tool's changes
    pub fn severity(&self) -> ChangeSeverity {
        self.changes
            .iter()
            .map(|c| c.severity)
            .max()
            .unwrap_or_default()
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// Result of comparing two baselines
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehavioralDiff {
    pub tools_added: Vec<String>,
    pub tools_removed: Vec<String>,
    pub tools_modified: Vec<ToolDiff>,
    pub behavior_changes: Vec<BehaviorChange>,
    pub severity: ChangeSeverity,
    pub breaking_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
    pub summary: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_compatibility: Option<VersionCompatibility>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_report: Option<PerformanceReport>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_report: Option<SecurityReport>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_evolution_report: Option<SchemaEvolutionReport>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_trend_report: Option<ErrorTrendReport>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_score_change: Option<DocumentationScoreChange>,
}

impl BehavioralDiff {
    /// Rebuild counts, aggregate severity and summary from `behavior_changes`
    pub fn recompute_totals(&mut self) {
        let count = |severity: ChangeSeverity| {
            self.behavior_changes
                .iter()
                .filter(|c| c.severity == severity)
                .count()
        };
        self.breaking_count = count(ChangeSeverity::Breaking);
        self.warning_count = count(ChangeSeverity::Warning);
        self.info_count = count(ChangeSeverity::Info);

        self.severity = self
            .behavior_changes
            .iter()
            .map(|c| c.severity)
            .max()
            .unwrap_or_default();

        self.summary = self.build_summary();
    }

    fn build_summary(&self) -> String {
        if self.behavior_changes.is_empty() {
            return "No behavioral drift detected".to_string();
        }

        let mut tools: Vec<&str> = self
            .behavior_changes
            .iter()
            .map(|c| c.tool.as_str())
            .collect();
        tools.sort_unstable();
        tools.dedup();

        let mut summary = format!(
            "{} change(s) across {} tool(s): {} breaking, {} warning, {} info",
            self.behavior_changes.len(),
            tools.len(),
            self.breaking_count,
            self.warning_count,
            self.info_count
        );
        if !self.tools_added.is_empty() {
            summary.push_str(&format!("; added: {}", self.tools_added.join(", ")));
        }
        if !self.tools_removed.is_empty() {
            summary.push_str(&format!("; removed: {}", self.tools_removed.join(", ")));
        }
        summary
    }

    pub fn has_changes(&self) -> bool {
        !self.behavior_changes.is_empty()
    }

    pub fn is_breaking(&self) -> bool {
        self.severity == ChangeSeverity::Breaking
    }

    pub fn change_count(&self) -> usize {
        self.behavior_changes.len()
    }

    /// Changes recorded for one tool
    pub fn changes_for_tool<'a>(&'a self, tool: &'a str) -> impl Iterator<Item = &'a BehaviorChange> {
        self.behavior_changes.iter().filter(move |c| c.tool == tool)
    }

    /// Names of modified tools
    pub fn modified_tool_names(&self) -> Vec<&str> {
        self.tools_modified.iter().map(|t| t.tool.as_str()).collect()
    }
}
