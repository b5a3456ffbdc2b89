//! Evidence Module - Typed per-aspect observations attached to tools
//!
//! External collaborators (response fingerprinting, error analysis, security
//! testing, performance sampling) hand their results to the baseline as
//! evidence. Each kind is a closed, typed structure with its own diff
//! function; the comparator only calls [`Evidence::diff`] and never inspects
//! evidence internals.
//!
//! # Kinds
//!
//! - [`ResponseFingerprint`] - structure of tool responses
//! - [`ErrorPatterns`] - categorized error messages
//! - [`SecurityFingerprint`] - security findings and risk score
//! - [`PerformanceBaseline`] - latency percentiles and confidence
//! - [`ResponseSchemaEvolution`] - inferred output schema history
//! - [`DeprecationStatus`] - deprecation lifecycle

mod deprecation;
mod documentation;
mod error_patterns;
mod performance;
mod response;
mod schema_evolution;
mod security;

use serde::{Deserialize, Serialize};

use crate::diff::{Aspect, ChangeSeverity};

pub use deprecation::DeprecationStatus;
pub use documentation::{DocumentationScoreChange, DocumentationScoreSummary};
pub use error_patterns::{
    CategoryTrend, ErrorCategory, ErrorPattern, ErrorPatterns, ErrorTrend, ErrorTrendReport,
};
pub use performance::{
    ConfidenceLevel, PerformanceBaseline, PerformanceConfidence, PerformanceRegression,
    PerformanceReport, PerformanceSample, DEFAULT_PERFORMANCE_THRESHOLD,
};
pub use response::{ResponseContentType, ResponseFingerprint, ResponseSize};
pub use schema_evolution::{
    ResponseSchemaEvolution, SchemaEvolutionReport, SchemaVersionEntry, ToolSchemaEvolution,
};
pub use security::{
    RiskLevel, SecurityFinding, SecurityFingerprint, SecurityReport, ToolSecurityFinding,
};

/// The closed set of evidence kinds a tool fingerprint may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    ResponseFingerprint,
    ErrorPatterns,
    SecurityFingerprint,
    Performance,
    SchemaEvolution,
    Deprecation,
}

impl EvidenceKind {
    /// Aspect under which changes of this kind are reported
    pub fn aspect(&self) -> Aspect {
        match self {
            EvidenceKind::ResponseFingerprint => Aspect::ResponseStructure,
            EvidenceKind::ErrorPatterns => Aspect::ErrorPattern,
            EvidenceKind::SecurityFingerprint => Aspect::Security,
            EvidenceKind::Performance => Aspect::Performance,
            EvidenceKind::SchemaEvolution => Aspect::ResponseSchemaEvolution,
            EvidenceKind::Deprecation => Aspect::Deprecation,
        }
    }
}

/// Settings that evidence diffs may depend on
#[derive(Debug, Clone, Copy)]
pub struct DiffContext {
    /// Fractional p50 regression that counts as a performance regression
    pub performance_threshold: f64,
}

impl Default for DiffContext {
    fn default() -> Self {
        Self {
            performance_threshold: DEFAULT_PERFORMANCE_THRESHOLD,
        }
    }
}

/// One change reported by an evidence diff
#[derive(Debug, Clone, PartialEq)]
pub struct EvidenceChange {
    pub severity: ChangeSeverity,
    pub description: String,
    pub before: String,
    pub after: String,
}

impl EvidenceChange {
    pub fn new(
        severity: ChangeSeverity,
        description: impl Into<String>,
        before: impl Into<String>,
        after: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            description: description.into(),
            before: before.into(),
            after: after.into(),
        }
    }
}

/// A typed piece of evidence with a structural diff
pub trait Evidence {
    /// Which kind of evidence this is
    const KIND: EvidenceKind;

    /// Changes from `self` (previous) to `current`; empty when equivalent
    fn diff(&self, current: &Self, ctx: &DiffContext) -> Vec<EvidenceChange>;
}

/// Diff two optional evidence values
///
/// Absence on either side means "no data for this aspect" and yields no
/// changes.
pub fn diff_optional<E: Evidence>(
    previous: Option<&E>,
    current: Option<&E>,
    ctx: &DiffContext,
) -> Vec<EvidenceChange> {
    match (previous, current) {
        (Some(previous), Some(current)) => previous.diff(current, ctx),
        _ => Vec::new(),
    }
}

/// Join a list of names for change descriptions
pub(crate) fn join_names<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(", ")
}
