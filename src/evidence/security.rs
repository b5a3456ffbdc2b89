//! Security fingerprint evidence
//!
//! Findings from an external security tester. Findings are matched across
//! runs by category, parameter and title; new high-risk findings are
//! breaking.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::diff::ChangeSeverity;
use crate::fingerprinting::hasher::iso_timestamp;

use super::{DiffContext, Evidence, EvidenceChange, EvidenceKind};

/// Risk level of a security finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Info => "info",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    /// Severity of a newly introduced finding at this risk level
    pub fn new_finding_severity(&self) -> ChangeSeverity {
        if *self >= RiskLevel::High {
            ChangeSeverity::Breaking
        } else {
            ChangeSeverity::Warning
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single security finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityFinding {
    /// Test category, e.g. "path_traversal"
    pub category: String,
    pub risk_level: RiskLevel,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwe_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl SecurityFinding {
    /// Identity of a finding across runs
    pub fn key(&self) -> String {
        format!(
            "{}|{}|{}",
            self.category,
            self.parameter.as_deref().unwrap_or(""),
            self.title
        )
    }

    fn label(&self) -> String {
        match &self.parameter {
            Some(param) => format!("{} ({}) on '{}'", self.title, self.risk_level, param),
            None => format!("{} ({})", self.title, self.risk_level),
        }
    }
}

/// Security testing results for one tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityFingerprint {
    #[serde(default)]
    pub tested: bool,
    #[serde(default)]
    pub categories_tested: Vec<String>,
    #[serde(default)]
    pub findings: Vec<SecurityFinding>,
    /// Aggregate risk score (0 - 100)
    #[serde(default)]
    pub risk_score: f64,
    #[serde(
        default,
        with = "iso_timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub tested_at: Option<DateTime<Utc>>,
}

impl SecurityFingerprint {
    fn keys(&self) -> BTreeSet<String> {
        self.findings.iter().map(SecurityFinding::key).collect()
    }

    /// Findings in `current` that are not in `self`
    pub fn new_findings<'a>(&self, current: &'a Self) -> Vec<&'a SecurityFinding> {
        let known = self.keys();
        current
            .findings
            .iter()
            .filter(|f| !known.contains(&f.key()))
            .collect()
    }

    /// Findings in `self` that are not in `current`
    pub fn resolved_findings<'a>(&'a self, current: &Self) -> Vec<&'a SecurityFinding> {
        let remaining = current.keys();
        self.findings
            .iter()
            .filter(|f| !remaining.contains(&f.key()))
            .collect()
    }
}

impl Evidence for SecurityFingerprint {
    const KIND: EvidenceKind = EvidenceKind::SecurityFingerprint;

    fn diff(&self, current: &Self, _ctx: &DiffContext) -> Vec<EvidenceChange> {
        let mut changes = Vec::new();

        for finding in self.new_findings(current) {
            changes.push(EvidenceChange::new(
                finding.risk_level.new_finding_severity(),
                format!("New security finding: {}", finding.label()),
                "",
                finding.key(),
            ));
        }

        for finding in self.resolved_findings(current) {
            changes.push(EvidenceChange::new(
                ChangeSeverity::Info,
                format!("Security finding resolved: {}", finding.label()),
                finding.key(),
                "",
            ));
        }

        changes
    }
}

/// A finding attributed to a tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSecurityFinding {
    pub tool: String,
    pub finding: SecurityFinding,
}

/// Security comparison across all tools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityReport {
    pub new_findings: Vec<ToolSecurityFinding>,
    pub resolved_findings: Vec<ToolSecurityFinding>,
    pub previous_risk_score: f64,
    pub current_risk_score: f64,
    pub risk_score_change: f64,
    /// True when new findings appeared or the risk score rose
    pub degraded: bool,
    pub summary: String,
}

impl SecurityReport {
    /// Build a report; `None` when no tool has security data on both sides
    pub fn analyze<'a>(
        pairs: impl IntoIterator<Item = (&'a str, &'a SecurityFingerprint, &'a SecurityFingerprint)>,
    ) -> Option<Self> {
        let mut new_findings = Vec::new();
        let mut resolved_findings = Vec::new();
        let mut previous_total = 0.0;
        let mut current_total = 0.0;
        let mut count = 0usize;

        for (tool, previous, current) in pairs {
            count += 1;
            previous_total += previous.risk_score;
            current_total += current.risk_score;

            new_findings.extend(previous.new_findings(current).into_iter().map(|f| {
                ToolSecurityFinding {
                    tool: tool.to_string(),
                    finding: f.clone(),
                }
            }));
            resolved_findings.extend(previous.resolved_findings(current).into_iter().map(|f| {
                ToolSecurityFinding {
                    tool: tool.to_string(),
                    finding: f.clone(),
                }
            }));
        }

        if count == 0 {
            return None;
        }

        let previous_risk_score = previous_total / count as f64;
        let current_risk_score = current_total / count as f64;
        let risk_score_change = current_risk_score - previous_risk_score;
        let degraded = !new_findings.is_empty() || risk_score_change > 0.0;

        let summary = if new_findings.is_empty() && resolved_findings.is_empty() {
            "No change in security findings".to_string()
        } else {
            format!(
                "{} new finding(s), {} resolved; risk score {:.1} -> {:.1}",
                new_findings.len(),
                resolved_findings.len(),
                previous_risk_score,
                current_risk_score
            )
        };

        Some(Self {
            new_findings,
            resolved_findings,
            previous_risk_score,
            current_risk_score,
            risk_score_change,
            degraded,
            summary,
        })
    }
}
