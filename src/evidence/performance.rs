//! Performance evidence and regression reporting

use serde::{Deserialize, Serialize};

use crate::diff::ChangeSeverity;

use super::{DiffContext, Evidence, EvidenceChange, EvidenceKind};

/// Default fractional p50 increase treated as a regression
pub const DEFAULT_PERFORMANCE_THRESHOLD: f64 = 0.10;

/// Success-rate drop (absolute, 0.0 - 1.0) treated as a regression
const SUCCESS_RATE_DROP: f64 = 0.10;

/// Latency percentiles observed for one tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceBaseline {
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,

    /// Share of calls that succeeded (0.0 - 1.0)
    #[serde(default = "default_success_rate")]
    pub success_rate: f64,

    #[serde(default)]
    pub sample_count: usize,
}

fn default_success_rate() -> f64 {
    1.0
}

/// Confidence in a performance baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::High => "high",
        }
    }
}

/// Statistical confidence metrics for a performance baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceConfidence {
    pub sample_count: usize,
    pub coefficient_of_variation: f64,
    pub level: ConfidenceLevel,
}

impl PerformanceConfidence {
    /// Derive a confidence level from sample count and variation
    pub fn from_samples(sample_count: usize, coefficient_of_variation: f64) -> Self {
        let level = if sample_count >= 10 && coefficient_of_variation <= 0.3 {
            ConfidenceLevel::High
        } else if sample_count >= 5 && coefficient_of_variation <= 0.6 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        };
        Self {
            sample_count,
            coefficient_of_variation,
            level,
        }
    }
}

/// Fractional change of `current` relative to `previous`
fn relative_change(previous: f64, current: f64) -> Option<f64> {
    if previous > 0.0 && previous.is_finite() && current.is_finite() {
        Some((current - previous) / previous)
    } else {
        None
    }
}

impl Evidence for PerformanceBaseline {
    const KIND: EvidenceKind = EvidenceKind::Performance;

    fn diff(&self, current: &Self, ctx: &DiffContext) -> Vec<EvidenceChange> {
        let mut changes = Vec::new();

        if let Some(change) = relative_change(self.p50_ms, current.p50_ms) {
            if change > ctx.performance_threshold {
                changes.push(EvidenceChange::new(
                    ChangeSeverity::Warning,
                    format!(
                        "p50 latency regressed {:.1}% ({:.0}ms -> {:.0}ms)",
                        change * 100.0,
                        self.p50_ms,
                        current.p50_ms
                    ),
                    format!("{:.0}ms", self.p50_ms),
                    format!("{:.0}ms", current.p50_ms),
                ));
            }
        }

        if self.success_rate - current.success_rate > SUCCESS_RATE_DROP {
            changes.push(EvidenceChange::new(
                ChangeSeverity::Warning,
                format!(
                    "Success rate dropped from {:.0}% to {:.0}%",
                    self.success_rate * 100.0,
                    current.success_rate * 100.0
                ),
                format!("{:.2}", self.success_rate),
                format!("{:.2}", current.success_rate),
            ));
        }

        changes
    }
}

/// A p50 change for one tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceRegression {
    pub tool: String,
    pub previous_p50_ms: f64,
    pub current_p50_ms: f64,
    /// Percent change, positive when slower
    pub change_percent: f64,
    /// False when either side has low confidence
    pub reliable: bool,
}

/// Performance comparison across all tools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub threshold: f64,
    pub regressions: Vec<PerformanceRegression>,
    pub improvements: Vec<PerformanceRegression>,
    pub low_confidence_tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worst_regression_percent: Option<f64>,
    pub has_regressions: bool,
    pub summary: String,
}

/// Performance data of one tool on both sides of a comparison
#[derive(Debug, Clone, Copy)]
pub struct PerformanceSample<'a> {
    pub tool: &'a str,
    pub previous: &'a PerformanceBaseline,
    pub current: &'a PerformanceBaseline,
    pub previous_confidence: Option<&'a PerformanceConfidence>,
    pub current_confidence: Option<&'a PerformanceConfidence>,
}

impl PerformanceReport {
    /// Build a report; `None` when no tool has performance data on both sides
    pub fn analyze<'a>(
        samples: impl IntoIterator<Item = PerformanceSample<'a>>,
        threshold: f64,
    ) -> Option<Self> {
        let mut regressions = Vec::new();
        let mut improvements = Vec::new();
        let mut low_confidence_tools = Vec::new();
        let mut seen = false;

        for sample in samples {
            seen = true;
            let is_low = |c: Option<&PerformanceConfidence>| {
                c.map(|c| c.level == ConfidenceLevel::Low).unwrap_or(false)
            };
            let reliable = !is_low(sample.previous_confidence) && !is_low(sample.current_confidence);
            if !reliable {
                low_confidence_tools.push(sample.tool.to_string());
            }

            let Some(change) = relative_change(sample.previous.p50_ms, sample.current.p50_ms) else {
                continue;
            };
            let entry = PerformanceRegression {
                tool: sample.tool.to_string(),
                previous_p50_ms: sample.previous.p50_ms,
                current_p50_ms: sample.current.p50_ms,
                change_percent: change * 100.0,
                reliable,
            };
            if change > threshold {
                regressions.push(entry);
            } else if change < -threshold {
                improvements.push(entry);
            }
        }

        if !seen {
            return None;
        }

        let worst_regression_percent = regressions
            .iter()
            .map(|r| r.change_percent)
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))));

        let summary = match (regressions.len(), improvements.len()) {
            (0, 0) => "No significant performance changes".to_string(),
            (0, i) => format!("{} tool(s) improved", i),
            (r, 0) => format!("{} tool(s) regressed", r),
            (r, i) => format!("{} tool(s) regressed, {} improved", r, i),
        };

        Some(Self {
            threshold,
            has_regressions: !regressions.is_empty(),
            regressions,
            improvements,
            low_confidence_tools,
            worst_regression_percent,
            summary,
        })
    }
}
