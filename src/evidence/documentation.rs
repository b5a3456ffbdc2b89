//! Documentation quality score

use serde::{Deserialize, Serialize};

/// Documentation quality of a whole server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentationScoreSummary {
    /// Overall score (0 - 100)
    pub overall_score: f64,
    pub grade: String,
    #[serde(default)]
    pub issue_count: usize,
    #[serde(default)]
    pub tool_count: usize,
}

/// Change in documentation score between two baselines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentationScoreChange {
    pub previous_score: f64,
    pub current_score: f64,
    pub change: f64,
    pub previous_grade: String,
    pub current_grade: String,
    pub improved: bool,
    pub degraded: bool,
    pub issues_change: i64,
    pub summary: String,
}

impl DocumentationScoreChange {
    pub fn between(previous: &DocumentationScoreSummary, current: &DocumentationScoreSummary) -> Self {
        let change = current.overall_score - previous.overall_score;
        let improved = change > 0.0;
        let degraded = change < 0.0;

        let summary = if improved {
            format!(
                "Documentation score improved {:.0} -> {:.0} ({} -> {})",
                previous.overall_score, current.overall_score, previous.grade, current.grade
            )
        } else if degraded {
            format!(
                "Documentation score dropped {:.0} -> {:.0} ({} -> {})",
                previous.overall_score, current.overall_score, previous.grade, current.grade
            )
        } else {
            format!("Documentation score unchanged at {:.0}", current.overall_score)
        };

        Self {
            previous_score: previous.overall_score,
            current_score: current.overall_score,
            change,
            previous_grade: previous.grade.clone(),
            current_grade: current.grade.clone(),
            improved,
            degraded,
            issues_change: current.issue_count as i64 - previous.issue_count as i64,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(overall: f64, grade: &str, issues: usize) -> DocumentationScoreSummary {
        DocumentationScoreSummary {
            overall_score: overall,
            grade: grade.to_string(),
            issue_count: issues,
            tool_count: 3,
        }
    }

    #[test]
    fn test_degraded() {
        let change = DocumentationScoreChange::between(&score(90.0, "A", 1), &score(70.0, "C", 4));

        assert!(change.degraded);
        assert!(!change.improved);
        assert_eq!(change.change, -20.0);
        assert_eq!(change.issues_change, 3);
        assert!(change.summary.contains("A -> C"));
    }

    #[test]
    fn test_unchanged() {
        let change = DocumentationScoreChange::between(&score(80.0, "B", 2), &score(80.0, "B", 2));

        assert!(!change.degraded && !change.improved);
    }
}
