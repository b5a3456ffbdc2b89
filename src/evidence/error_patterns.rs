//! Error pattern evidence
//!
//! Error messages observed while exercising a tool, grouped by category and
//! a normalized message hash so that values like paths, numbers and ids do
//! not create spurious patterns.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::diff::ChangeSeverity;
use crate::fingerprinting::CanonicalHasher;

use super::{join_names, DiffContext, Evidence, EvidenceChange, EvidenceKind};

/// Broad category of an error message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Permission,
    Timeout,
    RateLimit,
    Internal,
    Unknown,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::Permission => "permission",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::RateLimit => "rate_limit",
            ErrorCategory::Internal => "internal",
            ErrorCategory::Unknown => "unknown",
        }
    }

    /// Categorize an error message by keyword
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));

        if has(&["timeout", "timed out", "deadline"]) {
            ErrorCategory::Timeout
        } else if has(&["rate limit", "too many requests", "throttl"]) {
            ErrorCategory::RateLimit
        } else if has(&["permission", "denied", "forbidden", "unauthorized", "not allowed"]) {
            ErrorCategory::Permission
        } else if has(&["not found", "no such", "does not exist", "enoent", "unknown tool"]) {
            ErrorCategory::NotFound
        } else if has(&["invalid", "required", "must be", "expected", "validation", "missing"]) {
            ErrorCategory::Validation
        } else if has(&["internal", "panic", "exception", "unexpected", "crash"]) {
            ErrorCategory::Internal
        } else {
            ErrorCategory::Unknown
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A group of similar error messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPattern {
    pub category: ErrorCategory,

    /// Hash of the normalized message
    pub pattern_hash: String,

    /// One representative message
    pub example: String,

    /// Number of occurrences
    #[serde(default)]
    pub count: usize,
}

impl ErrorPattern {
    /// Build a pattern from a single error message
    pub fn from_message(message: &str) -> Self {
        Self {
            category: ErrorCategory::classify(message),
            pattern_hash: CanonicalHasher::short_hash(&normalize_message(message)),
            example: message.to_string(),
            count: 1,
        }
    }

    fn key(&self) -> (ErrorCategory, &str) {
        (self.category, self.pattern_hash.as_str())
    }
}

/// Replacement rules applied before hashing an error message
fn normalization_rules() -> &'static [(Regex, &'static str)] {
    static RULES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            (
                r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
                "<uuid>",
            ),
            (r"\d{4}-\d{2}-\d{2}[T ][\d:.]+Z?", "<timestamp>"),
            (r#"(?:[A-Za-z]:)?(?:[/\\][\w.\-]+)+"#, "<path>"),
            (r#""[^"]*"|'[^']*'"#, "<str>"),
            (r"\b0x[0-9a-fA-F]+\b", "<hex>"),
            (r"\d+(?:\.\d+)?", "<n>"),
        ]
        .into_iter()
        .filter_map(|(pattern, replacement)| {
            Regex::new(pattern).ok().map(|re| (re, replacement))
        })
        .collect()
    })
}

/// Strip variable content from an error message
pub(crate) fn normalize_message(message: &str) -> String {
    let mut normalized = message.trim().to_lowercase();
    for (re, replacement) in normalization_rules() {
        normalized = re.replace_all(&normalized, *replacement).into_owned();
    }
    normalized.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// All error patterns observed for one tool
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorPatterns {
    pub patterns: Vec<ErrorPattern>,
}

impl ErrorPatterns {
    pub fn new(patterns: Vec<ErrorPattern>) -> Self {
        Self { patterns }
    }

    /// Group raw error messages into patterns
    ///
    /// Patterns keep first-seen order; the first message of each group is
    /// its example.
    pub fn from_messages<'a>(messages: impl IntoIterator<Item = &'a str>) -> Self {
        let mut patterns: Vec<ErrorPattern> = Vec::new();
        for message in messages {
            let pattern = ErrorPattern::from_message(message);
            match patterns.iter_mut().find(|p| p.key() == pattern.key()) {
                Some(existing) => existing.count += 1,
                None => patterns.push(pattern),
            }
        }
        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Total occurrences per category
    pub fn category_counts(&self) -> BTreeMap<ErrorCategory, usize> {
        let mut counts = BTreeMap::new();
        for pattern in &self.patterns {
            *counts.entry(pattern.category).or_insert(0) += pattern.count.max(1);
        }
        counts
    }

    fn contains(&self, pattern: &ErrorPattern) -> bool {
        self.patterns.iter().any(|p| p.key() == pattern.key())
    }
}

impl Evidence for ErrorPatterns {
    const KIND: EvidenceKind = EvidenceKind::ErrorPatterns;

    fn diff(&self, current: &Self, _ctx: &DiffContext) -> Vec<EvidenceChange> {
        let mut changes = Vec::new();

        for pattern in current.patterns.iter().filter(|p| !self.contains(p)) {
            changes.push(EvidenceChange::new(
                ChangeSeverity::Warning,
                format!("New {} error pattern: {}", pattern.category, pattern.example),
                "",
                pattern.example.clone(),
            ));
        }

        for pattern in self.patterns.iter().filter(|p| !current.contains(p)) {
            changes.push(EvidenceChange::new(
                ChangeSeverity::Info,
                format!(
                    "{} error pattern no longer observed: {}",
                    pattern.category, pattern.example
                ),
                pattern.example.clone(),
                "",
            ));
        }

        changes
    }
}

/// Direction of an error category between two runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorTrend {
    New,
    Resolved,
    Increasing,
    Decreasing,
    Stable,
}

/// Per-category error trend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTrend {
    pub category: ErrorCategory,
    pub previous_count: usize,
    pub current_count: usize,
    pub trend: ErrorTrend,
}

/// Error trends across all tools of two baselines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorTrendReport {
    pub trends: Vec<CategoryTrend>,
    pub significant_change: bool,
    pub new_categories: Vec<ErrorCategory>,
    pub resolved_categories: Vec<ErrorCategory>,
    pub increasing_categories: Vec<ErrorCategory>,
    pub summary: String,
}

impl ErrorTrendReport {
    /// Build a report from per-tool pattern pairs
    ///
    /// Returns `None` when no tool carries error pattern evidence on both
    /// sides.
    pub fn analyze<'a>(
        pairs: impl IntoIterator<Item = (&'a ErrorPatterns, &'a ErrorPatterns)>,
    ) -> Option<Self> {
        let mut previous: BTreeMap<ErrorCategory, usize> = BTreeMap::new();
        let mut current: BTreeMap<ErrorCategory, usize> = BTreeMap::new();
        let mut seen = false;

        for (before, after) in pairs {
            seen = true;
            for (category, count) in before.category_counts() {
                *previous.entry(category).or_insert(0) += count;
            }
            for (category, count) in after.category_counts() {
                *current.entry(category).or_insert(0) += count;
            }
        }

        if !seen {
            return None;
        }

        let mut categories: Vec<ErrorCategory> =
            previous.keys().chain(current.keys()).copied().collect();
        categories.sort();
        categories.dedup();

        let trends: Vec<CategoryTrend> = categories
            .into_iter()
            .map(|category| {
                let previous_count = previous.get(&category).copied().unwrap_or(0);
                let current_count = current.get(&category).copied().unwrap_or(0);
                CategoryTrend {
                    category,
                    previous_count,
                    current_count,
                    trend: classify_trend(previous_count, current_count),
                }
            })
            .collect();

        let with_trend = |trend: ErrorTrend| -> Vec<ErrorCategory> {
            trends
                .iter()
                .filter(|t| t.trend == trend)
                .map(|t| t.category)
                .collect()
        };
        let new_categories = with_trend(ErrorTrend::New);
        let resolved_categories = with_trend(ErrorTrend::Resolved);
        let increasing_categories = with_trend(ErrorTrend::Increasing);

        let significant_change = !new_categories.is_empty() || !increasing_categories.is_empty();

        let summary = if trends.iter().all(|t| t.trend == ErrorTrend::Stable) {
            "Error behavior is stable".to_string()
        } else {
            let mut parts = Vec::new();
            let names = |cats: &[ErrorCategory]| {
                join_names(&cats.iter().map(|c| c.as_str()).collect::<Vec<_>>())
            };
            if !new_categories.is_empty() {
                parts.push(format!("new: {}", names(&new_categories)));
            }
            if !increasing_categories.is_empty() {
                parts.push(format!("increasing: {}", names(&increasing_categories)));
            }
            if !resolved_categories.is_empty() {
                parts.push(format!("resolved: {}", names(&resolved_categories)));
            }
            if parts.is_empty() {
                "Error volume decreased".to_string()
            } else {
                format!("Error categories changed ({})", parts.join("; "))
            }
        };

        Some(Self {
            trends,
            significant_change,
            new_categories,
            resolved_categories,
            increasing_categories,
            summary,
        })
    }
}

fn classify_trend(previous: usize, current: usize) -> ErrorTrend {
    match (previous, current) {
        (0, 0) => ErrorTrend::Stable,
        (0, _) => ErrorTrend::New,
        (_, 0) => ErrorTrend::Resolved,
        (p, c) if c as f64 >= p as f64 * 1.5 => ErrorTrend::Increasing,
        (p, c) if (c as f64) <= p as f64 * 0.5 => ErrorTrend::Decreasing,
        _ => ErrorTrend::Stable,
    }
}
