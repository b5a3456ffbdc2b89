//! Severity Policy
//!
//! Total ordering over change severities plus the policy layer that
//! reclassifies, filters and gates a [`BehavioralDiff`].

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::{Aspect, BehaviorChange, BehavioralDiff};

/// Severity level of a detected change
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ChangeSeverity {
    /// No change, or a change downgraded out of existence
    #[default]
    None,

    /// Additive or documentation-only change
    Info,

    /// Change that may affect clients and deserves review
    Warning,

    /// Change that breaks existing clients
    Breaking,
}

impl ChangeSeverity {
    /// All severities in ascending order
    pub const ALL: [ChangeSeverity; 4] = [
        ChangeSeverity::None,
        ChangeSeverity::Info,
        ChangeSeverity::Warning,
        ChangeSeverity::Breaking,
    ];

    /// Get a display string for the severity
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeSeverity::None => "none",
            ChangeSeverity::Info => "info",
            ChangeSeverity::Warning => "warning",
            ChangeSeverity::Breaking => "breaking",
        }
    }

    /// Get an indicator for terminal output
    pub fn indicator(&self) -> &'static str {
        match self {
            ChangeSeverity::None => "✓",
            ChangeSeverity::Info => "+",
            ChangeSeverity::Warning => "!",
            ChangeSeverity::Breaking => "✗",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" => Some(ChangeSeverity::None),
            "info" => Some(ChangeSeverity::Info),
            "warning" | "warn" => Some(ChangeSeverity::Warning),
            "breaking" => Some(ChangeSeverity::Breaking),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChangeSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ChangeSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            format!(
                "Unknown severity: '{}'. Expected one of: none, info, warning, breaking",
                s
            )
        })
    }
}

/// Severity policy applied to a diff after comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeverityConfig {
    /// Changes below this severity are dropped
    pub minimum_severity: ChangeSeverity,

    /// Severity at which a diff fails the run
    pub fail_on_severity: ChangeSeverity,

    /// Drop all warning-level changes
    pub suppress_warnings: bool,

    /// Per-aspect severity overrides
    #[serde(default)]
    pub aspect_overrides: BTreeMap<Aspect, ChangeSeverity>,
}

impl Default for SeverityConfig {
    fn default() -> Self {
        Self {
            minimum_severity: ChangeSeverity::None,
            fail_on_severity: ChangeSeverity::Breaking,
            suppress_warnings: false,
            aspect_overrides: BTreeMap::new(),
        }
    }
}

impl SeverityConfig {
    pub fn with_minimum_severity(mut self, severity: ChangeSeverity) -> Self {
        self.minimum_severity = severity;
        self
    }

    pub fn with_fail_on(mut self, severity: ChangeSeverity) -> Self {
        self.fail_on_severity = severity;
        self
    }

    pub fn with_suppress_warnings(mut self, suppress: bool) -> Self {
        self.suppress_warnings = suppress;
        self
    }

    pub fn with_override(mut self, aspect: Aspect, severity: ChangeSeverity) -> Self {
        self.aspect_overrides.insert(aspect, severity);
        self
    }
}

/// Compare two severities, returning -1, 0 or 1
pub fn compare_severity(a: ChangeSeverity, b: ChangeSeverity) -> i8 {
    match a.cmp(&b) {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}

/// Whether `severity` is at or above `threshold`
pub fn severity_meets_threshold(severity: ChangeSeverity, threshold: ChangeSeverity) -> bool {
    severity >= threshold
}

/// Return the change with its aspect override applied, if any
pub fn apply_aspect_override(
    change: &BehaviorChange,
    overrides: &BTreeMap<Aspect, ChangeSeverity>,
) -> BehaviorChange {
    let mut effective = change.clone();
    if let Some(severity) = overrides.get(&change.aspect) {
        effective.severity = *severity;
    }
    effective
}

/// Whether a change survives the config's filters
fn survives(change: &BehaviorChange, config: &SeverityConfig) -> bool {
    if change.severity == ChangeSeverity::None {
        return false;
    }
    if config.suppress_warnings && change.severity == ChangeSeverity::Warning {
        return false;
    }
    severity_meets_threshold(change.severity, config.minimum_severity)
}

fn reclassify(changes: &[BehaviorChange], config: &SeverityConfig) -> Vec<BehaviorChange> {
    changes
        .iter()
        .map(|c| apply_aspect_override(c, &config.aspect_overrides))
        .filter(|c| survives(c, config))
        .collect()
}

/// Apply overrides, suppression and minimum-severity filtering to a diff
///
/// Overrides are applied before filtering so a downgraded change can be
/// filtered out. Counts, the aggregate severity and the added and removed
/// tool lists are recomputed from the surviving changes only.
pub fn apply_severity_config(diff: &BehavioralDiff, config: &SeverityConfig) -> BehavioralDiff {
    let mut result = diff.clone();

    result.behavior_changes = reclassify(&diff.behavior_changes, config);

    for tool_diff in &mut result.tools_modified {
        let changes = reclassify(&tool_diff.changes, config);
        tool_diff.set_changes(changes);
    }
    result.tools_modified.retain(|t| !t.changes.is_empty());

    // An added or removed tool is only listed while its presence change survives
    let survivors = &result.behavior_changes;
    let present = |name: &String| survivors.iter().any(|c| &c.tool == name);
    result.tools_added.retain(|name| present(name));
    result.tools_removed.retain(|name| present(name));

    result.recompute_totals();

    debug!(
        "Severity policy kept {} of {} changes (severity: {})",
        result.behavior_changes.len(),
        diff.behavior_changes.len(),
        result.severity
    );

    result
}

/// Whether a diff should fail the run at the given threshold
pub fn should_fail_on_diff(diff: &BehavioralDiff, fail_on_severity: ChangeSeverity) -> bool {
    severity_meets_threshold(diff.severity, fail_on_severity)
}

/// Changes at or above `minimum`, without touching the diff
pub fn filter_by_minimum_severity(
    diff: &BehavioralDiff,
    minimum: ChangeSeverity,
) -> Vec<BehaviorChange> {
    diff.behavior_changes
        .iter()
        .filter(|c| severity_meets_threshold(c.severity, minimum))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::types::ToolDiff;

    fn change(tool: &str, aspect: Aspect, severity: ChangeSeverity) -> BehaviorChange {
        BehaviorChange::new(tool, aspect, "before", "after", severity, "changed")
    }

    fn sample_diff() -> BehavioralDiff {
        let changes = vec![
            change("read_file", Aspect::Schema, ChangeSeverity::Breaking),
            change("read_file", Aspect::Description, ChangeSeverity::Info),
            change("write_file", Aspect::ResponseStructure, ChangeSeverity::Warning),
            change("write_file", Aspect::ErrorPattern, ChangeSeverity::Warning),
        ];

        let mut diff = BehavioralDiff::default();
        diff.tools_modified = vec![
            ToolDiff::from_changes("read_file", changes[..2].to_vec()),
            ToolDiff::from_changes("write_file", changes[2..].to_vec()),
        ];
        diff.behavior_changes = changes;
        diff.recompute_totals();
        diff
    }

    #[test]
    fn test_severity_ordering() {
        assert!(ChangeSeverity::Breaking > ChangeSeverity::Warning);
        assert!(ChangeSeverity::Warning > ChangeSeverity::Info);
        assert!(ChangeSeverity::Info > ChangeSeverity::None);
        assert_eq!(
            compare_severity(ChangeSeverity::Breaking, ChangeSeverity::Warning),
            1
        );
        assert_eq!(compare_severity(ChangeSeverity::Info, ChangeSeverity::Warning), -1);
        assert_eq!(compare_severity(ChangeSeverity::Info, ChangeSeverity::Info), 0);
    }

    #[test]
    fn test_threshold_is_reflexive() {
        for severity in ChangeSeverity::ALL {
            assert!(severity_meets_threshold(severity, severity));
        }
        assert!(!severity_meets_threshold(
            ChangeSeverity::Warning,
            ChangeSeverity::Breaking
        ));
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!(ChangeSeverity::parse("BREAKING"), Some(ChangeSeverity::Breaking));
        assert_eq!(ChangeSeverity::parse("warn"), Some(ChangeSeverity::Warning));
        assert_eq!(ChangeSeverity::parse("critical"), None);
        assert!("bogus".parse::<ChangeSeverity>().is_err());
        assert_eq!(format!("{}", ChangeSeverity::Info), "info");
    }

    #[test]
    fn test_aspect_override() {
        let mut overrides = BTreeMap::new();
        overrides.insert(Aspect::Description, ChangeSeverity::Warning);

        let desc = change("t", Aspect::Description, ChangeSeverity::Info);
        let schema = change("t", Aspect::Schema, ChangeSeverity::Breaking);

        assert_eq!(
            apply_aspect_override(&desc, &overrides).severity,
            ChangeSeverity::Warning
        );
        assert_eq!(
            apply_aspect_override(&schema, &overrides).severity,
            ChangeSeverity::Breaking
        );
    }

    #[test]
    fn test_override_to_none_removes_change() {
        let config = SeverityConfig::default().with_override(Aspect::Schema, ChangeSeverity::None);

        let result = apply_severity_config(&sample_diff(), &config);

        assert_eq!(result.breaking_count, 0);
        assert_eq!(result.severity, ChangeSeverity::Warning);
        assert!(result.behavior_changes.iter().all(|c| c.aspect != Aspect::Schema));
    }

    #[test]
    fn test_suppress_warnings() {
        let config = SeverityConfig::default().with_suppress_warnings(true);

        let result = apply_severity_config(&sample_diff(), &config);

        assert_eq!(result.warning_count, 0);
        assert_eq!(result.breaking_count, 1);
        assert_eq!(result.info_count, 1);
        assert_eq!(result.tools_modified.len(), 1);
    }

    #[test]
    fn test_override_applied_before_minimum_filter() {
        let config = SeverityConfig::default()
            .with_override(Aspect::Schema, ChangeSeverity::Info)
            .with_minimum_severity(ChangeSeverity::Warning);

        let result = apply_severity_config(&sample_diff(), &config);

        assert_eq!(result.behavior_changes.len(), 2);
        assert_eq!(result.severity, ChangeSeverity::Warning);
        assert_eq!(result.breaking_count, 0);
        assert_eq!(result.info_count, 0);
    }

    #[test]
    fn test_everything_filtered_is_none() {
        let config = SeverityConfig::default()
            .with_minimum_severity(ChangeSeverity::Breaking)
            .with_override(Aspect::Schema, ChangeSeverity::Warning);

        let result = apply_severity_config(&sample_diff(), &config);

        assert!(result.behavior_changes.is_empty());
        assert_eq!(result.severity, ChangeSeverity::None);
        assert!(!should_fail_on_diff(&result, ChangeSeverity::Info));
    }

    #[test]
    fn test_apply_is_idempotent() {
        let config = SeverityConfig::default()
            .with_override(Aspect::ErrorPattern, ChangeSeverity::Info)
            .with_minimum_severity(ChangeSeverity::Info)
            .with_suppress_warnings(true);

        let once = apply_severity_config(&sample_diff(), &config);
        let twice = apply_severity_config(&once, &config);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_dropped_presence_changes_clear_tool_lists() {
        let mut diff = BehavioralDiff::default();
        diff.tools_added = vec!["write_file".to_string()];
        diff.tools_removed = vec!["delete_file".to_string()];
        diff.behavior_changes = vec![
            change("write_file", Aspect::Schema, ChangeSeverity::Info),
            change("delete_file", Aspect::Schema, ChangeSeverity::Breaking),
        ];
        diff.recompute_totals();

        let silenced = SeverityConfig::default().with_override(Aspect::Schema, ChangeSeverity::None);
        let adjusted = apply_severity_config(&diff, &silenced);

        assert!(adjusted.tools_added.is_empty());
        assert!(adjusted.tools_removed.is_empty());
        assert_eq!(adjusted.severity, ChangeSeverity::None);
        assert_eq!(adjusted.summary, "No behavioral drift detected");

        let breaking_only =
            SeverityConfig::default().with_minimum_severity(ChangeSeverity::Breaking);
        let adjusted = apply_severity_config(&diff, &breaking_only);

        assert!(adjusted.tools_added.is_empty());
        assert_eq!(adjusted.tools_removed, vec!["delete_file".to_string()]);
    }

    #[test]
    fn test_should_fail_on_diff() {
        let diff = sample_diff();

        assert!(should_fail_on_diff(&diff, ChangeSeverity::Breaking));
        assert!(should_fail_on_diff(&diff, ChangeSeverity::Warning));
        assert!(!should_fail_on_diff(&BehavioralDiff::default(), ChangeSeverity::Info));
    }

    #[test]
    fn test_filter_by_minimum_is_read_only() {
        let diff = sample_diff();

        let filtered = filter_by_minimum_severity(&diff, ChangeSeverity::Warning);

        assert_eq!(filtered.len(), 3);
        assert_eq!(diff.behavior_changes.len(), 4);
        assert_eq!(diff.info_count, 1);
    }
}
