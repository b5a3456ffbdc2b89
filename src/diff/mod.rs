//! Diff Module - Behavioral drift detection between baselines
//!
//! - [`Comparator`] compares two baselines (or a baseline and a live tool
//!   list) and produces a [`BehavioralDiff`]
//! - The severity policy reclassifies, filters and gates that diff

mod comparator;
mod severity;
mod types;

pub use comparator::{CompareOptions, Comparator};
pub use severity::{
    apply_aspect_override, apply_severity_config, compare_severity, filter_by_minimum_severity,
    severity_meets_threshold, should_fail_on_diff, ChangeSeverity, SeverityConfig,
};
pub use types::{Aspect, BehaviorChange, BehavioralDiff, ToolDiff};
