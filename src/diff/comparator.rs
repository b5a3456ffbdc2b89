//! Comparator - Diff engine for behavioral baselines
//!
//! Compares two baselines tool by tool. Tool presence and schemas are
//! compared directly; every other aspect is delegated to the typed
//! evidence diffs.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::baseline::{fingerprint_tool, BehavioralBaseline, ToolFingerprint, ToolInterview};
use crate::evidence::{
    diff_optional, DiffContext, DocumentationScoreChange, ErrorTrendReport, Evidence,
    PerformanceReport, PerformanceSample, SchemaEvolutionReport, SecurityReport,
    DEFAULT_PERFORMANCE_THRESHOLD,
};
use crate::fingerprinting::SchemaDiff;
use crate::protocol::Tool;
use crate::version::{are_versions_compatible, FormatVersion};

use super::types::{Aspect, BehaviorChange, BehavioralDiff, ToolDiff};
use super::ChangeSeverity;

/// Options controlling a comparison
#[derive(Debug, Clone)]
pub struct CompareOptions {
    pub ignore_schema_changes: bool,
    pub ignore_description_changes: bool,
    /// Also covers response schema evolution
    pub ignore_response_structure_changes: bool,
    pub ignore_error_pattern_changes: bool,
    pub ignore_security_changes: bool,
    pub ignore_performance_changes: bool,
    /// Restrict the comparison to these tools; `None` compares all
    pub tools: Option<Vec<String>>,
    /// Fractional p50 increase that counts as a regression
    pub performance_threshold: f64,
    /// Skip the format version check
    pub ignore_version_mismatch: bool,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            ignore_schema_changes: false,
            ignore_description_changes: false,
            ignore_response_structure_changes: false,
            ignore_error_pattern_changes: false,
            ignore_security_changes: false,
            ignore_performance_changes: false,
            tools: None,
            performance_threshold: DEFAULT_PERFORMANCE_THRESHOLD,
            ignore_version_mismatch: false,
        }
    }
}

impl CompareOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tools(mut self, tools: Vec<String>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn with_performance_threshold(mut self, threshold: f64) -> Self {
        self.performance_threshold = threshold;
        self
    }

    pub fn with_ignore_version_mismatch(mut self, ignore: bool) -> Self {
        self.ignore_version_mismatch = ignore;
        self
    }

    /// Stop reporting changes of the given aspect
    ///
    /// Deprecation changes cannot be ignored.
    pub fn ignoring(mut self, aspect: Aspect) -> Self {
        match aspect {
            Aspect::Schema => self.ignore_schema_changes = true,
            Aspect::Description => self.ignore_description_changes = true,
            Aspect::ResponseStructure | Aspect::ResponseSchemaEvolution => {
                self.ignore_response_structure_changes = true
            }
            Aspect::ErrorPattern => self.ignore_error_pattern_changes = true,
            Aspect::Security => self.ignore_security_changes = true,
            Aspect::Performance => self.ignore_performance_changes = true,
            Aspect::Deprecation => {}
        }
        self
    }

    fn includes_tool(&self, name: &str) -> bool {
        self.tools
            .as_ref()
            .map(|tools| tools.iter().any(|t| t == name))
            .unwrap_or(true)
    }

    fn diff_context(&self) -> DiffContext {
        DiffContext {
            performance_threshold: self.performance_threshold,
        }
    }
}

/// Compares baselines
pub struct Comparator;

impl Comparator {
    /// Compare a previous baseline with a current one
    pub fn compare(
        previous: &BehavioralBaseline,
        current: &BehavioralBaseline,
        options: &CompareOptions,
    ) -> BehavioralDiff {
        let mut diff = BehavioralDiff::default();

        if !options.ignore_version_mismatch {
            let compatibility = are_versions_compatible(previous.version, current.version);
            if let Some(warning) = &compatibility.warning {
                warn!("{}", warning);
            }
            diff.version_compatibility = Some(compatibility);
        }

        let ctx = options.diff_context();
        let current_names: HashSet<&str> =
            current.tool_profiles.iter().map(|t| t.name.as_str()).collect();
        let previous_names: HashSet<&str> =
            previous.tool_profiles.iter().map(|t| t.name.as_str()).collect();

        let mut common: Vec<(&ToolFingerprint, &ToolFingerprint)> = Vec::new();

        for prev_tool in &previous.tool_profiles {
            if !options.includes_tool(&prev_tool.name) {
                continue;
            }
            match current.tool(&prev_tool.name) {
                Some(curr_tool) => {
                    common.push((prev_tool, curr_tool));
                    let tool_diff = Self::compare_tool(prev_tool, curr_tool, options, &ctx);
                    if tool_diff.has_changes() {
                        diff.behavior_changes.extend(tool_diff.changes.iter().cloned());
                        diff.tools_modified.push(tool_diff);
                    }
                }
                None => {
                    diff.tools_removed.push(prev_tool.name.clone());
                    diff.behavior_changes.push(BehaviorChange::new(
                        &prev_tool.name,
                        Aspect::Schema,
                        &prev_tool.schema_hash,
                        "",
                        ChangeSeverity::Breaking,
                        format!("Tool '{}' was removed", prev_tool.name),
                    ));
                }
            }
        }

        for curr_tool in &current.tool_profiles {
            if !options.includes_tool(&curr_tool.name)
                || previous_names.contains(curr_tool.name.as_str())
            {
                continue;
            }
            diff.tools_added.push(curr_tool.name.clone());
            diff.behavior_changes.push(BehaviorChange::new(
                &curr_tool.name,
                Aspect::Schema,
                "",
                &curr_tool.schema_hash,
                ChangeSeverity::Info,
                format!("Tool '{}' was added", curr_tool.name),
            ));
        }

        debug!(
            "Compared {} previous and {} current tools ({} in common)",
            previous_names.len(),
            current_names.len(),
            common.len()
        );

        Self::attach_reports(&mut diff, previous, current, &common, options);
        diff.recompute_totals();

        info!("Drift comparison: {} (severity: {})", diff.summary, diff.severity);
        diff
    }

    /// Compare a baseline against a live `tools/list` result
    ///
    /// The snapshot has no behavioral evidence, so only presence, declared
    /// schema and description can change. Observed argument consensus and
    /// deprecation state are carried over from the baseline.
    pub fn compare_with_capabilities(
        previous: &BehavioralBaseline,
        tools: &[Tool],
        options: &CompareOptions,
    ) -> BehavioralDiff {
        let tool_profiles = tools
            .iter()
            .map(|tool| {
                let mut fingerprint = fingerprint_tool(&ToolInterview::new(tool.clone()));
                if let Some(known) = previous.tool(&tool.name) {
                    fingerprint.schema_hash = known.schema_hash.clone();
                    fingerprint.set_deprecation(known.deprecation());
                }
                fingerprint
            })
            .collect();

        let mut snapshot = previous.clone();
        snapshot.version = FormatVersion::current();
        snapshot.tool_profiles = tool_profiles;
        snapshot.capabilities.tools = tools.to_vec();
        snapshot.documentation_score = None;
        snapshot.acceptance = None;

        Self::compare(previous, &snapshot, options)
    }

    /// Compare two fingerprints of the same tool
    pub fn compare_tool(
        previous: &ToolFingerprint,
        current: &ToolFingerprint,
        options: &CompareOptions,
        ctx: &DiffContext,
    ) -> ToolDiff {
        let tool = previous.name.as_str();
        let mut changes = Vec::new();
        let mut schema_changes = Vec::new();

        if !options.ignore_schema_changes {
            let declared = (previous.declared_schema_hash(), current.declared_schema_hash());
            let declared_changed = declared.0 != declared.1;
            let observed_changed = previous.schema_hash != current.schema_hash;
            let (before, after) = if declared_changed {
                (declared.0.unwrap_or_default(), declared.1.unwrap_or_default())
            } else {
                (previous.schema_hash.clone(), current.schema_hash.clone())
            };

            match (&previous.input_schema, &current.input_schema) {
                (Some(old), Some(new)) if declared_changed => {
                    let schema_diff = SchemaDiff::between(old, new);
                    if schema_diff.is_empty() {
                        changes.push(BehaviorChange::new(
                            tool,
                            Aspect::Schema,
                            &before,
                            &after,
                            ChangeSeverity::Warning,
                            "Schema fingerprint changed without a structural difference",
                        ));
                    } else {
                        changes.extend(schema_diff.changes.iter().map(|change| {
                            BehaviorChange::new(
                                tool,
                                Aspect::Schema,
                                &before,
                                &after,
                                change.severity(),
                                change.description(),
                            )
                        }));
                        schema_changes = schema_diff.changes;
                    }
                }
                (Some(_), Some(_)) if observed_changed => changes.push(BehaviorChange::new(
                    tool,
                    Aspect::Schema,
                    &before,
                    &after,
                    ChangeSeverity::Warning,
                    "Observed argument shapes changed",
                )),
                (Some(_), Some(_)) => {}
                _ if declared_changed || observed_changed => changes.push(BehaviorChange::new(
                    tool,
                    Aspect::Schema,
                    &before,
                    &after,
                    ChangeSeverity::Breaking,
                    "Schema fingerprint changed",
                )),
                _ => {}
            }
        }

        if !options.ignore_description_changes && previous.description != current.description {
            changes.push(BehaviorChange::new(
                tool,
                Aspect::Description,
                &previous.description,
                &current.description,
                ChangeSeverity::Info,
                "Description changed",
            ));
        }

        if !options.ignore_response_structure_changes {
            push_evidence(
                &mut changes,
                tool,
                previous.response_fingerprint.as_ref(),
                current.response_fingerprint.as_ref(),
                ctx,
            );
            push_evidence(
                &mut changes,
                tool,
                previous.response_schema_evolution.as_ref(),
                current.response_schema_evolution.as_ref(),
                ctx,
            );
        }

        if !options.ignore_error_pattern_changes {
            push_evidence(
                &mut changes,
                tool,
                previous.error_patterns.as_ref(),
                current.error_patterns.as_ref(),
                ctx,
            );
        }

        if !options.ignore_security_changes {
            push_evidence(
                &mut changes,
                tool,
                previous.security_fingerprint.as_ref(),
                current.security_fingerprint.as_ref(),
                ctx,
            );
        }

        if !options.ignore_performance_changes {
            push_evidence(
                &mut changes,
                tool,
                previous.performance.as_ref(),
                current.performance.as_ref(),
                ctx,
            );
        }

        push_evidence(
            &mut changes,
            tool,
            Some(&previous.deprecation()),
            Some(&current.deprecation()),
            ctx,
        );

        ToolDiff::from_changes(tool, changes).with_schema_changes(schema_changes)
    }

    fn attach_reports(
        diff: &mut BehavioralDiff,
        previous: &BehavioralBaseline,
        current: &BehavioralBaseline,
        common: &[(&ToolFingerprint, &ToolFingerprint)],
        options: &CompareOptions,
    ) {
        if !options.ignore_performance_changes {
            diff.performance_report = PerformanceReport::analyze(
                common.iter().filter_map(|(prev, curr)| {
                    Some(PerformanceSample {
                        tool: prev.name.as_str(),
                        previous: prev.performance.as_ref()?,
                        current: curr.performance.as_ref()?,
                        previous_confidence: prev.performance_confidence.as_ref(),
                        current_confidence: curr.performance_confidence.as_ref(),
                    })
                }),
                options.performance_threshold,
            );
        }

        if !options.ignore_security_changes {
            diff.security_report = SecurityReport::analyze(common.iter().filter_map(|(prev, curr)| {
                Some((
                    prev.name.as_str(),
                    prev.security_fingerprint.as_ref()?,
                    curr.security_fingerprint.as_ref()?,
                ))
            }));
        }

        if !options.ignore_response_structure_changes {
            diff.schema_evolution_report =
                SchemaEvolutionReport::analyze(common.iter().filter_map(|(prev, curr)| {
                    Some((
                        prev.name.as_str(),
                        prev.response_schema_evolution.as_ref()?,
                        curr.response_schema_evolution.as_ref()?,
                    ))
                }));
        }

        if !options.ignore_error_pattern_changes {
            diff.error_trend_report = ErrorTrendReport::analyze(common.iter().filter_map(
                |(prev, curr)| Some((prev.error_patterns.as_ref()?, curr.error_patterns.as_ref()?)),
            ));
        }

        if let (Some(prev), Some(curr)) = (&previous.documentation_score, &current.documentation_score) {
            diff.documentation_score_change = Some(DocumentationScoreChange::between(prev, curr));
        }
    }
}

fn push_evidence<E: Evidence>(
    changes: &mut Vec<BehaviorChange>,
    tool: &str,
    previous: Option<&E>,
    current: Option<&E>,
    ctx: &DiffContext,
) {
    changes.extend(diff_optional(previous, current, ctx).into_iter().map(|change| {
        BehaviorChange::new(
            tool,
            E::KIND.aspect(),
            change.before,
            change.after,
            change.severity,
            change.description,
        )
    }));
}
