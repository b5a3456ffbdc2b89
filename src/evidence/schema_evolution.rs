//! Response schema evolution evidence
//!
//! Tracks the schema inferred from a tool's responses over time. A change
//! is backward compatible when it only adds fields.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::diff::ChangeSeverity;
use crate::fingerprinting::hasher::iso_timestamp;

use super::{join_names, DiffContext, Evidence, EvidenceChange, EvidenceKind};

/// One historical inferred-schema version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaVersionEntry {
    pub hash: String,
    #[serde(with = "iso_timestamp")]
    pub observed_at: DateTime<Utc>,
    #[serde(default)]
    pub sample_count: usize,
}

/// Inferred response schema and its history for one tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSchemaEvolution {
    /// Hash of the current inferred response schema
    pub current_hash: String,

    /// Top-level response field name to inferred type
    #[serde(default)]
    pub fields: BTreeMap<String, String>,

    #[serde(default)]
    pub history: Vec<SchemaVersionEntry>,

    #[serde(default = "default_stable")]
    pub is_stable: bool,

    #[serde(default)]
    pub stability_confidence: f64,

    /// Fields whose type varied between samples
    #[serde(default)]
    pub inconsistent_fields: Vec<String>,

    #[serde(default)]
    pub sample_count: usize,
}

fn default_stable() -> bool {
    true
}

/// Field-level comparison of two inferred response schemas
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSchemaEvolution {
    pub tool: String,
    pub fields_added: Vec<String>,
    pub fields_removed: Vec<String>,
    /// `field: old -> new`
    pub type_changes: Vec<String>,
    pub backward_compatible: bool,
}

impl ToolSchemaEvolution {
    fn between(tool: &str, previous: &ResponseSchemaEvolution, current: &ResponseSchemaEvolution) -> Self {
        let fields_added: Vec<String> = current
            .fields
            .keys()
            .filter(|k| !previous.fields.contains_key(*k))
            .cloned()
            .collect();
        let fields_removed: Vec<String> = previous
            .fields
            .keys()
            .filter(|k| !current.fields.contains_key(*k))
            .cloned()
            .collect();
        let type_changes: Vec<String> = previous
            .fields
            .iter()
            .filter_map(|(name, old)| {
                current
                    .fields
                    .get(name)
                    .filter(|new| *new != old)
                    .map(|new| format!("{}: {} -> {}", name, old, new))
            })
            .collect();

        Self {
            tool: tool.to_string(),
            backward_compatible: fields_removed.is_empty() && type_changes.is_empty(),
            fields_added,
            fields_removed,
            type_changes,
        }
    }

    fn has_changes(&self) -> bool {
        !self.fields_added.is_empty() || !self.fields_removed.is_empty() || !self.type_changes.is_empty()
    }
}

impl Evidence for ResponseSchemaEvolution {
    const KIND: EvidenceKind = EvidenceKind::SchemaEvolution;

    fn diff(&self, current: &Self, _ctx: &DiffContext) -> Vec<EvidenceChange> {
        let mut changes = Vec::new();

        if self.current_hash != current.current_hash {
            let evolution = ToolSchemaEvolution::between("", self, current);

            let mut parts = Vec::new();
            if !evolution.fields_removed.is_empty() {
                parts.push(format!("removed {}", join_names(&evolution.fields_removed)));
            }
            if !evolution.type_changes.is_empty() {
                parts.push(format!("retyped {}", join_names(&evolution.type_changes)));
            }
            if !evolution.fields_added.is_empty() {
                parts.push(format!("added {}", join_names(&evolution.fields_added)));
            }

            let (severity, headline) = if evolution.backward_compatible {
                (ChangeSeverity::Info, "Response schema extended")
            } else {
                (ChangeSeverity::Warning, "Response schema changed incompatibly")
            };
            let description = if parts.is_empty() {
                headline.to_string()
            } else {
                format!("{}: {}", headline, parts.join("; "))
            };

            changes.push(EvidenceChange::new(
                severity,
                description,
                self.current_hash.clone(),
                current.current_hash.clone(),
            ));
        }

        if self.is_stable && !current.is_stable {
            changes.push(EvidenceChange::new(
                ChangeSeverity::Warning,
                format!(
                    "Response schema is no longer stable (inconsistent: {})",
                    join_names(&current.inconsistent_fields)
                ),
                "stable",
                "unstable",
            ));
        }

        changes
    }
}

/// Response schema evolution across all tools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaEvolutionReport {
    pub tools: Vec<ToolSchemaEvolution>,
    pub unstable_tools: Vec<String>,
    pub incompatible_count: usize,
    pub summary: String,
}

impl SchemaEvolutionReport {
    /// Build a report; `None` when no tool has evolution data on both sides
    pub fn analyze<'a>(
        pairs: impl IntoIterator<
            Item = (&'a str, &'a ResponseSchemaEvolution, &'a ResponseSchemaEvolution),
        >,
    ) -> Option<Self> {
        let mut tools = Vec::new();
        let mut unstable_tools = Vec::new();
        let mut seen = false;

        for (tool, previous, current) in pairs {
            seen = true;
            if !current.is_stable {
                unstable_tools.push(tool.to_string());
            }
            if previous.current_hash == current.current_hash {
                continue;
            }
            let evolution = ToolSchemaEvolution::between(tool, previous, current);
            if evolution.has_changes() {
                tools.push(evolution);
            }
        }

        if !seen {
            return None;
        }

        let incompatible_count = tools.iter().filter(|t| !t.backward_compatible).count();
        let summary = if tools.is_empty() {
            "Response schemas unchanged".to_string()
        } else {
            format!(
                "{} tool(s) changed response schema, {} incompatibly",
                tools.len(),
                incompatible_count
            )
        };

        Some(Self {
            tools,
            unstable_tools,
            incompatible_count,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evolution(hash: &str, fields: &[(&str, &str)]) -> ResponseSchemaEvolution {
        ResponseSchemaEvolution {
            current_hash: hash.to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            history: Vec::new(),
            is_stable: true,
            stability_confidence: 1.0,
            inconsistent_fields: Vec::new(),
            sample_count: 10,
        }
    }

    #[test]
    fn test_additive_change_is_info() {
        let before = evolution("a", &[("id", "string")]);
        let after = evolution("b", &[("id", "string"), ("name", "string")]);

        let changes = before.diff(&after, &DiffContext::default());

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].severity, ChangeSeverity::Info);
        assert!(changes[0].description.contains("added name"));
    }

    #[test]
    fn test_removed_field_is_warning() {
        let before = evolution("a", &[("id", "string"), ("name", "string")]);
        let after = evolution("b", &[("id", "string")]);

        let changes = before.diff(&after, &DiffContext::default());

        assert_eq!(changes[0].severity, ChangeSeverity::Warning);
    }

    #[test]
    fn test_type_change_is_warning() {
        let before = evolution("a", &[("id", "string")]);
        let after = evolution("b", &[("id", "number")]);

        let changes = before.diff(&after, &DiffContext::default());

        assert_eq!(changes[0].severity, ChangeSeverity::Warning);
        assert!(changes[0].description.contains("id: string -> number"));
    }

    #[test]
    fn test_same_hash_no_change() {
        let before = evolution("a", &[("id", "string")]);

        assert!(before.diff(&before.clone(), &DiffContext::default()).is_empty());
    }

    #[test]
    fn test_became_unstable() {
        let before = evolution("a", &[("id", "string")]);
        let mut after = before.clone();
        after.is_stable = false;
        after.inconsistent_fields = vec!["id".to_string()];

        let changes = before.diff(&after, &DiffContext::default());

        assert_eq!(changes.len(), 1);
        assert!(changes[0].description.contains("no longer stable"));
    }

    #[test]
    fn test_report() {
        let a = evolution("a", &[("id", "string")]);
        let b = evolution("b", &[]);

        let report = SchemaEvolutionReport::analyze([("get", &a, &b)]).unwrap();

        assert_eq!(report.incompatible_count, 1);
        assert_eq!(report.tools[0].fields_removed, vec!["id".to_string()]);
    }
}
