//! Deprecation lifecycle evidence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::diff::ChangeSeverity;
use crate::fingerprinting::hasher::iso_timestamp;

use super::{DiffContext, Evidence, EvidenceChange, EvidenceKind};

/// Deprecation state of a tool
///
/// Stored inline on the tool fingerprint; this struct is the comparable
/// view of those fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeprecationStatus {
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default, with = "iso_timestamp::option", skip_serializing_if = "Option::is_none")]
    pub deprecated_at: Option<DateTime<Utc>>,
    #[serde(default, with = "iso_timestamp::option", skip_serializing_if = "Option::is_none")]
    pub removal_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaced_by: Option<String>,
}

impl DeprecationStatus {
    /// Whether any lifecycle information is recorded
    pub fn is_recorded(&self) -> bool {
        self.deprecated
            || self.deprecated_at.is_some()
            || self.removal_date.is_some()
            || self.replaced_by.is_some()
    }

    fn render_date(date: Option<DateTime<Utc>>) -> String {
        date.map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "none".to_string())
    }
}

impl Evidence for DeprecationStatus {
    const KIND: EvidenceKind = EvidenceKind::Deprecation;

    fn diff(&self, current: &Self, _ctx: &DiffContext) -> Vec<EvidenceChange> {
        let mut changes = Vec::new();

        match (self.deprecated, current.deprecated) {
            (false, true) => {
                let description = match &current.replaced_by {
                    Some(replacement) => format!("Tool deprecated, replaced by '{}'", replacement),
                    None => "Tool deprecated".to_string(),
                };
                changes.push(EvidenceChange::new(
                    ChangeSeverity::Warning,
                    description,
                    "active",
                    "deprecated",
                ));
            }
            (true, false) => {
                changes.push(EvidenceChange::new(
                    ChangeSeverity::Info,
                    "Tool is no longer deprecated",
                    "deprecated",
                    "active",
                ));
            }
            (true, true) => {
                if self.removal_date != current.removal_date {
                    let earlier = match (self.removal_date, current.removal_date) {
                        (Some(old), Some(new)) => new < old,
                        (None, Some(_)) => true,
                        _ => false,
                    };
                    changes.push(EvidenceChange::new(
                        if earlier {
                            ChangeSeverity::Warning
                        } else {
                            ChangeSeverity::Info
                        },
                        "Deprecated tool removal date changed",
                        Self::render_date(self.removal_date),
                        Self::render_date(current.removal_date),
                    ));
                }
                if self.replaced_by != current.replaced_by {
                    changes.push(EvidenceChange::new(
                        ChangeSeverity::Info,
                        "Deprecated tool replacement changed",
                        self.replaced_by.clone().unwrap_or_default(),
                        current.replaced_by.clone().unwrap_or_default(),
                    ));
                }
            }
            (false, false) => {}
        }

        changes
    }
}
