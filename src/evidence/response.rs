//! Response structure fingerprint evidence

use serde::{Deserialize, Serialize};

use crate::diff::ChangeSeverity;

use super::{join_names, DiffContext, Evidence, EvidenceChange, EvidenceKind};

/// Broad content type of a tool's responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseContentType {
    Object,
    Array,
    Text,
    Binary,
    Empty,
    Mixed,
}

impl ResponseContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseContentType::Object => "object",
            ResponseContentType::Array => "array",
            ResponseContentType::Text => "text",
            ResponseContentType::Binary => "binary",
            ResponseContentType::Empty => "empty",
            ResponseContentType::Mixed => "mixed",
        }
    }
}

/// Size bucket of typical responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSize {
    Tiny,
    Small,
    Medium,
    Large,
}

/// Fingerprint of the structure of a tool's responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseFingerprint {
    /// Hash of the response structure (keys and value types)
    pub structure_hash: String,

    pub content_type: ResponseContentType,

    /// Top-level field names, sorted
    #[serde(default)]
    pub fields: Vec<String>,

    /// Structure hash of array elements, for array responses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_item_structure: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<ResponseSize>,

    #[serde(default)]
    pub is_empty: bool,

    #[serde(default)]
    pub sample_count: usize,

    /// Share of samples that matched this structure (0.0 - 1.0)
    #[serde(default)]
    pub confidence: f64,
}

impl Evidence for ResponseFingerprint {
    const KIND: EvidenceKind = EvidenceKind::ResponseFingerprint;

    fn diff(&self, current: &Self, _ctx: &DiffContext) -> Vec<EvidenceChange> {
        if self.structure_hash == current.structure_hash
            && self.content_type == current.content_type
            && self.is_empty == current.is_empty
        {
            return Vec::new();
        }

        let mut changes = Vec::new();

        if self.content_type != current.content_type {
            changes.push(EvidenceChange::new(
                ChangeSeverity::Warning,
                format!(
                    "Response content type changed from {} to {}",
                    self.content_type.as_str(),
                    current.content_type.as_str()
                ),
                self.content_type.as_str(),
                current.content_type.as_str(),
            ));
        }

        if !self.is_empty && current.is_empty {
            changes.push(EvidenceChange::new(
                ChangeSeverity::Warning,
                "Tool now returns empty responses",
                "non-empty",
                "empty",
            ));
        }

        let removed: Vec<&String> = self
            .fields
            .iter()
            .filter(|f| !current.fields.contains(f))
            .collect();
        let added: Vec<&String> = current
            .fields
            .iter()
            .filter(|f| !self.fields.contains(f))
            .collect();

        if !removed.is_empty() {
            changes.push(EvidenceChange::new(
                ChangeSeverity::Warning,
                format!("Response fields removed: {}", join_names(&removed)),
                join_names(&self.fields),
                join_names(&current.fields),
            ));
        }
        if !added.is_empty() {
            changes.push(EvidenceChange::new(
                ChangeSeverity::Warning,
                format!("Response fields added: {}", join_names(&added)),
                join_names(&self.fields),
                join_names(&current.fields),
            ));
        }

        if changes.is_empty() {
            changes.push(EvidenceChange::new(
                ChangeSeverity::Warning,
                "Response structure changed",
                self.structure_hash.clone(),
                current.structure_hash.clone(),
            ));
        }

        changes
    }
}
