//! Baseline Store - Persistence and integrity for baselines
//!
//! Loading runs the raw document through size, JSON and version checks,
//! migrates it to the current format, validates its shape and then checks
//! integrity against the raw content before deserializing it. Every mutation of a baseline recomputes its hash.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::diff::BehavioralDiff;
use crate::errors::BaselineError;
use crate::fingerprinting::CanonicalHasher;
use crate::version::{FormatVersion, MigrationRegistry};

use super::types::{AcceptanceRecord, AcceptedDiffSummary, BehavioralBaseline};

/// Largest baseline file accepted (50 MiB)
pub const MAX_BASELINE_SIZE: u64 = 50 * 1024 * 1024;

/// Field holding the content hash
const HASH_FIELD: &str = "hash";

/// Field holding the content hash in the legacy layout
const LEGACY_HASH_FIELD: &str = "integrityHash";

/// Options for [`BaselineStore::load`]
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Load even when the stored hash does not match
    pub skip_integrity_check: bool,
}

impl LoadOptions {
    pub fn skip_integrity_check(mut self, skip: bool) -> Self {
        self.skip_integrity_check = skip;
        self
    }
}

/// Reads and writes baseline files
#[derive(Debug, Clone)]
pub struct BaselineStore {
    registry: MigrationRegistry,
    max_size: u64,
}

impl Default for BaselineStore {
    fn default() -> Self {
        Self::new(MigrationRegistry::standard())
    }
}

impl BaselineStore {
    pub fn new(registry: MigrationRegistry) -> Self {
        Self {
            registry,
            max_size: MAX_BASELINE_SIZE,
        }
    }

    /// Override the file size limit
    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn registry(&self) -> &MigrationRegistry {
        &self.registry
    }

    /// Read a baseline file as raw JSON without interpreting it
    ///
    /// Checks existence and size before reading, and rejects empty or
    /// malformed JSON.
    pub fn read_raw(&self, path: impl AsRef<Path>) -> Result<Value, BaselineError> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        if !exists(path) {
            return Err(BaselineError::FileNotFound { path: path_str });
        }

        let size = fs::metadata(path)
            .map_err(|e| BaselineError::io(&path_str, e))?
            .len();
        if size > self.max_size {
            return Err(BaselineError::TooLarge {
                path: path_str,
                size,
                limit: self.max_size,
            });
        }

        let content = fs::read_to_string(path).map_err(|e| BaselineError::io(&path_str, e))?;
        if content.trim().is_empty() {
            return Err(BaselineError::InvalidJson {
                path: path_str,
                message: "file is empty".to_string(),
                src: None,
                span: None,
            });
        }

        serde_json::from_str(&content)
            .map_err(|e| BaselineError::invalid_json(&path_str, &content, &e))
    }

    /// Load, verify and migrate a baseline
    pub fn load(
        &self,
        path: impl AsRef<Path>,
        options: &LoadOptions,
    ) -> Result<BehavioralBaseline, BaselineError> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        let raw = self.read_raw(path)?;
        if !raw.is_object() {
            return Err(BaselineError::invalid_format("baseline must be a JSON object"));
        }

        let version = FormatVersion::of_baseline(&raw).ok_or_else(|| {
            BaselineError::invalid_format("missing or invalid 'version' field")
        })?;
        let current = FormatVersion::current();
        if version > current {
            return Err(BaselineError::VersionIncompatible {
                found: version.to_string(),
                supported: current.to_string(),
            });
        }

        let canonical_version = raw
            .get("version")
            .and_then(Value::as_str)
            .map(|v| v == version.to_string())
            .unwrap_or(false);

        let doc = if version < current {
            info!("Migrating baseline {} from format {} to {}", path_str, version, current);
            self.registry.migrate_baseline(raw.clone(), current)?
        } else {
            raw.clone()
        };

        validate_shape(&doc)?;

        let verified = if options.skip_integrity_check {
            debug!("Skipping integrity check for {}", path_str);
            false
        } else {
            verify_raw_integrity(&raw, &path_str)?;
            true
        };

        let mut baseline: BehavioralBaseline = serde_json::from_value(doc)
            .map_err(|e| BaselineError::invalid_format(e.to_string()))?;

        if version < current || !canonical_version {
            baseline.version = current;
        }
        // Defaulted or unknown fields change the typed content
        if verified || version < current || !canonical_version {
            let hash = compute_integrity_hash(&baseline);
            if baseline.hash != hash {
                debug!("Recomputed hash of {} after normalization", path_str);
                baseline.hash = hash;
            }
        }

        debug!(
            "Loaded baseline {} ({} tools, format {})",
            path_str,
            baseline.tool_profiles.len(),
            baseline.version
        );
        Ok(baseline)
    }

    /// Write a baseline as pretty JSON, replacing any existing file
    pub fn save(&self, baseline: &BehavioralBaseline, path: impl AsRef<Path>) -> Result<(), BaselineError> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        let content = serde_json::to_string_pretty(baseline).map_err(|e| BaselineError::Serialize {
            message: e.to_string(),
        })?;

        fs::write(path, content).map_err(|e| BaselineError::io(&path_str, e))?;

        info!("Saved baseline to {}", path_str);
        Ok(())
    }
}

/// Whether `path` is an existing regular file
pub fn exists(path: impl AsRef<Path>) -> bool {
    path.as_ref().is_file()
}

/// Hash of a JSON document with its hash fields removed
fn hash_without_integrity_fields(mut value: Value) -> String {
    if let Some(obj) = value.as_object_mut() {
        obj.remove(HASH_FIELD);
        obj.remove(LEGACY_HASH_FIELD);
    }
    CanonicalHasher::hash_value(&value)
}

/// Content hash of a baseline, excluding its own `hash` field
pub fn compute_integrity_hash(baseline: &BehavioralBaseline) -> String {
    let value = serde_json::to_value(baseline).unwrap_or(Value::Null);
    hash_without_integrity_fields(value)
}

/// A copy of the baseline with a freshly computed hash
pub fn recalculate_integrity_hash(baseline: &BehavioralBaseline) -> BehavioralBaseline {
    let mut updated = baseline.clone();
    updated.hash = compute_integrity_hash(&updated);
    updated
}

/// Whether the stored hash matches the content
pub fn verify_integrity(baseline: &BehavioralBaseline) -> bool {
    baseline.hash == compute_integrity_hash(baseline)
}

fn verify_raw_integrity(raw: &Value, path: &str) -> Result<(), BaselineError> {
    let expected = raw
        .get(HASH_FIELD)
        .or_else(|| raw.get(LEGACY_HASH_FIELD))
        .and_then(Value::as_str)
        .ok_or_else(|| BaselineError::invalid_format("missing integrity hash"))?
        .to_string();

    let actual = hash_without_integrity_fields(raw.clone());
    if expected != actual {
        warn!("Integrity check failed for {}: expected {}, computed {}", path, expected, actual);
        return Err(BaselineError::IntegrityMismatch {
            path: path.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// Structural checks on a current-format document
fn validate_shape(doc: &Value) -> Result<(), BaselineError> {
    fn invalid(reason: impl Into<String>) -> BaselineError {
        BaselineError::invalid_format(reason)
    }

    let metadata = doc
        .get("metadata")
        .and_then(Value::as_object)
        .ok_or_else(|| invalid("'metadata' must be an object"))?;
    if !metadata.get("generatedAt").map(Value::is_string).unwrap_or(false) {
        return Err(invalid("'metadata.generatedAt' must be a timestamp string"));
    }

    let tools = doc
        .get("toolProfiles")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("'toolProfiles' must be an array"))?;

    let mut names = HashSet::new();
    for (index, tool) in tools.iter().enumerate() {
        let tool = tool
            .as_object()
            .ok_or_else(|| invalid(format!("toolProfiles[{}] must be an object", index)))?;

        let name = tool
            .get("name")
            .and_then(Value::as_str)
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| invalid(format!("toolProfiles[{}] must have a non-empty name", index)))?;
        if !names.insert(name) {
            return Err(invalid(format!("duplicate tool name '{}'", name)));
        }

        if !tool.get("schemaHash").map(Value::is_string).unwrap_or(false) {
            return Err(invalid(format!("tool '{}' is missing 'schemaHash'", name)));
        }

        for key in ["inputSchema", "outputSchema", "inferredOutputSchema"] {
            if let Some(schema) = tool.get(key) {
                if !schema.is_object() && !schema.is_null() {
                    return Err(invalid(format!("tool '{}': '{}' must be an object", name, key)));
                }
            }
        }

        if let Some(consistency) = tool.get("observedArgsSchemaConsistency") {
            let in_range = consistency
                .as_f64()
                .map(|c| (0.0..=1.0).contains(&c))
                .unwrap_or(consistency.is_null());
            if !in_range {
                return Err(invalid(format!(
                    "tool '{}': observedArgsSchemaConsistency must be between 0 and 1",
                    name
                )));
            }
        }
    }

    if let Some(tools) = doc.get("capabilities").and_then(|c| c.get("tools")) {
        if !tools.is_array() {
            return Err(invalid("'capabilities.tools' must be an array"));
        }
    }

    Ok(())
}

/// Whether the baseline records an accepted drift
pub fn has_acceptance(baseline: &BehavioralBaseline) -> bool {
    baseline.acceptance.is_some()
}

/// A copy without the acceptance record, with a fresh hash
pub fn clear_acceptance(baseline: &BehavioralBaseline) -> BehavioralBaseline {
    let mut updated = baseline.clone();
    updated.acceptance = None;
    recalculate_integrity_hash(&updated)
}

/// A copy recording that `diff` was accepted, with a fresh hash
pub fn accept_drift(
    baseline: &BehavioralBaseline,
    diff: &BehavioralDiff,
    accepted_by: Option<String>,
    reason: Option<String>,
) -> BehavioralBaseline {
    let mut updated = baseline.clone();
    updated.acceptance = Some(AcceptanceRecord {
        accepted_at: Utc::now(),
        accepted_by,
        reason,
        accepted_diff: AcceptedDiffSummary::from_diff(diff),
    });
    info!(
        "Recorded acceptance of {} change(s) at severity {}",
        diff.change_count(),
        diff.severity
    );
    recalculate_integrity_hash(&updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::types::{BaselineMetadata, BaselineMode, ToolFingerprint};
    use crate::diff::ChangeSeverity;
    use serde_json::json;
    use tempfile::tempdir;

    fn sample_baseline() -> BehavioralBaseline {
        let mut metadata = BaselineMetadata::new(BaselineMode::Check, "node server.js");
        metadata.tool_version = Some("0.3.0".to_string());
        metadata.generated_at = chrono::DateTime::parse_from_rfc3339("2024-01-15T10:30:00.123Z")
            .unwrap()
            .with_timezone(&Utc);
        let baseline = BehavioralBaseline {
            version: FormatVersion::current(),
            metadata,
            server: Default::default(),
            capabilities: Default::default(),
            tool_profiles: vec![
                ToolFingerprint::new("read_file", "0123456789abcdef").with_description("Read"),
                ToolFingerprint::new("write_file", "fedcba9876543210"),
            ],
            assertions: Vec::new(),
            summary: "two tools".to_string(),
            acceptance: None,
            documentation_score: None,
            hash: String::new(),
        };
        recalculate_integrity_hash(&baseline)
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("baseline.json");
        let store = BaselineStore::default();
        let baseline = sample_baseline();

        store.save(&baseline, &path).unwrap();
        let loaded = store.load(&path, &LoadOptions::default()).unwrap();

        assert_eq!(loaded, baseline);
        assert!(verify_integrity(&loaded));
    }

    #[test]
    fn test_hash_ignores_own_field() {
        let baseline = sample_baseline();
        let mut tampered_hash = baseline.clone();
        tampered_hash.hash = "0000000000000000".to_string();

        assert_eq!(
            compute_integrity_hash(&baseline),
            compute_integrity_hash(&tampered_hash)
        );
        assert!(!verify_integrity(&tampered_hash));
    }

    #[test]
    fn test_tampered_file_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("baseline.json");
        let store = BaselineStore::default();
        store.save(&sample_baseline(), &path).unwrap();

        let mut raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        raw["summary"] = json!("edited by hand");
        fs::write(&path, serde_json::to_string_pretty(&raw).unwrap()).unwrap();

        let err = store.load(&path, &LoadOptions::default()).unwrap_err();
        assert!(err.is_integrity_failure());

        let loaded = store
            .load(&path, &LoadOptions::default().skip_integrity_check(true))
            .unwrap();
        assert_eq!(loaded.summary, "edited by hand");
    }

    #[test]
    fn test_loaded_hash_covers_defaulted_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("baseline.json");
        let store = BaselineStore::default();
        store.save(&sample_baseline(), &path).unwrap();

        let mut raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        raw["toolProfiles"][0]
            .as_object_mut()
            .unwrap()
            .remove("assertions");
        raw["reviewer"] = json!("written by another tool");
        raw["hash"] = json!(hash_without_integrity_fields(raw.clone()));
        fs::write(&path, serde_json::to_string_pretty(&raw).unwrap()).unwrap();

        let loaded = store.load(&path, &LoadOptions::default()).unwrap();

        assert!(loaded.tool_profiles[0].assertions.is_empty());
        assert!(verify_integrity(&loaded));
    }

    #[test]
    fn test_broken_shape_reported_before_integrity() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("baseline.json");
        let store = BaselineStore::default();
        store.save(&sample_baseline(), &path).unwrap();

        let mut raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        raw["toolProfiles"][1]["name"] = json!("read_file");
        fs::write(&path, serde_json::to_string_pretty(&raw).unwrap()).unwrap();

        let err = store.load(&path, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, BaselineError::InvalidFormat { .. }));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = BaselineStore::default()
            .load(dir.path().join("nope.json"), &LoadOptions::default())
            .unwrap_err();

        assert!(matches!(err, BaselineError::FileNotFound { .. }));
    }

    #[test]
    fn test_directory_is_not_a_baseline() {
        let dir = tempdir().unwrap();

        assert!(!exists(dir.path()));
        assert!(matches!(
            BaselineStore::default().load(dir.path(), &LoadOptions::default()),
            Err(BaselineError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_too_large() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.json");
        fs::write(&path, "{\"version\": \"2.0.0\"}").unwrap();

        let err = BaselineStore::default()
            .with_max_size(4)
            .load(&path, &LoadOptions::default())
            .unwrap_err();

        assert!(matches!(err, BaselineError::TooLarge { limit: 4, .. }));
    }

    #[test]
    fn test_empty_and_malformed_json() {
        let dir = tempdir().unwrap();
        let store = BaselineStore::default();

        let empty = dir.path().join("empty.json");
        fs::write(&empty, "  \n").unwrap();
        assert!(matches!(
            store.load(&empty, &LoadOptions::default()),
            Err(BaselineError::InvalidJson { .. })
        ));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{\"version\": ").unwrap();
        assert!(matches!(
            store.load(&broken, &LoadOptions::default()),
            Err(BaselineError::InvalidJson { .. })
        ));
    }

    #[test]
    fn test_invalid_format() {
        let dir = tempdir().unwrap();
        let store = BaselineStore::default();
        let options = LoadOptions::default().skip_integrity_check(true);

        let cases = [
            json!([1, 2, 3]),
            json!({"toolProfiles": []}),
            json!({"version": "banana"}),
            json!({"version": "2.0.0", "metadata": {"generatedAt": "2024-01-01T00:00:00.000Z"}, "toolProfiles": {}}),
            json!({"version": "2.0.0", "metadata": {"generatedAt": "2024-01-01T00:00:00.000Z"},
                   "toolProfiles": [{"name": "", "schemaHash": "x"}]}),
            json!({"version": "2.0.0", "metadata": {"generatedAt": "2024-01-01T00:00:00.000Z"},
                   "toolProfiles": [{"name": "a", "schemaHash": "x"}, {"name": "a", "schemaHash": "y"}]}),
            json!({"version": "2.0.0", "metadata": {"generatedAt": "2024-01-01T00:00:00.000Z"},
                   "toolProfiles": [{"name": "a", "schemaHash": "x", "inputSchema": "string"}]}),
            json!({"version": "2.0.0", "metadata": {"generatedAt": "2024-01-01T00:00:00.000Z"},
                   "toolProfiles": [{"name": "a", "schemaHash": "x", "observedArgsSchemaConsistency": 1.5}]}),
        ];

        for (index, case) in cases.iter().enumerate() {
            let path = dir.path().join(format!("case{}.json", index));
            fs::write(&path, case.to_string()).unwrap();

            let result = store.load(&path, &options);
            assert!(
                matches!(result, Err(BaselineError::InvalidFormat { .. })),
                "case {} gave {:?}",
                index,
                result
            );
        }
    }

    #[test]
    fn test_newer_version_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("future.json");
        fs::write(&path, json!({"version": "9.0.0", "hash": "x"}).to_string()).unwrap();

        let err = BaselineStore::default()
            .load(&path, &LoadOptions::default())
            .unwrap_err();

        assert!(matches!(err, BaselineError::VersionIncompatible { .. }));
    }

    #[test]
    fn test_accept_and_clear() {
        let baseline = sample_baseline();
        let mut diff = BehavioralDiff {
            tools_added: vec!["delete_file".to_string()],
            ..Default::default()
        };
        diff.severity = ChangeSeverity::Info;

        let accepted = accept_drift(
            &baseline,
            &diff,
            Some("ops".to_string()),
            Some("planned release".to_string()),
        );

        assert!(has_acceptance(&accepted));
        assert!(verify_integrity(&accepted));
        assert_ne!(accepted.hash, baseline.hash);
        let record = accepted.acceptance.as_ref().unwrap();
        assert_eq!(record.accepted_by.as_deref(), Some("ops"));
        assert_eq!(record.accepted_diff.tools_added, vec!["delete_file".to_string()]);

        let cleared = clear_acceptance(&accepted);
        assert!(!has_acceptance(&cleared));
        assert_eq!(cleared.hash, baseline.hash);
    }
}
