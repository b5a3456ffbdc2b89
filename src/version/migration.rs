//! Baseline format migrations
//!
//! A registry is an ordered list of transforms, each producing the layout
//! of one format version from the layout of the previous one. The built-in
//! chain is returned by [`MigrationRegistry::standard`]; tests build their
//! own registries.

use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::errors::{BaselineError, MigrationError};

use super::FormatVersion;

/// Transform from the previous layout to this migration's layout
pub type MigrationFn = fn(Value) -> Value;

/// A single format migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Version produced by this migration
    pub version: FormatVersion,
    pub description: &'static str,
    pub transform: MigrationFn,
}

impl Migration {
    pub fn new(version: FormatVersion, description: &'static str, transform: MigrationFn) -> Self {
        Self {
            version,
            description,
            transform,
        }
    }
}

/// Read-only summary of the migration state of a raw baseline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationInfo {
    /// Version found in the document, if readable
    pub current_version: Option<FormatVersion>,
    pub target_version: FormatVersion,
    pub needs_migration: bool,
    pub can_migrate: bool,
    /// `version: description` of each migration that would run
    pub migrations: Vec<String>,
}

/// Ordered set of migrations
#[derive(Debug, Clone, Default)]
pub struct MigrationRegistry {
    migrations: Vec<Migration>,
}

impl MigrationRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in migration chain up to the current format
    pub fn standard() -> Self {
        Self {
            migrations: vec![
                Migration::new(
                    FormatVersion::new(1, 1, 0),
                    "Add per-tool assertion lists and a capabilities snapshot",
                    migrate_to_1_1_0,
                ),
                Migration::new(
                    FormatVersion::new(2, 0, 0),
                    "Move run fields into metadata, rename tools and integrity hash",
                    migrate_to_2_0_0,
                ),
            ],
        }
    }

    /// Register a migration; versions must strictly increase
    pub fn register(&mut self, migration: Migration) -> Result<(), MigrationError> {
        if let Some(last) = self.migrations.last() {
            if migration.version <= last.version {
                return Err(MigrationError::NotMonotonic {
                    version: migration.version.to_string(),
                    previous: last.version.to_string(),
                });
            }
        }
        self.migrations.push(migration);
        Ok(())
    }

    /// Builder form of [`register`](Self::register)
    pub fn with_migration(mut self, migration: Migration) -> Result<Self, MigrationError> {
        self.register(migration)?;
        Ok(self)
    }

    pub fn migrations(&self) -> &[Migration] {
        &self.migrations
    }

    /// Highest registered version
    pub fn latest_version(&self) -> Option<FormatVersion> {
        self.migrations.last().map(|m| m.version)
    }

    /// Migrations with `source < version <= target`, ascending
    pub fn migrations_to_apply(&self, source: FormatVersion, target: FormatVersion) -> Vec<&Migration> {
        self.migrations
            .iter()
            .filter(|m| m.version > source && m.version <= target)
            .collect()
    }

    pub fn can_migrate(&self, source: FormatVersion, target: FormatVersion) -> bool {
        source < target
    }

    /// Upgrade a raw baseline document to `target`
    ///
    /// Each transform runs in ascending order and the document's `version`
    /// is stamped after each one, then stamped with `target`. A document
    /// already at `target` is returned unchanged.
    pub fn migrate_baseline(&self, raw: Value, target: FormatVersion) -> Result<Value, BaselineError> {
        let source = FormatVersion::of_baseline(&raw).ok_or_else(|| {
            BaselineError::invalid_format("missing or invalid 'version' field")
        })?;

        if source > target {
            return Err(BaselineError::MigrationDowngrade {
                from: source.to_string(),
                to: target.to_string(),
            });
        }
        if source == target {
            return Ok(raw);
        }

        let mut doc = raw;
        for migration in self.migrations_to_apply(source, target) {
            debug!(
                "Applying baseline migration {}: {}",
                migration.version, migration.description
            );
            doc = (migration.transform)(doc);
            stamp_version(&mut doc, migration.version);
        }
        stamp_version(&mut doc, target);

        Ok(doc)
    }

    /// Whether a raw document is older than the current format
    pub fn needs_migration(&self, raw: &Value) -> bool {
        FormatVersion::of_baseline(raw)
            .map(|v| v < FormatVersion::current())
            .unwrap_or(false)
    }

    /// Describe what migrating a raw document to the current format would do
    pub fn migration_info(&self, raw: &Value) -> MigrationInfo {
        let target = FormatVersion::current();
        let current_version = FormatVersion::of_baseline(raw);

        let (needs_migration, can_migrate, migrations) = match current_version {
            Some(source) => (
                source < target,
                self.can_migrate(source, target),
                self.migrations_to_apply(source, target)
                    .into_iter()
                    .map(|m| format!("{}: {}", m.version, m.description))
                    .collect(),
            ),
            None => (false, false, Vec::new()),
        };

        MigrationInfo {
            current_version,
            target_version: target,
            needs_migration,
            can_migrate,
            migrations,
        }
    }
}

fn stamp_version(doc: &mut Value, version: FormatVersion) {
    if let Some(obj) = doc.as_object_mut() {
        obj.insert("version".to_string(), Value::String(version.to_string()));
    }
}

fn ensure_array(obj: &mut Map<String, Value>, key: &str) {
    if !obj.get(key).map(Value::is_array).unwrap_or(false) {
        obj.insert(key.to_string(), Value::Array(Vec::new()));
    }
}

/// 1.0.0 -> 1.1.0
fn migrate_to_1_1_0(mut doc: Value) -> Value {
    let Some(obj) = doc.as_object_mut() else {
        return doc;
    };

    let mut snapshot = Vec::new();
    if let Some(tools) = obj.get_mut("tools").and_then(Value::as_array_mut) {
        for tool in tools.iter_mut().filter_map(Value::as_object_mut) {
            ensure_array(tool, "assertions");
            ensure_array(tool, "securityNotes");
            ensure_array(tool, "limitations");

            let mut entry = Map::new();
            for key in ["name", "description", "inputSchema"] {
                if let Some(value) = tool.get(key) {
                    entry.insert(key.to_string(), value.clone());
                }
            }
            snapshot.push(Value::Object(entry));
        }
    }

    let capabilities = obj
        .entry("capabilities")
        .or_insert_with(|| json!({}));
    if let Some(caps) = capabilities.as_object_mut() {
        caps.entry("tools").or_insert(Value::Array(snapshot));
    }

    doc
}

/// Top-level run fields that live in `metadata` from 2.0.0 on
const RUN_FIELDS: &[(&str, &str)] = &[
    ("createdAt", "generatedAt"),
    ("mode", "mode"),
    ("serverCommand", "serverCommand"),
    ("toolVersion", "toolVersion"),
    ("durationMs", "durationMs"),
    ("personas", "personas"),
    ("model", "model"),
];

/// 1.1.0 -> 2.0.0
fn migrate_to_2_0_0(mut doc: Value) -> Value {
    let Some(obj) = doc.as_object_mut() else {
        return doc;
    };

    let mut metadata = match obj.remove("metadata") {
        Some(Value::Object(existing)) => existing,
        _ => Map::new(),
    };
    for (legacy, current) in RUN_FIELDS {
        if let Some(value) = obj.remove(*legacy) {
            metadata.entry(current.to_string()).or_insert(value);
        }
    }
    metadata
        .entry("mode")
        .or_insert_with(|| Value::String("check".to_string()));
    obj.insert("metadata".to_string(), Value::Object(metadata));

    if let Some(tools) = obj.remove("tools") {
        obj.entry("toolProfiles").or_insert(tools);
    }
    if let Some(hash) = obj.remove("integrityHash") {
        obj.entry("hash").or_insert(hash);
    }

    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy_baseline() -> Value {
        json!({
            "version": 1,
            "createdAt": "2024-01-15T10:30:00.000Z",
            "serverCommand": "npx server-filesystem /tmp",
            "mode": "check",
            "server": {"name": "filesystem", "version": "0.6.0", "protocolVersion": "2024-11-05"},
            "tools": [
                {"name": "read_file", "description": "Read a file", "schemaHash": "abcd1234abcd1234",
                 "inputSchema": {"type": "object", "properties": {"path": {"type": "string"}}}}
            ],
            "integrityHash": "0000000000000000"
        })
    }

    fn add_marker(mut doc: Value) -> Value {
        if let Some(obj) = doc.as_object_mut() {
            let count = obj.get("marker").and_then(Value::as_u64).unwrap_or(0);
            obj.insert("marker".to_string(), json!(count + 1));
        }
        doc
    }

    fn record_version(mut doc: Value) -> Value {
        let seen = doc.get("version").cloned().unwrap_or(Value::Null);
        if let Some(seen_list) = doc
            .as_object_mut()
            .and_then(|obj| obj.entry("seen").or_insert_with(|| json!([])).as_array_mut())
        {
            seen_list.push(seen);
        }
        doc
    }

    #[test]
    fn test_register_requires_increasing_versions() {
        let mut registry = MigrationRegistry::new();
        registry
            .register(Migration::new(FormatVersion::new(1, 1, 0), "a", add_marker))
            .unwrap();

        let err = registry
            .register(Migration::new(FormatVersion::new(1, 1, 0), "b", add_marker))
            .unwrap_err();
        assert!(matches!(err, MigrationError::NotMonotonic { .. }));

        assert!(registry
            .register(Migration::new(FormatVersion::new(1, 0, 5), "c", add_marker))
            .is_err());
        assert_eq!(registry.migrations().len(), 1);
    }

    #[test]
    fn test_migrations_to_apply_range() {
        let registry = MigrationRegistry::new()
            .with_migration(Migration::new(FormatVersion::new(1, 1, 0), "a", add_marker))
            .and_then(|r| r.with_migration(Migration::new(FormatVersion::new(1, 2, 0), "b", add_marker)))
            .and_then(|r| r.with_migration(Migration::new(FormatVersion::new(2, 0, 0), "c", add_marker)))
            .unwrap();

        let versions: Vec<String> = registry
            .migrations_to_apply(FormatVersion::new(1, 1, 0), FormatVersion::new(2, 0, 0))
            .iter()
            .map(|m| m.version.to_string())
            .collect();

        assert_eq!(versions, vec!["1.2.0", "2.0.0"]);
        assert!(registry
            .migrations_to_apply(FormatVersion::new(2, 0, 0), FormatVersion::new(2, 0, 0))
            .is_empty());
    }

    #[test]
    fn test_migrate_stamps_each_step() {
        let registry = MigrationRegistry::new()
            .with_migration(Migration::new(FormatVersion::new(1, 1, 0), "a", record_version))
            .and_then(|r| r.with_migration(Migration::new(FormatVersion::new(1, 2, 0), "b", record_version)))
            .unwrap();

        let migrated = registry
            .migrate_baseline(json!({"version": "1.0.0"}), FormatVersion::new(1, 3, 0))
            .unwrap();

        assert_eq!(migrated["seen"], json!(["1.0.0", "1.1.0"]));
        assert_eq!(migrated["version"], "1.3.0");
    }

    #[test]
    fn test_migrate_same_version_unchanged() {
        let registry = MigrationRegistry::new()
            .with_migration(Migration::new(FormatVersion::new(1, 1, 0), "a", add_marker))
            .unwrap();
        let doc = json!({"version": "1.1.0", "x": 1});

        let migrated = registry
            .migrate_baseline(doc.clone(), FormatVersion::new(1, 1, 0))
            .unwrap();

        assert_eq!(migrated, doc);
    }

    #[test]
    fn test_migrate_downgrade_rejected() {
        let registry = MigrationRegistry::standard();

        let err = registry
            .migrate_baseline(json!({"version": "2.0.0"}), FormatVersion::new(1, 0, 0))
            .unwrap_err();

        assert!(matches!(err, BaselineError::MigrationDowngrade { .. }));
    }

    #[test]
    fn test_migrate_missing_version() {
        let err = MigrationRegistry::standard()
            .migrate_baseline(json!({"tools": []}), FormatVersion::current())
            .unwrap_err();

        assert!(matches!(err, BaselineError::InvalidFormat { .. }));
    }

    #[test]
    fn test_standard_chain_upgrades_legacy_layout() {
        let migrated = MigrationRegistry::standard()
            .migrate_baseline(legacy_baseline(), FormatVersion::current())
            .unwrap();

        assert_eq!(migrated["version"], "2.0.0");
        assert_eq!(migrated["metadata"]["generatedAt"], "2024-01-15T10:30:00.000Z");
        assert_eq!(migrated["metadata"]["serverCommand"], "npx server-filesystem /tmp");
        assert_eq!(migrated["metadata"]["mode"], "check");
        assert_eq!(migrated["hash"], "0000000000000000");
        assert!(migrated.get("tools").is_none());
        assert!(migrated.get("integrityHash").is_none());
        assert!(migrated.get("createdAt").is_none());

        let tool = &migrated["toolProfiles"][0];
        assert_eq!(tool["name"], "read_file");
        assert_eq!(tool["assertions"], json!([]));
        assert_eq!(tool["securityNotes"], json!([]));

        assert_eq!(migrated["capabilities"]["tools"][0]["name"], "read_file");
        assert!(migrated["capabilities"]["tools"][0]["inputSchema"].is_object());
    }

    #[test]
    fn test_needs_migration_and_info() {
        let registry = MigrationRegistry::standard();
        let legacy = legacy_baseline();

        assert!(registry.needs_migration(&legacy));
        assert!(!registry.needs_migration(&json!({"version": "2.0.0"})));
        assert!(!registry.needs_migration(&json!({})));

        let info = registry.migration_info(&legacy);
        assert_eq!(info.current_version, Some(FormatVersion::new(1, 0, 0)));
        assert!(info.needs_migration);
        assert!(info.can_migrate);
        assert_eq!(info.migrations.len(), 2);
        assert!(info.migrations[0].starts_with("1.1.0"));
    }
}
