//! Schema Fingerprinter
//!
//! Reduces a tool's input/output schema to a stable hash and computes a
//! structural diff between two schemas with per-change severity.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::diff::ChangeSeverity;

use super::hasher::{CanonicalHasher, ConsensusHash};
use super::normalizer::{SchemaNormalizer, CONSTRAINT_KEYS};

/// Generates schema fingerprints
pub struct SchemaFingerprinter;

impl SchemaFingerprinter {
    /// Stable 16-character hash of a schema's semantic content
    pub fn schema_hash(schema: &Value) -> String {
        CanonicalHasher::hash_value(&SchemaNormalizer::normalize_semantic(schema))
    }

    /// Consensus over schemas observed across several samples
    pub fn consensus_schema_hash(schemas: &[Value]) -> ConsensusHash {
        let normalized: Vec<Value> = schemas
            .iter()
            .map(SchemaNormalizer::normalize_semantic)
            .collect();
        CanonicalHasher::consensus_hash(&normalized)
    }

    /// Consensus over the argument shapes of observed calls
    pub fn observed_args_consensus<'a>(args: impl IntoIterator<Item = &'a Value>) -> ConsensusHash {
        let shapes: Vec<Value> = args.into_iter().map(SchemaNormalizer::arg_shape).collect();
        CanonicalHasher::consensus_hash(&shapes)
    }
}

/// A single structural change between two schemas
///
/// Paths are dotted property paths; `[]` marks array items
/// (`options.mode`, `files[].path`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchemaChange {
    /// A new parameter was added
    ParameterAdded {
        path: String,
        param_type: String,
        required: bool,
    },

    /// An existing parameter was removed
    ParameterRemoved {
        path: String,
        param_type: String,
        required: bool,
    },

    /// A parameter's type changed
    TypeChanged {
        path: String,
        old_type: String,
        new_type: String,
    },

    /// A parameter's required status changed
    RequiredChanged { path: String, now_required: bool },

    /// A constraint was added to a parameter
    ConstraintAdded {
        path: String,
        constraint: String,
        value: String,
    },

    /// A constraint was removed from a parameter
    ConstraintRemoved {
        path: String,
        constraint: String,
        value: String,
    },

    /// A constraint value changed
    ConstraintChanged {
        path: String,
        constraint: String,
        old_value: String,
        new_value: String,
        loosened: bool,
    },

    /// An enum gained a value
    EnumValueAdded { path: String, value: String },

    /// An enum lost a value
    EnumValueRemoved { path: String, value: String },
}

impl SchemaChange {
    /// Human-readable description of the change
    pub fn description(&self) -> String {
        match self {
            SchemaChange::ParameterAdded { path, required, .. } => {
                let req = if *required { "required" } else { "optional" };
                format!("Added {} parameter '{}'", req, path)
            }
            SchemaChange::ParameterRemoved { path, required, .. } => {
                let req = if *required { "required" } else { "optional" };
                format!("Removed {} parameter '{}'", req, path)
            }
            SchemaChange::TypeChanged {
                path,
                old_type,
                new_type,
            } => format!(
                "Type of '{}' changed from '{}' to '{}'",
                path, old_type, new_type
            ),
            SchemaChange::RequiredChanged { path, now_required } => {
                if *now_required {
                    format!("Parameter '{}' is now required", path)
                } else {
                    format!("Parameter '{}' is now optional", path)
                }
            }
            SchemaChange::ConstraintAdded {
                path,
                constraint,
                value,
            } => format!(
                "Added constraint '{}={}' to parameter '{}'",
                constraint, value, path
            ),
            SchemaChange::ConstraintRemoved {
                path,
                constraint,
                value,
            } => format!(
                "Removed constraint '{}={}' from parameter '{}'",
                constraint, value, path
            ),
            SchemaChange::ConstraintChanged {
                path,
                constraint,
                old_value,
                new_value,
                ..
            } => format!(
                "Constraint '{}' on '{}' changed from '{}' to '{}'",
                constraint, path, old_value, new_value
            ),
            SchemaChange::EnumValueAdded { path, value } => {
                format!("Enum value {} added to '{}'", value, path)
            }
            SchemaChange::EnumValueRemoved { path, value } => {
                format!("Enum value {} removed from '{}'", value, path)
            }
        }
    }

    /// Default severity of the change
    pub fn severity(&self) -> ChangeSeverity {
        match self {
            SchemaChange::ParameterAdded { required: true, .. }
            | SchemaChange::ParameterRemoved { required: true, .. }
            | SchemaChange::TypeChanged { .. }
            | SchemaChange::RequiredChanged {
                now_required: true, ..
            }
            | SchemaChange::EnumValueRemoved { .. } => ChangeSeverity::Breaking,

            SchemaChange::ParameterRemoved {
                required: false, ..
            }
            | SchemaChange::ConstraintAdded { .. }
            | SchemaChange::ConstraintChanged {
                loosened: false, ..
            } => ChangeSeverity::Warning,

            SchemaChange::ParameterAdded {
                required: false, ..
            }
            | SchemaChange::RequiredChanged {
                now_required: false,
                ..
            }
            | SchemaChange::ConstraintRemoved { .. }
            | SchemaChange::ConstraintChanged { loosened: true, .. }
            | SchemaChange::EnumValueAdded { .. } => ChangeSeverity::Info,
        }
    }

    /// Path of the parameter the change applies to
    pub fn path(&self) -> &str {
        match self {
            SchemaChange::ParameterAdded { path, .. }
            | SchemaChange::ParameterRemoved { path, .. }
            | SchemaChange::TypeChanged { path, .. }
            | SchemaChange::RequiredChanged { path, .. }
            | SchemaChange::ConstraintAdded { path, .. }
            | SchemaChange::ConstraintRemoved { path, .. }
            | SchemaChange::ConstraintChanged { path, .. }
            | SchemaChange::EnumValueAdded { path, .. }
            | SchemaChange::EnumValueRemoved { path, .. } => path,
        }
    }
}

/// Structural diff between two schemas
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaDiff {
    /// Detected changes in traversal order
    pub changes: Vec<SchemaChange>,
}

impl SchemaDiff {
    /// Compare two schemas
    pub fn between(old: &Value, new: &Value) -> Self {
        let mut changes = Vec::new();
        diff_node("", old, new, &mut changes);
        Self { changes }
    }

    /// Whether no structural change was found
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Highest severity among the changes
    pub fn severity(&self) -> ChangeSeverity {
        self.changes
            .iter()
            .map(SchemaChange::severity)
            .max()
            .unwrap_or(ChangeSeverity::None)
    }

    /// Whether any change breaks existing callers
    pub fn is_breaking(&self) -> bool {
        self.severity() == ChangeSeverity::Breaking
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "(root)".to_string()
    } else {
        path.to_string()
    }
}

fn properties(node: &Value) -> BTreeMap<&str, &Value> {
    node.get("properties")
        .and_then(Value::as_object)
        .map(|props| props.iter().map(|(k, v)| (k.as_str(), v)).collect())
        .unwrap_or_default()
}

fn required(node: &Value) -> BTreeSet<&str> {
    node.get("required")
        .and_then(Value::as_array)
        .map(|req| req.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

fn empty_object() -> &'static Value {
    static EMPTY: std::sync::OnceLock<Value> = std::sync::OnceLock::new();
    EMPTY.get_or_init(|| Value::Object(Map::new()))
}

/// Compare one schema node: constraints, enum, nested properties and items
fn diff_node(path: &str, old: &Value, new: &Value, changes: &mut Vec<SchemaChange>) {
    let old = if old.is_object() { old } else { empty_object() };
    let new = if new.is_object() { new } else { empty_object() };

    diff_constraints(path, old, new, changes);
    diff_enum(path, old, new, changes);

    let old_props = properties(old);
    let new_props = properties(new);
    let old_required = required(old);
    let new_required = required(new);

    for (name, schema) in &new_props {
        if !old_props.contains_key(name) {
            changes.push(SchemaChange::ParameterAdded {
                path: join_path(path, name),
                param_type: SchemaNormalizer::extract_type(schema),
                required: new_required.contains(name),
            });
        }
    }

    for (name, schema) in &old_props {
        if !new_props.contains_key(name) {
            changes.push(SchemaChange::ParameterRemoved {
                path: join_path(path, name),
                param_type: SchemaNormalizer::extract_type(schema),
                required: old_required.contains(name),
            });
        }
    }

    for (name, old_schema) in &old_props {
        let Some(new_schema) = new_props.get(name) else {
            continue;
        };
        let child = join_path(path, name);

        let was_required = old_required.contains(name);
        let is_required = new_required.contains(name);
        if was_required != is_required {
            changes.push(SchemaChange::RequiredChanged {
                path: child.clone(),
                now_required: is_required,
            });
        }

        let old_type = SchemaNormalizer::extract_type(old_schema);
        let new_type = SchemaNormalizer::extract_type(new_schema);
        if old_type != new_type {
            changes.push(SchemaChange::TypeChanged {
                path: child,
                old_type,
                new_type,
            });
            continue;
        }

        diff_node(&child, old_schema, new_schema, changes);
    }

    if let (Some(old_items), Some(new_items)) = (old.get("items"), new.get("items")) {
        let items_path = format!("{}[]", path);
        let old_type = SchemaNormalizer::extract_type(old_items);
        let new_type = SchemaNormalizer::extract_type(new_items);
        if old_type != new_type {
            changes.push(SchemaChange::TypeChanged {
                path: items_path,
                old_type,
                new_type,
            });
        } else {
            diff_node(&items_path, old_items, new_items, changes);
        }
    }
}

fn diff_constraints(path: &str, old: &Value, new: &Value, changes: &mut Vec<SchemaChange>) {
    for constraint in CONSTRAINT_KEYS {
        match (old.get(*constraint), new.get(*constraint)) {
            (None, Some(value)) => changes.push(SchemaChange::ConstraintAdded {
                path: display_path(path),
                constraint: constraint.to_string(),
                value: value.to_string(),
            }),
            (Some(value), None) => changes.push(SchemaChange::ConstraintRemoved {
                path: display_path(path),
                constraint: constraint.to_string(),
                value: value.to_string(),
            }),
            (Some(old_value), Some(new_value)) if old_value != new_value => {
                changes.push(SchemaChange::ConstraintChanged {
                    path: display_path(path),
                    constraint: constraint.to_string(),
                    old_value: old_value.to_string(),
                    new_value: new_value.to_string(),
                    loosened: is_loosened(constraint, old_value, new_value),
                })
            }
            _ => {}
        }
    }
}

/// Whether a changed constraint accepts strictly more inputs than before
fn is_loosened(constraint: &str, old: &Value, new: &Value) -> bool {
    match (old.as_f64(), new.as_f64()) {
        (Some(o), Some(n)) => match constraint {
            "maximum" | "exclusiveMaximum" | "maxLength" | "maxItems" => n > o,
            "minimum" | "exclusiveMinimum" | "minLength" | "minItems" => n < o,
            _ => false,
        },
        _ => constraint == "uniqueItems" && old == &Value::Bool(true) && new == &Value::Bool(false),
    }
}

fn diff_enum(path: &str, old: &Value, new: &Value, changes: &mut Vec<SchemaChange>) {
    let (Some(old_enum), Some(new_enum)) = (
        old.get("enum").and_then(Value::as_array),
        new.get("enum").and_then(Value::as_array),
    ) else {
        return;
    };

    for value in SchemaNormalizer::sorted_enum(new_enum) {
        if !old_enum.contains(&value) {
            changes.push(SchemaChange::EnumValueAdded {
                path: display_path(path),
                value: value.to_string(),
            });
        }
    }
    for value in SchemaNormalizer::sorted_enum(old_enum) {
        if !new_enum.contains(&value) {
            changes.push(SchemaChange::EnumValueRemoved {
                path: display_path(path),
                value: value.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File path" },
                "encoding": { "type": "string", "enum": ["utf8", "base64"] }
            },
            "required": ["path"]
        })
    }

    #[test]
    fn test_hash_ignores_declaration_order() {
        let reordered = json!({
            "required": ["path"],
            "properties": {
                "encoding": { "enum": ["base64", "utf8"], "type": "string" },
                "path": { "type": "string", "description": "Another description" }
            },
            "type": "object"
        });

        assert_eq!(
            SchemaFingerprinter::schema_hash(&base_schema()),
            SchemaFingerprinter::schema_hash(&reordered)
        );
    }

    #[test]
    fn test_hash_detects_structural_changes() {
        let original = SchemaFingerprinter::schema_hash(&base_schema());

        let mut added = base_schema();
        added["properties"]["mode"] = json!({"type": "string"});
        let mut retyped = base_schema();
        retyped["properties"]["path"]["type"] = json!("array");
        let mut required = base_schema();
        required["required"] = json!(["path", "encoding"]);
        let mut removed = base_schema();
        removed["properties"]
            .as_object_mut()
            .unwrap()
            .remove("encoding");

        for changed in [added, retyped, required, removed] {
            assert_ne!(original, SchemaFingerprinter::schema_hash(&changed));
        }
    }

    #[test]
    fn test_identical_schemas_have_no_diff() {
        let diff = SchemaDiff::between(&base_schema(), &base_schema());

        assert!(diff.is_empty());
        assert_eq!(diff.severity(), ChangeSeverity::None);
    }

    #[test]
    fn test_required_parameter_added_is_breaking() {
        let mut new = base_schema();
        new["properties"]["mode"] = json!({"type": "string"});
        new["required"] = json!(["path", "mode"]);

        let diff = SchemaDiff::between(&base_schema(), &new);

        assert_eq!(diff.changes.len(), 1);
        assert!(matches!(
            &diff.changes[0],
            SchemaChange::ParameterAdded { path, required: true, .. } if path == "mode"
        ));
        assert!(diff.is_breaking());
    }

    #[test]
    fn test_optional_parameter_added_is_info() {
        let mut new = base_schema();
        new["properties"]["mode"] = json!({"type": "string"});

        let diff = SchemaDiff::between(&base_schema(), &new);

        assert_eq!(diff.severity(), ChangeSeverity::Info);
    }

    #[test]
    fn test_existing_parameter_becomes_required() {
        let mut new = base_schema();
        new["required"] = json!(["path", "encoding"]);

        let diff = SchemaDiff::between(&base_schema(), &new);

        assert_eq!(
            diff.changes,
            vec![SchemaChange::RequiredChanged {
                path: "encoding".to_string(),
                now_required: true
            }]
        );
        assert_eq!(diff.severity(), ChangeSeverity::Breaking);
    }

    #[test]
    fn test_type_change_is_breaking() {
        let mut new = base_schema();
        new["properties"]["path"]["type"] = json!("array");

        let diff = SchemaDiff::between(&base_schema(), &new);

        assert!(diff.changes.iter().any(|c| matches!(
            c,
            SchemaChange::TypeChanged { path, old_type, new_type }
                if path == "path" && old_type == "string" && new_type == "array"
        )));
        assert!(diff.is_breaking());
    }

    #[test]
    fn test_removed_optional_parameter_is_warning() {
        let mut new = base_schema();
        new["properties"]
            .as_object_mut()
            .unwrap()
            .remove("encoding");

        let diff = SchemaDiff::between(&base_schema(), &new);

        assert_eq!(diff.severity(), ChangeSeverity::Warning);
    }

    #[test]
    fn test_enum_changes() {
        let mut new = base_schema();
        new["properties"]["encoding"]["enum"] = json!(["utf8", "hex"]);

        let diff = SchemaDiff::between(&base_schema(), &new);

        assert!(diff.changes.iter().any(|c| matches!(
            c,
            SchemaChange::EnumValueAdded { value, .. } if value == "\"hex\""
        )));
        assert!(diff.changes.iter().any(|c| matches!(
            c,
            SchemaChange::EnumValueRemoved { value, .. } if value == "\"base64\""
        )));
        assert!(diff.is_breaking());
    }

    #[test]
    fn test_constraint_loosening_is_info() {
        let old = json!({"type": "object", "properties": {"n": {"type": "integer", "maximum": 10}}});
        let looser = json!({"type": "object", "properties": {"n": {"type": "integer", "maximum": 100}}});
        let tighter = json!({"type": "object", "properties": {"n": {"type": "integer", "maximum": 5}}});
        let removed = json!({"type": "object", "properties": {"n": {"type": "integer"}}});

        assert_eq!(SchemaDiff::between(&old, &looser).severity(), ChangeSeverity::Info);
        assert_eq!(SchemaDiff::between(&old, &tighter).severity(), ChangeSeverity::Warning);
        assert_eq!(SchemaDiff::between(&old, &removed).severity(), ChangeSeverity::Info);
        assert_eq!(SchemaDiff::between(&removed, &old).severity(), ChangeSeverity::Warning);
    }

    #[test]
    fn test_nested_paths() {
        let old = json!({
            "type": "object",
            "properties": {
                "options": {
                    "type": "object",
                    "properties": { "depth": { "type": "integer" } }
                },
                "files": {
                    "type": "array",
                    "items": { "type": "object", "properties": { "path": { "type": "string" } } }
                }
            }
        });
        let mut new = old.clone();
        new["properties"]["options"]["properties"]["depth"]["type"] = json!("string");
        new["properties"]["files"]["items"]["required"] = json!(["path"]);

        let diff = SchemaDiff::between(&old, &new);
        let paths: Vec<&str> = diff.changes.iter().map(SchemaChange::path).collect();

        assert!(paths.contains(&"options.depth"));
        assert!(paths.contains(&"files[].path"));
    }

    #[test]
    fn test_observed_args_consensus() {
        let calls = [
            json!({"path": "/a"}),
            json!({"path": "/b"}),
            json!({"path": 3}),
        ];

        let consensus = SchemaFingerprinter::observed_args_consensus(calls.iter());

        assert_eq!(consensus.variations, 2);
        assert!((consensus.consistency - 2.0 / 3.0).abs() < f64::EPSILON);
    }
}
