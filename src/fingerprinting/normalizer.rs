//! Schema Normalizer
//!
//! Canonicalizes JSON schemas and observed call arguments so that
//! semantically equivalent inputs produce identical fingerprints regardless
//! of formatting, property ordering or documentation text.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// Keys carrying numeric, string or array constraints
pub(crate) const CONSTRAINT_KEYS: &[&str] = &[
    "minimum",
    "maximum",
    "exclusiveMinimum",
    "exclusiveMaximum",
    "multipleOf",
    "minLength",
    "maxLength",
    "pattern",
    "format",
    "minItems",
    "maxItems",
    "uniqueItems",
    "const",
];

/// Schema normalizer for consistent fingerprinting
pub struct SchemaNormalizer;

impl SchemaNormalizer {
    /// Normalize a schema for semantic fingerprinting
    ///
    /// Keeps property names, types, required sets, constraints, enums and
    /// nested structure. Drops descriptions, titles, examples and defaults.
    pub fn normalize_semantic(schema: &Value) -> Value {
        match schema {
            Value::Object(obj) => {
                let mut normalized: BTreeMap<String, Value> = BTreeMap::new();

                if let Some(type_val) = obj.get("type") {
                    normalized.insert("type".to_string(), Self::normalize_type(type_val));
                }

                if let Some(Value::Object(props)) = obj.get("properties") {
                    let norm_props: Map<String, Value> = props
                        .iter()
                        .map(|(key, val)| (key.clone(), Self::normalize_semantic(val)))
                        .collect::<BTreeMap<_, _>>()
                        .into_iter()
                        .collect();
                    normalized.insert("properties".to_string(), Value::Object(norm_props));
                }

                if let Some(Value::Array(req)) = obj.get("required") {
                    let mut required: Vec<String> = req
                        .iter()
                        .filter_map(|v| v.as_str().map(String::from))
                        .collect();
                    required.sort();
                    required.dedup();
                    normalized.insert(
                        "required".to_string(),
                        Value::Array(required.into_iter().map(Value::String).collect()),
                    );
                }

                if let Some(items) = obj.get("items") {
                    normalized.insert("items".to_string(), Self::normalize_semantic(items));
                }

                match obj.get("additionalProperties") {
                    Some(Value::Bool(b)) => {
                        normalized.insert("additionalProperties".to_string(), Value::Bool(*b));
                    }
                    Some(ap @ Value::Object(_)) => {
                        normalized.insert(
                            "additionalProperties".to_string(),
                            Self::normalize_semantic(ap),
                        );
                    }
                    _ => {}
                }

                if let Some(Value::Array(enum_vals)) = obj.get("enum") {
                    normalized.insert("enum".to_string(), Value::Array(Self::sorted_enum(enum_vals)));
                }

                for constraint in CONSTRAINT_KEYS {
                    if let Some(v) = obj.get(*constraint) {
                        normalized.insert(constraint.to_string(), v.clone());
                    }
                }

                for combiner in &["oneOf", "anyOf", "allOf"] {
                    if let Some(Value::Array(schemas)) = obj.get(*combiner) {
                        let normalized_schemas: Vec<Value> =
                            schemas.iter().map(Self::normalize_semantic).collect();
                        normalized.insert(combiner.to_string(), Value::Array(normalized_schemas));
                    }
                }

                Value::Object(normalized.into_iter().collect())
            }
            Value::Array(arr) => Value::Array(arr.iter().map(Self::normalize_semantic).collect()),
            other => other.clone(),
        }
    }

    /// Reduce observed call arguments to a type-only shape
    ///
    /// `{"path": "/tmp/a", "lines": [1, 2]}` becomes
    /// `{"lines": ["integer"], "path": "string"}`. Array shapes keep one
    /// entry per distinct element shape so list length does not matter.
    pub fn arg_shape(args: &Value) -> Value {
        match args {
            Value::Object(obj) => Value::Object(
                obj.iter()
                    .map(|(k, v)| (k.clone(), Self::arg_shape(v)))
                    .collect::<BTreeMap<_, _>>()
                    .into_iter()
                    .collect(),
            ),
            Value::Array(arr) => {
                let mut shapes: Vec<Value> = Vec::new();
                for item in arr {
                    let shape = Self::arg_shape(item);
                    if !shapes.contains(&shape) {
                        shapes.push(shape);
                    }
                }
                shapes.sort_by_key(|s| s.to_string());
                Value::Array(shapes)
            }
            Value::String(_) => Value::String("string".to_string()),
            Value::Number(n) if n.is_f64() => Value::String("number".to_string()),
            Value::Number(_) => Value::String("integer".to_string()),
            Value::Bool(_) => Value::String("boolean".to_string()),
            Value::Null => Value::String("null".to_string()),
        }
    }

    /// Canonicalize a type string
    pub fn canonicalize_type(type_str: &str) -> String {
        match type_str.to_lowercase().as_str() {
            "string" | "str" | "text" => "string".to_string(),
            "number" | "float" | "double" | "decimal" => "number".to_string(),
            "integer" | "int" | "long" => "integer".to_string(),
            "boolean" | "bool" => "boolean".to_string(),
            "object" | "map" | "dict" => "object".to_string(),
            "array" | "list" | "vec" => "array".to_string(),
            "null" | "nil" | "none" => "null".to_string(),
            other => other.to_string(),
        }
    }

    /// Extract the canonical type of a property schema
    pub fn extract_type(value: &Value) -> String {
        if let Some(obj) = value.as_object() {
            if let Some(type_val) = obj.get("type") {
                return match Self::normalize_type(type_val) {
                    Value::String(s) => s,
                    _ => "unknown".to_string(),
                };
            }

            if obj.contains_key("properties") {
                return "object".to_string();
            }
            if obj.contains_key("items") {
                return "array".to_string();
            }
            if obj.contains_key("enum") {
                return "enum".to_string();
            }
            if obj.contains_key("oneOf") || obj.contains_key("anyOf") {
                return "union".to_string();
            }
        }

        "unknown".to_string()
    }

    /// Normalize a type value (`["null", "String"]` becomes `"null|string"`)
    fn normalize_type(type_val: &Value) -> Value {
        match type_val {
            Value::String(s) => Value::String(Self::canonicalize_type(s)),
            Value::Array(arr) => {
                let mut types: Vec<String> = arr
                    .iter()
                    .filter_map(|v| v.as_str())
                    .map(Self::canonicalize_type)
                    .collect();
                types.sort();
                types.dedup();
                Value::String(types.join("|"))
            }
            other => other.clone(),
        }
    }

    /// Sort enum values by their JSON encoding
    pub(crate) fn sorted_enum(values: &[Value]) -> Vec<Value> {
        let mut sorted = values.to_vec();
        sorted.sort_by_key(|v| v.to_string());
        sorted
    }
}
