//! Canonical Hasher
//!
//! Deterministic, key-order independent hashing of arbitrary JSON values.
//! Used for baseline integrity hashes, schema fingerprints and consensus
//! hashing of repeated observations.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use sha2::{Digest, Sha256};

/// Length of truncated hashes (first 64 bits of SHA-256)
pub const SHORT_HASH_LEN: usize = 16;

/// Hash returned by consensus hashing when no samples were observed
pub const EMPTY_CONSENSUS_HASH: &str = "empty";

/// Object keys whose string values are normalized as RFC 3339 timestamps
pub const TIMESTAMP_FIELDS: &[&str] = &[
    "generatedAt",
    "createdAt",
    "acceptedAt",
    "deprecatedAt",
    "removalDate",
    "observedAt",
    "testedAt",
];

/// Result of hashing a set of repeated observations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusHash {
    /// Most frequently observed hash
    pub hash: String,
    /// Fraction of samples that produced `hash` (0.0 - 1.0)
    pub consistency: f64,
    /// Number of distinct hashes observed
    pub variations: usize,
    /// Number of samples considered
    pub sample_count: usize,
}

impl ConsensusHash {
    /// Consensus over zero samples
    pub fn empty() -> Self {
        Self {
            hash: EMPTY_CONSENSUS_HASH.to_string(),
            consistency: 0.0,
            variations: 0,
            sample_count: 0,
        }
    }

    /// Whether any sample was observed
    pub fn is_empty(&self) -> bool {
        self.sample_count == 0
    }

    /// Whether every sample agreed on one shape
    pub fn is_unanimous(&self) -> bool {
        self.sample_count > 0 && self.variations == 1
    }
}

/// Canonical content hasher
pub struct CanonicalHasher;

impl CanonicalHasher {
    /// Hash any serializable value
    ///
    /// Returns a 16-character hex string. Values that fail to serialize
    /// hash as `null`.
    pub fn hash<T: Serialize + ?Sized>(value: &T) -> String {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        Self::hash_value(&value)
    }

    /// Hash a JSON value
    ///
    /// Object keys are sorted, timestamp fields are normalized to UTC
    /// millisecond ISO-8601 strings and integral floats collapse to integers before the
    /// canonical encoding is digested.
    pub fn hash_value(value: &Value) -> String {
        let canonical = Self::canonical_json(value);
        Self::short_hash(&canonical)
    }

    /// Canonical JSON encoding of a value
    pub fn canonical_json(value: &Value) -> String {
        let normalized = Self::normalize(value);
        serde_json::to_string(&normalized).unwrap_or_default()
    }

    /// Generate a full SHA-256 hash of a string
    ///
    /// Returns a 64-character hex string.
    pub fn hash_string(input: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(input.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Generate a short hash (first 16 chars) of a string
    pub fn short_hash(input: &str) -> String {
        let full = Self::hash_string(input);
        full[..SHORT_HASH_LEN].to_string()
    }

    /// Hash each sample and return the most frequent hash
    ///
    /// Ties resolve to the hash seen first so the result does not depend
    /// on map iteration order.
    pub fn consensus_hash(samples: &[Value]) -> ConsensusHash {
        if samples.is_empty() {
            return ConsensusHash::empty();
        }

        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut first_seen: Vec<String> = Vec::new();

        for sample in samples {
            let hash = Self::hash_value(sample);
            let count = counts.entry(hash.clone()).or_insert(0);
            if *count == 0 {
                first_seen.push(hash);
            }
            *count += 1;
        }

        let mut best = &first_seen[0];
        let mut best_count = counts[best];
        for hash in &first_seen[1..] {
            let count = counts[hash];
            if count > best_count {
                best = hash;
                best_count = count;
            }
        }

        ConsensusHash {
            hash: best.clone(),
            consistency: best_count as f64 / samples.len() as f64,
            variations: first_seen.len(),
            sample_count: samples.len(),
        }
    }

    /// Normalize a JSON value into its canonical form (recursive)
    ///
    /// Strings are treated as timestamps only under the keys listed in
    /// [`TIMESTAMP_FIELDS`].
    fn normalize(value: &Value) -> Value {
        match value {
            Value::Object(obj) => {
                let sorted: BTreeMap<&String, Value> = obj
                    .iter()
                    .map(|(k, v)| {
                        let normalized = match v {
                            Value::String(s) if TIMESTAMP_FIELDS.contains(&k.as_str()) => {
                                Value::String(Self::normalize_timestamp(s))
                            }
                            _ => Self::normalize(v),
                        };
                        (k, normalized)
                    })
                    .collect();
                let mut map = Map::new();
                for (key, val) in sorted {
                    map.insert(key.clone(), val);
                }
                Value::Object(map)
            }
            Value::Array(arr) => Value::Array(arr.iter().map(Self::normalize).collect()),
            Value::Number(n) => Value::Number(Self::normalize_number(n)),
            other => other.clone(),
        }
    }

    /// Rewrite RFC 3339 timestamps to `YYYY-MM-DDTHH:MM:SS.sssZ`
    fn normalize_timestamp(s: &str) -> String {
        // Cheap shape check before attempting a parse
        let bytes = s.as_bytes();
        if bytes.len() < 20 || bytes[4] != b'-' || bytes[7] != b'-' {
            return s.to_string();
        }
        match DateTime::parse_from_rfc3339(s) {
            Ok(ts) => ts
                .with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            Err(_) => s.to_string(),
        }
    }

    fn normalize_number(n: &Number) -> Number {
        if let Some(f) = n.as_f64() {
            if n.is_f64() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                return Number::from(f as i64);
            }
        }
        n.clone()
    }
}

/// Serde helpers that always write timestamps in UTC millisecond form
///
/// A `DateTime<Utc>` written through these helpers serializes to exactly the
/// string the hasher normalizes timestamps to.
pub mod iso_timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }

    /// Same as the parent module for `Option<DateTime<Utc>>`
    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            ts: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match ts {
                Some(ts) => super::serialize(ts, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            let raw: Option<String> = Option::deserialize(deserializer)?;
            raw.map(|raw| {
                DateTime::parse_from_rfc3339(&raw)
                    .map(|ts| ts.with_timezone(&Utc))
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
        }
    }
}
