//! Baseline format versioning
//!
//! Baselines record the format version they were written with. Versions
//! are three-component semver; legacy files may carry a bare integer,
//! which normalizes to `N.0.0`. Older files are upgraded in place by the
//! [`MigrationRegistry`].

mod migration;

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

pub use migration::{Migration, MigrationFn, MigrationInfo, MigrationRegistry};

/// Format version written by this build
pub const CURRENT_FORMAT_VERSION: &str = "2.0.0";

/// A baseline format version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FormatVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl FormatVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// The format version written by this build
    pub const fn current() -> Self {
        Self::new(2, 0, 0)
    }

    /// Parse `"M.m.p"`, `"M.m"` or `"M"`
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }

        let mut parts = [0u32; 3];
        let mut count = 0;
        for part in s.split('.') {
            if count == 3 || part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            parts[count] = part.parse().ok()?;
            count += 1;
        }

        Some(Self::new(parts[0], parts[1], parts[2]))
    }

    /// Read a version from a JSON string or non-negative integer
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Self::parse(s),
            Value::Number(n) => n
                .as_u64()
                .and_then(|major| u32::try_from(major).ok())
                .map(|major| Self::new(major, 0, 0)),
            _ => None,
        }
    }

    /// The `version` field of a raw baseline document
    pub fn of_baseline(raw: &Value) -> Option<Self> {
        raw.get("version").and_then(Self::from_value)
    }
}

impl Default for FormatVersion {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl std::str::FromStr for FormatVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid format version: '{}'", s))
    }
}

impl Serialize for FormatVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FormatVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid format version: {}", value)))
    }
}

/// Result of checking whether two format versions can be compared
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionCompatibility {
    pub compatible: bool,
    pub source_version: FormatVersion,
    pub target_version: FormatVersion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Whether data written at `source` can be read as `target`
///
/// Compatible when the major versions match and `source` is not newer than
/// `target`.
pub fn are_versions_compatible(source: FormatVersion, target: FormatVersion) -> VersionCompatibility {
    let warning = if source > target {
        Some(format!(
            "Baseline format {} is newer than {}; upgrade mcpdrift to compare these baselines",
            source, target
        ))
    } else if source.major != target.major {
        Some(format!(
            "Baseline format {} has a different major version than {}; run 'mcpdrift migrate' first",
            source, target
        ))
    } else {
        None
    };

    VersionCompatibility {
        compatible: warning.is_none(),
        source_version: source,
        target_version: target,
        warning,
    }
}
