//! Drift configuration loaded from TOML
//!
//! ```toml
//! [severity]
//! minimum_severity = "info"
//! fail_on_severity = "breaking"
//! suppress_warnings = false
//!
//! [severity.overrides]
//! description = "none"
//!
//! [compare]
//! performance_threshold = 0.25
//! ignore_description_changes = true
//! tools = ["read_file", "write_file"]
//! ```

use std::path::{Path, PathBuf};

use crate::diff::{Aspect, ChangeSeverity, CompareOptions, SeverityConfig};

/// Configuration for comparisons and the severity policy
#[derive(Debug, Clone, Default)]
pub struct DriftConfig {
    pub severity: SeverityConfig,
    pub compare: CompareOptions,
}

impl DriftConfig {
    /// Load configuration from a TOML config file
    ///
    /// Looks for config in:
    /// 1. Specified path (if provided)
    /// 2. .mcpdrift.toml in current directory
    /// 3. mcpdrift.toml in current directory
    /// 4. ~/.config/mcpdrift/config.toml
    pub fn load_from_file(path: Option<&Path>) -> Result<Self, ConfigLoadError> {
        let config_paths = match path {
            Some(p) => vec![p.to_path_buf()],
            None => Self::search_paths(),
        };

        for config_path in &config_paths {
            if config_path.is_file() {
                tracing::debug!("Loading config from {}", config_path.display());
                return Self::load_from_path(config_path);
            }
        }

        Err(ConfigLoadError::NotFound)
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(".mcpdrift.toml"), PathBuf::from("mcpdrift.toml")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("mcpdrift").join("config.toml"));
        }
        paths
    }

    fn load_from_path(path: &Path) -> Result<Self, ConfigLoadError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigLoadError::ReadError(e.to_string()))?;

        Self::parse_toml(&content)
    }

    /// Parse config from TOML content
    ///
    /// Both sections are optional; absent keys keep their defaults.
    pub fn parse_toml(content: &str) -> Result<Self, ConfigLoadError> {
        let table: toml::Table = content
            .parse()
            .map_err(|e: toml::de::Error| ConfigLoadError::ParseError(e.to_string()))?;

        let mut config = DriftConfig::default();

        if let Some(section) = table.get("severity") {
            let section = section
                .as_table()
                .ok_or_else(|| ConfigLoadError::invalid("severity", "expected a table"))?;
            config.severity = parse_severity_section(section)?;
        }

        if let Some(section) = table.get("compare") {
            let section = section
                .as_table()
                .ok_or_else(|| ConfigLoadError::invalid("compare", "expected a table"))?;
            config.compare = parse_compare_section(section)?;
        }

        Ok(config)
    }

    /// Try to load from file, falling back to defaults
    ///
    /// An explicitly requested file must exist and parse.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigLoadError> {
        match Self::load_from_file(path) {
            Ok(config) => Ok(config),
            Err(ConfigLoadError::NotFound) if path.is_none() => {
                tracing::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }
}

fn parse_severity(key: &str, value: &toml::Value) -> Result<ChangeSeverity, ConfigLoadError> {
    value
        .as_str()
        .and_then(ChangeSeverity::parse)
        .ok_or_else(|| ConfigLoadError::invalid(key, "expected one of none, info, warning, breaking"))
}

fn parse_bool(key: &str, value: &toml::Value) -> Result<bool, ConfigLoadError> {
    value
        .as_bool()
        .ok_or_else(|| ConfigLoadError::invalid(key, "expected a boolean"))
}

fn parse_severity_section(section: &toml::Table) -> Result<SeverityConfig, ConfigLoadError> {
    let mut config = SeverityConfig::default();

    if let Some(value) = section.get("minimum_severity") {
        config.minimum_severity = parse_severity("severity.minimum_severity", value)?;
    }

    if let Some(value) = section.get("fail_on_severity") {
        config.fail_on_severity = parse_severity("severity.fail_on_severity", value)?;
    }

    if let Some(value) = section.get("suppress_warnings") {
        config.suppress_warnings = parse_bool("severity.suppress_warnings", value)?;
    }

    if let Some(overrides) = section.get("overrides") {
        let overrides = overrides
            .as_table()
            .ok_or_else(|| ConfigLoadError::invalid("severity.overrides", "expected a table"))?;
        for (name, value) in overrides {
            let key = format!("severity.overrides.{}", name);
            let aspect = Aspect::parse(name)
                .ok_or_else(|| ConfigLoadError::invalid(&key, "unknown aspect"))?;
            config.aspect_overrides.insert(aspect, parse_severity(&key, value)?);
        }
    }

    Ok(config)
}

fn parse_compare_section(section: &toml::Table) -> Result<CompareOptions, ConfigLoadError> {
    let mut options = CompareOptions::default();

    let flags: [(&str, &mut bool); 7] = [
        ("ignore_schema_changes", &mut options.ignore_schema_changes),
        ("ignore_description_changes", &mut options.ignore_description_changes),
        (
            "ignore_response_structure_changes",
            &mut options.ignore_response_structure_changes,
        ),
        ("ignore_error_pattern_changes", &mut options.ignore_error_pattern_changes),
        ("ignore_security_changes", &mut options.ignore_security_changes),
        ("ignore_performance_changes", &mut options.ignore_performance_changes),
        ("ignore_version_mismatch", &mut options.ignore_version_mismatch),
    ];
    for (name, slot) in flags {
        if let Some(value) = section.get(name) {
            *slot = parse_bool(&format!("compare.{}", name), value)?;
        }
    }

    if let Some(value) = section.get("performance_threshold") {
        // Integers are accepted so `performance_threshold = 1` works
        let threshold = value
            .as_float()
            .or_else(|| value.as_integer().map(|i| i as f64))
            .filter(|t| t.is_finite() && *t >= 0.0)
            .ok_or_else(|| {
                ConfigLoadError::invalid("compare.performance_threshold", "expected a non-negative number")
            })?;
        options.performance_threshold = threshold;
    }

    if let Some(value) = section.get("tools") {
        let tools = value
            .as_array()
            .and_then(|items| {
                items
                    .iter()
                    .map(|item| item.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
            })
            .ok_or_else(|| ConfigLoadError::invalid("compare.tools", "expected an array of strings"))?;
        options.tools = Some(tools);
    }

    Ok(options)
}

/// Error type for config loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Config file not found")]
    NotFound,

    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config file: {0}")]
    ParseError(String),

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

impl ConfigLoadError {
    fn invalid(key: &str, reason: &str) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        let config = DriftConfig::parse_toml("").unwrap();

        assert_eq!(config.severity, SeverityConfig::default());
        assert_eq!(config.compare.performance_threshold, 0.10);
        assert!(config.compare.tools.is_none());
    }

    #[test]
    fn test_full_config() {
        let config = DriftConfig::parse_toml(
            r#"
            [severity]
            minimum_severity = "info"
            fail_on_severity = "warning"
            suppress_warnings = true

            [severity.overrides]
            description = "none"
            response-structure = "breaking"

            [compare]
            performance_threshold = 0.25
            ignore_description_changes = true
            tools = ["read_file"]
            "#,
        )
        .unwrap();

        assert_eq!(config.severity.minimum_severity, ChangeSeverity::Info);
        assert_eq!(config.severity.fail_on_severity, ChangeSeverity::Warning);
        assert!(config.severity.suppress_warnings);
        assert_eq!(
            config.severity.aspect_overrides.get(&Aspect::Description),
            Some(&ChangeSeverity::None)
        );
        assert_eq!(
            config.severity.aspect_overrides.get(&Aspect::ResponseStructure),
            Some(&ChangeSeverity::Breaking)
        );
        assert_eq!(config.compare.performance_threshold, 0.25);
        assert!(config.compare.ignore_description_changes);
        assert!(!config.compare.ignore_schema_changes);
        assert_eq!(config.compare.tools, Some(vec!["read_file".to_string()]));
    }

    #[test]
    fn test_invalid_values() {
        let bad_severity = DriftConfig::parse_toml("[severity]\nfail_on_severity = \"fatal\"");
        assert!(matches!(bad_severity, Err(ConfigLoadError::InvalidValue { .. })));

        let bad_aspect = DriftConfig::parse_toml("[severity.overrides]\nlatency = \"info\"");
        assert!(matches!(bad_aspect, Err(ConfigLoadError::InvalidValue { .. })));

        let bad_tools = DriftConfig::parse_toml("[compare]\ntools = [1, 2]");
        assert!(matches!(bad_tools, Err(ConfigLoadError::InvalidValue { .. })));

        let malformed = DriftConfig::parse_toml("[severity");
        assert!(matches!(malformed, Err(ConfigLoadError::ParseError(_))));
    }

    #[test]
    fn test_load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drift.toml");
        std::fs::write(&path, "[compare]\nperformance_threshold = 1\n").unwrap();

        let config = DriftConfig::load_or_default(Some(&path)).unwrap();
        assert_eq!(config.compare.performance_threshold, 1.0);

        let missing = DriftConfig::load_or_default(Some(&dir.path().join("missing.toml")));
        assert!(matches!(missing, Err(ConfigLoadError::NotFound)));
    }
}
