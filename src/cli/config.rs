//! CLI Configuration Structs
//!
//! Bundle command arguments so command functions stay small, and merge
//! command-line overrides on top of the file configuration.

use std::path::PathBuf;

use crate::config::{ConfigLoadError, DriftConfig};
use crate::diff::{Aspect, ChangeSeverity};

/// Configuration for comparing two baselines
#[derive(Debug, Clone, Default)]
pub struct CompareRunConfig {
    /// Baseline treated as the reference
    pub previous: PathBuf,
    /// Baseline checked for drift
    pub current: PathBuf,
    /// Explicit config file
    pub config_path: Option<PathBuf>,
    pub fail_on: Option<ChangeSeverity>,
    pub minimum_severity: Option<ChangeSeverity>,
    pub tools: Option<Vec<String>>,
    pub ignore: Vec<Aspect>,
    pub performance_threshold: Option<f64>,
    /// Load baselines whose stored hash does not match
    pub skip_integrity_check: bool,
}

impl CompareRunConfig {
    pub fn new(previous: impl Into<PathBuf>, current: impl Into<PathBuf>) -> Self {
        Self {
            previous: previous.into(),
            current: current.into(),
            ..Default::default()
        }
    }

    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn with_fail_on(mut self, severity: Option<ChangeSeverity>) -> Self {
        self.fail_on = severity;
        self
    }

    pub fn with_minimum_severity(mut self, severity: Option<ChangeSeverity>) -> Self {
        self.minimum_severity = severity;
        self
    }

    pub fn with_tools(mut self, tools: Option<Vec<String>>) -> Self {
        self.tools = tools.filter(|t| !t.is_empty());
        self
    }

    pub fn with_ignore(mut self, aspects: Vec<Aspect>) -> Self {
        self.ignore = aspects;
        self
    }

    pub fn with_performance_threshold(mut self, threshold: Option<f64>) -> Self {
        self.performance_threshold = threshold;
        self
    }

    pub fn with_skip_integrity_check(mut self, skip: bool) -> Self {
        self.skip_integrity_check = skip;
        self
    }

    /// Load the file configuration and apply command-line overrides
    pub fn resolve(&self) -> Result<DriftConfig, ConfigLoadError> {
        let mut config = DriftConfig::load_or_default(self.config_path.as_deref())?;

        if let Some(severity) = self.fail_on {
            config.severity.fail_on_severity = severity;
        }
        if let Some(severity) = self.minimum_severity {
            config.severity.minimum_severity = severity;
        }
        if let Some(tools) = &self.tools {
            config.compare.tools = Some(tools.clone());
        }
        if let Some(threshold) = self.performance_threshold {
            config.compare.performance_threshold = threshold;
        }
        for aspect in &self.ignore {
            config.compare = config.compare.ignoring(*aspect);
        }

        Ok(config)
    }
}

/// Configuration for accepting drift
#[derive(Debug, Clone, Default)]
pub struct AcceptRunConfig {
    pub compare: CompareRunConfig,
    pub accepted_by: Option<String>,
    pub reason: Option<String>,
    /// Where to write the accepted baseline; defaults to the current baseline
    pub output: Option<PathBuf>,
}

impl AcceptRunConfig {
    pub fn new(compare: CompareRunConfig) -> Self {
        Self {
            compare,
            ..Default::default()
        }
    }

    pub fn with_accepted_by(mut self, by: Option<String>) -> Self {
        self.accepted_by = by;
        self
    }

    pub fn with_reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }

    pub fn with_output(mut self, output: Option<PathBuf>) -> Self {
        self.output = output;
        self
    }

    pub fn output_path(&self) -> &PathBuf {
        self.output.as_ref().unwrap_or(&self.compare.current)
    }
}
