//! CLI module - Command implementations

use std::io::{self, IsTerminal};

pub mod commands;
pub mod config;
mod render;

/// Output format for CLI commands
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Where output is going, as far as styling is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Interactive terminal with colors
    Interactive,
    /// CI environment - plain text, no colors
    CI,
    /// Piped output - plain text, no colors
    Plain,
}

impl OutputMode {
    /// Detect the output mode from the environment
    pub fn detect() -> Self {
        if is_ci::cached() {
            return OutputMode::CI;
        }

        if io::stdout().is_terminal() {
            OutputMode::Interactive
        } else {
            OutputMode::Plain
        }
    }

    /// Whether text output for `format` should be colored
    pub fn colors_enabled(&self, format: OutputFormat) -> bool {
        matches!(self, OutputMode::Interactive) && format == OutputFormat::Text
    }
}

impl Default for OutputMode {
    fn default() -> Self {
        Self::detect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colors_only_for_interactive_text() {
        assert!(OutputMode::Interactive.colors_enabled(OutputFormat::Text));
        assert!(!OutputMode::Interactive.colors_enabled(OutputFormat::Json));
        assert!(!OutputMode::CI.colors_enabled(OutputFormat::Text));
        assert!(!OutputMode::Plain.colors_enabled(OutputFormat::Text));
    }
}
