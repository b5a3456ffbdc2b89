//! Error handling with miette diagnostics
//!
//! Baseline loading, verification and migration errors carry a diagnostic
//! code and help text so the CLI can render them with context.

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Errors raised while loading, saving or migrating a baseline
#[derive(Error, Debug, Diagnostic)]
pub enum BaselineError {
    /// Baseline file does not exist
    #[error("Baseline file not found: {path}")]
    #[diagnostic(
        code(mcpdrift::baseline::not_found),
        help("Check the path, or create a baseline first")
    )]
    FileNotFound { path: String },

    /// Reading or writing the file failed
    #[error("IO error on {path}: {source}")]
    #[diagnostic(code(mcpdrift::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// File is empty or not valid JSON
    #[error("Invalid JSON in {path}: {message}")]
    #[diagnostic(code(mcpdrift::baseline::json))]
    InvalidJson {
        path: String,
        message: String,
        #[source_code]
        src: Option<NamedSource<String>>,
        #[label("parse error here")]
        span: Option<SourceSpan>,
    },

    /// Document does not have the shape of a baseline
    #[error("Invalid baseline format: {reason}")]
    #[diagnostic(code(mcpdrift::baseline::format))]
    InvalidFormat { reason: String },

    /// File exceeds the size limit
    #[error("Baseline file {path} is too large ({size} bytes, limit {limit})")]
    #[diagnostic(
        code(mcpdrift::baseline::too_large),
        help("Baselines larger than the limit are rejected before reading")
    )]
    TooLarge { path: String, size: u64, limit: u64 },

    /// Stored hash does not match the content
    #[error("Baseline integrity check failed for {path}: expected {expected}, computed {actual}")]
    #[diagnostic(
        code(mcpdrift::baseline::integrity),
        help("The file was modified after it was written. Regenerate the baseline, or pass --skip-integrity to inspect it anyway")
    )]
    IntegrityMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    /// File format is newer than this build understands
    #[error("Baseline format {found} is newer than supported format {supported}")]
    #[diagnostic(
        code(mcpdrift::baseline::version),
        help("Upgrade mcpdrift to read this baseline")
    )]
    VersionIncompatible { found: String, supported: String },

    /// Migration target is older than the source
    #[error("Cannot migrate baseline from {from} down to {to}")]
    #[diagnostic(code(mcpdrift::migration::downgrade))]
    MigrationDowngrade { from: String, to: String },

    /// Serializing a baseline failed
    #[error("Failed to serialize baseline: {message}")]
    #[diagnostic(code(mcpdrift::baseline::serialize))]
    Serialize { message: String },
}

impl BaselineError {
    pub fn invalid_format(reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Build an `InvalidJson` error pointing at the parse location
    pub fn invalid_json(path: impl Into<String>, content: &str, err: &serde_json::Error) -> Self {
        let path = path.into();
        let span = offset_of(content, err.line(), err.column()).map(|offset| {
            let len = content[offset..].chars().next().map_or(0, char::len_utf8);
            SourceSpan::from((offset, len))
        });
        let src = span.map(|_| NamedSource::new(path.clone(), content.to_string()));

        Self::InvalidJson {
            path,
            message: err.to_string(),
            src,
            span,
        }
    }

    /// Whether the error indicates tampering
    pub fn is_integrity_failure(&self) -> bool {
        matches!(self, Self::IntegrityMismatch { .. })
    }
}

/// Byte offset of a 1-based line/column position
fn offset_of(content: &str, line: usize, column: usize) -> Option<usize> {
    if line == 0 {
        return None;
    }
    let mut offset = 0;
    for (index, text) in content.split_inclusive('\n').enumerate() {
        if index + 1 == line {
            let col = column.saturating_sub(1).min(text.trim_end_matches('\n').len());
            return text.is_char_boundary(col).then_some(offset + col);
        }
        offset += text.len();
    }
    None
}

/// Errors raised while building a migration registry
#[derive(Error, Debug, Diagnostic, PartialEq, Eq)]
pub enum MigrationError {
    /// Migrations must be registered in strictly increasing version order
    #[error("Migration {version} must be newer than the last registered migration {previous}")]
    #[diagnostic(code(mcpdrift::migration::order))]
    NotMonotonic { version: String, previous: String },
}

/// Add a hint to an anyhow error for display
pub fn format_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<BaselineError>() {
        Some(BaselineError::IntegrityMismatch { .. }) => format!(
            "{}\n\nHint: Run 'mcpdrift verify <file>' to inspect the stored hash",
            err
        ),
        Some(BaselineError::VersionIncompatible { .. }) => {
            format!("{}\n\nHint: Upgrade mcpdrift to read this baseline", err)
        }
        Some(BaselineError::FileNotFound { .. }) => {
            format!("{}\n\nHint: Check the baseline path", err)
        }
        _ => format!("{:#}", err),
    }
}
