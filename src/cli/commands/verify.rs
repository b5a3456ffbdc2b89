//! Verify command - Integrity check of a baseline file

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use serde_json::json;

use crate::baseline::{BaselineStore, LoadOptions};
use crate::cli::OutputFormat;
use crate::errors::BaselineError;

/// Verify a baseline's stored hash
pub fn run(path: &Path, format: OutputFormat) -> Result<bool> {
    let store = BaselineStore::default();

    let (valid, detail) = match store.load(path, &LoadOptions::default()) {
        Ok(baseline) => (true, json!({ "version": baseline.version, "hash": baseline.hash })),
        Err(BaselineError::IntegrityMismatch {
            expected, actual, ..
        }) => (false, json!({ "expected": expected, "actual": actual })),
        Err(e) => return Err(e.into()),
    };

    match format {
        OutputFormat::Json => {
            let result = json!({
                "path": path.display().to_string(),
                "valid": valid,
                "detail": detail,
            });
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Text => {
            if valid {
                println!(
                    "{} {} integrity verified",
                    "✓".green(),
                    path.display().to_string().bold()
                );
            } else {
                println!(
                    "{} {} integrity check failed",
                    "✗".red(),
                    path.display().to_string().bold()
                );
                println!("  Stored:   {}", detail["expected"].as_str().unwrap_or_default());
                println!("  Computed: {}", detail["actual"].as_str().unwrap_or_default());
            }
        }
    }

    Ok(!valid)
}
