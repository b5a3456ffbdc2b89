//! Info command - Describe a baseline file

use std::path::Path;

use anyhow::Result;
use serde_json::json;
use tracing::warn;

use crate::baseline::{BaselineStore, LoadOptions};
use crate::cli::render::print_baseline_text;
use crate::cli::OutputFormat;
use crate::errors::BaselineError;

/// Print a baseline's metadata and tools
///
/// A baseline failing its integrity check is still shown, flagged.
pub fn run(path: &Path, format: OutputFormat) -> Result<bool> {
    let store = BaselineStore::default();

    let (baseline, integrity_ok) = match store.load(path, &LoadOptions::default()) {
        Ok(baseline) => (baseline, true),
        Err(BaselineError::IntegrityMismatch { .. }) => {
            warn!("{} failed its integrity check", path.display());
            let options = LoadOptions::default().skip_integrity_check(true);
            (store.load(path, &options)?, false)
        }
        Err(e) => return Err(e.into()),
    };

    match format {
        OutputFormat::Json => {
            let result = json!({
                "path": path.display().to_string(),
                "integrityVerified": integrity_ok,
                "baseline": baseline,
            });
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Text => print_baseline_text(&baseline, integrity_ok),
    }

    Ok(false)
}
