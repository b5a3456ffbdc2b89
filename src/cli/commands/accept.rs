//! Accept command - Record accepted drift on the current baseline

use anyhow::Result;
use colored::Colorize;
use serde_json::json;
use tracing::info;

use crate::baseline::{accept_drift, BaselineStore};
use crate::cli::config::AcceptRunConfig;
use crate::cli::render::{print_diff_text, separator};
use crate::cli::OutputFormat;

use super::compare::detect_drift;

/// Compare two baselines and record the drift as accepted
///
/// The acceptance is an audit record; later comparisons are unaffected.
pub fn run(config: &AcceptRunConfig, format: OutputFormat) -> Result<bool> {
    let drift_config = config.compare.resolve()?;
    let (current, diff) = detect_drift(&config.compare, &drift_config)?;

    let accepted = accept_drift(
        &current,
        &diff,
        config.accepted_by.clone(),
        config.reason.clone(),
    );

    let output = config.output_path();
    BaselineStore::default().save(&accepted, output)?;
    info!("Wrote accepted baseline to {}", output.display());

    match format {
        OutputFormat::Json => {
            let result = json!({
                "output": output.display().to_string(),
                "acceptance": accepted.acceptance,
                "hash": accepted.hash,
            });
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Text => {
            separator();
            print_diff_text(&diff);
            println!();
            println!(
                "{} {} change(s) accepted, written to {}",
                "✓".green(),
                diff.change_count(),
                output.display().to_string().bold()
            );
        }
    }

    Ok(false)
}
