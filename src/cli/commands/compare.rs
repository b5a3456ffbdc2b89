//! Compare command - Drift detection between two baselines

use anyhow::Result;
use colored::Colorize;
use tracing::{debug, info};

use crate::baseline::{BaselineStore, BehavioralBaseline, LoadOptions};
use crate::cli::config::CompareRunConfig;
use crate::cli::render::{print_diff_text, separator, severity_label};
use crate::cli::OutputFormat;
use crate::config::DriftConfig;
use crate::diff::{apply_severity_config, should_fail_on_diff, BehavioralDiff, Comparator};

/// Load both baselines, compare them and apply the severity policy
///
/// Returns the current baseline alongside the filtered diff.
pub(crate) fn detect_drift(
    config: &CompareRunConfig,
    drift_config: &DriftConfig,
) -> Result<(BehavioralBaseline, BehavioralDiff)> {
    let store = BaselineStore::default();
    let options = LoadOptions::default().skip_integrity_check(config.skip_integrity_check);

    let previous = store.load(&config.previous, &options)?;
    let current = store.load(&config.current, &options)?;

    let diff = Comparator::compare(&previous, &current, &drift_config.compare);
    Ok((current, apply_severity_config(&diff, &drift_config.severity)))
}

/// Compare two baselines
pub fn run(config: &CompareRunConfig, format: OutputFormat) -> Result<bool> {
    info!(
        "Comparing {} against {}",
        config.current.display(),
        config.previous.display()
    );

    let drift_config = config.resolve()?;
    debug!("Resolved config: {:?}", drift_config);

    let fail_on = drift_config.severity.fail_on_severity;
    let (_, diff) = detect_drift(config, &drift_config)?;
    let failed = should_fail_on_diff(&diff, fail_on);

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&diff)?);
        }
        OutputFormat::Text => {
            separator();
            println!("{} {}", "Previous:".cyan(), config.previous.display());
            println!("{} {}", "Current: ".cyan(), config.current.display());
            println!();
            print_diff_text(&diff);

            if failed {
                println!(
                    "{}",
                    format!("✗ Drift at or above {} fails this run", severity_label(fail_on))
                        .red()
                        .bold()
                );
            }
        }
    }

    Ok(failed)
}
