//! Migrate command - Upgrade a baseline to the current format

use std::path::Path;

use anyhow::{bail, Result};
use colored::Colorize;
use serde_json::json;
use tracing::info;

use crate::baseline::{BaselineStore, LoadOptions};
use crate::cli::OutputFormat;
use crate::errors::BaselineError;

/// Migrate a baseline file, writing to `output` or in place
///
/// With `dry_run` only the planned migrations are reported.
pub fn run(path: &Path, output: Option<&Path>, dry_run: bool, format: OutputFormat) -> Result<bool> {
    let store = BaselineStore::default();
    let raw = store.read_raw(path)?;
    let plan = store.registry().migration_info(&raw);

    match plan.current_version {
        None => bail!("{} has no readable format version", path.display()),
        Some(found) if found > plan.target_version => {
            return Err(BaselineError::VersionIncompatible {
                found: found.to_string(),
                supported: plan.target_version.to_string(),
            }
            .into())
        }
        Some(_) => {}
    }

    let target = output.unwrap_or(path);
    let written = if plan.needs_migration && !dry_run {
        let baseline = store.load(path, &LoadOptions::default())?;
        store.save(&baseline, target)?;
        info!("Migrated {} to format {}", path.display(), plan.target_version);
        true
    } else {
        false
    };

    match format {
        OutputFormat::Json => {
            let result = json!({
                "path": path.display().to_string(),
                "migration": plan,
                "written": written.then(|| target.display().to_string()),
            });
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Text => {
            let from = plan
                .current_version
                .map(|v| v.to_string())
                .unwrap_or_default();
            if !plan.needs_migration {
                println!(
                    "{} {} is already at format {}",
                    "✓".green(),
                    path.display(),
                    from
                );
                return Ok(false);
            }

            println!(
                "{} {} → {}",
                "Migration:".cyan(),
                from.yellow(),
                plan.target_version.to_string().green()
            );
            for step in &plan.migrations {
                println!("  {} {}", "•".dimmed(), step);
            }
            if written {
                println!("{} {}", "Saved to:".green(), target.display());
            } else {
                println!("{}", "Dry run, nothing written".dimmed());
            }
        }
    }

    Ok(false)
}
