//! Text rendering for diffs and baselines

use colored::{ColoredString, Colorize};

use crate::baseline::BehavioralBaseline;
use crate::diff::{BehavioralDiff, ChangeSeverity};
use crate::fingerprinting::SHORT_HASH_LEN;

pub(crate) fn separator() {
    println!("{}", "━".repeat(60).dimmed());
}

pub(crate) fn severity_label(severity: ChangeSeverity) -> ColoredString {
    let label = severity.as_str().to_uppercase();
    match severity {
        ChangeSeverity::Breaking => label.red().bold(),
        ChangeSeverity::Warning => label.yellow(),
        ChangeSeverity::Info => label.cyan(),
        ChangeSeverity::None => label.dimmed(),
    }
}

fn severity_indicator(severity: ChangeSeverity) -> ColoredString {
    let indicator = severity.indicator();
    match severity {
        ChangeSeverity::Breaking => indicator.red(),
        ChangeSeverity::Warning => indicator.yellow(),
        ChangeSeverity::Info => indicator.cyan(),
        ChangeSeverity::None => indicator.green(),
    }
}

fn short(hash: &str) -> &str {
    hash.get(..SHORT_HASH_LEN).unwrap_or(hash)
}

/// Print a diff in text format
pub(crate) fn print_diff_text(diff: &BehavioralDiff) {
    if let Some(compatibility) = &diff.version_compatibility {
        if let Some(warning) = &compatibility.warning {
            println!("{} {}", "⚠".yellow(), warning.yellow());
            println!();
        }
    }

    if !diff.tools_added.is_empty() {
        println!("{}", "Added Tools:".green().bold());
        for tool in &diff.tools_added {
            println!("  {} {}", "+".green(), tool);
        }
        println!();
    }

    if !diff.tools_removed.is_empty() {
        println!("{}", "Removed Tools:".red().bold());
        for tool in &diff.tools_removed {
            println!("  {} {}", "-".red(), tool);
        }
        println!();
    }

    if !diff.tools_modified.is_empty() {
        println!("{}", "Changed Tools:".yellow().bold());
        for tool_diff in &diff.tools_modified {
            println!(
                "  {} {} [{}]",
                "~".yellow(),
                tool_diff.tool,
                severity_label(tool_diff.severity())
            );
            for change in &tool_diff.changes {
                println!(
                    "    {} {} {}",
                    severity_indicator(change.severity),
                    format!("{}:", change.aspect).dimmed(),
                    change.description
                );
            }
            println!();
        }
    }

    print_reports(diff);

    if diff.has_changes() {
        println!(
            "{} {} [{}]",
            "Summary:".cyan(),
            diff.summary,
            severity_label(diff.severity)
        );
    } else {
        println!("{}", "✓ No behavioral drift detected".green().bold());
    }
}

fn print_reports(diff: &BehavioralDiff) {
    let mut lines: Vec<(&str, &str, bool)> = Vec::new();
    if let Some(report) = &diff.performance_report {
        lines.push(("Performance", report.summary.as_str(), report.has_regressions));
    }
    if let Some(report) = &diff.security_report {
        lines.push(("Security", report.summary.as_str(), report.degraded));
    }
    if let Some(report) = &diff.schema_evolution_report {
        lines.push(("Response schemas", report.summary.as_str(), report.incompatible_count > 0));
    }
    if let Some(report) = &diff.error_trend_report {
        lines.push(("Error trends", report.summary.as_str(), report.significant_change));
    }
    if let Some(change) = &diff.documentation_score_change {
        lines.push(("Documentation", change.summary.as_str(), change.degraded));
    }

    if lines.is_empty() {
        return;
    }

    println!("{}", "Reports:".cyan().bold());
    for (name, summary, concerning) in lines {
        let summary = if concerning {
            summary.yellow()
        } else {
            summary.normal()
        };
        println!("  {} {}", format!("{}:", name).dimmed(), summary);
    }
    println!();
}

/// Print baseline details in text format
pub(crate) fn print_baseline_text(baseline: &BehavioralBaseline, integrity_ok: bool) {
    let server = &baseline.server;
    let name = if server.name.is_empty() {
        "(unknown)"
    } else {
        server.name.as_str()
    };

    println!("{} {} {}", "Server:".cyan(), name.yellow().bold(), server.version);
    if !server.protocol_version.is_empty() {
        println!("  Protocol: {}", server.protocol_version);
    }
    if !server.capabilities.is_empty() {
        println!("  Capabilities: {}", server.capabilities.join(", "));
    }
    println!("  Format: {}", baseline.version);
    println!(
        "  Generated: {} ({} mode)",
        baseline.metadata.generated_at.to_rfc3339(),
        baseline.metadata.mode.as_str()
    );
    if !baseline.metadata.server_command.is_empty() {
        println!("  Command: {}", baseline.metadata.server_command.dimmed());
    }
    if let Some(version) = &baseline.metadata.tool_version {
        println!("  Written by: mcpdrift {}", version);
    }
    let integrity = if integrity_ok {
        "verified".green()
    } else {
        "MISMATCH".red().bold()
    };
    println!("  Hash: {} ({})", short(&baseline.hash), integrity);
    println!();

    println!("{} {}", "Tools:".cyan(), baseline.tool_count());
    for tool in &baseline.tool_profiles {
        let mut line = format!("  {} {}", "•".dimmed(), tool.name.bold());
        line.push_str(&format!(" {}", short(&tool.schema_hash).dimmed()));
        if tool.deprecated {
            let note = match &tool.replaced_by {
                Some(replacement) => format!(" deprecated, use {}", replacement),
                None => " deprecated".to_string(),
            };
            line.push_str(&note.yellow().to_string());
        }
        println!("{}", line);
    }

    if let Some(score) = &baseline.documentation_score {
        println!();
        println!(
            "{} {:.0} ({}), {} issue(s)",
            "Documentation:".cyan(),
            score.overall_score,
            score.grade,
            score.issue_count
        );
    }

    if let Some(acceptance) = &baseline.acceptance {
        println!();
        println!(
            "{} {} by {}",
            "Accepted:".cyan(),
            acceptance.accepted_at.to_rfc3339(),
            acceptance.accepted_by.as_deref().unwrap_or("unknown")
        );
        if let Some(reason) = &acceptance.reason {
            println!("  Reason: {}", reason);
        }
        println!(
            "  Covers: {} breaking, {} warning, {} info",
            acceptance.accepted_diff.breaking_count,
            acceptance.accepted_diff.warning_count,
            acceptance.accepted_diff.info_count
        );
    }
}
