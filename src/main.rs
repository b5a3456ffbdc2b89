//! mcpdrift - Baseline integrity and drift detection for MCP servers
//!
//! Command-line front end: compares, verifies, describes, migrates and
//! accepts behavioral baselines.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mcpdrift::cli::commands;
use mcpdrift::cli::config::{AcceptRunConfig, CompareRunConfig};
use mcpdrift::cli::{OutputFormat, OutputMode};
use mcpdrift::diff::{Aspect, ChangeSeverity};
use mcpdrift::errors::{format_error, BaselineError};

/// mcpdrift - Drift detection for MCP servers
#[derive(Parser)]
#[command(
    name = "mcpdrift",
    author = "Russ Smith",
    version,
    about = "Baseline integrity and drift detection for MCP servers",
    long_about = "mcpdrift compares behavioral baselines of Model Context Protocol servers.\n\n\
                  Baselines are tamper-evident JSON snapshots of a server's tools, schemas\n\
                  and observed behavior. Comparing two baselines reports drift graded as\n\
                  info, warning or breaking, and exits non-zero when drift reaches the\n\
                  configured fail-on severity."
)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output format
    #[arg(short, long, default_value = "text", global = true)]
    format: OutputFormat,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Arguments shared by commands that compare two baselines
#[derive(clap::Args)]
struct CompareArgs {
    /// Reference baseline
    previous: PathBuf,

    /// Baseline to check for drift
    current: PathBuf,

    /// Path to config file (auto-detected if not specified)
    #[arg(short, long, env = "MCPDRIFT_CONFIG")]
    config: Option<PathBuf>,

    /// Fail when drift reaches this severity (none, info, warning, breaking)
    #[arg(long)]
    fail_on: Option<ChangeSeverity>,

    /// Hide changes below this severity
    #[arg(long)]
    min_severity: Option<ChangeSeverity>,

    /// Only compare these tools
    #[arg(short, long, value_delimiter = ',')]
    tools: Option<Vec<String>>,

    /// Ignore changes of these aspects (e.g. description,performance)
    #[arg(long, value_delimiter = ',', value_parser = parse_aspect)]
    ignore: Vec<Aspect>,

    /// Relative p50 latency increase treated as a regression
    #[arg(long)]
    performance_threshold: Option<f64>,

    /// Load baselines even when their stored hash does not match
    #[arg(long)]
    skip_integrity: bool,
}

impl CompareArgs {
    fn into_run_config(self) -> CompareRunConfig {
        CompareRunConfig::new(self.previous, self.current)
            .with_config_path(self.config)
            .with_fail_on(self.fail_on)
            .with_minimum_severity(self.min_severity)
            .with_tools(self.tools)
            .with_ignore(self.ignore)
            .with_performance_threshold(self.performance_threshold)
            .with_skip_integrity_check(self.skip_integrity)
    }
}

fn parse_aspect(s: &str) -> Result<Aspect, String> {
    Aspect::parse(s).ok_or_else(|| {
        let known: Vec<&str> = Aspect::ALL.iter().map(|a| a.as_str()).collect();
        format!("Unknown aspect: '{}'. Expected one of: {}", s, known.join(", "))
    })
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two baselines and report drift
    Compare {
        #[command(flatten)]
        args: CompareArgs,
    },

    /// Verify a baseline's integrity hash
    Verify {
        /// Baseline file
        file: PathBuf,
    },

    /// Show a baseline's metadata and tools
    Info {
        /// Baseline file
        file: PathBuf,
    },

    /// Migrate a baseline to the current format
    Migrate {
        /// Baseline file
        file: PathBuf,

        /// Write the migrated baseline here instead of in place
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Report planned migrations without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Record drift between two baselines as accepted
    Accept {
        #[command(flatten)]
        args: CompareArgs,

        /// Who accepted the drift
        #[arg(long, env = "MCPDRIFT_ACCEPTED_BY")]
        by: Option<String>,

        /// Why the drift was accepted
        #[arg(long)]
        reason: Option<String>,

        /// Write the accepted baseline here instead of over the current one
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_logging(verbosity: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbosity {
            0 => EnvFilter::new("mcpdrift=info"),
            1 => EnvFilter::new("mcpdrift=debug"),
            2 => EnvFilter::new("mcpdrift=trace"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn run(cli: Cli) -> Result<bool> {
    let format = cli.format;
    match cli.command {
        Commands::Compare { args } => commands::compare::run(&args.into_run_config(), format),
        Commands::Verify { file } => commands::verify::run(&file, format),
        Commands::Info { file } => commands::info::run(&file, format),
        Commands::Migrate {
            file,
            output,
            dry_run,
        } => commands::migrate::run(&file, output.as_deref(), dry_run, format),
        Commands::Accept {
            args,
            by,
            reason,
            output,
        } => {
            let config = AcceptRunConfig::new(args.into_run_config())
                .with_accepted_by(by)
                .with_reason(reason)
                .with_output(output);
            commands::accept::run(&config, format)
        }
    }
}

fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    if !OutputMode::detect().colors_enabled(cli.format) {
        colored::control::set_override(false);
    }

    match run(cli) {
        Ok(false) => {}
        Ok(true) => std::process::exit(1),
        Err(err) => {
            match err.downcast::<BaselineError>() {
                Ok(baseline_err) => eprintln!("{:?}", miette::Report::new(baseline_err)),
                Err(err) => eprintln!("{} {}", "Error:".red().bold(), format_error(&err)),
            }
            std::process::exit(2);
        }
    }
}
