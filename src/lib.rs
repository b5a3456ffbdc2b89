//! mcpdrift - Baseline integrity and drift detection for MCP servers
//!
//! Captures what a Model Context Protocol server's tools look like and how
//! they behave, persists that as a tamper-evident baseline, and compares
//! baselines to report drift with a severity policy suitable for CI gates.
//!
//! # Modules
//!
//! - `fingerprinting` - Canonical hashing and schema fingerprints
//! - `baseline` - Baseline model, construction and storage
//! - `evidence` - Typed behavioral evidence with per-kind diffs
//! - `diff` - Comparator and severity policy
//! - `version` - Format versions and migrations
//!
//! # Example
//!
//! ```rust,ignore
//! use mcpdrift::baseline::{BaselineStore, LoadOptions};
//! use mcpdrift::diff::{should_fail_on_diff, ChangeSeverity, CompareOptions, Comparator};
//!
//! let store = BaselineStore::default();
//! let previous = store.load("baseline.json", &LoadOptions::default())?;
//! let current = store.load("current.json", &LoadOptions::default())?;
//!
//! let diff = Comparator::compare(&previous, &current, &CompareOptions::default());
//! if should_fail_on_diff(&diff, ChangeSeverity::Breaking) {
//!     println!("{}", diff.summary);
//! }
//! ```

pub mod baseline;
pub mod cli;
pub mod config;
pub mod diff;
pub mod errors;
pub mod evidence;
pub mod fingerprinting;
pub mod protocol;
pub mod version;

// Re-export commonly used types
pub use baseline::{BaselineStore, BehavioralBaseline, LoadOptions};
pub use config::DriftConfig;
pub use diff::{BehavioralDiff, ChangeSeverity, CompareOptions, Comparator};
pub use errors::BaselineError;
