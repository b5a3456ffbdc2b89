//! Baseline Module - Persisted behavioral snapshots of a server
//!
//! Provides the baseline data model, construction from interview results,
//! and the store that loads, verifies, migrates and saves baseline files.

mod builder;
mod store;
mod types;

pub use builder::{
    create_baseline, fingerprint_tool, InterviewMetadata, InterviewResult, ToolEvidence,
    ToolInteraction, ToolInterview,
};
pub use store::{
    accept_drift, clear_acceptance, compute_integrity_hash, exists, has_acceptance,
    recalculate_integrity_hash, verify_integrity, BaselineStore, LoadOptions, MAX_BASELINE_SIZE,
};
pub use types::{
    AcceptanceRecord, AcceptedDiffSummary, BaselineMetadata, BaselineMode, BehavioralAssertion,
    BehavioralBaseline, CapabilitySnapshot, ServerFingerprint, ToolFingerprint,
};
