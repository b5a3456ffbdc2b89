//! Fingerprinting Module
//!
//! Deterministic content hashing for baselines and tool schemas:
//! - **Canonical hash**: key-order independent SHA-256 of any JSON value,
//!   with timestamp and number normalization
//! - **Schema fingerprint**: hash of the semantically relevant parts of a
//!   JSON Schema, plus a structural diff between two schemas
//! - **Consensus hash**: most frequent hash over repeated observations
//!
//! # Example
//!
//! ```rust,ignore
//! use mcpdrift::fingerprinting::{SchemaDiff, SchemaFingerprinter};
//!
//! let hash = SchemaFingerprinter::schema_hash(&tool.input_schema);
//! let diff = SchemaDiff::between(&old_schema, &new_schema);
//! println!("Severity: {}", diff.severity());
//! ```

pub mod hasher;
mod normalizer;
mod schema;

pub use hasher::{CanonicalHasher, ConsensusHash, EMPTY_CONSENSUS_HASH, SHORT_HASH_LEN};
pub use normalizer::SchemaNormalizer;
pub use schema::{SchemaChange, SchemaDiff, SchemaFingerprinter};
