//! Command implementations
//!
//! Each `run` returns `Ok(true)` when the result should fail the process.

pub mod accept;
pub mod compare;
pub mod info;
pub mod migrate;
pub mod verify;
