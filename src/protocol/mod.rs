//! Protocol types for MCP servers
//!
//! Wire types for the parts of MCP discovery that baselines record.

pub mod mcp;

pub use mcp::{Implementation, ListToolsResult, ServerCapabilities, Tool};
