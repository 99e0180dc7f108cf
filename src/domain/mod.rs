//! Domain parsing and tool/resource integrations
//!
//! Provides the document-compliance business logic exposed over the MCP protocol.

pub mod resources;
pub mod tools;
pub mod utils;
