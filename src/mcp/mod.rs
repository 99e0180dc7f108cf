//! Model Context Protocol (MCP) server handling and JSON-RPC implementations
//!
//! Provides protocol-level specifics surrounding JSON-RPC validation, the
//! initialize handshake, formatting, and method routing.

pub mod rpc;
pub mod server;
