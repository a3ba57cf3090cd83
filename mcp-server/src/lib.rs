//! Iteratr MCP Server
//!
//! Thin HTTP tool server exposing the session store to an external agent.
//! `POST /mcp` accepts a `{name, arguments}` envelope and returns a single
//! text content block; tool names map 1:1 onto store commands.

pub mod args;
pub mod config;
pub mod server;
pub mod telemetry;
pub mod tools;

pub use config::Config;
pub use server::{McpServer, ServerHandle};
