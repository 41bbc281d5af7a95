//! mcp-client: minimal Model Context Protocol client over stdio
//!
//! This library launches an MCP server script as a child process, performs the
//! JSON-RPC handshake and lists what the server offers.
//!
//! # Architecture
//!
//! - **Launcher**: Validates the server script and spawns the interpreter
//! - **Session**: Handshake, capability listing and tool calls
//! - **Resource Stack**: Releases session and process in reverse order on close
//!
//! A listing failure in one capability category (tools, prompts or
//! resources) never hides the others.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading and validation
//! - [`error`]: Error types
//! - [`mcp`]: MCP client implementation
//! - [`report`]: Text rendering of capability listings
//! - [`repl`]: Interactive command loop

pub mod config;
pub mod error;
pub mod mcp;
pub mod repl;
pub mod report;
