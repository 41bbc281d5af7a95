//! Model Context Protocol (MCP) client implementation.
//!
//! This module implements the client end of MCP over the stdio transport:
//! it launches a server script as a child process, performs the handshake,
//! lists the server's capabilities and releases everything on close.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         McpClient                           │
//! │                                                             │
//! │   ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    │
//! │   │  Launcher   │───▶│  Transport  │───▶│   Session   │    │
//! │   │  (process)  │    │   (stdio)   │    │ (JSON-RPC)  │    │
//! │   └─────────────┘    └─────────────┘    └─────────────┘    │
//! │                             ▲                  ▲            │
//! │                             └──────┬───────────┘            │
//! │                           ┌────────┴────────┐               │
//! │                           │  ResourceStack  │               │
//! │                           │ (reverse close) │               │
//! │                           └─────────────────┘               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! The client requests MCP protocol version 2024-11-05 and accepts the
//! versions listed in [`SUPPORTED_PROTOCOL_VERSIONS`].

pub mod capability;
pub mod client;
pub mod launcher;
pub mod protocol;
pub mod schema;
pub mod session;
pub mod stack;
pub mod transport;

pub use capability::{CapabilityCategory, CapabilityDescriptor, CapabilityListing, NO_DESCRIPTION};
pub use client::{ClientState, McpClient};
pub use launcher::{Launcher, ProcessLauncher, ServerEndpoint, SUPPORTED_EXTENSION};
pub use protocol::{MCP_PROTOCOL_VERSION, SUPPORTED_PROTOCOL_VERSIONS};
pub use session::{RpcSession, RpcSessionFactory, Session, SessionFactory, SessionState};
pub use stack::{Release, ResourceStack};
pub use transport::{SharedTransport, StdioTransport, Transport};
