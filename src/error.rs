//! Error types for mcp-client.
//!
//! [`ConfigError`] covers loading the optional configuration file.
//! [`ClientError`] covers the connection lifecycle: endpoint validation,
//! process start, handshake, requests and the client state machine.
//! [`CapabilityListingError`] is the per-category failure recorded inside a
//! capability listing; it never aborts the listing as a whole.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors raised by the launcher, the session and the client.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The endpoint does not reference a server kind the client can launch.
    #[error("unsupported server kind: '{path}' (server script must be a .{expected} file)")]
    UnsupportedServerKind {
        /// Script path that was rejected.
        path: PathBuf,
        /// The recognised extension.
        expected: &'static str,
    },

    /// The server process could not be spawned.
    #[error("failed to start server process '{command}'")]
    TransportStartFailure {
        /// Program that was invoked.
        command: String,
        /// The underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// The initialisation handshake was rejected or did not complete.
    #[error("handshake failed: {reason}")]
    HandshakeFailure {
        /// Why the handshake failed.
        reason: String,
    },

    /// An operation was attempted before the client was connected.
    #[error("not connected to a server")]
    NotConnected,

    /// `connect` was called on a client that is connecting or connected.
    #[error("already connected to a server")]
    AlreadyConnected,

    /// An operation was attempted after the client or session was closed.
    #[error("connection closed")]
    Closed,

    /// A request did not receive its response in time.
    #[error("request '{method}' timed out after {}s", timeout.as_secs())]
    Timeout {
        /// Method of the request that timed out.
        method: String,
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// The server answered a request with a JSON-RPC error object.
    #[error("server returned error {code} for '{method}': {message}")]
    Rpc {
        /// Method of the failed request.
        method: String,
        /// JSON-RPC error code.
        code: i32,
        /// Error message supplied by the server.
        message: String,
    },

    /// The server sent something that does not follow the protocol,
    /// or closed its output before answering.
    #[error("protocol error: {message}")]
    Protocol {
        /// Description of the violation.
        message: String,
    },

    /// Reading from or writing to an open transport failed.
    #[error("transport I/O error")]
    TransportIo {
        /// The underlying IO error.
        #[from]
        source: std::io::Error,
    },
}

impl ClientError {
    /// Creates a protocol error with the given message.
    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a handshake failure with the given reason.
    #[must_use]
    pub fn handshake(reason: impl Into<String>) -> Self {
        Self::HandshakeFailure {
            reason: reason.into(),
        }
    }

    /// Returns `true` for failures a user can act on (wrong path, missing
    /// interpreter, misbehaving server).
    ///
    /// State-machine violations (`NotConnected`, `AlreadyConnected`,
    /// `Closed`) are programming errors in the caller and return `false`.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::NotConnected | Self::AlreadyConnected | Self::Closed
        )
    }
}

/// A failure to list one capability category.
///
/// Recorded in that category's slot of a
/// [`CapabilityListing`](crate::mcp::CapabilityListing).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to list {category}: {reason}")]
pub struct CapabilityListingError {
    /// Category name (`tools`, `prompts` or `resources`).
    pub category: &'static str,
    /// Rendered cause.
    pub reason: String,
}

impl CapabilityListingError {
    /// Wraps a client error as a listing failure for `category`.
    #[must_use]
    pub fn new(category: &'static str, cause: &impl fmt::Display) -> Self {
        Self {
            category,
            reason: cause.to_string(),
        }
    }
}
