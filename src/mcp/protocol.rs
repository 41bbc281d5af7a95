//! JSON-RPC 2.0 message types for the MCP protocol, client side.
//!
//! All messages follow the JSON-RPC 2.0 specification with MCP-specific extensions.
//!
//! # Message Types
//!
//! - **Request**: A message expecting a response (has `id`). The client sends
//!   these, and the server may send them too (for example `ping`).
//! - **Response**: A reply to a request (success or error)
//! - **Notification**: A one-way message (no `id`, no response expected)
//!
//! # MCP-Specific Constraints
//!
//! - Request IDs must be strings or integers (never `null`)
//! - Request IDs must be unique within a session

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClientError;

/// The MCP protocol version the client requests during initialisation.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Protocol versions the client accepts in the server's initialize result.
pub const SUPPORTED_PROTOCOL_VERSIONS: [&str; 3] = ["2024-11-05", "2025-03-26", "2025-06-18"];

const JSONRPC_VERSION: &str = "2.0";

/// A JSON-RPC 2.0 request ID.
///
/// Per the MCP specification, IDs must be strings or integers, never `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID.
    Number(i64),
    /// String request ID.
    String(String),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

/// An outgoing JSON-RPC 2.0 request (client to server).
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingRequest {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// Unique request identifier.
    pub id: RequestId,

    /// The method to invoke.
    pub method: String,

    /// Optional parameters for the method.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl OutgoingRequest {
    /// Creates a new request.
    #[must_use]
    pub fn new(id: RequestId, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC 2.0 request received from the server.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    /// Must be "2.0".
    pub jsonrpc: String,

    /// Unique request identifier.
    pub id: RequestId,

    /// The method to invoke.
    pub method: String,

    /// Optional parameters for the method.
    #[serde(default)]
    pub params: Option<Value>,
}

/// A JSON-RPC 2.0 notification message (incoming).
///
/// Notifications do not have an ID and do not expect a response.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcNotification {
    /// Must be "2.0".
    pub jsonrpc: String,

    /// The notification method.
    pub method: String,

    /// Optional parameters for the notification.
    #[serde(default)]
    pub params: Option<Value>,
}

/// An outgoing JSON-RPC 2.0 notification (client to server).
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingNotification {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The notification method.
    pub method: String,

    /// Optional parameters for the notification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl OutgoingNotification {
    /// Creates a new outgoing notification.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: method.into(),
            params,
        }
    }

    /// Creates the `notifications/initialized` message that completes the
    /// handshake.
    #[must_use]
    pub fn initialized() -> Self {
        Self::new("notifications/initialized", None)
    }
}

/// A successful JSON-RPC 2.0 response (client to server).
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The request ID this response corresponds to.
    pub id: RequestId,

    /// The result of the method call.
    pub result: Value,
}

impl JsonRpcResponse {
    /// Creates a new success response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Value is not const-compatible
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result,
        }
    }
}

/// JSON-RPC error code for an unknown method.
pub const METHOD_NOT_FOUND: i32 = -32601;

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorData {
    /// The error code.
    pub code: i32,

    /// A short description of the error.
    pub message: String,

    /// Additional information about the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A JSON-RPC 2.0 error response (client to server).
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The request ID this error corresponds to.
    pub id: RequestId,

    /// The error details.
    pub error: JsonRpcErrorData,
}

impl JsonRpcError {
    /// Creates a method not found error response.
    #[must_use]
    pub fn method_not_found(id: RequestId, method: &str) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            error: JsonRpcErrorData {
                code: METHOD_NOT_FOUND,
                message: format!("Method not found: {method}"),
                data: None,
            },
        }
    }
}

/// A message received from the server.
#[derive(Debug, Clone)]
pub enum IncomingMessage {
    /// A successful reply to one of our requests.
    Response {
        /// ID of the request being answered.
        id: RequestId,
        /// The method result.
        result: Value,
    },
    /// An error reply. The ID is absent when the server could not parse ours.
    Error {
        /// ID of the request being answered, if known.
        id: Option<RequestId>,
        /// The error details.
        error: JsonRpcErrorData,
    },
    /// A server-initiated request expecting a reply.
    Request(JsonRpcRequest),
    /// A server-initiated notification.
    Notification(JsonRpcNotification),
}

impl IncomingMessage {
    /// Returns the request ID this message answers, if it is a reply.
    #[must_use]
    pub const fn response_id(&self) -> Option<&RequestId> {
        match self {
            Self::Response { id, .. } => Some(id),
            Self::Error { id, .. } => id.as_ref(),
            Self::Request(_) | Self::Notification(_) => None,
        }
    }
}

/// Parses a JSON line from the server into an incoming message.
///
/// # Errors
///
/// Returns [`ClientError::Protocol`] if the JSON is malformed or is not a
/// JSON-RPC 2.0 message.
pub fn parse_message(json: &str) -> Result<IncomingMessage, ClientError> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| ClientError::protocol(format!("invalid JSON from server: {e}")))?;

    let obj = value
        .as_object()
        .ok_or_else(|| ClientError::protocol("message is not a JSON object"))?;

    let jsonrpc = obj
        .get("jsonrpc")
        .and_then(Value::as_str)
        .ok_or_else(|| ClientError::protocol("missing jsonrpc field"))?;

    if jsonrpc != JSONRPC_VERSION {
        return Err(ClientError::protocol(format!(
            "unsupported jsonrpc version '{jsonrpc}'"
        )));
    }

    if obj.contains_key("method") {
        return if obj.contains_key("id") {
            serde_json::from_value(value)
                .map(IncomingMessage::Request)
                .map_err(|e| ClientError::protocol(format!("invalid request: {e}")))
        } else {
            serde_json::from_value(value)
                .map(IncomingMessage::Notification)
                .map_err(|e| ClientError::protocol(format!("invalid notification: {e}")))
        };
    }

    if let Some(error) = obj.get("error") {
        let error: JsonRpcErrorData = serde_json::from_value(error.clone())
            .map_err(|e| ClientError::protocol(format!("invalid error object: {e}")))?;
        let id = match obj.get("id") {
            None | Some(Value::Null) => None,
            Some(id) => Some(
                serde_json::from_value(id.clone())
                    .map_err(|e| ClientError::protocol(format!("invalid response id: {e}")))?,
            ),
        };
        return Ok(IncomingMessage::Error { id, error });
    }

    let id: RequestId = obj
        .get("id")
        .cloned()
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| ClientError::protocol(format!("invalid response id: {e}")))?
        .ok_or_else(|| ClientError::protocol("response without id"))?;

    let result = obj
        .get("result")
        .cloned()
        .ok_or_else(|| ClientError::protocol(format!("response {id} has neither result nor error")))?;

    Ok(IncomingMessage::Response { id, result })
}
