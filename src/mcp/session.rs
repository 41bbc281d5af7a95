//! Protocol session over a transport.
//!
//! This module implements the client side of the MCP session lifecycle:
//!
//! 1. **Initialisation**: `initialize` request, version check, then the
//!    `notifications/initialized` notification
//! 2. **Operation**: listing and invocation requests
//! 3. **Shutdown**: the session is marked closed; the stdio transport has no
//!    shutdown message of its own, closing the server's input is the signal
//!
//! One request is in flight at a time. While waiting for a response the
//! session answers server `ping` requests, logs notifications and discards
//! responses to earlier requests that were cancelled or timed out.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::config::SessionConfig;
use crate::error::{ClientError, ClientResult};
use crate::mcp::capability::{CapabilityCategory, CapabilityDescriptor};
use crate::mcp::protocol::{
    parse_message, IncomingMessage, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    OutgoingNotification, OutgoingRequest, RequestId, MCP_PROTOCOL_VERSION,
    SUPPORTED_PROTOCOL_VERSIONS,
};
use crate::mcp::schema::{
    ClientInfo, InitializeParams, InitializeResult, ToolCallParams, ToolCallResult,
};
use crate::mcp::transport::{SharedTransport, Transport};

/// Upper bound on `nextCursor` pages followed by a single listing.
const MAX_LIST_PAGES: usize = 64;

/// Session state in the MCP lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created on an open transport, handshake not yet done.
    Uninitialized,
    /// Handshake complete, ready for normal operation.
    Ready,
    /// Closed; every further operation fails.
    Closed,
}

/// A stateful protocol handle layered on a transport.
#[async_trait]
pub trait Session: Send {
    /// Performs the initialisation handshake.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::HandshakeFailure`] if the server rejects the
    /// handshake, answers with an unsupported protocol version or does not
    /// answer in time.
    async fn initialize(&mut self) -> ClientResult<InitializeResult>;

    /// Lists one capability category, in server order.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is not ready or the request fails.
    async fn list(&mut self, category: CapabilityCategory)
        -> ClientResult<Vec<CapabilityDescriptor>>;

    /// Invokes a tool.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is not ready or the request fails.
    async fn call_tool(&mut self, name: &str, arguments: Value) -> ClientResult<ToolCallResult>;

    /// Sends a `ping` request.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is not ready or the request fails.
    async fn ping(&mut self) -> ClientResult<()>;

    /// Closes the session. Idempotent.
    ///
    /// # Errors
    ///
    /// Implementations that send a termination message may report its
    /// failure; the session is closed regardless.
    async fn close(&mut self) -> ClientResult<()>;

    /// Returns the current session state.
    fn state(&self) -> SessionState;
}

/// A session shared between the client and the resource stack.
pub type SharedSession = Arc<Mutex<Box<dyn Session>>>;

/// Creates sessions on freshly opened transports.
pub trait SessionFactory: Send + Sync {
    /// Creates an uninitialised session on `transport`.
    fn open_session(&self, transport: SharedTransport) -> Box<dyn Session>;
}

/// Creates [`RpcSession`]s from the session configuration.
#[derive(Debug, Clone, Default)]
pub struct RpcSessionFactory {
    config: SessionConfig,
}

impl RpcSessionFactory {
    /// Creates a factory using `config` for every session.
    #[must_use]
    pub const fn new(config: SessionConfig) -> Self {
        Self { config }
    }
}

impl SessionFactory for RpcSessionFactory {
    fn open_session(&self, transport: SharedTransport) -> Box<dyn Session> {
        Box::new(RpcSession::new(transport, &self.config))
    }
}

/// JSON-RPC 2.0 session speaking MCP over a line transport.
pub struct RpcSession {
    transport: SharedTransport,
    state: SessionState,
    next_id: i64,
    client_name: String,
    request_timeout: Duration,
}

impl RpcSession {
    /// Creates an uninitialised session on `transport`.
    #[must_use]
    pub fn new(transport: SharedTransport, config: &SessionConfig) -> Self {
        Self {
            transport,
            state: SessionState::Uninitialized,
            next_id: 1,
            client_name: config.client_name.clone(),
            request_timeout: config.request_timeout(),
        }
    }

    fn next_request_id(&mut self) -> RequestId {
        let id = RequestId::Number(self.next_id);
        self.next_id += 1;
        id
    }

    /// Ensures the session is in the Ready state.
    const fn require_ready(&self) -> ClientResult<()> {
        match self.state {
            SessionState::Ready => Ok(()),
            SessionState::Uninitialized => Err(ClientError::NotConnected),
            SessionState::Closed => Err(ClientError::Closed),
        }
    }

    /// Sends a request and waits for its response, bounded by the request
    /// timeout.
    async fn request(&mut self, method: &str, params: Option<Value>) -> ClientResult<Value> {
        let id = self.next_request_id();
        let request = OutgoingRequest::new(id.clone(), method, params);
        let json = serde_json::to_string(&request)
            .map_err(|e| ClientError::protocol(format!("failed to serialise request: {e}")))?;

        tracing::debug!(%id, method, "Sending request");

        let transport = Arc::clone(&self.transport);
        let exchange = async move {
            let mut transport = transport.lock().await;
            transport.send(&json).await?;
            await_response(&mut **transport, &id, method).await
        };

        tokio::time::timeout(self.request_timeout, exchange)
            .await
            .map_err(|_| ClientError::Timeout {
                method: method.to_string(),
                timeout: self.request_timeout,
            })?
    }

    async fn notify(&self, notification: &OutgoingNotification) -> ClientResult<()> {
        let json = serde_json::to_string(notification).map_err(|e| {
            ClientError::protocol(format!("failed to serialise notification: {e}"))
        })?;
        self.transport.lock().await.send(&json).await
    }

    async fn handshake(&mut self) -> ClientResult<InitializeResult> {
        let params = InitializeParams {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: json!({}),
            client_info: ClientInfo::new(self.client_name.clone()),
        };
        let params = serde_json::to_value(params)
            .map_err(|e| ClientError::protocol(format!("failed to serialise params: {e}")))?;

        let result = self.request("initialize", Some(params)).await?;
        let result: InitializeResult = serde_json::from_value(result)
            .map_err(|e| ClientError::handshake(format!("invalid initialize result: {e}")))?;

        if !SUPPORTED_PROTOCOL_VERSIONS.contains(&result.protocol_version.as_str()) {
            return Err(ClientError::handshake(format!(
                "unsupported protocol version '{}'",
                result.protocol_version
            )));
        }

        self.notify(&OutgoingNotification::initialized()).await?;
        Ok(result)
    }
}

#[async_trait]
impl Session for RpcSession {
    async fn initialize(&mut self) -> ClientResult<InitializeResult> {
        match self.state {
            SessionState::Uninitialized => {}
            SessionState::Ready => return Err(ClientError::AlreadyConnected),
            SessionState::Closed => return Err(ClientError::Closed),
        }

        let result = self.handshake().await.map_err(|e| match e {
            ClientError::HandshakeFailure { .. } | ClientError::Closed => e,
            other => ClientError::handshake(other.to_string()),
        })?;

        tracing::info!(
            server = %result.server_info.name,
            version = result.server_info.version.as_deref().unwrap_or("unknown"),
            protocol = %result.protocol_version,
            "Session initialised"
        );

        self.state = SessionState::Ready;
        Ok(result)
    }

    async fn list(
        &mut self,
        category: CapabilityCategory,
    ) -> ClientResult<Vec<CapabilityDescriptor>> {
        self.require_ready()?;

        let mut items = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let params = cursor.take().map(|c| json!({ "cursor": c }));
            let result = self.request(category.list_method(), params).await?;
            let (page, next) = parse_list_page(category, result)?;
            items.extend(page);

            match next {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => return Ok(items),
            }
        }

        tracing::warn!(
            %category,
            pages = MAX_LIST_PAGES,
            "Listing truncated, server kept returning cursors"
        );
        Ok(items)
    }

    async fn call_tool(&mut self, name: &str, arguments: Value) -> ClientResult<ToolCallResult> {
        self.require_ready()?;

        let params = serde_json::to_value(ToolCallParams {
            name: name.to_string(),
            arguments,
        })
        .map_err(|e| ClientError::protocol(format!("failed to serialise params: {e}")))?;

        let result = self.request("tools/call", Some(params)).await?;
        serde_json::from_value(result)
            .map_err(|e| ClientError::protocol(format!("invalid tools/call result: {e}")))
    }

    async fn ping(&mut self) -> ClientResult<()> {
        self.require_ready()?;
        self.request("ping", None).await.map(|_| ())
    }

    async fn close(&mut self) -> ClientResult<()> {
        if self.state != SessionState::Closed {
            tracing::debug!(previous = ?self.state, "Closing session");
            self.state = SessionState::Closed;
        }
        Ok(())
    }

    fn state(&self) -> SessionState {
        self.state
    }
}

/// Reads messages until the response to `id` arrives.
async fn await_response(
    transport: &mut dyn Transport,
    id: &RequestId,
    method: &str,
) -> ClientResult<Value> {
    loop {
        let Some(line) = transport.receive().await? else {
            return Err(ClientError::protocol(format!(
                "server closed its output while waiting for '{method}'"
            )));
        };

        if line.trim().is_empty() {
            continue;
        }

        let message = match parse_message(&line) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed message from server");
                continue;
            }
        };

        match message {
            IncomingMessage::Response { id: reply_id, result } if reply_id == *id => {
                return Ok(result);
            }
            IncomingMessage::Error { id: reply_id, error }
                if reply_id.as_ref().map_or(true, |reply_id| reply_id == id) =>
            {
                return Err(ClientError::Rpc {
                    method: method.to_string(),
                    code: error.code,
                    message: error.message,
                });
            }
            IncomingMessage::Request(request) => {
                answer_server_request(transport, &request).await?;
            }
            IncomingMessage::Notification(notification) => {
                tracing::debug!(method = %notification.method, "Server notification");
            }
            stale => {
                tracing::debug!(id = ?stale.response_id(), "Discarding response to an earlier request");
            }
        }
    }
}

/// Replies to a server-initiated request. Only `ping` is supported.
async fn answer_server_request(
    transport: &mut dyn Transport,
    request: &JsonRpcRequest,
) -> ClientResult<()> {
    let reply = if request.method == "ping" {
        serde_json::to_string(&JsonRpcResponse::success(request.id.clone(), json!({})))
    } else {
        tracing::debug!(method = %request.method, "Rejecting unsupported server request");
        serde_json::to_string(&JsonRpcError::method_not_found(
            request.id.clone(),
            &request.method,
        ))
    }
    .map_err(|e| ClientError::protocol(format!("failed to serialise reply: {e}")))?;

    transport.send(&reply).await
}

/// Splits a list result into its items and the next cursor.
fn parse_list_page(
    category: CapabilityCategory,
    mut result: Value,
) -> ClientResult<(Vec<CapabilityDescriptor>, Option<String>)> {
    let items = result
        .get_mut(category.name())
        .map(Value::take)
        .ok_or_else(|| {
            ClientError::protocol(format!(
                "{} result has no '{}' field",
                category.list_method(),
                category.name()
            ))
        })?;

    let items: Vec<CapabilityDescriptor> = serde_json::from_value(items).map_err(|e| {
        ClientError::protocol(format!("invalid {} entry: {e}", category.name()))
    })?;

    let next = result
        .get("nextCursor")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok((items, next))
}
