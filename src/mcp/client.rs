//! MCP client connection lifecycle.
//!
//! The client moves through `Unconnected → Connecting → Ready → Closed`:
//!
//! 1. **Connect**: validate the endpoint, open the transport, open the
//!    session, handshake. Every acquired resource goes on the
//!    [`ResourceStack`]; a failure unwinds it before the error is returned.
//! 2. **Operation**: capability listing and invocation while `Ready`.
//! 3. **Close**: unwind the stack (session, then transport and process).
//!    Closing is idempotent and allowed from every state.
//!
//! A failed or cancelled connect ends in `Closed`; reconnecting takes a new
//! client.
//! Methods take `&mut self`, so callers sharing a client must serialise
//! access themselves.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use crate::config::SessionConfig;
use crate::error::{CapabilityListingError, ClientError, ClientResult};
use crate::mcp::capability::{CapabilityCategory, CapabilityDescriptor, CapabilityListing};
use crate::mcp::launcher::{Launcher, ProcessLauncher, ServerEndpoint};
use crate::mcp::schema::{InitializeResult, ToolCallResult};
use crate::mcp::session::{RpcSessionFactory, SessionFactory, SharedSession};
use crate::mcp::stack::ResourceStack;
use crate::mcp::transport::shared;

/// Client state in the connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Created, `connect` not yet called.
    Unconnected,
    /// `connect` in progress.
    Connecting,
    /// Handshake complete, ready for normal operation.
    Ready,
    /// Closed; stays closed.
    Closed,
}

/// A client for one MCP server.
pub struct McpClient {
    launcher: Arc<dyn Launcher>,
    sessions: Arc<dyn SessionFactory>,
    state: ClientState,
    stack: ResourceStack,
    session: Option<SharedSession>,
    server: Option<InitializeResult>,
}

impl McpClient {
    /// Creates a client that launches servers as child processes.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self::with_parts(
            Arc::new(ProcessLauncher),
            Arc::new(RpcSessionFactory::new(config)),
        )
    }

    /// Creates a client from an explicit launcher and session factory.
    #[must_use]
    pub fn with_parts(launcher: Arc<dyn Launcher>, sessions: Arc<dyn SessionFactory>) -> Self {
        Self {
            launcher,
            sessions,
            state: ClientState::Unconnected,
            stack: ResourceStack::new(),
            session: None,
            server: None,
        }
    }

    /// Returns the current client state.
    #[must_use]
    pub const fn state(&self) -> ClientState {
        self.state
    }

    /// Returns the server's initialize result once connected.
    #[must_use]
    pub const fn server(&self) -> Option<&InitializeResult> {
        self.server.as_ref()
    }

    /// Connects to the server described by `endpoint`.
    ///
    /// # Errors
    ///
    /// - [`ClientError::AlreadyConnected`] if connecting or connected
    /// - [`ClientError::Closed`] after close or a failed connect
    /// - [`ClientError::UnsupportedServerKind`] before anything is started;
    ///   the client stays `Unconnected`
    /// - [`ClientError::TransportStartFailure`] or
    ///   [`ClientError::HandshakeFailure`]; acquired resources are released
    ///   and the client is `Closed`
    ///
    /// Dropping the returned future part way also leaves the client
    /// `Closed` and releases what was acquired.
    pub async fn connect(&mut self, endpoint: &ServerEndpoint) -> ClientResult<&InitializeResult> {
        match self.state {
            ClientState::Unconnected => {}
            ClientState::Connecting | ClientState::Ready => {
                return Err(ClientError::AlreadyConnected)
            }
            ClientState::Closed => return Err(ClientError::Closed),
        }

        endpoint.validate()?;

        self.state = ClientState::Connecting;
        tracing::info!(script = %endpoint.script().display(), "Connecting to server");

        let mut guard = ConnectGuard {
            client: self,
            armed: true,
        };
        let outcome = guard.client.establish(endpoint).await;
        guard.disarm();

        match outcome {
            Ok(result) => {
                self.state = ClientState::Ready;
                Ok(self.server.insert(result))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Connection failed, releasing acquired resources");
                self.shutdown().await;
                Err(e)
            }
        }
    }

    async fn establish(&mut self, endpoint: &ServerEndpoint) -> ClientResult<InitializeResult> {
        let transport = shared(self.launcher.open(endpoint).await?);
        self.stack.push(Box::new(Arc::clone(&transport)));

        let session: SharedSession = Arc::new(Mutex::new(self.sessions.open_session(transport)));
        self.stack.push(Box::new(Arc::clone(&session)));
        self.session = Some(Arc::clone(&session));

        let result = session.lock().await.initialize().await?;
        Ok(result)
    }

    /// Returns the session if the client is ready.
    fn ready_session(&self) -> ClientResult<SharedSession> {
        match (self.state, &self.session) {
            (ClientState::Ready, Some(session)) => Ok(Arc::clone(session)),
            (ClientState::Closed, _) => Err(ClientError::Closed),
            _ => Err(ClientError::NotConnected),
        }
    }

    /// Lists tools, prompts and resources.
    ///
    /// Each category is requested independently; a failing category is
    /// recorded in its own slot and the others are still listed. Missing
    /// descriptions are replaced by the "No description" placeholder.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] or [`ClientError::Closed`] if
    /// the client is not ready. Listing failures are never returned here.
    pub async fn list_capabilities(&mut self) -> ClientResult<CapabilityListing> {
        let session = self.ready_session()?;
        let mut listing = CapabilityListing::default();

        for category in CapabilityCategory::ALL {
            let result = session.lock().await.list(category).await;
            let result = match result {
                Ok(items) => {
                    tracing::debug!(%category, count = items.len(), "Listed capabilities");
                    Ok(items
                        .into_iter()
                        .map(CapabilityDescriptor::with_default_description)
                        .collect())
                }
                Err(e) => {
                    tracing::warn!(%category, error = %e, "Failed to list capabilities");
                    Err(CapabilityListingError::new(category.name(), &e))
                }
            };
            listing.set(category, result);
        }

        Ok(listing)
    }

    /// Invokes a tool on the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the client is not ready or the call fails.
    pub async fn call_tool(&mut self, name: &str, arguments: Value) -> ClientResult<ToolCallResult> {
        let session = self.ready_session()?;
        let result = session.lock().await.call_tool(name, arguments).await?;
        Ok(result)
    }

    /// Checks that the server is responsive.
    ///
    /// # Errors
    ///
    /// Returns an error if the client is not ready or the ping fails.
    pub async fn ping(&mut self) -> ClientResult<()> {
        let session = self.ready_session()?;
        session.lock().await.ping().await?;
        Ok(())
    }

    /// Releases everything the client holds and moves it to `Closed`.
    ///
    /// Safe to call from any state and any number of times. Release
    /// failures are logged, never returned.
    pub async fn close(&mut self) {
        if self.state == ClientState::Closed && self.stack.is_empty() {
            return;
        }
        self.shutdown().await;
    }

    /// Handles a `connect` that was dropped before it finished.
    ///
    /// The client becomes `Closed` at once and the held resources are
    /// released on a spawned task. Without a runtime they are dropped, and
    /// `kill_on_drop` ends the server process.
    fn abandon_connect(&mut self) {
        self.state = ClientState::Closed;
        self.session = None;

        let mut stack = std::mem::take(&mut self.stack);
        if stack.is_empty() {
            return;
        }

        tracing::warn!(held = stack.len(), "Connect cancelled, releasing acquired resources");
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    let failures = stack.unwind().await;
                    tracing::debug!(failures = failures.len(), "Cancelled connect released");
                });
            }
            Err(_) => tracing::warn!("No runtime to release resources on, dropping them"),
        }
    }

    async fn shutdown(&mut self) {
        self.state = ClientState::Closed;
        self.session = None;

        let failures = self.stack.unwind().await;
        if failures.is_empty() {
            tracing::info!("Connection closed");
        } else {
            tracing::warn!(
                failures = failures.len(),
                "Connection closed, some resources failed to release"
            );
        }
    }
}

/// Unwinds a `connect` whose future is dropped part way.
struct ConnectGuard<'a> {
    client: &'a mut McpClient,
    armed: bool,
}

impl ConnectGuard<'_> {
    /// Marks the connect as finished; normal error handling takes over.
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ConnectGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.client.abandon_connect();
        }
    }
}

impl Drop for McpClient {
    fn drop(&mut self) {
        if !self.stack.is_empty() {
            tracing::warn!(
                held = self.stack.len(),
                "Client dropped without close, the server process will be killed"
            );
        }
    }
}

impl std::fmt::Debug for McpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpClient")
            .field("state", &self.state)
            .field("stack", &self.stack)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::assert_err;

    use super::*;

    #[test]
    fn client_initial_state() {
        let client = McpClient::new(SessionConfig::default());
        assert_eq!(client.state(), ClientState::Unconnected);
        assert!(client.server().is_none());
    }

    #[tokio::test]
    async fn operations_require_connection() {
        let mut client = McpClient::new(SessionConfig::default());

        let err = assert_err!(client.list_capabilities().await);
        assert!(matches!(err, ClientError::NotConnected));
        let err = assert_err!(client.ping().await);
        assert!(matches!(err, ClientError::NotConnected));
    }

    #[tokio::test]
    async fn close_without_connect_is_a_no_op() {
        let mut client = McpClient::new(SessionConfig::default());
        client.close().await;
        client.close().await;
        assert_eq!(client.state(), ClientState::Closed);

        let err = assert_err!(client.list_capabilities().await);
        assert!(matches!(err, ClientError::Closed));
        let err = assert_err!(client.connect(&ServerEndpoint::new("server.py")).await);
        assert!(matches!(err, ClientError::Closed));
    }

    #[tokio::test]
    async fn unsupported_kind_leaves_client_unconnected() {
        let mut client = McpClient::new(SessionConfig::default());
        let err = assert_err!(client.connect(&ServerEndpoint::new("server.exe")).await);
        assert!(matches!(err, ClientError::UnsupportedServerKind { .. }));
        assert_eq!(client.state(), ClientState::Unconnected);
    }

    #[tokio::test]
    async fn start_failure_closes_client() {
        let mut client = McpClient::new(SessionConfig::default());
        let endpoint =
            ServerEndpoint::new("server.py").with_interpreter("/nonexistent/mcp-client-interpreter");

        let err = assert_err!(client.connect(&endpoint).await);
        assert!(matches!(err, ClientError::TransportStartFailure { .. }));
        assert_eq!(client.state(), ClientState::Closed);
        assert!(client.stack.is_empty());
    }
}
