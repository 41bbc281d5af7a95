//! Shared fakes for client lifecycle tests.
//!
//! - [`FakeLauncher`] counts `open` calls and hands out [`FakeTransport`]s
//! - [`FakeTransport`] records when it is closed
//! - [`FakeSessions`] builds [`FakeSession`]s that follow a [`ServerScript`]
//!
//! Every fake writes to one shared [`EventLog`] so tests can assert the order
//! in which resources are released.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use mcp_client::error::{ClientError, ClientResult};
use mcp_client::mcp::schema::{InitializeResult, ToolCallResult};
use mcp_client::mcp::{
    CapabilityCategory, CapabilityDescriptor, Launcher, McpClient, ServerEndpoint, Session,
    SessionFactory, SessionState, SharedTransport, Transport,
};

/// Ordered record of lifecycle events.
pub type EventLog = Arc<Mutex<Vec<String>>>;

fn record(log: &EventLog, event: impl Into<String>) {
    log.lock().unwrap().push(event.into());
}

/// Returns a copy of the events recorded so far.
pub fn events(log: &EventLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

// =============================================================================
// Transport
// =============================================================================

/// A transport with no peer. Records each `close` call.
pub struct FakeTransport {
    log: EventLog,
    closed: bool,
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&mut self, _message: &str) -> ClientResult<()> {
        if self.closed {
            return Err(ClientError::Closed);
        }
        Ok(())
    }

    async fn receive(&mut self) -> ClientResult<Option<String>> {
        if self.closed {
            return Err(ClientError::Closed);
        }
        Ok(None)
    }

    async fn close(&mut self) -> ClientResult<()> {
        record(&self.log, "transport closed");
        self.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

// =============================================================================
// Launcher
// =============================================================================

/// A launcher that never starts a process.
pub struct FakeLauncher {
    log: EventLog,
    opens: AtomicUsize,
    fail_start: bool,
}

impl FakeLauncher {
    /// Creates a launcher whose transports write to `log`.
    pub fn new(log: &EventLog) -> Self {
        Self {
            log: Arc::clone(log),
            opens: AtomicUsize::new(0),
            fail_start: false,
        }
    }

    /// Makes every `open` fail as if the interpreter were missing.
    pub fn failing(log: &EventLog) -> Self {
        Self {
            fail_start: true,
            ..Self::new(log)
        }
    }

    /// Number of times `open` was called.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Launcher for FakeLauncher {
    async fn open(&self, endpoint: &ServerEndpoint) -> ClientResult<Box<dyn Transport>> {
        self.opens.fetch_add(1, Ordering::SeqCst);

        if self.fail_start {
            return Err(ClientError::TransportStartFailure {
                command: endpoint.interpreter().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such interpreter"),
            });
        }

        record(&self.log, "transport opened");
        Ok(Box::new(FakeTransport {
            log: Arc::clone(&self.log),
            closed: false,
        }))
    }
}

// =============================================================================
// Session
// =============================================================================

/// What a listing request for one category returns.
pub type ScriptedListing = Result<Vec<CapabilityDescriptor>, String>;

/// Behaviour of the fake server behind a [`FakeSession`].
#[derive(Debug, Clone)]
pub struct ServerScript {
    /// Handshake rejection reason, if the handshake should fail.
    pub handshake_error: Option<String>,
    /// Never answer the handshake.
    pub hang_handshake: bool,
    /// Tools listing.
    pub tools: ScriptedListing,
    /// Prompts listing.
    pub prompts: ScriptedListing,
    /// Resources listing.
    pub resources: ScriptedListing,
}

impl Default for ServerScript {
    fn default() -> Self {
        Self {
            handshake_error: None,
            hang_handshake: false,
            tools: Ok(Vec::new()),
            prompts: Ok(Vec::new()),
            resources: Ok(Vec::new()),
        }
    }
}

impl ServerScript {
    /// The echo server: one tool, no prompts, one undescribed resource.
    pub fn echo_server() -> Self {
        Self {
            tools: Ok(vec![CapabilityDescriptor::new(
                "add",
                Some("adds two numbers"),
            )]),
            resources: Ok(vec![CapabilityDescriptor::new("log.txt", None)]),
            ..Self::default()
        }
    }

    /// Rejects the handshake with `reason`.
    pub fn rejecting_handshake(reason: &str) -> Self {
        Self {
            handshake_error: Some(reason.to_string()),
            ..Self::default()
        }
    }

    /// Never answers the handshake.
    pub fn hanging_handshake() -> Self {
        Self {
            hang_handshake: true,
            ..Self::default()
        }
    }

    fn listing(&self, category: CapabilityCategory) -> &ScriptedListing {
        match category {
            CapabilityCategory::Tools => &self.tools,
            CapabilityCategory::Prompts => &self.prompts,
            CapabilityCategory::Resources => &self.resources,
        }
    }
}

/// A session answering from a [`ServerScript`].
pub struct FakeSession {
    script: ServerScript,
    log: EventLog,
    state: SessionState,
}

#[async_trait]
impl Session for FakeSession {
    async fn initialize(&mut self) -> ClientResult<InitializeResult> {
        if self.script.hang_handshake {
            std::future::pending::<()>().await;
        }
        if let Some(reason) = &self.script.handshake_error {
            return Err(ClientError::handshake(reason.clone()));
        }

        self.state = SessionState::Ready;
        record(&self.log, "session initialised");
        let result = serde_json::from_value(json!({
            "protocolVersion": "2024-11-05",
            "capabilities": { "tools": {}, "prompts": {}, "resources": {} },
            "serverInfo": { "name": "fake", "version": "0.0.1" }
        }))
        .map_err(|e| ClientError::protocol(e.to_string()))?;
        Ok(result)
    }

    async fn list(
        &mut self,
        category: CapabilityCategory,
    ) -> ClientResult<Vec<CapabilityDescriptor>> {
        if self.state != SessionState::Ready {
            return Err(ClientError::NotConnected);
        }
        record(&self.log, format!("listed {category}"));

        self.script
            .listing(category)
            .clone()
            .map_err(|message| ClientError::Rpc {
                method: category.list_method().to_string(),
                code: -32601,
                message,
            })
    }

    async fn call_tool(&mut self, name: &str, arguments: Value) -> ClientResult<ToolCallResult> {
        if self.state != SessionState::Ready {
            return Err(ClientError::NotConnected);
        }
        record(&self.log, format!("called {name}"));

        serde_json::from_value(json!({
            "content": [{ "type": "text", "text": arguments.to_string() }]
        }))
        .map_err(|e| ClientError::protocol(e.to_string()))
    }

    async fn ping(&mut self) -> ClientResult<()> {
        if self.state == SessionState::Ready {
            Ok(())
        } else {
            Err(ClientError::NotConnected)
        }
    }

    async fn close(&mut self) -> ClientResult<()> {
        record(&self.log, "session closed");
        self.state = SessionState::Closed;
        Ok(())
    }

    fn state(&self) -> SessionState {
        self.state
    }
}

/// Builds [`FakeSession`]s for one [`ServerScript`].
pub struct FakeSessions {
    script: ServerScript,
    log: EventLog,
}

impl FakeSessions {
    /// Creates a factory whose sessions follow `script`.
    pub fn new(script: ServerScript, log: &EventLog) -> Self {
        Self {
            script,
            log: Arc::clone(log),
        }
    }
}

impl SessionFactory for FakeSessions {
    fn open_session(&self, _transport: SharedTransport) -> Box<dyn Session> {
        Box::new(FakeSession {
            script: self.script.clone(),
            log: Arc::clone(&self.log),
            state: SessionState::Uninitialized,
        })
    }
}

// =============================================================================
// Client
// =============================================================================

/// A client wired to fakes, with handles for inspecting them.
pub struct Harness {
    pub client: McpClient,
    pub launcher: Arc<FakeLauncher>,
    pub log: EventLog,
}

impl Harness {
    /// Creates a client talking to a fake server following `script`.
    pub fn new(script: ServerScript) -> Self {
        let log = EventLog::default();
        Self::with_launcher(FakeLauncher::new(&log), script, log)
    }

    /// Creates a client whose launcher cannot start anything.
    pub fn failing_start() -> Self {
        let log = EventLog::default();
        Self::with_launcher(FakeLauncher::failing(&log), ServerScript::default(), log)
    }

    fn with_launcher(launcher: FakeLauncher, script: ServerScript, log: EventLog) -> Self {
        let launcher = Arc::new(launcher);
        let client = McpClient::with_parts(
            Arc::clone(&launcher) as Arc<dyn Launcher>,
            Arc::new(FakeSessions::new(script, &log)),
        );
        Self {
            client,
            launcher,
            log,
        }
    }

    /// Events recorded so far.
    pub fn events(&self) -> Vec<String> {
        events(&self.log)
    }
}
