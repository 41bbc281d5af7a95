//! stdio transport for the MCP client.
//!
//! This module implements the client end of the MCP stdio transport:
//!
//! - Messages are UTF-8 encoded JSON-RPC
//! - Messages are delimited by newlines
//! - Messages must not contain embedded newlines
//! - server stdin: receives messages from the client
//! - server stdout: sends messages to the client
//! - server stderr: diagnostics only, passed through to ours
//!
//! # Shutdown
//!
//! Closing the transport closes the server's stdin (EOF is the stdio
//! transport's shutdown signal), drops the read half and then waits for the
//! server process to exit. There is no timeout on that wait; the child is
//! spawned with `kill_on_drop`, so a transport that is dropped instead of
//! closed still terminates the process.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::sync::Mutex;

use crate::error::{ClientError, ClientResult};

/// A duplex, newline-delimited message channel to a server.
#[async_trait]
pub trait Transport: Send {
    /// Writes one message, terminated by a newline.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Closed`] after [`close`](Self::close), or an
    /// I/O error if writing fails.
    async fn send(&mut self, message: &str) -> ClientResult<()>;

    /// Reads the next message line.
    ///
    /// Returns `None` when the server closed its output (EOF).
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Closed`] after [`close`](Self::close), or an
    /// I/O error if reading fails.
    async fn receive(&mut self) -> ClientResult<Option<String>>;

    /// Closes both stream halves, then waits for the server process.
    ///
    /// Idempotent: closing a closed transport is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if waiting for the process fails. The transport is
    /// considered closed regardless.
    async fn close(&mut self) -> ClientResult<()>;

    /// Returns `true` once [`close`](Self::close) has been called.
    fn is_closed(&self) -> bool;
}

/// A transport shared between the session using it and the resource stack
/// that releases it.
pub type SharedTransport = Arc<Mutex<Box<dyn Transport>>>;

/// Wraps a transport for sharing.
#[must_use]
pub fn shared(transport: Box<dyn Transport>) -> SharedTransport {
    Arc::new(Mutex::new(transport))
}

/// A line transport over a reader/writer pair, optionally owning the server
/// process behind them.
pub struct StdioTransport<R, W> {
    /// Buffered reader for the server's output.
    reader: Option<BufReader<R>>,
    /// Handle for the server's input.
    writer: Option<W>,
    /// The server process, if this transport launched one.
    child: Option<Child>,
    closed: bool,
}

impl StdioTransport<ChildStdout, ChildStdin> {
    /// Creates a transport over a spawned child's piped stdio.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Protocol`] if stdin or stdout was not piped.
    pub fn from_child(mut child: Child) -> ClientResult<Self> {
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ClientError::protocol("server stdin is not piped"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ClientError::protocol("server stdout is not piped"))?;

        Ok(Self {
            reader: Some(BufReader::new(stdout)),
            writer: Some(stdin),
            child: Some(child),
            closed: false,
        })
    }
}

impl<R, W> StdioTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Creates a transport over arbitrary streams, with no process attached.
    #[must_use]
    pub fn from_streams(reader: R, writer: W) -> Self {
        Self {
            reader: Some(BufReader::new(reader)),
            writer: Some(writer),
            child: None,
            closed: false,
        }
    }

    /// Returns the server process ID, while the process is owned and running.
    #[must_use]
    pub fn process_id(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    /// Writes a raw JSON string with newline termination.
    async fn write_raw(&mut self, json: &str) -> ClientResult<()> {
        // MCP stdio framing: messages must not contain embedded newlines
        debug_assert!(
            !json.contains('\n'),
            "JSON message must not contain embedded newlines"
        );

        let writer = self.writer.as_mut().ok_or(ClientError::Closed)?;
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;

        Ok(())
    }
}

#[async_trait]
impl<R, W> Transport for StdioTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, message: &str) -> ClientResult<()> {
        self.write_raw(message).await
    }

    async fn receive(&mut self) -> ClientResult<Option<String>> {
        let reader = self.reader.as_mut().ok_or(ClientError::Closed)?;

        let mut line = String::new();
        let bytes_read = reader.read_line(&mut line).await?;

        if bytes_read == 0 {
            // EOF - server stdout closed
            return Ok(None);
        }

        // Remove the trailing newline
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }

        Ok(Some(line))
    }

    async fn close(&mut self) -> ClientResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.shutdown().await {
                // The server may already be gone; the pipe is dropped either way.
                tracing::debug!(error = %e, "Error closing server input");
            }
        }
        self.reader = None;

        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        let pid = child.id();
        tracing::debug!(pid, "Waiting for server process to exit");
        let status = child.wait().await?;
        tracing::info!(pid, %status, "Server process exited");

        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}
