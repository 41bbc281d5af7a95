//! Ordered release of acquired resources.
//!
//! Resources are pushed as they are acquired and released in strict reverse
//! order. An entry is removed from the stack before it is released, so each
//! entry is released at most once, even if an unwind is interrupted and
//! started again. A failing release is logged and collected; it never stops
//! the entries below it from being released.

use async_trait::async_trait;

use crate::error::{ClientError, ClientResult};
use crate::mcp::session::SharedSession;
use crate::mcp::transport::SharedTransport;

/// A resource that can be released.
#[async_trait]
pub trait Release: Send {
    /// Short name used in logs.
    fn label(&self) -> &'static str;

    /// Releases the resource.
    ///
    /// # Errors
    ///
    /// Returns the failure; the caller logs it and carries on.
    async fn release(&mut self) -> ClientResult<()>;
}

#[async_trait]
impl Release for SharedTransport {
    fn label(&self) -> &'static str {
        "transport"
    }

    async fn release(&mut self) -> ClientResult<()> {
        self.lock().await.close().await
    }
}

#[async_trait]
impl Release for SharedSession {
    fn label(&self) -> &'static str {
        "session"
    }

    async fn release(&mut self) -> ClientResult<()> {
        self.lock().await.close().await
    }
}

/// A release that failed during an unwind.
#[derive(Debug)]
pub struct ReleaseFailure {
    /// Label of the resource.
    pub label: &'static str,
    /// The error reported by its release.
    pub error: ClientError,
}

/// Resources in acquisition order.
#[derive(Default)]
pub struct ResourceStack {
    entries: Vec<Box<dyn Release>>,
}

impl ResourceStack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a freshly acquired resource.
    pub fn push(&mut self, resource: Box<dyn Release>) {
        tracing::trace!(resource = resource.label(), depth = self.entries.len() + 1, "Acquired");
        self.entries.push(resource);
    }

    /// Returns the number of resources still held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Releases every resource, most recent first.
    ///
    /// Returns the failures in release order. The stack is empty afterwards.
    pub async fn unwind(&mut self) -> Vec<ReleaseFailure> {
        let mut failures = Vec::new();

        while let Some(mut resource) = self.entries.pop() {
            let label = resource.label();
            match resource.release().await {
                Ok(()) => tracing::debug!(resource = label, "Released"),
                Err(error) => {
                    tracing::warn!(resource = label, error = %error, "Failed to release resource");
                    failures.push(ReleaseFailure { label, error });
                }
            }
        }

        failures
    }
}

impl std::fmt::Debug for ResourceStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|entry| entry.label()))
            .finish()
    }
}
