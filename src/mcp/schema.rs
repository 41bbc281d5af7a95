//! MCP payload types exchanged inside JSON-RPC messages.
//!
//! Only the subset the client needs is modelled. Unknown fields sent by the
//! server are ignored so newer servers keep working.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::mcp::capability::CapabilityCategory;

/// Client information sent during initialisation.
#[derive(Debug, Clone, Serialize)]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    pub version: String,
}

impl ClientInfo {
    /// Creates client information with this crate's version.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Parameters for the initialize request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by the client.
    pub protocol_version: String,
    /// Client capabilities. The client offers none.
    pub capabilities: Value,
    /// Client information.
    pub client_info: ClientInfo,
}

/// Server information received during initialisation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Capabilities advertised by the server.
///
/// Each field is the raw capability object; presence means "supported".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    #[serde(default)]
    pub tools: Option<Value>,
    /// Prompt-related capabilities.
    #[serde(default)]
    pub prompts: Option<Value>,
    /// Resource-related capabilities.
    #[serde(default)]
    pub resources: Option<Value>,
    /// Logging capability.
    #[serde(default)]
    pub logging: Option<Value>,
}

impl ServerCapabilities {
    /// Returns whether the server advertised `category`.
    #[must_use]
    pub const fn advertises(&self, category: CapabilityCategory) -> bool {
        match category {
            CapabilityCategory::Tools => self.tools.is_some(),
            CapabilityCategory::Prompts => self.prompts.is_some(),
            CapabilityCategory::Resources => self.resources.is_some(),
        }
    }
}

/// Result of the initialize request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// Protocol version chosen by the server.
    pub protocol_version: String,
    /// Server capabilities.
    #[serde(default)]
    pub capabilities: ServerCapabilities,
    /// Server information.
    #[serde(default)]
    pub server_info: ServerInfo,
    /// Optional usage instructions from the server.
    #[serde(default)]
    pub instructions: Option<String>,
}

/// Parameters for tools/call request.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallParams {
    /// Name of the tool to call.
    pub name: String,
    /// Arguments for the tool.
    pub arguments: Value,
}

/// Content item in a tool call response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
    /// Image content (data omitted).
    Image {
        /// Image MIME type.
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    /// An embedded resource.
    Resource {
        /// The resource payload.
        resource: Value,
    },
    /// Any content type this client does not render.
    #[serde(other)]
    Unsupported,
}

/// Result of a tool call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Content returned by the tool.
    #[serde(default)]
    pub content: Vec<ToolContent>,
    /// Whether the tool call resulted in an error.
    #[serde(default)]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Concatenates all text content, one block per line.
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| match c {
                ToolContent::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
