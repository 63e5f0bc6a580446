//! Provider interfaces for tool, resource, and prompt collaborators.
//!
//! The protocol engine routes `tools/*`, `resources/*`, and `prompts/*`
//! methods to these traits; their internal logic is outside the engine's
//! concern. Providers are explicit instances injected at server
//! construction and shared by reference — no global registries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::protocol::jsonrpc::dispatcher::RequestContext;
use crate::protocol::jsonrpc::error::JsonRpcError;

pub mod builtin;

/// One block of tool output content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    /// Plain text content.
    Text {
        /// The text payload.
        text: String,
    },
}

impl ContentBlock {
    /// Convenience constructor for text content.
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }
}

/// Result of a tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Content blocks produced by the tool.
    pub content: Vec<ContentBlock>,

    /// Whether the tool reports a domain-level failure. Distinct from a
    /// protocol error: the response is still a success envelope.
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl ToolOutput {
    /// A successful text output.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            is_error: false,
        }
    }

    /// A tool-level error carried as content.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            is_error: true,
        }
    }
}

/// Descriptor of one tool, as listed by `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name, the key used in `tools/call`.
    pub name: String,

    /// Human-readable description.
    pub description: String,

    /// JSON Schema of the tool's arguments.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Tool collaborator invoked by `tools/list` and `tools/call`.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Lists the available tools.
    fn list(&self) -> Vec<ToolDescriptor>;

    /// Invokes a tool by name.
    ///
    /// The context carries the request id and, for cancellable dispatches,
    /// the cancellation token for cooperative polling.
    async fn call(
        &self,
        name: &str,
        arguments: Value,
        ctx: &RequestContext,
    ) -> Result<ToolOutput, JsonRpcError>;
}

/// Descriptor of one resource, as listed by `resources/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// Resource URI, the key used in `resources/read`.
    pub uri: String,

    /// Human-readable name.
    pub name: String,

    /// MIME type of the contents.
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

/// Contents returned by `resources/read`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceContents {
    /// URI of the resource read.
    pub uri: String,

    /// MIME type of the contents.
    #[serde(rename = "mimeType")]
    pub mime_type: String,

    /// Text contents.
    pub text: String,
}

/// Resource collaborator behind the `resources/*` methods.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Lists the available resources.
    fn list(&self) -> Vec<ResourceDescriptor>;

    /// Reads a resource by URI.
    async fn read(&self, uri: &str) -> Result<ResourceContents, JsonRpcError>;

    /// Subscribes the connection to change notifications for a URI.
    async fn subscribe(&self, uri: &str) -> Result<(), JsonRpcError>;

    /// Removes a subscription for a URI.
    async fn unsubscribe(&self, uri: &str) -> Result<(), JsonRpcError>;
}

/// Descriptor of one prompt, as listed by `prompts/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDescriptor {
    /// Prompt name, the key used in `prompts/get`.
    pub name: String,

    /// Human-readable description.
    pub description: String,
}

/// One message of an expanded prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMessage {
    /// Speaker role, "user" or "assistant".
    pub role: String,

    /// Message content block.
    pub content: ContentBlock,
}

/// Expanded prompt returned by `prompts/get`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptContent {
    /// Description of the prompt.
    pub description: String,

    /// The prompt messages in order.
    pub messages: Vec<PromptMessage>,
}

/// Prompt collaborator behind the `prompts/*` methods.
#[async_trait]
pub trait PromptProvider: Send + Sync {
    /// Lists the available prompts.
    fn list(&self) -> Vec<PromptDescriptor>;

    /// Expands a prompt by name with optional arguments.
    async fn get(&self, name: &str, arguments: Value) -> Result<PromptContent, JsonRpcError>;
}
