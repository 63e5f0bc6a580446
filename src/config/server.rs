//! Server configuration module.
//!
//! Defines the transport, framing, and connection settings for the protocol
//! engine.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use super::{ConfigResult, Validate};
use crate::error::config::ConfigError;
use crate::framing::{FramingMode, DEFAULT_MAX_FRAME_LEN};

/// Transport type for the server.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransportType {
    /// Standard I/O transport, one session per process
    Stdio,
    /// TCP transport, one session per accepted connection
    Tcp,
}

impl Default for TransportType {
    fn default() -> Self {
        Self::Stdio
    }
}

/// Framing scheme for the byte stream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FramingType {
    /// Newline-delimited JSON messages
    Line,
    /// Content-Length prefixed messages (LSP-style)
    ContentLength,
}

impl Default for FramingType {
    fn default() -> Self {
        Self::Line
    }
}

impl From<FramingType> for FramingMode {
    fn from(framing: FramingType) -> Self {
        match framing {
            FramingType::Line => FramingMode::newline(),
            FramingType::ContentLength => FramingMode::ContentLength,
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Name of the server (used in logs)
    pub name: String,

    /// Transport to use for communication
    pub transport: TransportType,

    /// Framing scheme applied to the stream
    pub framing: FramingType,

    /// Address to bind to for TCP transport
    pub address: SocketAddr,

    /// Maximum message size in bytes
    pub max_message_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "makai-mcp".to_string(),
            transport: TransportType::default(),
            framing: FramingType::default(),
            address: default_address(),
            max_message_size: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

fn default_address() -> SocketAddr {
    // Loopback with a fixed default port; infallible parse of a literal
    SocketAddr::from(([127, 0, 0, 1], 8765))
}

impl Validate for ServerConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Server name cannot be empty".to_string(),
            ));
        }

        if self.max_message_size == 0 {
            return Err(ConfigError::ValidationError(
                "max_message_size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
