//! Error module for the Makai MCP protocol engine.
//!
//! Provides the crate-wide error enum and its domain submodules, following
//! explicit error types with `#[from]` conversions and proper propagation.
//! Framing and transport failures terminate only their connection; envelope
//! and handler failures are folded into JSON-RPC error responses before
//! they reach this level.

use thiserror::Error;

pub mod config;
pub mod framing;
pub mod transport;

/// Result type alias used throughout the engine.
pub type MakaiResult<T> = Result<T, MakaiError>;

/// Core error enum for the Makai MCP protocol engine.
#[derive(Error, Debug)]
pub enum MakaiError {
    /// Errors occurring during configuration loading or validation.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Errors raised while framing messages on a byte stream.
    #[error("Framing error: {0}")]
    Framing(#[from] framing::FramingError),

    /// Errors related to transport mechanisms (stdio, TCP).
    #[error("Transport error: {0}")]
    Transport(#[from] transport::TransportError),

    /// Errors from the JSON-RPC envelope codec.
    #[error("Protocol error: {0}")]
    Protocol(#[from] crate::protocol::jsonrpc::error::Error),

    /// IO errors that may occur during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/Deserialization errors.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Custom error with message for cases without a dedicated type.
    #[error("{0}")]
    Custom(String),
}
