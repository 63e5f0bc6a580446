// Copyright (c) 2025 Makai MCP Authors
//
// Licensed under the MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)

//! Error types for the JSON-RPC 2.0 protocol engine.
//!
//! This module defines error codes and error types according to the
//! [JSON-RPC 2.0 specification](https://www.jsonrpc.org/specification#error_object),
//! plus the two server-private codes the MCP lifecycle needs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JSON-RPC 2.0 error codes used by the engine.
///
/// The error codes from -32768 to -32000 are reserved for pre-defined errors.
/// The codes -32700, -32600, -32601, -32602, and -32603 are standard JSON-RPC
/// 2.0 errors; -32000 is the generic server error. -32002 and -32001 are
/// server-private codes for the MCP lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Parse error (-32700)
    /// Invalid JSON was received by the server.
    ParseError = -32700,

    /// Invalid Request (-32600)
    /// The JSON sent is not a valid Request object.
    InvalidRequest = -32600,

    /// Method not found (-32601)
    /// The method does not exist / is not available.
    MethodNotFound = -32601,

    /// Invalid params (-32602)
    /// Invalid method parameter(s).
    InvalidParams = -32602,

    /// Internal error (-32603)
    /// Internal JSON-RPC error.
    InternalError = -32603,

    /// Server error (-32000)
    /// Generic implementation-defined server error.
    ServerError = -32000,

    /// Unsupported protocol version (-32001)
    /// The client declared a protocol version the server does not speak.
    UnsupportedProtocolVersion = -32001,

    /// Server not initialized (-32002)
    /// A post-initialization method was called before the handshake completed.
    ServerNotInitialized = -32002,
}

impl ErrorCode {
    /// Returns a string description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::ParseError => "Parse error",
            ErrorCode::InvalidRequest => "Invalid Request",
            ErrorCode::MethodNotFound => "Method not found",
            ErrorCode::InvalidParams => "Invalid params",
            ErrorCode::InternalError => "Internal error",
            ErrorCode::ServerError => "Server error",
            ErrorCode::UnsupportedProtocolVersion => "Unsupported protocol version",
            ErrorCode::ServerNotInitialized => "Server not initialized",
        }
    }

    /// Create an ErrorCode from a raw integer value.
    ///
    /// Returns None if the code is not one the engine defines.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -32700 => Some(ErrorCode::ParseError),
            -32600 => Some(ErrorCode::InvalidRequest),
            -32601 => Some(ErrorCode::MethodNotFound),
            -32602 => Some(ErrorCode::InvalidParams),
            -32603 => Some(ErrorCode::InternalError),
            -32002 => Some(ErrorCode::ServerNotInitialized),
            -32001 => Some(ErrorCode::UnsupportedProtocolVersion),
            -32000 => Some(ErrorCode::ServerError),
            _ => None,
        }
    }

    /// Returns the integer error code.
    pub fn code(&self) -> i32 {
        *self as i32
    }
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> i32 {
        code as i32
    }
}

/// JSON-RPC error object as defined in the specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// The error code
    pub code: i32,

    /// A short description of the error
    pub message: String,

    /// Additional information about the error (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcError {
    /// Creates a new JSON-RPC error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code as i32,
            message: message.into(),
            data: None,
        }
    }

    /// Creates a new JSON-RPC error with additional data.
    pub fn with_data(code: ErrorCode, message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            code: code as i32,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Creates a standard parse error.
    pub fn parse_error() -> Self {
        Self::new(ErrorCode::ParseError, "Parse error: Invalid JSON was received")
    }

    /// Creates a standard invalid request error.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InvalidRequest,
            format!("Invalid Request: {}", msg.into()),
        )
    }

    /// Creates a standard method not found error.
    pub fn method_not_found<S: Into<String>>(method: S) -> Self {
        Self::new(
            ErrorCode::MethodNotFound,
            format!("Method not found: {}", method.into()),
        )
    }

    /// Creates a standard invalid params error.
    pub fn invalid_params<S: Into<String>>(msg: S) -> Self {
        Self::new(
            ErrorCode::InvalidParams,
            format!("Invalid params: {}", msg.into()),
        )
    }

    /// Creates a standard internal error.
    pub fn internal_error<S: Into<String>>(msg: S) -> Self {
        Self::new(
            ErrorCode::InternalError,
            format!("Internal error: {}", msg.into()),
        )
    }

    /// Creates the server-private "not initialized" lifecycle error.
    pub fn server_not_initialized(method: &str) -> Self {
        Self::new(
            ErrorCode::ServerNotInitialized,
            format!("Server not initialized: {} requires a completed initialize handshake", method),
        )
    }

    /// Creates the server-private protocol-version negotiation error.
    pub fn unsupported_protocol_version(requested: &str, supported: &str) -> Self {
        Self::with_data(
            ErrorCode::UnsupportedProtocolVersion,
            format!("Unsupported protocol version: {}", requested),
            serde_json::json!({ "supported": [supported] }),
        )
    }
}

/// Error type for envelope parsing and codec operations.
#[derive(Debug, Error)]
pub enum Error {
    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Structurally invalid JSON-RPC message (bad version, method, id type)
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Converts the error to a wire-level JSON-RPC error object.
    pub fn to_jsonrpc_error(&self) -> JsonRpcError {
        match self {
            Error::Json(_) => JsonRpcError::parse_error(),
            Error::InvalidMessage(msg) => JsonRpcError::invalid_request(msg.clone()),
            Error::Io(e) => JsonRpcError::new(ErrorCode::ServerError, e.to_string()),
        }
    }
}

/// Specialized Result type for JSON-RPC codec operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_descriptions() {
        assert_eq!(ErrorCode::ParseError.description(), "Parse error");
        assert_eq!(ErrorCode::InvalidRequest.description(), "Invalid Request");
        assert_eq!(ErrorCode::MethodNotFound.description(), "Method not found");
        assert_eq!(ErrorCode::InvalidParams.description(), "Invalid params");
        assert_eq!(ErrorCode::InternalError.description(), "Internal error");
        assert_eq!(
            ErrorCode::ServerNotInitialized.description(),
            "Server not initialized"
        );
    }

    #[test]
    fn test_error_code_from_code() {
        assert_eq!(ErrorCode::from_code(-32700), Some(ErrorCode::ParseError));
        assert_eq!(ErrorCode::from_code(-32600), Some(ErrorCode::InvalidRequest));
        assert_eq!(ErrorCode::from_code(-32601), Some(ErrorCode::MethodNotFound));
        assert_eq!(ErrorCode::from_code(-32602), Some(ErrorCode::InvalidParams));
        assert_eq!(ErrorCode::from_code(-32603), Some(ErrorCode::InternalError));
        assert_eq!(ErrorCode::from_code(-32000), Some(ErrorCode::ServerError));
        assert_eq!(
            ErrorCode::from_code(-32001),
            Some(ErrorCode::UnsupportedProtocolVersion)
        );
        assert_eq!(
            ErrorCode::from_code(-32002),
            Some(ErrorCode::ServerNotInitialized)
        );

        assert_eq!(ErrorCode::from_code(0), None);
        assert_eq!(ErrorCode::from_code(-1), None);
        assert_eq!(ErrorCode::from_code(100), None);
    }

    #[test]
    fn test_jsonrpc_error_creation() {
        let error = JsonRpcError::new(ErrorCode::ParseError, "Invalid JSON");
        assert_eq!(error.code, -32700);
        assert_eq!(error.message, "Invalid JSON");
        assert!(error.data.is_none());

        let error_with_data = JsonRpcError::with_data(
            ErrorCode::InvalidParams,
            "Invalid parameters",
            serde_json::json!({"field": "name", "issue": "required"}),
        );
        assert_eq!(error_with_data.code, -32602);
        assert!(error_with_data.data.is_some());
    }

    #[test]
    fn test_lifecycle_errors() {
        let not_init = JsonRpcError::server_not_initialized("tools/list");
        assert_eq!(not_init.code, -32002);
        assert!(not_init.message.contains("tools/list"));

        let bad_version = JsonRpcError::unsupported_protocol_version("1999-01-01", "2024-11-05");
        assert_eq!(bad_version.code, -32001);
        assert_eq!(
            bad_version.data.unwrap(),
            serde_json::json!({"supported": ["2024-11-05"]})
        );
    }

    #[test]
    fn test_error_conversion() {
        let json_error =
            Error::Json(serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err());
        assert_eq!(json_error.to_jsonrpc_error().code, -32700);

        let invalid = Error::InvalidMessage("Method cannot be empty".to_string());
        let wire = invalid.to_jsonrpc_error();
        assert_eq!(wire.code, -32600);
        assert!(wire.message.contains("Method cannot be empty"));
    }
}
