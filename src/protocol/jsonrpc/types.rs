// Copyright (c) 2025 Makai MCP Authors
//
// Licensed under the MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)

//! Types for the JSON-RPC 2.0 protocol.
//!
//! This module defines the core data structures for JSON-RPC 2.0 requests, responses,
//! and notifications according to the [specification](https://www.jsonrpc.org/specification).
//! Batch envelopes are deliberately absent: the engine serves one in-flight request
//! per connection.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::JsonRpcError;

/// JSON-RPC protocol version string carried in every envelope.
pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC request identifier.
///
/// Either a string or an integer. A JSON `null` id is normalized to "absent"
/// during envelope parsing, so it never appears here. Equality is by variant
/// and value; a string id is never coerced to an integer or vice versa.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RequestId {
    /// String identifier
    String(String),

    /// Numeric identifier
    Number(i64),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::String(s) => write!(f, "{}", s),
            RequestId::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

/// Progress token supplied by the caller of a long-running operation.
///
/// Opaque to the engine: it is echoed verbatim in `notifications/progress`
/// messages and never stored beyond building the notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ProgressToken {
    /// String token
    String(String),

    /// Numeric token
    Number(i64),
}

/// A JSON-RPC 2.0 request object.
///
/// A request without an `id` is a notification and expects no response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Request {
    /// JSON-RPC protocol version, always "2.0"
    pub jsonrpc: String,

    /// Name of the method to be invoked
    pub method: String,

    /// Method parameters; any JSON value is accepted at this layer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,

    /// Request identifier, if None then the request is a notification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
}

impl Request {
    /// Creates a new JSON-RPC 2.0 request.
    pub fn new(
        method: impl Into<String>,
        params: Option<serde_json::Value>,
        id: Option<RequestId>,
    ) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id,
        }
    }

    /// Returns true if this request is a notification (no id).
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// Creates a new JSON-RPC request with a string id.
    pub fn with_string_id(
        method: impl Into<String>,
        params: Option<serde_json::Value>,
        id: impl Into<String>,
    ) -> Self {
        Self::new(method, params, Some(RequestId::String(id.into())))
    }

    /// Creates a new JSON-RPC request with a numeric id.
    pub fn with_number_id(
        method: impl Into<String>,
        params: Option<serde_json::Value>,
        id: i64,
    ) -> Self {
        Self::new(method, params, Some(RequestId::Number(id)))
    }

    /// Creates a new JSON-RPC notification (no id).
    pub fn notification(method: impl Into<String>, params: Option<serde_json::Value>) -> Self {
        Self::new(method, params, None)
    }

    /// Returns the params or an empty JSON object when absent.
    ///
    /// Handlers that expect named parameters treat a missing `params` field
    /// as `{}` rather than failing.
    pub fn params_or_empty(&self) -> serde_json::Value {
        self.params
            .clone()
            .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()))
    }
}

/// A JSON-RPC 2.0 notification object.
///
/// Functionally identical to a Request without an id; a separate alias for
/// API clarity.
pub type Notification = Request;

/// A JSON-RPC 2.0 response object.
///
/// Contains either a result or an error, never both. The `id` field always
/// echoes the request id verbatim; when the request carried no usable id
/// (e.g. a parse error before the id was recovered) it is serialized as
/// JSON null.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Response {
    /// JSON-RPC protocol version, always "2.0"
    pub jsonrpc: String,

    /// The result of the method invocation, if successful.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,

    /// The error object, if an error occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,

    /// Same identifier as the request this is responding to. Serialized as
    /// `null` when None — a response always carries an `id` field.
    pub id: Option<RequestId>,
}

impl Response {
    /// Creates a new successful JSON-RPC 2.0 response.
    pub fn success(id: Option<RequestId>, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Creates a new error JSON-RPC 2.0 response.
    pub fn error(id: Option<RequestId>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }

    /// Returns true if this response contains a successful result.
    pub fn is_success(&self) -> bool {
        self.result.is_some() && self.error.is_none()
    }

    /// Returns true if this response contains an error.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::jsonrpc::error::ErrorCode;
    use serde_json::json;

    #[test]
    fn test_request_serialization() {
        let request = Request::with_number_id(
            "tools/call",
            Some(json!({"name": "add", "arguments": {"a": 10, "b": 20}})),
            1,
        );

        let json_str = serde_json::to_string(&request).unwrap();
        let expected = r#"{"jsonrpc":"2.0","method":"tools/call","params":{"name":"add","arguments":{"a":10,"b":20}},"id":1}"#;
        assert_eq!(json_str, expected);

        let deserialized: Request = serde_json::from_str(expected).unwrap();
        assert_eq!(deserialized.method, "tools/call");
        assert_eq!(deserialized.id, Some(RequestId::Number(1)));
    }

    #[test]
    fn test_notification_serialization() {
        let notification = Request::notification(
            "notifications/cancelled",
            Some(json!({"requestId": 7, "reason": "user abort"})),
        );

        let json_str = serde_json::to_string(&notification).unwrap();
        assert!(!json_str.contains("\"id\""));
        assert!(notification.is_notification());
    }

    #[test]
    fn test_response_serialization() {
        // Success response
        let success = Response::success(Some(RequestId::Number(1)), json!(19));

        let json_str = serde_json::to_string(&success).unwrap();
        let expected = r#"{"jsonrpc":"2.0","result":19,"id":1}"#;
        assert_eq!(json_str, expected);

        // Error response
        let error = Response::error(
            Some(RequestId::String("abc".to_string())),
            JsonRpcError::new(ErrorCode::MethodNotFound, "Method not found"),
        );

        let json_str = serde_json::to_string(&error).unwrap();
        let expected =
            r#"{"jsonrpc":"2.0","error":{"code":-32601,"message":"Method not found"},"id":"abc"}"#;
        assert_eq!(json_str, expected);
    }

    #[test]
    fn test_idless_response_serializes_null_id() {
        let error = Response::error(None, JsonRpcError::parse_error());
        let json_str = serde_json::to_string(&error).unwrap();
        assert!(json_str.ends_with(r#""id":null}"#));
    }

    #[test]
    fn test_string_id_not_coerced() {
        // "1" and 1 must stay distinct through a round trip
        let s: RequestId = serde_json::from_str(r#""1""#).unwrap();
        let n: RequestId = serde_json::from_str("1").unwrap();
        assert_eq!(s, RequestId::String("1".to_string()));
        assert_eq!(n, RequestId::Number(1));
        assert_ne!(s, n);
    }

    #[test]
    fn test_params_or_empty() {
        let request = Request::with_number_id("tools/list", None, 2);
        assert_eq!(request.params_or_empty(), json!({}));
    }

    #[test]
    fn test_id_display() {
        assert_eq!(RequestId::String("abc".to_string()).to_string(), "abc");
        assert_eq!(RequestId::Number(123).to_string(), "123");
    }
}
