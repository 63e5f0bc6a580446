// Copyright (c) 2025 Makai MCP Authors
//
// Licensed under the MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)

//! Implementation of the `initialize` method handler.
//!
//! The first method a client calls on a connection. Performs protocol
//! version negotiation and reports server capabilities; the connection
//! loop moves the session to Ready on success or ErrorState on a version
//! mismatch.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::protocol::jsonrpc::dispatcher::{MethodRegistry, MethodResult, RequestContext};
use crate::protocol::jsonrpc::error::JsonRpcError;
use crate::protocol::jsonrpc::lifecycle::PROTOCOL_VERSION;

/// Request parameters for the initialize method.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version the client speaks.
    pub protocol_version: String,

    /// Client capabilities; opaque to the engine.
    #[serde(default)]
    pub capabilities: Value,

    /// Client name/version, used for logging only.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// Client identification supplied during initialize.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientInfo {
    /// The client's name
    pub name: String,

    /// The client's version
    #[serde(default)]
    pub version: Option<String>,
}

/// Registers the initialize method handler.
pub fn register_initialize_method(registry: &mut MethodRegistry) {
    registry.add("initialize", handle_initialize);
}

/// Handles the initialize method call.
///
/// A protocol version other than [`PROTOCOL_VERSION`] fails with the
/// server-private -32001 code; there is no downgrade.
async fn handle_initialize(_ctx: RequestContext, params: Option<Value>) -> MethodResult {
    let params = params.ok_or_else(|| {
        JsonRpcError::invalid_params("initialize requires params with protocolVersion")
    })?;
    let params: InitializeParams = serde_json::from_value(params)
        .map_err(|e| JsonRpcError::invalid_params(format!("Invalid initialize parameters: {}", e)))?;

    if params.protocol_version != PROTOCOL_VERSION {
        return Err(JsonRpcError::unsupported_protocol_version(
            &params.protocol_version,
            PROTOCOL_VERSION,
        ));
    }

    if let Some(client) = &params.client_info {
        info!(
            client = %client.name,
            version = client.version.as_deref().unwrap_or("unknown"),
            "Client initialized"
        );
    }

    Ok(json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": {},
            "resources": { "subscribe": true },
            "prompts": {}
        },
        "serverInfo": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION")
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_initialize_success() {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {"tools": {}},
            "clientInfo": {"name": "test-client", "version": "1.0.0"}
        });

        let result = handle_initialize(RequestContext::default(), Some(params))
            .await
            .unwrap();

        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert!(result["capabilities"].is_object());
        assert!(result["serverInfo"]["name"].is_string());
    }

    #[tokio::test]
    async fn test_initialize_version_mismatch() {
        let params = json!({"protocolVersion": "2020-01-01"});
        let err = handle_initialize(RequestContext::default(), Some(params))
            .await
            .unwrap_err();
        assert_eq!(err.code, -32001);
    }

    #[tokio::test]
    async fn test_initialize_missing_params() {
        let err = handle_initialize(RequestContext::default(), None)
            .await
            .unwrap_err();
        assert_eq!(err.code, -32602);

        let err = handle_initialize(RequestContext::default(), Some(json!({})))
            .await
            .unwrap_err();
        assert_eq!(err.code, -32602);
    }
}
