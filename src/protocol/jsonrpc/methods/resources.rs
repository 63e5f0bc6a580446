// Copyright (c) 2025 Makai MCP Authors
//
// Licensed under the MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)

//! Handlers for the `resources/*` method group.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::protocol::jsonrpc::dispatcher::{MethodRegistry, MethodResult};
use crate::protocol::jsonrpc::error::JsonRpcError;
use crate::providers::ResourceProvider;

/// Request parameters shared by the URI-keyed resource methods.
#[derive(Debug, Deserialize)]
struct ResourceParams {
    /// URI of the resource being addressed.
    uri: String,
}

fn parse_uri(method: &str, params: Option<Value>) -> Result<String, JsonRpcError> {
    let params = params
        .ok_or_else(|| JsonRpcError::invalid_params(format!("{} requires a uri parameter", method)))?;
    let params: ResourceParams = serde_json::from_value(params)
        .map_err(|e| JsonRpcError::invalid_params(format!("Invalid resource parameters: {}", e)))?;
    Ok(params.uri)
}

/// Registers the `resources/list`, `resources/read`, `resources/subscribe`,
/// and `resources/unsubscribe` handlers.
pub fn register_resources_methods(
    registry: &mut MethodRegistry,
    provider: Arc<dyn ResourceProvider>,
) {
    let list_provider = Arc::clone(&provider);
    registry.add("resources/list", move |_ctx, _params| {
        let provider = Arc::clone(&list_provider);
        async move { Ok(json!({ "resources": provider.list() })) }
    });

    let read_provider = Arc::clone(&provider);
    registry.add("resources/read", move |_ctx, params| {
        let provider = Arc::clone(&read_provider);
        async move { handle_resources_read(provider, params).await }
    });

    let subscribe_provider = Arc::clone(&provider);
    registry.add("resources/subscribe", move |_ctx, params| {
        let provider = Arc::clone(&subscribe_provider);
        async move {
            let uri = parse_uri("resources/subscribe", params)?;
            provider.subscribe(&uri).await?;
            Ok(json!({}))
        }
    });

    registry.add("resources/unsubscribe", move |_ctx, params| {
        let provider = Arc::clone(&provider);
        async move {
            let uri = parse_uri("resources/unsubscribe", params)?;
            provider.unsubscribe(&uri).await?;
            Ok(json!({}))
        }
    });
}

async fn handle_resources_read(
    provider: Arc<dyn ResourceProvider>,
    params: Option<Value>,
) -> MethodResult {
    let uri = parse_uri("resources/read", params)?;
    let contents = provider.read(&uri).await?;
    Ok(json!({ "contents": [contents] }))
}
