// Copyright (c) 2025 Makai MCP Authors
//
// Licensed under the MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)

//! Handlers for the `tools/*` method group.
//!
//! `tools/list` enumerates the provider's descriptors; `tools/call` routes
//! an invocation by name. Tool-level failures come back as a success
//! envelope with `isError: true`; only malformed requests or unknown tool
//! names become protocol errors.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::protocol::jsonrpc::dispatcher::{MethodRegistry, MethodResult, RequestContext};
use crate::protocol::jsonrpc::error::JsonRpcError;
use crate::providers::ToolProvider;

/// Request parameters for `tools/call`.
#[derive(Debug, Deserialize)]
struct ToolCallParams {
    /// Name of the tool to invoke.
    name: String,

    /// Tool arguments; defaults to an empty object.
    #[serde(default = "empty_object")]
    arguments: Value,
}

fn empty_object() -> Value {
    json!({})
}

/// Registers the `tools/list` and `tools/call` handlers.
///
/// `tools/call` is registered as cancellable: long-running tools receive a
/// token in the request context and may poll it between work units.
pub fn register_tools_methods(registry: &mut MethodRegistry, provider: Arc<dyn ToolProvider>) {
    let list_provider = Arc::clone(&provider);
    registry.add("tools/list", move |_ctx, _params| {
        let provider = Arc::clone(&list_provider);
        async move { handle_tools_list(provider).await }
    });

    registry.add_cancellable("tools/call", move |ctx, params| {
        let provider = Arc::clone(&provider);
        async move { handle_tools_call(provider, ctx, params).await }
    });
}

async fn handle_tools_list(provider: Arc<dyn ToolProvider>) -> MethodResult {
    let tools = provider.list();
    Ok(json!({ "tools": tools }))
}

async fn handle_tools_call(
    provider: Arc<dyn ToolProvider>,
    ctx: RequestContext,
    params: Option<Value>,
) -> MethodResult {
    let params = params
        .ok_or_else(|| JsonRpcError::invalid_params("tools/call requires params with a tool name"))?;
    let params: ToolCallParams = serde_json::from_value(params)
        .map_err(|e| JsonRpcError::invalid_params(format!("Invalid tool call parameters: {}", e)))?;

    let output = provider.call(&params.name, params.arguments, &ctx).await?;
    serde_json::to_value(output)
        .map_err(|e| JsonRpcError::internal_error(format!("Failed to serialize tool output: {}", e)))
}
