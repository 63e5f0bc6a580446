// Copyright (c) 2025 Makai MCP Authors
//
// Licensed under the MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)

//! Handlers for the `prompts/*` method group.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::protocol::jsonrpc::dispatcher::{MethodRegistry, MethodResult};
use crate::protocol::jsonrpc::error::JsonRpcError;
use crate::providers::PromptProvider;

/// Request parameters for `prompts/get`.
#[derive(Debug, Deserialize)]
struct PromptGetParams {
    /// Name of the prompt to expand.
    name: String,

    /// Prompt arguments; defaults to an empty object.
    #[serde(default = "empty_object")]
    arguments: Value,
}

fn empty_object() -> Value {
    json!({})
}

/// Registers the `prompts/list` and `prompts/get` handlers.
pub fn register_prompts_methods(registry: &mut MethodRegistry, provider: Arc<dyn PromptProvider>) {
    let list_provider = Arc::clone(&provider);
    registry.add("prompts/list", move |_ctx, _params| {
        let provider = Arc::clone(&list_provider);
        async move { Ok(json!({ "prompts": provider.list() })) }
    });

    registry.add("prompts/get", move |_ctx, params| {
        let provider = Arc::clone(&provider);
        async move { handle_prompts_get(provider, params).await }
    });
}

async fn handle_prompts_get(
    provider: Arc<dyn PromptProvider>,
    params: Option<Value>,
) -> MethodResult {
    let params = params
        .ok_or_else(|| JsonRpcError::invalid_params("prompts/get requires a prompt name"))?;
    let params: PromptGetParams = serde_json::from_value(params)
        .map_err(|e| JsonRpcError::invalid_params(format!("Invalid prompt parameters: {}", e)))?;

    let content = provider.get(&params.name, params.arguments).await?;
    serde_json::to_value(content).map_err(|e| {
        JsonRpcError::internal_error(format!("Failed to serialize prompt content: {}", e))
    })
}
