// Copyright (c) 2025 Makai MCP Authors
//
// Licensed under the MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)

//! Wires providers, lifecycle handlers, and hooks into a dispatcher.
//!
//! [`create_dispatcher`] produces the single dispatch engine every
//! connection shares. The registry is mutable only here; once frozen, the
//! method table never changes.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::cancellation::CancellationTracker;
use super::dispatcher::{Dispatcher, MethodRegistry, Outcome};
use super::methods;
use super::types::RequestId;
use crate::notify::Notifier;
use crate::providers::{PromptProvider, ResourceProvider, ToolProvider};

/// The provider set backing the standard method surface.
#[derive(Clone)]
pub struct Providers {
    /// Backs `tools/list` and `tools/call`.
    pub tools: Arc<dyn ToolProvider>,

    /// Backs the `resources/*` methods.
    pub resources: Arc<dyn ResourceProvider>,

    /// Backs `prompts/list` and `prompts/get`.
    pub prompts: Arc<dyn PromptProvider>,
}

impl Providers {
    /// The built-in provider set served by the demo binary.
    pub fn builtin() -> Self {
        use crate::providers::builtin::{BuiltinTools, StaticPrompts, StaticResources};
        Self {
            tools: Arc::new(BuiltinTools),
            resources: Arc::new(StaticResources::sample()),
            prompts: Arc::new(StaticPrompts),
        }
    }
}

/// Parameters of the `notifications/cancelled` notification.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CancelledParams {
    /// Id of the in-flight request to cancel.
    request_id: RequestId,

    /// Optional human-readable reason.
    #[serde(default)]
    reason: Option<String>,
}

/// Registers the standard method surface on `registry`.
///
/// Covers lifecycle (`initialize`, `notifications/initialized`, `shutdown`,
/// `notifications/cancelled`) plus the tools, resources, and prompts groups.
pub fn register_standard_methods(
    registry: &mut MethodRegistry,
    providers: &Providers,
    tracker: &CancellationTracker,
) {
    methods::register_initialize_method(registry);
    methods::register_tools_methods(registry, Arc::clone(&providers.tools));
    methods::register_resources_methods(registry, Arc::clone(&providers.resources));
    methods::register_prompts_methods(registry, Arc::clone(&providers.prompts));

    registry.add("notifications/initialized", |_ctx, _params| async move {
        debug!("Client reported initialization complete");
        Ok(Value::Null)
    });

    registry.add_terminal("shutdown", |_ctx, _params| async move {
        debug!("Shutdown requested");
        Ok(Value::Null)
    });

    let tracker = tracker.clone();
    registry.add("notifications/cancelled", move |_ctx, params| {
        let tracker = tracker.clone();
        async move {
            let params = match params {
                Some(value) => value,
                None => {
                    warn!("Cancellation notification without params; ignored");
                    return Ok(Value::Null);
                }
            };
            let params: CancelledParams = match serde_json::from_value(params) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(error = %e, "Malformed cancellation notification; ignored");
                    return Ok(Value::Null);
                }
            };

            let found = tracker.cancel(&params.request_id, params.reason.clone());
            debug!(
                request_id = ?params.request_id,
                reason = params.reason.as_deref().unwrap_or(""),
                found,
                "Processed cancellation notification"
            );
            Ok(Value::Null)
        }
    });
}

/// Builds the shared dispatcher from a provider set.
///
/// Installs an after hook that logs every outcome at debug level; the
/// returned dispatcher owns the cancellation tracker the cancelled-
/// notification handler feeds.
pub fn create_dispatcher(providers: &Providers, notifier: Option<Notifier>) -> Dispatcher {
    let tracker = CancellationTracker::new();
    let mut registry = MethodRegistry::new();
    register_standard_methods(&mut registry, providers, &tracker);

    registry.set_after_hook(|method, outcome| {
        let outcome_kind = match outcome {
            Outcome::Success(_) => "success",
            Outcome::Failure(err) => {
                debug!(method, code = err.code, "Method returned an error");
                "failure"
            }
            Outcome::NoResponse => "no-response",
            Outcome::EndStream(_) => "end-stream",
        };
        debug!(method, outcome = outcome_kind, "Dispatch complete");
    });

    registry.into_dispatcher(tracker, notifier)
}
