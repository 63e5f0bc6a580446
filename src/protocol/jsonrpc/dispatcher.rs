// Copyright (c) 2025 Makai MCP Authors
//
// Licensed under the MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)

//! Method registry and dispatcher.
//!
//! A [`MethodRegistry`] is populated once during server setup and then
//! frozen into a [`Dispatcher`]; the dispatch table is read-only while
//! serving, so concurrent dispatch needs no locking. Registering a method
//! name twice overwrites the earlier handler — last registration wins.
//!
//! Dispatch applies the hook chain: the before hook may short-circuit a
//! request, the error hook maps handler failures, the fallback hook catches
//! unknown methods (otherwise -32601), and the after hook always runs on the
//! final outcome, including fallback and error-hook outcomes.
//!
//! The dispatcher is format-agnostic: it returns a typed [`Outcome`], never
//! serialized bytes, and has no framing responsibility.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::debug;

use super::cancellation::{CancellationToken, CancellationTracker};
use super::error::JsonRpcError;
use super::types::{Request, RequestId};
use crate::notify::Notifier;

/// Per-request context passed to every handler.
///
/// Owns the request-scoped collaborators a handler may touch: the request
/// id, the cancellation token for cancellable handlers, and a handle to the
/// notification subsystem for progress delivery.
#[derive(Clone, Default)]
pub struct RequestContext {
    /// Id of the request being served; None for notifications.
    pub id: Option<RequestId>,

    /// Cooperative cancellation token, present only for handlers registered
    /// with [`MethodRegistry::add_cancellable`].
    pub cancellation: Option<Arc<CancellationToken>>,

    /// Out-of-band notification channel, when the server wires one in.
    pub notifier: Option<Notifier>,
}

impl RequestContext {
    /// Polls the cancellation token, if one was issued for this request.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .map(|t| t.is_cancelled())
            .unwrap_or(false)
    }
}

/// Type alias for a handler's return value.
pub type MethodResult = std::result::Result<Value, JsonRpcError>;

/// Type alias for a handler's boxed future.
pub type MethodFuture = BoxFuture<'static, MethodResult>;

/// Trait for method handlers.
///
/// Implemented automatically for async functions and closures of the shape
/// `Fn(RequestContext, Option<Value>) -> impl Future<Output = MethodResult>`.
pub trait MethodHandler: Send + Sync {
    /// Handles a method call asynchronously.
    fn handle(&self, ctx: RequestContext, params: Option<Value>) -> MethodFuture;
}

impl<F, Fut> MethodHandler for F
where
    F: Send + Sync + 'static + Fn(RequestContext, Option<Value>) -> Fut,
    Fut: Future<Output = MethodResult> + Send + 'static,
{
    fn handle(&self, ctx: RequestContext, params: Option<Value>) -> MethodFuture {
        Box::pin((self)(ctx, params))
    }
}

/// Shared handler pointer stored in the registry.
pub type MethodHandlerFn = Arc<dyn MethodHandler>;

/// Typed result of a dispatch.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Handler succeeded; serialize a success response.
    Success(Value),

    /// Handler or hook failed; serialize an error response.
    Failure(JsonRpcError),

    /// Notification handled; no response bytes may be produced.
    NoResponse,

    /// Handler succeeded and the connection must close after the response
    /// is written (shutdown).
    EndStream(Value),
}

/// Hook run before lookup; returning an error short-circuits the dispatch.
pub type BeforeHook = Arc<dyn Fn(&RequestContext, &str) -> Result<(), JsonRpcError> + Send + Sync>;

/// Hook that maps a handler failure to the error actually reported.
pub type ErrorHook = Arc<dyn Fn(&str, JsonRpcError) -> JsonRpcError + Send + Sync>;

/// Hook run on every final outcome, for logging/cleanup symmetry.
pub type AfterHook = Arc<dyn Fn(&str, &Outcome) + Send + Sync>;

struct MethodEntry {
    handler: MethodHandlerFn,
    /// Whether dispatch issues a cancellation token for this handler.
    cancellable: bool,
    /// Whether a successful result ends the connection stream.
    terminal: bool,
}

/// Mutable method table, populated during server setup.
#[derive(Default)]
pub struct MethodRegistry {
    methods: HashMap<String, MethodEntry>,
    before_hook: Option<BeforeHook>,
    error_hook: Option<ErrorHook>,
    fallback_handler: Option<MethodHandlerFn>,
    after_hook: Option<AfterHook>,
}

impl MethodRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for `method`.
    ///
    /// Exactly one handler exists per name; registering again overwrites the
    /// previous handler (last registration wins).
    pub fn add<F, Fut>(&mut self, method: impl Into<String>, handler: F)
    where
        F: Send + Sync + 'static + Fn(RequestContext, Option<Value>) -> Fut,
        Fut: Future<Output = MethodResult> + Send + 'static,
    {
        self.insert(method.into(), Arc::new(handler), false, false);
    }

    /// Registers a handler that receives a cancellation token.
    pub fn add_cancellable<F, Fut>(&mut self, method: impl Into<String>, handler: F)
    where
        F: Send + Sync + 'static + Fn(RequestContext, Option<Value>) -> Fut,
        Fut: Future<Output = MethodResult> + Send + 'static,
    {
        self.insert(method.into(), Arc::new(handler), true, false);
    }

    /// Registers a handler whose success ends the connection stream.
    pub fn add_terminal<F, Fut>(&mut self, method: impl Into<String>, handler: F)
    where
        F: Send + Sync + 'static + Fn(RequestContext, Option<Value>) -> Fut,
        Fut: Future<Output = MethodResult> + Send + 'static,
    {
        self.insert(method.into(), Arc::new(handler), false, true);
    }

    fn insert(&mut self, name: String, handler: MethodHandlerFn, cancellable: bool, terminal: bool) {
        if self.methods.contains_key(&name) {
            debug!(method = %name, "Overwriting existing handler registration");
        }
        self.methods.insert(
            name,
            MethodEntry {
                handler,
                cancellable,
                terminal,
            },
        );
    }

    /// Sets the hook run before handler lookup.
    pub fn set_before_hook<F>(&mut self, hook: F)
    where
        F: Fn(&RequestContext, &str) -> Result<(), JsonRpcError> + Send + Sync + 'static,
    {
        self.before_hook = Some(Arc::new(hook));
    }

    /// Sets the hook that maps handler failures.
    pub fn set_error_hook<F>(&mut self, hook: F)
    where
        F: Fn(&str, JsonRpcError) -> JsonRpcError + Send + Sync + 'static,
    {
        self.error_hook = Some(Arc::new(hook));
    }

    /// Sets the handler invoked when no method matches.
    pub fn set_fallback_handler<F, Fut>(&mut self, handler: F)
    where
        F: Send + Sync + 'static + Fn(RequestContext, Option<Value>) -> Fut,
        Fut: Future<Output = MethodResult> + Send + 'static,
    {
        self.fallback_handler = Some(Arc::new(handler));
    }

    /// Sets the hook run on every final outcome.
    pub fn set_after_hook<F>(&mut self, hook: F)
    where
        F: Fn(&str, &Outcome) + Send + Sync + 'static,
    {
        self.after_hook = Some(Arc::new(hook));
    }

    /// Names of all registered methods, for capability listing.
    pub fn method_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.methods.keys().cloned().collect();
        names.sort();
        names
    }

    /// Freezes the registry into a dispatcher.
    pub fn into_dispatcher(self, tracker: CancellationTracker, notifier: Option<Notifier>) -> Dispatcher {
        Dispatcher {
            registry: Arc::new(self),
            tracker,
            notifier,
        }
    }
}

/// Read-only dispatch engine shared by all connections.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<MethodRegistry>,
    tracker: CancellationTracker,
    notifier: Option<Notifier>,
}

impl Dispatcher {
    /// The cancellation tracker shared with the method surface.
    pub fn tracker(&self) -> &CancellationTracker {
        &self.tracker
    }

    /// Names of all registered methods.
    pub fn method_names(&self) -> Vec<String> {
        self.registry.method_names()
    }

    /// Dispatches one parsed request or notification.
    ///
    /// Never panics and never returns serialized bytes; every failure path
    /// is folded into the typed outcome. For notifications the outcome is
    /// always [`Outcome::NoResponse`] — failures are logged and dropped.
    pub async fn dispatch(&self, request: &Request) -> Outcome {
        let mut ctx = RequestContext {
            id: request.id.clone(),
            cancellation: None,
            notifier: self.notifier.clone(),
        };

        let outcome = self.run(&mut ctx, request).await;

        let outcome = if request.is_notification() {
            if let Outcome::Failure(err) = &outcome {
                debug!(
                    method = %request.method,
                    code = err.code,
                    "Notification handler failed; no response is sent"
                );
            }
            Outcome::NoResponse
        } else {
            outcome
        };

        if let Some(after) = &self.registry.after_hook {
            after(&request.method, &outcome);
        }

        outcome
    }

    async fn run(&self, ctx: &mut RequestContext, request: &Request) -> Outcome {
        if let Some(before) = &self.registry.before_hook {
            if let Err(err) = before(ctx, &request.method) {
                return Outcome::Failure(err);
            }
        }

        let entry = match self.registry.methods.get(&request.method) {
            Some(entry) => entry,
            None => {
                if let Some(fallback) = &self.registry.fallback_handler {
                    let result = fallback
                        .handle(ctx.clone(), request.params.clone())
                        .await;
                    return self.fold(&request.method, result, false);
                }
                return Outcome::Failure(JsonRpcError::method_not_found(&request.method));
            }
        };

        // The guard drops on every exit path below, releasing the token the
        // moment the request completes.
        let _guard = match (&request.id, entry.cancellable) {
            (Some(id), true) => {
                let (token, guard) = self.tracker.register(id);
                ctx.cancellation = Some(token);
                Some(guard)
            }
            _ => None,
        };

        let result = entry.handler.handle(ctx.clone(), request.params.clone()).await;
        self.fold(&request.method, result, entry.terminal)
    }

    fn fold(&self, method: &str, result: MethodResult, terminal: bool) -> Outcome {
        match result {
            Ok(value) if terminal => Outcome::EndStream(value),
            Ok(value) => Outcome::Success(value),
            Err(err) => {
                let err = match &self.registry.error_hook {
                    Some(hook) => hook(method, err),
                    None => err,
                };
                Outcome::Failure(err)
            }
        }
    }
}
