// Copyright (c) 2025 Makai MCP Authors
//
// Licensed under the MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)

//! JSON-RPC 2.0 protocol engine.
//!
//! Message types and envelope codec, the method dispatcher with its hook
//! chain, per-connection lifecycle state, and cooperative cancellation.
//! Transport and framing live elsewhere; everything here works on parsed
//! values and typed outcomes.

pub mod cancellation;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod lifecycle;
pub mod methods;
pub mod setup;
pub mod types;

pub use cancellation::{CancellationToken, CancellationTracker};
pub use dispatcher::{Dispatcher, MethodRegistry, Outcome, RequestContext};
pub use envelope::Envelope;
pub use error::{ErrorCode, JsonRpcError};
pub use lifecycle::{ServerState, Session, PROTOCOL_VERSION};
pub use setup::{create_dispatcher, register_standard_methods, Providers};
pub use types::{Request, RequestId, Response, JSONRPC_VERSION};
