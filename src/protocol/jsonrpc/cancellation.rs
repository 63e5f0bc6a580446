// Copyright (c) 2025 Makai MCP Authors
//
// Licensed under the MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)

//! Cooperative per-request cancellation tracking.
//!
//! When a cancellable handler is dispatched, the tracker creates a token
//! keyed by an FNV hash of the request id and hands it to the handler for
//! periodic polling. A `notifications/cancelled` message routes to
//! [`CancellationTracker::cancel`], which flips the token's flag. The engine
//! never interrupts a running handler; cancellation is observed, not forced.
//!
//! Tokens are removed by a guard when the request completes — success,
//! error, or cancellation — so a token never outlives its request, and a
//! cancel arriving after completion is a silent no-op.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use fnv::FnvHasher;
use parking_lot::Mutex;
use std::hash::Hasher;

use super::types::RequestId;

/// A cooperative cancellation flag with an optional reason.
#[derive(Debug, Default)]
pub struct CancellationToken {
    cancelled: AtomicBool,
    reason: Mutex<Option<String>>,
}

impl CancellationToken {
    /// Returns true once the request has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// The reason supplied with the cancellation, if any.
    pub fn reason(&self) -> Option<String> {
        self.reason.lock().clone()
    }

    /// Sets the reason, then the flag.
    ///
    /// The reason must be visible before the flag so a poller never observes
    /// `cancelled == true` with a stale or absent reason.
    fn cancel(&self, reason: Option<String>) {
        *self.reason.lock() = reason;
        self.cancelled.store(true, Ordering::Release);
    }
}

/// Hashes a request id to the tracker's key space.
///
/// Integer ids map to their own value; string ids by FNV content hash.
fn id_key(id: &RequestId) -> u64 {
    match id {
        RequestId::Number(n) => *n as u64,
        RequestId::String(s) => {
            let mut hasher = FnvHasher::default();
            hasher.write(s.as_bytes());
            hasher.finish()
        }
    }
}

/// Tracks in-flight cancellable requests across all connections.
///
/// The map is concurrent because requests on different connections register
/// and complete concurrently.
#[derive(Debug, Clone, Default)]
pub struct CancellationTracker {
    tokens: Arc<DashMap<u64, Arc<CancellationToken>>>,
}

/// Removes a token from the tracker when the request completes.
///
/// Held by the request scope for the duration of the dispatch; dropping it
/// on any exit path releases the token.
#[derive(Debug)]
pub struct TokenGuard {
    tokens: Arc<DashMap<u64, Arc<CancellationToken>>>,
    key: u64,
}

impl Drop for TokenGuard {
    fn drop(&mut self) {
        self.tokens.remove(&self.key);
    }
}

impl CancellationTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a token for an in-flight cancellable request.
    ///
    /// Returns the token for handler polling and a guard whose drop removes
    /// the entry. A re-registration for the same id (which a conforming
    /// client never sends while a request is in flight) replaces the old
    /// token.
    pub fn register(&self, id: &RequestId) -> (Arc<CancellationToken>, TokenGuard) {
        let key = id_key(id);
        let token = Arc::new(CancellationToken::default());
        self.tokens.insert(key, Arc::clone(&token));
        (
            token,
            TokenGuard {
                tokens: Arc::clone(&self.tokens),
                key,
            },
        )
    }

    /// Cancels the in-flight request with the given id.
    ///
    /// Returns whether a matching token was found. A miss means the request
    /// already completed or never existed — reported as a boolean outcome,
    /// not an error, because cancellation arrives as a notification and the
    /// sender gets no reply either way.
    pub fn cancel(&self, id: &RequestId, reason: Option<String>) -> bool {
        match self.tokens.get(&id_key(id)) {
            Some(token) => {
                token.cancel(reason);
                true
            }
            None => false,
        }
    }

    /// Number of in-flight cancellable requests.
    pub fn in_flight(&self) -> usize {
        self.tokens.len()
    }
}
