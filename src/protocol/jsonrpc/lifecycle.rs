// Copyright (c) 2025 Makai MCP Authors
//
// Licensed under the MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)

//! Per-connection server lifecycle state machine.
//!
//! Each connection owns one [`Session`] that gates which methods are legal:
//! Created → Initializing → Ready → Shutdown, with ErrorState on a failed
//! protocol-version negotiation. Post-initialization methods before Ready
//! are answered with the server-private -32002 code; a version mismatch
//! parks the session in ErrorState rather than silently downgrading.

use super::error::JsonRpcError;

/// Protocol version this server speaks.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Connection lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// No initialize request seen yet.
    Created,

    /// An initialize request is being processed.
    Initializing,

    /// Handshake complete; the full method surface is available.
    Ready,

    /// Version negotiation failed; the session stays here.
    ErrorState,

    /// Terminal. No further requests are dispatched.
    Shutdown,
}

/// Lifecycle state for one connection.
///
/// Sessions are exclusively owned by their connection's task and never
/// shared, so no synchronization is needed here.
#[derive(Debug)]
pub struct Session {
    state: ServerState,
    /// Protocol version the client negotiated, once Ready.
    negotiated_version: Option<String>,
}

impl Session {
    /// Creates a session in the Created state.
    pub fn new() -> Self {
        Self {
            state: ServerState::Created,
            negotiated_version: None,
        }
    }

    /// Current lifecycle phase.
    pub fn state(&self) -> ServerState {
        self.state
    }

    /// Returns true once the session has reached its terminal state.
    pub fn is_shutdown(&self) -> bool {
        self.state == ServerState::Shutdown
    }

    /// The protocol version agreed during initialize, if any.
    pub fn negotiated_version(&self) -> Option<&str> {
        self.negotiated_version.as_deref()
    }

    /// Checks whether `method` is legal in the current phase.
    ///
    /// `initialize` is legal only from Created/Initializing. Exactly two
    /// notifications are always admitted: `notifications/initialized` is
    /// purely informational and `notifications/cancelled` must reach the
    /// tracker even mid-handshake. Everything else — `shutdown`, other
    /// notifications, and all post-initialization methods in either request
    /// or notification form — requires Ready.
    pub fn check_method(&self, method: &str) -> Result<(), JsonRpcError> {
        if matches!(
            method,
            "notifications/initialized" | "notifications/cancelled"
        ) {
            return Ok(());
        }
        match (method, self.state) {
            ("initialize", ServerState::Created | ServerState::Initializing) => Ok(()),
            ("initialize", _) => Err(JsonRpcError::invalid_request(
                "initialize is not legal after the handshake has completed or failed",
            )),
            (_, ServerState::Ready) => Ok(()),
            (m, _) => Err(JsonRpcError::server_not_initialized(m)),
        }
    }

    /// Marks the start of initialize processing.
    pub fn begin_initialize(&mut self) {
        if matches!(self.state, ServerState::Created) {
            self.state = ServerState::Initializing;
        }
    }

    /// Completes the handshake by negotiating the protocol version.
    ///
    /// An unequal version fails with -32001 and leaves the session in
    /// ErrorState; there is no downgrade path.
    pub fn complete_initialize(&mut self, requested_version: &str) -> Result<(), JsonRpcError> {
        if requested_version == PROTOCOL_VERSION {
            self.state = ServerState::Ready;
            self.negotiated_version = Some(requested_version.to_string());
            Ok(())
        } else {
            self.state = ServerState::ErrorState;
            Err(JsonRpcError::unsupported_protocol_version(
                requested_version,
                PROTOCOL_VERSION,
            ))
        }
    }

    /// Transitions to the terminal Shutdown state.
    ///
    /// The response to the shutdown request itself is still sent by the
    /// connection loop before it exits.
    pub fn shutdown(&mut self) {
        self.state = ServerState::Shutdown;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_happy_path() {
        let mut session = Session::new();
        assert_eq!(session.state(), ServerState::Created);

        assert!(session.check_method("initialize").is_ok());
        session.begin_initialize();
        assert_eq!(session.state(), ServerState::Initializing);

        session.complete_initialize(PROTOCOL_VERSION).unwrap();
        assert_eq!(session.state(), ServerState::Ready);
        assert_eq!(session.negotiated_version(), Some(PROTOCOL_VERSION));
    }

    #[test]
    fn test_methods_gated_before_ready() {
        let session = Session::new();
        let err = session.check_method("tools/list").unwrap_err();
        assert_eq!(err.code, -32002);

        let err = session.check_method("tools/call").unwrap_err();
        assert_eq!(err.code, -32002);

        let err = session.check_method("resources/read").unwrap_err();
        assert_eq!(err.code, -32002);
    }

    #[test]
    fn test_only_lifecycle_notifications_exempt_from_gating() {
        let session = Session::new();
        assert!(session.check_method("notifications/initialized").is_ok());
        assert!(session.check_method("notifications/cancelled").is_ok());

        // Other notification names get no free pass before Ready
        let err = session.check_method("notifications/progress").unwrap_err();
        assert_eq!(err.code, -32002);
    }

    #[test]
    fn test_version_mismatch_parks_in_error_state() {
        let mut session = Session::new();
        session.begin_initialize();

        let err = session.complete_initialize("2020-01-01").unwrap_err();
        assert_eq!(err.code, -32001);
        assert_eq!(session.state(), ServerState::ErrorState);

        // No retry from ErrorState
        assert!(session.check_method("initialize").is_err());
        assert_eq!(session.check_method("tools/list").unwrap_err().code, -32002);
    }

    #[test]
    fn test_reinitialize_rejected_when_ready() {
        let mut session = Session::new();
        session.begin_initialize();
        session.complete_initialize(PROTOCOL_VERSION).unwrap();

        let err = session.check_method("initialize").unwrap_err();
        assert_eq!(err.code, -32600);
    }

    #[test]
    fn test_shutdown_is_terminal() {
        let mut session = Session::new();
        session.begin_initialize();
        session.complete_initialize(PROTOCOL_VERSION).unwrap();

        assert!(session.check_method("shutdown").is_ok());
        session.shutdown();
        assert!(session.is_shutdown());

        let err = session.check_method("tools/list").unwrap_err();
        assert_eq!(err.code, -32002);
    }
}
