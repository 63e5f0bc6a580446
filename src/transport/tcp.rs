// Copyright (c) 2025 Makai MCP Authors
//
// Licensed under the MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)

//! TCP transport adapter.
//!
//! Accepts connections on a listening socket and spawns one task per
//! client. Each connection gets a fresh lifecycle session; the dispatcher
//! and its cancellation tracker are shared. A failure on one connection
//! never disturbs another.

use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::error::transport::TransportError;
use crate::framing::FramingMode;
use crate::notify::Notifier;
use crate::protocol::jsonrpc::dispatcher::Dispatcher;

use super::connection::Connection;

/// Binds `address` and serves clients until the task is aborted.
///
/// The shared notifier queue has no single destination across TCP sessions,
/// so its worker drains to the log here; embedders that route notifications
/// to specific clients start the worker with their own sink before calling
/// this (start is idempotent).
pub async fn run_tcp(
    dispatcher: Dispatcher,
    address: &str,
    mode: FramingMode,
    max_message_size: usize,
    notifier: Option<Notifier>,
) -> Result<(), TransportError> {
    if let Some(notifier) = &notifier {
        notifier.start(|bytes: &[u8]| {
            debug!(
                len = bytes.len(),
                "Discarding queued notification with no bound session"
            );
        });
    }

    let listener = TcpListener::bind(address)
        .await
        .map_err(TransportError::Listener)?;
    info!(address, "Listening for TCP connections");

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                // Transient accept failures (e.g. fd exhaustion) should not
                // kill the listener.
                warn!(error = %e, "Failed to accept connection");
                continue;
            }
        };

        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            info!(%peer, "Client connected");
            let (reader, writer) = stream.into_split();
            let mut connection =
                Connection::new(reader, writer, mode, max_message_size, dispatcher);
            match connection.serve().await {
                Ok(()) => info!(%peer, "Client session ended"),
                Err(e) if e.is_disconnect() => info!(%peer, "Client disconnected"),
                Err(e) => warn!(%peer, error = %e, "Connection failed"),
            }
        });
    }
}
