// Copyright (c) 2025 Makai MCP Authors
//
// Licensed under the MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)

//! Stdio transport adapter.
//!
//! Serves exactly one session over the process's stdin/stdout pair,
//! newline-delimited by default. The process exits when the session shuts
//! down or stdin closes. With a single session the notifier's queue has an
//! unambiguous destination, so its worker is started here with a sink that
//! feeds the connection's outbound channel.

use tokio::sync::mpsc;
use tracing::info;

use crate::error::transport::TransportError;
use crate::framing::FramingMode;
use crate::notify::Notifier;
use crate::protocol::jsonrpc::dispatcher::Dispatcher;

use super::connection::Connection;

/// Serves one session over stdin/stdout.
pub async fn run_stdio(
    dispatcher: Dispatcher,
    mode: FramingMode,
    max_message_size: usize,
    notifier: Option<Notifier>,
) -> Result<(), TransportError> {
    info!("Serving on stdio");

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let mut connection = Connection::new(stdin, stdout, mode, max_message_size, dispatcher);
    if let Some(notifier) = &notifier {
        let (tx, rx) = mpsc::unbounded_channel();
        notifier.start(move |bytes: &[u8]| {
            // A send miss means the session already ended; the message is
            // undeliverable either way.
            let _ = tx.send(bytes.to_vec());
        });
        connection = connection.with_outbound(rx);
    }

    connection.serve().await?;
    if let Some(notifier) = &notifier {
        notifier.stop();
    }

    info!("Stdio session ended");
    Ok(())
}
