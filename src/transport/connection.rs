// Copyright (c) 2025 Makai MCP Authors
//
// Licensed under the MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)

//! The per-connection serve loop.
//!
//! One [`Connection`] owns a framed reader/writer pair, its lifecycle
//! [`Session`], and a clone of the shared dispatcher. The loop reads one
//! frame, parses the envelope, gates the method against the session state,
//! dispatches, and writes the outcome. Exactly one request is in flight per
//! connection at a time; responses therefore come back in request order.
//!
//! Error discipline: a malformed message answers with a best-effort error
//! response (recovering the id when possible) and the loop continues; a
//! framing violation or peer disconnect ends only this connection.

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::framing::FramingError;
use crate::error::transport::TransportError;
use crate::framing::{FrameReader, FrameWriter, FramingMode};
use crate::protocol::jsonrpc::dispatcher::{Dispatcher, Outcome};
use crate::protocol::jsonrpc::envelope::{self, Envelope};
use crate::protocol::jsonrpc::error::{ErrorCode, JsonRpcError};
use crate::protocol::jsonrpc::lifecycle::Session;
use crate::protocol::jsonrpc::types::{Request, RequestId};

/// What the serve loop woke up for.
enum Event {
    /// A frame (or framing error) arrived from the peer.
    Inbound(Result<Vec<u8>, FramingError>),
    /// An already-serialized outbound message, or channel closure.
    Outbound(Option<Vec<u8>>),
}

/// Serves one client over a framed byte stream.
pub struct Connection<R, W> {
    reader: FrameReader<R>,
    writer: FrameWriter<W>,
    dispatcher: Dispatcher,
    session: Session,
    outbound: Option<mpsc::UnboundedReceiver<Vec<u8>>>,
}

impl<R, W> Connection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Wraps a stream pair with the given framing mode and size cap.
    pub fn new(
        reader: R,
        writer: W,
        mode: FramingMode,
        max_message_size: usize,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            reader: FrameReader::with_max_size(reader, mode, max_message_size),
            writer: FrameWriter::new(writer, mode),
            dispatcher,
            session: Session::new(),
            outbound: None,
        }
    }

    /// Attaches a channel whose messages (already framed payloads, e.g.
    /// progress notifications) are written to the stream, interleaved
    /// between responses.
    pub fn with_outbound(mut self, outbound: mpsc::UnboundedReceiver<Vec<u8>>) -> Self {
        self.outbound = Some(outbound);
        self
    }

    /// Runs the serve loop until shutdown or disconnect.
    pub async fn serve(&mut self) -> Result<(), TransportError> {
        loop {
            match self.next_event().await {
                Event::Outbound(Some(message)) => {
                    self.write_frame(&message).await?;
                }
                Event::Outbound(None) => {
                    // Sender side gone; stop polling the channel.
                    self.outbound = None;
                }
                Event::Inbound(Ok(frame)) => {
                    if self.handle_frame(&frame).await? {
                        return Ok(());
                    }
                }
                Event::Inbound(Err(e)) if e.is_disconnect() => {
                    debug!("Client disconnected");
                    return Ok(());
                }
                Event::Inbound(Err(e)) => {
                    // Framing violations leave the stream position unknown;
                    // answer once and close rather than misparse what follows.
                    warn!(error = %e, "Framing violation; closing connection");
                    let err = JsonRpcError::new(
                        ErrorCode::InvalidRequest,
                        format!("Invalid Request: {}", e),
                    );
                    self.write_error(None, err).await?;
                    return Ok(());
                }
            }
        }
    }

    /// Waits for the next inbound frame or outbound message.
    async fn next_event(&mut self) -> Event {
        match self.outbound.as_mut() {
            Some(channel) => tokio::select! {
                frame = self.reader.read_frame() => Event::Inbound(frame),
                message = channel.recv() => Event::Outbound(message),
            },
            None => Event::Inbound(self.reader.read_frame().await),
        }
    }

    /// Processes one inbound frame; returns true when the connection must
    /// close.
    async fn handle_frame(&mut self, frame: &[u8]) -> Result<bool, TransportError> {
        let parsed = match envelope::parse(frame) {
            Ok(parsed) => parsed,
            Err(e) => {
                let id = envelope::recover_id(frame);
                debug!(error = %e, "Rejecting malformed message");
                self.write_error(id, e.to_jsonrpc_error()).await?;
                return Ok(false);
            }
        };

        match parsed {
            Envelope::Response(resp) => {
                debug!(id = ?resp.id, "Ignoring inbound response envelope");
                Ok(false)
            }
            Envelope::Notification(request) => {
                // Notifications are gated like requests but never answered:
                // one that is illegal in the current lifecycle phase is
                // dropped instead of dispatched.
                match self.session.check_method(&request.method) {
                    Ok(()) => {
                        self.dispatcher.dispatch(&request).await;
                    }
                    Err(err) => {
                        debug!(
                            method = %request.method,
                            code = err.code,
                            "Dropping notification not admitted in this state"
                        );
                    }
                }
                Ok(false)
            }
            Envelope::Request(request) => self.handle_request(&request).await,
        }
    }

    /// Dispatches one id-bearing request; returns true when the connection
    /// must close.
    async fn handle_request(&mut self, request: &Request) -> Result<bool, TransportError> {
        if let Err(err) = self.session.check_method(&request.method) {
            self.write_error(request.id.clone(), err).await?;
            return Ok(false);
        }

        let initializing = request.method == "initialize";
        if initializing {
            self.session.begin_initialize();
        }

        match self.dispatcher.dispatch(request).await {
            Outcome::Success(result) => {
                if initializing {
                    self.note_negotiation(request, true);
                }
                self.write_success(request.id.clone(), result).await?;
                Ok(false)
            }
            Outcome::Failure(err) => {
                if initializing && err.code == ErrorCode::UnsupportedProtocolVersion.code() {
                    self.note_negotiation(request, false);
                }
                self.write_error(request.id.clone(), err).await?;
                Ok(false)
            }
            Outcome::EndStream(result) => {
                self.write_success(request.id.clone(), result).await?;
                self.session.shutdown();
                info!("Connection shut down by client request");
                Ok(true)
            }
            Outcome::NoResponse => Ok(false),
        }
    }

    /// Records the initialize verdict on the session.
    ///
    /// The handler already validated the version, so on success the session
    /// transition cannot fail; on a mismatch the same call parks the session
    /// in ErrorState and its (duplicate) error value is dropped.
    fn note_negotiation(&mut self, request: &Request, succeeded: bool) {
        let requested = request
            .params
            .as_ref()
            .and_then(|p| p.get("protocolVersion"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        if self.session.complete_initialize(requested).is_err() && succeeded {
            warn!("Initialize succeeded but version negotiation disagreed");
        }
    }

    async fn write_success(
        &mut self,
        id: Option<RequestId>,
        result: Value,
    ) -> Result<(), TransportError> {
        match envelope::encode_success(id, result) {
            Ok(bytes) => self.write_frame(&bytes).await,
            Err(e) => {
                warn!(error = %e, "Failed to encode success response");
                Ok(())
            }
        }
    }

    async fn write_error(
        &mut self,
        id: Option<RequestId>,
        err: JsonRpcError,
    ) -> Result<(), TransportError> {
        match envelope::encode_error(id, err) {
            Ok(bytes) => self.write_frame(&bytes).await,
            Err(e) => {
                warn!(error = %e, "Failed to encode error response");
                Ok(())
            }
        }
    }

    async fn write_frame(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.writer
            .write_frame(bytes)
            .await
            .map_err(TransportError::Framing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Notifier;
    use crate::protocol::jsonrpc::dispatcher::RequestContext;
    use crate::protocol::jsonrpc::lifecycle::PROTOCOL_VERSION;
    use crate::protocol::jsonrpc::setup::{create_dispatcher, Providers};
    use crate::protocol::jsonrpc::types::ProgressToken;
    use crate::providers::builtin::{StaticPrompts, StaticResources};
    use crate::providers::{ToolDescriptor, ToolOutput, ToolProvider};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};

    fn spawn_connection_with(
        dispatcher: Dispatcher,
        outbound: Option<mpsc::UnboundedReceiver<Vec<u8>>>,
    ) -> (FrameWriter<DuplexStream>, FrameReader<DuplexStream>) {
        let (client_tx, server_rx) = duplex(64 * 1024);
        let (server_tx, client_rx) = duplex(64 * 1024);

        let mut connection = Connection::new(
            server_rx,
            server_tx,
            FramingMode::newline(),
            1024 * 1024,
            dispatcher,
        );
        if let Some(outbound) = outbound {
            connection = connection.with_outbound(outbound);
        }
        tokio::spawn(async move {
            let _ = connection.serve().await;
        });

        (
            FrameWriter::new(client_tx, FramingMode::newline()),
            FrameReader::new(client_rx, FramingMode::newline()),
        )
    }

    async fn spawn_connection() -> (FrameWriter<DuplexStream>, FrameReader<DuplexStream>) {
        spawn_connection_with(create_dispatcher(&Providers::builtin(), None), None)
    }

    async fn round_trip(
        writer: &mut FrameWriter<DuplexStream>,
        reader: &mut FrameReader<DuplexStream>,
        message: Value,
    ) -> Value {
        writer
            .write_frame(message.to_string().as_bytes())
            .await
            .unwrap();
        let reply = reader.read_frame().await.unwrap();
        serde_json::from_slice(&reply).unwrap()
    }

    async fn initialize(
        writer: &mut FrameWriter<DuplexStream>,
        reader: &mut FrameReader<DuplexStream>,
    ) {
        let reply = round_trip(
            writer,
            reader,
            json!({
                "jsonrpc": "2.0", "id": 0, "method": "initialize",
                "params": {"protocolVersion": PROTOCOL_VERSION}
            }),
        )
        .await;
        assert_eq!(reply["result"]["protocolVersion"], PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn test_request_before_initialize_rejected() {
        let (mut writer, mut reader) = spawn_connection().await;
        let reply = round_trip(
            &mut writer,
            &mut reader,
            json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}),
        )
        .await;
        assert_eq!(reply["error"]["code"], -32002);
        assert_eq!(reply["id"], 1);
    }

    #[tokio::test]
    async fn test_full_session_tool_call() {
        let (mut writer, mut reader) = spawn_connection().await;
        initialize(&mut writer, &mut reader).await;

        let reply = round_trip(
            &mut writer,
            &mut reader,
            json!({
                "jsonrpc": "2.0", "id": "call-1", "method": "tools/call",
                "params": {"name": "add", "arguments": {"a": 10, "b": 20}}
            }),
        )
        .await;
        assert_eq!(reply["id"], "call-1");
        assert_eq!(reply["result"]["content"][0]["text"], "30");
    }

    #[tokio::test]
    async fn test_version_mismatch_then_gated() {
        let (mut writer, mut reader) = spawn_connection().await;

        let reply = round_trip(
            &mut writer,
            &mut reader,
            json!({
                "jsonrpc": "2.0", "id": 1, "method": "initialize",
                "params": {"protocolVersion": "2020-01-01"}
            }),
        )
        .await;
        assert_eq!(reply["error"]["code"], -32001);
        assert_eq!(reply["error"]["data"]["supported"][0], PROTOCOL_VERSION);

        // Session is parked; the surface stays gated
        let reply = round_trip(
            &mut writer,
            &mut reader,
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
        )
        .await;
        assert_eq!(reply["error"]["code"], -32002);
    }

    #[tokio::test]
    async fn test_malformed_json_answered_and_loop_continues() {
        let (mut writer, mut reader) = spawn_connection().await;

        writer.write_frame(b"{not json").await.unwrap();
        let reply: Value =
            serde_json::from_slice(&reader.read_frame().await.unwrap()).unwrap();
        assert_eq!(reply["error"]["code"], -32700);
        assert_eq!(reply["id"], Value::Null);

        // Connection still serves afterwards
        initialize(&mut writer, &mut reader).await;
    }

    #[tokio::test]
    async fn test_invalid_envelope_recovers_id() {
        let (mut writer, mut reader) = spawn_connection().await;

        let reply = round_trip(
            &mut writer,
            &mut reader,
            json!({"jsonrpc": "1.0", "id": 7, "method": "x"}),
        )
        .await;
        assert_eq!(reply["error"]["code"], -32600);
        assert_eq!(reply["id"], 7);
    }

    #[tokio::test]
    async fn test_notification_produces_no_response() {
        let (mut writer, mut reader) = spawn_connection().await;

        writer
            .write_frame(
                json!({"jsonrpc": "2.0", "method": "notifications/initialized"})
                    .to_string()
                    .as_bytes(),
            )
            .await
            .unwrap();

        // The next reply must belong to the follow-up request, not the
        // notification.
        let reply = round_trip(
            &mut writer,
            &mut reader,
            json!({"jsonrpc": "2.0", "id": 3, "method": "tools/list"}),
        )
        .await;
        assert_eq!(reply["id"], 3);
    }

    #[tokio::test]
    async fn test_shutdown_closes_stream() {
        let (mut writer, mut reader) = spawn_connection().await;
        initialize(&mut writer, &mut reader).await;

        let reply = round_trip(
            &mut writer,
            &mut reader,
            json!({"jsonrpc": "2.0", "id": 9, "method": "shutdown"}),
        )
        .await;
        assert_eq!(reply["id"], 9);
        assert!(reply.get("result").is_some());

        // Server side closed; the next read sees end of stream
        assert!(reader.read_frame().await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_method_after_initialize() {
        let (mut writer, mut reader) = spawn_connection().await;
        initialize(&mut writer, &mut reader).await;

        let reply = round_trip(
            &mut writer,
            &mut reader,
            json!({"jsonrpc": "2.0", "id": 4, "method": "no/such/method"}),
        )
        .await;
        assert_eq!(reply["error"]["code"], -32601);
    }

    // Raw stream helpers below bypass FrameWriter to send exact bytes.
    #[tokio::test]
    async fn test_content_length_framing_end_to_end() {
        let (mut client_tx, server_rx) = duplex(64 * 1024);
        let (server_tx, mut client_rx) = duplex(64 * 1024);

        let dispatcher = create_dispatcher(&Providers::builtin(), None);
        let mut connection = Connection::new(
            server_rx,
            server_tx,
            FramingMode::ContentLength,
            1024 * 1024,
            dispatcher,
        );
        tokio::spawn(async move {
            let _ = connection.serve().await;
        });

        let body = json!({
            "jsonrpc": "2.0", "id": 1, "method": "initialize",
            "params": {"protocolVersion": PROTOCOL_VERSION}
        })
        .to_string();
        let framed = format!("Content-Length: {}\r\n\r\n{}", body.len(), body);
        client_tx.write_all(framed.as_bytes()).await.unwrap();

        let mut header = Vec::new();
        let mut byte = [0u8; 1];
        while !header.ends_with(b"\r\n\r\n") {
            client_rx.read_exact(&mut byte).await.unwrap();
            header.push(byte[0]);
        }
        let header_text = String::from_utf8(header).unwrap();
        let length: usize = header_text
            .trim()
            .trim_start_matches("Content-Length:")
            .trim()
            .parse()
            .unwrap();

        let mut reply = vec![0u8; length];
        client_rx.read_exact(&mut reply).await.unwrap();
        let reply: Value = serde_json::from_slice(&reply).unwrap();
        assert_eq!(reply["result"]["protocolVersion"], PROTOCOL_VERSION);
    }

    /// Tool provider that counts invocations.
    struct RecordingTools {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ToolProvider for RecordingTools {
        fn list(&self) -> Vec<ToolDescriptor> {
            Vec::new()
        }

        async fn call(
            &self,
            _name: &str,
            _arguments: Value,
            _ctx: &RequestContext,
        ) -> Result<ToolOutput, JsonRpcError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ToolOutput::text("ran"))
        }
    }

    #[tokio::test]
    async fn test_notification_form_methods_gated_before_initialize() {
        let calls = Arc::new(AtomicUsize::new(0));
        let providers = Providers {
            tools: Arc::new(RecordingTools {
                calls: Arc::clone(&calls),
            }),
            resources: Arc::new(StaticResources::sample()),
            prompts: Arc::new(StaticPrompts),
        };
        let (mut writer, mut reader) =
            spawn_connection_with(create_dispatcher(&providers, None), None);

        // An id-less tools/call before the handshake must be dropped, not
        // executed.
        let call = json!({
            "jsonrpc": "2.0", "method": "tools/call",
            "params": {"name": "anything"}
        });
        writer
            .write_frame(call.to_string().as_bytes())
            .await
            .unwrap();

        // A follow-up request proves the loop has moved past the
        // notification before we look at the counter.
        let reply = round_trip(
            &mut writer,
            &mut reader,
            json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}),
        )
        .await;
        assert_eq!(reply["error"]["code"], -32002);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        // After the handshake the same notification reaches the provider
        initialize(&mut writer, &mut reader).await;
        writer
            .write_frame(call.to_string().as_bytes())
            .await
            .unwrap();
        let reply = round_trip(
            &mut writer,
            &mut reader,
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
        )
        .await;
        assert!(reply["result"]["tools"].is_array());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_queued_notifications_written_to_stream() {
        let notifier = Notifier::with_poll_interval(Duration::from_millis(2));
        let (tx, rx) = mpsc::unbounded_channel();
        notifier.start(move |bytes: &[u8]| {
            let _ = tx.send(bytes.to_vec());
        });

        let dispatcher = create_dispatcher(&Providers::builtin(), Some(notifier.clone()));
        let (mut writer, mut reader) = spawn_connection_with(dispatcher, Some(rx));
        initialize(&mut writer, &mut reader).await;

        let token = ProgressToken::String("op-9".to_string());
        notifier.progress(&token, 1.0, Some(2.0));
        notifier.progress(&token, 2.0, Some(2.0));

        let first: Value = serde_json::from_slice(&reader.read_frame().await.unwrap()).unwrap();
        assert_eq!(first["method"], "notifications/progress");
        assert_eq!(first["params"]["progressToken"], "op-9");
        assert_eq!(first["params"]["progress"], 1.0);

        let second: Value = serde_json::from_slice(&reader.read_frame().await.unwrap()).unwrap();
        assert_eq!(second["params"]["progress"], 2.0);

        // The stream still serves requests between notifications
        let reply = round_trip(
            &mut writer,
            &mut reader,
            json!({"jsonrpc": "2.0", "id": 5, "method": "tools/list"}),
        )
        .await;
        assert_eq!(reply["id"], 5);

        notifier.stop();
    }
}
