//! Message framing over ordered byte streams.
//!
//! Two framing modes, chosen per transport: length-prefixed
//! (`Content-Length` headers, LSP-style) and delimiter-based (newline-
//! delimited JSON by default). Both support incremental reads and surface
//! [`FramingError::EndOfStream`](crate::error::framing::FramingError) on a
//! clean close so the connection loop can terminate instead of blocking.

use tokio::io::{AsyncRead, AsyncWrite, BufReader};

use crate::error::framing::FramingError;

pub mod content_length;
pub mod line;

/// Maximum accepted message body, 16 MiB.
pub const DEFAULT_MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Framing scheme for one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingMode {
    /// `Content-Length: <n>\r\n\r\n<body>` blocks.
    ContentLength,

    /// Frames separated by a single delimiter byte.
    Line {
        /// Delimiter byte, `\n` by default.
        delimiter: u8,
    },
}

impl FramingMode {
    /// Newline-delimited framing, the stdio default.
    pub fn newline() -> Self {
        FramingMode::Line { delimiter: b'\n' }
    }
}

impl Default for FramingMode {
    fn default() -> Self {
        Self::newline()
    }
}

/// Per-mode decode state, kept across calls.
enum Decoder {
    ContentLength(content_length::Decoder),
    Line {
        decoder: line::Decoder,
        delimiter: u8,
    },
}

/// Reads frames from one ordered byte stream.
///
/// `read_frame` is safe to race in `select!`: in-progress frame state lives
/// in the reader, so a dropped read future loses no consumed bytes and the
/// next call resumes the same frame.
pub struct FrameReader<R> {
    reader: BufReader<R>,
    max_size: usize,
    decoder: Decoder,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Wraps a stream with the given framing mode and the default size cap.
    pub fn new(inner: R, mode: FramingMode) -> Self {
        Self::with_max_size(inner, mode, DEFAULT_MAX_FRAME_LEN)
    }

    /// Wraps a stream with an explicit maximum message size.
    pub fn with_max_size(inner: R, mode: FramingMode, max_size: usize) -> Self {
        Self {
            reader: BufReader::new(inner),
            max_size,
            decoder: match mode {
                FramingMode::ContentLength => {
                    Decoder::ContentLength(content_length::Decoder::default())
                }
                FramingMode::Line { delimiter } => Decoder::Line {
                    decoder: line::Decoder::default(),
                    delimiter,
                },
            },
        }
    }

    /// Reads the next complete message body.
    pub async fn read_frame(&mut self) -> Result<Vec<u8>, FramingError> {
        match &mut self.decoder {
            Decoder::ContentLength(decoder) => {
                decoder.read_frame(&mut self.reader, self.max_size).await
            }
            Decoder::Line { decoder, delimiter } => {
                decoder.read_frame(&mut self.reader, *delimiter).await
            }
        }
    }
}

/// Writes frames to one ordered byte stream.
pub struct FrameWriter<W> {
    writer: W,
    mode: FramingMode,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// Wraps a sink with the given framing mode.
    pub fn new(writer: W, mode: FramingMode) -> Self {
        Self { writer, mode }
    }

    /// Writes one message body, framed and flushed.
    pub async fn write_frame(&mut self, payload: &[u8]) -> Result<(), FramingError> {
        match self.mode {
            FramingMode::ContentLength => content_length::write_frame(&mut self.writer, payload).await,
            FramingMode::Line { delimiter } => {
                line::write_frame(&mut self.writer, payload, delimiter).await
            }
        }
    }
}
