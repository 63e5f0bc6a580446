//! Framing error module.
//!
//! Errors raised while splitting an ordered byte stream into discrete
//! messages, or serializing messages back out. Framing failures are fatal
//! to their connection: the loop surfaces them and exits.

use std::io;
use thiserror::Error;

/// Errors that can occur while reading or writing frames.
#[derive(Error, Debug)]
pub enum FramingError {
    /// The header block ended without a Content-Length header.
    #[error("Missing Content-Length header")]
    MissingContentLength,

    /// The Content-Length value was not a non-negative decimal integer.
    #[error("Invalid Content-Length value: {0}")]
    InvalidContentLength(String),

    /// The declared body size exceeds the configured maximum.
    #[error("Message of {size} bytes exceeds maximum of {max} bytes")]
    MessageTooLarge {
        /// Declared body size
        size: usize,
        /// Configured cap
        max: usize,
    },

    /// The stream closed cleanly, or the body was truncated before the
    /// declared length arrived.
    #[error("End of stream")]
    EndOfStream,

    /// Underlying I/O failure.
    #[error("Framing I/O error: {0}")]
    Io(#[from] io::Error),
}

impl FramingError {
    /// Returns true when the error represents a clean disconnect rather
    /// than a protocol violation.
    pub fn is_disconnect(&self) -> bool {
        match self {
            FramingError::EndOfStream => true,
            FramingError::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
            ),
            _ => false,
        }
    }
}
