//! Transport error module.
//!
//! This module defines error types that may occur in the stdio and TCP
//! transport adapters.

use std::io;
use thiserror::Error;

use super::framing::FramingError;

/// Errors that can occur during transport operations.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Error when binding or accepting on the TCP listener.
    #[error("TCP listener error: {0}")]
    Listener(io::Error),

    /// Error while framing messages on the stream.
    #[error("Framing error: {0}")]
    Framing(#[from] FramingError),

    /// Error when writing a response to the stream.
    #[error("Write error: {0}")]
    Write(io::Error),

    /// Error when reading from standard input.
    #[error("Standard input read error: {0}")]
    StdioRead(#[from] io::Error),

    /// Other transport errors.
    #[error("Transport error: {0}")]
    Other(String),
}

impl TransportError {
    /// Returns true when the error is a clean peer disconnect that should
    /// end the connection loop without noise.
    pub fn is_disconnect(&self) -> bool {
        match self {
            TransportError::Framing(e) => e.is_disconnect(),
            TransportError::Write(e) | TransportError::StdioRead(e) => matches!(
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
