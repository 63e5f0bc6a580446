//! Delimiter-based framing.
//!
//! Messages are separated by a single delimiter byte (newline by default),
//! with an optional `\r` before a `\n` stripped on read. An empty trimmed
//! line is reported as [`FramingError::EndOfStream`] rather than skipped,
//! so callers can distinguish a blank line from stream closure the same way
//! the rest of the engine does. Conforming MCP clients never send blank
//! lines, so in practice this only fires on disconnect.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::framing::FramingError;

/// Delimiter-frame decoder.
///
/// Bytes consumed so far stay in the decoder between calls, so a
/// `read_frame` future dropped mid-frame (the connection loop races it
/// against an outbound channel in `select!`) resumes the same frame on the
/// next call instead of losing data.
#[derive(Debug, Default)]
pub struct Decoder {
    buf: Vec<u8>,
}

impl Decoder {
    /// Reads one delimiter-terminated frame.
    pub async fn read_frame<R>(
        &mut self,
        reader: &mut R,
        delimiter: u8,
    ) -> Result<Vec<u8>, FramingError>
    where
        R: AsyncBufRead + Unpin,
    {
        let n = reader.read_until(delimiter, &mut self.buf).await?;
        let mut frame = std::mem::take(&mut self.buf);
        if n == 0 && frame.is_empty() {
            return Err(FramingError::EndOfStream);
        }

        if frame.last() == Some(&delimiter) {
            frame.pop();
        }
        if delimiter == b'\n' && frame.last() == Some(&b'\r') {
            frame.pop();
        }

        if frame.is_empty() {
            return Err(FramingError::EndOfStream);
        }

        Ok(frame)
    }
}

/// Writes one frame followed by the delimiter and flushes.
pub async fn write_frame<W>(
    writer: &mut W,
    payload: &[u8],
    delimiter: u8,
) -> Result<(), FramingError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(payload).await?;
    writer.write_all(&[delimiter]).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio::io::BufReader;

    async fn read(input: &[u8]) -> Result<Vec<u8>, FramingError> {
        let mut reader = BufReader::new(Cursor::new(input.to_vec()));
        Decoder::default().read_frame(&mut reader, b'\n').await
    }

    #[tokio::test]
    async fn test_read_line_frame() {
        assert_eq!(read(b"{\"x\":1}\n").await.unwrap(), b"{\"x\":1}");
    }

    #[tokio::test]
    async fn test_crlf_stripped() {
        assert_eq!(read(b"payload\r\n").await.unwrap(), b"payload");
    }

    #[tokio::test]
    async fn test_final_line_without_delimiter() {
        assert_eq!(read(b"no newline").await.unwrap(), b"no newline");
    }

    #[tokio::test]
    async fn test_empty_stream_is_end_of_stream() {
        assert!(matches!(read(b"").await, Err(FramingError::EndOfStream)));
    }

    #[tokio::test]
    async fn test_blank_line_is_end_of_stream() {
        assert!(matches!(read(b"\n").await, Err(FramingError::EndOfStream)));
        assert!(matches!(read(b"\r\n").await, Err(FramingError::EndOfStream)));
    }

    #[tokio::test]
    async fn test_custom_delimiter() {
        let mut reader = BufReader::new(Cursor::new(b"one\0two\0".to_vec()));
        let mut decoder = Decoder::default();
        assert_eq!(decoder.read_frame(&mut reader, 0).await.unwrap(), b"one");
        assert_eq!(decoder.read_frame(&mut reader, 0).await.unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_write_appends_delimiter() {
        let mut buffer = Vec::new();
        write_frame(&mut buffer, b"msg", b'\n').await.unwrap();
        assert_eq!(buffer, b"msg\n");
    }

    #[tokio::test]
    async fn test_round_trip_multiple_frames() {
        let mut buffer = Vec::new();
        write_frame(&mut buffer, b"first", b'\n').await.unwrap();
        write_frame(&mut buffer, b"second", b'\n').await.unwrap();

        let mut reader = BufReader::new(Cursor::new(buffer));
        let mut decoder = Decoder::default();
        assert_eq!(decoder.read_frame(&mut reader, b'\n').await.unwrap(), b"first");
        assert_eq!(decoder.read_frame(&mut reader, b'\n').await.unwrap(), b"second");
    }
}
