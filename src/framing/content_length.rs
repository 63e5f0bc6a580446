//! Length-prefixed framing.
//!
//! Messages are preceded by ASCII header lines terminated by `\r\n`, ending
//! with a blank line. Exactly one header is required:
//!
//! ```text
//! Content-Length: 123\r\n
//! \r\n
//! <123 body bytes>
//! ```
//!
//! Reads are incremental; a message need not arrive in one I/O operation.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::framing::FramingError;

/// Length-prefixed frame decoder.
///
/// Header and body progress live in the decoder, not the read future, so a
/// `read_frame` future dropped mid-frame (the connection loop races it
/// against an outbound channel in `select!`) resumes where it left off
/// instead of losing consumed bytes.
#[derive(Debug, Default)]
pub struct Decoder {
    line: Vec<u8>,
    length: Option<usize>,
    headers_done: bool,
    body: Vec<u8>,
    filled: usize,
}

impl Decoder {
    /// Reads one length-prefixed frame.
    ///
    /// A stream that closes before any header byte, mid-headers, or
    /// mid-body surfaces [`FramingError::EndOfStream`] so the connection
    /// loop can exit.
    pub async fn read_frame<R>(
        &mut self,
        reader: &mut R,
        max_size: usize,
    ) -> Result<Vec<u8>, FramingError>
    where
        R: AsyncBufRead + Unpin,
    {
        while !self.headers_done {
            let n = reader.read_until(b'\n', &mut self.line).await?;
            if n == 0 {
                self.reset();
                return Err(FramingError::EndOfStream);
            }

            // read_until only returns at the delimiter or EOF, so the line
            // is complete here
            let line = std::mem::take(&mut self.line);
            let trimmed = trim_line_ending(&line);
            if trimmed.is_empty() {
                self.headers_done = true;
                break;
            }

            if let Some(value) = header_value(trimmed, b"content-length") {
                let text = std::str::from_utf8(value)
                    .map_err(|_| {
                        self.reset();
                        FramingError::InvalidContentLength(
                            String::from_utf8_lossy(value).into_owned(),
                        )
                    })?
                    .trim();
                // parse::<usize> rejects a leading minus, covering negatives
                let length: usize = text.parse().map_err(|_| {
                    self.reset();
                    FramingError::InvalidContentLength(text.to_string())
                })?;
                self.length = Some(length);
            }
            // Unknown headers are skipped
        }

        let length = match self.length {
            Some(length) => length,
            None => {
                self.reset();
                return Err(FramingError::MissingContentLength);
            }
        };
        if length > max_size {
            self.reset();
            return Err(FramingError::MessageTooLarge {
                size: length,
                max: max_size,
            });
        }

        if self.body.len() != length {
            self.body.resize(length, 0);
            self.filled = 0;
        }
        while self.filled < length {
            let n = reader.read(&mut self.body[self.filled..]).await?;
            if n == 0 {
                self.reset();
                return Err(FramingError::EndOfStream);
            }
            self.filled += n;
        }

        let body = std::mem::take(&mut self.body);
        self.reset();
        Ok(body)
    }

    /// Clears all per-frame state.
    fn reset(&mut self) {
        self.line.clear();
        self.length = None;
        self.headers_done = false;
        self.body.clear();
        self.filled = 0;
    }
}

/// Writes one length-prefixed frame and flushes.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), FramingError>
where
    W: AsyncWrite + Unpin,
{
    let header = format!("Content-Length: {}\r\n\r\n", payload.len());
    writer.write_all(header.as_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Strips one trailing `\n` and an optional preceding `\r`.
fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Case-insensitive header match; returns the value with surrounding
/// whitespace intact for the caller to trim.
fn header_value<'a>(line: &'a [u8], name: &[u8]) -> Option<&'a [u8]> {
    let colon = line.iter().position(|&b| b == b':')?;
    let (key, rest) = line.split_at(colon);
    if key.eq_ignore_ascii_case(name) {
        Some(&rest[1..])
    } else {
        None
    }
}
