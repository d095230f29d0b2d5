//! Message framing for the MCP stdio transport.
//!
//! Clients either send newline-delimited JSON or LSP-style frames:
//! ```text
//! Content-Length: <N>\r\n
//! \r\n
//! <N bytes of JSON>
//! ```
//! Responses are written back in whichever format the client used.

use std::io;

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Wire format of one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    /// LSP-style Content-Length framing
    ContentLength,
    /// One JSON object per line
    Ndjson,
}

/// Upper bound on a Content-Length body.
const MAX_MESSAGE_BYTES: usize = 64 * 1024 * 1024;

/// Reads one message. Returns `Ok(None)` on EOF.
pub async fn read_message<R>(reader: &mut R) -> io::Result<Option<(Vec<u8>, WireFormat)>>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let mut first_line = String::new();
        if reader.read_line(&mut first_line).await? == 0 {
            return Ok(None);
        }

        let trimmed = first_line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(length) = trimmed.strip_prefix("Content-Length:") {
            let length: usize = length.trim().parse().map_err(|_| {
                io::Error::new(io::ErrorKind::InvalidData, "Invalid Content-Length header")
            })?;

            // Skip remaining headers (Content-Type, etc.)
            loop {
                let mut header = String::new();
                if reader.read_line(&mut header).await? == 0 {
                    return Ok(None);
                }
                if header.trim().is_empty() {
                    break;
                }
            }

            if length > MAX_MESSAGE_BYTES {
                // Discard the body so the next read starts at a frame boundary.
                let mut body = (&mut *reader).take(length as u64);
                tokio::io::copy(&mut body, &mut tokio::io::sink()).await?;
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Message of {length} bytes exceeds limit"),
                ));
            }

            let mut body = vec![0u8; length];
            reader.read_exact(&mut body).await?;
            return Ok(Some((body, WireFormat::ContentLength)));
        }

        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            return Ok(Some((trimmed.as_bytes().to_vec(), WireFormat::Ndjson)));
        }

        let preview: String = trimmed.chars().take(50).collect();
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Unknown message format, expected Content-Length or JSON, got: {preview}"),
        ));
    }
}

/// Writes one message in `format` and flushes.
pub async fn write_message<W, T>(writer: &mut W, message: &T, format: WireFormat) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let body = serde_json::to_vec(message)?;

    match format {
        WireFormat::ContentLength => {
            let header = format!("Content-Length: {}\r\n\r\n", body.len());
            writer.write_all(header.as_bytes()).await?;
            writer.write_all(&body).await?;
        }
        WireFormat::Ndjson => {
            writer.write_all(&body).await?;
            writer.write_all(b"\n").await?;
        }
    }

    writer.flush().await
}
