//! Request parsing and reply rendering.

use crate::status::StatusCode;
use bytes::Bytes;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Line terminator ending every request.
pub const TERMINATOR: u8 = b'\n';

/// Liveness probe, compared as raw bytes including the terminator.
pub const LIVENESS_TOKEN: &[u8] = b"OWLSO-SERVER\n";

/// Default cap on request length, terminator included.
pub const DEFAULT_MAX_REQUEST_LEN: usize = 4096;

/// A parsed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// The liveness probe token.
    Liveness,
    /// An identifier to resolve, terminator stripped.
    Lookup(Vec<u8>),
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("read deadline elapsed before terminator")]
    Timeout,
    #[error("connection closed before terminator")]
    Closed,
    #[error("empty identifier")]
    EmptyIdentifier,
    #[error("request exceeds {limit} bytes")]
    TooLong { limit: usize },
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Read one request line from `reader`.
///
/// `deadline` bounds the whole read, measured from the call. At most
/// `max_len` bytes are consumed; a limit below the liveness token length is
/// raised to it.
pub async fn read_request<R>(
    reader: R,
    deadline: Duration,
    max_len: usize,
) -> Result<Request, ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    let limit = max_len.max(LIVENESS_TOKEN.len());
    let mut limited = reader.take(limit as u64);
    let mut line = Vec::with_capacity(64);

    tokio::time::timeout(deadline, limited.read_until(TERMINATOR, &mut line))
        .await
        .map_err(|_| ProtocolError::Timeout)??;

    parse_line(line, limit)
}

/// Classify a raw line as read from the stream.
fn parse_line(mut line: Vec<u8>, limit: usize) -> Result<Request, ProtocolError> {
    if line.last() != Some(&TERMINATOR) {
        return Err(if line.len() >= limit {
            ProtocolError::TooLong { limit }
        } else {
            ProtocolError::Closed
        });
    }

    if line == LIVENESS_TOKEN {
        return Ok(Request::Liveness);
    }

    line.pop();
    if line.is_empty() {
        return Err(ProtocolError::EmptyIdentifier);
    }
    Ok(Request::Lookup(line))
}

/// Render a status as its unpadded decimal value with no terminator.
pub fn render_reply(status: StatusCode) -> Bytes {
    Bytes::from(status.value().to_string())
}
