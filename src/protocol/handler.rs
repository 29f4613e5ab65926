//! Status protocol connection handler.

use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, trace, warn};

use super::codec::{read_request, render_reply, Request, DEFAULT_MAX_REQUEST_LEN};
use crate::lookup::{LookupError, StatusLookup};
use crate::status::StatusCode;

/// Default read deadline, armed once per connection.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-connection limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerSettings {
    pub read_timeout: Duration,
    pub max_request_len: usize,
}

impl Default for HandlerSettings {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_request_len: DEFAULT_MAX_REQUEST_LEN,
        }
    }
}

/// How a connection ended. Only visible in logs; the wire sees either a
/// status or silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A status was resolved and written.
    Replied(StatusCode),
    /// The liveness token was answered with `UP`.
    Liveness,
    /// The identifier has no status.
    Miss,
    /// The status store failed.
    LookupFailed,
    /// The request could not be read.
    ProtocolError,
    /// A reply was resolved but could not be written.
    WriteFailed,
}

/// Handle one status connection.
///
/// Reads a single request, answers it if a status is known, and closes the
/// stream. The stream is consumed, so it is closed on every return path.
pub async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    lookup: &dyn StatusLookup,
    settings: &HandlerSettings,
) -> Outcome {
    let request = read_request(
        BufReader::new(&mut stream),
        settings.read_timeout,
        settings.max_request_len,
    )
    .await;

    let (status, outcome) = match request {
        Ok(Request::Liveness) => {
            trace!(%peer, "Liveness probe");
            (StatusCode::Up, Outcome::Liveness)
        }
        Ok(Request::Lookup(id)) => match lookup.lookup(&id) {
            Ok(status) => {
                trace!(%peer, id = %String::from_utf8_lossy(&id), %status, "Status resolved");
                (status, Outcome::Replied(status))
            }
            Err(LookupError::NotFound) => {
                debug!(%peer, id = %String::from_utf8_lossy(&id), "Unknown identifier");
                return Outcome::Miss;
            }
            Err(e) => {
                warn!(%peer, id = %String::from_utf8_lossy(&id), error = %e, "Lookup failed");
                return Outcome::LookupFailed;
            }
        },
        Err(e) => {
            debug!(%peer, error = %e, "Request read failed");
            return Outcome::ProtocolError;
        }
    };

    if let Err(e) = stream.write_all(&render_reply(status)).await {
        debug!(%peer, error = %e, "Reply write failed");
        return Outcome::WriteFailed;
    }
    let _ = stream.shutdown().await;

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::StatusTable;
    use std::sync::Arc;
    use std::time::Instant;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    struct FailingLookup;

    impl StatusLookup for FailingLookup {
        fn lookup(&self, _id: &[u8]) -> Result<StatusCode, LookupError> {
            Err(LookupError::Unavailable("backend offline".to_string()))
        }
    }

    /// Run one connection through the handler, sending `request` from a
    /// client that then waits for the server to close.
    async fn exchange(
        lookup: Arc<dyn StatusLookup>,
        settings: HandlerSettings,
        request: &'static [u8],
    ) -> (Outcome, Vec<u8>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client = tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            stream.write_all(request).await.unwrap();
            let mut reply = Vec::new();
            let _ = stream.read_to_end(&mut reply).await;
            reply
        });

        let (stream, peer) = listener.accept().await.unwrap();
        let outcome = handle_connection(stream, peer, &*lookup, &settings).await;
        (outcome, client.await.unwrap())
    }

    #[tokio::test]
    async fn test_known_identifier() {
        let table = StatusTable::from_entries([("probe-1", StatusCode::Jeopardy)]);
        let (outcome, reply) = exchange(table, HandlerSettings::default(), b"probe-1\n").await;
        assert_eq!(outcome, Outcome::Replied(StatusCode::Jeopardy));
        assert_eq!(reply, b"75");
    }

    #[tokio::test]
    async fn test_liveness_bypasses_lookup() {
        let table = StatusTable::from_entries([("OWLSO-SERVER", StatusCode::Down)]);
        let (outcome, reply) =
            exchange(table, HandlerSettings::default(), b"OWLSO-SERVER\n").await;
        assert_eq!(outcome, Outcome::Liveness);
        assert_eq!(reply, b"100");
    }

    #[tokio::test]
    async fn test_unknown_identifier_is_silent() {
        let (outcome, reply) =
            exchange(StatusTable::new(), HandlerSettings::default(), b"nobody\n").await;
        assert_eq!(outcome, Outcome::Miss);
        assert!(reply.is_empty());
    }

    #[tokio::test]
    async fn test_lookup_failure_is_silent() {
        let (outcome, reply) =
            exchange(Arc::new(FailingLookup), HandlerSettings::default(), b"probe-1\n").await;
        assert_eq!(outcome, Outcome::LookupFailed);
        assert!(reply.is_empty());
    }

    #[tokio::test]
    async fn test_missing_terminator_times_out() {
        let settings = HandlerSettings {
            read_timeout: Duration::from_millis(200),
            ..HandlerSettings::default()
        };
        let started = Instant::now();
        let (outcome, reply) = exchange(StatusTable::new(), settings, b"probe-1").await;
        assert_eq!(outcome, Outcome::ProtocolError);
        assert!(reply.is_empty());
        assert!(started.elapsed() >= Duration::from_millis(200));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_oversized_request_is_silent() {
        let settings = HandlerSettings {
            max_request_len: 16,
            ..HandlerSettings::default()
        };
        let table = StatusTable::from_entries([("probe-1", StatusCode::Up)]);
        let (outcome, reply) = exchange(table, settings, b"probe-1-with-a-long-suffix\n").await;
        assert_eq!(outcome, Outcome::ProtocolError);
        assert!(reply.is_empty());
    }
}
