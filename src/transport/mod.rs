//! Transport layer for client ↔ server communication.
//!
//! Provides the `Transport` trait and the receive loop that sends one
//! serialized request and accumulates bytes until they parse as one JSON
//! response. There is no framing on the wire: the end of a response is
//! wherever its JSON value ends.

mod buffer;
pub mod protocol;
pub mod tcp;

pub use buffer::{ParseState, ResponseBuffer};
pub use protocol::{Command, Poste};
pub use tcp::TcpTransport;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::error::{PosteError, Result};
use crate::replique::{Classifier, Replique};

/// Bytes requested from the socket per read. The buffer itself is unbounded.
pub const RECV_CHUNK_SIZE: usize = 4096;

/// Abstraction over one request/response exchange with a server.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `poste`, wait for the response and classify it.
    async fn request(&self, poste: &Poste, classifier: &Classifier) -> Result<Replique>;
}

/// Settings for a single exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeOptions {
    /// Applied separately to the send and to every read.
    pub timeout: Duration,
    /// Fail on malformed JSON instead of reading on until timeout or close.
    pub strict: bool,
}

impl Default for ExchangeOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(2),
            strict: true,
        }
    }
}

/// Write `payload` to `stream`, then read until a full JSON value arrives.
///
/// Partial data is discarded on every error path.
pub async fn exchange<S>(stream: &mut S, payload: &[u8], options: &ExchangeOptions) -> Result<Value>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let timeout = options.timeout;

    tokio::time::timeout(timeout, async {
        stream.write_all(payload).await?;
        stream.flush().await
    })
    .await
    .map_err(|_| PosteError::Timeout {
        stage: "send",
        timeout,
    })??;

    let mut buffer = ResponseBuffer::new();
    let mut chunk = vec![0u8; RECV_CHUNK_SIZE];

    loop {
        let n = tokio::time::timeout(timeout, stream.read(&mut chunk))
            .await
            .map_err(|_| PosteError::Timeout {
                stage: "receive",
                timeout,
            })??;

        if n == 0 {
            let received = buffer.len();
            return match buffer.finish() {
                ParseState::Complete(value) => {
                    debug!(bytes = received, "Response completed by close");
                    Ok(value)
                }
                ParseState::Malformed(e) if options.strict => Err(PosteError::MalformedResponse(e)),
                ParseState::Malformed(e) => {
                    warn!(error = %e, bytes = received, "Connection closed after malformed response");
                    Err(PosteError::IncompleteResponse { received })
                }
                ParseState::Incomplete => Err(PosteError::IncompleteResponse { received }),
            };
        }

        buffer.extend(&chunk[..n]);

        match buffer.try_parse() {
            ParseState::Complete(value) => {
                debug!(bytes = buffer.len(), "Received complete response");
                return Ok(value);
            }
            ParseState::Incomplete => {
                debug!(bytes = buffer.len(), "Response incomplete, reading more");
            }
            ParseState::Malformed(e) if options.strict => {
                return Err(PosteError::MalformedResponse(e));
            }
            ParseState::Malformed(e) => {
                warn!(error = %e, bytes = buffer.len(), "Malformed response, reading more");
            }
        }
    }
}
