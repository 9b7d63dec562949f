//! TCP transport to a replique server.
//!
//! Every request opens its own connection, which is owned by that request
//! and dropped (closed) when the exchange ends, successfully or not.

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tracing::{debug, info_span, Instrument, Span};

use super::protocol::Poste;
use super::{exchange, ExchangeOptions, Transport};
use crate::config::ClientConfig;
use crate::error::{PosteError, Result};
use crate::replique::{Classifier, Replique};

/// Transport that sends each request over a fresh TCP connection.
///
/// Log output for an exchange is recorded inside `span`, which callers can
/// replace to attach their own fields or route it elsewhere.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    host: String,
    port: u16,
    options: ExchangeOptions,
    span: Span,
}

impl TcpTransport {
    pub fn new(host: impl Into<String>, port: u16, options: ExchangeOptions) -> Self {
        let host = host.into();
        let span = info_span!("replique", host = %host, port);
        Self {
            host,
            port,
            options,
            span,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.host.clone(), config.port, config.exchange_options())
    }

    /// Record this transport's logs under `span` instead of the default one.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub const fn timeout(&self) -> Duration {
        self.options.timeout
    }

    async fn connect(&self) -> Result<TcpStream> {
        let timeout = self.options.timeout;
        match tokio::time::timeout(timeout, TcpStream::connect((self.host.as_str(), self.port)))
            .await
        {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(source)) => Err(PosteError::Connect {
                addr: self.addr(),
                source,
            }),
            Err(_) => Err(PosteError::Timeout {
                stage: "connect",
                timeout,
            }),
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn request(&self, poste: &Poste, classifier: &Classifier) -> Result<Replique> {
        let payload = poste.to_bytes()?;

        async {
            let mut stream = self.connect().await?;
            debug!(
                command = poste.command().as_str(),
                bytes = payload.len(),
                "Connected, sending request"
            );

            let value = exchange(&mut stream, &payload, &self.options).await?;
            drop(stream);

            classifier.classify(value)
        }
        .instrument(self.span.clone())
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replique::RepliqueKind;
    use std::time::Instant;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Read from `socket` until the bytes parse as one JSON value.
    async fn read_request(socket: &mut TcpStream) -> serde_json::Value {
        let mut received = Vec::new();
        let mut chunk = [0u8; 256];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client closed before sending a full request");
            received.extend_from_slice(&chunk[..n]);
            if let Ok(value) = serde_json::from_slice(&received) {
                return value;
            }
        }
    }

    /// Serve one connection: check the request, send `reply` in `pieces`, close.
    async fn serve_once(expected: serde_json::Value, reply: &'static [u8], pieces: usize) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            assert_eq!(read_request(&mut socket).await, expected);
            let size = reply.len().div_ceil(pieces);
            for piece in reply.chunks(size) {
                socket.write_all(piece).await.unwrap();
                socket.flush().await.unwrap();
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });
        port
    }

    fn transport(port: u16, timeout: Duration) -> TcpTransport {
        TcpTransport::new(
            "127.0.0.1",
            port,
            ExchangeOptions {
                timeout,
                strict: true,
            },
        )
    }

    #[tokio::test]
    async fn evaluate_round_trip() {
        let port = serve_once(
            serde_json::json!({"command": "evaluate", "code": "1+1"}),
            br#"{"command":"evaluate","result":"success","value":"2"}"#,
            3,
        )
        .await;

        let replique = transport(port, Duration::from_secs(2))
            .request(&Poste::evaluate("1+1", None), &Classifier::default())
            .await
            .unwrap();
        assert_eq!(replique.kind(), &RepliqueKind::Success);
        assert_eq!(replique.display(), "2");
    }

    #[tokio::test]
    async fn server_closes_mid_response() {
        let port = serve_once(
            serde_json::json!({"command": "evaluate", "code": "x"}),
            br#"{"command": "ev"#,
            1,
        )
        .await;

        let err = transport(port, Duration::from_secs(2))
            .request(&Poste::evaluate("x", None), &Classifier::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PosteError::IncompleteResponse { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(socket);
        });

        let timeout = Duration::from_millis(200);
        let started = Instant::now();
        let err = transport(port, timeout)
            .request(&Poste::evaluate("1", None), &Classifier::default())
            .await
            .unwrap_err();

        assert!(
            matches!(err, PosteError::Timeout { stage: "receive", .. }),
            "got {err:?}"
        );
        assert!(started.elapsed() < timeout + Duration::from_secs(1));
    }

    #[tokio::test]
    async fn refused_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let err = transport(port, Duration::from_secs(2))
            .request(&Poste::evaluate("1", None), &Classifier::default())
            .await
            .unwrap_err();
        match err {
            PosteError::Connect { addr, .. } => assert_eq!(addr, format!("127.0.0.1:{port}")),
            other => panic!("expected Connect, got {other:?}"),
        }
    }

    #[test]
    fn from_config_uses_connection_settings() {
        let config = ClientConfig {
            host: "repl.example".into(),
            port: 5000,
            timeout: Duration::from_millis(750),
            strict: false,
        };
        let transport = TcpTransport::from_config(&config);
        assert_eq!(transport.addr(), "repl.example:5000");
        assert_eq!(transport.timeout(), Duration::from_millis(750));
    }
}
