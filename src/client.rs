//! Client facade.
//!
//! Builds a request, runs it through a transport and returns the classified
//! response. This is the entry point for the CLI and for library users.

use tracing::info;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::replique::{Classifier, Replique};
use crate::transport::{Command, Poste, TcpTransport, Transport};

/// A replique client over some transport.
#[derive(Debug, Clone)]
pub struct Client<T> {
    transport: T,
    classifier: Classifier,
}

impl<T: Transport> Client<T> {
    /// Create a client that recognizes the built-in response shapes.
    pub fn new(transport: T) -> Self {
        Self::with_classifier(transport, Classifier::default())
    }

    pub const fn with_classifier(transport: T, classifier: Classifier) -> Self {
        Self {
            transport,
            classifier,
        }
    }

    pub const fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Send one request and return its classified response.
    pub async fn execute(&self, poste: &Poste) -> Result<Replique> {
        info!(
            command = poste.command().as_str(),
            code_len = poste.code().len(),
            context = ?poste.context(),
            "Posting request"
        );
        self.transport.request(poste, &self.classifier).await
    }

    pub async fn evaluate(&self, code: &str, context: Option<&str>) -> Result<Replique> {
        self.execute(&Poste::evaluate(code, context.map(str::to_owned)))
            .await
    }

    pub async fn complete(&self, code: &str, context: Option<&str>) -> Result<Replique> {
        self.execute(&Poste::complete(code, context.map(str::to_owned)))
            .await
    }

    /// Ask the server for a new context whose name starts with `prefix`.
    pub async fn unique_context(&self, prefix: &str) -> Result<Replique> {
        self.execute(&Poste::unique_context(prefix)).await
    }
}

impl Client<TcpTransport> {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(TcpTransport::from_config(config))
    }
}

/// Run one command against the server described by `config`.
pub async fn execute(
    command: Command,
    code: &str,
    context: Option<&str>,
    config: &ClientConfig,
) -> Result<Replique> {
    let poste = Poste::new(command, code, context.map(str::to_owned));
    Client::from_config(config).execute(&poste).await
}
