//! poste-replique client library
//!
//! Talks to a persistent REPL ("replique") server over TCP:
//! - Request model serialized as one JSON object per call
//! - Receive loop that accumulates bytes until a JSON response parses
//! - Shape-based classification of responses into typed repliques

pub mod client;
pub mod config;
pub mod error;
pub mod replique;
pub mod transport;

pub use client::{execute, Client};
pub use config::ClientConfig;
pub use error::{PosteError, Result};
pub use replique::{Classifier, Condition, Replique, RepliqueKind, Shape};
pub use transport::{Command, Poste, TcpTransport, Transport};
