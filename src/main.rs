//! poste-replique
//!
//! Sends one command to a replique server and prints the response's
//! display value on stdout.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use poste_replique::config::{timeout_from_secs, ClientConfig};
use poste_replique::{client, Command};

#[derive(Parser, Debug)]
#[command(name = "poste-replique")]
#[command(about = "Communicate with a replique server")]
struct Args {
    /// The command to be executed on the remote server
    #[arg(value_enum)]
    command: CommandArg,

    /// The code to execute the command on (the name prefix for unique-context)
    code: String,

    /// Server host name
    #[arg(short, long)]
    server: Option<String>,

    /// Server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Name of the context in which to execute this command.
    /// A new one will be created if necessary.
    #[arg(short, long)]
    context: Option<String>,

    /// Timeout in seconds when waiting for a response from the server
    #[arg(short, long, value_parser = parse_timeout)]
    timeout: Option<Duration>,

    /// JSON file with host, port, timeout_seconds and strict settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep reading after malformed JSON instead of failing
    #[arg(long)]
    lenient: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CommandArg {
    Evaluate,
    Complete,
    UniqueContext,
}

impl From<CommandArg> for Command {
    fn from(arg: CommandArg) -> Self {
        match arg {
            CommandArg::Evaluate => Self::Evaluate,
            CommandArg::Complete => Self::Complete,
            CommandArg::UniqueContext => Self::UniqueContext,
        }
    }
}

fn parse_timeout(s: &str) -> Result<Duration, String> {
    let secs: f64 = s.parse().map_err(|e| format!("{e}"))?;
    timeout_from_secs(secs).map_err(|e| e.to_string())
}

impl Args {
    /// Resolve settings: command line > config file > defaults.
    fn client_config(&self) -> Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::from_file(path).context("Failed to load configuration")?,
            None => ClientConfig::default(),
        };

        if let Some(server) = &self.server {
            config.host.clone_from(server);
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if self.lenient {
            config.strict = false;
        }
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout carries only the response
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = args.client_config()?;
    debug!(
        host = %config.host,
        port = config.port,
        timeout = ?config.timeout,
        strict = config.strict,
        "Resolved configuration"
    );

    let replique = client::execute(
        args.command.into(),
        &args.code,
        args.context.as_deref(),
        &config,
    )
    .await
    .with_context(|| format!("Request to {}:{} failed", config.host, config.port))?;

    println!("{replique}");
    Ok(())
}
