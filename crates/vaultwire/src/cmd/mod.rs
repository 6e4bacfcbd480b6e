use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use vaultwire_client::{ClientConfig, VaultClient};

use crate::exit::{client_error, CliError, CliResult, TIMEOUT, USAGE};
use crate::output::OutputFormat;

pub mod list;
pub mod retrieve;
pub mod use_credential;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List credentials visible to the agent.
    List,
    /// Print a secret; its lease is released before exiting.
    Retrieve(RetrieveArgs),
    /// Have the vault perform an operation with a credential.
    Use(UseArgs),
    /// Show version information.
    Version(VersionArgs),
}

/// Where the daemon lives and who we are.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Unix socket of the vault daemon [default: ~/.vaultwire/vault.sock].
    #[arg(long, value_name = "PATH", global = true, conflicts_with_all = ["host", "port"])]
    pub socket: Option<PathBuf>,
    /// TCP host of the vault daemon (requires --port).
    #[arg(long, global = true)]
    pub host: Option<String>,
    /// TCP port of the vault daemon (requires --host).
    #[arg(long, global = true)]
    pub port: Option<u16>,
    /// Agent name to authenticate as.
    #[arg(long, value_name = "NAME", global = true)]
    pub agent: Option<String>,
    /// Agent signing key file [default: <key-dir>/<agent>.key].
    #[arg(long, value_name = "FILE", global = true)]
    pub key: Option<PathBuf>,
    /// Directory holding agent key files [default: ~/.vaultwire/keys].
    #[arg(long, value_name = "DIR", global = true)]
    pub key_dir: Option<PathBuf>,
    /// Give up after this long (e.g. 10s, 500ms).
    #[arg(long, value_name = "DURATION", default_value = "10s", global = true)]
    pub timeout: String,
}

impl ConnectionArgs {
    pub fn client_config(&self) -> CliResult<ClientConfig> {
        let agent = match self.agent.as_deref() {
            Some(agent) if !agent.trim().is_empty() => agent,
            _ => return Err(CliError::new(USAGE, "--agent is required")),
        };

        let mut config = ClientConfig::new(agent);
        config.socket_path = self.socket.clone();
        config.host = self.host.clone();
        config.port = self.port;
        config.key_path = self.key.clone();
        if let Some(dir) = &self.key_dir {
            config.key_dir = dir.clone();
        }
        Ok(config)
    }

    /// Connect and authenticate within the configured timeout.
    pub async fn connect(&self) -> CliResult<VaultClient> {
        let config = self.client_config()?;
        let timeout = parse_timeout(&self.timeout)?;
        within(timeout, "connect", VaultClient::connect(&config))
            .await?
            .map_err(|err| client_error("connect failed", err))
    }
}

#[derive(Args, Debug)]
pub struct RetrieveArgs {
    /// Credential path, e.g. openai/api_key.
    pub path: String,
    /// Requested lease lifetime in seconds.
    #[arg(long, value_name = "SECS")]
    pub ttl: Option<u64>,
}

#[derive(Args, Debug)]
pub struct UseArgs {
    /// Credential path.
    pub path: String,
    /// Operation for the vault to perform with the credential.
    pub operation: String,
    /// Operation parameters as a JSON object.
    #[arg(long, value_name = "JSON")]
    pub params: Option<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub async fn run(command: Command, conn: ConnectionArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::List => list::run(&conn, format).await,
        Command::Retrieve(args) => retrieve::run(args, &conn, format).await,
        Command::Use(args) => use_credential::run(args, &conn, format).await,
        Command::Version(args) => version::run(args),
    }
}

/// Bound `fut` by `timeout`; expiry maps to the TIMEOUT exit code.
pub async fn within<F: Future>(timeout: Duration, what: &str, fut: F) -> CliResult<F::Output> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| CliError::new(TIMEOUT, format!("{what} timed out after {timeout:?}")))
}

pub fn parse_timeout(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "timeout must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid timeout value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "timeout must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
