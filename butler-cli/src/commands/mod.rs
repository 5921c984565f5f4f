//! CLI command implementations.

pub mod build;
pub mod jobs;
pub mod logs;
pub mod nodes;
pub mod queue;
pub mod version;

use anyhow::{Context, Result};
use butler_client::{Client, ClientConfig, Credentials, PollPolicy};
use clap::Args;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Connection options shared by every command.
#[derive(Debug, Args)]
pub struct ServerArgs {
    /// Server URL
    #[arg(long, env = "BUTLER_URL", global = true, default_value = "http://localhost:8080")]
    pub url: String,

    /// User name for API token authentication
    #[arg(long, env = "BUTLER_USER", global = true)]
    pub user: Option<String>,

    /// API token
    #[arg(long, env = "BUTLER_API_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, env = "BUTLER_TIMEOUT_SECS", global = true, default_value = "30")]
    pub request_timeout: u64,

    /// Milliseconds between queue polls while waiting for a build to start
    #[arg(long, env = "BUTLER_POLL_INTERVAL_MS", global = true)]
    pub poll_interval_ms: Option<u64>,
}

impl ServerArgs {
    fn config(&self) -> Result<ClientConfig> {
        let mut config = ClientConfig::new(&self.url)
            .with_timeout(Duration::from_secs(self.request_timeout));
        if let Some(ms) = self.poll_interval_ms {
            config = config.with_poll_policy(PollPolicy::fixed(Duration::from_millis(ms.max(1))));
        }
        match (&self.user, &self.token) {
            (Some(user), Some(token)) => {
                Ok(config.with_credentials(Credentials::basic(user, token)))
            }
            (None, None) => Ok(config),
            _ => anyhow::bail!("--user and --token must be given together"),
        }
    }

    /// Build a client for the configured server.
    pub fn connect(&self) -> Result<Client> {
        let config = self.config()?;
        Client::from_config(&config).with_context(|| format!("Failed to connect to {}", self.url))
    }
}

/// Token cancelled on the first Ctrl-C.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, stopping");
            trigger.cancel();
        }
    });
    token
}
