//! Client configuration.

use crate::error::{ClientError, Result};
use crate::poll::PollPolicy;
use butler_core::Credentials;
use std::env;
use std::time::Duration;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for a [`crate::Client`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    base_url: String,
    credentials: Option<Credentials>,
    timeout: Duration,
    poll: PollPolicy,
}

impl ClientConfig {
    /// Configuration for `base_url` with default settings.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            credentials: None,
            timeout: DEFAULT_TIMEOUT,
            poll: PollPolicy::default(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// - `BUTLER_URL`: server root (required)
    /// - `BUTLER_USER` and `BUTLER_API_TOKEN`: basic auth credentials
    /// - `BUTLER_TIMEOUT_SECS`: per-request timeout
    /// - `BUTLER_POLL_INTERVAL_MS`: initial queue polling interval
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if `BUTLER_URL` is missing, only one of
    /// the credential variables is set, or a number fails to parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let base_url = lookup("BUTLER_URL")
            .ok_or_else(|| ClientError::Config("BUTLER_URL is not set".to_string()))?;
        let mut config = Self::new(base_url);

        match (lookup("BUTLER_USER"), lookup("BUTLER_API_TOKEN")) {
            (Some(user), Some(token)) => config.credentials = Some(Credentials::basic(user, token)),
            (None, None) => {}
            _ => {
                return Err(ClientError::Config(
                    "BUTLER_USER and BUTLER_API_TOKEN must be set together".to_string(),
                ));
            }
        }

        if let Some(secs) = lookup("BUTLER_TIMEOUT_SECS") {
            config.timeout = Duration::from_secs(parse_number("BUTLER_TIMEOUT_SECS", &secs)?);
        }
        if let Some(ms) = lookup("BUTLER_POLL_INTERVAL_MS") {
            let interval = Duration::from_millis(parse_number("BUTLER_POLL_INTERVAL_MS", &ms)?);
            config.poll = config.poll.with_initial_interval(interval);
        }

        Ok(config)
    }

    /// Set the credentials.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the queue polling policy.
    #[must_use]
    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Server root URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Configured credentials, if any.
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Queue polling policy, carried into [`crate::Client::poll_policy`].
    pub fn poll_policy(&self) -> &PollPolicy {
        &self.poll
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| ClientError::Config(format!("{} must be a number, got: {}", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_from_env_minimal() {
        let config = ClientConfig::from_lookup(lookup(&[("BUTLER_URL", "http://ci:8080")])).unwrap();
        assert_eq!(config.base_url(), "http://ci:8080");
        assert!(config.credentials().is_none());
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(config.poll_policy(), &PollPolicy::default());
    }

    #[test]
    fn test_from_env_full() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("BUTLER_URL", "https://ci"),
            ("BUTLER_USER", "bot"),
            ("BUTLER_API_TOKEN", "t0k3n"),
            ("BUTLER_TIMEOUT_SECS", "5"),
            ("BUTLER_POLL_INTERVAL_MS", "250"),
        ]))
        .unwrap();

        assert_eq!(config.credentials(), Some(&Credentials::basic("bot", "t0k3n")));
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.poll_policy().initial_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_from_env_missing_url() {
        let err = ClientConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn test_from_env_half_credentials() {
        let err = ClientConfig::from_lookup(lookup(&[
            ("BUTLER_URL", "https://ci"),
            ("BUTLER_USER", "bot"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("BUTLER_API_TOKEN"));
    }

    #[test]
    fn test_from_env_bad_number() {
        let err = ClientConfig::from_lookup(lookup(&[
            ("BUTLER_URL", "https://ci"),
            ("BUTLER_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("BUTLER_TIMEOUT_SECS"));
    }
}
