//! Bounded polling for queue resolution.

use crate::build::Build;
use crate::client::Client;
use crate::error::{ClientError, Result};
use crate::queue::QueueEntry;
use crate::resolver::{QueueResolver, Resolution};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// How often, and for how long, to retry a pending queue entry.
///
/// The defaults poll once a second with no upper bound; set
/// `max_attempts` or `deadline_ms` to bound the wait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Delay before the second attempt in milliseconds.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Ceiling for the delay between attempts in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Factor applied to the delay after each pending attempt.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Give up after this many attempts.
    #[serde(default)]
    pub max_attempts: Option<u32>,

    /// Give up once this much time has passed, in milliseconds.
    #[serde(default)]
    pub deadline_ms: Option<u64>,
}

fn default_initial_delay_ms() -> u64 {
    1000
}
fn default_max_delay_ms() -> u64 {
    10_000
}
fn default_backoff_multiplier() -> f64 {
    1.0
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_attempts: None,
            deadline_ms: None,
        }
    }
}

impl PollPolicy {
    /// Poll at a fixed interval.
    pub fn fixed(interval: Duration) -> Self {
        Self::default().with_initial_interval(interval)
    }

    /// Set the delay after the first pending attempt.
    #[must_use]
    pub fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_delay_ms = duration_ms(interval);
        self.max_delay_ms = self.max_delay_ms.max(self.initial_delay_ms);
        self
    }

    /// Grow the delay by `multiplier` per attempt, up to `max`.
    #[must_use]
    pub fn with_backoff(mut self, multiplier: f64, max: Duration) -> Self {
        self.backoff_multiplier = multiplier;
        self.max_delay_ms = duration_ms(max);
        self
    }

    /// Bound the number of attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Bound the total time spent polling.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline_ms = Some(duration_ms(deadline));
        self
    }

    /// Delay after the first pending attempt.
    pub fn initial_interval(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Total time budget, if bounded.
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }

    /// Delay to wait after the given 1-based attempt came back pending.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay = self.initial_delay_ms as f64 * self.backoff_multiplier.max(1.0).powi(exponent);
        let capped = delay.min(self.max_delay_ms.max(self.initial_delay_ms) as f64);
        Duration::from_millis(capped as u64)
    }

    fn exhausted(&self, attempts: u32, elapsed: Duration) -> bool {
        if let Some(max) = self.max_attempts
            && attempts >= max
        {
            return true;
        }
        self.deadline().is_some_and(|deadline| elapsed >= deadline)
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl QueueResolver {
    /// Resolve repeatedly until a terminal outcome, sleeping between
    /// pending attempts as `policy` dictates.
    ///
    /// Returns `None` if the entry left the queue without a build.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Timeout`] when the policy runs out of attempts
    /// or time, [`ClientError::Cancelled`] when `cancel` fires, and any error
    /// from [`QueueResolver::resolve`] unchanged.
    pub async fn wait(
        &mut self,
        policy: &PollPolicy,
        cancel: &CancellationToken,
    ) -> Result<Option<Build>> {
        let started = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(ClientError::Cancelled);
            }

            attempts += 1;
            match self.resolve().await? {
                Resolution::Build(build) => return Ok(Some(build)),
                Resolution::NotFound => return Ok(None),
                Resolution::Pending => {}
            }

            let elapsed = started.elapsed();
            if policy.exhausted(attempts, elapsed) {
                tracing::warn!(queue_id = %self.entry().id(), attempts, "Gave up waiting for build");
                return Err(ClientError::Timeout { attempts, elapsed });
            }

            let mut delay = policy.delay_for(attempts);
            if let Some(deadline) = policy.deadline() {
                delay = delay.min(deadline.saturating_sub(elapsed));
            }
            tracing::debug!(queue_id = %self.entry().id(), attempt = attempts, delay = ?delay, "Waiting for build to start");

            tokio::select! {
                _ = cancel.cancelled() => return Err(ClientError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

impl Client {
    /// Wait for a queue entry to start its build.
    ///
    /// Shorthand for [`Client::resolver`] followed by [`QueueResolver::wait`].
    ///
    /// # Errors
    ///
    /// See [`QueueResolver::wait`].
    pub async fn wait_for_build(
        &self,
        entry: QueueEntry,
        policy: &PollPolicy,
        cancel: &CancellationToken,
    ) -> Result<Option<Build>> {
        self.resolver(entry).wait(policy, cancel).await
    }

    /// Wait for a queue entry using the client's own [`PollPolicy`].
    ///
    /// The policy comes from [`crate::ClientConfig`] (including
    /// `BUTLER_POLL_INTERVAL_MS`) or [`Client::with_poll_policy`].
    ///
    /// # Errors
    ///
    /// See [`QueueResolver::wait`].
    pub async fn wait_for_build_default(
        &self,
        entry: QueueEntry,
        cancel: &CancellationToken,
    ) -> Result<Option<Build>> {
        self.wait_for_build(entry, self.poll_policy(), cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use butler_core::testing::{MockTransport, exact};
    use serde_json::json;
    use std::sync::Arc;

    const ENTRY_URL: &str = "http://h/queue/item/7/api/json";

    fn waiting() -> serde_json::Value {
        json!({"_class": "hudson.model.Queue$BlockedItem", "id": 7})
    }

    fn left() -> serde_json::Value {
        json!({
            "_class": "hudson.model.Queue$LeftItem",
            "id": 7,
            "executable": {"_class": "hudson.model.FreeStyleBuild", "url": "http://h/job/x/5/"}
        })
    }

    fn client_with(mock: &Arc<MockTransport>) -> (Client, QueueEntry) {
        let client = Client::new("http://h").unwrap().with_transport(mock.clone());
        let entry = client.queue_entry(butler_core::QueueId::new(7));
        (client, entry)
    }

    #[test]
    fn test_default_policy() {
        let policy = PollPolicy::default();
        assert_eq!(policy.initial_interval(), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(50), Duration::from_secs(1));
        assert_eq!(policy.max_attempts, None);
        assert_eq!(policy.deadline(), None);
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = PollPolicy::fixed(Duration::from_millis(100))
            .with_backoff(2.0, Duration::from_millis(500));
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(4), Duration::from_millis(500));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_millis(500));
    }

    #[test]
    fn test_policy_deserializes_with_defaults() {
        let policy: PollPolicy = serde_json::from_value(json!({"max_attempts": 5})).unwrap();
        assert_eq!(policy.max_attempts, Some(5));
        assert_eq!(policy.initial_delay_ms, 1000);
        assert_eq!(policy.backoff_multiplier, 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_polls_until_build_appears() {
        let mock = Arc::new(
            MockTransport::new()
                .on_get(&exact(ENTRY_URL))
                .times(2)
                .respond_json(200, waiting())
                .on_get(&exact(ENTRY_URL))
                .respond_json(200, left()),
        );
        let (client, entry) = client_with(&mock);

        let build = client
            .wait_for_build(entry, &PollPolicy::default(), &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(build.url(), "http://h/job/x/5/");
        assert_eq!(mock.request_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out_after_max_attempts() {
        let mock = Arc::new(MockTransport::new().on_get(&exact(ENTRY_URL)).respond_json(200, waiting()));
        let (client, entry) = client_with(&mock);

        let policy = PollPolicy::default().with_max_attempts(3);
        let err = client
            .wait_for_build(entry, &policy, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Timeout { attempts: 3, .. }));
        assert_eq!(mock.request_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out_at_deadline() {
        let mock = Arc::new(MockTransport::new().on_get(&exact(ENTRY_URL)).respond_json(200, waiting()));
        let (client, entry) = client_with(&mock);

        let policy = PollPolicy::default().with_deadline(Duration::from_millis(2500));
        let err = client
            .wait_for_build(entry, &policy, &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            ClientError::Timeout { attempts, elapsed } => {
                assert_eq!(attempts, 4);
                assert!(elapsed >= Duration::from_millis(2500));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_stops_when_cancelled() {
        let mock = Arc::new(MockTransport::new().on_get(&exact(ENTRY_URL)).respond_json(200, waiting()));
        let (client, entry) = client_with(&mock);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            trigger.cancel();
        });

        let err = client
            .wait_for_build(entry, &PollPolicy::default(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Cancelled));
        assert_eq!(mock.request_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_wait_uses_configured_policy() {
        let mock = Arc::new(MockTransport::new().on_get(&exact(ENTRY_URL)).respond_json(200, waiting()));
        let config = crate::ClientConfig::new("http://h")
            .with_poll_policy(PollPolicy::fixed(Duration::from_millis(200)).with_max_attempts(2));
        let client = Client::from_config(&config).unwrap().with_transport(mock.clone());
        let entry = client.queue_entry(butler_core::QueueId::new(7));

        let started = tokio::time::Instant::now();
        let err = client
            .wait_for_build_default(entry, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Timeout { attempts: 2, .. }));
        assert_eq!(mock.request_count(), 2);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(200) && elapsed < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_wait_returns_none_for_cancelled_entry() {
        let mock = Arc::new(MockTransport::new().on_get(&exact(ENTRY_URL)).respond_json(
            200,
            json!({"_class": "hudson.model.Queue$LeftItem", "id": 7, "cancelled": true}),
        ));
        let (client, entry) = client_with(&mock);

        let outcome = client
            .wait_for_build(entry, &PollPolicy::default(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(outcome.is_none());
    }
}
