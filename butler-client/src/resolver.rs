//! Queue resolution.
//!
//! Triggering a build yields a queue entry, not a build. [`QueueResolver`]
//! turns that entry into the build it produced. Entries that have left the
//! queue carry a direct reference to their build; entries still marked
//! waiting or buildable may already be running on an executor, so the
//! executor directory is scanned for a build whose `queueId` matches.
//!
//! Each call to [`QueueResolver::resolve`] is a single round of queries.
//! Retrying on [`Resolution::Pending`] is the caller's job, see
//! [`QueueResolver::wait`].

use crate::build::Build;
use crate::client::Client;
use crate::error::{ClientError, Result};
use crate::queue::QueueEntry;
use crate::types::QueueOriginJson;
use butler_core::QueueState;
use std::collections::HashSet;

/// Outcome of one resolution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The entry produced this build.
    Build(Build),
    /// The server has not decided yet; try again later.
    Pending,
    /// The entry left the queue without starting a build.
    NotFound,
}

impl Resolution {
    /// Whether further attempts would give the same answer.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// The resolved build, if any.
    pub fn build(&self) -> Option<&Build> {
        match self {
            Self::Build(build) => Some(build),
            _ => None,
        }
    }
}

/// Resolves one queue entry to its build.
///
/// The first terminal outcome is cached; later calls return it without
/// touching the network.
#[derive(Debug, Clone)]
pub struct QueueResolver {
    client: Client,
    entry: QueueEntry,
    settled: Option<Resolution>,
}

impl QueueResolver {
    /// Create a resolver for `entry`.
    pub fn new(client: Client, entry: QueueEntry) -> Self {
        Self {
            client,
            entry,
            settled: None,
        }
    }

    /// The entry being resolved.
    pub fn entry(&self) -> &QueueEntry {
        &self.entry
    }

    /// The cached terminal outcome, if one has been reached.
    pub fn settled(&self) -> Option<&Resolution> {
        self.settled.as_ref()
    }

    /// Make one resolution attempt.
    ///
    /// # Errors
    ///
    /// Transport and decoding errors propagate unchanged and are not
    /// retried. Fails with [`ClientError::AmbiguousCorrelation`] if more than
    /// one running build claims the entry.
    pub async fn resolve(&mut self) -> Result<Resolution> {
        if let Some(ref settled) = self.settled {
            return Ok(settled.clone());
        }

        let state = self.client.queue_entry_state(&self.entry).await?;
        let resolution = match state.state {
            QueueState::Left => match state.executable {
                Some(ref executable) => Resolution::Build(Build::from_executable(executable)?),
                None => Resolution::NotFound,
            },
            ref waiting if waiting.may_be_executing() => {
                match self.client.correlate(&self.entry).await? {
                    Some(build) => Resolution::Build(build),
                    None => Resolution::Pending,
                }
            }
            _ => Resolution::Pending,
        };

        if resolution.is_terminal() {
            match resolution {
                Resolution::Build(ref build) => {
                    tracing::info!(queue_id = %self.entry.id(), build = %build.url(), "Queue entry resolved")
                }
                _ => tracing::info!(
                    queue_id = %self.entry.id(),
                    cancelled = state.cancelled,
                    "Queue entry left without a build"
                ),
            }
            self.settled = Some(resolution.clone());
        } else {
            tracing::debug!(queue_id = %self.entry.id(), state = ?state.state, "Queue entry pending");
        }
        Ok(resolution)
    }
}

impl Client {
    /// Create a resolver for a queue entry.
    pub fn resolver(&self, entry: QueueEntry) -> QueueResolver {
        QueueResolver::new(self.clone(), entry)
    }

    /// Find the running build that started from `entry`.
    ///
    /// Scans every busy executor slot, fetching each distinct build's
    /// `queueId`. A build deleted between the scan and the lookup is skipped.
    async fn correlate(&self, entry: &QueueEntry) -> Result<Option<Build>> {
        let slots = self.busy_executors().await?;

        let mut seen = HashSet::new();
        let mut matches = Vec::new();
        for slot in slots {
            if !seen.insert(slot.build.url().to_string()) {
                continue;
            }
            let origin: QueueOriginJson = match self
                .api_json(slot.build.url(), &[("tree", "queueId")])
                .await
            {
                Ok(origin) => origin,
                Err(err) if err.is_not_found() => {
                    tracing::debug!(build = %slot.build.url(), "Build vanished during correlation");
                    continue;
                }
                Err(err) => return Err(err),
            };
            if origin.queue_id == Some(entry.id()) {
                matches.push(slot.build);
            }
        }

        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            _ => {
                let builds: Vec<String> = matches.iter().map(|b| b.url().to_string()).collect();
                tracing::warn!(queue_id = %entry.id(), builds = ?builds, "Queue entry matches several builds");
                Err(ClientError::AmbiguousCorrelation {
                    queue_id: entry.id(),
                    builds,
                })
            }
        }
    }
}
