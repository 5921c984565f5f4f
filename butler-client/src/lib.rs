//! Async client for a Jenkins-compatible build server.
//!
//! Beyond one-request wrappers for jobs, builds, the queue, nodes, views,
//! credentials and server administration, this crate implements the two
//! parts of the API that need real logic:
//!
//! - **Queue resolution**: triggering a build returns a queue entry.
//!   [`QueueResolver`] turns it into the [`Build`] it produced, correlating
//!   against the executor directory while the queue has not published a
//!   direct reference yet. [`PollPolicy`] bounds the retry loop.
//! - **Progressive logs**: [`ProgressiveLog`] reads a running build's
//!   console chunk by chunk; [`Client::stream_log`] feeds it to a sink.
//!
//! # Example
//!
//! ```no_run
//! use butler_client::{Client, ConsoleFormat, PollPolicy};
//! use tokio_util::sync::CancellationToken;
//! use std::io::Write;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::new("https://ci.example.com")?
//!     .with_api_token("deploy-bot", "11d0c5...");
//!
//! let entry = client.trigger_build("platform/api", &[("BRANCH", "main")]).await?;
//! let policy = PollPolicy::default().with_max_attempts(120);
//! let Some(build) = client
//!     .wait_for_build(entry, &policy, &CancellationToken::new())
//!     .await?
//! else {
//!     println!("build was cancelled before it started");
//!     return Ok(());
//! };
//!
//! let mut stdout = std::io::stdout();
//! let mut log = client.progressive_log(&build, ConsoleFormat::Text);
//! while let Some(chunk) = log.next_chunk().await? {
//!     stdout.write_all(&chunk.bytes)?;
//! }
//! println!("result: {:?}", client.build_result(&build).await?);
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! All operations return `Result<T, ClientError>`:
//!
//! ```no_run
//! # use butler_client::{Client, ClientError};
//! # async fn example() -> Result<(), ClientError> {
//! # let client = Client::new("http://localhost:8080")?;
//! match client.get_job("platform/api").await {
//!     Ok(job) => println!("Found: {}", job.url),
//!     Err(ClientError::Api { status: 404, .. }) => println!("Job not found"),
//!     Err(e) => println!("Error: {}", e),
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod build;
mod builds;
mod client;
mod config;
mod credentials;
mod error;
mod job_admin;
mod jobs;
mod logs;
mod nodes;
mod poll;
mod queue;
mod resolver;
mod server;
mod types;
mod views;

pub use build::Build;
pub use client::Client;
pub use config::{ClientConfig, DEFAULT_TIMEOUT};
pub use credentials::CredentialStore;
pub use error::{ClientError, Result};
pub use jobs::BuildSelector;
pub use logs::{ConsoleFormat, LogChunk, ParseConsoleFormatError, ProgressiveLog};
pub use nodes::{ExecutorSlot, SlotKind};
pub use poll::PollPolicy;
pub use queue::QueueEntry;
pub use resolver::{QueueResolver, Resolution};
pub use types::{
    BuildResult, BuildStatus, CredentialInfo, ExecutableRef, JobInfo, JobRef, NodeInfo,
    QueueEntryState, TaskRef, ViewInfo,
};

pub use butler_core::{BuildKind, BuildNumber, Credentials, QueueId, QueueState};
