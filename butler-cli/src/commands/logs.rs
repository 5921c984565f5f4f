//! Logs command - print a build's console.

use super::ServerArgs;
use anyhow::{Context, Result};
use butler_client::{Build, BuildNumber, BuildSelector, Client, ClientError, ConsoleFormat};
use std::io::Write;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Pause between polls of a console that has not grown.
const IDLE_DELAY: Duration = Duration::from_millis(500);

/// Run the logs command.
pub async fn run(
    server: &ServerArgs,
    job: &str,
    number: Option<u64>,
    follow: bool,
    format: ConsoleFormat,
    cancel: &CancellationToken,
) -> Result<()> {
    let client = server.connect()?;
    let build = match number {
        Some(number) => client.get_build(job, BuildNumber::new(number)).await?,
        None => client
            .job_build(job, BuildSelector::Last)
            .await?
            .with_context(|| format!("{} has no builds", job))?,
    };

    if follow {
        return follow_console(&client, &build, format, cancel).await;
    }

    let mut stdout = std::io::stdout().lock();
    client
        .stream_lines(&build, |line| writeln!(stdout, "{}", line).map_err(anyhow::Error::from))
        .await
}

/// Stream a build's console to stdout until the build stops writing.
pub async fn follow_console(
    client: &Client,
    build: &Build,
    format: ConsoleFormat,
    cancel: &CancellationToken,
) -> Result<()> {
    let log = client
        .progressive_log(build, format)
        .with_idle_delay(IDLE_DELAY)
        .with_cancellation(cancel.clone());

    let mut stdout = std::io::stdout();
    let result = log
        .pipe_to(|bytes| {
            stdout.write_all(bytes)?;
            stdout.flush()?;
            Ok::<_, anyhow::Error>(())
        })
        .await;

    match result {
        Err(err) if matches!(err.downcast_ref::<ClientError>(), Some(ClientError::Cancelled)) => {
            tracing::info!(build = %build.url(), "Stopped following console");
            Ok(())
        }
        other => other,
    }
}
