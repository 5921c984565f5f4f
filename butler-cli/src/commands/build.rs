//! Build command - trigger a job, wait for its build and follow the console.

use super::ServerArgs;
use super::logs::follow_console;
use anyhow::{Context, Result, bail};
use butler_client::{Build, BuildResult, Client, ConsoleFormat, PollPolicy, QueueEntry, QueueId};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Options for the build command.
#[derive(Debug)]
pub struct BuildOptions {
    /// Build parameters.
    pub params: Vec<(String, String)>,
    /// Whether to wait for the build to start.
    pub wait: bool,
    /// Whether to stream the console.
    pub follow: bool,
    /// Console format.
    pub format: ConsoleFormat,
    /// Seconds between queue polls, overriding the client's policy.
    pub poll_secs: Option<u64>,
    /// Upper bound on the wait for the build to start.
    pub start_timeout: Option<u64>,
}

/// Parse a `KEY=VALUE` build parameter.
pub fn parse_param(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

/// The client's policy, with the command-line overrides applied.
fn policy(base: &PollPolicy, poll_secs: Option<u64>, timeout: Option<u64>) -> PollPolicy {
    let policy = match poll_secs {
        Some(secs) => PollPolicy::fixed(Duration::from_secs(secs.max(1))),
        None => base.clone(),
    };
    match timeout {
        Some(secs) => policy.with_deadline(Duration::from_secs(secs)),
        None => policy,
    }
}

/// Run the build command.
pub async fn run(
    server: &ServerArgs,
    job: &str,
    options: BuildOptions,
    cancel: &CancellationToken,
) -> Result<()> {
    let client = server.connect()?;
    let params: Vec<(&str, &str)> = options
        .params
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();

    let entry = client
        .trigger_build(job, &params)
        .await
        .with_context(|| format!("Failed to trigger {}", job))?;
    println!("Queued {}", entry);

    if !options.wait && !options.follow {
        return Ok(());
    }

    let build = if options.poll_secs.is_none() && options.start_timeout.is_none() {
        client.wait_for_build_default(entry, cancel).await?
    } else {
        let policy = policy(client.poll_policy(), options.poll_secs, options.start_timeout);
        client.wait_for_build(entry, &policy, cancel).await?
    };
    let Some(build) = build else {
        bail!("Queue entry was cancelled before a build started");
    };
    println!("Started {}", build.url());

    if !options.follow {
        return Ok(());
    }

    follow_console(&client, &build, options.format, cancel).await?;
    report_result(&client, &build).await
}

/// Wait for an already queued entry.
pub async fn wait(
    server: &ServerArgs,
    entry: &str,
    timeout: Option<u64>,
    cancel: &CancellationToken,
) -> Result<()> {
    let client = server.connect()?;
    let entry = parse_entry(&client, entry)?;

    let policy = policy(client.poll_policy(), None, timeout);
    match client.wait_for_build(entry, &policy, cancel).await? {
        Some(build) => println!("{}", build.url()),
        None => bail!("Queue entry left the queue without starting a build"),
    }
    Ok(())
}

fn parse_entry(client: &Client, raw: &str) -> Result<QueueEntry> {
    if let Ok(id) = raw.parse::<u64>() {
        return Ok(client.queue_entry(QueueId::new(id)));
    }
    QueueEntry::from_handle(raw).with_context(|| format!("Not a queue id or URL: {}", raw))
}

async fn report_result(client: &Client, build: &Build) -> Result<()> {
    match client.build_result(build).await? {
        Some(BuildResult::Success) => {
            println!("Finished: SUCCESS");
            Ok(())
        }
        Some(result) => bail!("Build finished with {}", result),
        None => {
            println!("Console closed while the build is still running");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param() {
        assert_eq!(
            parse_param("BRANCH=feature/x=y"),
            Ok(("BRANCH".to_string(), "feature/x=y".to_string()))
        );
        assert_eq!(parse_param("EMPTY="), Ok(("EMPTY".to_string(), String::new())));
        assert!(parse_param("=value").is_err());
        assert!(parse_param("novalue").is_err());
    }

    #[test]
    fn test_policy_from_flags() {
        let configured = PollPolicy::fixed(Duration::from_millis(250));

        let inherited = policy(&configured, None, None);
        assert_eq!(inherited, configured);

        let clamped = policy(&configured, Some(0), None);
        assert_eq!(clamped.initial_interval(), Duration::from_secs(1));
        assert_eq!(clamped.deadline(), None);

        let bounded = policy(&configured, Some(2), Some(60));
        assert_eq!(bounded.initial_interval(), Duration::from_secs(2));
        assert_eq!(bounded.deadline(), Some(Duration::from_secs(60)));

        let deadline_only = policy(&configured, None, Some(5));
        assert_eq!(deadline_only.initial_interval(), Duration::from_millis(250));
        assert_eq!(deadline_only.deadline(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_parse_entry_accepts_id_and_url() {
        let client = Client::new("http://h").unwrap();
        assert_eq!(parse_entry(&client, "12").unwrap().url(), "http://h/queue/item/12/");
        assert_eq!(
            parse_entry(&client, "http://h/queue/item/13/").unwrap().id(),
            QueueId::new(13)
        );
        assert!(parse_entry(&client, "latest").is_err());
    }
}
