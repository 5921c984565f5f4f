//! Console output retrieval.
//!
//! Running builds publish their console incrementally. Each fetch of
//! `logText/progressive{Text,Html}?start=N` returns the output after byte
//! `N`, the current total size in `X-Text-Size` and, while the build can
//! still produce output, `X-More-Data: true`. [`ProgressiveLog`] drives that
//! protocol one chunk at a time; [`Client::stream_log`] pushes every chunk
//! into a sink until the output is complete.

use crate::build::Build;
use crate::client::{Client, join};
use crate::error::{ClientError, Result};
use butler_core::HttpResponse;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const TEXT_SIZE_HEADER: &str = "X-Text-Size";
const MORE_DATA_HEADER: &str = "X-More-Data";

/// Rendering of console output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsoleFormat {
    /// Plain text.
    #[default]
    Text,
    /// HTML with console annotations rendered.
    Html,
}

impl ConsoleFormat {
    fn endpoint(self) -> &'static str {
        match self {
            Self::Text => "logText/progressiveText",
            Self::Html => "logText/progressiveHtml",
        }
    }
}

impl fmt::Display for ConsoleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Html => f.write_str("html"),
        }
    }
}

/// Error parsing a [`ConsoleFormat`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown console format '{0}', expected 'text' or 'html'")]
pub struct ParseConsoleFormatError(String);

impl FromStr for ConsoleFormat {
    type Err = ParseConsoleFormatError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "html" => Ok(Self::Html),
            _ => Err(ParseConsoleFormatError(s.to_string())),
        }
    }
}

/// Output delivered by one progressive fetch.
///
/// `start..end` is the range of the log's text the chunk covers. For
/// [`ConsoleFormat::Html`] the rendered `bytes` may be longer than that range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogChunk {
    /// Cursor the chunk was fetched from.
    pub start: u64,
    /// Cursor after the chunk.
    pub end: u64,
    /// Raw response body.
    pub bytes: Vec<u8>,
}

impl LogChunk {
    /// Body as text, replacing invalid UTF-8.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

/// Pull-based reader over a build's progressive console.
///
/// The cursor starts at 0 and never decreases. Fetches that report no growth
/// are retried without yielding a chunk. Once the server clears
/// `X-More-Data` the reader is finished and performs no further requests.
#[derive(Debug)]
pub struct ProgressiveLog {
    client: Client,
    url: String,
    cursor: u64,
    finished: bool,
    idle_delay: Duration,
    cancel: Option<CancellationToken>,
}

impl ProgressiveLog {
    /// Reader over `build`'s console in the given format.
    pub fn new(client: Client, build: &Build, format: ConsoleFormat) -> Self {
        Self {
            client,
            url: join(build.url(), format.endpoint()),
            cursor: 0,
            finished: false,
            idle_delay: Duration::ZERO,
            cancel: None,
        }
    }

    /// Stop with [`ClientError::Cancelled`] once `token` fires.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Sleep this long before retrying a fetch that reported no growth.
    #[must_use]
    pub fn with_idle_delay(mut self, delay: Duration) -> Self {
        self.idle_delay = delay;
        self
    }

    /// Begin reading at byte `offset` instead of the start of the log.
    ///
    /// Used to re-read a chunk the caller failed to consume, see
    /// [`ProgressiveLog::next_chunk`].
    #[must_use]
    pub fn starting_at(mut self, offset: u64) -> Self {
        self.cursor = offset;
        self
    }

    /// Current position in the log.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Whether the server reported the output complete.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Fetch the next chunk of output.
    ///
    /// Returns `None` once the output is complete.
    ///
    /// The cursor moves past a chunk as soon as it is returned, before the
    /// caller has consumed it. If handling the chunk fails, the next call
    /// continues after it; to see those bytes again, open a new reader with
    /// [`ProgressiveLog::starting_at`] at the chunk's `start`.
    ///
    /// # Errors
    ///
    /// Transport errors end the read and are not retried. A missing or
    /// unparsable `X-Text-Size`, or a size below the cursor, is
    /// [`ClientError::InvalidResponse`].
    pub async fn next_chunk(&mut self) -> Result<Option<LogChunk>> {
        loop {
            if self.finished {
                return Ok(None);
            }
            self.check_cancelled()?;

            let start = self.cursor.to_string();
            let response = self.client.get(&self.url, &[("start", &start)]).await?;
            let size = text_size(&response)?;
            let more = more_data(&response);

            if size < self.cursor {
                return Err(ClientError::InvalidResponse(format!(
                    "log size went backwards from {} to {}",
                    self.cursor, size
                )));
            }

            if size == self.cursor {
                if !more {
                    self.finished = true;
                    return Ok(None);
                }
                tracing::debug!(url = %self.url, cursor = self.cursor, "No new console output");
                self.idle().await?;
                continue;
            }

            let chunk = LogChunk {
                start: self.cursor,
                end: size,
                bytes: response.body,
            };
            tracing::trace!(url = %self.url, cursor = self.cursor, size, more, "Console chunk");
            self.cursor = size;
            self.finished = !more;
            return Ok(Some(chunk));
        }
    }

    /// Push every remaining chunk into `sink`.
    ///
    /// Stops at the first sink error and returns it verbatim; no further
    /// requests are made.
    ///
    /// # Errors
    ///
    /// Returns the sink's error, or any [`ClientError`] converted into `E`.
    pub async fn pipe_to<F, E>(mut self, mut sink: F) -> std::result::Result<(), E>
    where
        F: FnMut(&[u8]) -> std::result::Result<(), E>,
        E: From<ClientError>,
    {
        while let Some(chunk) = self.next_chunk().await? {
            sink(&chunk.bytes)?;
        }
        Ok(())
    }

    fn check_cancelled(&self) -> Result<()> {
        match self.cancel {
            Some(ref token) if token.is_cancelled() => Err(ClientError::Cancelled),
            _ => Ok(()),
        }
    }

    async fn idle(&self) -> Result<()> {
        if self.idle_delay.is_zero() {
            return Ok(());
        }
        match self.cancel {
            Some(ref token) => tokio::select! {
                _ = token.cancelled() => Err(ClientError::Cancelled),
                _ = tokio::time::sleep(self.idle_delay) => Ok(()),
            },
            None => {
                tokio::time::sleep(self.idle_delay).await;
                Ok(())
            }
        }
    }
}

fn text_size(response: &HttpResponse) -> Result<u64> {
    let raw = response.header(TEXT_SIZE_HEADER).ok_or_else(|| {
        ClientError::InvalidResponse(format!("missing {} header", TEXT_SIZE_HEADER))
    })?;
    raw.trim().parse().map_err(|_| {
        ClientError::InvalidResponse(format!("invalid {} header: {}", TEXT_SIZE_HEADER, raw))
    })
}

/// A missing header means the build will not produce more output.
fn more_data(response: &HttpResponse) -> bool {
    response
        .header(MORE_DATA_HEADER)
        .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
}

impl Client {
    /// Open a pull-based reader over a build's console.
    pub fn progressive_log(&self, build: &Build, format: ConsoleFormat) -> ProgressiveLog {
        ProgressiveLog::new(self.clone(), build, format)
    }

    /// Stream a build's console into `sink` until the build stops producing
    /// output.
    ///
    /// Each call of `sink` receives one new, non-overlapping chunk.
    ///
    /// # Errors
    ///
    /// Returns the sink's error verbatim if it fails, or the first
    /// [`ClientError`] (converted into `E`) from a fetch.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use butler_client::{Build, Client, ClientError, ConsoleFormat};
    /// # use std::io::Write;
    /// # async fn example(client: Client, build: Build) -> Result<(), ClientError> {
    /// let mut stdout = std::io::stdout();
    /// client
    ///     .stream_log(&build, ConsoleFormat::Text, |bytes| {
    ///         stdout.write_all(bytes).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    ///     })
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn stream_log<F, E>(
        &self,
        build: &Build,
        format: ConsoleFormat,
        sink: F,
    ) -> std::result::Result<(), E>
    where
        F: FnMut(&[u8]) -> std::result::Result<(), E>,
        E: From<ClientError>,
    {
        self.progressive_log(build, format).pipe_to(sink).await
    }

    /// Fetch the whole console in one request and hand it to `sink` line by
    /// line.
    ///
    /// # Errors
    ///
    /// Returns the sink's error verbatim, or the request's error converted
    /// into `E`.
    pub async fn stream_lines<F, E>(&self, build: &Build, mut sink: F) -> std::result::Result<(), E>
    where
        F: FnMut(&str) -> std::result::Result<(), E>,
        E: From<ClientError>,
    {
        let text = self.console_text(build).await?;
        for line in text.lines() {
            sink(line)?;
        }
        Ok(())
    }

    /// Fetch the whole console as text.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn console_text(&self, build: &Build) -> Result<String> {
        let response = self.get(&join(build.url(), "consoleText"), &[]).await?;
        Ok(response.body_string())
    }
}
