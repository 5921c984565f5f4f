//! Build handles.

use crate::error::{ClientError, Result};
use crate::types::ExecutableRef;
use butler_core::{BuildKind, BuildNumber};
use std::fmt;

/// One concrete execution of a job.
///
/// Identity is fixed at construction: the number is parsed from the handle
/// once and never recomputed. Status fields are fetched on demand through
/// [`crate::Client::build_status`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Build {
    url: String,
    number: BuildNumber,
    kind: BuildKind,
}

impl Build {
    /// Create a build handle from its URL.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidHandle`] if the last path segment of
    /// `url` is not a build number.
    pub fn new(url: impl Into<String>, kind: BuildKind) -> Result<Self> {
        let url = url.into();
        let number =
            BuildNumber::from_handle(&url).ok_or_else(|| ClientError::InvalidHandle(url.clone()))?;
        let url = if url.ends_with('/') { url } else { format!("{}/", url) };
        Ok(Self { url, number, kind })
    }

    /// Create a build handle from a reference embedded in another object.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidHandle`] if the reference URL has no
    /// trailing build number.
    pub fn from_executable(executable: &ExecutableRef) -> Result<Self> {
        Self::new(executable.url.clone(), executable.kind.clone())
    }

    /// Build URL, ending in `/`.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Build number.
    pub fn number(&self) -> BuildNumber {
        self.number
    }

    /// Build type.
    pub fn kind(&self) -> &BuildKind {
        &self.kind
    }

    /// URL of the job this build belongs to.
    pub fn job_url(&self) -> &str {
        let trimmed = self.url.trim_end_matches('/');
        match trimmed.rfind('/') {
            Some(idx) => &self.url[..=idx],
            None => &self.url,
        }
    }
}

impl fmt::Display for Build {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            BuildKind::Unknown => write!(f, "<build: {}>", self.url),
            _ => write!(f, "<{}: {}>", self.kind.class_name(), self.url),
        }
    }
}
