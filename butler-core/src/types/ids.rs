//! Numeric identifiers parsed from server handles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a queue entry.
///
/// Derived once from the trailing path segment of the entry's handle
/// (`.../queue/item/42/`) and never recomputed. Running builds report the
/// same value as their `queueId`, which is what correlation matches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueId(u64);

impl QueueId {
    /// Create a queue ID from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Parse the queue ID from a handle such as `http://h/queue/item/42/`.
    ///
    /// Returns `None` if the trailing path segment is not a number.
    pub fn from_handle(handle: &str) -> Option<Self> {
        trailing_number(handle).map(Self)
    }
}

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "queue#{}", self.0)
    }
}

impl From<u64> for QueueId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Number of a build within its job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildNumber(u64);

impl BuildNumber {
    /// Create a build number from a raw value.
    #[must_use]
    pub const fn new(number: u64) -> Self {
        Self(number)
    }

    /// Get the raw number.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Parse the build number from a handle such as `http://h/job/x/5/`.
    pub fn from_handle(handle: &str) -> Option<Self> {
        trailing_number(handle).map(Self)
    }
}

impl fmt::Display for BuildNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for BuildNumber {
    fn from(number: u64) -> Self {
        Self(number)
    }
}

/// Parse the last path segment of a URL as a number.
///
/// Trailing slashes are ignored, so `http://h/job/x/5/` and
/// `http://h/job/x/5` both yield `5`.
pub fn trailing_number(url: &str) -> Option<u64> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse().ok())
}
