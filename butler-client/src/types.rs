//! Wire types decoded from the server's JSON API.
//!
//! `_class` fields are normalized here, at the decoding boundary, into the
//! closed enums from `butler-core`.

use butler_core::{BuildKind, BuildNumber, QueueId, QueueState};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;

/// Reference to a build embedded in another object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExecutableRef {
    /// Build type, with placeholder executables already rewritten.
    #[serde(rename = "_class", default)]
    pub kind: BuildKind,
    /// Build URL.
    pub url: String,
    /// Build number, when the server includes it.
    #[serde(default)]
    pub number: Option<BuildNumber>,
}

/// Reference to the job a queue entry was created for.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaskRef {
    /// Job class.
    #[serde(rename = "_class", default)]
    pub class: String,
    /// Job name.
    #[serde(default)]
    pub name: Option<String>,
    /// Job URL.
    pub url: String,
}

fn unreported_state() -> QueueState {
    QueueState::Other(String::new())
}

/// Current state of a queue entry, as reported by `<entry>/api/json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntryState {
    /// Classification decoded from `_class`.
    #[serde(rename = "_class", default = "unreported_state")]
    pub state: QueueState,
    /// Queue id.
    #[serde(default)]
    pub id: Option<QueueId>,
    /// Originating job.
    #[serde(default)]
    pub task: Option<TaskRef>,
    /// Build started for this entry; only present once it has left the queue.
    #[serde(default)]
    pub executable: Option<ExecutableRef>,
    /// Whether the entry was cancelled before it started.
    #[serde(default)]
    pub cancelled: bool,
    /// Why the entry is still waiting.
    #[serde(default)]
    pub why: Option<String>,
    /// Whether the entry is blocked.
    #[serde(default)]
    pub blocked: bool,
    /// Whether the entry is ready for an executor.
    #[serde(default)]
    pub buildable: bool,
    /// Whether the entry has waited unusually long for an executor.
    #[serde(default)]
    pub stuck: bool,
    /// When the entry was queued.
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub in_queue_since: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueueJson {
    #[serde(default)]
    pub items: Vec<QueueEntryState>,
}

/// `computer/api/json` restricted to executor slots.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ComputerSetJson {
    #[serde(default)]
    pub computer: Vec<ComputerJson>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ComputerJson {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub offline: bool,
    #[serde(default)]
    pub temporarily_offline: bool,
    #[serde(default)]
    pub executors: Vec<ExecutorJson>,
    #[serde(default)]
    pub one_off_executors: Vec<ExecutorJson>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExecutorJson {
    #[serde(default)]
    pub current_executable: Option<ExecutableRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueueOriginJson {
    #[serde(default)]
    pub queue_id: Option<QueueId>,
}

/// Outcome of a finished build.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum BuildResult {
    /// All steps passed.
    Success,
    /// Passed with test failures or warnings.
    Unstable,
    /// Failed.
    Failure,
    /// Skipped, e.g. an upstream build failed.
    NotBuilt,
    /// Stopped by a user or timeout.
    Aborted,
    /// A result this client does not know about.
    Other(String),
}

impl From<String> for BuildResult {
    fn from(result: String) -> Self {
        match result.as_str() {
            "SUCCESS" => Self::Success,
            "UNSTABLE" => Self::Unstable,
            "FAILURE" => Self::Failure,
            "NOT_BUILT" => Self::NotBuilt,
            "ABORTED" => Self::Aborted,
            _ => Self::Other(result),
        }
    }
}

impl fmt::Display for BuildResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Success => "SUCCESS",
            Self::Unstable => "UNSTABLE",
            Self::Failure => "FAILURE",
            Self::NotBuilt => "NOT_BUILT",
            Self::Aborted => "ABORTED",
            Self::Other(other) => other,
        };
        f.write_str(name)
    }
}

/// Status fields of a build, fetched on demand.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStatus {
    /// Build type.
    #[serde(rename = "_class", default)]
    pub kind: BuildKind,
    /// Build number.
    pub number: BuildNumber,
    /// Whether the build is still running.
    #[serde(default)]
    pub building: bool,
    /// Outcome; `None` while running.
    #[serde(default)]
    pub result: Option<BuildResult>,
    /// Id of the queue entry the build started from.
    #[serde(default)]
    pub queue_id: Option<QueueId>,
    /// Start time.
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Duration in milliseconds; zero while running.
    #[serde(default)]
    pub duration: u64,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Display name, `#N` unless renamed.
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Summary of a job.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInfo {
    /// Job class.
    #[serde(rename = "_class", default)]
    pub class: String,
    /// Short name.
    pub name: String,
    /// Name including enclosing folders, `a/b/c`.
    #[serde(default)]
    pub full_name: Option<String>,
    /// Job URL.
    pub url: String,
    /// Whether the job can be triggered.
    #[serde(default)]
    pub buildable: bool,
    /// Whether a build is queued.
    #[serde(default)]
    pub in_queue: bool,
    /// Status ball color.
    #[serde(default)]
    pub color: Option<String>,
    /// Number the next build will get.
    #[serde(default)]
    pub next_build_number: Option<u64>,
    /// Recent builds, newest first.
    #[serde(default)]
    pub builds: Vec<ExecutableRef>,
    /// Most recent build.
    #[serde(default)]
    pub last_build: Option<ExecutableRef>,
    /// Most recent completed build.
    #[serde(default)]
    pub last_completed_build: Option<ExecutableRef>,
}

/// A build agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    /// Display name.
    pub name: String,
    /// Node URL.
    pub url: String,
    /// Whether the node is offline for any reason.
    pub offline: bool,
    /// Whether the node was taken offline by a user.
    pub temporarily_offline: bool,
}

/// A job or folder found while walking the job tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRef {
    /// Job class, e.g. `hudson.model.FreeStyleProject`.
    pub class: String,
    /// Short name.
    pub name: String,
    /// Name including enclosing folders.
    pub full_name: String,
    /// Job URL.
    pub url: String,
}

impl JobRef {
    /// Whether this item holds other jobs rather than builds.
    pub fn is_folder(&self) -> bool {
        matches!(
            butler_core::types::short_class(&self.class),
            "Folder" | "WorkflowMultiBranchProject" | "OrganizationFolder"
        )
    }
}

/// `jobs[...]` tree node as returned by the server.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct JobTreeJson {
    #[serde(rename = "_class", default)]
    pub class: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub jobs: Vec<JobTreeJson>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BuildableJson {
    #[serde(default)]
    pub buildable: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DescriptionJson {
    #[serde(default)]
    pub description: Option<String>,
}

/// A view grouping jobs on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ViewInfo {
    /// View name.
    pub name: String,
    /// View URL.
    pub url: String,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ViewListJson {
    #[serde(default)]
    pub views: Vec<ViewInfo>,
}

/// A stored credential. Secrets are never part of the API response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialInfo {
    /// Credential id, used to reference it from jobs.
    pub id: String,
    /// Kind of credential, e.g. "Username with password".
    #[serde(default)]
    pub type_name: String,
    /// Display name.
    #[serde(default)]
    pub display_name: String,
    /// Name qualified by store and domain.
    #[serde(default)]
    pub full_name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
}

impl fmt::Display for CredentialInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}: {}", self.type_name, self.full_name)?;
        match self.description.as_deref() {
            Some(description) if !description.is_empty() => write!(f, " ({})>", description),
            _ => f.write_str(">"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CredentialListJson {
    #[serde(default)]
    pub credentials: Vec<CredentialInfo>,
}
