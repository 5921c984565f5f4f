//! Normalized class tags.
//!
//! The server reports a free-text `_class` on every JSON object, e.g.
//! `hudson.model.Queue$LeftItem` or `hudson.model.FreeStyleBuild`. These are
//! decoded once, at the deserialization boundary, into closed enums so the
//! rest of the crate never does string-suffix checks.

use serde::Deserialize;

const WORKFLOW_RUN_CLASS: &str = "org.jenkinsci.plugins.workflow.job.WorkflowRun";
const FREESTYLE_BUILD_CLASS: &str = "hudson.model.FreeStyleBuild";
const MATRIX_BUILD_CLASS: &str = "hudson.matrix.MatrixBuild";
const MATRIX_RUN_CLASS: &str = "hudson.matrix.MatrixRun";
const PLACEHOLDER_SUFFIX: &str = "PlaceholderExecutable";

/// Return the trailing identifier of a fully qualified class name.
///
/// `hudson.model.Queue$WaitingItem` becomes `WaitingItem`.
pub fn short_class(class: &str) -> &str {
    let start = class
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_alphanumeric() || *c == '_')
        .last()
        .map(|(i, _)| i)
        .unwrap_or(class.len());
    &class[start..]
}

/// Classification of a queue entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum QueueState {
    /// Waiting for its quiet period to expire.
    Waiting,
    /// Blocked by another build or a throttling rule.
    Blocked,
    /// Ready to run, waiting for a free executor.
    Buildable,
    /// Left the queue; either started a build or was cancelled.
    Left,
    /// A class this client does not know about.
    Other(String),
}

impl QueueState {
    /// Decode a queue entry `_class`.
    pub fn from_class(class: &str) -> Self {
        match short_class(class) {
            "WaitingItem" => Self::Waiting,
            "BlockedItem" => Self::Blocked,
            "BuildableItem" => Self::Buildable,
            "LeftItem" => Self::Left,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether an executor may already be running this entry even though the
    /// queue has not yet published a direct build reference.
    pub fn may_be_executing(&self) -> bool {
        matches!(self, Self::Waiting | Self::Buildable)
    }
}

impl From<String> for QueueState {
    fn from(class: String) -> Self {
        Self::from_class(&class)
    }
}

/// Type of a build.
///
/// Flow jobs run their node blocks on regular executors under a generic
/// placeholder class. Those are rewritten to [`BuildKind::WorkflowRun`] here
/// so callers see the real build type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(from = "String")]
pub enum BuildKind {
    /// A freestyle project build.
    FreeStyle,
    /// A pipeline (flow) run.
    WorkflowRun,
    /// A multi-configuration parent build.
    MatrixBuild,
    /// One configuration of a multi-configuration build.
    MatrixRun,
    /// Class not reported.
    #[default]
    Unknown,
    /// Any other build class, kept verbatim.
    Other(String),
}

impl BuildKind {
    /// Decode a build `_class`, rewriting placeholder executables.
    pub fn from_class(class: &str) -> Self {
        if class.is_empty() {
            return Self::Unknown;
        }
        if class.ends_with(PLACEHOLDER_SUFFIX) {
            return Self::WorkflowRun;
        }
        match short_class(class) {
            "FreeStyleBuild" => Self::FreeStyle,
            "WorkflowRun" => Self::WorkflowRun,
            "MatrixBuild" => Self::MatrixBuild,
            "MatrixRun" => Self::MatrixRun,
            _ => Self::Other(class.to_string()),
        }
    }

    /// Fully qualified class name of this kind.
    pub fn class_name(&self) -> &str {
        match self {
            Self::FreeStyle => FREESTYLE_BUILD_CLASS,
            Self::WorkflowRun => WORKFLOW_RUN_CLASS,
            Self::MatrixBuild => MATRIX_BUILD_CLASS,
            Self::MatrixRun => MATRIX_RUN_CLASS,
            Self::Unknown => "",
            Self::Other(class) => class,
        }
    }
}

impl From<String> for BuildKind {
    fn from(class: String) -> Self {
        Self::from_class(&class)
    }
}
