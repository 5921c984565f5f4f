//! Node and executor directory.

use crate::build::Build;
use crate::client::Client;
use crate::error::{ClientError, Result};
use crate::types::{ComputerSetJson, NodeInfo};

/// Tree expression listing what every executor slot is running.
///
/// `oneOffExecutors` carries the flyweight executors pipeline runs occupy
/// while their node blocks run elsewhere.
pub(crate) const EXECUTOR_TREE: &str =
    "computer[executors[currentExecutable[url]],oneOffExecutors[currentExecutable[url]]]";

const NODE_TREE: &str = "computer[displayName,offline,temporarilyOffline]";

/// Kind of executor slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// A regular executor counted against the node's capacity.
    Regular,
    /// A flyweight executor, used by pipeline runs.
    OneOff,
}

/// A busy executor slot and the build it is running.
///
/// A snapshot only: other clients change the directory at any time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorSlot {
    /// Position of the node in the directory listing.
    pub computer: usize,
    /// Slot kind.
    pub kind: SlotKind,
    /// Build occupying the slot.
    pub build: Build,
}

/// URL path segment for a node's display name.
///
/// The controller's own node is addressed by a reserved name.
fn node_path(display_name: &str) -> &str {
    match display_name {
        "master" => "(master)",
        "Built-In Node" => "(built-in)",
        other => other,
    }
}

impl Client {
    /// List every busy executor slot across all nodes.
    ///
    /// Slots whose current executable has no build number are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body cannot be decoded.
    pub async fn busy_executors(&self) -> Result<Vec<ExecutorSlot>> {
        let directory: ComputerSetJson = self
            .api_json(&self.url("computer/"), &[("tree", EXECUTOR_TREE), ("depth", "2")])
            .await?;

        let mut slots = Vec::new();
        for (index, computer) in directory.computer.into_iter().enumerate() {
            let regular = computer.executors.into_iter().map(|e| (SlotKind::Regular, e));
            let one_off = computer
                .one_off_executors
                .into_iter()
                .map(|e| (SlotKind::OneOff, e));

            for (kind, executor) in regular.chain(one_off) {
                let Some(executable) = executor.current_executable else {
                    continue;
                };
                match Build::from_executable(&executable) {
                    Ok(build) => slots.push(ExecutorSlot {
                        computer: index,
                        kind,
                        build,
                    }),
                    Err(_) => {
                        tracing::debug!(url = %executable.url, "Skipping executor without a build number")
                    }
                }
            }
        }

        tracing::debug!(busy = slots.len(), "Listed executor directory");
        Ok(slots)
    }

    /// List all nodes.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body cannot be decoded.
    pub async fn list_nodes(&self) -> Result<Vec<NodeInfo>> {
        let directory: ComputerSetJson = self
            .api_json(&self.url("computer/"), &[("tree", NODE_TREE)])
            .await?;

        Ok(directory
            .computer
            .into_iter()
            .filter_map(|computer| {
                let name = computer.display_name?;
                let url = self.url(&format!(
                    "computer/{}/",
                    urlencoding::encode(node_path(&name))
                ));
                Some(NodeInfo {
                    name,
                    url,
                    offline: computer.offline,
                    temporarily_offline: computer.temporarily_offline,
                })
            })
            .collect())
    }

    /// Look up a node by display name.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get_node(&self, name: &str) -> Result<Option<NodeInfo>> {
        Ok(self
            .list_nodes()
            .await?
            .into_iter()
            .find(|node| node.name == name))
    }

    /// Bring a node taken offline by a user back online.
    ///
    /// Does nothing if the node is already online.
    ///
    /// # Errors
    ///
    /// Returns a 404 [`ClientError::Api`] if no node has that name, or an
    /// error if a request fails.
    pub async fn enable_node(&self, name: &str) -> Result<()> {
        let node = self.require_node(name).await?;
        if !node.temporarily_offline {
            return Ok(());
        }
        self.post(&format!("{}toggleOffline", node.url), &[("offlineMessage", "")])
            .await?;
        tracing::info!(node = %name, "Node enabled");
        Ok(())
    }

    /// Take a node offline with a message shown to users.
    ///
    /// Does nothing if the node is already marked offline.
    ///
    /// # Errors
    ///
    /// Returns a 404 [`ClientError::Api`] if no node has that name, or an
    /// error if a request fails.
    pub async fn disable_node(&self, name: &str, message: &str) -> Result<()> {
        let node = self.require_node(name).await?;
        if node.temporarily_offline {
            return Ok(());
        }
        self.post(&format!("{}toggleOffline", node.url), &[("offlineMessage", message)])
            .await?;
        tracing::info!(node = %name, "Node disabled");
        Ok(())
    }

    async fn require_node(&self, name: &str) -> Result<NodeInfo> {
        self.get_node(name).await?.ok_or_else(|| ClientError::Api {
            status: 404,
            message: format!("No node named {}", name),
        })
    }
}
