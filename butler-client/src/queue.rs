//! Queue entries and queue operations.

use crate::client::{Client, with_trailing_slash};
use crate::error::{ClientError, Result};
use crate::types::{QueueEntryState, QueueJson};
use butler_core::QueueId;
use std::fmt;

/// A pending request to run a job.
///
/// Constructed once from the handle returned when a build is triggered. The
/// id is parsed from the handle at construction and is the key used to
/// correlate the entry with the build that eventually runs it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueueEntry {
    url: String,
    id: QueueId,
}

impl QueueEntry {
    /// Create a queue entry from its handle, e.g. `http://h/queue/item/42/`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidHandle`] if the handle does not end in a
    /// numeric id.
    pub fn from_handle(handle: impl Into<String>) -> Result<Self> {
        let handle = handle.into();
        if handle.is_empty() {
            return Err(ClientError::InvalidHandle("empty queue handle".to_string()));
        }
        let id = QueueId::from_handle(&handle).ok_or_else(|| ClientError::InvalidHandle(handle.clone()))?;
        Ok(Self {
            url: with_trailing_slash(&handle),
            id,
        })
    }

    /// Entry URL, ending in `/`.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Queue id.
    pub fn id(&self) -> QueueId {
        self.id
    }
}

impl fmt::Display for QueueEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.url)
    }
}

impl Client {
    /// Handle for the queue entry with the given id. Performs no request.
    pub fn queue_entry(&self, id: QueueId) -> QueueEntry {
        QueueEntry {
            url: self.url(&format!("queue/item/{}/", id.as_u64())),
            id,
        }
    }

    /// Fetch the current state of a queue entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body cannot be decoded.
    /// An entry that has been purged from the queue history answers 404.
    pub async fn queue_entry_state(&self, entry: &QueueEntry) -> Result<QueueEntryState> {
        self.api_json(entry.url(), &[]).await
    }

    /// Fetch the state of the queue entry with the given id.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body cannot be decoded.
    pub async fn get_queue_entry(&self, id: QueueId) -> Result<QueueEntryState> {
        self.queue_entry_state(&self.queue_entry(id)).await
    }

    /// List every entry currently in the queue.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body cannot be decoded.
    pub async fn list_queue(&self) -> Result<Vec<QueueEntryState>> {
        let queue: QueueJson = self.api_json(&self.url("queue/"), &[]).await?;
        Ok(queue.items)
    }

    /// Cancel a queued entry before it starts.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn cancel_queue_entry(&self, id: QueueId) -> Result<()> {
        let id = id.as_u64().to_string();
        self.post(&self.url("queue/cancelItem"), &[("id", &id)]).await?;
        tracing::info!(queue_id = %id, "Cancelled queue entry");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use butler_core::QueueState;
    use butler_core::testing::{MockTransport, exact};
    use butler_core::transport::Method;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_from_handle_parses_id() {
        let entry = QueueEntry::from_handle("http://h/queue/item/42").unwrap();
        assert_eq!(entry.id(), QueueId::new(42));
        assert_eq!(entry.url(), "http://h/queue/item/42/");
    }

    #[test]
    fn test_from_handle_rejects_bad_handles() {
        assert!(matches!(
            QueueEntry::from_handle(""),
            Err(ClientError::InvalidHandle(_))
        ));
        assert!(matches!(
            QueueEntry::from_handle("http://h/queue/item/"),
            Err(ClientError::InvalidHandle(_))
        ));
    }

    #[test]
    fn test_queue_entry_from_id() {
        let client = Client::new("http://h").unwrap();
        let entry = client.queue_entry(QueueId::new(7));
        assert_eq!(entry.url(), "http://h/queue/item/7/");
        assert_eq!(entry, QueueEntry::from_handle("http://h/queue/item/7/").unwrap());
    }

    #[tokio::test]
    async fn test_list_queue() {
        let mock = Arc::new(
            MockTransport::new()
                .on_get(&exact("http://h/queue/api/json"))
                .respond_json(
                    200,
                    json!({"items": [
                        {"_class": "hudson.model.Queue$BlockedItem", "id": 3, "blocked": true,
                         "why": "Build #2 is already in progress"},
                        {"_class": "hudson.model.Queue$WaitingItem", "id": 4}
                    ]}),
                ),
        );
        let client = Client::new("http://h").unwrap().with_transport(mock.clone());

        let items = client.list_queue().await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].state, QueueState::Blocked);
        assert!(items[0].why.as_deref().unwrap().contains("in progress"));
        assert_eq!(items[1].state, QueueState::Waiting);
    }

    #[tokio::test]
    async fn test_cancel_queue_entry_posts_id() {
        let mock = Arc::new(
            MockTransport::new()
                .on_get(&exact("http://h/crumbIssuer/api/json"))
                .respond_error(404, "Not Found")
                .on_post(&exact("http://h/queue/cancelItem?id=9"))
                .respond(butler_core::HttpResponse::new(302, "").with_header("Location", "http://h/queue/")),
        );
        let client = Client::new("http://h").unwrap().with_transport(mock.clone());

        client.cancel_queue_entry(QueueId::new(9)).await.unwrap();
        assert_eq!(mock.count_matching(Method::Post, "cancelItem"), 1);
    }
}
