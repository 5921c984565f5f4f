//! Queue commands.

use super::ServerArgs;
use anyhow::Result;
use butler_client::{QueueEntryState, QueueId};

fn describe(item: &QueueEntryState) -> String {
    let id = item
        .id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "queue#?".to_string());
    let job = item
        .task
        .as_ref()
        .and_then(|task| task.name.clone())
        .unwrap_or_else(|| "<unknown job>".to_string());
    let why = item.why.as_deref().unwrap_or("");
    format!("{:<12} {:<30} {}", id, job, why)
}

/// List queued entries.
pub async fn list(server: &ServerArgs) -> Result<()> {
    let client = server.connect()?;
    let items = client.list_queue().await?;

    if items.is_empty() {
        println!("Queue is empty");
        return Ok(());
    }
    for item in &items {
        println!("{}", describe(item));
    }
    Ok(())
}

/// Cancel a queued entry.
pub async fn cancel(server: &ServerArgs, id: u64) -> Result<()> {
    let client = server.connect()?;
    client.cancel_queue_entry(QueueId::new(id)).await?;
    println!("Cancelled {}", QueueId::new(id));
    Ok(())
}
