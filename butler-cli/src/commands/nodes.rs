//! Node commands.

use super::ServerArgs;
use anyhow::Result;
use butler_client::SlotKind;

/// List nodes with their status.
pub async fn list(server: &ServerArgs) -> Result<()> {
    let client = server.connect()?;
    for node in client.list_nodes().await? {
        let status = match (node.offline, node.temporarily_offline) {
            (_, true) => "disabled",
            (true, false) => "offline",
            (false, false) => "online",
        };
        println!("{:<30} {:<9} {}", node.name, status, node.url);
    }
    Ok(())
}

/// List busy executors.
pub async fn busy(server: &ServerArgs) -> Result<()> {
    let client = server.connect()?;
    let slots = client.busy_executors().await?;
    if slots.is_empty() {
        println!("All executors idle");
    }
    for slot in slots {
        let kind = match slot.kind {
            SlotKind::Regular => "executor",
            SlotKind::OneOff => "flyweight",
        };
        println!("node {:<4} {:<10} {}", slot.computer, kind, slot.build);
    }
    Ok(())
}

/// Bring a node back online.
pub async fn enable(server: &ServerArgs, name: &str) -> Result<()> {
    server.connect()?.enable_node(name).await?;
    println!("{} is online", name);
    Ok(())
}

/// Take a node offline.
pub async fn disable(server: &ServerArgs, name: &str, message: &str) -> Result<()> {
    server.connect()?.disable_node(name, message).await?;
    println!("{} is offline", name);
    Ok(())
}
