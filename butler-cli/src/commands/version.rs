//! Version command - show client and server versions.

use super::ServerArgs;
use anyhow::Result;

/// Client version.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run the version command.
pub async fn run(server: &ServerArgs) -> Result<()> {
    println!("butler {}", VERSION);

    let client = server.connect()?;
    match client.version().await {
        Ok(Some(version)) => println!("Server:  {} ({})", version, client.base_url()),
        Ok(None) => println!("Server:  unknown version ({})", client.base_url()),
        Err(err) => {
            tracing::debug!(error = %err, "Version request failed");
            println!("Server:  unreachable ({})", client.base_url());
        }
    }
    Ok(())
}
