//! Job commands.

use super::ServerArgs;
use anyhow::{Context, Result};

/// List jobs, descending `depth` folder levels below `folder`.
pub async fn list(server: &ServerArgs, folder: &str, depth: usize) -> Result<()> {
    let client = server.connect()?;
    for job in client.list_jobs(folder, depth).await? {
        let kind = if job.is_folder() { "folder" } else { "job" };
        println!("{:<40} {:<7} {}", job.full_name, kind, job.url);
    }
    Ok(())
}

/// Allow a job to be built.
pub async fn enable(server: &ServerArgs, job: &str) -> Result<()> {
    server.connect()?.enable_job(job).await?;
    println!("{} enabled", job);
    Ok(())
}

/// Prevent new builds of a job.
pub async fn disable(server: &ServerArgs, job: &str) -> Result<()> {
    server.connect()?.disable_job(job).await?;
    println!("{} disabled", job);
    Ok(())
}

/// Print a job's config.xml.
pub async fn config(server: &ServerArgs, job: &str) -> Result<()> {
    let xml = server
        .connect()?
        .job_config(job)
        .await
        .with_context(|| format!("Failed to read config of {}", job))?;
    print!("{}", xml);
    Ok(())
}
