//! Job lifecycle: create, configure, rename, move, copy and delete jobs.
//!
//! Jobs are addressed by full name, folders separated by `/`. Operations
//! that create an item post to the parent folder's `createItem`.

use crate::client::{Client, join};
use crate::error::Result;
use crate::types::{BuildableJson, DescriptionJson, JobInfo, JobRef, JobTreeJson};

/// Split `a/b/c` into the parent folder `a/b` and the short name `c`.
fn split_full_name(full_name: &str) -> (&str, &str) {
    let trimmed = full_name.trim_matches('/');
    match trimmed.rsplit_once('/') {
        Some((parent, name)) => (parent, name),
        None => ("", trimmed),
    }
}

fn qualify(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

/// `tree` expression reaching `depth` levels below the first.
fn jobs_tree(depth: usize) -> String {
    let mut query = "jobs[name,url]".to_string();
    for _ in 0..depth {
        query = format!("jobs[name,url,{}]", query);
    }
    query
}

fn flatten(prefix: &str, nodes: Vec<JobTreeJson>, out: &mut Vec<JobRef>) {
    for node in nodes {
        let full_name = qualify(prefix, &node.name);
        let children = node.jobs;
        out.push(JobRef {
            class: node.class,
            name: node.name,
            full_name: full_name.clone(),
            url: node.url,
        });
        flatten(&full_name, children, out);
    }
}

impl Client {
    /// List jobs under `folder` (empty for the server root).
    ///
    /// `depth` is how many levels of nested folders to descend; `0` lists
    /// only the folder's direct children. Parents come before their
    /// children.
    ///
    /// # Errors
    ///
    /// Returns a 404 [`crate::ClientError::Api`] if the folder does not exist.
    pub async fn list_jobs(&self, folder: &str, depth: usize) -> Result<Vec<JobRef>> {
        let tree = jobs_tree(depth);
        let root: JobTreeJson = self
            .api_json(&self.job_url(folder), &[("tree", &tree)])
            .await?;

        let mut jobs = Vec::new();
        flatten(folder.trim_matches('/'), root.jobs, &mut jobs);
        Ok(jobs)
    }

    /// Create a job from its `config.xml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent folder is missing or the name is taken.
    pub async fn create_job(&self, full_name: &str, config_xml: &str) -> Result<()> {
        let (parent, name) = split_full_name(full_name);
        let url = join(&self.job_url(parent), "createItem");
        self.post_xml(&url, &[("name", name)], config_xml).await?;
        tracing::info!(job = %full_name, "Job created");
        Ok(())
    }

    /// Create `destination` as a copy of `source`.
    ///
    /// # Errors
    ///
    /// Returns an error if the source does not exist or the destination is taken.
    pub async fn copy_job(&self, source: &str, destination: &str) -> Result<()> {
        let (parent, name) = split_full_name(destination);
        let url = join(&self.job_url(parent), "createItem");
        let from = format!("/{}", source.trim_matches('/'));
        self.post(&url, &[("name", name), ("mode", "copy"), ("from", &from)])
            .await?;
        tracing::info!(source = %source, destination = %destination, "Job copied");
        Ok(())
    }

    /// Delete a job and all of its builds.
    ///
    /// # Errors
    ///
    /// Returns a 404 [`crate::ClientError::Api`] if the job does not exist.
    pub async fn delete_job(&self, full_name: &str) -> Result<()> {
        self.post(&join(&self.job_url(full_name), "doDelete"), &[]).await?;
        tracing::info!(job = %full_name, "Job deleted");
        Ok(())
    }

    /// Rename a job within its folder, returning the new full name.
    ///
    /// # Errors
    ///
    /// Returns an error if the job does not exist or the name is taken.
    pub async fn rename_job(&self, full_name: &str, new_name: &str) -> Result<String> {
        let url = join(&self.job_url(full_name), "confirmRename");
        let response = self.post(&url, &[("newName", new_name)]).await?;

        let (parent, _) = split_full_name(full_name);
        let renamed = self.moved_to(response.header("Location"))?;
        Ok(renamed.unwrap_or_else(|| qualify(parent, new_name)))
    }

    /// Move a job into `folder` (empty for the server root), returning the
    /// new full name.
    ///
    /// # Errors
    ///
    /// Returns an error if the job or folder does not exist.
    pub async fn move_job(&self, full_name: &str, folder: &str) -> Result<String> {
        let url = join(&self.job_url(full_name), "move/move");
        let destination = format!("/{}", folder.trim_matches('/'));
        let response = self.post(&url, &[("destination", &destination)]).await?;

        let (_, name) = split_full_name(full_name);
        let moved = self.moved_to(response.header("Location"))?;
        Ok(moved.unwrap_or_else(|| qualify(folder.trim_matches('/'), name)))
    }

    /// Read a job's `config.xml`.
    ///
    /// # Errors
    ///
    /// Returns a 404 [`crate::ClientError::Api`] if the job does not exist.
    pub async fn job_config(&self, full_name: &str) -> Result<String> {
        self.get_text(&join(&self.job_url(full_name), "config.xml"))
            .await
    }

    /// Replace a job's `config.xml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the document.
    pub async fn set_job_config(&self, full_name: &str, config_xml: &str) -> Result<()> {
        self.post_xml(&join(&self.job_url(full_name), "config.xml"), &[], config_xml)
            .await?;
        Ok(())
    }

    /// Allow the job to be built again.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn enable_job(&self, full_name: &str) -> Result<()> {
        self.post(&join(&self.job_url(full_name), "enable"), &[]).await?;
        tracing::info!(job = %full_name, "Job enabled");
        Ok(())
    }

    /// Prevent new builds of the job.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn disable_job(&self, full_name: &str) -> Result<()> {
        self.post(&join(&self.job_url(full_name), "disable"), &[]).await?;
        tracing::info!(job = %full_name, "Job disabled");
        Ok(())
    }

    /// Whether the job accepts new builds.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn is_buildable(&self, full_name: &str) -> Result<bool> {
        let job: BuildableJson = self
            .api_json(&self.job_url(full_name), &[("tree", "buildable")])
            .await?;
        Ok(job.buildable)
    }

    /// The folder holding a job, or `None` for top-level jobs.
    ///
    /// # Errors
    ///
    /// Returns an error if the folder cannot be fetched.
    pub async fn job_parent(&self, full_name: &str) -> Result<Option<JobInfo>> {
        match split_full_name(full_name) {
            ("", _) => Ok(None),
            (parent, _) => self.get_job(parent).await.map(Some),
        }
    }

    /// A job's description.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn job_description(&self, full_name: &str) -> Result<Option<String>> {
        let job: DescriptionJson = self
            .api_json(&self.job_url(full_name), &[("tree", "description")])
            .await?;
        Ok(job.description)
    }

    /// Replace a job's description.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn set_job_description(&self, full_name: &str, description: &str) -> Result<()> {
        let url = join(&self.job_url(full_name), "submitDescription");
        self.post(&url, &[("description", description)]).await?;
        Ok(())
    }

    /// Full name of the job a rename or move redirected to.
    fn moved_to(&self, location: Option<&str>) -> Result<Option<String>> {
        match location {
            Some(location) => Ok(self.job_name(&self.absolute_url(location)?)),
            None => Ok(None),
        }
    }
}
