//! Views on the server root.

use crate::client::{Client, join};
use crate::error::Result;
use crate::types::{JobRef, JobTreeJson, ViewInfo, ViewListJson};

const VIEW_TREE: &str = "views[name,url,description]";

impl Client {
    /// URL of a root-level view.
    pub fn view_url(&self, name: &str) -> String {
        self.url(&format!("view/{}/", urlencoding::encode(name)))
    }

    /// List every view.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list_views(&self) -> Result<Vec<ViewInfo>> {
        let list: ViewListJson = self
            .api_json(self.base_url(), &[("tree", VIEW_TREE)])
            .await?;
        Ok(list.views)
    }

    /// Look up a view by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get_view(&self, name: &str) -> Result<Option<ViewInfo>> {
        Ok(self
            .list_views()
            .await?
            .into_iter()
            .find(|view| view.name == name))
    }

    /// Create a view from its `config.xml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is taken or the document is rejected.
    pub async fn create_view(&self, name: &str, config_xml: &str) -> Result<()> {
        self.post_xml(&self.url("createView"), &[("name", name)], config_xml)
            .await?;
        tracing::info!(view = %name, "View created");
        Ok(())
    }

    /// Delete a view. Its jobs are untouched.
    ///
    /// # Errors
    ///
    /// Returns a 404 [`crate::ClientError::Api`] if the view does not exist.
    pub async fn delete_view(&self, name: &str) -> Result<()> {
        self.post(&join(&self.view_url(name), "doDelete"), &[]).await?;
        tracing::info!(view = %name, "View deleted");
        Ok(())
    }

    /// Add a job to a view.
    ///
    /// # Errors
    ///
    /// Returns an error if the view or job does not exist.
    pub async fn add_job_to_view(&self, view: &str, job: &str) -> Result<()> {
        self.post(&join(&self.view_url(view), "addJobToView"), &[("name", job)])
            .await?;
        Ok(())
    }

    /// Remove a job from a view.
    ///
    /// # Errors
    ///
    /// Returns an error if the view or job does not exist.
    pub async fn remove_job_from_view(&self, view: &str, job: &str) -> Result<()> {
        self.post(&join(&self.view_url(view), "removeJobFromView"), &[("name", job)])
            .await?;
        Ok(())
    }

    /// Jobs shown in a view.
    ///
    /// # Errors
    ///
    /// Returns a 404 [`crate::ClientError::Api`] if the view does not exist.
    pub async fn list_view_jobs(&self, view: &str) -> Result<Vec<JobRef>> {
        let tree: JobTreeJson = self
            .api_json(&self.view_url(view), &[("tree", "jobs[name,url]")])
            .await?;
        Ok(tree
            .jobs
            .into_iter()
            .map(|job| JobRef {
                full_name: self.job_name(&job.url).unwrap_or_else(|| job.name.clone()),
                class: job.class,
                name: job.name,
                url: job.url,
            })
            .collect())
    }

    /// Read a view's `config.xml`.
    ///
    /// # Errors
    ///
    /// Returns a 404 [`crate::ClientError::Api`] if the view does not exist.
    pub async fn view_config(&self, name: &str) -> Result<String> {
        self.get_text(&join(&self.view_url(name), "config.xml")).await
    }

    /// Replace a view's `config.xml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the document.
    pub async fn set_view_config(&self, name: &str, config_xml: &str) -> Result<()> {
        self.post_xml(&join(&self.view_url(name), "config.xml"), &[], config_xml)
            .await?;
        Ok(())
    }

    /// Replace a view's description.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn set_view_description(&self, name: &str, description: &str) -> Result<()> {
        let url = join(&self.view_url(name), "submitDescription");
        self.post(&url, &[("description", description)]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use butler_core::testing::{MockTransport, exact};
    use butler_core::transport::Method;
    use serde_json::json;
    use std::sync::Arc;

    fn client_with(mock: &Arc<MockTransport>) -> Client {
        Client::new("http://h").unwrap().with_transport(mock.clone())
    }

    fn no_crumb() -> MockTransport {
        MockTransport::new()
            .on_get(&exact("http://h/crumbIssuer/api/json"))
            .respond_error(404, "Not Found")
    }

    fn views() -> serde_json::Value {
        json!({"views": [
            {"_class": "hudson.model.AllView", "name": "all", "url": "http://h/"},
            {"_class": "hudson.model.ListView", "name": "Release Train", "url": "http://h/view/Release%20Train/", "description": "Shipping jobs"}
        ]})
    }

    #[tokio::test]
    async fn test_list_and_get_views() {
        let mock = Arc::new(
            MockTransport::new()
                .on_get(r"^http://h/api/json\?tree=views")
                .respond_json(200, views()),
        );
        let client = client_with(&mock);

        let all = client.list_views().await.unwrap();
        assert_eq!(all.len(), 2);
        let release = client.get_view("Release Train").await.unwrap().unwrap();
        assert_eq!(release.description.as_deref(), Some("Shipping jobs"));
        assert!(client.get_view("nightly").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_view_posts_xml() {
        let mock = Arc::new(
            no_crumb()
                .on_post(&exact("http://h/createView?name=nightly"))
                .respond_text(200, ""),
        );
        client_with(&mock)
            .create_view("nightly", "<hudson.model.ListView/>")
            .await
            .unwrap();
        let post = mock.requests().into_iter().find(|r| r.method == Method::Post).unwrap();
        assert_eq!(post.body, b"<hudson.model.ListView/>");
    }

    #[tokio::test]
    async fn test_view_membership_and_delete_encode_names() {
        let mock = Arc::new(
            no_crumb()
                .on_post(r"^http://h/view/Release%20Train/")
                .respond_text(200, ""),
        );
        let client = client_with(&mock);

        client.add_job_to_view("Release Train", "team/api").await.unwrap();
        client.remove_job_from_view("Release Train", "docs").await.unwrap();
        client.set_view_description("Release Train", "Ships").await.unwrap();
        client.delete_view("Release Train").await.unwrap();

        let urls: Vec<String> = mock
            .requests()
            .into_iter()
            .filter(|r| r.method == Method::Post)
            .map(|r| r.url)
            .collect();
        assert_eq!(
            urls,
            vec![
                "http://h/view/Release%20Train/addJobToView?name=team%2Fapi",
                "http://h/view/Release%20Train/removeJobFromView?name=docs",
                "http://h/view/Release%20Train/submitDescription?description=Ships",
                "http://h/view/Release%20Train/doDelete",
            ]
        );
    }

    #[tokio::test]
    async fn test_list_view_jobs_resolves_full_names() {
        let mock = Arc::new(
            MockTransport::new()
                .on_get(&exact("http://h/view/nightly/api/json?tree=jobs%5Bname%2Curl%5D"))
                .respond_json(200, json!({"jobs": [
                    {"_class": "hudson.model.FreeStyleProject", "name": "api", "url": "http://h/job/team/job/api/"}
                ]})),
        );
        let jobs = client_with(&mock).list_view_jobs("nightly").await.unwrap();
        assert_eq!(jobs[0].full_name, "team/api");
        assert_eq!(jobs[0].name, "api");
    }

    #[tokio::test]
    async fn test_view_config_round_trip() {
        let mock = Arc::new(
            no_crumb()
                .on_get(&exact("http://h/view/nightly/config.xml"))
                .respond_text(200, "<hudson.model.ListView/>")
                .on_post(&exact("http://h/view/nightly/config.xml"))
                .respond_text(200, ""),
        );
        let client = client_with(&mock);

        let xml = client.view_config("nightly").await.unwrap();
        client.set_view_config("nightly", &xml).await.unwrap();
        assert_eq!(mock.count_matching(Method::Post, r"/view/nightly/config\.xml$"), 1);
    }
}
