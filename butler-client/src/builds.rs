//! Build status and control.

use crate::build::Build;
use crate::client::{Client, join};
use crate::error::Result;
use crate::types::{BuildResult, BuildStatus};

impl Client {
    /// Fetch a build's status fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body cannot be decoded.
    pub async fn build_status(&self, build: &Build) -> Result<BuildStatus> {
        self.api_json(build.url(), &[]).await
    }

    /// Whether the build is still running.
    ///
    /// # Errors
    ///
    /// Returns an error if the status cannot be fetched.
    pub async fn is_building(&self, build: &Build) -> Result<bool> {
        Ok(self.build_status(build).await?.building)
    }

    /// The build's result; `None` while it is running.
    ///
    /// # Errors
    ///
    /// Returns an error if the status cannot be fetched.
    pub async fn build_result(&self, build: &Build) -> Result<Option<BuildResult>> {
        Ok(self.build_status(build).await?.result)
    }

    /// The build's description.
    ///
    /// # Errors
    ///
    /// Returns an error if the status cannot be fetched.
    pub async fn build_description(&self, build: &Build) -> Result<Option<String>> {
        let status: BuildStatus = self
            .api_json(build.url(), &[("tree", "number,description")])
            .await?;
        Ok(status.description)
    }

    /// Replace the build's description.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn set_build_description(&self, build: &Build, description: &str) -> Result<()> {
        self.post(&join(build.url(), "submitDescription"), &[("description", description)])
            .await?;
        Ok(())
    }

    /// Ask a running build to abort, as the stop button does.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn stop_build(&self, build: &Build) -> Result<()> {
        self.control(build, "stop").await
    }

    /// Interrupt a pipeline run that ignored [`Client::stop_build`].
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn term_build(&self, build: &Build) -> Result<()> {
        self.control(build, "term").await
    }

    /// Hard-kill a pipeline run that ignored [`Client::term_build`].
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn kill_build(&self, build: &Build) -> Result<()> {
        self.control(build, "kill").await
    }

    /// Delete a build and its logs.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete_build(&self, build: &Build) -> Result<()> {
        self.control(build, "doDelete").await
    }

    async fn control(&self, build: &Build, action: &str) -> Result<()> {
        self.post(&join(build.url(), action), &[]).await?;
        tracing::info!(build = %build.url(), action, "Sent build control request");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use butler_core::testing::{MockTransport, exact};
    use butler_core::transport::Method;
    use butler_core::{BuildKind, QueueId};
    use serde_json::json;
    use std::sync::Arc;

    fn build() -> Build {
        Build::new("http://h/job/x/5/", BuildKind::FreeStyle).unwrap()
    }

    fn client_with(mock: &Arc<MockTransport>) -> Client {
        Client::new("http://h").unwrap().with_transport(mock.clone())
    }

    #[tokio::test]
    async fn test_build_status() {
        let mock = Arc::new(MockTransport::new().on_get(&exact("http://h/job/x/5/api/json")).respond_json(
            200,
            json!({
                "_class": "hudson.model.FreeStyleBuild",
                "number": 5,
                "building": false,
                "result": "FAILURE",
                "queueId": 12,
                "duration": 5300,
                "description": "nightly"
            }),
        ));
        let client = client_with(&mock);

        let status = client.build_status(&build()).await.unwrap();
        assert_eq!(status.queue_id, Some(QueueId::new(12)));
        assert_eq!(status.duration, 5300);
        assert!(!client.is_building(&build()).await.unwrap());
        assert_eq!(
            client.build_result(&build()).await.unwrap(),
            Some(BuildResult::Failure)
        );
    }

    #[tokio::test]
    async fn test_set_description_posts_form_param() {
        let mock = Arc::new(
            MockTransport::new()
                .on_get(&exact("http://h/crumbIssuer/api/json"))
                .respond_json(200, json!({"crumbRequestField": "Jenkins-Crumb", "crumb": "abc"}))
                .on_post(r"submitDescription")
                .respond_text(200, ""),
        );
        client_with(&mock)
            .set_build_description(&build(), "release 1.2")
            .await
            .unwrap();

        let post = mock
            .requests()
            .into_iter()
            .find(|r| r.method == Method::Post)
            .unwrap();
        assert_eq!(
            post.url,
            "http://h/job/x/5/submitDescription?description=release%201.2"
        );
        assert_eq!(post.headers["Jenkins-Crumb"], "abc");
    }

    #[tokio::test]
    async fn test_control_endpoints() {
        let mock = Arc::new(
            MockTransport::new()
                .on_get(&exact("http://h/crumbIssuer/api/json"))
                .respond_error(404, "Not Found")
                .on_post(r"^http://h/job/x/5/(stop|term|kill|doDelete)$")
                .respond_text(200, ""),
        );
        let client = client_with(&mock);

        client.stop_build(&build()).await.unwrap();
        client.term_build(&build()).await.unwrap();
        client.kill_build(&build()).await.unwrap();
        client.delete_build(&build()).await.unwrap();

        assert_eq!(mock.count_matching(Method::Post, r"/(stop|term|kill|doDelete)$"), 4);
    }
}
