//! Job operations.

use crate::build::Build;
use crate::client::Client;
use crate::error::{ClientError, Result};
use crate::queue::QueueEntry;
use crate::types::{BuildStatus, ExecutableRef, JobInfo};
use butler_core::BuildNumber;
use reqwest::Url;

/// Parameters that do not make a build parameterized.
const RESERVED_PARAMS: [&str; 2] = ["token", "delay"];

/// Permalinks a job keeps to notable builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildSelector {
    /// The oldest retained build.
    First,
    /// The newest build, running or not.
    Last,
    /// The newest finished build.
    LastCompleted,
    /// The newest successful build.
    LastSuccessful,
    /// The newest stable build.
    LastStable,
    /// The newest unstable build.
    LastUnstable,
    /// The newest failed build.
    LastFailed,
    /// The newest build that was not successful.
    LastUnsuccessful,
}

impl BuildSelector {
    fn permalink(self) -> &'static str {
        match self {
            Self::First => "firstBuild",
            Self::Last => "lastBuild",
            Self::LastCompleted => "lastCompletedBuild",
            Self::LastSuccessful => "lastSuccessfulBuild",
            Self::LastStable => "lastStableBuild",
            Self::LastUnstable => "lastUnstableBuild",
            Self::LastFailed => "lastFailedBuild",
            Self::LastUnsuccessful => "lastUnsuccessfulBuild",
        }
    }
}

impl Client {
    /// URL of a job from its full name.
    ///
    /// Folders are separated by `/`: `team/api` maps to
    /// `<base>job/team/job/api/`.
    pub fn job_url(&self, full_name: &str) -> String {
        let path: String = full_name
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| format!("job/{}/", urlencoding::encode(segment)))
            .collect();
        self.url(&path)
    }

    /// Full name of the job at `url`, the inverse of [`Client::job_url`].
    ///
    /// Returns `None` for URLs outside this server or not naming a job.
    pub fn job_name(&self, url: &str) -> Option<String> {
        let path = url.strip_prefix(self.base_url())?;
        let mut segments = path.trim_end_matches('/').split('/');
        let mut names = Vec::new();
        while let Some(segment) = segments.next() {
            if segment != "job" {
                return None;
            }
            let name = segments.next()?;
            names.push(urlencoding::decode(name).ok()?.into_owned());
        }
        if names.is_empty() {
            None
        } else {
            Some(names.join("/"))
        }
    }

    /// Fetch a job.
    ///
    /// # Errors
    ///
    /// Returns a 404 [`ClientError::Api`] if the job does not exist.
    pub async fn get_job(&self, full_name: &str) -> Result<JobInfo> {
        self.api_json(&self.job_url(full_name), &[]).await
    }

    /// Queue a build of a job.
    ///
    /// Parameters other than `token` and `delay` make this a parameterized
    /// build.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, or
    /// [`ClientError::InvalidResponse`] if the server does not say where the
    /// build was queued.
    pub async fn trigger_build(&self, full_name: &str, params: &[(&str, &str)]) -> Result<QueueEntry> {
        let parameterized = params
            .iter()
            .any(|(key, _)| !RESERVED_PARAMS.contains(key));
        let endpoint = if parameterized { "buildWithParameters" } else { "build" };

        let url = format!("{}{}", self.job_url(full_name), endpoint);
        let response = self.post(&url, params).await?;
        let location = response.header("Location").ok_or_else(|| {
            ClientError::InvalidResponse("build trigger returned no Location header".to_string())
        })?;

        let entry = QueueEntry::from_handle(self.absolute_url(location)?)?;
        tracing::info!(job = %full_name, queue_id = %entry.id(), "Build queued");
        Ok(entry)
    }

    /// Builds the server still retains for a job, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the job cannot be fetched.
    pub async fn list_builds(&self, full_name: &str) -> Result<Vec<Build>> {
        self.get_job(full_name)
            .await?
            .builds
            .iter()
            .map(Build::from_executable)
            .collect()
    }

    /// Fetch a build of a job by number.
    ///
    /// # Errors
    ///
    /// Returns a 404 [`ClientError::Api`] if the build does not exist.
    pub async fn get_build(&self, full_name: &str, number: BuildNumber) -> Result<Build> {
        let url = format!("{}{}/", self.job_url(full_name), number.as_u64());
        let status: BuildStatus = self.api_json(&url, &[("tree", "number")]).await?;
        Build::new(url, status.kind)
    }

    /// Follow one of a job's build permalinks.
    ///
    /// Returns `None` if the job has no such build.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails for any reason other than the
    /// permalink being unset.
    pub async fn job_build(&self, full_name: &str, which: BuildSelector) -> Result<Option<Build>> {
        let url = format!("{}{}/", self.job_url(full_name), which.permalink());
        match self
            .api_json::<ExecutableRef>(&url, &[("tree", "url,number")])
            .await
        {
            Ok(executable) => Build::from_executable(&executable).map(Some),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Resolve a `Location` header against the server root.
    pub(crate) fn absolute_url(&self, location: &str) -> Result<String> {
        let base = Url::parse(self.base_url())
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", self.base_url(), e)))?;
        let resolved = base.join(location).map_err(|e| {
            ClientError::InvalidResponse(format!("bad Location header '{}': {}", location, e))
        })?;
        Ok(resolved.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use butler_core::testing::{MockTransport, exact};
    use butler_core::transport::Method;
    use butler_core::{BuildKind, HttpResponse, QueueId};
    use serde_json::json;
    use std::sync::Arc;

    fn client_with(mock: &Arc<MockTransport>) -> Client {
        Client::new("http://h/ci").unwrap().with_transport(mock.clone())
    }

    fn no_crumb() -> MockTransport {
        MockTransport::new()
            .on_get(&exact("http://h/ci/crumbIssuer/api/json"))
            .respond_error(404, "Not Found")
    }

    #[test]
    fn test_job_url_and_name_are_inverse() {
        let client = Client::new("http://h/ci/").unwrap();
        let url = client.job_url("team/my api");
        assert_eq!(url, "http://h/ci/job/team/job/my%20api/");
        assert_eq!(client.job_name(&url).as_deref(), Some("team/my api"));
    }

    #[test]
    fn test_job_name_rejects_foreign_urls() {
        let client = Client::new("http://h/ci/").unwrap();
        assert_eq!(client.job_name("http://other/job/x/"), None);
        assert_eq!(client.job_name("http://h/ci/view/all/"), None);
        assert_eq!(client.job_name("http://h/ci/"), None);
    }

    #[test]
    fn test_absolute_url() {
        let client = Client::new("https://h:8080/ci/").unwrap();
        let resolve = |location: &str| client.absolute_url(location).unwrap();
        assert_eq!(resolve("http://x/queue/item/1/"), "http://x/queue/item/1/");
        assert_eq!(resolve("/ci/queue/item/1/"), "https://h:8080/ci/queue/item/1/");
        assert_eq!(resolve("queue/item/1/"), "https://h:8080/ci/queue/item/1/");
        assert_eq!(resolve("//edge:9000/queue/item/5/"), "https://edge:9000/queue/item/5/");
    }

    #[tokio::test]
    async fn test_trigger_with_protocol_relative_location() {
        let mock = Arc::new(
            no_crumb()
                .on_post(&exact("http://h/ci/job/api/build"))
                .respond(HttpResponse::new(201, "").with_header("Location", "//proxy/ci/queue/item/45/")),
        );
        let entry = client_with(&mock).trigger_build("api", &[]).await.unwrap();
        assert_eq!(entry.url(), "http://proxy/ci/queue/item/45/");
        assert_eq!(entry.id(), QueueId::new(45));
    }

    #[tokio::test]
    async fn test_trigger_without_params_uses_build() {
        let mock = Arc::new(
            no_crumb()
                .on_post(&exact("http://h/ci/job/api/build"))
                .respond(HttpResponse::new(201, "").with_header("Location", "http://h/ci/queue/item/42/")),
        );
        let client = client_with(&mock);

        let entry = client.trigger_build("api", &[]).await.unwrap();
        assert_eq!(entry.id(), QueueId::new(42));
        assert_eq!(entry.url(), "http://h/ci/queue/item/42/");
    }

    #[tokio::test]
    async fn test_trigger_with_params_uses_build_with_parameters() {
        let mock = Arc::new(
            no_crumb()
                .on_post(r"/job/api/buildWithParameters\?")
                .respond(HttpResponse::new(201, "").with_header("Location", "/ci/queue/item/43/")),
        );
        let client = client_with(&mock);

        let entry = client
            .trigger_build("api", &[("BRANCH", "main"), ("delay", "0sec")])
            .await
            .unwrap();
        assert_eq!(entry.url(), "http://h/ci/queue/item/43/");
        assert_eq!(
            mock.count_matching(Method::Post, r"BRANCH=main&delay=0sec$"),
            1
        );
    }

    #[tokio::test]
    async fn test_trigger_with_only_reserved_params_uses_build() {
        let mock = Arc::new(
            no_crumb()
                .on_post(&exact("http://h/ci/job/api/build?delay=5sec"))
                .respond(HttpResponse::new(201, "").with_header("Location", "http://h/ci/queue/item/44/")),
        );
        let client = client_with(&mock);

        client.trigger_build("api", &[("delay", "5sec")]).await.unwrap();
    }

    #[tokio::test]
    async fn test_trigger_without_location_is_invalid_response() {
        let mock = Arc::new(
            no_crumb()
                .on_post(r"/build$")
                .respond_text(201, ""),
        );
        let err = client_with(&mock).trigger_build("api", &[]).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_list_builds() {
        let mock = Arc::new(MockTransport::new().on_get(&exact("http://h/ci/job/api/api/json")).respond_json(
            200,
            json!({
                "_class": "hudson.model.FreeStyleProject",
                "name": "api",
                "url": "http://h/ci/job/api/",
                "builds": [
                    {"_class": "hudson.model.FreeStyleBuild", "number": 2, "url": "http://h/ci/job/api/2/"},
                    {"_class": "hudson.model.FreeStyleBuild", "number": 1, "url": "http://h/ci/job/api/1/"}
                ]
            }),
        ));
        let builds = client_with(&mock).list_builds("api").await.unwrap();

        let numbers: Vec<u64> = builds.iter().map(|b| b.number().as_u64()).collect();
        assert_eq!(numbers, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_get_build_reads_kind() {
        let mock = Arc::new(
            MockTransport::new()
                .on_get(&exact("http://h/ci/job/flow/7/api/json?tree=number"))
                .respond_json(200, json!({"_class": "org.jenkinsci.plugins.workflow.job.WorkflowRun", "number": 7})),
        );
        let build = client_with(&mock)
            .get_build("flow", BuildNumber::new(7))
            .await
            .unwrap();
        assert_eq!(build.kind(), &BuildKind::WorkflowRun);
        assert_eq!(build.url(), "http://h/ci/job/flow/7/");
    }

    #[tokio::test]
    async fn test_job_build_missing_permalink_is_none() {
        let mock = Arc::new(
            MockTransport::new()
                .on_get(r"/lastFailedBuild/api/json")
                .respond_error(404, "Not Found")
                .on_get(r"/lastBuild/api/json")
                .respond_json(200, json!({"_class": "hudson.model.FreeStyleBuild", "number": 9, "url": "http://h/ci/job/api/9/"})),
        );
        let client = client_with(&mock);

        assert!(client.job_build("api", BuildSelector::LastFailed).await.unwrap().is_none());
        let last = client.job_build("api", BuildSelector::Last).await.unwrap().unwrap();
        assert_eq!(last.number(), BuildNumber::new(9));
    }
}
