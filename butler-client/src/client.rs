//! Core client implementation.

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::poll::PollPolicy;
use butler_core::Credentials;
use butler_core::transport::{HttpResponse, HttpTransport, Method, Transport, TransportError};
use parking_lot::Mutex;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

const MAX_ERROR_MESSAGE_LEN: usize = 512;

/// CSRF protection token issued by the server.
#[derive(Debug, Clone, Deserialize)]
struct Crumb {
    #[serde(rename = "crumbRequestField")]
    field: String,
    #[serde(rename = "crumb")]
    value: String,
}

#[derive(Debug, Clone)]
enum CrumbState {
    Unknown,
    /// The crumb issuer answered 404: CSRF protection is off.
    Disabled,
    Issued(Crumb),
}

/// A client for the build server's REST API.
///
/// Cloning is cheap; clones share the transport and the CSRF crumb cache.
///
/// The request timeout applies to whichever transport is in use, so
/// [`Client::with_timeout`] and [`Client::with_transport`] may be called in
/// either order.
///
/// # Example
///
/// ```no_run
/// use butler_client::Client;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = Client::new("https://ci.example.com")?
///     .with_api_token("deploy-bot", "11d0c5...")
///     .with_timeout(Duration::from_secs(30))?;
///
/// let queued = client.trigger_build("platform/api", &[]).await?;
/// println!("queued as {}", queued.id());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    /// Server root, always ending in `/`.
    base_url: String,
    transport: Arc<dyn Transport>,
    /// Whether `transport` is the built-in HTTP transport.
    builtin_transport: bool,
    timeout: Option<Duration>,
    credentials: Option<Credentials>,
    crumb: Arc<Mutex<CrumbState>>,
    poll: PollPolicy,
}

impl Client {
    /// Create a new client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Root URL of the server (e.g., "https://ci.example.com/")
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client cannot be created.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ClientError::InvalidUrl(format!(
                "URL must start with http:// or https://, got: {}",
                base_url
            )));
        }

        Ok(Self {
            base_url: with_trailing_slash(&base_url),
            transport: Arc::new(HttpTransport::new()?),
            builtin_transport: true,
            timeout: None,
            credentials: None,
            crumb: Arc::new(Mutex::new(CrumbState::Unknown)),
            poll: PollPolicy::default(),
        })
    }

    /// Create a client from a [`ClientConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if the configured URL is invalid or the HTTP client
    /// cannot be created.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let mut client = Self::new(config.base_url())?
            .with_timeout(config.timeout())?
            .with_poll_policy(config.poll_policy().clone());
        if let Some(credentials) = config.credentials() {
            client = client.with_credentials(credentials.clone());
        }
        Ok(client)
    }

    /// Authenticate every request with `credentials`.
    ///
    /// Crumbs are bound to the session that requested them, so any cached
    /// crumb is discarded.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self.crumb = Arc::new(Mutex::new(CrumbState::Unknown));
        self
    }

    /// Authenticate with a username and API token over basic auth.
    #[must_use]
    pub fn with_api_token(self, username: impl Into<String>, token: impl Into<String>) -> Self {
        self.with_credentials(Credentials::basic(username, token))
    }

    /// Set a custom timeout for all requests.
    ///
    /// The built-in HTTP transport is rebuilt with the new timeout. A
    /// transport injected with [`Client::with_transport`] is kept, and every
    /// request through it is bounded by the timeout instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be rebuilt.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        if self.builtin_transport {
            self.transport = Arc::new(HttpTransport::with_timeout(timeout)?);
        }
        self.timeout = Some(timeout);
        Ok(self)
    }

    /// Route requests through a custom transport.
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self.builtin_transport = false;
        self
    }

    /// Set the policy used by [`Client::wait_for_build_default`].
    #[must_use]
    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Queue polling policy used when the caller does not pass one.
    pub fn poll_policy(&self) -> &PollPolicy {
        &self.poll
    }

    /// Request timeout, if one was set.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Server root URL, ending in `/`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Read the server version from the `X-Jenkins` header of the root page.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn version(&self) -> Result<Option<String>> {
        let response = self.get(&self.base_url, &[]).await?;
        Ok(response.header("X-Jenkins").map(str::to_string))
    }

    /// Build an absolute URL from a path relative to the server root.
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Execute a GET request against an absolute URL.
    pub(crate) async fn get(&self, url: &str, params: &[(&str, &str)]) -> Result<HttpResponse> {
        self.send(Method::Get, url, params, HashMap::new(), None).await
    }

    /// GET a raw document such as `config.xml` and return its body.
    pub(crate) async fn get_text(&self, url: &str) -> Result<String> {
        Ok(self.get(url, &[]).await?.body_string())
    }

    /// Execute a POST request, attaching the CSRF crumb when the server issues one.
    pub(crate) async fn post(&self, url: &str, params: &[(&str, &str)]) -> Result<HttpResponse> {
        self.post_body(url, params, None).await
    }

    /// POST an XML document, as used for `config.xml` and `createItem`.
    pub(crate) async fn post_xml(
        &self,
        url: &str,
        params: &[(&str, &str)],
        xml: &str,
    ) -> Result<HttpResponse> {
        let body = Body {
            content_type: "application/xml",
            bytes: xml.as_bytes().to_vec(),
        };
        self.post_body(url, params, Some(body)).await
    }

    /// POST form fields in the body rather than the query string.
    pub(crate) async fn post_form(&self, url: &str, fields: &[(&str, &str)]) -> Result<HttpResponse> {
        let body = Body {
            content_type: "application/x-www-form-urlencoded",
            bytes: encode_pairs(fields).into_bytes(),
        };
        self.post_body(url, &[], Some(body)).await
    }

    async fn post_body(
        &self,
        url: &str,
        params: &[(&str, &str)],
        body: Option<Body>,
    ) -> Result<HttpResponse> {
        let mut headers = HashMap::new();
        if let Some(crumb) = self.crumb().await? {
            headers.insert(crumb.field, crumb.value);
        }
        self.send(Method::Post, url, params, headers, body).await
    }

    /// GET `<handle>/api/json`, optionally narrowed with a `tree` expression.
    pub(crate) async fn api_json<T: DeserializeOwned>(
        &self,
        handle: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let response = self.get(&join(handle, "api/json"), params).await?;
        Ok(response.json_body()?)
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        params: &[(&str, &str)],
        mut headers: HashMap<String, String>,
        body: Option<Body>,
    ) -> Result<HttpResponse> {
        let url = with_query(url, params);
        headers.insert("Accept".to_string(), "application/json".to_string());
        if let Some(ref credentials) = self.credentials {
            credentials.inject(&mut headers);
        }
        let body = body.map(|body| {
            headers.insert("Content-Type".to_string(), body.content_type.to_string());
            body.bytes
        });

        tracing::debug!(method = %method, url = %url, "Sending request");
        let request = self.transport.request(method, &url, headers, body);
        let response = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, request)
                .await
                .map_err(|_| TransportError::Timeout)??,
            None => request.await?,
        };
        check_status(response)
    }

    async fn crumb(&self) -> Result<Option<Crumb>> {
        let state = self.crumb.lock().clone();
        match state {
            CrumbState::Issued(crumb) => return Ok(Some(crumb)),
            CrumbState::Disabled => return Ok(None),
            CrumbState::Unknown => {}
        }

        let fetched = match self.get(&self.url("crumbIssuer/api/json"), &[]).await {
            Ok(response) => Some(response.json_body::<Crumb>()?),
            Err(err) if err.is_not_found() => None,
            Err(err) => return Err(err),
        };
        tracing::debug!(csrf = fetched.is_some(), "Fetched crumb issuer");

        *self.crumb.lock() = match fetched {
            Some(ref crumb) => CrumbState::Issued(crumb.clone()),
            None => CrumbState::Disabled,
        };
        Ok(fetched)
    }
}

/// Request body with its content type.
struct Body {
    content_type: &'static str,
    bytes: Vec<u8>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Map 4xx/5xx statuses to [`ClientError::Api`].
///
/// 3xx responses pass through: redirects are not followed and callers read
/// the `Location` header themselves.
fn check_status(response: HttpResponse) -> Result<HttpResponse> {
    if response.status < 400 {
        return Ok(response);
    }
    Err(ClientError::Api {
        status: response.status,
        message: error_message(&response),
    })
}

fn error_message(response: &HttpResponse) -> String {
    let body = response.body_string();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|json| {
            json["message"]
                .as_str()
                .or_else(|| json["error"].as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string());

    if message.len() <= MAX_ERROR_MESSAGE_LEN {
        return message;
    }
    let mut end = MAX_ERROR_MESSAGE_LEN;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &message[..end])
}

pub(crate) fn with_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    }
}

/// Append `entry` to a handle, inserting the separating slash if needed.
pub(crate) fn join(handle: &str, entry: &str) -> String {
    format!("{}{}", with_trailing_slash(handle), entry)
}

pub(crate) fn with_query(url: &str, params: &[(&str, &str)]) -> String {
    if params.is_empty() {
        return url.to_string();
    }
    let query = encode_pairs(params);
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}", url, separator, query)
}

fn encode_pairs(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}
