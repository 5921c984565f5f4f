//! reqwest-backed transport.

use super::{HttpResponse, Method, Transport, TransportError, TransportFuture};
use reqwest::redirect::Policy;
use std::collections::HashMap;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport that makes real network requests.
///
/// Redirects are not followed: trigger and rename endpoints answer with a
/// `Location` header that the client reads itself.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport with the default 30 second timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be created.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a transport with a custom per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be created.
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|e| TransportError::Other(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http, timeout })
    }

    /// Get the configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Transport for HttpTransport {
    fn request(
        &self,
        method: Method,
        url: &str,
        headers: HashMap<String, String>,
        body: Option<Vec<u8>>,
    ) -> TransportFuture<'_> {
        let url = url.to_string();

        Box::pin(async move {
            let mut builder = match method {
                Method::Get => self.http.get(&url),
                Method::Post => self.http.post(&url),
            };
            for (key, value) in headers {
                builder = builder.header(key, value);
            }
            if let Some(body) = body {
                builder = builder.body(body);
            }

            let response = builder.send().await.map_err(map_reqwest_error)?;
            let status = response.status().as_u16();

            let mut response_headers = HashMap::new();
            for (name, value) in response.headers() {
                if let Ok(value_str) = value.to_str() {
                    response_headers.insert(name.as_str().to_string(), value_str.to_string());
                }
            }

            let body = response
                .bytes()
                .await
                .map_err(map_reqwest_error)?
                .to_vec();

            Ok(HttpResponse {
                status,
                headers: response_headers,
                body,
            })
        })
    }
}

fn map_reqwest_error(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_connect() {
        TransportError::ConnectionFailed(error.to_string())
    } else if error.is_builder() {
        TransportError::InvalidRequest(error.to_string())
    } else {
        TransportError::Other(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeout_is_thirty_seconds() {
        let transport = HttpTransport::new().unwrap();
        assert_eq!(transport.timeout(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn invalid_url_is_reported_not_panicked() {
        let transport = HttpTransport::new().unwrap();
        let result = transport
            .request(Method::Get, "not a url", HashMap::new(), None)
            .await;
        assert!(result.is_err());
    }
}
