//! Scriptable transport for tests.

use crate::transport::{HttpResponse, Method, Transport, TransportError, TransportFuture};
use parking_lot::RwLock;
use regex::Regex;
use std::collections::HashMap;
use std::time::Duration;

/// Build an anchored pattern that matches `url` literally.
pub fn exact(url: &str) -> String {
    format!("^{}$", regex::escape(url))
}

/// A request seen by the mock.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: Method,
    /// Request URL.
    pub url: String,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// Request body.
    pub body: Vec<u8>,
}

/// A rule for matching and responding to requests.
#[derive(Clone)]
pub struct MockRule {
    /// Method to match (None = any method).
    pub method: Option<Method>,
    /// URL pattern (regex).
    pub url_pattern: Regex,
    /// Response to return.
    pub response: HttpResponse,
    /// Simulated latency.
    pub latency: Option<Duration>,
    /// Number of times this rule should match (None = unlimited).
    pub times: Option<usize>,
    matched_count: usize,
}

impl MockRule {
    /// Create a new rule matching any method.
    ///
    /// # Panics
    ///
    /// Panics if `url_pattern` is not a valid regex.
    pub fn new(url_pattern: &str, response: HttpResponse) -> Self {
        Self {
            method: None,
            url_pattern: Regex::new(url_pattern).expect("Invalid URL regex pattern"),
            response,
            latency: None,
            times: None,
            matched_count: 0,
        }
    }

    /// Set the method to match.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Set the number of times this rule should match.
    pub fn times(mut self, n: usize) -> Self {
        self.times = Some(n);
        self
    }

    fn matches(&self, method: Method, url: &str) -> bool {
        if let Some(expected) = self.method
            && expected != method
        {
            return false;
        }
        if let Some(limit) = self.times
            && self.matched_count >= limit
        {
            return false;
        }
        self.url_pattern.is_match(url)
    }
}

impl std::fmt::Debug for MockRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockRule")
            .field("method", &self.method)
            .field("url_pattern", &self.url_pattern.as_str())
            .field("response_status", &self.response.status)
            .field("times", &self.times)
            .field("matched_count", &self.matched_count)
            .finish()
    }
}

/// Mock transport.
///
/// Rules are tried in insertion order and the first one that still has
/// matches left wins. Adding several `times(1)` rules for the same URL
/// therefore scripts a sequence of responses.
pub struct MockTransport {
    rules: RwLock<Vec<MockRule>>,
    requests: RwLock<Vec<RecordedRequest>>,
}

impl MockTransport {
    /// Create a mock with no rules.
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(Vec::new()),
            requests: RwLock::new(Vec::new()),
        }
    }

    /// Add a rule.
    pub fn rule(self, rule: MockRule) -> Self {
        self.rules.write().push(rule);
        self
    }

    /// Start defining a GET rule.
    pub fn on_get(self, url_pattern: &str) -> MockRuleBuilder {
        MockRuleBuilder::new(self, Some(Method::Get), url_pattern)
    }

    /// Start defining a POST rule.
    pub fn on_post(self, url_pattern: &str) -> MockRuleBuilder {
        MockRuleBuilder::new(self, Some(Method::Post), url_pattern)
    }

    /// Start defining a rule matching any method.
    pub fn on_any(self, url_pattern: &str) -> MockRuleBuilder {
        MockRuleBuilder::new(self, None, url_pattern)
    }

    /// Get all recorded requests.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.read().clone()
    }

    /// Get the number of requests made.
    pub fn request_count(&self) -> usize {
        self.requests.read().len()
    }

    /// Count recorded requests whose URL matches `url_pattern`.
    ///
    /// # Panics
    ///
    /// Panics if `url_pattern` is not a valid regex.
    pub fn count_matching(&self, method: Method, url_pattern: &str) -> usize {
        let re = Regex::new(url_pattern).expect("Invalid URL pattern");
        self.requests
            .read()
            .iter()
            .filter(|r| r.method == method && re.is_match(&r.url))
            .count()
    }

    /// Clear recorded requests.
    pub fn clear_requests(&self) {
        self.requests.write().clear();
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn request(
        &self,
        method: Method,
        url: &str,
        headers: HashMap<String, String>,
        body: Option<Vec<u8>>,
    ) -> TransportFuture<'_> {
        self.requests.write().push(RecordedRequest {
            method,
            url: url.to_string(),
            headers,
            body: body.unwrap_or_default(),
        });

        let mut rules = self.rules.write();
        match rules.iter_mut().find(|rule| rule.matches(method, url)) {
            Some(rule) => {
                rule.matched_count += 1;
                let response = rule.response.clone();
                let latency = rule.latency;
                Box::pin(async move {
                    if let Some(delay) = latency {
                        tokio::time::sleep(delay).await;
                    }
                    Ok(response)
                })
            }
            None => {
                let method = method.to_string();
                let url = url.to_string();
                Box::pin(async move { Err(TransportError::NoMockMatch { method, url }) })
            }
        }
    }
}

/// Builder for fluent rule creation.
pub struct MockRuleBuilder {
    mock: MockTransport,
    method: Option<Method>,
    url_pattern: String,
    latency: Option<Duration>,
    times: Option<usize>,
}

impl MockRuleBuilder {
    fn new(mock: MockTransport, method: Option<Method>, url_pattern: &str) -> Self {
        Self {
            mock,
            method,
            url_pattern: url_pattern.to_string(),
            latency: None,
            times: None,
        }
    }

    /// Set simulated latency.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Set the number of times this rule should match.
    pub fn times(mut self, n: usize) -> Self {
        self.times = Some(n);
        self
    }

    /// Match exactly once.
    pub fn once(self) -> Self {
        self.times(1)
    }

    /// Set the response to return.
    pub fn respond(self, response: HttpResponse) -> MockTransport {
        let mut rule = MockRule::new(&self.url_pattern, response);
        rule.method = self.method;
        rule.latency = self.latency;
        rule.times = self.times;
        self.mock.rule(rule)
    }

    /// Respond with JSON.
    pub fn respond_json(self, status: u16, value: serde_json::Value) -> MockTransport {
        self.respond(HttpResponse::json(status, &value))
    }

    /// Respond with plain text.
    pub fn respond_text(self, status: u16, text: &str) -> MockTransport {
        self.respond(
            HttpResponse::new(status, text.as_bytes().to_vec())
                .with_header("content-type", "text/plain"),
        )
    }

    /// Respond with an error status.
    pub fn respond_error(self, status: u16, message: &str) -> MockTransport {
        self.respond_text(status, message)
    }
}
