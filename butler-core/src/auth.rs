//! Credentials injected into outgoing requests.

use base64::Engine;
use std::collections::HashMap;
use std::fmt;

/// Authentication material for the build server.
///
/// The server accepts a username with either the account password or an
/// API token over basic auth. Bearer tokens are supported for servers that
/// sit behind an authenticating proxy.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Basic authentication (username:password or username:api-token).
    BasicAuth {
        /// Account name.
        username: String,
        /// Password or API token.
        password: String,
    },
    /// Bearer token authentication.
    BearerToken(String),
}

impl Credentials {
    /// Basic auth credentials.
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::BasicAuth {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Value of the `Authorization` header for these credentials.
    pub fn header_value(&self) -> String {
        match self {
            Self::BasicAuth { username, password } => {
                let encoded = base64::engine::general_purpose::STANDARD
                    .encode(format!("{}:{}", username, password));
                format!("Basic {}", encoded)
            }
            Self::BearerToken(token) => format!("Bearer {}", token),
        }
    }

    /// Insert the `Authorization` header into a header map.
    pub fn inject(&self, headers: &mut HashMap<String, String>) {
        headers.insert("Authorization".to_string(), self.header_value());
        tracing::trace!("Injected authorization header");
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BasicAuth { username, .. } => f
                .debug_struct("BasicAuth")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::BearerToken(_) => f.debug_tuple("BearerToken").field(&"<redacted>").finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_auth_header() {
        let creds = Credentials::basic("admin", "secret");
        assert_eq!(creds.header_value(), "Basic YWRtaW46c2VjcmV0");
    }

    #[test]
    fn bearer_header() {
        let creds = Credentials::BearerToken("abc".to_string());
        assert_eq!(creds.header_value(), "Bearer abc");
    }

    #[test]
    fn debug_redacts_secrets() {
        let creds = Credentials::basic("admin", "secret");
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn inject_sets_authorization() {
        let mut headers = HashMap::new();
        Credentials::basic("a", "b").inject(&mut headers);
        assert!(headers["Authorization"].starts_with("Basic "));
    }
}
