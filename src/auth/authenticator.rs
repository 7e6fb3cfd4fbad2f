//! Upstream Authentication Module
//!
//! The seam between the credential store and the login endpoint, plus the
//! reqwest-backed implementation.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::QueryError;

// == Issued Token ==
/// What the login endpoint handed back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub access_token: String,
    /// Lifetime advertised by the upstream, if any
    pub expires_in: Option<Duration>,
}

// == Authenticator ==
/// Performs one outbound login call. Implementations never retry.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self) -> Result<IssuedToken, QueryError>;
}

// == Credentials ==
/// Fixed, process-wide login body.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub grant_type: String,
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("grant_type", &self.grant_type)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

// == HTTP Authenticator ==
/// Logs in with `POST <auth-url>` and a JSON credential body.
#[derive(Debug, Clone)]
pub struct HttpAuthenticator {
    http: reqwest::Client,
    url: String,
    credentials: Credentials,
}

impl HttpAuthenticator {
    /// Builds the authenticator with its own bounded request timeout.
    pub fn new(url: impl Into<String>, credentials: Credentials, timeout: Duration) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.into(),
            credentials,
        })
    }
}

#[async_trait]
impl Authenticator for HttpAuthenticator {
    async fn authenticate(&self) -> Result<IssuedToken, QueryError> {
        let response = self
            .http
            .post(&self.url)
            .json(&self.credentials)
            .send()
            .await
            .map_err(|e| {
                warn!("Login request failed: {}", e);
                QueryError::AuthenticationFailed(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Login endpoint returned {}", status);
            return Err(QueryError::AuthenticationFailed(format!(
                "login endpoint returned {}",
                status
            )));
        }

        let login: LoginResponse = response.json().await.map_err(|e| {
            QueryError::AuthenticationFailed(format!("malformed login response: {}", e))
        })?;

        if login.access_token.is_empty() {
            return Err(QueryError::AuthenticationFailed(
                "login response carried an empty access_token".to_string(),
            ));
        }

        Ok(IssuedToken {
            access_token: login.access_token,
            expires_in: login.expires_in.map(Duration::from_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_serialize_as_login_body() {
        let credentials = Credentials {
            username: "api".into(),
            password: "secret".into(),
            grant_type: "password".into(),
            client_id: "null".into(),
            client_secret: "null".into(),
        };

        let json = serde_json::to_value(&credentials).unwrap();
        assert_eq!(json["username"], "api");
        assert_eq!(json["password"], "secret");
        assert_eq!(json["grant_type"], "password");
        assert_eq!(json["client_id"], "null");
        assert_eq!(json["client_secret"], "null");
    }

    #[test]
    fn test_credentials_debug_hides_secrets() {
        let credentials = Credentials {
            username: "api".into(),
            password: "hunter2".into(),
            grant_type: "password".into(),
            client_id: "null".into(),
            client_secret: "s3cr3t".into(),
        };

        let rendered = format!("{:?}", credentials);
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("s3cr3t"));
    }

    #[test]
    fn test_login_response_expires_in_is_optional() {
        let login: LoginResponse = serde_json::from_str(r#"{"access_token":"t"}"#).unwrap();
        assert_eq!(login.expires_in, None);

        let login: LoginResponse =
            serde_json::from_str(r#"{"access_token":"t","expires_in":3600,"token_type":"bearer"}"#)
                .unwrap();
        assert_eq!(login.expires_in, Some(3600));
    }
}
