//! Token Types
//!
//! Bearer credential and the wire payloads of the login and refresh endpoints.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Access/refresh token pair for one signed-in session.
#[derive(Clone)]
pub struct Credential {
    access_token: SecretString,
    refresh_token: SecretString,
}

impl Credential {
    /// Create new credential pair.
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::new(access_token.into()),
            refresh_token: SecretString::new(refresh_token.into()),
        }
    }

    /// Access token value.
    pub fn access_token(&self) -> &str {
        self.access_token.expose_secret()
    }

    /// Refresh token value.
    pub fn refresh_token(&self) -> &str {
        self.refresh_token.expose_secret()
    }

    /// Format the access token as an Authorization header value.
    pub fn authorization_header(&self) -> String {
        bearer_header(self.access_token())
    }
}

impl From<LoginResponse> for Credential {
    fn from(response: LoginResponse) -> Self {
        Self::new(response.access, response.refresh)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Format a bearer Authorization header value.
pub fn bearer_header(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Login request body.
#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Login response: the initial credential pair.
#[derive(Clone, Deserialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
}

/// Refresh exchange request body.
#[derive(Clone, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

/// Refresh exchange response. The server may rotate the refresh token.
#[derive(Clone, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential::new("A1", "R1");
        let debug = format!("{:?}", credential);
        assert!(!debug.contains("A1"));
        assert!(!debug.contains("R1"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_authorization_header() {
        let credential = Credential::new("A1", "R1");
        assert_eq!(credential.authorization_header(), "Bearer A1");
        assert_eq!(credential.refresh_token(), "R1");
    }

    #[test]
    fn test_refresh_response_without_rotation() {
        let response: RefreshResponse = serde_json::from_str(r#"{"access":"A2"}"#).unwrap();
        assert_eq!(response.access, "A2");
        assert!(response.refresh.is_none());

        let rotated: RefreshResponse =
            serde_json::from_str(r#"{"access":"A2","refresh":"R2"}"#).unwrap();
        assert_eq!(rotated.refresh.as_deref(), Some("R2"));
    }

    #[test]
    fn test_login_response_into_credential() {
        let response: LoginResponse =
            serde_json::from_str(r#"{"access":"A1","refresh":"R1"}"#).unwrap();
        let credential = Credential::from(response);
        assert_eq!(credential.access_token(), "A1");
        assert_eq!(credential.refresh_token(), "R1");
    }
}
