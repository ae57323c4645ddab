//! Configuration Types
//!
//! Client configuration: base address, session endpoints and timeouts.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default API base address.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// API client configuration.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base address every relative path is joined onto.
    pub base_url: String,
    /// Session endpoint paths.
    pub endpoints: SessionEndpoints,
    /// Timeout applied to every call, refresh exchanges included.
    pub timeout: Duration,
    /// Treat transport failures (timeout, connection, DNS) during a refresh
    /// exchange as irrecoverable and tear the session down.
    pub teardown_on_transport_error: bool,
    /// Maximum accepted response body size in bytes.
    pub max_response_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            endpoints: SessionEndpoints::default(),
            timeout: DEFAULT_TIMEOUT,
            teardown_on_transport_error: true,
            max_response_size: 10 * 1024 * 1024,
        }
    }
}

impl ClientConfig {
    /// Resolve a path against the base address. Absolute URLs pass through.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Full URL of the refresh endpoint.
    pub fn refresh_url(&self) -> String {
        self.url_for(&self.endpoints.refresh)
    }

    /// Whether a URL designates the refresh endpoint.
    pub fn is_refresh_url(&self, url: &str) -> bool {
        url.trim_end_matches('/') == self.refresh_url().trim_end_matches('/')
    }
}

/// Session endpoint paths, relative to the base address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEndpoints {
    /// Issues the initial credential pair.
    pub login: String,
    /// Exchanges a refresh token for a new access token.
    pub refresh: String,
    /// Validates an access token.
    pub verify: String,
    /// Blacklists a refresh token server-side.
    pub logout: String,
    /// Returns the signed-in user's profile.
    pub profile: String,
}

impl Default for SessionEndpoints {
    fn default() -> Self {
        Self {
            login: "/instauth/login/".to_string(),
            refresh: "/instauth/token/refresh/".to_string(),
            verify: "/instauth/token/verify/".to_string(),
            logout: "/instauth/logout/".to_string(),
            profile: "/instauth/profile/".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_joins_slashes() {
        let config = ClientConfig {
            base_url: "https://records.example.com/api/".to_string(),
            ..Default::default()
        };

        assert_eq!(
            config.url_for("/students/"),
            "https://records.example.com/api/students/"
        );
        assert_eq!(
            config.url_for("staff/12/"),
            "https://records.example.com/api/staff/12/"
        );
        assert_eq!(
            config.url_for("https://other.example.com/x"),
            "https://other.example.com/x"
        );
    }

    #[test]
    fn test_is_refresh_url() {
        let config = ClientConfig::default();

        assert!(config.is_refresh_url("http://127.0.0.1:8000/api/instauth/token/refresh/"));
        assert!(config.is_refresh_url("http://127.0.0.1:8000/api/instauth/token/refresh"));
        assert!(!config.is_refresh_url("http://127.0.0.1:8000/api/instauth/login/"));
    }
}
