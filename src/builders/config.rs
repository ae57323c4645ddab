//! Configuration Builder
//!
//! Fluent builder for client configuration.

use std::time::Duration;
use url::Url;

use crate::error::{ApiError, ConfigurationError};
use crate::types::{ClientConfig, SessionEndpoints, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};

/// Environment variable holding the API base address.
pub const BASE_URL_ENV: &str = "RECORDS_API_BASE_URL";

/// Environment variable holding the request timeout in seconds.
pub const TIMEOUT_ENV: &str = "RECORDS_API_TIMEOUT_SECS";

/// Client configuration builder.
pub struct ClientConfigBuilder {
    base_url: Option<String>,
    endpoints: SessionEndpoints,
    timeout: Duration,
    teardown_on_transport_error: bool,
    max_response_size: Option<usize>,
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientConfigBuilder {
    /// Create new configuration builder.
    pub fn new() -> Self {
        Self {
            base_url: None,
            endpoints: SessionEndpoints::default(),
            timeout: DEFAULT_TIMEOUT,
            teardown_on_transport_error: true,
            max_response_size: None,
        }
    }

    /// Seed a builder from the process environment.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let mut builder = Self::new();

        if let Some(base_url) = lookup(BASE_URL_ENV) {
            builder = builder.base_url(base_url);
        }

        if let Some(raw) = lookup(TIMEOUT_ENV) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                ApiError::Configuration(ConfigurationError::Environment {
                    message: format!(
                        "{} must be a whole number of seconds, got {:?}",
                        TIMEOUT_ENV, raw
                    ),
                })
            })?;
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(builder)
    }

    /// Set base address.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set login endpoint path.
    pub fn login_endpoint(mut self, path: impl Into<String>) -> Self {
        self.endpoints.login = path.into();
        self
    }

    /// Set refresh endpoint path.
    pub fn refresh_endpoint(mut self, path: impl Into<String>) -> Self {
        self.endpoints.refresh = path.into();
        self
    }

    /// Set token verification endpoint path.
    pub fn verify_endpoint(mut self, path: impl Into<String>) -> Self {
        self.endpoints.verify = path.into();
        self
    }

    /// Set logout endpoint path.
    pub fn logout_endpoint(mut self, path: impl Into<String>) -> Self {
        self.endpoints.logout = path.into();
        self
    }

    /// Set profile endpoint path.
    pub fn profile_endpoint(mut self, path: impl Into<String>) -> Self {
        self.endpoints.profile = path.into();
        self
    }

    /// Set request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Choose whether transport failures during a refresh end the session.
    pub fn teardown_on_transport_error(mut self, enable: bool) -> Self {
        self.teardown_on_transport_error = enable;
        self
    }

    /// Set maximum accepted response body size.
    pub fn max_response_size(mut self, size: usize) -> Self {
        self.max_response_size = Some(size);
        self
    }

    /// Build the client configuration.
    pub fn build(self) -> Result<ClientConfig, ApiError> {
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let parsed = Url::parse(&base_url).map_err(|_| {
            ApiError::Configuration(ConfigurationError::InvalidBaseUrl {
                url: base_url.clone(),
            })
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::Configuration(ConfigurationError::InvalidBaseUrl {
                url: base_url,
            }));
        }

        if self.endpoints.refresh.trim().is_empty() {
            return Err(ApiError::Configuration(ConfigurationError::MissingRequired {
                field: "refresh_endpoint".to_string(),
            }));
        }

        if self.timeout.is_zero() {
            return Err(ApiError::Configuration(ConfigurationError::InvalidConfig {
                message: "timeout must be greater than zero".to_string(),
            }));
        }

        let defaults = ClientConfig::default();

        Ok(ClientConfig {
            base_url,
            endpoints: self.endpoints,
            timeout: self.timeout,
            teardown_on_transport_error: self.teardown_on_transport_error,
            max_response_size: self.max_response_size.unwrap_or(defaults.max_response_size),
        })
    }
}

impl ClientConfig {
    /// Create a configuration from `RECORDS_API_BASE_URL` and
    /// `RECORDS_API_TIMEOUT_SECS`, falling back to defaults.
    pub fn from_env() -> Result<Self, ApiError> {
        ClientConfigBuilder::from_env()?.build()
    }
}

/// Create a new client configuration builder.
pub fn client_config() -> ClientConfigBuilder {
    ClientConfigBuilder::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_builder_defaults() {
        let config = ClientConfigBuilder::new().build().unwrap();

        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.endpoints.refresh, "/instauth/token/refresh/");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert!(config.teardown_on_transport_error);
    }

    #[test]
    fn test_builder_custom_endpoints() {
        let config = client_config()
            .base_url("https://records.example.com/api")
            .refresh_endpoint("/auth/refresh/")
            .login_endpoint("/auth/login/")
            .timeout(Duration::from_secs(5))
            .teardown_on_transport_error(false)
            .build()
            .unwrap();

        assert_eq!(
            config.refresh_url(),
            "https://records.example.com/api/auth/refresh/"
        );
        assert_eq!(config.endpoints.login, "/auth/login/");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(!config.teardown_on_transport_error);
    }

    #[test]
    fn test_builder_rejects_invalid_base_url() {
        assert!(client_config().base_url("not a url").build().is_err());
        assert!(client_config().base_url("ftp://example.com").build().is_err());
    }

    #[test]
    fn test_builder_rejects_empty_refresh_endpoint() {
        let result = client_config().refresh_endpoint("  ").build();
        assert!(matches!(
            result,
            Err(ApiError::Configuration(ConfigurationError::MissingRequired { .. }))
        ));
    }

    #[test]
    fn test_from_lookup() {
        let env: HashMap<&str, &str> = [
            (BASE_URL_ENV, "https://tesc.example.ac.zw/api"),
            (TIMEOUT_ENV, "12"),
        ]
        .into_iter()
        .collect();

        let config = ClientConfigBuilder::from_lookup(|k| env.get(k).map(|v| v.to_string()))
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(config.base_url, "https://tesc.example.ac.zw/api");
        assert_eq!(config.timeout, Duration::from_secs(12));
    }

    #[test]
    fn test_from_lookup_bad_timeout() {
        let result = ClientConfigBuilder::from_lookup(|k| {
            (k == TIMEOUT_ENV).then(|| "soon".to_string())
        });
        assert!(matches!(
            result,
            Err(ApiError::Configuration(ConfigurationError::Environment { .. }))
        ));
    }
}
