//! API Client Error Types
//!
//! Error hierarchy for the authenticated client. Every variant is `Clone` so a
//! single refresh outcome can be handed to every caller waiting on it.

use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Root error type for the API client.
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Non-2xx response from the remote API.
    #[error("HTTP {status}: {}", summarize_payload(.payload))]
    Response {
        status: u16,
        payload: serde_json::Value,
    },
}

impl ApiError {
    /// Get error code for telemetry.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "API_CONFIG",
            Self::Network(_) => "API_NETWORK",
            Self::Protocol(_) => "API_PROTOCOL",
            Self::Storage(_) => "API_STORAGE",
            Self::Session(_) => "API_SESSION",
            Self::Response { .. } => "API_RESPONSE",
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Response { status, .. } => Some(*status),
            Self::Session(SessionError::RefreshExchangeFailed { status, .. }) => *status,
            _ => None,
        }
    }

    /// True when the session was ended and the user must sign in again.
    pub fn session_ended(&self) -> bool {
        matches!(
            self,
            Self::Session(SessionError::NoRefreshToken)
                | Self::Session(SessionError::RefreshExchangeFailed { .. })
        )
    }

    /// Validation failure (field-level messages in the payload).
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Response { status: 400 | 422, .. })
    }

    /// Authorization failure ("access denied").
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Response { status: 403, .. })
    }

    /// Authentication rejection (invalid or expired bearer token).
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Response { status: 401, .. })
    }

    /// Field-level validation messages, keyed by field name.
    ///
    /// Understands `{"field": ["msg", ...]}` and `{"field": "msg"}` payloads.
    pub fn field_errors(&self) -> HashMap<String, Vec<String>> {
        let mut fields = HashMap::new();
        let Self::Response { payload, .. } = self else {
            return fields;
        };
        let Some(object) = payload.as_object() else {
            return fields;
        };

        for (field, value) in object {
            let messages: Vec<String> = match value {
                serde_json::Value::String(s) => vec![s.clone()],
                serde_json::Value::Array(items) => items
                    .iter()
                    .filter_map(|item| item.as_str().map(String::from))
                    .collect(),
                _ => continue,
            };
            if !messages.is_empty() {
                fields.insert(field.clone(), messages);
            }
        }

        fields
    }
}

/// Configuration error.
#[derive(Error, Debug, Clone)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Missing required field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid base URL: {url}")]
    InvalidBaseUrl { url: String },

    #[error("Environment error: {message}")]
    Environment { message: String },
}

/// Network/transport error.
#[derive(Error, Debug, Clone)]
pub enum NetworkError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Request timeout after {timeout:?}")]
    Timeout { timeout: Duration },
}

/// Protocol/response parsing error.
#[derive(Error, Debug, Clone)]
pub enum ProtocolError {
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Response too large: {size} bytes")]
    ResponseTooLarge { size: usize },

    #[error("Invalid JSON: {message}")]
    InvalidJson { message: String },
}

/// Credential storage error.
#[derive(Error, Debug, Clone)]
pub enum StorageError {
    #[error("Read failed: {message}")]
    ReadFailed { message: String },

    #[error("Write failed: {message}")]
    WriteFailed { message: String },

    #[error("Corrupted data: {message}")]
    CorruptedData { message: String },
}

/// Session failures. `NoRefreshToken` and `RefreshExchangeFailed` end the session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("No refresh token available")]
    NoRefreshToken,

    #[error("Token refresh failed: {message}")]
    RefreshExchangeFailed {
        status: Option<u16>,
        message: String,
    },

    /// The caller driving the refresh went away before it settled.
    #[error("Token refresh abandoned before completion")]
    RefreshAbandoned,
}

/// Result type for API client operations.
pub type ApiResult<T> = Result<T, ApiError>;

fn summarize_payload(payload: &serde_json::Value) -> String {
    if let Some(detail) = payload.get("detail").and_then(|d| d.as_str()) {
        return detail.to_string();
    }
    match payload {
        serde_json::Value::Null => "no body".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Create error from HTTP response.
///
/// JSON bodies are kept as-is; anything else is wrapped as a JSON string.
pub fn create_error_from_response(status: u16, body: &str) -> ApiError {
    let payload = if body.trim().is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_str(body).unwrap_or_else(|_| serde_json::Value::String(body.to_string()))
    };

    ApiError::Response { status, payload }
}

/// Get user-friendly error message.
pub fn get_user_message(error: &ApiError) -> String {
    match error {
        ApiError::Session(SessionError::NoRefreshToken)
        | ApiError::Session(SessionError::RefreshExchangeFailed { .. }) => {
            "Your session has expired. Please sign in again.".to_string()
        }
        ApiError::Response { status: 403, .. } => {
            "Access denied. You do not have permission to perform this action.".to_string()
        }
        ApiError::Response { status: 400 | 422, .. } => {
            "Some fields are invalid. Please review the form and try again.".to_string()
        }
        ApiError::Response { status: 404, .. } => "The requested record was not found.".to_string(),
        ApiError::Response { status, .. } if *status >= 500 => {
            "The server encountered an error. Please try again later.".to_string()
        }
        ApiError::Network(NetworkError::Timeout { .. }) => {
            "The request timed out. Please check your connection and try again.".to_string()
        }
        ApiError::Network(_) => {
            "Unable to reach the server. Please check your connection.".to_string()
        }
        _ => "An unexpected error occurred. Please try again.".to_string(),
    }
}
