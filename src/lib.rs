//! Records API Client
//!
//! Authenticated HTTP client for the records dashboard API with bearer-token
//! sessions that renew themselves.
//!
//! # Features
//!
//! - Bearer access token attached to every call
//! - Single-flight refresh: one refresh exchange no matter how many calls
//!   hit an expired token at once
//! - Queued callers replayed in arrival order with the renewed token
//! - Rotated refresh tokens persisted
//! - Idempotent session teardown with a host notification hook
//! - Login, logout, token verification and profile lookup
//!
//! # Example
//!
//! ```rust,ignore
//! use records_api_client::{client_config, ApiClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = client_config()
//!         .base_url("https://records.example.ac.zw/api")
//!         .build()?;
//!
//!     let client = ApiClient::new(config)?;
//!     client.login("registrar", "s3cret").await?;
//!
//!     // An expired access token is refreshed transparently.
//!     let students = client.get("/students/").await?;
//!     println!("{}", students.body);
//!
//!     client.logout().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `types`: configuration and credential types
//! - `error`: error hierarchy and response-to-error mapping
//! - `core`: HTTP transport
//! - `session`: credential storage, request augmentation, response
//!   classification, refresh coordination and teardown
//! - `telemetry`: session metrics
//! - `builders`: fluent configuration builder
//! - `client`: high-level client tying the session pipeline together

pub mod builders;
pub mod client;
pub mod core;
pub mod error;
pub mod session;
pub mod telemetry;
pub mod types;

// Re-export main client
pub use client::{api_client, ApiClient, CallOptions};

// Re-export builders
pub use builders::{client_config, ClientConfigBuilder, BASE_URL_ENV, TIMEOUT_ENV};

// Re-export errors
pub use error::{
    create_error_from_response, get_user_message, ApiError, ApiResult, ConfigurationError,
    NetworkError, ProtocolError, SessionError, StorageError,
};

// Re-export types
pub use types::{
    // Config
    ClientConfig, SessionEndpoints, DEFAULT_BASE_URL, DEFAULT_TIMEOUT,
    // Token
    bearer_header, Credential, LoginRequest, LoginResponse, RefreshRequest, RefreshResponse,
};

// Re-export core components
pub use crate::core::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, MockHttpTransport, ReqwestHttpTransport,
};

// Re-export session components
pub use session::{
    // Storage
    CredentialStore, FileCredentialStore, InMemoryCredentialStore, MockCredentialStore,
    // Pipeline
    Classification, RefreshCoordinator, RequestAugmenter, ResponseClassifier, TrackedCall,
    // Teardown
    NoOpSessionListener, SessionEndReason, SessionEnded, SessionListener, SessionTeardown,
};

// Re-export telemetry
pub use telemetry::{InMemoryMetrics, NoOpMetrics, SessionMetrics};
