//! Session Management
//!
//! Keeps a bearer-token session alive across concurrent calls.
//!
//! - **Storage**: durable access/refresh token storage
//! - **Augmenter**: attaches the access token to outgoing calls
//! - **Classifier**: success, ordinary failure, expired token, rejected refresh
//! - **Coordinator**: single-flight refresh with a FIFO waiter queue
//! - **Teardown**: idempotent session end and host notification

pub mod augmenter;
pub mod call;
pub mod classifier;
pub mod coordinator;
pub mod storage;
pub mod teardown;

pub use augmenter::{RequestAugmenter, AUTHORIZATION_HEADER};
pub use call::TrackedCall;
pub use classifier::{Classification, ResponseClassifier, AUTH_REJECTED_STATUS};
pub use coordinator::RefreshCoordinator;
pub use storage::{
    create_in_memory_credential_store, create_mock_credential_store, CredentialStore,
    FileCredentialStore, InMemoryCredentialStore, MockCredentialStore, ACCESS_TOKEN_KEY,
    REFRESH_TOKEN_KEY,
};
pub use teardown::{
    NoOpSessionListener, SessionEndReason, SessionEnded, SessionListener, SessionTeardown,
};
