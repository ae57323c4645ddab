//! API Client
//!
//! Authenticated client used by the dashboard's feature code. Expired access
//! tokens are refreshed behind the caller's back; callers only ever see a
//! response, an ordinary failure, or the end of the session.

use serde_json::json;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::core::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, ReqwestHttpTransport};
use crate::error::{create_error_from_response, ApiError, ProtocolError, SessionError};
use crate::session::{
    Classification, CredentialStore, FileCredentialStore, InMemoryCredentialStore,
    NoOpSessionListener, RefreshCoordinator, RequestAugmenter, ResponseClassifier,
    SessionEndReason, SessionListener, SessionTeardown, TrackedCall, AUTH_REJECTED_STATUS,
};
use crate::telemetry::{NoOpMetrics, SessionMetrics};
use crate::types::{ClientConfig, Credential, LoginRequest, LoginResponse};

/// Per-call options.
#[derive(Clone, Debug, Default)]
pub struct CallOptions {
    /// Extra request headers.
    pub headers: HashMap<String, String>,
    /// Overrides the configured timeout.
    pub timeout: Option<Duration>,
}

impl CallOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the timeout for this call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Authenticated API client.
pub struct ApiClient<
    T: HttpTransport = ReqwestHttpTransport,
    S: CredentialStore = InMemoryCredentialStore,
> {
    config: Arc<ClientConfig>,
    transport: Arc<T>,
    store: Arc<S>,
    augmenter: RequestAugmenter<S>,
    classifier: ResponseClassifier,
    coordinator: RefreshCoordinator<T, S>,
    teardown: Arc<SessionTeardown<S>>,
}

impl ApiClient<ReqwestHttpTransport, InMemoryCredentialStore> {
    /// Create a client with the reqwest transport and in-memory credentials.
    ///
    /// Credentials are lost when the process exits; use
    /// [`ApiClient::with_credential_file`] to keep the session across restarts.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let transport = ReqwestHttpTransport::with_options(config.timeout, config.max_response_size)?;

        Ok(Self::with_components(
            config,
            transport,
            InMemoryCredentialStore::new(),
            Arc::new(NoOpSessionListener),
            Arc::new(NoOpMetrics),
        ))
    }
}

impl ApiClient<ReqwestHttpTransport, FileCredentialStore> {
    /// Create a client whose credentials persist in a JSON file at `path`.
    pub fn with_credential_file(
        config: ClientConfig,
        path: impl Into<PathBuf>,
    ) -> Result<Self, ApiError> {
        let transport = ReqwestHttpTransport::with_options(config.timeout, config.max_response_size)?;

        Ok(Self::with_components(
            config,
            transport,
            FileCredentialStore::new(path),
            Arc::new(NoOpSessionListener),
            Arc::new(NoOpMetrics),
        ))
    }
}

impl<T: HttpTransport, S: CredentialStore> ApiClient<T, S> {
    /// Create a client with custom implementations.
    pub fn with_components(
        config: ClientConfig,
        transport: T,
        store: S,
        listener: Arc<dyn SessionListener>,
        metrics: Arc<dyn SessionMetrics>,
    ) -> Self {
        let config = Arc::new(config);
        let transport = Arc::new(transport);
        let store = Arc::new(store);
        let teardown = Arc::new(SessionTeardown::new(
            store.clone(),
            listener,
            metrics.clone(),
        ));
        let coordinator = RefreshCoordinator::new(
            config.clone(),
            transport.clone(),
            store.clone(),
            teardown.clone(),
            metrics,
        );

        Self {
            augmenter: RequestAugmenter::new(store.clone()),
            classifier: ResponseClassifier::new(config.clone()),
            config,
            transport,
            store,
            coordinator,
            teardown,
        }
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the transport.
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Get the credential store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Get the refresh coordinator.
    pub fn coordinator(&self) -> &RefreshCoordinator<T, S> {
        &self.coordinator
    }

    // ========== Calls ==========

    /// Make an authenticated call.
    ///
    /// An expired access token is refreshed and the call replayed once; the
    /// caller sees the replay's result. If the session cannot be renewed the
    /// error is an `ApiError::Session` and the session listener has fired.
    pub async fn call(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<serde_json::Value>,
        options: Option<CallOptions>,
    ) -> Result<HttpResponse, ApiError> {
        let mut call = TrackedCall::new(self.build_request(method, path, body, options));
        self.augmenter.augment(&mut call).await?;

        debug!(method = %method, url = %call.request().url, "sending request");
        let outcome = self.transport.send(call.request().clone()).await;

        match self.classifier.classify(call, outcome) {
            Classification::Success(response) => Ok(response),
            Classification::OrdinaryFailure(error) => Err(error),
            Classification::AuthExpired { call, .. } => {
                debug!(url = %call.request().url, "access token rejected");
                self.coordinator.handle_auth_expired(call).await
            }
            Classification::RefreshExchangeFailed(error) => {
                self.teardown.run(SessionEndReason::RefreshRejected).await;
                self.coordinator.reset();
                Err(ApiError::Session(SessionError::RefreshExchangeFailed {
                    status: error.status(),
                    message: error.to_string(),
                }))
            }
        }
    }

    /// GET a path.
    pub async fn get(&self, path: &str) -> Result<HttpResponse, ApiError> {
        self.call(HttpMethod::Get, path, None, None).await
    }

    /// POST a JSON body.
    pub async fn post(&self, path: &str, body: serde_json::Value) -> Result<HttpResponse, ApiError> {
        self.call(HttpMethod::Post, path, Some(body), None).await
    }

    /// PUT a JSON body.
    pub async fn put(&self, path: &str, body: serde_json::Value) -> Result<HttpResponse, ApiError> {
        self.call(HttpMethod::Put, path, Some(body), None).await
    }

    /// PATCH a JSON body.
    pub async fn patch(&self, path: &str, body: serde_json::Value) -> Result<HttpResponse, ApiError> {
        self.call(HttpMethod::Patch, path, Some(body), None).await
    }

    /// DELETE a path.
    pub async fn delete(&self, path: &str) -> Result<HttpResponse, ApiError> {
        self.call(HttpMethod::Delete, path, None, None).await
    }

    fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<serde_json::Value>,
        options: Option<CallOptions>,
    ) -> HttpRequest {
        let options = options.unwrap_or_default();

        let mut request = HttpRequest::new(method, self.config.url_for(path));
        request.set_header("accept", "application/json");
        if let Some(body) = &body {
            request.set_json_body(body);
        }
        for (name, value) in &options.headers {
            request.set_header(name, value.as_str());
        }
        request.timeout = Some(options.timeout.unwrap_or(self.config.timeout));

        request
    }

    /// Send a session request directly, bypassing token handling.
    async fn send_unauthenticated(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<HttpResponse, ApiError> {
        let request = self.build_request(HttpMethod::Post, path, Some(body), None);
        let response = self.transport.send(request).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(create_error_from_response(response.status, &response.body))
        }
    }

    // ========== Session ==========

    /// Sign in and store the issued credential pair.
    ///
    /// Bad credentials come back as `ApiError::Response`; they never trigger a
    /// refresh.
    pub async fn login(&self, username: &str, password: &str) -> Result<Credential, ApiError> {
        let body = serde_json::to_value(LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        })
        .map_err(|e| ProtocolError::InvalidJson {
            message: e.to_string(),
        })?;

        let response = self
            .send_unauthenticated(&self.config.endpoints.login, body)
            .await?;
        let credential = Credential::from(response.json::<LoginResponse>()?);

        self.set_credential(&credential).await?;
        info!(username, "signed in");
        Ok(credential)
    }

    /// Install a credential pair obtained elsewhere and start a new session.
    pub async fn set_credential(&self, credential: &Credential) -> Result<(), ApiError> {
        self.store.save(credential).await?;
        self.coordinator.reset();
        self.teardown.rearm();
        Ok(())
    }

    /// Whether an access token is stored.
    pub async fn is_authenticated(&self) -> Result<bool, ApiError> {
        Ok(self.store.access_token().await?.is_some())
    }

    /// Ask the server whether the stored access token is still valid.
    pub async fn verify_token(&self) -> Result<bool, ApiError> {
        let Some(token) = self.store.access_token().await? else {
            return Ok(false);
        };

        match self
            .send_unauthenticated(&self.config.endpoints.verify, json!({ "token": token }))
            .await
        {
            Ok(_) => Ok(true),
            Err(error) if error.status() == Some(AUTH_REJECTED_STATUS) => Ok(false),
            Err(error) => Err(error),
        }
    }

    /// Fetch the signed-in user's profile.
    pub async fn profile(&self) -> Result<serde_json::Value, ApiError> {
        self.get(&self.config.endpoints.profile).await?.json()
    }

    /// Sign out: blacklist the refresh token server-side when possible, then
    /// end the session locally whatever the server said.
    pub async fn logout(&self) -> Result<(), ApiError> {
        match self.store.refresh_token().await {
            Ok(Some(refresh)) => {
                let logout = self
                    .post(&self.config.endpoints.logout, json!({ "refresh": refresh }))
                    .await;
                if let Err(error) = logout {
                    warn!(error = %error, "server-side logout failed, clearing session anyway");
                }
            }
            Ok(None) => debug!("no refresh token to revoke"),
            Err(error) => warn!(error = %error, "could not read refresh token for logout"),
        }

        self.teardown.run(SessionEndReason::LoggedOut).await;
        self.coordinator.reset();
        Ok(())
    }
}

/// Create a client with default components and in-memory credentials.
pub fn api_client(config: ClientConfig) -> Result<ApiClient, ApiError> {
    ApiClient::new(config)
}
