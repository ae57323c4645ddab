//! Refresh Coordinator
//!
//! Single-flight access token refresh. The first caller to hit an expired
//! token leads the exchange; callers arriving while it is in flight wait on a
//! oneshot channel and are settled, in arrival order, with the same outcome.
//!
//! A caller's role is decided under the state lock before anything is awaited,
//! so a rejection that lands while an exchange is in flight always queues
//! behind it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::core::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use crate::error::{ApiError, SessionError};
use crate::session::augmenter::RequestAugmenter;
use crate::session::call::TrackedCall;
use crate::session::classifier::ResponseClassifier;
use crate::session::storage::{CredentialStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use crate::session::teardown::{SessionEndReason, SessionTeardown};
use crate::telemetry::SessionMetrics;
use crate::types::{ClientConfig, RefreshRequest, RefreshResponse};

type RefreshOutcome = Result<String, ApiError>;

/// Refresh state. `Refreshing` owns the queue of waiting callers.
enum RefreshState {
    /// `renewed` is the access token the last settled refresh produced.
    Idle { renewed: Option<String> },
    Refreshing {
        waiters: Vec<oneshot::Sender<RefreshOutcome>>,
    },
}

/// What a caller does after inspecting the state.
enum Role {
    /// Run the exchange.
    Leader,
    /// Wait for the leader's outcome.
    Waiter(oneshot::Receiver<RefreshOutcome>),
    /// The token was already refreshed after this call went out.
    Stale(String),
}

/// Token a leader hands to its call.
struct Renewal {
    token: String,
    stale: bool,
}

/// Coordinates token refresh across concurrent callers.
pub struct RefreshCoordinator<T: HttpTransport, S: CredentialStore> {
    config: Arc<ClientConfig>,
    transport: Arc<T>,
    store: Arc<S>,
    classifier: ResponseClassifier,
    teardown: Arc<SessionTeardown<S>>,
    metrics: Arc<dyn SessionMetrics>,
    state: Mutex<RefreshState>,
}

impl<T: HttpTransport, S: CredentialStore> RefreshCoordinator<T, S> {
    /// Create new coordinator.
    pub fn new(
        config: Arc<ClientConfig>,
        transport: Arc<T>,
        store: Arc<S>,
        teardown: Arc<SessionTeardown<S>>,
        metrics: Arc<dyn SessionMetrics>,
    ) -> Self {
        Self {
            classifier: ResponseClassifier::new(config.clone()),
            config,
            transport,
            store,
            teardown,
            metrics,
            state: Mutex::new(RefreshState::Idle { renewed: None }),
        }
    }

    /// Whether a refresh exchange is in flight.
    pub fn is_refreshing(&self) -> bool {
        matches!(*self.lock_state(), RefreshState::Refreshing { .. })
    }

    /// Forget the token of the last refresh. Called when a session starts or
    /// ends so calls of the new session never replay with an old token.
    pub fn reset(&self) {
        if let RefreshState::Idle { renewed } = &mut *self.lock_state() {
            *renewed = None;
        }
    }

    /// Recover a call rejected with an expired access token: refresh (or wait
    /// for the refresh in flight) and replay the call once.
    pub async fn handle_auth_expired(&self, mut call: TrackedCall) -> Result<HttpResponse, ApiError> {
        call.mark_retried();

        let role = {
            let mut state = self.lock_state();
            match &mut *state {
                RefreshState::Refreshing { waiters } => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    Role::Waiter(rx)
                }
                RefreshState::Idle {
                    renewed: Some(renewed),
                } if call.sent_with() != Some(renewed.as_str()) => Role::Stale(renewed.clone()),
                RefreshState::Idle { .. } => {
                    *state = RefreshState::Refreshing {
                        waiters: Vec::new(),
                    };
                    Role::Leader
                }
            }
        };

        let renewal = match role {
            Role::Leader => self.lead_refresh(call.sent_with()).await?,
            Role::Waiter(rx) => {
                self.metrics.record_queued_caller();
                debug!(url = %call.request().url, "waiting for in-flight token refresh");
                let outcome = rx
                    .await
                    .unwrap_or(Err(ApiError::Session(SessionError::RefreshAbandoned)));
                Renewal {
                    token: outcome?,
                    stale: false,
                }
            }
            Role::Stale(token) => Renewal { token, stale: true },
        };

        self.replay(call, renewal).await
    }

    /// Run one renewal while `Refreshing`, end the session if it failed for
    /// good, then settle every waiter.
    async fn lead_refresh(&self, sent_with: Option<&str>) -> Result<Renewal, ApiError> {
        let mut guard = SettleOnDrop {
            coordinator: self,
            armed: true,
        };

        let result = self.renew(sent_with).await;

        if let Err(error) = &result {
            if error.session_ended() {
                let reason = match error {
                    ApiError::Session(SessionError::NoRefreshToken) => {
                        SessionEndReason::NoRefreshToken
                    }
                    _ => SessionEndReason::RefreshRejected,
                };
                // Still `Refreshing` here: anyone arriving during teardown
                // queues and receives this failure.
                self.teardown.run(reason).await;
            }
        }

        guard.armed = false;
        let outcome = match &result {
            Ok(renewal) => Ok(renewal.token.clone()),
            Err(error) => Err(error.clone()),
        };
        self.settle(&outcome);
        result
    }

    /// Obtain a usable access token: the stored one if it already differs
    /// from the rejected one, otherwise a new one from the refresh exchange.
    async fn renew(&self, sent_with: Option<&str>) -> Result<Renewal, ApiError> {
        let Some(refresh_token) = self.store.refresh_token().await? else {
            info!("access token expired and no refresh token stored");
            return Err(ApiError::Session(SessionError::NoRefreshToken));
        };

        if let Some(current) = self.store.access_token().await? {
            if sent_with != Some(current.as_str()) {
                debug!("stored access token is newer than the rejected one");
                return Ok(Renewal {
                    token: current,
                    stale: true,
                });
            }
        }

        self.metrics.record_refresh_exchange();
        info!(url = %self.config.refresh_url(), "refreshing access token");

        let outcome = match self.exchange(&refresh_token).await {
            Ok(token) => Ok(token),
            Err(error) => Err(self.refresh_failure(error)),
        };
        self.metrics.record_refresh_outcome(outcome.is_ok());

        match &outcome {
            Ok(_) => info!("access token refreshed"),
            Err(error) if error.session_ended() => warn!(
                error = %error,
                code = error.error_code(),
                "token refresh failed, ending session"
            ),
            Err(error) => warn!(
                error = %error,
                code = error.error_code(),
                "token refresh failed, keeping session"
            ),
        }

        outcome.map(|token| Renewal {
            token,
            stale: false,
        })
    }

    /// Send the refresh exchange and persist the new token.
    async fn exchange(&self, refresh_token: &str) -> RefreshOutcome {
        let body = serde_json::to_value(RefreshRequest {
            refresh: refresh_token,
        })
        .map_err(|e| {
            ApiError::Session(SessionError::RefreshExchangeFailed {
                status: None,
                message: e.to_string(),
            })
        })?;

        let mut request = HttpRequest::new(HttpMethod::Post, self.config.refresh_url());
        request.set_json_body(&body);
        request.set_header("accept", "application/json");
        request.timeout = Some(self.config.timeout);

        let call = TrackedCall::new(request);
        let outcome = self.transport.send(call.request().clone()).await;
        let response = self.classifier.classify(call, outcome).into_result()?;

        let refreshed: RefreshResponse = response.json()?;
        self.store.set(ACCESS_TOKEN_KEY, &refreshed.access).await?;
        if let Some(rotated) = &refreshed.refresh {
            self.store.set(REFRESH_TOKEN_KEY, rotated).await?;
        }

        Ok(refreshed.access)
    }

    /// Map an exchange error onto what callers see.
    fn refresh_failure(&self, error: ApiError) -> ApiError {
        match error {
            ApiError::Session(_) => error,
            ApiError::Network(_) if !self.config.teardown_on_transport_error => error,
            other => ApiError::Session(SessionError::RefreshExchangeFailed {
                status: other.status(),
                message: other.to_string(),
            }),
        }
    }

    /// Return to `Idle` and hand the outcome to every waiter, oldest first.
    fn settle(&self, outcome: &RefreshOutcome) {
        let renewed = outcome.as_ref().ok().cloned();
        let previous = std::mem::replace(&mut *self.lock_state(), RefreshState::Idle { renewed });
        let waiters = match previous {
            RefreshState::Refreshing { waiters } => waiters,
            RefreshState::Idle { .. } => Vec::new(),
        };

        debug!(waiters = waiters.len(), success = outcome.is_ok(), "settling token refresh");

        for waiter in waiters {
            // A dropped receiver means that caller gave up; nothing to deliver.
            let _ = waiter.send(outcome.clone());
        }
    }

    /// Re-issue a call once with a fresh token.
    async fn replay(&self, mut call: TrackedCall, renewal: Renewal) -> Result<HttpResponse, ApiError> {
        RequestAugmenter::<S>::apply(&mut call, Some(renewal.token));
        self.metrics.record_replay(renewal.stale);
        debug!(
            method = %call.request().method,
            url = %call.request().url,
            stale = renewal.stale,
            "replaying call with refreshed token"
        );

        let outcome = self.transport.send(call.request().clone()).await;
        self.classifier.classify(call, outcome).into_result()
    }

    fn lock_state(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Settles waiters if the leader's future is dropped mid-exchange.
struct SettleOnDrop<'a, T: HttpTransport, S: CredentialStore> {
    coordinator: &'a RefreshCoordinator<T, S>,
    armed: bool,
}

impl<T: HttpTransport, S: CredentialStore> Drop for SettleOnDrop<'_, T, S> {
    fn drop(&mut self) {
        if self.armed {
            warn!("token refresh abandoned by its leader");
            self.coordinator
                .settle(&Err(ApiError::Session(SessionError::RefreshAbandoned)));
        }
    }
}
