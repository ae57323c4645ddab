//! Session Teardown
//!
//! Clears the credential store and tells the host application the session is
//! over. Runs at most once per session; `rearm` starts a new one.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::session::storage::CredentialStore;
use crate::telemetry::SessionMetrics;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEndReason {
    /// An access token expired and no refresh token was stored.
    NoRefreshToken,
    /// The refresh exchange was rejected or could not complete.
    RefreshRejected,
    /// The user signed out.
    LoggedOut,
}

impl SessionEndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoRefreshToken => "no_refresh_token",
            Self::RefreshRejected => "refresh_rejected",
            Self::LoggedOut => "logged_out",
        }
    }
}

impl std::fmt::Display for SessionEndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unauthenticated-state signal delivered to the host.
#[derive(Debug, Clone)]
pub struct SessionEnded {
    pub reason: SessionEndReason,
    pub at: DateTime<Utc>,
}

/// Host hook invoked when a session ends (e.g. navigate to the login view).
#[cfg_attr(test, mockall::automock)]
pub trait SessionListener: Send + Sync {
    fn on_session_ended(&self, event: &SessionEnded);
}

impl<F> SessionListener for F
where
    F: Fn(&SessionEnded) + Send + Sync,
{
    fn on_session_ended(&self, event: &SessionEnded) {
        self(event)
    }
}

/// Listener that ignores every event.
pub struct NoOpSessionListener;

impl SessionListener for NoOpSessionListener {
    fn on_session_ended(&self, _event: &SessionEnded) {}
}

/// Idempotent session teardown.
pub struct SessionTeardown<S: CredentialStore> {
    store: Arc<S>,
    listener: Arc<dyn SessionListener>,
    metrics: Arc<dyn SessionMetrics>,
    started: AtomicBool,
}

impl<S: CredentialStore> SessionTeardown<S> {
    /// Create a teardown armed for the current session.
    pub fn new(
        store: Arc<S>,
        listener: Arc<dyn SessionListener>,
        metrics: Arc<dyn SessionMetrics>,
    ) -> Self {
        Self {
            store,
            listener,
            metrics,
            started: AtomicBool::new(false),
        }
    }

    /// End the session. Returns `true` for the invocation that did the work;
    /// every other invocation until `rearm` is a no-op returning `false`.
    ///
    /// Never fails: a store that cannot be cleared is logged and the host is
    /// still signalled.
    pub async fn run(&self, reason: SessionEndReason) -> bool {
        if self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(%reason, "session teardown already started");
            return false;
        }

        warn!(%reason, "ending session");

        if let Err(e) = self.store.clear().await {
            error!(%reason, error = %e, "failed to clear credential store");
        }

        self.metrics.record_teardown(reason.as_str());
        self.listener.on_session_ended(&SessionEnded {
            reason,
            at: Utc::now(),
        });

        true
    }

    /// Start a new session after a successful login.
    pub fn rearm(&self) {
        self.started.store(false, Ordering::Release);
    }

    /// Whether the current session has been torn down.
    pub fn has_ended(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }
}
