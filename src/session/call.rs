//! Tracked Call
//!
//! One logical API call as it moves through augmentation, classification and
//! at most one replay.

use crate::core::HttpRequest;

/// A request plus the bookkeeping the refresh protocol needs.
#[derive(Clone)]
pub struct TrackedCall {
    request: HttpRequest,
    retried: bool,
    sent_with: Option<String>,
}

impl TrackedCall {
    /// Wrap a request that has not been sent yet.
    pub fn new(request: HttpRequest) -> Self {
        Self {
            request,
            retried: false,
            sent_with: None,
        }
    }

    /// The underlying request.
    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    /// Mutable access for header augmentation.
    pub fn request_mut(&mut self) -> &mut HttpRequest {
        &mut self.request
    }

    /// Whether this call has already been replayed once.
    pub fn retried(&self) -> bool {
        self.retried
    }

    /// Mark the call as replayed. There is no way back.
    pub fn mark_retried(&mut self) {
        self.retried = true;
    }

    /// Access token the call was last sent with.
    pub fn sent_with(&self) -> Option<&str> {
        self.sent_with.as_deref()
    }

    pub(crate) fn set_sent_with(&mut self, token: Option<String>) {
        self.sent_with = token;
    }
}

impl std::fmt::Debug for TrackedCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedCall")
            .field("method", &self.request.method)
            .field("url", &self.request.url)
            .field("retried", &self.retried)
            .field("authenticated", &self.sent_with.is_some())
            .finish()
    }
}
