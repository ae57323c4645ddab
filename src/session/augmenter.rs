//! Request Augmenter
//!
//! Attaches the current access token to outgoing calls.

use std::sync::Arc;

use crate::error::ApiError;
use crate::session::call::TrackedCall;
use crate::session::storage::CredentialStore;
use crate::types::bearer_header;

/// Header carrying the bearer credential.
pub const AUTHORIZATION_HEADER: &str = "authorization";

/// Reads the access token from the store and sets the bearer header.
pub struct RequestAugmenter<S: CredentialStore> {
    store: Arc<S>,
}

impl<S: CredentialStore> Clone for RequestAugmenter<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: CredentialStore> RequestAugmenter<S> {
    /// Create augmenter over a credential store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Attach the stored access token. Without one the call goes out
    /// unauthenticated.
    pub async fn augment(&self, call: &mut TrackedCall) -> Result<(), ApiError> {
        let token = self.store.access_token().await?;
        Self::apply(call, token);
        Ok(())
    }

    /// Attach a specific token, e.g. the one a refresh just produced.
    pub fn apply(call: &mut TrackedCall, token: Option<String>) {
        if let Some(token) = &token {
            call.request_mut()
                .set_header(AUTHORIZATION_HEADER, bearer_header(token));
        }
        call.set_sent_with(token);
    }
}
