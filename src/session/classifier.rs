//! Response Classifier
//!
//! Decides what a completed call means for the session.

use std::sync::Arc;

use crate::core::HttpResponse;
use crate::error::{create_error_from_response, ApiError};
use crate::session::call::TrackedCall;
use crate::types::ClientConfig;

/// Status code signalling an invalid or expired access token.
pub const AUTH_REJECTED_STATUS: u16 = 401;

/// Outcome of a completed call.
#[derive(Debug)]
pub enum Classification {
    /// 2xx response.
    Success(HttpResponse),
    /// Anything not related to token expiry; passed to the caller unchanged.
    OrdinaryFailure(ApiError),
    /// First authentication rejection of an ordinary call. Recoverable.
    AuthExpired { call: TrackedCall, error: ApiError },
    /// The refresh exchange itself was rejected. Ends the session.
    RefreshExchangeFailed(ApiError),
}

impl Classification {
    /// Collapse into the caller-visible result without any recovery.
    pub fn into_result(self) -> Result<HttpResponse, ApiError> {
        match self {
            Self::Success(response) => Ok(response),
            Self::OrdinaryFailure(error)
            | Self::AuthExpired { error, .. }
            | Self::RefreshExchangeFailed(error) => Err(error),
        }
    }
}

/// Classifies call outcomes.
#[derive(Clone)]
pub struct ResponseClassifier {
    config: Arc<ClientConfig>,
}

impl ResponseClassifier {
    /// Create classifier for a client configuration.
    pub fn new(config: Arc<ClientConfig>) -> Self {
        Self { config }
    }

    /// Whether the call targets the refresh endpoint.
    pub fn is_refresh_exchange(&self, call: &TrackedCall) -> bool {
        self.config.is_refresh_url(&call.request().url)
    }

    /// Classify a completed call.
    pub fn classify(
        &self,
        call: TrackedCall,
        outcome: Result<HttpResponse, ApiError>,
    ) -> Classification {
        let response = match outcome {
            Ok(response) => response,
            Err(error) if self.is_refresh_exchange(&call) => {
                return Classification::RefreshExchangeFailed(error)
            }
            Err(error) => return Classification::OrdinaryFailure(error),
        };

        if response.is_success() {
            return Classification::Success(response);
        }

        let error = create_error_from_response(response.status, &response.body);

        if self.is_refresh_exchange(&call) {
            return Classification::RefreshExchangeFailed(error);
        }

        if response.status == AUTH_REJECTED_STATUS && !call.retried() {
            return Classification::AuthExpired { call, error };
        }

        Classification::OrdinaryFailure(error)
    }
}
