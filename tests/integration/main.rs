//! Integration tests using WireMock
//!
//! Drive the client through the reqwest transport against a mock server:
//! bearer attachment, refresh coordination, teardown and the session
//! endpoints.

mod refresh;
mod session;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use records_api_client::{
    client_config, ApiClient, CredentialStore, InMemoryCredentialStore, NoOpMetrics,
    ReqwestHttpTransport, SessionEndReason, SessionEnded,
};
use wiremock::{MockServer, ResponseTemplate};

/// Records every session end the client reports.
#[derive(Clone, Default)]
pub struct EndedLog {
    reasons: Arc<Mutex<Vec<SessionEndReason>>>,
    calls: Arc<AtomicUsize>,
}

impl EndedLog {
    pub fn reasons(&self) -> Vec<SessionEndReason> {
        self.reasons.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Client pointed at the mock server, with a session-end log.
pub fn client_for<S: CredentialStore>(
    server: &MockServer,
    store: S,
) -> (ApiClient<ReqwestHttpTransport, S>, EndedLog) {
    let config = client_config()
        .base_url(server.uri())
        .build()
        .expect("valid config");
    let transport = ReqwestHttpTransport::with_options(config.timeout, config.max_response_size)
        .expect("transport");

    let log = EndedLog::default();
    let sink = log.clone();
    let client = ApiClient::with_components(
        config,
        transport,
        store,
        Arc::new(move |event: &SessionEnded| {
            sink.calls.fetch_add(1, Ordering::SeqCst);
            sink.reasons.lock().unwrap().push(event.reason);
        }),
        Arc::new(NoOpMetrics),
    );

    (client, log)
}

pub fn token_not_valid() -> ResponseTemplate {
    ResponseTemplate::new(401).set_body_json(serde_json::json!({
        "detail": "Given token not valid for any token type",
        "code": "token_not_valid"
    }))
}
