//! Token refresh through a real HTTP stack

use super::*;
use futures::future::join_all;
use records_api_client::session::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use records_api_client::{ApiError, FileCredentialStore, SessionError};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

async fn seeded_store(access: &str, refresh: Option<&str>) -> InMemoryCredentialStore {
    let store = InMemoryCredentialStore::new();
    store.set(ACCESS_TOKEN_KEY, access).await.unwrap();
    if let Some(refresh) = refresh {
        store.set(REFRESH_TOKEN_KEY, refresh).await.unwrap();
    }
    store
}

#[tokio::test]
async fn test_concurrent_expiry_triggers_one_refresh() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/students/"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(token_not_valid().set_delay(Duration::from_millis(200)))
        .expect(8)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/instauth/token/refresh/"))
        .and(body_json(json!({"refresh": "R1"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access": "A2"}))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/students/"))
        .and(header("authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(8)
        .mount(&server)
        .await;

    let (client, ended) = client_for(&server, seeded_store("A1", Some("R1")).await);

    let results = join_all((0..8).map(|_| client.get("/students/"))).await;

    for result in results {
        let response = result.expect("call succeeds after refresh");
        assert_eq!(response.status, 200);
    }
    assert_eq!(
        client.store().access_token().await.unwrap().as_deref(),
        Some("A2")
    );
    assert_eq!(
        client.store().refresh_token().await.unwrap().as_deref(),
        Some("R1")
    );
    assert_eq!(ended.count(), 0);
}

#[tokio::test]
async fn test_late_rejection_joins_refresh_in_flight() {
    let server = setup_mock_server().await;

    // /students/ is rejected at once and leads the refresh; /staff/ is
    // rejected while the exchange is still on the wire.
    Mock::given(method("GET"))
        .and(path("/students/"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(token_not_valid())
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/staff/"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(token_not_valid().set_delay(Duration::from_millis(150)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/instauth/token/refresh/"))
        .and(body_json(json!({"refresh": "R1"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access": "A2"}))
                .set_delay(Duration::from_millis(400)),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(header("authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = FileCredentialStore::new(dir.path().join("credentials.json"));
    store.set(ACCESS_TOKEN_KEY, "A1").await.unwrap();
    store.set(REFRESH_TOKEN_KEY, "R1").await.unwrap();
    let (client, ended) = client_for(&server, store);

    let (students, staff) = tokio::join!(client.get("/students/"), client.get("/staff/"));

    assert_eq!(students.unwrap().status, 200);
    assert_eq!(staff.unwrap().status, 200);
    assert_eq!(
        client.store().access_token().await.unwrap().as_deref(),
        Some("A2")
    );
    assert_eq!(ended.count(), 0);
}

#[tokio::test]
async fn test_rotated_refresh_token_is_persisted() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/instauth/profile/"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(token_not_valid())
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/instauth/token/refresh/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access": "A2", "refresh": "R2"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/instauth/profile/"))
        .and(header("authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "registrar"})))
        .mount(&server)
        .await;

    let (client, _) = client_for(&server, seeded_store("A1", Some("R1")).await);

    let profile = client.profile().await.unwrap();

    assert_eq!(profile["username"], "registrar");
    assert_eq!(
        client.store().refresh_token().await.unwrap().as_deref(),
        Some("R2")
    );
}

#[tokio::test]
async fn test_rejected_refresh_ends_session_once() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/students/"))
        .respond_with(token_not_valid().set_delay(Duration::from_millis(100)))
        .expect(4)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/instauth/token/refresh/"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"detail": "Token is blacklisted", "code": "token_not_valid"}))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (client, ended) = client_for(&server, seeded_store("A1", Some("R1")).await);

    let results = join_all((0..4).map(|_| client.get("/students/"))).await;

    for result in results {
        let error = result.unwrap_err();
        assert!(error.session_ended(), "unexpected error: {error}");
    }
    assert!(!client.is_authenticated().await.unwrap());
    assert!(client.store().refresh_token().await.unwrap().is_none());
    assert_eq!(ended.reasons(), vec![SessionEndReason::RefreshRejected]);
}

#[tokio::test]
async fn test_missing_refresh_token_skips_exchange() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/students/"))
        .respond_with(token_not_valid())
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/instauth/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "A2"})))
        .expect(0)
        .mount(&server)
        .await;

    let (client, ended) = client_for(&server, seeded_store("A1", None).await);

    let error = client.get("/students/").await.unwrap_err();

    assert!(matches!(
        error,
        ApiError::Session(SessionError::NoRefreshToken)
    ));
    assert!(!client.is_authenticated().await.unwrap());
    assert_eq!(ended.reasons(), vec![SessionEndReason::NoRefreshToken]);
}

#[tokio::test]
async fn test_replayed_call_rejected_again_is_returned() {
    let server = setup_mock_server().await;

    Mock::given(method("GET"))
        .and(path("/reports/"))
        .respond_with(token_not_valid())
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/instauth/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "A2"})))
        .expect(1)
        .mount(&server)
        .await;

    let (client, ended) = client_for(&server, seeded_store("A1", Some("R1")).await);

    let error = client.get("/reports/").await.unwrap_err();

    assert!(error.is_unauthorized());
    assert!(!error.session_ended());
    assert_eq!(ended.count(), 0);
}
