//! Login, verification and logout

use super::*;
use records_api_client::{ApiError, Credential, CredentialStore};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_login_then_authenticated_call() {
    let server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/instauth/login/"))
        .and(body_json(json!({"username": "registrar", "password": "s3cret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "A1", "refresh": "R1"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/institutions/"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 3}])))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _) = client_for(&server, InMemoryCredentialStore::new());

    let credential = client.login("registrar", "s3cret").await.unwrap();
    assert_eq!(credential.refresh_token(), "R1");

    let response = client.get("/institutions/").await.unwrap();
    let institutions: serde_json::Value = response.json().unwrap();
    assert_eq!(institutions[0]["id"], 3);
}

#[tokio::test]
async fn test_login_rejected() {
    let server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/instauth/login/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "No active account found with the given credentials"
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/instauth/token/refresh/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (client, ended) = client_for(&server, InMemoryCredentialStore::new());

    let error = client.login("registrar", "wrong").await.unwrap_err();

    assert!(matches!(error, ApiError::Response { status: 401, .. }));
    assert!(!client.is_authenticated().await.unwrap());
    assert_eq!(ended.count(), 0);
}

#[tokio::test]
async fn test_verify_token() {
    let server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/instauth/token/verify/"))
        .and(body_json(json!({"token": "A1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let (client, _) = client_for(&server, InMemoryCredentialStore::new());
    client
        .set_credential(&Credential::new("A1", "R1"))
        .await
        .unwrap();

    assert!(client.verify_token().await.unwrap());
}

#[tokio::test]
async fn test_logout_revokes_and_clears() {
    let server = setup_mock_server().await;

    Mock::given(method("POST"))
        .and(path("/instauth/logout/"))
        .and(header("authorization", "Bearer A1"))
        .and(body_json(json!({"refresh": "R1"})))
        .respond_with(ResponseTemplate::new(205))
        .expect(1)
        .mount(&server)
        .await;

    let (client, ended) = client_for(&server, InMemoryCredentialStore::new());
    client
        .set_credential(&Credential::new("A1", "R1"))
        .await
        .unwrap();

    client.logout().await.unwrap();

    assert!(client.store().load().await.unwrap().is_none());
    assert_eq!(ended.reasons(), vec![SessionEndReason::LoggedOut]);
}
