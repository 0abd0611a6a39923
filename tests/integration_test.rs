// Integration tests for Wiki Gateway
//
// These tests drive the full request pipeline against a mock API server:
// credential attachment, refresh-on-401, retry bookkeeping and the typed API calls.

use mockito::{Matcher, Server};
use serde_json::json;
use std::sync::Arc;

use wiki_gateway::{
    api,
    auth::{
        AuthManager, CredentialPair, CredentialStore, MemoryCredentialStore, Session,
        SessionEvent, ACCESS_TOKEN_KEY,
    },
    error::GatewayError,
    http_client::{ApiRequest, GatewayClient},
    models::auth::SignInRequest,
    models::profile::{EditStatus, ProfileQuery},
};

// ==================================================================================================
// Test Helpers
// ==================================================================================================

/// Create a gateway against `base_url` with an optional stored credential pair
fn create_gateway(base_url: &str, pair: Option<(&str, &str)>) -> GatewayClient {
    let gateway = create_gateway_with_store(base_url, Arc::new(MemoryCredentialStore::new()));
    let session = gateway.auth().session();
    if let Some((access, refresh)) = pair {
        session
            .begin(&CredentialPair {
                access_token: access.to_string(),
                refresh_token: refresh.to_string(),
            })
            .expect("Failed to seed credentials");
    }
    gateway
}

/// Create a gateway over a prepared credential store
fn create_gateway_with_store(base_url: &str, store: Arc<dyn CredentialStore>) -> GatewayClient {
    let session = Arc::new(Session::new(store));
    let auth = Arc::new(
        AuthManager::new(session, base_url, 5).expect("Failed to create auth manager"),
    );

    GatewayClient::new(auth, base_url, 5, 5).expect("Failed to create gateway client")
}

fn stored_access_token(gateway: &GatewayClient) -> Option<String> {
    gateway.auth().session().access_token().unwrap()
}

// ==================================================================================================
// Credential Attachment Tests
// ==================================================================================================

#[tokio::test]
async fn test_public_get_sent_without_authorization() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/profiles/abc123")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_body(r#"{"id": 1, "code": "abc123", "name": "kim"}"#)
        .expect(1)
        .create_async()
        .await;

    // A stored token must not leak onto public endpoints
    let gateway = create_gateway(&server.url(), Some(("T1", "R1")));
    let profile = api::profiles::get(&gateway, "abc123").await.unwrap();

    assert_eq!(profile.code, "abc123");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_public_get_without_stored_token() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/profiles/abc123")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_body(r#"{"id": 1, "code": "abc123", "name": "kim"}"#)
        .expect(1)
        .create_async()
        .await;

    let gateway = create_gateway(&server.url(), None);
    api::profiles::get(&gateway, "abc123").await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_protected_request_carries_bearer() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/users/me")
        .match_header("authorization", "Bearer T1")
        .with_status(200)
        .with_body(r#"{"id": 1799, "name": "apple4"}"#)
        .expect(1)
        .create_async()
        .await;

    let gateway = create_gateway(&server.url(), Some(("T1", "R1")));
    let user = api::auth::me(&gateway).await.unwrap();

    assert_eq!(user.id, 1799);
    mock.assert_async().await;
}

// ==================================================================================================
// Refresh-and-Retry Tests
// ==================================================================================================

#[tokio::test]
async fn test_patch_retried_after_refresh() {
    let mut server = Server::new_async().await;

    let stale = server
        .mock("PATCH", "/profiles/abc123")
        .match_header("authorization", "Bearer T1")
        .with_status(401)
        .with_body(r#"{"message": "jwt expired"}"#)
        .expect(1)
        .create_async()
        .await;

    let refresh = server
        .mock("POST", "/auth/refresh-token")
        .match_header("authorization", Matcher::Missing)
        .match_body(Matcher::Json(json!({ "refreshToken": "R1" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"accessToken": "T2"}"#)
        .expect(1)
        .create_async()
        .await;

    let fresh = server
        .mock("PATCH", "/profiles/abc123")
        .match_header("authorization", "Bearer T2")
        .match_body(Matcher::Json(json!({ "content": "updated" })))
        .with_status(200)
        .with_body(r#"{"id": 1, "code": "abc123", "name": "kim", "content": "updated"}"#)
        .expect(1)
        .create_async()
        .await;

    let gateway = create_gateway(&server.url(), Some(("T1", "R1")));
    let request = ApiRequest::patch("/profiles/abc123")
        .json(&json!({ "content": "updated" }))
        .unwrap();

    let response = gateway.send(request).await.unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(stored_access_token(&gateway).as_deref(), Some("T2"));
    stale.assert_async().await;
    refresh.assert_async().await;
    fresh.assert_async().await;
}

#[tokio::test]
async fn test_second_unauthorized_is_returned() {
    let mut server = Server::new_async().await;

    let protected = server
        .mock("GET", "/users/me")
        .with_status(401)
        .with_body(r#"{"message": "Unauthorized"}"#)
        .expect(2)
        .create_async()
        .await;

    let refresh = server
        .mock("POST", "/auth/refresh-token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"accessToken": "T2"}"#)
        .expect(1)
        .create_async()
        .await;

    let gateway = create_gateway(&server.url(), Some(("T1", "R1")));
    let err = gateway.send(ApiRequest::get("/users/me")).await.unwrap_err();

    assert!(err.is_unauthorized());
    protected.assert_async().await;
    refresh.assert_async().await;
}

#[tokio::test]
async fn test_no_refresh_token_clears_store_without_retry() {
    let mut server = Server::new_async().await;

    let protected = server
        .mock("POST", "/articles")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;

    let refresh = server
        .mock("POST", "/auth/refresh-token")
        .expect(0)
        .create_async()
        .await;

    // Access token present, refresh token missing
    let store = Arc::new(MemoryCredentialStore::new());
    store.set(ACCESS_TOKEN_KEY, "T1").unwrap();
    let gateway = create_gateway_with_store(&server.url(), store);
    let mut events = gateway.auth().session().subscribe();

    let request = ApiRequest::post("/articles")
        .json(&json!({ "image": "", "content": "c", "title": "t" }))
        .unwrap();
    let err = gateway.send(request).await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(stored_access_token(&gateway), None);
    assert_eq!(gateway.auth().session().refresh_token().unwrap(), None);
    assert_eq!(events.try_recv().unwrap(), SessionEvent::Expired);
    protected.assert_async().await;
    refresh.assert_async().await;
}

#[tokio::test]
async fn test_refresh_denied_returns_original_error() {
    let mut server = Server::new_async().await;

    let protected = server
        .mock("DELETE", "/articles/42")
        .with_status(401)
        .with_body(r#"{"message": "jwt expired"}"#)
        .expect(1)
        .create_async()
        .await;

    server
        .mock("POST", "/auth/refresh-token")
        .with_status(400)
        .with_body(r#"{"message": "invalid refresh token"}"#)
        .expect(1)
        .create_async()
        .await;

    let gateway = create_gateway(&server.url(), Some(("T1", "R1")));
    let mut events = gateway.auth().session().subscribe();

    let err = gateway
        .send(ApiRequest::delete("/articles/42"))
        .await
        .unwrap_err();

    match err {
        GatewayError::Unauthorized(message) => assert_eq!(message, "jwt expired"),
        other => panic!("expected Unauthorized, got {:?}", other),
    }
    assert!(!gateway.auth().session().is_signed_in().unwrap());
    assert_eq!(events.try_recv().unwrap(), SessionEvent::Expired);
    protected.assert_async().await;
}

#[tokio::test]
async fn test_public_unauthorized_never_refreshes() {
    let mut server = Server::new_async().await;

    server
        .mock("POST", "/auth/sign-in")
        .with_status(401)
        .with_body(r#"{"message": "wrong password"}"#)
        .expect(1)
        .create_async()
        .await;

    let refresh = server
        .mock("POST", "/auth/refresh-token")
        .expect(0)
        .create_async()
        .await;

    let gateway = create_gateway(&server.url(), Some(("T1", "R1")));
    let request = SignInRequest {
        email: "apple4@example.com".to_string(),
        password: "wrong".to_string(),
    };
    let err = api::auth::sign_in(&gateway, &request).await.unwrap_err();

    assert!(err.is_unauthorized());
    // Existing session untouched
    assert_eq!(stored_access_token(&gateway).as_deref(), Some("T1"));
    refresh.assert_async().await;
}

#[tokio::test]
async fn test_other_errors_propagate_untouched() {
    let mut server = Server::new_async().await;

    server
        .mock("PATCH", "/profiles/abc123")
        .with_status(403)
        .with_body(r#"{"message": "not your wiki"}"#)
        .expect(1)
        .create_async()
        .await;

    let refresh = server
        .mock("POST", "/auth/refresh-token")
        .expect(0)
        .create_async()
        .await;

    let gateway = create_gateway(&server.url(), Some(("T1", "R1")));
    let err = gateway
        .send(ApiRequest::patch("/profiles/abc123"))
        .await
        .unwrap_err();

    match err {
        GatewayError::Http { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "not your wiki");
        }
        other => panic!("expected Http error, got {:?}", other),
    }
    refresh.assert_async().await;
}

#[tokio::test]
async fn test_network_error_propagates() {
    // Nothing listens on port 9 on the loopback interface
    let gateway = create_gateway("http://127.0.0.1:9", Some(("T1", "R1")));

    let err = gateway
        .send(ApiRequest::get("/users/me"))
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Network(_)));
    // No refresh attempted, credentials kept
    assert_eq!(stored_access_token(&gateway).as_deref(), Some("T1"));
}

#[tokio::test]
async fn test_concurrent_unauthorized_share_one_refresh() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/users/me")
        .match_header("authorization", "Bearer T1")
        .with_status(401)
        .create_async()
        .await;

    let refresh = server
        .mock("POST", "/auth/refresh-token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"accessToken": "T2"}"#)
        .expect(1)
        .create_async()
        .await;

    server
        .mock("GET", "/users/me")
        .match_header("authorization", "Bearer T2")
        .with_status(200)
        .with_body(r#"{"id": 1, "name": "kim"}"#)
        .create_async()
        .await;

    let gateway = create_gateway(&server.url(), Some(("T1", "R1")));

    let (a, b, c) = tokio::join!(
        api::auth::me(&gateway),
        api::auth::me(&gateway),
        api::auth::me(&gateway)
    );

    assert!(a.is_ok());
    assert!(b.is_ok());
    assert!(c.is_ok());
    refresh.assert_async().await;
}

// ==================================================================================================
// Session and API Tests
// ==================================================================================================

#[tokio::test]
async fn test_sign_in_stores_credentials() {
    let mut server = Server::new_async().await;

    server
        .mock("POST", "/auth/sign-in")
        .match_header("authorization", Matcher::Missing)
        .match_body(Matcher::Json(json!({
            "email": "apple4@example.com",
            "password": "password"
        })))
        .with_status(200)
        .with_body(
            r#"{"accessToken": "A1", "refreshToken": "R1",
                "user": {"id": 1799, "name": "apple4", "email": "apple4@example.com"}}"#,
        )
        .create_async()
        .await;

    let gateway = create_gateway(&server.url(), None);
    let mut events = gateway.auth().session().subscribe();

    let request = SignInRequest {
        email: "apple4@example.com".to_string(),
        password: "password".to_string(),
    };
    let response = api::auth::sign_in(&gateway, &request).await.unwrap();

    assert_eq!(response.user.name, "apple4");
    assert_eq!(stored_access_token(&gateway).as_deref(), Some("A1"));
    assert_eq!(
        gateway.auth().session().refresh_token().unwrap().as_deref(),
        Some("R1")
    );
    assert_eq!(events.try_recv().unwrap(), SessionEvent::SignedIn);

    api::auth::sign_out(&gateway).unwrap();
    assert_eq!(stored_access_token(&gateway), None);
    assert_eq!(events.try_recv().unwrap(), SessionEvent::SignedOut);
}

#[tokio::test]
async fn test_profile_list_query() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("GET", "/profiles")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("page".into(), "2".into()),
            Matcher::UrlEncoded("pageSize".into(), "5".into()),
            Matcher::UrlEncoded("name".into(), "kim".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"totalCount": 6, "list": [{"id": 6, "code": "x6", "name": "kim"}]}"#)
        .expect(1)
        .create_async()
        .await;

    let gateway = create_gateway(&server.url(), None);
    let query = ProfileQuery {
        page: Some(2),
        page_size: Some(5),
        name: Some("kim".to_string()),
    };
    let profiles = api::profiles::list(&gateway, &query).await.unwrap();

    assert_eq!(profiles.total_count, 6);
    assert_eq!(profiles.list.len(), 1);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_edit_status() {
    let mut server = Server::new_async().await;

    server
        .mock("GET", "/profiles/free/ping")
        .with_status(204)
        .create_async()
        .await;

    server
        .mock("GET", "/profiles/busy/ping")
        .with_status(200)
        .with_body(r#"{"registeredAt": "2024-12-16T07:56:44.829Z", "userId": 1799}"#)
        .create_async()
        .await;

    let gateway = create_gateway(&server.url(), None);

    assert_eq!(
        api::profiles::edit_status(&gateway, "free").await.unwrap(),
        EditStatus::Available
    );
    match api::profiles::edit_status(&gateway, "busy").await.unwrap() {
        EditStatus::InUse(Some(lock)) => assert_eq!(lock.user_id, 1799),
        other => panic!("unexpected status: {:?}", other),
    }
}

#[tokio::test]
async fn test_quiz_answer_is_protected() {
    let mut server = Server::new_async().await;

    let mock = server
        .mock("POST", "/profiles/abc123/ping")
        .match_header("authorization", "Bearer T1")
        .match_body(Matcher::Json(json!({ "securityAnswer": "blue" })))
        .with_status(200)
        .with_body(r#"{"registeredAt": "2024-12-16T07:56:44.829Z", "userId": 1799}"#)
        .expect(1)
        .create_async()
        .await;

    let gateway = create_gateway(&server.url(), Some(("T1", "R1")));
    let lock = api::profiles::answer_quiz(&gateway, "abc123", "  blue ")
        .await
        .unwrap();

    assert_eq!(lock.user_id, 1799);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_wrong_quiz_answer_message() {
    let mut server = Server::new_async().await;

    server
        .mock("POST", "/profiles/abc123/ping")
        .with_status(400)
        .with_body(r#"{"message": "보안 답변이 일치하지 않습니다."}"#)
        .create_async()
        .await;

    let gateway = create_gateway(&server.url(), Some(("T1", "R1")));
    let err = api::profiles::answer_quiz(&gateway, "abc123", "red")
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(400));
    assert!(err.to_string().contains("보안 답변이 일치하지 않습니다."));
}
