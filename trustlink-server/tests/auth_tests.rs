//! Tests for bearer token authentication

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use trustlink::config::ConfigBuilder;
use trustlink::identity::{Claims, JwtIdentityProvider, sign_claims};
use trustlink::messaging::NoopEventBus;
use trustlink::storage::MemoryDocumentStore;
use trustlink_server::{AppState, config::ServerConfig, create_router};

const SECRET: &str = "test-secret-key-for-jwt-token-generation";

fn create_test_server_with_auth() -> TestServer {
    let config = ConfigBuilder::new()
        .with_jwt_secret(SECRET)
        .with_memory_storage()
        .build()
        .expect("Failed to create config");

    let identity = Arc::new(JwtIdentityProvider::from_config(&config.identity).unwrap());
    let state = Arc::new(AppState::from_components(
        ServerConfig::default(),
        &config,
        identity,
        Arc::new(MemoryDocumentStore::new()),
        Arc::new(NoopEventBus),
    ));

    TestServer::new(create_router(state)).unwrap()
}

fn now() -> u64 {
    chrono::Utc::now().timestamp() as u64
}

fn claims(sub: &str, exp: u64) -> Claims {
    Claims {
        sub: sub.to_string(),
        email: None,
        name: Some("Tess".to_string()),
        picture: None,
        iss: None,
        aud: None,
        iat: now(),
        exp,
    }
}

fn assert_unauthorized(response: &axum_test::TestResponse) {
    response.assert_status(StatusCode::UNAUTHORIZED);
    let json: Value = response.json();
    assert_eq!(json["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn test_missing_authorization_header() {
    let server = create_test_server_with_auth();

    let response = server.get("/v1/profile/me").await;

    assert_unauthorized(&response);
    let json: Value = response.json();
    assert_eq!(json["error"]["message"], "Missing Authorization header");
}

#[tokio::test]
async fn test_non_bearer_scheme_is_rejected() {
    let server = create_test_server_with_auth();

    let response = server
        .get("/v1/connections")
        .authorization("Basic YWxpY2U6c2VjcmV0")
        .await;

    assert_unauthorized(&response);
}

#[tokio::test]
async fn test_garbage_token_is_rejected() {
    let server = create_test_server_with_auth();

    let response = server
        .get("/v1/posts")
        .authorization_bearer("not-a-jwt")
        .await;

    assert_unauthorized(&response);
    let json: Value = response.json();
    assert_eq!(json["error"]["message"], "Invalid or expired token");
}

#[tokio::test]
async fn test_token_signed_with_other_secret() {
    let server = create_test_server_with_auth();
    let token = sign_claims(&claims("alice", now() + 3600), "some-other-secret").unwrap();

    let response = server
        .get("/v1/profile/me")
        .authorization_bearer(token)
        .await;

    assert_unauthorized(&response);
}

#[tokio::test]
async fn test_expired_token() {
    let server = create_test_server_with_auth();
    let token = sign_claims(&claims("alice", now() - 3600), SECRET).unwrap();

    let response = server
        .get("/v1/profile/me")
        .authorization_bearer(token)
        .await;

    assert_unauthorized(&response);
}

#[tokio::test]
async fn test_token_without_subject() {
    let server = create_test_server_with_auth();
    let token = sign_claims(&claims("", now() + 3600), SECRET).unwrap();

    let response = server
        .get("/v1/profile/me")
        .authorization_bearer(token)
        .await;

    assert_unauthorized(&response);
}

#[tokio::test]
async fn test_externally_minted_token_is_accepted() {
    let server = create_test_server_with_auth();
    let token = encode(
        &Header::default(),
        &json!({
            "sub": "uid-123",
            "email": "tess@example.com",
            "name": "Tess",
            "iat": now(),
            "exp": now() + 600,
        }),
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();

    let response = server
        .get("/v1/profile/me")
        .authorization_bearer(&token)
        .await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["uid"], "uid-123");
    assert_eq!(json["email"], "tess@example.com");
    assert_eq!(json["displayName"], "Tess");
}

#[tokio::test]
async fn test_every_v1_route_requires_a_token() {
    let server = create_test_server_with_auth();

    assert_unauthorized(&server.get("/v1/profile/me").await);
    assert_unauthorized(&server.patch("/v1/profile/me").json(&json!({})).await);
    assert_unauthorized(&server.get("/v1/posts").await);
    assert_unauthorized(&server.post("/v1/posts").json(&json!({"text": "x"})).await);
    assert_unauthorized(&server.get("/v1/connections").await);
    assert_unauthorized(
        &server
            .post("/v1/connections/request")
            .json(&json!({"targetUid": "bob"}))
            .await,
    );
    assert_unauthorized(
        &server
            .post("/v1/connections/accept")
            .json(&json!({"fromUid": "bob"}))
            .await,
    );
    assert_unauthorized(
        &server
            .post("/v1/connections/reject")
            .json(&json!({"fromUid": "bob"}))
            .await,
    );
}

#[tokio::test]
async fn test_public_endpoints_need_no_token() {
    let server = create_test_server_with_auth();

    server.get("/healthz").await.assert_status_ok();
    server.get("/api-docs/openapi.json").await.assert_status_ok();
}
