//! Tests for the reverse proxy

use std::time::Duration;

use axum::{
    Json, Router,
    extract::Request,
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use axum_test::TestServer;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use trustlink_server::config::GatewayConfig;
use trustlink_server::create_gateway_router;
use trustlink_server::gateway::GatewayState;

/// Upstream that describes every request it receives
async fn echo(service: &'static str, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    let header = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };
    let status = header("x-echo-status")
        .and_then(|status| status.parse::<u16>().ok())
        .and_then(|status| StatusCode::from_u16(status).ok())
        .unwrap_or(StatusCode::OK);

    let description = json!({
        "service": service,
        "method": parts.method.as_str(),
        "path": parts.uri.path(),
        "query": parts.uri.query(),
        "body": String::from_utf8_lossy(&body),
        "authorization": header("authorization"),
        "forwardedHost": header("x-forwarded-host"),
    });

    (status, [("x-upstream", service)], Json(description)).into_response()
}

async fn spawn_upstream(service: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().fallback(move |request: Request| echo(service, request));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Address nothing listens on
async fn closed_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

fn gateway(upstreams: GatewayConfig) -> TestServer {
    let state = GatewayState::with_timeout(upstreams, Duration::from_secs(5), 1024 * 1024).unwrap();
    TestServer::builder()
        .http_transport()
        .build(create_gateway_router(state))
        .unwrap()
}

async fn create_test_gateway() -> TestServer {
    gateway(GatewayConfig {
        profile_url: spawn_upstream("profile").await,
        feed_url: spawn_upstream("feed").await,
        connections_url: spawn_upstream("connections").await,
    })
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_gateway().await;

    let response = server.get("/healthz").await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_routes_to_owning_service() {
    let server = create_test_gateway().await;

    let cases = [
        ("/v1/profile/me", "profile"),
        ("/v1/posts", "feed"),
        ("/v1/posts/", "feed"),
        ("/v1/connections", "connections"),
        ("/v1/connections/accept", "connections"),
    ];

    for (path, service) in cases {
        let response = server.get(path).await;
        response.assert_status_ok();
        let json: Value = response.json();
        assert_eq!(json["service"], service, "path {}", path);
        assert_eq!(json["path"], path);
    }
}

#[tokio::test]
async fn test_forwards_request_verbatim() {
    let server = create_test_gateway().await;

    let response = server
        .post("/v1/connections/request")
        .add_query_param("trace", "1")
        .authorization_bearer("id-token")
        .json(&json!({"targetUid": "bob"}))
        .await;

    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["method"], "POST");
    assert_eq!(json["path"], "/v1/connections/request");
    assert_eq!(json["query"], "trace=1");
    assert_eq!(json["authorization"], "Bearer id-token");
    let body: Value = serde_json::from_str(json["body"].as_str().unwrap()).unwrap();
    assert_eq!(body, json!({"targetUid": "bob"}));
    assert!(!json["forwardedHost"].as_str().unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_patch_reaches_profile_service() {
    let server = create_test_gateway().await;

    let response = server
        .patch("/v1/profile/me")
        .json(&json!({"bio": "hi"}))
        .await;

    let json: Value = response.json();
    assert_eq!(json["service"], "profile");
    assert_eq!(json["method"], "PATCH");
}

#[tokio::test]
async fn test_upstream_status_and_headers_pass_through() {
    let server = create_test_gateway().await;

    let response = server
        .get("/v1/posts")
        .add_header(
            HeaderName::from_static("x-echo-status"),
            HeaderValue::from_static("418"),
        )
        .await;

    response.assert_status(StatusCode::IM_A_TEAPOT);
    assert_eq!(response.header("x-upstream"), "feed");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let server = create_test_gateway().await;

    for path in ["/v2/posts", "/v1/profile", "/v1/postsx", "/"] {
        let response = server.get(path).await;
        response.assert_status(StatusCode::NOT_FOUND);
        let json: Value = response.json();
        assert_eq!(json["error"]["code"], "not_found");
    }
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let server = gateway(GatewayConfig {
        profile_url: closed_address().await,
        feed_url: spawn_upstream("feed").await,
        connections_url: spawn_upstream("connections").await,
    });

    let response = server.get("/v1/profile/me").await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let json: Value = response.json();
    assert_eq!(json["error"]["code"], "bad_gateway");

    server.get("/v1/posts").await.assert_status_ok();
}
