//! Reverse proxy in front of the Trustlink services
//!
//! Requests are forwarded verbatim (method, path, query, headers and body) to
//! the upstream owning the path prefix; the upstream's status, headers and body
//! are returned unchanged.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, header},
    response::{Json, Response},
    routing::get,
};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::config::{GatewayConfig, ServerConfig};
use crate::error::{ServerError, ServerResult};

/// `X-Forwarded-Host`, set on every proxied request
pub static X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

/// Headers that only make sense on a single hop
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Upstream service owning a path prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    Profile,
    Feed,
    Connections,
}

impl Upstream {
    /// Pick the upstream for a request path.
    pub fn for_path(path: &str) -> Option<Self> {
        let under = |prefix: &str| {
            path == prefix
                || path
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('/'))
        };

        if path.starts_with("/v1/profile/") {
            Some(Upstream::Profile)
        } else if under("/v1/posts") {
            Some(Upstream::Feed)
        } else if under("/v1/connections") {
            Some(Upstream::Connections)
        } else {
            None
        }
    }

    fn base_url<'a>(&self, config: &'a GatewayConfig) -> &'a str {
        match self {
            Upstream::Profile => &config.profile_url,
            Upstream::Feed => &config.feed_url,
            Upstream::Connections => &config.connections_url,
        }
    }
}

/// Shared gateway state
#[derive(Debug, Clone)]
pub struct GatewayState {
    upstreams: GatewayConfig,
    client: reqwest::Client,
    max_request_size: usize,
}

impl GatewayState {
    pub fn new(config: &ServerConfig) -> ServerResult<Self> {
        Self::with_timeout(
            config.gateway.clone(),
            config.request_timeout,
            config.max_request_size,
        )
    }

    pub fn with_timeout(
        upstreams: GatewayConfig,
        timeout: Duration,
        max_request_size: usize,
    ) -> ServerResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ServerError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            upstreams,
            client,
            max_request_size,
        })
    }
}

/// Create the gateway router
pub fn create_gateway_router(state: GatewayState) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .fallback(proxy)
        .with_state(Arc::new(state))
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
}

async fn proxy(State(state): State<Arc<GatewayState>>, request: Request) -> ServerResult<Response> {
    let path = request.uri().path().to_string();
    let upstream = Upstream::for_path(&path)
        .ok_or_else(|| ServerError::NotFound(format!("No route for {}", path)))?;

    let (parts, body) = request.into_parts();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or(path.as_str());
    let target = format!(
        "{}{}",
        upstream.base_url(&state.upstreams).trim_end_matches('/'),
        path_and_query
    );

    let body = axum::body::to_bytes(body, state.max_request_size)
        .await
        .map_err(|e| ServerError::BadRequest(format!("Failed to read request body: {}", e)))?;

    let original_host = parts
        .headers
        .get(header::HOST)
        .cloned()
        .or_else(|| {
            parts
                .uri
                .authority()
                .and_then(|authority| HeaderValue::from_str(authority.as_str()).ok())
        });

    let mut headers = parts.headers;
    strip_hop_by_hop(&mut headers);
    headers.remove(header::HOST);
    headers.remove(header::CONTENT_LENGTH);
    if let Some(host) = original_host {
        headers.insert(X_FORWARDED_HOST.clone(), host);
    }

    debug!(method = %parts.method, path = %path, target = %target, "Proxying request");

    let upstream_response = state
        .client
        .request(parts.method, &target)
        .headers(headers)
        .body(body)
        .send()
        .await
        .map_err(|e| {
            warn!(target = %target, error = %e, "Upstream request failed");
            ServerError::BadGateway(format!("Upstream unavailable for {}", path))
        })?;

    let status = upstream_response.status();
    let mut response_headers = upstream_response.headers().clone();
    let bytes = upstream_response.bytes().await.map_err(|e| {
        warn!(target = %target, error = %e, "Failed to read upstream response");
        ServerError::BadGateway(format!("Upstream response for {} was cut short", path))
    })?;

    strip_hop_by_hop(&mut response_headers);
    response_headers.remove(header::CONTENT_LENGTH);

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = response_headers;
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_table() {
        assert_eq!(Upstream::for_path("/v1/profile/me"), Some(Upstream::Profile));
        assert_eq!(Upstream::for_path("/v1/posts"), Some(Upstream::Feed));
        assert_eq!(Upstream::for_path("/v1/posts/"), Some(Upstream::Feed));
        assert_eq!(Upstream::for_path("/v1/posts/abc"), Some(Upstream::Feed));
        assert_eq!(
            Upstream::for_path("/v1/connections"),
            Some(Upstream::Connections)
        );
        assert_eq!(
            Upstream::for_path("/v1/connections/accept"),
            Some(Upstream::Connections)
        );
    }

    #[test]
    fn test_unknown_paths_have_no_upstream() {
        assert_eq!(Upstream::for_path("/v1/profile"), None);
        assert_eq!(Upstream::for_path("/v1/postsx"), None);
        assert_eq!(Upstream::for_path("/v2/posts"), None);
        assert_eq!(Upstream::for_path("/"), None);
    }

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer t"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 1);
        assert!(headers.contains_key(header::AUTHORIZATION));
    }
}
