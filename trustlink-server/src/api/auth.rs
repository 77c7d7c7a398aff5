//! Bearer token authentication for the Trustlink API

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use headers::{Authorization, HeaderMapExt, authorization::Bearer};
use tracing::{debug, warn};

use crate::{error::ServerError, state::AppState};

/// Authentication middleware
///
/// Verifies the bearer ID token and stores the resulting
/// [`trustlink::identity::Identity`] in the request extensions.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let path = request.uri().path().to_string();

    let bearer = headers.typed_get::<Authorization<Bearer>>().ok_or_else(|| {
        warn!(path = %path, "Missing or malformed Authorization header");
        ServerError::Auth("Missing Authorization header".to_string())
    })?;

    let identity = state.identity.verify(bearer.token()).await.map_err(|e| {
        warn!(path = %path, error = %e, "Invalid token");
        ServerError::Auth("Invalid or expired token".to_string())
    })?;

    debug!(uid = %identity.uid, path = %path, "Authenticated request");
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

/// Check a shared bearer token, used for service to service calls.
pub fn verify_shared_token(headers: &HeaderMap, expected: &str) -> Result<(), ServerError> {
    let bearer = headers
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| ServerError::Auth("Missing Authorization header".to_string()))?;

    if bearer.token() != expected {
        warn!("Rejected event delivery with wrong token");
        return Err(ServerError::Auth("Invalid token".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, header::AUTHORIZATION};

    #[test]
    fn test_verify_shared_token() {
        let mut headers = HeaderMap::new();
        assert!(verify_shared_token(&headers, "s3cret").is_err());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer nope"));
        assert!(verify_shared_token(&headers, "s3cret").is_err());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer s3cret"));
        assert!(verify_shared_token(&headers, "s3cret").is_ok());
    }
}
