//! Inbound event delivery for the notification consumer

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
};
use trustlink::messaging::Envelope;

use crate::{
    api::{auth::verify_shared_token, dto::EventAcceptedResponse},
    error::ServerResult,
    state::AppState,
};

/// Receive an event published by another process
#[utoipa::path(
    post,
    path = "/internal/events",
    tag = "events",
    request_body(content = serde_json::Value, description = "Envelope `{topic, payload, publishedAt}`"),
    responses(
        (status = 200, description = "Event handled", body = EventAcceptedResponse),
        (status = 400, description = "Malformed envelope", body = crate::error::ErrorResponse),
        (status = 401, description = "Wrong delivery token", body = crate::error::ErrorResponse),
    )
)]
pub async fn receive_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<Envelope>, JsonRejection>,
) -> ServerResult<Json<EventAcceptedResponse>> {
    if let Some(token) = &state.webhook_token {
        verify_shared_token(&headers, token)?;
    }
    let Json(envelope) = payload?;

    tracing::debug!(topic = %envelope.topic, "Received event");
    let delivered = state.dispatcher()?.handle_envelope(envelope).await?;

    Ok(Json(EventAcceptedResponse { delivered }))
}
