//! Connection workflow endpoints

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde::Deserialize;
use trustlink::connections::RelationshipStatus;
use trustlink::identity::Identity;
use utoipa::IntoParams;

use crate::{
    api::dto::{ConnectionDecisionBody, ConnectionRequestBody, ConnectionsResponse, RelationshipDto},
    error::{ServerResult, bad_request},
    state::AppState,
};

/// Query parameters for listing connections
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListConnectionsParams {
    /// `requested`, `accepted` (default) or `rejected`
    pub status: Option<String>,
}

fn required(value: Option<String>, field: &str) -> ServerResult<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(bad_request(&format!("{} is required", field))),
    }
}

/// Send a connection request
#[utoipa::path(
    post,
    path = "/v1/connections/request",
    tag = "connections",
    request_body = ConnectionRequestBody,
    responses(
        (status = 201, description = "Request created", body = RelationshipDto),
        (status = 200, description = "Request already pending", body = RelationshipDto),
        (status = 400, description = "Missing or self target", body = crate::error::ErrorResponse),
        (status = 409, description = "Pair already decided", body = crate::error::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn request_connection(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<ConnectionRequestBody>, JsonRejection>,
) -> ServerResult<(StatusCode, Json<RelationshipDto>)> {
    let Json(body) = payload?;
    let target_uid = required(body.target_uid, "targetUid")?;

    let outcome = state
        .connections()?
        .request(&identity.uid, &target_uid)
        .await?;

    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome.relationship.into())))
}

/// Accept a pending request
#[utoipa::path(
    post,
    path = "/v1/connections/accept",
    tag = "connections",
    request_body = ConnectionDecisionBody,
    responses(
        (status = 200, description = "Request accepted", body = RelationshipDto),
        (status = 400, description = "Missing fromUid", body = crate::error::ErrorResponse),
        (status = 403, description = "Caller is not the recipient", body = crate::error::ErrorResponse),
        (status = 404, description = "No such request", body = crate::error::ErrorResponse),
        (status = 409, description = "Request already rejected", body = crate::error::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn accept_connection(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<ConnectionDecisionBody>, JsonRejection>,
) -> ServerResult<Json<RelationshipDto>> {
    let Json(body) = payload?;
    let from_uid = required(body.from_uid, "fromUid")?;

    let relationship = state
        .connections()?
        .accept(&identity.uid, &from_uid)
        .await?;
    Ok(Json(relationship.into()))
}

/// Reject a pending request
#[utoipa::path(
    post,
    path = "/v1/connections/reject",
    tag = "connections",
    request_body = ConnectionDecisionBody,
    responses(
        (status = 200, description = "Request rejected", body = RelationshipDto),
        (status = 400, description = "Missing fromUid", body = crate::error::ErrorResponse),
        (status = 403, description = "Caller is not the recipient", body = crate::error::ErrorResponse),
        (status = 404, description = "No such request", body = crate::error::ErrorResponse),
        (status = 409, description = "Request already accepted", body = crate::error::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn reject_connection(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<ConnectionDecisionBody>, JsonRejection>,
) -> ServerResult<Json<RelationshipDto>> {
    let Json(body) = payload?;
    let from_uid = required(body.from_uid, "fromUid")?;

    let relationship = state
        .connections()?
        .reject(&identity.uid, &from_uid)
        .await?;
    Ok(Json(relationship.into()))
}

/// List the caller's connections
#[utoipa::path(
    get,
    path = "/v1/connections",
    tag = "connections",
    params(ListConnectionsParams),
    responses(
        (status = 200, description = "Connections with the given status", body = ConnectionsResponse),
        (status = 400, description = "Unknown status", body = crate::error::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_connections(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    params: Result<Query<ListConnectionsParams>, QueryRejection>,
) -> ServerResult<Json<ConnectionsResponse>> {
    let Query(params) = params?;
    let status = params
        .status
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<RelationshipStatus>())
        .transpose()?;

    let connections: Vec<RelationshipDto> = state
        .connections()?
        .list_connections(&identity.uid, status)
        .await?
        .into_iter()
        .map(RelationshipDto::from)
        .collect();

    Ok(Json(ConnectionsResponse {
        count: connections.len(),
        connections,
    }))
}
