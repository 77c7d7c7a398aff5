//! Profile endpoints

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
};
use trustlink::identity::Identity;

use crate::{
    api::dto::{ProfileDto, UpdateProfileRequest},
    error::ServerResult,
    state::AppState,
};

/// Get the caller's profile, creating it from token claims on first access
#[utoipa::path(
    get,
    path = "/v1/profile/me",
    tag = "profile",
    responses(
        (status = 200, description = "Caller's profile", body = ProfileDto),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> ServerResult<Json<ProfileDto>> {
    let profile = state.profiles()?.get_or_create(&identity).await?;
    Ok(Json(profile.into()))
}

/// Update fields of the caller's profile
#[utoipa::path(
    patch,
    path = "/v1/profile/me",
    tag = "profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = ProfileDto),
        (status = 400, description = "Invalid request body", body = crate::error::ErrorResponse),
        (status = 404, description = "Profile does not exist yet", body = crate::error::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> ServerResult<Json<ProfileDto>> {
    let Json(request) = payload?;
    let profile = state
        .profiles()?
        .update(&identity.uid, request.into())
        .await?;
    Ok(Json(profile.into()))
}
