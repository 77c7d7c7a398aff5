//! Feed endpoints

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
use trustlink::identity::Identity;
use utoipa::IntoParams;

use crate::{
    api::dto::{CreatePostRequest, PostDto, PostsResponse},
    error::ServerResult,
    state::AppState,
};

/// Query parameters for listing posts
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListPostsParams {
    /// Page size, 1 to 100; anything else uses the default of 20
    pub limit: Option<String>,
}

/// Publish a post
#[utoipa::path(
    post,
    path = "/v1/posts",
    tag = "posts",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Post created", body = PostDto),
        (status = 400, description = "Text is required", body = crate::error::ErrorResponse),
        (status = 404, description = "Author has no profile", body = crate::error::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_post(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<CreatePostRequest>, JsonRejection>,
) -> ServerResult<(StatusCode, Json<PostDto>)> {
    let Json(request) = payload?;
    let post = state
        .feed()?
        .create_post(&identity.uid, request.into())
        .await?;
    Ok((StatusCode::CREATED, Json(post.into())))
}

/// List the newest posts
#[utoipa::path(
    get,
    path = "/v1/posts",
    tag = "posts",
    params(ListPostsParams),
    responses(
        (status = 200, description = "Newest posts first", body = PostsResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_posts(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ListPostsParams>, QueryRejection>,
) -> ServerResult<Json<PostsResponse>> {
    let Query(params) = params?;
    let limit = params.limit.and_then(|limit| limit.trim().parse::<usize>().ok());

    let posts: Vec<PostDto> = state
        .feed()?
        .list_posts(limit)
        .await?
        .into_iter()
        .map(PostDto::from)
        .collect();

    Ok(Json(PostsResponse {
        count: posts.len(),
        posts,
    }))
}
