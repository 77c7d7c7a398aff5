//! API implementation for the Trustlink HTTP server

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    middleware,
    response::Json,
    routing::{get, post},
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::state::AppState;

pub mod auth;
pub mod connections;
pub mod dto;
pub mod events;
pub mod posts;
pub mod profile;

use auth::auth_middleware;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        profile::get_profile,
        profile::update_profile,
        posts::create_post,
        posts::list_posts,
        connections::request_connection,
        connections::accept_connection,
        connections::reject_connection,
        connections::list_connections,
        events::receive_event,
    ),
    components(
        schemas(
            dto::RelationshipDto,
            dto::ConnectionRequestBody,
            dto::ConnectionDecisionBody,
            dto::ConnectionsResponse,
            dto::ProfileDto,
            dto::UpdateProfileRequest,
            dto::PostDto,
            dto::CreatePostRequest,
            dto::PostsResponse,
            dto::HealthResponse,
            dto::EventAcceptedResponse,
            crate::error::ErrorResponse,
            crate::error::ErrorDetail,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Liveness"),
        (name = "profile", description = "User profiles"),
        (name = "posts", description = "Global post feed"),
        (name = "connections", description = "Connection requests between users"),
        (name = "events", description = "Event delivery between services"),
    ),
    info(
        title = "Trustlink API",
        version = "1.0.0",
        description = "Profiles, posts and the connection workflow of the Trustlink social graph. Every /v1 endpoint expects an `Authorization: Bearer <ID token>` header.",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the main router with the endpoints of every hosted service
pub fn create_router(state: Arc<AppState>) -> Router {
    let mut api_router: Router<Arc<AppState>> = Router::new();
    let mut has_api_routes = false;

    if state.profiles.is_some() {
        api_router = api_router.route(
            "/v1/profile/me",
            get(profile::get_profile).patch(profile::update_profile),
        );
        has_api_routes = true;
    }

    if state.feed.is_some() {
        api_router = api_router
            .route("/v1/posts", get(posts::list_posts).post(posts::create_post))
            .route("/v1/posts/", get(posts::list_posts).post(posts::create_post));
        has_api_routes = true;
    }

    if state.connections.is_some() {
        api_router = api_router
            .route("/v1/connections", get(connections::list_connections))
            .route("/v1/connections/", get(connections::list_connections))
            .route(
                "/v1/connections/request",
                post(connections::request_connection),
            )
            .route(
                "/v1/connections/accept",
                post(connections::accept_connection),
            )
            .route(
                "/v1/connections/reject",
                post(connections::reject_connection),
            );
        has_api_routes = true;
    }

    if has_api_routes {
        api_router = api_router.route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));
    }

    let mut public_router = Router::new().route("/healthz", get(health_check));
    if state.dispatcher.is_some() {
        public_router = public_router.route("/internal/events", post(events::receive_event));
    }

    let swagger_router = SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi());

    api_router
        .merge(public_router)
        .with_state(state)
        .merge(swagger_router)
}

/// Health check endpoint listing the hosted services
#[utoipa::path(
    get,
    path = "/healthz",
    tag = "health",
    responses(
        (status = 200, description = "Service is up", body = dto::HealthResponse)
    )
)]
async fn health_check(State(state): State<Arc<AppState>>) -> Json<dto::HealthResponse> {
    Json(dto::HealthResponse {
        status: "ok".to_string(),
        services: state
            .service_names()
            .into_iter()
            .map(str::to_string)
            .collect(),
    })
}
