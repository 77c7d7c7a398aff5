use std::net::SocketAddr;

use anyhow::Result;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

use trustlink::config::LoggingConfig;
use trustlink::logging;

use trustlink_server::cli::CliArgs;
use trustlink_server::config::ServerConfig;
use trustlink_server::gateway::GatewayState;
use trustlink_server::{create_gateway_router, shutdown_signal};

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse_gateway();
    let server_config = ServerConfig::from_cli_and_env(cli_args)?;

    let mut logging_config = LoggingConfig {
        format: logging::format_for_env(&server_config.env),
        ..LoggingConfig::default()
    };
    if let Some(level) = &server_config.log_level {
        logging_config.level = level.parse().map_err(anyhow::Error::msg)?;
    }
    let _log_guard = logging::init(&logging_config)?;

    info!(version = trustlink::VERSION, env = %server_config.env, "Starting Trustlink gateway");
    info!(
        profile = %server_config.gateway.profile_url,
        feed = %server_config.gateway.feed_url,
        connections = %server_config.gateway.connections_url,
        "Upstreams configured"
    );

    let state = GatewayState::new(&server_config)?;
    let app = create_gateway_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .layer(TimeoutLayer::new(server_config.request_timeout)),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], server_config.port));
    let listener = TcpListener::bind(addr).await?;
    info!("Gateway listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway stopped");
    Ok(())
}
