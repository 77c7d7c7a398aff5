use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use tracing::info;

use trustlink::config::{ConfigLoader, EventTransport, LogFormat, TrustlinkConfig};
use trustlink::identity::JwtIdentityProvider;
use trustlink::logging;
use trustlink::messaging::{BroadcastEventBus, EventBus, NoopEventBus, WebhookEventBus};
use trustlink::storage::create_store;

use trustlink_server::cli::CliArgs;
use trustlink_server::config::ServerConfig;
use trustlink_server::state::AppState;
use trustlink_server::{create_router, shutdown_signal};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli_args = CliArgs::parse();
    let server_config = ServerConfig::from_cli_and_env(cli_args)?;
    let config = load_config(&server_config)?;

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = logging::init(&config.logging)?;

    info!(version = trustlink::VERSION, env = %server_config.env, "Starting Trustlink server");

    let identity = Arc::new(JwtIdentityProvider::from_config(&config.identity)?);
    let store = create_store(&config.storage);

    let (events, broadcast): (Arc<dyn EventBus>, Option<Arc<BroadcastEventBus>>) =
        match config.events.transport {
            EventTransport::Broadcast => {
                let bus = Arc::new(BroadcastEventBus::new(config.events.capacity));
                (bus.clone(), Some(bus))
            }
            EventTransport::Webhook => (
                Arc::new(WebhookEventBus::from_config(&config.events.webhook)?),
                None,
            ),
            EventTransport::Disabled => (Arc::new(NoopEventBus), None),
        };
    info!(transport = ?config.events.transport, "Event bus initialized");

    let state = Arc::new(AppState::from_components(
        server_config.clone(),
        &config,
        identity,
        store,
        events,
    ));

    // The notification consumer follows the in-process bus; with the webhook
    // transport events arrive through /internal/events instead.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumer = match (state.dispatcher.clone(), broadcast) {
        (Some(dispatcher), Some(bus)) => {
            let subscription = bus.subscribe(config.notifications.topics.clone());
            let mut shutdown_rx = shutdown_rx;
            info!(queue = %config.notifications.queue, "Starting notification consumer");
            Some(tokio::spawn(dispatcher.run(subscription, async move {
                let _ = shutdown_rx.changed().await;
            })))
        }
        _ => None,
    };

    let app = create_router(state.clone()).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .layer(TimeoutLayer::new(server_config.request_timeout))
            .layer(RequestBodyLimitLayer::new(server_config.max_request_size)),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], server_config.port));
    let listener = TcpListener::bind(addr).await?;

    info!(services = ?state.service_names(), "Server listening on {}", addr);
    info!("API documentation available at http://{}/docs", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Some(consumer) = consumer {
        consumer.await?;
    }

    info!("Server stopped");
    Ok(())
}

/// Layer defaults, the config file and `TRUSTLINK_*` variables, then apply
/// the server's own overrides.
fn load_config(server_config: &ServerConfig) -> Result<TrustlinkConfig> {
    let mut loader = ConfigLoader::new();
    match &server_config.config_file {
        Some(path) => {
            loader.load_file(path)?;
        }
        None => {
            loader.load_default_files();
        }
    }
    let mut config = loader.load_env().extract()?;

    if let Some(enforce) = server_config.enforce_recipient {
        config.connections.enforce_recipient = enforce;
    }
    if let Some(level) = &server_config.log_level {
        config.logging.level = level.parse().map_err(anyhow::Error::msg)?;
    }
    if logging::format_for_env(&server_config.env) == LogFormat::Json {
        config.logging.format = LogFormat::Json;
    }

    Ok(config)
}
