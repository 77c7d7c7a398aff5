//! Application state management

use std::sync::Arc;

use trustlink::config::TrustlinkConfig;
use trustlink::connections::RelationshipStore;
use trustlink::feed::FeedService;
use trustlink::identity::IdentityProvider;
use trustlink::messaging::EventBus;
use trustlink::notifications::{LogSink, NotificationDispatcher, NotificationSink};
use trustlink::profiles::ProfileService;
use trustlink::storage::DocumentStore;

use crate::config::{ServerConfig, Service};
use crate::error::{ServerError, ServerResult};

/// Application state shared across all handlers
pub struct AppState {
    /// Server configuration
    pub config: ServerConfig,

    /// Verifies bearer credentials
    pub identity: Arc<dyn IdentityProvider>,

    /// Profile service, when hosted
    pub profiles: Option<ProfileService>,

    /// Feed service, when hosted
    pub feed: Option<FeedService>,

    /// Connections service, when hosted
    pub connections: Option<RelationshipStore>,

    /// Notification consumer, when hosted
    pub dispatcher: Option<NotificationDispatcher>,

    /// Token expected on `/internal/events`
    pub webhook_token: Option<String>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("profiles", &self.profiles.is_some())
            .field("feed", &self.feed.is_some())
            .field("connections", &self.connections.is_some())
            .field("dispatcher", &self.dispatcher.is_some())
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Create state with no services enabled
    pub fn new(config: ServerConfig, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            config,
            identity,
            profiles: None,
            feed: None,
            connections: None,
            dispatcher: None,
            webhook_token: None,
        }
    }

    /// Wire up every service `config` asks for on top of the shared store and bus.
    pub fn from_components(
        config: ServerConfig,
        trustlink: &TrustlinkConfig,
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn DocumentStore>,
        events: Arc<dyn EventBus>,
    ) -> Self {
        let profiles = ProfileService::new(store.clone())
            .with_collection(trustlink.storage.users_collection.clone());
        let connections =
            RelationshipStore::new(store.clone(), events.clone(), trustlink.connections.clone())
                .with_collection(trustlink.storage.relationships_collection.clone());
        let feed = FeedService::new(
            store,
            events,
            profiles.clone(),
            trustlink.feed.clone(),
        )
        .with_collection(trustlink.storage.posts_collection.clone());

        let dispatcher = (config.hosts(Service::Notifications) && trustlink.notifications.enabled)
            .then(|| {
                let sink: Arc<dyn NotificationSink> = Arc::new(LogSink);
                NotificationDispatcher::new(connections.clone(), sink)
            });

        let mut state = Self::new(config, identity);
        state.profiles = state.config.hosts(Service::Profile).then_some(profiles);
        state.feed = state.config.hosts(Service::Feed).then_some(feed);
        state.connections = state.config.hosts(Service::Connections).then_some(connections);
        state.dispatcher = dispatcher;
        state.webhook_token = trustlink.events.webhook.token.clone();
        state
    }

    /// Names of the services this process hosts
    pub fn service_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.profiles.is_some() {
            names.push(Service::Profile.as_str());
        }
        if self.feed.is_some() {
            names.push(Service::Feed.as_str());
        }
        if self.connections.is_some() {
            names.push(Service::Connections.as_str());
        }
        if self.dispatcher.is_some() {
            names.push(Service::Notifications.as_str());
        }
        names
    }

    pub fn profiles(&self) -> ServerResult<&ProfileService> {
        self.profiles
            .as_ref()
            .ok_or_else(|| disabled(Service::Profile))
    }

    pub fn feed(&self) -> ServerResult<&FeedService> {
        self.feed.as_ref().ok_or_else(|| disabled(Service::Feed))
    }

    pub fn connections(&self) -> ServerResult<&RelationshipStore> {
        self.connections
            .as_ref()
            .ok_or_else(|| disabled(Service::Connections))
    }

    pub fn dispatcher(&self) -> ServerResult<&NotificationDispatcher> {
        self.dispatcher
            .as_ref()
            .ok_or_else(|| disabled(Service::Notifications))
    }
}

fn disabled(service: Service) -> ServerError {
    ServerError::NotFound(format!("The {} service is not hosted here", service))
}
