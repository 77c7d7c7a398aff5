//! Posts and the global feed
//!
//! Posts carry a denormalized copy of the author's display name and photo
//! taken from the profile at write time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::FeedConfig;
use crate::messaging::{EventBus, PostCreatedEvent, publish_best_effort, topics};
use crate::profiles::ProfileService;
use crate::storage::{Direction, DocumentStore, Query, encode};
use crate::{Result, TrustlinkError};

/// Default collection for post documents
pub const DEFAULT_COLLECTION: &str = "posts";

/// A published post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub author_uid: String,
    pub author_display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_photo_url: Option<String>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_urls: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

/// Body of a new post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub media_urls: Option<Vec<String>>,
}

impl NewPost {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            media_urls: None,
        }
    }
}

/// Writes posts and lists the feed.
#[derive(Clone)]
pub struct FeedService {
    store: Arc<dyn DocumentStore>,
    events: Arc<dyn EventBus>,
    profiles: ProfileService,
    config: FeedConfig,
    collection: String,
}

impl std::fmt::Debug for FeedService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedService")
            .field("collection", &self.collection)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl FeedService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        events: Arc<dyn EventBus>,
        profiles: ProfileService,
        config: FeedConfig,
    ) -> Self {
        Self {
            store,
            events,
            profiles,
            config,
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Publish a post by `author_uid`.
    pub async fn create_post(&self, author_uid: &str, new_post: NewPost) -> Result<Post> {
        if new_post.text.trim().is_empty() {
            return Err(TrustlinkError::InvalidArgument("Text is required".to_string()));
        }

        let author = self.profiles.get(author_uid).await?.ok_or_else(|| {
            TrustlinkError::NotFound(format!("Profile {} not found", author_uid))
        })?;

        let post = Post {
            id: Uuid::new_v4().to_string(),
            author_uid: author_uid.to_string(),
            author_display_name: author.display_name,
            author_photo_url: author.photo_url,
            text: new_post.text,
            media_urls: new_post.media_urls.filter(|urls| !urls.is_empty()),
            created_at: Utc::now(),
        };

        self.store
            .create(&self.collection, &post.id, encode(&post)?)
            .await?;
        info!(post_id = %post.id, author_uid, "Post created");

        let event = PostCreatedEvent {
            post_id: post.id.clone(),
            author_uid: post.author_uid.clone(),
            created_at: post.created_at,
        };
        publish_best_effort(self.events.as_ref(), topics::POST_CREATED, &event).await;

        Ok(post)
    }

    /// Resolve a caller supplied page size.
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        match requested {
            Some(limit) if (1..=self.config.max_limit).contains(&limit) => limit,
            _ => self.config.default_limit,
        }
    }

    /// Newest posts first.
    pub async fn list_posts(&self, limit: Option<usize>) -> Result<Vec<Post>> {
        let query = Query::new()
            .order_by("createdAt", Direction::Descending)
            .limit(self.effective_limit(limit));

        let documents = self.store.query(&self.collection, query).await?;
        let mut posts = Vec::with_capacity(documents.len());
        for document in documents {
            match document.decode::<Post>() {
                Ok(post) => posts.push(post),
                Err(e) => warn!(post_id = %document.id, error = %e, "Skipping malformed post"),
            }
        }
        Ok(posts)
    }
}
