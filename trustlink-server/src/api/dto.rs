//! Data transfer objects for the HTTP API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use trustlink::connections::Relationship;
use trustlink::feed::{NewPost, Post};
use trustlink::profiles::{Profile, ProfileUpdate};

/// Relationship between two users
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipDto {
    /// Deterministic pair identifier
    pub id: String,
    /// Initiator of the request
    pub from_uid: String,
    /// Recipient of the request
    pub to_uid: String,
    /// `requested`, `accepted` or `rejected`
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Relationship> for RelationshipDto {
    fn from(relationship: Relationship) -> Self {
        Self {
            id: relationship.id,
            from_uid: relationship.from_uid,
            to_uid: relationship.to_uid,
            status: relationship.status.as_str().to_string(),
            created_at: relationship.created_at,
            updated_at: relationship.updated_at,
        }
    }
}

/// Request body for sending a connection request
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRequestBody {
    /// User to connect with
    pub target_uid: Option<String>,
}

/// Request body for accepting or rejecting a pending request
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDecisionBody {
    /// Initiator of the pending request
    pub from_uid: Option<String>,
}

/// Connections of the caller
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConnectionsResponse {
    pub connections: Vec<RelationshipDto>,
    pub count: usize,
}

/// User profile
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDto {
    pub uid: String,
    pub display_name: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profession: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birthday: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Profile> for ProfileDto {
    fn from(profile: Profile) -> Self {
        Self {
            uid: profile.uid,
            display_name: profile.display_name,
            username: profile.username,
            email: profile.email,
            photo_url: profile.photo_url,
            profession: profile.profession,
            birthday: profile.birthday,
            gender: profile.gender,
            location: profile.location,
            bio: profile.bio,
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        }
    }
}

/// Partial profile update; omitted fields keep their value
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub username: Option<String>,
    pub photo_url: Option<String>,
    pub profession: Option<String>,
    pub birthday: Option<String>,
    pub gender: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
}

impl From<UpdateProfileRequest> for ProfileUpdate {
    fn from(request: UpdateProfileRequest) -> Self {
        Self {
            display_name: request.display_name,
            username: request.username,
            photo_url: request.photo_url,
            profession: request.profession,
            birthday: request.birthday,
            gender: request.gender,
            location: request.location,
            bio: request.bio,
        }
    }
}

/// Post in the feed
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostDto {
    pub id: String,
    pub author_uid: String,
    pub author_display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_photo_url: Option<String>,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_urls: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

impl From<Post> for PostDto {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            author_uid: post.author_uid,
            author_display_name: post.author_display_name,
            author_photo_url: post.author_photo_url,
            text: post.text,
            media_urls: post.media_urls,
            created_at: post.created_at,
        }
    }
}

/// Request body for publishing a post
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[serde(default)]
    pub text: String,
    pub media_urls: Option<Vec<String>>,
}

impl From<CreatePostRequest> for NewPost {
    fn from(request: CreatePostRequest) -> Self {
        Self {
            text: request.text,
            media_urls: request.media_urls,
        }
    }
}

/// Newest posts
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PostsResponse {
    pub posts: Vec<PostDto>,
    pub count: usize,
}

/// Service health
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub services: Vec<String>,
}

/// Outcome of an ingested event
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EventAcceptedResponse {
    /// Notifications delivered for the event
    pub delivered: usize,
}
