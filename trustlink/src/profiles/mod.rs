//! User profiles
//!
//! A profile is created lazily from the caller's identity claims the first
//! time it is read, and afterwards only changed through partial updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use crate::identity::Identity;
use crate::storage::{DocumentStore, FieldUpdates, Precondition, StorageError, encode};
use crate::{Result, TrustlinkError};

/// Default collection for profile documents
pub const DEFAULT_COLLECTION: &str = "users";

/// A user profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub uid: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profession: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birthday: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Minimal profile built from identity claims.
    pub fn from_identity(identity: &Identity, now: DateTime<Utc>) -> Self {
        Self {
            uid: identity.uid.clone(),
            display_name: identity.name.clone().unwrap_or_default(),
            username: String::new(),
            email: identity.email.clone().unwrap_or_default(),
            photo_url: identity.picture.clone(),
            profession: None,
            birthday: None,
            gender: None,
            location: None,
            bio: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial profile update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub username: Option<String>,
    pub photo_url: Option<String>,
    pub profession: Option<String>,
    pub birthday: Option<String>,
    pub gender: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
}

impl ProfileUpdate {
    fn into_fields(self) -> FieldUpdates {
        let mut fields = FieldUpdates::new();
        let pairs = [
            ("displayName", self.display_name),
            ("username", self.username),
            ("photoUrl", self.photo_url),
            ("profession", self.profession),
            ("birthday", self.birthday),
            ("gender", self.gender),
            ("location", self.location),
            ("bio", self.bio),
        ];
        for (name, value) in pairs {
            if let Some(value) = value {
                fields.insert(name.to_string(), Value::String(value));
            }
        }
        fields
    }
}

/// Reads and updates profiles in the document store.
#[derive(Debug, Clone)]
pub struct ProfileService {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl ProfileService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Fetch a profile by uid.
    pub async fn get(&self, uid: &str) -> Result<Option<Profile>> {
        match self.store.get(&self.collection, uid).await? {
            Some(document) => Ok(Some(document.decode()?)),
            None => Ok(None),
        }
    }

    /// Fetch the caller's profile, creating it from identity claims if absent.
    pub async fn get_or_create(&self, identity: &Identity) -> Result<Profile> {
        if let Some(profile) = self.get(&identity.uid).await? {
            return Ok(profile);
        }

        info!(uid = %identity.uid, "Profile not found, creating from identity claims");
        let profile = Profile::from_identity(identity, Utc::now());

        match self
            .store
            .create(&self.collection, &identity.uid, encode(&profile)?)
            .await
        {
            Ok(document) => Ok(document.decode()?),
            // Another request created it first
            Err(StorageError::AlreadyExists(_)) => self.get(&identity.uid).await?.ok_or_else(|| {
                TrustlinkError::Internal(format!("Profile {} vanished", identity.uid))
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Apply a partial update; `updatedAt` always moves.
    pub async fn update(&self, uid: &str, update: ProfileUpdate) -> Result<Profile> {
        let mut fields = update.into_fields();
        let now = serde_json::to_value(Utc::now()).map_err(StorageError::from)?;
        fields.insert("updatedAt".to_string(), now);

        let document = self
            .store
            .update(&self.collection, uid, fields, Precondition::None)
            .await
            .map_err(|e| match e {
                StorageError::NotFound(_) => {
                    TrustlinkError::NotFound(format!("Profile {} not found", uid))
                }
                other => other.into(),
            })?;

        debug!(uid, version = document.version, "Profile updated");
        Ok(document.decode()?)
    }
}
