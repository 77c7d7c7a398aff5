//! The relationship state machine over a document store

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::models::{Relationship, RelationshipStatus, RequestOutcome, relationship_id};
use crate::config::ConnectionsConfig;
use crate::messaging::{ConnectionEvent, EventBus, publish_best_effort, topics};
use crate::storage::{
    DocumentStore, FieldUpdates, Precondition, Query, StorageError, VersionedDocument, encode,
};
use crate::{Result, TrustlinkError};

/// Default collection for relationship documents
pub const DEFAULT_COLLECTION: &str = "relationships";

/// Owns relationship records and their transitions.
///
/// `Requested -> Accepted` and `Requested -> Rejected` are the only
/// transitions. Requests use insert-if-absent on the pair id; transitions
/// use a compare-and-swap on the document version. Events are published
/// after the write and a publish failure never fails the call.
#[derive(Clone)]
pub struct RelationshipStore {
    store: Arc<dyn DocumentStore>,
    events: Arc<dyn EventBus>,
    config: ConnectionsConfig,
    collection: String,
}

impl std::fmt::Debug for RelationshipStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationshipStore")
            .field("store", &self.store)
            .field("config", &self.config)
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

impl RelationshipStore {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        events: Arc<dyn EventBus>,
        config: ConnectionsConfig,
    ) -> Self {
        Self {
            store,
            events,
            config,
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }

    /// Store relationships in a different collection.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn config(&self) -> &ConnectionsConfig {
        &self.config
    }

    /// Record a connection request from `from_uid` to `to_uid`.
    ///
    /// A pending request for the same pair, in either direction, is returned
    /// unchanged with `created == false` and publishes nothing. A pair that
    /// was already accepted or rejected is a `Conflict`.
    #[instrument(skip(self), level = "debug")]
    pub async fn request(&self, from_uid: &str, to_uid: &str) -> Result<RequestOutcome> {
        if from_uid.is_empty() || to_uid.is_empty() {
            return Err(TrustlinkError::InvalidArgument(
                "fromUid and toUid are required".to_string(),
            ));
        }
        if from_uid == to_uid {
            return Err(TrustlinkError::InvalidArgument(
                "Cannot send a connection request to yourself".to_string(),
            ));
        }

        let relationship = Relationship::requested(from_uid, to_uid, Utc::now());
        let document = encode(&relationship)?;

        match self
            .store
            .create(&self.collection, &relationship.id, document)
            .await
        {
            Ok(stored) => {
                let relationship: Relationship = stored.decode()?;
                info!(
                    from_uid,
                    to_uid,
                    relationship_id = %relationship.id,
                    "Connection requested"
                );

                let event = ConnectionEvent {
                    from_uid: relationship.from_uid.clone(),
                    to_uid: relationship.to_uid.clone(),
                    created_at: relationship.created_at,
                };
                publish_best_effort(self.events.as_ref(), topics::CONNECTION_REQUESTED, &event)
                    .await;

                Ok(RequestOutcome {
                    relationship,
                    created: true,
                })
            }
            Err(StorageError::AlreadyExists(_)) => {
                let existing = self.load(&relationship.id).await?.ok_or_else(|| {
                    TrustlinkError::Conflict(format!(
                        "Connection {} changed concurrently",
                        relationship.id
                    ))
                })?;
                let existing: Relationship = existing.decode()?;
                if !(existing.involves(from_uid) && existing.involves(to_uid)) {
                    warn!(
                        from_uid,
                        to_uid,
                        relationship_id = %existing.id,
                        "Pair id already held by another pair"
                    );
                    return Err(TrustlinkError::Conflict(format!(
                        "Connection id {} is held by another pair",
                        existing.id
                    )));
                }

                match existing.status {
                    RelationshipStatus::Requested => {
                        debug!(
                            relationship_id = %existing.id,
                            "Connection request already pending"
                        );
                        Ok(RequestOutcome {
                            relationship: existing,
                            created: false,
                        })
                    }
                    status => Err(TrustlinkError::Conflict(format!(
                        "Connection between {} and {} is already {}",
                        from_uid, to_uid, status
                    ))),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Accept the pending request sent by `from_uid` to `acting_uid`.
    #[instrument(skip(self), level = "debug")]
    pub async fn accept(&self, acting_uid: &str, from_uid: &str) -> Result<Relationship> {
        self.transition(acting_uid, from_uid, RelationshipStatus::Accepted)
            .await
    }

    /// Reject the pending request sent by `from_uid` to `acting_uid`.
    #[instrument(skip(self), level = "debug")]
    pub async fn reject(&self, acting_uid: &str, from_uid: &str) -> Result<Relationship> {
        self.transition(acting_uid, from_uid, RelationshipStatus::Rejected)
            .await
    }

    /// Relationships involving `acting_uid` in the given status (default accepted).
    ///
    /// No ordering is guaranteed.
    pub async fn list_connections(
        &self,
        acting_uid: &str,
        status: Option<RelationshipStatus>,
    ) -> Result<Vec<Relationship>> {
        if acting_uid.is_empty() {
            return Err(TrustlinkError::InvalidArgument(
                "An acting identity is required".to_string(),
            ));
        }
        let status = status.unwrap_or(RelationshipStatus::Accepted);

        let mut relationships = Vec::new();
        for side in ["fromUid", "toUid"] {
            let query = Query::new()
                .where_eq(side, acting_uid)
                .where_eq("status", status.as_str());
            for document in self.store.query(&self.collection, query).await? {
                relationships.push(document.decode::<Relationship>()?);
            }
        }

        debug!(
            acting_uid,
            status = %status,
            count = relationships.len(),
            "Listed connections"
        );
        Ok(relationships)
    }

    /// Identities with an accepted connection to `uid`.
    pub async fn accepted_counterparts(&self, uid: &str) -> Result<Vec<String>> {
        let relationships = self
            .list_connections(uid, Some(RelationshipStatus::Accepted))
            .await?;
        Ok(relationships
            .iter()
            .map(|r| r.counterpart(uid).to_string())
            .collect())
    }

    /// Look up the relationship for a pair, if any.
    pub async fn get(&self, a: &str, b: &str) -> Result<Option<Relationship>> {
        match self.load(&relationship_id(a, b)).await? {
            Some(document) => {
                let relationship: Relationship = document.decode()?;
                Ok((relationship.involves(a) && relationship.involves(b)).then_some(relationship))
            }
            None => Ok(None),
        }
    }

    async fn load(&self, id: &str) -> Result<Option<VersionedDocument>> {
        Ok(self.store.get(&self.collection, id).await?)
    }

    async fn transition(
        &self,
        acting_uid: &str,
        from_uid: &str,
        target: RelationshipStatus,
    ) -> Result<Relationship> {
        if from_uid.is_empty() {
            return Err(TrustlinkError::InvalidArgument("fromUid is required".to_string()));
        }
        if acting_uid.is_empty() {
            return Err(TrustlinkError::InvalidArgument(
                "An acting identity is required".to_string(),
            ));
        }
        if acting_uid == from_uid {
            return Err(TrustlinkError::InvalidArgument(
                "Cannot answer your own connection request".to_string(),
            ));
        }

        let id = relationship_id(from_uid, acting_uid);
        let document = self.load(&id).await?.ok_or_else(|| {
            TrustlinkError::NotFound(format!("No connection request from {}", from_uid))
        })?;
        let current: Relationship = document.decode()?;
        if !(current.involves(acting_uid) && current.involves(from_uid)) {
            return Err(TrustlinkError::NotFound(format!(
                "No connection request from {}",
                from_uid
            )));
        }

        if self.config.enforce_recipient && current.to_uid != acting_uid {
            warn!(
                acting_uid,
                relationship_id = %id,
                "Only the recipient may answer a connection request"
            );
            return Err(TrustlinkError::PermissionDenied(
                "Only the recipient may answer a connection request".to_string(),
            ));
        }

        if current.status == target {
            debug!(relationship_id = %id, status = %target, "Transition already applied");
            return Ok(current);
        }
        if current.status.is_terminal() {
            return Err(TrustlinkError::Conflict(format!(
                "Connection {} is already {}",
                id, current.status
            )));
        }

        let now = Utc::now();
        let mut updates = FieldUpdates::new();
        updates.insert("status".to_string(), field(&target)?);
        updates.insert("updatedAt".to_string(), field(&now)?);

        let updated = match self
            .store
            .update(
                &self.collection,
                &id,
                updates,
                Precondition::Version(document.version),
            )
            .await
        {
            Ok(updated) => updated.decode::<Relationship>()?,
            Err(StorageError::VersionConflict { .. }) => {
                return self.resolve_conflict(&id, target).await;
            }
            Err(e) => return Err(e.into()),
        };

        info!(
            from_uid,
            to_uid = acting_uid,
            relationship_id = %id,
            status = %target,
            "Connection updated"
        );

        if target == RelationshipStatus::Accepted {
            let event = ConnectionEvent {
                from_uid: from_uid.to_string(),
                to_uid: acting_uid.to_string(),
                created_at: now,
            };
            publish_best_effort(self.events.as_ref(), topics::CONNECTION_ACCEPTED, &event).await;
        }

        Ok(updated)
    }

    /// A concurrent writer won the compare-and-swap. Succeed only if it
    /// already moved the record to the state this caller wanted.
    async fn resolve_conflict(&self, id: &str, target: RelationshipStatus) -> Result<Relationship> {
        let latest = self.load(id).await?.ok_or_else(|| {
            TrustlinkError::Conflict(format!("Connection {} changed concurrently", id))
        })?;
        let latest: Relationship = latest.decode()?;

        if latest.status == target {
            debug!(relationship_id = %id, status = %target, "Lost race to an identical transition");
            Ok(latest)
        } else {
            Err(TrustlinkError::Conflict(format!(
                "Connection {} was concurrently changed to {}",
                id, latest.status
            )))
        }
    }
}

fn field<T: Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value).map_err(StorageError::from)?)
}
