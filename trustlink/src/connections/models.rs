//! Relationship records and identifiers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TrustlinkError;

/// Separator between the two identities in a relationship id
pub const ID_SEPARATOR: char = '_';

/// Deterministic id of the unordered pair `{a, b}`.
///
/// The two identities are ordered lexicographically and joined with `_`, so
/// `relationship_id(a, b) == relationship_id(b, a)`.
pub fn relationship_id(a: &str, b: &str) -> String {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    format!("{}{}{}", low, ID_SEPARATOR, high)
}

/// Lifecycle state of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipStatus {
    Requested,
    Accepted,
    Rejected,
}

impl RelationshipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipStatus::Requested => "requested",
            RelationshipStatus::Accepted => "accepted",
            RelationshipStatus::Rejected => "rejected",
        }
    }

    /// Accepted and Rejected never change again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RelationshipStatus::Requested)
    }
}

impl fmt::Display for RelationshipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationshipStatus {
    type Err = TrustlinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "requested" => Ok(RelationshipStatus::Requested),
            "accepted" => Ok(RelationshipStatus::Accepted),
            "rejected" => Ok(RelationshipStatus::Rejected),
            _ => Err(TrustlinkError::InvalidArgument(format!(
                "Unknown connection status '{}'",
                s
            ))),
        }
    }
}

/// A connection proposal between two identities, stored once per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: String,
    /// Initiator
    pub from_uid: String,
    /// Recipient
    pub to_uid: String,
    pub status: RelationshipStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Relationship {
    /// A fresh request from `from_uid` to `to_uid`.
    pub fn requested(from_uid: &str, to_uid: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: relationship_id(from_uid, to_uid),
            from_uid: from_uid.to_string(),
            to_uid: to_uid.to_string(),
            status: RelationshipStatus::Requested,
            created_at: now,
            updated_at: now,
        }
    }

    /// The other party of the pair as seen from `uid`.
    pub fn counterpart(&self, uid: &str) -> &str {
        if self.from_uid == uid {
            &self.to_uid
        } else {
            &self.from_uid
        }
    }

    /// Whether `uid` is one of the two parties.
    pub fn involves(&self, uid: &str) -> bool {
        self.from_uid == uid || self.to_uid == uid
    }
}

/// Result of a connection request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOutcome {
    pub relationship: Relationship,

    /// False when a pending request for the pair already existed
    pub created: bool,
}
