//! Connections between identities
//!
//! One [`Relationship`] document exists per unordered pair, keyed by
//! [`relationship_id`]. The initiator creates it as `requested`; only the
//! recipient moves it to `accepted` or `rejected`, after which it never
//! changes again.

pub mod models;
pub mod store;


pub use models::{
    ID_SEPARATOR, Relationship, RelationshipStatus, RequestOutcome, relationship_id,
};
pub use store::RelationshipStore;
