//! Storage abstraction for the anchor node
//!
//! Two seams live here:
//! - [`TagStore`]: a key/value store whose records carry (name, value) tags and
//!   can be queried by tag expression. Backs the anchor link store and the
//!   expiry sweep. In-memory by default, PostgreSQL with the `postgres` feature.
//! - [`ReferenceStore`]: reference and activity collections read by the
//!   paginator through scoped cursors.

pub mod expiry;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod query;
pub mod references;

pub use expiry::{ExpiredKeyHandler, ExpiryService};
pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;
pub use query::{Comparison, TagExpression, TagTerm};
pub use references::{Cursor, CursorGuard, MemoryReferenceStore, QueryOptions, ReferenceStore};

use async_trait::async_trait;
use std::fmt::Debug;

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl StorageError {
    /// Whether retrying the operation may succeed.
    ///
    /// I/O failures are transient. Decode failures on stored data and rejected
    /// inputs are permanent.
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Database(_) | StorageError::Connection(_))
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// A (name, value) tag attached to a stored record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One write in a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Insert or replace the value and the full tag set of a key
    Put {
        key: String,
        value: Vec<u8>,
        tags: Vec<Tag>,
    },
    /// Remove a key (no-op when absent)
    Delete { key: String },
}

impl Operation {
    pub fn put(key: impl Into<String>, value: Vec<u8>, tags: Vec<Tag>) -> Self {
        Operation::Put {
            key: key.into(),
            value,
            tags,
        }
    }

    pub fn delete(key: impl Into<String>) -> Self {
        Operation::Delete { key: key.into() }
    }

    pub fn key(&self) -> &str {
        match self {
            Operation::Put { key, .. } | Operation::Delete { key } => key,
        }
    }
}

/// A record returned by a tag query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedRecord {
    pub key: String,
    pub value: Vec<u8>,
    pub tags: Vec<Tag>,
}

impl TaggedRecord {
    /// Value of the named tag, if present
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.value.as_str())
    }
}

/// Tagged key/value store.
///
/// Implementations must be thread-safe and apply each batch atomically.
#[async_trait]
pub trait TagStore: Send + Sync + Debug {
    /// Apply a batch of writes, all or nothing
    async fn batch(&self, operations: Vec<Operation>) -> Result<(), StorageError>;

    /// Records matching a tag expression (see [`TagExpression`]), ordered by key
    async fn query(&self, expression: &str) -> Result<Vec<TaggedRecord>, StorageError>;

    /// Value stored under a key
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Tags of a key; `None` when the key is absent
    async fn get_tags(&self, key: &str) -> Result<Option<Vec<Tag>>, StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(StorageError::Database("timeout".into()).is_transient());
        assert!(StorageError::Connection("refused".into()).is_transient());
        assert!(!StorageError::Serialization("bad json".into()).is_transient());
        assert!(!StorageError::InvalidQuery("&&".into()).is_transient());
    }

    #[test]
    fn test_record_tag_lookup() {
        let record = TaggedRecord {
            key: "k".into(),
            value: Vec::new(),
            tags: vec![Tag::new("status", "pending"), Tag::new("expiryTime", "10")],
        };
        assert_eq!(record.tag("status"), Some("pending"));
        assert_eq!(record.tag("anchorHash"), None);
    }
}
