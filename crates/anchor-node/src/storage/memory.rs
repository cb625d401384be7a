//! In-memory tag store
//!
//! Default storage implementation using an in-memory map.
//! Suitable for development and single-instance deployments.
//! Data is lost on restart.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use super::{Operation, StorageError, Tag, TagExpression, TagStore, TaggedRecord};

#[derive(Debug, Clone)]
struct StoredRecord {
    value: Vec<u8>,
    tags: Vec<Tag>,
}

/// In-memory tag store implementation
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<String, StoredRecord>>,
}

impl MemoryStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> Result<usize, StorageError> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.read()?.is_empty())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, StoredRecord>>, StorageError> {
        self.records
            .read()
            .map_err(|_| StorageError::Database("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, StoredRecord>>, StorageError> {
        self.records
            .write()
            .map_err(|_| StorageError::Database("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl TagStore for MemoryStore {
    async fn batch(&self, operations: Vec<Operation>) -> Result<(), StorageError> {
        let mut records = self.write()?;
        let count = operations.len();

        for operation in operations {
            match operation {
                Operation::Put { key, value, tags } => {
                    records.insert(key, StoredRecord { value, tags });
                }
                Operation::Delete { key } => {
                    records.remove(&key);
                }
            }
        }

        debug!(operations = count, "Applied batch");
        Ok(())
    }

    async fn query(&self, expression: &str) -> Result<Vec<TaggedRecord>, StorageError> {
        let expression = TagExpression::parse(expression)?;
        let records = self.read()?;

        Ok(records
            .iter()
            .filter(|(_, record)| expression.matches(&record.tags))
            .map(|(key, record)| TaggedRecord {
                key: key.clone(),
                value: record.value.clone(),
                tags: record.tags.clone(),
            })
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.read()?.get(key).map(|r| r.value.clone()))
    }

    async fn get_tags(&self, key: &str) -> Result<Option<Vec<Tag>>, StorageError> {
        Ok(self.read()?.get(key).map(|r| r.tags.clone()))
    }
}
