//! Expiry sweep service
//!
//! Stores register a tag holding a unix-seconds expiry time and a handler. Each
//! sweep finds records whose expiry has lapsed and asks the handler which of
//! them may really go; only those are deleted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::{Operation, StorageError, TagStore};

/// Decides which expired keys may be deleted
#[async_trait]
pub trait ExpiredKeyHandler: Send + Sync {
    /// Return the subset of `keys` that is safe to delete
    async fn handle_expired_keys(&self, keys: Vec<String>) -> Result<Vec<String>, StorageError>;
}

struct Registration {
    store: Arc<dyn TagStore>,
    expiry_tag: String,
    handler: Arc<dyn ExpiredKeyHandler>,
}

/// Periodically deletes expired records from registered stores
#[derive(Default)]
pub struct ExpiryService {
    registrations: Vec<Registration>,
}

impl ExpiryService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sweep `store` for records whose `expiry_tag` has lapsed
    pub fn register(
        &mut self,
        store: Arc<dyn TagStore>,
        expiry_tag: impl Into<String>,
        handler: Arc<dyn ExpiredKeyHandler>,
    ) {
        let expiry_tag = expiry_tag.into();
        info!(expiry_tag = %expiry_tag, "Registered store for expiry sweeps");
        self.registrations.push(Registration {
            store,
            expiry_tag,
            handler,
        });
    }

    /// Run one sweep as of `now`; returns the number of deleted keys.
    ///
    /// A failing registration is logged and does not stop the others.
    pub async fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut deleted = 0;
        for registration in &self.registrations {
            match Self::sweep_one(registration, now).await {
                Ok(count) => deleted += count,
                Err(e) => error!(
                    expiry_tag = %registration.expiry_tag,
                    error = %e,
                    transient = e.is_transient(),
                    "Expiry sweep failed"
                ),
            }
        }
        deleted
    }

    async fn sweep_one(registration: &Registration, now: DateTime<Utc>) -> Result<usize, StorageError> {
        let expression = format!("{}<={}", registration.expiry_tag, now.timestamp());
        let expired: Vec<String> = registration
            .store
            .query(&expression)
            .await?
            .into_iter()
            .map(|record| record.key)
            .collect();

        if expired.is_empty() {
            return Ok(0);
        }

        let found = expired.len();
        let to_delete = registration.handler.handle_expired_keys(expired).await?;
        if to_delete.is_empty() {
            debug!(expiry_tag = %registration.expiry_tag, found, "No expired keys to delete");
            return Ok(0);
        }

        let count = to_delete.len();
        registration
            .store
            .batch(to_delete.into_iter().map(Operation::delete).collect())
            .await?;

        info!(expiry_tag = %registration.expiry_tag, found, deleted = count, "Deleted expired keys");
        Ok(count)
    }

    /// Sweep every `interval` on a background task
    pub fn start(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        info!(interval_secs = interval.as_secs(), "Starting expiry service");
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                self.sweep(Utc::now()).await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, Tag};
    use std::sync::Mutex;

    /// Keeps keys not starting with "keep"
    struct Selective {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ExpiredKeyHandler for Selective {
        async fn handle_expired_keys(&self, keys: Vec<String>) -> Result<Vec<String>, StorageError> {
            self.seen.lock().unwrap().extend(keys.iter().cloned());
            Ok(keys.into_iter().filter(|k| !k.starts_with("keep")).collect())
        }
    }

    async fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store
            .batch(vec![
                Operation::put("old", Vec::new(), vec![Tag::new("expiryTime", "100")]),
                Operation::put("keep-old", Vec::new(), vec![Tag::new("expiryTime", "50")]),
                Operation::put("fresh", Vec::new(), vec![Tag::new("expiryTime", "500")]),
                Operation::put("permanent", Vec::new(), Vec::new()),
            ])
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_sweep_deletes_only_approved_expired_keys() {
        let store = seeded_store().await;
        let handler = Arc::new(Selective { seen: Mutex::new(Vec::new()) });

        let mut service = ExpiryService::new();
        service.register(store.clone(), "expiryTime", handler.clone());

        let now = DateTime::from_timestamp(200, 0).unwrap();
        assert_eq!(service.sweep(now).await, 1);

        let mut seen = handler.seen.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, vec!["keep-old", "old"]);

        assert!(store.get("old").await.unwrap().is_none());
        assert!(store.get("keep-old").await.unwrap().is_some());
        assert!(store.get("fresh").await.unwrap().is_some());
        assert!(store.get("permanent").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sweep_with_nothing_expired() {
        let store = seeded_store().await;
        let handler = Arc::new(Selective { seen: Mutex::new(Vec::new()) });

        let mut service = ExpiryService::new();
        service.register(store, "expiryTime", handler.clone());

        assert_eq!(service.sweep(DateTime::from_timestamp(10, 0).unwrap()).await, 0);
        assert!(handler.seen.lock().unwrap().is_empty());
    }
}
