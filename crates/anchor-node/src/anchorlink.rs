//! Anchor link store
//!
//! Records which hash-links realize an anchor hash. A link is either processed
//! (confirmed) or pending (gossiped, awaiting confirmation). Pending records carry
//! an expiry time and are removed by the expiry sweep if never confirmed.
//!
//! Records are keyed by the base64url encoding of the link, so storing the same
//! link twice replaces the record rather than duplicating it. Tags:
//!
//! | Tag | Processed | Pending |
//! |---|---|---|
//! | `anchorHash` | resource hash | resource hash |
//! | `status` | absent | `pending` |
//! | `expiryTime` | absent | unix seconds |

use anchor_core::{is_resource_hash, AnchorLinkStatus, HashLink};
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::storage::{ExpiredKeyHandler, Operation, StorageError, Tag, TagStore, TaggedRecord};

/// Tag holding the anchor hash
pub const ANCHOR_HASH_TAG: &str = "anchorHash";
/// Tag present only on pending records
pub const STATUS_TAG: &str = "status";
/// Tag holding a pending record's expiry (unix seconds)
pub const EXPIRY_TAG: &str = "expiryTime";

/// Default lifespan of a pending record (24h)
pub const DEFAULT_PENDING_LIFESPAN_SECS: i64 = 86_400;

/// Stored form of a link
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredLink {
    anchor_hash: String,
    url: Url,
}

/// A stored link with its lifecycle state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorLinkRef {
    pub anchor_hash: String,
    pub url: Url,
    pub status: AnchorLinkStatus,
    /// Present only for pending links
    pub expiry_time: Option<DateTime<Utc>>,
}

/// Anchor hashes are spliced into tag expressions
fn check_anchor_hash(anchor_hash: &str) -> Result<(), StorageError> {
    if is_resource_hash(anchor_hash) {
        Ok(())
    } else {
        Err(StorageError::InvalidInput(format!("invalid anchor hash '{}'", anchor_hash)))
    }
}

/// Store key of a link
pub fn link_key(link: &Url) -> String {
    URL_SAFE_NO_PAD.encode(link.as_str())
}

/// Anchor link store over a tag store
#[derive(Debug, Clone)]
pub struct AnchorLinkStore {
    store: Arc<dyn TagStore>,
    pending_lifespan: Duration,
}

impl AnchorLinkStore {
    pub fn new(store: Arc<dyn TagStore>) -> Self {
        Self {
            store,
            pending_lifespan: Duration::seconds(DEFAULT_PENDING_LIFESPAN_SECS),
        }
    }

    /// Set how long pending links live before the sweep may remove them
    pub fn with_pending_lifespan(mut self, lifespan: Duration) -> Self {
        self.pending_lifespan = lifespan;
        self
    }

    /// The underlying tag store
    pub fn tag_store(&self) -> Arc<dyn TagStore> {
        self.store.clone()
    }

    /// Store links as processed, promoting any pending record
    pub async fn put_links(&self, links: &[Url]) -> Result<(), StorageError> {
        let operations = links
            .iter()
            .map(|link| Self::put_operation(link, None))
            .collect::<Result<Vec<_>, _>>()?;

        self.write(operations, "processed").await
    }

    /// Store links as pending, expiring after the configured lifespan
    pub async fn put_pending_links(&self, links: &[Url]) -> Result<(), StorageError> {
        self.put_pending_links_at(links, Utc::now()).await
    }

    /// Store links as pending as of `now`
    pub async fn put_pending_links_at(&self, links: &[Url], now: DateTime<Utc>) -> Result<(), StorageError> {
        let expiry = now + self.pending_lifespan;
        let operations = links
            .iter()
            .map(|link| Self::put_operation(link, Some(expiry)))
            .collect::<Result<Vec<_>, _>>()?;

        self.write(operations, "pending").await
    }

    /// Delete links regardless of status
    pub async fn delete_links(&self, links: &[Url]) -> Result<(), StorageError> {
        let operations = links.iter().map(|link| Operation::delete(link_key(link))).collect();
        self.write(operations, "deleted").await
    }

    /// Delete links that are still pending; processed links are kept
    pub async fn delete_pending_links(&self, links: &[Url]) -> Result<(), StorageError> {
        let mut operations = Vec::new();

        for link in links {
            let anchor_hash = anchor_hash_of(link)?;
            let key = link_key(link);
            let pending = self
                .store
                .query(&format!(
                    "{}:{}&&{}:{}",
                    ANCHOR_HASH_TAG,
                    anchor_hash,
                    STATUS_TAG,
                    AnchorLinkStatus::Pending.as_str()
                ))
                .await
                .map_err(|e| log_failure("query pending links", e))?;

            if pending.iter().any(|record| record.key == key) {
                operations.push(Operation::delete(key));
            } else {
                debug!(link = %link, "Link is not pending, keeping it");
            }
        }

        self.write(operations, "pending deleted").await
    }

    /// Processed links for an anchor hash
    pub async fn get_links(&self, anchor_hash: &str) -> Result<Vec<Url>, StorageError> {
        check_anchor_hash(anchor_hash)?;
        let records = self
            .store
            .query(&format!("{}:{}&&!{}", ANCHOR_HASH_TAG, anchor_hash, STATUS_TAG))
            .await
            .map_err(|e| log_failure("query links", e))?;

        records
            .iter()
            .map(|record| decode(record).map(|stored| stored.url))
            .collect()
    }

    /// All links for an anchor hash, processed and pending
    pub async fn get_processed_and_pending_links(&self, anchor_hash: &str) -> Result<Vec<AnchorLinkRef>, StorageError> {
        check_anchor_hash(anchor_hash)?;
        let records = self
            .store
            .query(&format!("{}:{}", ANCHOR_HASH_TAG, anchor_hash))
            .await
            .map_err(|e| log_failure("query links", e))?;

        records.iter().map(to_link_ref).collect()
    }

    fn put_operation(link: &Url, expiry: Option<DateTime<Utc>>) -> Result<Operation, StorageError> {
        let anchor_hash = anchor_hash_of(link)?;
        let mut tags = vec![Tag::new(ANCHOR_HASH_TAG, anchor_hash.clone())];
        if let Some(expiry) = expiry {
            tags.push(Tag::new(STATUS_TAG, AnchorLinkStatus::Pending.as_str()));
            tags.push(Tag::new(EXPIRY_TAG, expiry.timestamp().to_string()));
        }

        let value = serde_json::to_vec(&StoredLink {
            anchor_hash,
            url: link.clone(),
        })?;

        Ok(Operation::put(link_key(link), value, tags))
    }

    async fn write(&self, operations: Vec<Operation>, action: &str) -> Result<(), StorageError> {
        if operations.is_empty() {
            return Ok(());
        }

        let count = operations.len();
        self.store
            .batch(operations)
            .await
            .map_err(|e| log_failure("store links", e))?;

        info!(links = count, action = action, "Anchor links updated");
        Ok(())
    }
}

#[async_trait]
impl ExpiredKeyHandler for AnchorLinkStore {
    /// Keep only keys still pending; a link promoted since it expired survives
    async fn handle_expired_keys(&self, keys: Vec<String>) -> Result<Vec<String>, StorageError> {
        let mut to_delete = Vec::with_capacity(keys.len());

        for key in keys {
            let Some(tags) = self.store.get_tags(&key).await? else {
                debug!(key = %key, "Expired key already gone");
                continue;
            };

            let pending = tags
                .iter()
                .any(|t| t.name == STATUS_TAG && t.value == AnchorLinkStatus::Pending.as_str());

            if pending {
                to_delete.push(key);
            } else {
                warn!(key = %key, "Expired key was processed in the meantime, not deleting");
            }
        }

        Ok(to_delete)
    }
}

fn anchor_hash_of(link: &Url) -> Result<String, StorageError> {
    HashLink::from_url(link)
        .map(|hl| hl.resource_hash().to_string())
        .map_err(|e| StorageError::InvalidInput(e.to_string()))
}

fn decode(record: &TaggedRecord) -> Result<StoredLink, StorageError> {
    serde_json::from_slice(&record.value).map_err(|e| {
        error!(key = %record.key, error = %e, "Stored anchor link is corrupt");
        StorageError::Serialization(format!("anchor link '{}': {}", record.key, e))
    })
}

fn to_link_ref(record: &TaggedRecord) -> Result<AnchorLinkRef, StorageError> {
    let stored = decode(record)?;

    let status = match record.tag(STATUS_TAG) {
        Some(_) => AnchorLinkStatus::Pending,
        None => AnchorLinkStatus::Processed,
    };

    let expiry_time = match record.tag(EXPIRY_TAG) {
        Some(raw) => {
            let secs = raw.parse::<i64>().map_err(|_| {
                StorageError::Serialization(format!("anchor link '{}': invalid expiry '{}'", record.key, raw))
            })?;
            DateTime::from_timestamp(secs, 0)
        }
        None => None,
    };

    Ok(AnchorLinkRef {
        anchor_hash: stored.anchor_hash,
        url: stored.url,
        status,
        expiry_time,
    })
}

fn log_failure(action: &str, err: StorageError) -> StorageError {
    error!(action = action, error = %err, transient = err.is_transient(), "Anchor link store failure");
    err
}
