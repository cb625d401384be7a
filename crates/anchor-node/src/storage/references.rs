//! Reference and activity collections
//!
//! A reference collection is identified by (object IRI, reference type) and holds
//! IRIs in insertion order. Activity collections (inbox, outbox, shares, likes)
//! are reference collections whose IRIs name stored activities.
//!
//! Queries hand back a [`Cursor`]; callers wrap it in a [`CursorGuard`] so it is
//! released on every exit path.

use anchor_core::{page_bounds, Activity, PageSize, ReferenceType, SortOrder};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::fmt::Debug;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};
use url::Url;

use super::StorageError;

/// Paging options for a reference query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryOptions {
    /// Page size; `None` returns every item
    pub page_size: Option<PageSize>,
    /// Requested bucket; `None` means the first bucket for the sort order
    pub page_number: Option<u64>,
    pub sort_order: SortOrder,
}

impl QueryOptions {
    pub fn new(sort_order: SortOrder) -> Self {
        Self {
            page_size: None,
            page_number: None,
            sort_order,
        }
    }

    pub fn with_page_size(mut self, page_size: PageSize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn with_page_number(mut self, page_number: Option<u64>) -> Self {
        self.page_number = page_number;
        self
    }
}

/// Results of a reference or activity query
pub trait Cursor<T>: Send {
    /// Size of the whole collection at query time, not just this page
    fn total_items(&self) -> u64;

    /// Next item of the page
    fn next(&mut self) -> Result<Option<T>, StorageError>;

    /// Release the cursor; further reads fail
    fn close(&mut self) -> Result<(), StorageError>;
}

/// Releases a cursor when dropped
pub struct CursorGuard<T> {
    cursor: Option<Box<dyn Cursor<T>>>,
}

impl<T> CursorGuard<T> {
    pub fn new(cursor: Box<dyn Cursor<T>>) -> Self {
        Self { cursor: Some(cursor) }
    }

    pub fn total_items(&self) -> u64 {
        self.cursor.as_ref().map_or(0, |c| c.total_items())
    }

    pub fn next(&mut self) -> Result<Option<T>, StorageError> {
        match self.cursor.as_mut() {
            Some(cursor) => cursor.next(),
            None => Err(StorageError::Database("cursor already closed".into())),
        }
    }

    /// Read up to `limit` items
    pub fn take(&mut self, limit: u64) -> Result<Vec<T>, StorageError> {
        let mut items = Vec::new();
        while (items.len() as u64) < limit {
            match self.next()? {
                Some(item) => items.push(item),
                None => break,
            }
        }
        Ok(items)
    }

    /// Release the cursor now, reporting failure
    pub fn close(mut self) -> Result<(), StorageError> {
        match self.cursor.take() {
            Some(mut cursor) => cursor.close(),
            None => Ok(()),
        }
    }
}

impl<T> Drop for CursorGuard<T> {
    fn drop(&mut self) {
        if let Some(mut cursor) = self.cursor.take() {
            if let Err(e) = cursor.close() {
                warn!(error = %e, "Failed to close cursor");
            }
        }
    }
}

/// Store of reference collections and the activities they point at
#[async_trait]
pub trait ReferenceStore: Send + Sync + Debug {
    /// Append a reference; adding one already present is a no-op
    async fn add_reference(
        &self,
        reference_type: ReferenceType,
        object_iri: &Url,
        reference: &Url,
    ) -> Result<(), StorageError>;

    /// Remove a reference; returns whether it was present
    async fn delete_reference(
        &self,
        reference_type: ReferenceType,
        object_iri: &Url,
        reference: &Url,
    ) -> Result<bool, StorageError>;

    /// Whether the collection contains the reference
    async fn has_reference(
        &self,
        reference_type: ReferenceType,
        object_iri: &Url,
        reference: &Url,
    ) -> Result<bool, StorageError>;

    /// Reference IRIs of a collection
    async fn query_references(
        &self,
        reference_type: ReferenceType,
        object_iri: &Url,
        options: &QueryOptions,
    ) -> Result<Box<dyn Cursor<Url>>, StorageError>;

    /// Store an activity under its id
    async fn add_activity(&self, activity: &Activity) -> Result<(), StorageError>;

    /// Activity with the given id
    async fn get_activity(&self, id: &Url) -> Result<Option<Activity>, StorageError>;

    /// Activities referenced by a collection
    async fn query_activities(
        &self,
        reference_type: ReferenceType,
        object_iri: &Url,
        options: &QueryOptions,
    ) -> Result<Box<dyn Cursor<Activity>>, StorageError>;
}

/// Cursor over preloaded results
struct MemoryCursor<T> {
    total_items: u64,
    items: VecDeque<T>,
    closed: bool,
}

impl<T: Send> Cursor<T> for MemoryCursor<T> {
    fn total_items(&self) -> u64 {
        self.total_items
    }

    fn next(&mut self) -> Result<Option<T>, StorageError> {
        if self.closed {
            return Err(StorageError::Database("cursor already closed".into()));
        }
        Ok(self.items.pop_front())
    }

    fn close(&mut self) -> Result<(), StorageError> {
        self.closed = true;
        self.items.clear();
        Ok(())
    }
}

type CollectionKey = (ReferenceType, Url);

/// In-memory reference store
#[derive(Debug, Default)]
pub struct MemoryReferenceStore {
    references: RwLock<HashMap<CollectionKey, Vec<Url>>>,
    activities: RwLock<HashMap<Url, Activity>>,
}

impl MemoryReferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn references(&self) -> Result<RwLockReadGuard<'_, HashMap<CollectionKey, Vec<Url>>>, StorageError> {
        self.references
            .read()
            .map_err(|_| StorageError::Database("reference store lock poisoned".into()))
    }

    fn references_mut(&self) -> Result<RwLockWriteGuard<'_, HashMap<CollectionKey, Vec<Url>>>, StorageError> {
        self.references
            .write()
            .map_err(|_| StorageError::Database("reference store lock poisoned".into()))
    }

    fn activities(&self) -> Result<RwLockReadGuard<'_, HashMap<Url, Activity>>, StorageError> {
        self.activities
            .read()
            .map_err(|_| StorageError::Database("activity store lock poisoned".into()))
    }

    /// Total size and the selected page of a collection
    fn select(
        &self,
        reference_type: ReferenceType,
        object_iri: &Url,
        options: &QueryOptions,
    ) -> Result<(u64, Vec<Url>), StorageError> {
        let references = self.references()?;
        let all = references
            .get(&(reference_type, object_iri.clone()))
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let total = all.len() as u64;

        let mut selected: Vec<Url> = match options.page_size {
            Some(page_size) => {
                let range = page_bounds(total, page_size, options.sort_order, options.page_number);
                all[range.start as usize..range.end as usize].to_vec()
            }
            None => all.to_vec(),
        };

        if options.sort_order == SortOrder::Descending {
            selected.reverse();
        }

        Ok((total, selected))
    }
}

#[async_trait]
impl ReferenceStore for MemoryReferenceStore {
    async fn add_reference(
        &self,
        reference_type: ReferenceType,
        object_iri: &Url,
        reference: &Url,
    ) -> Result<(), StorageError> {
        let mut references = self.references_mut()?;
        let collection = references
            .entry((reference_type, object_iri.clone()))
            .or_default();

        if collection.contains(reference) {
            debug!(reference_type = %reference_type, reference = %reference, "Reference already present");
            return Ok(());
        }

        collection.push(reference.clone());
        info!(
            reference_type = %reference_type,
            object_iri = %object_iri,
            reference = %reference,
            "Added reference"
        );
        Ok(())
    }

    async fn delete_reference(
        &self,
        reference_type: ReferenceType,
        object_iri: &Url,
        reference: &Url,
    ) -> Result<bool, StorageError> {
        let mut references = self.references_mut()?;
        let Some(collection) = references.get_mut(&(reference_type, object_iri.clone())) else {
            return Ok(false);
        };

        let before = collection.len();
        collection.retain(|r| r != reference);
        let removed = collection.len() != before;
        if removed {
            info!(reference_type = %reference_type, reference = %reference, "Deleted reference");
        }
        Ok(removed)
    }

    async fn has_reference(
        &self,
        reference_type: ReferenceType,
        object_iri: &Url,
        reference: &Url,
    ) -> Result<bool, StorageError> {
        Ok(self
            .references()?
            .get(&(reference_type, object_iri.clone()))
            .is_some_and(|collection| collection.contains(reference)))
    }

    async fn query_references(
        &self,
        reference_type: ReferenceType,
        object_iri: &Url,
        options: &QueryOptions,
    ) -> Result<Box<dyn Cursor<Url>>, StorageError> {
        let (total_items, items) = self.select(reference_type, object_iri, options)?;
        Ok(Box::new(MemoryCursor {
            total_items,
            items: items.into(),
            closed: false,
        }))
    }

    async fn add_activity(&self, activity: &Activity) -> Result<(), StorageError> {
        let id = activity
            .id
            .clone()
            .ok_or_else(|| StorageError::InvalidInput("activity has no id".into()))?;

        self.activities
            .write()
            .map_err(|_| StorageError::Database("activity store lock poisoned".into()))?
            .insert(id, activity.clone());
        Ok(())
    }

    async fn get_activity(&self, id: &Url) -> Result<Option<Activity>, StorageError> {
        Ok(self.activities()?.get(id).cloned())
    }

    async fn query_activities(
        &self,
        reference_type: ReferenceType,
        object_iri: &Url,
        options: &QueryOptions,
    ) -> Result<Box<dyn Cursor<Activity>>, StorageError> {
        let (total_items, ids) = self.select(reference_type, object_iri, options)?;
        let activities = self.activities()?;

        let items = ids
            .iter()
            .filter_map(|id| {
                let activity = activities.get(id).cloned();
                if activity.is_none() {
                    warn!(reference_type = %reference_type, activity_id = %id, "Referenced activity not found");
                }
                activity
            })
            .collect();

        Ok(Box::new(MemoryCursor {
            total_items,
            items,
            closed: false,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iri(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn service() -> Url {
        iri("https://node.example/services/anchor")
    }

    async fn store_with_followers(n: usize) -> MemoryReferenceStore {
        let store = MemoryReferenceStore::new();
        for i in 1..=n {
            store
                .add_reference(ReferenceType::Follower, &service(), &iri(&format!("https://f{}.example", i)))
                .await
                .unwrap();
        }
        store
    }

    fn drain(cursor: Box<dyn Cursor<Url>>) -> (u64, Vec<String>) {
        let mut guard = CursorGuard::new(cursor);
        let total = guard.total_items();
        let items = guard.take(u64::MAX).unwrap();
        guard.close().unwrap();
        (total, items.into_iter().map(|u| u.host_str().unwrap_or_default().to_string()).collect())
    }

    #[tokio::test]
    async fn test_add_reference_is_idempotent() {
        let store = MemoryReferenceStore::new();
        let follower = iri("https://f1.example");
        store.add_reference(ReferenceType::Follower, &service(), &follower).await.unwrap();
        store.add_reference(ReferenceType::Follower, &service(), &follower).await.unwrap();

        let cursor = store
            .query_references(ReferenceType::Follower, &service(), &QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(drain(cursor).0, 1);
        assert!(store.has_reference(ReferenceType::Follower, &service(), &follower).await.unwrap());
        assert!(!store.has_reference(ReferenceType::Witness, &service(), &follower).await.unwrap());
    }

    #[tokio::test]
    async fn test_ascending_buckets() {
        let store = store_with_followers(19).await;
        let size = PageSize::new(4).unwrap();

        let options = QueryOptions::new(SortOrder::Ascending).with_page_size(size);
        let (total, items) = drain(store.query_references(ReferenceType::Follower, &service(), &options).await.unwrap());
        assert_eq!(total, 19);
        assert_eq!(items, vec!["f1.example", "f2.example", "f3.example", "f4.example"]);

        let options = options.with_page_number(Some(4));
        let (_, items) = drain(store.query_references(ReferenceType::Follower, &service(), &options).await.unwrap());
        assert_eq!(items, vec!["f17.example", "f18.example", "f19.example"]);

        let options = options.with_page_number(Some(9));
        let (total, items) = drain(store.query_references(ReferenceType::Follower, &service(), &options).await.unwrap());
        assert_eq!(total, 19);
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_descending_buckets() {
        let store = store_with_followers(6).await;
        let options = QueryOptions::new(SortOrder::Descending).with_page_size(PageSize::new(4).unwrap());

        // first bucket for descending order is the highest one
        let (_, items) = drain(store.query_references(ReferenceType::Follower, &service(), &options).await.unwrap());
        assert_eq!(items, vec!["f6.example", "f5.example"]);

        let options = options.with_page_number(Some(0));
        let (_, items) = drain(store.query_references(ReferenceType::Follower, &service(), &options).await.unwrap());
        assert_eq!(items, vec!["f4.example", "f3.example", "f2.example", "f1.example"]);
    }

    #[tokio::test]
    async fn test_delete_reference() {
        let store = store_with_followers(2).await;
        assert!(store.delete_reference(ReferenceType::Follower, &service(), &iri("https://f1.example")).await.unwrap());
        assert!(!store.delete_reference(ReferenceType::Follower, &service(), &iri("https://f1.example")).await.unwrap());

        let (total, items) = drain(
            store
                .query_references(ReferenceType::Follower, &service(), &QueryOptions::default())
                .await
                .unwrap(),
        );
        assert_eq!(total, 1);
        assert_eq!(items, vec!["f2.example"]);
    }

    #[tokio::test]
    async fn test_query_activities() {
        let store = MemoryReferenceStore::new();
        let activity = Activity::new("Like", iri("https://remote.example/services/anchor"))
            .with_id(iri("https://remote.example/activities/1"))
            .with_object_iri(&iri("https://node.example/anchors/1"));

        store.add_activity(&activity).await.unwrap();
        store
            .add_reference(ReferenceType::Inbox, &service(), activity.id.as_ref().unwrap())
            .await
            .unwrap();

        let cursor = store
            .query_activities(ReferenceType::Inbox, &service(), &QueryOptions::new(SortOrder::Descending))
            .await
            .unwrap();
        let mut guard = CursorGuard::new(cursor);
        assert_eq!(guard.total_items(), 1);
        assert_eq!(guard.next().unwrap(), Some(activity));
        assert_eq!(guard.next().unwrap(), None);
    }

    #[tokio::test]
    async fn test_activity_requires_id() {
        let store = MemoryReferenceStore::new();
        let activity = Activity::new("Like", iri("https://remote.example/services/anchor"));
        assert!(matches!(store.add_activity(&activity).await, Err(StorageError::InvalidInput(_))));
    }

    #[test]
    fn test_guard_closes_on_drop() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        struct Tracked(Arc<AtomicBool>);

        impl Cursor<Url> for Tracked {
            fn total_items(&self) -> u64 {
                0
            }
            fn next(&mut self) -> Result<Option<Url>, StorageError> {
                Err(StorageError::Database("read failed".into()))
            }
            fn close(&mut self) -> Result<(), StorageError> {
                self.0.store(true, Ordering::SeqCst);
                Ok(())
            }
        }

        let closed = Arc::new(AtomicBool::new(false));
        let result = (|| {
            let mut guard = CursorGuard::new(Box::new(Tracked(closed.clone())));
            guard.take(4)
        })();

        assert!(result.is_err());
        assert!(closed.load(Ordering::SeqCst));
    }
}
