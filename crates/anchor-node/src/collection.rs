//! Collection and page documents over the reference store
//!
//! The [`Paginator`] binds the bucket arithmetic of `anchor_core::paging` to a
//! [`ReferenceStore`]: it reads the total size of a collection, slices out the
//! requested bucket and wraps the entries in the collection's fixed shape.

use anchor_core::{
    first_page_num, last_page_num, page_url, Activity, CollectionItem, CollectionPage, CollectionSpec,
    CollectionSummary, ItemKind, PageRange, PageSize,
};
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::storage::{CursorGuard, QueryOptions, ReferenceStore, StorageError};

/// Builds collection summaries and pages
#[derive(Debug, Clone)]
pub struct Paginator {
    store: Arc<dyn ReferenceStore>,
    page_size: PageSize,
}

impl Paginator {
    pub fn new(store: Arc<dyn ReferenceStore>, page_size: PageSize) -> Self {
        Self { store, page_size }
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    /// Current size of a collection
    pub async fn total_items(&self, spec: CollectionSpec, object_iri: &Url) -> Result<u64, StorageError> {
        let options = QueryOptions::new(spec.sort_order).with_page_size(self.page_size);
        let total_items = match spec.items {
            ItemKind::Reference => {
                let cursor = CursorGuard::new(
                    self.store
                        .query_references(spec.reference_type, object_iri, &options)
                        .await?,
                );
                let total = cursor.total_items();
                cursor.close()?;
                total
            }
            ItemKind::Activity => {
                let cursor = CursorGuard::new(
                    self.store
                        .query_activities(spec.reference_type, object_iri, &options)
                        .await?,
                );
                let total = cursor.total_items();
                cursor.close()?;
                total
            }
        };
        Ok(total_items)
    }

    /// Non-paged view: total size and the first / last page links, no items
    pub async fn summary(
        &self,
        spec: CollectionSpec,
        object_iri: &Url,
        collection_id: &Url,
    ) -> Result<CollectionSummary, StorageError> {
        let total_items = self.total_items(spec, object_iri).await?;

        let first = first_page_num(total_items, self.page_size, spec.sort_order);
        let last = last_page_num(total_items, self.page_size, spec.sort_order);

        Ok(CollectionSummary::new(
            spec.shape,
            collection_id.clone(),
            total_items,
            page_url(collection_id, first),
            page_url(collection_id, last),
        ))
    }

    /// One page; `page_num` of `None` serves the first page for the sort order.
    ///
    /// A bucket outside the collection yields an empty page whose links lead
    /// back toward real data.
    pub async fn page(
        &self,
        spec: CollectionSpec,
        object_iri: &Url,
        collection_id: &Url,
        page_num: Option<u64>,
    ) -> Result<CollectionPage, StorageError> {
        let options = QueryOptions::new(spec.sort_order)
            .with_page_size(self.page_size)
            .with_page_number(page_num);

        let (total_items, entries) = match spec.items {
            ItemKind::Reference => {
                let mut cursor = CursorGuard::new(
                    self.store
                        .query_references(spec.reference_type, object_iri, &options)
                        .await?,
                );
                let items = cursor.take(self.page_size.get())?;
                let total = cursor.total_items();
                cursor.close()?;
                (total, items.into_iter().map(CollectionItem::Iri).collect::<Vec<_>>())
            }
            ItemKind::Activity => {
                let mut cursor = CursorGuard::new(
                    self.store
                        .query_activities(spec.reference_type, object_iri, &options)
                        .await?,
                );
                let items: Vec<Activity> = cursor.take(self.page_size.get())?;
                let total = cursor.total_items();
                cursor.close()?;
                (
                    total,
                    items
                        .into_iter()
                        .map(|a| CollectionItem::Activity(Box::new(a)))
                        .collect::<Vec<_>>(),
                )
            }
        };

        let range = PageRange::compute(total_items, self.page_size, spec.sort_order, page_num);
        debug!(
            collection = %collection_id,
            total_items,
            page = range.current,
            items = entries.len(),
            "Serving collection page"
        );

        Ok(CollectionPage::new(
            spec.shape,
            page_url(collection_id, range.current),
            collection_id.clone(),
            total_items,
            entries,
        )
        .with_links(
            range.prev.map(|p| page_url(collection_id, p)),
            range.next.map(|n| page_url(collection_id, n)),
        ))
    }
}
