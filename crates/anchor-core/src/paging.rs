//! Bucket arithmetic for paged collections
//!
//! A collection of `total` items is split into buckets of `page_size` items by
//! insertion index (`bucket = index / page_size`). Which bucket is the *first* page
//! depends on the sort order: bucket 0 when ascending, the highest bucket when
//! descending. Everything here is a pure function of
//! (total, page size, sort order, requested bucket), so page links are always
//! re-derivable and carry no state.

use std::ops::Range;

use url::Url;

use crate::error::{CoreError, Result};
use crate::types::SortOrder;

/// Number of items per page, always at least one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageSize(u64);

impl PageSize {
    /// Page size used when none is configured
    pub const DEFAULT: PageSize = PageSize(50);

    /// Create a page size, rejecting zero
    pub fn new(size: u64) -> Result<Self> {
        if size == 0 {
            return Err(CoreError::InvalidPageSize(size));
        }
        Ok(Self(size))
    }

    /// The raw size
    pub fn get(self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for PageSize {
    type Error = CoreError;

    fn try_from(size: u64) -> Result<Self> {
        Self::new(size)
    }
}

/// Highest bucket index that holds items. An empty collection still has bucket 0.
fn highest_bucket(total_items: u64, page_size: PageSize) -> u64 {
    if total_items == 0 {
        0
    } else {
        (total_items - 1) / page_size.get()
    }
}

/// Bucket number of the first page for the given order
pub fn first_page_num(total_items: u64, page_size: PageSize, order: SortOrder) -> u64 {
    match order {
        SortOrder::Ascending => 0,
        SortOrder::Descending => highest_bucket(total_items, page_size),
    }
}

/// Bucket number of the last page for the given order
pub fn last_page_num(total_items: u64, page_size: PageSize, order: SortOrder) -> u64 {
    match order {
        SortOrder::Ascending => highest_bucket(total_items, page_size),
        SortOrder::Descending => 0,
    }
}

/// Insertion-index range covered by a bucket, clipped to the collection.
///
/// A bucket past the end yields an empty range.
pub fn bucket_bounds(total_items: u64, page_size: PageSize, bucket: u64) -> Range<u64> {
    let start = bucket.saturating_mul(page_size.get()).min(total_items);
    let end = start.saturating_add(page_size.get()).min(total_items);
    start..end
}

/// Index range of a requested bucket, or of the first bucket for `order` when
/// none is requested
pub fn page_bounds(
    total_items: u64,
    page_size: PageSize,
    order: SortOrder,
    requested: Option<u64>,
) -> Range<u64> {
    let bucket = requested.unwrap_or_else(|| first_page_num(total_items, page_size, order));
    bucket_bounds(total_items, page_size, bucket)
}

/// The current bucket of a page request and its neighbours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    /// Bucket being served
    pub current: u64,
    /// Bucket linked as `prev`, if any
    pub prev: Option<u64>,
    /// Bucket linked as `next`, if any
    pub next: Option<u64>,
}

impl PageRange {
    /// Compute the page range for a request.
    ///
    /// `requested` is the `page-num` of the request; `None` selects the first page.
    /// A bucket beyond the available range is not an error: its links point back
    /// toward real data (`prev` to the last page when ascending, `next` to the first
    /// page when descending).
    pub fn compute(
        total_items: u64,
        page_size: PageSize,
        order: SortOrder,
        requested: Option<u64>,
    ) -> Self {
        let first = first_page_num(total_items, page_size, order);
        let last = last_page_num(total_items, page_size, order);
        let current = requested.unwrap_or(first);

        match order {
            SortOrder::Ascending => {
                let next = (current < last).then(|| current + 1);
                let prev = if current > last {
                    Some(last)
                } else {
                    current.checked_sub(1)
                };
                Self { current, prev, next }
            }
            SortOrder::Descending => {
                let next = if current > first {
                    Some(first)
                } else {
                    current.checked_sub(1)
                };
                let prev = (current < first).then(|| current + 1);
                Self { current, prev, next }
            }
        }
    }
}

/// URL of a page of the collection identified by `collection_id`
pub fn page_url(collection_id: &Url, page_num: u64) -> Url {
    let mut url = collection_id.clone();
    url.set_query(None);
    url.query_pairs_mut()
        .append_pair("page", "true")
        .append_pair("page-num", &page_num.to_string());
    url
}
