//! Property-Based Tests for Collection Paging
//!
//! These tests verify the paging guarantees for arbitrary collection sizes:
//! 1. COVERAGE: walking `next` from the first page visits every item exactly once,
//!    in the collection's sort order
//! 2. CONVERGENCE: an out-of-range page links back to a real page within
//!    ceil(total / page_size) hops
//! 3. STABILITY: page links depend only on (total, page size, order, bucket)

use anchor_core::paging::bucket_bounds;
use anchor_core::{first_page_num, last_page_num, PageRange, PageSize, SortOrder};
use proptest::prelude::*;

/// Items of a bucket in presentation order, the way a store serves them
fn bucket_items(total: u64, page_size: PageSize, bucket: u64, order: SortOrder) -> Vec<u64> {
    let items: Vec<u64> = bucket_bounds(total, page_size, bucket).collect();
    match order {
        SortOrder::Ascending => items,
        SortOrder::Descending => items.into_iter().rev().collect(),
    }
}

fn any_order() -> impl Strategy<Value = SortOrder> {
    prop_oneof![Just(SortOrder::Ascending), Just(SortOrder::Descending)]
}

fn page_count(total: u64, page_size: PageSize) -> u64 {
    total.div_ceil(page_size.get()).max(1)
}

// =============================================================================
// COVERAGE
// =============================================================================

proptest! {
    /// Following `next` from the first page yields every item once, in order
    #[test]
    fn prop_next_walk_visits_every_item_once(
        total in 0u64..500,
        size in 1u64..40,
        order in any_order(),
    ) {
        let page_size = PageSize::new(size).unwrap();
        let mut visited = Vec::new();
        let mut bucket = Some(first_page_num(total, page_size, order));
        let mut hops = 0;

        while let Some(current) = bucket {
            let range = PageRange::compute(total, page_size, order, Some(current));
            prop_assert_eq!(range.current, current);
            visited.extend(bucket_items(total, page_size, current, order));
            bucket = range.next;

            hops += 1;
            prop_assert!(hops <= page_count(total, page_size), "walk did not terminate");
        }

        let expected: Vec<u64> = match order {
            SortOrder::Ascending => (0..total).collect(),
            SortOrder::Descending => (0..total).rev().collect(),
        };
        prop_assert_eq!(visited, expected);
    }

    /// Walking `prev` from the last page reaches the first page
    #[test]
    fn prop_prev_walk_reaches_first(
        total in 0u64..500,
        size in 1u64..40,
        order in any_order(),
    ) {
        let page_size = PageSize::new(size).unwrap();
        let first = first_page_num(total, page_size, order);
        let mut current = last_page_num(total, page_size, order);

        for _ in 0..page_count(total, page_size) {
            match PageRange::compute(total, page_size, order, Some(current)).prev {
                Some(prev) => current = prev,
                None => break,
            }
        }
        prop_assert_eq!(current, first);
    }
}

// =============================================================================
// CONVERGENCE
// =============================================================================

proptest! {
    /// An out-of-range page is empty and its links lead back to real data
    #[test]
    fn prop_out_of_range_page_converges(
        total in 1u64..500,
        size in 1u64..40,
        overshoot in 1u64..10_000,
        order in any_order(),
    ) {
        let page_size = PageSize::new(size).unwrap();
        let highest = match order {
            SortOrder::Ascending => last_page_num(total, page_size, order),
            SortOrder::Descending => first_page_num(total, page_size, order),
        };
        let requested = highest + overshoot;

        prop_assert!(bucket_items(total, page_size, requested, order).is_empty());

        let mut current = requested;
        let mut hops = 0;
        while bucket_items(total, page_size, current, order).is_empty() {
            let range = PageRange::compute(total, page_size, order, Some(current));
            current = range.prev.or(range.next).expect("out-of-range page must link somewhere");
            hops += 1;
            prop_assert!(hops <= page_count(total, page_size));
        }
    }
}

// =============================================================================
// STABILITY
// =============================================================================

proptest! {
    /// Neighbour links never point outside [0, highest bucket] for in-range pages
    #[test]
    fn prop_links_stay_in_range(
        total in 0u64..500,
        size in 1u64..40,
        order in any_order(),
        pick in 0u64..1000,
    ) {
        let page_size = PageSize::new(size).unwrap();
        let highest = first_page_num(total, page_size, order)
            .max(last_page_num(total, page_size, order));
        let bucket = pick % (highest + 1);

        let range = PageRange::compute(total, page_size, order, Some(bucket));
        for link in [range.prev, range.next].into_iter().flatten() {
            prop_assert!(link <= highest);
            prop_assert_ne!(link, bucket);
        }
        prop_assert_eq!(range, PageRange::compute(total, page_size, order, Some(bucket)));
    }
}
