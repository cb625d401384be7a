//! # Anchor Core
//!
//! I/O-free building blocks for the federation surface of an anchoring node.
//!
//! ## Key Concepts
//!
//! - **Reference collection**: the set of IRIs (or activities) of one
//!   [`ReferenceType`] attached to an object IRI, e.g. the followers of a service
//! - **Bucket**: the zero-based index of a fixed-size page over a collection; the
//!   first and last bucket depend on the collection's [`SortOrder`]
//! - **Hash-link**: an `hl:` URL carrying the content hash of an anchored resource
//!
//! ## Collection Invariants
//!
//! 1. **Stable identity**: a page's `id`, `prev` and `next` are derived only from
//!    (total items, page size, sort order, requested bucket)
//! 2. **Fixed shape**: ordered vs. unordered presentation is a function of the
//!    reference type alone
//! 3. **Convergence**: an out-of-range bucket yields an empty page whose links lead
//!    back to real data

pub mod error;
pub mod hashlink;
pub mod paging;
pub mod types;
pub mod vocab;

pub use error::{CoreError, Result};
pub use hashlink::{is_resource_hash, HashLink};
pub use paging::{bucket_bounds, first_page_num, last_page_num, page_bounds, page_url, PageRange, PageSize};
pub use types::{AnchorLinkStatus, CollectionShape, CollectionSpec, ItemKind, ReferenceType, SortOrder};
pub use vocab::{activity_type, child_iri, Activity, CollectionItem, CollectionKind, CollectionPage, CollectionSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
