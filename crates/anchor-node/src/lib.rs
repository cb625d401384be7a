//! Anchor Node Server
//!
//! The federation surface of a DID anchoring node:
//! - Paged ActivityStreams collections (followers, following, witnesses,
//!   witnessing, liked, inbox, outbox, and per-object shares and likes)
//! - A per-endpoint authorization chain: bearer token, then HTTP signature
//!   plus a follower/witness relationship check
//! - The anchor link store, which tracks processed and pending hash-links and
//!   lets the expiry sweep collect pending links that were never confirmed
//!
//! ## Collection Invariants
//!
//! 1. **Stable pages**: page ids and `prev`/`next` links depend only on the
//!    collection size, the page size, the sort order and the requested bucket
//! 2. **Convergence**: a bucket past the end is an empty page linking back to data
//! 3. **Scoped cursors**: every store cursor is released on every exit path
//!
//! ## API Endpoints
//!
//! All collection routes live under the path of the service IRI (`{base}`).
//!
//! - `GET /health` - Liveness check
//! - `GET /ready` - Readiness check with follower and witness counts
//! - `GET {base}/followers|following|witnesses|witnessing|liked` - Reference collections
//! - `GET {base}/inbox|outbox` - Activity collections, newest first
//! - `POST {base}/outbox` - Post an activity as the service
//! - `POST {base}/inbox` - Deliver an activity from a remote actor
//! - `GET {base}/{id}/shares|likes` - Announce and Like activities of an object
//! - `GET {base}/activities/{id}` - A stored activity
//! - `GET {base}/keys/{id}` - The service's public key document
//!
//! Collections take `page=true` and `page-num=N`; without `page=true` the
//! summary (total, first, last) is returned.

pub mod anchorlink;
pub mod api;
pub mod collection;
pub mod config;
pub mod keys;
pub mod relationship;
pub mod storage;

pub use anchorlink::{link_key, AnchorLinkRef, AnchorLinkStore};
pub use api::create_router;
pub use api::handlers::AppState;
pub use collection::Paginator;
pub use config::{ConfigError, NodeConfig};
pub use keys::KeyRegistry;
pub use relationship::FollowerOrWitness;
pub use storage::{
    ExpiredKeyHandler, ExpiryService, MemoryReferenceStore, MemoryStore, ReferenceStore, StorageError, TagStore,
};
#[cfg(feature = "postgres")]
pub use storage::PostgresStore;
