//! Anchor Authorization
//!
//! Decides whether an inbound request may read or write a federation collection.
//!
//! ## Architecture
//!
//! Authorization is an ordered chain of strategies. Each strategy returns
//! allow, deny or inconclusive; the first decisive answer wins and an exhausted
//! chain denies:
//!
//! 1. **Bearer token**: `Authorization: Bearer <token>` compared in constant time
//!    against the tokens configured for the endpoint. A match (or an endpoint that
//!    requires no token) authorizes the request as the local service actor.
//! 2. **HTTP signature**: the request's `Signature` header is verified against the
//!    signer's public key, then the signing actor must pass a relationship check
//!    (by default: be a follower or witness of the service).
//!
//! Without a signature verifier configured, a request that fails the token check
//! is denied.
//!
//! ## Usage
//!
//! ```ignore
//! use anchor_auth::{AuthHandler, AuthTokenManager};
//!
//! let tokens = AuthTokenManager::new(defs, secrets)?;
//! let handler = AuthHandler::builder("/services/anchor/followers", Method::GET, service_iri)
//!     .tokens(&tokens)
//!     .signature_verifier(verifier)
//!     .relationship(relationship)
//!     .build();
//!
//! match handler.authorize(&AuthRequest::new(&method, &uri, &headers)).await? {
//!     Authorization::Authorized(actor) => { /* serve */ }
//!     Authorization::Unauthorized => { /* 401 */ }
//! }
//! ```

pub mod chain;
pub mod error;
pub mod handler;
pub mod httpsig;
pub mod keys;
pub mod relationship;
pub mod strategies;
pub mod tokens;
pub mod types;

pub use chain::{AuthChain, AuthChainBuilder, AuthStrategy};
pub use error::{AuthError, Result};
pub use handler::{AuthHandler, AuthHandlerBuilder};
pub use httpsig::{HttpSignatureVerifier, HttpSigner, SignatureVerifier};
pub use keys::{ActorKey, KeyResolver, PublicKeyDocument, RemoteKeyResolver};
pub use relationship::{ActorRelationship, AnyActor};
pub use tokens::AuthTokenManager;
pub use types::{AccessMode, AuthDecision, AuthRequest, AuthTokenDef, Authorization};
