//! Authorization strategies for the chain

pub mod signature;
pub mod token;

pub use signature::SignatureStrategy;
pub use token::BearerTokenStrategy;
