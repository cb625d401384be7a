//! Key management for the node's service actor

pub mod registry;

pub use registry::KeyRegistry;
