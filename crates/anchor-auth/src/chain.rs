//! Authorization chain - evaluates strategies in order

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::types::{AuthDecision, AuthRequest, Authorization};

/// A single way of authorizing a request
///
/// A strategy answers [`AuthDecision::Allow`] or [`AuthDecision::Deny`] when it
/// can decide, and [`AuthDecision::Inconclusive`] to defer to the next strategy.
/// Errors mean the request could not be evaluated at all and abort the chain.
#[async_trait]
pub trait AuthStrategy: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Evaluate a request
    async fn evaluate(&self, request: &AuthRequest<'_>) -> Result<AuthDecision>;
}

/// Ordered list of strategies; the first decisive answer wins
#[derive(Clone, Default)]
pub struct AuthChain {
    strategies: Vec<Arc<dyn AuthStrategy>>,
}

impl AuthChain {
    /// Create an empty chain (denies everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Start building a chain
    pub fn builder() -> AuthChainBuilder {
        AuthChainBuilder::default()
    }

    /// Append a strategy
    pub fn register_strategy<S: AuthStrategy + 'static>(&mut self, strategy: S) {
        debug!(strategy = strategy.name(), position = self.strategies.len(), "Registered auth strategy");
        self.strategies.push(Arc::new(strategy));
    }

    /// Names of the registered strategies, in evaluation order
    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Run the chain against a request
    pub async fn authorize(&self, request: &AuthRequest<'_>) -> Result<Authorization> {
        for strategy in &self.strategies {
            match strategy.evaluate(request).await? {
                AuthDecision::Allow(actor) => {
                    debug!(strategy = strategy.name(), actor = %actor, "Request authorized");
                    return Ok(Authorization::Authorized(actor));
                }
                AuthDecision::Deny => {
                    debug!(strategy = strategy.name(), "Request denied");
                    return Ok(Authorization::Unauthorized);
                }
                AuthDecision::Inconclusive => continue,
            }
        }

        debug!("No strategy authorized the request");
        Ok(Authorization::Unauthorized)
    }
}

impl std::fmt::Debug for AuthChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthChain")
            .field("strategies", &self.strategy_names())
            .finish()
    }
}

/// Builder for an [`AuthChain`]
#[derive(Default)]
pub struct AuthChainBuilder {
    chain: AuthChain,
}

impl AuthChainBuilder {
    /// Append a strategy
    pub fn with_strategy<S: AuthStrategy + 'static>(mut self, strategy: S) -> Self {
        self.chain.register_strategy(strategy);
        self
    }

    /// Build the chain
    pub fn build(self) -> AuthChain {
        self.chain
    }
}
