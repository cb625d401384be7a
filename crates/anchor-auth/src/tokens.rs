//! Auth-token definitions resolved to bearer secrets

use regex::Regex;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::{AuthError, Result};
use crate::types::{AccessMode, AuthTokenDef};

/// A token definition with its endpoint expression compiled
#[derive(Debug)]
struct CompiledDef {
    expression: Regex,
    read_tokens: Vec<String>,
    write_tokens: Vec<String>,
}

/// Resolves which bearer secrets an (endpoint, access mode) pair requires.
///
/// Built once at startup and read-only afterwards. Definitions are matched in
/// order; the first whose expression matches the endpoint decides. An endpoint
/// matched by no definition, or by one listing no tokens for the access mode,
/// requires no token.
#[derive(Debug)]
pub struct AuthTokenManager {
    defs: Vec<CompiledDef>,
    /// token id -> secret
    tokens: HashMap<String, String>,
}

impl AuthTokenManager {
    /// Build a manager from definitions and a token-id → secret table.
    ///
    /// Fails when an expression does not compile, a definition names a token id
    /// missing from the table, or a secret is empty. Any of these would silently
    /// widen access, so callers treat the error as fatal.
    pub fn new(defs: Vec<AuthTokenDef>, tokens: HashMap<String, String>) -> Result<Self> {
        if let Some((id, _)) = tokens.iter().find(|(_, secret)| secret.is_empty()) {
            return Err(AuthError::InvalidConfig(format!("token '{}' has an empty secret", id)));
        }

        let mut compiled = Vec::with_capacity(defs.len());
        for def in defs {
            let expression = Regex::new(&def.endpoint_expression)?;

            for id in def.read_tokens.iter().chain(def.write_tokens.iter()) {
                if !tokens.contains_key(id) {
                    return Err(AuthError::InvalidConfig(format!(
                        "endpoint '{}' references undefined token '{}'",
                        def.endpoint_expression, id
                    )));
                }
            }

            compiled.push(CompiledDef {
                expression,
                read_tokens: def.read_tokens,
                write_tokens: def.write_tokens,
            });
        }

        info!(definitions = compiled.len(), tokens = tokens.len(), "Auth token manager initialized");

        Ok(Self {
            defs: compiled,
            tokens,
        })
    }

    /// A manager with no definitions: every endpoint is open
    pub fn open() -> Self {
        Self {
            defs: Vec::new(),
            tokens: HashMap::new(),
        }
    }

    /// Token ids required for the endpoint and access mode
    pub fn required_tokens(&self, endpoint: &str, mode: AccessMode) -> &[String] {
        let Some(def) = self.defs.iter().find(|d| d.expression.is_match(endpoint)) else {
            debug!(endpoint = %endpoint, mode = %mode, "No token definition matches endpoint");
            return &[];
        };

        match mode {
            AccessMode::Read => &def.read_tokens,
            AccessMode::Write => &def.write_tokens,
        }
    }

    /// Secrets of the tokens required for the endpoint and access mode
    pub fn resolve(&self, endpoint: &str, mode: AccessMode) -> Vec<String> {
        self.required_tokens(endpoint, mode)
            .iter()
            .filter_map(|id| self.tokens.get(id).cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secrets() -> HashMap<String, String> {
        HashMap::from([
            ("admin".to_string(), "ADMIN_SECRET".to_string()),
            ("read".to_string(), "READ_SECRET".to_string()),
        ])
    }

    fn defs() -> Vec<AuthTokenDef> {
        vec![
            AuthTokenDef::new("^/services/anchor/outbox").with_read(&["read", "admin"]).with_write(&["admin"]),
            AuthTokenDef::new("^/services/anchor/followers").with_write(&["admin"]),
            AuthTokenDef::new("^/services/anchor/.*").with_read(&["read"]),
        ]
    }

    #[test]
    fn test_first_matching_definition_wins() {
        let manager = AuthTokenManager::new(defs(), secrets()).unwrap();

        assert_eq!(
            manager.resolve("/services/anchor/outbox", AccessMode::Read),
            vec!["READ_SECRET", "ADMIN_SECRET"]
        );
        assert_eq!(manager.resolve("/services/anchor/outbox", AccessMode::Write), vec!["ADMIN_SECRET"]);
        // followers definition lists no read tokens, so reads are open
        assert!(manager.resolve("/services/anchor/followers", AccessMode::Read).is_empty());
        assert_eq!(manager.resolve("/services/anchor/witnesses", AccessMode::Read), vec!["READ_SECRET"]);
    }

    #[test]
    fn test_unmatched_endpoint_is_open() {
        let manager = AuthTokenManager::new(defs(), secrets()).unwrap();
        assert!(manager.required_tokens("/health", AccessMode::Read).is_empty());
        assert!(AuthTokenManager::open().resolve("/anything", AccessMode::Write).is_empty());
    }

    #[test]
    fn test_invalid_expression_is_config_error() {
        let result = AuthTokenManager::new(vec![AuthTokenDef::new("(unclosed")], secrets());
        assert!(matches!(result, Err(AuthError::InvalidConfig(_))));
    }

    #[test]
    fn test_undefined_token_is_config_error() {
        let result = AuthTokenManager::new(
            vec![AuthTokenDef::new("^/x").with_read(&["missing"])],
            secrets(),
        );
        assert!(matches!(result, Err(AuthError::InvalidConfig(_))));
    }

    #[test]
    fn test_empty_secret_is_config_error() {
        let tokens = HashMap::from([("admin".to_string(), String::new())]);
        assert!(matches!(
            AuthTokenManager::new(Vec::new(), tokens),
            Err(AuthError::InvalidConfig(_))
        ));
    }
}
