//! Node configuration from environment variables

use anchor_auth::AuthTokenDef;
use anchor_core::PageSize;
use base64::{engine::general_purpose::STANDARD, Engine};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::Level;
use url::Url;

use crate::anchorlink::DEFAULT_PENDING_LIFESPAN_SECS;

/// Invalid configuration; fatal at startup
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid value for {variable}: {reason}")]
pub struct ConfigError {
    pub variable: String,
    pub reason: String,
}

impl ConfigError {
    fn new(variable: &str, reason: impl Into<String>) -> Self {
        Self {
            variable: variable.to_string(),
            reason: reason.into(),
        }
    }
}

/// Node configuration
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub port: u16,
    pub log_level: Level,
    /// This node's service actor; its path is the HTTP base path
    pub service_iri: Url,
    pub page_size: PageSize,
    /// Require signing actors to be followers or witnesses, and activity
    /// actors to match the authenticated actor
    pub verify_actor_in_signature: bool,
    pub http_signatures_enabled: bool,
    pub signature_max_skew: chrono::Duration,
    pub auth_token_defs: Vec<AuthTokenDef>,
    /// token id -> secret
    pub auth_tokens: HashMap<String, String>,
    pub pending_link_lifespan: chrono::Duration,
    pub expiry_interval: Duration,
    /// Ed25519 seed of the service key; generated when absent
    pub signing_key_seed: Option<[u8; 32]>,
    /// Fetch unknown signing keys from their key id URL
    pub remote_keys: bool,
    pub database_url: Option<String>,
}

impl NodeConfig {
    /// Defaults for a node serving `service_iri`
    pub fn new(service_iri: Url) -> Self {
        Self {
            port: 8080,
            log_level: Level::INFO,
            service_iri,
            page_size: PageSize::DEFAULT,
            verify_actor_in_signature: true,
            http_signatures_enabled: true,
            signature_max_skew: chrono::Duration::seconds(300),
            auth_token_defs: Vec::new(),
            auth_tokens: HashMap::new(),
            pending_link_lifespan: chrono::Duration::seconds(DEFAULT_PENDING_LIFESPAN_SECS),
            expiry_interval: Duration::from_secs(60),
            signing_key_seed: None,
            remote_keys: true,
            database_url: None,
        }
    }

    /// Read the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port: u16 = parse_or(&get, "ANCHOR_NODE_PORT", 8080)?;

        let service_iri = match get("ANCHOR_NODE_SERVICE_IRI") {
            Some(raw) => Url::parse(raw.trim())
                .map_err(|e| ConfigError::new("ANCHOR_NODE_SERVICE_IRI", e.to_string()))?,
            None => Url::parse(&format!("http://localhost:{}/services/anchor", port))
                .map_err(|e| ConfigError::new("ANCHOR_NODE_SERVICE_IRI", e.to_string()))?,
        };
        if service_iri.cannot_be_a_base() {
            return Err(ConfigError::new("ANCHOR_NODE_SERVICE_IRI", "must be a hierarchical URL"));
        }

        let mut config = Self::new(service_iri);
        config.port = port;

        if let Some(raw) = get("ANCHOR_NODE_LOG_LEVEL") {
            config.log_level = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::new("ANCHOR_NODE_LOG_LEVEL", format!("unknown level '{}'", raw)))?;
        }

        let page_size: u64 = parse_or(&get, "ANCHOR_NODE_PAGE_SIZE", PageSize::DEFAULT.get())?;
        config.page_size =
            PageSize::new(page_size).map_err(|e| ConfigError::new("ANCHOR_NODE_PAGE_SIZE", e.to_string()))?;

        config.verify_actor_in_signature = parse_or(&get, "ANCHOR_NODE_VERIFY_ACTOR_IN_SIGNATURE", true)?;
        config.http_signatures_enabled = parse_or(&get, "ANCHOR_NODE_HTTP_SIGNATURES_ENABLED", true)?;
        config.remote_keys = parse_or(&get, "ANCHOR_NODE_REMOTE_KEYS", true)?;

        let skew: u32 = parse_or(&get, "ANCHOR_NODE_SIGNATURE_MAX_SKEW_SECS", 300)?;
        config.signature_max_skew = chrono::Duration::seconds(i64::from(skew));

        let lifespan: u32 = parse_or(
            &get,
            "ANCHOR_NODE_PENDING_LINK_LIFESPAN_SECS",
            DEFAULT_PENDING_LIFESPAN_SECS as u32,
        )?;
        config.pending_link_lifespan = chrono::Duration::seconds(i64::from(lifespan));

        let interval: u64 = parse_or(&get, "ANCHOR_NODE_EXPIRY_INTERVAL_SECS", 60)?;
        if interval == 0 {
            return Err(ConfigError::new("ANCHOR_NODE_EXPIRY_INTERVAL_SECS", "must be at least 1"));
        }
        config.expiry_interval = Duration::from_secs(interval);

        if let Some(raw) = get("ANCHOR_NODE_AUTH_TOKENS_DEF") {
            config.auth_token_defs = serde_json::from_str(&raw)
                .map_err(|e| ConfigError::new("ANCHOR_NODE_AUTH_TOKENS_DEF", e.to_string()))?;
        }

        if let Some(raw) = get("ANCHOR_NODE_AUTH_TOKENS") {
            config.auth_tokens = parse_tokens(&raw)?;
        }

        if let Some(raw) = get("ANCHOR_NODE_SIGNING_KEY") {
            config.signing_key_seed = Some(parse_seed(&raw)?);
        }

        config.database_url = get("ANCHOR_NODE_DATABASE_URL");

        Ok(config)
    }

    /// HTTP base path derived from the service IRI, without a trailing slash
    pub fn base_path(&self) -> String {
        self.service_iri.path().trim_end_matches('/').to_string()
    }
}

fn parse_or<T, G>(get: &G, name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::new(name, format!("'{}': {}", raw, e))),
        None => Ok(default),
    }
}

/// `id=secret` pairs separated by commas
fn parse_tokens(raw: &str) -> Result<HashMap<String, String>, ConfigError> {
    let mut tokens = HashMap::new();
    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (id, secret) = pair
            .split_once('=')
            .ok_or_else(|| ConfigError::new("ANCHOR_NODE_AUTH_TOKENS", format!("expected id=secret, got '{}'", pair)))?;
        let id = id.trim();
        if id.is_empty() {
            return Err(ConfigError::new("ANCHOR_NODE_AUTH_TOKENS", "empty token id"));
        }
        tokens.insert(id.to_string(), secret.trim().to_string());
    }
    Ok(tokens)
}

fn parse_seed(raw: &str) -> Result<[u8; 32], ConfigError> {
    let bytes = STANDARD
        .decode(raw.trim())
        .map_err(|e| ConfigError::new("ANCHOR_NODE_SIGNING_KEY", format!("invalid base64: {}", e)))?;
    bytes.as_slice().try_into().map_err(|_| {
        ConfigError::new(
            "ANCHOR_NODE_SIGNING_KEY",
            format!("expected 32 bytes, got {}", bytes.len()),
        )
    })
}
