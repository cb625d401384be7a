//! Hash-link parsing
//!
//! A hash-link has the form `hl:<resource-hash>[:<metadata>]`. The resource hash
//! is the multibase-encoded content hash of the anchored resource; the optional
//! metadata segment encodes replica locations and is carried through opaquely.

use url::Url;

use crate::error::{CoreError, Result};

const SCHEME: &str = "hl";

/// Whether `hash` is a non-empty multibase (base64url or base58) resource hash
pub fn is_resource_hash(hash: &str) -> bool {
    !hash.is_empty() && hash.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// A parsed hash-link
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HashLink {
    resource_hash: String,
    metadata: Option<String>,
}

impl HashLink {
    /// Parse a hash-link string
    pub fn parse(link: &str) -> Result<Self> {
        let invalid = |reason: &str| CoreError::InvalidHashLink {
            link: link.to_string(),
            reason: reason.to_string(),
        };

        let rest = link
            .strip_prefix(SCHEME)
            .and_then(|r| r.strip_prefix(':'))
            .ok_or_else(|| invalid("missing 'hl:' scheme"))?;

        let (resource_hash, metadata) = match rest.split_once(':') {
            Some((hash, meta)) => (hash, Some(meta)),
            None => (rest, None),
        };

        if resource_hash.is_empty() {
            return Err(invalid("empty resource hash"));
        }
        if !is_resource_hash(resource_hash) {
            return Err(invalid("resource hash is not multibase encoded"));
        }
        if metadata.is_some_and(str::is_empty) {
            return Err(invalid("empty metadata segment"));
        }

        Ok(Self {
            resource_hash: resource_hash.to_string(),
            metadata: metadata.map(str::to_string),
        })
    }

    /// Parse a hash-link given as a URL
    pub fn from_url(url: &Url) -> Result<Self> {
        Self::parse(url.as_str())
    }

    /// Content hash of the anchored resource
    pub fn resource_hash(&self) -> &str {
        &self.resource_hash
    }

    /// Opaque metadata segment, if present
    pub fn metadata(&self) -> Option<&str> {
        self.metadata.as_deref()
    }
}

impl std::fmt::Display for HashLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.metadata {
            Some(meta) => write!(f, "{}:{}:{}", SCHEME, self.resource_hash, meta),
            None => write!(f, "{}:{}", SCHEME, self.resource_hash),
        }
    }
}

impl std::str::FromStr for HashLink {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
