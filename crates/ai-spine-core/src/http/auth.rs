//! Authentication handling for the AI Spine API
//!
//! Authenticated endpoints take a bearer token; API-key management endpoints
//! are called without one. The key itself is wrapped in [`ApiKey`] so it
//! cannot leak through `Debug` or `Display`.

use std::fmt;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use crate::{Error, Result};

/// Literal prefix every AI Spine API key carries
pub const API_KEY_PREFIX: &str = "sk_";

/// Whether a request carries the bearer credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Send `Authorization: Bearer <key>`; fail fast if no key is configured
    Required,
    /// Send no credential
    None,
}

/// Validated API key
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Validate and wrap a raw key
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Err(Error::configuration("API key is required"));
        }
        if !trimmed.starts_with(API_KEY_PREFIX) || trimmed.len() == API_KEY_PREFIX.len() {
            return Err(Error::configuration(format!(
                "API key should start with '{}'",
                API_KEY_PREFIX
            )));
        }

        if !trimmed.chars().all(|c| c.is_ascii_graphic()) {
            return Err(Error::configuration("API key contains invalid characters"));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// The raw secret, for building the Authorization header only
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Short form that is safe to log
    pub fn redacted(&self) -> String {
        redact(&self.0)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApiKey").field(&self.redacted()).finish()
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

/// Keep at most the first seven characters of a secret
pub(crate) fn redact(secret: &str) -> String {
    let visible: String = secret.chars().take(7).collect();
    format!("{}…", visible)
}

/// Trait for applying credentials to outgoing requests
pub trait AuthHandler: Send + Sync {
    /// Apply authentication to request headers
    fn apply_auth(&self, headers: &mut HeaderMap) -> Result<()>;

    /// Whether credentials are available at all
    fn has_credentials(&self) -> bool;
}

/// Bearer token handler
#[derive(Debug, Clone, Default)]
pub struct BearerAuth {
    api_key: Option<ApiKey>,
}

impl BearerAuth {
    /// Create with an optional API key
    pub fn new(api_key: Option<ApiKey>) -> Self {
        Self { api_key }
    }
}

impl AuthHandler for BearerAuth {
    fn apply_auth(&self, headers: &mut HeaderMap) -> Result<()> {
        let key = self.api_key.as_ref().ok_or_else(Error::missing_api_key)?;

        let mut value = HeaderValue::from_str(&format!("Bearer {}", key.expose()))
            .map_err(|_| Error::configuration("API key contains invalid header characters"))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
        Ok(())
    }

    fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }
}
