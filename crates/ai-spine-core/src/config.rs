//! Client configuration
//!
//! A [`ClientConfig`] is assembled with [`ClientConfig::builder`] or read from
//! the environment, then validated once when a session is created.

use std::time::Duration;
use url::Url;
use crate::http::auth::ApiKey;
use crate::http::retry::RetryPolicy;
use crate::{Error, Result, VERSION};

/// Production endpoint used when no base URL is supplied
pub const DEFAULT_BASE_URL: &str = "https://ai-spine-api.up.railway.app";

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of retries after the first attempt
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Environment variables read by [`ClientConfig::from_env`]
pub mod env {
    pub const BASE_URL: &str = "AI_SPINE_BASE_URL";
    pub const API_KEY: &str = "AI_SPINE_API_KEY";
    pub const TIMEOUT: &str = "AI_SPINE_TIMEOUT";
    pub const MAX_RETRIES: &str = "AI_SPINE_MAX_RETRIES";
}

/// Configuration for the AI Spine client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Normalized base URL, never ending with a slash
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Optional API key; authenticated calls fail without one
    pub api_key: Option<ApiKey>,
    /// Retry policy for transient failures
    pub retry_policy: RetryPolicy,
    /// Value of the User-Agent header
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            api_key: None,
            retry_policy: RetryPolicy::new(DEFAULT_MAX_RETRIES),
            user_agent: default_user_agent(),
        }
    }
}

impl ClientConfig {
    /// Start building a configuration
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Load configuration from `AI_SPINE_*` variables, reading `.env` first
    pub fn from_env() -> Result<Self> {
        // A missing .env file is fine
        let _ = dotenv::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();

        if let Some(url) = lookup(env::BASE_URL) {
            builder = builder.base_url(url);
        }
        if let Some(key) = lookup(env::API_KEY).filter(|k| !k.trim().is_empty()) {
            builder = builder.api_key(key);
        }
        if let Some(raw) = lookup(env::TIMEOUT) {
            let secs = raw.trim().parse::<u64>().map_err(|_| {
                Error::configuration(format!("{} must be a number of seconds, got '{}'", env::TIMEOUT, raw))
            })?;
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(raw) = lookup(env::MAX_RETRIES) {
            let retries = raw.trim().parse::<u32>().map_err(|_| {
                Error::configuration(format!("{} must be a non-negative integer, got '{}'", env::MAX_RETRIES, raw))
            })?;
            builder = builder.max_retries(retries);
        }

        builder.build()
    }

    /// Check a configuration that may have been assembled field by field.
    ///
    /// Normalizes the base URL and rejects a zero timeout or a backoff cap
    /// below the backoff base. [`Session`](crate::http::session::Session)
    /// runs this on every configuration it is given.
    pub fn validate(mut self) -> Result<Self> {
        self.base_url = normalize_base_url(&self.base_url)?;

        if self.timeout.is_zero() {
            return Err(Error::configuration("timeout cannot be zero"));
        }
        if self.retry_policy.max_delay < self.retry_policy.base_delay {
            return Err(Error::configuration("max backoff must be >= backoff base"));
        }

        Ok(self)
    }

    /// Maximum retries after the first attempt
    pub fn max_retries(&self) -> u32 {
        self.retry_policy.max_retries
    }

    /// Join the base URL and an absolute API path
    pub fn endpoint(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

/// Builder for [`ClientConfig`]
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    max_retries: Option<u32>,
    api_key: Option<String>,
    backoff_base: Option<Duration>,
    max_backoff: Option<Duration>,
    user_agent: Option<String>,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Delay before the first retry; later retries double it
    pub fn backoff_base(mut self, delay: Duration) -> Self {
        self.backoff_base = Some(delay);
        self
    }

    pub fn max_backoff(mut self, delay: Duration) -> Self {
        self.max_backoff = Some(delay);
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Validate and produce the configuration
    pub fn build(self) -> Result<ClientConfig> {
        let defaults = ClientConfig::default();

        let base_url = match self.base_url {
            Some(url) => normalize_base_url(&url)?,
            None => defaults.base_url,
        };

        let timeout = self.timeout.unwrap_or(defaults.timeout);

        let api_key = self.api_key.map(ApiKey::parse).transpose()?;

        let mut retry_policy = RetryPolicy::new(self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES));
        if let Some(base) = self.backoff_base {
            retry_policy = retry_policy.with_base_delay(base);
        }
        if let Some(max) = self.max_backoff {
            retry_policy = retry_policy.with_max_delay(max);
        }

        ClientConfig {
            base_url,
            timeout,
            api_key,
            retry_policy,
            user_agent: self.user_agent.unwrap_or(defaults.user_agent),
        }
        .validate()
    }
}

/// Validate an absolute http(s) URL and strip trailing slashes
pub fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let parsed = Url::parse(trimmed)
        .map_err(|e| Error::configuration(format!("invalid base URL '{}': {}", trimmed, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::configuration(format!(
            "base URL must use http or https, got '{}'",
            parsed.scheme()
        )));
    }
    if parsed.host_str().is_none() {
        return Err(Error::configuration(format!("base URL '{}' has no host", trimmed)));
    }
    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(Error::configuration("base URL cannot carry a query or fragment"));
    }

    Ok(trimmed.trim_end_matches('/').to_string())
}

fn default_user_agent() -> String {
    format!("ai-spine-rust/{}", VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::builder().build().unwrap();
        assert_eq!(config.base_url, "https://ai-spine-api.up.railway.app");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_retries(), 3);
        assert!(config.api_key.is_none());
        assert!(config.user_agent.starts_with("ai-spine-rust/"));
    }

    #[test]
    fn test_custom_initialization() {
        let config = ClientConfig::builder()
            .api_key("sk_test_key")
            .base_url("https://custom.ai-spine.com/")
            .timeout(Duration::from_secs(60))
            .max_retries(5)
            .build()
            .unwrap();

        assert_eq!(config.base_url, "https://custom.ai-spine.com");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.max_retries(), 5);
        assert_eq!(config.api_key.unwrap().expose(), "sk_test_key");
    }

    #[test]
    fn test_invalid_base_urls() {
        for url in ["not a url", "/relative/path", "ftp://files.example.com", "https://x.com/?a=1"] {
            let err = ClientConfig::builder().base_url(url).build().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration, "{}", url);
        }
    }

    #[test]
    fn test_api_key_prefix_checked_at_build() {
        let err = ClientConfig::builder().api_key("pk_wrong").build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        assert!(ClientConfig::builder().timeout(Duration::ZERO).build().is_err());
    }

    #[test]
    fn test_endpoint_join() {
        let config = ClientConfig::builder()
            .base_url("http://localhost:8000//")
            .build()
            .unwrap();
        assert_eq!(config.endpoint("/flows"), "http://localhost:8000/flows");
        assert_eq!(config.endpoint("health"), "http://localhost:8000/health");
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (env::BASE_URL, "http://localhost:9000/"),
            (env::API_KEY, "sk_env_key"),
            (env::TIMEOUT, "5"),
            (env::MAX_RETRIES, "0"),
        ]);
        let config = ClientConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.base_url, "http://localhost:9000");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.max_retries(), 0);
        assert!(config.api_key.is_some());
    }

    #[test]
    fn test_from_lookup_rejects_bad_numbers() {
        let err = ClientConfig::from_lookup(|k| (k == env::TIMEOUT).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(env::TIMEOUT));
    }

    #[test]
    fn test_blank_env_key_means_no_key() {
        let config = ClientConfig::from_lookup(|k| (k == env::API_KEY).then(|| "  ".to_string())).unwrap();
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_validate_checks_hand_built_configs() {
        let config = ClientConfig {
            base_url: "http://localhost:8000/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap().base_url, "http://localhost:8000");

        let config = ClientConfig {
            base_url: "ftp://not-http/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::Configuration);

        let config = ClientConfig {
            timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ClientConfig {
            retry_policy: RetryPolicy::new(3)
                .with_base_delay(Duration::from_secs(10))
                .with_max_delay(Duration::from_secs(1)),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max backoff"));
    }
}
