//! Pooled HTTP session with a uniform retry policy
//!
//! One [`Session`] owns one `reqwest::Client`. Clones share the connection
//! pool, so a session can be handed to any number of concurrent callers.

use std::sync::Arc;
use std::time::Duration;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client as ReqwestClient, Method, Response};
use serde_json::Value;
use crate::config::ClientConfig;
use crate::http::auth::{AuthHandler, AuthMode, BearerAuth};
use crate::http::error::HttpError;
use crate::http::retry::{execute_with_retry, RetryPolicy};
use crate::{Error, Result, VERSION};

/// Header carrying the library version on every request
pub const CLIENT_VERSION_HEADER: &str = "x-client-version";

const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Long-lived transport shared by the dispatcher and the poller
#[derive(Clone)]
pub struct Session {
    /// Underlying pooled client
    client: ReqwestClient,
    /// Validated configuration
    config: Arc<ClientConfig>,
    /// Credential source for authenticated calls
    auth_handler: Arc<dyn AuthHandler>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.config.base_url)
            .field("timeout", &self.config.timeout)
            .field("max_retries", &self.config.max_retries())
            .field("authenticated", &self.auth_handler.has_credentials())
            .finish()
    }
}

impl Session {
    /// Create a session, validating the configuration first
    pub fn new(config: ClientConfig) -> Result<Self> {
        let auth_handler = Arc::new(BearerAuth::new(config.api_key.clone()));
        Self::with_auth_handler(config, auth_handler)
    }

    /// Create a session with a custom credential source
    pub fn with_auth_handler(config: ClientConfig, auth_handler: Arc<dyn AuthHandler>) -> Result<Self> {
        let config = config.validate()?;
        let client = ReqwestClient::builder()
            .default_headers(default_headers()?)
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .connect_timeout(config.timeout.min(MAX_CONNECT_TIMEOUT))
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .build()
            .map_err(|e| Error::configuration(format!("Failed to create HTTP client: {}", e)))?;

        tracing::debug!(
            base_url = %config.base_url,
            timeout_ms = config.timeout.as_millis() as u64,
            max_retries = config.max_retries(),
            authenticated = auth_handler.has_credentials(),
            "HTTP session created"
        );

        Ok(Self {
            client,
            config: Arc::new(config),
            auth_handler,
        })
    }

    /// Get the session configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Whether authenticated calls can be made
    pub fn is_authenticated(&self) -> bool {
        self.auth_handler.has_credentials()
    }

    /// Perform one logical exchange, retrying transient failures.
    ///
    /// Returns the 2xx response, or the last failed outcome once retries are
    /// exhausted or a non-retryable outcome is seen. Only idempotent methods
    /// are retried; a `POST` is sent exactly once. With
    /// [`AuthMode::Required`] and no key the call fails before touching the
    /// network.
    #[tracing::instrument(level = "debug", skip(self, method, body), fields(method = %method))]
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        auth: AuthMode,
    ) -> std::result::Result<Response, HttpError> {
        let mut auth_headers = HeaderMap::new();
        if auth == AuthMode::Required {
            if !self.auth_handler.has_credentials() {
                return Err(HttpError::missing_credentials());
            }
            self.auth_handler
                .apply_auth(&mut auth_headers)
                .map_err(|_| HttpError::missing_credentials())?;
        }

        let url = self.config.endpoint(path);
        let client = &self.client;

        let policy = if is_idempotent(&method) {
            self.config.retry_policy.clone()
        } else {
            tracing::debug!("Retries disabled for non-idempotent request");
            RetryPolicy {
                max_retries: 0,
                ..self.config.retry_policy.clone()
            }
        };

        execute_with_retry(
            |attempt| {
                let mut request = client
                    .request(method.clone(), url.as_str())
                    .headers(auth_headers.clone());
                if let Some(body) = body {
                    request = request.json(body);
                }

                async move {
                    tracing::debug!(attempt, "Sending request");

                    let response = request
                        .send()
                        .await
                        .map_err(HttpError::from_request_error)?;

                    let status = response.status();
                    if !status.is_success() {
                        tracing::debug!(attempt, status = status.as_u16(), "Request failed");
                        return Err(HttpError::from_response(response).await);
                    }

                    tracing::debug!(attempt, status = status.as_u16(), "Request succeeded");
                    Ok(response)
                }
            },
            policy,
        )
        .await
    }
}

/// Methods that can be repeated without duplicating side effects
fn is_idempotent(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::PUT | Method::DELETE | Method::OPTIONS
    )
}

fn default_headers() -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(
        HeaderName::from_static(CLIENT_VERSION_HEADER),
        HeaderValue::from_str(VERSION)
            .map_err(|e| Error::configuration(format!("invalid version header: {}", e)))?,
    );
    Ok(headers)
}
