//! HTTP error classification
//!
//! Turns the last observed outcome of an exchange (a non-2xx response or a
//! transport failure) into exactly one [`crate::Error`]. Classification is a
//! pure function of status, Retry-After hint and body.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use crate::error::{Error, BILLING_URL, DASHBOARD_URL};

/// Marker the service puts in 403 bodies when the account ran out of credits
const INSUFFICIENT_CREDITS_CODE: &str = "INSUFFICIENT_CREDITS";

/// Classification of HTTP outcomes for retry logic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClassification {
    /// Client errors (4xx) - should not retry
    ClientError,
    /// 500/502/503/504 - should retry
    ServerError,
    /// Connection refused/reset - should retry
    NetworkError,
    /// Transport timeout - should retry
    Timeout,
    /// 429 - should retry, honoring Retry-After
    RateLimitError,
    /// 401/403 or missing credentials - should not retry
    AuthenticationError,
    /// Anything else - no retry
    Unknown,
}

impl ErrorClassification {
    /// Check if this outcome should be retried
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorClassification::ServerError
                | ErrorClassification::NetworkError
                | ErrorClassification::Timeout
                | ErrorClassification::RateLimitError
        )
    }
}

/// Raw failed outcome of one HTTP exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpError {
    /// HTTP status code if a response was received
    pub status_code: Option<u16>,
    /// Classification for retry logic
    pub classification: ErrorClassification,
    /// Human-readable message (transport errors only, responses use the body)
    pub message: String,
    /// Raw response body
    pub body: Option<String>,
    /// Retry-After header value in seconds, if present
    pub retry_after: Option<u64>,
}

impl HttpError {
    /// Create from a non-success reqwest Response
    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let retry_after = parse_retry_after(response.headers());
        let body = response.text().await.unwrap_or_default();

        Self {
            status_code: Some(status.as_u16()),
            classification: Self::classify_status(status),
            message: status
                .canonical_reason()
                .unwrap_or("Unknown status")
                .to_string(),
            body: Some(body),
            retry_after,
        }
    }

    /// Create from a network/request error
    pub fn from_request_error(error: reqwest::Error) -> Self {
        let classification = if error.is_timeout() {
            ErrorClassification::Timeout
        } else if error.is_connect() || error.is_request() {
            ErrorClassification::NetworkError
        } else {
            ErrorClassification::Unknown
        };

        Self {
            status_code: error.status().map(|s| s.as_u16()),
            classification,
            // without_url keeps query strings out of messages
            message: error.without_url().to_string(),
            body: None,
            retry_after: None,
        }
    }

    /// An authenticated call was attempted without a configured key
    pub fn missing_credentials() -> Self {
        Self {
            status_code: None,
            classification: ErrorClassification::AuthenticationError,
            message: "no API key configured".to_string(),
            body: None,
            retry_after: None,
        }
    }

    /// Classify HTTP status code
    pub fn classify_status(status: StatusCode) -> ErrorClassification {
        match status.as_u16() {
            401 | 403 => ErrorClassification::AuthenticationError,
            429 => ErrorClassification::RateLimitError,
            500 | 502 | 503 | 504 => ErrorClassification::ServerError,
            400..=499 => ErrorClassification::ClientError,
            _ => ErrorClassification::Unknown,
        }
    }

    /// Check if this outcome should trigger a retry
    pub fn should_retry(&self) -> bool {
        self.classification.is_retryable()
    }

    /// Get the delay the service asked for (in seconds)
    pub fn get_retry_delay(&self) -> Option<u64> {
        match self.classification {
            ErrorClassification::RateLimitError => self.retry_after,
            _ => None,
        }
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HTTP Error [{}]: {} (classification: {:?})",
            self.status_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "N/A".to_string()),
            self.message,
            self.classification
        )
    }
}

impl std::error::Error for HttpError {}

/// Hand the final outcome to the classifier
impl From<HttpError> for Error {
    fn from(http_error: HttpError) -> Self {
        match http_error.status_code {
            Some(status) => classify(
                status,
                http_error.retry_after,
                http_error.body.as_deref().unwrap_or_default(),
            ),
            None => match http_error.classification {
                ErrorClassification::Timeout => Error::Timeout {
                    message: format!("request timed out: {}", http_error.message),
                    elapsed: None,
                },
                ErrorClassification::AuthenticationError => Error::missing_api_key(),
                _ => Error::Execution {
                    message: format!("network error: {}", http_error.message),
                    status_code: None,
                    body: None,
                    execution_id: None,
                },
            },
        }
    }
}

/// Map a non-2xx status and its body to exactly one typed error.
///
/// Total over every status code: anything without a dedicated kind becomes
/// [`Error::Execution`] carrying the raw status and body.
pub fn classify(status: u16, retry_after: Option<u64>, body: &str) -> Error {
    let details = serde_json::from_str::<Value>(body).ok();
    let message = extract_message(details.as_ref(), body, status);

    match status {
        401 => Error::Authentication {
            message: format!("{}. Check your API key at {}", message, DASHBOARD_URL),
            status_code: Some(status),
        },
        402 => insufficient_credits(status, message, details.as_ref()),
        403 if has_credit_marker(details.as_ref()) => {
            insufficient_credits(status, message, details.as_ref())
        }
        403 => Error::Authentication {
            message,
            status_code: Some(status),
        },
        400 | 422 => Error::Validation {
            message,
            status_code: Some(status),
        },
        429 => Error::RateLimit {
            message,
            retry_after,
        },
        _ => Error::Execution {
            message,
            status_code: Some(status),
            body: (!body.is_empty()).then(|| body.to_string()),
            execution_id: None,
        },
    }
}

fn insufficient_credits(status: u16, message: String, details: Option<&Value>) -> Error {
    let field = |name: &str| details.and_then(|d| d.get(name)).and_then(Value::as_u64);

    Error::InsufficientCredits {
        message: format!("{}. Add credits at {}", message, BILLING_URL),
        status_code: Some(status),
        credits_needed: field("credits_needed"),
        credits_available: field("credits_available"),
    }
}

fn has_credit_marker(details: Option<&Value>) -> bool {
    details
        .and_then(|d| d.get("error_code"))
        .and_then(Value::as_str)
        .is_some_and(|code| code == INSUFFICIENT_CREDITS_CODE)
}

/// Pick the most useful message out of an error body
fn extract_message(details: Option<&Value>, body: &str, status: u16) -> String {
    if let Some(json) = details {
        for key in ["message", "detail", "error"] {
            match json.get(key) {
                Some(Value::String(s)) => return s.clone(),
                // {"error": {"message": "..."}}
                Some(Value::Object(inner)) => {
                    if let Some(Value::String(s)) = inner.get("message") {
                        return s.clone();
                    }
                }
                _ => {}
            }
        }
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }

    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status))
}

/// Parse a delta-seconds Retry-After header
pub fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
}
