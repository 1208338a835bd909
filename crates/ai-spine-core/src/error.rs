//! Error types for the AI Spine client core
//!
//! Every failure the client can surface is one variant of [`Error`]. The set
//! is closed so callers can branch on the kind exhaustively; the HTTP layer
//! builds these values at the boundary and nothing mutates them afterwards.

use std::fmt;
use std::time::Duration;
use thiserror::Error;
use serde::{Deserialize, Serialize};

/// Where users manage their API keys
pub const DASHBOARD_URL: &str = "https://ai-spine.com/dashboard";

/// Where users top up their credit balance
pub const BILLING_URL: &str = "https://ai-spine.com/billing";

/// Main error type for AI Spine operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Invalid client configuration (base URL, API key format, timeouts)
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
    },

    /// Rejected or missing credentials
    #[error("Authentication error: {message}")]
    Authentication {
        message: String,
        status_code: Option<u16>,
    },

    /// Malformed request payload, caught locally or by the service
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        status_code: Option<u16>,
    },

    /// The account cannot pay for the requested work
    #[error("Insufficient credits: {message}")]
    InsufficientCredits {
        message: String,
        status_code: Option<u16>,
        credits_needed: Option<u64>,
        credits_available: Option<u64>,
    },

    /// Still rate limited after all retries
    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        message: String,
        /// Seconds the service asked us to wait
        retry_after: Option<u64>,
    },

    /// Execution-specific failures and every status without a dedicated kind
    #[error("Execution error: {message}")]
    Execution {
        message: String,
        status_code: Option<u16>,
        /// Raw response body, kept for diagnostics
        body: Option<String>,
        execution_id: Option<String>,
    },

    /// Local wait budget exceeded, or transport timeout after retries
    #[error("Timeout: {message}")]
    Timeout {
        message: String,
        elapsed: Option<Duration>,
    },

    /// A 2xx response whose body could not be decoded
    #[error("Response format error: {message}")]
    ResponseFormat {
        message: String,
        status_code: Option<u16>,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Discriminant of [`Error`], handy for matching and metrics labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    Authentication,
    Validation,
    InsufficientCredits,
    RateLimit,
    Execution,
    Timeout,
    ResponseFormat,
}

impl Error {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration { message: message.into() }
    }

    /// Create a locally detected validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
            status_code: None,
        }
    }

    /// Authentication failure raised before any request was sent
    pub fn missing_api_key() -> Self {
        Error::Authentication {
            message: format!(
                "This operation requires an API key. Get one at {}",
                DASHBOARD_URL
            ),
            status_code: None,
        }
    }

    /// Get the kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration { .. } => ErrorKind::Configuration,
            Error::Authentication { .. } => ErrorKind::Authentication,
            Error::Validation { .. } => ErrorKind::Validation,
            Error::InsufficientCredits { .. } => ErrorKind::InsufficientCredits,
            Error::RateLimit { .. } => ErrorKind::RateLimit,
            Error::Execution { .. } => ErrorKind::Execution,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::ResponseFormat { .. } => ErrorKind::ResponseFormat,
        }
    }

    /// HTTP status code of the response that produced this error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Authentication { status_code, .. }
            | Error::Validation { status_code, .. }
            | Error::InsufficientCredits { status_code, .. }
            | Error::Execution { status_code, .. }
            | Error::ResponseFormat { status_code, .. } => *status_code,
            Error::RateLimit { .. } => Some(429),
            Error::Configuration { .. } | Error::Timeout { .. } => None,
        }
    }

    /// Retry-After hint in seconds, only set for rate limiting
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Error::RateLimit { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Whether the session would have retried the exchange that produced this error.
    ///
    /// Only transport timeouts qualify; an exhausted or cancelled wait is final.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::RateLimit { .. } | Error::Timeout { elapsed: None, .. } => true,
            Error::Execution {
                status_code: Some(status),
                ..
            } => matches!(status, 500 | 502 | 503 | 504),
            // connection failures carry no status and no execution
            Error::Execution {
                status_code: None,
                execution_id: None,
                ..
            } => true,
            _ => false,
        }
    }

    /// Human readable message without the kind prefix
    pub fn message(&self) -> &str {
        match self {
            Error::Configuration { message }
            | Error::Authentication { message, .. }
            | Error::Validation { message, .. }
            | Error::InsufficientCredits { message, .. }
            | Error::RateLimit { message, .. }
            | Error::Execution { message, .. }
            | Error::Timeout { message, .. }
            | Error::ResponseFormat { message, .. } => message,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Configuration => write!(f, "ConfigurationError"),
            ErrorKind::Authentication => write!(f, "AuthenticationError"),
            ErrorKind::Validation => write!(f, "ValidationError"),
            ErrorKind::InsufficientCredits => write!(f, "InsufficientCreditsError"),
            ErrorKind::RateLimit => write!(f, "RateLimitError"),
            ErrorKind::Execution => write!(f, "ExecutionError"),
            ErrorKind::Timeout => write!(f, "TimeoutError"),
            ErrorKind::ResponseFormat => write!(f, "ResponseFormatError"),
        }
    }
}
