//! HTTP layer for the AI Spine API
//!
//! This module provides:
//! - A pooled session with default headers and bearer authentication
//! - Retry logic with exponential backoff and Retry-After support
//! - Error classification into the crate's typed errors
//! - Request dispatch with strict response decoding

pub mod auth;
pub mod dispatcher;
pub mod error;
pub mod retry;
pub mod session;

pub use auth::{ApiKey, AuthHandler, AuthMode, BearerAuth};
pub use dispatcher::Dispatcher;
pub use error::{classify, ErrorClassification, HttpError};
pub use retry::{RetryDecision, RetryHandler, RetryPolicy};
pub use session::Session;

// Re-export commonly used types
pub use reqwest::{Method, StatusCode};
