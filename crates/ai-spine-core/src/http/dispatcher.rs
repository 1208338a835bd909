//! Request dispatch and response decoding
//!
//! A [`Dispatcher`] turns one logical operation into one [`Session::send`]
//! and interprets the outcome: a decoded payload on 2xx, a classified
//! [`Error`] otherwise. It never hands back a partially decoded value.

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use crate::http::auth::AuthMode;
use crate::http::error::HttpError;
use crate::http::session::Session;
use crate::{Error, Result};

/// Issues requests through a shared [`Session`]
#[derive(Debug, Clone)]
pub struct Dispatcher {
    session: Session,
}

impl Dispatcher {
    /// Create a dispatcher over a session
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// Get the underlying session
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Send one request and decode the 2xx body into `T`.
    ///
    /// An empty body decodes as JSON `null`, so `()` and `Value` accept
    /// `204 No Content`.
    #[tracing::instrument(level = "debug", skip(self, method, body), fields(method = %method))]
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        auth: AuthMode,
    ) -> Result<T> {
        let response = self.session.send(method, path, body, auth).await?;
        let status = response.status().as_u16();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::from(HttpError::from_request_error(e)))?;

        decode_body(status, &bytes)
    }

    /// Convenience for GET with authentication
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.call(Method::GET, path, None, AuthMode::Required).await
    }

    /// Convenience for POST with authentication
    pub async fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        self.call(Method::POST, path, Some(body), AuthMode::Required).await
    }

    /// Convenience for DELETE with authentication
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.call(Method::DELETE, path, None, AuthMode::Required).await
    }
}

/// Decode a successful response body
pub(crate) fn decode_body<T: DeserializeOwned>(status: u16, bytes: &[u8]) -> Result<T> {
    let payload: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
        b"null"
    } else {
        bytes
    };

    serde_json::from_slice(payload).map_err(|e| {
        tracing::warn!(status, error = %e, "Undecodable response body");
        Error::ResponseFormat {
            message: format!("could not decode {} response: {}", status, e),
            status_code: Some(status),
        }
    })
}
