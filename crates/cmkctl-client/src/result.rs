//! Result of a single REST exchange

use reqwest::StatusCode;
use reqwest::header::{ETAG, HeaderMap};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ClientError, Result};

/// One received HTTP response
#[derive(Debug, Clone)]
pub struct ApiResult {
    /// HTTP status
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw response body
    pub body: String,
}

impl ApiResult {
    /// Create a result from its parts
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<String>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Whether the request succeeded (status 200)
    #[must_use]
    pub fn ok(&self) -> bool {
        self.status == StatusCode::OK
    }

    /// Value of the `ETag` header, if present
    #[must_use]
    pub fn etag(&self) -> Option<&str> {
        self.headers.get(ETAG).and_then(|v| v.to_str().ok())
    }

    /// Raw body text
    #[must_use]
    pub fn text(&self) -> &str {
        &self.body
    }

    /// Deserialize the body
    ///
    /// # Errors
    /// Returns an error if the body is not valid JSON for `T`
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Body as JSON, `null` when empty
    ///
    /// # Errors
    /// Returns an error if a non-empty body is not valid JSON
    pub fn json_value(&self) -> Result<Value> {
        if self.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        self.json()
    }

    /// Body as JSON, or an API error when the status is not 200
    ///
    /// # Errors
    /// Returns [`ClientError::Api`] on a non-200 status, or a JSON error
    pub fn require_ok(&self) -> Result<Value> {
        if !self.ok() {
            return Err(ClientError::Api {
                status: self.status.as_u16(),
                message: self.body.clone(),
            });
        }
        self.json_value()
    }
}
