//! Error types for the cmkctl client

use thiserror::Error;

/// Errors that can occur when using the cmkctl client
///
/// A remote rejection (non-200 status) is not an error for plain
/// operations: it is returned as an [`ApiResult`](crate::ApiResult) for the
/// caller to inspect.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Missing or unreadable setting, secret or CA bundle
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Request issued on a session that was never opened
    #[error("Checkmk session is not opened")]
    SessionNotOpen,

    /// Network or TLS failure
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid URL
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Header value with characters not allowed on the wire
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    /// Discovery mode outside the accepted set
    #[error("{0}")]
    InvalidDiscoveryMode(#[from] cmkctl_api::ParseDiscoveryModeError),

    /// Response body does not have the expected shape
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// A host carries a tag value missing from the tag-group catalog
    #[error("host {host} has tag {tag_group}={value} which is not in the tag-group catalog")]
    UnknownTagValue {
        /// Host carrying the tag
        host: String,
        /// Tag group attribute key
        tag_group: String,
        /// Tag value id
        value: String,
    },

    /// API returned an error status where a body was required
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
