//! Error types for the Netease Cloud Music request engine.

use thiserror::Error;

/// Errors that can occur while resolving or dispatching an API call.
///
/// A well-formed envelope with a non-success `code` is *not* an error: it is
/// returned to the caller as data. The one exception is the not-logged-in
/// sentinel under strict dispatch, which becomes [`NeteaseError::NotLoggedIn`].
#[derive(Debug, Error)]
pub enum NeteaseError {
    /// HTTP transport error (connection refused, timeout, TLS failure, etc.).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The upstream body could not be parsed as JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File I/O error (session read/write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No endpoint or adapter is registered under this route.
    #[error("unknown route: {0}")]
    UnknownRoute(String),

    /// A required parameter was absent from the caller query.
    #[error("missing required parameter `{0}`")]
    MissingParameter(String),

    /// A parameter value has no known mapping (e.g. an unknown comment type).
    #[error("invalid value `{value}` for parameter `{name}`")]
    InvalidParameter {
        /// Parameter (or query key) name.
        name: String,
        /// The offending value, rendered as text.
        value: String,
    },

    /// Strict dispatch received the `301` not-logged-in envelope.
    #[error("not logged in (route {route})")]
    NotLoggedIn {
        /// Route that was being invoked.
        route: String,
    },

    /// Request signing or response decryption failed.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Catch-all for other errors (e.g. missing config directory).
    #[error("{0}")]
    Other(String),
}

impl NeteaseError {
    pub(crate) fn invalid(name: &str, value: impl ToString) -> Self {
        Self::InvalidParameter {
            name: name.to_owned(),
            value: value.to_string(),
        }
    }

    /// Whether this error comes from the caller's route/query rather than
    /// from talking to the upstream service.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownRoute(_) | Self::MissingParameter(_) | Self::InvalidParameter { .. }
        )
    }
}

/// Convenience alias for `Result<T, NeteaseError>`.
pub type Result<T> = std::result::Result<T, NeteaseError>;
