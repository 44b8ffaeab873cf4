//! GitLab API error types.

use thiserror::Error;

/// Errors that can occur when talking to the GitLab API.
#[derive(Debug, Error)]
pub enum GitLabError {
    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("HTTP transport error: {0}")]
    Transport(String),

    /// A response body could not be decoded into the expected shape.
    #[error("Failed to decode response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    /// Non-2xx response not covered by a more specific variant.
    #[error("GitLab API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// The client could not be constructed (bad base URL, transport setup).
    #[error("Configuration error: {0}")]
    Config(String),
}

impl GitLabError {
    /// Classify a non-2xx status and its body into a typed error.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            404 => Self::NotFound(body.to_string()),
            409 => Self::Conflict(body.to_string()),
            _ => Self::Api {
                status,
                message: body.to_string(),
            },
        }
    }

    pub fn decode(endpoint: impl Into<String>, err: &serde_json::Error) -> Self {
        Self::Decode {
            endpoint: endpoint.into(),
            message: err.to_string(),
        }
    }

    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<crate::http::HttpError> for GitLabError {
    fn from(err: crate::http::HttpError) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Extract a short error message suitable for display.
///
/// Takes the first line of an error message; GitLab error bodies are often
/// multi-line JSON or HTML.
#[inline]
pub fn short_error_message(e: &impl std::error::Error) -> String {
    let full = e.to_string();
    full.lines().next().unwrap_or(&full).to_string()
}
