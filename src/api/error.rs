//! Errors surfaced by the gateway

use crate::value::ValueError;
use thiserror::Error;

/// Failure of a single remote call.
///
/// The gateway returns these exactly as observed; retry decisions belong
/// to the caller (see [`ApiError::is_retryable`]).
#[derive(Debug, Error)]
pub enum ApiError {
    /// The remote API could not be reached
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The remote API answered with a non-success status
    #[error("API request to {url} failed with status {status}: {message}")]
    Remote {
        status: u16,
        url: String,
        message: String,
    },

    /// A success response whose body could not be decoded
    #[error("invalid response from {url}: {source}")]
    Decoding {
        url: String,
        #[source]
        source: ValueError,
    },

    /// The caller's context or the gateway was cancelled
    #[error("request cancelled")]
    Cancelled,

    #[error("credentials unavailable: {0}")]
    Credentials(String),

    /// Unusable base URL, path or limiter settings
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Transport failures and 5xx responses may succeed on a later attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Remote { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// HTTP status of a remote error
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Format an API error for end users
///
/// Common statuses get an actionable message; everything else keeps the
/// error text, truncated and stripped of control characters.
pub fn format_api_error(error: &ApiError) -> String {
    match error.status() {
        Some(401) => return "Authentication failed. Check the configured API token.".to_string(),
        Some(403) => return "Permission denied for this operation.".to_string(),
        Some(404) => return format!("Resource not found: {}", endpoint(error)),
        Some(409) => {
            return "Resource conflict. The resource may already exist or be in use.".to_string()
        }
        Some(429) => return "Rate limit exceeded. Lower the configured rate limit.".to_string(),
        Some(status) if status >= 500 => {
            return "Cloud API temporarily unavailable. Please try again.".to_string()
        }
        _ => {}
    }

    let text = error.to_string();
    let sanitized: String = text
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(160)
        .collect();
    if sanitized.len() < text.len() {
        format!("{sanitized}...")
    } else {
        sanitized
    }
}

fn endpoint(error: &ApiError) -> &str {
    match error {
        ApiError::Transport { url, .. }
        | ApiError::Remote { url, .. }
        | ApiError::Decoding { url, .. } => url,
        _ => "-",
    }
}
