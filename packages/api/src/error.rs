use serde::Deserialize;
use store::ValidationError;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

/// Shown when rate limiting outlasts every retry.
pub const RATE_LIMITED_MESSAGE: &str = "Too many requests. Please wait a moment and try again.";

const NOT_AUTHENTICATED_MESSAGE: &str = "Please log in to continue.";

#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend answered 429.
    #[error("Rate limited")]
    RateLimited,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Any other non-2xx response. `message` is the server's `error` or
    /// `message` field when the body carried one.
    #[error("HTTP {status}: {}", .message.as_deref().unwrap_or("request failed"))]
    RequestFailed { status: u16, message: Option<String> },

    #[error("Network unavailable: {0}")]
    Network(#[source] reqwest::Error),

    /// A 2xx response whose body could not be decoded.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Not authenticated")]
    NotAuthenticated,
}

/// Closed classification consumed by the retry executor and the stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    RateLimited,
    ValidationFailed,
    RequestFailed,
    NetworkUnavailable,
    NotAuthenticated,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RateLimited => ErrorKind::RateLimited,
            Self::Validation(_) => ErrorKind::ValidationFailed,
            Self::RequestFailed { .. } | Self::InvalidResponse(_) => ErrorKind::RequestFailed,
            Self::Network(_) => ErrorKind::NetworkUnavailable,
            Self::NotAuthenticated => ErrorKind::NotAuthenticated,
        }
    }

    /// Only rate limiting is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::RateLimited
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RateLimited => Some(429),
            Self::RequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Text to show the user. Server messages are passed through verbatim;
    /// conditions without one fall back to `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::RateLimited => RATE_LIMITED_MESSAGE.to_string(),
            Self::Validation(e) => e.to_string(),
            Self::RequestFailed {
                message: Some(message),
                ..
            } => message.clone(),
            Self::NotAuthenticated => NOT_AUTHENTICATED_MESSAGE.to_string(),
            _ => fallback.to_string(),
        }
    }
}

/// Error body shapes the backend sends: `{"error": ..}` or `{"message": ..}`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ErrorBody {
    pub(crate) fn into_message(self) -> Option<String> {
        self.error
            .filter(|m| !m.is_empty())
            .or(self.message.filter(|m| !m.is_empty()))
    }
}
