//! Error types for the venue API client

use thiserror::Error;

/// Errors that can occur when talking to the venue API
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Invalid base URL or request construction
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Connection failed before a response arrived
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// The request timed out
    #[error("Request timed out")]
    Timeout,

    /// Response body could not be decoded
    #[error("Response parsing failed: {0}")]
    ResponseParseFailed(String),

    /// 401 from the server
    #[error("Unauthorized")]
    Unauthorized {
        /// Server message, if any
        message: Option<String>,
    },

    /// 403 from the server
    #[error("Forbidden")]
    Forbidden {
        /// Server message, if any
        message: Option<String>,
    },

    /// Any other non-success status
    #[error("API error (status {status}): {}", .message.as_deref().unwrap_or("no message"))]
    Rejected {
        /// HTTP status code
        status: u16,
        /// `message` field of the JSON error body
        message: Option<String>,
    },

    /// A 2xx response that reports `success: false` or lacks required fields
    #[error("{message}")]
    Unsuccessful {
        /// Server message or a fallback describing what was missing
        message: String,
    },
}

impl ApiError {
    /// The message the server attached to this error, if any
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Unauthorized { message }
            | Self::Forbidden { message }
            | Self::Rejected { message, .. } => message.as_deref(),
            Self::Unsuccessful { message } => Some(message),
            Self::InvalidRequest(_)
            | Self::RequestFailed(_)
            | Self::Timeout
            | Self::ResponseParseFailed(_) => None,
        }
    }

    /// HTTP status, when the server answered
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::Forbidden { .. } => Some(403),
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Timeouts, dropped connections and 5xx responses
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::RequestFailed(_))
            || self.status().is_some_and(|s| s >= 500)
    }

    /// The server message, or `fallback` when there is none
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        self.server_message().unwrap_or(fallback).to_string()
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if error.is_decode() {
            Self::ResponseParseFailed(error.to_string())
        } else if error.is_builder() {
            Self::InvalidRequest(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}
