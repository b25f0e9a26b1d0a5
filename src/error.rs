//! Error types for the DSA Assistant client
//!
//! This module defines the error taxonomy shared by the HTTP client layer,
//! the session store, configuration loading, and the views, using
//! `thiserror` for ergonomic error handling.

use std::time::Duration;

use thiserror::Error;

/// Main error type for DSA Assistant operations
///
/// Every failure that can reach the user is one of these variants. The
/// views only ever show the `Display` string, so each variant renders as a
/// single human-readable message.
#[derive(Error, Debug)]
pub enum AssistantError {
    /// Client-side field validation failed before any request was made
    #[error("{0}")]
    Validation(String),

    /// The request did not settle within its configured timeout
    #[error("Request timed out after {after:?}: {operation}")]
    Timeout {
        /// Operation that timed out (e.g. `POST /chat/`)
        operation: String,
        /// The timeout that elapsed
        after: Duration,
    },

    /// The backend answered with a non-success status
    ///
    /// `message` is the response body text, or `HTTP <code>` when the body
    /// was empty.
    #[error("{message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Body text or status-derived message
        message: String,
    },

    /// Transport failure (connection refused, DNS, TLS, ...)
    #[error("Network error: {0}")]
    Network(String),

    /// The caller cancelled the request before it settled
    #[error("Request cancelled: {0}")]
    Cancelled(String),

    /// A success response carried a body that did not match the expected shape
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// OS credential store errors
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    /// Session storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Invalid base URL or endpoint path
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl AssistantError {
    /// Returns `true` for the distinguished timeout failure
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias for DSA Assistant operations
///
/// Uses `anyhow::Error` so call sites can attach context; callers that
/// need the variant downcast to [`AssistantError`].
pub type Result<T> = anyhow::Result<T>;
