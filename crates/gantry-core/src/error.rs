//! Error types for the gantry-core library
//!
//! Defines the error taxonomy for the request pipeline, using thiserror for
//! ergonomic error definitions and anyhow for flexible source contexts.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Main error type for pipeline operations
#[derive(Error, Debug)]
pub enum Error {
    /// Token missing, malformed, or expired; raised before any network I/O
    #[error("Invalid token: {message}")]
    InvalidToken { message: String },

    /// Classified API failure after dispatch
    #[error("API error ({kind}): {message}")]
    Api {
        kind: ApiErrorKind,
        message: String,
        status_code: Option<u16>,
    },

    /// Call was cancelled through its cancel token
    #[error("Request cancelled")]
    Cancelled,

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// HTTP request construction or transport errors
    #[error("HTTP request error: {message}")]
    HttpRequest {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// JSON parsing and serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Failure category assigned by the response classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiErrorKind {
    /// No usable response body was obtained
    Transport,
    /// Non-success HTTP status with no more specific signal
    HttpStatus,
    /// Content-type missing or outside the allow-list; never retried
    ContentType,
    /// The API embedded its own error message in the payload
    ApiPayload,
}

impl Error {
    /// Construct a classified API error
    pub fn api(kind: ApiErrorKind, message: impl Into<String>, status_code: Option<u16>) -> Self {
        Error::Api {
            kind,
            message: message.into(),
            status_code,
        }
    }

    /// The classification kind, if this is a classified API error
    pub fn api_kind(&self) -> Option<ApiErrorKind> {
        match self {
            Error::Api { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorKind::Transport => write!(f, "transport"),
            ApiErrorKind::HttpStatus => write!(f, "http-status"),
            ApiErrorKind::ContentType => write!(f, "content-type"),
            ApiErrorKind::ApiPayload => write!(f, "api-payload"),
        }
    }
}

// Conversion implementations
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            message: err.to_string(),
            source: err,
        }
    }
}
