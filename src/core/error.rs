//! Error types for the streetgauge library
//!
//! Provides comprehensive error handling for acquisition and analysis
//! operations.

use std::fmt;

use serde::Serialize;

/// Outcome of one failed endpoint attempt, kept in order for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointFailure {
    /// Endpoint URL that was attempted
    pub endpoint: String,

    /// Error message produced by that attempt
    pub error: String,
}

impl fmt::Display for EndpointFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.endpoint, self.error)
    }
}

/// Main error type for streetgauge operations
#[derive(Debug)]
pub enum Error {
    /// Place name could not be resolved to coordinates; fatal for the
    /// request, never retried across endpoints
    Geocode {
        place: String,
        message: String,
    },

    /// Every configured endpoint failed; carries the full ordered list of
    /// attempts so the caller can render a precise diagnostic
    SourceUnavailable {
        place: String,
        mode: String,
        radius_m: u32,
        attempts: Vec<EndpointFailure>,
    },

    /// HTTP-specific error
    HttpError(String),

    /// Network connectivity issues
    NetworkError(String),

    /// File I/O error
    IoError(std::io::Error),

    /// Invalid configuration or parameters
    InvalidInput(String),

    /// Graph snapshot could not be read or written
    Snapshot(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Geocode { place, message } => {
                write!(f, "Could not geocode '{place}': {message}")
            }
            Error::SourceUnavailable {
                place,
                mode,
                radius_m,
                attempts,
            } => {
                write!(
                    f,
                    "No endpoint returned a {mode} network for '{place}' (radius {radius_m} m); {} attempted",
                    attempts.len()
                )
            }
            Error::HttpError(msg) => {
                write!(f, "HTTP error: {msg}")
            }
            Error::NetworkError(msg) => {
                write!(f, "Network error: {msg}")
            }
            Error::IoError(err) => {
                write!(f, "I/O error: {err}")
            }
            Error::InvalidInput(msg) => {
                write!(f, "Invalid input: {msg}")
            }
            Error::Snapshot(msg) => {
                write!(f, "Graph snapshot error: {msg}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Error::NetworkError(err.to_string())
        } else {
            Error::HttpError(err.to_string())
        }
    }
}

/// Convenience result type for streetgauge operations
pub type Result<T> = std::result::Result<T, Error>;
