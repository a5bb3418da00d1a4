//! Error types for fedora-artifacts
//!
//! The taxonomy follows how far a failure reaches:
//! - [`Error::Config`] aborts the whole run before any network work
//! - [`TransportError`] is isolated to a single artifact download
//! - [`ExtractionError`] is isolated to a single archive
//!
//! Transport and extraction errors are recorded in the
//! [`PipelineReport`](crate::types::PipelineReport) instead of being propagated.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for fedora-artifacts operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for fedora-artifacts
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "identifier")
        key: Option<String>,
    },

    /// Download of a single artifact failed
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Extraction of a single archive failed
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a configuration error tied to a config key
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Machine-readable error code used in JSON reports
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Transport(e) => match e {
                TransportError::Status { .. } => "http_status",
                TransportError::Request { .. } => "request_failed",
                TransportError::Timeout { .. } => "timeout",
                TransportError::Incomplete { .. } => "incomplete",
                TransportError::Cancelled { .. } => "cancelled",
            },
            Error::Extraction(e) => match e {
                ExtractionError::Corrupt { .. } => "corrupt_archive",
                ExtractionError::Unsupported { .. } => "unsupported_archive",
                ExtractionError::Io { .. } => "extraction_io",
                ExtractionError::Missing { .. } => "archive_missing",
            },
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::Other(_) => "internal_error",
        }
    }

    /// Whether this error must abort the whole pipeline
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Config { .. })
    }
}

/// Which phase of an HTTP fetch ran out of time
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeoutPhase {
    /// Establishing the connection
    Connect,
    /// Waiting for response headers after the request was sent
    Headers,
    /// Waiting for the next body chunk
    Read,
}

impl std::fmt::Display for TimeoutPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeoutPhase::Connect => f.write_str("connect"),
            TimeoutPhase::Headers => f.write_str("response headers"),
            TimeoutPhase::Read => f.write_str("read"),
        }
    }
}

/// Download-related errors, one per failed artifact
#[derive(Debug, Error)]
pub enum TransportError {
    /// Server answered with a non-success status
    #[error("HTTP {status} fetching {url}")]
    Status {
        /// The requested URL
        url: String,
        /// The HTTP status code returned
        status: u16,
    },

    /// Connection or protocol failure reported by the HTTP client
    #[error("request to {url} failed: {source}")]
    Request {
        /// The requested URL
        url: String,
        /// Underlying client error
        #[source]
        source: reqwest::Error,
    },

    /// Connect, header or read deadline expired
    #[error("{phase} timeout fetching {url}")]
    Timeout {
        /// The requested URL
        url: String,
        /// Which phase timed out
        phase: TimeoutPhase,
    },

    /// Body ended before the advertised Content-Length was reached
    #[error("incomplete download of {url}: expected {expected} bytes, wrote {written}")]
    Incomplete {
        /// The requested URL
        url: String,
        /// Bytes announced by the server
        expected: u64,
        /// Bytes written to disk
        written: u64,
    },

    /// The run was cancelled before this artifact completed
    #[error("download of {url} cancelled")]
    Cancelled {
        /// The requested URL
        url: String,
    },
}

impl TransportError {
    /// Classify a reqwest error into a transport error for `url`
    pub(crate) fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            let phase = if source.is_connect() {
                TimeoutPhase::Connect
            } else {
                TimeoutPhase::Read
            };
            TransportError::Timeout {
                url: url.to_string(),
                phase,
            }
        } else if let Some(status) = source.status() {
            TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            TransportError::Request {
                url: url.to_string(),
                source,
            }
        }
    }
}

/// Extraction errors, one per failed archive
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Archive could not be decoded
    #[error("corrupt archive {archive}: {reason}")]
    Corrupt {
        /// The archive that failed to decode
        archive: PathBuf,
        /// Decoder message
        reason: String,
    },

    /// Archive format is recognised by name but cannot be handled
    #[error("unsupported archive format: {archive}")]
    Unsupported {
        /// The offending archive
        archive: PathBuf,
    },

    /// Filesystem error while reading the archive or writing its contents
    #[error("I/O error extracting {archive}: {source}")]
    Io {
        /// The archive being extracted
        archive: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The downloaded archive is no longer on disk
    #[error("archive {archive} not found")]
    Missing {
        /// The expected archive path
        archive: PathBuf,
    },
}
