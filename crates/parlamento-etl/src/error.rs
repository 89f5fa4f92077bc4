//! Error types for the ETL pipeline
//!
//! The taxonomy follows the blast radius of each failure: a rejected record
//! never fails a document, a failed partition never fails the run. Everything
//! is counted and surfaced in the end-of-run report.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure while retrieving a source document.
///
/// Transient failures (timeouts, 5xx, rate limiting) are retried by the
/// fetch loop; permanent ones fail the partition immediately.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("source returned HTTP {status}")]
    Status { status: reqwest::StatusCode },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("source returned an invalid document: {0}")]
    InvalidDocument(String),

    #[error("failed to persist raw artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("no legislature configured with code '{0}'")]
    UnknownLegislature(String),
}

impl FetchError {
    /// Whether the failure is worth retrying.
    ///
    /// Timeouts, connection failures, 5xx responses and HTTP 429 (rate
    /// limiting) are transient. Everything else, including other 4xx and
    /// malformed documents, is permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout(_) => true,
            FetchError::Status { status } => {
                status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            FetchError::Request(err) => err.is_timeout() || err.is_connect(),
            _ => false,
        }
    }
}

/// A single record failed identifying-field validation.
///
/// Recorded and skipped; never aborts the surrounding document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("record {index} rejected: {reason}")]
pub struct RecordValidationError {
    /// Index of the record in the source document's top-level array
    pub index: usize,
    pub reason: String,
}

impl RecordValidationError {
    pub fn new(index: usize, reason: impl Into<String>) -> Self {
        Self {
            index,
            reason: reason.into(),
        }
    }
}

/// Document-level transformation failure.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("document is not a JSON array of records: {0}")]
    InvalidDocument(#[from] serde_json::Error),

    #[error("raw artifact not found: {0} (run 'parlamento-etl fetch' first)")]
    MissingRawArtifact(PathBuf),

    #[error("failed to read raw artifact: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure while producing the columnar artifact. Fatal for its partition
/// only; the staged temp file is removed and any previous artifact at the
/// canonical path is left untouched.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("I/O error writing artifact: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-partition rollup surfaced in the run report.
#[derive(Error, Debug)]
pub enum PartitionError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("transform failed: {0}")]
    Transform(#[from] TransformError),

    #[error("write failed: {0}")]
    Write(#[from] WriteError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_errors_are_transient() {
        let err = FetchError::Status {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
        };
        assert!(err.is_transient());

        let err = FetchError::Status {
            status: reqwest::StatusCode::BAD_GATEWAY,
        };
        assert!(err.is_transient());
    }

    #[test]
    fn test_rate_limit_is_transient() {
        let err = FetchError::Status {
            status: reqwest::StatusCode::TOO_MANY_REQUESTS,
        };
        assert!(err.is_transient());
    }

    #[test]
    fn test_client_errors_are_permanent() {
        let err = FetchError::Status {
            status: reqwest::StatusCode::NOT_FOUND,
        };
        assert!(!err.is_transient());

        let err = FetchError::Status {
            status: reqwest::StatusCode::FORBIDDEN,
        };
        assert!(!err.is_transient());
    }

    #[test]
    fn test_invalid_document_is_permanent() {
        let err = FetchError::InvalidDocument("expected a JSON array".to_string());
        assert!(!err.is_transient());
    }

    #[test]
    fn test_timeout_is_transient() {
        assert!(FetchError::Timeout(Duration::from_secs(60)).is_transient());
    }
}
