//! Error types for the exporter.
//!
//! Errors in this crate are almost always recovered locally: a station worker that hits a
//! transport failure reconnects, a framing failure resynchronizes, a short payload decodes
//! partially. The variants below exist so the recovering code can log what happened and so
//! startup (configuration, metrics registry) can fail loudly.
//!
//! ## Error Categories
//!
//! - **Connection Errors**: the receiver refused or reset the connection
//! - **Timeout Errors**: a bounded operation (connect) ran out of time
//! - **Stream Errors**: a read failed mid-stream
//! - **Config Errors**: the station file is missing, malformed or inconsistent
//! - **Metrics Errors**: the gauge registry rejected a collector
//!
//! ```rust
//! use gnss_exporter::ExporterError;
//!
//! let error = ExporterError::connection_failed("receiver refused connection");
//! assert!(error.is_retryable());
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for exporter operations.
pub type Result<T, E = ExporterError> = std::result::Result<T, E>;

/// Main error type for exporter operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ExporterError {
    #[error("Failed to connect to receiver: {reason}")]
    Connection {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Stream read failed after {frames} frames")]
    Stream {
        frames: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error in {path}: {details}")]
    Config { path: PathBuf, details: String },

    #[error("Metrics registry error: {details}")]
    Metrics { details: String },
}

impl ExporterError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            ExporterError::Connection { .. } => true,
            ExporterError::Timeout { .. } => true,
            ExporterError::Stream { .. } => true,
            ExporterError::Config { .. } => false,
            ExporterError::Metrics { .. } => false,
        }
    }

    /// Helper constructor for connection errors.
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        ExporterError::Connection { reason: reason.into(), source: None }
    }

    /// Helper constructor for connection errors with source.
    pub fn connection_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        ExporterError::Connection { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for configuration errors.
    pub fn config(path: impl Into<PathBuf>, details: impl Into<String>) -> Self {
        ExporterError::Config { path: path.into(), details: details.into() }
    }

    /// Helper constructor for stream read errors.
    pub fn stream_failed(frames: u64, source: std::io::Error) -> Self {
        ExporterError::Stream { frames, source }
    }
}

impl From<prometheus::Error> for ExporterError {
    fn from(err: prometheus::Error) -> Self {
        ExporterError::Metrics { details: err.to_string() }
    }
}
