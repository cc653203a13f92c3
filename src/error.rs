//! Error types for polling and exporting.
//!
//! [`FetchError`] covers everything that can go wrong while polling a single
//! source. It never escapes a cycle: the exporter folds it into a
//! [`FetchStatus`](crate::metrics::FetchStatus) so the failure shows up in the
//! metrics file. [`ExporterError`] covers failures of the cycle itself.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Error type for a failed poll of one SOAP source.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request failed before a complete response arrived.
    #[error("Request to {endpoint} failed: {source}")]
    Transport {
        /// Endpoint the request was sent to
        endpoint: String,
        /// Status code, if the status line arrived before the failure
        status: Option<u16>,
        /// The underlying HTTP client error
        #[source]
        source: reqwest::Error,
    },

    /// The endpoint answered with something other than 200 OK
    #[error("Unexpected response. Status code: {code}, Response Text: {detail}")]
    HttpStatus {
        /// HTTP status code
        code: u16,
        /// SOAP fault string when one could be extracted, the raw body otherwise
        detail: String,
    },

    /// The response body was not the XML document we expected
    #[error("Parse error: {reason}")]
    Parse {
        /// Description of what went wrong
        reason: String,
    },
}

impl FetchError {
    /// HTTP status code to report for this failure, 0 if no response arrived.
    pub fn http_code(&self) -> u16 {
        match self {
            Self::Transport { status, source, .. } => status
                .or_else(|| source.status().map(|s| s.as_u16()))
                .unwrap_or(0),
            Self::HttpStatus { code, .. } => *code,
            Self::Parse { .. } => 200,
        }
    }
}

impl From<roxmltree::Error> for FetchError {
    fn from(e: roxmltree::Error) -> Self {
        Self::Parse {
            reason: e.to_string(),
        }
    }
}

/// Error type for a cycle that could not produce its metrics file.
#[derive(Debug, Error)]
pub enum ExporterError {
    /// Writing or renaming the metrics file failed
    #[error("Failed to write metrics to {path}: {source}")]
    Io {
        /// Target metrics file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Metric construction or text encoding failed
    #[error("Failed to encode metrics: {0}")]
    Metrics(#[from] prometheus::Error),

    /// A request template override could not be read
    #[error("Failed to read request template {path}: {source}")]
    Template {
        /// Template file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}
