//! Metric snapshot model and Prometheus text rendering.
//!
//! A [`MetricsSnapshot`] is everything one cycle learned: the parsed records of
//! both sources plus one [`FetchStatus`] per source. It is rebuilt from scratch
//! every cycle and never merged with an earlier one.
//!
//! # Submodules
//!
//! - `prom` - Prometheus text exposition rendering

pub mod prom;

use serde::Serialize;
use strum_macros::Display;

use crate::error::FetchError;
use crate::parser::{DomainRecord, Source, SslRecord};

/// Outcome of polling one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FetchState {
    Success,
    Error,
}

/// Per-poll outcome summary exported as `<source>_fetch_*` metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchStatus {
    pub source: Source,
    pub state: FetchState,
    /// HTTP status code, 0 if the request never returned
    pub http_code: u16,
    /// Empty on success
    pub error: String,
    /// Unix epoch seconds of the poll
    pub timestamp: i64,
}

impl FetchStatus {
    /// A poll only succeeds on a 200 response that parsed.
    pub fn success(source: Source, timestamp: i64) -> Self {
        FetchStatus {
            source,
            state: FetchState::Success,
            http_code: 200,
            error: String::new(),
            timestamp,
        }
    }

    pub fn failure(source: Source, error: &FetchError, timestamp: i64) -> Self {
        FetchStatus {
            source,
            state: FetchState::Error,
            http_code: error.http_code(),
            error: error.to_string(),
            timestamp,
        }
    }

    pub fn is_success(&self) -> bool {
        self.state == FetchState::Success
    }
}

/// Records and status of one poll of a source.
#[derive(Debug, Clone)]
pub struct SourceSnapshot<R> {
    pub records: Vec<R>,
    pub status: FetchStatus,
}

impl<R> SourceSnapshot<R> {
    /// Builds the snapshot from a parser outcome. A failed poll keeps no records.
    pub fn from_result(source: Source, timestamp: i64, result: Result<Vec<R>, FetchError>) -> Self {
        match result {
            Ok(records) => SourceSnapshot {
                records,
                status: FetchStatus::success(source, timestamp),
            },
            Err(e) => SourceSnapshot {
                records: Vec::new(),
                status: FetchStatus::failure(source, &e, timestamp),
            },
        }
    }
}

/// Everything one cycle exports.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub domains: SourceSnapshot<DomainRecord>,
    pub certificates: SourceSnapshot<SslRecord>,
}
