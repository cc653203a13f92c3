//! Prometheus file exporter for a domain reseller SOAP API.
//!
//! Every cycle polls two SOAP operations, the extended domain listing and the
//! SSL certificate listing, turns the records into gauges and replaces a
//! metrics file meant for the node_exporter textfile collector or any other
//! file-based scraper. Each source also exports its own fetch status, so a
//! failing poll shows up as `<source>_fetch_success 0` instead of silently
//! missing metrics.
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use std::time::Duration;
//!
//! use domainexporter::soap::{SoapClient, DEFAULT_ENDPOINT};
//! use domainexporter::{Exporter, RequestTemplates};
//!
//! let client = SoapClient::new(
//!     DEFAULT_ENDPOINT.parse()?,
//!     "reseller".to_string(),
//!     "secret".to_string(),
//!     Duration::from_secs(30),
//! )?;
//! let exporter = Exporter::new(
//!     client,
//!     RequestTemplates::builtin(),
//!     PathBuf::from("metrics/ext_domain_metrics.prom"),
//! );
//! let report = exporter.run_cycle()?;
//! println!("{} samples written", report.samples);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod error;
pub mod exporter;
pub mod logging;
pub mod metrics;
pub mod parser;
pub mod report;
pub mod soap;

pub use error::{ExporterError, FetchError};
pub use exporter::{Exporter, RequestTemplates};
pub use metrics::{FetchState, FetchStatus, MetricsSnapshot};
pub use parser::{DomainRecord, Source, SslRecord};
pub use report::{CycleReport, ReportFormat};
