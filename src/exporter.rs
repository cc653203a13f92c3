//! One poll-render-write cycle.
//!
//! [`Exporter::run_cycle`] is a single shot. Scheduling is up to the caller;
//! the binary simply calls it in a loop, which keeps the metrics file at
//! exactly one writer.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{debug, error, info};
use tempfile::NamedTempFile;

use crate::error::{ExporterError, FetchError};
use crate::metrics::{prom, MetricsSnapshot, SourceSnapshot};
use crate::parser::{extract_fault, parse_domain_list, parse_ssl_list, Source};
use crate::report::CycleReport;
use crate::soap::{Transport, DOMAIN_LIST_REQUEST, SSL_LIST_REQUEST};

/// SOAP envelopes sent for each source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTemplates {
    pub domain: String,
    pub ssl: String,
}

impl RequestTemplates {
    pub fn builtin() -> Self {
        RequestTemplates {
            domain: DOMAIN_LIST_REQUEST.to_string(),
            ssl: SSL_LIST_REQUEST.to_string(),
        }
    }

    /// Built-in templates, with each one replaced by a file if a path is given.
    pub fn load(domain: Option<&Path>, ssl: Option<&Path>) -> Result<Self, ExporterError> {
        let read = |path: &Path| {
            fs::read_to_string(path).map_err(|source| ExporterError::Template {
                path: path.to_path_buf(),
                source,
            })
        };

        let mut templates = Self::builtin();
        if let Some(path) = domain {
            templates.domain = read(path)?;
        }
        if let Some(path) = ssl {
            templates.ssl = read(path)?;
        }
        Ok(templates)
    }
}

fn wall_clock() -> i64 {
    Utc::now().timestamp()
}

/// Polls both sources and writes the metrics file.
pub struct Exporter<T> {
    transport: T,
    templates: RequestTemplates,
    output: PathBuf,
    clock: fn() -> i64,
}

impl<T: Transport> Exporter<T> {
    pub fn new(transport: T, templates: RequestTemplates, output: PathBuf) -> Self {
        Exporter {
            transport,
            templates,
            output,
            clock: wall_clock,
        }
    }

    /// Replaces the wall clock (Unix epoch seconds) used for timestamps and
    /// certificate day counts.
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Polls both sources. Failures end up in the snapshot's fetch status and
    /// never affect the other source.
    pub fn poll(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            domains: self.poll_source(Source::Domain, &self.templates.domain, parse_domain_list),
            certificates: self.poll_source(Source::Ssl, &self.templates.ssl, parse_ssl_list),
        }
    }

    /// Runs one full cycle and replaces the metrics file.
    ///
    /// Only a failure to render or write the file is an error; a failed poll
    /// is reported inside the file.
    pub fn run_cycle(&self) -> Result<CycleReport, ExporterError> {
        let snapshot = self.poll();
        let text = prom::render(&snapshot)?;
        write_atomic(&self.output, &text)?;

        let samples = text.lines().filter(|l| !l.starts_with('#')).count();
        info!("Wrote {} metrics to {}", samples, self.output.display());
        Ok(CycleReport::new(&snapshot, self.output.clone(), samples))
    }

    fn poll_source<R>(
        &self,
        source: Source,
        envelope: &str,
        parse: fn(&str) -> Result<Vec<R>, FetchError>,
    ) -> SourceSnapshot<R> {
        let result = self.fetch(envelope).and_then(|body| parse(&body));
        let timestamp = (self.clock)();

        match &result {
            Ok(records) => debug!("{} fetch returned {} records", source, records.len()),
            Err(e) => error!("{} fetch failed: {}", source, e),
        }
        SourceSnapshot::from_result(source, timestamp, result)
    }

    fn fetch(&self, envelope: &str) -> Result<String, FetchError> {
        let response = self.transport.post(envelope)?;
        if response.status != 200 {
            let detail = extract_fault(&response.body).unwrap_or(response.body);
            return Err(FetchError::HttpStatus {
                code: response.status,
                detail,
            });
        }
        Ok(response.body)
    }
}

/// Replaces `path` with `contents` via a temporary file and rename, so
/// readers see either the old or the new file and never a partial one.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), ExporterError> {
    let io_error = |source| ExporterError::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(io_error)?;

    let mut file = NamedTempFile::new_in(dir).map_err(io_error)?;
    file.write_all(contents.as_bytes()).map_err(io_error)?;
    file.as_file().sync_all().map_err(io_error)?;

    // temp files are created 0600, scrapers usually run as another user
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.as_file()
            .set_permissions(fs::Permissions::from_mode(0o644))
            .map_err(io_error)?;
    }

    file.persist(path).map_err(|e| io_error(e.error))?;
    Ok(())
}
