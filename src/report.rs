//! Per-cycle report and its console renderings.

use std::path::PathBuf;

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use strum_macros::{Display, EnumString};

use crate::metrics::{FetchState, MetricsSnapshot, SourceSnapshot};
use crate::parser::Source;

/// How a finished cycle is printed to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ReportFormat {
    /// Print nothing, the log already says what happened
    Quiet,
    /// A table with one row per source
    Summary,
    /// The report as pretty-printed JSON
    Json,
}

/// Outcome of one source within a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub source: Source,
    pub status: FetchState,
    pub code: u16,
    pub records: usize,
    pub error: String,
    pub timestamp: i64,
}

impl<R> From<&SourceSnapshot<R>> for SourceReport {
    fn from(snapshot: &SourceSnapshot<R>) -> Self {
        let status = &snapshot.status;
        SourceReport {
            source: status.source,
            status: status.state,
            code: status.http_code,
            records: snapshot.records.len(),
            error: status.error.clone(),
            timestamp: status.timestamp,
        }
    }
}

/// What one cycle wrote and how each source fared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub output: PathBuf,
    /// Number of sample lines in the written file
    pub samples: usize,
    pub sources: Vec<SourceReport>,
}

impl CycleReport {
    pub fn new(snapshot: &MetricsSnapshot, output: PathBuf, samples: usize) -> Self {
        CycleReport {
            output,
            samples,
            sources: vec![
                SourceReport::from(&snapshot.domains),
                SourceReport::from(&snapshot.certificates),
            ],
        }
    }

    pub fn is_success(&self) -> bool {
        self.sources.iter().all(|s| s.status == FetchState::Success)
    }
}

/// Renders the report for the console. `Quiet` renders nothing.
pub fn render(report: &CycleReport, format: ReportFormat) -> Option<String> {
    match format {
        ReportFormat::Quiet => None,
        ReportFormat::Summary => Some(summary_table(report)),
        ReportFormat::Json => Some(
            serde_json::to_string_pretty(report)
                .unwrap_or_else(|e| format!("Failed to serialize report: {}", e)),
        ),
    }
}

fn summary_table(report: &CycleReport) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Source", "Status", "Code", "Records", "Error"]);

    for source in &report.sources {
        table.add_row(vec![
            source.source.to_string(),
            source.status.to_string(),
            source.code.to_string(),
            source.records.to_string(),
            source.error.clone(),
        ]);
    }

    format!(
        "{}\nWrote {} samples to {}",
        table,
        report.samples,
        report.output.display()
    )
}
