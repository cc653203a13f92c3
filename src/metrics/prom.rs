use std::collections::HashMap;

use prometheus::core::Collector;
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};

use super::{FetchStatus, MetricsSnapshot};
use crate::parser::{DomainRecord, SslRecord};

const SUCCESS_LABELS: [&str; 5] = ["timestamp", "status", "code", "error", "source"];
const TIMESTAMP_LABELS: [&str; 4] = ["status", "code", "error", "source"];

/// Renders a snapshot as a complete Prometheus text exposition document.
///
/// Families are written in a fixed order: domain info, domain fetch status,
/// the four certificate families, certificate fetch status. A family without
/// samples still gets its `# HELP` and `# TYPE` lines.
///
/// The per-domain certificate families (`not_before`, `not_after`,
/// `days_remaining`) carry one sample per domain, taken from the certificate
/// of that domain that expires last.
///
/// # Arguments
///
/// * `snapshot` - Records and fetch status of both sources for one cycle
pub fn render(snapshot: &MetricsSnapshot) -> Result<String, prometheus::Error> {
    let mut out = Vec::new();

    let domains = &snapshot.domains;
    let domain_info = gauge_vec(
        "domain_info",
        "Domain state with extra labels",
        &DomainRecord::LABELS,
    )?;
    for record in &domains.records {
        domain_info
            .get_metric_with_label_values(&record.label_values())?
            .set(1.0);
    }
    encode(&domain_info, &mut out)?;
    encode_status(&domains.status, &mut out)?;

    let certificates = &snapshot.certificates;
    // one reference point for every certificate of this poll
    let now = certificates.status.timestamp;
    let cert_info = gauge_vec(
        "ssl_cert_info",
        "SSL certificate details with extra labels",
        &SslRecord::INFO_LABELS,
    )?;
    let not_before = gauge_vec(
        "ssl_cert_valid_not_before",
        "Certificate validity start as Unix timestamp",
        &["domain"],
    )?;
    let not_after = gauge_vec(
        "ssl_cert_valid_not_after",
        "Certificate validity end as Unix timestamp",
        &["domain"],
    )?;
    let days_remaining = gauge_vec(
        "ssl_cert_days_remaining",
        "Days until the certificate expires, negative once expired",
        &["domain"],
    )?;

    for cert in &certificates.records {
        cert_info
            .get_metric_with_label_values(&cert.info_label_values())?
            .set(1.0);
    }
    for cert in latest_per_domain(&certificates.records) {
        let domain = [cert.domain.as_str()];
        if let Some(from) = cert.valid_from() {
            not_before.get_metric_with_label_values(&domain)?.set(from as f64);
        }
        if let Some(to) = cert.valid_to() {
            not_after.get_metric_with_label_values(&domain)?.set(to as f64);
        }
        if let Some(days) = cert.days_remaining(now) {
            days_remaining
                .get_metric_with_label_values(&domain)?
                .set(days as f64);
        }
    }
    for family in [&cert_info, &not_before, &not_after, &days_remaining] {
        encode(family, &mut out)?;
    }
    encode_status(&certificates.status, &mut out)?;

    String::from_utf8(out).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

/// Certificates with validity bounds, reduced to the one with the latest
/// `notValidAfter` per domain. Ties keep the earlier record.
fn latest_per_domain(records: &[SslRecord]) -> Vec<&SslRecord> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut latest: Vec<&SslRecord> = Vec::new();

    for cert in records.iter().filter(|c| c.validity() != (0, 0)) {
        match index.get(cert.domain.as_str()).copied() {
            Some(i) => {
                if latest[i].validity().1 < cert.validity().1 {
                    latest[i] = cert;
                }
            }
            None => {
                index.insert(cert.domain.as_str(), latest.len());
                latest.push(cert);
            }
        }
    }
    latest
}

/// Writes the `<source>_fetch_success` and `<source>_fetch_timestamp` pair.
fn encode_status(status: &FetchStatus, out: &mut Vec<u8>) -> Result<(), prometheus::Error> {
    let source = status.source.to_string();
    let timestamp = status.timestamp.to_string();
    let state = status.state.to_string();
    let code = status.http_code.to_string();

    let success = gauge_vec(
        &format!("{}_fetch_success", source),
        "Was the last fetch successful (1) or not (0)",
        &SUCCESS_LABELS,
    )?;
    success
        .get_metric_with_label_values(&[
            timestamp.as_str(),
            state.as_str(),
            code.as_str(),
            status.error.as_str(),
            source.as_str(),
        ])?
        .set(if status.is_success() { 1.0 } else { 0.0 });

    let fetched_at = gauge_vec(
        &format!("{}_fetch_timestamp", source),
        "Unix timestamp of last fetch attempt",
        &TIMESTAMP_LABELS,
    )?;
    fetched_at
        .get_metric_with_label_values(&[
            state.as_str(),
            code.as_str(),
            status.error.as_str(),
            source.as_str(),
        ])?
        .set(status.timestamp as f64);

    encode(&success, out)?;
    encode(&fetched_at, out)
}

fn gauge_vec(name: &str, help: &str, labels: &[&str]) -> Result<GaugeVec, prometheus::Error> {
    GaugeVec::new(Opts::new(name, help), labels)
}

/// Encodes a single family. Each gets its own registry so the output order is
/// ours rather than the registry's name ordering.
fn encode(family: &GaugeVec, out: &mut Vec<u8>) -> Result<(), prometheus::Error> {
    let registry = Registry::new();
    registry.register(Box::new(family.clone()))?;
    let gathered = registry.gather();
    if !gathered.is_empty() {
        return TextEncoder::new().encode(&gathered, out);
    }

    // the registry drops families without samples, so the header is ours
    for desc in family.desc() {
        let header = format!(
            "# HELP {name} {help}\n# TYPE {name} gauge\n",
            name = desc.fq_name,
            help = desc.help.replace('\\', "\\\\").replace('\n', "\\n"),
        );
        out.extend_from_slice(header.as_bytes());
    }
    Ok(())
}
