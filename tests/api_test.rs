//! Integration tests for the public API
//!
//! The SOAP endpoint is replaced by a stub transport; everything else, from
//! parsing to the file on disk, is the real thing.

use std::fs;

use domainexporter::soap::{SoapResponse, Transport};
use domainexporter::{Exporter, FetchError, FetchState, RequestTemplates, Source};
use tempfile::tempdir;

const NOW: i64 = 1_700_000_000;
const DOMAIN_RESPONSE: &str = include_str!("fixtures/domain_list_response.xml");
const SSL_RESPONSE: &str = include_str!("fixtures/ssl_list_response.xml");

/// Routes requests by the SOAP operation named in the envelope.
struct StubApi {
    domain: fn() -> Result<SoapResponse, FetchError>,
    ssl: fn() -> Result<SoapResponse, FetchError>,
}

impl Transport for StubApi {
    fn post(&self, envelope: &str) -> Result<SoapResponse, FetchError> {
        if envelope.contains("domainListExtended") {
            (self.domain)()
        } else {
            (self.ssl)()
        }
    }
}

fn domain_ok() -> Result<SoapResponse, FetchError> {
    Ok(SoapResponse {
        status: 200,
        body: DOMAIN_RESPONSE.to_string(),
    })
}

fn ssl_ok() -> Result<SoapResponse, FetchError> {
    Ok(SoapResponse {
        status: 200,
        body: SSL_RESPONSE.to_string(),
    })
}

fn unavailable() -> Result<SoapResponse, FetchError> {
    Ok(SoapResponse {
        status: 503,
        body: "Service Unavailable".to_string(),
    })
}

fn unreachable() -> Result<SoapResponse, FetchError> {
    let source = reqwest::blocking::Client::new()
        .post("not a url")
        .build()
        .unwrap_err();
    Err(FetchError::Transport {
        endpoint: "https://soap.example.net/soap.php".to_string(),
        status: None,
        source,
    })
}

fn truncated() -> Result<SoapResponse, FetchError> {
    Ok(SoapResponse {
        status: 200,
        body: SSL_RESPONSE[..SSL_RESPONSE.len() / 2].to_string(),
    })
}

fn fixed_clock() -> i64 {
    NOW
}

fn stub(
    domain: fn() -> Result<SoapResponse, FetchError>,
    ssl: fn() -> Result<SoapResponse, FetchError>,
) -> StubApi {
    StubApi { domain, ssl }
}

fn samples<'a>(text: &'a str, name: &str) -> Vec<&'a str> {
    let prefix = format!("{}{{", name);
    text.lines().filter(|l| l.starts_with(&prefix)).collect()
}

#[test]
fn test_full_cycle() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("metrics").join("ext_domain_metrics.prom");
    let exporter = Exporter::new(stub(domain_ok, ssl_ok), RequestTemplates::builtin(), output.clone())
        .with_clock(fixed_clock);

    let report = exporter.run_cycle().unwrap();
    assert!(report.is_success());
    assert_eq!(report.output, output);

    let text = fs::read_to_string(&output).unwrap();
    let domains = samples(&text, "domain_info");
    assert_eq!(domains.len(), 2);
    assert!(domains.iter().all(|l| l.contains("toBeDeletedDate=\"\"")));
    assert!(text.contains("reseller=\"Acme \\\"Hosting\\\"\""));

    assert_eq!(samples(&text, "ssl_cert_info").len(), 3);
    assert!(text.contains("ssl_cert_days_remaining{domain=\"example.de\"} 10\n"));
    assert!(text.contains("ssl_cert_days_remaining{domain=\"expired.example.de\"} -10\n"));
    assert!(text.contains("ssl_cert_valid_not_after{domain=\"example.de\"} 1700864000\n"));
    assert!(!text.contains("{domain=\"pending.example.de\"}"));

    let success = samples(&text, "domain_fetch_success");
    assert_eq!(success.len(), 1);
    assert!(success[0].contains("status=\"success\""));
    assert!(success[0].contains("code=\"200\""));
    assert!(success[0].contains("error=\"\""));
    assert!(success[0].ends_with("} 1"));
    assert!(samples(&text, "ssl_fetch_timestamp")[0].ends_with("} 1700000000"));

    let sample_lines = text.lines().filter(|l| !l.starts_with('#')).count();
    assert_eq!(report.samples, sample_lines);
}

#[test]
fn test_http_error_keeps_other_source() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("metrics.prom");
    let exporter = Exporter::new(stub(unavailable, ssl_ok), RequestTemplates::builtin(), output.clone())
        .with_clock(fixed_clock);

    let report = exporter.run_cycle().unwrap();
    assert!(!report.is_success());
    assert_eq!(report.sources[0].source, Source::Domain);
    assert_eq!(report.sources[0].status, FetchState::Error);
    assert_eq!(report.sources[0].code, 503);

    let text = fs::read_to_string(&output).unwrap();
    assert!(samples(&text, "domain_info").is_empty());
    let success = samples(&text, "domain_fetch_success");
    assert_eq!(success.len(), 1);
    assert!(success[0].contains("code=\"503\""));
    assert!(success[0].contains("status=\"error\""));
    assert!(success[0].ends_with("} 0"));

    assert_eq!(samples(&text, "ssl_cert_info").len(), 3);
    assert!(samples(&text, "ssl_fetch_success")[0].ends_with("} 1"));
}

#[test]
fn test_unreachable_endpoint_reports_code_zero() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("metrics.prom");
    let exporter = Exporter::new(stub(unreachable, ssl_ok), RequestTemplates::builtin(), output.clone())
        .with_clock(fixed_clock);

    let report = exporter.run_cycle().unwrap();
    assert!(!report.is_success());
    assert_eq!(report.sources[0].status, FetchState::Error);
    assert_eq!(report.sources[0].code, 0);

    let text = fs::read_to_string(&output).unwrap();
    assert!(samples(&text, "domain_info").is_empty());
    let success = samples(&text, "domain_fetch_success");
    assert_eq!(success.len(), 1);
    assert!(success[0].contains("code=\"0\""));
    assert!(success[0].contains("status=\"error\""));
    assert!(success[0].contains("error=\"Request to https://soap.example.net/soap.php failed: "));
    assert!(success[0].ends_with("} 0"));
    assert!(samples(&text, "domain_fetch_timestamp")[0].contains("code=\"0\""));

    assert_eq!(samples(&text, "ssl_cert_info").len(), 3);
}

#[test]
fn test_malformed_response_emits_no_samples() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("metrics.prom");
    let exporter = Exporter::new(stub(domain_ok, truncated), RequestTemplates::builtin(), output.clone())
        .with_clock(fixed_clock);

    exporter.run_cycle().unwrap();

    let text = fs::read_to_string(&output).unwrap();
    assert_eq!(samples(&text, "domain_info").len(), 2);
    for family in [
        "ssl_cert_info",
        "ssl_cert_valid_not_before",
        "ssl_cert_valid_not_after",
        "ssl_cert_days_remaining",
    ] {
        assert!(samples(&text, family).is_empty());
        assert!(text.contains(&format!("# TYPE {} gauge\n", family)));
    }
    let success = samples(&text, "ssl_fetch_success");
    assert!(success[0].contains("error=\"Parse error: "));
    assert!(success[0].ends_with("} 0"));
}

#[test]
fn test_each_cycle_replaces_the_file() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("metrics.prom");

    let healthy = Exporter::new(stub(domain_ok, ssl_ok), RequestTemplates::builtin(), output.clone());
    healthy.run_cycle().unwrap();
    assert_eq!(samples(&fs::read_to_string(&output).unwrap(), "domain_info").len(), 2);

    let failing = Exporter::new(stub(unavailable, unavailable), RequestTemplates::builtin(), output.clone());
    failing.run_cycle().unwrap();
    let text = fs::read_to_string(&output).unwrap();
    assert!(samples(&text, "domain_info").is_empty());
    assert!(samples(&text, "ssl_cert_info").is_empty());
    assert_eq!(text.lines().filter(|l| !l.starts_with('#')).count(), 4);
}

#[test]
fn test_poll_without_writing() {
    let exporter = Exporter::new(stub(domain_ok, ssl_ok), RequestTemplates::builtin(), Default::default());
    let snapshot = exporter.poll();
    assert_eq!(snapshot.domains.records.len(), 2);
    assert_eq!(snapshot.certificates.records.len(), 3);
}

#[test]
fn test_unwritable_output_is_an_error() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, "").unwrap();

    let exporter = Exporter::new(
        stub(domain_ok, ssl_ok),
        RequestTemplates::builtin(),
        blocker.join("metrics.prom"),
    );
    assert!(exporter.run_cycle().is_err());
}
