//! SOAP response parsing.
//!
//! Both parsers work on a namespace-aware [`roxmltree`] document and match
//! elements by exact local name, so a prefix like `ns1:` never matters and
//! similarly named tags never match by accident.
//!
//! # Submodules
//!
//! - `domain` - `domainListExtended` responses
//! - `ssl` - SSL certificate listing responses

pub mod domain;
pub mod ssl;

use roxmltree::{Document, Node};
use serde::Serialize;
use strum_macros::{Display, EnumString};

use crate::error::FetchError;

pub use domain::{parse_domain_list, DomainRecord};
pub use ssl::{parse_ssl_list, SslRecord};

const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// The two SOAP sources polled every cycle.
///
/// The string form doubles as the metric name prefix and the `source` label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Domain,
    Ssl,
}

/// Parses a SOAP response body, rejecting bodies that carry a SOAP fault.
pub(crate) fn parse_envelope(text: &str) -> Result<Document<'_>, FetchError> {
    let doc = Document::parse(text)?;
    if let Some(fault) = fault_string(&doc) {
        return Err(FetchError::Parse {
            reason: format!("SOAP fault: {}", fault),
        });
    }
    Ok(doc)
}

/// Extracts the `faultstring` of a SOAP fault from a raw response body.
///
/// Returns `None` when the body is not XML or carries no fault.
pub fn extract_fault(text: &str) -> Option<String> {
    Document::parse(text).ok().and_then(|doc| fault_string(&doc))
}

fn fault_string(doc: &Document<'_>) -> Option<String> {
    let fault = doc.descendants().find(|n| {
        n.is_element() && n.tag_name().name() == "Fault" && n.tag_name().namespace() == Some(SOAP_ENV_NS)
    })?;
    let message = child(fault, "faultstring").map(text_of).unwrap_or_default();
    Some(if message.is_empty() {
        "unknown fault".to_string()
    } else {
        message
    })
}

/// First direct element child with the given local name.
pub(crate) fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == name)
}

/// Text content of an element, empty when it has none.
pub(crate) fn text_of(node: Node<'_, '_>) -> String {
    node.text().unwrap_or_default().to_string()
}

/// Local part of the element's `xsi:type`, e.g. `SslInfo` for `ns1:SslInfo`.
pub(crate) fn xsi_type<'a>(node: Node<'a, '_>) -> Option<&'a str> {
    let value = node
        .attributes()
        .find(|a| a.name() == "type" && a.namespace().map_or(true, |ns| ns == XSI_NS))?
        .value();
    Some(value.rsplit(':').next().unwrap_or(value))
}
