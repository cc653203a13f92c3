//! SOAP transport.
//!
//! The exporter only needs "POST this envelope, give me status and body", so
//! that is all [`Transport`] offers. [`SoapClient`] is the HTTP implementation.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use url::Url;

use crate::error::FetchError;

/// Endpoint of the reseller SOAP API.
pub const DEFAULT_ENDPOINT: &str = "https://soap.domain-bestellsystem.de/soap.php";

/// Built-in `domainListExtended` request.
pub const DOMAIN_LIST_REQUEST: &str = include_str!("../requests/domain_list.xml");
/// Built-in SSL certificate listing request.
pub const SSL_LIST_REQUEST: &str = include_str!("../requests/ssl_list.xml");

/// Raw answer of the SOAP endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapResponse {
    pub status: u16,
    pub body: String,
}

/// Something that can deliver a SOAP envelope and return the raw response.
pub trait Transport {
    /// Sends `envelope` and returns the response, whatever its status code.
    ///
    /// Only failures that leave no response at all are errors.
    fn post(&self, envelope: &str) -> Result<SoapResponse, FetchError>;
}

/// Blocking HTTP client for the SOAP endpoint with Basic authentication.
pub struct SoapClient {
    client: Client,
    endpoint: Url,
    username: String,
    password: String,
}

impl SoapClient {
    /// Creates a client for `endpoint`.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - SOAP endpoint URL
    /// * `username` - Basic auth user
    /// * `password` - Basic auth password
    /// * `timeout` - Upper bound for a whole request, connect to last byte
    pub fn new(
        endpoint: Url,
        username: String,
        password: String,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/xml; charset=utf-8"),
        );
        headers.insert("SOAPAction", HeaderValue::from_static(""));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| FetchError::Transport {
                endpoint: endpoint.to_string(),
                status: None,
                source,
            })?;

        Ok(SoapClient {
            client,
            endpoint,
            username,
            password,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl Transport for SoapClient {
    fn post(&self, envelope: &str) -> Result<SoapResponse, FetchError> {
        let to_error = |status, source| FetchError::Transport {
            endpoint: self.endpoint.to_string(),
            status,
            source,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .basic_auth(&self.username, Some(&self.password))
            .body(envelope.to_owned())
            .send()
            .map_err(|e| to_error(None, e))?;

        let status = response.status().as_u16();
        // the status line is in, only the body went missing
        let body = response.text().map_err(|e| to_error(Some(status), e))?;
        Ok(SoapResponse { status, body })
    }
}
