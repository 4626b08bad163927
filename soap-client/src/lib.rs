//! Private SOAP client for ONVIF device communication
//!
//! This crate provides a minimal SOAP 1.2 client: it wraps a request body and
//! any per-request header elements in an envelope, POSTs it, and hands back
//! either the response element or a categorised [`SoapError`]. Services are
//! declared by hand through [`ServiceDescription`] rather than parsed from WSDL.

mod description;
mod error;
mod fault;

pub use description::{Method, Port, Service, ServiceDescription, ServiceDescriptionBuilder};
pub use error::SoapError;
pub use fault::Fault;

use std::time::Duration;
use xmltree::{EmitterConfig, Element};

/// SOAP 1.2 envelope namespace
pub const SOAP_ENV_NS: &str = "http://www.w3.org/2003/05/soap-envelope";

/// Prefix bound to [`SOAP_ENV_NS`] on every envelope this crate sends.
/// Header elements may use it for attributes such as `mustUnderstand`.
pub const SOAP_ENV_PREFIX: &str = "s";

/// Timeouts applied to every request made by a [`SoapClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapClientConfig {
    /// Default: 5 seconds
    pub connect_timeout: Duration,
    /// Default: 10 seconds
    pub read_timeout: Duration,
}

impl Default for SoapClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(10),
        }
    }
}

impl SoapClientConfig {
    /// Shorter timeouts for cameras on the local segment
    pub fn fast() -> Self {
        Self {
            connect_timeout: Duration::from_secs(2),
            read_timeout: Duration::from_secs(4),
        }
    }
}

/// A minimal SOAP client for ONVIF device communication
#[derive(Debug, Clone)]
pub struct SoapClient {
    agent: ureq::Agent,
}

impl SoapClient {
    /// Create a new SOAP client with default configuration
    pub fn new() -> Self {
        Self::with_config(&SoapClientConfig::default())
    }

    pub fn with_config(config: &SoapClientConfig) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout_connect(config.connect_timeout)
                .timeout_read(config.read_timeout)
                .build(),
        }
    }

    /// Send a SOAP request and return the parsed response element
    ///
    /// # Arguments
    /// * `endpoint` - Full endpoint URL, e.g. "http://192.168.0.1/onvif/device_service"
    /// * `action` - Optional SOAPAction, sent as the `action` media-type parameter
    /// * `method` - Operation name; the reply is expected to carry `<method>Response`
    /// * `headers` - Elements placed verbatim under `s:Header`
    /// * `body` - The request element placed under `s:Body`
    pub fn call(
        &self,
        endpoint: &str,
        action: Option<&str>,
        method: &str,
        headers: &[Element],
        body: &Element,
    ) -> Result<Element, SoapError> {
        let envelope = build_envelope(headers, body)?;

        let content_type = match action {
            Some(action) => format!("application/soap+xml; charset=utf-8; action=\"{}\"", action),
            None => "application/soap+xml; charset=utf-8".to_string(),
        };

        tracing::debug!(endpoint, method, headers = headers.len(), "sending SOAP request");

        let response = match self
            .agent
            .post(endpoint)
            .set("Content-Type", &content_type)
            .send_string(&envelope)
        {
            Ok(response) => response,
            // Devices report faults with 4xx/5xx statuses, so the body still matters
            Err(ureq::Error::Status(status, response)) => {
                let text = match response.into_string() {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::debug!(status, error = %e, "failed to read error response body");
                        String::new()
                    }
                };
                return Err(match Element::parse(text.as_bytes()) {
                    Ok(xml) => match extract_response(&xml, method) {
                        Err(SoapError::Fault(fault)) => SoapError::Fault(fault),
                        _ => SoapError::Network(format!("HTTP {}", status)),
                    },
                    Err(_) => SoapError::Network(format!("HTTP {}", status)),
                });
            }
            Err(e) => return Err(SoapError::Network(e.to_string())),
        };

        let xml_text = response
            .into_string()
            .map_err(|e| SoapError::Network(e.to_string()))?;

        let xml = Element::parse(xml_text.as_bytes())
            .map_err(|e| SoapError::Parse(e.to_string()))?;

        extract_response(&xml, method)
    }
}

impl Default for SoapClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialize an element without an XML declaration
pub fn element_to_string(element: &Element) -> Result<String, SoapError> {
    let mut buf = Vec::new();
    element
        .write_with_config(&mut buf, EmitterConfig::new().write_document_declaration(false))
        .map_err(|e| SoapError::Build(format!("request element: {}", e)))?;
    String::from_utf8(buf).map_err(|e| SoapError::Build(format!("request element: {}", e)))
}

fn build_envelope(headers: &[Element], body: &Element) -> Result<String, SoapError> {
    let header_xml = headers
        .iter()
        .map(element_to_string)
        .collect::<Result<Vec<_>, _>>()?
        .join("");

    Ok(format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><{p}:Envelope xmlns:{p}="{env}"><{p}:Header>{headers}</{p}:Header><{p}:Body>{body}</{p}:Body></{p}:Envelope>"#,
        p = SOAP_ENV_PREFIX,
        env = SOAP_ENV_NS,
        headers = header_xml,
        body = element_to_string(body)?
    ))
}

fn extract_response(xml: &Element, method: &str) -> Result<Element, SoapError> {
    let body = xml
        .get_child("Body")
        .ok_or_else(|| SoapError::Parse("Missing SOAP Body".to_string()))?;

    // Check for SOAP fault first
    if let Some(fault) = body.get_child("Fault") {
        let fault = Fault::from_element(fault);
        tracing::warn!(code = %fault.code, reason = %fault.reason, "SOAP fault received");
        return Err(SoapError::Fault(fault));
    }

    let response_name = format!("{}Response", method);
    body.get_child(response_name.as_str())
        .cloned()
        .ok_or_else(|| SoapError::Parse(format!("Missing {} element", response_name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soap_client_creation() {
        let _client = SoapClient::new();
        let _default_client = SoapClient::default();
        let _fast_client = SoapClient::with_config(&SoapClientConfig::fast());
    }

    #[test]
    fn test_build_envelope_places_headers_and_body() {
        let mut header = Element::new("Security");
        header.children.push(xmltree::XMLNode::Text("token".to_string()));
        let body = Element::new("GetHostname");

        let envelope = build_envelope(&[header], &body).unwrap();

        assert!(envelope.contains(r#"xmlns:s="http://www.w3.org/2003/05/soap-envelope""#));
        assert!(envelope.contains(&format!(
            "<{}:Envelope xmlns:{}=\"{}\"",
            SOAP_ENV_PREFIX, SOAP_ENV_PREFIX, SOAP_ENV_NS
        )));
        assert!(envelope.contains("<s:Header><Security>token</Security></s:Header>"));
        assert!(envelope.contains("<s:Body><GetHostname"));
        assert_eq!(envelope.matches("<?xml").count(), 1);
    }

    #[test]
    fn test_extract_response_with_valid_response() {
        let xml_str = r#"
            <s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope">
                <s:Body>
                    <tds:GetHostnameResponse xmlns:tds="http://www.onvif.org/ver10/device/wsdl">
                        <tds:HostnameInformation><tt:Name xmlns:tt="http://www.onvif.org/ver10/schema">cam</tt:Name></tds:HostnameInformation>
                    </tds:GetHostnameResponse>
                </s:Body>
            </s:Envelope>
        "#;

        let xml = Element::parse(xml_str.as_bytes()).unwrap();
        let response = extract_response(&xml, "GetHostname").unwrap();
        assert_eq!(response.name, "GetHostnameResponse");
    }

    #[test]
    fn test_extract_response_with_soap_fault() {
        let xml_str = r#"
            <s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope">
                <s:Body>
                    <s:Fault>
                        <s:Code><s:Value>s:Sender</s:Value></s:Code>
                        <s:Reason><s:Text xml:lang="en">Invalid Args</s:Text></s:Reason>
                    </s:Fault>
                </s:Body>
            </s:Envelope>
        "#;

        let xml = Element::parse(xml_str.as_bytes()).unwrap();
        match extract_response(&xml, "SetHostname").unwrap_err() {
            SoapError::Fault(fault) => {
                assert_eq!(fault.code, "Sender");
                assert_eq!(fault.reason, "Invalid Args");
            }
            _ => panic!("Expected SoapError::Fault"),
        }
    }

    #[test]
    fn test_extract_response_missing_body() {
        let xml_str = r#"
            <s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope">
            </s:Envelope>
        "#;

        let xml = Element::parse(xml_str.as_bytes()).unwrap();
        match extract_response(&xml, "GetHostname").unwrap_err() {
            SoapError::Parse(msg) => assert!(msg.contains("Missing SOAP Body")),
            _ => panic!("Expected SoapError::Parse"),
        }
    }

    #[test]
    fn test_extract_response_missing_action_response() {
        let xml_str = r#"
            <s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope">
                <s:Body>
                </s:Body>
            </s:Envelope>
        "#;

        let xml = Element::parse(xml_str.as_bytes()).unwrap();
        match extract_response(&xml, "GetHostname").unwrap_err() {
            SoapError::Parse(msg) => assert!(msg.contains("Missing GetHostnameResponse element")),
            _ => panic!("Expected SoapError::Parse"),
        }
    }
}
