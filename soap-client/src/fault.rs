//! SOAP fault parsing
//!
//! Faults are read from SOAP 1.2 (`Code/Value`, `Reason/Text`, `Detail`) with a
//! fallback to the SOAP 1.1 layout (`faultcode`, `faultstring`, `detail`).

use std::fmt;
use xmltree::{Element, XMLNode};

/// Structured detail of a SOAP fault
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    /// Fault code without its namespace prefix, e.g. "Sender" or "Receiver"
    pub code: String,
    /// First subcode, e.g. "ter:NotAuthorized" reported as "NotAuthorized"
    pub subcode: Option<String>,
    /// Human-readable reason text
    pub reason: String,
    /// Raw `Detail` element, when the service sent one
    pub detail: Option<Element>,
}

impl Fault {
    /// A client-side fault raised before anything reached the wire
    pub fn sender(reason: impl Into<String>) -> Self {
        Self {
            code: "Sender".to_string(),
            subcode: None,
            reason: reason.into(),
            detail: None,
        }
    }

    /// Parse a `Fault` element.
    ///
    /// Missing pieces never fail the parse; a device that sends an empty
    /// fault still produces one, with code "Receiver" and an empty reason.
    pub fn from_element(fault: &Element) -> Self {
        if let Some(code) = fault.get_child("Code") {
            let value = code
                .get_child("Value")
                .and_then(text_of)
                .map(|v| strip_prefix(&v))
                .unwrap_or_else(|| "Receiver".to_string());
            let subcode = code
                .get_child("Subcode")
                .and_then(|s| s.get_child("Value"))
                .and_then(text_of)
                .map(|v| strip_prefix(&v));
            let reason = fault
                .get_child("Reason")
                .and_then(|r| r.get_child("Text"))
                .and_then(text_of)
                .unwrap_or_default();

            return Self {
                code: value,
                subcode,
                reason,
                detail: fault.get_child("Detail").cloned(),
            };
        }

        // SOAP 1.1
        Self {
            code: fault
                .get_child("faultcode")
                .and_then(text_of)
                .map(|v| strip_prefix(&v))
                .unwrap_or_else(|| "Receiver".to_string()),
            subcode: None,
            reason: fault
                .get_child("faultstring")
                .and_then(text_of)
                .unwrap_or_default(),
            detail: fault.get_child("detail").cloned(),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subcode {
            Some(sub) => write!(f, "{}/{}: {}", self.code, sub, self.reason),
            None => write!(f, "{}: {}", self.code, self.reason),
        }
    }
}

fn text_of(element: &Element) -> Option<String> {
    let text: String = element
        .children
        .iter()
        .filter_map(|node| match node {
            XMLNode::Text(t) | XMLNode::CData(t) => Some(t.as_str()),
            _ => None,
        })
        .collect();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn strip_prefix(qname: &str) -> String {
    qname.rsplit(':').next().unwrap_or(qname).to_string()
}
