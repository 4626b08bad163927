//! Error types for the SOAP client

use thiserror::Error;

use crate::fault::Fault;

/// Errors that can occur during SOAP communication
///
/// Each variant is one failure category the ONVIF layer knows how to
/// classify. Lookups against a [`ServiceDescription`](crate::ServiceDescription)
/// report the missing name verbatim.
#[derive(Debug, Error)]
pub enum SoapError {
    /// Network or HTTP communication error
    #[error("Network/HTTP error: {0}")]
    Network(String),

    /// XML parsing error
    #[error("XML parsing error: {0}")]
    Parse(String),

    /// SOAP fault returned by the server
    #[error("SOAP fault: {}", .0.reason)]
    Fault(Fault),

    /// SOAP headers were supplied for a method that declares none
    #[error("Method ({method}) was invoked with SOAP headers. The WSDL does not define SOAP headers for this method. Retry without the soapheaders keyword argument.")]
    HeadersNotPermitted { method: String },

    #[error("Service not found: '{0}'")]
    ServiceNotFound(String),

    #[error("Port not found: '{0}'")]
    PortNotFound(String),

    #[error("Method not found: '{0}'")]
    MethodNotFound(String),

    #[error("Type not found: '{0}'")]
    TypeNotFound(String),

    /// The client or its service description could not be constructed
    #[error("An error occurred while building ({0})")]
    Build(String),
}

impl SoapError {
    /// Build the headers-not-permitted condition for `method`
    pub fn headers_not_permitted(method: impl Into<String>) -> Self {
        Self::HeadersNotPermitted {
            method: method.into(),
        }
    }

    /// The fault carried by this error, if it has one.
    ///
    /// Headers-not-permitted is a client-side condition; it is reported as a
    /// `Sender` fault so callers can treat it like any other protocol fault.
    pub fn fault(&self) -> Option<Fault> {
        match self {
            SoapError::Fault(fault) => Some(fault.clone()),
            SoapError::HeadersNotPermitted { .. } => Some(Fault::sender(self.to_string())),
            _ => None,
        }
    }
}
