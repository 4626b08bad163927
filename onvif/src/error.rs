use std::fmt;

use soap_client::{Fault, SoapError};
use thiserror::Error;

/// Coarse category of an [`OnvifError`].
///
/// The discriminants are stable so callers can log or compare them as numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Anything not recognised below, e.g. HTTP or transport failures
    Unknown = 1,
    /// The device answered with a fault, or the request did not match the
    /// declared services, ports, methods or types
    Protocol = 2,
    /// The service description itself is unusable; no classification rule
    /// currently yields it
    Wsdl = 3,
    /// The client or service description could not be built
    Build = 4,
}

impl ErrorCode {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCode::Unknown => "unknown",
            ErrorCode::Protocol => "protocol",
            ErrorCode::Wsdl => "wsdl",
            ErrorCode::Build => "build",
        };
        f.write_str(name)
    }
}

/// A classified ONVIF failure.
///
/// Built from a [`SoapError`] and never changed afterwards. Displays as its
/// reason.
#[derive(Debug, Clone, Error)]
#[error("{reason}")]
pub struct OnvifError {
    code: ErrorCode,
    reason: String,
    fault: Option<Fault>,
}

impl OnvifError {
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Structured fault detail; present only for protocol faults
    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }
}

/// Type alias for results that can return an OnvifError
pub type Result<T> = std::result::Result<T, OnvifError>;

/// Classify a SOAP-layer failure. Total: every input yields exactly one error.
impl From<SoapError> for OnvifError {
    fn from(error: SoapError) -> Self {
        // Remote faults and rejected headers both carry a fault
        if let Some(fault) = error.fault() {
            return Self {
                code: ErrorCode::Protocol,
                reason: fault.reason.clone(),
                fault: Some(fault),
            };
        }

        let (code, reason) = match error {
            SoapError::ServiceNotFound(_)
            | SoapError::PortNotFound(_)
            | SoapError::MethodNotFound(_)
            | SoapError::TypeNotFound(_) => (ErrorCode::Protocol, error.to_string()),
            SoapError::Build(_) => (ErrorCode::Build, error.to_string()),
            _ => (ErrorCode::Unknown, format!("Unknown error: {}", error)),
        };

        Self {
            code,
            reason,
            fault: None,
        }
    }
}

impl From<crate::config::ConfigError> for OnvifError {
    fn from(error: crate::config::ConfigError) -> Self {
        SoapError::Build(format!("camera configuration: {}", error)).into()
    }
}
