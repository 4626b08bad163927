use soap_client::{Method, Port, Service, ServiceDescription, SoapClient, SoapError};
use tracing::{debug, info, warn};
use xmltree::Element;

use crate::config::CameraConfig;
use crate::error::{OnvifError, Result};
use crate::token::{security_header, UsernameDigestToken};

/// Name of the device management service in the default description
pub const DEVICE_SERVICE: &str = "devicemgmt";
pub const DEVICE_PORT: &str = "DevicePort";
pub const DEVICE_WSDL_NS: &str = "http://www.onvif.org/ver10/device/wsdl";

/// Device management methods declared by [`device_description`].
/// `GetSystemDateAndTime` is the only one without a header slot; devices
/// answer it before authentication so clients can check clock skew.
const DEVICE_METHODS: &[&str] = &[
    "GetDeviceInformation",
    "GetCapabilities",
    "GetServices",
    "GetServiceCapabilities",
    "GetWsdlUrl",
    "GetHostname",
    "SetHostname",
    "SetHostnameFromDHCP",
    "GetDNS",
    "SetDNS",
    "GetNTP",
    "SetNTP",
    "GetDynamicDNS",
    "SetDynamicDNS",
];

/// Describe the device management service reachable at `address`
pub fn device_description(address: &str) -> std::result::Result<ServiceDescription, SoapError> {
    let action = |name: &str| format!("{}/{}", DEVICE_WSDL_NS, name);

    let port = DEVICE_METHODS.iter().fold(
        Port::new(DEVICE_PORT, address, DEVICE_WSDL_NS).with_method(
            Method::new("GetSystemDateAndTime")
                .with_soap_action(action("GetSystemDateAndTime"))
                .without_headers(),
        ),
        |port, &name| port.with_method(Method::new(name).with_soap_action(action(name))),
    );

    ServiceDescription::builder()
        .service(Service::new(DEVICE_SERVICE).with_port(port))
        .declare_type("HostnameInformation")
        .declare_type("DNSInformation")
        .declare_type("NTPInformation")
        .build()
}

/// A client for one ONVIF device
///
/// Every authenticated call mints its own [`UsernameDigestToken`], so a camera
/// can be shared between threads without nonces ever being reused.
///
/// ```no_run
/// use onvif::{CameraConfig, OnvifCamera};
///
/// let camera = OnvifCamera::new(
///     CameraConfig::new("192.168.0.1", 80).with_credentials("admin", "admin"),
/// )?;
/// let hostname = camera.invoke("devicemgmt", "GetHostname", None)?;
/// println!("{:?}", hostname);
/// # Ok::<(), onvif::OnvifError>(())
/// ```
#[derive(Debug, Clone)]
pub struct OnvifCamera {
    config: CameraConfig,
    soap_client: SoapClient,
    description: ServiceDescription,
}

impl OnvifCamera {
    /// Create a client for the device management service of the configured host
    pub fn new(config: CameraConfig) -> Result<Self> {
        config.validate()?;
        let description = device_description(&config.device_service_url())?;
        Self::with_description(config, description)
    }

    /// Create a client for a caller-declared set of services
    pub fn with_description(config: CameraConfig, description: ServiceDescription) -> Result<Self> {
        config.validate()?;
        info!(
            host = %config.host,
            port = config.port,
            authenticated = config.credentials.is_some(),
            "ONVIF camera client created"
        );
        Ok(Self {
            soap_client: SoapClient::with_config(&config.soap),
            config,
            description,
        })
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn description(&self) -> &ServiceDescription {
        &self.description
    }

    /// Create an empty instance of a declared type for `service`
    pub fn create_type(&self, service: &str, name: &str) -> Result<Element> {
        let port = self.description.service(service)?.default_port()?;
        Ok(self.description.create_type(port, name)?)
    }

    /// Invoke `method` on `service` with WS-Security headers when credentials
    /// are configured.
    ///
    /// A `None` body sends an empty request element named after the method.
    ///
    /// # Errors
    ///
    /// Fails with a protocol error if the method declares no header slot while
    /// credentials are configured; use [`invoke_anonymous`](Self::invoke_anonymous)
    /// for such methods.
    pub fn invoke(&self, service: &str, method: &str, body: Option<Element>) -> Result<Element> {
        self.dispatch(service, method, body, true)
    }

    /// Invoke `method` without any SOAP headers
    pub fn invoke_anonymous(
        &self,
        service: &str,
        method: &str,
        body: Option<Element>,
    ) -> Result<Element> {
        self.dispatch(service, method, body, false)
    }

    fn dispatch(
        &self,
        service: &str,
        method_name: &str,
        body: Option<Element>,
        authenticate: bool,
    ) -> Result<Element> {
        self.try_dispatch(service, method_name, body, authenticate)
            .map_err(|e| {
                let error = OnvifError::from(e);
                warn!(service, method = method_name, code = %error.code(), "ONVIF call failed: {}", error);
                error
            })
    }

    fn try_dispatch(
        &self,
        service: &str,
        method_name: &str,
        body: Option<Element>,
        authenticate: bool,
    ) -> std::result::Result<Element, SoapError> {
        let port = self.description.service(service)?.default_port()?;
        let method = port.method(method_name)?;
        let body = match body {
            Some(body) => body,
            None => self.description.create_type(port, method_name)?,
        };

        let mut headers = Vec::new();
        if let (true, Some(credentials)) = (authenticate, &self.config.credentials) {
            if !method.accepts_headers {
                return Err(SoapError::headers_not_permitted(method_name));
            }
            let mut token = UsernameDigestToken::new(&credentials.username, credentials.password())
                .with_nonce_len(self.config.token.nonce_len);
            headers.push(security_header(token.xml()));
        }

        debug!(
            service,
            method = method_name,
            endpoint = %port.address,
            authenticated = !headers.is_empty(),
            "invoking ONVIF method"
        );

        self.soap_client.call(
            &port.address,
            method.soap_action.as_deref(),
            method_name,
            &headers,
            &body,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn camera() -> OnvifCamera {
        OnvifCamera::new(CameraConfig::new("127.0.0.1", 1).with_credentials("admin", "admin")).unwrap()
    }

    #[test]
    fn test_default_description() {
        let description = device_description("http://cam/onvif/device_service").unwrap();
        let port = description.service(DEVICE_SERVICE).unwrap().port(DEVICE_PORT).unwrap();

        assert_eq!(port.address, "http://cam/onvif/device_service");
        assert_eq!(port.methods().count(), DEVICE_METHODS.len() + 1);

        let method = port.method("GetHostname").unwrap();
        assert!(method.accepts_headers);
        assert_eq!(
            method.soap_action.as_deref(),
            Some("http://www.onvif.org/ver10/device/wsdl/GetHostname")
        );
        assert!(!port.method("GetSystemDateAndTime").unwrap().accepts_headers);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let error = OnvifCamera::new(CameraConfig::new("", 80)).unwrap_err();
        assert_eq!(error.code(), ErrorCode::Build);
        assert!(error.reason().contains("host"));
    }

    #[test]
    fn test_unknown_service() {
        let error = camera().invoke("ptz", "GetNodes", None).unwrap_err();
        assert_eq!(error.code(), ErrorCode::Protocol);
        assert_eq!(error.reason(), "Service not found: 'ptz'");
    }

    #[test]
    fn test_unknown_method() {
        let error = camera().invoke(DEVICE_SERVICE, "GetFoo", None).unwrap_err();
        assert_eq!(error.code(), ErrorCode::Protocol);
        assert!(error.reason().contains("GetFoo"));
        assert!(error.fault().is_none());
    }

    #[test]
    fn test_headers_not_permitted_with_credentials() {
        let error = camera()
            .invoke(DEVICE_SERVICE, "GetSystemDateAndTime", None)
            .unwrap_err();
        assert_eq!(error.code(), ErrorCode::Protocol);
        assert!(error
            .reason()
            .contains("Method (GetSystemDateAndTime) was invoked with SOAP headers."));
    }

    #[test]
    fn test_create_type() {
        let camera = camera();
        let element = camera.create_type(DEVICE_SERVICE, "HostnameInformation").unwrap();
        assert_eq!(element.namespace.as_deref(), Some(DEVICE_WSDL_NS));

        let error = camera.create_type(DEVICE_SERVICE, "Bogus").unwrap_err();
        assert_eq!(error.code(), ErrorCode::Protocol);
    }

    #[test]
    fn test_transport_failure_is_unknown() {
        // Nothing listens on port 1
        let error = camera()
            .invoke_anonymous(DEVICE_SERVICE, "GetSystemDateAndTime", None)
            .unwrap_err();
        assert_eq!(error.code(), ErrorCode::Unknown);
        assert!(error.reason().starts_with("Unknown error: "));
    }
}
