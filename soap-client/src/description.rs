//! Hand-declared service descriptions
//!
//! A [`ServiceDescription`] lists the services, ports and methods a client is
//! allowed to invoke. It stands in for a parsed WSDL: lookups fail with the
//! same not-found errors a WSDL-backed client would raise, and each method
//! records whether it declares a SOAP header slot.

use std::collections::{BTreeMap, BTreeSet};

use xmltree::Element;

use crate::error::SoapError;

/// A single invocable operation on a port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    pub name: String,
    /// SOAPAction sent with the request, if the binding declares one
    pub soap_action: Option<String>,
    /// Whether the binding declares SOAP headers for this method
    pub accepts_headers: bool,
}

impl Method {
    /// A method that declares a header slot, which is what authenticated
    /// ONVIF operations need
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            soap_action: None,
            accepts_headers: true,
        }
    }

    pub fn with_soap_action(mut self, action: impl Into<String>) -> Self {
        self.soap_action = Some(action.into());
        self
    }

    pub fn without_headers(mut self) -> Self {
        self.accepts_headers = false;
        self
    }
}

/// An addressable endpoint exposing a set of methods
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    pub name: String,
    /// Endpoint URL the envelope is POSTed to
    pub address: String,
    /// Target namespace for request bodies and created types
    pub namespace: String,
    methods: BTreeMap<String, Method>,
}

impl Port {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            namespace: namespace.into(),
            methods: BTreeMap::new(),
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.methods.insert(method.name.clone(), method);
        self
    }

    /// Look up a method by name
    pub fn method(&self, name: &str) -> Result<&Method, SoapError> {
        self.methods
            .get(name)
            .ok_or_else(|| SoapError::MethodNotFound(name.to_string()))
    }

    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.methods.values()
    }
}

/// A named service grouping one or more ports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub name: String,
    ports: Vec<Port>,
}

impl Service {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ports: Vec::new(),
        }
    }

    pub fn with_port(mut self, port: Port) -> Self {
        self.ports.push(port);
        self
    }

    /// Look up a port by name
    pub fn port(&self, name: &str) -> Result<&Port, SoapError> {
        self.ports
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| SoapError::PortNotFound(name.to_string()))
    }

    /// The port used when the caller does not name one
    pub fn default_port(&self) -> Result<&Port, SoapError> {
        self.ports
            .first()
            .ok_or_else(|| SoapError::PortNotFound(format!("{} (no ports declared)", self.name)))
    }
}

/// Validated set of services available to a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescription {
    services: BTreeMap<String, Service>,
    types: BTreeSet<String>,
}

impl ServiceDescription {
    pub fn builder() -> ServiceDescriptionBuilder {
        ServiceDescriptionBuilder::default()
    }

    /// Look up a service by name
    pub fn service(&self, name: &str) -> Result<&Service, SoapError> {
        self.services
            .get(name)
            .ok_or_else(|| SoapError::ServiceNotFound(name.to_string()))
    }

    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.services.values()
    }

    /// Create an empty instance of a declared type in the port's namespace.
    ///
    /// Method names count as declared types so request bodies can be built
    /// the same way as any other type.
    pub fn create_type(&self, port: &Port, name: &str) -> Result<Element, SoapError> {
        let declared = self.types.contains(name) || port.method(name).is_ok();
        if !declared {
            return Err(SoapError::TypeNotFound(name.to_string()));
        }

        let mut element = Element::new(name);
        element.namespace = Some(port.namespace.clone());
        let mut namespaces = xmltree::Namespace::empty();
        namespaces.put("", port.namespace.as_str());
        element.namespaces = Some(namespaces);
        Ok(element)
    }
}

/// Builder collecting services and types before validation
#[derive(Debug, Default)]
pub struct ServiceDescriptionBuilder {
    services: Vec<Service>,
    types: Vec<String>,
}

impl ServiceDescriptionBuilder {
    pub fn service(mut self, service: Service) -> Self {
        self.services.push(service);
        self
    }

    pub fn declare_type(mut self, name: impl Into<String>) -> Self {
        self.types.push(name.into());
        self
    }

    /// Validate and freeze the description.
    ///
    /// # Errors
    ///
    /// Returns `SoapError::Build` when no service is declared, a name is
    /// declared twice, a service has no ports, or a port address is not an
    /// HTTP(S) URL.
    pub fn build(self) -> Result<ServiceDescription, SoapError> {
        if self.services.is_empty() {
            return Err(SoapError::Build("service description declares no services".to_string()));
        }

        let mut services = BTreeMap::new();
        for service in self.services {
            if service.ports.is_empty() {
                return Err(SoapError::Build(format!(
                    "service '{}' declares no ports",
                    service.name
                )));
            }

            let mut port_names = BTreeSet::new();
            for port in &service.ports {
                if !port_names.insert(port.name.as_str()) {
                    return Err(SoapError::Build(format!(
                        "port '{}' declared twice in service '{}'",
                        port.name, service.name
                    )));
                }
                if !(port.address.starts_with("http://") || port.address.starts_with("https://")) {
                    return Err(SoapError::Build(format!(
                        "port '{}' has invalid address '{}'",
                        port.name, port.address
                    )));
                }
            }

            if services.contains_key(&service.name) {
                return Err(SoapError::Build(format!(
                    "service '{}' declared twice",
                    service.name
                )));
            }
            services.insert(service.name.clone(), service);
        }

        Ok(ServiceDescription {
            services,
            types: self.types.into_iter().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = "http://www.onvif.org/ver10/device/wsdl";

    fn description() -> ServiceDescription {
        ServiceDescription::builder()
            .service(
                Service::new("devicemgmt").with_port(
                    Port::new("DevicePort", "http://192.168.0.1/onvif/device_service", NS)
                        .with_method(Method::new("GetHostname"))
                        .with_method(Method::new("GetSystemDateAndTime").without_headers()),
                ),
            )
            .declare_type("HostnameInformation")
            .build()
            .unwrap()
    }

    #[test]
    fn test_lookup_chain() {
        let desc = description();
        let port = desc.service("devicemgmt").unwrap().port("DevicePort").unwrap();
        let method = port.method("GetHostname").unwrap();
        assert!(method.accepts_headers);
        assert!(!port.method("GetSystemDateAndTime").unwrap().accepts_headers);
    }

    #[test]
    fn test_lookup_failures() {
        let desc = description();
        assert!(matches!(desc.service("ptz"), Err(SoapError::ServiceNotFound(name)) if name == "ptz"));

        let service = desc.service("devicemgmt").unwrap();
        assert!(matches!(service.port("Other"), Err(SoapError::PortNotFound(_))));

        let port = service.default_port().unwrap();
        assert!(matches!(port.method("GetFoo"), Err(SoapError::MethodNotFound(name)) if name == "GetFoo"));
    }

    #[test]
    fn test_create_type() {
        let desc = description();
        let port = desc.service("devicemgmt").unwrap().default_port().unwrap();

        let element = desc.create_type(port, "HostnameInformation").unwrap();
        assert_eq!(element.name, "HostnameInformation");
        assert_eq!(element.namespace.as_deref(), Some(NS));

        assert!(desc.create_type(port, "GetHostname").is_ok());
        assert!(matches!(
            desc.create_type(port, "Missing"),
            Err(SoapError::TypeNotFound(_))
        ));
    }

    #[test]
    fn test_build_rejects_empty() {
        assert!(matches!(
            ServiceDescription::builder().build(),
            Err(SoapError::Build(_))
        ));
    }

    #[test]
    fn test_build_rejects_bad_address() {
        let result = ServiceDescription::builder()
            .service(Service::new("devicemgmt").with_port(Port::new("DevicePort", "ftp://cam", NS)))
            .build();
        match result {
            Err(SoapError::Build(msg)) => assert!(msg.contains("invalid address")),
            other => panic!("Expected SoapError::Build, got {:?}", other),
        }
    }

    #[test]
    fn test_build_rejects_duplicates() {
        let port = || Port::new("DevicePort", "http://cam/onvif/device_service", NS);
        let result = ServiceDescription::builder()
            .service(Service::new("devicemgmt").with_port(port()))
            .service(Service::new("devicemgmt").with_port(port()))
            .build();
        assert!(matches!(result, Err(SoapError::Build(_))));

        let result = ServiceDescription::builder()
            .service(Service::new("devicemgmt").with_port(port()).with_port(port()))
            .build();
        assert!(matches!(result, Err(SoapError::Build(_))));
    }

    #[test]
    fn test_build_rejects_portless_service() {
        let result = ServiceDescription::builder()
            .service(Service::new("media"))
            .build();
        assert!(matches!(result, Err(SoapError::Build(msg)) if msg.contains("no ports")));
    }
}
