//! Configuration types for the onvif crate
//!
//! These structures describe how to reach a camera and how requests are
//! authenticated. Values can be assembled in code or read from the
//! environment with [`CameraConfig::from_env`].

use std::fmt;

use soap_client::SoapClientConfig;

use crate::token::DEFAULT_NONCE_LEN;

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration value: {0}")]
    Missing(&'static str),

    #[error("Invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Settings for the UsernameToken attached to each request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenConfig {
    /// Number of random bytes in each nonce
    /// Default: 16
    pub nonce_len: usize,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            nonce_len: DEFAULT_NONCE_LEN,
        }
    }
}

/// Username and password for WS-Security authentication
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything needed to talk to one camera
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraConfig {
    /// Host name or IP address of the device
    pub host: String,

    /// HTTP port of the device service
    /// Default: 80
    pub port: u16,

    /// Credentials; requests are sent unauthenticated when absent
    pub credentials: Option<Credentials>,

    pub token: TokenConfig,

    pub soap: SoapClientConfig,
}

impl CameraConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            credentials: None,
            token: TokenConfig::default(),
            soap: SoapClientConfig::default(),
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    pub fn with_token(mut self, token: TokenConfig) -> Self {
        self.token = token;
        self
    }

    pub fn with_soap(mut self, soap: SoapClientConfig) -> Self {
        self.soap = soap;
        self
    }

    /// URL of the device management service
    pub fn device_service_url(&self) -> String {
        format!("http://{}:{}/onvif/device_service", self.host, self.port)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::Missing("host"));
        }
        if self.host.contains(|c: char| c.is_whitespace() || c == '/') {
            return Err(ConfigError::Invalid {
                key: "host",
                value: self.host.clone(),
                reason: "must be a bare host name or address".to_string(),
            });
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid {
                key: "port",
                value: self.port.to_string(),
                reason: "must be non-zero".to_string(),
            });
        }
        if let Some(credentials) = &self.credentials {
            if credentials.username.is_empty() {
                return Err(ConfigError::Missing("username"));
            }
        }
        if self.token.nonce_len == 0 {
            return Err(ConfigError::Invalid {
                key: "nonce_len",
                value: "0".to_string(),
                reason: "nonce must contain at least one byte".to_string(),
            });
        }
        Ok(())
    }

    /// Read configuration from the environment
    ///
    /// - `ONVIF_HOST` (required)
    /// - `ONVIF_PORT` (default 80)
    /// - `ONVIF_USER` and `ONVIF_PASSWORD` (both or neither)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("ONVIF_HOST").ok_or(ConfigError::Missing("ONVIF_HOST"))?;
        let port = match lookup("ONVIF_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                key: "ONVIF_PORT",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => 80,
        };

        let mut config = Self::new(host, port);
        match (lookup("ONVIF_USER"), lookup("ONVIF_PASSWORD")) {
            (Some(user), Some(password)) => config = config.with_credentials(user, password),
            (None, None) => {}
            (Some(_), None) => return Err(ConfigError::Missing("ONVIF_PASSWORD")),
            (None, Some(_)) => return Err(ConfigError::Missing("ONVIF_USER")),
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = CameraConfig::new("192.168.0.1", 80);
        assert_eq!(config.token.nonce_len, 16);
        assert!(config.credentials.is_none());
        assert_eq!(
            config.device_service_url(),
            "http://192.168.0.1:80/onvif/device_service"
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(matches!(
            CameraConfig::new("", 80).validate(),
            Err(ConfigError::Missing("host"))
        ));
        assert!(matches!(
            CameraConfig::new("cam/onvif", 80).validate(),
            Err(ConfigError::Invalid { key: "host", .. })
        ));
        assert!(matches!(
            CameraConfig::new("cam", 0).validate(),
            Err(ConfigError::Invalid { key: "port", .. })
        ));
        assert!(matches!(
            CameraConfig::new("cam", 80).with_credentials("", "x").validate(),
            Err(ConfigError::Missing("username"))
        ));
        assert!(matches!(
            CameraConfig::new("cam", 80)
                .with_token(TokenConfig { nonce_len: 0 })
                .validate(),
            Err(ConfigError::Invalid { key: "nonce_len", .. })
        ));
    }

    #[test]
    fn test_from_lookup() {
        let config = CameraConfig::from_lookup(lookup(&[
            ("ONVIF_HOST", "10.0.0.5"),
            ("ONVIF_PORT", "8080"),
            ("ONVIF_USER", "admin"),
            ("ONVIF_PASSWORD", "admin"),
        ]))
        .unwrap();

        assert_eq!(config.host, "10.0.0.5");
        assert_eq!(config.port, 8080);
        let credentials = config.credentials.unwrap();
        assert_eq!(credentials.username, "admin");
        assert_eq!(credentials.password(), "admin");
    }

    #[test]
    fn test_from_lookup_errors() {
        assert!(matches!(
            CameraConfig::from_lookup(lookup(&[])),
            Err(ConfigError::Missing("ONVIF_HOST"))
        ));
        assert!(matches!(
            CameraConfig::from_lookup(lookup(&[("ONVIF_HOST", "cam"), ("ONVIF_PORT", "eighty")])),
            Err(ConfigError::Invalid { key: "ONVIF_PORT", .. })
        ));
        assert!(matches!(
            CameraConfig::from_lookup(lookup(&[("ONVIF_HOST", "cam"), ("ONVIF_USER", "admin")])),
            Err(ConfigError::Missing("ONVIF_PASSWORD"))
        ));
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let debug = format!("{:?}", Credentials::new("admin", "hunter2"));
        assert!(!debug.contains("hunter2"));
    }
}
