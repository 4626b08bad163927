//! ONVIF camera client
//!
//! This crate authenticates ONVIF requests with a WS-Security UsernameToken
//! (PasswordDigest profile) and classifies every failure from the SOAP layer
//! into a small, stable set of error codes. Envelope handling lives in the
//! private `soap-client` crate.
//!
//! # Quick Start
//!
//! ```no_run
//! use onvif::{CameraConfig, ErrorCode, OnvifCamera};
//!
//! let camera = OnvifCamera::new(
//!     CameraConfig::new("192.168.0.1", 80).with_credentials("admin", "admin"),
//! )?;
//!
//! match camera.invoke("devicemgmt", "GetDeviceInformation", None) {
//!     Ok(info) => println!("{:?}", info),
//!     Err(e) if e.code() == ErrorCode::Protocol => eprintln!("device refused: {}", e),
//!     Err(e) => return Err(e),
//! }
//! # Ok::<(), onvif::OnvifError>(())
//! ```
//!
//! # Tokens
//!
//! [`UsernameDigestToken`] can also be used on its own to produce the
//! `wsse:UsernameToken` element for another SOAP stack. A token forgets its
//! nonce and timestamp after serialization, so the next call carries fresh
//! ones.

pub mod camera;
pub mod config;
pub mod error;
pub mod logging;
pub mod token;

pub use camera::OnvifCamera;
pub use config::{CameraConfig, ConfigError, Credentials, TokenConfig};
pub use error::{ErrorCode, OnvifError, Result};
pub use soap_client::{Fault, SoapError};
pub use token::UsernameDigestToken;
