//! WS-Security UsernameToken with PasswordDigest
//!
//! The digest is `Base64(SHA-1(nonce || created || password))` as defined by the
//! UsernameToken Profile 1.0. A token fills in its nonce and timestamp lazily
//! and discards both once serialized, so every request carries fresh values.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use sha1::{Digest, Sha1};
use soap_client::SOAP_ENV_PREFIX;
use xmltree::{Element, Namespace, XMLNode};

pub const WSSE_NS: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";
pub const WSU_NS: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd";
pub const PASSWORD_DIGEST_TYPE: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-username-token-profile-1.0#PasswordDigest";
pub const BASE64_ENCODING_TYPE: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-soap-message-security-1.0#Base64Binary";

/// Nonce length used unless configured otherwise
pub const DEFAULT_NONCE_LEN: usize = 16;

/// ISO-8601 UTC with millisecond precision, e.g. `2012-10-29T08:18:34.836Z`
const CREATED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// A single-use UsernameToken carrying a password digest.
///
/// One token belongs to one outgoing request. The nonce comes from the token's
/// own random source (the OS generator unless one is injected with
/// [`with_rng`](UsernameDigestToken::with_rng)).
///
/// ```
/// use onvif::token::UsernameDigestToken;
///
/// let mut token = UsernameDigestToken::new("admin", "secret");
/// let element = token.xml();
/// assert_eq!(element.name, "UsernameToken");
/// assert!(token.nonce().is_none());
/// ```
pub struct UsernameDigestToken<R = OsRng> {
    username: String,
    password: String,
    nonce: Option<Vec<u8>>,
    created: Option<String>,
    // Last generated timestamp; survives consume so Created never repeats
    last_created: Option<DateTime<Utc>>,
    nonce_len: usize,
    rng: R,
}

impl UsernameDigestToken {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::with_rng(username, password, OsRng)
    }
}

impl<R: RngCore + CryptoRng> UsernameDigestToken<R> {
    /// Create a token drawing its nonces from `rng`
    pub fn with_rng(username: impl Into<String>, password: impl Into<String>, rng: R) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            nonce: None,
            created: None,
            last_created: None,
            nonce_len: DEFAULT_NONCE_LEN,
            rng,
        }
    }

    pub fn with_nonce_len(mut self, len: usize) -> Self {
        self.nonce_len = len;
        self
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn nonce(&self) -> Option<&[u8]> {
        self.nonce.as_deref()
    }

    pub fn created(&self) -> Option<&str> {
        self.created.as_deref()
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.password = password.into();
    }

    /// Pin the nonce instead of drawing a random one
    pub fn set_nonce(&mut self, nonce: impl Into<Vec<u8>>) {
        self.nonce = Some(nonce.into());
    }

    /// Pin the creation timestamp instead of using the current time
    pub fn set_created(&mut self, created: impl Into<String>) {
        self.created = Some(created.into());
    }

    /// Fill in the nonce and timestamp if they are not already set.
    ///
    /// Calling this repeatedly keeps the first values.
    pub fn ensure_generated(&mut self) {
        self.materialize();
    }

    /// Compute the password digest for the current nonce and timestamp.
    ///
    /// Missing values are generated first and kept, so a following
    /// [`xml`](Self::xml) call serializes the same nonce and timestamp.
    pub fn generate_digest(&mut self) -> String {
        let (nonce, created, password) = self.materialize();
        password_digest(nonce, created, password)
    }

    /// Forget the nonce and timestamp so the next digest uses fresh ones
    pub fn consume(&mut self) {
        self.nonce = None;
        self.created = None;
    }

    pub fn reset(&mut self) {
        self.consume();
    }

    /// Build the `wsse:UsernameToken` element, then consume the token.
    pub fn xml(&mut self) -> Element {
        let digest = self.generate_digest();
        let (nonce, created, _) = self.materialize();
        let nonce = BASE64.encode(nonce);
        let created = created.to_string();

        let mut root = prefixed("wsse", WSSE_NS, "UsernameToken");
        let mut namespaces = Namespace::empty();
        namespaces.put("wsse", WSSE_NS);
        namespaces.put("wsu", WSU_NS);
        root.namespaces = Some(namespaces);

        let mut username = prefixed("wsse", WSSE_NS, "Username");
        username.children.push(XMLNode::Text(self.username.clone()));

        let mut password = prefixed("wsse", WSSE_NS, "Password");
        password
            .attributes
            .insert("Type".to_string(), PASSWORD_DIGEST_TYPE.to_string());
        password.children.push(XMLNode::Text(digest));

        let mut nonce_el = prefixed("wsse", WSSE_NS, "Nonce");
        nonce_el
            .attributes
            .insert("EncodingType".to_string(), BASE64_ENCODING_TYPE.to_string());
        nonce_el.children.push(XMLNode::Text(nonce));

        let mut created_el = prefixed("wsu", WSU_NS, "Created");
        created_el.children.push(XMLNode::Text(created));

        root.children.extend(
            [username, password, nonce_el, created_el]
                .into_iter()
                .map(XMLNode::Element),
        );

        self.consume();
        root
    }

    fn materialize(&mut self) -> (&[u8], &str, &str) {
        let nonce_len = self.nonce_len;
        let rng = &mut self.rng;
        let nonce = self.nonce.get_or_insert_with(|| {
            let mut bytes = vec![0u8; nonce_len];
            rng.fill_bytes(&mut bytes);
            bytes
        });
        let last_created = &mut self.last_created;
        let created = self
            .created
            .get_or_insert_with(|| next_created(last_created));
        (nonce.as_slice(), created.as_str(), self.password.as_str())
    }
}

impl<R> fmt::Debug for UsernameDigestToken<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UsernameDigestToken")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("nonce", &self.nonce.as_ref().map(|n| BASE64.encode(n)))
            .field("created", &self.created)
            .field("nonce_len", &self.nonce_len)
            .finish()
    }
}

/// Current time, moved forward past `last` at millisecond resolution so
/// successive timestamps from one token strictly increase.
fn next_created(last: &mut Option<DateTime<Utc>>) -> String {
    let mut at = Utc::now();
    if let Some(previous) = *last {
        if at.timestamp_millis() <= previous.timestamp_millis() {
            at = previous + Duration::milliseconds(1);
        }
    }
    *last = Some(at);
    at.format(CREATED_FORMAT).to_string()
}

/// `Base64(SHA-1(nonce || created || password))`
pub fn password_digest(nonce: &[u8], created: &str, password: &str) -> String {
    let mut sha = Sha1::new();
    sha.update(nonce);
    sha.update(created.as_bytes());
    sha.update(password.as_bytes());
    BASE64.encode(sha.finalize())
}

/// Wrap a UsernameToken in a `wsse:Security` header block.
///
/// `mustUnderstand` is qualified with [`SOAP_ENV_PREFIX`], which the
/// envelope built by [`SoapClient`](soap_client::SoapClient) binds.
pub fn security_header(token: Element) -> Element {
    let mut security = prefixed("wsse", WSSE_NS, "Security");
    let mut namespaces = Namespace::empty();
    namespaces.put("wsse", WSSE_NS);
    security.namespaces = Some(namespaces);
    security
        .attributes
        .insert(format!("{}:mustUnderstand", SOAP_ENV_PREFIX), "1".to_string());
    security.children.push(XMLNode::Element(token));
    security
}

fn prefixed(prefix: &str, namespace: &str, name: &str) -> Element {
    let mut element = Element::new(name);
    element.prefix = Some(prefix.to_string());
    element.namespace = Some(namespace.to_string());
    element
}
