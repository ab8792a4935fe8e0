//! Pre-parsed HTTP headers.
//!
//! Headers are kept as an ordered list of [`HttpHeader`] values instead of a
//! map: duplicates are allowed and "first match" lookups depend on the order
//! in which the headers were declared.
//!
//! Every header the message model reasons about has its own typed variant and
//! payload struct. Those structs implement [`TypedHeader`], which is how
//! [`HttpMessage::header`](crate::protocol::HttpMessage::header) performs an
//! exact-type lookup without any runtime type inspection. Everything else is
//! carried as a [`RawHeader`].

use std::fmt;

use http::{header, HeaderName, HeaderValue, Method};
use mime::Mime;

use crate::protocol::MessageError;

/// The stable discriminant of an [`HttpHeader`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum HeaderKind {
    Host,
    Connection,
    Upgrade,
    ContentEncoding,
    ContentType,
    Allow,
    WwwAuthenticate,
    ContentRange,
    SecWebSocketProtocol,
    Raw,
}

/// A single pre-parsed header.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HttpHeader {
    Host(Host),
    Connection(Connection),
    Upgrade(Upgrade),
    ContentEncoding(ContentEncoding),
    ContentType(ContentType),
    Allow(Allow),
    WwwAuthenticate(WwwAuthenticate),
    ContentRange(ContentRange),
    SecWebSocketProtocol(SecWebSocketProtocol),
    Raw(RawHeader),
}

/// Implemented by every typed header payload.
///
/// `from_header` only matches the header's own variant, so a lookup through
/// this trait is an exact-type match.
pub trait TypedHeader: Clone + Sized + 'static {
    const KIND: HeaderKind;

    fn from_header(header: &HttpHeader) -> Option<&Self>;

    fn into_header(self) -> HttpHeader;
}

macro_rules! typed_header {
    ($ty:ident, $name:literal, $lowercase:literal) => {
        impl TypedHeader for $ty {
            const KIND: HeaderKind = HeaderKind::$ty;

            #[inline]
            fn from_header(header: &HttpHeader) -> Option<&Self> {
                match header {
                    HttpHeader::$ty(h) => Some(h),
                    _ => None,
                }
            }

            #[inline]
            fn into_header(self) -> HttpHeader {
                HttpHeader::$ty(self)
            }
        }

        impl From<$ty> for HttpHeader {
            #[inline]
            fn from(header: $ty) -> Self {
                HttpHeader::$ty(header)
            }
        }

        impl $ty {
            #[doc = concat!("The header name `", $name, "`.")]
            pub const NAME: &'static str = $name;
            #[doc = concat!("The lowercase header name `", $lowercase, "`.")]
            pub const LOWERCASE_NAME: &'static str = $lowercase;
        }
    };
}

typed_header!(Host, "Host", "host");
typed_header!(Connection, "Connection", "connection");
typed_header!(Upgrade, "Upgrade", "upgrade");
typed_header!(ContentEncoding, "Content-Encoding", "content-encoding");
typed_header!(ContentType, "Content-Type", "content-type");
typed_header!(Allow, "Allow", "allow");
typed_header!(WwwAuthenticate, "WWW-Authenticate", "www-authenticate");
typed_header!(ContentRange, "Content-Range", "content-range");
typed_header!(SecWebSocketProtocol, "Sec-WebSocket-Protocol", "sec-websocket-protocol");

impl TypedHeader for RawHeader {
    const KIND: HeaderKind = HeaderKind::Raw;

    fn from_header(header: &HttpHeader) -> Option<&Self> {
        match header {
            HttpHeader::Raw(h) => Some(h),
            _ => None,
        }
    }

    fn into_header(self) -> HttpHeader {
        HttpHeader::Raw(self)
    }
}

impl From<RawHeader> for HttpHeader {
    fn from(header: RawHeader) -> Self {
        HttpHeader::Raw(header)
    }
}

impl HttpHeader {
    pub fn kind(&self) -> HeaderKind {
        match self {
            HttpHeader::Host(_) => HeaderKind::Host,
            HttpHeader::Connection(_) => HeaderKind::Connection,
            HttpHeader::Upgrade(_) => HeaderKind::Upgrade,
            HttpHeader::ContentEncoding(_) => HeaderKind::ContentEncoding,
            HttpHeader::ContentType(_) => HeaderKind::ContentType,
            HttpHeader::Allow(_) => HeaderKind::Allow,
            HttpHeader::WwwAuthenticate(_) => HeaderKind::WwwAuthenticate,
            HttpHeader::ContentRange(_) => HeaderKind::ContentRange,
            HttpHeader::SecWebSocketProtocol(_) => HeaderKind::SecWebSocketProtocol,
            HttpHeader::Raw(_) => HeaderKind::Raw,
        }
    }

    /// The header name as it is rendered.
    pub fn name(&self) -> &str {
        match self {
            HttpHeader::Host(_) => Host::NAME,
            HttpHeader::Connection(_) => Connection::NAME,
            HttpHeader::Upgrade(_) => Upgrade::NAME,
            HttpHeader::ContentEncoding(_) => ContentEncoding::NAME,
            HttpHeader::ContentType(_) => ContentType::NAME,
            HttpHeader::Allow(_) => Allow::NAME,
            HttpHeader::WwwAuthenticate(_) => WwwAuthenticate::NAME,
            HttpHeader::ContentRange(_) => ContentRange::NAME,
            HttpHeader::SecWebSocketProtocol(_) => SecWebSocketProtocol::NAME,
            HttpHeader::Raw(raw) => raw.name.as_str(),
        }
    }

    pub fn lowercase_name(&self) -> &str {
        match self {
            HttpHeader::Host(_) => Host::LOWERCASE_NAME,
            HttpHeader::Connection(_) => Connection::LOWERCASE_NAME,
            HttpHeader::Upgrade(_) => Upgrade::LOWERCASE_NAME,
            HttpHeader::ContentEncoding(_) => ContentEncoding::LOWERCASE_NAME,
            HttpHeader::ContentType(_) => ContentType::LOWERCASE_NAME,
            HttpHeader::Allow(_) => Allow::LOWERCASE_NAME,
            HttpHeader::WwwAuthenticate(_) => WwwAuthenticate::LOWERCASE_NAME,
            HttpHeader::ContentRange(_) => ContentRange::LOWERCASE_NAME,
            HttpHeader::SecWebSocketProtocol(_) => SecWebSocketProtocol::LOWERCASE_NAME,
            // HeaderName is always stored lowercase
            HttpHeader::Raw(raw) => raw.name.as_str(),
        }
    }

    /// The rendered header value.
    pub fn value(&self) -> String {
        match self {
            HttpHeader::Host(h) => h.to_string(),
            HttpHeader::Connection(h) => h.tokens.join(", "),
            HttpHeader::Upgrade(h) => join(&h.protocols, ", "),
            HttpHeader::ContentEncoding(h) => join(&h.encodings, ", "),
            HttpHeader::ContentType(h) => h.content_type.to_string(),
            HttpHeader::Allow(h) => join(&h.methods, ", "),
            HttpHeader::WwwAuthenticate(h) => join(&h.challenges, ", "),
            HttpHeader::ContentRange(h) => h.to_string(),
            HttpHeader::SecWebSocketProtocol(h) => h.protocols.join(", "),
            HttpHeader::Raw(raw) => String::from_utf8_lossy(raw.value.as_bytes()).into_owned(),
        }
    }

    /// Case-insensitive comparison against the header name.
    #[inline]
    pub fn is(&self, name: &str) -> bool {
        self.lowercase_name().eq_ignore_ascii_case(name)
    }

    /// `Content-Type` is derived from the entity and never rendered from the header list.
    pub fn renders_in_requests(&self) -> bool {
        !matches!(self, HttpHeader::ContentType(_))
    }

    pub fn renders_in_responses(&self) -> bool {
        !matches!(self, HttpHeader::ContentType(_))
    }

    /// Creates a header from its wire form.
    ///
    /// The typed headers are recognized with a lenient parser; a value that
    /// does not parse is kept as a [`RawHeader`].
    pub fn from_raw(name: HeaderName, value: HeaderValue) -> Self {
        let parsed = value.to_str().ok().and_then(|str| match name.as_str() {
            Host::LOWERCASE_NAME => Host::parse(str).map(HttpHeader::Host),
            Connection::LOWERCASE_NAME => Some(HttpHeader::Connection(Connection::new(split_tokens(str)))),
            Upgrade::LOWERCASE_NAME => Some(HttpHeader::Upgrade(Upgrade::new(
                split_tokens(str).into_iter().map(|token| UpgradeProtocol::parse(&token)).collect(),
            ))),
            ContentEncoding::LOWERCASE_NAME => Some(HttpHeader::ContentEncoding(ContentEncoding::new(
                split_tokens(str).iter().map(|token| HttpEncoding::from_token(token)).collect(),
            ))),
            ContentType::LOWERCASE_NAME => str.parse::<Mime>().ok().map(|mime| HttpHeader::ContentType(ContentType::new(mime))),
            Allow::LOWERCASE_NAME => split_tokens(str)
                .into_iter()
                .map(|token| Method::from_bytes(token.as_bytes()).ok())
                .collect::<Option<Vec<_>>>()
                .map(|methods| HttpHeader::Allow(Allow::new(methods))),
            SecWebSocketProtocol::LOWERCASE_NAME => {
                Some(HttpHeader::SecWebSocketProtocol(SecWebSocketProtocol::new(split_tokens(str))))
            }
            _ => None,
        });

        parsed.unwrap_or_else(|| HttpHeader::Raw(RawHeader::new(name, value)))
    }

    /// Creates a raw header, validating name and value.
    pub fn raw<N: AsRef<str>, V: AsRef<str>>(name: N, value: V) -> Result<Self, MessageError> {
        let header_name = HeaderName::from_bytes(name.as_ref().as_bytes())
            .map_err(|e| MessageError::invalid_header(name.as_ref(), e))?;
        let header_value =
            HeaderValue::from_str(value.as_ref()).map_err(|e| MessageError::invalid_header(name.as_ref(), e))?;
        Ok(HttpHeader::Raw(RawHeader::new(header_name, header_value)))
    }

    /// Renders the header into its `http` crate representation.
    pub fn to_header_pair(&self) -> Result<(HeaderName, HeaderValue), MessageError> {
        let name = match self {
            HttpHeader::Raw(raw) => return Ok((raw.name.clone(), raw.value.clone())),
            HttpHeader::Host(_) => header::HOST,
            HttpHeader::Connection(_) => header::CONNECTION,
            HttpHeader::Upgrade(_) => header::UPGRADE,
            HttpHeader::ContentEncoding(_) => header::CONTENT_ENCODING,
            HttpHeader::ContentType(_) => header::CONTENT_TYPE,
            HttpHeader::Allow(_) => header::ALLOW,
            HttpHeader::WwwAuthenticate(_) => header::WWW_AUTHENTICATE,
            HttpHeader::ContentRange(_) => header::CONTENT_RANGE,
            HttpHeader::SecWebSocketProtocol(_) => header::SEC_WEBSOCKET_PROTOCOL,
        };

        let value = HeaderValue::try_from(self.value()).map_err(|e| MessageError::invalid_header(self.name(), e))?;
        Ok((name, value))
    }
}

impl fmt::Display for HttpHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name(), self.value())
    }
}

fn split_tokens(str: &str) -> Vec<String> {
    str.split(',').map(str::trim).filter(|token| !token.is_empty()).map(ToString::to_string).collect()
}

fn join<T: fmt::Display>(items: &[T], separator: &str) -> String {
    items.iter().map(ToString::to_string).collect::<Vec<_>>().join(separator)
}

/// The `Host` header. An empty host is legal and means "no authority".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Host {
    host: String,
    port: Option<u16>,
}

impl Host {
    pub fn new<S: Into<String>>(host: S, port: Option<u16>) -> Self {
        Self { host: host.into(), port }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses `host[:port]`, including bracketed IPv6 literals.
    pub fn parse(str: &str) -> Option<Self> {
        let str = str.trim();
        if str.is_empty() {
            return Some(Self::empty());
        }

        let (host, port) = if str.starts_with('[') {
            let end = str.find(']')?;
            let (host, rest) = str.split_at(end + 1);
            match rest.strip_prefix(':') {
                Some(port) => (host, Some(port)),
                None if rest.is_empty() => (host, None),
                None => return None,
            }
        } else {
            match str.rsplit_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (str, None),
            }
        };

        let port = match port {
            Some(port) => Some(port.parse::<u16>().ok()?),
            None => None,
        };
        Some(Self::new(host, port))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.host.is_empty()
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{}", self.host, port),
            None => f.write_str(&self.host),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Connection {
    tokens: Vec<String>,
}

impl Connection {
    pub fn new(tokens: Vec<String>) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn has(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t.eq_ignore_ascii_case(token))
    }

    pub fn has_close(&self) -> bool {
        self.has("close")
    }

    pub fn has_keep_alive(&self) -> bool {
        self.has("keep-alive")
    }

    pub fn has_upgrade(&self) -> bool {
        self.has("upgrade")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UpgradeProtocol {
    name: String,
    version: Option<String>,
}

impl UpgradeProtocol {
    pub fn new<S: Into<String>>(name: S, version: Option<String>) -> Self {
        Self { name: name.into(), version }
    }

    fn parse(token: &str) -> Self {
        match token.split_once('/') {
            Some((name, version)) => Self::new(name, Some(version.to_string())),
            None => Self::new(token, None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

impl fmt::Display for UpgradeProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}/{}", self.name, version),
            None => f.write_str(&self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Upgrade {
    protocols: Vec<UpgradeProtocol>,
}

impl Upgrade {
    pub fn new(protocols: Vec<UpgradeProtocol>) -> Self {
        Self { protocols }
    }

    pub fn websocket() -> Self {
        Self::new(vec![UpgradeProtocol::new("websocket", None)])
    }

    pub fn protocols(&self) -> &[UpgradeProtocol] {
        &self.protocols
    }

    pub fn has_websocket(&self) -> bool {
        self.protocols.iter().any(|p| p.name.eq_ignore_ascii_case("websocket"))
    }
}

/// A content coding as used by `Content-Encoding` and `Accept-Encoding`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HttpEncoding {
    Identity,
    Gzip,
    Deflate,
    Br,
    Zstd,
    Custom(String),
}

impl HttpEncoding {
    pub fn from_token(token: &str) -> Self {
        let lowercase = token.to_ascii_lowercase();
        match lowercase.as_str() {
            "identity" => HttpEncoding::Identity,
            "gzip" | "x-gzip" => HttpEncoding::Gzip,
            "deflate" => HttpEncoding::Deflate,
            "br" => HttpEncoding::Br,
            "zstd" => HttpEncoding::Zstd,
            _ => HttpEncoding::Custom(lowercase),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            HttpEncoding::Identity => "identity",
            HttpEncoding::Gzip => "gzip",
            HttpEncoding::Deflate => "deflate",
            HttpEncoding::Br => "br",
            HttpEncoding::Zstd => "zstd",
            HttpEncoding::Custom(token) => token,
        }
    }
}

impl fmt::Display for HttpEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentEncoding {
    encodings: Vec<HttpEncoding>,
}

impl ContentEncoding {
    pub fn new(encodings: Vec<HttpEncoding>) -> Self {
        Self { encodings }
    }

    pub fn encodings(&self) -> &[HttpEncoding] {
        &self.encodings
    }
}

/// The synthetic `Content-Type` header; its value always mirrors the entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentType {
    content_type: Mime,
}

impl ContentType {
    pub fn new(content_type: Mime) -> Self {
        Self { content_type }
    }

    pub fn content_type(&self) -> &Mime {
        &self.content_type
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Allow {
    methods: Vec<Method>,
}

impl Allow {
    pub fn new(methods: Vec<Method>) -> Self {
        Self { methods }
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }
}

/// An authentication challenge as rendered in `WWW-Authenticate`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HttpChallenge {
    scheme: String,
    realm: Option<String>,
    params: Vec<(String, String)>,
}

impl HttpChallenge {
    pub fn new<S: Into<String>>(scheme: S, realm: Option<String>) -> Self {
        Self { scheme: scheme.into(), realm, params: Vec::new() }
    }

    pub fn basic<R: Into<String>>(realm: R) -> Self {
        Self::new("Basic", Some(realm.into()))
    }

    pub fn bearer<R: Into<String>>(realm: R) -> Self {
        Self::new("Bearer", Some(realm.into()))
    }

    #[must_use]
    pub fn with_param<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn realm(&self) -> Option<&str> {
        self.realm.as_deref()
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

impl fmt::Display for HttpChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.scheme)?;
        let mut separator = " ";
        if let Some(realm) = &self.realm {
            write!(f, " realm=\"{realm}\"")?;
            separator = ",";
        }
        for (key, value) in &self.params {
            write!(f, "{separator}{key}=\"{value}\"")?;
            separator = ",";
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WwwAuthenticate {
    challenges: Vec<HttpChallenge>,
}

impl WwwAuthenticate {
    pub fn new(challenges: Vec<HttpChallenge>) -> Self {
        Self { challenges }
    }

    pub fn challenges(&self) -> &[HttpChallenge] {
        &self.challenges
    }
}

/// The `Content-Range` header for byte ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentRange {
    /// `bytes first-last/length`, length may be unknown (`*`)
    Satisfiable { first: u64, last: u64, instance_length: Option<u64> },
    /// `bytes */length`
    Unsatisfiable { instance_length: u64 },
}

impl fmt::Display for ContentRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentRange::Satisfiable { first, last, instance_length: Some(length) } => {
                write!(f, "bytes {first}-{last}/{length}")
            }
            ContentRange::Satisfiable { first, last, instance_length: None } => write!(f, "bytes {first}-{last}/*"),
            ContentRange::Unsatisfiable { instance_length } => write!(f, "bytes */{instance_length}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecWebSocketProtocol {
    protocols: Vec<String>,
}

impl SecWebSocketProtocol {
    pub fn new(protocols: Vec<String>) -> Self {
        Self { protocols }
    }

    pub fn protocols(&self) -> &[String] {
        &self.protocols
    }
}

/// Any header without a typed representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawHeader {
    name: HeaderName,
    value: HeaderValue,
}

impl RawHeader {
    pub fn new(name: HeaderName, value: HeaderValue) -> Self {
        Self { name, value }
    }

    pub fn name(&self) -> &HeaderName {
        &self.name
    }

    pub fn value(&self) -> &HeaderValue {
        &self.value
    }
}
