//! The immutable HTTP request.
//!
//! Construction enforces three invariants, re-checked by every mutator that
//! can affect them:
//!
//! - the uri is not empty and its scheme, if any, is `http`, `https`, `ws` or `wss`
//! - a non-empty entity requires a method that accepts one
//! - an HTTP/1.0 request never carries a chunked entity

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

use http::request::Parts;
use http::uri::PathAndQuery;
use http::{Method, Request, Uri};

use crate::protocol::attribute::{AttributeKey, Attributes};
use crate::protocol::entity::HttpEntity;
use crate::protocol::header::{Host, HttpHeader};
use crate::protocol::message::{HttpMessage, from_header_map, render_header_map};
use crate::protocol::method::MethodExt;
use crate::protocol::settings::MessageSettings;
use crate::ensure;
use crate::protocol::{HttpProtocol, IllegalUriError, MessageError};

const REQUEST_HASH_SEED: u32 = 0x5265_7175;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    method: Method,
    uri: Uri,
    headers: Vec<HttpHeader>,
    attributes: Attributes,
    entity: HttpEntity,
    protocol: HttpProtocol,
}

impl Default for HttpRequest {
    /// `GET /` over HTTP/1.1 without headers or entity.
    fn default() -> Self {
        Self {
            method: Method::GET,
            uri: Uri::from_static("/"),
            headers: Vec::new(),
            attributes: Attributes::new(),
            entity: HttpEntity::empty(),
            protocol: HttpProtocol::Http11,
        }
    }
}

impl HttpRequest {
    pub fn builder() -> RequestBuilder {
        RequestBuilder::new()
    }

    /// A request with the given method and uri and otherwise default fields.
    pub fn new(method: Method, uri: Uri) -> Result<Self, MessageError> {
        Self { method, uri, ..Self::default() }.verify()
    }

    fn verify(self) -> Result<Self, MessageError> {
        verify_uri(&self.uri)?;
        ensure!(
            self.entity.is_known_empty() || self.method.is_entity_accepted(),
            MessageError::EntityNotAccepted { method: self.method }
        );
        ensure!(
            !(self.protocol.is_http10() && self.entity.is_chunked()),
            MessageError::ChunkedEntityOnHttp10 { kind: "requests" }
        );
        Ok(self)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn with_method(self, method: Method) -> Result<Self, MessageError> {
        Self { method, ..self }.verify()
    }

    pub fn with_uri(self, uri: Uri) -> Result<Self, MessageError> {
        Self { uri, ..self }.verify()
    }

    pub fn with_protocol(self, protocol: HttpProtocol) -> Result<Self, MessageError> {
        Self { protocol, ..self }.verify()
    }

    /// Resolves the effective request uri (RFC 7230 §5.5, §5.4).
    ///
    /// Headers are scanned until both a `Host` and an `Upgrade` header are
    /// found. A relative uri is completed with the first `Host` header, or with
    /// `default_host_header` if that header is missing or empty. The scheme is
    /// `ws`/`wss` when the `Upgrade` header asks for a websocket, otherwise
    /// `http`/`https`, depending on `secured_connection`.
    ///
    /// An absolute uri is returned unchanged as long as the `Host` header, if
    /// present, parses and agrees with its authority.
    pub fn effective_uri(&self, secured_connection: bool, default_host_header: &Host) -> Result<Uri, IllegalUriError> {
        let mut host_header: Option<HostHeader<'_>> = None;
        let mut is_websocket: Option<bool> = None;
        for header in &self.headers {
            match header {
                HttpHeader::Host(host) if host_header.is_none() => host_header = Some(HostHeader::Valid(Cow::Borrowed(host))),
                HttpHeader::Raw(_) if host_header.is_none() && header.is(Host::LOWERCASE_NAME) => {
                    host_header = Some(HostHeader::from_value(header.value()));
                }
                // a later Upgrade header overrides an earlier one until both are found
                HttpHeader::Upgrade(upgrade) => is_websocket = Some(upgrade.has_websocket()),
                _ => {}
            }
            if host_header.is_some() && is_websocket.is_some() {
                break;
            }
        }

        let is_websocket = is_websocket.unwrap_or(false);
        if self.uri.scheme().is_none() {
            resolve_relative(&self.uri, host_header.as_ref(), default_host_header, is_websocket, secured_connection)
        } else {
            verify_absolute(&self.uri, host_header.as_ref())
        }
    }

    /// Returns a copy with the uri replaced by [`effective_uri`](Self::effective_uri).
    pub fn with_effective_uri(self, secured_connection: bool, default_host_header: &Host) -> Result<Self, IllegalUriError> {
        let uri = self.effective_uri(secured_connection, default_host_header)?;
        Ok(Self { uri, ..self })
    }

    pub fn with_effective_uri_for(self, settings: &MessageSettings) -> Result<Self, IllegalUriError> {
        self.with_effective_uri(settings.secured_connection(), settings.default_host_header())
    }

    /// Builds a request from the parts of an [`http::Request`].
    ///
    /// `Content-Type` moves into the entity; `Content-Length` and
    /// `Transfer-Encoding` are described by the entity and dropped.
    pub fn try_from_parts(parts: Parts, entity: HttpEntity) -> Result<Self, MessageError> {
        let protocol = HttpProtocol::try_from(parts.version)?;
        let (headers, entity) = from_header_map(&parts.headers, entity);
        Self { method: parts.method, uri: parts.uri, headers, attributes: Attributes::new(), entity, protocol }.verify()
    }

    pub fn into_http(self) -> Result<Request<HttpEntity>, MessageError> {
        let header_map = render_header_map(&self.headers, &self.entity, HttpHeader::renders_in_requests)?;
        let mut request = Request::new(self.entity);
        *request.method_mut() = self.method;
        *request.uri_mut() = self.uri;
        *request.version_mut() = self.protocol.into();
        *request.headers_mut() = header_map;
        Ok(request)
    }
}

impl HttpMessage for HttpRequest {
    fn headers(&self) -> &[HttpHeader] {
        &self.headers
    }

    fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn entity(&self) -> &HttpEntity {
        &self.entity
    }

    fn protocol(&self) -> HttpProtocol {
        self.protocol
    }

    fn with_headers(self, headers: Vec<HttpHeader>) -> Self {
        Self { headers, ..self }
    }

    fn with_attributes(self, attributes: Attributes) -> Self {
        Self { attributes, ..self }
    }

    fn with_entity(self, entity: HttpEntity) -> Result<Self, MessageError> {
        Self { entity, ..self }.verify()
    }
}

impl Hash for HttpRequest {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(REQUEST_HASH_SEED);
        self.method.hash(state);
        self.uri.hash(state);
        self.headers.hash(state);
        self.attributes.hash(state);
        self.entity.hash(state);
        self.protocol.hash(state);
    }
}

fn verify_uri(uri: &Uri) -> Result<(), MessageError> {
    ensure!(
        uri.scheme().is_some() || uri.authority().is_some() || !uri.path().is_empty(),
        MessageError::EmptyUri
    );
    match uri.scheme_str() {
        Some(scheme) if !is_supported_scheme(scheme.as_bytes()) => Err(MessageError::invalid_scheme(scheme)),
        _ => Ok(()),
    }
}

/// Case-insensitive check for `http`, `https`, `ws` and `wss`, byte by byte.
fn is_supported_scheme(scheme: &[u8]) -> bool {
    let is = |byte: &u8, expected: u8| byte.to_ascii_lowercase() == expected;
    match scheme {
        [w, s] => is(w, b'w') && is(s, b's'),
        [w, s1, s2] => is(w, b'w') && is(s1, b's') && is(s2, b's'),
        [h, t1, t2, p] => is(h, b'h') && is(t1, b't') && is(t2, b't') && is(p, b'p'),
        [h, t1, t2, p, s] => is(h, b'h') && is(t1, b't') && is(t2, b't') && is(p, b'p') && is(s, b's'),
        _ => false,
    }
}

/// The first `Host` header of a request, or its raw value if it does not parse.
#[derive(Debug)]
enum HostHeader<'a> {
    Valid(Cow<'a, Host>),
    Malformed(String),
}

impl HostHeader<'_> {
    fn from_value(value: String) -> Self {
        match Host::parse(&value) {
            Some(host) => HostHeader::Valid(Cow::Owned(host)),
            None => HostHeader::Malformed(value),
        }
    }
}

impl fmt::Display for HostHeader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostHeader::Valid(host) => fmt::Display::fmt(host, f),
            HostHeader::Malformed(value) => f.write_str(value),
        }
    }
}

fn resolve_relative(
    uri: &Uri,
    host_header: Option<&HostHeader<'_>>,
    default_host_header: &Host,
    is_websocket: bool,
    secured_connection: bool,
) -> Result<Uri, IllegalUriError> {
    let fail = |detail: &str| {
        IllegalUriError::new(
            format!("Cannot establish effective URI of request to `{uri}`, request has a relative URI and {detail}"),
            "consider setting a default host header",
        )
    };

    let host = match host_header {
        Some(HostHeader::Valid(host)) if !host.is_empty() => &**host,
        Some(HostHeader::Malformed(_)) => return Err(fail("an invalid `Host` header")),
        Some(HostHeader::Valid(_)) if default_host_header.is_empty() => return Err(fail("an empty `Host` header")),
        None if default_host_header.is_empty() => return Err(fail("is missing a `Host` header")),
        _ => default_host_header,
    };

    let scheme = match (is_websocket, secured_connection) {
        (true, true) => "wss",
        (true, false) => "ws",
        (false, true) => "https",
        (false, false) => "http",
    };

    Uri::builder()
        .scheme(scheme)
        .authority(host.to_string())
        .path_and_query(uri.path_and_query().map_or("/", PathAndQuery::as_str))
        .build()
        .map_err(|e| IllegalUriError::new(format!("Cannot establish effective URI of request to `{uri}`"), e.to_string()))
}

fn verify_absolute(uri: &Uri, host_header: Option<&HostHeader<'_>>) -> Result<Uri, IllegalUriError> {
    let Some(host) = host_header else {
        return Ok(uri.clone());
    };

    let matches = match (host, uri.authority()) {
        (HostHeader::Malformed(_), _) => false,
        (HostHeader::Valid(host), None) => host.is_empty(),
        (HostHeader::Valid(host), Some(authority)) => {
            let default_port = uri.scheme_str().and_then(default_port);
            authority.host().eq_ignore_ascii_case(host.host())
                && authority.port_u16().or(default_port) == host.port().or(default_port)
        }
    };

    if matches {
        Ok(uri.clone())
    } else {
        Err(IllegalUriError::new(
            format!("'Host' header value of request to `{uri}` doesn't match request target authority"),
            format!(
                "Host header: {host}\nrequest target authority: {}",
                uri.authority().map_or("", http::uri::Authority::as_str)
            ),
        ))
    }
}

fn default_port(scheme: &str) -> Option<u16> {
    if scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("ws") {
        Some(80)
    } else if scheme.eq_ignore_ascii_case("https") || scheme.eq_ignore_ascii_case("wss") {
        Some(443)
    } else {
        None
    }
}

#[derive(Debug)]
pub struct RequestBuilder {
    method: Method,
    uri: Result<Uri, MessageError>,
    headers: Vec<HttpHeader>,
    attributes: Attributes,
    entity: HttpEntity,
    protocol: HttpProtocol,
}

impl RequestBuilder {
    fn new() -> Self {
        let request = HttpRequest::default();
        Self {
            method: request.method,
            uri: Ok(request.uri),
            headers: request.headers,
            attributes: request.attributes,
            entity: request.entity,
            protocol: request.protocol,
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn uri<U>(mut self, uri: U) -> Self
    where
        Uri: TryFrom<U>,
        <Uri as TryFrom<U>>::Error: Into<http::Error>,
    {
        self.uri = Uri::try_from(uri).map_err(|e| MessageError::invalid_uri(Into::<http::Error>::into(e)));
        self
    }

    pub fn header<H: Into<HttpHeader>>(mut self, header: H) -> Self {
        self.headers.push(header.into());
        self
    }

    pub fn headers<I: IntoIterator<Item = HttpHeader>>(mut self, headers: I) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn attribute<T>(mut self, key: &AttributeKey<T>, value: T) -> Self
    where
        T: std::any::Any + Send + Sync + std::fmt::Debug + PartialEq + Hash,
    {
        self.attributes = self.attributes.insert(key, value);
        self
    }

    pub fn entity<E: Into<HttpEntity>>(mut self, entity: E) -> Self {
        self.entity = entity.into();
        self
    }

    pub fn protocol(mut self, protocol: HttpProtocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn build(self) -> Result<HttpRequest, MessageError> {
        HttpRequest {
            method: self.method,
            uri: self.uri?,
            headers: self.headers,
            attributes: self.attributes,
            entity: self.entity,
            protocol: self.protocol,
        }
        .verify()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;

    use bytes::Bytes;
    use http::header::{CONTENT_LENGTH, CONTENT_TYPE};

    use super::*;
    use crate::protocol::entity::ByteSource;
    use crate::protocol::header::{Connection, ContentEncoding, ContentType, HttpEncoding, Upgrade};

    static TRACE_ID: AttributeKey<u64> = AttributeKey::from_static("trace-id");

    fn get(uri: &'static str) -> HttpRequest {
        HttpRequest::builder().uri(uri).build().unwrap()
    }

    fn chunked() -> HttpEntity {
        HttpEntity::chunked(mime::TEXT_PLAIN, ByteSource::from_chunks([Bytes::from_static(b"x")]))
    }

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn accept_supported_schemes() {
        for uri in ["http://a.com/", "HTTPS://a.com/", "ws://a.com/", "WsS://a.com/", "/relative"] {
            assert!(HttpRequest::builder().uri(uri).build().is_ok(), "{uri} should be accepted");
        }
    }

    #[test]
    fn reject_other_schemes() {
        let result = HttpRequest::builder().uri("ftp://a.com/").build();
        assert!(matches!(result, Err(MessageError::InvalidScheme { scheme }) if scheme == "ftp"));

        let result = HttpRequest::builder().uri("httpx://a.com/").build();
        assert!(matches!(result, Err(MessageError::InvalidScheme { .. })));
    }

    #[test]
    fn reject_unparsable_uri() {
        assert!(matches!(HttpRequest::builder().uri("").build(), Err(MessageError::InvalidUri { .. })));
    }

    #[test]
    fn entity_requires_accepting_method() {
        let result = HttpRequest::builder().method(Method::HEAD).entity(HttpEntity::text("body")).build();
        assert!(matches!(result, Err(MessageError::EntityNotAccepted { method }) if method == Method::HEAD));

        assert!(HttpRequest::builder().method(Method::HEAD).build().is_ok());
        assert!(HttpRequest::builder().method(Method::POST).entity(HttpEntity::text("body")).build().is_ok());
        assert!(HttpRequest::builder().method(Method::GET).entity(HttpEntity::text("body")).build().is_ok());
    }

    #[test]
    fn chunked_entity_on_http10() {
        let result = HttpRequest::builder().method(Method::POST).protocol(HttpProtocol::Http10).entity(chunked()).build();
        assert!(matches!(result, Err(MessageError::ChunkedEntityOnHttp10 { .. })));

        let request = HttpRequest::builder().method(Method::POST).entity(chunked()).build().unwrap();
        assert!(request.with_protocol(HttpProtocol::Http10).is_err());
    }

    #[test]
    fn mutators_recheck_invariants() {
        let request = HttpRequest::builder().method(Method::POST).entity(HttpEntity::text("body")).build().unwrap();
        assert!(request.clone().with_method(Method::TRACE).is_err());
        assert!(request.clone().with_uri(Uri::from_static("ftp://a.com/")).is_err());

        let request = HttpRequest::new(Method::TRACE, Uri::from_static("/")).unwrap();
        assert!(request.clone().with_entity(HttpEntity::text("body")).is_err());
        assert!(request.with_entity(HttpEntity::empty()).is_ok());
    }

    #[test]
    fn effective_uri_of_relative_request_uses_default_host() {
        let request = get("/path");
        let uri = request.effective_uri(false, &Host::new("example.com", Some(80))).unwrap();

        assert_eq!(uri.scheme_str(), Some("http"));
        assert_eq!(uri.authority().unwrap().as_str(), "example.com:80");
        assert_eq!(uri.path(), "/path");
    }

    #[test]
    fn effective_uri_prefers_host_header() {
        let request = get("/path?q=1").add_header(Host::new("a.com", None)).add_header(Host::new("b.com", None));
        let uri = request.effective_uri(true, &Host::new("example.com", None)).unwrap();

        assert_eq!(uri, Uri::from_static("https://a.com/path?q=1"));
    }

    #[test]
    fn effective_uri_falls_back_on_empty_host_header() {
        let request = get("/").add_header(Host::empty());
        let uri = request.effective_uri(false, &Host::new("example.com", None)).unwrap();
        assert_eq!(uri, Uri::from_static("http://example.com/"));

        let error = request.effective_uri(false, &Host::empty()).unwrap_err();
        assert!(error.summary().contains("an empty `Host` header"));
    }

    #[test]
    fn effective_uri_fails_without_any_host() {
        let error = get("/path").effective_uri(false, &Host::empty()).unwrap_err();
        assert!(error.summary().contains("is missing a `Host` header"));
    }

    #[test]
    fn effective_uri_of_websocket_upgrade() {
        let request = get("/chat").add_header(Host::new("a.com", None)).add_header(Upgrade::websocket());
        assert_eq!(request.effective_uri(false, &Host::empty()).unwrap(), Uri::from_static("ws://a.com/chat"));
        assert_eq!(request.effective_uri(true, &Host::empty()).unwrap(), Uri::from_static("wss://a.com/chat"));

        // the scan stops once a Host and an Upgrade header are found
        let request = request.add_header(Upgrade::new(vec![]));
        assert_eq!(request.effective_uri(false, &Host::empty()).unwrap(), Uri::from_static("ws://a.com/chat"));

        // before the Host header is found, a later Upgrade header overrides an earlier one
        let request = get("/chat")
            .add_header(Upgrade::websocket())
            .add_header(Upgrade::new(vec![]))
            .add_header(Host::new("a.com", None));
        assert_eq!(request.effective_uri(false, &Host::empty()).unwrap(), Uri::from_static("http://a.com/chat"));
    }

    #[test]
    fn effective_uri_with_malformed_host_header() {
        let malformed = HttpHeader::raw("Host", "a.com:http").unwrap();

        let absolute = get("http://a.com/x").add_header(malformed.clone());
        let error = absolute.effective_uri(false, &Host::empty()).unwrap_err();
        assert!(error.summary().contains("doesn't match request target authority"));
        assert!(error.detail().contains("a.com:http"));

        let relative = get("/x").add_header(malformed);
        let error = relative.effective_uri(false, &Host::new("default.com", None)).unwrap_err();
        assert!(error.summary().contains("an invalid `Host` header"));

        let parsable = get("http://a.com/x").add_header(HttpHeader::raw("host", "a.com:80").unwrap());
        assert_eq!(parsable.effective_uri(false, &Host::empty()).unwrap(), Uri::from_static("http://a.com/x"));
    }

    #[test]
    fn effective_uri_of_absolute_request() {
        let request = get("http://a.com/x");
        assert_eq!(request.effective_uri(false, &Host::empty()).unwrap(), Uri::from_static("http://a.com/x"));

        let request = request.add_header(Host::new("A.com", None));
        assert_eq!(request.effective_uri(false, &Host::empty()).unwrap(), Uri::from_static("http://a.com/x"));

        let with_port = get("http://a.com/x").add_header(Host::new("a.com", Some(80)));
        assert!(with_port.effective_uri(false, &Host::empty()).is_ok());
    }

    #[test]
    fn effective_uri_detects_host_mismatch() {
        let request = get("http://a.com/x").add_header(Host::new("b.com", None));
        let error = request.effective_uri(false, &Host::empty()).unwrap_err();
        assert!(error.summary().contains("doesn't match request target authority"));

        let request = get("http://a.com:8080/x").add_header(Host::new("a.com", None));
        assert!(request.effective_uri(false, &Host::empty()).is_err());
    }

    #[test]
    fn with_effective_uri() {
        let settings = MessageSettings::builder().default_host_header(Host::new("example.com", None)).build();
        let request = get("/path").with_effective_uri_for(&settings).unwrap();
        assert_eq!(request.uri(), &Uri::from_static("http://example.com/path"));
    }

    #[test]
    fn header_lookup() {
        let request = get("/")
            .add_header(HttpHeader::raw("X-Custom", "1").unwrap())
            .add_header(Host::new("a.com", None))
            .add_header(HttpHeader::raw("x-custom", "2").unwrap());

        assert_eq!(request.header::<Host>(), Some(Host::new("a.com", None)));
        assert_eq!(request.header::<Upgrade>(), None);
        assert_eq!(request.header_named("X-CUSTOM").map(HttpHeader::value), Some("1".to_string()));
        assert_eq!(request.header_named("x-missing"), None);
    }

    #[test]
    fn content_type_is_synthesized_from_entity() {
        let request = HttpRequest::builder()
            .method(Method::POST)
            .entity(HttpEntity::strict(mime::APPLICATION_JSON, "{}"))
            .header(ContentType::new(mime::TEXT_HTML))
            .build()
            .unwrap();

        assert_eq!(request.header::<ContentType>().unwrap().content_type(), &mime::APPLICATION_JSON);
        assert_eq!(get("/").header::<ContentType>().unwrap().content_type(), &mime::APPLICATION_OCTET_STREAM);
    }

    #[test]
    fn headers_of_type_preserve_order() {
        let request = get("/")
            .add_header(Host::new("a.com", None))
            .add_header(Upgrade::websocket())
            .add_header(Host::new("b.com", None));

        let hosts = request.headers_of::<Host>().map(Host::host).collect::<Vec<_>>();
        assert_eq!(hosts, vec!["a.com", "b.com"]);
    }

    #[test]
    fn encoding() {
        assert_eq!(get("/").encoding(), HttpEncoding::Identity);
        let request = get("/").add_header(ContentEncoding::new(vec![HttpEncoding::Gzip, HttpEncoding::Br]));
        assert_eq!(request.encoding(), HttpEncoding::Gzip);
    }

    #[test]
    fn connection_close_expected() {
        let close = Connection::new(vec!["close".into()]);
        let keep_alive = Connection::new(vec!["Keep-Alive".into()]);

        let http11 = get("/");
        assert!(!http11.connection_close_expected());
        assert!(http11.clone().add_header(close.clone()).connection_close_expected());
        assert!(!http11.add_header(keep_alive.clone()).connection_close_expected());

        let http10 = get("/").with_protocol(HttpProtocol::Http10).unwrap();
        assert!(http10.connection_close_expected());
        assert!(http10.clone().add_header(close).connection_close_expected());
        assert!(!http10.add_header(keep_alive).connection_close_expected());
    }

    #[test]
    fn with_headers_round_trip() {
        let headers = vec![Host::new("a.com", None).into(), HttpHeader::raw("x-a", "1").unwrap()];
        let request = get("/").with_headers(headers.clone());
        assert_eq!(request.headers(), headers.as_slice());

        let entity = HttpEntity::text("hello");
        let request = get("/").with_entity(entity.clone()).unwrap();
        assert_eq!(request.entity(), &entity);
    }

    #[test]
    fn remove_header_is_idempotent() {
        let request = get("/").add_header(HttpHeader::raw("x-a", "1").unwrap()).add_header(Host::new("a.com", None));
        let once = request.clone().remove_header("X-A");
        let twice = once.clone().remove_header("X-A");

        assert_eq!(once, twice);
        assert_eq!(once.headers().len(), 1);
        assert!(request.remove_headers_of::<Host>().header::<Host>().is_none());
    }

    #[test]
    fn with_default_headers_never_overwrites() {
        let request = get("/").add_header(HttpHeader::raw("x-a", "mine").unwrap());
        let merged = request.with_default_headers(vec![
            HttpHeader::raw("X-A", "default").unwrap(),
            HttpHeader::raw("x-b", "default").unwrap(),
            HttpHeader::raw("x-b", "second").unwrap(),
        ]);

        let values = merged.headers().iter().map(HttpHeader::to_string).collect::<Vec<_>>();
        assert_eq!(values, vec!["x-a: mine", "x-b: default", "x-b: second"]);
    }

    #[test]
    fn with_default_headers_appends_defaults_sharing_a_name() {
        let merged = get("/").with_default_headers(vec![
            HttpHeader::raw("x-b", "1").unwrap(),
            HttpHeader::raw("x-b", "2").unwrap(),
        ]);

        let values = merged.headers().iter().map(HttpHeader::to_string).collect::<Vec<_>>();
        assert_eq!(values, vec!["x-b: 1", "x-b: 2"]);
    }

    #[test]
    fn attributes() {
        let request = get("/").add_attribute(&TRACE_ID, 42);
        assert_eq!(request.attribute(&TRACE_ID), Some(&42));

        let removed = request.clone().remove_attribute(&TRACE_ID);
        assert_eq!(removed.attribute(&TRACE_ID), None);
        assert_ne!(request, removed);

        let mapped = removed.map_attributes(|attributes| attributes.insert(&TRACE_ID, 7));
        assert_eq!(mapped.attribute(&TRACE_ID), Some(&7));
    }

    #[test]
    fn structural_equality_and_hash() {
        let a = get("/").add_header(Host::new("a.com", None)).add_attribute(&TRACE_ID, 1);
        let b = get("/").add_header(Host::new("a.com", None)).add_attribute(&TRACE_ID, 1);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));

        let c = b.clone().add_attribute(&TRACE_ID, 2);
        assert_ne!(a, c);
    }

    #[test]
    fn convert_from_http_parts() {
        let (parts, ()) = Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .header("Host", "a.com")
            .header(CONTENT_TYPE, "application/json")
            .header(CONTENT_LENGTH, "2")
            .header("x-a", "1")
            .header("x-a", "2")
            .body(())
            .unwrap()
            .into_parts();

        let request = HttpRequest::try_from_parts(parts, HttpEntity::strict(mime::APPLICATION_OCTET_STREAM, "{}")).unwrap();
        assert_eq!(request.content_type(), &mime::APPLICATION_JSON);
        assert_eq!(request.header::<Host>(), Some(Host::new("a.com", None)));
        assert_eq!(request.headers().len(), 3);
        assert!(request.header_named("content-length").is_none());

        let http_request = request.into_http().unwrap();
        assert_eq!(http_request.headers().get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(http_request.headers().get(CONTENT_LENGTH).unwrap(), "2");
        assert_eq!(http_request.headers().get_all("x-a").iter().count(), 2);
    }

    #[tokio::test]
    async fn to_strict_keeps_original() {
        let source = ByteSource::from_chunks([Bytes::from_static(b"he"), Bytes::from_static(b"llo")]);
        let request = HttpRequest::builder()
            .method(Method::POST)
            .entity(HttpEntity::streamed(mime::TEXT_PLAIN, 5, source))
            .build()
            .unwrap();

        let strict = request.to_strict(std::time::Duration::from_secs(1), None).await.unwrap();
        assert_eq!(strict.entity(), &HttpEntity::strict(mime::TEXT_PLAIN, "hello"));
        assert!(!request.entity().is_strict());
    }
}
