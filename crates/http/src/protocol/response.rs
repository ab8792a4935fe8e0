//! The immutable HTTP response.
//!
//! A response whose status forbids an entity (1xx, 204, 304) always carries
//! an empty one, and an HTTP/1.0 response is never chunked.

use std::hash::{Hash, Hasher};

use http::header::CONTENT_LENGTH;
use http::response::Parts;
use http::{HeaderValue, Response, StatusCode};

use crate::protocol::attribute::{AttributeKey, Attributes};
use crate::protocol::entity::HttpEntity;
use crate::protocol::header::HttpHeader;
use crate::protocol::message::{HttpMessage, from_header_map, render_header_map};
use crate::protocol::status::StatusExt;
use crate::ensure;
use crate::protocol::{HttpProtocol, MessageError};

const RESPONSE_HASH_SEED: u32 = 0x5265_7370;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    status: StatusCode,
    headers: Vec<HttpHeader>,
    attributes: Attributes,
    entity: HttpEntity,
    protocol: HttpProtocol,
}

impl Default for HttpResponse {
    /// `200 OK` over HTTP/1.1 without headers or entity.
    fn default() -> Self {
        Self::new(StatusCode::OK)
    }
}

impl HttpResponse {
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder::new()
    }

    /// An empty response with the given status. Always valid.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            attributes: Attributes::new(),
            entity: HttpEntity::empty(),
            protocol: HttpProtocol::Http11,
        }
    }

    /// A `text/plain` response.
    ///
    /// The message is dropped if the status does not allow an entity, so this
    /// never fails.
    pub fn text<S: Into<String>>(status: StatusCode, message: S) -> Self {
        let response = Self::new(status);
        if status.allows_entity() {
            Self { entity: HttpEntity::text(message), ..response }
        } else {
            response
        }
    }

    fn verify(self) -> Result<Self, MessageError> {
        ensure!(
            self.entity.is_known_empty() || self.status.allows_entity(),
            MessageError::EntityNotAllowed { status: self.status }
        );
        ensure!(
            !(self.protocol.is_http10() && self.entity.is_chunked()),
            MessageError::ChunkedEntityOnHttp10 { kind: "responses" }
        );
        Ok(self)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn with_status(self, status: StatusCode) -> Result<Self, MessageError> {
        Self { status, ..self }.verify()
    }

    pub fn with_protocol(self, protocol: HttpProtocol) -> Result<Self, MessageError> {
        Self { protocol, ..self }.verify()
    }

    /// Builds a response from the parts of an [`http::Response`].
    pub fn try_from_parts(parts: Parts, entity: HttpEntity) -> Result<Self, MessageError> {
        let protocol = HttpProtocol::try_from(parts.version)?;
        let (headers, entity) = from_header_map(&parts.headers, entity);
        Self { status: parts.status, headers, attributes: Attributes::new(), entity, protocol }.verify()
    }

    pub fn into_http(self) -> Result<Response<HttpEntity>, MessageError> {
        let mut header_map = render_header_map(&self.headers, &self.entity, HttpHeader::renders_in_responses)?;
        if self.entity.is_known_empty() && self.status.allows_entity() {
            header_map.insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
        }

        let mut response = Response::new(self.entity);
        *response.status_mut() = self.status;
        *response.version_mut() = self.protocol.into();
        *response.headers_mut() = header_map;
        Ok(response)
    }
}

impl HttpMessage for HttpResponse {
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

impl Hash for HttpResponse {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u32(RESPONSE_HASH_SEED);
        self.status.hash(state);
        self.headers.hash(state);
        self.attributes.hash(state);
        self.entity.hash(state);
        self.protocol.hash(state);
    }
}

#[derive(Debug)]
pub struct ResponseBuilder {
    response: HttpResponse,
}

impl ResponseBuilder {
    fn new() -> Self {
        Self { response: HttpResponse::default() }
    }

    pub fn status(mut self, status: StatusCode) -> Self {
        self.response.status = status;
        self
    }

    pub fn header<H: Into<HttpHeader>>(mut self, header: H) -> Self {
        self.response.headers.push(header.into());
        self
    }

    pub fn headers<I: IntoIterator<Item = HttpHeader>>(mut self, headers: I) -> Self {
        self.response.headers.extend(headers);
        self
    }

    pub fn attribute<T>(mut self, key: &AttributeKey<T>, value: T) -> Self
    where
        T: std::any::Any + Send + Sync + std::fmt::Debug + PartialEq + Hash,
    {
        self.response.attributes = self.response.attributes.insert(key, value);
        self
    }

    pub fn entity<E: Into<HttpEntity>>(mut self, entity: E) -> Self {
        self.response.entity = entity.into();
        self
    }

    pub fn protocol(mut self, protocol: HttpProtocol) -> Self {
        self.response.protocol = protocol;
        self
    }

    pub fn build(self) -> Result<HttpResponse, MessageError> {
        self.response.verify()
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::header::{CONTENT_TYPE, TRANSFER_ENCODING};

    use super::*;
    use crate::protocol::entity::ByteSource;
    use crate::protocol::header::{Allow, HttpEncoding};

    fn chunked() -> HttpEntity {
        HttpEntity::chunked(mime::TEXT_PLAIN, ByteSource::from_chunks([Bytes::from_static(b"x")]))
    }

    #[test]
    fn default_response() {
        let response = HttpResponse::default();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.is_success());
        assert!(response.entity().is_known_empty());
        assert_eq!(response.protocol(), HttpProtocol::Http11);
    }

    #[test]
    fn status_must_allow_entity() {
        let result = HttpResponse::builder().status(StatusCode::NO_CONTENT).entity(HttpEntity::text("x")).build();
        assert!(matches!(result, Err(MessageError::EntityNotAllowed { status }) if status == StatusCode::NO_CONTENT));

        let response = HttpResponse::text(StatusCode::OK, "x");
        assert!(response.clone().with_status(StatusCode::NOT_MODIFIED).is_err());
        assert!(response.with_status(StatusCode::NOT_FOUND).is_ok());

        assert!(HttpResponse::new(StatusCode::NO_CONTENT).with_entity(HttpEntity::empty()).is_ok());
    }

    #[test]
    fn text_drops_message_for_empty_status() {
        let response = HttpResponse::text(StatusCode::NO_CONTENT, "ignored");
        assert!(response.entity().is_known_empty());

        let response = HttpResponse::text(StatusCode::NOT_FOUND, "missing");
        assert_eq!(response.entity(), &HttpEntity::text("missing"));
        assert!(!response.is_success());
    }

    #[test]
    fn chunked_entity_on_http10() {
        let result = HttpResponse::builder().protocol(HttpProtocol::Http10).entity(chunked()).build();
        assert!(matches!(result, Err(MessageError::ChunkedEntityOnHttp10 { kind: "responses" })));

        let response = HttpResponse::builder().entity(chunked()).build().unwrap();
        assert!(response.with_protocol(HttpProtocol::Http10).is_err());
    }

    #[test]
    fn transform_entity_data_bytes_makes_entity_chunked() {
        let response = HttpResponse::text(StatusCode::OK, "hello");
        let transformed = response.transform_entity_data_bytes(|stream| stream).unwrap();
        assert!(transformed.entity().is_chunked());

        let http10 = HttpResponse::text(StatusCode::OK, "hello").with_protocol(HttpProtocol::Http10).unwrap();
        assert!(http10.transform_entity_data_bytes(|stream| stream).is_err());
    }

    #[test]
    fn into_http_renders_headers_and_framing() {
        let response = HttpResponse::text(StatusCode::METHOD_NOT_ALLOWED, "nope")
            .add_header(Allow::new(vec![http::Method::GET, http::Method::POST]));
        let http_response = response.into_http().unwrap();

        assert_eq!(http_response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(http_response.headers().get("allow").unwrap(), "GET, POST");
        assert_eq!(http_response.headers().get(CONTENT_TYPE).unwrap(), "text/plain; charset=utf-8");
        assert_eq!(http_response.headers().get(CONTENT_LENGTH).unwrap(), "4");

        let chunked = HttpResponse::builder().entity(chunked()).build().unwrap().into_http().unwrap();
        assert_eq!(chunked.headers().get(TRANSFER_ENCODING).unwrap(), "chunked");
        assert!(chunked.headers().get(CONTENT_LENGTH).is_none());

        let empty = HttpResponse::new(StatusCode::OK).into_http().unwrap();
        assert_eq!(empty.headers().get(CONTENT_LENGTH).unwrap(), "0");
        assert!(HttpResponse::new(StatusCode::NO_CONTENT).into_http().unwrap().headers().is_empty());
    }

    #[test]
    fn convert_from_http_parts() {
        let (parts, ()) = Response::builder()
            .status(StatusCode::OK)
            .header("content-encoding", "gzip")
            .header(CONTENT_TYPE, "text/html")
            .body(())
            .unwrap()
            .into_parts();

        let response = HttpResponse::try_from_parts(parts, HttpEntity::strict(mime::APPLICATION_OCTET_STREAM, "<p/>")).unwrap();
        assert_eq!(response.encoding(), HttpEncoding::Gzip);
        assert_eq!(response.content_type(), &mime::TEXT_HTML);
        assert_eq!(response.headers().len(), 1);
    }

    #[test]
    fn reject_http2_parts() {
        let (parts, ()) = Response::builder().version(http::Version::HTTP_2).body(()).unwrap().into_parts();
        assert!(matches!(
            HttpResponse::try_from_parts(parts, HttpEntity::empty()),
            Err(MessageError::UnsupportedProtocol { .. })
        ));
    }
}
