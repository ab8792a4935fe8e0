//! The capability set shared by [`HttpRequest`](crate::protocol::HttpRequest)
//! and [`HttpResponse`](crate::protocol::HttpResponse).
//!
//! Implementors only provide field access and the four primitive mutators;
//! every derived operation is written once here. Mutators consume the message
//! and return a new one, the original value is never changed in place.

use std::fmt;
use std::hash::Hash;
use std::time::Duration;

use http::header::{CONTENT_LENGTH, CONTENT_TYPE, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderValue};

use crate::protocol::attribute::{AttributeKey, Attributes};
use crate::protocol::entity::{BoxByteStream, DiscardedEntity, HttpEntity};
use crate::protocol::header::{Connection, ContentEncoding, ContentType, HttpEncoding, HttpHeader, TypedHeader};
use crate::protocol::settings::MessageSettings;
use crate::protocol::{HttpError, HttpProtocol, MessageError};

pub trait HttpMessage: Clone + Sized {
    fn headers(&self) -> &[HttpHeader];

    fn attributes(&self) -> &Attributes;

    fn entity(&self) -> &HttpEntity;

    fn protocol(&self) -> HttpProtocol;

    /// Replaces all headers. Headers never affect an invariant, so this cannot fail.
    #[must_use]
    fn with_headers(self, headers: Vec<HttpHeader>) -> Self;

    #[must_use]
    fn with_attributes(self, attributes: Attributes) -> Self;

    /// Replaces the entity, re-checking the message invariants.
    fn with_entity(self, entity: HttpEntity) -> Result<Self, MessageError>;

    fn with_headers_and_entity(self, headers: Vec<HttpHeader>, entity: HttpEntity) -> Result<Self, MessageError> {
        self.with_entity(entity).map(|message| message.with_headers(headers))
    }

    /// Returns the first header of exact type `H`.
    ///
    /// A [`ContentType`] lookup always succeeds: it is synthesized from the
    /// entity, whatever the header list says.
    fn header<H: TypedHeader>(&self) -> Option<H> {
        if H::KIND == ContentType::KIND {
            let synthesized = HttpHeader::ContentType(ContentType::new(self.entity().content_type().clone()));
            return H::from_header(&synthesized).cloned();
        }
        self.headers().iter().find_map(H::from_header).cloned()
    }

    /// Returns all headers of exact type `H` in declared order.
    fn headers_of<H: TypedHeader>(&self) -> impl Iterator<Item = &H> {
        self.headers().iter().filter_map(H::from_header)
    }

    /// Returns the first header whose name matches case-insensitively.
    fn header_named(&self, name: &str) -> Option<&HttpHeader> {
        self.headers().iter().find(|header| header.is(name))
    }

    fn content_type(&self) -> &mime::Mime {
        self.entity().content_type()
    }

    /// The first coding of the `Content-Encoding` header, identity otherwise.
    fn encoding(&self) -> HttpEncoding {
        self.headers_of::<ContentEncoding>()
            .next()
            .and_then(|header| header.encodings().first().cloned())
            .unwrap_or(HttpEncoding::Identity)
    }

    /// Returns true if the connection is expected to be closed after this message.
    fn connection_close_expected(&self) -> bool {
        let connection = self.headers_of::<Connection>().next();
        match self.protocol() {
            HttpProtocol::Http11 => connection.is_some_and(Connection::has_close),
            HttpProtocol::Http10 => connection.is_none_or(|connection| !connection.has_keep_alive()),
        }
    }

    #[must_use]
    fn add_header<H: Into<HttpHeader>>(self, header: H) -> Self {
        let mut headers = self.headers().to_vec();
        headers.push(header.into());
        self.with_headers(headers)
    }

    #[must_use]
    fn add_headers<I: IntoIterator<Item = HttpHeader>>(self, new_headers: I) -> Self {
        let mut headers = self.headers().to_vec();
        headers.extend(new_headers);
        self.with_headers(headers)
    }

    /// Removes every header with the given name, compared case-insensitively.
    #[must_use]
    fn remove_header(self, name: &str) -> Self {
        if !self.headers().iter().any(|header| header.is(name)) {
            return self;
        }
        let headers = self.headers().iter().filter(|header| !header.is(name)).cloned().collect();
        self.with_headers(headers)
    }

    /// Removes every header of exact type `H`.
    #[must_use]
    fn remove_headers_of<H: TypedHeader>(self) -> Self {
        let headers = self.headers().iter().filter(|header| header.kind() != H::KIND).cloned().collect();
        self.with_headers(headers)
    }

    /// Appends each default whose name is not among the current headers.
    ///
    /// Existing headers are never overwritten. Defaults are only checked
    /// against the headers present before the call, so defaults sharing a
    /// name are all appended.
    #[must_use]
    fn with_default_headers<I: IntoIterator<Item = HttpHeader>>(self, defaults: I) -> Self {
        let existing = self.headers();
        let missing = defaults
            .into_iter()
            .filter(|default| !existing.iter().any(|header| header.is(default.lowercase_name())))
            .collect::<Vec<_>>();
        if missing.is_empty() {
            return self;
        }
        let headers = existing.iter().cloned().chain(missing).collect();
        self.with_headers(headers)
    }

    #[must_use]
    fn map_headers<F>(self, f: F) -> Self
    where
        F: FnOnce(Vec<HttpHeader>) -> Vec<HttpHeader>,
    {
        let headers = f(self.headers().to_vec());
        self.with_headers(headers)
    }

    #[must_use]
    fn map_attributes<F>(self, f: F) -> Self
    where
        F: FnOnce(Attributes) -> Attributes,
    {
        let attributes = f(self.attributes().clone());
        self.with_attributes(attributes)
    }

    fn attribute<T: 'static>(&self, key: &AttributeKey<T>) -> Option<&T> {
        self.attributes().get(key)
    }

    #[must_use]
    fn add_attribute<T>(self, key: &AttributeKey<T>, value: T) -> Self
    where
        T: std::any::Any + Send + Sync + fmt::Debug + PartialEq + Hash,
    {
        let attributes = self.attributes().clone().insert(key, value);
        self.with_attributes(attributes)
    }

    #[must_use]
    fn remove_attribute<T: 'static>(self, key: &AttributeKey<T>) -> Self {
        if !self.attributes().contains(key) {
            return self;
        }
        let attributes = self.attributes().clone().remove(key);
        self.with_attributes(attributes)
    }

    fn map_entity<F>(self, f: F) -> Result<Self, MessageError>
    where
        F: FnOnce(HttpEntity) -> HttpEntity,
    {
        let entity = f(self.entity().clone());
        self.with_entity(entity)
    }

    /// Applies `transformer` to the entity bytes, see [`HttpEntity::transform_data_bytes`].
    fn transform_entity_data_bytes<F>(self, transformer: F) -> Result<Self, MessageError>
    where
        F: FnOnce(BoxByteStream) -> BoxByteStream,
    {
        let entity = self.entity().transform_data_bytes(transformer);
        self.with_entity(entity)
    }

    /// Drains the entity without looking at it, see [`HttpEntity::discard_bytes`].
    fn discard_entity_bytes(&self) -> DiscardedEntity {
        self.entity().discard_bytes()
    }

    /// Returns a copy of this message with a strict entity.
    ///
    /// `self` is left untouched whatever the outcome; a streamed entity is
    /// consumed though, so a failed call cannot be retried on it.
    fn to_strict(&self, timeout: Duration, max_bytes: Option<u64>) -> impl Future<Output = Result<Self, HttpError>> + Send
    where
        Self: Send + Sync,
    {
        async move {
            let strict = self.entity().to_strict(timeout, max_bytes).await?;
            Ok(self.clone().with_entity(strict)?)
        }
    }

    fn to_strict_with(&self, settings: &MessageSettings) -> impl Future<Output = Result<Self, HttpError>> + Send
    where
        Self: Send + Sync,
    {
        self.to_strict(settings.to_strict_timeout(), settings.max_to_strict_bytes())
    }
}

/// Splits an `http` header map into the header list and the entity.
///
/// The first parsable `Content-Type` moves into the entity, framing headers
/// are dropped since the entity describes its own length.
pub(crate) fn from_header_map(header_map: &HeaderMap, entity: HttpEntity) -> (Vec<HttpHeader>, HttpEntity) {
    let mut entity = entity;
    let mut content_type_seen = false;
    let mut headers = Vec::with_capacity(header_map.len());

    for (name, value) in header_map {
        if name == CONTENT_LENGTH || name == TRANSFER_ENCODING {
            continue;
        }
        match HttpHeader::from_raw(name.clone(), value.clone()) {
            HttpHeader::ContentType(content_type) if !content_type_seen => {
                content_type_seen = true;
                entity = entity.with_content_type(content_type.content_type().clone());
            }
            HttpHeader::ContentType(_) => {}
            header => headers.push(header),
        }
    }

    (headers, entity)
}

/// Renders the header list plus the entity's `Content-Type` and framing headers.
pub(crate) fn render_header_map(
    headers: &[HttpHeader],
    entity: &HttpEntity,
    renders: fn(&HttpHeader) -> bool,
) -> Result<HeaderMap, MessageError> {
    let mut header_map = HeaderMap::with_capacity(headers.len() + 2);
    for header in headers.iter().filter(|header| renders(header)) {
        let (name, value) = header.to_header_pair()?;
        header_map.append(name, value);
    }

    if entity.is_known_empty() {
        return Ok(header_map);
    }

    let content_type = HeaderValue::from_str(entity.content_type().as_ref())
        .map_err(|e| MessageError::invalid_header(ContentType::NAME, e))?;
    header_map.insert(CONTENT_TYPE, content_type);

    if entity.is_chunked() {
        header_map.insert(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
    } else if let Some(length) = entity.content_length_option() {
        header_map.insert(CONTENT_LENGTH, HeaderValue::from(length));
    }

    Ok(header_map)
}
