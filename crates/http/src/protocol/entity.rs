//! Message entities.
//!
//! An entity is either strict (fully buffered, re-readable) or streamed. A
//! streamed entity is backed by a [`ByteSource`], which hands its byte stream
//! out at most once:
//!
//! ```text
//! Fresh --take--> Draining --eof--> Drained
//!                     \----error--> Failed
//! ```
//!
//! Any attempt to take the stream after it left `Fresh` yields
//! [`EntityError::AlreadyConsumed`] through the stream itself, the same channel
//! every other stream failure uses.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt, Stream, StreamExt};
use http_body::{Body, Frame, SizeHint};
use mime::Mime;
use tracing::{info, warn};

use crate::protocol::EntityError;

/// The boxed byte stream an entity is built from.
pub type BoxByteStream = BoxStream<'static, Result<Bytes, EntityError>>;

const FRESH: u8 = 0;
const DRAINING: u8 = 1;
const DRAINED: u8 = 2;
const FAILED: u8 = 3;

/// Observable state of a [`ByteSource`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SourceState {
    Fresh,
    Draining,
    Drained,
    Failed,
}

/// A single-consumption byte stream shared by the clones of an entity.
#[derive(Clone)]
pub struct ByteSource {
    inner: Arc<SourceInner>,
}

struct SourceInner {
    state: AtomicU8,
    stream: Mutex<Option<BoxByteStream>>,
}

impl ByteSource {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, EntityError>> + Send + 'static,
    {
        Self::from_boxed(stream.boxed())
    }

    pub fn from_boxed(stream: BoxByteStream) -> Self {
        Self { inner: Arc::new(SourceInner { state: AtomicU8::new(FRESH), stream: Mutex::new(Some(stream)) }) }
    }

    pub fn from_chunks<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = Bytes>,
    {
        let chunks = chunks.into_iter().map(Ok).collect::<Vec<_>>();
        Self::new(futures::stream::iter(chunks))
    }

    pub fn state(&self) -> SourceState {
        match self.inner.state.load(Ordering::Acquire) {
            FRESH => SourceState::Fresh,
            DRAINING => SourceState::Draining,
            DRAINED => SourceState::Drained,
            _ => SourceState::Failed,
        }
    }

    /// Hands out the byte stream.
    ///
    /// Only the first call gets the real stream; every later one gets a stream
    /// that fails with [`EntityError::AlreadyConsumed`].
    pub fn data_stream(&self) -> ByteStream {
        let taken = self
            .inner
            .state
            .compare_exchange(FRESH, DRAINING, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .and_then(|_| self.inner.stream.lock().unwrap_or_else(PoisonError::into_inner).take());

        let state = match taken {
            Some(stream) => StreamState::Streaming(stream),
            None => StreamState::Failed(Some(EntityError::AlreadyConsumed)),
        };
        ByteStream { source: self.clone(), state }
    }

    fn finish(&self, state: u8) {
        self.inner.state.store(state, Ordering::Release);
    }

    fn ptr_eq(&self, other: &ByteSource) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ByteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteSource").field("state", &self.state()).finish()
    }
}

/// The consuming side of a [`ByteSource`].
///
/// Reaching the end of the stream moves the source to `Drained`, an error
/// moves it to `Failed`.
pub struct ByteStream {
    source: ByteSource,
    state: StreamState,
}

enum StreamState {
    Streaming(BoxByteStream),
    Failed(Option<EntityError>),
    Done,
}

impl Stream for ByteStream {
    type Item = Result<Bytes, EntityError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        match &mut this.state {
            StreamState::Streaming(stream) => match stream.poll_next_unpin(cx) {
                Poll::Pending => Poll::Pending,
                Poll::Ready(Some(Ok(bytes))) => Poll::Ready(Some(Ok(bytes))),
                Poll::Ready(Some(Err(e))) => {
                    this.source.finish(FAILED);
                    this.state = StreamState::Done;
                    Poll::Ready(Some(Err(e)))
                }
                Poll::Ready(None) => {
                    this.source.finish(DRAINED);
                    this.state = StreamState::Done;
                    Poll::Ready(None)
                }
            },
            StreamState::Failed(error) => {
                let error = error.take();
                this.state = StreamState::Done;
                Poll::Ready(error.map(Err))
            }
            StreamState::Done => Poll::Ready(None),
        }
    }
}

impl fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteStream").field("source", &self.source).finish_non_exhaustive()
    }
}

/// The body of a message.
#[derive(Debug, Clone)]
pub enum HttpEntity {
    /// Fully buffered bytes; an empty strict entity is the known-empty entity.
    Strict { content_type: Mime, data: Bytes },
    /// A streamed entity with a known length.
    Streamed { content_type: Mime, content_length: u64, data: ByteSource },
    /// A streamed entity of unknown length, rendered with chunked transfer encoding.
    Chunked { content_type: Mime, chunks: ByteSource },
}

impl Default for HttpEntity {
    fn default() -> Self {
        Self::empty()
    }
}

impl HttpEntity {
    pub fn empty() -> Self {
        Self::Strict { content_type: mime::APPLICATION_OCTET_STREAM, data: Bytes::new() }
    }

    pub fn strict<B: Into<Bytes>>(content_type: Mime, data: B) -> Self {
        Self::Strict { content_type, data: data.into() }
    }

    /// A `text/plain; charset=utf-8` entity.
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self::strict(mime::TEXT_PLAIN_UTF_8, text.into())
    }

    pub fn streamed(content_type: Mime, content_length: u64, data: ByteSource) -> Self {
        Self::Streamed { content_type, content_length, data }
    }

    pub fn chunked(content_type: Mime, chunks: ByteSource) -> Self {
        Self::Chunked { content_type, chunks }
    }

    pub fn content_type(&self) -> &Mime {
        match self {
            HttpEntity::Strict { content_type, .. }
            | HttpEntity::Streamed { content_type, .. }
            | HttpEntity::Chunked { content_type, .. } => content_type,
        }
    }

    #[must_use]
    pub fn with_content_type(self, content_type: Mime) -> Self {
        match self {
            HttpEntity::Strict { data, .. } => HttpEntity::Strict { content_type, data },
            HttpEntity::Streamed { content_length, data, .. } => HttpEntity::Streamed { content_type, content_length, data },
            HttpEntity::Chunked { chunks, .. } => HttpEntity::Chunked { content_type, chunks },
        }
    }

    pub fn content_length_option(&self) -> Option<u64> {
        match self {
            HttpEntity::Strict { data, .. } => Some(data.len() as u64),
            HttpEntity::Streamed { content_length, .. } => Some(*content_length),
            HttpEntity::Chunked { .. } => None,
        }
    }

    #[inline]
    pub fn is_known_empty(&self) -> bool {
        match self {
            HttpEntity::Strict { data, .. } => data.is_empty(),
            HttpEntity::Streamed { content_length, .. } => *content_length == 0,
            HttpEntity::Chunked { .. } => false,
        }
    }

    #[inline]
    pub fn is_strict(&self) -> bool {
        matches!(self, HttpEntity::Strict { .. })
    }

    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, HttpEntity::Chunked { .. })
    }

    /// The entity bytes as a stream. Strict entities can be streamed any
    /// number of times, streamed entities only once.
    pub fn data_stream(&self) -> ByteStream {
        match self {
            HttpEntity::Strict { data, .. } => {
                let chunk = (!data.is_empty()).then(|| Ok(data.clone()));
                ByteSource::new(futures::stream::iter(chunk)).data_stream()
            }
            HttpEntity::Streamed { data, .. } => data.data_stream(),
            HttpEntity::Chunked { chunks, .. } => chunks.data_stream(),
        }
    }

    /// Drains the entity bytes without looking at them.
    ///
    /// The returned handle resolves exactly once, with the number of discarded
    /// bytes if the whole stream was drained. It does nothing until polled.
    pub fn discard_bytes(&self) -> DiscardedEntity {
        match self {
            HttpEntity::Strict { data, .. } => DiscardedEntity::ready(Ok(data.len() as u64)),
            HttpEntity::Streamed { data, .. } | HttpEntity::Chunked { chunks: data, .. } => {
                let mut stream = data.data_stream();
                DiscardedEntity::new(async move {
                    let mut size: u64 = 0;
                    while let Some(chunk) = stream.next().await {
                        match chunk {
                            Ok(bytes) => size += bytes.len() as u64,
                            Err(e) => {
                                warn!(cause = %e, size, "failed to discard entity bytes");
                                return Err(e);
                            }
                        }
                    }
                    if size > 0 {
                        info!(size, "discard entity bytes");
                    }
                    Ok(size)
                })
            }
        }
    }

    /// Buffers the entity into a strict one.
    ///
    /// Fails with [`EntityError::Timeout`] if the stream does not complete in
    /// time and with [`EntityError::TooLarge`] once more than `max_bytes` arrive.
    pub async fn to_strict(&self, timeout: Duration, max_bytes: Option<u64>) -> Result<HttpEntity, EntityError> {
        match self {
            HttpEntity::Strict { data, .. } => {
                check_limit(max_bytes, data.len() as u64)?;
                Ok(self.clone())
            }
            HttpEntity::Streamed { content_type, content_length, data } => {
                check_limit(max_bytes, *content_length)?;
                let bytes = collect(data.data_stream(), timeout, max_bytes).await?;
                if bytes.len() as u64 != *content_length {
                    return Err(EntityError::stream(format!(
                        "entity size mismatch, declared {} but received {}",
                        content_length,
                        bytes.len()
                    )));
                }
                Ok(HttpEntity::Strict { content_type: content_type.clone(), data: bytes })
            }
            HttpEntity::Chunked { content_type, chunks } => {
                let bytes = collect(chunks.data_stream(), timeout, max_bytes).await?;
                Ok(HttpEntity::Strict { content_type: content_type.clone(), data: bytes })
            }
        }
    }

    /// Applies `transformer` to the entity bytes.
    ///
    /// The length of the transformed data is unknown, so any non-empty entity
    /// becomes chunked. A streamed entity is consumed by this call.
    #[must_use]
    pub fn transform_data_bytes<F>(&self, transformer: F) -> HttpEntity
    where
        F: FnOnce(BoxByteStream) -> BoxByteStream,
    {
        if self.is_known_empty() {
            return self.clone();
        }

        let transformed = transformer(self.data_stream().boxed());
        HttpEntity::Chunked { content_type: self.content_type().clone(), chunks: ByteSource::from_boxed(transformed) }
    }

    /// Converts the entity into an [`http_body::Body`].
    pub fn into_body(self) -> EntityBody {
        match self {
            HttpEntity::Strict { data, .. } if data.is_empty() => EntityBody { kind: BodyKind::Once(None) },
            HttpEntity::Strict { data, .. } => EntityBody { kind: BodyKind::Once(Some(data)) },
            HttpEntity::Streamed { content_length, data, .. } => {
                EntityBody { kind: BodyKind::Stream { stream: data.data_stream(), length: Some(content_length) } }
            }
            HttpEntity::Chunked { chunks, .. } => {
                EntityBody { kind: BodyKind::Stream { stream: chunks.data_stream(), length: None } }
            }
        }
    }
}

fn check_limit(max_bytes: Option<u64>, size: u64) -> Result<(), EntityError> {
    match max_bytes {
        Some(limit) if size > limit => Err(EntityError::too_large(limit, size)),
        _ => Ok(()),
    }
}

async fn collect(mut stream: ByteStream, timeout: Duration, max_bytes: Option<u64>) -> Result<Bytes, EntityError> {
    let collecting = async move {
        let mut buf = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            check_limit(max_bytes, (buf.len() + chunk.len()) as u64)?;
            buf.extend_from_slice(&chunk);
        }
        Ok(buf.freeze())
    };

    tokio::time::timeout(timeout, collecting).await.map_err(|_elapsed| EntityError::Timeout { timeout })?
}

impl PartialEq for HttpEntity {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                HttpEntity::Strict { content_type, data },
                HttpEntity::Strict { content_type: other_content_type, data: other_data },
            ) => content_type == other_content_type && data == other_data,
            (
                HttpEntity::Streamed { content_type, content_length, data },
                HttpEntity::Streamed { content_type: other_content_type, content_length: other_length, data: other_data },
            ) => content_type == other_content_type && content_length == other_length && data.ptr_eq(other_data),
            (
                HttpEntity::Chunked { content_type, chunks },
                HttpEntity::Chunked { content_type: other_content_type, chunks: other_chunks },
            ) => content_type == other_content_type && chunks.ptr_eq(other_chunks),
            _ => false,
        }
    }
}

impl Eq for HttpEntity {}

impl Hash for HttpEntity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        self.content_type().hash(state);
        match self {
            HttpEntity::Strict { data, .. } => data.hash(state),
            HttpEntity::Streamed { content_length, data, .. } => {
                content_length.hash(state);
                std::ptr::hash(Arc::as_ptr(&data.inner), state);
            }
            HttpEntity::Chunked { chunks, .. } => std::ptr::hash(Arc::as_ptr(&chunks.inner), state),
        }
    }
}

/// Completion handle of [`HttpEntity::discard_bytes`].
pub struct DiscardedEntity {
    future: BoxFuture<'static, Result<u64, EntityError>>,
}

impl DiscardedEntity {
    fn new<F>(future: F) -> Self
    where
        F: Future<Output = Result<u64, EntityError>> + Send + 'static,
    {
        Self { future: future.boxed() }
    }

    fn ready(result: Result<u64, EntityError>) -> Self {
        Self::new(futures::future::ready(result))
    }
}

impl Future for DiscardedEntity {
    type Output = Result<u64, EntityError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.future.poll_unpin(cx)
    }
}

impl fmt::Debug for DiscardedEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscardedEntity").finish_non_exhaustive()
    }
}

/// An [`HttpEntity`] seen as an [`http_body::Body`].
#[derive(Debug)]
pub struct EntityBody {
    kind: BodyKind,
}

#[derive(Debug)]
enum BodyKind {
    Once(Option<Bytes>),
    Stream { stream: ByteStream, length: Option<u64> },
}

impl Body for EntityBody {
    type Data = Bytes;
    type Error = EntityError;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match &mut self.get_mut().kind {
            BodyKind::Once(bytes) => Poll::Ready(bytes.take().map(|bytes| Ok(Frame::data(bytes)))),
            BodyKind::Stream { stream, .. } => stream.poll_next_unpin(cx).map(|item| item.map(|chunk| chunk.map(Frame::data))),
        }
    }

    fn is_end_stream(&self) -> bool {
        match &self.kind {
            BodyKind::Once(bytes) => bytes.is_none(),
            BodyKind::Stream { stream, .. } => matches!(stream.state, StreamState::Done),
        }
    }

    fn size_hint(&self) -> SizeHint {
        match &self.kind {
            BodyKind::Once(None) => SizeHint::with_exact(0),
            BodyKind::Once(Some(bytes)) => SizeHint::with_exact(bytes.len() as u64),
            BodyKind::Stream { length: Some(length), .. } => SizeHint::with_exact(*length),
            BodyKind::Stream { length: None, .. } => SizeHint::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;

    fn chunks(parts: &[&'static str]) -> ByteSource {
        ByteSource::from_chunks(parts.iter().map(|part| Bytes::from_static(part.as_bytes())))
    }

    #[test]
    fn known_empty() {
        assert!(HttpEntity::empty().is_known_empty());
        assert!(!HttpEntity::text("hello").is_known_empty());
        assert!(!HttpEntity::chunked(mime::TEXT_PLAIN, chunks(&[])).is_known_empty());
        assert!(HttpEntity::chunked(mime::TEXT_PLAIN, chunks(&[])).is_chunked());
    }

    #[tokio::test]
    async fn discard_streamed_entity() {
        let source = chunks(&["hello", " ", "world"]);
        let entity = HttpEntity::streamed(mime::TEXT_PLAIN, 11, source.clone());

        assert_eq!(source.state(), SourceState::Fresh);
        assert_eq!(entity.discard_bytes().await, Ok(11));
        assert_eq!(source.state(), SourceState::Drained);
    }

    #[tokio::test]
    async fn second_consumption_fails() {
        let entity = HttpEntity::chunked(mime::TEXT_PLAIN, chunks(&["a", "b"]));

        assert_eq!(entity.discard_bytes().await, Ok(2));
        assert_eq!(entity.discard_bytes().await, Err(EntityError::AlreadyConsumed));
        assert_eq!(
            entity.to_strict(Duration::from_secs(1), None).await,
            Err(EntityError::AlreadyConsumed)
        );
    }

    #[tokio::test]
    async fn strict_entity_is_re_readable() {
        let entity = HttpEntity::text("hello");

        assert_eq!(entity.discard_bytes().await, Ok(5));
        assert_eq!(entity.discard_bytes().await, Ok(5));
        let collected = entity.data_stream().collect::<Vec<_>>().await;
        assert_eq!(collected, vec![Ok(Bytes::from_static(b"hello"))]);
    }

    #[tokio::test]
    async fn failing_stream_marks_source_failed() {
        let source = ByteSource::new(futures::stream::iter(vec![
            Ok(Bytes::from_static(b"a")),
            Err(EntityError::stream("connection reset")),
        ]));
        let entity = HttpEntity::chunked(mime::TEXT_PLAIN, source.clone());

        assert_eq!(entity.discard_bytes().await, Err(EntityError::stream("connection reset")));
        assert_eq!(source.state(), SourceState::Failed);
    }

    #[tokio::test]
    async fn to_strict_collects_chunks() {
        let entity = HttpEntity::chunked(mime::TEXT_PLAIN, chunks(&["hello", " world"]));
        let strict = entity.to_strict(Duration::from_secs(1), Some(64)).await.unwrap();

        assert_eq!(strict, HttpEntity::strict(mime::TEXT_PLAIN, "hello world"));
    }

    #[tokio::test]
    async fn to_strict_enforces_limit() {
        let entity = HttpEntity::chunked(mime::TEXT_PLAIN, chunks(&["hello", " world"]));
        let result = entity.to_strict(Duration::from_secs(1), Some(8)).await;
        assert_eq!(result, Err(EntityError::too_large(8, 11)));

        let declared = HttpEntity::streamed(mime::TEXT_PLAIN, 100, chunks(&["x"]));
        let result = declared.to_strict(Duration::from_secs(1), Some(10)).await;
        assert!(result.unwrap_err().is_too_large());

        let strict = HttpEntity::text("hello world");
        assert!(strict.to_strict(Duration::from_secs(1), Some(3)).await.unwrap_err().is_too_large());
    }

    #[tokio::test(start_paused = true)]
    async fn to_strict_times_out() {
        let entity = HttpEntity::chunked(mime::TEXT_PLAIN, ByteSource::new(futures::stream::pending::<Result<Bytes, EntityError>>()));
        let result = entity.to_strict(Duration::from_millis(100), None).await;
        assert_eq!(result, Err(EntityError::Timeout { timeout: Duration::from_millis(100) }));
    }

    #[tokio::test]
    async fn to_strict_detects_length_mismatch() {
        let entity = HttpEntity::streamed(mime::TEXT_PLAIN, 3, chunks(&["hello"]));
        assert!(matches!(entity.to_strict(Duration::from_secs(1), None).await, Err(EntityError::Stream { .. })));
    }

    #[tokio::test]
    async fn transform_data_bytes() {
        let entity = HttpEntity::text("hello");
        let upper = entity.transform_data_bytes(|stream| {
            stream.map(|chunk| chunk.map(|bytes| Bytes::from(bytes.to_ascii_uppercase()))).boxed()
        });

        assert!(upper.is_chunked());
        assert_eq!(upper.content_type(), &mime::TEXT_PLAIN_UTF_8);
        let strict = upper.to_strict(Duration::from_secs(1), None).await.unwrap();
        assert_eq!(strict, HttpEntity::text("HELLO"));
    }

    #[tokio::test]
    async fn entity_body() {
        let body = HttpEntity::streamed(mime::TEXT_PLAIN, 5, chunks(&["he", "llo"])).into_body();
        assert_eq!(body.size_hint().exact(), Some(5));
        assert_eq!(body.collect().await.unwrap().to_bytes(), Bytes::from_static(b"hello"));

        let empty = HttpEntity::empty().into_body();
        assert!(empty.is_end_stream());
    }

    #[test]
    fn streamed_entities_compare_by_source_identity() {
        let source = chunks(&["a"]);
        let a = HttpEntity::chunked(mime::TEXT_PLAIN, source.clone());
        let b = HttpEntity::chunked(mime::TEXT_PLAIN, source);
        let c = HttpEntity::chunked(mime::TEXT_PLAIN, chunks(&["a"]));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(HttpEntity::text("a"), HttpEntity::text("a"));
    }
}
