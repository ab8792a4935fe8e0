//! Rejections: why a route alternative declined to handle a request.
//!
//! A routing layer collects the [`Rejection`]s of every failed alternative and
//! hands them to a [`RejectionHandler`] to obtain the response. Every built-in
//! reason has its own payload type; [`RejectionVariant`] lets a handler pick
//! all rejections of one exact payload type out of the collected set.
//!
//! [`TransformationRejection`] is not a reason of its own: it is a pending
//! edit of the rejection set, applied by
//! [`RejectionHandler::apply_transformations`] before the handler runs.

use std::any::Any;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use http::Method;
use micro_http::protocol::header::{HttpChallenge, HttpEncoding};
use mime::Mime;

mod default_handler;
mod error;
mod handler;
mod resolve;

pub use default_handler::default_handler;
pub use error::HandlerError;
pub use handler::RejectionHandler;
pub use handler::RejectionHandlerBuilder;
pub use resolve::resolve_rejections;

/// Implemented by every rejection payload type.
///
/// `from_rejection` only matches the payload's own variant, so the builder's
/// [`handle_all`](RejectionHandlerBuilder::handle_all) is an exact-type match.
/// Application defined payloads carried in [`Rejection::Custom`] can implement
/// it through [`Rejection::as_custom`].
pub trait RejectionVariant: Clone + Send + Sync + 'static {
    fn from_rejection(rejection: &Rejection) -> Option<&Self>;
}

macro_rules! rejections {
    ($($(#[$doc:meta])* $variant:ident($payload:ident),)*) => {
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum Rejection {
            $($(#[$doc])* $variant($payload),)*
            /// A pending edit of the rejection set.
            Transformation(TransformationRejection),
            /// An application defined reason.
            Custom(CustomRejection),
        }

        /// The stable discriminant of a [`Rejection`].
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
        pub enum RejectionKind {
            $($variant,)*
            Transformation,
            Custom,
        }

        impl Rejection {
            pub fn kind(&self) -> RejectionKind {
                match self {
                    $(Rejection::$variant(_) => RejectionKind::$variant,)*
                    Rejection::Transformation(_) => RejectionKind::Transformation,
                    Rejection::Custom(_) => RejectionKind::Custom,
                }
            }
        }

        $(
            impl From<$payload> for Rejection {
                #[inline]
                fn from(rejection: $payload) -> Self {
                    Rejection::$variant(rejection)
                }
            }

            impl RejectionVariant for $payload {
                #[inline]
                fn from_rejection(rejection: &Rejection) -> Option<&Self> {
                    match rejection {
                        Rejection::$variant(payload) => Some(payload),
                        _ => None,
                    }
                }
            }
        )*
    };
}

rejections! {
    /// The uri scheme is not the one this route serves.
    Scheme(SchemeRejection),
    /// The request method is not the one this route serves.
    Method(MethodRejection),
    AuthorizationFailed(AuthorizationFailedRejection),
    MalformedFormField(MalformedFormFieldRejection),
    MalformedHeader(MalformedHeaderRejection),
    MalformedQueryParam(MalformedQueryParamRejection),
    /// The request entity could not be unmarshalled.
    MalformedRequestContent(MalformedRequestContentRejection),
    MissingCookie(MissingCookieRejection),
    MissingFormField(MissingFormFieldRejection),
    MissingHeader(MissingHeaderRejection),
    /// A request attribute some directive relies on was never set.
    MissingAttribute(MissingAttributeRejection),
    InvalidOrigin(InvalidOriginRejection),
    MissingQueryParam(MissingQueryParamRejection),
    InvalidRequiredValueForQueryParam(InvalidRequiredValueForQueryParamRejection),
    RequestEntityExpected(RequestEntityExpectedRejection),
    TooManyRanges(TooManyRangesRejection),
    CircuitBreakerOpen(CircuitBreakerOpenRejection),
    UnsatisfiableRange(UnsatisfiableRangeRejection),
    AuthenticationFailed(AuthenticationFailedRejection),
    UnacceptedResponseContentType(UnacceptedResponseContentTypeRejection),
    UnacceptedResponseEncoding(UnacceptedResponseEncodingRejection),
    UnsupportedRequestContentType(UnsupportedRequestContentTypeRejection),
    UnsupportedRequestEncoding(UnsupportedRequestEncodingRejection),
    ExpectedWebSocketRequest(ExpectedWebSocketRequestRejection),
    UnsupportedWebSocketSubprotocol(UnsupportedWebSocketSubprotocolRejection),
    /// A custom validation failed.
    Validation(ValidationRejection),
}

impl Rejection {
    /// A transformation removing every rejection of the given kinds.
    pub fn cancel<I: IntoIterator<Item = RejectionKind>>(kinds: I) -> Self {
        Rejection::Transformation(TransformationRejection::cancel_kinds(kinds))
    }

    pub fn transformation<F>(transform: F) -> Self
    where
        F: Fn(Vec<Rejection>) -> Vec<Rejection> + Send + Sync + 'static,
    {
        Rejection::Transformation(TransformationRejection::new(transform))
    }

    pub fn custom<T>(payload: T) -> Self
    where
        T: Any + Send + Sync + fmt::Debug + PartialEq,
    {
        Rejection::Custom(CustomRejection::new(payload))
    }

    /// The payload of a [`Rejection::Custom`], if it has type `T`.
    pub fn as_custom<T: 'static>(&self) -> Option<&T> {
        match self {
            Rejection::Custom(custom) => custom.downcast_ref(),
            _ => None,
        }
    }

    #[inline]
    pub fn is_transformation(&self) -> bool {
        matches!(self, Rejection::Transformation(_))
    }
}

/// The error behind a rejection.
///
/// Shared between clones; two causes are equal only if they are the same
/// error instance.
#[derive(Clone)]
pub struct Cause {
    error: Arc<dyn Error + Send + Sync>,
}

impl Cause {
    pub fn from_boxed(error: Box<dyn Error + Send + Sync>) -> Self {
        Self { error: Arc::from(error) }
    }

    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.error.downcast_ref()
    }

    /// Returns the first error of type `E` in the source chain, starting with
    /// the cause itself.
    pub fn find<E: Error + 'static>(&self) -> Option<&E> {
        let error: &(dyn Error + 'static) = self.error.as_ref();
        std::iter::successors(Some(error), |&error| error.source()).find_map(|error| error.downcast_ref::<E>())
    }
}

impl<E: Error + Send + Sync + 'static> From<E> for Cause {
    fn from(error: E) -> Self {
        Self { error: Arc::new(error) }
    }
}

impl PartialEq for Cause {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.error, &other.error)
    }
}

impl Eq for Cause {}

impl fmt::Debug for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.error, f)
    }
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemeRejection {
    pub supported: String,
}

impl SchemeRejection {
    pub fn new<S: Into<String>>(supported: S) -> Self {
        Self { supported: supported.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRejection {
    pub supported: Method,
}

impl MethodRejection {
    pub fn new(supported: Method) -> Self {
        Self { supported }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationFailedRejection;

macro_rules! malformed_rejection {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            pub name: String,
            pub message: String,
            pub cause: Option<Cause>,
        }

        impl $name {
            pub fn new<N: Into<String>, M: Into<String>>(name: N, message: M) -> Self {
                Self { name: name.into(), message: message.into(), cause: None }
            }

            #[must_use]
            pub fn with_cause<C: Into<Cause>>(mut self, cause: C) -> Self {
                self.cause = Some(cause.into());
                self
            }
        }
    };
}

malformed_rejection!(MalformedFormFieldRejection);
malformed_rejection!(MalformedHeaderRejection);
malformed_rejection!(MalformedQueryParamRejection);

/// The request entity could not be unmarshalled.
///
/// The default handler answers `413 Payload Too Large` instead of `400` when
/// the cause is an [`EntityError::TooLarge`](micro_http::protocol::EntityError::TooLarge).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRequestContentRejection {
    pub message: String,
    pub cause: Cause,
}

impl MalformedRequestContentRejection {
    pub fn new<M: Into<String>, C: Into<Cause>>(message: M, cause: C) -> Self {
        Self { message: message.into(), cause: cause.into() }
    }
}

macro_rules! missing_rejection {
    ($name:ident, $field:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            pub $field: String,
        }

        impl $name {
            pub fn new<S: Into<String>>($field: S) -> Self {
                Self { $field: $field.into() }
            }
        }
    };
}

missing_rejection!(MissingCookieRejection, name);
missing_rejection!(MissingFormFieldRejection, name);
missing_rejection!(MissingHeaderRejection, name);
missing_rejection!(MissingQueryParamRejection, name);
missing_rejection!(MissingAttributeRejection, key);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidOriginRejection {
    pub allowed: Vec<String>,
}

impl InvalidOriginRejection {
    pub fn new(allowed: Vec<String>) -> Self {
        Self { allowed }
    }
}

/// A query parameter is present but does not carry the one value the route requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidRequiredValueForQueryParamRejection {
    pub name: String,
    pub expected: String,
    pub actual: String,
}

impl InvalidRequiredValueForQueryParamRejection {
    pub fn new<N: Into<String>, E: Into<String>, A: Into<String>>(name: N, expected: E, actual: A) -> Self {
        Self { name: name.into(), expected: expected.into(), actual: actual.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestEntityExpectedRejection;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TooManyRangesRejection {
    pub max: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerOpenRejection {
    pub cause: Cause,
}

impl CircuitBreakerOpenRejection {
    pub fn new<C: Into<Cause>>(cause: C) -> Self {
        Self { cause: cause.into() }
    }
}

/// A requested byte range, as in `Range: bytes=...`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ByteRange {
    /// `first-last`, both inclusive
    Slice { first: u64, last: u64 },
    /// `offset-`
    FromOffset { offset: u64 },
    /// `-length`, the last `length` bytes
    Suffix { length: u64 },
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteRange::Slice { first, last } => write!(f, "{first}-{last}"),
            ByteRange::FromOffset { offset } => write!(f, "{offset}-"),
            ByteRange::Suffix { length } => write!(f, "-{length}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsatisfiableRangeRejection {
    pub ranges: Vec<ByteRange>,
    pub actual_entity_length: u64,
}

impl UnsatisfiableRangeRejection {
    pub fn new(ranges: Vec<ByteRange>, actual_entity_length: u64) -> Self {
        Self { ranges, actual_entity_length }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AuthenticationFailedCause {
    /// The request carried no credentials.
    CredentialsMissing,
    /// The credentials were present but invalid.
    CredentialsRejected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationFailedRejection {
    pub cause: AuthenticationFailedCause,
    pub challenge: HttpChallenge,
}

impl AuthenticationFailedRejection {
    pub fn new(cause: AuthenticationFailedCause, challenge: HttpChallenge) -> Self {
        Self { cause, challenge }
    }
}

/// None of the content types the route can produce is accepted by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnacceptedResponseContentTypeRejection {
    pub supported: Vec<Mime>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnacceptedResponseEncodingRejection {
    pub supported: Vec<HttpEncoding>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedRequestContentTypeRejection {
    /// Media ranges the route accepts, `*` wildcards allowed.
    pub supported: Vec<Mime>,
    /// The content type the request came with, if known.
    pub content_type: Option<Mime>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedRequestEncodingRejection {
    pub supported: HttpEncoding,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedWebSocketRequestRejection;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedWebSocketSubprotocolRejection {
    pub supported_protocol: String,
}

impl UnsupportedWebSocketSubprotocolRejection {
    pub fn new<S: Into<String>>(supported_protocol: S) -> Self {
        Self { supported_protocol: supported_protocol.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRejection {
    pub message: String,
    pub cause: Option<Cause>,
}

impl ValidationRejection {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self { message: message.into(), cause: None }
    }
}

type TransformFn = dyn Fn(Vec<Rejection>) -> Vec<Rejection> + Send + Sync;

/// A function applied to the rejection set before it is handled.
///
/// Two transformations are equal only if they share the same function.
#[derive(Clone)]
pub struct TransformationRejection {
    transform: Arc<TransformFn>,
}

impl TransformationRejection {
    pub fn new<F>(transform: F) -> Self
    where
        F: Fn(Vec<Rejection>) -> Vec<Rejection> + Send + Sync + 'static,
    {
        Self { transform: Arc::new(transform) }
    }

    /// Removes every rejection of one of the given kinds.
    pub fn cancel_kinds<I: IntoIterator<Item = RejectionKind>>(kinds: I) -> Self {
        let kinds = kinds.into_iter().collect::<Vec<_>>();
        Self::cancel_matching(move |rejection| kinds.contains(&rejection.kind()))
    }

    /// Removes every rejection `predicate` holds for.
    pub fn cancel_matching<P>(predicate: P) -> Self
    where
        P: Fn(&Rejection) -> bool + Send + Sync + 'static,
    {
        Self::new(move |rejections| rejections.into_iter().filter(|rejection| !predicate(rejection)).collect())
    }

    pub fn transform(&self, rejections: Vec<Rejection>) -> Vec<Rejection> {
        (self.transform)(rejections)
    }
}

impl PartialEq for TransformationRejection {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.transform, &other.transform)
    }
}

impl Eq for TransformationRejection {}

impl fmt::Debug for TransformationRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformationRejection").finish_non_exhaustive()
    }
}

trait CustomPayload: Any + Send + Sync + fmt::Debug {
    fn as_any(&self) -> &dyn Any;

    fn dyn_eq(&self, other: &dyn CustomPayload) -> bool;
}

impl<T> CustomPayload for T
where
    T: Any + Send + Sync + fmt::Debug + PartialEq,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn CustomPayload) -> bool {
        other.as_any().downcast_ref::<T>().is_some_and(|other| self == other)
    }
}

/// An application defined rejection payload.
#[derive(Clone)]
pub struct CustomRejection {
    payload: Arc<dyn CustomPayload>,
}

impl CustomRejection {
    pub fn new<T>(payload: T) -> Self
    where
        T: Any + Send + Sync + fmt::Debug + PartialEq,
    {
        Self { payload: Arc::new(payload) }
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.payload.as_ref().as_any().downcast_ref()
    }
}

impl PartialEq for CustomRejection {
    fn eq(&self, other: &Self) -> bool {
        self.payload.as_ref().dyn_eq(other.payload.as_ref())
    }
}

impl Eq for CustomRejection {}

impl fmt::Debug for CustomRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.payload, f)
    }
}
