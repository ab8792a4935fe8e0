//! An immutable HTTP/1.x message model
//!
//! This crate provides the request and response values a server works with
//! after the wire has been parsed: pre-parsed headers, typed attributes and
//! entities that are either fully buffered or streamed exactly once.
//!
//! # Features
//!
//! - Immutable [`protocol::HttpRequest`] / [`protocol::HttpResponse`] with
//!   invariants checked on construction and on every mutation
//! - Ordered header lists with exact-type lookup through [`protocol::header::TypedHeader`]
//! - Typed attributes keyed by [`protocol::attribute::AttributeKey`]
//! - Strict, streamed and chunked entities, with timeout and size bounded buffering
//! - Effective request uri resolution (RFC 7230 §5.5)
//! - Conversion from and to the `http` crate types
//!
//! # Example
//!
//! ```
//! use http::Method;
//! use micro_http::protocol::header::Host;
//! use micro_http::protocol::entity::HttpEntity;
//! use micro_http::protocol::{HttpMessage, HttpRequest};
//!
//! let request = HttpRequest::builder()
//!     .method(Method::POST)
//!     .uri("/upload?name=a.txt")
//!     .header(Host::new("example.com", None))
//!     .entity(HttpEntity::text("hello"))
//!     .build()
//!     .unwrap();
//!
//! let uri = request.effective_uri(false, &Host::empty()).unwrap();
//! assert_eq!(uri, "http://example.com/upload?name=a.txt");
//! assert_eq!(request.header::<Host>().unwrap().host(), "example.com");
//! ```
//!
//! # Error Handling
//!
//! - [`protocol::MessageError`]: a message would break one of its invariants
//! - [`protocol::EntityError`]: an entity stream failed, timed out, was too large or already consumed
//! - [`protocol::IllegalUriError`]: the effective uri could not be established
//! - [`protocol::HttpError`]: top-level error type wrapping the above

pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
