//! The HTTP message model.
//!
//! [`HttpRequest`] and [`HttpResponse`] are immutable values: every mutator
//! returns a new message and re-checks the invariants the message type
//! defines. Both share their capability set through the [`HttpMessage`]
//! trait, which is also where header lookup, attribute access and the entity
//! helpers live.
//!
//! - [`header`]: the pre-parsed header list and typed header payloads
//! - [`attribute`]: typed, never-rendered message metadata
//! - [`entity`]: strict and streamed entities with single-consumption sources
//!
//! Invariant violations are reported as [`MessageError`], entity failures as
//! [`EntityError`] and effective uri failures as [`IllegalUriError`]; all three
//! convert into [`HttpError`].

mod error;
pub use error::EntityError;
pub use error::HttpError;
pub use error::IllegalUriError;
pub use error::MessageError;

mod version;
pub use version::HttpProtocol;

mod method;
pub use method::MethodExt;
pub use method::RequestEntityAcceptance;

mod status;
pub use status::StatusExt;

mod message;
pub use message::HttpMessage;

mod request;
pub use request::HttpRequest;
pub use request::RequestBuilder;

mod response;
pub use response::HttpResponse;
pub use response::ResponseBuilder;

mod settings;
pub use settings::MessageSettings;
pub use settings::MessageSettingsBuilder;

pub mod attribute;
pub mod entity;
pub mod header;
