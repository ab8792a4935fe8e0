//! Route rejections and their conversion into responses
//!
//! When no route alternative accepts a request, each alternative leaves a
//! [`rejection::Rejection`] behind explaining why. A
//! [`rejection::RejectionHandler`] turns the collected set into a [`Route`],
//! which produces the final response.
//!
//! # Example
//!
//! ```
//! use http::{Method, StatusCode};
//! use micro_http::protocol::{HttpRequest, HttpResponse};
//! use micro_web::Route;
//! use micro_web::rejection::{MethodRejection, MissingQueryParamRejection, RejectionHandler, resolve_rejections};
//!
//! let mut builder = RejectionHandler::builder();
//! builder.handle_variant(|rejection: &MissingQueryParamRejection| {
//!     Route::complete(HttpResponse::text(StatusCode::BAD_REQUEST, format!("add ?{}=...", rejection.name)))
//! });
//! let handler = builder.result();
//!
//! let rejections = vec![MethodRejection::new(Method::PUT).into()];
//! let response = futures::executor::block_on(resolve_rejections(&handler, HttpRequest::default(), rejections));
//! // not handled by `handler`, answered by the default handler
//! assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
//! ```

pub mod rejection;

mod route;

pub use route::Route;
pub use route::RouteHandler;
pub use route::route_fn;
