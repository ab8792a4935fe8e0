use std::fmt::Display;

use http::StatusCode;
use micro_http::protocol::header::{Allow, ContentRange, HttpHeader, SecWebSocketProtocol, WwwAuthenticate};
use micro_http::protocol::{EntityError, HttpMessage, HttpResponse, StatusExt};
use once_cell::sync::Lazy;

use crate::rejection::handler::{RejectionHandler, RejectionHandlerBuilder};
use crate::rejection::{
    AuthenticationFailedCause, AuthenticationFailedRejection, AuthorizationFailedRejection, CircuitBreakerOpenRejection,
    ExpectedWebSocketRequestRejection, InvalidOriginRejection, InvalidRequiredValueForQueryParamRejection,
    MalformedFormFieldRejection, MalformedHeaderRejection, MalformedQueryParamRejection,
    MalformedRequestContentRejection, MethodRejection, MissingAttributeRejection, MissingCookieRejection,
    MissingFormFieldRejection, MissingHeaderRejection, MissingQueryParamRejection, RequestEntityExpectedRejection,
    SchemeRejection, TooManyRangesRejection, UnacceptedResponseContentTypeRejection,
    UnacceptedResponseEncodingRejection, UnsatisfiableRangeRejection, UnsupportedRequestContentTypeRejection,
    UnsupportedRequestEncodingRejection, UnsupportedWebSocketSubprotocolRejection, ValidationRejection,
};
use crate::route::Route;

static DEFAULT_HANDLER: Lazy<RejectionHandler> = Lazy::new(build_default_handler);

/// The built-in handler answering every built-in rejection.
///
/// Every response it produces drains the request entity first. Rejections
/// that are merged into one response (methods, schemes, authentication
/// challenges, ...) are handled all at once.
///
/// # Panics
///
/// The returned handler panics when applied to a rejection it has no rule
/// for, i.e. a [`Rejection::Custom`](crate::rejection::Rejection::Custom)
/// no earlier handler took care of.
pub fn default_handler() -> &'static RejectionHandler {
    &DEFAULT_HANDLER
}

fn complete<S: Into<String>>(status: StatusCode, message: S) -> Route {
    Route::reject_entity_and_complete(HttpResponse::text(status, message))
}

fn complete_with(response: HttpResponse) -> Route {
    Route::reject_entity_and_complete(response)
}

fn join<T: Display, I: IntoIterator<Item = T>>(items: I, separator: &str) -> String {
    items.into_iter().map(|item| item.to_string()).collect::<Vec<_>>().join(separator)
}

#[allow(clippy::too_many_lines, reason = "one rule per built-in rejection")]
fn build_default_handler() -> RejectionHandler {
    let mut builder = RejectionHandlerBuilder::new(true);
    builder
        .handle_all(|rejections: Vec<SchemeRejection>| {
            let schemes = join(rejections.iter().map(|rejection| &rejection.supported), ", ");
            complete(StatusCode::BAD_REQUEST, format!("Uri scheme not allowed, supported schemes: {schemes}"))
        })
        .handle_all(|rejections: Vec<MethodRejection>| {
            let methods = rejections.into_iter().map(|rejection| rejection.supported).collect::<Vec<_>>();
            let message = format!("HTTP method not allowed, supported methods: {}", join(&methods, ", "));
            complete_with(HttpResponse::text(StatusCode::METHOD_NOT_ALLOWED, message).add_header(Allow::new(methods)))
        })
        .handle_variant(|_: &AuthorizationFailedRejection| {
            complete(StatusCode::FORBIDDEN, "The supplied authentication is not authorized to access this resource")
        })
        .handle_variant(|rejection: &MalformedFormFieldRejection| {
            let message = format!("The form field '{}' was malformed:\n{}", rejection.name, rejection.message);
            complete(StatusCode::BAD_REQUEST, message)
        })
        .handle_variant(|rejection: &MalformedHeaderRejection| {
            let message = format!("The value of HTTP header '{}' was malformed:\n{}", rejection.name, rejection.message);
            complete(StatusCode::BAD_REQUEST, message)
        })
        .handle_variant(|rejection: &MalformedQueryParamRejection| {
            let message = format!("The query parameter '{}' was malformed:\n{}", rejection.name, rejection.message);
            complete(StatusCode::BAD_REQUEST, message)
        })
        .handle_variant(|rejection: &MalformedRequestContentRejection| {
            match rejection.cause.find::<EntityError>() {
                Some(EntityError::TooLarge { limit, actual }) => complete(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    format!("Request Content-Length of {actual} bytes exceeds the configured limit of {limit} bytes"),
                ),
                _ => complete(StatusCode::BAD_REQUEST, format!("The request content was malformed:\n{}", rejection.message)),
            }
        })
        .handle_variant(|rejection: &MissingCookieRejection| {
            complete(StatusCode::BAD_REQUEST, format!("Request is missing required cookie '{}'", rejection.name))
        })
        .handle_variant(|rejection: &MissingFormFieldRejection| {
            complete(StatusCode::BAD_REQUEST, format!("Request is missing required form field '{}'", rejection.name))
        })
        .handle_variant(|rejection: &MissingHeaderRejection| {
            complete(StatusCode::BAD_REQUEST, format!("Request is missing required HTTP header '{}'", rejection.name))
        })
        .handle_variant(|_: &MissingAttributeRejection| {
            complete(StatusCode::INTERNAL_SERVER_ERROR, StatusCode::INTERNAL_SERVER_ERROR.default_message())
        })
        .handle_variant(|rejection: &InvalidOriginRejection| {
            let message = format!("Allowed `Origin` header values: {}", join(&rejection.allowed, ", "));
            complete(StatusCode::FORBIDDEN, message)
        })
        .handle_variant(|rejection: &MissingQueryParamRejection| {
            complete(StatusCode::NOT_FOUND, format!("Request is missing required query parameter '{}'", rejection.name))
        })
        .handle_variant(|rejection: &InvalidRequiredValueForQueryParamRejection| {
            let message = format!(
                "Request is missing required value '{}' for query parameter '{}'",
                rejection.expected, rejection.name
            );
            complete(StatusCode::NOT_FOUND, message)
        })
        .handle_variant(|_: &RequestEntityExpectedRejection| {
            complete(StatusCode::BAD_REQUEST, "Request entity expected but not supplied")
        })
        .handle_variant(|_: &TooManyRangesRejection| {
            complete(StatusCode::RANGE_NOT_SATISFIABLE, "Request contains too many ranges")
        })
        .handle_circuit_breaker_open_rejection(|_: &CircuitBreakerOpenRejection| {
            complete(StatusCode::SERVICE_UNAVAILABLE, StatusCode::SERVICE_UNAVAILABLE.default_message())
        })
        .handle_variant(|rejection: &UnsatisfiableRangeRejection| {
            let message =
                format!("None of the following requested Ranges were satisfiable:\n{}", join(&rejection.ranges, "\n"));
            let content_range = ContentRange::Unsatisfiable { instance_length: rejection.actual_entity_length };
            complete_with(HttpResponse::text(StatusCode::RANGE_NOT_SATISFIABLE, message).add_header(content_range))
        })
        .handle_all(|rejections: Vec<AuthenticationFailedRejection>| {
            // the first rejection decides the message, every challenge is sent
            let message = match rejections.first().map(|rejection| rejection.cause) {
                Some(AuthenticationFailedCause::CredentialsRejected) => "The supplied authentication is invalid",
                _ => "The resource requires authentication, which was not supplied with the request",
            };
            let challenges =
                rejections.into_iter().map(|rejection| HttpHeader::from(WwwAuthenticate::new(vec![rejection.challenge])));
            complete_with(HttpResponse::text(StatusCode::UNAUTHORIZED, message).add_headers(challenges))
        })
        .handle_all(|rejections: Vec<UnacceptedResponseContentTypeRejection>| {
            let supported = join(rejections.iter().flat_map(|rejection| &rejection.supported), "\n");
            let message = format!("Resource representation is only available with these types:\n{supported}");
            complete(StatusCode::NOT_ACCEPTABLE, message)
        })
        .handle_all(|rejections: Vec<UnacceptedResponseEncodingRejection>| {
            let supported = join(rejections.iter().flat_map(|rejection| &rejection.supported), "\n");
            let message = format!("Resource representation is only available with these Content-Encodings:\n{supported}");
            complete(StatusCode::NOT_ACCEPTABLE, message)
        })
        .handle_all(|rejections: Vec<UnsupportedRequestContentTypeRejection>| {
            let unsupported = rejections
                .iter()
                .find_map(|rejection| rejection.content_type.as_ref())
                .map_or_else(String::new, |content_type| format!(" [{content_type}]"));
            let supported = join(rejections.iter().flat_map(|rejection| &rejection.supported), " or ");
            let expected = if supported.is_empty() { String::new() } else { format!(" Expected:\n{supported}") };
            let message = format!("The request's Content-Type{unsupported} is not supported.{expected}");
            complete(StatusCode::UNSUPPORTED_MEDIA_TYPE, message)
        })
        .handle_all(|rejections: Vec<UnsupportedRequestEncodingRejection>| {
            let supported = join(rejections.iter().map(|rejection| &rejection.supported), " or ");
            let message = format!("The request's Content-Encoding is not supported. Expected:\n{supported}");
            complete(StatusCode::BAD_REQUEST, message)
        })
        .handle_variant(|_: &ExpectedWebSocketRequestRejection| {
            complete(StatusCode::BAD_REQUEST, "Expected WebSocket Upgrade request")
        })
        .handle_all(|rejections: Vec<UnsupportedWebSocketSubprotocolRejection>| {
            let supported =
                rejections.into_iter().map(|rejection| rejection.supported_protocol).collect::<Vec<_>>();
            let message = format!(
                "None of the websocket subprotocols offered in the request are supported. Supported are {}.",
                join(supported.iter().map(|protocol| format!("'{protocol}'")), ",")
            );
            complete_with(
                HttpResponse::text(StatusCode::BAD_REQUEST, message).add_header(SecWebSocketProtocol::new(supported)),
            )
        })
        .handle_variant(|rejection: &ValidationRejection| complete(StatusCode::BAD_REQUEST, rejection.message.clone()))
        .handle(|rejection| panic!("unhandled rejection: {rejection:?}"))
        .handle_not_found(complete(StatusCode::NOT_FOUND, StatusCode::NOT_FOUND.default_message()));

    builder.result()
}
