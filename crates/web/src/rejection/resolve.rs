use http::StatusCode;
use micro_http::protocol::{HttpRequest, HttpResponse, StatusExt};
use tracing::{trace, warn};

use crate::rejection::{Rejection, RejectionHandler};
use crate::route::Route;

/// Turns the rejections collected for `request` into a response.
///
/// Pending transformations are applied first. The handler is sealed with the
/// default handler, so every rejection set gets answered.
pub async fn resolve_rejections(
    handler: &RejectionHandler,
    request: HttpRequest,
    rejections: Vec<Rejection>,
) -> HttpResponse {
    let collected = rejections.len();
    let rejections = RejectionHandler::apply_transformations(rejections);
    trace!(collected, remaining = rejections.len(), "applied rejection transformations");

    let route = handler.clone().seal().apply(&rejections).unwrap_or_else(|| {
        warn!(rejections = rejections.len(), "sealed rejection handler left rejections unhandled");
        Route::reject_entity_and_complete(HttpResponse::text(
            StatusCode::NOT_FOUND,
            StatusCode::NOT_FOUND.default_message(),
        ))
    });
    route.run(request).await
}
