//! Routes: the response-producing actions a rejection handler yields.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use micro_http::protocol::{HttpMessage, HttpRequest, HttpResponse};
use tracing::warn;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RouteHandler: Send + Sync {
    async fn invoke(&self, request: HttpRequest) -> HttpResponse;
}

/// A cheaply cloneable, shareable [`RouteHandler`].
#[derive(Clone)]
pub struct Route {
    handler: Arc<dyn RouteHandler>,
}

impl Route {
    pub fn new<H: RouteHandler + 'static>(handler: H) -> Self {
        Self { handler: Arc::new(handler) }
    }

    /// Always completes with `response`, leaving the request entity alone.
    pub fn complete(response: HttpResponse) -> Self {
        route_fn(move |_request| {
            let response = response.clone();
            async move { response }
        })
    }

    /// Drains the request entity, then completes with `response`.
    ///
    /// An undrained streamed entity would stall the connection it arrived on.
    /// A failed drain is logged and the response is sent anyway.
    pub fn reject_entity_and_complete(response: HttpResponse) -> Self {
        route_fn(move |request: HttpRequest| {
            let response = response.clone();
            async move {
                if let Err(e) = request.discard_entity_bytes().await {
                    warn!(cause = %e, status = %response.status(), "complete rejected request with undrained entity");
                }
                response
            }
        })
    }

    /// Post-processes every response this route produces.
    #[must_use]
    pub fn map_response<F>(self, f: F) -> Self
    where
        F: Fn(HttpResponse) -> HttpResponse + Send + Sync + 'static,
    {
        Self::new(MapResponse { inner: self, f })
    }

    pub async fn run(&self, request: HttpRequest) -> HttpResponse {
        self.handler.invoke(request).await
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route").finish_non_exhaustive()
    }
}

/// Creates a [`Route`] from an async function.
pub fn route_fn<F, Fut>(f: F) -> Route
where
    F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HttpResponse> + Send + 'static,
{
    Route::new(FnRoute { f })
}

struct FnRoute<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> RouteHandler for FnRoute<F>
where
    F: Fn(HttpRequest) -> Fut + Send + Sync,
    Fut: Future<Output = HttpResponse> + Send,
{
    async fn invoke(&self, request: HttpRequest) -> HttpResponse {
        (self.f)(request).await
    }
}

struct MapResponse<F> {
    inner: Route,
    f: F,
}

#[async_trait]
impl<F> RouteHandler for MapResponse<F>
where
    F: Fn(HttpResponse) -> HttpResponse + Send + Sync,
{
    async fn invoke(&self, request: HttpRequest) -> HttpResponse {
        let response = self.inner.run(request).await;
        (self.f)(response)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::{Method, StatusCode};
    use micro_http::protocol::entity::{ByteSource, HttpEntity, SourceState};

    use super::*;

    fn streamed_request(source: &ByteSource) -> HttpRequest {
        HttpRequest::builder()
            .method(Method::POST)
            .entity(HttpEntity::streamed(mime::TEXT_PLAIN, 5, source.clone()))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn route_delegates_to_handler() {
        let mut handler = MockRouteHandler::new();
        handler
            .expect_invoke()
            .withf(|request| *request.method() == Method::DELETE)
            .times(1)
            .returning(|_request| HttpResponse::new(StatusCode::ACCEPTED));

        let route = Route::new(handler);
        let request = HttpRequest::default().with_method(Method::DELETE).unwrap();

        assert_eq!(route.run(request).await.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn complete_ignores_request() {
        let route = Route::complete(HttpResponse::text(StatusCode::OK, "done"));
        let response = route.run(HttpRequest::default()).await;
        assert_eq!(response.entity(), &HttpEntity::text("done"));
    }

    #[tokio::test]
    async fn reject_entity_and_complete_drains_entity() {
        let source = ByteSource::from_chunks([Bytes::from_static(b"hel"), Bytes::from_static(b"lo")]);
        let route = Route::reject_entity_and_complete(HttpResponse::new(StatusCode::BAD_REQUEST));

        let response = route.run(streamed_request(&source)).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(source.state(), SourceState::Drained);
    }

    #[tokio::test]
    async fn reject_entity_and_complete_tolerates_consumed_entity() {
        let source = ByteSource::from_chunks([Bytes::from_static(b"hello")]);
        let request = streamed_request(&source);
        request.discard_entity_bytes().await.unwrap();

        let route = Route::reject_entity_and_complete(HttpResponse::new(StatusCode::BAD_REQUEST));
        assert_eq!(route.run(request).await.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn map_response() {
        let route = Route::complete(HttpResponse::new(StatusCode::OK))
            .map_response(|response| response.with_status(StatusCode::CREATED).unwrap());

        assert_eq!(route.run(HttpRequest::default()).await.status(), StatusCode::CREATED);
    }
}
