//! Resolves a few rejection sets with a custom handler and prints the responses.

use std::time::Duration;

use http::{Method, StatusCode};
use micro_http::protocol::entity::HttpEntity;
use micro_http::protocol::header::{HttpChallenge, HttpHeader};
use micro_http::protocol::{HttpMessage, HttpRequest, HttpResponse};
use micro_web::Route;
use micro_web::rejection::{
    AuthenticationFailedCause, AuthenticationFailedRejection, MethodRejection, MissingQueryParamRejection, Rejection,
    RejectionHandler, RejectionKind, resolve_rejections,
};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::TRACE).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let mut builder = RejectionHandler::builder();
    builder.handle_variant(|rejection: &MissingQueryParamRejection| {
        Route::reject_entity_and_complete(HttpResponse::text(
            StatusCode::BAD_REQUEST,
            format!("try again with ?{}=...", rejection.name),
        ))
    });
    let handler = builder
        .result()
        .map_rejection_response(|response| response.add_header(HttpHeader::raw("x-rejected", "true").expect("valid header")))
        .expect("built handlers can map their responses");

    let cases: Vec<(&str, Vec<Rejection>)> = vec![
        ("custom rule", vec![MissingQueryParamRejection::new("page").into()]),
        ("merged methods", vec![MethodRejection::new(Method::GET).into(), MethodRejection::new(Method::POST).into()]),
        (
            "authentication",
            vec![
                AuthenticationFailedRejection::new(
                    AuthenticationFailedCause::CredentialsMissing,
                    HttpChallenge::basic("admin"),
                )
                .into(),
            ],
        ),
        ("cancelled", vec![MethodRejection::new(Method::GET).into(), Rejection::cancel([RejectionKind::Method])]),
        ("nothing matched", vec![]),
    ];

    for (name, rejections) in cases {
        let response = resolve_rejections(&handler, HttpRequest::default(), rejections).await;
        let response = response.to_strict(Duration::from_secs(1), None).await.expect("strict response");
        let body = match response.entity() {
            HttpEntity::Strict { data, .. } => String::from_utf8_lossy(data).into_owned(),
            _ => String::new(),
        };
        let headers = response.headers().iter().map(ToString::to_string).collect::<Vec<_>>();
        info!(case = name, status = %response.status(), ?headers, %body, "resolved rejections");
    }
}
