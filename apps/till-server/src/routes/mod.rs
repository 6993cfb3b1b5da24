//! Router assembly.

use axum::http::{HeaderName, HeaderValue, Request};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::AppState;

pub mod health;
pub mod sales;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Fresh uuid per request unless the client sent one.
#[derive(Clone, Copy, Default)]
struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Builds the application with all routes and middleware.
pub fn router(state: AppState) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .merge(health::router())
        .nest("/api/sales", sales::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        // Outermost: the id exists before tracing starts
        .layer(SetRequestIdLayer::new(request_id, UuidRequestId))
        .with_state(state)
}
