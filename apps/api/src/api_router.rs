use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/validate-jitrequest",
            post(handlers::admission::validate_request_handler),
        )
        .route("/healthz", get(handlers::health::health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
