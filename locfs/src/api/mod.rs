pub mod middleware;
pub mod v1;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::utils::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let config = state.config.clone();

    // axum cannot nest at "/", an empty prefix serves the API at the root.
    let mut router = if config.route_prefix.is_empty() {
        Router::new().merge(v1::create_v1_router())
    } else {
        Router::new().nest(&config.route_prefix, v1::create_v1_router())
    };

    if config.read_only {
        router = router.layer(axum::middleware::from_fn(middleware::read_only));
    }
    router = router
        .layer(axum::middleware::from_fn(middleware::error_envelope))
        .layer(DefaultBodyLimit::max(config.max_body_bytes));
    if config.cors {
        router = router.layer(CorsLayer::permissive());
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
