use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Method};
use axum::response::Response;
use axum::routing::{any, get};

use crate::error::AppError;
use crate::service::file::{delete_handler, get_handler, patch_handler, put_handler};
use crate::service::intent::{DeleteIntent, GetIntent, PatchIntent, PutIntent};
use crate::service::location::list_locations_handler;
use crate::utils::state::AppState;

pub fn create_v1_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/locations", get(list_locations_handler))
        // The bare form addresses the location root.
        .route("/{location_id}", any(dispatch_handler))
        .route("/{location_id}/", any(dispatch_handler))
        .route("/{location_id}/{*path}", any(dispatch_handler))
}

async fn dispatch_handler(
    State(state): State<Arc<AppState>>,
    Path(params): Path<HashMap<String, String>>,
    Query(query): Query<HashMap<String, String>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let location_id = params.get("location_id").map(String::as_str).unwrap_or_default();
    let path = params.get("path").map(String::as_str).unwrap_or_default();

    match method {
        Method::GET => {
            let intent = GetIntent::parse(&query, &headers)?;
            get_handler(&state, location_id, path, intent).await
        }
        Method::PUT => {
            let intent = PutIntent::parse(&query)?;
            put_handler(&state, location_id, path, intent, body).await
        }
        Method::PATCH => {
            let intent = PatchIntent::parse(&query, &headers)?;
            patch_handler(&state, location_id, path, intent, body).await
        }
        Method::DELETE => {
            let intent = DeleteIntent::parse(&query);
            delete_handler(&state, location_id, path, intent).await
        }
        // Unsupported methods
        other => Err(AppError::MethodNotAllowed(other)),
    }
}
