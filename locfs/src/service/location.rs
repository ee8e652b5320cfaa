use std::sync::Arc;

use axum::Json;
use axum::extract::State;

use crate::domain::LocationsEnvelope;
use crate::utils::state::AppState;

/// GET {prefix}/locations
pub async fn list_locations_handler(State(state): State<Arc<AppState>>) -> Json<LocationsEnvelope> {
    Json(LocationsEnvelope {
        locations: state.dispatcher.locations().await,
    })
}
