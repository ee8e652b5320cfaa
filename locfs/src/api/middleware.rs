use axum::Json;
use axum::extract::Request;
use axum::http::Method;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::{AppError, ErrorBody};

/// Completes error envelopes with the URL of the request that failed.
pub async fn error_envelope(req: Request, next: Next) -> Response {
    let url = req.uri().to_string();
    let mut response = next.run(req).await;
    match response.extensions_mut().remove::<ErrorBody>() {
        Some(mut body) => {
            body.url = url;
            (response.status(), Json(body)).into_response()
        }
        None => response,
    }
}

/// Refuses every mutating verb.
pub async fn read_only(req: Request, next: Next) -> Response {
    match *req.method() {
        Method::PUT | Method::PATCH | Method::DELETE => {
            AppError::MethodNotAllowed(req.method().clone()).into_response()
        }
        _ => next.run(req).await,
    }
}
