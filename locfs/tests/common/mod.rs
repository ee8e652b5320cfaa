#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{Request, Response};
use locfs::api::create_router;
use locfs::config::Config;
use locfs::domain::Location;
use locfs::utils::state::AppState;
use tempfile::TempDir;

pub const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

pub fn fs_location(tmp: &TempDir, id: &str) -> Location {
    let root = tmp.path().join(id);
    std::fs::create_dir_all(&root).unwrap();
    Location::filesystem(id, format!("Test Location {id}"), root)
}

pub fn config(locations: Vec<Location>) -> Config {
    Config {
        locations,
        ..Config::default()
    }
}

pub fn app(config: Config) -> Router {
    create_router(Arc::new(AppState::new(config)))
}

/// Serves `app` on a loopback port and returns its origin.
pub async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn request(method: &str, uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(body.into())
        .unwrap()
}

pub fn ranged(method: &str, uri: &str, range: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("range", range)
        .body(body.into())
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
