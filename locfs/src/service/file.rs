use axum::Json;
use axum::body::{Body, Bytes};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum_extra::headers::{AcceptRanges, ContentLength, ContentRange, HeaderMapExt, LastModified};

use crate::domain::{
    ChunkRead, DirInfoEnvelope, ExistsEnvelope, FileData, FileInfoEnvelope, UpdateResult,
};
use crate::error::{AppError, Result};
use crate::service::intent::{DeleteIntent, GetIntent, PatchIntent, PutIntent};
use crate::service::range::RangeSpec;
use crate::utils::state::AppState;

/// GET {prefix}/<locationId>/<path>
pub async fn get_handler(
    state: &AppState,
    location_id: &str,
    path: &str,
    intent: GetIntent,
) -> Result<Response> {
    let dispatcher = &state.dispatcher;
    match intent {
        GetIntent::ReadDir => {
            let dir_info = dispatcher.read_dir(location_id, path).await?;
            Ok(Json(DirInfoEnvelope { dir_info }).into_response())
        }
        GetIntent::Stats => {
            let file_info = dispatcher.stat(location_id, path).await?;
            Ok(Json(FileInfoEnvelope { file_info }).into_response())
        }
        GetIntent::Exists => {
            let exists = dispatcher.exists(location_id, path).await?;
            Ok(Json(ExistsEnvelope { exists }).into_response())
        }
        GetIntent::ReadChunk(spec) => read_chunk(state, location_id, path, spec).await,
        GetIntent::ReadFile => {
            let file = dispatcher.read_file(location_id, path).await?;
            Ok(full_file_response(file))
        }
    }
}

/// PUT {prefix}/<locationId>/<path>
pub async fn put_handler(
    state: &AppState,
    location_id: &str,
    path: &str,
    intent: PutIntent,
    body: Bytes,
) -> Result<Response> {
    let dispatcher = &state.dispatcher;
    let update = match intent {
        PutIntent::Move { source, options } => {
            dispatcher
                .move_to(&source.location_id, &source.path, location_id, path, options)
                .await?;
            "move"
        }
        PutIntent::Copy { source, options } => {
            dispatcher
                .copy(&source.location_id, &source.path, location_id, path, options)
                .await?;
            "copy"
        }
        PutIntent::Rename { from_path } => {
            dispatcher.rename(location_id, &from_path, path).await?;
            "rename"
        }
        PutIntent::EnsureDir => {
            dispatcher.ensure_dir(location_id, path).await?;
            "ensureDir"
        }
        PutIntent::EnsureFile => {
            dispatcher.ensure_file(location_id, path).await?;
            "ensureFile"
        }
        PutIntent::WriteFile => {
            dispatcher.write_file(location_id, path, body).await?;
            "writeFile"
        }
    };
    Ok(Json(UpdateResult::done(update)).into_response())
}

/// PATCH {prefix}/<locationId>/<path>
pub async fn patch_handler(
    state: &AppState,
    location_id: &str,
    path: &str,
    intent: PatchIntent,
    body: Bytes,
) -> Result<Response> {
    let result = match intent {
        PatchIntent::Append => {
            state.dispatcher.append(location_id, path, body).await?;
            UpdateResult::done("append")
        }
        PatchIntent::WriteChunk(options) => {
            let written = state
                .dispatcher
                .write_file_chunk(location_id, path, body, options)
                .await?;
            UpdateResult::done("writeFileChunk").with_bytes_written(written.bytes_written)
        }
    };
    Ok(Json(result).into_response())
}

/// DELETE {prefix}/<locationId>/<path>
pub async fn delete_handler(
    state: &AppState,
    location_id: &str,
    path: &str,
    intent: DeleteIntent,
) -> Result<Response> {
    let update = match intent {
        DeleteIntent::EmptyDir => {
            state.dispatcher.empty_dir(location_id, path).await?;
            "emptyDir"
        }
        DeleteIntent::Remove => {
            state.dispatcher.remove(location_id, path).await?;
            "remove"
        }
    };
    Ok(Json(UpdateResult::done(update)).into_response())
}

async fn read_chunk(
    state: &AppState,
    location_id: &str,
    path: &str,
    spec: RangeSpec,
) -> Result<Response> {
    let options = match spec.explicit_options() {
        Some(options) => options,
        None => {
            let info = state.dispatcher.stat(location_id, path).await?;
            spec.to_options(info.size)
        }
    };
    let chunk = state
        .dispatcher
        .read_file_chunk(location_id, path, options)
        .await?;
    chunk_response(chunk)
}

/// 200 with `bytes */<size>` when the chunk is the whole file, 206 otherwise.
fn chunk_response(chunk: ChunkRead) -> Result<Response> {
    let (status, content_range) = if chunk.is_complete() {
        (StatusCode::OK, ContentRange::unsatisfied_bytes(chunk.file_size))
    } else {
        let range = ContentRange::bytes(chunk.chunk_start..=chunk.chunk_end, chunk.file_size)
            .map_err(|_| AppError::RangeNotSatisfiable {
                file_size: chunk.file_size,
            })?;
        (StatusCode::PARTIAL_CONTENT, range)
    };

    let mut response = Response::new(Body::from(chunk.data));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.typed_insert(content_range);
    headers.typed_insert(ContentLength(chunk.bytes_read));
    headers.typed_insert(AcceptRanges::bytes());
    set_content_type(headers, &chunk.mime_type);
    Ok(response)
}

fn full_file_response(file: FileData) -> Response {
    let mut response = Response::new(Body::from(file.data));
    let headers = response.headers_mut();
    headers.typed_insert(ContentLength(file.file_size));
    headers.typed_insert(AcceptRanges::bytes());
    if let Some(modified) = file.last_modified {
        headers.typed_insert(LastModified::from(modified));
    }
    set_content_type(headers, &file.mime_type);
    response
}

fn set_content_type(headers: &mut HeaderMap, mime_type: &str) {
    if mime_type.is_empty() {
        return;
    }
    if let Ok(value) = HeaderValue::from_str(mime_type) {
        headers.insert(CONTENT_TYPE, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(data: &'static [u8], start: u64, file_size: u64) -> ChunkRead {
        ChunkRead {
            data: Bytes::from_static(data),
            bytes_read: data.len() as u64,
            chunk_start: start,
            chunk_end: start + data.len() as u64 - 1,
            file_size,
            mime_type: "text/plain".to_string(),
        }
    }

    #[test]
    fn test_partial_chunk_response() {
        let response = chunk_response(chunk(b"fghijk", 5, 26)).unwrap();
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        let headers = response.headers();
        assert_eq!(headers["content-range"], "bytes 5-10/26");
        assert_eq!(headers["content-length"], "6");
        assert_eq!(headers["accept-ranges"], "bytes");
        assert_eq!(headers["content-type"], "text/plain");
    }

    #[test]
    fn test_complete_chunk_response() {
        let response = chunk_response(chunk(b"abc", 0, 3)).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-range"], "bytes */3");
    }

    #[test]
    fn test_full_file_without_mime_type() {
        let response = full_file_response(FileData {
            data: Bytes::from_static(b"raw"),
            mime_type: String::new(),
            file_size: 3,
            last_modified: Some(std::time::SystemTime::UNIX_EPOCH),
        });
        let headers = response.headers();
        assert!(headers.get("content-type").is_none());
        assert_eq!(headers["content-length"], "3");
        assert_eq!(headers["last-modified"], "Thu, 01 Jan 1970 00:00:00 GMT");
    }
}
