//! HTTP client for a remote locfs instance.
//!
//! Every method maps onto one request of the HTTP surface, so an application
//! can drive a peer directly. The [`PeerAdapter`](crate::storage::driver::peer::PeerAdapter)
//! builds on this client to make remote locations look local.

use std::time::SystemTime;

use axum::body::Bytes;
use axum::http::StatusCode;
use axum_extra::headers::{ContentRange, HeaderMapExt, LastModified};
use reqwest::header::{CONTENT_TYPE, RANGE};
use reqwest::{RequestBuilder, Response, Url};
use serde::Deserialize;

use crate::domain::{
    ChunkOptions, ChunkRead, ChunkWrite, CopyOptions, DirInfo, DirInfoEnvelope, ExistsEnvelope,
    FileData, FileInfo, FileInfoEnvelope, Location, LocationsEnvelope, UpdateResult,
};
use crate::error::{AppError, ErrorKind, Result};

#[derive(Clone, Debug)]
pub struct PeerClient {
    http: reqwest::Client,
    api_base: Url,
}

/// Error envelope as read from the wire. Kind names this service does not
/// know are kept as I/O failures.
#[derive(Deserialize)]
struct RemoteError {
    error: String,
    message: String,
}

impl PeerClient {
    /// `api_base` is the origin plus route prefix, e.g. `http://peer:6131/api`.
    pub fn new(api_base: &str) -> Result<Self> {
        Self::with_client(reqwest::Client::new(), api_base)
    }

    /// Shares an existing connection pool.
    pub fn with_client(http: reqwest::Client, api_base: &str) -> Result<Self> {
        let api_base = Url::parse(api_base).map_err(|e| {
            AppError::InvalidRequest(format!("Invalid peer URL {api_base}: {e}"))
        })?;
        if api_base.cannot_be_a_base() {
            return Err(AppError::InvalidRequest(format!(
                "Invalid peer URL {api_base}: not a base URL"
            )));
        }
        Ok(PeerClient { http, api_base })
    }

    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    pub async fn locations(&self) -> Result<Vec<Location>> {
        let url = self.url(&["locations"], "");
        let envelope: LocationsEnvelope = send_and_check(self.http.get(url)).await?.json().await?;
        Ok(envelope.locations)
    }

    pub async fn read_dir(&self, location_id: &str, path: &str) -> Result<DirInfo> {
        let url = with_flag(self.url(&[location_id], path), "readDir");
        let envelope: DirInfoEnvelope = send_and_check(self.http.get(url)).await?.json().await?;
        Ok(envelope.dir_info)
    }

    pub async fn stats(&self, location_id: &str, path: &str) -> Result<FileInfo> {
        let url = with_flag(self.url(&[location_id], path), "stats");
        let envelope: FileInfoEnvelope = send_and_check(self.http.get(url)).await?.json().await?;
        Ok(envelope.file_info)
    }

    pub async fn exists(&self, location_id: &str, path: &str) -> Result<bool> {
        let url = with_flag(self.url(&[location_id], path), "exists");
        let envelope: ExistsEnvelope = send_and_check(self.http.get(url)).await?.json().await?;
        Ok(envelope.exists)
    }

    pub async fn read_file(&self, location_id: &str, path: &str) -> Result<FileData> {
        let url = self.url(&[location_id], path);
        let response = send_and_check(self.http.get(url)).await?;
        let mime_type = content_type(&response);
        let last_modified = response
            .headers()
            .typed_get::<LastModified>()
            .map(SystemTime::from);
        let data = response.bytes().await?;
        Ok(FileData {
            file_size: data.len() as u64,
            data,
            mime_type,
            last_modified,
        })
    }

    pub async fn read_file_chunk(
        &self,
        location_id: &str,
        path: &str,
        options: ChunkOptions,
    ) -> Result<ChunkRead> {
        let position = options.position.unwrap_or(0);

        // An empty range has no `bytes=` form, a stat is enough to answer it.
        if options.length == Some(0) {
            let info = self.stats(location_id, path).await?;
            if info.size > 0 && position >= info.size {
                return Err(AppError::RangeNotSatisfiable {
                    file_size: info.size,
                });
            }
            return Ok(ChunkRead {
                data: Bytes::new(),
                bytes_read: 0,
                chunk_start: position,
                chunk_end: position,
                file_size: info.size,
                mime_type: info.mime_type,
            });
        }

        self.ranged_read(location_id, path, range_value(position, options.length), position)
            .await
    }

    /// Reads the last `suffix_length` bytes, or the whole file when it is
    /// shorter than that.
    pub async fn read_file_suffix(
        &self,
        location_id: &str,
        path: &str,
        suffix_length: u64,
    ) -> Result<ChunkRead> {
        if suffix_length == 0 {
            let info = self.stats(location_id, path).await?;
            return Ok(ChunkRead {
                data: Bytes::new(),
                bytes_read: 0,
                chunk_start: info.size,
                chunk_end: info.size,
                file_size: info.size,
                mime_type: info.mime_type,
            });
        }
        self.ranged_read(location_id, path, format!("bytes=-{suffix_length}"), 0)
            .await
    }

    /// Sends a GET with `range` and reads the chunk back from the
    /// `Content-Range` of the answer, `position` being the start to assume
    /// when the peer sends none.
    async fn ranged_read(
        &self,
        location_id: &str,
        path: &str,
        range: String,
        position: u64,
    ) -> Result<ChunkRead> {
        let url = self.url(&[location_id], path);
        let response = send_and_check(self.http.get(url).header(RANGE, range)).await?;

        let mime_type = content_type(&response);
        let content_range = response.headers().typed_get::<ContentRange>();
        let data = response.bytes().await?;
        let bytes_read = data.len() as u64;

        let (chunk_start, chunk_end) = content_range
            .as_ref()
            .and_then(ContentRange::bytes_range)
            .unwrap_or((position, (position + bytes_read).saturating_sub(1).max(position)));
        let file_size = content_range
            .as_ref()
            .and_then(ContentRange::bytes_len)
            .unwrap_or(bytes_read);

        Ok(ChunkRead {
            data,
            bytes_read,
            chunk_start,
            chunk_end,
            file_size,
            mime_type,
        })
    }

    /// `mime_type` is sent as the `Content-Type` of the upload when given.
    pub async fn write_file(
        &self,
        location_id: &str,
        path: &str,
        data: Bytes,
        mime_type: Option<&str>,
    ) -> Result<()> {
        let url = self.url(&[location_id], path);
        let request = with_content_type(self.http.put(url), mime_type);
        self.update(request.body(data)).await?;
        Ok(())
    }

    pub async fn write_file_chunk(
        &self,
        location_id: &str,
        path: &str,
        data: Bytes,
        options: ChunkOptions,
        mime_type: Option<&str>,
    ) -> Result<ChunkWrite> {
        let position = options.position.unwrap_or(0);
        let length = options
            .length
            .map_or(data.len() as u64, |length| length.min(data.len() as u64));
        let data = data.slice(..length as usize);

        let url = self.url(&[location_id], path);
        let request = with_content_type(self.http.patch(url), mime_type)
            .header(RANGE, range_value(position, Some(length)))
            .body(data);
        let result = self.update(request).await?;
        Ok(ChunkWrite {
            bytes_written: result.bytes_written.unwrap_or(length),
        })
    }

    pub async fn append(
        &self,
        location_id: &str,
        path: &str,
        data: Bytes,
        mime_type: Option<&str>,
    ) -> Result<()> {
        let url = with_flag(self.url(&[location_id], path), "append");
        let request = with_content_type(self.http.patch(url), mime_type);
        self.update(request.body(data)).await?;
        Ok(())
    }

    /// Copies within the remote instance, `from_id` and `to_id` being remote
    /// location ids.
    pub async fn copy(
        &self,
        from_id: &str,
        from_path: &str,
        to_id: &str,
        to_path: &str,
        options: CopyOptions,
    ) -> Result<()> {
        self.transfer("copyFrom", from_id, from_path, to_id, to_path, options)
            .await
    }

    pub async fn move_to(
        &self,
        from_id: &str,
        from_path: &str,
        to_id: &str,
        to_path: &str,
        options: CopyOptions,
    ) -> Result<()> {
        self.transfer("moveFrom", from_id, from_path, to_id, to_path, options)
            .await
    }

    pub async fn rename(&self, location_id: &str, old_path: &str, new_path: &str) -> Result<()> {
        let mut url = self.url(&[location_id], new_path);
        url.query_pairs_mut().append_pair("renameFrom", old_path);
        self.update(self.http.put(url)).await?;
        Ok(())
    }

    pub async fn ensure_dir(&self, location_id: &str, path: &str) -> Result<()> {
        let url = with_flag(self.url(&[location_id], path), "ensureDir");
        self.update(self.http.put(url)).await?;
        Ok(())
    }

    pub async fn ensure_file(&self, location_id: &str, path: &str) -> Result<()> {
        let url = with_flag(self.url(&[location_id], path), "ensureFile");
        self.update(self.http.put(url)).await?;
        Ok(())
    }

    pub async fn empty_dir(&self, location_id: &str, path: &str) -> Result<()> {
        let url = with_flag(self.url(&[location_id], path), "emptyDir");
        self.update(self.http.delete(url)).await?;
        Ok(())
    }

    pub async fn remove(&self, location_id: &str, path: &str) -> Result<()> {
        let url = self.url(&[location_id], path);
        self.update(self.http.delete(url)).await?;
        Ok(())
    }

    async fn transfer(
        &self,
        flag: &str,
        from_id: &str,
        from_path: &str,
        to_id: &str,
        to_path: &str,
        options: CopyOptions,
    ) -> Result<()> {
        let mut url = self.url(&[to_id], to_path);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair(flag, &format!("{from_id}/{}", from_path.trim_start_matches('/')));
            if options.overwrite {
                query.append_key_only("overwrite");
            }
        }
        self.update(self.http.put(url)).await?;
        Ok(())
    }

    async fn update(&self, request: RequestBuilder) -> Result<UpdateResult> {
        Ok(send_and_check(request).await?.json().await?)
    }

    /// Appends `segments` and then each component of `path` to the API base.
    fn url(&self, segments: &[&str], path: &str) -> Url {
        let mut url = self.api_base.clone();
        if let Ok(mut parts) = url.path_segments_mut() {
            parts
                .pop_if_empty()
                .extend(segments)
                .extend(path.split('/').filter(|s| !s.is_empty()));
        }
        url
    }
}

fn with_flag(mut url: Url, flag: &str) -> Url {
    url.query_pairs_mut().append_key_only(flag);
    url
}

fn with_content_type(request: RequestBuilder, mime_type: Option<&str>) -> RequestBuilder {
    match mime_type {
        Some(mime_type) => request.header(CONTENT_TYPE, mime_type),
        None => request,
    }
}

fn range_value(position: u64, length: Option<u64>) -> String {
    match length {
        Some(length) if length > 0 => format!("bytes={}-{}", position, position + length - 1),
        _ => format!("bytes={position}-"),
    }
}

fn content_type(response: &Response) -> String {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Sends the request and turns every non-success answer back into the
/// `AppError` the remote end reported.
async fn send_and_check(builder: RequestBuilder) -> Result<Response> {
    let response = builder.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::RANGE_NOT_SATISFIABLE => {
            let file_size = response
                .headers()
                .typed_get::<ContentRange>()
                .and_then(|range| range.bytes_len())
                .unwrap_or_default();
            Err(AppError::RangeNotSatisfiable { file_size })
        }
        StatusCode::NOT_IMPLEMENTED => Err(AppError::RangeUnsupported),
        StatusCode::BAD_REQUEST | StatusCode::METHOD_NOT_ALLOWED => {
            let text = response.text().await?;
            Err(AppError::InvalidRequest(format!(
                "Peer rejected the request ({status}): {text}"
            )))
        }
        _ => {
            let text = response.text().await?;
            match serde_json::from_str::<RemoteError>(&text) {
                Ok(remote) => Err(AppError::Remote {
                    kind: ErrorKind::from_name(&remote.error),
                    message: remote.message,
                }),
                Err(_) => Err(AppError::Remote {
                    kind: ErrorKind::UnderlyingIo,
                    message: format!("Peer responded {status}: {text}"),
                }),
            }
        }
    }
}
