use axum::body::Bytes;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CopyOptions {
    /// Replace the destination if it already exists.
    pub overwrite: bool,
}

/// Addresses a contiguous byte range of a file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChunkOptions {
    /// Offset of the first byte, 0 when unset.
    pub position: Option<u64>,
    /// Number of bytes, "through end of file" when unset.
    pub length: Option<u64>,
}

impl ChunkOptions {
    pub fn new(position: u64, length: Option<u64>) -> Self {
        ChunkOptions {
            position: Some(position),
            length,
        }
    }
}

/// Whole-file read result.
#[derive(Clone, Debug)]
pub struct FileData {
    pub data: Bytes,
    pub mime_type: String,
    pub file_size: u64,
    pub last_modified: Option<SystemTime>,
}

/// Chunk read result. `chunk_end` is inclusive.
#[derive(Clone, Debug)]
pub struct ChunkRead {
    pub data: Bytes,
    pub bytes_read: u64,
    pub chunk_start: u64,
    pub chunk_end: u64,
    pub file_size: u64,
    pub mime_type: String,
}

impl ChunkRead {
    /// Whether the chunk spans the whole file.
    pub fn is_complete(&self) -> bool {
        self.bytes_read == self.file_size
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChunkWrite {
    pub bytes_written: u64,
}
