use serde::{Deserialize, Serialize};

use crate::domain::{DirInfo, FileInfo, Location};

// JSON bodies exchanged between the HTTP surface and its clients. The same
// types are used to render responses and to read them back in `PeerClient`.

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LocationsEnvelope {
    pub locations: Vec<Location>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DirInfoEnvelope {
    pub dir_info: DirInfo,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FileInfoEnvelope {
    pub file_info: FileInfo,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug)]
pub struct ExistsEnvelope {
    pub exists: bool,
}

/// Acknowledges a mutation, e.g. `{"update":"writeFile","done":true}`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub update: String,
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes_written: Option<u64>,
}

impl UpdateResult {
    pub fn done(update: &str) -> Self {
        UpdateResult {
            update: update.to_string(),
            done: true,
            bytes_written: None,
        }
    }

    pub fn with_bytes_written(mut self, bytes_written: u64) -> Self {
        self.bytes_written = Some(bytes_written);
        self
    }
}
