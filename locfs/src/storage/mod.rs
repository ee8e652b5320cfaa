use axum::body::Bytes;

use crate::domain::{
    ChunkOptions, ChunkRead, ChunkWrite, CopyOptions, DirInfo, FileData, FileInfo, Location,
    LocationKind,
};
use crate::error::Result;

pub mod driver;
pub mod paths;

/// The uniform file-operation contract every backend fulfils.
///
/// Paths are relative to the location root and use forward slashes. An
/// adapter serves exactly one [`LocationKind`]; the dispatcher never hands it
/// a location of another kind.
#[async_trait::async_trait]
pub trait Adapter: Send + Sync {
    fn kind(&self) -> LocationKind;

    /// Appends `data`, creating the file if it is absent.
    async fn append(&self, loc: &Location, path: &str, data: Bytes) -> Result<()>;

    /// With `overwrite`, the destination is replaced, never merged into.
    async fn copy(
        &self,
        from_loc: &Location,
        from_path: &str,
        to_loc: &Location,
        to_path: &str,
        options: CopyOptions,
    ) -> Result<()>;

    /// Removes every child of the directory, keeping the directory.
    async fn empty_dir(&self, loc: &Location, path: &str) -> Result<()>;

    async fn ensure_dir(&self, loc: &Location, path: &str) -> Result<()>;

    async fn ensure_file(&self, loc: &Location, path: &str) -> Result<()>;

    /// Never fails for an absent path. Failing to reach the backend at all
    /// is still an error.
    async fn exists(&self, loc: &Location, path: &str) -> Result<bool>;

    async fn move_to(
        &self,
        from_loc: &Location,
        from_path: &str,
        to_loc: &Location,
        to_path: &str,
        options: CopyOptions,
    ) -> Result<()>;

    /// Lists immediate children. Children that cannot be stat'd are skipped.
    async fn read_dir(&self, loc: &Location, path: &str) -> Result<DirInfo>;

    async fn read_file(&self, loc: &Location, path: &str) -> Result<FileData>;

    /// A start at or past the end of a non-empty file is
    /// `RangeNotSatisfiable`. Reads running past the end are truncated.
    async fn read_file_chunk(
        &self,
        loc: &Location,
        path: &str,
        options: ChunkOptions,
    ) -> Result<ChunkRead>;

    /// Removes a file or a whole directory tree. Absent paths are not an error.
    async fn remove(&self, loc: &Location, path: &str) -> Result<()>;

    async fn rename(&self, loc: &Location, old_path: &str, new_path: &str) -> Result<()>;

    async fn stat(&self, loc: &Location, path: &str) -> Result<FileInfo>;

    /// Writes the whole file, creating parent directories as needed.
    async fn write_file(&self, loc: &Location, path: &str, data: Bytes) -> Result<()>;

    /// Writes at a position within an existing file.
    async fn write_file_chunk(
        &self,
        loc: &Location,
        path: &str,
        data: Bytes,
        options: ChunkOptions,
    ) -> Result<ChunkWrite>;

    /// Drops any state held for a location that is leaving the registry.
    async fn release(&self, _loc: &Location) {}
}
