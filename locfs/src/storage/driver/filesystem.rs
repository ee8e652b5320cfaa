use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};

use crate::domain::file_info::mime_type_of;
use crate::domain::{
    ChunkOptions, ChunkRead, ChunkWrite, CopyOptions, DirInfo, FileData, FileInfo, Location,
    LocationKind,
};
use crate::error::{AppError, Result};
use crate::storage::Adapter;
use crate::storage::paths;

use axum::body::Bytes;
use futures::future::join_all;
use tokio::{
    fs::{self, File, OpenOptions},
    io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
};

/// Serves `FS` locations from the local directory tree under their `root`.
#[derive(Clone, Debug, Default)]
pub struct FilesystemAdapter;

impl FilesystemAdapter {
    pub fn new() -> Self {
        FilesystemAdapter
    }

    fn root<'a>(&self, loc: &'a Location) -> Result<&'a Path> {
        match loc {
            Location::Filesystem(fs_loc) => Ok(&fs_loc.root),
            other => Err(AppError::AdapterMismatch {
                location: other.id().to_string(),
                kind: LocationKind::Filesystem,
            }),
        }
    }

    /// Returns the normalized relative path and its absolute host path.
    fn locate(&self, loc: &Location, path: &str) -> Result<(String, PathBuf)> {
        let root = self.root(loc)?;
        let rel = paths::normalize(path)?;
        let full = paths::resolve(root, &rel);
        Ok((rel, full))
    }

    /// Rejects copying or moving a directory into its own subtree.
    fn check_not_nested(from_rel: &str, from_full: &Path, to_full: &Path) -> Result<()> {
        if to_full.starts_with(from_full) {
            return Err(AppError::InvalidRequest(format!(
                "Cannot copy or move {from_rel} into itself"
            )));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Adapter for FilesystemAdapter {
    fn kind(&self) -> LocationKind {
        LocationKind::Filesystem
    }

    async fn append(&self, loc: &Location, path: &str, data: Bytes) -> Result<()> {
        tracing::trace!("append: {} {}", loc.id(), path);
        let (_, full) = self.locate(loc, path)?;
        create_parent(&full).await?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&full)
            .await?;
        file.write_all(&data).await?;
        file.flush().await?;
        Ok(())
    }

    async fn copy(
        &self,
        from_loc: &Location,
        from_path: &str,
        to_loc: &Location,
        to_path: &str,
        options: CopyOptions,
    ) -> Result<()> {
        tracing::trace!("copy: {} {} -> {} {}", from_loc.id(), from_path, to_loc.id(), to_path);
        let (from_rel, from_full) = self.locate(from_loc, from_path)?;
        let (to_rel, to_full) = self.locate(to_loc, to_path)?;

        let meta = fs::metadata(&from_full).await.map_err(not_found(&from_rel))?;
        if meta.is_dir() {
            Self::check_not_nested(&from_rel, &from_full, &to_full)?;
        }
        if let Ok(existing) = fs::symlink_metadata(&to_full).await {
            if !options.overwrite {
                return Err(AppError::AlreadyExists(to_rel));
            }
            // Copying onto a directory, or a directory onto anything, must not
            // merge with what was there.
            if existing.is_dir() || meta.is_dir() {
                remove_tree(&to_full).await?;
            }
        }

        create_parent(&to_full).await?;
        copy_tree(&from_full, &to_full).await?;
        Ok(())
    }

    async fn empty_dir(&self, loc: &Location, path: &str) -> Result<()> {
        tracing::trace!("emptyDir: {} {}", loc.id(), path);
        let (_, full) = self.locate(loc, path)?;
        match fs::read_dir(&full).await {
            Ok(mut entries) => {
                while let Some(entry) = entries.next_entry().await? {
                    remove_tree(&entry.path()).await?;
                }
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                fs::create_dir_all(&full).await?;
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn ensure_dir(&self, loc: &Location, path: &str) -> Result<()> {
        tracing::trace!("ensureDir: {} {}", loc.id(), path);
        let (rel, full) = self.locate(loc, path)?;
        match fs::metadata(&full).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(AppError::InvalidRequest(format!("Not a directory: {rel}"))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                fs::create_dir_all(&full).await?;
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn ensure_file(&self, loc: &Location, path: &str) -> Result<()> {
        tracing::trace!("ensureFile: {} {}", loc.id(), path);
        let (rel, full) = self.locate(loc, path)?;
        match fs::metadata(&full).await {
            Ok(meta) if meta.is_file() => Ok(()),
            Ok(_) => Err(AppError::InvalidRequest(format!("Not a file: {rel}"))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                create_parent(&full).await?;
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&full)
                    .await?;
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn exists(&self, loc: &Location, path: &str) -> Result<bool> {
        tracing::trace!("exists: {} {}", loc.id(), path);
        let root = self.root(loc)?;
        let Ok(rel) = paths::normalize(path) else {
            return Ok(false);
        };
        Ok(fs::try_exists(paths::resolve(root, &rel))
            .await
            .unwrap_or(false))
    }

    async fn move_to(
        &self,
        from_loc: &Location,
        from_path: &str,
        to_loc: &Location,
        to_path: &str,
        options: CopyOptions,
    ) -> Result<()> {
        tracing::trace!("move: {} {} -> {} {}", from_loc.id(), from_path, to_loc.id(), to_path);
        let (from_rel, from_full) = self.locate(from_loc, from_path)?;
        let (to_rel, to_full) = self.locate(to_loc, to_path)?;

        let meta = fs::metadata(&from_full).await.map_err(not_found(&from_rel))?;
        if meta.is_dir() {
            Self::check_not_nested(&from_rel, &from_full, &to_full)?;
        }
        if let Ok(existing) = fs::symlink_metadata(&to_full).await {
            if !options.overwrite {
                return Err(AppError::AlreadyExists(to_rel));
            }
            // A file replaces a file atomically on rename; anything involving
            // a directory has to be cleared first.
            if existing.is_dir() || meta.is_dir() {
                remove_tree(&to_full).await?;
            }
        }

        create_parent(&to_full).await?;
        match fs::rename(&from_full, &to_full).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::CrossesDevices => {
                copy_tree(&from_full, &to_full).await?;
                remove_tree(&from_full).await?;
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn read_dir(&self, loc: &Location, path: &str) -> Result<DirInfo> {
        tracing::trace!("readDir: {} {}", loc.id(), path);
        let (rel, full) = self.locate(loc, path)?;
        let dir = stat_entry(&rel, &full).await?;

        let mut names = Vec::new();
        let mut entries = fs::read_dir(&full).await.map_err(not_found(&rel))?;
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }

        let stats = join_all(names.iter().map(|name| {
            let child_rel = paths::child(&rel, name);
            let child_full = full.join(name);
            async move {
                match stat_entry(&child_rel, &child_full).await {
                    Ok(info) => Some(info),
                    Err(err) => {
                        tracing::warn!(
                            "Error reading stats for {} in {}: {}",
                            child_rel,
                            loc.id(),
                            err
                        );
                        None
                    }
                }
            }
        }))
        .await;

        let mut files: Vec<FileInfo> = stats.into_iter().flatten().collect();
        files.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(DirInfo { dir, files })
    }

    async fn read_file(&self, loc: &Location, path: &str) -> Result<FileData> {
        tracing::trace!("readFile: {} {}", loc.id(), path);
        let (rel, full) = self.locate(loc, path)?;
        let meta = fs::metadata(&full).await.map_err(not_found(&rel))?;
        let data = fs::read(&full).await.map_err(not_found(&rel))?;
        Ok(FileData {
            file_size: data.len() as u64,
            data: Bytes::from(data),
            mime_type: mime_type_of(&rel),
            last_modified: meta.modified().ok(),
        })
    }

    async fn read_file_chunk(
        &self,
        loc: &Location,
        path: &str,
        options: ChunkOptions,
    ) -> Result<ChunkRead> {
        tracing::trace!("readFileChunk: {} {} {:?}", loc.id(), path, options);
        let (rel, full) = self.locate(loc, path)?;
        require_existing(&rel, &full).await?;

        let file_size = fs::metadata(&full).await.map_err(not_found(&rel))?.len();
        let position = options.position.unwrap_or(0);
        if file_size > 0 && position >= file_size {
            return Err(AppError::RangeNotSatisfiable { file_size });
        }
        let length = options
            .length
            .unwrap_or_else(|| file_size.saturating_sub(position));

        let data = read_at(&full, position, length, file_size).await?;
        let bytes_read = data.len() as u64;
        Ok(ChunkRead {
            data: Bytes::from(data),
            bytes_read,
            chunk_start: position,
            chunk_end: if bytes_read == 0 {
                position
            } else {
                position + bytes_read - 1
            },
            file_size,
            mime_type: mime_type_of(&rel),
        })
    }

    async fn remove(&self, loc: &Location, path: &str) -> Result<()> {
        tracing::trace!("remove: {} {}", loc.id(), path);
        let (rel, full) = self.locate(loc, path)?;
        if rel.is_empty() {
            return Err(AppError::InvalidRequest(format!(
                "Refusing to remove the root of location {}",
                loc.id()
            )));
        }
        remove_tree(&full).await?;
        Ok(())
    }

    async fn rename(&self, loc: &Location, old_path: &str, new_path: &str) -> Result<()> {
        tracing::trace!("rename: {} {} -> {}", loc.id(), old_path, new_path);
        let (old_rel, old_full) = self.locate(loc, old_path)?;
        let (_, new_full) = self.locate(loc, new_path)?;
        require_existing(&old_rel, &old_full).await?;
        create_parent(&new_full).await?;
        fs::rename(&old_full, &new_full).await?;
        Ok(())
    }

    async fn stat(&self, loc: &Location, path: &str) -> Result<FileInfo> {
        tracing::trace!("stat: {} {}", loc.id(), path);
        let (rel, full) = self.locate(loc, path)?;
        stat_entry(&rel, &full).await
    }

    async fn write_file(&self, loc: &Location, path: &str, data: Bytes) -> Result<()> {
        tracing::trace!("writeFile: {} {}", loc.id(), path);
        let (_, full) = self.locate(loc, path)?;
        create_parent(&full).await?;
        fs::write(&full, &data).await?;
        Ok(())
    }

    async fn write_file_chunk(
        &self,
        loc: &Location,
        path: &str,
        data: Bytes,
        options: ChunkOptions,
    ) -> Result<ChunkWrite> {
        tracing::trace!("writeFileChunk: {} {} {:?}", loc.id(), path, options);
        let (rel, full) = self.locate(loc, path)?;
        require_existing(&rel, &full).await?;

        let position = options.position.unwrap_or(0);
        let data = match options.length {
            Some(length) if (length as usize) < data.len() => data.slice(..length as usize),
            _ => data,
        };
        let bytes_written = write_at(&full, position, &data).await?;
        Ok(ChunkWrite { bytes_written })
    }
}

/// Maps a missing path to `PathNotFound`, keeping any other I/O error as is.
fn not_found(rel: &str) -> impl FnOnce(io::Error) -> AppError + '_ {
    move |err| {
        if err.kind() == io::ErrorKind::NotFound {
            AppError::PathNotFound(rel.to_string())
        } else {
            AppError::Io(err)
        }
    }
}

async fn require_existing(rel: &str, full: &Path) -> Result<()> {
    if fs::try_exists(full).await? {
        Ok(())
    } else {
        Err(AppError::PathNotFound(rel.to_string()))
    }
}

async fn stat_entry(rel: &str, full: &Path) -> Result<FileInfo> {
    let meta = fs::metadata(full).await.map_err(not_found(rel))?;
    Ok(FileInfo::from_metadata(rel, &meta))
}

async fn create_parent(full: &Path) -> io::Result<()> {
    if let Some(parent) = full.parent() {
        fs::create_dir_all(parent).await?;
    }
    Ok(())
}

/// Reads up to `length` bytes starting at `position`.
///
/// The handle is owned by this call and closed when it returns, on the
/// error paths included.
async fn read_at(full: &Path, position: u64, length: u64, file_size: u64) -> io::Result<Vec<u8>> {
    let mut file = File::open(full).await?;
    file.seek(SeekFrom::Start(position)).await?;
    let capacity = length.min(file_size.saturating_sub(position));
    let mut buffer = Vec::with_capacity(capacity as usize);
    (&mut file).take(length).read_to_end(&mut buffer).await?;
    Ok(buffer)
}

/// Writes `data` at `position` into an existing file. Same handle scoping as
/// `read_at`; the write is flushed before the handle goes away.
async fn write_at(full: &Path, position: u64, data: &[u8]) -> io::Result<u64> {
    let mut file = OpenOptions::new().read(true).write(true).open(full).await?;
    file.seek(SeekFrom::Start(position)).await?;
    file.write_all(data).await?;
    file.flush().await?;
    Ok(data.len() as u64)
}

async fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
    let mut pending = vec![(from.to_path_buf(), to.to_path_buf())];
    while let Some((src, dst)) = pending.pop() {
        if fs::metadata(&src).await?.is_dir() {
            fs::create_dir_all(&dst).await?;
            let mut entries = fs::read_dir(&src).await?;
            while let Some(entry) = entries.next_entry().await? {
                pending.push((entry.path(), dst.join(entry.file_name())));
            }
        } else {
            fs::copy(&src, &dst).await?;
        }
    }
    Ok(())
}

async fn remove_tree(full: &Path) -> io::Result<()> {
    match fs::symlink_metadata(full).await {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(full).await,
        Ok(_) => fs::remove_file(full).await,
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}
