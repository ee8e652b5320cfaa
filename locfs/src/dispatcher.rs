use std::sync::Arc;

use axum::body::Bytes;
use tokio::sync::RwLock;

use crate::domain::{
    ChunkOptions, ChunkRead, ChunkWrite, CopyOptions, DirInfo, FileData, FileInfo, Location,
};
use crate::error::{AppError, Result};
use crate::storage::Adapter;
use crate::storage::driver::filesystem::FilesystemAdapter;
use crate::storage::driver::peer::PeerAdapter;
use crate::storage::paths;

/// Routes every file operation to the adapter serving the addressed location.
///
/// The location list keeps insertion order and is shared by all requests;
/// only the registry methods take the write lock.
pub struct Dispatcher {
    locations: RwLock<Vec<Location>>,
    adapters: Vec<Arc<dyn Adapter>>,
}

impl Dispatcher {
    pub fn new(locations: Vec<Location>, adapters: Vec<Arc<dyn Adapter>>) -> Self {
        Dispatcher {
            locations: RwLock::new(locations),
            adapters,
        }
    }

    /// A dispatcher with the filesystem and peer adapters registered.
    pub fn with_default_adapters(locations: Vec<Location>) -> Self {
        let adapters: Vec<Arc<dyn Adapter>> = vec![
            Arc::new(FilesystemAdapter::new()),
            Arc::new(PeerAdapter::new()),
        ];
        Self::new(locations, adapters)
    }

    pub async fn locations(&self) -> Vec<Location> {
        self.locations.read().await.clone()
    }

    pub async fn find_location(&self, id: &str) -> Result<Location> {
        self.locations
            .read()
            .await
            .iter()
            .find(|loc| loc.id() == id)
            .cloned()
            .ok_or_else(|| AppError::LocationNotFound(id.to_string()))
    }

    pub fn get_adapter(&self, loc: &Location) -> Result<Arc<dyn Adapter>> {
        self.adapters
            .iter()
            .find(|adapter| adapter.kind() == loc.kind())
            .cloned()
            .ok_or(AppError::AdapterNotFound(loc.kind()))
    }

    pub async fn add_location(&self, loc: Location) -> Result<()> {
        let mut locations = self.locations.write().await;
        if locations.iter().any(|existing| existing.id() == loc.id()) {
            return Err(AppError::LocationExists(loc.id().to_string()));
        }
        tracing::info!("Added location {} ({})", loc.id(), loc.kind());
        locations.push(loc);
        Ok(())
    }

    /// Adds each location in order, stopping at the first duplicate.
    pub async fn add_locations(&self, locs: impl IntoIterator<Item = Location>) -> Result<()> {
        for loc in locs {
            self.add_location(loc).await?;
        }
        Ok(())
    }

    /// Removes the location and lets its adapter drop any state kept for it.
    pub async fn remove_location(&self, id: &str) -> Result<Location> {
        let removed = {
            let mut locations = self.locations.write().await;
            let index = locations
                .iter()
                .position(|loc| loc.id() == id)
                .ok_or_else(|| AppError::LocationNotFound(id.to_string()))?;
            locations.remove(index)
        };
        if let Ok(adapter) = self.get_adapter(&removed) {
            adapter.release(&removed).await;
        }
        tracing::info!("Removed location {}", id);
        Ok(removed)
    }

    async fn resolve(&self, loc_id: &str, path: &str) -> Result<(Location, Arc<dyn Adapter>, String)> {
        let loc = self.find_location(loc_id).await?;
        let adapter = self.get_adapter(&loc)?;
        let path = paths::normalize(path)?;
        Ok((loc, adapter, path))
    }

    /// Resolves both ends of a copy or move. Both must be served by the same
    /// adapter kind, checked before any I/O happens.
    async fn resolve_pair(
        &self,
        from_id: &str,
        from_path: &str,
        to_id: &str,
        to_path: &str,
    ) -> Result<(Location, String, Location, String, Arc<dyn Adapter>)> {
        let from_loc = self.find_location(from_id).await?;
        let to_loc = self.find_location(to_id).await?;
        let from_adapter = self.get_adapter(&from_loc)?;
        let to_adapter = self.get_adapter(&to_loc)?;
        if from_adapter.kind() != to_adapter.kind() {
            return Err(AppError::CrossBackend {
                from: from_adapter.kind(),
                to: to_adapter.kind(),
            });
        }
        let from_path = paths::normalize(from_path)?;
        let to_path = paths::normalize(to_path)?;
        Ok((from_loc, from_path, to_loc, to_path, from_adapter))
    }

    pub async fn append(&self, loc_id: &str, path: &str, data: Bytes) -> Result<()> {
        tracing::debug!("append: {} {} ({} bytes)", loc_id, path, data.len());
        let (loc, adapter, path) = self.resolve(loc_id, path).await?;
        adapter.append(&loc, &path, data).await
    }

    pub async fn copy(
        &self,
        from_id: &str,
        from_path: &str,
        to_id: &str,
        to_path: &str,
        options: CopyOptions,
    ) -> Result<()> {
        tracing::debug!("copy: {} {} -> {} {} {:?}", from_id, from_path, to_id, to_path, options);
        let (from_loc, from_path, to_loc, to_path, adapter) =
            self.resolve_pair(from_id, from_path, to_id, to_path).await?;
        adapter
            .copy(&from_loc, &from_path, &to_loc, &to_path, options)
            .await
    }

    pub async fn empty_dir(&self, loc_id: &str, path: &str) -> Result<()> {
        tracing::debug!("emptyDir: {} {}", loc_id, path);
        let (loc, adapter, path) = self.resolve(loc_id, path).await?;
        adapter.empty_dir(&loc, &path).await
    }

    pub async fn ensure_dir(&self, loc_id: &str, path: &str) -> Result<()> {
        tracing::debug!("ensureDir: {} {}", loc_id, path);
        let (loc, adapter, path) = self.resolve(loc_id, path).await?;
        adapter.ensure_dir(&loc, &path).await
    }

    pub async fn ensure_file(&self, loc_id: &str, path: &str) -> Result<()> {
        tracing::debug!("ensureFile: {} {}", loc_id, path);
        let (loc, adapter, path) = self.resolve(loc_id, path).await?;
        adapter.ensure_file(&loc, &path).await
    }

    pub async fn exists(&self, loc_id: &str, path: &str) -> Result<bool> {
        tracing::debug!("exists: {} {}", loc_id, path);
        let loc = self.find_location(loc_id).await?;
        let adapter = self.get_adapter(&loc)?;
        adapter.exists(&loc, path).await
    }

    pub async fn move_to(
        &self,
        from_id: &str,
        from_path: &str,
        to_id: &str,
        to_path: &str,
        options: CopyOptions,
    ) -> Result<()> {
        tracing::debug!("move: {} {} -> {} {} {:?}", from_id, from_path, to_id, to_path, options);
        let (from_loc, from_path, to_loc, to_path, adapter) =
            self.resolve_pair(from_id, from_path, to_id, to_path).await?;
        adapter
            .move_to(&from_loc, &from_path, &to_loc, &to_path, options)
            .await
    }

    pub async fn read_dir(&self, loc_id: &str, path: &str) -> Result<DirInfo> {
        tracing::debug!("readDir: {} {}", loc_id, path);
        let (loc, adapter, path) = self.resolve(loc_id, path).await?;
        adapter.read_dir(&loc, &path).await
    }

    pub async fn read_file(&self, loc_id: &str, path: &str) -> Result<FileData> {
        tracing::debug!("readFile: {} {}", loc_id, path);
        let (loc, adapter, path) = self.resolve(loc_id, path).await?;
        adapter.read_file(&loc, &path).await
    }

    pub async fn read_file_chunk(
        &self,
        loc_id: &str,
        path: &str,
        options: ChunkOptions,
    ) -> Result<ChunkRead> {
        tracing::debug!("readFileChunk: {} {} {:?}", loc_id, path, options);
        let (loc, adapter, path) = self.resolve(loc_id, path).await?;
        adapter.read_file_chunk(&loc, &path, options).await
    }

    pub async fn remove(&self, loc_id: &str, path: &str) -> Result<()> {
        tracing::debug!("remove: {} {}", loc_id, path);
        let (loc, adapter, path) = self.resolve(loc_id, path).await?;
        adapter.remove(&loc, &path).await
    }

    pub async fn rename(&self, loc_id: &str, old_path: &str, new_path: &str) -> Result<()> {
        tracing::debug!("rename: {} {} -> {}", loc_id, old_path, new_path);
        let (loc, adapter, old_path) = self.resolve(loc_id, old_path).await?;
        let new_path = paths::normalize(new_path)?;
        adapter.rename(&loc, &old_path, &new_path).await
    }

    pub async fn stat(&self, loc_id: &str, path: &str) -> Result<FileInfo> {
        tracing::debug!("stat: {} {}", loc_id, path);
        let (loc, adapter, path) = self.resolve(loc_id, path).await?;
        adapter.stat(&loc, &path).await
    }

    pub async fn write_file(&self, loc_id: &str, path: &str, data: Bytes) -> Result<()> {
        tracing::debug!("writeFile: {} {} ({} bytes)", loc_id, path, data.len());
        let (loc, adapter, path) = self.resolve(loc_id, path).await?;
        adapter.write_file(&loc, &path, data).await
    }

    pub async fn write_file_chunk(
        &self,
        loc_id: &str,
        path: &str,
        data: Bytes,
        options: ChunkOptions,
    ) -> Result<ChunkWrite> {
        tracing::debug!("writeFileChunk: {} {} {:?}", loc_id, path, options);
        let (loc, adapter, path) = self.resolve(loc_id, path).await?;
        adapter
            .write_file_chunk(&loc, &path, data, options)
            .await
    }
}
