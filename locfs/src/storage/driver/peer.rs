use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use tokio::sync::RwLock;

use crate::client::PeerClient;
use crate::domain::{
    ChunkOptions, ChunkRead, ChunkWrite, CopyOptions, DirInfo, FileData, FileInfo, Location,
    LocationKind, PeerLocation,
};
use crate::error::{AppError, Result};
use crate::storage::Adapter;

/// Serves `Peer` locations by forwarding every call to the remote instance
/// that owns the location, addressed by its `remoteId`.
#[derive(Default)]
pub struct PeerAdapter {
    http: reqwest::Client,
    /// One client per local location id, created on first use.
    clients: RwLock<HashMap<String, Arc<PeerClient>>>,
}

impl PeerAdapter {
    pub fn new() -> Self {
        PeerAdapter::default()
    }

    fn peer<'a>(&self, loc: &'a Location) -> Result<&'a PeerLocation> {
        match loc {
            Location::Peer(peer) => Ok(peer),
            other => Err(AppError::AdapterMismatch {
                location: other.id().to_string(),
                kind: LocationKind::Peer,
            }),
        }
    }

    async fn client_for<'a>(
        &self,
        loc: &'a Location,
    ) -> Result<(Arc<PeerClient>, &'a PeerLocation)> {
        let peer = self.peer(loc)?;
        if let Some(client) = self.clients.read().await.get(&peer.id) {
            return Ok((client.clone(), peer));
        }

        let mut clients = self.clients.write().await;
        if let Some(client) = clients.get(&peer.id) {
            return Ok((client.clone(), peer));
        }
        let client = Arc::new(PeerClient::with_client(self.http.clone(), &peer.api_base())?);
        tracing::info!("Created peer client for {} at {}", peer.id, client.api_base());
        clients.insert(peer.id.clone(), client.clone());
        Ok((client, peer))
    }

    /// Both ends of a copy or move must live on the same remote instance,
    /// which then performs the transfer itself.
    async fn transfer_pair<'a>(
        &self,
        from_loc: &'a Location,
        to_loc: &'a Location,
    ) -> Result<(Arc<PeerClient>, &'a PeerLocation, &'a PeerLocation)> {
        let (client, from) = self.client_for(from_loc).await?;
        let to = self.peer(to_loc)?;
        if from.api_base() != to.api_base() {
            return Err(AppError::InvalidRequest(format!(
                "Peer locations {} and {} are on different instances",
                from.id, to.id
            )));
        }
        Ok((client, from, to))
    }
}

#[async_trait::async_trait]
impl Adapter for PeerAdapter {
    fn kind(&self) -> LocationKind {
        LocationKind::Peer
    }

    async fn append(&self, loc: &Location, path: &str, data: Bytes) -> Result<()> {
        tracing::trace!("append: {} {}", loc.id(), path);
        let (client, peer) = self.client_for(loc).await?;
        client.append(&peer.remote_id, path, data, None).await
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
        let (client, from, to) = self.transfer_pair(from_loc, to_loc).await?;
        client
            .copy(&from.remote_id, from_path, &to.remote_id, to_path, options)
            .await
    }

    async fn empty_dir(&self, loc: &Location, path: &str) -> Result<()> {
        tracing::trace!("emptyDir: {} {}", loc.id(), path);
        let (client, peer) = self.client_for(loc).await?;
        client.empty_dir(&peer.remote_id, path).await
    }

    async fn ensure_dir(&self, loc: &Location, path: &str) -> Result<()> {
        tracing::trace!("ensureDir: {} {}", loc.id(), path);
        let (client, peer) = self.client_for(loc).await?;
        client.ensure_dir(&peer.remote_id, path).await
    }

    async fn ensure_file(&self, loc: &Location, path: &str) -> Result<()> {
        tracing::trace!("ensureFile: {} {}", loc.id(), path);
        let (client, peer) = self.client_for(loc).await?;
        client.ensure_file(&peer.remote_id, path).await
    }

    async fn exists(&self, loc: &Location, path: &str) -> Result<bool> {
        tracing::trace!("exists: {} {}", loc.id(), path);
        let (client, peer) = self.client_for(loc).await?;
        client.exists(&peer.remote_id, path).await
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
        let (client, from, to) = self.transfer_pair(from_loc, to_loc).await?;
        client
            .move_to(&from.remote_id, from_path, &to.remote_id, to_path, options)
            .await
    }

    async fn read_dir(&self, loc: &Location, path: &str) -> Result<DirInfo> {
        tracing::trace!("readDir: {} {}", loc.id(), path);
        let (client, peer) = self.client_for(loc).await?;
        client.read_dir(&peer.remote_id, path).await
    }

    async fn read_file(&self, loc: &Location, path: &str) -> Result<FileData> {
        tracing::trace!("readFile: {} {}", loc.id(), path);
        let (client, peer) = self.client_for(loc).await?;
        client.read_file(&peer.remote_id, path).await
    }

    async fn read_file_chunk(
        &self,
        loc: &Location,
        path: &str,
        options: ChunkOptions,
    ) -> Result<ChunkRead> {
        tracing::trace!("readFileChunk: {} {} {:?}", loc.id(), path, options);
        let (client, peer) = self.client_for(loc).await?;
        client.read_file_chunk(&peer.remote_id, path, options).await
    }

    async fn remove(&self, loc: &Location, path: &str) -> Result<()> {
        tracing::trace!("remove: {} {}", loc.id(), path);
        let (client, peer) = self.client_for(loc).await?;
        client.remove(&peer.remote_id, path).await
    }

    async fn rename(&self, loc: &Location, old_path: &str, new_path: &str) -> Result<()> {
        tracing::trace!("rename: {} {} -> {}", loc.id(), old_path, new_path);
        let (client, peer) = self.client_for(loc).await?;
        client.rename(&peer.remote_id, old_path, new_path).await
    }

    async fn stat(&self, loc: &Location, path: &str) -> Result<FileInfo> {
        tracing::trace!("stat: {} {}", loc.id(), path);
        let (client, peer) = self.client_for(loc).await?;
        client.stats(&peer.remote_id, path).await
    }

    async fn write_file(&self, loc: &Location, path: &str, data: Bytes) -> Result<()> {
        tracing::trace!("writeFile: {} {}", loc.id(), path);
        let (client, peer) = self.client_for(loc).await?;
        client.write_file(&peer.remote_id, path, data, None).await
    }

    async fn write_file_chunk(
        &self,
        loc: &Location,
        path: &str,
        data: Bytes,
        options: ChunkOptions,
    ) -> Result<ChunkWrite> {
        tracing::trace!("writeFileChunk: {} {} {:?}", loc.id(), path, options);
        let (client, peer) = self.client_for(loc).await?;
        client
            .write_file_chunk(&peer.remote_id, path, data, options, None)
            .await
    }

    async fn release(&self, loc: &Location) {
        if self.clients.write().await.remove(loc.id()).is_some() {
            tracing::debug!("Dropped peer client for {}", loc.id());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clients_are_cached_and_released() {
        let adapter = PeerAdapter::new();
        let loc = Location::peer("remote", "Remote", "http://127.0.0.1:6131", "one");

        let (first, peer) = adapter.client_for(&loc).await.unwrap();
        let (second, _) = adapter.client_for(&loc).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(peer.remote_id, "one");
        assert_eq!(first.api_base().as_str(), "http://127.0.0.1:6131/api");

        adapter.release(&loc).await;
        assert!(adapter.clients.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_transfer_needs_one_instance() {
        let adapter = PeerAdapter::new();
        let a = Location::peer("a", "A", "http://127.0.0.1:1", "one");
        let b = Location::peer("b", "B", "http://127.0.0.1:2", "one");

        let err = adapter
            .copy(&a, "x.txt", &b, "y.txt", CopyOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn test_rejects_filesystem_location() {
        let adapter = PeerAdapter::new();
        let loc = Location::filesystem("one", "One", "/tmp");
        let err = adapter.exists(&loc, "x").await.unwrap_err();
        assert!(matches!(err, AppError::AdapterMismatch { .. }));
    }
}
