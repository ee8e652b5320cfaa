use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Route prefix assumed for a peer when its location does not name one.
pub const DEFAULT_PEER_ROUTE_PREFIX: &str = "/api";

/// The backend family a location belongs to.
///
/// Every adapter declares exactly one kind, and the dispatcher pairs a
/// location with the adapter whose kind matches.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LocationKind {
    #[serde(rename = "FS")]
    Filesystem,
    #[serde(rename = "Peer")]
    Peer,
}

impl Display for LocationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LocationKind::Filesystem => write!(f, "FS"),
            LocationKind::Peer => write!(f, "Peer"),
        }
    }
}

/// A named, typed root under which relative paths are resolved.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Location {
    #[serde(rename = "FS")]
    Filesystem(FilesystemLocation),
    #[serde(rename = "Peer")]
    Peer(PeerLocation),
}

/// A directory tree on the local host.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FilesystemLocation {
    pub id: String,
    pub name: String,
    /// Absolute path of the directory every relative path is joined onto.
    pub root: PathBuf,
}

/// A location exposed by another instance of this service.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PeerLocation {
    pub id: String,
    pub name: String,
    /// Base URL of the remote instance, e.g. `http://10.0.0.7:6131`.
    pub origin: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_prefix: Option<String>,
    /// The id of the target location on the remote instance.
    pub remote_id: String,
}

impl Location {
    pub fn id(&self) -> &str {
        match self {
            Location::Filesystem(loc) => &loc.id,
            Location::Peer(loc) => &loc.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Location::Filesystem(loc) => &loc.name,
            Location::Peer(loc) => &loc.name,
        }
    }

    pub fn kind(&self) -> LocationKind {
        match self {
            Location::Filesystem(_) => LocationKind::Filesystem,
            Location::Peer(_) => LocationKind::Peer,
        }
    }

    pub fn filesystem(
        id: impl Into<String>,
        name: impl Into<String>,
        root: impl Into<PathBuf>,
    ) -> Self {
        Location::Filesystem(FilesystemLocation {
            id: id.into(),
            name: name.into(),
            root: root.into(),
        })
    }

    pub fn peer(
        id: impl Into<String>,
        name: impl Into<String>,
        origin: impl Into<String>,
        remote_id: impl Into<String>,
    ) -> Self {
        Location::Peer(PeerLocation {
            id: id.into(),
            name: name.into(),
            origin: origin.into(),
            route_prefix: None,
            remote_id: remote_id.into(),
        })
    }
}

impl PeerLocation {
    /// Returns the API base of the remote instance,
    /// (e.g. `http://10.0.0.7:6131/api`).
    pub fn api_base(&self) -> String {
        let prefix = self
            .route_prefix
            .as_deref()
            .unwrap_or(DEFAULT_PEER_ROUTE_PREFIX)
            .trim_matches('/');
        let origin = self.origin.trim_end_matches('/');
        if prefix.is_empty() {
            origin.to_string()
        } else {
            format!("{origin}/{prefix}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_location_wire_format() {
        let loc = Location::filesystem("one", "Test Location One", "/srv/one");
        let value = serde_json::to_value(&loc).unwrap();
        assert_eq!(
            value,
            json!({ "type": "FS", "id": "one", "name": "Test Location One", "root": "/srv/one" })
        );

        let peer: Location = serde_json::from_value(json!({
            "type": "Peer",
            "id": "remote",
            "name": "Remote",
            "origin": "http://peer:6131",
            "remoteId": "one",
        }))
        .unwrap();
        assert_eq!(peer.kind(), LocationKind::Peer);
        assert_eq!(peer.id(), "remote");
    }

    #[test]
    fn test_peer_api_base() {
        let Location::Peer(mut peer) = Location::peer("p", "P", "http://peer:6131/", "one") else {
            unreachable!()
        };
        assert_eq!(peer.api_base(), "http://peer:6131/api");

        peer.route_prefix = Some("/files/api/".to_string());
        assert_eq!(peer.api_base(), "http://peer:6131/files/api");

        peer.route_prefix = Some(String::new());
        assert_eq!(peer.api_base(), "http://peer:6131");
    }
}
