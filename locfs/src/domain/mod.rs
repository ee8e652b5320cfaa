pub mod envelope;
pub mod file_info;
pub mod location;
pub mod options;

pub use envelope::{
    DirInfoEnvelope, ExistsEnvelope, FileInfoEnvelope, LocationsEnvelope, UpdateResult,
};
pub use file_info::{DirInfo, FileInfo};
pub use location::{FilesystemLocation, Location, LocationKind, PeerLocation};
pub use options::{ChunkOptions, ChunkRead, ChunkWrite, CopyOptions, FileData};
