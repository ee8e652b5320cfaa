use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::Metadata;
use std::io;
use std::time::SystemTime;

/// Normalized metadata for one entry within a location.
///
/// All paths are relative to the location root and use forward slashes,
/// whatever the host convention is.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    /// Directory path within the location plus the full filename.
    pub fullpath: String,
    /// Directory path within the location, without the filename.
    pub dirpath: String,
    /// Filename with extension.
    pub filename: String,
    /// Filename without the extension.
    pub basename: String,
    /// Extension including the leading `.`, or empty.
    pub ext: String,
    /// Empty for directories and unknown extensions.
    pub mime_type: String,
    pub is_dir: bool,
    /// Size in bytes, 0 for directories.
    pub size: u64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub modified: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub changed: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub accessed: DateTime<Utc>,
}

/// A directory and its immediate children.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DirInfo {
    pub dir: FileInfo,
    pub files: Vec<FileInfo>,
}

impl FileInfo {
    /// Builds the info for `rel_path` (already normalized) from host metadata.
    pub fn from_metadata(rel_path: &str, meta: &Metadata) -> Self {
        let (dirpath, filename) = match rel_path.rsplit_once('/') {
            Some((dir, file)) => (dir.to_string(), file.to_string()),
            None => (String::new(), rel_path.to_string()),
        };
        let (basename, ext) = split_extension(&filename);
        let is_dir = meta.is_dir();
        let mime_type = if is_dir {
            String::new()
        } else {
            mime_type_of(&filename)
        };

        FileInfo {
            fullpath: rel_path.to_string(),
            dirpath,
            basename: basename.to_string(),
            ext: ext.to_string(),
            filename,
            mime_type,
            is_dir,
            size: if is_dir { 0 } else { meta.len() },
            created: timestamp(meta.created()),
            modified: timestamp(meta.modified()),
            changed: changed_time(meta),
            accessed: timestamp(meta.accessed()),
        }
    }
}

/// Guesses a mime type from a file name, empty when the extension is unknown.
pub fn mime_type_of(path: &str) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or_default()
        .to_string()
}

// A leading dot marks a hidden file, not an extension.
fn split_extension(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(idx) if idx > 0 => filename.split_at(idx),
        _ => (filename, ""),
    }
}

fn timestamp(time: io::Result<SystemTime>) -> DateTime<Utc> {
    time.map(DateTime::<Utc>::from)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

#[cfg(unix)]
fn changed_time(meta: &Metadata) -> DateTime<Utc> {
    use std::os::unix::fs::MetadataExt;
    DateTime::from_timestamp(meta.ctime(), meta.ctime_nsec() as u32)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

#[cfg(not(unix))]
fn changed_time(meta: &Metadata) -> DateTime<Utc> {
    timestamp(meta.modified())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("file.txt"), ("file", ".txt"));
        assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(split_extension(".bashrc"), (".bashrc", ""));
        assert_eq!(split_extension("Makefile"), ("Makefile", ""));
    }

    #[test]
    fn test_mime_type_of() {
        assert_eq!(mime_type_of("notes.txt"), "text/plain");
        assert_eq!(mime_type_of("dir/image.png"), "image/png");
        assert_eq!(mime_type_of("no-extension"), "");
    }

    #[test]
    fn test_from_metadata_paths() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("docs")).unwrap();
        std::fs::write(tmp.path().join("docs/readme.md"), b"hello").unwrap();

        let meta = std::fs::metadata(tmp.path().join("docs/readme.md")).unwrap();
        let info = FileInfo::from_metadata("docs/readme.md", &meta);
        assert_eq!(info.fullpath, "docs/readme.md");
        assert_eq!(info.dirpath, "docs");
        assert_eq!(info.filename, "readme.md");
        assert_eq!(info.basename, "readme");
        assert_eq!(info.ext, ".md");
        assert_eq!(info.size, 5);
        assert!(!info.is_dir);
        assert!(info.modified.timestamp_millis() > 0);

        let meta = std::fs::metadata(tmp.path().join("docs")).unwrap();
        let info = FileInfo::from_metadata("docs", &meta);
        assert_eq!(info.dirpath, "");
        assert!(info.is_dir);
        assert_eq!(info.size, 0);
        assert_eq!(info.mime_type, "");
    }
}
