// Relative paths arrive from URLs and from peers, so they are normalized
// lexically before they ever touch the host filesystem:
//
//	"dir\\sub/./file.txt"  ->  "dir/sub/file.txt"
//	"/dir//file.txt"       ->  "dir/file.txt"
//	"dir/../file.txt"      ->  "file.txt"
//	"../outside"           ->  error (escapes the location root)
//
// The empty string addresses the location root itself.

use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

/// Normalizes a location-relative path to forward-slash form.
pub fn normalize(path: &str) -> Result<String> {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(AppError::InvalidRequest(format!(
                        "Path escapes the location root: {path}"
                    )));
                }
            }
            segment => parts.push(segment),
        }
    }
    Ok(parts.join("/"))
}

/// Joins a normalized relative path onto a location root.
pub fn resolve(root: &Path, rel_path: &str) -> PathBuf {
    let mut full = root.to_path_buf();
    full.extend(rel_path.split('/').filter(|s| !s.is_empty()));
    full
}

/// Joins a child name onto a normalized relative directory path.
pub fn child(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}
