use std::collections::HashSet;
use std::path::Path;

use crate::domain::Location;
use crate::utils::cli::Args;
use crate::utils::discovery::discover_locations;

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Normalized to `/segment` form, or empty to serve at the root.
    pub route_prefix: String,
    pub locations: Vec<Location>,
    pub max_body_bytes: usize,
    pub cors: bool,
    pub read_only: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: 6131,
            route_prefix: "/api".to_string(),
            locations: Vec::new(),
            max_body_bytes: 1 << 30,
            cors: true,
            read_only: false,
        }
    }
}

/// `api`, `/api/` and `/api` all become `/api`; `/` becomes empty.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Builds the runtime config, collecting every problem instead of stopping
/// at the first one.
pub async fn validate_config(args: &Args) -> Result<Config, Vec<String>> {
    let mut validation_errors = Vec::new();
    let mut locations = Vec::new();

    if let Some(file) = &args.locations {
        match load_locations(file).await {
            Ok(loaded) => locations.extend(loaded),
            Err(e) => validation_errors.push(e),
        }
    }

    for (id, root) in &args.fs {
        match tokio::fs::canonicalize(root).await {
            Ok(root) => locations.push(Location::filesystem(id.as_str(), id.as_str(), root)),
            Err(e) => validation_errors.push(format!(
                "Root `{}` of location `{}` cannot be resolved: {}",
                root.display(),
                id,
                e
            )),
        }
    }

    for loc in &locations {
        if let Location::Filesystem(fs_loc) = loc {
            match tokio::fs::metadata(&fs_loc.root).await {
                Ok(meta) if !meta.is_dir() => validation_errors.push(format!(
                    "Root `{}` of location `{}` exists but is not a directory",
                    fs_loc.root.display(),
                    fs_loc.id
                )),
                Ok(_) => {}
                Err(_) => validation_errors.push(format!(
                    "Root `{}` of location `{}` does not exist",
                    fs_loc.root.display(),
                    fs_loc.id
                )),
            }
        }
    }

    let mut seen = HashSet::new();
    for loc in &locations {
        if !seen.insert(loc.id()) {
            validation_errors.push(format!("Location id `{}` is configured twice", loc.id()));
        }
    }

    if args.max_body_bytes == 0 {
        validation_errors.push("LOCFS_MAX_BODY_BYTES must be greater than 0".to_string());
    }

    if !validation_errors.is_empty() {
        return Err(validation_errors);
    }

    if locations.is_empty() {
        locations = discover_locations();
        tracing::warn!(
            "No locations configured, serving discovered locations: {:?}",
            locations.iter().map(Location::id).collect::<Vec<_>>()
        );
    }

    Ok(Config {
        host: args.host.clone(),
        port: args.port,
        route_prefix: normalize_prefix(&args.route_prefix),
        locations,
        max_body_bytes: args.max_body_bytes,
        cors: !args.no_cors,
        read_only: args.read_only,
    })
}

async fn load_locations(file: &Path) -> Result<Vec<Location>, String> {
    let content = tokio::fs::read_to_string(file)
        .await
        .map_err(|e| format!("LOCFS_LOCATIONS `{}` cannot be read: {}", file.display(), e))?;
    serde_json::from_str(&content)
        .map_err(|e| format!("LOCFS_LOCATIONS `{}` is not a location list: {}", file.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix("/api"), "/api");
        assert_eq!(normalize_prefix("api/"), "/api");
        assert_eq!(normalize_prefix("/files/api/"), "/files/api");
        assert_eq!(normalize_prefix("/"), "");
        assert_eq!(normalize_prefix(""), "");
    }

    #[tokio::test]
    async fn test_validate_collects_all_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("plain.txt");
        std::fs::write(&file, b"x").unwrap();
        let missing = tmp.path().join("missing");

        let args = Args::parse_from([
            "locfs",
            "--fs",
            &format!("one={}", file.display()),
            "--fs",
            &format!("two={}", missing.display()),
        ]);
        let errors = validate_config(&args).await.unwrap_err();
        assert_eq!(errors.len(), 2, "{errors:?}");
    }

    #[tokio::test]
    async fn test_validate_locations_file_and_flags() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("locations.json");
        std::fs::write(
            &file,
            r#"[{"type":"Peer","id":"remote","name":"Remote","origin":"http://127.0.0.1:7000","remoteId":"one"}]"#,
        )
        .unwrap();

        let args = Args::parse_from([
            "locfs",
            "--locations",
            file.to_str().unwrap(),
            "--fs",
            &format!("one={}", tmp.path().display()),
            "--route-prefix",
            "files/",
            "--read-only",
        ]);
        let config = validate_config(&args).await.unwrap();
        let ids: Vec<&str> = config.locations.iter().map(Location::id).collect();
        assert_eq!(ids, vec!["remote", "one"]);
        assert_eq!(config.route_prefix, "/files");
        assert!(config.read_only);
        assert!(config.cors);
    }

    #[tokio::test]
    async fn test_validate_rejects_duplicate_ids() {
        let tmp = tempfile::tempdir().unwrap();
        let root = format!("one={}", tmp.path().display());
        let args = Args::parse_from(["locfs", "--fs", &root, "--fs", &root]);
        let errors = validate_config(&args).await.unwrap_err();
        assert!(errors[0].contains("configured twice"));
    }
}
