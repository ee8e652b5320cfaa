use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Listening host
    #[arg(long, env = "LOCFS_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Listening port
    #[arg(short, long, env = "LOCFS_PORT", default_value_t = 6131)]
    pub port: u16,

    /// Path under which the API is served, `/` for the root
    #[arg(long, env = "LOCFS_ROUTE_PREFIX", default_value = "/api")]
    pub route_prefix: String,

    /// JSON file holding a list of locations
    #[arg(long, env = "LOCFS_LOCATIONS")]
    pub locations: Option<PathBuf>,

    /// Filesystem location, may be repeated
    #[arg(long = "fs", value_name = "ID=PATH", value_parser = parse_fs_location)]
    pub fs: Vec<(String, PathBuf)>,

    /// Largest accepted request body in bytes
    #[arg(long, env = "LOCFS_MAX_BODY_BYTES", default_value_t = 1 << 30)]
    pub max_body_bytes: usize,

    /// Do not send CORS headers
    #[arg(long, env = "LOCFS_NO_CORS")]
    pub no_cors: bool,

    /// Answer PUT, PATCH and DELETE with 405
    #[arg(long, env = "LOCFS_READ_ONLY")]
    pub read_only: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "LOCFS_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

fn parse_fs_location(value: &str) -> Result<(String, PathBuf), String> {
    match value.split_once('=') {
        Some((id, path)) if !id.is_empty() && !path.is_empty() => {
            Ok((id.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected ID=PATH, got `{value}`")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fs_location() {
        assert_eq!(
            parse_fs_location("one=/srv/one").unwrap(),
            ("one".to_string(), PathBuf::from("/srv/one"))
        );
        assert!(parse_fs_location("one").is_err());
        assert!(parse_fs_location("=/srv").is_err());
        assert!(parse_fs_location("one=").is_err());
    }

    #[test]
    fn test_repeated_fs_flags() {
        let args = Args::parse_from(["locfs", "--fs", "a=/a", "--fs", "b=/b", "-p", "7000"]);
        assert_eq!(args.fs.len(), 2);
        assert_eq!(args.port, 7000);
    }
}
