//! Turns a request's verb, boolean query flags and `Range` header into the
//! one operation it asks for. Flags are checked in a fixed priority order and
//! the first one present wins, e.g. `?readDir&stats` lists the directory.

use std::collections::HashMap;

use axum::http::HeaderMap;
use axum::http::header::RANGE;

use crate::domain::{ChunkOptions, CopyOptions};
use crate::error::{AppError, Result};
use crate::service::range::{RangeSpec, parse_range};

type Query = HashMap<String, String>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GetIntent {
    ReadDir,
    Stats,
    Exists,
    ReadChunk(RangeSpec),
    ReadFile,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PutIntent {
    Move { source: Source, options: CopyOptions },
    Copy { source: Source, options: CopyOptions },
    Rename { from_path: String },
    EnsureDir,
    EnsureFile,
    WriteFile,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatchIntent {
    Append,
    WriteChunk(ChunkOptions),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeleteIntent {
    EmptyDir,
    Remove,
}

/// The `<locationId>/<path>` operand of `moveFrom` and `copyFrom`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Source {
    pub location_id: String,
    pub path: String,
}

impl Source {
    fn parse(flag: &str, value: &str) -> Result<Self> {
        let value = value.trim_start_matches('/');
        match value.split_once('/') {
            Some((location_id, path)) if !location_id.is_empty() => Ok(Source {
                location_id: location_id.to_string(),
                path: path.to_string(),
            }),
            _ => Err(AppError::InvalidRequest(format!(
                "{flag} must be <locationId>/<path>, got: {value}"
            ))),
        }
    }
}

fn has(query: &Query, flag: &str) -> bool {
    query.contains_key(flag)
}

fn range_header(headers: &HeaderMap) -> Option<Result<&str>> {
    headers.get(RANGE).map(|value| {
        value
            .to_str()
            .map_err(|_| AppError::RangeInvalid("non-ASCII Range header".to_string()))
    })
}

impl GetIntent {
    pub fn parse(query: &Query, headers: &HeaderMap) -> Result<Self> {
        if has(query, "readDir") {
            return Ok(GetIntent::ReadDir);
        }
        if has(query, "stats") {
            return Ok(GetIntent::Stats);
        }
        if has(query, "exists") {
            return Ok(GetIntent::Exists);
        }
        match range_header(headers) {
            Some(value) => {
                let value = value?;
                let spec = parse_range(value).map_err(|e| e.for_read(value))?;
                Ok(GetIntent::ReadChunk(spec))
            }
            None => Ok(GetIntent::ReadFile),
        }
    }
}

impl PutIntent {
    pub fn parse(query: &Query) -> Result<Self> {
        let options = CopyOptions {
            overwrite: has(query, "overwrite"),
        };
        if let Some(value) = query.get("moveFrom") {
            return Ok(PutIntent::Move {
                source: Source::parse("moveFrom", value)?,
                options,
            });
        }
        if let Some(value) = query.get("copyFrom") {
            return Ok(PutIntent::Copy {
                source: Source::parse("copyFrom", value)?,
                options,
            });
        }
        if let Some(value) = query.get("renameFrom") {
            if value.trim_matches('/').is_empty() {
                return Err(AppError::InvalidRequest(
                    "renameFrom requires the path to rename".to_string(),
                ));
            }
            return Ok(PutIntent::Rename {
                from_path: value.clone(),
            });
        }
        if has(query, "ensureDir") {
            return Ok(PutIntent::EnsureDir);
        }
        if has(query, "ensureFile") {
            return Ok(PutIntent::EnsureFile);
        }
        Ok(PutIntent::WriteFile)
    }
}

impl PatchIntent {
    /// A chunk write needs an explicit start, so suffix ranges are refused.
    pub fn parse(query: &Query, headers: &HeaderMap) -> Result<Self> {
        if has(query, "append") {
            return Ok(PatchIntent::Append);
        }
        let value = range_header(headers).ok_or_else(|| {
            AppError::RangeInvalid("PATCH needs ?append or a Range header".to_string())
        })??;
        let spec = parse_range(value).map_err(|e| e.for_write(value))?;
        spec.explicit_options()
            .map(PatchIntent::WriteChunk)
            .ok_or_else(|| AppError::RangeInvalid(value.to_string()))
    }
}

impl DeleteIntent {
    pub fn parse(query: &Query) -> Self {
        if has(query, "emptyDir") {
            DeleteIntent::EmptyDir
        } else {
            DeleteIntent::Remove
        }
    }
}
