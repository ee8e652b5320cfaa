use std::sync::LazyLock;

use regex::Regex;

use crate::domain::ChunkOptions;
use crate::error::AppError;

static BYTES_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^bytes=(\d*)-(\d*)$").expect("valid range regex"));

/// A single parsed `Range: bytes=...` value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangeSpec {
    /// `bytes=<start>-<end>`, `end` inclusive; open ended when absent.
    FromTo { start: u64, end: Option<u64> },
    /// `bytes=-<n>`, the last `n` bytes of the file.
    Suffix(u64),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangeError {
    /// More than one range was requested.
    Multiple,
    Invalid,
}

impl RangeError {
    /// Reading answers multiple ranges with 501, anything else with 400.
    pub fn for_read(self, value: &str) -> AppError {
        match self {
            RangeError::Multiple => AppError::RangeUnsupported,
            RangeError::Invalid => AppError::RangeInvalid(value.to_string()),
        }
    }

    pub fn for_write(self, value: &str) -> AppError {
        AppError::RangeInvalid(value.to_string())
    }
}

pub fn parse_range(value: &str) -> Result<RangeSpec, RangeError> {
    let value = value.trim();
    if value.contains(',') {
        return Err(RangeError::Multiple);
    }
    let caps = BYTES_RANGE.captures(value).ok_or(RangeError::Invalid)?;
    let number = |idx: usize| -> Result<Option<u64>, RangeError> {
        match caps.get(idx).map(|m| m.as_str()) {
            None | Some("") => Ok(None),
            Some(digits) => digits.parse().map(Some).map_err(|_| RangeError::Invalid),
        }
    };

    match (number(1)?, number(2)?) {
        (Some(start), Some(end)) if start > end => Err(RangeError::Invalid),
        (Some(start), end) => Ok(RangeSpec::FromTo { start, end }),
        (None, Some(0)) | (None, None) => Err(RangeError::Invalid),
        (None, Some(suffix)) => Ok(RangeSpec::Suffix(suffix)),
    }
}

impl RangeSpec {
    /// Chunk options for a range whose start is known without the file size.
    pub fn explicit_options(self) -> Option<ChunkOptions> {
        match self {
            RangeSpec::FromTo { start, end } => Some(ChunkOptions {
                position: Some(start),
                length: end.map(|end| end - start + 1),
            }),
            RangeSpec::Suffix(_) => None,
        }
    }

    /// Chunk options once the file size is known.
    pub fn to_options(self, file_size: u64) -> ChunkOptions {
        match self {
            RangeSpec::Suffix(suffix) => {
                let length = suffix.min(file_size);
                ChunkOptions::new(file_size - length, Some(length))
            }
            from_to => from_to.explicit_options().unwrap_or_default(),
        }
    }
}
