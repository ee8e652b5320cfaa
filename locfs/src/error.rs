use std::io;
use axum::Json;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum_extra::TypedHeader;
use axum_extra::headers::ContentRange;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::domain::LocationKind;

pub type Result<T> = std::result::Result<T, AppError>;

/// The coarse error classes reported in the error envelope.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidRequest,
    #[serde(rename = "UnderlyingIOError")]
    UnderlyingIo,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::InvalidRequest => "InvalidRequest",
            ErrorKind::UnderlyingIo => "UnderlyingIOError",
        }
    }

    /// Maps an envelope name back to a kind. Names this service does not
    /// produce are treated as I/O failures of the remote end.
    pub fn from_name(name: &str) -> Self {
        match name {
            "NotFound" => ErrorKind::NotFound,
            "InvalidRequest" => ErrorKind::InvalidRequest,
            _ => ErrorKind::UnderlyingIo,
        }
    }
}

/// Body of every error response that is not one of the coded range failures.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: ErrorKind,
    pub message: String,
    pub url: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("No location with ID: {0}")]
    LocationNotFound(String),

    #[error("No adapter registered for location type: {0}")]
    AdapterNotFound(LocationKind),

    #[error("File not found: {0}")]
    PathNotFound(String),

    #[error("Location already exists with ID: {0}")]
    LocationExists(String),

    #[error("Destination already exists: {0}")]
    AlreadyExists(String),

    #[error("Cross-backend operation not supported: {from} -> {to}")]
    CrossBackend {
        from: LocationKind,
        to: LocationKind,
    },

    #[error("Location {location} cannot be served by the {kind} adapter")]
    AdapterMismatch {
        location: String,
        kind: LocationKind,
    },

    #[error("{0}")]
    InvalidRequest(String),

    // Range negotiation failures carry their own status codes.
    #[error("Range header is invalid: {0}")]
    RangeInvalid(String),

    #[error("Multiple ranges are not supported")]
    RangeUnsupported,

    #[error("Range not satisfiable for a file of {file_size} bytes")]
    RangeNotSatisfiable { file_size: u64 },

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(Method),

    /// An error reported by a peer instance, with the kind it reported.
    #[error("{message}")]
    Remote { kind: ErrorKind, message: String },

    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("Peer request failed: {0}")]
    Peer(#[from] reqwest::Error),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::LocationNotFound(_) | Self::AdapterNotFound(_) | Self::PathNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::LocationExists(_)
            | Self::AlreadyExists(_)
            | Self::CrossBackend { .. }
            | Self::AdapterMismatch { .. }
            | Self::InvalidRequest(_)
            | Self::RangeInvalid(_)
            | Self::RangeUnsupported
            | Self::RangeNotSatisfiable { .. }
            | Self::MethodNotAllowed(_) => ErrorKind::InvalidRequest,
            Self::Remote { kind, .. } => *kind,
            Self::Io(_) | Self::Peer(_) => ErrorKind::UnderlyingIo,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Builds the envelope body. The request URL is filled in by the
    /// `error_envelope` middleware.
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.kind(),
            message: self.to_string().replace('\\', "/"),
            url: String::new(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!("Generating response for AppError: {:?}", self);

        match self {
            Self::RangeInvalid(_) => (StatusCode::BAD_REQUEST, self.to_string()).into_response(),
            Self::RangeUnsupported => (
                StatusCode::NOT_IMPLEMENTED,
                "Multiple ranges are not supported, request a single range",
            )
                .into_response(),
            Self::RangeNotSatisfiable { file_size } => (
                StatusCode::RANGE_NOT_SATISFIABLE,
                TypedHeader(ContentRange::unsatisfied_bytes(file_size)),
            )
                .into_response(),
            Self::MethodNotAllowed(_) => {
                (StatusCode::METHOD_NOT_ALLOWED, self.to_string()).into_response()
            }
            _ => {
                let body = self.to_body();
                let mut response =
                    (StatusCode::INTERNAL_SERVER_ERROR, Json(body.clone())).into_response();
                response.extensions_mut().insert(body);
                response
            }
        }
    }
}
