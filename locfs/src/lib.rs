//! Location-transparent file access over HTTP.
//!
//! Files live in [`Location`](domain::Location)s, each served by the
//! [`Adapter`](storage::Adapter) of its kind: a local directory tree or a
//! remote peer running this same service. The [`Dispatcher`](dispatcher::Dispatcher)
//! routes every operation, and [`api::create_router`] exposes it with byte
//! range support.

pub mod api;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod error;
pub mod service;
pub mod storage;
pub mod utils;
