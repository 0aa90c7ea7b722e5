//! Error types for the monitor.
//!
//! # Design Decisions
//! - Per-channel probe failures never surface as errors; they become outcomes
//!   at the probe boundary (see `probe`)
//! - Only playlist and channel-list failures are fatal for a run
//! - `FetchError::Exhausted` keeps the last attempt's cause for diagnosis

use std::path::PathBuf;
use thiserror::Error;

use crate::config::loader::ConfigError;

/// Errors from retrieving remote playlists or stream samples.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Transport-level failure (DNS, connect, timeout, body read).
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("HTTP {status} {content_type}")]
    Status { status: u16, content_type: String },

    /// The body was received but is not valid text.
    #[error("decode error: {reason}; status={status}; content-type={content_type}; first_bytes={sample:?}")]
    Decode {
        reason: String,
        status: u16,
        content_type: String,
        sample: Vec<u8>,
    },

    /// Every attempt failed.
    #[error("fetch failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

/// Errors raised while running the external inspection process.
///
/// These never leave the probe module; `probe_once` and `probe_continuous`
/// convert them into outcomes.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("probe i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Failed(String),
}

/// Errors from snapshot and channel persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Top-level error for a monitoring run.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to read playlist {path}: {source}")]
    Playlist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid channel selection {path}: {reason}")]
    Selection { path: PathBuf, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T, E = MonitorError> = std::result::Result<T, E>;
