//! Error types for vintel-core

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the vintel-core library
///
/// Only genuine I/O and setup problems become an `Error`. Malformed, stale or
/// unwatched chat lines are dropped by the parsers and never surface here.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Location catalog could not be built
    #[error("catalog error: {0}")]
    Catalog(String),

    /// Chat log is not valid UTF-16LE
    #[error("failed to decode {}: {message}", path.display())]
    Decode { path: PathBuf, message: String },

    /// Local-channel log without the listener / session header
    #[error("no listener or session start found in local log {}", .0.display())]
    LocalHeader(PathBuf),
}

/// Result type alias for vintel-core
pub type Result<T> = std::result::Result<T, Error>;
