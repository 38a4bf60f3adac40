//! Error types shared by every icon backend.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while locating or decoding an application icon.
#[derive(Error, Debug)]
pub enum IconError {
    /// The pid does not belong to a live process.
    #[error("no process with pid {pid}")]
    ProcessNotFound { pid: u32 },

    /// The caller is not allowed to query the process.
    #[error("access denied while querying pid {pid}")]
    AccessDenied { pid: u32 },

    /// The executable or module could not be mapped.
    #[error("failed to load '{}': {reason}", path.display())]
    LoadError { path: PathBuf, reason: String },

    /// The target carries no icon.
    #[error("target has no icon resource")]
    NoIconResource,

    /// A resource lookup, size, load or lock step failed.
    #[error("failed to read resource: {0}")]
    ResourceReadError(String),

    /// Offsets or counts inside a container disagree with its size.
    #[error("malformed icon container: {0}")]
    MalformedContainer(String),

    /// The byte signature matches no supported format.
    #[error("unsupported image format")]
    UnsupportedFormat,

    /// Every candidate file was tried without success.
    #[error("no icon found for '{}'", path.display())]
    IconNotFound { path: PathBuf },

    /// The underlying format decoder rejected the bytes.
    #[error("failed to decode icon: {0}")]
    DecodeError(#[from] image::ImageError),
}

/// Result type for icon operations.
pub type Result<T> = std::result::Result<T, IconError>;
