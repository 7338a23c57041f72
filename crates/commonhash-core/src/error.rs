//! Error types for commonhash core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while building a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The directory itself could not be listed.
    #[error("cannot read directory {path}: {source}")]
    UnreadableDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file inside the directory could not be read.
    #[error("cannot read file {path}: {source}")]
    UnreadableFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configured read block size was zero.
    #[error("block size must be greater than zero")]
    ZeroBlockSize,
}

/// Digest text that could not be parsed.
#[derive(Debug, Error, PartialEq)]
pub enum ParseDigestError {
    #[error("invalid digest hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("unknown digest algorithm: {0}")]
    UnknownAlgorithm(String),
}

/// Result type for manifest operations.
pub type Result<T> = std::result::Result<T, ManifestError>;
