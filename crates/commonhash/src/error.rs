//! Error types for a peer session.

use commonhash_core::ManifestError;
use commonhash_sync::{ClientError, ServerError};
use commonhash_tls::ChannelError;
use thiserror::Error;

/// Errors that end a peer session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The local directory could not be hashed.
    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// TLS material could not be loaded.
    #[error("TLS setup error: {0}")]
    Channel(#[from] ChannelError),

    /// The server role could not start.
    #[error("server error: {0}")]
    Server(#[from] ServerError),

    /// The client role failed.
    #[error("client error: {0}")]
    Client(#[from] ClientError),

    /// A role task panicked or was aborted.
    #[error("task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl SessionError {
    /// Short name of the phase that failed, for diagnostics.
    pub fn phase(&self) -> &'static str {
        match self {
            SessionError::Manifest(_) => "hash",
            SessionError::Channel(_) => "tls",
            SessionError::Server(_) => "listen",
            SessionError::Client(e) => e.phase().as_str(),
            SessionError::Join(_) => "internal",
        }
    }
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
