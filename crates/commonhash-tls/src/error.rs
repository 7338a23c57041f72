//! Error types for the secure channel.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while loading TLS material or running a handshake.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// A PEM file could not be read or parsed.
    #[error("cannot load {what} from {path}: {reason}")]
    Pem {
        what: &'static str,
        path: PathBuf,
        reason: String,
    },

    /// rustls rejected the configuration.
    #[error("TLS configuration error: {0}")]
    Config(String),

    /// The handshake failed (bad certificate, protocol mismatch, reset...).
    #[error("TLS handshake with {peer} failed: {source}")]
    Handshake {
        peer: String,
        #[source]
        source: std::io::Error,
    },

    /// The handshake did not finish in time.
    #[error("TLS handshake with {peer} timed out after {timeout:?}")]
    HandshakeTimeout { peer: String, timeout: Duration },

    /// The name used to verify the server certificate is not a valid DNS
    /// name or IP address.
    #[error("invalid server name: {0}")]
    InvalidServerName(String),

    /// I/O error outside the handshake itself.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChannelError {
    pub(crate) fn handshake(peer: Option<SocketAddr>, source: std::io::Error) -> Self {
        ChannelError::Handshake {
            peer: describe(peer),
            source,
        }
    }

    pub(crate) fn timeout(peer: Option<SocketAddr>, timeout: Duration) -> Self {
        ChannelError::HandshakeTimeout {
            peer: describe(peer),
            timeout,
        }
    }

    /// Whether this error came from the handshake phase.
    pub fn is_handshake(&self) -> bool {
        matches!(
            self,
            ChannelError::Handshake { .. } | ChannelError::HandshakeTimeout { .. }
        )
    }
}

fn describe(peer: Option<SocketAddr>) -> String {
    peer.map(|p| p.to_string())
        .unwrap_or_else(|| "unknown peer".to_string())
}

/// Result type for secure channel operations.
pub type Result<T> = std::result::Result<T, ChannelError>;
