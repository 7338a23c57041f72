//! Error types for the manifest exchange.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use commonhash_core::DigestAlgorithm;
use commonhash_tls::ChannelError;
use thiserror::Error;

use crate::codec::MAX_LINE_LENGTH;

/// Errors produced while encoding or decoding manifest frames.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A line grew past [`MAX_LINE_LENGTH`] without a newline.
    #[error("frame exceeds {} bytes", MAX_LINE_LENGTH)]
    LineTooLong,

    /// A complete line that is not a valid frame.
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// The stream ended in the middle of a frame.
    #[error("stream ended inside a frame ({0} bytes pending)")]
    PartialFrame(usize),

    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tokio_util::codec::LinesCodecError> for CodecError {
    fn from(e: tokio_util::codec::LinesCodecError) -> Self {
        match e {
            tokio_util::codec::LinesCodecError::MaxLineLengthExceeded => CodecError::LineTooLong,
            tokio_util::codec::LinesCodecError::Io(e) => CodecError::Io(e),
        }
    }
}

/// Errors on the listening side.
///
/// Only [`ServerError::Bind`] stops the server; everything else is scoped to
/// one connection.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening socket could not be set up.
    #[error("cannot listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Handshake with one peer failed.
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// Writing the manifest failed.
    #[error("sending manifest failed: {0}")]
    Write(#[from] CodecError),

    /// Writing the manifest took too long.
    #[error("sending manifest timed out after {0:?}")]
    WriteTimeout(Duration),
}

/// The phase of the dialing side a fatal error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Connect,
    Handshake,
    Read,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Connect => "connect",
            Phase::Handshake => "handshake",
            Phase::Read => "read",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fatal errors on the dialing side.
#[derive(Debug, Error)]
pub enum ClientError {
    /// TCP connect failed.
    #[error("connecting to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// TCP connect did not complete in time.
    #[error("connecting to {addr} timed out after {timeout:?}")]
    ConnectTimeout { addr: String, timeout: Duration },

    /// TLS handshake failed; the peer is never trusted on a fallback
    /// channel.
    #[error(transparent)]
    Handshake(ChannelError),

    /// Reading or decoding the stream failed.
    #[error("reading manifest failed: {0}")]
    Read(#[source] CodecError),

    /// The stream stopped before the trailer arrived.
    #[error("manifest truncated: {0}")]
    Truncated(String),

    /// Frames arrived out of order.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The peer speaks a different protocol version.
    #[error("protocol version mismatch: local={local}, peer={peer}")]
    VersionMismatch { local: u32, peer: u32 },

    /// The peer hashed with a different algorithm.
    #[error("digest algorithm mismatch: local={local}, peer={peer}")]
    AlgorithmMismatch {
        local: DigestAlgorithm,
        peer: DigestAlgorithm,
    },

    /// Header, trailer and entries disagree on the entry count.
    #[error("entry count mismatch: announced {announced}, trailer {trailer:?}, received {received}")]
    CountMismatch {
        announced: u64,
        trailer: Option<u64>,
        received: u64,
    },
}

impl ClientError {
    /// Which phase of the dial failed.
    pub fn phase(&self) -> Phase {
        match self {
            ClientError::Connect { .. } | ClientError::ConnectTimeout { .. } => Phase::Connect,
            ClientError::Handshake(_) => Phase::Handshake,
            _ => Phase::Read,
        }
    }
}

impl From<ChannelError> for ClientError {
    fn from(e: ChannelError) -> Self {
        ClientError::Handshake(e)
    }
}
