//! Manifest Server Role.
//!
//! Listens for peers and, for each accepted connection, completes the TLS
//! handshake, streams the local manifest and closes the channel.
//!
//! ```text
//! LISTENING -> HANDSHAKING -> SENDING -> LISTENING
//!                   |            |
//!                   +-- warn ----+--> LISTENING
//! ```
//!
//! Connections are served one at a time. A failed handshake or write is
//! logged and the loop goes back to accepting; only cancellation (or the
//! optional session limit) ends it. Cancellation interrupts accepting and
//! handshaking, never a manifest write already under way.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use commonhash_core::Manifest;
use commonhash_tls::{ChannelAcceptor, SecureStream};
use futures::SinkExt;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpSocket};
use tokio_util::codec::FramedWrite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::codec::{ManifestCodec, ManifestFrame};
use crate::error::{CodecError, ServerError};

/// Configuration for the listening side.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind. Port 0 picks a free port.
    pub listen_addr: SocketAddr,
    /// Listen backlog.
    pub backlog: u32,
    /// Stop after this many successfully served sessions.
    pub max_sessions: Option<usize>,
    /// Upper bound on writing one manifest.
    pub write_timeout: Duration,
}

impl ServerConfig {
    /// Listen on every interface at `port`.
    pub fn on_port(port: u16) -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], port)),
            ..Self::default()
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 0)),
            backlog: 5,
            max_sessions: None,
            write_timeout: Duration::from_secs(30),
        }
    }
}

/// Outcome of a server run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServeReport {
    /// Sessions whose manifest was written completely.
    pub sessions_served: usize,
    /// Connections dropped during the handshake.
    pub handshake_failures: usize,
    /// Connections dropped while writing the manifest.
    pub write_failures: usize,
}

/// A bound manifest server.
pub struct ManifestServer {
    listener: TcpListener,
    manifest: Arc<Manifest>,
    acceptor: ChannelAcceptor,
    config: ServerConfig,
}

impl ManifestServer {
    /// Bind the listening socket. When this returns, peers can connect.
    pub async fn bind(
        config: ServerConfig,
        manifest: Arc<Manifest>,
        acceptor: ChannelAcceptor,
    ) -> Result<Self, ServerError> {
        let addr = config.listen_addr;
        let bind_error = |source| ServerError::Bind { addr, source };

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(bind_error)?;
        socket.set_reuseaddr(true).map_err(bind_error)?;
        socket.bind(addr).map_err(bind_error)?;
        let listener = socket.listen(config.backlog).map_err(bind_error)?;
        let local = listener.local_addr().map_err(bind_error)?;

        info!(addr = %local, entries = manifest.len(), "server listening");

        Ok(Self {
            listener,
            manifest,
            acceptor,
            config,
        })
    }

    /// The address actually bound.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept and serve peers until `shutdown` is cancelled or the session
    /// limit is reached. The listener is closed when this returns.
    pub async fn serve(self, shutdown: CancellationToken) -> ServeReport {
        let mut report = ServeReport::default();

        loop {
            if let Some(max) = self.config.max_sessions {
                if report.sessions_served >= max {
                    info!(sessions = report.sessions_served, "session limit reached");
                    break;
                }
            }

            let accepted = tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = self.listener.accept() => accepted,
            };

            let (tcp, peer) = match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    continue;
                }
            };
            info!(%peer, "peer connected");

            let channel = tokio::select! {
                _ = shutdown.cancelled() => break,
                channel = self.acceptor.accept(tcp) => channel,
            };
            let channel = match channel {
                Ok(channel) => channel,
                Err(e) => {
                    report.handshake_failures += 1;
                    warn!(%peer, error = %e, "handshake failed, waiting for next peer");
                    continue;
                }
            };

            // An in-flight write finishes even if shutdown was requested; it
            // is bounded by the write timeout.
            let sent = send_manifest(channel, &self.manifest, self.config.write_timeout).await;
            match sent {
                Ok(count) => {
                    report.sessions_served += 1;
                    info!(%peer, entries = count, "manifest sent");
                }
                Err(e) => {
                    report.write_failures += 1;
                    warn!(%peer, error = %e, "sending manifest failed");
                }
            }
        }

        info!(
            served = report.sessions_served,
            handshake_failures = report.handshake_failures,
            write_failures = report.write_failures,
            "server stopped"
        );
        report
    }
}

/// Write `manifest` onto `stream` as header, entries and trailer, then shut
/// the stream down. Returns the number of entries written.
///
/// The stream is consumed, so it is closed exactly once whether or not the
/// write succeeds.
pub async fn send_manifest<S: SecureStream>(
    stream: S,
    manifest: &Manifest,
    timeout: Duration,
) -> Result<usize, ServerError> {
    let mut framed = FramedWrite::new(stream, ManifestCodec::new());

    let written = tokio::time::timeout(timeout, async {
        let count = manifest.len() as u64;
        framed
            .feed(ManifestFrame::header(manifest.algorithm(), count))
            .await?;
        for digest in manifest.digests() {
            framed.feed(ManifestFrame::Entry(digest)).await?;
        }
        framed.feed(ManifestFrame::End { count }).await?;
        framed.flush().await?;
        framed
            .get_mut()
            .shutdown()
            .await
            .map_err(CodecError::from)?;
        Ok::<_, ServerError>(manifest.len())
    })
    .await;

    match written {
        Ok(result) => result,
        Err(_) => {
            debug!("write timed out, dropping channel");
            Err(ServerError::WriteTimeout(timeout))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonhash_core::{Digest, DigestAlgorithm, FileDigest};
    use tokio::io::AsyncReadExt;

    fn manifest() -> Manifest {
        Manifest::from_entries(
            DigestAlgorithm::Sha3_512,
            vec![
                FileDigest::new("x", Digest::compute(DigestAlgorithm::Sha3_512, b"hello")),
                FileDigest::new("y", Digest::compute(DigestAlgorithm::Sha3_512, b"world")),
            ],
        )
    }

    #[tokio::test]
    async fn test_send_manifest_wire_format() {
        let manifest = manifest();
        let (writer, mut reader) = tokio::io::duplex(64);

        let send = tokio::spawn(async move {
            send_manifest(writer, &manifest, Duration::from_secs(5)).await
        });

        let mut text = String::new();
        reader.read_to_string(&mut text).await.unwrap();
        assert_eq!(send.await.unwrap().unwrap(), 2);

        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "MANIFEST 1 sha3-512 2");
        assert_eq!(
            lines[1],
            Digest::compute(DigestAlgorithm::Sha3_512, b"hello").to_hex()
        );
        assert_eq!(lines[3], "END 2");
        assert!(text.ends_with('\n'));
    }

    #[tokio::test]
    async fn test_send_empty_manifest() {
        let manifest = Manifest::empty(DigestAlgorithm::Sha3_512);
        let (writer, mut reader) = tokio::io::duplex(64);

        send_manifest(writer, &manifest, Duration::from_secs(5))
            .await
            .unwrap();

        let mut text = String::new();
        reader.read_to_string(&mut text).await.unwrap();
        assert_eq!(text, "MANIFEST 1 sha3-512 0\nEND 0\n");
    }

    #[tokio::test]
    async fn test_send_times_out_when_peer_stalls() {
        let manifest = manifest();
        // Buffer too small for the manifest and nobody reads.
        let (writer, _reader) = tokio::io::duplex(16);

        let err = send_manifest(writer, &manifest, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::WriteTimeout(_)));
    }

    #[test]
    fn test_config_on_port() {
        let config = ServerConfig::on_port(4000);
        assert_eq!(config.listen_addr.port(), 4000);
        assert_eq!(config.backlog, 5);
        assert!(config.max_sessions.is_none());
    }
}
