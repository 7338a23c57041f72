//! Manifest Client Role.
//!
//! Dials the peer, completes the TLS handshake as the verifying side, reads
//! the peer's manifest to the trailer and intersects it with the local one.

use std::sync::Arc;
use std::time::Duration;

use commonhash_core::{intersect, Digest, DigestAlgorithm, Intersection, Manifest};
use commonhash_tls::{ChannelConnector, SecureStream};
use futures::StreamExt;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_util::codec::FramedRead;
use tracing::{debug, info, warn};

use crate::codec::{ManifestCodec, ManifestFrame, PROTOCOL_VERSION};
use crate::error::{ClientError, CodecError};

/// What to do when the stream stops before the `END` trailer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EndOfManifest {
    /// A missing trailer is a fatal truncation.
    #[default]
    RequireTrailer,
    /// Accept whatever arrived, with a warning.
    Lenient,
}

/// Configuration for the dialing side.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub remote_host: String,
    pub remote_port: u16,
    /// Name checked against the server certificate. Defaults to
    /// `remote_host`.
    pub server_name: Option<String>,
    pub connect_timeout: Duration,
    /// Upper bound on the wait for each frame.
    pub read_timeout: Duration,
    pub end_of_manifest: EndOfManifest,
}

impl ClientConfig {
    pub fn new(remote_host: impl Into<String>, remote_port: u16) -> Self {
        Self {
            remote_host: remote_host.into(),
            remote_port,
            server_name: None,
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(5),
            end_of_manifest: EndOfManifest::default(),
        }
    }

    /// `host:port`, with brackets around IPv6 literals.
    pub fn peer_addr(&self) -> String {
        if self.remote_host.contains(':') {
            format!("[{}]:{}", self.remote_host, self.remote_port)
        } else {
            format!("{}:{}", self.remote_host, self.remote_port)
        }
    }

    pub fn server_name(&self) -> &str {
        self.server_name.as_deref().unwrap_or(&self.remote_host)
    }
}

/// Digests read from a peer, in the order they were sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedManifest {
    pub algorithm: DigestAlgorithm,
    pub digests: Vec<Digest>,
    /// False when the trailer never arrived and the read was lenient.
    pub complete: bool,
}

impl ReceivedManifest {
    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }
}

/// Outcome of one client run.
#[derive(Debug, Clone, Serialize)]
pub struct ClientReport {
    pub peer: String,
    /// Number of digests received.
    pub received: usize,
    pub complete: bool,
    pub intersection: Intersection,
}

/// Dials one peer and compares its manifest with ours.
pub struct ManifestClient {
    config: ClientConfig,
    manifest: Arc<Manifest>,
    connector: ChannelConnector,
}

impl ManifestClient {
    pub fn new(config: ClientConfig, manifest: Arc<Manifest>, connector: ChannelConnector) -> Self {
        Self {
            config,
            manifest,
            connector,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Connect, handshake and read the peer's manifest.
    pub async fn fetch(&self) -> Result<ReceivedManifest, ClientError> {
        let addr = self.config.peer_addr();
        let host = self.config.remote_host.as_str();
        info!(peer = %addr, "connecting");

        let connect = TcpStream::connect((host, self.config.remote_port));
        let tcp = match tokio::time::timeout(self.config.connect_timeout, connect).await {
            Ok(Ok(tcp)) => tcp,
            Ok(Err(source)) => return Err(ClientError::Connect { addr, source }),
            Err(_) => {
                return Err(ClientError::ConnectTimeout {
                    addr,
                    timeout: self.config.connect_timeout,
                })
            }
        };

        let channel = self
            .connector
            .connect(self.config.server_name(), tcp)
            .await?;
        info!(peer = %addr, server_name = self.config.server_name(), "secure channel established");

        let received = receive_manifest(
            channel,
            self.manifest.algorithm(),
            self.config.read_timeout,
            self.config.end_of_manifest,
        )
        .await?;
        info!(
            peer = %addr,
            entries = received.len(),
            complete = received.complete,
            "manifest received"
        );
        Ok(received)
    }

    /// Intersect a received manifest with the local one, logging each match.
    pub fn compare(&self, received: &ReceivedManifest) -> Intersection {
        let intersection = intersect(&self.manifest, received.digests.iter().copied());
        for m in &intersection.matches {
            info!(
                digest = %m.digest.to_hex(),
                files = ?m.local_identifiers,
                "common file"
            );
        }
        info!(count = intersection.count, "comparison complete");
        intersection
    }

    /// [`fetch`](Self::fetch) then [`compare`](Self::compare).
    pub async fn run(&self) -> Result<ClientReport, ClientError> {
        let received = self.fetch().await?;
        let intersection = self.compare(&received);
        Ok(ClientReport {
            peer: self.config.peer_addr(),
            received: received.len(),
            complete: received.complete,
            intersection,
        })
    }
}

/// Read one manifest from `stream` and shut the stream down.
///
/// The header must match [`PROTOCOL_VERSION`] and `local_algorithm`; header,
/// entry count and trailer must agree. Each frame must arrive within
/// `read_timeout`.
pub async fn receive_manifest<S: SecureStream>(
    stream: S,
    local_algorithm: DigestAlgorithm,
    read_timeout: Duration,
    end_of_manifest: EndOfManifest,
) -> Result<ReceivedManifest, ClientError> {
    let mut framed = FramedRead::new(stream, ManifestCodec::new());
    let result = read_frames(&mut framed, local_algorithm, read_timeout, end_of_manifest).await;

    match tokio::time::timeout(read_timeout, framed.get_mut().shutdown()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(error = %e, "channel shutdown failed"),
        Err(_) => debug!("channel shutdown timed out"),
    }
    result
}

async fn read_frames<S: SecureStream>(
    framed: &mut FramedRead<S, ManifestCodec>,
    local_algorithm: DigestAlgorithm,
    read_timeout: Duration,
    policy: EndOfManifest,
) -> Result<ReceivedManifest, ClientError> {
    let mut partial = Partial {
        algorithm: local_algorithm,
        announced: None,
        digests: Vec::new(),
    };

    loop {
        let next = match tokio::time::timeout(read_timeout, framed.next()).await {
            Ok(next) => next,
            Err(_) => return partial.stop(policy, format!("no data for {read_timeout:?}")),
        };

        let frame = match next {
            Some(Ok(frame)) => frame,
            None => return partial.stop(policy, "peer closed the stream".to_string()),
            Some(Err(CodecError::PartialFrame(pending))) => {
                return partial.stop(
                    policy,
                    format!("stream ended inside a frame ({pending} bytes pending)"),
                )
            }
            Some(Err(CodecError::Io(e))) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return partial.stop(policy, "peer closed without close_notify".to_string())
            }
            Some(Err(e)) => return Err(ClientError::Read(e)),
        };

        match frame {
            ManifestFrame::Header {
                version,
                algorithm,
                count,
            } => {
                if partial.announced.is_some() {
                    return Err(ClientError::Protocol("duplicate header".into()));
                }
                if version != PROTOCOL_VERSION {
                    return Err(ClientError::VersionMismatch {
                        local: PROTOCOL_VERSION,
                        peer: version,
                    });
                }
                if algorithm != local_algorithm {
                    return Err(ClientError::AlgorithmMismatch {
                        local: local_algorithm,
                        peer: algorithm,
                    });
                }
                debug!(count, %algorithm, "manifest header");
                partial.announced = Some(count);
                partial.digests.reserve(count.min(1 << 16) as usize);
            }
            ManifestFrame::Entry(digest) => {
                let Some(announced) = partial.announced else {
                    return Err(ClientError::Protocol("entry before header".into()));
                };
                let received = partial.digests.len() as u64;
                if received >= announced {
                    return Err(ClientError::CountMismatch {
                        announced,
                        trailer: None,
                        received: received + 1,
                    });
                }
                debug!(position = received, digest = %digest, "entry");
                partial.digests.push(digest);
            }
            ManifestFrame::End { count } => {
                let Some(announced) = partial.announced else {
                    return Err(ClientError::Protocol("trailer before header".into()));
                };
                let received = partial.digests.len() as u64;
                if count != announced || received != announced {
                    return Err(ClientError::CountMismatch {
                        announced,
                        trailer: Some(count),
                        received,
                    });
                }
                return Ok(ReceivedManifest {
                    algorithm: local_algorithm,
                    digests: partial.digests,
                    complete: true,
                });
            }
        }
    }
}

/// What has been read so far.
struct Partial {
    algorithm: DigestAlgorithm,
    announced: Option<u64>,
    digests: Vec<Digest>,
}

impl Partial {
    fn stop(self, policy: EndOfManifest, reason: String) -> Result<ReceivedManifest, ClientError> {
        let announced = match self.announced {
            Some(n) => n.to_string(),
            None => "unknown".to_string(),
        };
        match policy {
            EndOfManifest::RequireTrailer => Err(ClientError::Truncated(format!(
                "{reason} after {} of {announced} entries",
                self.digests.len()
            ))),
            EndOfManifest::Lenient => {
                warn!(
                    received = self.digests.len(),
                    %announced,
                    %reason,
                    "no trailer, using the entries received so far"
                );
                Ok(ReceivedManifest {
                    algorithm: self.algorithm,
                    digests: self.digests,
                    complete: false,
                })
            }
        }
    }
}
