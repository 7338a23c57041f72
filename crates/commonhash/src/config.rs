//! Configuration for a peer session.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use commonhash_core::{DigestAlgorithm, ManifestBuilder, UnreadablePolicy, DEFAULT_BLOCK_SIZE};
use commonhash_sync::{ClientConfig, EndOfManifest, ServerConfig};
use commonhash_tls::{ClientAuth, TlsMaterial};

/// Everything one peer needs: where to dial, where to listen, what to hash
/// and how to authenticate.
#[derive(Debug, Clone)]
pub struct PeerConfig {
    pub remote_host: String,
    pub remote_port: u16,
    pub listen_ip: IpAddr,
    pub listen_port: u16,
    pub directory: PathBuf,

    pub tls: TlsMaterial,
    /// Name checked against the peer's certificate. Defaults to
    /// `remote_host`.
    pub server_name: Option<String>,
    pub client_auth: ClientAuth,

    pub algorithm: DigestAlgorithm,
    pub block_size: usize,
    pub unreadable_policy: UnreadablePolicy,
    pub end_of_manifest: EndOfManifest,

    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub handshake_timeout: Duration,
    pub write_timeout: Duration,

    /// Keep serving until this many peers fetched our manifest. `None`
    /// serves until `linger` elapses or the process is interrupted.
    pub serve_sessions: Option<usize>,
    /// Upper bound on serving after the client role finished.
    pub linger: Option<Duration>,
    /// Pause between the server being ready and dialing the peer.
    pub start_delay: Duration,
}

impl PeerConfig {
    pub fn new(
        remote_host: impl Into<String>,
        remote_port: u16,
        listen_port: u16,
        directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            remote_host: remote_host.into(),
            remote_port,
            listen_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            listen_port,
            directory: directory.into(),
            tls: TlsMaterial::default(),
            server_name: None,
            client_auth: ClientAuth::None,
            algorithm: DigestAlgorithm::default(),
            block_size: DEFAULT_BLOCK_SIZE,
            unreadable_policy: UnreadablePolicy::default(),
            end_of_manifest: EndOfManifest::default(),
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(5),
            handshake_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(30),
            serve_sessions: Some(1),
            linger: None,
            start_delay: Duration::ZERO,
        }
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen_ip, self.listen_port)
    }

    pub fn manifest_builder(&self) -> ManifestBuilder {
        ManifestBuilder::new(self.algorithm)
            .block_size(self.block_size)
            .unreadable(self.unreadable_policy)
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            listen_addr: self.listen_addr(),
            max_sessions: self.serve_sessions,
            write_timeout: self.write_timeout,
            ..ServerConfig::default()
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            server_name: self.server_name.clone(),
            connect_timeout: self.connect_timeout,
            read_timeout: self.read_timeout,
            end_of_manifest: self.end_of_manifest,
            ..ClientConfig::new(self.remote_host.clone(), self.remote_port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PeerConfig::new("10.0.0.2", 9001, 9000, "/srv/share");
        assert_eq!(config.listen_addr(), "0.0.0.0:9000".parse().unwrap());
        assert_eq!(config.algorithm, DigestAlgorithm::Sha3_512);
        assert_eq!(config.serve_sessions, Some(1));
        assert_eq!(config.unreadable_policy, UnreadablePolicy::Abort);
        assert_eq!(config.end_of_manifest, EndOfManifest::RequireTrailer);
    }

    #[test]
    fn test_role_configs() {
        let mut config = PeerConfig::new("peer.local", 9001, 9000, ".");
        config.server_name = Some("override.local".into());
        config.serve_sessions = Some(3);
        config.read_timeout = Duration::from_secs(1);

        let server = config.server_config();
        assert_eq!(server.listen_addr.port(), 9000);
        assert_eq!(server.max_sessions, Some(3));

        let client = config.client_config();
        assert_eq!(client.peer_addr(), "peer.local:9001");
        assert_eq!(client.server_name(), "override.local");
        assert_eq!(client.read_timeout, Duration::from_secs(1));
    }
}
