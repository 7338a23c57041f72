//! Handshake wrappers turning TCP streams into secure channels.
//!
//! A channel is returned only after its handshake has completed, so callers
//! can never write or read application bytes on an unauthenticated stream.

use std::sync::Arc;
use std::time::Duration;

use rustls_pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::{TlsAcceptor, TlsConnector};
use tracing::debug;

use crate::config::{client_config, server_config, ClientAuth, TlsMaterial};
use crate::error::{ChannelError, Result};

/// A duplex byte stream usable by the manifest roles.
pub trait SecureStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> SecureStream for T {}

/// Channel produced by the listener-side handshake.
pub type ServerChannel = tokio_rustls::server::TlsStream<TcpStream>;

/// Channel produced by the dialer-side handshake.
pub type ClientChannel = tokio_rustls::client::TlsStream<TcpStream>;

/// Listener-side handshake.
#[derive(Clone)]
pub struct ChannelAcceptor {
    acceptor: TlsAcceptor,
    handshake_timeout: Duration,
}

impl ChannelAcceptor {
    /// Load material and build the acceptor.
    pub fn new(
        material: &TlsMaterial,
        client_auth: ClientAuth,
        handshake_timeout: Duration,
    ) -> Result<Self> {
        let config = server_config(material, client_auth)?;
        Ok(Self::from_config(config, handshake_timeout))
    }

    pub fn from_config(config: Arc<rustls::ServerConfig>, handshake_timeout: Duration) -> Self {
        Self {
            acceptor: TlsAcceptor::from(config),
            handshake_timeout,
        }
    }

    /// Run the server handshake on an accepted connection.
    pub async fn accept(&self, tcp: TcpStream) -> Result<ServerChannel> {
        let peer = tcp.peer_addr().ok();
        match tokio::time::timeout(self.handshake_timeout, self.acceptor.accept(tcp)).await {
            Ok(Ok(stream)) => {
                let (_, session) = stream.get_ref();
                debug!(
                    peer = ?peer,
                    version = ?session.protocol_version(),
                    "server handshake complete"
                );
                Ok(stream)
            }
            Ok(Err(e)) => Err(ChannelError::handshake(peer, e)),
            Err(_) => Err(ChannelError::timeout(peer, self.handshake_timeout)),
        }
    }
}

/// Dialer-side handshake.
#[derive(Clone)]
pub struct ChannelConnector {
    connector: TlsConnector,
    handshake_timeout: Duration,
}

impl ChannelConnector {
    /// Load material and build the connector.
    pub fn new(
        material: &TlsMaterial,
        client_auth: ClientAuth,
        handshake_timeout: Duration,
    ) -> Result<Self> {
        let config = client_config(material, client_auth)?;
        Ok(Self::from_config(config, handshake_timeout))
    }

    pub fn from_config(config: Arc<rustls::ClientConfig>, handshake_timeout: Duration) -> Self {
        Self {
            connector: TlsConnector::from(config),
            handshake_timeout,
        }
    }

    /// Run the client handshake, verifying the server certificate for
    /// `server_name` (a DNS name or an IP address).
    pub async fn connect(&self, server_name: &str, tcp: TcpStream) -> Result<ClientChannel> {
        let name = ServerName::try_from(server_name.to_string())
            .map_err(|_| ChannelError::InvalidServerName(server_name.to_string()))?;
        let peer = tcp.peer_addr().ok();

        match tokio::time::timeout(self.handshake_timeout, self.connector.connect(name, tcp)).await
        {
            Ok(Ok(stream)) => {
                let (_, session) = stream.get_ref();
                debug!(
                    peer = ?peer,
                    version = ?session.protocol_version(),
                    "client handshake complete"
                );
                Ok(stream)
            }
            Ok(Err(e)) => Err(ChannelError::handshake(peer, e)),
            Err(_) => Err(ChannelError::timeout(peer, self.handshake_timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provision::fixture;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const TIMEOUT: Duration = Duration::from_secs(5);

    async fn pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (client, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
        (client.unwrap(), accepted.unwrap().0)
    }

    #[tokio::test]
    async fn test_trusted_handshake_carries_bytes() {
        let (_dir, material) = fixture(&["localhost", "127.0.0.1"]);
        let acceptor = ChannelAcceptor::new(&material, ClientAuth::None, TIMEOUT).unwrap();
        let connector = ChannelConnector::new(&material, ClientAuth::None, TIMEOUT).unwrap();

        let (client_tcp, server_tcp) = pair().await;
        let server = tokio::spawn(async move {
            let mut channel = acceptor.accept(server_tcp).await.unwrap();
            channel.write_all(b"ping").await.unwrap();
            channel.shutdown().await.unwrap();
        });

        let mut channel = connector.connect("localhost", client_tcp).await.unwrap();
        let mut received = Vec::new();
        channel.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"ping");

        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_ip_server_name() {
        let (_dir, material) = fixture(&["localhost", "127.0.0.1"]);
        let acceptor = ChannelAcceptor::new(&material, ClientAuth::None, TIMEOUT).unwrap();
        let connector = ChannelConnector::new(&material, ClientAuth::None, TIMEOUT).unwrap();

        let (client_tcp, server_tcp) = pair().await;
        let (server, client) = tokio::join!(
            acceptor.accept(server_tcp),
            connector.connect("127.0.0.1", client_tcp)
        );
        assert!(server.is_ok());
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_untrusted_certificate_rejected() {
        let (_server_cert_dir, server_cert) = fixture(&["localhost"]);
        let (_other_cert_dir, other_cert) = fixture(&["localhost"]);

        let acceptor = ChannelAcceptor::new(&server_cert, ClientAuth::None, TIMEOUT).unwrap();
        let connector = ChannelConnector::new(&other_cert, ClientAuth::None, TIMEOUT).unwrap();

        let (client_tcp, server_tcp) = pair().await;
        let (server, client) = tokio::join!(
            acceptor.accept(server_tcp),
            connector.connect("localhost", client_tcp)
        );

        let err = client.unwrap_err();
        assert!(err.is_handshake(), "unexpected error: {err}");
        assert!(server.is_err());
    }

    #[tokio::test]
    async fn test_wrong_server_name_rejected() {
        let (_dir, material) = fixture(&["localhost"]);
        let acceptor = ChannelAcceptor::new(&material, ClientAuth::None, TIMEOUT).unwrap();
        let connector = ChannelConnector::new(&material, ClientAuth::None, TIMEOUT).unwrap();

        let (client_tcp, server_tcp) = pair().await;
        let (_, client) = tokio::join!(
            acceptor.accept(server_tcp),
            connector.connect("example.com", client_tcp)
        );
        assert!(client.unwrap_err().is_handshake());
    }

    #[tokio::test]
    async fn test_invalid_server_name() {
        let (_dir, material) = fixture(&["localhost"]);
        let connector = ChannelConnector::new(&material, ClientAuth::None, TIMEOUT).unwrap();
        let (client_tcp, _server_tcp) = pair().await;

        let err = connector.connect("not a name!", client_tcp).await.unwrap_err();
        assert!(matches!(err, ChannelError::InvalidServerName(_)));
    }

    #[tokio::test]
    async fn test_mutual_auth_requires_client_certificate() {
        let (_dir, material) = fixture(&["localhost"]);
        let acceptor = ChannelAcceptor::new(&material, ClientAuth::Required, TIMEOUT).unwrap();
        let anonymous = ChannelConnector::new(&material, ClientAuth::None, TIMEOUT).unwrap();

        let (client_tcp, server_tcp) = pair().await;
        let (server, _client) = tokio::join!(
            acceptor.accept(server_tcp),
            anonymous.connect("localhost", client_tcp)
        );
        assert!(server.unwrap_err().is_handshake());

        let authenticated = ChannelConnector::new(&material, ClientAuth::Required, TIMEOUT).unwrap();
        let (client_tcp, server_tcp) = pair().await;
        let (server, client) = tokio::join!(
            acceptor.accept(server_tcp),
            authenticated.connect("localhost", client_tcp)
        );
        assert!(server.is_ok());
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_handshake_timeout() {
        let (_dir, material) = fixture(&["localhost"]);
        let acceptor = ChannelAcceptor::new(
            &material,
            ClientAuth::None,
            Duration::from_millis(100),
        )
        .unwrap();

        // The client side never speaks.
        let (_client_tcp, server_tcp) = pair().await;
        let err = acceptor.accept(server_tcp).await.unwrap_err();
        assert!(matches!(err, ChannelError::HandshakeTimeout { .. }));
    }
}
