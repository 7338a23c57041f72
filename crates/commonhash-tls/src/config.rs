//! rustls configuration builders for the listener and dialer roles.
//!
//! Both builders use the ring crypto provider and allow TLS 1.2 and 1.3.
//! The client always verifies the server certificate against the configured
//! trust anchors with the standard WebPKI verifier.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::crypto::CryptoProvider;
use rustls::server::WebPkiClientVerifier;
use rustls::{ClientConfig, ServerConfig};

use crate::error::{ChannelError, Result};
use crate::pem::{load_certs, load_private_key, load_trust_anchors};

/// ALPN protocol identifier for the manifest exchange.
pub const ALPN_COMMONHASH: &[u8] = b"commonhash/1";

/// Paths to the PEM material a peer needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsMaterial {
    /// Certificate chain presented by this peer.
    pub cert_path: PathBuf,
    /// Private key for `cert_path`.
    pub key_path: PathBuf,
    /// Trust anchors used to validate the other peer.
    pub ca_path: PathBuf,
}

impl TlsMaterial {
    pub fn new(
        cert_path: impl Into<PathBuf>,
        key_path: impl Into<PathBuf>,
        ca_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            cert_path: cert_path.into(),
            key_path: key_path.into(),
            ca_path: ca_path.into(),
        }
    }

    /// Material where the peer's own certificate is also the trust anchor,
    /// i.e. both hosts share one self-signed certificate.
    pub fn self_trusting(cert_path: impl AsRef<Path>, key_path: impl Into<PathBuf>) -> Self {
        let cert = cert_path.as_ref().to_path_buf();
        Self::new(cert.clone(), key_path, cert)
    }
}

impl Default for TlsMaterial {
    fn default() -> Self {
        Self::self_trusting("./cert.pem", "./key.pem")
    }
}

/// Whether client certificates are part of the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientAuth {
    /// Server authentication only.
    #[default]
    None,
    /// The server requires a client certificate chaining to its trust
    /// anchors, and the client presents its own certificate.
    Required,
}

fn provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

const VERSIONS: &[&rustls::SupportedProtocolVersion] =
    &[&rustls::version::TLS13, &rustls::version::TLS12];

/// Build the listener-side configuration.
pub fn server_config(material: &TlsMaterial, client_auth: ClientAuth) -> Result<Arc<ServerConfig>> {
    let cert_chain = load_certs(&material.cert_path)?;
    let private_key = load_private_key(&material.key_path)?;

    let builder = ServerConfig::builder_with_provider(provider())
        .with_protocol_versions(VERSIONS)
        .map_err(|e| ChannelError::Config(format!("TLS version config: {e}")))?;

    let builder = match client_auth {
        ClientAuth::None => builder.with_no_client_auth(),
        ClientAuth::Required => {
            let roots = Arc::new(load_trust_anchors(&material.ca_path)?);
            let verifier = WebPkiClientVerifier::builder_with_provider(roots, provider())
                .build()
                .map_err(|e| ChannelError::Config(format!("client verifier: {e}")))?;
            builder.with_client_cert_verifier(verifier)
        }
    };

    let mut config = builder
        .with_single_cert(cert_chain, private_key)
        .map_err(|e| ChannelError::Config(format!("server cert config: {e}")))?;
    config.alpn_protocols = vec![ALPN_COMMONHASH.to_vec()];

    Ok(Arc::new(config))
}

/// Build the dialer-side configuration.
pub fn client_config(material: &TlsMaterial, client_auth: ClientAuth) -> Result<Arc<ClientConfig>> {
    let roots = load_trust_anchors(&material.ca_path)?;

    let builder = ClientConfig::builder_with_provider(provider())
        .with_protocol_versions(VERSIONS)
        .map_err(|e| ChannelError::Config(format!("TLS version config: {e}")))?
        .with_root_certificates(roots);

    let mut config = match client_auth {
        ClientAuth::None => builder.with_no_client_auth(),
        ClientAuth::Required => {
            let cert_chain = load_certs(&material.cert_path)?;
            let private_key = load_private_key(&material.key_path)?;
            builder
                .with_client_auth_cert(cert_chain, private_key)
                .map_err(|e| ChannelError::Config(format!("client cert config: {e}")))?
        }
    };
    config.alpn_protocols = vec![ALPN_COMMONHASH.to_vec()];

    Ok(Arc::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provision::fixture;

    #[test]
    fn test_server_config_builds() {
        let (_dir, material) = fixture(&["localhost"]);
        for auth in [ClientAuth::None, ClientAuth::Required] {
            let config = server_config(&material, auth).unwrap();
            assert_eq!(config.alpn_protocols, vec![ALPN_COMMONHASH.to_vec()]);
        }
    }

    #[test]
    fn test_client_config_builds() {
        let (_dir, material) = fixture(&["localhost"]);
        for auth in [ClientAuth::None, ClientAuth::Required] {
            let config = client_config(&material, auth).unwrap();
            assert_eq!(config.alpn_protocols, vec![ALPN_COMMONHASH.to_vec()]);
        }
    }

    #[test]
    fn test_missing_key_is_an_error() {
        let (dir, material) = fixture(&["localhost"]);
        let material = TlsMaterial::new(
            &material.cert_path,
            dir.path().join("missing-key.pem"),
            &material.ca_path,
        );
        assert!(matches!(
            server_config(&material, ClientAuth::None),
            Err(ChannelError::Pem { what: "private key", .. })
        ));
    }

    #[test]
    fn test_default_material_paths() {
        let material = TlsMaterial::default();
        assert_eq!(material.cert_path, PathBuf::from("./cert.pem"));
        assert_eq!(material.key_path, PathBuf::from("./key.pem"));
        assert_eq!(material.ca_path, material.cert_path);
    }
}
