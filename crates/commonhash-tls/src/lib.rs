//! # commonhash TLS
//!
//! The secure channel factory. Wraps an already-connected TCP stream in TLS
//! and returns a byte stream that behaves like the raw socket, with
//! confidentiality, integrity and peer authentication on top.
//!
//! ## Trust model
//!
//! Certificates, keys and trust anchors are PEM files provisioned before a
//! peer starts. The client always validates the server certificate against
//! the configured trust anchors; the server can additionally require and
//! validate a client certificate ([`ClientAuth::Required`]).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use commonhash_tls::{ChannelAcceptor, ChannelConnector, ClientAuth, TlsMaterial};
//! use std::time::Duration;
//! use tokio::net::TcpStream;
//!
//! async fn example() -> commonhash_tls::Result<()> {
//!     let material = TlsMaterial::new("cert.pem", "key.pem", "cert.pem");
//!     let connector =
//!         ChannelConnector::new(&material, ClientAuth::None, Duration::from_secs(5))?;
//!
//!     let tcp = TcpStream::connect("127.0.0.1:9000").await?;
//!     let _channel = connector.connect("localhost", tcp).await?;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod config;
pub mod error;
pub mod pem;
pub mod provision;

pub use channel::{ChannelAcceptor, ChannelConnector, ClientChannel, SecureStream, ServerChannel};
pub use config::{client_config, server_config, ClientAuth, TlsMaterial, ALPN_COMMONHASH};
pub use error::{ChannelError, Result};
pub use pem::{load_certs, load_private_key, load_trust_anchors};
pub use provision::{SelfSignedCert, DEFAULT_NAMES};
