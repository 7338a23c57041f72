//! # commonhash sync
//!
//! The manifest exchange between two peers: a line-oriented wire codec, the
//! server role that streams the local manifest to whoever connects, and the
//! client role that reads the peer's manifest and intersects it with ours.
//!
//! ## Message flow
//!
//! ```text
//! Client                                  Server
//!   |                                       |
//!   |------------- TCP connect ------------>|
//!   |<============ TLS handshake ==========>|
//!   |                                       |
//!   |<---- MANIFEST 1 sha3-512 <count> -----|
//!   |<---- <digest hex> --------------------|  (count times, manifest order)
//!   |<---- END <count> ---------------------|
//!   |<---- close_notify --------------------|
//!   |                                       |
//! ```
//!
//! Only digests cross the wire. File names stay local and are reported only
//! for matches.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use commonhash_core::{DigestAlgorithm, ManifestBuilder};
//! use commonhash_sync::{ClientConfig, ManifestClient};
//! use commonhash_tls::{ChannelConnector, ClientAuth, TlsMaterial};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let manifest = Arc::new(ManifestBuilder::new(DigestAlgorithm::Sha3_512).build("./data")?);
//!     let connector = ChannelConnector::new(
//!         &TlsMaterial::default(),
//!         ClientAuth::None,
//!         Duration::from_secs(5),
//!     )?;
//!
//!     let client = ManifestClient::new(ClientConfig::new("localhost", 9000), manifest, connector);
//!     let report = client.run().await?;
//!     println!("Common file count: {}", report.intersection.count);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod codec;
pub mod error;
pub mod server;

pub use client::{
    receive_manifest, ClientConfig, ClientReport, EndOfManifest, ManifestClient, ReceivedManifest,
};
pub use codec::{ManifestCodec, ManifestFrame, MAX_LINE_LENGTH, PROTOCOL_VERSION};
pub use error::{ClientError, CodecError, Phase, ServerError};
pub use server::{send_manifest, ManifestServer, ServeReport, ServerConfig};
