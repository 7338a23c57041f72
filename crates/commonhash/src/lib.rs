//! # commonhash
//!
//! A dual-role peer that finds the files two hosts have in common without
//! exchanging the files themselves.
//!
//! ## Overview
//!
//! Each peer hashes the regular files of one directory into a manifest,
//! serves that manifest over TLS, dials the other peer to read its manifest,
//! and reports the intersection. Run the same program on both hosts, each
//! pointing at the other.
//!
//! ```text
//!        host A                                   host B
//!  +------------------+                    +------------------+
//!  | ManifestBuilder  |                    | ManifestBuilder  |
//!  |   server role  <----- B's client -------                 |
//!  |   client role  ------- A's client -----> server role     |
//!  +------------------+                    +------------------+
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use commonhash::{PeerConfig, PeerSession};
//!
//! async fn example() -> Result<(), commonhash::SessionError> {
//!     let config = PeerConfig::new("peer.example.org", 9000, 9000, "./shared");
//!     let report = PeerSession::new(config)?.run().await?;
//!     println!("Common file count: {}", report.client.intersection.count);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `commonhash::core` - digests, manifests, intersection
//! - `commonhash::tls` - the secure channel factory
//! - `commonhash::sync` - wire codec, server and client roles

pub mod config;
pub mod error;
pub mod session;

// Re-export component crates
pub use commonhash_core as core;
pub use commonhash_sync as sync;
pub use commonhash_tls as tls;

pub use config::PeerConfig;
pub use error::{Result, SessionError};
pub use session::{PeerSession, SessionReport};
