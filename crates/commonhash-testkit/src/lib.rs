//! # commonhash testkit
//!
//! Testing utilities for commonhash.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: temporary directories with files, and self-signed TLS
//!   material with ready-made acceptors and connectors
//! - **Generators**: proptest strategies for digests and directory contents
//!
//! ## Test Fixtures
//!
//! ```rust
//! use commonhash_core::DigestAlgorithm;
//! use commonhash_testkit::DirFixture;
//!
//! let dir = DirFixture::with_files(&[("x", b"hello"), ("y", b"world")]);
//! let manifest = dir.manifest(DigestAlgorithm::Sha3_512);
//! assert_eq!(manifest.len(), 2);
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use commonhash_testkit::generators::file_set;
//!
//! proptest! {
//!     #[test]
//!     fn manifest_is_complete(files in file_set(8)) {
//!         let dir = commonhash_testkit::DirFixture::with_owned_files(&files);
//!         prop_assert_eq!(dir.manifest(Default::default()).len(), files.len());
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{CertFixture, DirFixture, HANDSHAKE_TIMEOUT};
