//! # commonhash core
//!
//! Pure primitives for commonhash: content digests, manifests and their
//! intersection.
//!
//! This crate contains no networking. The only I/O it performs is reading
//! the files of the directory being scanned.
//!
//! ## Key Types
//!
//! - [`Digest`] - An immutable 512-bit content digest
//! - [`Hasher`] - The streaming accumulator that produces a [`Digest`]
//! - [`FileDigest`] - A file identifier paired with its digest
//! - [`Manifest`] - The ordered digests of one directory
//! - [`ManifestBuilder`] - Scans a directory into a [`Manifest`]
//! - [`ManifestIndex`] - Digest-keyed lookup table used for intersection
//!
//! ## Usage
//!
//! ```rust,no_run
//! use commonhash_core::{intersect, DigestAlgorithm, ManifestBuilder};
//!
//! let local = ManifestBuilder::new(DigestAlgorithm::Sha3_512)
//!     .build("./shared")
//!     .unwrap();
//! let remote = ManifestBuilder::new(DigestAlgorithm::Sha3_512)
//!     .build("./other")
//!     .unwrap();
//!
//! let common = intersect(&local, remote.digests());
//! println!("{} files in common", common.count);
//! ```

pub mod builder;
pub mod digest;
pub mod error;
pub mod intersect;
pub mod manifest;

pub use builder::{hash_file, hash_reader, ManifestBuilder, UnreadablePolicy, DEFAULT_BLOCK_SIZE};
pub use digest::{Digest, DigestAlgorithm, Hasher, DIGEST_HEX_LEN, DIGEST_LEN};
pub use error::{ManifestError, ParseDigestError, Result};
pub use intersect::{intersect, Intersection, ManifestIndex, Match};
pub use manifest::{FileDigest, Manifest};
