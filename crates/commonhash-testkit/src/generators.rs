//! Proptest generators for property-based testing.

use proptest::collection::{btree_map, vec};
use proptest::prelude::*;

use commonhash_core::{Digest, DigestAlgorithm, FileDigest, Manifest, DIGEST_LEN};

/// Generate a random digest value.
pub fn digest() -> impl Strategy<Value = Digest> {
    vec(any::<u8>(), DIGEST_LEN).prop_map(|bytes| {
        let mut out = [0u8; DIGEST_LEN];
        out.copy_from_slice(&bytes);
        Digest::from_bytes(out)
    })
}

/// Generate a supported algorithm.
pub fn algorithm() -> impl Strategy<Value = DigestAlgorithm> {
    prop_oneof![
        Just(DigestAlgorithm::Sha3_512),
        Just(DigestAlgorithm::Blake3_512),
    ]
}

/// File contents drawn from a small alphabet, so collisions between files
/// are common.
pub fn file_contents() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        vec(0u8..4, 0..4),
        vec(any::<u8>(), 0..2048),
    ]
}

/// Up to `max` files with distinct, filesystem-safe names.
pub fn file_set(max: usize) -> impl Strategy<Value = Vec<(String, Vec<u8>)>> {
    btree_map("[a-z][a-z0-9_]{0,11}", file_contents(), 0..=max)
        .prop_map(|files| files.into_iter().collect())
}

/// A manifest of up to `max` entries whose digests come from a pool of four
/// values, so duplicates and overlaps with other generated manifests are
/// likely.
pub fn manifest(max: usize) -> impl Strategy<Value = Manifest> {
    let pool: Vec<Digest> = (0u8..4)
        .map(|i| Digest::compute(DigestAlgorithm::Sha3_512, &[i]))
        .collect();
    vec(0usize..pool.len(), 0..=max).prop_map(move |picks| {
        let entries = picks
            .into_iter()
            .enumerate()
            .map(|(i, p)| FileDigest::new(format!("f{i}"), pool[p]))
            .collect();
        Manifest::from_entries(DigestAlgorithm::Sha3_512, entries)
    })
}
