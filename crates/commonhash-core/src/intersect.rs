//! Intersection of a local manifest with digests received from a peer.
//!
//! Only digest values cross the wire, so "common file" means "local file
//! whose content digest equals a received digest". Names play no part.

use std::collections::HashMap;

use serde::Serialize;

use crate::digest::Digest;
use crate::manifest::Manifest;

/// Digest-keyed lookup over a [`Manifest`].
///
/// Maps each distinct digest to the positions of the entries carrying it.
#[derive(Debug, Clone)]
pub struct ManifestIndex<'a> {
    manifest: &'a Manifest,
    by_digest: HashMap<Digest, Vec<usize>>,
}

impl<'a> ManifestIndex<'a> {
    pub fn new(manifest: &'a Manifest) -> Self {
        let mut by_digest: HashMap<Digest, Vec<usize>> = HashMap::with_capacity(manifest.len());
        for (position, entry) in manifest.iter().enumerate() {
            by_digest.entry(entry.digest).or_default().push(position);
        }
        Self {
            manifest,
            by_digest,
        }
    }

    /// Number of distinct digests.
    pub fn distinct(&self) -> usize {
        self.by_digest.len()
    }

    pub fn contains(&self, digest: &Digest) -> bool {
        self.by_digest.contains_key(digest)
    }

    /// Identifiers of every local entry with this digest, in manifest order.
    pub fn identifiers(&self, digest: &Digest) -> Vec<&'a str> {
        let entries = self.manifest.entries();
        self.by_digest
            .get(digest)
            .map(|positions| {
                positions
                    .iter()
                    .map(|&p| entries[p].identifier.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// One received digest that matched at least one local entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    pub digest: Digest,
    /// Position of the digest in the received sequence.
    pub received_position: usize,
    /// Local files with this content.
    pub local_identifiers: Vec<String>,
}

/// Result of comparing a received digest sequence against a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Intersection {
    pub matches: Vec<Match>,
    /// Matching (local, received) pairs, counted with multiplicity.
    pub count: usize,
}

impl Intersection {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Compare `received` against `local`.
///
/// Every (local entry, received digest) pair with equal digests counts once,
/// so duplicates on either side each add to the count.
pub fn intersect<I>(local: &Manifest, received: I) -> Intersection
where
    I: IntoIterator<Item = Digest>,
{
    let index = local.index();
    let mut result = Intersection::default();

    for (received_position, digest) in received.into_iter().enumerate() {
        let local_identifiers = index.identifiers(&digest);
        if local_identifiers.is_empty() {
            continue;
        }
        result.count += local_identifiers.len();
        result.matches.push(Match {
            digest,
            received_position,
            local_identifiers: local_identifiers.into_iter().map(String::from).collect(),
        });
    }

    result
}
