//! Manifest: the ordered content digests of one directory.

use serde::{Deserialize, Serialize};

use crate::digest::{Digest, DigestAlgorithm};
use crate::intersect::ManifestIndex;

/// One file's digest paired with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDigest {
    /// File name within the scanned directory.
    pub identifier: String,
    /// Content digest.
    pub digest: Digest,
}

impl FileDigest {
    pub fn new(identifier: impl Into<String>, digest: Digest) -> Self {
        Self {
            identifier: identifier.into(),
            digest,
        }
    }
}

/// An ordered sequence of [`FileDigest`] values.
///
/// Order is directory traversal order. Identifiers are not required to be
/// unique and the same digest may appear several times. A manifest is never
/// modified after construction; share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    algorithm: DigestAlgorithm,
    entries: Vec<FileDigest>,
}

impl Manifest {
    /// Build a manifest from entries already computed with `algorithm`.
    pub fn from_entries(algorithm: DigestAlgorithm, entries: Vec<FileDigest>) -> Self {
        Self { algorithm, entries }
    }

    /// An empty manifest.
    pub fn empty(algorithm: DigestAlgorithm) -> Self {
        Self::from_entries(algorithm, Vec::new())
    }

    /// The algorithm every digest in this manifest was computed with.
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[FileDigest] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FileDigest> {
        self.entries.iter()
    }

    /// Digests in manifest order.
    pub fn digests(&self) -> impl Iterator<Item = Digest> + '_ {
        self.entries.iter().map(|e| e.digest)
    }

    /// Build a digest-keyed index over this manifest.
    pub fn index(&self) -> ManifestIndex<'_> {
        ManifestIndex::new(self)
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a FileDigest;
    type IntoIter = std::slice::Iter<'a, FileDigest>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, content: &[u8]) -> FileDigest {
        FileDigest::new(name, Digest::compute(DigestAlgorithm::Sha3_512, content))
    }

    #[test]
    fn test_manifest_preserves_order() {
        let manifest = Manifest::from_entries(
            DigestAlgorithm::Sha3_512,
            vec![entry("b", b"2"), entry("a", b"1"), entry("c", b"3")],
        );
        let names: Vec<_> = manifest.iter().map(|e| e.identifier.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
        assert_eq!(manifest.len(), 3);
    }

    #[test]
    fn test_manifest_allows_duplicates() {
        let manifest = Manifest::from_entries(
            DigestAlgorithm::Sha3_512,
            vec![entry("a", b"same"), entry("a", b"same")],
        );
        assert_eq!(manifest.len(), 2);
        let digests: Vec<_> = manifest.digests().collect();
        assert_eq!(digests[0], digests[1]);
    }

    #[test]
    fn test_empty_manifest() {
        let manifest = Manifest::empty(DigestAlgorithm::Blake3_512);
        assert!(manifest.is_empty());
        assert_eq!(manifest.algorithm(), DigestAlgorithm::Blake3_512);
        assert_eq!(manifest.digests().count(), 0);
    }
}
