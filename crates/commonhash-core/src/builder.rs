//! Manifest Builder: hashes every regular file directly inside a directory.
//!
//! Files are read in fixed-size blocks and fed to a [`Hasher`], so memory use
//! does not depend on file size.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;

use tracing::{debug, warn};

use crate::digest::{Digest, DigestAlgorithm, Hasher};
use crate::error::{ManifestError, Result};
use crate::manifest::{FileDigest, Manifest};

/// Default read block size (64 KiB).
pub const DEFAULT_BLOCK_SIZE: usize = 64 * 1024;

/// What to do with a file that cannot be read during a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnreadablePolicy {
    /// Abort the whole scan. A partial manifest would make the comparison
    /// misleading.
    #[default]
    Abort,
    /// Leave the file out of the manifest and log a warning.
    Skip,
}

/// Builds a [`Manifest`] from a directory.
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    algorithm: DigestAlgorithm,
    block_size: usize,
    policy: UnreadablePolicy,
}

impl ManifestBuilder {
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        Self {
            algorithm,
            block_size: DEFAULT_BLOCK_SIZE,
            policy: UnreadablePolicy::default(),
        }
    }

    /// Set the read block size.
    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Set the policy for unreadable files.
    pub fn unreadable(mut self, policy: UnreadablePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Scan `dir` (non-recursive) and hash each regular file.
    ///
    /// Subdirectories and other non-regular entries are ignored. Symlinks are
    /// followed, so a link to a regular file is hashed as that file.
    pub fn build(&self, dir: impl AsRef<Path>) -> Result<Manifest> {
        if self.block_size == 0 {
            return Err(ManifestError::ZeroBlockSize);
        }

        let dir = dir.as_ref();
        let read_dir = fs::read_dir(dir).map_err(|source| ManifestError::UnreadableDirectory {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut entries = Vec::new();
        for dir_entry in read_dir {
            let dir_entry = dir_entry.map_err(|source| ManifestError::UnreadableDirectory {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = dir_entry.path();
            let identifier = dir_entry.file_name().to_string_lossy().into_owned();

            let result = fs::metadata(&path).and_then(|meta| {
                if meta.is_file() {
                    hash_file(self.algorithm, &path, self.block_size).map(Some)
                } else {
                    Ok(None)
                }
            });

            match result {
                Ok(Some(digest)) => {
                    debug!(file = %identifier, digest = %digest.to_hex(), "hashed file");
                    entries.push(FileDigest::new(identifier, digest));
                }
                Ok(None) => {
                    debug!(entry = %identifier, "skipping non-regular entry");
                }
                Err(source) => match self.policy {
                    UnreadablePolicy::Abort => {
                        return Err(ManifestError::UnreadableFile { path, source });
                    }
                    UnreadablePolicy::Skip => {
                        warn!(file = %path.display(), error = %source, "skipping unreadable file");
                    }
                },
            }
        }

        Ok(Manifest::from_entries(self.algorithm, entries))
    }
}

impl Default for ManifestBuilder {
    fn default() -> Self {
        Self::new(DigestAlgorithm::default())
    }
}

/// Hash one file, reading it `block_size` bytes at a time.
pub fn hash_file(algorithm: DigestAlgorithm, path: &Path, block_size: usize) -> io::Result<Digest> {
    let file = File::open(path)?;
    hash_reader(algorithm, file, block_size)
}

/// Hash everything `reader` yields, `block_size` bytes at a time.
pub fn hash_reader<R: Read>(
    algorithm: DigestAlgorithm,
    mut reader: R,
    block_size: usize,
) -> io::Result<Digest> {
    let mut hasher = Hasher::new(algorithm);
    let mut buf = vec![0u8; block_size.max(1)];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => hasher.update(&buf[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    fn write(dir: &Path, name: &str, content: &[u8]) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_build_one_entry_per_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "x", b"hello");
        write(dir.path(), "y", b"world");
        fs::create_dir(dir.path().join("nested")).unwrap();
        write(&dir.path().join("nested"), "z", b"ignored");

        let manifest = ManifestBuilder::default().build(dir.path()).unwrap();
        assert_eq!(manifest.len(), 2);

        let mut names: Vec<_> = manifest.iter().map(|e| e.identifier.clone()).collect();
        names.sort();
        assert_eq!(names, vec!["x", "y"]);
    }

    #[test]
    fn test_build_digest_matches_content() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "x", b"hello");

        let manifest = ManifestBuilder::default().build(dir.path()).unwrap();
        assert_eq!(
            manifest.entries()[0].digest,
            Digest::compute(DigestAlgorithm::Sha3_512, b"hello")
        );
    }

    #[test]
    fn test_build_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = ManifestBuilder::default().build(dir.path()).unwrap();
        assert!(manifest.is_empty());
    }

    #[test]
    fn test_build_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = ManifestBuilder::default().build(&missing).unwrap_err();
        assert!(matches!(err, ManifestError::UnreadableDirectory { .. }));
    }

    #[test]
    fn test_zero_block_size_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = ManifestBuilder::default()
            .block_size(0)
            .build(dir.path())
            .unwrap_err();
        assert!(matches!(err, ManifestError::ZeroBlockSize));
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_aborts_or_skips() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "ok", b"fine");
        std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("dangling")).unwrap();

        let err = ManifestBuilder::default().build(dir.path()).unwrap_err();
        assert!(matches!(err, ManifestError::UnreadableFile { .. }));

        let manifest = ManifestBuilder::default()
            .unreadable(UnreadablePolicy::Skip)
            .build(dir.path())
            .unwrap();
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.entries()[0].identifier, "ok");
    }

    #[test]
    fn test_large_file_spans_many_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        write(dir.path(), "big", &content);

        let manifest = ManifestBuilder::default().block_size(4096).build(dir.path()).unwrap();
        assert_eq!(
            manifest.entries()[0].digest,
            Digest::compute(DigestAlgorithm::Sha3_512, &content)
        );
    }

    proptest! {
        #[test]
        fn test_digest_independent_of_block_size(
            content in prop::collection::vec(any::<u8>(), 0..4096),
            block_a in 1usize..512,
            block_b in 1usize..512,
        ) {
            for algorithm in [DigestAlgorithm::Sha3_512, DigestAlgorithm::Blake3_512] {
                let a = hash_reader(algorithm, Cursor::new(&content), block_a).unwrap();
                let b = hash_reader(algorithm, Cursor::new(&content), block_b).unwrap();
                prop_assert_eq!(a, b);
                prop_assert_eq!(a, Digest::compute(algorithm, &content));
            }
        }
    }
}
