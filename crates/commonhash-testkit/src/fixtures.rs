//! Test fixtures and helpers.
//!
//! Everything here lives in a temporary directory that is removed when the
//! fixture is dropped.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use commonhash_core::{DigestAlgorithm, Manifest, ManifestBuilder};
use commonhash_tls::{
    ChannelAcceptor, ChannelConnector, ClientAuth, SelfSignedCert, TlsMaterial, DEFAULT_NAMES,
};
use tempfile::TempDir;

/// Handshake timeout used by fixture acceptors and connectors.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// A self-signed certificate written to disk, trusting itself.
pub struct CertFixture {
    dir: TempDir,
    pub material: TlsMaterial,
}

impl CertFixture {
    /// Certificate valid for `localhost`, `127.0.0.1` and `::1`.
    pub fn new() -> Self {
        Self::with_names(DEFAULT_NAMES)
    }

    pub fn with_names(names: &[&str]) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let material = SelfSignedCert::generate(names)
            .expect("generate certificate")
            .write_material(dir.path())
            .expect("write certificate");
        Self { dir, material }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn cert_path(&self) -> PathBuf {
        self.material.cert_path.clone()
    }

    /// Own identity, but trusting `other`'s certificate instead of our own.
    pub fn trusting(&self, other: &CertFixture) -> TlsMaterial {
        TlsMaterial::new(
            self.material.cert_path.clone(),
            self.material.key_path.clone(),
            other.cert_path(),
        )
    }

    pub fn acceptor(&self, client_auth: ClientAuth) -> ChannelAcceptor {
        ChannelAcceptor::new(&self.material, client_auth, HANDSHAKE_TIMEOUT)
            .expect("build acceptor")
    }

    pub fn connector(&self, client_auth: ClientAuth) -> ChannelConnector {
        ChannelConnector::new(&self.material, client_auth, HANDSHAKE_TIMEOUT)
            .expect("build connector")
    }
}

impl Default for CertFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A temporary directory of regular files.
pub struct DirFixture {
    dir: TempDir,
}

impl DirFixture {
    /// An empty directory.
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn with_files(files: &[(&str, &[u8])]) -> Self {
        let fixture = Self::new();
        for (name, contents) in files {
            fixture.file(name, contents);
        }
        fixture
    }

    /// Same as [`with_files`](Self::with_files) for generated file sets.
    pub fn with_owned_files(files: &[(String, Vec<u8>)]) -> Self {
        let fixture = Self::new();
        for (name, contents) in files {
            fixture.file(name, contents);
        }
        fixture
    }

    /// Create or overwrite `name` with `contents`.
    pub fn file(&self, name: &str, contents: &[u8]) -> &Self {
        fs::write(self.dir.path().join(name), contents).expect("write fixture file");
        self
    }

    /// Create an empty subdirectory.
    pub fn subdir(&self, name: &str) -> &Self {
        fs::create_dir(self.dir.path().join(name)).expect("create fixture subdir");
        self
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Build the manifest of this directory with default settings.
    pub fn manifest(&self, algorithm: DigestAlgorithm) -> Manifest {
        ManifestBuilder::new(algorithm)
            .build(self.dir.path())
            .expect("build manifest")
    }
}

impl Default for DirFixture {
    fn default() -> Self {
        Self::new()
    }
}
