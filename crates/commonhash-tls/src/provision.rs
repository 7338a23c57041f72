//! Self-signed certificate provisioning.
//!
//! Two hosts that share one self-signed certificate can each use it as both
//! their identity and their trust anchor.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::config::TlsMaterial;
use crate::error::{ChannelError, Result};

/// Subject alternative names used when none are given.
pub const DEFAULT_NAMES: &[&str] = &["localhost", "127.0.0.1", "::1"];

/// A freshly generated certificate and its private key, PEM encoded.
#[derive(Clone)]
pub struct SelfSignedCert {
    pub cert_pem: String,
    pub key_pem: String,
}

impl SelfSignedCert {
    /// Generate a certificate valid for `names` (DNS names or IP addresses).
    pub fn generate<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let names: Vec<String> = names.iter().map(|n| n.as_ref().to_string()).collect();
        let certified = rcgen::generate_simple_self_signed(names)
            .map_err(|e| ChannelError::Config(format!("certificate generation: {e}")))?;

        Ok(Self {
            cert_pem: certified.cert.pem(),
            key_pem: certified.key_pair.serialize_pem(),
        })
    }

    /// Write the certificate and key. The key file is private to the owner
    /// on unix.
    pub fn write(&self, cert_path: &Path, key_path: &Path) -> Result<()> {
        fs::write(cert_path, &self.cert_pem)?;
        fs::write(key_path, &self.key_pem)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(key_path, fs::Permissions::from_mode(0o600))?;
        }

        info!(
            cert = %cert_path.display(),
            key = %key_path.display(),
            "wrote self-signed certificate"
        );
        Ok(())
    }

    /// Write `cert.pem` and `key.pem` into `dir` and return material that
    /// trusts its own certificate.
    pub fn write_material(&self, dir: &Path) -> Result<TlsMaterial> {
        let material = TlsMaterial::self_trusting(dir.join("cert.pem"), dir.join("key.pem"));
        self.write(&material.cert_path, &material.key_path)?;
        Ok(material)
    }
}

impl std::fmt::Debug for SelfSignedCert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelfSignedCert").finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) fn fixture(names: &[&str]) -> (tempfile::TempDir, TlsMaterial) {
    let dir = tempfile::tempdir().unwrap();
    let material = SelfSignedCert::generate(names)
        .unwrap()
        .write_material(dir.path())
        .unwrap();
    (dir, material)
}
