//! PEM loading for certificates, private keys and trust anchors.

use std::path::Path;

use rustls::RootCertStore;
use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use tracing::debug;

use crate::error::{ChannelError, Result};

fn pem_error(what: &'static str, path: &Path, reason: impl ToString) -> ChannelError {
    ChannelError::Pem {
        what,
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Load every certificate in a PEM file, in file order.
pub fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let certs = CertificateDer::pem_file_iter(path)
        .map_err(|e| pem_error("certificates", path, e))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| pem_error("certificates", path, e))?;

    if certs.is_empty() {
        return Err(pem_error("certificates", path, "no certificates found"));
    }
    debug!(path = %path.display(), count = certs.len(), "loaded certificates");
    Ok(certs)
}

/// Load the first private key (PKCS#8, PKCS#1 or SEC1) in a PEM file.
pub fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    PrivateKeyDer::from_pem_file(path).map_err(|e| pem_error("private key", path, e))
}

/// Load every certificate in a PEM file into a root store.
///
/// A self-signed peer certificate is a valid trust anchor for itself.
pub fn load_trust_anchors(path: &Path) -> Result<RootCertStore> {
    let mut roots = RootCertStore::empty();
    for cert in load_certs(path)? {
        roots
            .add(cert)
            .map_err(|e| pem_error("trust anchor", path, e))?;
    }
    Ok(roots)
}
