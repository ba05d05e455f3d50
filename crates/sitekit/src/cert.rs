//! Certificate store abstraction for secure bindings
//!
//! Installing a secure binding touches two external systems: the machine's
//! certificate store and the site's binding table. The store side lives
//! behind [`CertificateStore`] so the ordering guarantee (import before
//! binding) can be tested without a real trust store.

use std::path::{Path, PathBuf};

use log::info;

use crate::error::{Error, Result};

/// A certificate loaded from an archive, identified by its thumbprint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    /// Content-derived identity; bindings reference the certificate by this
    pub thumbprint: String,
    /// Raw archive bytes
    pub data: Vec<u8>,
}

/// The machine trust store, as far as secure bindings are concerned
pub trait CertificateStore {
    /// Load a certificate archive from disk
    fn load(&self, path: &Path, password: &str) -> Result<Certificate>;

    /// Install the certificate, replacing any entry with the same
    /// thumbprint. Re-installing must never duplicate an identity.
    fn install(&mut self, certificate: &Certificate) -> Result<()>;
}

/// In-memory trust store. `load` derives the thumbprint from a blake3 hash
/// of the archive contents, which keeps the identity stable across runs.
#[derive(Debug, Default)]
pub struct MemoryCertStore {
    installed: Vec<Certificate>,
}

impl MemoryCertStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn installed(&self) -> &[Certificate] {
        &self.installed
    }

    pub fn contains(&self, thumbprint: &str) -> bool {
        self.installed.iter().any(|c| c.thumbprint == thumbprint)
    }
}

impl CertificateStore for MemoryCertStore {
    fn load(&self, path: &Path, _password: &str) -> Result<Certificate> {
        let data = std::fs::read(path).map_err(|source| Error::CertificateRead {
            path: PathBuf::from(path),
            source,
        })?;
        let thumbprint = blake3::hash(&data).to_hex().to_string();
        Ok(Certificate { thumbprint, data })
    }

    fn install(&mut self, certificate: &Certificate) -> Result<()> {
        // Remove-then-add keeps exactly one entry per thumbprint.
        self.installed
            .retain(|c| c.thumbprint != certificate.thumbprint);
        self.installed.push(certificate.clone());
        info!("installed certificate {}", certificate.thumbprint);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn cert_file(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    #[test]
    fn load_derives_stable_thumbprint() {
        let store = MemoryCertStore::new();
        let file = cert_file(b"certificate bytes");
        let first = store.load(file.path(), "password").unwrap();
        let second = store.load(file.path(), "password").unwrap();
        assert_eq!(first.thumbprint, second.thumbprint);
    }

    #[test]
    fn load_missing_file_fails() {
        let store = MemoryCertStore::new();
        let err = store
            .load(Path::new("/nonexistent/site.pfx"), "password")
            .unwrap_err();
        assert!(matches!(err, Error::CertificateRead { .. }));
    }

    #[test]
    fn reinstall_replaces_instead_of_duplicating() {
        let mut store = MemoryCertStore::new();
        let file = cert_file(b"certificate bytes");
        let cert = store.load(file.path(), "password").unwrap();

        store.install(&cert).unwrap();
        store.install(&cert).unwrap();

        assert_eq!(store.installed().len(), 1);
        assert!(store.contains(&cert.thumbprint));
    }

    #[test]
    fn different_contents_are_distinct_identities() {
        let mut store = MemoryCertStore::new();
        let a = cert_file(b"first");
        let b = cert_file(b"second");
        let cert_a = store.load(a.path(), "pw").unwrap();
        let cert_b = store.load(b.path(), "pw").unwrap();
        store.install(&cert_a).unwrap();
        store.install(&cert_b).unwrap();
        assert_eq!(store.installed().len(), 2);
    }
}
