//! TLS configuration with on-demand certificate loading.
//!
//! Certificates are looked up by SNI host name, only for hosts on the
//! allow-list, from `<cache_dir>/<host>.crt` and `<cache_dir>/<host>.key`.
//! Each is loaded on the first handshake for that host and cached.

use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;
use dashmap::DashMap;
use rustls::server::{ClientHello, ResolvesServerCert};
use rustls::sign::CertifiedKey;
use thiserror::Error;

/// Errors raised while preparing TLS.
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no certificate found in {0}")]
    NoCertificate(String),

    #[error("no private key found in {0}")]
    NoPrivateKey(String),

    #[error("host '{0}' is not on the allow-list")]
    HostNotAllowed(String),

    #[error("rustls error: {0}")]
    Rustls(#[from] rustls::Error),
}

fn read_pem(path: &Path) -> Result<BufReader<File>, TlsError> {
    File::open(path).map(BufReader::new).map_err(|source| TlsError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Resolves certificates per host name on demand.
pub struct OnDemandCertResolver {
    allowed_hosts: HashSet<String>,
    cache_dir: PathBuf,
    loaded: DashMap<String, Arc<CertifiedKey>>,
}

impl fmt::Debug for OnDemandCertResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnDemandCertResolver")
            .field("allowed_hosts", &self.allowed_hosts)
            .field("cache_dir", &self.cache_dir)
            .field("loaded", &self.loaded.len())
            .finish()
    }
}

impl OnDemandCertResolver {
    pub fn new(allowed_hosts: &[String], cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            allowed_hosts: allowed_hosts.iter().map(|h| h.to_ascii_lowercase()).collect(),
            cache_dir: cache_dir.into(),
            loaded: DashMap::new(),
        }
    }

    pub fn is_allowed(&self, host: &str) -> bool {
        self.allowed_hosts.contains(&host.to_ascii_lowercase())
    }

    /// Certificate for `host`, loading it from the cache directory on first use.
    pub fn certificate_for(&self, host: &str) -> Result<Arc<CertifiedKey>, TlsError> {
        let host = host.to_ascii_lowercase();
        if !self.allowed_hosts.contains(&host) {
            return Err(TlsError::HostNotAllowed(host));
        }
        if let Some(key) = self.loaded.get(&host) {
            return Ok(key.value().clone());
        }

        let key = Arc::new(self.load(&host)?);
        self.loaded.insert(host.clone(), key.clone());
        tracing::info!(host = %host, "Certificate loaded");
        Ok(key)
    }

    fn load(&self, host: &str) -> Result<CertifiedKey, TlsError> {
        let cert_path = self.cache_dir.join(format!("{}.crt", host));
        let key_path = self.cache_dir.join(format!("{}.key", host));

        let certs = rustls_pemfile::certs(&mut read_pem(&cert_path)?)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| TlsError::Io {
                path: cert_path.display().to_string(),
                source,
            })?;
        if certs.is_empty() {
            return Err(TlsError::NoCertificate(cert_path.display().to_string()));
        }

        let key = rustls_pemfile::private_key(&mut read_pem(&key_path)?)
            .map_err(|source| TlsError::Io {
                path: key_path.display().to_string(),
                source,
            })?
            .ok_or_else(|| TlsError::NoPrivateKey(key_path.display().to_string()))?;

        let signing_key = rustls::crypto::aws_lc_rs::sign::any_supported_type(&key)?;
        Ok(CertifiedKey::new(certs, signing_key))
    }
}

impl ResolvesServerCert for OnDemandCertResolver {
    fn resolve(&self, client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        let host = client_hello.server_name()?;
        match self.certificate_for(host) {
            Ok(key) => Some(key),
            Err(TlsError::HostNotAllowed(host)) => {
                tracing::debug!(host = %host, "Handshake for host outside the allow-list");
                None
            }
            Err(e) => {
                tracing::warn!(host = %host, error = %e, "Certificate unavailable");
                None
            }
        }
    }
}

/// Build an axum-server TLS config backed by an on-demand resolver.
pub fn server_config(resolver: OnDemandCertResolver) -> Result<RustlsConfig, TlsError> {
    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let mut config = rustls::ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_cert_resolver(Arc::new(resolver));
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
    Ok(RustlsConfig::from_config(Arc::new(config)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_is_case_insensitive() {
        let resolver = OnDemandCertResolver::new(&["Example.org".to_string()], "/nonexistent");
        assert!(resolver.is_allowed("example.ORG"));
        assert!(!resolver.is_allowed("evil.example"));
    }

    #[test]
    fn disallowed_host_is_rejected_before_disk() {
        let resolver = OnDemandCertResolver::new(&["example.org".to_string()], "/nonexistent");
        assert!(matches!(
            resolver.certificate_for("evil.example"),
            Err(TlsError::HostNotAllowed(_))
        ));
    }

    #[test]
    fn missing_and_empty_certificates() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = OnDemandCertResolver::new(&["example.org".to_string()], dir.path());
        assert!(matches!(
            resolver.certificate_for("example.org"),
            Err(TlsError::Io { .. })
        ));

        std::fs::write(dir.path().join("example.org.crt"), "not a pem").unwrap();
        assert!(matches!(
            resolver.certificate_for("example.org"),
            Err(TlsError::NoCertificate(_))
        ));
    }

    #[test]
    fn builds_server_config() {
        let resolver = OnDemandCertResolver::new(&["example.org".to_string()], "/nonexistent");
        assert!(server_config(resolver).is_ok());
    }
}
