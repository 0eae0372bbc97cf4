//! TLS configuration utilities.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use lettre::transport::smtp::client::{Certificate, TlsParameters};
use tracing::debug;

use crate::error::{Error, Result};

/// Build the TLS parameters for `domain`, trusting the certificates in
/// `cafile` on top of the built-in roots.
pub fn build_parameters(domain: &str, cafile: Option<&Path>) -> Result<TlsParameters> {
    let mut builder = TlsParameters::builder(domain.to_string());

    if let Some(path) = cafile {
        for cert in load_ca_certificates(path)? {
            builder = builder.add_root_certificate(cert);
        }
    }

    builder
        .build()
        .map_err(|e| Error::Tls(format!("cannot build TLS parameters for {domain}: {e}")))
}

fn load_ca_certificates(path: &Path) -> Result<Vec<Certificate>> {
    let file = File::open(path)
        .map_err(|e| Error::Tls(format!("cannot open CA file {}: {e}", path.display())))?;

    let ders = rustls_pemfile::certs(&mut BufReader::new(file))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| Error::Tls(format!("cannot parse CA file {}: {e}", path.display())))?;

    if ders.is_empty() {
        return Err(Error::Tls(format!(
            "no certificates found in CA file {}",
            path.display()
        )));
    }

    debug!("Loaded {} CA certificate(s) from {}", ders.len(), path.display());

    ders.into_iter()
        .map(|der| {
            Certificate::from_der(der.to_vec())
                .map_err(|e| Error::Tls(format!("invalid certificate in {}: {e}", path.display())))
        })
        .collect()
}
