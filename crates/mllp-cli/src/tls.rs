//! Trust roots for `--tls`.

use std::{fs::File, io::BufReader, path::Path};

use rustls::RootCertStore;

use crate::error::CliError;

/// Certificates from a PEM file, or the bundled Mozilla roots when `ca` is
/// `None`.
pub fn load_roots(ca: Option<&Path>) -> Result<RootCertStore, CliError> {
    let mut roots = RootCertStore::empty();

    let Some(path) = ca else {
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        return Ok(roots);
    };

    let read_err = |source| CliError::Read { path: path.to_path_buf(), source };
    let mut reader = BufReader::new(File::open(path).map_err(read_err)?);

    for cert in rustls_pemfile::certs(&mut reader) {
        let cert = cert.map_err(read_err)?;
        roots.add(cert).map_err(|err| CliError::InvalidCertificate {
            path: path.to_path_buf(),
            detail: err.to_string(),
        })?;
    }

    if roots.is_empty() {
        return Err(CliError::NoCertificates(path.to_path_buf()));
    }
    tracing::debug!(path = %path.display(), roots = roots.len(), "loaded trust roots");
    Ok(roots)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn bundled_roots_by_default() {
        let roots = load_roots(None).unwrap();
        assert!(!roots.is_empty());
    }

    #[test]
    fn pem_without_certificates_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not a certificate").unwrap();

        let err = load_roots(Some(file.path())).unwrap_err();
        assert!(matches!(err, CliError::NoCertificates(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_roots(Some(Path::new("/nonexistent/ca.pem"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/ca.pem"));
    }
}
