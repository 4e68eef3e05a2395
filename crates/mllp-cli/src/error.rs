//! CLI errors.

use std::{io, path::PathBuf};

use mllp_client::ClientError;
use thiserror::Error;

/// Anything that stops `mllp-send`.
#[derive(Debug, Error)]
pub enum CliError {
    /// A message or certificate file could not be read.
    #[error("cannot read {path}: {source}")]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// A CA file held no certificates.
    #[error("no certificates found in {0}")]
    NoCertificates(PathBuf),

    /// A certificate was rejected by the trust store.
    #[error("invalid certificate in {path}: {detail}")]
    InvalidCertificate {
        /// File holding the certificate.
        path: PathBuf,
        /// Reason from rustls.
        detail: String,
    },

    /// The TLS client configuration could not be built.
    #[error("tls setup failed: {0}")]
    TlsSetup(String),

    /// Nothing to send.
    #[error("no message to send")]
    Empty,

    /// The session failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Writing output failed.
    #[error("cannot write output: {0}")]
    Output(#[from] io::Error),
}
