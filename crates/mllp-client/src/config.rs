//! Client configuration.

use std::{fmt, sync::Arc, time::Duration};

use mllp_core::{
    ErrorReason, SessionConfig,
    telemetry::{NoopTelemetry, Telemetry},
};
use rustls::RootCertStore;

/// Socket-level tuning for the TCP transport.
///
/// Framing, buffering and blocking behaviour are fixed by the transport: the
/// socket always carries raw bytes and is read through the async runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketOptions {
    /// Disable Nagle's algorithm.
    pub nodelay: bool,
    /// Enable TCP keepalive probes after this much idle time.
    pub keepalive: Option<Duration>,
    /// Kernel receive buffer size.
    pub recv_buffer_size: Option<usize>,
    /// Kernel send buffer size.
    pub send_buffer_size: Option<usize>,
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self { nodelay: true, keepalive: None, recv_buffer_size: None, send_buffer_size: None }
    }
}

/// TLS settings. Their presence selects the encrypted transport.
#[derive(Debug, Clone)]
pub struct TlsOptions {
    /// rustls client configuration (trust roots, client auth, ALPN).
    pub config: Arc<rustls::ClientConfig>,
    /// Name to verify the server certificate against. Defaults to the
    /// endpoint host.
    pub server_name: Option<String>,
}

impl TlsOptions {
    /// Use an existing rustls configuration.
    pub fn new(config: Arc<rustls::ClientConfig>) -> Self {
        Self { config, server_name: None }
    }

    /// Build a configuration trusting `roots`, without client authentication.
    ///
    /// # Errors
    ///
    /// Returns `Tls` if the crypto provider rejects the default protocol
    /// versions.
    pub fn with_roots(roots: RootCertStore) -> Result<Self, ErrorReason> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = rustls::ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|err| ErrorReason::Tls(err.to_string()))?
            .with_root_certificates(roots)
            .with_no_client_auth();
        Ok(Self::new(Arc::new(config)))
    }

    /// Verify the server certificate against `name` instead of the host.
    #[must_use]
    pub fn server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = Some(name.into());
        self
    }
}

/// Complete client configuration.
#[derive(Clone)]
pub struct ClientConfig {
    /// Reconnect, timeout and error-handling policy.
    pub session: SessionConfig,
    /// TCP socket tuning.
    pub socket: SocketOptions,
    /// TLS settings; `None` selects plain TCP.
    pub tls: Option<TlsOptions>,
    /// Telemetry sink.
    pub telemetry: Arc<dyn Telemetry>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            socket: SocketOptions::default(),
            tls: None,
            telemetry: Arc::new(NoopTelemetry),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("session", &self.session)
            .field("socket", &self.socket)
            .field("tls", &self.tls.is_some())
            .finish_non_exhaustive()
    }
}
