//! Command-line arguments.

use std::{
    fs,
    io::{self, Read},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use bytes::Bytes;
use clap::Parser;
use mllp_client::{
    ClientConfig, Endpoint, NoopTelemetry, ReplyTimeout, SessionConfig, SocketOptions,
    Telemetry, TlsOptions, TracingTelemetry,
};

use crate::{error::CliError, message, tls};

/// Send HL7 messages to an MLLP endpoint and print the replies.
#[derive(Debug, Clone, Parser)]
#[command(name = "mllp-send", version)]
pub struct Args {
    /// Endpoint host name or address
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Endpoint port
    #[arg(short, long, default_value_t = 2575)]
    pub port: u16,

    /// Reply timeout in milliseconds; 0 waits forever
    #[arg(long, default_value_t = 60_000)]
    pub timeout_ms: u64,

    /// Connect timeout in milliseconds
    #[arg(long, default_value_t = 2_000)]
    pub connect_timeout_ms: u64,

    /// Reconnect at a fixed interval instead of backing off
    #[arg(long)]
    pub no_backoff: bool,

    /// Fixed reconnect interval in milliseconds (with --no-backoff)
    #[arg(long, default_value_t = 1_000)]
    pub reconnect_interval_ms: u64,

    /// Upper bound on the backoff delay in seconds
    #[arg(long, default_value_t = 180)]
    pub backoff_max_secs: u64,

    /// Keep the connection after a failed or invalid reply
    #[arg(long)]
    pub keep_on_recv_error: bool,

    /// Enable TCP keepalive after this many idle seconds
    #[arg(long)]
    pub keepalive_secs: Option<u64>,

    /// Connect with TLS
    #[arg(long)]
    pub tls: bool,

    /// PEM file with trusted CA certificates (default: bundled roots)
    #[arg(long, requires = "tls")]
    pub ca: Option<PathBuf>,

    /// Name to verify the server certificate against (default: --host)
    #[arg(long, requires = "tls")]
    pub server_name: Option<String>,

    /// Write each message without waiting for its reply
    #[arg(long = "async")]
    pub fire_and_forget: bool,

    /// Send the whole batch this many times
    #[arg(long, default_value_t = 1)]
    pub repeat: u32,

    /// Send file contents as-is, without rewriting line endings
    #[arg(long)]
    pub raw: bool,

    /// Log connection status changes
    #[arg(short, long)]
    pub verbose: bool,

    /// Message files, one message each; standard input when omitted
    pub files: Vec<PathBuf>,
}

impl Args {
    /// Target endpoint.
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port)
    }

    /// Reply deadline.
    pub fn reply_timeout(&self) -> ReplyTimeout {
        match self.timeout_ms {
            0 => ReplyTimeout::Infinite,
            ms => ReplyTimeout::After(Duration::from_millis(ms)),
        }
    }

    /// Session policy from the flags.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            auto_reconnect_interval: Duration::from_millis(self.reconnect_interval_ms),
            use_backoff: !self.no_backoff,
            backoff_max: Duration::from_secs(self.backoff_max_secs),
            reply_timeout: self.reply_timeout(),
            close_on_recv_error: !self.keep_on_recv_error,
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
        }
    }

    /// Complete client configuration, loading trust roots for `--tls`.
    pub fn client_config(&self) -> Result<ClientConfig, CliError> {
        let tls = if self.tls {
            let roots = tls::load_roots(self.ca.as_deref())?;
            let options = TlsOptions::with_roots(roots)
                .map_err(|reason| CliError::TlsSetup(reason.describe()))?;
            Some(match &self.server_name {
                Some(name) => options.server_name(name.clone()),
                None => options,
            })
        } else {
            None
        };

        let telemetry: Arc<dyn Telemetry> =
            if self.verbose { Arc::new(TracingTelemetry) } else { Arc::new(NoopTelemetry) };

        Ok(ClientConfig {
            session: self.session_config(),
            socket: SocketOptions {
                keepalive: self.keepalive_secs.map(Duration::from_secs),
                ..SocketOptions::default()
            },
            tls,
            telemetry,
        })
    }

    /// Read the messages to send.
    pub fn load_messages(&self) -> Result<Vec<Bytes>, CliError> {
        let mut messages = Vec::with_capacity(self.files.len().max(1));

        if self.files.is_empty() {
            let mut input = Vec::new();
            io::stdin()
                .read_to_end(&mut input)
                .map_err(|source| CliError::Read { path: PathBuf::from("<stdin>"), source })?;
            messages.push(self.prepare(&input));
        }
        for path in &self.files {
            let input =
                fs::read(path).map_err(|source| CliError::Read { path: path.clone(), source })?;
            messages.push(self.prepare(&input));
        }

        messages.retain(|message| !message.is_empty());
        if messages.is_empty() {
            return Err(CliError::Empty);
        }
        Ok(messages)
    }

    fn prepare(&self, input: &[u8]) -> Bytes {
        if self.raw { Bytes::copy_from_slice(input) } else { message::normalize(input) }
    }
}
