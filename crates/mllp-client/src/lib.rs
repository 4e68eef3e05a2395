//! Persistent MLLP client.
//!
//! A [`Client`] is a cheap, cloneable handle to a session task that owns one
//! logical connection to an MLLP endpoint. The task connects on start,
//! reconnects on failure according to the configured policy, and serves
//! transactions strictly one at a time in the order they were submitted.
//!
//! ```no_run
//! # async fn demo() -> Result<(), mllp_client::ClientError> {
//! use mllp_client::{Client, ClientConfig, Endpoint, SendOptions};
//!
//! let client = Client::connect(Endpoint::new("127.0.0.1", 2575), ClientConfig::default());
//! let ack = client.send("MSH|^~\\&|...", SendOptions::default()).await?;
//! client.stop().await?;
//! # let _ = ack;
//! # Ok(())
//! # }
//! ```
//!
//! # Components
//!
//! - [`Client`]: Public handle (send, reconnect, stop)
//! - [`ClientConfig`]: Session, socket, TLS and telemetry options
//! - [`NetTransport`]: Tokio TCP transport with optional rustls encryption

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod actor;
mod client;
mod config;
mod net;

pub use client::{Accepted, Client, SendOptions};
pub use config::{ClientConfig, SocketOptions, TlsOptions};
pub use mllp_core::{
    ClientError, ErrorContext, ErrorReason, ReplyTimeout, SessionConfig,
    env::{Environment, SystemEnv},
    telemetry::{NoopTelemetry, Telemetry, TelemetryEvent, TracingTelemetry},
    transport::{Endpoint, Transport},
    verifier::{AckVerifier, OutboundMessage},
};
pub use net::{NetStream, NetTransport};
