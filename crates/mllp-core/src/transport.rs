//! Transport abstraction for MLLP sessions.
//!
//! Abstracts over byte-stream transports. Production uses tokio TCP or TLS
//! sockets, tests use scripted streams or turmoil's simulated TCP.
//!
//! The trait deliberately works on an owned stream handle rather than on
//! `self`: the session owns exactly one handle at a time and passes it in
//! for each operation, so reconnecting is just dropping one handle and
//! obtaining another.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ErrorReason;

/// Read buffer size for a single receive.
pub const READ_CHUNK: usize = 8 * 1024;

/// Remote address of a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Hostname or IP literal.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Endpoint {
    /// Create an endpoint.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Connect, send, receive and close over some byte-stream transport.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Connected stream handle.
    type Stream: Send + 'static;

    /// Open a connection, giving up after `timeout`.
    async fn connect(
        &self,
        endpoint: &Endpoint,
        timeout: Duration,
    ) -> Result<Self::Stream, ErrorReason>;

    /// Write all of `bytes`.
    async fn send(&self, stream: &mut Self::Stream, bytes: &[u8]) -> Result<(), ErrorReason>;

    /// Read whatever is available, waiting at most `timeout` (`None` waits
    /// indefinitely).
    ///
    /// Returns at least one byte. A closed peer is [`ErrorReason::Closed`],
    /// an elapsed timeout is [`ErrorReason::Timeout`].
    async fn receive(
        &self,
        stream: &mut Self::Stream,
        timeout: Option<Duration>,
    ) -> Result<Bytes, ErrorReason>;

    /// Close the connection.
    async fn close(&self, stream: Self::Stream);
}

/// Write `bytes` to an async stream and flush it.
///
/// Shared by transports built on tokio streams.
pub async fn write_all<S>(stream: &mut S, bytes: &[u8]) -> Result<(), ErrorReason>
where
    S: AsyncWrite + Unpin + Send,
{
    stream.write_all(bytes).await?;
    stream.flush().await?;
    Ok(())
}

/// Read one chunk from an async stream, bounded by `timeout`.
///
/// Shared by transports built on tokio streams.
pub async fn read_chunk<S>(stream: &mut S, timeout: Option<Duration>) -> Result<Bytes, ErrorReason>
where
    S: AsyncRead + Unpin + Send,
{
    let mut buf = vec![0u8; READ_CHUNK];
    let read = match timeout {
        Some(timeout) => tokio::time::timeout(timeout, stream.read(&mut buf))
            .await
            .map_err(|_| ErrorReason::Timeout)??,
        None => stream.read(&mut buf).await?,
    };

    if read == 0 {
        return Err(ErrorReason::Closed);
    }

    buf.truncate(read);
    Ok(Bytes::from(buf))
}

/// Shut down the write half of an async stream, ignoring errors.
pub async fn shutdown<S>(stream: &mut S)
where
    S: AsyncWrite + Unpin + Send,
{
    if let Err(err) = stream.shutdown().await {
        tracing::debug!(error = %err, "shutdown failed on close");
    }
}
