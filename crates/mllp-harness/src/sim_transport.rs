//! Transport over turmoil's simulated network.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use mllp_core::{
    ErrorReason,
    transport::{self, Endpoint, Transport},
};
use turmoil::net::TcpStream;

/// Client transport for turmoil hosts.
///
/// Endpoint hosts are turmoil host names. Latency, loss and partitions come
/// from the simulation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TurmoilTransport;

#[async_trait]
impl Transport for TurmoilTransport {
    type Stream = TcpStream;

    async fn connect(
        &self,
        endpoint: &Endpoint,
        timeout: Duration,
    ) -> Result<TcpStream, ErrorReason> {
        let connect = TcpStream::connect((endpoint.host.as_str(), endpoint.port));
        let stream = tokio::time::timeout(timeout, connect)
            .await
            .map_err(|_| ErrorReason::Timeout)??;
        Ok(stream)
    }

    async fn send(&self, stream: &mut TcpStream, bytes: &[u8]) -> Result<(), ErrorReason> {
        transport::write_all(stream, bytes).await
    }

    async fn receive(
        &self,
        stream: &mut TcpStream,
        timeout: Option<Duration>,
    ) -> Result<Bytes, ErrorReason> {
        transport::read_chunk(stream, timeout).await
    }

    async fn close(&self, mut stream: TcpStream) {
        transport::shutdown(&mut stream).await;
    }
}
