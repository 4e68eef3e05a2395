//! Tokio TCP transport with optional TLS.

use std::{
    io,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use mllp_core::{
    ErrorReason,
    transport::{self, Endpoint, Transport},
};
use rustls::pki_types::ServerName;
use socket2::{SockRef, TcpKeepalive};
use tokio::{
    io::{AsyncRead, AsyncWrite, ReadBuf},
    net::TcpStream,
};
use tokio_rustls::{TlsConnector, client::TlsStream};

use crate::config::{SocketOptions, TlsOptions};

/// Connected socket, plain or encrypted.
#[derive(Debug)]
pub enum NetStream {
    /// Plain TCP.
    Plain(TcpStream),
    /// TLS over TCP.
    Tls(Box<TlsStream<TcpStream>>),
}

impl AsyncRead for NetStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            Self::Tls(stream) => Pin::new(stream.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for NetStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            Self::Tls(stream) => Pin::new(stream.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_flush(cx),
            Self::Tls(stream) => Pin::new(stream.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            Self::Tls(stream) => Pin::new(stream.as_mut()).poll_shutdown(cx),
        }
    }
}

#[derive(Clone)]
struct TlsSettings {
    connector: TlsConnector,
    server_name: Option<String>,
}

/// Transport over tokio sockets.
///
/// TLS is used when constructed with [`TlsOptions`]; the session logic does
/// not know which is active.
#[derive(Clone)]
pub struct NetTransport {
    socket: SocketOptions,
    tls: Option<TlsSettings>,
}

impl NetTransport {
    /// Create a transport; `tls` selects encryption.
    pub fn new(socket: SocketOptions, tls: Option<TlsOptions>) -> Self {
        let tls = tls.map(|tls| TlsSettings {
            connector: TlsConnector::from(tls.config),
            server_name: tls.server_name,
        });
        Self { socket, tls }
    }

    /// True when connections are encrypted.
    pub fn is_tls(&self) -> bool {
        self.tls.is_some()
    }

    async fn open(&self, endpoint: &Endpoint) -> Result<NetStream, ErrorReason> {
        let tcp = TcpStream::connect((endpoint.host.as_str(), endpoint.port)).await?;
        self.tune(&tcp)?;

        let Some(tls) = &self.tls else {
            return Ok(NetStream::Plain(tcp));
        };

        let name = tls.server_name.clone().unwrap_or_else(|| endpoint.host.clone());
        let server_name =
            ServerName::try_from(name).map_err(|err| ErrorReason::Tls(err.to_string()))?;
        let stream = tls
            .connector
            .connect(server_name, tcp)
            .await
            .map_err(|err| ErrorReason::Tls(err.to_string()))?;

        Ok(NetStream::Tls(Box::new(stream)))
    }

    fn tune(&self, tcp: &TcpStream) -> io::Result<()> {
        tcp.set_nodelay(self.socket.nodelay)?;

        let socket = SockRef::from(tcp);
        if let Some(idle) = self.socket.keepalive {
            socket.set_tcp_keepalive(&TcpKeepalive::new().with_time(idle))?;
        }
        if let Some(size) = self.socket.recv_buffer_size {
            socket.set_recv_buffer_size(size)?;
        }
        if let Some(size) = self.socket.send_buffer_size {
            socket.set_send_buffer_size(size)?;
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for NetTransport {
    type Stream = NetStream;

    async fn connect(
        &self,
        endpoint: &Endpoint,
        timeout: Duration,
    ) -> Result<NetStream, ErrorReason> {
        tokio::time::timeout(timeout, self.open(endpoint))
            .await
            .map_err(|_| ErrorReason::Timeout)?
    }

    async fn send(&self, stream: &mut NetStream, bytes: &[u8]) -> Result<(), ErrorReason> {
        transport::write_all(stream, bytes).await
    }

    async fn receive(
        &self,
        stream: &mut NetStream,
        timeout: Option<Duration>,
    ) -> Result<Bytes, ErrorReason> {
        transport::read_chunk(stream, timeout).await
    }

    async fn close(&self, mut stream: NetStream) {
        transport::shutdown(&mut stream).await;
    }
}

#[cfg(test)]
mod tests {
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    use super::*;

    #[tokio::test]
    async fn plain_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 5];
            socket.read_exact(&mut buf).await.unwrap();
            socket.write_all(b"\x0bOK\x1c\x0d").await.unwrap();
            buf
        });

        let transport = NetTransport::new(SocketOptions::default(), None);
        assert!(!transport.is_tls());

        let mut stream =
            transport.connect(&Endpoint::new("127.0.0.1", port), Duration::from_secs(2)).await.unwrap();
        transport.send(&mut stream, b"\x0bHI\x1c\x0d").await.unwrap();
        let reply = transport.receive(&mut stream, Some(Duration::from_secs(2))).await.unwrap();
        transport.close(stream).await;

        assert_eq!(&server.await.unwrap(), b"\x0bHI\x1c\x0d");
        assert_eq!(&reply[..], b"\x0bOK\x1c\x0d");
    }

    #[tokio::test]
    async fn refused_connection_keeps_os_reason() {
        // Bind then drop to find a port nothing listens on.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let transport = NetTransport::new(SocketOptions::default(), None);
        let err = transport
            .connect(&Endpoint::new("127.0.0.1", port), Duration::from_secs(2))
            .await
            .unwrap_err();

        assert!(matches!(err, ErrorReason::Io { kind: io::ErrorKind::ConnectionRefused, .. }));
    }

    #[tokio::test]
    async fn keepalive_and_buffers_apply() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let accept = tokio::spawn(async move { listener.accept().await.map(|_| ()) });

        let socket = SocketOptions {
            nodelay: false,
            keepalive: Some(Duration::from_secs(30)),
            recv_buffer_size: Some(64 * 1024),
            send_buffer_size: Some(64 * 1024),
        };
        let transport = NetTransport::new(socket, None);
        let stream =
            transport.connect(&Endpoint::new("127.0.0.1", port), Duration::from_secs(2)).await;

        assert!(matches!(stream, Ok(NetStream::Plain(_))));
        accept.await.unwrap().unwrap();
    }
}
