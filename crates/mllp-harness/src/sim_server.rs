//! MLLP responder for turmoil hosts.
//!
//! Accepts connections, unwraps each request frame and writes back a framed
//! reply computed from its content. Faults are opt-in: replies can be split
//! into seeded random chunks, delayed, or the connection dropped after a
//! number of replies.

use std::{sync::Arc, time::Duration};

use bytes::{Bytes, BytesMut};
use mllp_proto::{END_MARKER, ProtocolError};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use turmoil::net::{TcpListener, TcpStream};

type ReplyFn = dyn Fn(&[u8]) -> Bytes + Send + Sync;

/// Pause between chunks of a split reply, so each arrives as its own read.
const CHUNK_GAP: Duration = Duration::from_millis(1);

/// Server side of the simulation.
#[derive(Clone)]
pub struct Responder {
    port: u16,
    reply: Arc<ReplyFn>,
    reply_delay: Duration,
    chunk_seed: Option<u64>,
    close_after: Option<usize>,
}

impl Responder {
    /// Listen on `port`, answering each request with `reply(content)`.
    pub fn new<F>(port: u16, reply: F) -> Self
    where
        F: Fn(&[u8]) -> Bytes + Send + Sync + 'static,
    {
        Self {
            port,
            reply: Arc::new(reply),
            reply_delay: Duration::ZERO,
            chunk_seed: None,
            close_after: None,
        }
    }

    /// Answer every request with `MSA|AA|` followed by the request content.
    pub fn acking(port: u16) -> Self {
        Self::new(port, |content| {
            let mut ack = BytesMut::from(&b"MSA|AA|"[..]);
            ack.extend_from_slice(content);
            ack.freeze()
        })
    }

    /// Wait this long before replying.
    #[must_use]
    pub fn reply_delay(mut self, delay: Duration) -> Self {
        self.reply_delay = delay;
        self
    }

    /// Split every reply into 1 to 4 byte chunks chosen by `seed`.
    #[must_use]
    pub fn chunked(mut self, seed: u64) -> Self {
        self.chunk_seed = Some(seed);
        self
    }

    /// Drop each connection after it has sent `replies` replies.
    #[must_use]
    pub fn close_after(mut self, replies: usize) -> Self {
        self.close_after = Some(replies);
        self
    }

    /// Accept and serve connections until the simulation ends.
    ///
    /// Connections are served concurrently; a failing connection is logged
    /// and dropped without affecting the listener.
    pub async fn serve(self) -> Result<(), Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(("0.0.0.0", self.port)).await?;

        loop {
            let (stream, peer) = listener.accept().await?;
            tracing::debug!(%peer, "accepted");

            let responder = self.clone();
            tokio::spawn(async move {
                if let Err(err) = responder.serve_connection(stream).await {
                    tracing::debug!(%peer, error = %err, "connection ended");
                }
            });
        }
    }

    async fn serve_connection(&self, mut stream: TcpStream) -> std::io::Result<()> {
        let mut rng = self.chunk_seed.map(ChaCha8Rng::seed_from_u64);
        let mut buf = BytesMut::new();
        let mut replies = 0;

        loop {
            let request = match next_frame(&mut buf) {
                Some(Ok(content)) => content,
                Some(Err(err)) => {
                    return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, err));
                },
                None => {
                    if stream.read_buf(&mut buf).await? == 0 {
                        return Ok(());
                    }
                    continue;
                },
            };

            if !self.reply_delay.is_zero() {
                tokio::time::sleep(self.reply_delay).await;
            }

            let frame = mllp_proto::wrap(&(self.reply)(&request));
            match rng.as_mut() {
                Some(rng) => write_chunked(&mut stream, &frame, rng).await?,
                None => stream.write_all(&frame).await?,
            }

            replies += 1;
            if self.close_after.is_some_and(|limit| replies >= limit) {
                return stream.shutdown().await;
            }
        }
    }
}

async fn write_chunked(
    stream: &mut TcpStream,
    frame: &[u8],
    rng: &mut ChaCha8Rng,
) -> std::io::Result<()> {
    let mut rest = frame;
    while !rest.is_empty() {
        let len = rng.gen_range(1..=4).min(rest.len());
        let (chunk, tail) = rest.split_at(len);
        stream.write_all(chunk).await?;
        stream.flush().await?;
        rest = tail;
        if !rest.is_empty() {
            tokio::time::sleep(CHUNK_GAP).await;
        }
    }
    Ok(())
}

/// Split the first complete frame off `buf` and return its content.
fn next_frame(buf: &mut BytesMut) -> Option<Result<Bytes, ProtocolError>> {
    let end = buf.windows(END_MARKER.len()).position(|window| window == END_MARKER)?;
    let frame = buf.split_to(end + END_MARKER.len()).freeze();
    Some(mllp_proto::unwrap(&frame).map(|content| frame.slice_ref(content)))
}
