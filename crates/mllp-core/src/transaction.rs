//! Framed send/receive engine.
//!
//! One transaction is: wrap the payload, write it in a single transport
//! call, then read until the accumulated bytes form a complete frame, the
//! reply budget runs out, or something fails.
//!
//! The engine does not touch session state. The runtime inspects the
//! returned error's context and drives the matching lifecycle transition
//! (`send_failed` or `receive_failed`).

use bytes::{Bytes, BytesMut};
use mllp_proto::FrameStatus;

use crate::{
    budget::TimeBudget,
    config::ReplyTimeout,
    env::Environment,
    error::{ClientError, ErrorReason},
    transport::Transport,
};

/// Wrap `payload` and write it.
///
/// # Errors
///
/// Any transport failure, in send context.
pub async fn send_request<T: Transport>(
    transport: &T,
    stream: &mut T::Stream,
    payload: &[u8],
) -> Result<(), ClientError> {
    let frame = mllp_proto::wrap(payload);
    transport.send(stream, &frame).await.map_err(ClientError::send)
}

/// Read until a complete frame has been assembled.
///
/// Returns the whole frame, envelope included.
///
/// # Errors
///
/// All in receive context:
/// - `Timeout` once the budget is exhausted (no further read is issued)
/// - `InvalidReply` as soon as the buffer does not start with the marker
/// - the transport's own reason for a failed read
pub async fn receive_reply<T: Transport, E: Environment>(
    transport: &T,
    env: &E,
    stream: &mut T::Stream,
    timeout: ReplyTimeout,
) -> Result<Bytes, ClientError> {
    let mut budget = TimeBudget::new(timeout);
    let mut buf = BytesMut::new();

    loop {
        if budget.is_exhausted() {
            return Err(ClientError::receive(ErrorReason::Timeout));
        }

        let started = env.now();
        let chunk = transport
            .receive(stream, budget.read_timeout())
            .await
            .map_err(ClientError::receive)?;
        let elapsed = env.now().saturating_duration_since(started);

        buf.extend_from_slice(&chunk);

        match mllp_proto::inspect(&buf) {
            FrameStatus::Complete => return Ok(buf.freeze()),
            FrameStatus::Incomplete => {
                budget.charge(elapsed);
                tracing::trace!(
                    buffered = buf.len(),
                    remaining_us = ?budget.remaining_micros(),
                    owed_us = budget.owed_micros(),
                    "partial reply"
                );
            },
            FrameStatus::Invalid => return Err(ClientError::receive(ErrorReason::InvalidReply)),
        }
    }
}

/// Send `payload` and return the content of the framed reply.
///
/// # Errors
///
/// Send-context errors from [`send_request`] (no read is attempted), or
/// receive-context errors from [`receive_reply`].
pub async fn transact<T: Transport, E: Environment>(
    transport: &T,
    env: &E,
    stream: &mut T::Stream,
    payload: &[u8],
    timeout: ReplyTimeout,
) -> Result<Bytes, ClientError> {
    send_request(transport, stream, payload).await?;
    let frame = receive_reply(transport, env, stream, timeout).await?;
    content(&frame)
}

/// Strip the envelope from a complete frame without copying.
fn content(frame: &Bytes) -> Result<Bytes, ClientError> {
    let len = mllp_proto::unwrap(frame)
        .map_err(|_| ClientError::receive(ErrorReason::InvalidReply))?
        .len();
    Ok(frame.slice(1..1 + len))
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::Mutex,
        time::{Duration, Instant, SystemTime},
    };

    use async_trait::async_trait;

    use super::*;
    use crate::{error::ErrorContext, transport::Endpoint};

    /// One scripted read.
    struct Read {
        delay: Duration,
        result: Result<&'static [u8], ErrorReason>,
    }

    fn after(ms: u64, bytes: &'static [u8]) -> Read {
        Read { delay: Duration::from_millis(ms), result: Ok(bytes) }
    }

    /// Transport whose single stream replays scripted reads on tokio time.
    #[derive(Default)]
    struct Scripted {
        reads: Mutex<VecDeque<Read>>,
        written: Mutex<Vec<u8>>,
        read_calls: Mutex<usize>,
        fail_send: bool,
    }

    impl Scripted {
        fn with_reads(reads: Vec<Read>) -> Self {
            Self { reads: Mutex::new(reads.into()), ..Default::default() }
        }

        fn read_calls(&self) -> usize {
            *self.read_calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        type Stream = ();

        async fn connect(&self, _: &Endpoint, _: Duration) -> Result<(), ErrorReason> {
            Ok(())
        }

        async fn send(&self, _: &mut (), bytes: &[u8]) -> Result<(), ErrorReason> {
            if self.fail_send {
                return Err(ErrorReason::Closed);
            }
            self.written.lock().unwrap().extend_from_slice(bytes);
            Ok(())
        }

        async fn receive(
            &self,
            _: &mut (),
            timeout: Option<Duration>,
        ) -> Result<Bytes, ErrorReason> {
            *self.read_calls.lock().unwrap() += 1;
            let next = self.reads.lock().unwrap().pop_front();
            let Some(read) = next else {
                match timeout {
                    Some(timeout) => {
                        tokio::time::sleep(timeout).await;
                        return Err(ErrorReason::Timeout);
                    },
                    None => return std::future::pending().await,
                }
            };

            if let Some(timeout) = timeout {
                if read.delay > timeout {
                    tokio::time::sleep(timeout).await;
                    return Err(ErrorReason::Timeout);
                }
            }
            tokio::time::sleep(read.delay).await;
            read.result.map(Bytes::from_static)
        }

        async fn close(&self, _: ()) {}
    }

    /// Environment reading tokio's (pausable) clock.
    #[derive(Clone, Default)]
    struct PausedEnv;

    impl Environment for PausedEnv {
        fn now(&self) -> Instant {
            tokio::time::Instant::now().into_std()
        }

        fn wall_clock(&self) -> SystemTime {
            SystemTime::UNIX_EPOCH
        }

        fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
            tokio::time::sleep(duration)
        }
    }

    fn secs(n: u64) -> ReplyTimeout {
        ReplyTimeout::After(Duration::from_secs(n))
    }

    #[tokio::test(start_paused = true)]
    async fn single_read_reply() {
        let transport = Scripted::with_reads(vec![after(5, b"\x0bMSA|AA\x1c\x0d")]);
        let reply = transact(&transport, &PausedEnv, &mut (), b"MSH|1", secs(1))
            .await
            .unwrap();

        assert_eq!(&reply[..], b"MSA|AA");
        assert_eq!(&transport.written.lock().unwrap()[..], b"\x0bMSH|1\x1c\x0d");
    }

    #[tokio::test(start_paused = true)]
    async fn chunked_reply_is_reassembled() {
        let transport =
            Scripted::with_reads(vec![after(10, b"\x0bA"), after(10, b"B\x1c"), after(10, b"\x0d")]);
        let reply =
            transact(&transport, &PausedEnv, &mut (), b"x", secs(1)).await.unwrap();

        assert_eq!(&reply[..], b"AB");
        assert_eq!(transport.read_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_content_reply() {
        let transport = Scripted::with_reads(vec![after(0, b"\x0b\x1c\x0d")]);
        let reply =
            transact(&transport, &PausedEnv, &mut (), b"x", secs(1)).await.unwrap();
        assert!(reply.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_first_byte_fails_without_waiting() {
        let transport = Scripted::with_reads(vec![after(1, b"HTTP/1.1 400")]);
        let started = tokio::time::Instant::now();

        let err = transact(&transport, &PausedEnv, &mut (), b"x", secs(60))
            .await
            .unwrap_err();

        assert_eq!(err, ClientError::receive(ErrorReason::InvalidReply));
        assert_eq!(transport.read_calls(), 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn silent_peer_times_out_within_budget() {
        let transport = Scripted::default();
        let started = tokio::time::Instant::now();

        let err = transact(&transport, &PausedEnv, &mut (), b"x", secs(2))
            .await
            .unwrap_err();

        assert_eq!(err.context, ErrorContext::Receive);
        assert!(err.is_timeout());
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn trickling_partial_frame_hits_deadline() {
        // Each chunk keeps the frame incomplete and costs 30ms of a 100ms budget.
        let mut reads = vec![after(0, b"\x0b")];
        reads.extend((0..10).map(|_| after(30, b"A")));
        let transport = Scripted::with_reads(reads);
        let started = tokio::time::Instant::now();

        let err = transact(
            &transport,
            &PausedEnv,
            &mut (),
            b"x",
            ReplyTimeout::After(Duration::from_millis(100)),
        )
        .await
        .unwrap_err();

        assert!(err.is_timeout());
        assert!(started.elapsed() <= Duration::from_millis(100));
        // Marker, then three 30ms chunks, then a read that runs out the last 10ms.
        assert_eq!(transport.read_calls(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn infinite_timeout_does_not_time_out() {
        let transport = Scripted::default();
        let env = PausedEnv;
        let mut stream = ();

        let pending =
            transact(&transport, &env, &mut stream, b"x", ReplyTimeout::Infinite);
        let outcome = tokio::time::timeout(Duration::from_secs(600), pending).await;
        assert!(outcome.is_err(), "no reply and no deadline must keep waiting");
    }

    #[tokio::test(start_paused = true)]
    async fn send_failure_skips_receive() {
        let transport = Scripted { fail_send: true, ..Default::default() };

        let err = transact(&transport, &PausedEnv, &mut (), b"x", secs(1))
            .await
            .unwrap_err();

        assert_eq!(err, ClientError::send(ErrorReason::Closed));
        assert_eq!(transport.read_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_read_error_is_propagated() {
        let transport = Scripted::with_reads(vec![Read {
            delay: Duration::ZERO,
            result: Err(ErrorReason::Closed),
        }]);

        let err = transact(&transport, &PausedEnv, &mut (), b"x", secs(1))
            .await
            .unwrap_err();

        assert_eq!(err, ClientError::receive(ErrorReason::Closed));
    }
}
