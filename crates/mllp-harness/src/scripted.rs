//! Scripted in-memory transport.
//!
//! Connect outcomes, reads and send failures are queued up front; the
//! transport replays them in order on tokio's clock and records what the
//! session did. Unscripted connects succeed, unscripted sends succeed, and
//! an unscripted read behaves like a silent peer.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use mllp_core::{
    ErrorReason,
    transport::{Endpoint, Transport},
};

/// One scripted read.
#[derive(Debug, Clone)]
pub struct ScriptedRead {
    /// Time the peer takes to produce this chunk.
    pub delay: Duration,
    /// Chunk or failure.
    pub result: Result<Bytes, ErrorReason>,
}

impl ScriptedRead {
    /// Raw bytes after `delay`.
    pub fn chunk(delay: Duration, bytes: impl Into<Bytes>) -> Self {
        Self { delay, result: Ok(bytes.into()) }
    }

    /// A complete frame around `content`, immediately.
    pub fn reply(content: &[u8]) -> Self {
        Self::chunk(Duration::ZERO, mllp_proto::wrap(content))
    }

    /// A read failure after `delay`.
    pub fn fail(delay: Duration, reason: ErrorReason) -> Self {
        Self { delay, result: Err(reason) }
    }
}

/// Handle to one scripted connection.
#[derive(Debug)]
pub struct ScriptedStream {
    id: usize,
}

impl ScriptedStream {
    /// Connection number, starting at 1 for the first successful connect.
    pub fn id(&self) -> usize {
        self.id
    }
}

#[derive(Debug, Default)]
struct Script {
    connects: VecDeque<Result<(), ErrorReason>>,
    reads: VecDeque<ScriptedRead>,
    send_failures: VecDeque<ErrorReason>,
    connect_attempts: usize,
    opened: usize,
    closed: Vec<usize>,
    sent: Vec<Bytes>,
}

/// In-memory transport with a shared script. Clones share state, so a test
/// keeps one clone to drive and inspect while the session owns the other.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    /// Create a transport where everything succeeds and peers stay silent.
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue the outcome of the next unscripted connect.
    pub fn push_connect(&self, outcome: Result<(), ErrorReason>) {
        self.script().connects.push_back(outcome);
    }

    /// Fail the next `count` connects with `reason`.
    pub fn fail_connects(&self, count: usize, reason: &ErrorReason) {
        let mut script = self.script();
        for _ in 0..count {
            script.connects.push_back(Err(reason.clone()));
        }
    }

    /// Queue a read.
    pub fn push_read(&self, read: ScriptedRead) {
        self.script().reads.push_back(read);
    }

    /// Fail the next send with `reason`.
    pub fn fail_next_send(&self, reason: ErrorReason) {
        self.script().send_failures.push_back(reason);
    }

    /// Connect calls so far, successful or not.
    pub fn connect_attempts(&self) -> usize {
        self.script().connect_attempts
    }

    /// Connections opened and not yet closed.
    pub fn open_connections(&self) -> usize {
        let script = self.script();
        script.opened - script.closed.len()
    }

    /// Ids of closed connections, in closing order.
    pub fn closed(&self) -> Vec<usize> {
        self.script().closed.clone()
    }

    /// Frames written successfully, envelope included.
    pub fn sent(&self) -> Vec<Bytes> {
        self.script().sent.clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    type Stream = ScriptedStream;

    async fn connect(
        &self,
        endpoint: &Endpoint,
        _timeout: Duration,
    ) -> Result<ScriptedStream, ErrorReason> {
        let mut script = self.script();
        script.connect_attempts += 1;
        script.connects.pop_front().unwrap_or(Ok(()))?;
        script.opened += 1;

        tracing::trace!(%endpoint, id = script.opened, "scripted connect");
        Ok(ScriptedStream { id: script.opened })
    }

    async fn send(&self, _stream: &mut ScriptedStream, bytes: &[u8]) -> Result<(), ErrorReason> {
        let mut script = self.script();
        if let Some(reason) = script.send_failures.pop_front() {
            return Err(reason);
        }
        script.sent.push(Bytes::copy_from_slice(bytes));
        Ok(())
    }

    async fn receive(
        &self,
        _stream: &mut ScriptedStream,
        timeout: Option<Duration>,
    ) -> Result<Bytes, ErrorReason> {
        let next = self.script().reads.pop_front();

        let Some(read) = next else {
            return match timeout {
                Some(timeout) => {
                    tokio::time::sleep(timeout).await;
                    Err(ErrorReason::Timeout)
                },
                None => std::future::pending().await,
            };
        };

        if let Some(timeout) = timeout {
            if read.delay > timeout {
                tokio::time::sleep(timeout).await;
                return Err(ErrorReason::Timeout);
            }
        }
        tokio::time::sleep(read.delay).await;
        read.result
    }

    async fn close(&self, stream: ScriptedStream) {
        self.script().closed.push(stream.id);
    }
}
