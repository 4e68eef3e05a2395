//! Public client handle.

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use mllp_core::{
    ClientError, ErrorReason, ReplyTimeout,
    env::{Environment, SystemEnv},
    transport::{Endpoint, Transport},
    verifier::{AckVerifier, OutboundMessage},
};
use tokio::sync::{mpsc, oneshot};

use crate::{
    actor::{Command, MAILBOX_CAPACITY, SessionActor},
    config::ClientConfig,
    net::NetTransport,
};

/// Per-call options for [`Client::send`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Overrides the session's reply timeout for this call.
    pub reply_timeout: Option<ReplyTimeout>,
}

impl SendOptions {
    /// Wait at most `timeout` for the reply.
    #[must_use]
    pub fn reply_timeout(mut self, timeout: impl Into<ReplyTimeout>) -> Self {
        self.reply_timeout = Some(timeout.into());
        self
    }
}

/// The payload was written; no reply was awaited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Accepted;

/// Handle to a running session.
///
/// Clones share the session. The session stops when [`Client::stop`] is
/// called or when the last handle is dropped.
#[derive(Debug, Clone)]
pub struct Client {
    mailbox: mpsc::Sender<Command>,
}

impl Client {
    /// Start a session over tokio TCP, with TLS if `config.tls` is set.
    ///
    /// Must be called from within a tokio runtime. The first connection
    /// attempt happens on the session task; failures are reported through
    /// telemetry and by the next [`send`](Self::send).
    pub fn connect(endpoint: Endpoint, config: ClientConfig) -> Self {
        let transport = NetTransport::new(config.socket.clone(), config.tls.clone());
        Self::start(transport, SystemEnv, endpoint, config)
    }

    /// Start a session over any transport and environment.
    ///
    /// Only the session and telemetry parts of `config` are used; socket and
    /// TLS options belong to [`NetTransport`].
    pub fn start<T: Transport, E: Environment>(
        transport: T,
        env: E,
        endpoint: Endpoint,
        config: ClientConfig,
    ) -> Self {
        let (mailbox, commands) = mpsc::channel(MAILBOX_CAPACITY);
        let actor = SessionActor::new(
            endpoint,
            transport,
            env,
            config.session,
            Arc::clone(&config.telemetry),
            mailbox.downgrade(),
        );
        tokio::spawn(actor.run(commands));
        Self { mailbox }
    }

    /// True when a connection is attached and no reconnect is pending.
    ///
    /// A stopped session reports `false`.
    pub async fn is_connected(&self) -> bool {
        self.request(|reply| Command::IsConnected { reply }).await.unwrap_or(false)
    }

    /// Drop the current connection (if any) and connect again immediately.
    ///
    /// # Errors
    ///
    /// `Stopped` in connect context if the session is gone. Connection
    /// failures are not returned here; they are reported by the next send.
    pub async fn reconnect(&self) -> Result<(), ClientError> {
        self.request(|reply| Command::Reconnect { reply }).await
    }

    /// Send `payload` and wait for the framed reply.
    ///
    /// Returns the reply content with the envelope removed.
    ///
    /// # Errors
    ///
    /// - connect context: no connection (the last connect failure is
    ///   returned without a new attempt) or the session is stopped
    /// - send context: the write failed
    /// - receive context: timeout, invalid reply or read failure
    pub async fn send(
        &self,
        payload: impl Into<Bytes>,
        options: SendOptions,
    ) -> Result<Bytes, ClientError> {
        let payload = payload.into();
        self.request(|reply| Command::Send {
            payload,
            reply_timeout: options.reply_timeout,
            reply,
        })
        .await?
    }

    /// Send a structured message and judge the reply with `verifier`.
    ///
    /// # Errors
    ///
    /// As [`send`](Self::send). Verification outcomes are part of the
    /// verdict, not errors.
    pub async fn send_message<M, V>(
        &self,
        message: &M,
        verifier: &V,
        options: SendOptions,
    ) -> Result<V::Verdict, ClientError>
    where
        M: OutboundMessage + ?Sized,
        V: AckVerifier<M> + ?Sized,
    {
        let reply = self.send(message.to_bytes(), options).await?;
        Ok(verifier.verify(message, &reply))
    }

    /// Write `payload` without waiting for a reply.
    ///
    /// `timeout` bounds the wait for the write, including time spent queued
    /// behind other transactions.
    ///
    /// # Errors
    ///
    /// `Timeout` in send context when `timeout` elapses; otherwise as
    /// [`send`](Self::send) without the receive cases.
    pub async fn send_async(
        &self,
        payload: impl Into<Bytes>,
        timeout: Duration,
    ) -> Result<Accepted, ClientError> {
        let payload = payload.into();
        let request = self.request(|reply| Command::SendAsync { payload, reply });

        match tokio::time::timeout(timeout, request).await {
            Ok(result) => result?,
            Err(_) => Err(ClientError::send(ErrorReason::Timeout)),
        }
    }

    /// Close the connection and end the session.
    ///
    /// Any pending reconnect is cancelled. Later calls on any clone fail
    /// with `Stopped`.
    ///
    /// # Errors
    ///
    /// `Stopped` if the session had already ended.
    pub async fn stop(&self) -> Result<(), ClientError> {
        self.request(|reply| Command::Stop { reply }).await
    }

    async fn request<R>(
        &self,
        command: impl FnOnce(oneshot::Sender<R>) -> Command,
    ) -> Result<R, ClientError> {
        let (reply, response) = oneshot::channel();
        self.mailbox.send(command(reply)).await.map_err(|_| stopped())?;
        response.await.map_err(|_| stopped())
    }
}

fn stopped() -> ClientError {
    ClientError::connect(ErrorReason::Stopped)
}
