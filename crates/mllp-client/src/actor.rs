//! Session task.
//!
//! One task per session consumes a mailbox of [`Command`]s and is the only
//! code that touches the transport handle. It feeds the pure
//! [`Session`] state machine and executes the actions it returns. Commands
//! are handled to completion one at a time, so a transaction always owns the
//! handle exclusively and a reconnect can never interleave with it.

use std::{collections::VecDeque, sync::Arc, time::Duration};

use bytes::Bytes;
use mllp_core::{
    ClientError, ErrorContext, ErrorReason, ReplyTimeout, Session, SessionAction, SessionConfig,
    backoff::TimerToken,
    env::Environment,
    telemetry::{Telemetry, TelemetryEvent, TelemetryKind},
    transaction,
    transport::{Endpoint, Transport},
};
use tokio::{sync::mpsc, sync::oneshot, task::JoinHandle};

use crate::client::Accepted;

/// Mailbox capacity; senders wait when it is full.
pub(crate) const MAILBOX_CAPACITY: usize = 64;

/// Requests accepted by the session task.
pub(crate) enum Command {
    Send {
        payload: Bytes,
        reply_timeout: Option<ReplyTimeout>,
        reply: oneshot::Sender<Result<Bytes, ClientError>>,
    },
    SendAsync {
        payload: Bytes,
        reply: oneshot::Sender<Result<Accepted, ClientError>>,
    },
    Reconnect {
        reply: oneshot::Sender<()>,
    },
    IsConnected {
        reply: oneshot::Sender<bool>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
    TimerFired(TimerToken),
}

/// The single armed reconnect timer. Aborted on drop, so the timer never
/// outlives the session on any exit path.
#[derive(Default)]
struct ReconnectTimer {
    armed: Option<(TimerToken, JoinHandle<()>)>,
}

impl ReconnectTimer {
    fn arm<E: Environment>(
        &mut self,
        token: TimerToken,
        delay: Duration,
        env: E,
        mailbox: mpsc::WeakSender<Command>,
    ) {
        self.disarm();
        let task = tokio::spawn(async move {
            env.sleep(delay).await;
            if let Some(mailbox) = mailbox.upgrade() {
                let _ = mailbox.send(Command::TimerFired(token)).await;
            }
        });
        self.armed = Some((token, task));
    }

    fn cancel(&mut self, token: TimerToken) {
        if self.armed.as_ref().is_some_and(|(armed, _)| *armed == token) {
            self.disarm();
        }
    }

    fn disarm(&mut self) {
        if let Some((_, task)) = self.armed.take() {
            task.abort();
        }
    }
}

impl Drop for ReconnectTimer {
    fn drop(&mut self) {
        self.disarm();
    }
}

/// State owned by the session task.
pub(crate) struct SessionActor<T: Transport, E: Environment> {
    endpoint: Endpoint,
    transport: T,
    env: E,
    session: Session,
    stream: Option<T::Stream>,
    timer: ReconnectTimer,
    telemetry: Arc<dyn Telemetry>,
    mailbox: mpsc::WeakSender<Command>,
}

impl<T: Transport, E: Environment> SessionActor<T, E> {
    pub(crate) fn new(
        endpoint: Endpoint,
        transport: T,
        env: E,
        config: SessionConfig,
        telemetry: Arc<dyn Telemetry>,
        mailbox: mpsc::WeakSender<Command>,
    ) -> Self {
        Self {
            endpoint,
            transport,
            env,
            session: Session::new(config),
            stream: None,
            timer: ReconnectTimer::default(),
            telemetry,
            mailbox,
        }
    }

    /// Connect, then serve commands until stopped or every handle is dropped.
    pub(crate) async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        tracing::debug!(endpoint = %self.endpoint, "session starting");
        let actions = self.session.start();
        self.execute(actions).await;

        while let Some(command) = commands.recv().await {
            match command {
                Command::Send { payload, reply_timeout, reply } => {
                    let timeout = reply_timeout.unwrap_or(self.session.config().reply_timeout);
                    let result = self.transact(&payload, timeout).await;
                    let _ = reply.send(result);
                },
                Command::SendAsync { payload, reply } => {
                    let result = self.send_only(&payload).await;
                    let _ = reply.send(result);
                },
                Command::Reconnect { reply } => {
                    let actions = self.session.force_reconnect();
                    self.execute(actions).await;
                    let _ = reply.send(());
                },
                Command::IsConnected { reply } => {
                    let _ = reply.send(self.session.is_connected());
                },
                Command::TimerFired(token) => {
                    let actions = self.session.timer_fired(token);
                    self.execute(actions).await;
                },
                Command::Stop { reply } => {
                    self.shutdown().await;
                    let _ = reply.send(());
                    return;
                },
            }
        }

        self.shutdown().await;
    }

    async fn transact(
        &mut self,
        payload: &[u8],
        timeout: ReplyTimeout,
    ) -> Result<Bytes, ClientError> {
        self.session.check_ready()?;
        self.notify(TelemetryKind::Sending);

        let Some(stream) = self.stream.as_mut() else {
            return Err(ClientError::connect(ErrorReason::Closed));
        };
        let result =
            transaction::transact(&self.transport, &self.env, stream, payload, timeout).await;

        if let Err(err) = &result {
            self.on_failure(err).await;
        }
        result
    }

    async fn send_only(&mut self, payload: &[u8]) -> Result<Accepted, ClientError> {
        self.session.check_ready()?;
        self.notify(TelemetryKind::Sending);

        let Some(stream) = self.stream.as_mut() else {
            return Err(ClientError::connect(ErrorReason::Closed));
        };
        let result = transaction::send_request(&self.transport, stream, payload).await;

        match result {
            Ok(()) => Ok(Accepted),
            Err(err) => {
                self.on_failure(&err).await;
                Err(err)
            },
        }
    }

    async fn on_failure(&mut self, err: &ClientError) {
        tracing::warn!(endpoint = %self.endpoint, error = %err, "transaction failed");
        let actions = match err.context {
            ErrorContext::Send => self.session.send_failed(err),
            ErrorContext::Receive => self.session.receive_failed(err),
            ErrorContext::Connect => Vec::new(),
        };
        self.execute(actions).await;
    }

    async fn shutdown(&mut self) {
        let actions = self.session.stop();
        self.execute(actions).await;
        tracing::debug!(endpoint = %self.endpoint, "session stopped");
    }

    /// Execute actions in order. `Connect` reports back into the state
    /// machine, and its follow-up actions run before anything queued after.
    async fn execute(&mut self, actions: Vec<SessionAction>) {
        let mut queue = VecDeque::from(actions);

        while let Some(action) = queue.pop_front() {
            match action {
                SessionAction::Connect => {
                    let follow_up = self.connect().await;
                    for action in follow_up.into_iter().rev() {
                        queue.push_front(action);
                    }
                },
                SessionAction::CloseTransport => {
                    if let Some(stream) = self.stream.take() {
                        self.transport.close(stream).await;
                    }
                },
                SessionAction::ScheduleReconnect { token, delay } => {
                    self.timer.arm(token, delay, self.env.clone(), self.mailbox.clone());
                },
                SessionAction::CancelReconnect { token } => self.timer.cancel(token),
                SessionAction::Notify(status) => self.notify(TelemetryKind::Status(status)),
            }
        }
    }

    async fn connect(&mut self) -> Vec<SessionAction> {
        let timeout = self.session.config().connect_timeout;
        match self.transport.connect(&self.endpoint, timeout).await {
            Ok(stream) => {
                tracing::info!(endpoint = %self.endpoint, "connected");
                self.stream = Some(stream);
                self.session.connect_succeeded()
            },
            Err(reason) => {
                tracing::warn!(
                    endpoint = %self.endpoint,
                    error = %reason.describe(),
                    "connect failed"
                );
                self.session.connect_failed(reason)
            },
        }
    }

    fn notify(&self, kind: TelemetryKind) {
        self.telemetry.emit(TelemetryEvent::stamped(&self.env, kind));
    }
}
