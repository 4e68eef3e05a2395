//! Connection lifecycle state machine.
//!
//! # Architecture: Action-Based State Machine
//!
//! [`Session`] holds no transport handle and performs no I/O. Each
//! transition returns the [`SessionAction`]s the runtime must execute, in
//! order. The runtime reports connect outcomes back through
//! [`Session::connect_succeeded`] and [`Session::connect_failed`], and
//! transaction failures through [`Session::send_failed`] and
//! [`Session::receive_failed`].
//!
//! # State Machine
//!
//! ```text
//!            start / force_reconnect / timer_fired
//!   ┌──────────────┐ ─────────────────> ┌────────────┐
//!   │ Disconnected │                    │ Connecting │
//!   └──────────────┘ <───────────────── └────────────┘
//!          ▲          connect_failed          │
//!          │          (arm timer)             │ connect_succeeded
//!          │                                  ▼
//!          │      force_reconnect /     ┌───────────┐
//!          └──── receive_failed* ────── │ Connected │
//!                                       └───────────┘
//!   stop from any state ──> Stopped
//! ```
//!
//! `receive_failed` only leaves `Connected` when close-on-receive-error is
//! configured, and then goes straight to `Connecting`. `send_failed` stays in
//! `Connected` with the handle attached and arms a reconnect timer; the
//! handle is replaced when that timer fires or a reconnect is forced.
//!
//! # Connectivity
//!
//! [`Session::is_connected`] is true only in `Connected` with no reconnect
//! timer pending. A transaction may proceed whenever a handle is attached
//! ([`Session::check_ready`]); otherwise it fails with the last connect
//! failure without attempting to connect.

use std::time::Duration;

use crate::{
    backoff::{ReconnectScheduler, TimerToken},
    config::SessionConfig,
    error::{ClientError, ErrorReason},
    telemetry::{ConnectionStatus, Status},
};

/// Actions returned by the session state machine.
///
/// The runtime executes them in the order given:
/// - `CloseTransport`: close and drop the current handle
/// - `CancelReconnect`: disarm the timer identified by `token`
/// - `Connect`: attempt a connection and report the outcome
/// - `ScheduleReconnect`: arm a timer that reports `token` after `delay`
/// - `Notify`: publish a status change to telemetry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Attempt to connect, then call `connect_succeeded` or `connect_failed`.
    Connect,

    /// Close the attached transport handle.
    CloseTransport,

    /// Arm the reconnect timer.
    ScheduleReconnect {
        /// Token to present to `timer_fired`.
        token: TimerToken,
        /// Delay before firing.
        delay: Duration,
    },

    /// Disarm a previously armed timer.
    CancelReconnect {
        /// Token of the timer to disarm.
        token: TimerToken,
    },

    /// Publish a status change.
    Notify(Status),
}

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No transport handle.
    Disconnected,
    /// A connect attempt is in flight.
    Connecting,
    /// Transport handle attached.
    Connected,
    /// Terminal; the session no longer serves requests.
    Stopped,
}

/// Session state machine
///
/// Manages connect, reconnect and teardown for a single logical connection.
#[derive(Debug, Clone)]
pub struct Session {
    /// Current state
    state: SessionState,
    /// Configuration
    config: SessionConfig,
    /// Reconnect timer bookkeeping and backoff counter
    reconnect: ReconnectScheduler,
    /// Most recent connect failure, cleared on success
    last_connect_failure: Option<ClientError>,
}

impl Session {
    /// Create a session in `Disconnected` state.
    pub fn new(config: SessionConfig) -> Self {
        let reconnect = ReconnectScheduler::new(config.reconnect_policy());
        Self { state: SessionState::Disconnected, config, reconnect, last_connect_failure: None }
    }

    /// Get current state
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Configuration snapshot
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Reconnect scheduler (pending timer and backoff counter)
    #[must_use]
    pub fn reconnect(&self) -> &ReconnectScheduler {
        &self.reconnect
    }

    /// Most recent connect failure, if no connect has succeeded since.
    #[must_use]
    pub fn last_connect_failure(&self) -> Option<&ClientError> {
        self.last_connect_failure.as_ref()
    }

    /// True when a handle is attached and no reconnect is pending.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected && !self.reconnect.is_pending()
    }

    /// Check whether a transaction may use the transport handle.
    ///
    /// # Errors
    ///
    /// Without an attached handle, returns the last connect failure (connect
    /// context). A stopped session, or one that has not failed a connect yet,
    /// reports `Stopped` or `Closed` respectively.
    pub fn check_ready(&self) -> Result<(), ClientError> {
        match self.state {
            SessionState::Connected => Ok(()),
            SessionState::Stopped => Err(ClientError::connect(ErrorReason::Stopped)),
            SessionState::Disconnected | SessionState::Connecting => Err(self
                .last_connect_failure
                .clone()
                .unwrap_or_else(|| ClientError::connect(ErrorReason::Closed))),
        }
    }

    /// Begin the first connect attempt.
    pub fn start(&mut self) -> Vec<SessionAction> {
        if self.state != SessionState::Disconnected {
            return Vec::new();
        }
        self.begin_connect(Vec::new())
    }

    /// Explicit reconnect: drop the handle, disarm the timer, connect now.
    pub fn force_reconnect(&mut self) -> Vec<SessionAction> {
        if self.state == SessionState::Stopped {
            return Vec::new();
        }

        let mut actions = Vec::new();
        if self.state == SessionState::Connected {
            actions.push(SessionAction::CloseTransport);
        }
        if let Some(token) = self.reconnect.cancel_if_present() {
            actions.push(SessionAction::CancelReconnect { token });
        }
        self.begin_connect(actions)
    }

    /// The reconnect timer fired.
    ///
    /// Ignored unless `token` is the currently pending timer; a timer that
    /// was cancelled after it had already fired reports a stale token.
    pub fn timer_fired(&mut self, token: TimerToken) -> Vec<SessionAction> {
        if self.state == SessionState::Stopped || !self.reconnect.fire(token) {
            tracing::trace!(token = token.get(), "ignoring stale reconnect timer");
            return Vec::new();
        }

        let mut actions = Vec::new();
        if self.state == SessionState::Connected {
            actions.push(SessionAction::CloseTransport);
        }
        self.begin_connect(actions)
    }

    /// The runtime established a transport handle.
    pub fn connect_succeeded(&mut self) -> Vec<SessionAction> {
        if self.state != SessionState::Connecting {
            return Vec::new();
        }

        self.state = SessionState::Connected;
        self.last_connect_failure = None;
        self.reconnect.on_connect_success();

        let mut actions = Vec::new();
        if let Some(token) = self.reconnect.cancel_if_present() {
            actions.push(SessionAction::CancelReconnect { token });
        }
        actions.push(SessionAction::Notify(Status::new(ConnectionStatus::Connected)));
        actions
    }

    /// The connect attempt failed with `reason`.
    pub fn connect_failed(&mut self, reason: ErrorReason) -> Vec<SessionAction> {
        if self.state != SessionState::Connecting {
            return Vec::new();
        }

        let err = ClientError::connect(reason);
        self.state = SessionState::Disconnected;

        let mut actions = vec![SessionAction::Notify(Status::disconnected(&err))];
        self.last_connect_failure = Some(err);
        self.schedule(&mut actions);
        actions
    }

    /// Writing a request failed.
    ///
    /// The handle stays attached; a reconnect timer is armed if none is
    /// pending, and the handle is replaced when it fires.
    pub fn send_failed(&mut self, err: &ClientError) -> Vec<SessionAction> {
        if self.state == SessionState::Stopped {
            return Vec::new();
        }

        let mut actions = vec![SessionAction::Notify(Status::disconnected(err))];
        self.schedule(&mut actions);
        actions
    }

    /// Reading or validating a reply failed.
    ///
    /// With close-on-receive-error the handle is closed and a connect is
    /// attempted immediately; otherwise nothing changes.
    pub fn receive_failed(&mut self, err: &ClientError) -> Vec<SessionAction> {
        if self.state != SessionState::Connected || !self.config.close_on_recv_error {
            return Vec::new();
        }

        let mut actions = vec![
            SessionAction::CloseTransport,
            SessionAction::Notify(Status::disconnected(err)),
        ];
        if let Some(token) = self.reconnect.cancel_if_present() {
            actions.push(SessionAction::CancelReconnect { token });
        }
        self.begin_connect(actions)
    }

    /// Terminal transition: close the handle, disarm the timer.
    pub fn stop(&mut self) -> Vec<SessionAction> {
        let mut actions = Vec::new();
        if self.state == SessionState::Connected {
            actions.push(SessionAction::CloseTransport);
        }
        if let Some(token) = self.reconnect.cancel_if_present() {
            actions.push(SessionAction::CancelReconnect { token });
        }
        if self.state != SessionState::Stopped {
            actions.push(SessionAction::Notify(Status::new(ConnectionStatus::Disconnected)));
        }
        self.state = SessionState::Stopped;
        actions
    }

    fn begin_connect(&mut self, mut actions: Vec<SessionAction>) -> Vec<SessionAction> {
        self.state = SessionState::Connecting;
        actions.push(SessionAction::Notify(Status::new(ConnectionStatus::Connecting)));
        actions.push(SessionAction::Connect);
        actions
    }

    fn schedule(&mut self, actions: &mut Vec<SessionAction>) {
        if let Some((token, delay)) = self.reconnect.schedule_if_absent() {
            tracing::debug!(token = token.get(), ?delay, "reconnect scheduled");
            actions.push(SessionAction::ScheduleReconnect { token, delay });
        }
    }
}
