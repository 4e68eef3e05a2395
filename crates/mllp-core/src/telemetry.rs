//! Status event sink.
//!
//! Telemetry is an optional side channel. The session publishes lifecycle
//! changes and outgoing sends to a [`Telemetry`] implementation; with none
//! configured, [`NoopTelemetry`] discards them.

use std::{
    fmt,
    time::{Instant, SystemTime},
};

use crate::{
    env::Environment,
    error::{ClientError, ErrorContext, ErrorReason},
};

/// Connectivity as reported in status events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// A connect attempt is starting.
    Connecting,
    /// The transport is established.
    Connected,
    /// The transport is lost or could not be established.
    Disconnected,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        };
        f.write_str(name)
    }
}

/// Status change published by the lifecycle state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    /// New connectivity.
    pub status: ConnectionStatus,
    /// Failure that caused the change, if any.
    pub error: Option<ErrorReason>,
    /// Phase in which that failure occurred.
    pub context: Option<ErrorContext>,
}

impl Status {
    /// Status change with no associated failure.
    pub fn new(status: ConnectionStatus) -> Self {
        Self { status, error: None, context: None }
    }

    /// Disconnection caused by `err`.
    pub fn disconnected(err: &ClientError) -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            error: Some(err.reason.clone()),
            context: Some(err.context),
        }
    }
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryKind {
    /// Connectivity changed.
    Status(Status),
    /// A framed request is about to be written.
    Sending,
}

/// Event delivered to a [`Telemetry`] sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryEvent {
    /// Event payload.
    pub kind: TelemetryKind,
    /// Monotonic timestamp.
    pub monotonic: Instant,
    /// Wall-clock timestamp.
    pub system_time: SystemTime,
}

impl TelemetryEvent {
    /// Stamp `kind` with the environment's clocks.
    pub fn stamped<E: Environment>(env: &E, kind: TelemetryKind) -> Self {
        Self { kind, monotonic: env.now(), system_time: env.wall_clock() }
    }
}

/// Receiver of telemetry events.
///
/// Implementations must not block; they run on the session's task.
pub trait Telemetry: Send + Sync + 'static {
    /// Handle one event.
    fn emit(&self, event: TelemetryEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

impl Telemetry for NoopTelemetry {
    fn emit(&self, _event: TelemetryEvent) {}
}

/// Forwards events to `tracing` under the `mllp::telemetry` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn emit(&self, event: TelemetryEvent) {
        match event.kind {
            TelemetryKind::Status(Status { status, error: None, .. }) => {
                tracing::info!(target: "mllp::telemetry", %status, "status");
            },
            TelemetryKind::Status(Status { status, error: Some(error), context }) => {
                tracing::info!(
                    target: "mllp::telemetry",
                    %status,
                    error = %error.describe(),
                    context = ?context,
                    "status"
                );
            },
            TelemetryKind::Sending => tracing::debug!(target: "mllp::telemetry", "sending"),
        }
    }
}
