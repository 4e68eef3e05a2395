//! Telemetry capture.

use std::sync::{Arc, Mutex, PoisonError};

use mllp_core::telemetry::{ConnectionStatus, Telemetry, TelemetryEvent, TelemetryKind};

/// Records every event. Clones share the record.
#[derive(Debug, Clone, Default)]
pub struct RecordingTelemetry {
    events: Arc<Mutex<Vec<TelemetryEvent>>>,
}

impl RecordingTelemetry {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far.
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Just the connectivity transitions, in order.
    pub fn statuses(&self) -> Vec<ConnectionStatus> {
        self.events()
            .into_iter()
            .filter_map(|event| match event.kind {
                TelemetryKind::Status(status) => Some(status.status),
                TelemetryKind::Sending => None,
            })
            .collect()
    }

    /// Number of `Sending` events.
    pub fn sends(&self) -> usize {
        self.events().iter().filter(|event| event.kind == TelemetryKind::Sending).count()
    }
}

impl Telemetry for RecordingTelemetry {
    fn emit(&self, event: TelemetryEvent) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).push(event);
    }
}
