//! Environment abstraction.
//!
//! The core never reads a clock or sleeps directly. Production code uses
//! [`SystemEnv`]; simulations substitute virtual time so that deadline and
//! reconnect behaviour is reproducible.

use std::{
    future::Future,
    time::{Duration, Instant, SystemTime},
};

/// Clocks and sleeping.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Monotonic time, used for elapsed-time measurement and event stamps.
    fn now(&self) -> Instant;

    /// Wall-clock time, used only to stamp telemetry events.
    fn wall_clock(&self) -> SystemTime;

    /// Suspend for `duration`.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Real clocks and the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl Environment for SystemEnv {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall_clock(&self) -> SystemTime {
        SystemTime::now()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}
