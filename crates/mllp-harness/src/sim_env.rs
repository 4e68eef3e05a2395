//! Simulated environment.

use std::{
    future::Future,
    time::{Duration, Instant, SystemTime},
};

use mllp_core::env::Environment;

/// Environment on tokio's clock.
///
/// Under turmoil, or a tokio runtime with paused time, both clocks advance
/// only with simulated time. The wall clock starts at the Unix epoch when the
/// environment is created.
#[derive(Debug, Clone, Copy)]
pub struct SimEnv {
    origin: tokio::time::Instant,
}

impl SimEnv {
    /// Create an environment whose wall clock starts now.
    pub fn new() -> Self {
        Self { origin: tokio::time::Instant::now() }
    }

    /// Simulated time since creation.
    pub fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for SimEnv {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn wall_clock(&self) -> SystemTime {
        SystemTime::UNIX_EPOCH + self.elapsed()
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}
