//! Session configuration.

use std::time::Duration;

use crate::backoff::{Backoff, INITIAL_BACKOFF, ReconnectPolicy};

/// How long a transaction waits for a complete reply frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyTimeout {
    /// Fail with a timeout once this much time has been spent reading.
    After(Duration),
    /// Wait indefinitely.
    Infinite,
}

impl ReplyTimeout {
    /// Finite duration, if any.
    pub fn as_duration(self) -> Option<Duration> {
        match self {
            Self::After(timeout) => Some(timeout),
            Self::Infinite => None,
        }
    }
}

impl From<Duration> for ReplyTimeout {
    fn from(timeout: Duration) -> Self {
        Self::After(timeout)
    }
}

/// Immutable session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Fixed delay between reconnect attempts when backoff is disabled.
    pub auto_reconnect_interval: Duration,
    /// Use capped exponential backoff instead of the fixed interval.
    pub use_backoff: bool,
    /// Upper bound on the backoff delay.
    pub backoff_max: Duration,
    /// Default reply deadline for transactions.
    pub reply_timeout: ReplyTimeout,
    /// Close and re-establish the connection after any receive failure.
    pub close_on_recv_error: bool,
    /// Deadline for a single connect attempt.
    pub connect_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auto_reconnect_interval: Duration::from_secs(1),
            use_backoff: true,
            backoff_max: Duration::from_secs(180),
            reply_timeout: ReplyTimeout::After(Duration::from_secs(60)),
            close_on_recv_error: true,
            connect_timeout: Duration::from_secs(2),
        }
    }
}

impl SessionConfig {
    /// Reconnect policy selected by `use_backoff`.
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        if self.use_backoff {
            ReconnectPolicy::Backoff(Backoff::new(INITIAL_BACKOFF, self.backoff_max))
        } else {
            ReconnectPolicy::Fixed(self.auto_reconnect_interval)
        }
    }
}
