//! Reconnect delay policy.
//!
//! Two strategies decide how long to wait before the next connect attempt:
//! a fixed interval, or exponential backoff that doubles on each consecutive
//! failure up to a cap and resets on success.
//!
//! [`ReconnectScheduler`] wraps the policy with the "at most one pending
//! timer" bookkeeping. It does not own a timer itself; it hands out a
//! [`TimerToken`] and a delay, and the runtime arms whatever cancellable
//! primitive it has. When the timer fires the runtime presents the token
//! back, and only the currently pending token is honoured.

use std::time::Duration;

/// First delay after a successful connect when backoff is enabled.
pub const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Capped exponential backoff counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    initial: Duration,
    current: Duration,
    max: Duration,
}

impl Backoff {
    /// Create a counter starting at `initial` and never exceeding `max`.
    pub fn new(initial: Duration, max: Duration) -> Self {
        let initial = initial.min(max);
        Self { initial, current: initial, max }
    }

    /// Delay the next failure will be charged.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Cap on the delay.
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Record a failure: return the delay to wait now and grow the next one.
    pub fn fail(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    /// Record a success: the next failure waits the initial delay again.
    pub fn succeed(&mut self) {
        self.current = self.initial;
    }
}

/// Delay strategy for reconnect attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Every retry waits the same interval.
    Fixed(Duration),
    /// Retries back off exponentially.
    Backoff(Backoff),
}

impl ReconnectPolicy {
    /// Delay for the next retry, advancing the backoff counter.
    pub fn next_delay(&mut self) -> Duration {
        match self {
            Self::Fixed(interval) => *interval,
            Self::Backoff(backoff) => backoff.fail(),
        }
    }

    /// Reset after a successful connect.
    pub fn reset(&mut self) {
        if let Self::Backoff(backoff) = self {
            backoff.succeed();
        }
    }

    /// Backoff counter, if the policy uses one.
    pub fn backoff(&self) -> Option<&Backoff> {
        match self {
            Self::Fixed(_) => None,
            Self::Backoff(backoff) => Some(backoff),
        }
    }
}

/// Identifies one armed reconnect timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

impl TimerToken {
    /// Raw sequence number, for logging.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Reconnect policy plus single-pending-timer bookkeeping.
#[derive(Debug, Clone)]
pub struct ReconnectScheduler {
    policy: ReconnectPolicy,
    pending: Option<TimerToken>,
    next_token: u64,
}

impl ReconnectScheduler {
    /// Create a scheduler with no timer pending.
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self { policy, pending: None, next_token: 0 }
    }

    /// Arm a timer unless one is already pending.
    ///
    /// Returns the token and delay to arm. Repeated calls while a timer is
    /// pending return `None` and leave the backoff counter untouched.
    pub fn schedule_if_absent(&mut self) -> Option<(TimerToken, Duration)> {
        if self.pending.is_some() {
            return None;
        }

        let token = TimerToken(self.next_token);
        self.next_token = self.next_token.wrapping_add(1);
        self.pending = Some(token);
        Some((token, self.policy.next_delay()))
    }

    /// Disarm the pending timer, returning its token.
    pub fn cancel_if_present(&mut self) -> Option<TimerToken> {
        self.pending.take()
    }

    /// Consume the pending timer if `token` matches it.
    ///
    /// Returns `false` for a token that was cancelled or superseded.
    pub fn fire(&mut self, token: TimerToken) -> bool {
        if self.pending == Some(token) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    /// Reset the backoff counter after a successful connect.
    pub fn on_connect_success(&mut self) {
        self.policy.reset();
    }

    /// True while a timer is armed.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Token of the armed timer, if any.
    pub fn pending(&self) -> Option<TimerToken> {
        self.pending
    }

    /// Current policy state.
    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }
}
