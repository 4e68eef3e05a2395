//! Reply deadline arithmetic.
//!
//! A reply may arrive in many partial reads. Each read is issued with the
//! remaining budget as its timeout, but transports only accept whole
//! milliseconds while elapsed time is measured in microseconds. Subtracting
//! only whole milliseconds per read and dropping the rest would let a long
//! run of sub-millisecond reads never consume the budget at all.
//!
//! [`TimeBudget`] therefore charges whole milliseconds against the remaining
//! budget and carries the sub-millisecond remainder as `owed`, adding it to
//! the next charge. The budget is exhausted once `remaining <= owed`.
//! All bookkeeping is integer microseconds.

use std::time::Duration;

use crate::config::ReplyTimeout;

const MICROS_PER_MILLI: u64 = 1_000;

/// Remaining reply budget, in microseconds, plus the uncharged remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBudget {
    remaining: Option<u64>,
    owed: u64,
}

impl TimeBudget {
    /// Start a budget for one reply.
    pub fn new(timeout: ReplyTimeout) -> Self {
        let remaining = timeout
            .as_duration()
            .map(|timeout| u64::try_from(timeout.as_micros()).unwrap_or(u64::MAX));
        Self { remaining, owed: 0 }
    }

    /// True once a finite budget has nothing left beyond what is owed.
    pub fn is_exhausted(&self) -> bool {
        self.remaining.is_some_and(|remaining| remaining <= self.owed)
    }

    /// Timeout for the next read, truncated to whole milliseconds.
    ///
    /// `None` means wait indefinitely.
    pub fn read_timeout(&self) -> Option<Duration> {
        self.remaining.map(|remaining| Duration::from_millis(remaining / MICROS_PER_MILLI))
    }

    /// Charge the time spent in one read.
    pub fn charge(&mut self, elapsed: Duration) {
        let Some(remaining) = self.remaining else {
            return;
        };

        let elapsed = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        let total = elapsed.saturating_add(self.owed);
        let whole = total - total % MICROS_PER_MILLI;

        self.remaining = Some(remaining.saturating_sub(whole));
        self.owed = total % MICROS_PER_MILLI;
    }

    /// Remaining budget in microseconds; `None` when infinite.
    pub fn remaining_micros(&self) -> Option<u64> {
        self.remaining
    }

    /// Sub-millisecond remainder not yet charged.
    pub fn owed_micros(&self) -> u64 {
        self.owed
    }
}
