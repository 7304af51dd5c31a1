use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CountdownStatus {
    Running,
    Fired,
    Cancelled,
}

impl Default for CountdownStatus {
    fn default() -> Self {
        CountdownStatus::Running
    }
}

/// What the rendering layer needs to draw the clock.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CountdownSnapshot {
    pub status: CountdownStatus,
    pub duration_ms: u64,
    pub remaining_ms: u64,
    pub warning: bool,
}

/// Deadline arithmetic for one countdown.
///
/// The deadline is fixed when the countdown starts and every reading is
/// `deadline - now`, so late or skipped ticks never accumulate drift.
#[derive(Debug, Clone, Copy)]
pub struct CountdownState {
    duration: Duration,
    deadline: Instant,
    warning_threshold: Duration,
}

impl CountdownState {
    pub fn new(started_at: Instant, duration: Duration, warning_threshold: Duration) -> Self {
        Self {
            duration,
            deadline: started_at + duration,
            warning_threshold,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.deadline.saturating_duration_since(now)
    }

    pub fn remaining_ms(&self, now: Instant) -> u64 {
        self.remaining(now).as_millis() as u64
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    pub fn warning(&self, now: Instant) -> bool {
        self.remaining(now) <= self.warning_threshold
    }

    pub fn snapshot(&self, now: Instant, status: CountdownStatus) -> CountdownSnapshot {
        let remaining_ms = match status {
            CountdownStatus::Fired => 0,
            CountdownStatus::Running | CountdownStatus::Cancelled => self.remaining_ms(now),
        };
        CountdownSnapshot {
            status,
            duration_ms: self.duration.as_millis() as u64,
            remaining_ms,
            warning: self.warning(now),
        }
    }
}
