//! Configuration types for the orchestrator

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Relay pulse durations
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PulseTiming {
    /// Normal button press (power on, reset)
    pub short_press: Duration,
    /// Forced power-off hold
    pub long_hold: Duration,
}

impl Default for PulseTiming {
    fn default() -> Self {
        Self {
            short_press: Duration::from_secs(1),
            long_hold: Duration::from_secs(5),
        }
    }
}

/// Bounded-retry policy for the wait-for-online loop.
///
/// Boot time is variable, so the wait is bounded rather than open-ended;
/// exceeding the budget yields a timeout outcome, not a hang.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Fixed delay between liveness checks
    pub interval: Duration,
    /// Maximum number of checks before giving up
    pub max_attempts: u32,
}

impl PollPolicy {
    /// Total wall-clock budget of the poll loop
    #[must_use]
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 20,
        }
    }
}
