// crates/resilience/src/failure_streak.rs
//! Consecutive-failure guard
//!
//! Counts an unbroken run of failures and trips once the run reaches the
//! limit. Any success resets the run. Unlike a circuit breaker there is no
//! half-open probing: a tripped streak stays tripped until reset.

use crate::error::{ResilienceError, ResilienceResult};

/// Streak states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakState {
    /// Below the limit, work may continue
    Healthy,
    /// Limit reached, the caller should give up
    Tripped,
}

/// Counts consecutive failures against a limit
#[derive(Debug, Clone)]
pub struct FailureStreak {
    limit: usize,
    consecutive: usize,
    state: StreakState,
}

impl FailureStreak {
    /// Creates a streak that trips after `limit` consecutive failures
    ///
    /// A limit of zero is treated as one.
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            consecutive: 0,
            state: StreakState::Healthy,
        }
    }

    /// Gets the current state
    pub fn state(&self) -> StreakState {
        self.state
    }

    /// Number of failures in the current run
    pub fn consecutive_failures(&self) -> usize {
        self.consecutive
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Records a successful operation, ending the current run
    pub fn record_success(&mut self) {
        if self.state == StreakState::Healthy {
            self.consecutive = 0;
        }
    }

    /// Records a failed operation and returns the resulting state
    pub fn record_failure(&mut self) -> StreakState {
        if self.state == StreakState::Healthy {
            self.consecutive += 1;
            if self.consecutive >= self.limit {
                self.state = StreakState::Tripped;
            }
        }
        self.state
    }

    /// Checks whether work may continue
    pub fn can_proceed(&self) -> ResilienceResult<()> {
        match self.state {
            StreakState::Healthy => Ok(()),
            StreakState::Tripped => Err(ResilienceError::StreakTripped {
                failures: self.consecutive,
            }),
        }
    }

    /// Resets the streak to healthy
    pub fn reset(&mut self) {
        self.consecutive = 0;
        self.state = StreakState::Healthy;
    }
}

impl Default for FailureStreak {
    fn default() -> Self {
        Self::new(3)
    }
}
