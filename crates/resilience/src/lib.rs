// crates/resilience/src/lib.rs
//! Resilience patterns for fault-tolerant playback
//!
//! This module provides:
//! - Per-attempt timeouts for async operations
//! - A consecutive-failure guard that trips after an unbroken run of failures
//!
//! # Example
//!
//! ```rust
//! use tilawa_resilience::{FailureStreak, StreakState, Timeout};
//! use std::time::Duration;
//!
//! let timeout = Timeout::new(Duration::from_secs(8));
//! assert_eq!(timeout.duration(), Duration::from_secs(8));
//!
//! let mut streak = FailureStreak::new(3);
//! streak.record_failure();
//! streak.record_success();
//! assert_eq!(streak.state(), StreakState::Healthy);
//! ```

mod error;
mod failure_streak;
mod timeout;

pub use error::{ResilienceError, ResilienceResult};
pub use failure_streak::{FailureStreak, StreakState};
pub use timeout::{with_timeout, Timeout};
