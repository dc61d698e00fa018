//! # Retry policy for best-effort I/O.
//!
//! [`RetryPolicy`] bounds how often a failed snapshot publish or notification delivery
//! is retried and how long to wait in between.
//!
//! The delay after failed attempt `n` (1-based) is `first × factor^(n-1)`, clamped to
//! `max`, then jitter is applied. The base is derived purely from the attempt number,
//! so jitter output never feeds back into later delays.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use vmc::{JitterPolicy, RetryPolicy};
//!
//! let retry = RetryPolicy {
//!     max_attempts: Some(3),
//!     first: Duration::from_millis(500),
//!     max: Duration::from_secs(5),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(retry.delay_for(1), Duration::from_millis(500));
//! assert_eq!(retry.delay_for(2), Duration::from_secs(1));
//! assert!(retry.allows(3));
//! assert!(!retry.allows(4));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Bounded retry with exponential delay.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first; `None` retries until superseded or stopped.
    pub max_attempts: Option<u32>,
    /// Delay after the first failure.
    pub first: Duration,
    /// Maximum delay cap.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Randomization applied to each delay.
    pub jitter: JitterPolicy,
}

impl Default for RetryPolicy {
    /// Three attempts, 500ms doubling up to 5s, no jitter.
    fn default() -> Self {
        Self {
            max_attempts: Some(3),
            first: Duration::from_millis(500),
            max: Duration::from_secs(5),
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl RetryPolicy {
    /// Policy for the status broadcaster: unbounded, 200ms doubling up to 10s.
    pub fn publish() -> Self {
        Self {
            max_attempts: None,
            first: Duration::from_millis(200),
            max: Duration::from_secs(10),
            factor: 2.0,
            jitter: JitterPolicy::Equal,
        }
    }

    /// Whether attempt number `attempt` (1-based) may be made.
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempt <= max.max(1))
    }

    /// Delay to wait after failed attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base = if !secs.is_finite() || secs < 0.0 || secs > self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        };
        self.jitter.apply(base)
    }
}
