//! Connect Retry Policy
//!
//! Port-alternating backoff for connection attempts. Early attempts use the
//! primary feed port; once those are spent the policy falls back to the
//! secondary port, and after the overall cap it stops handing out attempts
//! until reset by a reachability recovery or an explicit caller connect.

use std::time::Duration;

use rand::Rng;

use super::endpoint::PortChoice;

/// Retry window shape.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Attempts dialed on the primary port before falling back.
    pub primary_attempts: u32,
    /// Total attempts before the policy stops scheduling reconnects.
    pub max_attempts: u32,
    /// Base delay between attempts.
    pub delay: Duration,
    /// Jitter fraction applied to the delay, `0.0..=1.0`.
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            primary_attempts: 5,
            max_attempts: 10,
            delay: Duration::from_millis(500),
            jitter: 0.1,
        }
    }
}

/// One scheduled connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectAttempt {
    /// 1-based attempt number within the current window.
    pub attempt: u32,
    /// Port to dial for this attempt.
    pub port: PortChoice,
    /// Delay to wait before dialing.
    pub delay: Duration,
}

/// Mutable attempt counter over a [`RetryConfig`].
#[derive(Debug)]
pub struct RetryPolicy {
    config: RetryConfig,
    attempts: u32,
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(config: RetryConfig) -> Self {
        Self {
            config,
            attempts: 0,
        }
    }

    /// Attempts consumed from the current window.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Schedule the next attempt, or `None` when the window is exhausted.
    ///
    /// The first attempt fires immediately; later attempts carry a jittered
    /// delay so a flapping feed is not hammered in lockstep.
    pub fn next_attempt(&mut self) -> Option<ConnectAttempt> {
        if self.attempts >= self.config.max_attempts {
            return None;
        }
        self.attempts += 1;

        let port = if self.attempts <= self.config.primary_attempts {
            PortChoice::Primary
        } else {
            PortChoice::Secondary
        };

        let delay = if self.attempts == 1 {
            Duration::ZERO
        } else {
            self.jittered_delay()
        };

        Some(ConnectAttempt {
            attempt: self.attempts,
            port,
            delay,
        })
    }

    /// Start a fresh window. Called on reachability recovery, on a
    /// successful send, and on an explicit caller connect.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    fn jittered_delay(&self) -> Duration {
        let base = self.config.delay.as_secs_f64();
        let spread = base * self.config.jitter;
        let jitter = rand::rng().random_range(-spread..=spread);
        Duration::from_secs_f64((base + jitter).max(0.0))
    }
}
