//! Heartbeat Tracking
//!
//! Liveness bookkeeping for an open session. The session loop drives a
//! periodic tick; on each tick a ping probe is sent and the time since the
//! last inbound activity is compared against the stall timeout.

use std::time::{Duration, Instant};

/// Heartbeat cadence and stall thresholds.
#[derive(Debug, Clone, Copy)]
pub struct HeartbeatConfig {
    /// Interval between ping probes.
    pub interval: Duration,
    /// Silence longer than this marks the session stalled.
    pub timeout: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Per-session heartbeat state.
#[derive(Debug)]
pub struct Heartbeat {
    config: HeartbeatConfig,
    last_activity: Instant,
    awaiting_ack: bool,
}

impl Heartbeat {
    #[must_use]
    pub fn new(config: HeartbeatConfig) -> Self {
        Self {
            config,
            last_activity: Instant::now(),
            awaiting_ack: false,
        }
    }

    /// Interval at which the session should tick.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.config.interval
    }

    /// Note that a ping probe went out.
    pub fn mark_probe_sent(&mut self) {
        self.awaiting_ack = true;
    }

    /// Note a pong for an outstanding probe.
    pub fn record_ack(&mut self) {
        self.awaiting_ack = false;
        self.last_activity = Instant::now();
    }

    /// Note any other inbound traffic. Data frames count as liveness.
    pub fn record_activity(&mut self) {
        self.last_activity = Instant::now();
    }

    /// True when the peer has been silent past the timeout with a probe
    /// still unanswered.
    #[must_use]
    pub fn is_stalled(&self) -> bool {
        self.awaiting_ack && self.last_activity.elapsed() >= self.config.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_heartbeat_is_not_stalled() {
        let hb = Heartbeat::new(HeartbeatConfig::default());
        assert!(!hb.is_stalled());
    }

    #[test]
    fn activity_clears_pending_probe_stall() {
        let mut hb = Heartbeat::new(HeartbeatConfig {
            interval: Duration::from_millis(1),
            timeout: Duration::ZERO,
        });
        hb.mark_probe_sent();
        assert!(hb.is_stalled());
        hb.record_ack();
        assert!(!hb.is_stalled());
    }

    #[test]
    fn stall_requires_an_unanswered_probe() {
        let mut hb = Heartbeat::new(HeartbeatConfig {
            interval: Duration::from_millis(1),
            timeout: Duration::ZERO,
        });
        // Silence alone is not a stall until a probe goes unanswered.
        assert!(!hb.is_stalled());
        hb.mark_probe_sent();
        assert!(hb.is_stalled());
    }
}
