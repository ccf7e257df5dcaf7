//! Frame rate and liveness tracking
//!
//! The frame rate is derived from header timestamps, not arrival times, so it
//! reflects the sensor's capture cadence. Liveness is derived from arrival
//! times: a connected session is online while messages keep arriving within
//! the threshold.

use std::time::{Duration, Instant};
use tracing::trace;

use crate::config::DEFAULT_LIVENESS_THRESHOLD;
use crate::types::ConnectionStatus;

/// Instantaneous frame rate from consecutive header timestamps (milliseconds).
#[derive(Debug, Clone, Default)]
pub struct RateTracker {
    previous: Option<f64>,
    rate: Option<f64>,
}

impl RateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a header timestamp and return the updated rate, if any.
    ///
    /// Non-positive deltas (duplicates or out-of-order timestamps) leave the
    /// current rate untouched. The timestamp still becomes the new reference.
    pub fn record(&mut self, timestamp_ms: f64) -> Option<f64> {
        if let Some(previous) = self.previous {
            let delta = timestamp_ms - previous;
            let rate = 1000.0 / delta;
            if delta > 0.0 && rate.is_finite() {
                self.rate = Some(rate);
            } else {
                trace!(previous, timestamp_ms, "Skipping rate update for non-positive delta");
            }
        }
        self.previous = Some(timestamp_ms);
        self.rate
    }

    /// Most recent rate in frames per second.
    pub fn rate(&self) -> Option<f64> {
        self.rate
    }
}

/// Tracks the arrival time of the most recent message.
#[derive(Debug, Clone)]
pub struct LivenessTracker {
    threshold: Duration,
    last_arrival: Option<Instant>,
}

impl Default for LivenessTracker {
    fn default() -> Self {
        Self::new(DEFAULT_LIVENESS_THRESHOLD)
    }
}

impl LivenessTracker {
    pub fn new(threshold: Duration) -> Self {
        Self { threshold, last_arrival: None }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Record an arrival at `now`.
    pub fn record(&mut self, now: Instant) {
        self.last_arrival = Some(now);
    }

    pub fn last_arrival(&self) -> Option<Instant> {
        self.last_arrival
    }

    /// Online iff connected and the last message arrived less than the threshold ago.
    pub fn is_online_at(&self, status: &ConnectionStatus, now: Instant) -> bool {
        is_online(status, self.last_arrival, self.threshold, now)
    }
}

/// Liveness rule shared by the tracker and the session handle.
pub fn is_online(
    status: &ConnectionStatus,
    last_arrival: Option<Instant>,
    threshold: Duration,
    now: Instant,
) -> bool {
    status.is_connected()
        && last_arrival.is_some_and(|at| now.saturating_duration_since(at) < threshold)
}
